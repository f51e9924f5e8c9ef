use anyhow::Result;
use tracing::debug;

use crate::gateway::write_batches;
use crate::model::DrawingMetadata;
use crate::parser::{equipment, golden_joints, instruments, lines, metadata, packages};
use crate::pipeline::{Stage, StageContext, StageKind};

/// Stages in run order. Lines need the unit index built by metadata, and
/// golden joints need the package index built by packages.
pub fn standard() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(MetadataStage),
        Box::new(LineStage),
        Box::new(EquipmentStage),
        Box::new(PackageStage),
        Box::new(InstrumentStage),
        Box::new(GoldenJointStage),
    ]
}

pub struct MetadataStage;

impl Stage for MetadataStage {
    fn kind(&self) -> StageKind {
        StageKind::Metadata
    }

    /// Units are upserted one by one before drawings; a unit write failure
    /// fails the stage.
    fn run(&self, ctx: &mut StageContext<'_>) -> Result<usize> {
        let result = metadata::extract(ctx.pages);
        for code in &result.unit_codes {
            let id = ctx.gateway.upsert_unit(ctx.project_id, code)?;
            ctx.unit_ids.insert(code.clone(), id);
        }
        debug!(units = ctx.unit_ids.len(), drawings = result.drawings.len(), "metadata");
        ctx.page_units = result.page_units;

        let rows: Vec<(DrawingMetadata, Option<i64>)> = result
            .drawings
            .into_iter()
            .map(|d| {
                let unit = ctx.unit_ids.get(&d.unit_code).copied();
                (d, unit)
            })
            .collect();
        Ok(write_batches("drawings", &rows, ctx.batch_size, |batch| {
            ctx.gateway.save_drawings(ctx.project_id, batch)
        }))
    }
}

pub struct LineStage;

impl Stage for LineStage {
    fn kind(&self) -> StageKind {
        StageKind::Lines
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<usize> {
        let mut found = lines::extract(ctx.pages);
        for line in &mut found {
            line.unit_id = ctx.unit_for(&line.source_pages);
        }
        Ok(write_batches("pipe_lines", &found, ctx.batch_size, |batch| {
            ctx.gateway.save_lines(ctx.project_id, batch)
        }))
    }
}

pub struct EquipmentStage;

impl Stage for EquipmentStage {
    fn kind(&self) -> StageKind {
        StageKind::Equipment
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<usize> {
        let mut found = equipment::extract(ctx.pages);
        for eq in &mut found {
            eq.unit_id = ctx.unit_for(&eq.source_pages);
        }
        Ok(write_batches("equipment", &found, ctx.batch_size, |batch| {
            ctx.gateway.save_equipment(ctx.project_id, batch)
        }))
    }
}

pub struct PackageStage;

impl Stage for PackageStage {
    fn kind(&self) -> StageKind {
        StageKind::Packages
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<usize> {
        let found = packages::extract(ctx.pages);
        for pkg in &found {
            ctx.package_pages
                .entry(pkg.source_page)
                .or_insert_with(|| pkg.package_no.clone());
        }
        Ok(write_batches("test_packages", &found, ctx.batch_size, |batch| {
            ctx.gateway.save_packages(ctx.project_id, batch)
        }))
    }
}

pub struct InstrumentStage;

impl Stage for InstrumentStage {
    fn kind(&self) -> StageKind {
        StageKind::Instruments
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<usize> {
        let mut found = instruments::extract(ctx.pages);
        for inst in &mut found {
            inst.unit_id = ctx.unit_for(&inst.source_pages);
        }
        Ok(write_batches("instruments", &found, ctx.batch_size, |batch| {
            ctx.gateway.save_instruments(ctx.project_id, batch)
        }))
    }
}

pub struct GoldenJointStage;

impl Stage for GoldenJointStage {
    fn kind(&self) -> StageKind {
        StageKind::GoldenJoints
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<usize> {
        let mut found = golden_joints::extract(ctx.pages);
        for gj in &mut found {
            gj.package_no = ctx.package_pages.get(&gj.source_page).cloned();
        }
        Ok(write_batches("golden_joints", &found, ctx.batch_size, |batch| {
            ctx.gateway
                .save_golden_joints(ctx.project_id, ctx.upload_id, batch)
        }))
    }
}

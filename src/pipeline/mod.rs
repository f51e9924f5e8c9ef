pub mod stages;

use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::error::PipelineError;
use crate::gateway::Gateway;
use crate::model::{PageSet, PageText, ParseStatus, Upload};
use crate::provider::PageTextProvider;

const TEXT_EXTRACTED: u8 = 30;
const DONE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Metadata,
    Lines,
    Equipment,
    Packages,
    Instruments,
    GoldenJoints,
}

impl StageKind {
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Metadata => "metadata",
            StageKind::Lines => "lines",
            StageKind::Equipment => "equipment",
            StageKind::Packages => "packages",
            StageKind::Instruments => "instruments",
            StageKind::GoldenJoints => "golden_joints",
        }
    }

    /// Upload progress once this stage has finished or failed.
    pub fn checkpoint(self) -> u8 {
        match self {
            StageKind::Metadata => 40,
            StageKind::Lines => 60,
            StageKind::Equipment => 70,
            StageKind::Packages => 85,
            StageKind::Instruments => 90,
            StageKind::GoldenJoints => 95,
        }
    }
}

/// State shared by the stages of a single run.
pub struct StageContext<'a> {
    pub project_id: i64,
    pub upload_id: i64,
    pub pages: &'a [PageText],
    pub gateway: &'a dyn Gateway,
    pub batch_size: usize,
    /// Unit code → unit row id.
    pub unit_ids: HashMap<String, i64>,
    /// Page → unit code of its governing drawing.
    pub page_units: BTreeMap<u32, String>,
    /// Page → first package declared on it.
    pub package_pages: HashMap<u32, String>,
}

impl<'a> StageContext<'a> {
    fn new(
        upload: &Upload,
        pages: &'a [PageText],
        gateway: &'a dyn Gateway,
        batch_size: usize,
    ) -> Self {
        StageContext {
            project_id: upload.project_id,
            upload_id: upload.id,
            pages,
            gateway,
            batch_size,
            unit_ids: HashMap::new(),
            page_units: BTreeMap::new(),
            package_pages: HashMap::new(),
        }
    }

    /// Unit of the lowest page in `pages` that has a governing drawing.
    pub fn unit_for(&self, pages: &PageSet) -> Option<i64> {
        pages
            .iter()
            .find_map(|p| self.page_units.get(p))
            .and_then(|code| self.unit_ids.get(code))
            .copied()
    }
}

pub trait Stage {
    fn kind(&self) -> StageKind;

    /// Extract and persist. Returns the number of records written.
    fn run(&self, ctx: &mut StageContext<'_>) -> Result<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Written(usize),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub outcome: StageOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub pages: usize,
    pub lines: usize,
    pub equipment: usize,
    pub packages: usize,
    pub instruments: usize,
    pub golden_joints: usize,
}

impl RunStats {
    fn record(&mut self, kind: StageKind, outcome: &StageOutcome) {
        let written = match outcome {
            StageOutcome::Written(n) => *n,
            StageOutcome::Failed(_) => 0,
        };
        match kind {
            StageKind::Metadata => {}
            StageKind::Lines => self.lines = written,
            StageKind::Equipment => self.equipment = written,
            StageKind::Packages => self.packages = written,
            StageKind::Instruments => self.instruments = written,
            StageKind::GoldenJoints => self.golden_joints = written,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub upload_id: i64,
    pub status: ParseStatus,
    pub stats: RunStats,
    pub stages: Vec<StageReport>,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn failed_stages(&self) -> impl Iterator<Item = &StageReport> {
        self.stages
            .iter()
            .filter(|s| matches!(s.outcome, StageOutcome::Failed(_)))
    }
}

/// Persists monotonic progress and mirrors it on the progress bar.
struct ProgressTracker<'a> {
    gateway: &'a dyn Gateway,
    upload_id: i64,
    bar: &'a ProgressBar,
    value: u8,
}

impl ProgressTracker<'_> {
    fn advance(&mut self, to: u8) -> Result<()> {
        let to = to.min(DONE);
        if to <= self.value {
            return Ok(());
        }
        self.value = to;
        self.bar.set_position(to as u64);
        self.gateway.update_progress(self.upload_id, to, None, None)
    }
}

pub struct Pipeline<'a> {
    gateway: &'a dyn Gateway,
    provider: &'a dyn PageTextProvider,
    batch_size: usize,
    progress_every: usize,
    stages: Vec<Box<dyn Stage>>,
    bar: ProgressBar,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        gateway: &'a dyn Gateway,
        provider: &'a dyn PageTextProvider,
        settings: &Settings,
    ) -> Self {
        Pipeline {
            gateway,
            provider,
            batch_size: settings.batch_size,
            progress_every: settings.progress_every,
            stages: stages::standard(),
            bar: ProgressBar::hidden(),
        }
    }

    pub fn with_stages(mut self, stages: Vec<Box<dyn Stage>>) -> Self {
        self.stages = stages;
        self
    }

    pub fn with_progress_bar(mut self, bar: ProgressBar) -> Self {
        self.bar = bar;
        self
    }

    /// Text extraction and page persistence are fatal. Stage errors and panics
    /// are recorded in the report and the run still completes.
    pub fn run(&self, upload_id: i64) -> Result<RunReport, PipelineError> {
        let t0 = Instant::now();
        let upload = self
            .gateway
            .load_upload(upload_id)?
            .ok_or(PipelineError::UploadNotFound(upload_id))?;
        if !self.gateway.begin_run(upload_id)? {
            return Err(PipelineError::Conflict(upload_id));
        }
        info!(upload_id, file = %upload.filename, "Run started");

        self.bar.set_length(DONE as u64);
        self.bar.set_position(0);
        let mut progress = ProgressTracker {
            gateway: self.gateway,
            upload_id,
            bar: &self.bar,
            value: 0,
        };

        match self.execute(&upload, &mut progress) {
            Ok((stats, stages)) => {
                self.gateway
                    .update_progress(upload_id, DONE, Some(ParseStatus::Completed), None)?;
                self.bar.set_position(DONE as u64);
                self.bar.finish_and_clear();

                let report = RunReport {
                    upload_id,
                    status: ParseStatus::Completed,
                    stats,
                    stages,
                    elapsed_ms: t0.elapsed().as_millis() as u64,
                };
                let failed = report.failed_stages().count();
                info!(
                    upload_id,
                    failed_stages = failed,
                    elapsed_ms = report.elapsed_ms,
                    "Run completed"
                );
                Ok(report)
            }
            Err(e) => {
                let message = e.to_string();
                error!(upload_id, "Run failed: {}", message);
                if let Err(write_err) = self.gateway.update_progress(
                    upload_id,
                    progress.value,
                    Some(ParseStatus::Failed),
                    Some(&message),
                ) {
                    error!(upload_id, "Could not record failure: {:#}", write_err);
                }
                self.bar.abandon_with_message(message);
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        upload: &Upload,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<(RunStats, Vec<StageReport>), PipelineError> {
        let mut callback_err = None;
        let pages = self.provider.extract(
            Path::new(&upload.storage_path),
            self.progress_every,
            &mut |current: usize, total: usize| {
                // 30 is reserved for "page texts persisted".
                let pct = current * (TEXT_EXTRACTED - 1) as usize / total.max(1);
                if let Err(e) = progress.advance(pct as u8) {
                    callback_err.get_or_insert(e);
                }
            },
        )?;
        if let Some(e) = callback_err {
            return Err(e.into());
        }

        self.gateway.set_total_pages(upload.id, pages.len() as u32)?;
        for chunk in pages.chunks(self.batch_size.max(1)) {
            self.gateway.save_page_texts(upload.id, chunk)?;
        }
        progress.advance(TEXT_EXTRACTED)?;

        let mut ctx = StageContext::new(upload, &pages, self.gateway, self.batch_size);
        let mut stats = RunStats {
            pages: pages.len(),
            ..RunStats::default()
        };
        let mut reports = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let kind = stage.kind();
            info!(stage = kind.name(), "Stage started");
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| stage.run(&mut ctx))) {
                Ok(Ok(written)) => {
                    info!(stage = kind.name(), written, "Stage finished");
                    StageOutcome::Written(written)
                }
                Ok(Err(e)) => {
                    warn!(stage = kind.name(), "Stage failed: {:#}", e);
                    StageOutcome::Failed(format!("{:#}", e))
                }
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    warn!(stage = kind.name(), "Stage panicked: {}", reason);
                    StageOutcome::Failed(reason)
                }
            };
            stats.record(kind, &outcome);
            reports.push(StageReport { stage: kind, outcome });
            progress.advance(kind.checkpoint())?;
        }

        Ok((stats, reports))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "stage panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::stages::{
        EquipmentStage, GoldenJointStage, InstrumentStage, LineStage, MetadataStage, PackageStage,
    };
    use super::*;
    use crate::db::{ensure_project, init_schema, insert_upload, SqliteStore};
    use crate::error::ExtractError;
    use crate::model::{DrawingMetadata, Equipment, GoldenJoint, Instrument, PipeLine, TestPackage};
    use crate::parser;
    use rusqlite::Connection;
    use std::cell::RefCell;

    const DOC: [&str; 3] = [
        r#"A8RX-CHT-2000-PRC-PID-001 REV 2 12-JAN-2024 6"-CW-1234-A1B2 V-10045 PI-2001"#,
        r#"A8RX-CHT-2000-PRC-PID-001 Package No: 2000E-P-0003 Test Pressure: 15 Bar
           Test Medium: H GOLDEN JOINT at 4"-P-0112 / 4"-P-0113"#,
        r#"continuation 6"-CW-1234-A1B2 to V-10045"#,
    ];

    struct StaticProvider(Vec<PageText>);

    impl PageTextProvider for StaticProvider {
        fn extract(
            &self,
            _source: &Path,
            _progress_every: usize,
            on_progress: &mut dyn FnMut(usize, usize),
        ) -> Result<Vec<PageText>, ExtractError> {
            on_progress(self.0.len(), self.0.len());
            Ok(self.0.clone())
        }
    }

    /// Reports half the pages done, then fails.
    struct BrokenProvider;

    impl PageTextProvider for BrokenProvider {
        fn extract(
            &self,
            _source: &Path,
            _progress_every: usize,
            on_progress: &mut dyn FnMut(usize, usize),
        ) -> Result<Vec<PageText>, ExtractError> {
            on_progress(5, 10);
            Err(ExtractError::TextExtraction("corrupt xref table".into()))
        }
    }

    struct FailingStage(StageKind);

    impl Stage for FailingStage {
        fn kind(&self) -> StageKind {
            self.0
        }
        fn run(&self, _ctx: &mut StageContext<'_>) -> Result<usize> {
            anyhow::bail!("grammar exploded")
        }
    }

    struct PanickingStage(StageKind);

    impl Stage for PanickingStage {
        fn kind(&self) -> StageKind {
            self.0
        }
        fn run(&self, _ctx: &mut StageContext<'_>) -> Result<usize> {
            panic!("index out of range")
        }
    }

    /// Delegates to a real store and remembers page batch sizes and
    /// persisted progress values. Can be told to reject page writes.
    struct RecordingGateway<'a> {
        inner: &'a SqliteStore,
        page_batches: RefCell<Vec<usize>>,
        progress: RefCell<Vec<u8>>,
        reject_pages: bool,
    }

    impl<'a> RecordingGateway<'a> {
        fn new(inner: &'a SqliteStore) -> Self {
            RecordingGateway {
                inner,
                page_batches: RefCell::new(Vec::new()),
                progress: RefCell::new(Vec::new()),
                reject_pages: false,
            }
        }
    }

    impl Gateway for RecordingGateway<'_> {
        fn load_upload(&self, upload_id: i64) -> Result<Option<Upload>> {
            self.inner.load_upload(upload_id)
        }
        fn begin_run(&self, upload_id: i64) -> Result<bool> {
            self.inner.begin_run(upload_id)
        }
        fn update_progress(
            &self,
            upload_id: i64,
            progress: u8,
            status: Option<ParseStatus>,
            error_message: Option<&str>,
        ) -> Result<()> {
            self.progress.borrow_mut().push(progress);
            self.inner
                .update_progress(upload_id, progress, status, error_message)
        }
        fn set_total_pages(&self, upload_id: i64, total_pages: u32) -> Result<()> {
            self.inner.set_total_pages(upload_id, total_pages)
        }
        fn save_page_texts(&self, upload_id: i64, pages: &[PageText]) -> Result<()> {
            self.page_batches.borrow_mut().push(pages.len());
            if self.reject_pages {
                anyhow::bail!("disk full");
            }
            self.inner.save_page_texts(upload_id, pages)
        }
        fn upsert_unit(&self, project_id: i64, code: &str) -> Result<i64> {
            self.inner.upsert_unit(project_id, code)
        }
        fn save_drawings(
            &self,
            project_id: i64,
            batch: &[(DrawingMetadata, Option<i64>)],
        ) -> Result<usize> {
            self.inner.save_drawings(project_id, batch)
        }
        fn save_lines(&self, project_id: i64, batch: &[PipeLine]) -> Result<usize> {
            self.inner.save_lines(project_id, batch)
        }
        fn save_equipment(&self, project_id: i64, batch: &[Equipment]) -> Result<usize> {
            self.inner.save_equipment(project_id, batch)
        }
        fn save_instruments(&self, project_id: i64, batch: &[Instrument]) -> Result<usize> {
            self.inner.save_instruments(project_id, batch)
        }
        fn save_packages(&self, project_id: i64, batch: &[TestPackage]) -> Result<usize> {
            self.inner.save_packages(project_id, batch)
        }
        fn save_golden_joints(
            &self,
            project_id: i64,
            upload_id: i64,
            batch: &[GoldenJoint],
        ) -> Result<usize> {
            self.inner.save_golden_joints(project_id, upload_id, batch)
        }
    }

    fn doc_pages() -> Vec<PageText> {
        DOC.iter()
            .enumerate()
            .map(|(i, t)| PageText::new(i as u32 + 1, *t))
            .collect()
    }

    fn setup() -> (SqliteStore, i64) {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let project = ensure_project(&conn, "alpha").unwrap();
        let upload = insert_upload(&conn, project, "doc.txt", "doc.txt").unwrap();
        (SqliteStore::new(conn), upload)
    }

    fn count(store: &SqliteStore, table: &str) -> usize {
        store
            .conn()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn full_run_completes_with_stats() {
        let (store, upload) = setup();
        let provider = StaticProvider(doc_pages());
        let report = Pipeline::new(&store, &provider, &Settings::default())
            .run(upload)
            .unwrap();

        let pages = doc_pages();
        assert_eq!(report.status, ParseStatus::Completed);
        assert_eq!(report.stats.pages, 3);
        assert_eq!(report.stats.lines, 3);
        assert_eq!(report.stats.lines, parser::lines::extract(&pages).len());
        assert_eq!(report.stats.equipment, parser::equipment::extract(&pages).len());
        assert_eq!(report.stats.instruments, 1);
        assert_eq!(report.stats.packages, 1);
        assert_eq!(report.stats.golden_joints, 1);
        assert_eq!(report.failed_stages().count(), 0);
        assert_eq!(report.stages.len(), 6);

        let u = store.load_upload(upload).unwrap().unwrap();
        assert_eq!(u.status, ParseStatus::Completed);
        assert_eq!(u.progress, 100);
        assert_eq!(u.total_pages, Some(3));
        assert!(u.finished_at.is_some());
        assert_eq!(count(&store, "page_texts"), 3);
        assert_eq!(count(&store, "drawings"), 1);
    }

    #[test]
    fn entities_get_units_and_joint_links_package() {
        let (store, upload) = setup();
        let provider = StaticProvider(doc_pages());
        Pipeline::new(&store, &provider, &Settings::default())
            .run(upload)
            .unwrap();

        let (unit_code, pages): (String, String) = store
            .conn()
            .query_row(
                "SELECT u.code, l.source_pages FROM pipe_lines l JOIN units u ON u.id = l.unit_id
                 WHERE l.line_number = ?1",
                [r#"6"-CW-1234-A1B2"#],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(unit_code, "2000");
        assert_eq!(pages, "[1,3]");

        let package: String = store
            .conn()
            .query_row(
                "SELECT p.package_no FROM golden_joints g
                 JOIN test_packages p ON p.id = g.test_package_id",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(package, "2000E-P-0003");
    }

    #[test]
    fn rerun_is_idempotent() {
        let (store, upload) = setup();
        let provider = StaticProvider(doc_pages());
        let pipeline = Pipeline::new(&store, &provider, &Settings::default());
        let first = pipeline.run(upload).unwrap();
        let tables = ["pipe_lines", "equipment", "instruments", "test_packages", "golden_joints"];
        let before: Vec<usize> = tables.iter().map(|t| count(&store, t)).collect();

        let second = pipeline.run(upload).unwrap();
        let after: Vec<usize> = tables.iter().map(|t| count(&store, t)).collect();
        assert_eq!(first.stats, second.stats);
        assert_eq!(before, after);
    }

    #[test]
    fn failing_stage_is_isolated() {
        let (store, upload) = setup();
        let provider = StaticProvider(doc_pages());
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(MetadataStage),
            Box::new(LineStage),
            Box::new(FailingStage(StageKind::Equipment)),
            Box::new(PackageStage),
            Box::new(InstrumentStage),
            Box::new(GoldenJointStage),
        ];
        let report = Pipeline::new(&store, &provider, &Settings::default())
            .with_stages(stages)
            .run(upload)
            .unwrap();

        assert_eq!(report.status, ParseStatus::Completed);
        assert_eq!(report.stats.equipment, 0);
        assert_eq!(report.stats.lines, 3);
        assert_eq!(report.stats.packages, 1);
        assert_eq!(report.stats.instruments, 1);
        assert_eq!(report.stats.golden_joints, 1);
        let failed: Vec<_> = report.failed_stages().map(|s| s.stage).collect();
        assert_eq!(failed, vec![StageKind::Equipment]);
        assert_eq!(count(&store, "equipment"), 0);

        let u = store.load_upload(upload).unwrap().unwrap();
        assert_eq!(u.status, ParseStatus::Completed);
        assert_eq!(u.progress, 100);
    }

    #[test]
    fn panicking_stage_is_isolated() {
        let (store, upload) = setup();
        let provider = StaticProvider(doc_pages());
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(PanickingStage(StageKind::Metadata)),
            Box::new(LineStage),
            Box::new(EquipmentStage),
        ];
        let report = Pipeline::new(&store, &provider, &Settings::default())
            .with_stages(stages)
            .run(upload)
            .unwrap();

        assert_eq!(
            report.stages[0].outcome,
            StageOutcome::Failed("index out of range".into())
        );
        assert_eq!(report.stats.lines, 3);
        // Without metadata there is no unit to assign.
        let with_unit: usize = store
            .conn()
            .query_row("SELECT COUNT(unit_id) FROM pipe_lines", [], |r| r.get(0))
            .unwrap();
        assert_eq!(with_unit, 0);
    }

    #[test]
    fn provider_failure_fails_the_upload_keeping_progress() {
        let (store, upload) = setup();
        let err = Pipeline::new(&store, &BrokenProvider, &Settings::default())
            .run(upload)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extract(ExtractError::TextExtraction(_))));

        let u = store.load_upload(upload).unwrap().unwrap();
        assert_eq!(u.status, ParseStatus::Failed);
        assert_eq!(u.progress, 14);
        assert!(u.error_message.unwrap().contains("corrupt xref table"));
        assert_eq!(count(&store, "page_texts"), 0);
    }

    #[test]
    fn processing_upload_is_rejected() {
        let (store, upload) = setup();
        assert!(store.begin_run(upload).unwrap());
        let provider = StaticProvider(doc_pages());
        let err = Pipeline::new(&store, &provider, &Settings::default())
            .run(upload)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Conflict(id) if id == upload));
        assert_eq!(count(&store, "page_texts"), 0);
    }

    #[test]
    fn page_texts_are_written_in_batches() {
        let (store, upload) = setup();
        let gateway = RecordingGateway::new(&store);
        let pages: Vec<PageText> = (1..=120)
            .map(|n| PageText::new(n, format!("sheet {}", n)))
            .collect();
        let provider = StaticProvider(pages);
        let settings = Settings {
            batch_size: 50,
            ..Settings::default()
        };
        let report = Pipeline::new(&gateway, &provider, &settings)
            .with_stages(Vec::new())
            .run(upload)
            .unwrap();

        assert_eq!(report.stats.pages, 120);
        assert_eq!(*gateway.page_batches.borrow(), vec![50, 50, 20]);
        assert_eq!(count(&store, "page_texts"), 120);
    }

    #[test]
    fn failed_page_batch_fails_the_run_before_the_saved_checkpoint() {
        let (store, upload) = setup();
        let mut gateway = RecordingGateway::new(&store);
        gateway.reject_pages = true;
        let provider = StaticProvider(doc_pages());
        let err = Pipeline::new(&gateway, &provider, &Settings::default())
            .run(upload)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));

        let u = store.load_upload(upload).unwrap().unwrap();
        assert_eq!(u.status, ParseStatus::Failed);
        assert_eq!(u.progress, 29);
        assert!(u.error_message.unwrap().contains("disk full"));
    }

    #[test]
    fn progress_is_persisted_after_every_stage_even_failed_ones() {
        let (store, upload) = setup();
        let gateway = RecordingGateway::new(&store);
        let provider = StaticProvider(doc_pages());
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(MetadataStage),
            Box::new(LineStage),
            Box::new(FailingStage(StageKind::Equipment)),
            Box::new(PackageStage),
            Box::new(InstrumentStage),
            Box::new(GoldenJointStage),
        ];
        Pipeline::new(&gateway, &provider, &Settings::default())
            .with_stages(stages)
            .run(upload)
            .unwrap();

        assert_eq!(
            *gateway.progress.borrow(),
            vec![29, 30, 40, 60, 70, 85, 90, 95, 100]
        );
    }

    #[test]
    fn unknown_upload() {
        let (store, _) = setup();
        let provider = StaticProvider(doc_pages());
        let err = Pipeline::new(&store, &provider, &Settings::default())
            .run(999)
            .unwrap_err();
        assert!(matches!(err, PipelineError::UploadNotFound(999)));
    }

    #[test]
    fn checkpoints_only_increase() {
        let mut last = 0;
        for kind in [
            StageKind::Metadata,
            StageKind::Lines,
            StageKind::Equipment,
            StageKind::Packages,
            StageKind::Instruments,
            StageKind::GoldenJoints,
        ] {
            assert!(kind.checkpoint() > last.max(TEXT_EXTRACTED));
            last = kind.checkpoint();
        }
        assert!(last < DONE);
    }

    #[test]
    fn stats_serialize_camel_case() {
        let stats = RunStats {
            golden_joints: 2,
            ..RunStats::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["goldenJoints"], 2);
        assert_eq!(json["pages"], 0);
    }
}

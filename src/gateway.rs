use anyhow::Result;
use tracing::warn;

use crate::model::{
    DrawingMetadata, Equipment, GoldenJoint, Instrument, PageText, ParseStatus, PipeLine,
    TestPackage, Upload,
};

/// Write contract the pipeline needs from storage.
///
/// Batch writers return how many records of the batch were accepted. A batch
/// that returns `Err` is treated as not written; callers go through
/// [`write_batches`] so one bad batch never aborts a stage.
pub trait Gateway {
    fn load_upload(&self, upload_id: i64) -> Result<Option<Upload>>;

    /// Moves the upload to `processing`. `Ok(false)` when it already is.
    fn begin_run(&self, upload_id: i64) -> Result<bool>;

    fn update_progress(
        &self,
        upload_id: i64,
        progress: u8,
        status: Option<ParseStatus>,
        error_message: Option<&str>,
    ) -> Result<()>;

    fn set_total_pages(&self, upload_id: i64, total_pages: u32) -> Result<()>;

    fn save_page_texts(&self, upload_id: i64, pages: &[PageText]) -> Result<()>;

    fn upsert_unit(&self, project_id: i64, code: &str) -> Result<i64>;

    fn save_drawings(
        &self,
        project_id: i64,
        batch: &[(DrawingMetadata, Option<i64>)],
    ) -> Result<usize>;

    fn save_lines(&self, project_id: i64, batch: &[PipeLine]) -> Result<usize>;

    fn save_equipment(&self, project_id: i64, batch: &[Equipment]) -> Result<usize>;

    fn save_instruments(&self, project_id: i64, batch: &[Instrument]) -> Result<usize>;

    fn save_packages(&self, project_id: i64, batch: &[TestPackage]) -> Result<usize>;

    fn save_golden_joints(
        &self,
        project_id: i64,
        upload_id: i64,
        batch: &[GoldenJoint],
    ) -> Result<usize>;
}

/// Feed `records` to `write` in fixed-size batches, summing accepted counts.
/// Failed batches are logged and skipped.
pub fn write_batches<T>(
    kind: &str,
    records: &[T],
    batch_size: usize,
    mut write: impl FnMut(&[T]) -> Result<usize>,
) -> usize {
    let mut written = 0;
    for (i, batch) in records.chunks(batch_size.max(1)).enumerate() {
        match write(batch) {
            Ok(n) => written += n,
            Err(e) => warn!(
                kind,
                batch = i,
                records = batch.len(),
                "batch write failed: {:#}",
                e
            ),
        }
    }
    written
}

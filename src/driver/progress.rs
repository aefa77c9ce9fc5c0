//! Progress file (spec §6 "Progress file"): a JSON document overwritten
//! after each emitted record, matching `converter.py`'s `update_stats`
//! write-whole-file-each-time behaviour (no incremental patching).

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::error::ConverterResult;

#[derive(Serialize)]
struct ProgressDocument {
    written: usize,
    total: usize,
}

pub struct ProgressReporter {
    path: Option<std::path::PathBuf>,
    total: usize,
    written: usize,
}

impl ProgressReporter {
    pub fn new(path: Option<impl Into<std::path::PathBuf>>, total: usize) -> Self {
        Self { path: path.map(Into::into), total, written: 0 }
    }

    pub fn record_written(&mut self) -> ConverterResult<()> {
        self.written += 1;
        self.flush()
    }

    fn flush(&self) -> ConverterResult<()> {
        let Some(path) = &self.path else { return Ok(()) };
        write_progress(path, self.written, self.total)
    }
}

fn write_progress(path: &Path, written: usize, total: usize) -> ConverterResult<()> {
    let file = File::create(path).map_err(|e| anyhow::anyhow!("creating progress file {path:?}: {e}"))?;
    serde_json::to_writer(file, &ProgressDocument { written, total })
        .map_err(|e| anyhow::anyhow!("writing progress file {path:?}: {e}"))?;
    Ok(())
}

//! Batch rendering of every page document in a run folder.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;

use pagepan_common::error::{PagepanError, PagepanResult};
use pagepan_common::timing::StageTimer;

use crate::chapter::{ChapterBuilder, ChapterResult};

/// A document that was skipped instead of rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedDocument {
    pub document: PathBuf,
    pub reason: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub run_dir: PathBuf,
    /// Rendered chapters, in discovery order.
    pub results: Vec<ChapterResult>,
    pub skipped: Vec<SkippedDocument>,
    pub elapsed_secs: f64,
}

/// Every file named `file_name` under `root`, recursively, sorted by path.
pub fn discover_documents(root: &Path, file_name: &str) -> PagepanResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(PagepanError::FileNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && entry.file_name() == file_name {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Renders all documents of a run with bounded concurrency.
pub struct BatchRunner {
    builder: Arc<ChapterBuilder>,
}

impl BatchRunner {
    pub fn new(builder: ChapterBuilder) -> Self {
        Self {
            builder: Arc::new(builder),
        }
    }

    /// Folder holding the documents of `run_id`.
    pub fn run_dir(&self, run_id: &str) -> PagepanResult<PathBuf> {
        let root = self
            .builder
            .config()
            .output_root
            .as_ref()
            .ok_or_else(|| PagepanError::config("output_root is not set"))?;
        Ok(root.join(run_id))
    }

    /// Render every document under `<output_root>/<run_id>`.
    ///
    /// Documents without boxed dialogue are skipped and reported; any other
    /// failure aborts the run: documents not yet started are left alone and
    /// the first error is returned. At most `jobs` documents render at once,
    /// each on a blocking thread.
    pub async fn build_run(&self, run_id: &str) -> PagepanResult<RunReport> {
        let timer = StageTimer::start(format!("run {run_id}"));
        let run_dir = self.run_dir(run_id)?;
        let config = self.builder.config();
        let documents = discover_documents(&run_dir, &config.document_file_name)?;
        let jobs = config.jobs.max(1);

        tracing::info!(
            run_id,
            run_dir = %run_dir.display(),
            documents = documents.len(),
            jobs,
            "Starting run"
        );

        let semaphore = Arc::new(Semaphore::new(jobs));
        let aborted = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(documents.len());
        for document in documents {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| PagepanError::Other(e.into()))?;
            if aborted.load(Ordering::Acquire) {
                tracing::debug!(document = %document.display(), "Run aborted, not starting document");
                break;
            }
            let builder = Arc::clone(&self.builder);
            let aborted = Arc::clone(&aborted);
            let path = document.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                if aborted.load(Ordering::Acquire) {
                    return None;
                }
                let outcome = builder.build_chapter(&path, None);
                if matches!(&outcome, Err(err) if !err.is_no_dialogue()) {
                    aborted.store(true, Ordering::Release);
                }
                Some(outcome)
            });
            handles.push((document, handle));
        }

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        let mut first_error = None;
        for (document, handle) in handles {
            let outcome = match handle.await {
                Ok(Some(outcome)) => outcome,
                Ok(None) => continue,
                Err(e) => Err(PagepanError::Other(e.into())),
            };
            match outcome {
                Ok(result) => results.push(result),
                Err(err) if err.is_no_dialogue() => {
                    tracing::warn!(document = %document.display(), "No boxed dialogue, skipping");
                    skipped.push(SkippedDocument {
                        document,
                        reason: err.to_string(),
                    });
                }
                Err(err) => {
                    tracing::error!(document = %document.display(), error = %err, "Document failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        let elapsed_secs = timer.finish();
        tracing::info!(
            run_id,
            rendered = results.len(),
            skipped = skipped.len(),
            elapsed_secs,
            "Run complete"
        );
        Ok(RunReport {
            run_id: run_id.to_string(),
            run_dir,
            results,
            skipped,
            elapsed_secs,
        })
    }
}

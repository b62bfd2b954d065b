//! Serial or pooled extraction over the files queued for analysis

use std::sync::Arc;

use arbor_core::{ProjectFileMap, ProjectGraph};
use thiserror::Error;

use crate::extractor::{DependencyExtractor, ExplicitDependency};
use crate::worker_pool::WorkerPool;

/// Below this many queued files extraction stays on the calling thread.
pub const MIN_FILES_FOR_WORKERS: usize = 100;
/// Upper bound on default worker slots.
pub const MAX_DEFAULT_WORKERS: usize = 8;
/// Bins targeted per worker, so fast workers can pick up slack.
pub const BINS_PER_WORKER: usize = 5;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("dependency extraction failed: {0:#}")]
    Extractor(anyhow::Error),

    #[error("extraction worker {worker} failed: {message}")]
    WorkerFailed { worker: usize, message: String },

    #[error("extraction task failed: {0}")]
    Join(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPlan {
    Serial,
    Pooled { workers: usize },
}

/// Usable worker slots: the override if given, else one less than the CPU count, capped.
pub fn worker_slots(max_workers: Option<usize>) -> usize {
    match max_workers {
        Some(n) => n.max(1),
        None => {
            let cpus = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            cpus.saturating_sub(1).clamp(1, MAX_DEFAULT_WORKERS)
        }
    }
}

pub fn plan(total_files: usize, slots: usize) -> ExecutionPlan {
    if total_files < MIN_FILES_FOR_WORKERS || slots <= 2 {
        ExecutionPlan::Serial
    } else {
        ExecutionPlan::Pooled {
            workers: total_files.min(slots),
        }
    }
}

pub fn total_files(files: &ProjectFileMap) -> usize {
    files.values().map(Vec::len).sum()
}

/// `round(total / (workers * 5)) + 1`
pub fn bin_size(total_files: usize, workers: usize) -> usize {
    let target_bins = (workers.max(1) * BINS_PER_WORKER) as f64;
    (total_files as f64 / target_bins).round() as usize + 1
}

/// Cut the queue into contiguous bins, projects then files in map order.
pub fn split_into_bins(files: &ProjectFileMap, bin_size: usize) -> Vec<ProjectFileMap> {
    let bin_size = bin_size.max(1);
    let mut bins = Vec::new();
    let mut current = ProjectFileMap::new();
    let mut current_len = 0;

    for (project, project_files) in files {
        for file in project_files {
            current
                .entry(project.clone())
                .or_default()
                .push(file.clone());
            current_len += 1;

            if current_len == bin_size {
                bins.push(std::mem::take(&mut current));
                current_len = 0;
            }
        }
    }
    if current_len > 0 {
        bins.push(current);
    }
    bins
}

/// Runs a [`DependencyExtractor`] either inline or across a [`WorkerPool`].
#[derive(Clone)]
pub struct ExtractionCoordinator {
    extractor: Arc<dyn DependencyExtractor>,
    slots: usize,
}

impl ExtractionCoordinator {
    pub fn new(extractor: Arc<dyn DependencyExtractor>, max_workers: Option<usize>) -> Self {
        Self {
            extractor,
            slots: worker_slots(max_workers),
        }
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn plan_for(&self, files: &ProjectFileMap) -> ExecutionPlan {
        plan(total_files(files), self.slots)
    }

    /// Extract on the calling thread, fanning out to a pool when the queue is large enough.
    pub fn extract_blocking(
        &self,
        graph: &ProjectGraph,
        files: &ProjectFileMap,
    ) -> Result<Vec<ExplicitDependency>, ExtractionError> {
        let total = total_files(files);
        if total == 0 {
            return Ok(Vec::new());
        }

        match plan(total, self.slots) {
            ExecutionPlan::Serial => {
                tracing::debug!("Extracting dependencies from {} files serially", total);
                self.extractor
                    .extract(graph, files)
                    .map_err(ExtractionError::Extractor)
            }
            ExecutionPlan::Pooled { workers } => {
                let size = bin_size(total, workers);
                let bins = split_into_bins(files, size);
                tracing::debug!(
                    "Extracting dependencies from {} files with {} workers ({} bins of {})",
                    total,
                    workers,
                    bins.len(),
                    size
                );
                WorkerPool::new(workers, self.extractor.clone(), graph)?.run(bins)
            }
        }
    }

    /// Async wrapper around [`Self::extract_blocking`].
    pub async fn extract(
        &self,
        graph: ProjectGraph,
        files: ProjectFileMap,
    ) -> Result<Vec<ExplicitDependency>, ExtractionError> {
        let coordinator = self.clone();
        tokio::task::spawn_blocking(move || coordinator.extract_blocking(&graph, &files))
            .await
            .map_err(|e| ExtractionError::Join(e.to_string()))?
    }
}

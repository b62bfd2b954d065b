//! Thread pool for dependency extraction
//!
//! Workers share one FIFO of bins behind a mutex and pull until it is empty.
//! Each worker owns a private copy of the graph; results travel back over a
//! channel tagged with their bin index so the merge order never depends on
//! scheduling.

use std::any::Any;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use arbor_core::{ProjectFileMap, ProjectGraph};

use crate::coordinator::ExtractionError;
use crate::extractor::{DependencyExtractor, ExplicitDependency};

/// One unit of work handed to a worker.
#[derive(Debug)]
struct BinRequest {
    index: usize,
    files: ProjectFileMap,
}

type BinResult = (usize, anyhow::Result<Vec<ExplicitDependency>>);

/// Worker pool that lives for exactly one extraction.
pub struct WorkerPool {
    sender: Sender<BinRequest>,
    results: Receiver<BinResult>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `num_workers` threads, each initialized once with its own copy of `graph`.
    pub fn new(
        num_workers: usize,
        extractor: Arc<dyn DependencyExtractor>,
        graph: &ProjectGraph,
    ) -> Result<Self, ExtractionError> {
        let (sender, receiver) = mpsc::channel::<BinRequest>();
        let receiver = Arc::new(Mutex::new(receiver));
        let (result_sender, results) = mpsc::channel::<BinResult>();

        let mut handles = Vec::with_capacity(num_workers);
        for worker in 0..num_workers {
            let receiver = receiver.clone();
            let result_sender = result_sender.clone();
            let extractor = extractor.clone();
            let graph = graph.clone();

            let handle = thread::Builder::new()
                .name(format!("arbor-extract-{worker}"))
                .spawn(move || Self::worker_thread(worker, receiver, result_sender, extractor, graph))
                .map_err(|e| ExtractionError::WorkerFailed {
                    worker,
                    message: format!("failed to spawn: {e}"),
                })?;
            handles.push(handle);
        }

        Ok(Self {
            sender,
            results,
            handles,
        })
    }

    fn worker_thread(
        worker: usize,
        receiver: Arc<Mutex<Receiver<BinRequest>>>,
        results: Sender<BinResult>,
        extractor: Arc<dyn DependencyExtractor>,
        graph: ProjectGraph,
    ) {
        tracing::debug!("Extraction worker {} started", worker);

        loop {
            let request = {
                let guard = match receiver.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                guard.recv()
            };
            let Ok(BinRequest { index, files }) = request else {
                tracing::debug!("Extraction worker {} shutting down", worker);
                break;
            };

            let result = extractor.extract(&graph, &files);
            if results.send((index, result)).is_err() {
                tracing::warn!("Extraction worker {} lost its coordinator", worker);
                break;
            }
        }
    }

    /// Queue every bin, wait for the pool to drain and tear it down.
    ///
    /// Triples come back concatenated in bin order. Any failing bin or
    /// crashed worker fails the whole run and partial results are dropped.
    pub fn run(self, bins: Vec<ProjectFileMap>) -> Result<Vec<ExplicitDependency>, ExtractionError> {
        let WorkerPool {
            sender,
            results,
            handles,
        } = self;

        let expected = bins.len();
        for (index, files) in bins.into_iter().enumerate() {
            if sender.send(BinRequest { index, files }).is_err() {
                // every worker is gone, the join below reports why
                break;
            }
        }
        drop(sender);

        let mut collected: Vec<BinResult> = results.iter().collect();

        for (worker, handle) in handles.into_iter().enumerate() {
            if let Err(payload) = handle.join() {
                return Err(ExtractionError::WorkerFailed {
                    worker,
                    message: panic_message(payload.as_ref()),
                });
            }
        }

        collected.sort_by_key(|(index, _)| *index);
        if collected.len() != expected {
            return Err(ExtractionError::WorkerFailed {
                worker: 0,
                message: format!("{} of {} bins returned no result", expected - collected.len(), expected),
            });
        }

        let mut dependencies = Vec::new();
        for (_, result) in collected {
            dependencies.extend(result.map_err(ExtractionError::Extractor)?);
        }
        Ok(dependencies)
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

//! Chunk generation scheduling - inline or on a background worker pool

use std::collections::HashSet;
use std::sync::Arc;

use glam::IVec3;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;

use crate::core::error::Error;
use crate::core::types::Result;
use crate::generation::GenerationPipeline;
use crate::voxel::block::BlockId;
use crate::voxel::chunk::{ChunkCoord, ChunkSize};

/// Everything a worker needs to generate one chunk.
///
/// Holds only immutable or owned data so it can cross threads.
#[derive(Clone, Debug)]
pub struct GenerationJob {
    pub coord: ChunkCoord,
    /// Slot ticket the result must match to be installed
    pub ticket: u64,
    pub size: ChunkSize,
    /// Overlay entries for this chunk at submit time
    pub edits: Vec<(IVec3, BlockId)>,
    pub pipeline: Arc<GenerationPipeline>,
}

impl GenerationJob {
    /// Run the pipeline
    pub fn run(self) -> GenerationOutput {
        let buffer = self.pipeline.generate(self.coord, self.size, &self.edits);
        GenerationOutput {
            coord: self.coord,
            ticket: self.ticket,
            blocks: buffer.into_ids(),
        }
    }

    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            coord: self.coord,
            ticket: self.ticket,
        }
    }
}

/// Finished block data for one chunk, in dense chunk order
#[derive(Clone, Debug)]
pub struct GenerationOutput {
    pub coord: ChunkCoord,
    pub ticket: u64,
    pub blocks: Vec<BlockId>,
}

/// Identifies a submitted job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    pub coord: ChunkCoord,
    pub ticket: u64,
}

/// Executes generation jobs. Completion order is unspecified.
pub trait GenerationScheduler {
    /// Queue a job. Never blocks on other jobs.
    fn submit(&mut self, job: GenerationJob) -> TaskHandle;

    /// Collect every finished job without blocking
    fn poll(&mut self) -> Vec<GenerationOutput>;

    /// Jobs submitted but not yet returned by [`Self::poll`]
    fn pending_count(&self) -> usize;
}

/// Runs each job to completion inside [`GenerationScheduler::submit`].
#[derive(Debug, Default)]
pub struct ImmediateScheduler {
    ready: Vec<GenerationOutput>,
}

impl ImmediateScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GenerationScheduler for ImmediateScheduler {
    fn submit(&mut self, job: GenerationJob) -> TaskHandle {
        let handle = job.handle();
        self.ready.push(job.run());
        handle
    }

    fn poll(&mut self) -> Vec<GenerationOutput> {
        std::mem::take(&mut self.ready)
    }

    fn pending_count(&self) -> usize {
        self.ready.len()
    }
}

/// Runs jobs on a dedicated tokio runtime and hands results back over a channel.
pub struct BackgroundScheduler {
    /// Sender cloned into each task
    result_tx: mpsc::UnboundedSender<GenerationOutput>,
    /// Channel for receiving finished jobs
    result_rx: mpsc::UnboundedReceiver<GenerationOutput>,
    /// Jobs in flight
    pending: HashSet<TaskHandle>,
    runtime: Runtime,
}

impl BackgroundScheduler {
    /// Start a runtime with `worker_threads` blocking workers
    pub fn new(worker_threads: usize) -> Result<Self> {
        let threads = worker_threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(threads)
            .thread_name("chunk-gen")
            .build()
            .map_err(|e| Error::Streaming(format!("failed to start generation runtime: {e}")))?;
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        log::debug!("Background generation started with {} workers", threads);

        Ok(Self {
            result_tx,
            result_rx,
            pending: HashSet::new(),
            runtime,
        })
    }
}

impl GenerationScheduler for BackgroundScheduler {
    fn submit(&mut self, job: GenerationJob) -> TaskHandle {
        let handle = job.handle();
        self.pending.insert(handle);

        let tx = self.result_tx.clone();
        self.runtime.spawn_blocking(move || {
            // Receiver gone means the scheduler was dropped; nothing to deliver to
            let _ = tx.send(job.run());
        });
        handle
    }

    fn poll(&mut self) -> Vec<GenerationOutput> {
        let mut results = Vec::new();

        while let Ok(output) = self.result_rx.try_recv() {
            self.pending.remove(&TaskHandle {
                coord: output.coord,
                ticket: output.ticket,
            });
            results.push(output);
        }

        results
    }

    fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

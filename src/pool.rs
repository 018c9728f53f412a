// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The compute worker pool.  A fixed number of worker threads is spawned
//! once per session and reused for every frame; each worker receives its
//! palette and frame-buffer references at spawn time and then serves
//! chunk jobs until the pool hangs up the job queue.
//!
//! Two axes of behavior are fixed when the pool is built.  The memory
//! regime decides whether a worker writes the shared frame buffer in
//! place or returns a private copy of its band with the reply.  The
//! dispatch discipline decides whether chunks are pre-assigned to
//! workers round-robin or pulled from one shared queue, where an idle
//! worker automatically absorbs the next unassigned chunk.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam::channel::{self, Receiver, Sender};

use kernel::{render_band, Band};
use palette::Palette;
use raster::SharedRaster;

/// How chunk results travel back to the orchestrator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemoryRegime {
    /// Workers write their band of the one shared frame buffer in place.
    /// No locking: the bands are disjoint by the chunk plan.
    Shared,
    /// Workers rasterize into a private buffer returned with the reply,
    /// and the orchestrator is the sole writer merging the copies.
    CopyBack,
}

/// How chunks are handed to workers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Chunk `i` is pre-assigned to worker `i % workers` and every chunk
    /// is fired at frame start.
    Interleaved,
    /// All workers pull from one shared queue.  A fast worker absorbs
    /// more chunks instead of idling while a slow one finishes its
    /// static share, which keeps the tail latency down when the deep
    /// black regions make per-chunk cost uneven.
    Rebalancing,
}

/// A unit of work: one band of the current frame.
#[derive(Copy, Clone, Debug)]
pub struct ChunkJob {
    /// Chunk index within the frame.
    pub task_id: usize,
    /// Byte offset of the destination band in the frame buffer.
    pub offset: usize,
    /// Band geometry and iteration bound.
    pub band: Band,
}

/// Reply for one completed chunk.
#[derive(Clone, Debug)]
pub struct ChunkDone {
    /// Chunk index, echoing the job.
    pub task_id: usize,
    /// Byte offset of the band, echoing the job.
    pub offset: usize,
    /// The band's bytes in the copy-back regime; `None` when the band
    /// was written to the shared buffer in place.
    pub payload: Option<Vec<u8>>,
    /// Wall-clock compute time for the chunk.
    pub elapsed_ms: f64,
}

enum JobQueue {
    Fanout(Vec<Sender<ChunkJob>>),
    Pull(Sender<ChunkJob>),
}

/// A fixed pool of compute workers, created once and reused across
/// frames.  Dropping the pool hangs up the job queue and joins every
/// worker.
pub struct WorkerPool {
    workers: usize,
    regime: MemoryRegime,
    raster: Arc<SharedRaster>,
    jobs: Option<JobQueue>,
    results: Receiver<ChunkDone>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `workers` threads.  Each worker's init state, the palette
    /// reference, the frame-buffer reference, and the regime, is handed
    /// over exactly once, here.
    pub fn new(
        workers: usize,
        frame_len: usize,
        palette: Arc<Palette>,
        regime: MemoryRegime,
        dispatch: Dispatch,
    ) -> WorkerPool {
        let raster = Arc::new(SharedRaster::new(frame_len));
        let (done_tx, done_rx) = channel::unbounded();
        let mut handles = Vec::with_capacity(workers);

        let jobs = match dispatch {
            Dispatch::Rebalancing => {
                let (job_tx, job_rx) = channel::unbounded::<ChunkJob>();
                for id in 0..workers {
                    handles.push(spawn_worker(
                        id,
                        job_rx.clone(),
                        done_tx.clone(),
                        palette.clone(),
                        raster.clone(),
                        regime,
                    ));
                }
                JobQueue::Pull(job_tx)
            }
            Dispatch::Interleaved => {
                let mut senders = Vec::with_capacity(workers);
                for id in 0..workers {
                    let (job_tx, job_rx) = channel::unbounded::<ChunkJob>();
                    handles.push(spawn_worker(
                        id,
                        job_rx,
                        done_tx.clone(),
                        palette.clone(),
                        raster.clone(),
                        regime,
                    ));
                    senders.push(job_tx);
                }
                JobQueue::Fanout(senders)
            }
        };

        info!("spawned {} compute workers ({:?}, {:?})", workers, regime, dispatch);
        WorkerPool {
            workers,
            regime,
            raster,
            jobs: Some(jobs),
            results: done_rx,
            handles,
        }
    }

    /// Memory regime fixed at construction.
    pub fn regime(&self) -> MemoryRegime {
        self.regime
    }

    /// The shared frame buffer.
    pub fn raster(&self) -> &SharedRaster {
        &self.raster
    }

    /// The reply channel carrying chunk completions.
    pub fn results(&self) -> &Receiver<ChunkDone> {
        &self.results
    }

    /// Queues one chunk.  A send can only fail once a worker has died,
    /// and that surfaces on the reply channel instead.
    pub fn submit(&self, job: ChunkJob) {
        match self.jobs {
            Some(JobQueue::Pull(ref tx)) => {
                tx.send(job).ok();
            }
            Some(JobQueue::Fanout(ref senders)) => {
                senders[job.task_id % self.workers].send(job).ok();
            }
            None => {}
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Hanging up the job queue lets the workers drain and exit.
        self.jobs.take();
        for handle in self.handles.drain(..) {
            handle.join().ok();
        }
    }
}

fn spawn_worker(
    id: usize,
    jobs: Receiver<ChunkJob>,
    done: Sender<ChunkDone>,
    palette: Arc<Palette>,
    raster: Arc<SharedRaster>,
    regime: MemoryRegime,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name(format!("mandelband-worker-{}", id))
        .spawn(move || {
            while let Ok(job) = jobs.recv() {
                let started = Instant::now();
                let payload = match regime {
                    MemoryRegime::Shared => {
                        // The chunk plan keeps bands disjoint within a
                        // frame, and the orchestrator collects every
                        // reply before dispatching the next frame.
                        let dest = unsafe { raster.band_mut(job.offset, job.band.len()) };
                        render_band(dest, &palette, &job.band);
                        None
                    }
                    MemoryRegime::CopyBack => {
                        let mut buf = vec![0u8; job.band.len()];
                        render_band(&mut buf, &palette, &job.band);
                        Some(buf)
                    }
                };
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                debug!("worker {} finished task {} in {:.1} ms", id, job.task_id, elapsed_ms);
                let reply = ChunkDone {
                    task_id: job.task_id,
                    offset: job.offset,
                    payload,
                    elapsed_ms,
                };
                if done.send(reply).is_err() {
                    break;
                }
            }
        })
        .expect("failed to spawn compute worker")
}

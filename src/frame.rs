//! The frame orchestrator.  Given a view rectangle it derives the
//! per-axis step sizes, dispatches every chunk of the frame to the
//! worker pool, and collects completions until the frame is whole.

use std::sync::Arc;
use std::time::Instant;

use chunks::{ChunkPlan, PlanError};
use kernel::Band;
use palette::Palette;
use planes::{DegenerateRect, FrameMapper, ViewRect};
use pool::{ChunkJob, Dispatch, MemoryRegime, WorkerPool};

/// Frame side length used when the caller does not pick one.
pub const DEFAULT_SIDE: usize = 1024;

/// Iteration bound used when the caller does not pick one.
pub const DEFAULT_MAX_ITER: u32 = 1000;

/// Pool size used when hardware concurrency cannot be detected.
pub const DEFAULT_WORKERS: usize = 4;

/// Detected hardware concurrency, with the documented fallback.
pub fn detect_workers() -> usize {
    let n = num_cpus::get();
    if n == 0 {
        DEFAULT_WORKERS
    } else {
        n
    }
}

/// Why a frame could not be rendered.
#[derive(Debug, Fail)]
pub enum RenderError {
    /// The view rectangle is inverted or empty on an axis.
    #[fail(display = "{}", _0)]
    Degenerate(#[fail(cause)] DegenerateRect),
    /// A worker died mid-frame.  The frame can never complete; there is
    /// no retry and no timeout.
    #[fail(display = "worker pool hung up before the frame completed")]
    PoolHangup,
}

impl From<DegenerateRect> for RenderError {
    fn from(err: DegenerateRect) -> RenderError {
        RenderError::Degenerate(err)
    }
}

/// Knobs fixed for the lifetime of a [`Renderer`].
#[derive(Copy, Clone, Debug)]
pub struct RendererConfig {
    /// Frame side length N, in pixels.
    pub side: usize,
    /// Iteration bound.
    pub max_iter: u32,
    /// Worker count; `None` means detected hardware concurrency.
    pub workers: Option<usize>,
    /// Memory regime for chunk results.
    pub regime: MemoryRegime,
    /// Dispatch discipline for chunk assignment.
    pub dispatch: Dispatch,
}

impl Default for RendererConfig {
    fn default() -> RendererConfig {
        RendererConfig {
            side: DEFAULT_SIDE,
            max_iter: DEFAULT_MAX_ITER,
            workers: None,
            regime: MemoryRegime::Shared,
            dispatch: Dispatch::Rebalancing,
        }
    }
}

/// One rendered frame: row-major RGBA bytes, top row first, with a row
/// stride of `4 * side` bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    side: usize,
    pixels: Vec<u8>,
}

impl Frame {
    /// Side length in pixels.
    pub fn side(&self) -> usize {
        self.side
    }

    /// The pixel bytes, directly consumable as an RGBA raster image.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consumes the frame, returning its pixel bytes.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// Timing report from the benchmark mode.
#[derive(Copy, Clone, Debug)]
pub struct BenchReport {
    /// Number of measured rounds.
    pub rounds: usize,
    /// Mean round duration in milliseconds.
    pub mean_ms: f64,
    /// Sample standard deviation of round durations in milliseconds.
    pub std_dev_ms: f64,
}

impl BenchReport {
    /// Mean and sample standard deviation over measured round durations.
    pub fn from_samples(samples_ms: &[f64]) -> BenchReport {
        let rounds = samples_ms.len();
        if rounds == 0 {
            return BenchReport {
                rounds: 0,
                mean_ms: 0.0,
                std_dev_ms: 0.0,
            };
        }
        let mean = samples_ms.iter().sum::<f64>() / (rounds as f64);
        let variance = if rounds > 1 {
            samples_ms.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>()
                / ((rounds - 1) as f64)
        } else {
            0.0
        };
        BenchReport {
            rounds,
            mean_ms: mean,
            std_dev_ms: variance.sqrt(),
        }
    }
}

/// Owns the palette, the chunk plan, and the worker pool, all built once
/// and reused for every frame of the session.
pub struct Renderer {
    plan: ChunkPlan,
    max_iter: u32,
    pool: WorkerPool,
}

impl Renderer {
    /// Builds a renderer with a freshly randomized palette.
    pub fn new(config: RendererConfig) -> Result<Renderer, PlanError> {
        Renderer::with_palette(config, Palette::generate(config.max_iter))
    }

    /// Builds a renderer around a caller-supplied palette.  Tests use
    /// this with fixed frequencies to get reproducible pixels.
    pub fn with_palette(config: RendererConfig, palette: Palette) -> Result<Renderer, PlanError> {
        let workers = config.workers.unwrap_or_else(detect_workers);
        let plan = ChunkPlan::new(config.side, workers)?;
        let pool = WorkerPool::new(
            workers,
            plan.frame_len(),
            Arc::new(palette),
            config.regime,
            config.dispatch,
        );
        Ok(Renderer {
            plan,
            max_iter: config.max_iter,
            pool,
        })
    }

    /// The partition this renderer dispatches.
    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    /// Renders one frame of the given view rectangle.
    ///
    /// Blocks until every chunk of this frame has completed.  A chunk
    /// counts as done only once its bytes are in the frame buffer, so
    /// in the copy-back regime the merge happens here, as replies
    /// arrive, in whatever order the workers finish.
    pub fn render(&mut self, view: ViewRect) -> Result<Frame, RenderError> {
        let side = self.plan.side();
        let mapper = FrameMapper::new(view, side)?;
        let started = Instant::now();

        let chunks = self.plan.chunks();
        for spec in &chunks {
            self.pool.submit(ChunkJob {
                task_id: spec.index,
                offset: spec.offset(),
                band: Band {
                    x0: view.lower_left.re,
                    y_top: view.upper_right.im,
                    dx: mapper.dx(),
                    dy: mapper.dy(),
                    cols: side,
                    row0: spec.start_row,
                    rows: spec.rows,
                    max_iter: self.max_iter,
                },
            });
        }

        let mut merged = match self.pool.regime() {
            MemoryRegime::CopyBack => Some(vec![0u8; self.plan.frame_len()]),
            MemoryRegime::Shared => None,
        };
        let mut done = 0;
        while done < chunks.len() {
            let reply = self
                .pool
                .results()
                .recv()
                .map_err(|_| RenderError::PoolHangup)?;
            if let (Some(bytes), Some(frame)) = (reply.payload.as_ref(), merged.as_mut()) {
                frame[reply.offset..reply.offset + bytes.len()].copy_from_slice(bytes);
            }
            debug!("task {} merged after {:.1} ms", reply.task_id, reply.elapsed_ms);
            done += 1;
        }

        let pixels = match merged {
            Some(frame) => frame,
            // Every chunk has replied, so nothing is writing the raster.
            None => unsafe { self.pool.raster().snapshot() },
        };
        info!(
            "frame of {} chunks computed in {:.3} s",
            done,
            started.elapsed().as_secs_f64()
        );
        Ok(Frame { side, pixels })
    }

    /// Benchmark mode: repeats [`render`](Renderer::render) over the
    /// same rectangle for `warmup` unmeasured rounds and then `rounds`
    /// measured ones, reporting wall-clock statistics.
    pub fn benchmark(
        &mut self,
        view: ViewRect,
        warmup: usize,
        rounds: usize,
    ) -> Result<BenchReport, RenderError> {
        for _ in 0..warmup {
            self.render(view)?;
        }
        let mut samples = Vec::with_capacity(rounds);
        for _ in 0..rounds {
            let started = Instant::now();
            self.render(view)?;
            samples.push(started.elapsed().as_secs_f64() * 1000.0);
        }
        Ok(BenchReport::from_samples(&samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_FREQS: [f64; 3] = [20.0, 25.0, 30.0];

    fn test_renderer(
        side: usize,
        workers: usize,
        regime: MemoryRegime,
        dispatch: Dispatch,
    ) -> Renderer {
        let config = RendererConfig {
            side,
            max_iter: 64,
            workers: Some(workers),
            regime,
            dispatch,
        };
        Renderer::with_palette(config, Palette::from_frequencies(64, TEST_FREQS)).unwrap()
    }

    fn home_view() -> ViewRect {
        ViewRect::new(-2.0, -1.5, 1.0, 1.5)
    }

    #[test]
    fn output_is_independent_of_worker_and_chunk_count() {
        // Two workers plan 64 chunks; nine workers plan 81, which also
        // exercises uneven bands (128 rows over 81 chunks).
        let a = test_renderer(128, 2, MemoryRegime::Shared, Dispatch::Rebalancing)
            .render(home_view())
            .unwrap();
        let b = test_renderer(128, 9, MemoryRegime::Shared, Dispatch::Rebalancing)
            .render(home_view())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn output_is_independent_of_dispatch_discipline() {
        let pulled = test_renderer(96, 4, MemoryRegime::Shared, Dispatch::Rebalancing)
            .render(home_view())
            .unwrap();
        let interleaved = test_renderer(96, 4, MemoryRegime::Shared, Dispatch::Interleaved)
            .render(home_view())
            .unwrap();
        assert_eq!(pulled, interleaved);
    }

    #[test]
    fn both_memory_regimes_agree_byte_for_byte() {
        let shared = test_renderer(64, 4, MemoryRegime::Shared, Dispatch::Rebalancing)
            .render(home_view())
            .unwrap();
        let copied = test_renderer(64, 4, MemoryRegime::CopyBack, Dispatch::Rebalancing)
            .render(home_view())
            .unwrap();
        assert_eq!(shared, copied);
    }

    #[test]
    fn the_pool_is_reused_across_frames() {
        let mut renderer = test_renderer(96, 4, MemoryRegime::Shared, Dispatch::Rebalancing);
        let first = renderer.render(home_view()).unwrap();
        let second = renderer.render(home_view()).unwrap();
        assert_eq!(first.pixels().len(), 4 * 96 * 96);
        assert_eq!(first, second);
    }

    #[test]
    fn inverted_rectangles_are_rejected() {
        let mut renderer = test_renderer(64, 2, MemoryRegime::Shared, Dispatch::Rebalancing);
        let inverted = ViewRect::new(1.0, -1.5, -2.0, 1.5);
        assert!(renderer.render(inverted).is_err());
    }

    #[test]
    fn zero_sized_configurations_are_rejected_up_front() {
        let config = RendererConfig {
            side: 0,
            ..Default::default()
        };
        assert!(Renderer::new(config).is_err());
        let config = RendererConfig {
            workers: Some(0),
            ..Default::default()
        };
        assert!(Renderer::new(config).is_err());
    }

    #[test]
    fn benchmark_reports_the_requested_rounds() {
        let mut renderer = test_renderer(32, 2, MemoryRegime::Shared, Dispatch::Rebalancing);
        let report = renderer.benchmark(home_view(), 1, 3).unwrap();
        assert_eq!(report.rounds, 3);
        assert!(report.mean_ms >= 0.0);
        assert!(report.std_dev_ms >= 0.0);
    }

    #[test]
    fn bench_statistics_match_by_hand_numbers() {
        let report = BenchReport::from_samples(&[10.0, 20.0, 30.0]);
        assert_eq!(report.rounds, 3);
        assert_eq!(report.mean_ms, 20.0);
        assert_eq!(report.std_dev_ms, 10.0);
    }
}

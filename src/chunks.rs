//! Partitions an N×N frame into horizontal band work units.  The black
//! interior of the set costs far more per pixel than escaped regions, so
//! the plan always produces more chunks than workers; portioning those
//! out keeps the variance in per-worker completion time low.

/// RGBA channels per pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Fewest chunks a plan will produce, before clamping to the frame side.
pub const MIN_CHUNKS: usize = 64;

/// Configurations rejected before any chunk is dispatched.
#[derive(Copy, Clone, Debug, Fail, PartialEq)]
pub enum PlanError {
    /// The frame has no pixels.
    #[fail(display = "frame side must be at least one pixel")]
    EmptyFrame,
    /// The pool has no workers, so no chunk could ever complete.
    #[fail(display = "worker pool must have at least one worker")]
    EmptyPool,
}

/// One horizontal band of contiguous rows, spanning every column of the
/// frame.  Identified by its index in dispatch order.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChunkSpec {
    /// Index in `0..num_chunks`.
    pub index: usize,
    /// First raster row of the band.
    pub start_row: usize,
    /// Number of rows in the band.
    pub rows: usize,
    /// Number of columns, always the frame side.
    pub cols: usize,
}

impl ChunkSpec {
    /// Byte offset of the band within the frame buffer.
    pub fn offset(&self) -> usize {
        self.start_row * self.cols * BYTES_PER_PIXEL
    }

    /// Length of the band in bytes.
    pub fn len(&self) -> usize {
        self.rows * self.cols * BYTES_PER_PIXEL
    }

    /// A band with no rows; a valid plan never produces one.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// The partition policy for one frame size and pool size.
///
/// `num_chunks` is `max(workers², 64)`, clamped to the frame side so no
/// band is ever empty.  When the side does not divide evenly, the first
/// `side % num_chunks` bands carry one extra row, so chunk sizes differ
/// by at most one row and the union of bands covers the raster exactly.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChunkPlan {
    side: usize,
    workers: usize,
    num_chunks: usize,
}

impl ChunkPlan {
    /// Computes the partition, rejecting empty frames and empty pools.
    pub fn new(side: usize, workers: usize) -> Result<ChunkPlan, PlanError> {
        if side == 0 {
            return Err(PlanError::EmptyFrame);
        }
        if workers == 0 {
            return Err(PlanError::EmptyPool);
        }
        let num_chunks = (workers * workers).max(MIN_CHUNKS).min(side);
        Ok(ChunkPlan {
            side,
            workers,
            num_chunks,
        })
    }

    /// Frame side length in pixels.
    pub fn side(&self) -> usize {
        self.side
    }

    /// Worker-pool size the plan was computed for.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of bands the frame is split into.
    pub fn num_chunks(&self) -> usize {
        self.num_chunks
    }

    /// Rows in a band before remainder distribution.
    pub fn rows_per_chunk(&self) -> usize {
        self.side / self.num_chunks
    }

    /// Total frame buffer length, `4 * side * side` bytes.
    pub fn frame_len(&self) -> usize {
        self.side * self.side * BYTES_PER_PIXEL
    }

    /// Enumerates the bands in dispatch order.
    pub fn chunks(&self) -> Vec<ChunkSpec> {
        let base = self.side / self.num_chunks;
        let extra = self.side % self.num_chunks;
        let mut specs = Vec::with_capacity(self.num_chunks);
        let mut start_row = 0;
        for index in 0..self.num_chunks {
            let rows = base + if index < extra { 1 } else { 0 };
            specs.push(ChunkSpec {
                index,
                start_row,
                rows,
                cols: self.side,
            });
            start_row += rows;
        }
        specs
    }
}

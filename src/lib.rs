#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Chunked parallel Mandelbrot renderer
//!
//! The Mandelbrot set takes a point on the complex plane and repeatedly
//! multiplies it by itself, measuring how quickly that number goes to
//! infinity.  That "velocity" is the escape count used to color the
//! image; points that never escape are members of the set and stay
//! black.  The math is a four-line recurrence.  The interesting part is
//! the evaluation engine around it: an N×N frame is cut into many more
//! horizontal bands than there are workers, the bands are portioned out
//! to a fixed pool of compute threads, and every band's bytes land in a
//! single frame buffer without a lock in sight, because no two bands
//! ever overlap.
//!
//! Results travel in one of two memory regimes.  In the shared regime
//! every worker writes its band of one common buffer in place; in the
//! copy-back regime each worker returns a private buffer that the
//! orchestrator merges.  Both produce byte-identical frames, so callers
//! never need to know which one is underneath.

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate num;
extern crate num_cpus;
extern crate rand;

pub mod chunks;
pub mod frame;
pub mod kernel;
pub mod palette;
pub mod planes;
mod pool;
mod raster;

pub use frame::{BenchReport, Frame, Renderer, RendererConfig};
pub use planes::ViewRect;
pub use pool::{Dispatch, MemoryRegime};

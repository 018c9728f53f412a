// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time kernel and the band kernel built on top of it.
//!
//! The escape-time function works on the squares of the orbit's real and
//! imaginary parts, which lets it test divergence without a square root
//! and lets it skip computing `b²` entirely whenever `a²` alone already
//! exceeds the bailout.

use chunks::BYTES_PER_PIXEL;
use itertools::iproduct;
use palette::Palette;

/// Squared-magnitude threshold beyond which an orbit is considered
/// divergent.
pub const BAILOUT: f64 = 10.0;

/// Number of iterations of `z = z² + c` before the orbit at the plane
/// point `(x, y)` exceeds the bailout, or `max_iter` if it never does.
///
/// Each iteration updates `a' = a² - b² + x` and `b' = 2ab + y`, then
/// checks `a'²` against the bailout before bothering with `b'²`, and
/// finally the full squared magnitude `a'² + b'²`.
pub fn escape_time(x: f64, y: f64, max_iter: u32) -> u32 {
    let (mut a, mut b) = (0.0_f64, 0.0_f64);
    let (mut aa, mut bb) = (0.0_f64, 0.0_f64);
    for i in 0..max_iter {
        let re = aa - bb + x;
        b = 2.0 * a * b + y;
        a = re;
        aa = a * a;
        if aa > BAILOUT {
            return i;
        }
        bb = b * b;
        if aa + bb > BAILOUT {
            return i;
        }
    }
    max_iter
}

/// Geometry and iteration bound for one horizontal band of a frame.
///
/// `row0` is the band's first row in whole-frame coordinates.  The plane
/// y-coordinate of a band row is always computed from the frame's top
/// edge as `y_top - (row0 + row) * dy`, so a pixel gets bit-identical
/// coordinates however the frame is cut into bands.
#[derive(Copy, Clone, Debug)]
pub struct Band {
    /// Plane x-coordinate of column 0.
    pub x0: f64,
    /// Plane y-coordinate of the frame's top edge.
    pub y_top: f64,
    /// Step along the real axis per column.
    pub dx: f64,
    /// Step along the imaginary axis per row.
    pub dy: f64,
    /// Columns in the band, always the frame side.
    pub cols: usize,
    /// First row of the band, in whole-frame coordinates.
    pub row0: usize,
    /// Rows in the band.
    pub rows: usize,
    /// Iteration bound.
    pub max_iter: u32,
}

impl Band {
    /// Band length in bytes.
    pub fn len(&self) -> usize {
        self.rows * self.cols * BYTES_PER_PIXEL
    }

    /// A band with no pixels.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

/// Rasterizes one band: computes the escape count of every pixel, looks
/// its color up in the palette, and writes 4 bytes per pixel into `dest`
/// in row-major order.  `dest` must be exactly `band.len()` bytes.
pub fn render_band(dest: &mut [u8], palette: &Palette, band: &Band) {
    debug_assert_eq!(dest.len(), band.len());
    for (row, col) in iproduct!(0..band.rows, 0..band.cols) {
        let x = band.x0 + (col as f64) * band.dx;
        let y = band.y_top - ((band.row0 + row) as f64) * band.dy;
        let count = escape_time(x, y, band.max_iter);
        let ofs = (row * band.cols + col) * BYTES_PER_PIXEL;
        dest[ofs..ofs + BYTES_PER_PIXEL].copy_from_slice(&palette.color(count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_origin_never_escapes() {
        assert_eq!(escape_time(0.0, 0.0, 1), 1);
        assert_eq!(escape_time(0.0, 0.0, 1000), 1000);
    }

    #[test]
    fn two_escapes_on_the_second_iteration() {
        // z goes 0 → 2 → 6; 4 is still under the bailout, 36 is not.
        assert_eq!(escape_time(2.0, 0.0, 1000), 1);
    }

    #[test]
    fn far_points_escape_immediately() {
        // a² alone busts the bailout.
        assert_eq!(escape_time(3.5, 0.0, 1000), 0);
        // a² stays under, the full magnitude does not.
        assert_eq!(escape_time(0.0, 3.2, 1000), 0);
    }

    #[test]
    fn the_period_two_cycle_is_a_member() {
        // c = -1 orbits 0 → -1 → 0 forever.
        assert_eq!(escape_time(-1.0, 0.0, 5000), 5000);
    }

    fn test_band(row0: usize, rows: usize, side: usize) -> Band {
        Band {
            x0: -2.0,
            y_top: 1.5,
            dx: 3.0 / (side as f64),
            dy: 3.0 / (side as f64),
            cols: side,
            row0,
            rows,
            max_iter: 50,
        }
    }

    #[test]
    fn banded_rendering_matches_whole_frame_rendering() {
        let side = 16;
        let palette = Palette::from_frequencies(50, [20.0, 25.0, 30.0]);

        let whole = test_band(0, side, side);
        let mut expected = vec![0u8; whole.len()];
        render_band(&mut expected, &palette, &whole);

        let (top, bottom) = (test_band(0, 7, side), test_band(7, 9, side));
        let mut actual = vec![0u8; expected.len()];
        {
            let (dst_top, dst_bottom) = actual.split_at_mut(top.len());
            render_band(dst_top, &palette, &top);
            render_band(dst_bottom, &palette, &bottom);
        }
        assert_eq!(actual, expected);
    }

    #[test]
    fn a_band_writes_opaque_pixels_only() {
        let palette = Palette::from_frequencies(50, [20.0, 25.0, 30.0]);
        let band = test_band(3, 2, 8);
        let mut dest = vec![0u8; band.len()];
        render_band(&mut dest, &palette, &band);
        for pixel in dest.chunks(BYTES_PER_PIXEL) {
            assert_eq!(pixel[3], 0xff);
        }
    }
}

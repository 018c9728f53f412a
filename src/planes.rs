//! Contains the ViewRect and FrameMapper structs, which describe the
//! relationship between a square raster with its origin at the top-left
//! corner and a rectangle on the complex plane with an arbitrary pair of
//! corners defining its lower-left and upper-right bounds.

use num::Complex;

/// A rectangular region of the complex plane, treating the real part of
/// each corner as the x-component and the imaginary part as the
/// y-component.  Construction is unchecked; a mis-ordered rectangle is
/// rejected when a [`FrameMapper`] is built from it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewRect {
    /// The lower-left corner (x0, y0).
    pub lower_left: Complex<f64>,
    /// The upper-right corner (x1, y1).
    pub upper_right: Complex<f64>,
}

impl ViewRect {
    /// Builds a rectangle from its four raw bounds.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> ViewRect {
        ViewRect {
            lower_left: Complex::new(x0, y0),
            upper_right: Complex::new(x1, y1),
        }
    }

    /// Extent along the real axis.
    pub fn width(&self) -> f64 {
        self.upper_right.re - self.lower_left.re
    }

    /// Extent along the imaginary axis.
    pub fn height(&self) -> f64 {
        self.upper_right.im - self.lower_left.im
    }
}

/// Error for a view rectangle whose corners are not strictly ordered.
/// Such a rectangle would produce a mirrored or empty image, so callers
/// must normalize their selection before rendering.
#[derive(Debug, Fail, PartialEq)]
#[fail(
    display = "degenerate view rectangle {:?}: x1 must exceed x0 and y1 must exceed y0",
    view
)]
pub struct DegenerateRect {
    /// The offending rectangle.
    pub view: ViewRect,
}

/// Maps pixels of an N×N raster to points on the complex plane.
///
/// The raster row index grows downward while the plane's imaginary axis
/// grows upward, so row 0 sits at the rectangle's top edge and the
/// mapping subtracts `py * dy` from y1.
#[derive(Copy, Clone, Debug)]
pub struct FrameMapper {
    view: ViewRect,
    side: usize,
    dx: f64,
    dy: f64,
}

impl FrameMapper {
    /// Derives the per-axis step sizes for a raster of `side` pixels.
    /// Fails if the rectangle is inverted or empty on either axis.
    pub fn new(view: ViewRect, side: usize) -> Result<FrameMapper, DegenerateRect> {
        if !(view.upper_right.re > view.lower_left.re)
            || !(view.upper_right.im > view.lower_left.im)
        {
            return Err(DegenerateRect { view });
        }

        Ok(FrameMapper {
            view,
            side,
            dx: view.width() / (side as f64),
            dy: view.height() / (side as f64),
        })
    }

    /// The rectangle this mapper was built from.
    pub fn view(&self) -> ViewRect {
        self.view
    }

    /// Raster side length in pixels.
    pub fn side(&self) -> usize {
        self.side
    }

    /// Step size along the real axis, per pixel column.
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Step size along the imaginary axis, per pixel row.
    pub fn dy(&self) -> f64 {
        self.dy
    }

    /// Given the column and row of a pixel, returns the complex number at
    /// the equivalent location on the plane: `(x0 + px*dx, y1 - py*dy)`.
    pub fn pixel_to_plane(&self, px: usize, py: usize) -> Complex<f64> {
        Complex::new(
            self.view.lower_left.re + (px as f64) * self.dx,
            self.view.upper_right.im - (py as f64) * self.dy,
        )
    }
}

/// Rounds a plane coordinate to three decimal digits for on-screen
/// position readouts.
pub fn round_coord(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapper_fails_on_bad_shape() {
        let inverted = ViewRect::new(1.0, -1.5, -2.0, 1.5);
        assert!(FrameMapper::new(inverted, 4).is_err());
        let flat = ViewRect::new(-2.0, 1.5, 1.0, 1.5);
        assert!(FrameMapper::new(flat, 4).is_err());
    }

    #[test]
    fn mapper_passes_on_good_shape() {
        let view = ViewRect::new(-2.0, -1.5, 1.0, 1.5);
        assert!(FrameMapper::new(view, 4).is_ok());
    }

    #[test]
    fn pixel_to_plane_hits_the_corners() {
        let view = ViewRect::new(-2.0, -1.5, 1.0, 1.5);
        let mapper = FrameMapper::new(view, 1024).unwrap();
        assert_eq!(mapper.pixel_to_plane(0, 0), Complex::new(-2.0, 1.5));
        assert_eq!(mapper.pixel_to_plane(1024, 1024), Complex::new(1.0, -1.5));
        assert_eq!(mapper.pixel_to_plane(1024, 0), Complex::new(1.0, 1.5));
    }

    #[test]
    fn pixel_to_plane_descends_in_y() {
        let view = ViewRect::new(-2.0, -2.0, 2.0, 2.0);
        let mapper = FrameMapper::new(view, 4).unwrap();
        assert_eq!(mapper.pixel_to_plane(2, 2), Complex::new(0.0, 0.0));
        assert_eq!(mapper.pixel_to_plane(2, 3), Complex::new(0.0, -1.0));
    }

    #[test]
    fn step_sizes_match_the_rectangle() {
        let view = ViewRect::new(-2.0, -1.5, 1.0, 1.5);
        let mapper = FrameMapper::new(view, 1024).unwrap();
        assert_eq!(mapper.dx(), 3.0 / 1024.0);
        assert_eq!(mapper.dy(), 3.0 / 1024.0);
    }

    #[test]
    fn coords_round_to_three_digits() {
        assert_eq!(round_coord(0.1234), 0.123);
        assert_eq!(round_coord(2.71828), 2.718);
        assert_eq!(round_coord(-1.23449), -1.234);
    }
}

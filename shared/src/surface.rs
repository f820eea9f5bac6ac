// Overlay surface contract.
//
// One logical overlay is two adjacent windows, top half and bottom half.
// The shell treats a single window covering a whole display as an exclusive
// fullscreen app and switches on Focus Assist, which silences every
// notification. Two half-height windows cover the same pixels without
// matching that heuristic. Implementations must apply every change
// (opacity, click-through, z-order) to both halves.

use crate::display::Rect;
use crate::error::Result;

pub trait OverlaySurface {
    /// Opacity in percent, already clamped to 0..=100 by the caller.
    fn set_opacity(&mut self, percent: u8);

    /// Flip pointer pass-through in place; never recreates the windows.
    fn set_click_through(&mut self, enabled: bool);

    /// Re-assert top of the z-order without moving, resizing or activating.
    fn bring_to_front(&self);

    /// Release the platform windows. Safe to call more than once.
    fn destroy(&mut self);
}

pub trait SurfaceFactory {
    type Surface: OverlaySurface;

    fn create(&mut self, bounds: Rect, opacity: u8, click_through: bool) -> Result<Self::Surface>;
}

/// Split a display rectangle into top and bottom halves that share an edge
/// and together cover it exactly. Odd heights give the extra row to the
/// bottom half.
pub fn split_halves(bounds: Rect) -> [Rect; 2] {
    let top_height = bounds.height / 2;
    [
        Rect::new(bounds.x, bounds.y, bounds.width, top_height),
        Rect::new(
            bounds.x,
            bounds.y + top_height,
            bounds.width,
            bounds.height - top_height,
        ),
    ]
}

/// Linear 0..=100 percent to 0..=255 alpha, rounded to nearest.
pub fn alpha_from_percent(percent: u8) -> u8 {
    let percent = u32::from(percent.min(100));
    ((percent * 255 + 50) / 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_cover_display_without_overlap() {
        let display = Rect::new(-1920, 120, 1920, 1081);
        let [top, bottom] = split_halves(display);
        assert_eq!(top, Rect::new(-1920, 120, 1920, 540));
        assert_eq!(bottom, Rect::new(-1920, 660, 1920, 541));
        assert_eq!(top.y + top.height, bottom.y);
        assert_eq!(top.height + bottom.height, display.height);
    }

    #[test]
    fn alpha_is_linear_with_fixed_ends() {
        assert_eq!(alpha_from_percent(0), 0);
        assert_eq!(alpha_from_percent(50), 128);
        assert_eq!(alpha_from_percent(100), 255);
        assert_eq!(alpha_from_percent(200), 255);
    }
}

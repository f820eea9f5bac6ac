// Live display topology as reported by the OS on each query.

use std::fmt;

/// Opaque per-session display handle. Not stable across reboots or
/// reconnects; use a [`StableKey`](crate::identity::StableKey) for anything
/// that is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayId(pub isize);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

/// Screen rectangle in virtual-desktop pixels (taskbar area included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    pub id: DisplayId,
    pub bounds: Rect,
    pub is_primary: bool,
}

/// Source of the live display list. Must be cheap: it is queried on every
/// blackout and every re-diff.
pub trait DisplayTopology {
    fn list_displays(&self) -> Vec<Display>;

    fn primary_display_id(&self) -> Option<DisplayId> {
        self.list_displays()
            .into_iter()
            .find(|d| d.is_primary)
            .map(|d| d.id)
    }
}

/// Left-to-right order used wherever displays are visited positionally.
/// Ties on X fall back to Y and then the id so the order is total.
pub fn sort_left_to_right(displays: &mut [Display]) {
    displays.sort_by_key(|d| (d.bounds.x, d.bounds.y, d.id));
}

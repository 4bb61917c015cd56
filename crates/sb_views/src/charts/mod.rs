//! Chart encodings of a [`ChartSeries`](sb_core::ChartSeries): pure geometry
//! in [`geometry`], SVG markup in [`svg`].

pub mod geometry;
pub mod svg;

pub use geometry::*;
pub use svg::render;

/// Fixed series palette, indexed by datum position modulo its length.
pub const PALETTE: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
    "#F8B739", "#52B788",
];

pub fn color_for(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Which datum, if any, the pointer is over. Rendering reads it and never
/// touches the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HoverState(Option<usize>);

impl HoverState {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn at(index: usize) -> Self {
        Self(Some(index))
    }

    pub fn index(&self) -> Option<usize> {
        self.0
    }

    pub fn is_hovered(&self, index: usize) -> bool {
        self.0 == Some(index)
    }
}

impl From<Option<usize>> for HoverState {
    fn from(value: Option<usize>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_wraps() {
        assert_eq!(color_for(0), "#FF6B6B");
        assert_eq!(color_for(9), "#52B788");
        assert_eq!(color_for(10), color_for(0));
        assert_eq!(color_for(23), "#FFA07A");
    }

    #[test]
    fn test_hover_state() {
        let hover = HoverState::at(2);
        assert!(hover.is_hovered(2));
        assert!(!hover.is_hovered(1));
        assert_eq!(HoverState::from(None), HoverState::none());
    }
}

use sb_core::ChartSeries;

use super::color_for;

pub const PIE_CENTER: f64 = 160.0;
pub const PIE_RADIUS: f64 = 130.0;
pub const DONUT_INNER_RADIUS: f64 = 70.0;

/// Longest horizontal bar, in percent of the track.
pub const HBAR_MAX_WIDTH: f64 = 100.0;
/// Tallest vertical bar, in pixels.
pub const VBAR_MAX_HEIGHT: f64 = 220.0;

pub const LINE_LEFT: f64 = 100.0;
pub const LINE_SPAN: f64 = 700.0;
pub const LINE_BASELINE: f64 = 280.0;
pub const LINE_HEIGHT: f64 = 230.0;

// Sweeps this close to a full turn are drawn as a closed circle.
const FULL_TURN_EPSILON: f64 = 1e-9;

/// A pie or donut segment. Angles are chart degrees: 0 is 12 o'clock and
/// they grow clockwise up to 360.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub label: String,
    pub value: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub color: &'static str,
}

impl Segment {
    pub fn sweep(&self) -> f64 {
        self.end_angle - self.start_angle
    }

    pub fn large_arc(&self) -> bool {
        self.sweep() > 180.0
    }

    pub fn is_full_turn(&self) -> bool {
        self.sweep() >= 360.0 - FULL_TURN_EPSILON
    }

    /// Share of the whole in percent.
    pub fn percent(&self) -> f64 {
        self.sweep() / 360.0 * 100.0
    }

    pub fn mid_angle(&self) -> f64 {
        self.start_angle + self.sweep() / 2.0
    }
}

/// Splits 360 degrees among the data in proportion to their values.
/// Negative values count as zero; a zero total yields no segments.
pub fn partition(series: &ChartSeries) -> Vec<Segment> {
    let total = series.total();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut cumulative = 0.0;
    series
        .data
        .iter()
        .enumerate()
        .map(|(index, datum)| {
            let value = datum.value.max(0.0);
            let start_angle = cumulative;
            cumulative += value / total * 360.0;
            Segment {
                index,
                label: datum.label.clone(),
                value: datum.value,
                start_angle,
                end_angle: cumulative,
                color: color_for(index),
            }
        })
        .collect()
}

/// Point at chart-degree `angle` on the circle; drawing is offset by -90
/// degrees so that 0 lands at 12 o'clock.
pub fn polar(cx: f64, cy: f64, radius: f64, angle: f64) -> (f64, f64) {
    let radians = (angle - 90.0).to_radians();
    (cx + radius * radians.cos(), cy + radius * radians.sin())
}

fn fmt(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    // avoid "-0" in output
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{}", rounded)
    }
}

fn circle_path(c: f64, r: f64, clockwise: bool) -> String {
    let sweep = if clockwise { 1 } else { 0 };
    format!(
        "M {c} {top} A {r} {r} 0 1 {s} {c} {bottom} A {r} {r} 0 1 {s} {c} {top}",
        c = fmt(c),
        top = fmt(c - r),
        bottom = fmt(c + r),
        r = fmt(r),
        s = sweep
    )
}

/// SVG path of a pie slice.
pub fn pie_slice_path(segment: &Segment) -> String {
    let (c, r) = (PIE_CENTER, PIE_RADIUS);
    if segment.is_full_turn() {
        return format!("{} Z", circle_path(c, r, true));
    }
    let (x1, y1) = polar(c, c, r, segment.start_angle);
    let (x2, y2) = polar(c, c, r, segment.end_angle);
    format!(
        "M {c} {c} L {} {} A {r} {r} 0 {} 1 {} {} Z",
        fmt(x1),
        fmt(y1),
        segment.large_arc() as u8,
        fmt(x2),
        fmt(y2),
        c = fmt(c),
        r = fmt(r)
    )
}

/// SVG path of a donut ring segment; a full turn is an outer circle with the
/// inner circle cut out (fill-rule evenodd).
pub fn donut_segment_path(segment: &Segment) -> String {
    let (c, outer, inner) = (PIE_CENTER, PIE_RADIUS, DONUT_INNER_RADIUS);
    if segment.is_full_turn() {
        return format!("{} {} Z", circle_path(c, outer, true), circle_path(c, inner, false));
    }
    let (x1, y1) = polar(c, c, outer, segment.start_angle);
    let (x2, y2) = polar(c, c, outer, segment.end_angle);
    let (x3, y3) = polar(c, c, inner, segment.end_angle);
    let (x4, y4) = polar(c, c, inner, segment.start_angle);
    let large = segment.large_arc() as u8;
    format!(
        "M {} {} A {R} {R} 0 {large} 1 {} {} L {} {} A {r} {r} 0 {large} 0 {} {} Z",
        fmt(x1),
        fmt(y1),
        fmt(x2),
        fmt(y2),
        fmt(x3),
        fmt(y3),
        fmt(x4),
        fmt(y4),
        R = fmt(outer),
        r = fmt(inner),
        large = large
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub index: usize,
    pub label: String,
    pub value: f64,
    /// Width in percent for horizontal bars, height in pixels for vertical ones.
    pub length: f64,
    pub color: &'static str,
}

fn bars(series: &ChartSeries, scale: f64) -> Vec<Bar> {
    let max = series.max_value();
    series
        .data
        .iter()
        .enumerate()
        .map(|(index, datum)| {
            let length = if max > 0.0 {
                datum.value.max(0.0) / max * scale
            } else {
                0.0
            };
            Bar {
                index,
                label: datum.label.clone(),
                value: datum.value,
                length,
                color: color_for(index),
            }
        })
        .collect()
}

pub fn horizontal_bars(series: &ChartSeries) -> Vec<Bar> {
    bars(series, HBAR_MAX_WIDTH)
}

pub fn vertical_bars(series: &ChartSeries) -> Vec<Bar> {
    bars(series, VBAR_MAX_HEIGHT)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Plot positions for line and area charts. A single datum sits at the left
/// edge; a zero maximum puts every point on the baseline.
pub fn line_points(series: &ChartSeries) -> Vec<Point> {
    let n = series.data.len();
    let max = series.max_value();
    let step = if n > 1 { LINE_SPAN / (n - 1) as f64 } else { 0.0 };
    series
        .data
        .iter()
        .enumerate()
        .map(|(i, datum)| {
            let rise = if max > 0.0 {
                datum.value.max(0.0) / max * LINE_HEIGHT
            } else {
                0.0
            };
            Point {
                x: LINE_LEFT + i as f64 * step,
                y: LINE_BASELINE - rise,
            }
        })
        .collect()
}

/// Connecting path through the points; `None` for fewer than two.
pub fn line_path(points: &[Point]) -> Option<String> {
    if points.len() < 2 {
        return None;
    }
    let segments: Vec<String> = points
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{} {} {}", if i == 0 { "M" } else { "L" }, fmt(p.x), fmt(p.y)))
        .collect();
    Some(segments.join(" "))
}

/// Line path closed down to the baseline; `None` for fewer than two points.
pub fn area_path(points: &[Point]) -> Option<String> {
    let line = line_path(points)?;
    let first = points.first()?;
    let last = points.last()?;
    Some(format!(
        "M {} {} L{} L {} {} Z",
        fmt(first.x),
        fmt(LINE_BASELINE),
        line.trim_start_matches('M'),
        fmt(last.x),
        fmt(LINE_BASELINE)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_core::{ChartDatum, ChartKind};

    fn series(values: &[(&str, f64)]) -> ChartSeries {
        ChartSeries::new(
            ChartKind::Pie,
            "Distribution",
            values.iter().map(|(l, v)| ChartDatum::new(*l, *v)).collect(),
        )
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_two_segment_partition() {
        let segments = partition(&series(&[("A", 30.0), ("B", 70.0)]));
        assert_eq!(segments.len(), 2);
        assert!(close(segments[0].start_angle, 0.0));
        assert!(close(segments[0].end_angle, 108.0));
        assert!(close(segments[1].start_angle, 108.0));
        assert!(close(segments[1].end_angle, 360.0));
        assert!(!segments[0].large_arc());
        assert!(segments[1].large_arc());
        assert!(close(segments[1].percent(), 70.0));
    }

    #[test]
    fn test_sweeps_sum_to_full_turn() {
        let segments = partition(&series(&[("a", 1.0), ("b", 2.5), ("c", 7.25), ("d", 0.0), ("e", 3.0)]));
        let sum: f64 = segments.iter().map(Segment::sweep).sum();
        assert!((sum - 360.0).abs() < 1e-6);
        for pair in segments.windows(2) {
            assert!(close(pair[0].end_angle, pair[1].start_angle));
        }
    }

    #[test]
    fn test_negative_values_are_clamped() {
        let segments = partition(&series(&[("a", -5.0), ("b", 5.0)]));
        assert!(close(segments[0].sweep(), 0.0));
        assert!(segments[1].is_full_turn());
        assert_eq!(segments[0].value, -5.0);
    }

    #[test]
    fn test_zero_total_has_no_segments() {
        assert!(partition(&series(&[("a", 0.0), ("b", 0.0)])).is_empty());
        assert!(partition(&series(&[])).is_empty());
    }

    #[test]
    fn test_single_datum_is_full_circle() {
        let segments = partition(&series(&[("only", 4.0)]));
        assert_eq!(segments.len(), 1);
        assert!(segments[0].is_full_turn());
        let path = pie_slice_path(&segments[0]);
        assert_eq!(path, "M 160 30 A 130 130 0 1 1 160 290 A 130 130 0 1 1 160 30 Z");
        let ring = donut_segment_path(&segments[0]);
        assert!(ring.contains("A 70 70 0 1 0"));
    }

    #[test]
    fn test_polar_offset() {
        let (x, y) = polar(PIE_CENTER, PIE_CENTER, PIE_RADIUS, 0.0);
        assert!(close(x, 160.0));
        assert!(close(y, 30.0));
        let (x, y) = polar(PIE_CENTER, PIE_CENTER, PIE_RADIUS, 90.0);
        assert!(close(x, 290.0));
        assert!((y - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_pie_slice_path() {
        let segments = partition(&series(&[("A", 25.0), ("B", 75.0)]));
        assert_eq!(pie_slice_path(&segments[0]), "M 160 160 L 160 30 A 130 130 0 0 1 290 160 Z");
        assert_eq!(pie_slice_path(&segments[1]), "M 160 160 L 290 160 A 130 130 0 1 1 160 30 Z");
    }

    #[test]
    fn test_donut_shares_pie_partition() {
        let s = series(&[("A", 25.0), ("B", 75.0)]);
        let pie = partition(&s);
        let mut donut = s.clone();
        donut.chart_type = ChartKind::Donut;
        assert_eq!(partition(&donut), pie);
        assert_eq!(
            donut_segment_path(&pie[0]),
            "M 160 30 A 130 130 0 0 1 290 160 L 230 160 A 70 70 0 0 0 160 90 Z"
        );
    }

    #[test]
    fn test_bar_lengths() {
        let s = series(&[("a", 50.0), ("b", 100.0), ("c", 0.0)]);
        let h: Vec<f64> = horizontal_bars(&s).iter().map(|b| b.length).collect();
        assert_eq!(h, vec![50.0, 100.0, 0.0]);
        let v: Vec<f64> = vertical_bars(&s).iter().map(|b| b.length).collect();
        assert_eq!(v, vec![110.0, 220.0, 0.0]);
    }

    #[test]
    fn test_bars_with_zero_max() {
        let s = series(&[("a", 0.0), ("b", 0.0)]);
        assert!(horizontal_bars(&s).iter().all(|b| b.length == 0.0));
        assert!(vertical_bars(&s).iter().all(|b| b.length == 0.0));
    }

    #[test]
    fn test_line_points() {
        let points = line_points(&series(&[("a", 0.0), ("b", 50.0), ("c", 100.0)]));
        assert_eq!(points[0], Point { x: 100.0, y: 280.0 });
        assert_eq!(points[1], Point { x: 450.0, y: 165.0 });
        assert_eq!(points[2], Point { x: 800.0, y: 50.0 });
        assert_eq!(
            line_path(&points).unwrap(),
            "M 100 280 L 450 165 L 800 50"
        );
        assert_eq!(
            area_path(&points).unwrap(),
            "M 100 280 L 100 280 L 450 165 L 800 50 L 800 280 Z"
        );
    }

    #[test]
    fn test_single_point_has_no_path() {
        let points = line_points(&series(&[("only", 7.0)]));
        assert_eq!(points, vec![Point { x: 100.0, y: 50.0 }]);
        assert!(line_path(&points).is_none());
        assert!(area_path(&points).is_none());
    }

    #[test]
    fn test_zero_max_sits_on_baseline() {
        let points = line_points(&series(&[("a", 0.0), ("b", 0.0)]));
        assert!(points.iter().all(|p| p.y == LINE_BASELINE));
    }
}

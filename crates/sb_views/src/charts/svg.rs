use std::fmt::Write;

use sb_core::{ChartKind, ChartSeries};

use super::geometry::*;
use super::HoverState;

const LINE_COLOR: &str = "#0088FE";
const AREA_COLOR: &str = "#00C49F";

/// Renders `series` as a standalone SVG document in the requested encoding.
/// The hovered datum, if any, is emphasized and gets a value tooltip.
pub fn render(series: &ChartSeries, kind: ChartKind, hover: HoverState) -> String {
    if series.is_empty() {
        return no_data(320, 320);
    }
    let body = match kind {
        ChartKind::Pie => pie(series, hover),
        ChartKind::Donut => donut(series, hover),
        ChartKind::Bar => hbar(series, hover),
        ChartKind::Column => vbar(series, hover),
        ChartKind::Line => line(series, hover, false),
        ChartKind::Area => line(series, hover, true),
    };
    tracing::debug!("rendered {} chart with {} data", kind, series.data.len());
    body
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn open(width: u32, height: u32, kind: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" data-chart="{kind}">"#,
        w = width,
        h = height,
        kind = kind
    )
}

fn no_data(width: u32, height: u32) -> String {
    format!(
        r##"{}<text x="{}" y="{}" text-anchor="middle" font-size="18" fill="#666">No data</text></svg>"##,
        open(width, height, "empty"),
        width / 2,
        height / 2
    )
}

fn tooltip(out: &mut String, x: f64, y: f64, text: &str) {
    let _ = write!(
        out,
        r##"<text class="tooltip" x="{:.2}" y="{:.2}" text-anchor="middle" font-size="15" font-weight="600" fill="#000">{}</text>"##,
        x,
        y,
        escape(text)
    );
}

fn hover_attrs(hover: HoverState, index: usize) -> &'static str {
    if hover.is_hovered(index) {
        r#" class="hovered" opacity="1""#
    } else if hover.index().is_some() {
        r#" opacity="0.6""#
    } else {
        ""
    }
}

fn with_unit(value: f64, unit: &str) -> String {
    if unit.is_empty() {
        format!("{}", value)
    } else {
        format!("{} {}", value, unit)
    }
}

fn pie(series: &ChartSeries, hover: HoverState) -> String {
    let segments = partition(series);
    if segments.is_empty() {
        return no_data(320, 320);
    }
    let mut out = open(320, 320, "pie");
    for segment in &segments {
        let _ = write!(
            out,
            r#"<path d="{}" fill="{}" stroke="white" stroke-width="3"{}/>"#,
            pie_slice_path(segment),
            segment.color,
            hover_attrs(hover, segment.index)
        );
    }
    if let Some(segment) = hover.index().and_then(|i| segments.get(i)) {
        let (x, y) = polar(PIE_CENTER, PIE_CENTER, PIE_RADIUS * 0.6, segment.mid_angle());
        tooltip(
            &mut out,
            x,
            y,
            &format!("{}: {} ({:.1}%)", segment.label, segment.value, segment.percent()),
        );
    }
    out.push_str("</svg>");
    out
}

fn donut(series: &ChartSeries, hover: HoverState) -> String {
    let segments = partition(series);
    if segments.is_empty() {
        return no_data(320, 320);
    }
    let mut out = open(320, 320, "donut");
    for segment in &segments {
        let _ = write!(
            out,
            r#"<path d="{}" fill="{}" fill-rule="evenodd" stroke="white" stroke-width="3"{}/>"#,
            donut_segment_path(segment),
            segment.color,
            hover_attrs(hover, segment.index)
        );
    }
    let _ = write!(
        out,
        r##"<text x="160" y="165" text-anchor="middle" font-size="28" font-weight="bold" fill="#000">Total</text><text class="total" x="160" y="190" text-anchor="middle" font-size="20" fill="#666">{}</text>"##,
        series.total()
    );
    if let Some(segment) = hover.index().and_then(|i| segments.get(i)) {
        let radius = (PIE_RADIUS + DONUT_INNER_RADIUS) / 2.0;
        let (x, y) = polar(PIE_CENTER, PIE_CENTER, radius, segment.mid_angle());
        tooltip(
            &mut out,
            x,
            y,
            &format!("{}: {} ({:.1}%)", segment.label, segment.value, segment.percent()),
        );
    }
    out.push_str("</svg>");
    out
}

fn hbar(series: &ChartSeries, hover: HoverState) -> String {
    const ROW: f64 = 56.0;
    const TRACK: f64 = 600.0;
    let bars = horizontal_bars(series);
    let height = (bars.len() as f64 * ROW + 20.0) as u32;
    let mut out = open(800, height, "bar");
    for bar in &bars {
        let y = 10.0 + bar.index as f64 * ROW;
        let _ = write!(
            out,
            r##"<text x="0" y="{:.2}" font-size="15" font-weight="700" fill="#000">{}</text><rect x="0" y="{:.2}" width="{:.2}" height="28" rx="10" fill="{}"{}/>"##,
            y + 14.0,
            escape(&bar.label),
            y + 20.0,
            bar.length / HBAR_MAX_WIDTH * TRACK,
            bar.color,
            hover_attrs(hover, bar.index)
        );
        if hover.is_hovered(bar.index) {
            let x = bar.length / HBAR_MAX_WIDTH * TRACK + 80.0;
            tooltip(
                &mut out,
                x,
                y + 40.0,
                &format!("{}: {}", bar.label, with_unit(bar.value, &series.unit)),
            );
        }
    }
    out.push_str("</svg>");
    out
}

fn vbar(series: &ChartSeries, hover: HoverState) -> String {
    const SLOT: f64 = 90.0;
    const FLOOR: f64 = 260.0;
    let bars = vertical_bars(series);
    let width = (bars.len() as f64 * SLOT + 20.0).max(320.0) as u32;
    let mut out = open(width, 300, "column");
    for bar in &bars {
        let x = 30.0 + bar.index as f64 * SLOT;
        let _ = write!(
            out,
            r##"<rect x="{:.2}" y="{:.2}" width="50" height="{:.2}" fill="{}"{}/><text x="{:.2}" y="{:.2}" text-anchor="middle" font-size="11" font-weight="600" fill="#000">{}</text>"##,
            x,
            FLOOR - bar.length,
            bar.length,
            bar.color,
            hover_attrs(hover, bar.index),
            x + 25.0,
            FLOOR + 18.0,
            escape(&bar.label)
        );
        if hover.is_hovered(bar.index) {
            tooltip(&mut out, x + 25.0, FLOOR - bar.length - 10.0, &format!("{}", bar.value));
        }
    }
    out.push_str("</svg>");
    out
}

fn line(series: &ChartSeries, hover: HoverState, filled: bool) -> String {
    let points = line_points(series);
    let (kind, color) = if filled { ("area", AREA_COLOR) } else { ("line", LINE_COLOR) };
    let mut out = open(900, 350, kind);

    let path = if filled { area_path(&points) } else { line_path(&points) };
    if let Some(d) = path {
        let fill = if filled { color } else { "none" };
        let _ = write!(
            out,
            r#"<path d="{}" fill="{}" fill-opacity="0.4" stroke="{}" stroke-width="4"/>"#,
            d, fill, color
        );
    }
    for (i, (point, datum)) in points.iter().zip(&series.data).enumerate() {
        let radius = if hover.is_hovered(i) { 10 } else { 8 };
        let _ = write!(
            out,
            r##"<circle cx="{:.2}" cy="{:.2}" r="{}" fill="{}" stroke="white" stroke-width="3"/><text x="{:.2}" y="310" text-anchor="middle" font-size="14" font-weight="600" fill="#000">{}</text>"##,
            point.x,
            point.y,
            radius,
            color,
            point.x,
            escape(&datum.label)
        );
        if hover.is_hovered(i) {
            tooltip(&mut out, point.x, point.y - 20.0, &format!("{}: {}", datum.label, datum.value));
        }
    }
    out.push_str("</svg>");
    out
}

//! Chart rendering on plotters
//!
//! A [`Figure`] is one image holding one or more panels on a grid. Every
//! render call takes its data and an explicit [`ChartStyle`]; nothing is
//! cached between calls. Images are SVG by default and PNG when the crate
//! is built with the `png` feature.

use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// File extension of every image this build writes
#[cfg(feature = "png")]
pub const EXTENSION: &str = "png";
#[cfg(not(feature = "png"))]
pub const EXTENSION: &str = "svg";

/// `stem` plus the image extension of this build
pub fn file_name(stem: &str) -> String {
    format!("{stem}.{EXTENSION}")
}

/// Visual parameters shared by every chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    /// Pixel size of the whole image, whatever the panel count
    pub width: u32,
    pub height: u32,
    pub font_family: String,
    pub font_size: u32,
    pub title_size: u32,
    /// `#RRGGBB`
    pub background: String,
    /// Draw the light mesh behind each panel
    pub grid: bool,
    /// `#RRGGBB` series colours, cycled when there are more series than colours
    pub palette: Vec<String>,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            font_family: "sans-serif".to_string(),
            font_size: 12,
            title_size: 16,
            background: "#FFFFFF".to_string(),
            grid: true,
            palette: [
                "#3498DB", "#E74C3C", "#2ECC71", "#9B59B6", "#E67E22", "#1ABC9C", "#F39C12",
                "#95A5A6",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }
}

impl ChartStyle {
    pub fn validate(&self) -> Result<(), String> {
        if self.width < 200 || self.height < 150 {
            return Err(format!(
                "chart size must be at least 200x150, got {}x{}",
                self.width, self.height
            ));
        }
        if self.font_size == 0 || self.title_size == 0 {
            return Err("chart font sizes must be positive".to_string());
        }
        if self.palette.is_empty() {
            return Err("chart palette must contain at least one colour".to_string());
        }
        for colour in self.palette.iter().chain(std::iter::once(&self.background)) {
            if parse_hex(colour).is_none() {
                return Err(format!("chart colour '{colour}' is not #RRGGBB"));
            }
        }
        Ok(())
    }

    fn colour(&self, index: usize) -> RGBColor {
        if self.palette.is_empty() {
            return BLACK;
        }
        parse_hex(&self.palette[index % self.palette.len()]).unwrap_or(BLACK)
    }

    fn background_colour(&self) -> RGBColor {
        parse_hex(&self.background).unwrap_or(WHITE)
    }

    fn font(&self) -> TextStyle<'_> {
        TextStyle::from((self.font_family.as_str(), self.font_size))
    }

    fn title_font(&self) -> TextStyle<'_> {
        TextStyle::from((self.font_family.as_str(), self.title_size))
    }
}

/// Parse `#RRGGBB`
pub fn parse_hex(text: &str) -> Option<RGBColor> {
    let hex = text.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

const REFERENCE_COLOUR: RGBColor = RGBColor(120, 120, 120);
const GRID_COLOUR: RGBColor = RGBColor(230, 230, 230);

/// One named line series
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn new(label: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }
}

/// How x values map onto the horizontal axis
#[derive(Debug, Clone, PartialEq)]
pub enum XAxis {
    Linear,
    /// Plot log10(x); ticks labelled at whole decades
    Log10,
    /// x values are indices into these labels
    Categories(Vec<String>),
}

/// Horizontal dashed reference line with a legend label
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub y: f64,
    pub label: String,
}

impl Reference {
    pub fn new(y: f64, label: &str) -> Self {
        Self {
            y,
            label: label.to_string(),
        }
    }
}

/// Line (or scatter) chart
#[derive(Debug, Clone)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_axis: XAxis,
    pub series: Vec<Series>,
    pub reference: Option<Reference>,
    /// Draw markers without connecting lines
    pub scatter: bool,
}

impl LineChart {
    pub fn new(title: &str, x_label: &str, y_label: &str, x_axis: XAxis) -> Self {
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            x_axis,
            series: Vec::new(),
            reference: None,
            scatter: false,
        }
    }
}

/// How several bar series share a category slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarLayout {
    /// Side by side
    #[default]
    Grouped,
    /// Full slot width each; for series with disjoint categories
    Overlaid,
}

/// Vertical bar chart: one bar per series in each category
#[derive(Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub y_label: String,
    pub categories: Vec<String>,
    /// (series label, one value per category); non-finite values are skipped
    pub series: Vec<(String, Vec<f64>)>,
    pub reference: Option<Reference>,
    pub layout: BarLayout,
    /// Print each bar's value above it
    pub annotate: bool,
}

impl BarChart {
    pub fn new(title: &str, y_label: &str, categories: Vec<String>) -> Self {
        Self {
            title: title.to_string(),
            y_label: y_label.to_string(),
            categories,
            series: Vec::new(),
            reference: None,
            layout: BarLayout::Grouped,
            annotate: false,
        }
    }
}

/// Annotated grid of values, rows top to bottom
#[derive(Debug, Clone)]
pub struct Heatmap {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `values[row][column]`; non-finite cells stay blank
    pub values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Copy)]
pub enum Panel<'a> {
    Line(&'a LineChart),
    Bars(&'a BarChart),
    Heatmap(&'a Heatmap),
}

/// One image: an optional overall title above panels laid out row-major
#[derive(Debug, Clone)]
pub struct Figure<'a> {
    pub title: Option<String>,
    pub columns: usize,
    pub panels: Vec<Panel<'a>>,
}

impl<'a> Figure<'a> {
    pub fn single(panel: Panel<'a>) -> Self {
        Self {
            title: None,
            columns: 1,
            panels: vec![panel],
        }
    }

    pub fn grid(title: &str, columns: usize, panels: Vec<Panel<'a>>) -> Self {
        Self {
            title: Some(title.to_string()),
            columns,
            panels,
        }
    }
}

fn tick_label(value: f64, span: f64) -> String {
    if span >= 10.0 {
        format!("{value:.0}")
    } else if span >= 1.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    }
}

fn nearest_index(value: f64, len: usize) -> Option<usize> {
    let index = value.round();
    if (value - index).abs() > 1e-6 || index < 0.0 || index >= len as f64 {
        return None;
    }
    Some(index as usize)
}

fn category_label(labels: &[String], value: f64) -> String {
    nearest_index(value, labels.len())
        .map(|i| labels[i].clone())
        .unwrap_or_default()
}

fn decade_label(value: f64) -> String {
    let decade = value.round();
    if (value - decade).abs() > 1e-6 {
        return String::new();
    }
    format!("1e{}", decade as i64)
}

/// Value range with a little padding; degenerate ranges are widened
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        return (lo - 0.5, hi + 0.5);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

/// Light-to-dark ramp for heatmap cells, `t` in [0, 1]
fn heat_colour(t: f64) -> RGBColor {
    const STOPS: [(f64, f64, f64); 3] = [
        (255.0, 255.0, 204.0),
        (253.0, 141.0, 60.0),
        (189.0, 0.0, 38.0),
    ];
    let t = t.clamp(0.0, 1.0) * 2.0;
    let (from, to, f) = if t <= 1.0 {
        (STOPS[0], STOPS[1], t)
    } else {
        (STOPS[1], STOPS[2], t - 1.0)
    };
    let mix = |a: f64, b: f64| (a + (b - a) * f).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

fn draw_line<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    chart: &LineChart,
    style: &ChartStyle,
) -> DrawResult<(), DB> {
    let log = matches!(chart.x_axis, XAxis::Log10);
    let project = move |x: f64| if log { x.log10() } else { x };

    let x_range = match &chart.x_axis {
        XAxis::Categories(labels) => (-0.5, labels.len().max(1) as f64 - 0.5),
        _ => padded_range(
            chart
                .series
                .iter()
                .flat_map(|s| s.points.iter().map(move |p| project(p.0))),
        ),
    };
    let y_range = padded_range(
        chart
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.1))
            .chain(chart.reference.iter().map(|r| r.y)),
    );

    let mut ctx = ChartBuilder::on(area)
        .caption(&chart.title, style.title_font())
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    let x_format = |x: &f64| match &chart.x_axis {
        XAxis::Categories(labels) => category_label(labels, *x),
        XAxis::Log10 => decade_label(*x),
        XAxis::Linear => tick_label(*x, x_range.1 - x_range.0),
    };
    let y_format = |y: &f64| tick_label(*y, y_range.1 - y_range.0);
    {
        let mut mesh = ctx.configure_mesh();
        mesh.x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .x_label_formatter(&x_format)
            .y_label_formatter(&y_format)
            .label_style(style.font())
            .axis_desc_style(style.font())
            .light_line_style(GRID_COLOUR);
        if let XAxis::Categories(labels) = &chart.x_axis {
            mesh.x_labels(labels.len().max(1));
        }
        if !style.grid {
            mesh.disable_mesh();
        }
        mesh.draw()?;
    }

    let mut labelled = false;
    if let Some(reference) = &chart.reference {
        if reference.y >= y_range.0 && reference.y <= y_range.1 {
            ctx.draw_series(DashedLineSeries::new(
                vec![(x_range.0, reference.y), (x_range.1, reference.y)],
                6,
                4,
                REFERENCE_COLOUR.stroke_width(1),
            ))?
            .label(reference.label.as_str())
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 14, y)], REFERENCE_COLOUR));
            labelled = true;
        }
    }

    for (i, series) in chart.series.iter().enumerate() {
        let colour = style.colour(i);
        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .map(|&(x, y)| (project(x), y))
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect();
        let anno = if chart.scatter {
            ctx.draw_series(points.iter().map(|&p| Circle::new(p, 4, colour.filled())))?
        } else {
            ctx.draw_series(LineSeries::new(points.iter().copied(), colour.stroke_width(2)))?;
            ctx.draw_series(points.iter().map(|&p| Circle::new(p, 3, colour.filled())))?
        };
        anno.label(series.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 14, y + 5)], colour.filled()));
        labelled = true;
    }

    if labelled {
        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .label_font(style.font())
            .draw()?;
    }
    Ok(())
}

fn draw_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    chart: &BarChart,
    style: &ChartStyle,
) -> DrawResult<(), DB> {
    let (lo, hi) = padded_range(
        chart
            .series
            .iter()
            .flat_map(|(_, v)| v.iter().copied())
            .chain(chart.reference.iter().map(|r| r.y))
            .chain(std::iter::once(0.0)),
    );
    // bars grow from zero, so zero is always on the axis
    let y_range = (lo.min(0.0), hi.max(0.0));
    let y_range = if lo >= -f64::EPSILON { (0.0, y_range.1) } else { y_range };
    let count = chart.categories.len().max(1);
    let x_range = (-0.5, count as f64 - 0.5);

    let mut ctx = ChartBuilder::on(area)
        .caption(&chart.title, style.title_font())
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    let x_format = |x: &f64| category_label(&chart.categories, *x);
    let y_format = |y: &f64| tick_label(*y, y_range.1 - y_range.0);
    {
        let mut mesh = ctx.configure_mesh();
        mesh.x_labels(count)
            .x_label_formatter(&x_format)
            .y_label_formatter(&y_format)
            .y_desc(chart.y_label.as_str())
            .label_style(style.font())
            .axis_desc_style(style.font())
            .light_line_style(GRID_COLOUR)
            .disable_x_mesh();
        if !style.grid {
            mesh.disable_mesh();
        }
        mesh.draw()?;
    }

    let width = match chart.layout {
        BarLayout::Grouped => 0.8 / chart.series.len().max(1) as f64,
        BarLayout::Overlaid => 0.8,
    };
    let left = |category: usize, series: usize| match chart.layout {
        BarLayout::Grouped => category as f64 - 0.4 + width * series as f64,
        BarLayout::Overlaid => category as f64 - 0.4,
    };

    let mut labelled = false;
    for (si, (label, values)) in chart.series.iter().enumerate() {
        let colour = style.colour(si);
        let bars: Vec<(usize, f64)> = values
            .iter()
            .copied()
            .enumerate()
            .take(count)
            .filter(|(_, v)| v.is_finite())
            .collect();
        ctx.draw_series(bars.iter().map(|&(ci, v)| {
            let x0 = left(ci, si);
            Rectangle::new([(x0, v.max(0.0)), (x0 + width, v.min(0.0))], colour.filled())
        }))?
        .label(label.as_str())
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 14, y + 5)], colour.filled()));
        labelled = true;

        if chart.annotate {
            let font = style.font().pos(Pos::new(HPos::Center, VPos::Bottom));
            ctx.draw_series(bars.iter().map(|&(ci, v)| {
                Text::new(format!("{v:.1}"), (left(ci, si) + width / 2.0, v), font.clone())
            }))?;
        }
    }

    if let Some(reference) = &chart.reference {
        if reference.y >= y_range.0 && reference.y <= y_range.1 {
            ctx.draw_series(DashedLineSeries::new(
                vec![(x_range.0, reference.y), (x_range.1, reference.y)],
                6,
                4,
                REFERENCE_COLOUR.stroke_width(1),
            ))?
            .label(reference.label.as_str())
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 14, y)], REFERENCE_COLOUR));
            labelled = true;
        }
    }

    if labelled {
        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .label_font(style.font())
            .draw()?;
    }
    Ok(())
}

fn draw_heatmap<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    map: &Heatmap,
    style: &ChartStyle,
) -> DrawResult<(), DB> {
    let rows = map.rows.len().max(1);
    let columns = map.columns.len().max(1);
    let mut ctx = ChartBuilder::on(area)
        .caption(&map.title, style.title_font())
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(120)
        .build_cartesian_2d(-0.5..columns as f64 - 0.5, -0.5..rows as f64 - 0.5)?;

    // row 0 is drawn at the top
    let row_at = |y: f64| nearest_index(y, rows).map(|i| rows - 1 - i);
    let x_format = |x: &f64| category_label(&map.columns, *x);
    let y_format = |y: &f64| {
        row_at(*y)
            .and_then(|i| map.rows.get(i).cloned())
            .unwrap_or_default()
    };
    ctx.configure_mesh()
        .disable_mesh()
        .x_labels(columns)
        .y_labels(rows)
        .x_label_formatter(&x_format)
        .y_label_formatter(&y_format)
        .x_desc(map.x_label.as_str())
        .y_desc(map.y_label.as_str())
        .label_style(style.font())
        .axis_desc_style(style.font())
        .draw()?;

    let cells: Vec<(f64, f64, f64)> = map
        .values
        .iter()
        .enumerate()
        .flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(move |(c, &v)| (c as f64, (rows - 1 - r) as f64, v))
        })
        .filter(|(_, _, v)| v.is_finite())
        .collect();
    let (lo, hi) = cells
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.2), hi.max(c.2))
        });
    let span = if hi > lo { hi - lo } else { 1.0 };

    ctx.draw_series(cells.iter().map(|&(x, y, v)| {
        Rectangle::new(
            [(x - 0.5, y + 0.5), (x + 0.5, y - 0.5)],
            heat_colour((v - lo) / span).filled(),
        )
    }))?;
    let font = style.font().pos(Pos::new(HPos::Center, VPos::Center));
    ctx.draw_series(
        cells
            .iter()
            .map(|&(x, y, v)| Text::new(format!("{v:.1}"), (x, y), font.clone())),
    )?;
    Ok(())
}

fn draw_figure<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    figure: &Figure,
    style: &ChartStyle,
) -> DrawResult<(), DB> {
    root.fill(&style.background_colour())?;
    let body = match &figure.title {
        Some(title) => root.titled(title, style.title_font())?,
        None => root.clone(),
    };
    let columns = figure.columns.clamp(1, figure.panels.len().max(1));
    let rows = figure.panels.len().div_ceil(columns).max(1);
    for (area, panel) in body.split_evenly((rows, columns)).iter().zip(&figure.panels) {
        match panel {
            Panel::Line(chart) => draw_line(area, chart, style)?,
            Panel::Bars(chart) => draw_bars(area, chart, style)?,
            Panel::Heatmap(map) => draw_heatmap(area, map, style)?,
        }
    }
    root.present()
}

/// Render a figure as an SVG document
pub fn render_svg(figure: &Figure, style: &ChartStyle) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (style.width, style.height)).into_drawing_area();
        draw_figure(root, figure, style).context("Failed to render chart")?;
    }
    Ok(svg)
}

/// Write a figure at `path`; the extension should come from [`file_name`]
pub fn write_figure(path: &Path, figure: &Figure, style: &ChartStyle) -> Result<()> {
    super::ensure_parent(path)?;
    let size = (style.width, style.height);
    #[cfg(feature = "png")]
    let root = BitMapBackend::new(path, size).into_drawing_area();
    #[cfg(not(feature = "png"))]
    let root = SVGBackend::new(path, size).into_drawing_area();
    draw_figure(root, figure, style)
        .with_context(|| format!("Failed to render chart: {}", path.display()))?;
    info!(path = %path.display(), panels = figure.panels.len(), "wrote chart");
    Ok(())
}

pub fn write_line(path: &Path, chart: &LineChart, style: &ChartStyle) -> Result<()> {
    write_figure(path, &Figure::single(Panel::Line(chart)), style)
}

pub fn write_bars(path: &Path, chart: &BarChart, style: &ChartStyle) -> Result<()> {
    write_figure(path, &Figure::single(Panel::Bars(chart)), style)
}

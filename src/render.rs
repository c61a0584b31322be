//! Server-side rendering of chart descriptions to PNG.
//!
//! A description is first compiled into a [`Scene`] of data-space drawing
//! commands, which the plotters bitmap backend then executes blindly.

use crate::chart::{ChartDescription, ChartKind, SeriesData, Wedge};
use crate::error::{Error, Result};
use crate::palette::parse_hex;
use image::ImageEncoder;
use plotters::prelude::*;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::ops::Range;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;

const BAR_WIDTH: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Rect {
        tl: (f64, f64),
        br: (f64, f64),
        color: RGBColor,
        alpha: f64,
        legend: Option<String>,
    },
    Line {
        points: Vec<(f64, f64)>,
        color: RGBColor,
    },
    Point {
        at: (f64, f64),
        color: RGBColor,
    },
}

/// Geometry of a cartesian chart in data space.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub x_range: Range<f64>,
    pub y_range: Range<f64>,
    pub categories: Option<Vec<String>>,
    pub commands: Vec<DrawCommand>,
}

pub fn render_png(chart: &ChartDescription, width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(Error::Render(format!("invalid canvas size {}x{}", width, height)));
    }

    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        match chart.kind {
            ChartKind::Pie => draw_pie(&root, chart)?,
            _ => draw_cartesian(&root, chart, &compile(chart))?,
        }

        root.present().map_err(render_err)?;
    }

    let mut png_bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes)
        .write_image(&buffer, width, height, image::ColorType::Rgb8)
        .map_err(render_err)?;
    Ok(png_bytes)
}

/// Compile a cartesian chart into drawing commands.
pub fn compile(chart: &ChartDescription) -> Scene {
    let categories = collect_categories(chart);
    let cat_index = |c: &str| categories.iter().position(|x| x == c).map(|i| i as f64);
    let num_series = chart.series.len().max(1);
    let stacked = chart.layout.group_mode.is_some_and(|m| m.stacks());
    // running bar top per x position while stacking
    let mut tops: HashMap<u64, f64> = HashMap::new();
    let mut stack = |x: f64, height: f64| {
        let base = tops.entry(x.to_bits()).or_insert(0.0);
        let bottom = *base;
        *base += height;
        (bottom, *base)
    };
    let mut commands = Vec::new();

    for (series_idx, series) in chart.series.iter().enumerate() {
        let color = series_color(series.color.as_deref());
        let alpha = series.opacity.unwrap_or(1.0);
        let mut legend = Some(series.name.clone());

        // Dodge side by side when several series share a category
        let slot_width = BAR_WIDTH / num_series as f64;
        let offset = (series_idx as f64 - (num_series as f64 - 1.0) / 2.0) * slot_width;

        match &series.data {
            SeriesData::Bins { bins } => {
                for bin in bins {
                    let (bottom, top) = if stacked { stack(bin.start, bin.count as f64) } else { (0.0, bin.count as f64) };
                    commands.push(DrawCommand::Rect {
                        tl: (bin.start, top),
                        br: (bin.end, bottom),
                        color,
                        alpha,
                        legend: legend.take(),
                    });
                }
            }
            SeriesData::Counts { points } | SeriesData::Values { points } => {
                let dodge = !stacked && matches!(series.data, SeriesData::Counts { .. });
                let (width, shift) = if dodge { (slot_width, offset) } else { (BAR_WIDTH, 0.0) };
                for p in points {
                    let Some(x) = cat_index(&p.category) else { continue };
                    let (bottom, top) = if stacked { stack(x, p.value) } else { (0.0, p.value) };
                    let x = x + shift;
                    commands.push(DrawCommand::Rect {
                        tl: (x - width / 2.0, top),
                        br: (x + width / 2.0, bottom),
                        color,
                        alpha,
                        legend: legend.take(),
                    });
                }
            }
            SeriesData::Boxes { boxes } => {
                let half = slot_width * 0.4;
                for b in boxes {
                    let Some(x) = cat_index(&b.category) else { continue };
                    let x = x + offset;
                    commands.push(DrawCommand::Rect {
                        tl: (x - half, b.q3),
                        br: (x + half, b.q1),
                        color,
                        alpha: 0.5,
                        legend: legend.take(),
                    });
                    commands.push(DrawCommand::Line { points: vec![(x - half, b.median), (x + half, b.median)], color });
                    commands.push(DrawCommand::Line { points: vec![(x, b.q1), (x, b.lower_whisker)], color });
                    commands.push(DrawCommand::Line { points: vec![(x, b.q3), (x, b.upper_whisker)], color });
                    for &o in &b.outliers {
                        commands.push(DrawCommand::Point { at: (x, o), color });
                    }
                }
            }
            SeriesData::Wedges { .. } => {}
        }
    }

    let (x_range, y_range) = data_ranges(&commands, chart.kind, categories.len());
    Scene {
        x_range,
        y_range,
        categories: if categories.is_empty() { None } else { Some(categories) },
        commands,
    }
}

fn collect_categories(chart: &ChartDescription) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    let mut push = |c: &str| {
        if !categories.iter().any(|x| x == c) {
            categories.push(c.to_string());
        }
    };
    for series in &chart.series {
        match &series.data {
            SeriesData::Counts { points } | SeriesData::Values { points } => {
                points.iter().for_each(|p| push(&p.category))
            }
            SeriesData::Boxes { boxes } => boxes.iter().for_each(|b| push(&b.category)),
            SeriesData::Bins { .. } | SeriesData::Wedges { .. } => {}
        }
    }
    categories
}

fn data_ranges(commands: &[DrawCommand], kind: ChartKind, num_categories: usize) -> (Range<f64>, Range<f64>) {
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (f64::INFINITY, f64::NEG_INFINITY);
    let mut include = |(px, py): (f64, f64)| {
        x = (x.0.min(px), x.1.max(px));
        y = (y.0.min(py), y.1.max(py));
    };

    for cmd in commands {
        match cmd {
            DrawCommand::Rect { tl, br, .. } => {
                include(*tl);
                include(*br);
            }
            DrawCommand::Line { points, .. } => points.iter().copied().for_each(&mut include),
            DrawCommand::Point { at, .. } => include(*at),
        }
    }

    if y.0 == f64::INFINITY {
        return (0.0..1.0, 0.0..1.0);
    }

    let x_range = if num_categories > 0 {
        -0.5..(num_categories as f64 - 0.5)
    } else {
        x.0..x.1
    };

    // Bars always include 0
    if kind != ChartKind::Box {
        y.0 = y.0.min(0.0);
    }
    let (y_min, y_max) = pad_range(y.0, y.1);
    let y_min = if kind == ChartKind::Box { y_min } else { y_min.max(0.0) };

    (x_range, y_min..y_max)
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding, max + padding)
    }
}

fn draw_cartesian(
    root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    chart: &ChartDescription,
    scene: &Scene,
) -> Result<()> {
    let mut ctx = ChartBuilder::on(root)
        .margin(10)
        .caption(&chart.layout.title.text, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(scene.x_range.clone(), scene.y_range.clone())
        .map_err(render_err)?;

    let categories = scene.categories.clone().unwrap_or_default();
    let category_label = |x: &f64| {
        let i = x.round();
        if (x - i).abs() < 1e-6 && i >= 0.0 && (i as usize) < categories.len() {
            categories[i as usize].clone()
        } else {
            String::new()
        }
    };

    {
        let mut mesh = ctx.configure_mesh();
        mesh.x_desc(&chart.layout.x_axis.title)
            .y_desc(&chart.layout.y_axis.title)
            .light_line_style(RGBColor(0xE7, 0xEA, 0xF3).stroke_width(1));
        if !categories.is_empty() {
            mesh.x_labels(categories.len() * 2 + 1).x_label_formatter(&category_label);
        }
        mesh.draw().map_err(render_err)?;
    }

    let mut has_legend = false;
    for cmd in &scene.commands {
        match cmd {
            DrawCommand::Rect { tl, br, color, alpha, legend } => {
                let style = color.mix(*alpha).filled();
                let anno = ctx
                    .draw_series(std::iter::once(Rectangle::new([*tl, *br], style)))
                    .map_err(render_err)?;
                if let Some(name) = legend {
                    let c = *color;
                    anno.label(name.as_str())
                        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], c.filled()));
                    has_legend = true;
                }
            }
            DrawCommand::Line { points, color } => {
                ctx.draw_series(std::iter::once(PathElement::new(points.clone(), color.stroke_width(2))))
                    .map_err(render_err)?;
            }
            DrawCommand::Point { at, color } => {
                ctx.draw_series(std::iter::once(Circle::new(*at, 3, color.filled())))
                    .map_err(render_err)?;
            }
        }
    }

    if has_legend && chart.layout.show_legend {
        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8).filled())
            .border_style(BLACK.stroke_width(1))
            .draw()
            .map_err(render_err)?;
    }

    Ok(())
}

fn draw_pie(root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>, chart: &ChartDescription) -> Result<()> {
    let (width, height) = root.dim_in_pixel();
    let center = (width as f64 / 2.0, height as f64 / 2.0 + 20.0);
    let radius = width.min(height) as f64 * 0.3;

    let Some(SeriesData::Wedges { wedges, hole, .. }) = chart.series.first().map(|s| &s.data) else {
        return Ok(());
    };
    let total: f64 = wedges.iter().map(|w| w.value).sum();
    if total <= 0.0 {
        return Ok(());
    }

    root.draw(&Text::new(
        chart.layout.title.text.clone(),
        ((width / 2) as i32 - 4 * chart.layout.title.text.len() as i32, 15),
        ("sans-serif", 20).into_font(),
    ))
    .map_err(render_err)?;

    let mut angle = -PI / 2.0;
    for wedge in wedges {
        let sweep = wedge.value / total * 2.0 * PI;
        draw_wedge(root, wedge, center, radius, angle, sweep, total)?;
        angle += sweep;
    }

    root.draw(&Circle::new(
        (center.0 as i32, center.1 as i32),
        (radius * hole) as i32,
        WHITE.filled(),
    ))
    .map_err(render_err)?;

    Ok(())
}

fn draw_wedge(
    root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    wedge: &Wedge,
    center: (f64, f64),
    radius: f64,
    start: f64,
    sweep: f64,
    total: f64,
) -> Result<()> {
    let mid = start + sweep / 2.0;
    let pull = wedge.pull * radius;
    let (cx, cy) = (center.0 + pull * mid.cos(), center.1 + pull * mid.sin());

    let steps = ((sweep / (2.0 * PI)) * 96.0).ceil().max(2.0) as usize;
    let mut points = vec![(cx as i32, cy as i32)];
    for i in 0..=steps {
        let a = start + sweep * i as f64 / steps as f64;
        points.push(((cx + radius * a.cos()) as i32, (cy + radius * a.sin()) as i32));
    }
    root.draw(&Polygon::new(points, series_color(Some(&wedge.color)).filled()))
        .map_err(render_err)?;

    let label = format!("{} {:.1}%", wedge.label, wedge.value / total * 100.0);
    let lx = cx + radius * 1.15 * mid.cos();
    let ly = cy + radius * 1.15 * mid.sin();
    let lx = if mid.cos() < 0.0 { lx - 7.0 * label.len() as f64 } else { lx };
    root.draw(&Text::new(label, (lx as i32, ly as i32), ("sans-serif", 13).into_font()))
        .map_err(render_err)?;
    Ok(())
}

fn series_color(hex: Option<&str>) -> RGBColor {
    hex.and_then(parse_hex)
        .map(|(r, g, b)| RGBColor(r, g, b))
        .unwrap_or(RGBColor(0x1E, 0x20, 0x22))
}

fn render_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Render(e.to_string())
}

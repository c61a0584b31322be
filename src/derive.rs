//! Chart derivations over the record table.
//!
//! Every function here is pure: the same context and field names always give
//! the same chart. Field names must come from the table's schema; anything
//! else is an `UnknownField` error rather than an empty chart. Groups that end
//! up with no members are dropped and reported as warnings on the chart.

use crate::chart::{
    Axis, Bin, BoxSummary, CategoryValue, ChartDescription, ChartKind, GroupMode, Layout, Margin,
    Series, SeriesData, Wedge,
};
use crate::context::Context;
use crate::dataset::ColumnValues;
use crate::error::{Result, Warning};
use crate::labels::title_case;
use crate::stats::{self, BinEdges};
use std::collections::HashMap;
use tracing::{debug, warn};

pub const HISTOGRAM_BINS: usize = 50;

const LEGEND_TITLE: &str = "Obesity Levels";
const HISTOGRAM_OPACITY: f64 = 0.85;
const PIE_TITLE: &str = "Distribution of Obesity Levels";

/// Distribution of `field`, one series per obesity level.
pub fn histogram(ctx: &Context, field: &str) -> Result<ChartDescription> {
    let table = ctx.table();
    let column = table.column(field)?;
    let groups = table.label_groups();
    let colors = ctx.theme().palette.assign_colors(&groups);

    let title = format!("Distribution of {}", ctx.describe(field));
    let mut layout = Layout::titled(ctx.theme().title(title, 0.999));
    layout.x_axis = Axis::titled(title_case(field));
    layout.y_axis = Axis::titled("Count");
    layout.legend.title = Some(LEGEND_TITLE.to_string());
    layout.group_mode = Some(GroupMode::Relative);
    layout.bar_gap = Some(0.1);
    let mut chart = ChartDescription::new(ChartKind::Histogram, layout);

    let mut per_group: Vec<(String, SeriesData)> = Vec::new();

    match column.values() {
        ColumnValues::Numeric(values) => {
            let edges = BinEdges::spanning(values.iter().flatten().copied(), HISTOGRAM_BINS);
            let Some(edges) = edges else {
                for group in &groups {
                    chart.warnings.push(empty_group(group, field));
                }
                return Ok(finish(chart));
            };

            // 1. Count members per (label, bin)
            let mut counts: HashMap<&str, Vec<u64>> = HashMap::new();
            for (row, label) in table.labels().enumerate() {
                let (Some(label), Some(x)) = (label, values[row]) else { continue };
                counts.entry(label).or_insert_with(|| vec![0; edges.count()])[edges.index_of(x)] += 1;
            }

            // 2. Keep only non-empty bins
            for group in &groups {
                let bins: Vec<Bin> = counts
                    .get(group.as_str())
                    .map(|c| {
                        c.iter()
                            .enumerate()
                            .filter(|(_, n)| **n > 0)
                            .map(|(i, n)| {
                                let (start, end) = edges.bounds(i);
                                Bin { start, end, count: *n }
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                per_group.push((group.clone(), SeriesData::Bins { bins }));
            }
        }
        ColumnValues::Categorical(_) => {
            let categories = column.distinct();
            let mut counts: HashMap<&str, HashMap<String, u64>> = HashMap::new();
            for (row, label) in table.labels().enumerate() {
                let (Some(label), Some(cat)) = (label, column.category(row)) else { continue };
                *counts.entry(label).or_default().entry(cat.into_owned()).or_default() += 1;
            }

            for group in &groups {
                let group_counts = counts.get(group.as_str());
                let points = categories
                    .iter()
                    .filter_map(|cat| {
                        let n = *group_counts?.get(cat)?;
                        Some(CategoryValue { category: cat.clone(), value: n as f64 })
                    })
                    .collect();
                per_group.push((group.clone(), SeriesData::Counts { points }));
            }
        }
    }

    for (group, data) in per_group {
        if data.is_empty() {
            chart.warnings.push(empty_group(&group, field));
            continue;
        }
        chart.series.push(Series {
            color: colors.get(&group).cloned(),
            name: group,
            opacity: Some(HISTOGRAM_OPACITY),
            data,
        });
    }

    debug!(field, series = chart.series.len(), "derived histogram");
    Ok(finish(chart))
}

/// Box plot of `numeric_field` per value of `category_field`, split by obesity level.
pub fn grouped_box(
    ctx: &Context,
    category_field: &str,
    numeric_field: &str,
) -> Result<ChartDescription> {
    let table = ctx.table();
    let cat_column = table.column(category_field)?;
    let values = table.column(numeric_field)?.numeric()?;
    let groups = table.label_groups();
    let colors = ctx.theme().palette.assign_colors(&groups);

    let title = format!(
        "{} by {}",
        ctx.describe(numeric_field),
        ctx.describe(category_field)
    );
    let mut layout = Layout::titled(ctx.theme().title(title, 0.999));
    layout.x_axis = Axis::titled(title_case(category_field));
    layout.y_axis = Axis::titled(title_case(numeric_field));
    layout.legend.title = Some(LEGEND_TITLE.to_string());
    layout.group_mode = Some(GroupMode::Group);
    let mut chart = ChartDescription::new(ChartKind::Box, layout);

    let categories = cat_column.distinct();
    let cat_index: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    // label -> per-category values
    let mut samples: HashMap<&str, Vec<Vec<f64>>> = HashMap::new();
    for (row, label) in table.labels().enumerate() {
        let (Some(label), Some(cat), Some(y)) = (label, cat_column.category(row), values[row]) else {
            continue;
        };
        let Some(&idx) = cat_index.get(&*cat) else { continue };
        samples
            .entry(label)
            .or_insert_with(|| vec![Vec::new(); categories.len()])[idx]
            .push(y);
    }

    for group in &groups {
        let mut per_cat = samples.remove(group.as_str()).unwrap_or_default();
        per_cat.resize(categories.len(), Vec::new());

        let mut boxes: Vec<BoxSummary> = Vec::new();
        for (cat, vals) in categories.iter().zip(per_cat) {
            match stats::box_summary(cat, vals) {
                Some(summary) => boxes.push(summary),
                None => chart
                    .warnings
                    .push(empty_group(&format!("{}/{}", group, cat), numeric_field)),
            }
        }

        if boxes.is_empty() {
            continue;
        }
        chart.series.push(Series {
            name: group.clone(),
            color: colors.get(group).cloned(),
            opacity: None,
            data: SeriesData::Boxes { boxes },
        });
    }

    debug!(category_field, numeric_field, series = chart.series.len(), "derived box plot");
    Ok(finish(chart))
}

/// Mean of `numeric_field` per obesity level. Levels with no values get no bar.
pub fn grouped_average_bar(ctx: &Context, numeric_field: &str) -> Result<ChartDescription> {
    let table = ctx.table();
    let values = table.column(numeric_field)?.numeric()?;
    let groups = table.label_groups();
    let colors = ctx.theme().palette.assign_colors(&groups);

    let description = ctx.describe(numeric_field);
    let title = format!("Average {} by Obesity Level", description);
    let mut layout = Layout::titled(ctx.theme().title(title, 0.999));
    layout.x_axis = Axis::titled("Obesity Level");
    layout.y_axis = Axis::titled(title_case(description));
    layout.legend.title = Some(LEGEND_TITLE.to_string());
    layout.group_mode = Some(GroupMode::Relative);
    let mut chart = ChartDescription::new(ChartKind::Bar, layout);

    let mut samples: HashMap<&str, Vec<f64>> = HashMap::new();
    for (row, label) in table.labels().enumerate() {
        if let (Some(label), Some(y)) = (label, values[row]) {
            samples.entry(label).or_default().push(y);
        }
    }

    for group in &groups {
        let Some(avg) = samples.get(group.as_str()).and_then(|v| stats::mean(v)) else {
            chart.warnings.push(empty_group(group, numeric_field));
            continue;
        };
        chart.series.push(Series {
            name: group.clone(),
            color: colors.get(group).cloned(),
            opacity: None,
            data: SeriesData::Values {
                points: vec![CategoryValue { category: group.clone(), value: avg }],
            },
        });
    }

    debug!(numeric_field, bars = chart.series.len(), "derived average bar chart");
    Ok(finish(chart))
}

/// Donut of row counts per obesity level, largest first. Depends on nothing
/// but the dataset.
pub fn value_count_pie(ctx: &Context) -> ChartDescription {
    let table = ctx.table();
    let mut counts = stats::value_counts(table.labels().flatten());
    // stable: ties keep first-appearance order
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let palette = &ctx.theme().palette;
    let wedges = counts
        .into_iter()
        .enumerate()
        .map(|(i, (label, n))| Wedge {
            label,
            value: n as f64,
            color: palette.get_color(i).to_string(),
            pull: 0.02,
        })
        .collect();

    let mut layout = Layout::titled(ctx.theme().title(PIE_TITLE, 0.99));
    layout.show_legend = false;
    layout.margin = Some(Margin { l: 50, r: 50, t: 50, b: 50 });
    let mut chart = ChartDescription::new(ChartKind::Pie, layout);
    chart.series.push(Series {
        name: ctx.describe(table.label_field()).to_string(),
        color: None,
        opacity: None,
        data: SeriesData::Wedges {
            wedges,
            hole: 0.7,
            text_info: "label+percent".to_string(),
            text_position: "outside".to_string(),
            hover_info: "label+value+percent".to_string(),
        },
    });
    chart
}

fn empty_group(group: &str, field: &str) -> Warning {
    Warning::EmptyGroup {
        group: group.to_string(),
        field: field.to_string(),
    }
}

fn finish(chart: ChartDescription) -> ChartDescription {
    for w in &chart.warnings {
        warn!(kind = ?chart.kind, "{}", w);
    }
    chart
}

use crate::error::Warning;
use serde::Serialize;

// =============================================================================
// Chart description
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Histogram,
    Box,
    Bar,
    Pie,
}

/// A renderable chart: data series plus a layout/style bundle.
/// Built fresh on every recomputation and never mutated after styling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDescription {
    pub kind: ChartKind,
    pub series: Vec<Series>,
    pub layout: Layout,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl ChartDescription {
    pub fn new(kind: ChartKind, layout: Layout) -> Self {
        ChartDescription {
            kind,
            series: Vec::new(),
            layout,
            warnings: Vec::new(),
        }
    }

    pub fn series_named(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.data.is_empty())
    }
}

/// One legend entry's worth of data, sharing a color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    pub data: SeriesData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SeriesData {
    /// Numeric histogram: only bins with at least one member.
    Bins { bins: Vec<Bin> },
    /// Categorical histogram: count per category.
    Counts { points: Vec<CategoryValue> },
    Boxes { boxes: Vec<BoxSummary> },
    /// Bar heights keyed by category.
    Values { points: Vec<CategoryValue> },
    Wedges {
        wedges: Vec<Wedge>,
        hole: f64,
        text_info: String,
        text_position: String,
        hover_info: String,
    },
}

impl SeriesData {
    pub fn len(&self) -> usize {
        match self {
            SeriesData::Bins { bins } => bins.len(),
            SeriesData::Counts { points } | SeriesData::Values { points } => points.len(),
            SeriesData::Boxes { boxes } => boxes.len(),
            SeriesData::Wedges { wedges, .. } => wedges.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Half-open bin `[start, end)`; the last bin of a histogram is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: u64,
}

#[cfg(test)]
impl Bin {
    pub(crate) fn contains(&self, x: f64) -> bool {
        x >= self.start && x <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryValue {
    pub category: String,
    pub value: f64,
}

/// Five-number summary of one group, with whiskers at 1.5 IQR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub category: String,
    pub count: usize,
    pub min: f64,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub max: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wedge {
    pub label: String,
    pub value: f64,
    pub color: String,
    pub pull: f64,
}

// =============================================================================
// Layout
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: Title,
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub legend: Legend,
    pub show_legend: bool,
    /// How series sharing an x position are laid out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_mode: Option<GroupMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bar_gap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_bgcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_bgcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover_label: Option<HoverLabel>,
}

impl Layout {
    pub fn titled(title: Title) -> Self {
        Layout {
            title,
            x_axis: Axis::default(),
            y_axis: Axis::default(),
            legend: Legend::default(),
            show_legend: true,
            group_mode: None,
            bar_gap: None,
            template: None,
            paper_bgcolor: None,
            plot_bgcolor: None,
            font: None,
            margin: None,
            hover_label: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMode {
    /// Side by side.
    Group,
    /// Drawn over each other.
    Overlay,
    /// Positive values stacked upwards, negative values downwards.
    Relative,
}

impl GroupMode {
    pub fn stacks(self) -> bool {
        self == GroupMode::Relative
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub x_anchor: String,
    pub y_anchor: String,
    pub font: Font,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub family: String,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Axis {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<AxisStyle>,
}

impl Axis {
    pub fn titled(title: impl Into<String>) -> Self {
        Axis {
            title: title.into(),
            style: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisStyle {
    pub show_grid: bool,
    pub grid_width: u32,
    pub grid_color: String,
    pub show_line: bool,
    pub line_width: u32,
    pub line_color: String,
    pub tick_font_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Legend {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<LegendStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendStyle {
    pub bgcolor: String,
    pub bordercolor: String,
    pub orientation: String,
    pub x_anchor: String,
    pub y_anchor: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverLabel {
    pub bgcolor: String,
    pub font: Font,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title() -> Title {
        Title {
            text: "T".to_string(),
            x: 0.5,
            y: 0.999,
            x_anchor: "center".to_string(),
            y_anchor: "top".to_string(),
            font: Font {
                family: "Inter".to_string(),
                size: 16,
                color: None,
                weight: Some("bold".to_string()),
            },
        }
    }

    #[test]
    fn test_empty_chart() {
        let mut chart = ChartDescription::new(ChartKind::Bar, Layout::titled(title()));
        assert!(chart.is_empty());
        chart.series.push(Series {
            name: "A".to_string(),
            color: None,
            opacity: None,
            data: SeriesData::Values { points: vec![] },
        });
        assert!(chart.is_empty());
        assert!(chart.series_named("A").is_some());
    }

    #[test]
    fn test_serialized_shape() {
        let mut chart = ChartDescription::new(ChartKind::Histogram, Layout::titled(title()));
        chart.series.push(Series {
            name: "A".to_string(),
            color: Some("#005F5F".to_string()),
            opacity: Some(0.85),
            data: SeriesData::Bins {
                bins: vec![Bin { start: 0.0, end: 1.0, count: 3 }],
            },
        });
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["kind"], "histogram");
        assert_eq!(json["series"][0]["data"]["type"], "bins");
        assert_eq!(json["series"][0]["data"]["bins"][0]["count"], 3);
        assert_eq!(json["layout"]["title"]["text"], "T");
        assert!(json.get("warnings").is_none());
        assert!(json["layout"].get("margin").is_none());
    }

    #[test]
    fn test_bin_contains_both_edges() {
        let bin = Bin { start: 1.0, end: 2.0, count: 0 };
        assert!(bin.contains(1.0));
        assert!(bin.contains(2.0));
        assert!(!bin.contains(2.5));
    }
}

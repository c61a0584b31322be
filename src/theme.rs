// Visual theme and the chart styling overlay

use crate::chart::{
    AxisStyle, ChartDescription, Font, HoverLabel, LegendStyle, Margin, Title,
};
use crate::palette::ColorPalette;
use serde::Serialize;

const TRANSPARENT: &str = "rgba(255,255,255,0)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theme {
    pub background: String,
    pub card_bg: String,
    pub primary: String,
    pub secondary: String,
    pub text: String,
    pub text_secondary: String,
    pub grid: String,
    pub font_family: String,
    pub title_font_family: String,
    #[serde(skip)]
    pub palette: ColorPalette,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: "#eeeeee".to_string(),
            card_bg: "#FFF000".to_string(),
            primary: "#1E2022".to_string(),
            secondary: "#6C5DD3".to_string(),
            text: "#1E2022".to_string(),
            text_secondary: "#677788".to_string(),
            grid: "#E7EAF3".to_string(),
            font_family: "Inter, sans-serif".to_string(),
            title_font_family: "Inter".to_string(),
            palette: ColorPalette::dashboard(),
        }
    }
}

impl Theme {
    /// Bold, centred chart title anchored at the top at height `y`.
    pub fn title(&self, text: impl Into<String>, y: f64) -> Title {
        Title {
            text: text.into(),
            x: 0.5,
            y,
            x_anchor: "center".to_string(),
            y_anchor: "top".to_string(),
            font: Font {
                family: self.title_font_family.clone(),
                size: 16,
                color: Some(self.text.clone()),
                weight: Some("bold".to_string()),
            },
        }
    }

    fn axis_style(&self) -> AxisStyle {
        AxisStyle {
            show_grid: true,
            grid_width: 1,
            grid_color: self.grid.clone(),
            show_line: true,
            line_width: 1,
            line_color: self.grid.clone(),
            tick_font_size: 10,
        }
    }
}

/// Overlay the theme onto `chart`. Series data, titles and the legend title
/// are left as they are, so applying it twice changes nothing.
pub fn style(mut chart: ChartDescription, theme: &Theme) -> ChartDescription {
    let layout = &mut chart.layout;

    layout.template = Some("plotly_white".to_string());
    layout.paper_bgcolor = Some(TRANSPARENT.to_string());
    layout.plot_bgcolor = Some(TRANSPARENT.to_string());
    layout.font = Some(Font {
        family: theme.font_family.clone(),
        size: 12,
        color: None,
        weight: None,
    });
    layout.margin = Some(Margin { l: 20, r: 20, t: 90, b: 20 });
    layout.legend.style = Some(LegendStyle {
        bgcolor: TRANSPARENT.to_string(),
        bordercolor: TRANSPARENT.to_string(),
        orientation: "h".to_string(),
        x_anchor: "right".to_string(),
        y_anchor: "bottom".to_string(),
        x: 1.0,
        y: 1.02,
    });
    layout.hover_label = Some(HoverLabel {
        bgcolor: "white".to_string(),
        font: Font {
            family: theme.title_font_family.clone(),
            size: 12,
            color: None,
            weight: None,
        },
    });
    layout.x_axis.style = Some(theme.axis_style());
    layout.y_axis.style = Some(theme.axis_style());

    chart
}

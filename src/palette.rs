// Color palette for categorical series

use std::collections::HashMap;

/// Ordered list of hex colors handed out to series in turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPalette {
    colors: Vec<String>,
}

impl ColorPalette {
    pub fn new(colors: Vec<String>) -> Self {
        ColorPalette { colors }
    }

    /// Dark, saturated colors that stay readable on a white card.
    /// Teal, indigo, blue, coral, gold, pink, brown.
    pub fn dashboard() -> Self {
        ColorPalette::new(
            [
                "#005F5F", "#4B0082", "#0033CC", "#C72C41", "#D99A00", "#A50068", "#4B3C3D",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        )
    }

    /// Color for a specific index (wraps around if index > palette size)
    pub fn get_color(&self, index: usize) -> &str {
        if self.colors.is_empty() {
            return "#000000";
        }
        &self.colors[index % self.colors.len()]
    }

    /// Assign colors to group keys in order
    pub fn assign_colors(&self, group_keys: &[String]) -> HashMap<String, String> {
        group_keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), self.get_color(i).to_string()))
            .collect()
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::dashboard()
    }
}

/// Parse `#RRGGBB` into its components.
pub fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_rejects_non_ascii() {
        assert_eq!(parse_hex("#aé123"), None);
        assert_eq!(parse_hex("#C72C41"), Some((0xC7, 0x2C, 0x41)));
    }

    #[test]
    fn test_dashboard_palette_wraps() {
        let palette = ColorPalette::dashboard();
        assert_eq!(palette.get_color(0), "#005F5F");
        assert_eq!(palette.get_color(6), "#4B3C3D");
        assert_eq!(palette.get_color(7), "#005F5F");
    }

    #[test]
    fn test_assign_colors() {
        let palette = ColorPalette::dashboard();
        let groups = vec!["Normal_Weight".to_string(), "Obesity_Type_I".to_string()];
        let colors = palette.assign_colors(&groups);

        assert_eq!(colors.get("Normal_Weight"), Some(&"#005F5F".to_string()));
        assert_eq!(colors.get("Obesity_Type_I"), Some(&"#4B0082".to_string()));
        assert_eq!(colors.len(), 2);
    }

    #[test]
    fn test_empty_palette_falls_back_to_black() {
        let palette = ColorPalette::new(vec![]);
        assert_eq!(palette.get_color(3), "#000000");
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#C72C41"), Some((0xC7, 0x2C, 0x41)));
        assert_eq!(parse_hex("C72C41"), None);
        assert_eq!(parse_hex("#fff"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
    }
}

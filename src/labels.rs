// Human-readable descriptions for the survey's short field codes

use serde::Serialize;

const DESCRIPTIONS: &[(&str, &str)] = &[
    ("FAVC", "Frequent Consumption of High Caloric Food"),
    ("FCVC", "Frequency of Consumption of Vegetables"),
    ("NCP", "Number of Main Meals"),
    ("CAEC", "Consumption of Food Between Meals"),
    ("SMOKE", "Smoking Habits"),
    ("CH2O", "Daily Water Consumption"),
    ("SCC", "Calories Consumption Monitoring"),
    ("FAF", "Physical Activity Frequency"),
    ("TUE", "Time Using Technology Devices"),
    ("CALC", "Consumption of Alcohol"),
    ("MTRANS", "Transportation Used"),
    ("NObeyesdad", "Obesity Level"),
    ("family_history_with_overweight", "Family History with Overweight"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelEntry {
    pub code: String,
    pub description: String,
}

/// Ordered field-code → description mapping.
#[derive(Debug, Clone)]
pub struct LabelDictionary {
    entries: Vec<LabelEntry>,
}

impl LabelDictionary {
    pub fn obesity_survey() -> Self {
        LabelDictionary {
            entries: DESCRIPTIONS
                .iter()
                .map(|(code, description)| LabelEntry {
                    code: code.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.code == code)
            .map(|e| e.description.as_str())
    }

    /// Description of `code`, or the code itself when it has none.
    pub fn describe<'a>(&'a self, code: &'a str) -> &'a str {
        self.get(code).unwrap_or(code)
    }

    pub fn entries(&self) -> &[LabelEntry] {
        &self.entries
    }
}

impl Default for LabelDictionary {
    fn default() -> Self {
        Self::obesity_survey()
    }
}

/// Upper-case the first letter of every run of letters, lower-case the rest.
/// `"family_history"` becomes `"Family_History"`, `"CH2O"` becomes `"Ch2O"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Dataset file missing, unreadable, or structurally invalid.
    #[error("failed to load dataset '{}': {reason}", path.display())]
    DataLoad { path: PathBuf, reason: String },

    #[error("field '{field}' not found. Available fields: {}", available.join(", "))]
    UnknownField { field: String, available: Vec<String> },

    #[error("field '{field}' is categorical, a numeric field is required")]
    NotNumeric { field: String },

    /// The binding registry failed its startup integrity check.
    #[error("invalid binding registry: {0}")]
    Binding(String),

    #[error("unknown input control '{0}'")]
    UnknownInput(String),

    #[error("'{value}' is not an option of input control '{input}'")]
    InvalidOption { input: String, value: String },

    #[error("unknown output slot '{0}'")]
    UnknownSlot(String),

    #[error("failed to render chart: {0}")]
    Render(String),
}

impl Error {
    pub(crate) fn data_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::DataLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A non-fatal condition noticed while deriving a chart.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A grouping produced no members; the series or bar was left out.
    EmptyGroup { group: String, field: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::EmptyGroup { group, field } => {
                write!(f, "group '{}' has no values for '{}'", group, field)
            }
        }
    }
}

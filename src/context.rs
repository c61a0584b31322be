use crate::dataset::RecordTable;
use crate::labels::LabelDictionary;
use crate::theme::Theme;

/// Read-only state every chart derivation works from. Built once at startup
/// and shared by reference afterwards.
#[derive(Debug, Clone)]
pub struct Context {
    table: RecordTable,
    labels: LabelDictionary,
    theme: Theme,
}

impl Context {
    pub fn new(table: RecordTable) -> Self {
        Context {
            table,
            labels: LabelDictionary::default(),
            theme: Theme::default(),
        }
    }

    pub fn table(&self) -> &RecordTable {
        &self.table
    }

    pub fn labels(&self) -> &LabelDictionary {
        &self.labels
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn describe<'a>(&'a self, field: &'a str) -> &'a str {
        self.labels.describe(field)
    }
}

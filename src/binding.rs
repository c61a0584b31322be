//! Reactive binding between dropdown controls and chart slots.
//!
//! A [`Registry`] declares every control and, for every output slot, the
//! controls it reads plus a pure recompute function. It is checked once at
//! startup. A [`Session`] holds one viewer's control values and the current
//! chart of every slot. Changing a control marks only the slots that declare
//! it stale; `refresh` brings stale slots back to fresh.

use crate::chart::ChartDescription;
use crate::context::Context;
use crate::dataset::Column;
use crate::derive;
use crate::error::{Error, Result};
use crate::theme::style;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info};

pub const HIST_COLUMN: &str = "hist_column";
pub const X_AXIS: &str = "x_axis";
pub const Y_AXIS: &str = "y_axis";
pub const AVG_DROP: &str = "avg_drop";

pub const HISTOGRAM_SLOT: &str = "histogram";
pub const BOX_SLOT: &str = "scatter_plot";
pub const BAR_SLOT: &str = "bar_chart";
pub const PIE_SLOT: &str = "pie_chart";

/// Recompute function of a slot; receives the values of its declared inputs in order.
pub type Recompute = fn(&Context, &[&str]) -> Result<ChartDescription>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlOption {
    pub label: String,
    pub value: String,
}

/// A dropdown holding one selected field code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Control {
    pub id: String,
    pub section: String,
    pub placeholder: String,
    pub options: Vec<ControlOption>,
    pub default: String,
    pub clearable: bool,
}

impl Control {
    /// Dropdown over `fields`; falls back to the first option when
    /// `default` is not among them.
    pub fn over_fields(
        ctx: &Context,
        id: &str,
        section: &str,
        placeholder: &str,
        fields: &[&Column],
        default: &str,
    ) -> Self {
        let options: Vec<ControlOption> = fields
            .iter()
            .map(|c| ControlOption {
                label: ctx.describe(c.name()).to_string(),
                value: c.name().to_string(),
            })
            .collect();

        let default = if options.iter().any(|o| o.value == default) {
            default.to_string()
        } else {
            options.first().map(|o| o.value.clone()).unwrap_or_default()
        };

        Control {
            id: id.to_string(),
            section: section.to_string(),
            placeholder: placeholder.to_string(),
            options,
            default,
            clearable: false,
        }
    }

    pub fn offers(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

/// Output slot declaration: which controls it reads and how to rebuild it.
#[derive(Clone)]
pub struct Binding {
    pub slot: String,
    pub inputs: Vec<String>,
    pub recompute: Recompute,
}

impl Binding {
    pub fn new(slot: &str, inputs: &[&str], recompute: Recompute) -> Self {
        Binding {
            slot: slot.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            recompute,
        }
    }

    pub fn depends_on(&self, input: &str) -> bool {
        self.inputs.iter().any(|i| i == input)
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("slot", &self.slot)
            .field("inputs", &self.inputs)
            .finish()
    }
}

/// Controls and slot bindings, validated for referential integrity.
#[derive(Debug, Clone)]
pub struct Registry {
    controls: Vec<Control>,
    bindings: Vec<Binding>,
}

impl Registry {
    pub fn new(controls: Vec<Control>, bindings: Vec<Binding>) -> Result<Self> {
        let mut control_ids = HashSet::new();
        for c in &controls {
            if !control_ids.insert(c.id.as_str()) {
                return Err(Error::Binding(format!("duplicate control '{}'", c.id)));
            }
            if c.options.is_empty() {
                return Err(Error::Binding(format!("control '{}' has no options", c.id)));
            }
        }

        let mut slots = HashSet::new();
        for b in &bindings {
            if !slots.insert(b.slot.as_str()) {
                return Err(Error::Binding(format!("slot '{}' bound twice", b.slot)));
            }
            for input in &b.inputs {
                if !control_ids.contains(input.as_str()) {
                    return Err(Error::Binding(format!(
                        "slot '{}' depends on unregistered control '{}'",
                        b.slot, input
                    )));
                }
            }
        }

        Ok(Registry { controls, bindings })
    }

    /// The four-panel obesity dashboard.
    pub fn dashboard(ctx: &Context) -> Result<Self> {
        let table = ctx.table();
        let features = table.feature_fields();
        let categorical = table.categorical_fields();
        let numerical = table.numeric_fields();

        let controls = vec![
            Control::over_fields(ctx, HIST_COLUMN, "Distribution Analysis", "Select variable", &features, "Age"),
            Control::over_fields(ctx, X_AXIS, "Multivariate Analysis", "Select category", &categorical, "Gender"),
            Control::over_fields(ctx, Y_AXIS, "Multivariate Analysis", "Select measure", &numerical, "Weight"),
            Control::over_fields(ctx, AVG_DROP, "Average Analysis by Obesity Levels", "Select variable", &numerical, "Age"),
        ];

        let bindings = vec![
            Binding::new(HISTOGRAM_SLOT, &[HIST_COLUMN], |ctx, v| {
                Ok(style(derive::histogram(ctx, v[0])?, ctx.theme()))
            }),
            Binding::new(BOX_SLOT, &[X_AXIS, Y_AXIS], |ctx, v| {
                Ok(style(derive::grouped_box(ctx, v[0], v[1])?, ctx.theme()))
            }),
            Binding::new(BAR_SLOT, &[AVG_DROP], |ctx, v| {
                Ok(style(derive::grouped_average_bar(ctx, v[0])?, ctx.theme()))
            }),
            // No inputs: computed once per session and never invalidated
            Binding::new(PIE_SLOT, &[], |ctx, _| {
                Ok(style(derive::value_count_pie(ctx), ctx.theme()))
            }),
        ];

        Registry::new(controls, bindings)
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn control(&self, id: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.id == id)
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.slot.as_str())
    }

    /// Slots that must be recomputed when `input` changes.
    pub fn dependents(&self, input: &str) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|b| b.depends_on(input))
            .map(|b| b.slot.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Stale,
    Fresh,
}

#[derive(Debug, Clone)]
pub struct Slot {
    state: SlotState,
    chart: Option<ChartDescription>,
    last_error: Option<String>,
}

impl Slot {
    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn chart(&self) -> Option<&ChartDescription> {
        self.chart.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// One viewer's control values and displayed charts.
#[derive(Debug, Clone)]
pub struct Session {
    ctx: Arc<Context>,
    registry: Arc<Registry>,
    values: HashMap<String, String>,
    slots: HashMap<String, Slot>,
}

impl Session {
    /// Start from every control's default and compute every slot.
    pub fn new(ctx: Arc<Context>, registry: Arc<Registry>) -> Self {
        let values = registry
            .controls()
            .iter()
            .map(|c| (c.id.clone(), c.default.clone()))
            .collect();
        let slots = registry
            .slots()
            .map(|s| {
                let slot = Slot { state: SlotState::Stale, chart: None, last_error: None };
                (s.to_string(), slot)
            })
            .collect();

        let mut session = Session { ctx, registry, values, slots };
        session.refresh();
        session
    }

    pub fn value(&self, input: &str) -> Option<&str> {
        self.values.get(input).map(|s| s.as_str())
    }

    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }

    pub fn slot(&self, slot: &str) -> Result<&Slot> {
        self.slots
            .get(slot)
            .ok_or_else(|| Error::UnknownSlot(slot.to_string()))
    }

    pub fn chart(&self, slot: &str) -> Result<Option<&ChartDescription>> {
        Ok(self.slot(slot)?.chart())
    }

    /// Store a new control value and mark its dependent slots stale.
    /// Setting the current value again invalidates nothing.
    pub fn set_input(&mut self, input: &str, value: &str) -> Result<()> {
        let control = self
            .registry
            .control(input)
            .ok_or_else(|| Error::UnknownInput(input.to_string()))?;
        if !control.offers(value) {
            return Err(Error::InvalidOption {
                input: input.to_string(),
                value: value.to_string(),
            });
        }

        if self.value(input) == Some(value) {
            return Ok(());
        }
        self.values.insert(input.to_string(), value.to_string());

        for slot in self.registry.dependents(input) {
            if let Some(s) = self.slots.get_mut(slot) {
                s.state = SlotState::Stale;
            }
        }
        Ok(())
    }

    /// Recompute every stale slot, in declaration order. A failed recompute
    /// keeps the previous chart and records the error.
    pub fn refresh(&mut self) -> Vec<String> {
        let mut recomputed = Vec::new();

        for binding in self.registry.bindings() {
            let Some(slot) = self.slots.get_mut(&binding.slot) else { continue };
            if slot.state == SlotState::Fresh {
                continue;
            }

            let inputs: Vec<&str> = binding
                .inputs
                .iter()
                .map(|i| self.values.get(i).map(|v| v.as_str()).unwrap_or_default())
                .collect();

            match (binding.recompute)(&self.ctx, &inputs) {
                Ok(chart) => {
                    debug!(slot = %binding.slot, ?inputs, "slot recomputed");
                    slot.chart = Some(chart);
                    slot.last_error = None;
                }
                Err(e) => {
                    error!(slot = %binding.slot, ?inputs, error = %e, "slot recompute failed");
                    slot.last_error = Some(e.to_string());
                }
            }
            slot.state = SlotState::Fresh;
            recomputed.push(binding.slot.clone());
        }

        recomputed
    }

    /// `set_input` then `refresh`; returns the slots that were recomputed.
    pub fn update(&mut self, input: &str, value: &str) -> Result<Vec<String>> {
        self.set_input(input, value)?;
        let recomputed = self.refresh();
        info!(input, value, slots = ?recomputed, "input changed");
        Ok(recomputed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RecordTable;

    const CSV: &str = "Gender,Age,Height,Weight,MTRANS,NObeyesdad\n\
                       Female,21,1.62,64,Public_Transportation,Normal_Weight\n\
                       Male,23,1.80,77,Walking,Normal_Weight\n\
                       Male,27,1.80,87,Walking,Overweight_Level_I\n\
                       Female,22,1.64,90,Automobile,Obesity_Type_I\n\
                       Male,30,1.75,105,Public_Transportation,Obesity_Type_I";

    fn make_ctx() -> Arc<Context> {
        Arc::new(Context::new(RecordTable::from_csv_str(CSV, "NObeyesdad").unwrap()))
    }

    fn make_session() -> Session {
        let ctx = make_ctx();
        let registry = Arc::new(Registry::dashboard(&ctx).unwrap());
        Session::new(ctx, registry)
    }

    fn failing(_: &Context, _: &[&str]) -> Result<ChartDescription> {
        Err(Error::UnknownField { field: "x".to_string(), available: vec![] })
    }

    // Registry

    #[test]
    fn test_dashboard_controls() {
        let ctx = make_ctx();
        let registry = Registry::dashboard(&ctx).unwrap();
        assert_eq!(registry.controls().len(), 4);

        let hist = registry.control(HIST_COLUMN).unwrap();
        assert_eq!(hist.default, "Age");
        assert_eq!(hist.options.len(), 5);
        assert!(!hist.offers("NObeyesdad"));

        let x = registry.control(X_AXIS).unwrap();
        let x_values: Vec<&str> = x.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(x_values, vec!["Gender", "MTRANS"]);

        let y = registry.control(Y_AXIS).unwrap();
        assert_eq!(y.default, "Weight");
        assert!(!y.offers("Gender"));

        let mtrans = x.options.iter().find(|o| o.value == "MTRANS").unwrap();
        assert_eq!(mtrans.label, "Transportation Used");
    }

    #[test]
    fn test_default_falls_back_to_first_option() {
        let ctx = Arc::new(Context::new(
            RecordTable::from_csv_str("Sex,Years,NObeyesdad\nF,20,A", "NObeyesdad").unwrap(),
        ));
        let registry = Registry::dashboard(&ctx).unwrap();
        assert_eq!(registry.control(X_AXIS).unwrap().default, "Sex");
        assert_eq!(registry.control(AVG_DROP).unwrap().default, "Years");
    }

    #[test]
    fn test_dependents() {
        let registry = Registry::dashboard(&make_ctx()).unwrap();
        assert_eq!(registry.dependents(HIST_COLUMN), vec![HISTOGRAM_SLOT]);
        assert_eq!(registry.dependents(X_AXIS), vec![BOX_SLOT]);
        assert_eq!(registry.dependents(Y_AXIS), vec![BOX_SLOT]);
        assert_eq!(registry.dependents(AVG_DROP), vec![BAR_SLOT]);
        assert!(registry.dependents("nothing").is_empty());
    }

    #[test]
    fn test_registry_rejects_unregistered_input() {
        let ctx = make_ctx();
        let features = ctx.table().feature_fields();
        let controls = vec![Control::over_fields(&ctx, "a", "", "", &features, "Age")];
        let bindings = vec![Binding::new("out", &["b"], failing)];
        let err = Registry::new(controls, bindings).unwrap_err();
        assert!(matches!(err, Error::Binding(_)));
        assert!(err.to_string().contains("unregistered control 'b'"));
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let ctx = make_ctx();
        let features = ctx.table().feature_fields();
        let control = Control::over_fields(&ctx, "a", "", "", &features, "Age");

        let err = Registry::new(vec![control.clone(), control.clone()], vec![]).unwrap_err();
        assert!(err.to_string().contains("duplicate control"));

        let bindings = vec![Binding::new("out", &["a"], failing), Binding::new("out", &[], failing)];
        let err = Registry::new(vec![control], bindings).unwrap_err();
        assert!(err.to_string().contains("bound twice"));
    }

    #[test]
    fn test_registry_rejects_empty_options() {
        let ctx = make_ctx();
        let control = Control::over_fields(&ctx, "a", "", "", &[], "Age");
        let err = Registry::new(vec![control], vec![]).unwrap_err();
        assert!(err.to_string().contains("no options"));
    }

    // Session

    #[test]
    fn test_new_session_is_fresh() {
        let session = make_session();
        for slot in [HISTOGRAM_SLOT, BOX_SLOT, BAR_SLOT, PIE_SLOT] {
            let s = session.slot(slot).unwrap();
            assert_eq!(s.state(), SlotState::Fresh);
            assert!(s.chart().is_some(), "{} has no chart", slot);
            assert!(s.last_error().is_none());
        }
        assert_eq!(session.value(HIST_COLUMN), Some("Age"));
    }

    #[test]
    fn test_histogram_change_is_isolated() {
        let mut session = make_session();
        let before: Vec<ChartDescription> = [BOX_SLOT, BAR_SLOT, PIE_SLOT]
            .iter()
            .map(|s| session.chart(s).unwrap().unwrap().clone())
            .collect();

        let recomputed = session.update(HIST_COLUMN, "Weight").unwrap();
        assert_eq!(recomputed, vec![HISTOGRAM_SLOT.to_string()]);

        let after: Vec<ChartDescription> = [BOX_SLOT, BAR_SLOT, PIE_SLOT]
            .iter()
            .map(|s| session.chart(s).unwrap().unwrap().clone())
            .collect();
        assert_eq!(before, after);

        let hist = session.chart(HISTOGRAM_SLOT).unwrap().unwrap();
        assert_eq!(hist.layout.title.text, "Distribution of Weight");
    }

    #[test]
    fn test_set_input_marks_only_dependents_stale() {
        let mut session = make_session();
        session.set_input(X_AXIS, "MTRANS").unwrap();
        assert_eq!(session.slot(BOX_SLOT).unwrap().state(), SlotState::Stale);
        assert_eq!(session.slot(HISTOGRAM_SLOT).unwrap().state(), SlotState::Fresh);
        assert_eq!(session.slot(BAR_SLOT).unwrap().state(), SlotState::Fresh);
        assert_eq!(session.slot(PIE_SLOT).unwrap().state(), SlotState::Fresh);

        assert_eq!(session.refresh(), vec![BOX_SLOT.to_string()]);
        assert_eq!(session.slot(BOX_SLOT).unwrap().state(), SlotState::Fresh);
        assert!(session.refresh().is_empty());
    }

    #[test]
    fn test_same_value_does_not_invalidate() {
        let mut session = make_session();
        let recomputed = session.update(AVG_DROP, "Age").unwrap();
        assert!(recomputed.is_empty());
    }

    #[test]
    fn test_rejects_unknown_input_and_option() {
        let mut session = make_session();
        let err = session.update("colour", "Age").unwrap_err();
        assert!(matches!(err, Error::UnknownInput(_)));

        let err = session.update(Y_AXIS, "Gender").unwrap_err();
        assert!(matches!(err, Error::InvalidOption { .. }));
        assert_eq!(session.value(Y_AXIS), Some("Weight"));
    }

    #[test]
    fn test_unknown_slot() {
        let session = make_session();
        assert!(matches!(session.chart("map"), Err(Error::UnknownSlot(_))));
    }

    #[test]
    fn test_failed_recompute_keeps_previous_chart() {
        let ctx = make_ctx();
        let features = ctx.table().feature_fields();
        let controls = vec![Control::over_fields(&ctx, "pick", "", "", &features, "Age")];

        fn flaky(ctx: &Context, v: &[&str]) -> Result<ChartDescription> {
            if v[0] == "Height" {
                return failing(ctx, v);
            }
            derive::histogram(ctx, v[0])
        }

        let registry = Arc::new(Registry::new(controls, vec![Binding::new("out", &["pick"], flaky)]).unwrap());
        let mut session = Session::new(ctx, registry);
        let before = session.chart("out").unwrap().unwrap().clone();

        let recomputed = session.update("pick", "Height").unwrap();
        assert_eq!(recomputed, vec!["out".to_string()]);

        let slot = session.slot("out").unwrap();
        assert_eq!(slot.state(), SlotState::Fresh);
        assert_eq!(slot.chart(), Some(&before));
        assert!(slot.last_error().unwrap().contains("not found"));

        session.update("pick", "Weight").unwrap();
        assert!(session.slot("out").unwrap().last_error().is_none());
    }

    #[test]
    fn test_sessions_are_independent() {
        let ctx = make_ctx();
        let registry = Arc::new(Registry::dashboard(&ctx).unwrap());
        let mut a = Session::new(ctx.clone(), registry.clone());
        let b = Session::new(ctx, registry);

        a.update(HIST_COLUMN, "Height").unwrap();
        assert_eq!(a.value(HIST_COLUMN), Some("Height"));
        assert_eq!(b.value(HIST_COLUMN), Some("Age"));
    }
}

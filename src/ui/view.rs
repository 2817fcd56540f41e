//! Step View - Headless view tree of a wizard step
//!
//! A step describes what it shows as a flat list of controls (body) plus a
//! navigation region. Hosts render it however they like; the engine only
//! needs ids, kinds, labels, enabled flags and what activating a control
//! should do.

use crate::ui::nav::NavAction;

/// What kind of element a control is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Clickable button - the only interactive kind navigation can bind to
    Button,
    Label,
    /// Free text entry
    Input,
    /// Pick one of `options`
    Choice,
    /// Busy spinner, visible while work is running
    Indicator,
    /// Read-only grid of `rows`
    Table,
}

/// What activating a control does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
    /// Wizard navigation (next, prev, custom jump)
    Navigate(NavAction),
    /// Handled by the step itself
    Local(String),
}

/// Addresses a control inside a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRef {
    /// Body or navigation control carrying this id
    Id(String),
    /// N-th control of the navigation region
    Nav(usize),
}

impl From<&str> for ControlRef {
    fn from(id: &str) -> Self {
        ControlRef::Id(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub id: Option<String>,
    pub kind: ControlKind,
    pub label: String,
    pub value: String,
    pub options: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub enabled: bool,
    pub visible: bool,
    pub action: Option<ControlAction>,
}

impl Control {
    fn new(id: Option<&str>, kind: ControlKind, label: &str) -> Self {
        Self {
            id: id.map(str::to_string),
            kind,
            label: label.to_string(),
            value: String::new(),
            options: Vec::new(),
            rows: Vec::new(),
            enabled: true,
            visible: true,
            action: None,
        }
    }

    pub fn button(id: &str, label: &str) -> Self {
        Self::new(Some(id), ControlKind::Button, label)
    }

    /// Button without an id, as synthesized for navigation descriptors
    pub fn anonymous_button(label: &str) -> Self {
        Self::new(None, ControlKind::Button, label)
    }

    pub fn label(id: &str, text: &str) -> Self {
        Self::new(Some(id), ControlKind::Label, text)
    }

    pub fn input(id: &str, label: &str) -> Self {
        Self::new(Some(id), ControlKind::Input, label)
    }

    pub fn choice(id: &str, label: &str) -> Self {
        Self::new(Some(id), ControlKind::Choice, label)
    }

    pub fn indicator(id: &str) -> Self {
        let mut control = Self::new(Some(id), ControlKind::Indicator, "");
        control.visible = false;
        control
    }

    pub fn table(id: &str) -> Self {
        Self::new(Some(id), ControlKind::Table, "")
    }

    pub fn with_action(mut self, action: ControlAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.value = options.first().cloned().unwrap_or_default();
        self.options = options;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether the control can be activated by the user
    pub fn is_interactive(&self) -> bool {
        self.kind == ControlKind::Button
    }

    fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }
}

/// Everything a step shows
#[derive(Debug, Clone, Default)]
pub struct StepView {
    description: Option<String>,
    body: Vec<Control>,
    navigation: Vec<Control>,
    revision: u64,
}

impl StepView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, text: impl Into<String>) {
        self.description = Some(text.into());
        self.touch();
    }

    pub fn body(&self) -> &[Control] {
        &self.body
    }

    pub fn navigation(&self) -> &[Control] {
        &self.navigation
    }

    pub fn push(&mut self, control: Control) {
        self.body.push(control);
        self.touch();
    }

    pub fn push_navigation(&mut self, control: Control) {
        self.navigation.push(control);
        self.touch();
    }

    /// Drop body controls whose id starts with `prefix`
    pub fn remove_prefixed(&mut self, prefix: &str) {
        self.body
            .retain(|c| !c.id.as_deref().is_some_and(|id| id.starts_with(prefix)));
        self.touch();
    }

    /// Find a control by id in the body or navigation region
    pub fn lookup(&self, id: &str) -> Option<&Control> {
        self.body
            .iter()
            .chain(self.navigation.iter())
            .find(|c| c.has_id(id))
    }

    /// Mutable lookup; marks the view as changed
    pub fn lookup_mut(&mut self, id: &str) -> Option<&mut Control> {
        self.touch();
        self.body
            .iter_mut()
            .chain(self.navigation.iter_mut())
            .find(|c| c.has_id(id))
    }

    pub fn resolve(&self, target: &ControlRef) -> Option<&Control> {
        match target {
            ControlRef::Id(id) => self.lookup(id),
            ControlRef::Nav(index) => self.navigation.get(*index),
        }
    }

    pub fn value(&self, id: &str) -> Option<&str> {
        self.lookup(id).map(|c| c.value.as_str())
    }

    pub fn set_label(&mut self, id: &str, label: impl Into<String>) -> bool {
        self.update(id, |c| c.label = label.into())
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        self.update(id, |c| c.enabled = enabled)
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) -> bool {
        self.update(id, |c| c.visible = visible)
    }

    pub fn set_value(&mut self, id: &str, value: impl Into<String>) -> bool {
        self.update(id, |c| c.value = value.into())
    }

    pub fn set_options(&mut self, id: &str, options: Vec<String>) -> bool {
        self.update(id, |c| {
            c.value = options.first().cloned().unwrap_or_default();
            c.options = options;
        })
    }

    pub fn set_rows(&mut self, id: &str, rows: Vec<Vec<String>>) -> bool {
        self.update(id, |c| c.rows = rows)
    }

    /// Enable or disable every control in the navigation region
    pub fn set_navigation_enabled(&mut self, enabled: bool) {
        for control in &mut self.navigation {
            control.enabled = enabled;
        }
        self.touch();
    }

    /// Store a value typed or picked by the user.
    ///
    /// Does not bump the revision: the host already shows this value, and
    /// re-rendering would reset its widget while the user is editing.
    pub fn set_input_value(&mut self, id: &str, value: &str) -> bool {
        match self.body.iter_mut().find(|c| c.has_id(id)) {
            Some(control) if matches!(control.kind, ControlKind::Input | ControlKind::Choice) => {
                control.value = value.to_string();
                true
            }
            _ => false,
        }
    }

    /// Monotonic change counter, compared by hosts to decide on re-rendering
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn update(&mut self, id: &str, apply: impl FnOnce(&mut Control)) -> bool {
        match self.lookup_mut(id) {
            Some(control) => {
                apply(control);
                true
            }
            None => {
                tracing::warn!("No control '{}' in view", id);
                false
            }
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StepView {
        let mut view = StepView::new();
        view.push(Control::label("status", "Ready"));
        view.push(Control::button("importBtn", "Import"));
        view.push(Control::choice("delimiter", "Delimiter").with_options(vec![
            ",".into(),
            ";".into(),
        ]));
        view.push_navigation(Control::anonymous_button("Back"));
        view
    }

    #[test]
    fn test_lookup_by_id_and_nav_index() {
        let view = sample();
        assert_eq!(view.lookup("status").unwrap().label, "Ready");
        assert!(view.lookup("missing").is_none());
        assert_eq!(view.resolve(&ControlRef::Nav(0)).unwrap().label, "Back");
        assert!(view.resolve(&ControlRef::Nav(1)).is_none());
    }

    #[test]
    fn test_only_buttons_are_interactive() {
        let view = sample();
        assert!(view.lookup("importBtn").unwrap().is_interactive());
        assert!(!view.lookup("status").unwrap().is_interactive());
        assert!(!view.lookup("delimiter").unwrap().is_interactive());
    }

    #[test]
    fn test_choice_defaults_to_first_option() {
        let view = sample();
        assert_eq!(view.value("delimiter"), Some(","));
    }

    #[test]
    fn test_mutations_bump_revision_but_user_input_does_not() {
        let mut view = sample();
        let before = view.revision();

        assert!(view.set_input_value("delimiter", ";"));
        assert_eq!(view.revision(), before);
        assert_eq!(view.value("delimiter"), Some(";"));

        assert!(view.set_label("status", "Busy"));
        assert!(view.revision() > before);

        // Labels are not user-editable
        assert!(!view.set_input_value("status", "hacked"));
    }

    #[test]
    fn test_remove_prefixed_keeps_other_controls() {
        let mut view = sample();
        view.push(Control::choice("column-0", ""));
        view.push(Control::choice("column-1", ""));
        view.remove_prefixed("column-");
        assert_eq!(view.body().len(), 3);
    }
}

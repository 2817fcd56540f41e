//! Navigation Descriptors - Declarative navigation controls of a step
//!
//! A step lists descriptors for its navigation controls. Each one either
//! binds to a button the step already has (by id) or asks for a new button
//! in the step's navigation region. Resolution happens once, while the
//! wizard is being set up.

use crate::error::{BindingFailure, WizardError};
use crate::i18n::Catalog;
use crate::ui::view::{Control, ControlAction, StepView};

/// What a navigation control does when activated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavAction {
    Prev,
    Next,
    /// Jump to the step with this id
    Custom(String),
}

/// Declaration of one navigation control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationDescriptor {
    /// Bind to this existing button instead of creating one
    pub existing_element_id: Option<String>,
    /// Raw text, or `%key` to look up in the step's bundle
    pub title: String,
    pub action: NavAction,
    pub enabled: bool,
}

impl NavigationDescriptor {
    pub fn new(action: NavAction, title: impl Into<String>) -> Self {
        Self {
            existing_element_id: None,
            title: title.into(),
            action,
            enabled: true,
        }
    }

    pub fn next(title: impl Into<String>) -> Self {
        Self::new(NavAction::Next, title)
    }

    pub fn prev(title: impl Into<String>) -> Self {
        Self::new(NavAction::Prev, title)
    }

    pub fn custom(target: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(NavAction::Custom(target.into()), title)
    }

    /// Bind to an existing button of the step's view
    pub fn bind(mut self, element_id: impl Into<String>) -> Self {
        self.existing_element_id = Some(element_id.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Wire `descriptors` into `view`.
///
/// Bound descriptors relabel and rewire the existing button; the others get
/// a fresh button appended to the navigation region, in order.
pub fn resolve_navigation(
    step_id: &str,
    view: &mut StepView,
    strings: &Catalog,
    descriptors: &[NavigationDescriptor],
) -> Result<(), WizardError> {
    for nav in descriptors {
        let title = strings.localize(&nav.title)?;
        let action = ControlAction::Navigate(nav.action.clone());

        match nav.existing_element_id {
            Some(ref element) => bind_navigation(step_id, view, element, title, action)?,
            None => {
                let mut button = Control::anonymous_button(&title).with_action(action);
                button.enabled = nav.enabled;
                view.push_navigation(button);
            }
        }
    }

    Ok(())
}

fn bind_navigation(
    step_id: &str,
    view: &mut StepView,
    element: &str,
    title: String,
    action: ControlAction,
) -> Result<(), WizardError> {
    let failure = match view.lookup(element) {
        None => Some(BindingFailure::NotFound),
        Some(control) if !control.is_interactive() => Some(BindingFailure::NotInteractive),
        Some(_) => None,
    };

    if let Some(failure) = failure {
        return Err(WizardError::Binding {
            step: step_id.to_string(),
            element: element.to_string(),
            failure,
        });
    }

    if let Some(control) = view.lookup_mut(element) {
        control.label = title;
        control.action = Some(action);
    }

    Ok(())
}

//! Wizard Errors - Failure kinds surfaced by the engine
//!
//! Configuration mistakes (bad bindings, duplicate steps, missing strings)
//! are fatal and abort `Wizard::setup`. A missed custom jump is recoverable
//! and only reported to the user. Background task failures travel into the
//! task continuation as `TaskError`.

use thiserror::Error;

/// Why an existing-control binding could not be made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingFailure {
    /// No control with that id exists in the step's view
    NotFound,
    /// The control exists but cannot be activated (not a button)
    NotInteractive,
}

/// Fatal errors raised while assembling a wizard
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("{}", binding_message(.step, .element, .failure))]
    Binding {
        step: String,
        element: String,
        failure: BindingFailure,
    },

    #[error("Step id '{0}' is registered more than once")]
    DuplicateStep(String),

    #[error("Wizard is already set up")]
    AlreadySetUp,

    #[error("No property '{key}' defined in bundle '{bundle}' with lang '{locale}'")]
    MissingResource {
        key: String,
        bundle: String,
        locale: String,
    },

    #[error("Error at onLoad of step '{step}'")]
    StepLoad {
        step: String,
        #[source]
        source: anyhow::Error,
    },
}

fn binding_message(step: &str, element: &str, failure: &BindingFailure) -> String {
    match failure {
        BindingFailure::NotFound => {
            format!("Element with id {} not found in step '{}'", element, step)
        }
        BindingFailure::NotInteractive => {
            format!("Id {} in step '{}' must reference a button element", element, step)
        }
    }
}

/// A custom jump named a step that does not exist
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("There is no view '{key}'")]
pub struct NavigationMiss {
    pub key: String,
}

/// Failure of a unit of background work, delivered to its continuation
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Background task failed: {0:#}")]
    Failed(#[source] anyhow::Error),

    #[error("Background task panicked: {0}")]
    Panicked(String),

    #[error("Background task was cancelled before completion")]
    Cancelled,
}

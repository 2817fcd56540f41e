//! Wizard UI - Headless wizard engine and its hosts

pub mod console;
pub mod host;
pub mod main_loop;
pub mod nav;
pub mod pages;
pub mod step;
pub mod view;
pub mod wizard;

#[cfg(feature = "gtk")]
pub mod gtk_host;

pub use host::{HostEvent, RecordingHost, WizardHost};
pub use main_loop::{TaskId, UiHandle, UiLoop};
pub use nav::{NavAction, NavigationDescriptor};
pub use step::{Step, StepBase, StepHandle};
pub use view::{Control, ControlAction, ControlKind, ControlRef, StepView};
pub use wizard::{Command, StepEntry, Wizard};

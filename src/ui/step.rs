//! Step Contract - What every wizard step supports
//!
//! Concrete steps implement `Step` and embed a `StepBase`, which stores the
//! injected commands and context accessor, owns the view and the step's
//! strings. `StepHandle` is the shared, type-erased form the wizard keeps.

use crate::context::ContextAccessor;
use crate::error::WizardError;
use crate::i18n::Catalog;
use crate::ui::main_loop::UiLoop;
use crate::ui::nav::{resolve_navigation, NavAction, NavigationDescriptor};
use crate::ui::view::{ControlAction, ControlRef, StepView};
use std::cell::{Ref, RefCell};
use std::rc::Rc;

/// Bundle key of the description shown on top of every step
const DESCRIPTION_KEY: &str = "stage_desc";

/// Injected navigation command
pub type NavCommand = Rc<dyn Fn()>;

/// Injected custom-jump command, takes the target step id
pub type CustomCommand = Rc<dyn Fn(&str)>;

/// Shared plumbing embedded in every step
pub struct StepBase {
    view: StepView,
    strings: Catalog,
    next_command: Option<NavCommand>,
    prev_command: Option<NavCommand>,
    custom_command: Option<CustomCommand>,
    context: Option<ContextAccessor>,
}

impl StepBase {
    pub fn new(strings: Catalog) -> Self {
        Self {
            view: StepView::new(),
            strings,
            next_command: None,
            prev_command: None,
            custom_command: None,
            context: None,
        }
    }

    pub fn view(&self) -> &StepView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut StepView {
        &mut self.view
    }

    pub fn strings(&self) -> &Catalog {
        &self.strings
    }

    pub fn get_string(&self, key: &str) -> Result<String, WizardError> {
        self.strings.get_string(key)
    }

    pub fn localize(&self, title: &str) -> Result<String, WizardError> {
        self.strings.localize(title)
    }

    pub fn set_next_command(&mut self, command: NavCommand) {
        self.next_command = Some(command);
    }

    pub fn set_prev_command(&mut self, command: NavCommand) {
        self.prev_command = Some(command);
    }

    pub fn set_custom_command(&mut self, command: CustomCommand) {
        self.custom_command = Some(command);
    }

    pub fn set_context_accessor(&mut self, accessor: ContextAccessor) {
        self.context = Some(accessor);
    }

    /// Accessor for the session context, once the wizard injected it
    pub fn context(&self) -> Option<&ContextAccessor> {
        self.context.as_ref()
    }

    pub fn next(&self) {
        match self.next_command {
            Some(ref command) => command(),
            None => tracing::warn!("Next requested before the step was wired"),
        }
    }

    pub fn prev(&self) {
        match self.prev_command {
            Some(ref command) => command(),
            None => tracing::warn!("Prev requested before the step was wired"),
        }
    }

    pub fn custom(&self, key: &str) {
        match self.custom_command {
            Some(ref command) => command(key),
            None => tracing::warn!("Jump to '{}' requested before the step was wired", key),
        }
    }

    fn setup_description(&mut self) -> Result<(), WizardError> {
        let text = self.strings.get_string(DESCRIPTION_KEY)?;
        self.view.set_description(text);
        Ok(())
    }
}

/// Operations the wizard drives on a step
pub trait Step {
    fn base(&self) -> &StepBase;

    fn base_mut(&mut self) -> &mut StepBase;

    /// Runs once after construction, before any navigation wiring.
    /// An error aborts wizard setup.
    fn on_load(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// The step became visible
    fn on_shown(&mut self) {}

    /// The step is about to be hidden
    fn on_hide(&mut self) {}

    /// A control of this step was activated
    fn on_action(&mut self, action: &ControlAction) {
        run_default_action(self.base(), action);
    }

    /// The user edited an input or picked a choice
    fn on_value_changed(&mut self, _id: &str, _value: &str) {}
}

/// Route navigation actions to the injected commands
pub fn run_default_action(base: &StepBase, action: &ControlAction) {
    match action {
        ControlAction::Navigate(NavAction::Next) => base.next(),
        ControlAction::Navigate(NavAction::Prev) => base.prev(),
        ControlAction::Navigate(NavAction::Custom(key)) => base.custom(key),
        ControlAction::Local(name) => tracing::warn!("Unhandled step action '{}'", name),
    }
}

/// Shared handle to a step
#[derive(Clone)]
pub struct StepHandle {
    step: Rc<RefCell<dyn Step>>,
}

impl StepHandle {
    pub fn new<S: Step + 'static>(step: Rc<RefCell<S>>) -> Self {
        Self { step }
    }

    pub fn from_step<S: Step + 'static>(step: S) -> Self {
        Self::new(Rc::new(RefCell::new(step)))
    }

    pub fn borrow(&self) -> Ref<'_, dyn Step> {
        self.step.borrow()
    }

    pub fn view(&self) -> Ref<'_, StepView> {
        Ref::map(self.step.borrow(), |step| step.base().view())
    }

    /// Change the view from outside the step (hosts, drivers)
    pub fn update_view<R>(&self, f: impl FnOnce(&mut StepView) -> R) -> R {
        f(self.step.borrow_mut().base_mut().view_mut())
    }

    /// Description header plus the step's own `on_load`
    pub fn load(&self, id: &str) -> Result<(), WizardError> {
        let mut step = self.step.borrow_mut();
        step.base_mut().setup_description()?;
        step.on_load().map_err(|source| {
            tracing::error!("Error at onLoad of step '{}': {:#}", id, source);
            WizardError::StepLoad {
                step: id.to_string(),
                source,
            }
        })
    }

    /// Build or bind the step's navigation controls. Empty is a no-op.
    pub fn set_navigation(&self, id: &str, descriptors: &[NavigationDescriptor]) -> Result<(), WizardError> {
        if descriptors.is_empty() {
            return Ok(());
        }

        let mut step = self.step.borrow_mut();
        let base = step.base_mut();
        let strings = base.strings.clone();
        resolve_navigation(id, &mut base.view, &strings, descriptors)
    }

    pub fn set_next_command(&self, command: NavCommand) {
        self.step.borrow_mut().base_mut().set_next_command(command);
    }

    pub fn set_prev_command(&self, command: NavCommand) {
        self.step.borrow_mut().base_mut().set_prev_command(command);
    }

    pub fn set_custom_command(&self, command: CustomCommand) {
        self.step.borrow_mut().base_mut().set_custom_command(command);
    }

    pub fn set_context_accessor(&self, accessor: ContextAccessor) {
        self.step.borrow_mut().base_mut().set_context_accessor(accessor);
    }

    /// Schedule `on_shown` on the UI loop (never runs inline)
    pub fn trigger_show(&self, ui: &UiLoop) {
        let step = self.step.clone();
        ui.post(move || step.borrow_mut().on_shown());
    }

    /// Schedule `on_hide` on the UI loop (never runs inline)
    pub fn trigger_hide(&self, ui: &UiLoop) {
        let step = self.step.clone();
        ui.post(move || step.borrow_mut().on_hide());
    }

    /// User activated a control. Returns `false` when it is missing,
    /// disabled or has nothing to do.
    pub fn activate(&self, ui: &UiLoop, target: &ControlRef) -> bool {
        let action = {
            let view = self.view();
            match view.resolve(target) {
                Some(control) if control.enabled => control.action.clone(),
                Some(_) => {
                    tracing::debug!("Ignoring activation of disabled control {:?}", target);
                    None
                }
                None => {
                    tracing::warn!("No control {:?} to activate", target);
                    None
                }
            }
        };

        match action {
            Some(action) => {
                let step = self.step.clone();
                ui.post(move || step.borrow_mut().on_action(&action));
                true
            }
            None => false,
        }
    }

    /// User edited an input or picked a choice
    pub fn set_value(&self, ui: &UiLoop, id: &str, value: &str) -> bool {
        let stored = self
            .step
            .borrow_mut()
            .base_mut()
            .view_mut()
            .set_input_value(id, value);

        if stored {
            let step = self.step.clone();
            let (id, value) = (id.to_string(), value.to_string());
            ui.post(move || step.borrow_mut().on_value_changed(&id, &value));
        }

        stored
    }
}

impl std::fmt::Debug for StepHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepHandle").finish_non_exhaustive()
    }
}

//! Wizard Controller - Ordered steps, navigation and lifecycle transitions
//!
//! The wizard owns the step sequence and the index of the active step. It
//! wires every step during `setup` and moves between steps in response to
//! commands the steps post onto the UI loop.
//!
//! ARCHITECTURE: a transition always runs hide(current), unmount(current),
//! index update, mount(target), show(target), in that order. The hide and
//! show hooks are posted to the UI loop, so they run after the transition
//! returns and never inside a step's own callback.

use crate::context::{ContextAccessor, Session};
use crate::error::{NavigationMiss, WizardError};
use crate::ui::host::WizardHost;
use crate::ui::main_loop::UiLoop;
use crate::ui::nav::NavigationDescriptor;
use crate::ui::step::StepHandle;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

/// Navigation request from a step, run by the wizard on the UI loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    /// Jump to the step with this id
    Custom(String),
}

/// One registered step
pub struct StepEntry {
    pub id: String,
    /// Shown in the progress strip
    pub title: String,
    pub step: StepHandle,
    pub navs: Vec<NavigationDescriptor>,
}

impl StepEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>, step: StepHandle) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            step,
            navs: Vec::new(),
        }
    }

    pub fn nav(mut self, descriptor: NavigationDescriptor) -> Self {
        self.navs.push(descriptor);
        self
    }
}

struct Inner {
    ui: UiLoop,
    host: RefCell<Box<dyn WizardHost>>,
    steps: RefCell<Vec<StepEntry>>,
    current: Cell<Option<usize>>,
    set_up: Cell<bool>,
    /// View revision the host last saw for the mounted step
    rendered: Cell<Option<u64>>,
    session: Session,
}

/// The wizard controller. Clones share the same wizard.
#[derive(Clone)]
pub struct Wizard {
    inner: Rc<Inner>,
}

impl Wizard {
    pub fn new(ui: &UiLoop, host: impl WizardHost + 'static) -> Self {
        Self {
            inner: Rc::new(Inner {
                ui: ui.clone(),
                host: RefCell::new(Box::new(host)),
                steps: RefCell::new(Vec::new()),
                current: Cell::new(None),
                set_up: Cell::new(false),
                rendered: Cell::new(None),
                session: Session::default(),
            }),
        }
    }

    /// Append a step. Ids are checked by `setup`.
    pub fn add_step(&self, entry: StepEntry) {
        if self.inner.set_up.get() {
            tracing::warn!("Step '{}' added after setup will not be wired", entry.id);
        }
        tracing::debug!("Registered step '{}'", entry.id);
        self.inner.steps.borrow_mut().push(entry);
    }

    /// Load and wire every step, draw the progress strip, show the first step
    pub fn setup(&self) -> Result<(), WizardError> {
        if self.inner.set_up.replace(true) {
            return Err(WizardError::AlreadySetUp);
        }

        {
            let steps = self.inner.steps.borrow();
            let mut seen = HashSet::new();
            for entry in steps.iter() {
                if !seen.insert(entry.id.as_str()) {
                    return Err(WizardError::DuplicateStep(entry.id.clone()));
                }
            }

            for entry in steps.iter() {
                entry.step.load(&entry.id)?;
            }

            for (index, entry) in steps.iter().enumerate() {
                entry.step.set_navigation(&entry.id, &entry.navs)?;
                self.wire(&entry.step);
                self.inner
                    .host
                    .borrow_mut()
                    .attach(index, &entry.id, &entry.step.view());
            }

            let titles: Vec<String> = steps.iter().map(|e| e.title.clone()).collect();
            self.inner.host.borrow_mut().render_progress(&titles);

            tracing::info!("Wizard set up with {} steps", steps.len());
        }

        if self.len() > 0 {
            self.transition(0);
        }

        Ok(())
    }

    pub fn navigate_next(&self) {
        match self.inner.current.get() {
            Some(index) if index + 1 < self.len() => self.transition(index + 1),
            _ => tracing::debug!("Next: already at the last step"),
        }
    }

    pub fn navigate_prev(&self) {
        match self.inner.current.get() {
            Some(index) if index > 0 => self.transition(index - 1),
            _ => tracing::debug!("Prev: already at the first step"),
        }
    }

    /// Jump to the step with id `key`. A miss alerts the user and changes nothing.
    pub fn navigate_custom(&self, key: &str) -> Result<(), NavigationMiss> {
        let target = self
            .inner
            .steps
            .borrow()
            .iter()
            .position(|entry| entry.id == key);

        match target {
            Some(index) => {
                self.transition(index);
                Ok(())
            }
            None => {
                let miss = NavigationMiss { key: key.to_string() };
                tracing::warn!("{}", miss);
                self.inner.host.borrow_mut().alert(&miss.to_string());
                Err(miss)
            }
        }
    }

    /// Run a navigation command now
    pub fn dispatch(&self, command: Command) {
        tracing::debug!("Dispatching {:?}", command);
        match command {
            Command::Next => self.navigate_next(),
            Command::Prev => self.navigate_prev(),
            Command::Custom(key) => {
                // Already reported through the host
                let _ = self.navigate_custom(&key);
            }
        }
    }

    /// Queue a navigation command behind the work already on the UI loop
    pub fn post(&self, command: Command) {
        post_command(&self.inner.ui, Rc::downgrade(&self.inner), command);
    }

    pub fn current_index(&self) -> Option<usize> {
        self.inner.current.get()
    }

    pub fn current_step_id(&self) -> Option<String> {
        let index = self.inner.current.get()?;
        self.inner.steps.borrow().get(index).map(|e| e.id.clone())
    }

    pub fn current_step(&self) -> Option<StepHandle> {
        let index = self.inner.current.get()?;
        self.inner.steps.borrow().get(index).map(|e| e.step.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.steps.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn step(&self, id: &str) -> Option<StepHandle> {
        self.inner
            .steps
            .borrow()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.step.clone())
    }

    pub fn step_ids(&self) -> Vec<String> {
        self.inner.steps.borrow().iter().map(|e| e.id.clone()).collect()
    }

    /// Accessor for the current session's context
    pub fn context(&self) -> ContextAccessor {
        self.inner.session.accessor()
    }

    /// Start over with an empty context
    pub fn new_session(&self) {
        tracing::info!("Starting a new wizard session");
        self.inner.session.renew();
    }

    pub fn ui(&self) -> &UiLoop {
        &self.inner.ui
    }

    /// Re-render the mounted step if its view changed since the host last saw it
    pub fn sync(&self) {
        let Some(index) = self.inner.current.get() else {
            return;
        };

        let steps = self.inner.steps.borrow();
        let Some(entry) = steps.get(index) else {
            return;
        };

        let view = entry.step.view();
        if self.inner.rendered.get() != Some(view.revision()) {
            self.inner.rendered.set(Some(view.revision()));
            self.inner.host.borrow_mut().refresh(index, &entry.id, &view);
        }
    }

    fn wire(&self, step: &StepHandle) {
        let ui = self.inner.ui.clone();

        let (queue, wizard) = (ui.clone(), Rc::downgrade(&self.inner));
        step.set_next_command(Rc::new(move || {
            post_command(&queue, wizard.clone(), Command::Next)
        }));

        let (queue, wizard) = (ui.clone(), Rc::downgrade(&self.inner));
        step.set_prev_command(Rc::new(move || {
            post_command(&queue, wizard.clone(), Command::Prev)
        }));

        let (queue, wizard) = (ui, Rc::downgrade(&self.inner));
        step.set_custom_command(Rc::new(move |key: &str| {
            post_command(&queue, wizard.clone(), Command::Custom(key.to_string()))
        }));

        step.set_context_accessor(self.inner.session.accessor());
    }

    fn transition(&self, target: usize) {
        let steps = self.inner.steps.borrow();
        let Some(next) = steps.get(target) else {
            return;
        };

        if let Some(index) = self.inner.current.get() {
            if let Some(current) = steps.get(index) {
                current.step.trigger_hide(&self.inner.ui);
                self.inner.host.borrow_mut().unmount(index, &current.id);
            }
        }

        self.inner.current.set(Some(target));

        {
            let view = next.step.view();
            self.inner.rendered.set(Some(view.revision()));
            self.inner.host.borrow_mut().mount(target, &next.id, &view);
        }
        next.step.trigger_show(&self.inner.ui);

        tracing::info!("Showing step '{}' ({}/{})", next.id, target + 1, steps.len());
    }
}

fn post_command(ui: &UiLoop, wizard: Weak<Inner>, command: Command) {
    ui.post(move || match wizard.upgrade() {
        Some(inner) => Wizard { inner }.dispatch(command),
        None => tracing::debug!("Wizard dropped; ignoring {:?}", command),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BindingFailure;
    use crate::i18n::Catalog;
    use crate::ui::host::{HostEvent, RecordingHost};
    use crate::ui::step::{Step, StepBase};
    use crate::ui::view::{Control, ControlRef};
    use std::path::PathBuf;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Traced {
        base: StepBase,
        id: String,
        log: Log,
        fail_load: bool,
    }

    impl Step for Traced {
        fn base(&self) -> &StepBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut StepBase {
            &mut self.base
        }

        fn on_load(&mut self) -> anyhow::Result<()> {
            self.log.borrow_mut().push(format!("load({})", self.id));
            if self.fail_load {
                anyhow::bail!("cannot load {}", self.id);
            }
            Ok(())
        }

        fn on_shown(&mut self) {
            self.log.borrow_mut().push(format!("show({})", self.id));
        }

        fn on_hide(&mut self) {
            self.log.borrow_mut().push(format!("hide({})", self.id));
        }
    }

    fn traced(id: &str, log: &Log) -> StepHandle {
        traced_with(id, log, false)
    }

    fn traced_with(id: &str, log: &Log, fail_load: bool) -> StepHandle {
        let mut base = StepBase::new(Catalog::from_pairs(
            id,
            &[("stage_desc", "Step description"), ("next", "Next"), ("back", "Back")],
        ));
        base.view_mut().push(Control::button("goBtn", "Go"));
        base.view_mut().push(Control::label("note", ""));
        base.view_mut().push(Control::input("name", "Name"));

        StepHandle::from_step(Traced {
            base,
            id: id.to_string(),
            log: log.clone(),
            fail_load,
        })
    }

    fn entry(id: &str, log: &Log) -> StepEntry {
        StepEntry::new(id, id.to_uppercase(), traced(id, log))
            .nav(NavigationDescriptor::prev("%back"))
            .nav(NavigationDescriptor::next("%next"))
    }

    fn wizard_abc() -> (UiLoop, Wizard, RecordingHost, Log) {
        let ui = UiLoop::new();
        let host = RecordingHost::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let wizard = Wizard::new(&ui, host.clone());
        for id in ["a", "b", "c"] {
            wizard.add_step(entry(id, &log));
        }
        (ui, wizard, host, log)
    }

    fn shows_and_hides(log: &Log) -> Vec<String> {
        log.borrow()
            .iter()
            .filter(|e| !e.starts_with("load"))
            .cloned()
            .collect()
    }

    /// Click the n-th navigation control of the active step and pump
    fn click_nav(ui: &UiLoop, wizard: &Wizard, n: usize) {
        let step = wizard.current_step().unwrap();
        assert!(step.activate(ui, &ControlRef::Nav(n)));
        ui.run_pending();
    }

    #[test]
    fn test_forward_back_and_jump_trace() {
        let (ui, wizard, _host, log) = wizard_abc();
        wizard.setup().unwrap();
        ui.run_pending();

        click_nav(&ui, &wizard, 1); // next
        click_nav(&ui, &wizard, 1); // next
        click_nav(&ui, &wizard, 0); // back
        wizard.navigate_custom("a").unwrap();
        ui.run_pending();

        assert_eq!(
            shows_and_hides(&log),
            vec![
                "show(a)", "hide(a)", "show(b)", "hide(b)", "show(c)", "hide(c)", "show(b)",
                "hide(b)", "show(a)"
            ]
        );
        assert_eq!(wizard.current_index(), Some(0));
    }

    #[test]
    fn test_setup_loads_every_step_before_showing_the_first() {
        let (ui, wizard, host, log) = wizard_abc();
        assert_eq!(wizard.current_index(), None);

        wizard.setup().unwrap();
        assert_eq!(wizard.current_index(), Some(0));
        assert_eq!(wizard.current_step_id().as_deref(), Some("a"));

        // Show is deferred to the UI loop
        assert_eq!(*log.borrow(), vec!["load(a)", "load(b)", "load(c)"]);
        ui.run_pending();
        assert_eq!(log.borrow().last().map(String::as_str), Some("show(a)"));

        assert_eq!(
            host.events(),
            vec![
                HostEvent::Attach("a".into()),
                HostEvent::Attach("b".into()),
                HostEvent::Attach("c".into()),
                HostEvent::Progress(vec!["A".into(), "B".into(), "C".into()]),
                HostEvent::Mount("a".into()),
            ]
        );
    }

    #[test]
    fn test_setup_resolves_descriptors_and_descriptions() {
        let (_ui, wizard, _host, _log) = wizard_abc();
        wizard.setup().unwrap();

        let step = wizard.step("b").unwrap();
        let view = step.view();
        let labels: Vec<&str> = view.navigation().iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Back", "Next"]);
        assert_eq!(view.description(), Some("Step description"));
    }

    #[test]
    fn test_boundaries_are_noops() {
        let (ui, wizard, host, log) = wizard_abc();
        wizard.setup().unwrap();
        ui.run_pending();
        host.clear();
        log.borrow_mut().clear();

        wizard.navigate_prev();
        ui.run_pending();
        assert_eq!(wizard.current_index(), Some(0));

        wizard.navigate_next();
        wizard.navigate_next();
        ui.run_pending();
        log.borrow_mut().clear();
        host.clear();

        wizard.navigate_next();
        ui.run_pending();
        assert_eq!(wizard.current_index(), Some(2));
        assert!(log.borrow().is_empty());
        assert!(host.events().is_empty());
    }

    #[test]
    fn test_transition_unmounts_before_mounting() {
        let (ui, wizard, host, _log) = wizard_abc();
        wizard.setup().unwrap();
        ui.run_pending();
        host.clear();

        wizard.navigate_next();
        assert_eq!(
            host.events(),
            vec![HostEvent::Unmount("a".into()), HostEvent::Mount("b".into())]
        );
    }

    #[test]
    fn test_custom_jump_and_miss() {
        let (ui, wizard, host, log) = wizard_abc();
        wizard.setup().unwrap();
        ui.run_pending();

        log.borrow_mut().clear();
        host.clear();

        // Non-adjacent jump: one hide/show pair, nothing for "b"
        wizard.navigate_custom("c").unwrap();
        ui.run_pending();
        assert_eq!(wizard.current_step_id().as_deref(), Some("c"));
        assert_eq!(*log.borrow(), vec!["hide(a)", "show(c)"]);
        assert_eq!(
            host.events(),
            vec![HostEvent::Unmount("a".into()), HostEvent::Mount("c".into())]
        );

        log.borrow_mut().clear();
        let miss = wizard.navigate_custom("summary").unwrap_err();
        ui.run_pending();

        assert_eq!(miss.key, "summary");
        assert_eq!(host.alerts(), vec!["There is no view 'summary'".to_string()]);
        assert_eq!(wizard.current_step_id().as_deref(), Some("c"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_custom_command_from_step_goes_through_queue() {
        let ui = UiLoop::new();
        let host = RecordingHost::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let wizard = Wizard::new(&ui, host.clone());
        wizard.add_step(
            StepEntry::new("a", "A", traced("a", &log))
                .nav(NavigationDescriptor::custom("c", "Skip"))
                .nav(NavigationDescriptor::custom("nowhere", "Lost")),
        );
        wizard.add_step(entry("b", &log));
        wizard.add_step(entry("c", &log));
        wizard.setup().unwrap();
        ui.run_pending();

        let step = wizard.current_step().unwrap();
        assert!(step.activate(&ui, &ControlRef::Nav(1)));
        ui.run_pending();
        assert_eq!(wizard.current_index(), Some(0));
        assert_eq!(host.alerts().len(), 1);

        assert!(step.activate(&ui, &ControlRef::Nav(0)));
        // Nothing moves until the loop runs
        assert_eq!(wizard.current_index(), Some(0));
        ui.run_pending();
        assert_eq!(wizard.current_step_id().as_deref(), Some("c"));
    }

    #[test]
    fn test_bound_descriptor_drives_navigation() {
        let ui = UiLoop::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let wizard = Wizard::new(&ui, RecordingHost::new());
        wizard.add_step(
            StepEntry::new("a", "A", traced("a", &log)).nav(NavigationDescriptor::next("%next").bind("goBtn")),
        );
        wizard.add_step(entry("b", &log));
        wizard.setup().unwrap();
        ui.run_pending();

        let step = wizard.current_step().unwrap();
        assert!(step.view().navigation().is_empty());
        assert_eq!(step.view().lookup("goBtn").unwrap().label, "Next");

        assert!(step.activate(&ui, &"goBtn".into()));
        ui.run_pending();
        assert_eq!(wizard.current_step_id().as_deref(), Some("b"));
    }

    #[test]
    fn test_binding_error_aborts_setup() {
        let ui = UiLoop::new();
        let host = RecordingHost::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let wizard = Wizard::new(&ui, host.clone());
        wizard.add_step(entry("a", &log));
        wizard.add_step(
            StepEntry::new("b", "B", traced("b", &log)).nav(NavigationDescriptor::next("Go").bind("note")),
        );

        match wizard.setup() {
            Err(WizardError::Binding { step, element, failure }) => {
                assert_eq!(step, "b");
                assert_eq!(element, "note");
                assert_eq!(failure, BindingFailure::NotInteractive);
            }
            other => panic!("unexpected: {:?}", other),
        }

        ui.run_pending();
        assert_eq!(wizard.current_index(), None);
        assert!(!host.events().iter().any(|e| matches!(e, HostEvent::Mount(_))));
        assert!(!log.borrow().iter().any(|e| e.starts_with("show")));
    }

    #[test]
    fn test_load_failure_aborts_before_wiring() {
        let ui = UiLoop::new();
        let host = RecordingHost::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let wizard = Wizard::new(&ui, host.clone());
        wizard.add_step(entry("a", &log));
        wizard.add_step(StepEntry::new("b", "B", traced_with("b", &log, true)));

        assert!(matches!(
            wizard.setup(),
            Err(WizardError::StepLoad { ref step, .. }) if step == "b"
        ));
        assert!(host.events().is_empty());
        assert!(wizard.step("a").unwrap().view().navigation().is_empty());
    }

    #[test]
    fn test_duplicate_ids_and_second_setup_rejected() {
        let ui = UiLoop::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let wizard = Wizard::new(&ui, RecordingHost::new());
        wizard.add_step(entry("a", &log));
        wizard.add_step(entry("a", &log));
        assert!(matches!(wizard.setup(), Err(WizardError::DuplicateStep(ref id)) if id == "a"));

        let (_ui, wizard, _host, _log) = wizard_abc();
        wizard.setup().unwrap();
        assert!(matches!(wizard.setup(), Err(WizardError::AlreadySetUp)));
    }

    #[test]
    fn test_empty_wizard_sets_up_without_activating() {
        let ui = UiLoop::new();
        let host = RecordingHost::new();
        let wizard = Wizard::new(&ui, host.clone());

        wizard.setup().unwrap();
        assert!(wizard.is_empty());
        assert_eq!(wizard.current_index(), None);
        assert_eq!(host.events(), vec![HostEvent::Progress(vec![])]);
    }

    #[test]
    fn test_new_session_replaces_context_for_steps() {
        let (_ui, wizard, _host, _log) = wizard_abc();
        wizard.setup().unwrap();

        let step = wizard.step("b").unwrap();
        let accessor = step.borrow().base().context().cloned().unwrap();
        accessor.with_mut(|ctx| ctx.import.selected_file = Some(PathBuf::from("sprint.csv")));
        assert!(wizard.context().with(|ctx| ctx.import.selected_file.is_some()));

        wizard.new_session();
        assert!(accessor.with(|ctx| ctx.import.selected_file.is_none()));
        assert!(wizard.context().with(|ctx| ctx.import.selected_file.is_none()));
    }

    #[test]
    fn test_sync_refreshes_only_changed_views() {
        let (ui, wizard, host, _log) = wizard_abc();
        wizard.setup().unwrap();
        ui.run_pending();
        host.clear();

        wizard.sync();
        assert!(host.events().is_empty());

        // Edits the host already shows do not trigger a re-render
        let step = wizard.current_step().unwrap();
        assert!(step.update_view(|view| view.set_input_value("name", "sprint 7")));
        wizard.sync();
        assert!(host.events().is_empty());

        step.update_view(|view| view.set_label("note", "Loaded 3 rows"));
        wizard.sync();
        wizard.sync();
        assert_eq!(host.events(), vec![HostEvent::Refresh("a".into())]);
        assert_eq!(
            host.last_view().unwrap().lookup("note").unwrap().label,
            "Loaded 3 rows"
        );
    }

    #[test]
    fn test_posted_commands_run_in_order() {
        let (ui, wizard, _host, _log) = wizard_abc();
        wizard.setup().unwrap();

        wizard.post(Command::Next);
        wizard.post(Command::Next);
        wizard.post(Command::Prev);
        assert_eq!(wizard.current_index(), Some(0));

        ui.run_pending();
        assert_eq!(wizard.current_step_id().as_deref(), Some("b"));
    }
}

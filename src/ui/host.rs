//! Wizard Host - The surface a wizard renders into
//!
//! The controller never touches widgets. It tells its host which step view
//! to show, draws the progress strip once and raises alerts; the host maps
//! that onto GTK, a terminal, or an in-memory log for tests.

use crate::ui::view::StepView;
use std::cell::RefCell;
use std::rc::Rc;

pub trait WizardHost {
    /// Draw the progress strip. Called once, from `Wizard::setup`.
    fn render_progress(&mut self, titles: &[String]);

    /// A step's view joined the content region (not shown yet)
    fn attach(&mut self, _index: usize, _id: &str, _view: &StepView) {}

    /// Show `view` as the active step
    fn mount(&mut self, index: usize, id: &str, view: &StepView);

    /// Take the active step's view off screen
    fn unmount(&mut self, index: usize, id: &str);

    /// The mounted step changed its view
    fn refresh(&mut self, index: usize, id: &str, view: &StepView) {
        self.mount(index, id, view);
    }

    /// Tell the user something went wrong
    fn alert(&mut self, message: &str);
}

/// Everything a `RecordingHost` was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Progress(Vec<String>),
    Attach(String),
    Mount(String),
    Unmount(String),
    Refresh(String),
    Alert(String),
}

/// Host that only records calls. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    events: Rc<RefCell<Vec<HostEvent>>>,
    last_view: Rc<RefCell<Option<StepView>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn alerts(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Alert(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Snapshot of the view most recently mounted or refreshed
    pub fn last_view(&self) -> Option<StepView> {
        self.last_view.borrow().clone()
    }

    fn record(&self, event: HostEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl WizardHost for RecordingHost {
    fn render_progress(&mut self, titles: &[String]) {
        self.record(HostEvent::Progress(titles.to_vec()));
    }

    fn attach(&mut self, _index: usize, id: &str, _view: &StepView) {
        self.record(HostEvent::Attach(id.to_string()));
    }

    fn mount(&mut self, _index: usize, id: &str, view: &StepView) {
        *self.last_view.borrow_mut() = Some(view.clone());
        self.record(HostEvent::Mount(id.to_string()));
    }

    fn unmount(&mut self, _index: usize, id: &str) {
        self.record(HostEvent::Unmount(id.to_string()));
    }

    fn refresh(&mut self, _index: usize, id: &str, view: &StepView) {
        *self.last_view.borrow_mut() = Some(view.clone());
        self.record(HostEvent::Refresh(id.to_string()));
    }

    fn alert(&mut self, message: &str) {
        self.record(HostEvent::Alert(message.to_string()));
    }
}

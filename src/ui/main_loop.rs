//! UI Loop - The single UI-thread work queue
//!
//! Everything that must happen "on the UI thread" goes through here:
//! lifecycle hooks, navigation commands and task continuations. Jobs run to
//! completion one after another, in the order they were scheduled.
//!
//! ARCHITECTURE: `UiLoop` is owned by the UI thread and is not `Send`.
//! Other threads talk to it through a cloneable `UiHandle`, which pushes
//! messages into a `std::sync::mpsc` inbox. The owning thread drains the
//! inbox into its local queue whenever it pumps (from a GTK timeout, the
//! console driver, or a test).

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Identifies one background task whose continuation waits on the UI thread
pub type TaskId = u64;

type LocalJob = Box<dyn FnOnce()>;
type Completion = Box<dyn FnOnce(Box<dyn Any + Send>)>;

/// Messages sent from other threads to the UI thread
pub(crate) enum UiMessage {
    /// Run a closure on the UI thread
    Invoke(Box<dyn FnOnce() + Send>),
    /// A task continuation (already bound to its result) is ready
    TaskDone(Box<dyn FnOnce() + Send>),
    /// A task result for a continuation registered on the UI thread
    Completed {
        task: TaskId,
        result: Box<dyn Any + Send>,
    },
}

/// Thread-safe handle for posting work onto the UI thread
#[derive(Clone)]
pub struct UiHandle {
    sender: Sender<UiMessage>,
    in_flight: Arc<AtomicUsize>,
    next_task: Arc<AtomicU64>,
    ui_thread: ThreadId,
}

impl UiHandle {
    /// Schedule a closure to run on the UI thread
    pub fn invoke<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.send(UiMessage::Invoke(Box::new(job)));
    }

    /// Whether the caller is running on the UI thread
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.ui_thread
    }

    pub(crate) fn send(&self, message: UiMessage) {
        if self.sender.send(message).is_err() {
            // Receiver dropped: the UI loop is gone
            tracing::warn!("UI loop closed; dropping message");
        }
    }

    pub(crate) fn allocate_task(&self) -> TaskId {
        self.next_task.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn task_started(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }
}

struct Inner {
    queue: RefCell<VecDeque<LocalJob>>,
    pending: RefCell<HashMap<TaskId, Completion>>,
    receiver: Receiver<UiMessage>,
    handle: UiHandle,
}

/// The UI thread's work queue
#[derive(Clone)]
pub struct UiLoop {
    inner: Rc<Inner>,
}

impl UiLoop {
    /// Create a loop bound to the current thread
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        let handle = UiHandle {
            sender,
            in_flight: Arc::new(AtomicUsize::new(0)),
            next_task: Arc::new(AtomicU64::new(1)),
            ui_thread: thread::current().id(),
        };

        Self {
            inner: Rc::new(Inner {
                queue: RefCell::new(VecDeque::new()),
                pending: RefCell::new(HashMap::new()),
                receiver,
                handle,
            }),
        }
    }

    /// Cloneable, `Send` handle to this loop
    pub fn handle(&self) -> UiHandle {
        self.inner.handle.clone()
    }

    /// Schedule a job behind everything already queued
    pub fn post<F>(&self, job: F)
    where
        F: FnOnce() + 'static,
    {
        self.inner.queue.borrow_mut().push_back(Box::new(job));
    }

    /// Number of task continuations still waiting for their worker
    pub fn in_flight(&self) -> usize {
        self.inner.handle.in_flight.load(Ordering::SeqCst)
    }

    /// Whether nothing is queued locally right now
    pub fn is_idle(&self) -> bool {
        self.inner.queue.borrow().is_empty() && self.in_flight() == 0
    }

    /// Register a UI-thread continuation for a task that is about to start
    pub(crate) fn register_completion(&self, task: TaskId, completion: Completion) {
        self.inner.pending.borrow_mut().insert(task, completion);
    }

    /// Run queued jobs until the queue is empty. Returns how many ran.
    ///
    /// Jobs scheduled while pumping (including ones posted by other jobs)
    /// run in the same call.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;

        loop {
            self.drain_inbox();

            // Pop before running so the job may post more work
            let job = self.inner.queue.borrow_mut().pop_front();
            match job {
                Some(job) => {
                    job();
                    ran += 1;
                }
                None => break,
            }
        }

        ran
    }

    /// Pump until every queued job ran and no task continuation is pending,
    /// blocking on the inbox in between. Returns `false` on timeout.
    pub fn run_until_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        loop {
            self.run_pending();
            if self.in_flight() == 0 {
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }

            match self.inner.receiver.recv_timeout(deadline - now) {
                Ok(message) => self.accept(message),
                Err(RecvTimeoutError::Timeout) => return false,
                // The loop owns a sender, so this cannot happen while we exist
                Err(RecvTimeoutError::Disconnected) => return true,
            }
        }
    }

    fn drain_inbox(&self) {
        while let Ok(message) = self.inner.receiver.try_recv() {
            self.accept(message);
        }
    }

    fn accept(&self, message: UiMessage) {
        match message {
            UiMessage::Invoke(job) => self.post(job),
            UiMessage::TaskDone(job) => {
                let in_flight = self.inner.handle.in_flight.clone();
                self.post(move || {
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    job();
                });
            }
            UiMessage::Completed { task, result } => {
                let completion = self.inner.pending.borrow_mut().remove(&task);
                let in_flight = self.inner.handle.in_flight.clone();
                match completion {
                    Some(completion) => self.post(move || {
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        completion(result);
                    }),
                    None => {
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        tracing::warn!("No continuation registered for task {}", task);
                    }
                }
            }
        }
    }
}

impl Default for UiLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_jobs_run_in_scheduling_order() {
        let ui = UiLoop::new();
        let trace = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let trace = trace.clone();
            ui.post(move || trace.borrow_mut().push(i));
        }

        assert!(trace.borrow().is_empty());
        assert_eq!(ui.run_pending(), 3);
        assert_eq!(*trace.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_jobs_posted_while_pumping_run_after_current_queue() {
        let ui = UiLoop::new();
        let trace = Rc::new(RefCell::new(Vec::new()));

        let nested_ui = ui.clone();
        let nested_trace = trace.clone();
        ui.post(move || {
            nested_trace.borrow_mut().push("outer");
            let trace = nested_trace.clone();
            nested_ui.post(move || trace.borrow_mut().push("nested"));
        });
        let tail = trace.clone();
        ui.post(move || tail.borrow_mut().push("second"));

        ui.run_pending();
        assert_eq!(*trace.borrow(), vec!["outer", "second", "nested"]);
    }

    #[test]
    fn test_invoke_from_other_thread_runs_on_ui_thread() {
        let ui = UiLoop::new();
        let handle = ui.handle();
        let ui_thread = thread::current().id();
        let observed = Rc::new(Cell::new(None));

        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            assert!(!handle.is_ui_thread());
            handle.invoke(move || {
                done_tx.send(thread::current().id()).unwrap();
            });
        })
        .join()
        .unwrap();

        ui.run_pending();
        observed.set(done_rx.try_recv().ok());
        assert_eq!(observed.get(), Some(ui_thread));
        assert!(ui.handle().is_ui_thread());
    }

    #[test]
    fn test_run_until_idle_returns_immediately_without_tasks() {
        let ui = UiLoop::new();
        assert!(ui.run_until_idle(Duration::from_millis(10)));
        assert!(ui.is_idle());
    }
}

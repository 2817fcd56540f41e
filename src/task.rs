//! Task Bridge - Run blocking work off the UI thread, resume on it
//!
//! ARCHITECTURE: work runs on the blocking pool of a Tokio runtime. A small
//! async watcher awaits the worker's `JoinHandle` and posts the outcome to
//! the UI loop's inbox, so the continuation only ever runs on the UI thread
//! and only after the worker has fully returned (or failed). A runtime that
//! shuts down first drops the watcher, which then reports `Cancelled`.
//!
//! ```no_run
//! # use progressive::task::{TaskBridge, TaskRuntime};
//! # use progressive::ui::UiLoop;
//! let ui = UiLoop::new();
//! let runtime = TaskRuntime::new().unwrap();
//! let tasks = TaskBridge::new(&ui, runtime.handle());
//!
//! tasks
//!     .run(|n: u64| Ok(n * 2), 21)
//!     .then_ui(|result| println!("{:?}", result.ok()));
//! ```

use crate::error::TaskError;
use crate::ui::{UiHandle, UiLoop};
use crate::ui::main_loop::UiMessage;
use anyhow::{Context, Result};
use std::any::Any;
use tokio::runtime::{Handle, Runtime};
use tokio::task::{JoinError, JoinHandle};

/// Outcome delivered to a continuation
pub type TaskResult<T> = std::result::Result<T, TaskError>;

/// Worker pool owned by the application
pub struct TaskRuntime {
    runtime: Runtime,
}

impl TaskRuntime {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("progressive-worker")
            .enable_all()
            .build()
            .context("Failed to initialize async runtime")?;

        Ok(Self { runtime })
    }

    pub fn handle(&self) -> Handle {
        self.runtime.handle().clone()
    }
}

/// UI-thread side of the bridge
///
/// Continuations registered through it may capture UI-only state (`Rc`,
/// views, steps), since they never leave the UI thread.
#[derive(Clone)]
pub struct TaskBridge {
    ui: UiLoop,
    runtime: Handle,
}

impl TaskBridge {
    pub fn new(ui: &UiLoop, runtime: Handle) -> Self {
        Self {
            ui: ui.clone(),
            runtime,
        }
    }

    /// Start `work(arg)` on a worker thread
    pub fn run<A, T, F>(&self, work: F, arg: A) -> Continuation<T>
    where
        A: Send + 'static,
        T: Send + 'static,
        F: FnOnce(A) -> Result<T> + Send + 'static,
    {
        Continuation {
            join: spawn_worker(&self.runtime, work, arg),
            ui: self.ui.clone(),
            runtime: self.runtime.clone(),
        }
    }

    /// A `Send` flavour of this bridge for use from other threads
    pub fn remote(&self) -> RemoteTaskBridge {
        RemoteTaskBridge {
            ui: self.ui.handle(),
            runtime: self.runtime.clone(),
        }
    }
}

/// Pending result of `TaskBridge::run`
#[must_use = "a task result is discarded unless a continuation is registered"]
pub struct Continuation<T> {
    join: JoinHandle<Result<T>>,
    ui: UiLoop,
    runtime: Handle,
}

impl<T: Send + 'static> Continuation<T> {
    /// Run `next` on the UI thread once the worker is done
    pub fn then_ui<G>(self, next: G)
    where
        G: FnOnce(TaskResult<T>) + 'static,
    {
        let handle = self.ui.handle();
        let task = handle.allocate_task();

        self.ui.register_completion(
            task,
            Box::new(move |boxed: Box<dyn Any + Send>| match boxed.downcast::<TaskResult<T>>() {
                Ok(result) => next(*result),
                Err(_) => tracing::error!("Task {} delivered a result of the wrong type", task),
            }),
        );
        handle.task_started();

        let delivery = Delivery::new(move |result: TaskResult<T>| {
            handle.send(UiMessage::Completed {
                task,
                result: Box::new(result),
            });
        });
        watch(&self.runtime, self.join, delivery);
    }
}

/// Thread-safe bridge; continuations must be `Send` but still run on the UI thread
#[derive(Clone)]
pub struct RemoteTaskBridge {
    ui: UiHandle,
    runtime: Handle,
}

impl RemoteTaskBridge {
    pub fn run<A, T, F>(&self, work: F, arg: A) -> RemoteContinuation<T>
    where
        A: Send + 'static,
        T: Send + 'static,
        F: FnOnce(A) -> Result<T> + Send + 'static,
    {
        RemoteContinuation {
            join: spawn_worker(&self.runtime, work, arg),
            ui: self.ui.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

/// Pending result of `RemoteTaskBridge::run`
#[must_use = "a task result is discarded unless a continuation is registered"]
pub struct RemoteContinuation<T> {
    join: JoinHandle<Result<T>>,
    ui: UiHandle,
    runtime: Handle,
}

impl<T: Send + 'static> RemoteContinuation<T> {
    pub fn then_ui<G>(self, next: G)
    where
        G: FnOnce(TaskResult<T>) + Send + 'static,
    {
        let ui = self.ui;
        ui.task_started();

        let delivery = Delivery::new(move |result: TaskResult<T>| {
            ui.send(UiMessage::TaskDone(Box::new(move || next(result))));
        });
        watch(&self.runtime, self.join, delivery);
    }
}

/// Hands a task's outcome to the UI thread exactly once.
///
/// If the watcher is dropped before the worker settled (the runtime shut
/// down), the continuation still runs, with `TaskError::Cancelled`.
struct Delivery<T: Send + 'static> {
    deliver: Option<Box<dyn FnOnce(TaskResult<T>) + Send>>,
}

impl<T: Send + 'static> Delivery<T> {
    fn new(deliver: impl FnOnce(TaskResult<T>) + Send + 'static) -> Self {
        Self {
            deliver: Some(Box::new(deliver)),
        }
    }

    fn finish(mut self, result: TaskResult<T>) {
        if let Some(deliver) = self.deliver.take() {
            deliver(result);
        }
    }
}

impl<T: Send + 'static> Drop for Delivery<T> {
    fn drop(&mut self) {
        if let Some(deliver) = self.deliver.take() {
            tracing::warn!("Background task dropped before it finished");
            deliver(Err(TaskError::Cancelled));
        }
    }
}

/// Await the worker on the runtime and deliver its outcome
fn watch<T: Send + 'static>(runtime: &Handle, join: JoinHandle<Result<T>>, delivery: Delivery<T>) {
    runtime.spawn(async move {
        let result = settle(join.await);
        delivery.finish(result);
    });
}

fn spawn_worker<A, T, F>(runtime: &Handle, work: F, arg: A) -> JoinHandle<Result<T>>
where
    A: Send + 'static,
    T: Send + 'static,
    F: FnOnce(A) -> Result<T> + Send + 'static,
{
    runtime.spawn_blocking(move || work(arg))
}

/// Fold a worker's join outcome into the continuation's result
fn settle<T>(joined: std::result::Result<Result<T>, JoinError>) -> TaskResult<T> {
    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::error!("Background task failed: {:#}", e);
            Err(TaskError::Failed(e))
        }
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let message = panic_message(payload.as_ref());
            tracing::error!("Background task panicked: {}", message);
            Err(TaskError::Panicked(message))
        }
        Err(e) => {
            tracing::warn!("Background task did not finish: {}", e);
            Err(TaskError::Cancelled)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn bridge() -> (UiLoop, TaskRuntime, TaskBridge) {
        let ui = UiLoop::new();
        let runtime = TaskRuntime::new().unwrap();
        let tasks = TaskBridge::new(&ui, runtime.handle());
        (ui, runtime, tasks)
    }

    #[test]
    fn test_continuation_receives_full_result_on_ui_thread() {
        let (ui, _runtime, tasks) = bridge();
        let ui_thread = thread::current().id();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        tasks
            .run(
                |words: Vec<&'static str>| {
                    thread::sleep(Duration::from_millis(20));
                    Ok((thread::current().id(), words.join(" ")))
                },
                vec!["hello", "from", "worker"],
            )
            .then_ui(move |result| {
                let (worker_thread, text) = result.unwrap();
                assert_ne!(worker_thread, thread::current().id());
                sink.borrow_mut().push((thread::current().id(), text));
            });

        assert!(ui.run_until_idle(WAIT));
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, ui_thread);
        assert_eq!(seen[0].1, "hello from worker");
    }

    #[test]
    fn test_continuation_does_not_run_without_pumping() {
        let (ui, _runtime, tasks) = bridge();
        let calls = Rc::new(RefCell::new(0));

        let counter = calls.clone();
        tasks
            .run(|x: i32| Ok(x + 1), 1)
            .then_ui(move |_| *counter.borrow_mut() += 1);

        thread::sleep(Duration::from_millis(50));
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(ui.in_flight(), 1);

        assert!(ui.run_until_idle(WAIT));
        assert_eq!(*calls.borrow(), 1);

        // Nothing more is delivered afterwards
        ui.run_pending();
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_failure_is_delivered_as_error() {
        let (ui, _runtime, tasks) = bridge();
        let outcome = Rc::new(RefCell::new(None));

        let sink = outcome.clone();
        tasks
            .run(|_: ()| -> Result<u8> { anyhow::bail!("disk on fire") }, ())
            .then_ui(move |result| *sink.borrow_mut() = Some(result));

        assert!(ui.run_until_idle(WAIT));
        match outcome.borrow_mut().take() {
            Some(Err(TaskError::Failed(e))) => assert_eq!(e.to_string(), "disk on fire"),
            other => panic!("unexpected outcome: {:?}", other),
        };
    }

    #[test]
    fn test_panic_is_delivered_as_error() {
        let (ui, _runtime, tasks) = bridge();
        let outcome = Rc::new(RefCell::new(None));

        let sink = outcome.clone();
        tasks
            .run(|_: ()| -> Result<u8> { panic!("worker exploded") }, ())
            .then_ui(move |result| *sink.borrow_mut() = Some(result));

        assert!(ui.run_until_idle(WAIT));
        match outcome.borrow_mut().take() {
            Some(Err(TaskError::Panicked(message))) => assert_eq!(message, "worker exploded"),
            other => panic!("unexpected outcome: {:?}", other),
        };
    }

    #[test]
    fn test_shut_down_runtime_delivers_cancelled() {
        let ui = UiLoop::new();
        let runtime = TaskRuntime::new().unwrap();
        let tasks = TaskBridge::new(&ui, runtime.handle());
        drop(runtime);

        let outcome = Rc::new(RefCell::new(None));
        let sink = outcome.clone();
        tasks
            .run(|x: u8| Ok(x), 7)
            .then_ui(move |result| *sink.borrow_mut() = Some(result));

        assert!(ui.run_until_idle(WAIT));
        assert_eq!(ui.in_flight(), 0);
        assert!(matches!(
            outcome.borrow_mut().take(),
            Some(Err(TaskError::Cancelled))
        ));
    }

    #[test]
    fn test_remote_run_still_resumes_on_ui_thread() {
        let (ui, _runtime, tasks) = bridge();
        let remote = tasks.remote();
        let ui_thread = thread::current().id();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            remote
                .run(|s: String| Ok(s.len()), "twelve chars".to_string())
                .then_ui(move |result| {
                    tx.send((thread::current().id(), result.unwrap())).unwrap();
                });
        })
        .join()
        .unwrap();

        assert!(ui.run_until_idle(WAIT));
        let (thread_id, len) = rx.try_recv().unwrap();
        assert_eq!(thread_id, ui_thread);
        assert_eq!(len, 12);
    }

    #[test]
    fn test_each_continuation_runs_exactly_once() {
        let (ui, _runtime, tasks) = bridge();
        let results = Rc::new(RefCell::new(Vec::new()));

        for i in 0..8u32 {
            let sink = results.clone();
            tasks
                .run(move |x: u32| Ok(x * x), i)
                .then_ui(move |r| sink.borrow_mut().push(r.unwrap()));
        }

        assert!(ui.run_until_idle(WAIT));
        let mut results = results.borrow().clone();
        results.sort_unstable();
        assert_eq!(results, vec![0, 1, 4, 9, 16, 25, 36, 49]);
    }
}

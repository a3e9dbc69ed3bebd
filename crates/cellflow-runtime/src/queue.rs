//! Devices, in-order task queues and completion events.
//!
//! # Overview
//!
//! - [`Device`] - Handle to an execution resource; creates queues.
//! - [`Queue`] - In-order task queue backed by one worker thread.
//! - [`Event`] - Completion handle for one submitted task, with start and
//!   end timestamps for profiling.
//!
//! # Ordering Model
//!
//! Tasks submitted to the same queue run strictly in submission order.
//! A task may additionally name events of other queues' tasks it must wait
//! for ([`Queue::submit_after`]); this is how the update driver fences one
//! pass's reads behind the previous pass's writes.
//!
//! Submission itself never blocks. [`Queue::wait`] drains the queue;
//! dropping a queue drains it as well and joins the worker.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

/// The kinds of execution resources a [`Device`] can stand for.
///
/// The bundled runtime emulates an accelerator with host worker threads;
/// the enum leaves room for real offload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DeviceKind {
    /// Host-thread emulation of an in-order accelerator queue.
    #[default]
    Cpu,
}

/// A handle to the execution resource that runs submitted tasks.
///
/// Devices are cheap to clone and compare. The only bundled device is the
/// CPU emulation device, which backs each created queue with one host
/// worker thread.
#[derive(Debug, Clone, Default)]
pub struct Device {
    kind: DeviceKind,
}

impl Device {
    /// Returns the CPU emulation device.
    #[inline]
    pub fn cpu() -> Self {
        Self {
            kind: DeviceKind::Cpu,
        }
    }

    /// Creates a new in-order queue on this device.
    pub fn create_queue(&self) -> Queue {
        match self.kind {
            DeviceKind::Cpu => Queue::spawn(),
        }
    }
}

#[derive(Debug, Default)]
struct EventState {
    started: Option<Instant>,
    finished: Option<Instant>,
    complete: bool,
}

#[derive(Debug)]
struct EventInner {
    state: Mutex<EventState>,
    condvar: Condvar,
}

/// A completion handle for one submitted task.
///
/// Events are cheap to clone; all clones observe the same task. Besides
/// synchronization, an event records when its task started and finished
/// executing, which backs the engine's profiling counters.
#[derive(Clone)]
pub struct Event {
    inner: Arc<EventInner>,
}

impl Event {
    fn new() -> Self {
        Self {
            inner: Arc::new(EventInner {
                state: Mutex::new(EventState::default()),
                condvar: Condvar::new(),
            }),
        }
    }

    fn mark_started(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.started = Some(Instant::now());
    }

    fn mark_complete(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.finished = Some(Instant::now());
        state.complete = true;
        drop(state);
        self.inner.condvar.notify_all();
    }

    /// Blocks until the task has finished executing.
    pub fn wait(&self) {
        let mut state = self.inner.state.lock().unwrap();
        while !state.complete {
            state = self.inner.condvar.wait(state).unwrap();
        }
    }

    /// Returns `true` if the task has finished executing.
    pub fn is_complete(&self) -> bool {
        self.inner.state.lock().unwrap().complete
    }

    /// Returns how long the task ran, or `None` while it is still pending
    /// or running.
    pub fn duration(&self) -> Option<Duration> {
        let state = self.inner.state.lock().unwrap();
        match (state.started, state.finished) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("complete", &self.is_complete())
            .finish()
    }
}

struct Task {
    deps: Vec<Event>,
    job: Box<dyn FnOnce() + Send + 'static>,
    event: Event,
}

/// An in-order task queue.
///
/// Each queue owns one worker thread that executes submitted tasks in
/// submission order. Dropping the queue drains outstanding tasks and joins
/// the worker.
#[derive(Debug)]
pub struct Queue {
    sender: Option<Sender<Task>>,
    worker: Option<JoinHandle<()>>,
}

impl Queue {
    fn spawn() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<Task>();
        let worker = thread::spawn(move || {
            for task in receiver.iter() {
                for dep in &task.deps {
                    dep.wait();
                }
                task.event.mark_started();
                (task.job)();
                task.event.mark_complete();
            }
        });
        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Submits a task. Returns immediately with the task's [`Event`].
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Event {
        self.submit_after(&[], job)
    }

    /// Submits a task that additionally waits for the given events before
    /// executing. Returns immediately with the task's [`Event`].
    pub fn submit_after(&self, deps: &[Event], job: impl FnOnce() + Send + 'static) -> Event {
        let event = Event::new();
        let task = Task {
            deps: deps.to_vec(),
            job: Box::new(job),
            event: event.clone(),
        };
        if let Some(sender) = &self.sender {
            if sender.send(task).is_err() {
                // Worker is gone; resolve the event so waiters don't hang.
                event.mark_started();
                event.mark_complete();
            }
        }
        event
    }

    /// Blocks until every task submitted so far has finished executing.
    pub fn wait(&self) {
        self.submit(|| {}).wait();
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

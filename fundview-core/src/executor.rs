//! Where requests run.
//!
//! The owning thread never blocks on a request. Jobs go to an [`Executor`];
//! their results come back as [`Completion`]s that the owner drains when it is
//! ready to apply them.
//!
//! - [`PoolExecutor`]: a private rayon pool (not the global one) reporting over mpsc.
//! - [`ManualExecutor`]: holds jobs until the caller completes them, in any order.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use tracing::warn;

use crate::error::FetchError;
use crate::fetch::Ticket;

/// A blocking request, run off the owning thread.
pub type Job<T> = Box<dyn FnOnce() -> Result<T, FetchError> + Send + 'static>;

/// A finished job.
#[derive(Debug)]
pub struct Completion<T> {
    pub ticket: Ticket,
    pub outcome: Result<T, FetchError>,
}

pub trait Executor<T> {
    fn spawn(&self, ticket: Ticket, job: Job<T>);

    /// Next finished job, if one is ready. Never blocks.
    fn try_next(&self) -> Option<Completion<T>>;

    /// Next finished job, waiting at most `timeout`.
    fn next_timeout(&self, timeout: Duration) -> Option<Completion<T>>;
}

pub struct PoolExecutor<T> {
    pool: Option<rayon::ThreadPool>,
    tx: Sender<Completion<T>>,
    rx: Receiver<Completion<T>>,
}

impl<T: Send + 'static> PoolExecutor<T> {
    pub fn new(threads: usize) -> Self {
        let (tx, rx) = mpsc::channel();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("fundview-fetch-{i}"))
            .build();
        let pool = match pool {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!(error = %e, "fetch pool unavailable, running requests inline");
                None
            }
        };
        Self { pool, tx, rx }
    }
}

impl<T: Send + 'static> Executor<T> for PoolExecutor<T> {
    fn spawn(&self, ticket: Ticket, job: Job<T>) {
        let tx = self.tx.clone();
        let run = move || {
            let outcome = job();
            // The receiver only disappears when the executor itself is dropped.
            let _ = tx.send(Completion { ticket, outcome });
        };
        match &self.pool {
            Some(pool) => pool.spawn(run),
            None => run(),
        }
    }

    fn try_next(&self) -> Option<Completion<T>> {
        self.rx.try_recv().ok()
    }

    fn next_timeout(&self, timeout: Duration) -> Option<Completion<T>> {
        match self.rx.recv_timeout(timeout) {
            Ok(c) => Some(c),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

struct ManualQueue<T> {
    held: Vec<(Ticket, Job<T>)>,
    done: VecDeque<Completion<T>>,
    spawned: usize,
}

/// Test executor: jobs run only when completed explicitly.
///
/// Clones share one queue, so a test can keep a handle after giving the
/// executor to a session.
pub struct ManualExecutor<T> {
    inner: Rc<RefCell<ManualQueue<T>>>,
}

impl<T> Clone for ManualExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for ManualExecutor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ManualExecutor<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ManualQueue {
                held: Vec::new(),
                done: VecDeque::new(),
                spawned: 0,
            })),
        }
    }

    /// Tickets of jobs not yet completed, oldest first.
    pub fn held(&self) -> Vec<Ticket> {
        self.inner.borrow().held.iter().map(|(t, _)| *t).collect()
    }

    /// Total jobs ever handed to this executor.
    pub fn spawned(&self) -> usize {
        self.inner.borrow().spawned
    }

    /// Run the held job for `ticket`. Returns false if no such job is held.
    pub fn complete(&self, ticket: Ticket) -> bool {
        let job = {
            let mut q = self.inner.borrow_mut();
            match q.held.iter().position(|(t, _)| *t == ticket) {
                Some(pos) => q.held.remove(pos).1,
                None => return false,
            }
        };
        let outcome = job();
        self.inner
            .borrow_mut()
            .done
            .push_back(Completion { ticket, outcome });
        true
    }

    /// Finish a held job with a given outcome instead of running it.
    pub fn complete_with(&self, ticket: Ticket, outcome: Result<T, FetchError>) -> bool {
        let mut q = self.inner.borrow_mut();
        match q.held.iter().position(|(t, _)| *t == ticket) {
            Some(pos) => {
                q.held.remove(pos);
                q.done.push_back(Completion { ticket, outcome });
                true
            }
            None => false,
        }
    }

    /// Run every held job, newest first.
    pub fn complete_all_newest_first(&self) {
        for ticket in self.held().into_iter().rev() {
            self.complete(ticket);
        }
    }

    /// Run every held job, oldest first.
    pub fn complete_all(&self) {
        for ticket in self.held() {
            self.complete(ticket);
        }
    }
}

impl<T> Executor<T> for ManualExecutor<T> {
    fn spawn(&self, ticket: Ticket, job: Job<T>) {
        let mut q = self.inner.borrow_mut();
        q.spawned += 1;
        q.held.push((ticket, job));
    }

    fn try_next(&self) -> Option<Completion<T>> {
        self.inner.borrow_mut().done.pop_front()
    }

    fn next_timeout(&self, _timeout: Duration) -> Option<Completion<T>> {
        self.try_next()
    }
}

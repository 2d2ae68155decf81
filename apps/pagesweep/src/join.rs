//! Fan-out/fan-in join over completion-callback tasks.
//!
//! A [`Join`] starts every task as soon as it is constructed, handing each one
//! a [`Completion`] bound to its key and submission slot. Tasks may complete in
//! any order and from any thread; once every slot is filled the registered
//! continuation receives a [`JoinResults`] exactly once.
//!
//! Contract details:
//! - Zero tasks: the continuation fires synchronously when registered.
//! - Tasks that finished before registration are held until a continuation
//!   arrives, then delivered immediately.
//! - A slot completed twice keeps its first value; the extra completion is
//!   ignored and reported by [`Completion::complete`] returning `false`.
//! - Registering a second continuation before firing replaces the first.
//!   Registering after firing yields [`JoinError::AlreadyFired`].
//! - No timeouts: a task that never completes keeps the join pending.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// A unit of asynchronous work: receives its completion handle and must
/// eventually call [`Completion::complete`] once.
pub type Task<K, V> = Box<dyn FnOnce(Completion<K, V>) + Send>;

/// Terminal callback receiving the combined results.
pub type Continuation<K, V> = Box<dyn FnOnce(JoinResults<K, V>) + Send>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    #[error("join already delivered its results to a continuation")]
    AlreadyFired,
}

enum Terminal<K, V> {
    Pending(Option<Continuation<K, V>>),
    Fired,
}

struct JoinState<K, V> {
    total: usize,
    pending: usize,
    slots: Vec<Option<V>>,
    done: Vec<bool>,
    by_key: HashMap<K, usize>,
    terminal: Terminal<K, V>,
}

impl<K, V> JoinState<K, V> {
    fn completed(&self) -> usize {
        self.total - self.pending
    }

    /// Hand out the continuation and results when all slots are filled and a
    /// continuation is registered. Flips the terminal to `Fired`.
    fn take_ready(&mut self) -> Option<(Continuation<K, V>, JoinResults<K, V>)> {
        if self.pending > 0 {
            return None;
        }
        let continuation = match &mut self.terminal {
            Terminal::Pending(registered) => registered.take()?,
            Terminal::Fired => return None,
        };
        self.terminal = Terminal::Fired;
        let items: Vec<V> = std::mem::take(&mut self.slots)
            .into_iter()
            .flatten()
            .collect();
        let by_key = std::mem::take(&mut self.by_key);
        Some((continuation, JoinResults { items, by_key }))
    }
}

/// Completion handle given to a task. Cloneable so a task can pass it through
/// nested callbacks; only the first `complete` per slot counts.
pub struct Completion<K, V> {
    state: Arc<Mutex<JoinState<K, V>>>,
    slot: usize,
    key: K,
}

impl<K: Clone, V> Clone for Completion<K, V> {
    fn clone(&self) -> Self {
        Completion {
            state: Arc::clone(&self.state),
            slot: self.slot,
            key: self.key.clone(),
        }
    }
}

impl<K, V> Completion<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Record `value` for this task. Returns `false` when the slot was already
    /// completed, in which case nothing changes.
    pub fn complete(&self, value: V) -> bool {
        let ready = {
            let mut state = self.state.lock();
            if state.done[self.slot] {
                warn!(slot = self.slot, "task completed more than once; ignoring");
                return false;
            }
            state.done[self.slot] = true;
            state.slots[self.slot] = Some(value);
            state.by_key.insert(self.key.clone(), self.slot);
            state.pending -= 1;
            debug!(
                slot = self.slot,
                completed = state.completed(),
                total = state.total,
                "task completed"
            );
            state.take_ready()
        };
        // Outside the lock: the continuation may start new joins or touch this one.
        if let Some((continuation, results)) = ready {
            continuation(results);
        }
        true
    }
}

/// Combined results in submission order, with lookup by key.
#[derive(Debug)]
pub struct JoinResults<K, V> {
    items: Vec<V>,
    by_key: HashMap<K, usize>,
}

impl<K: Eq + Hash, V> JoinResults<K, V> {
    /// Values in submission order, regardless of completion order.
    pub fn items(&self) -> &[V] {
        &self.items
    }

    /// Value recorded under `key`. For keys shared by several tasks the last
    /// task to complete wins.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.by_key.get(key).and_then(|&i| self.items.get(i))
    }

    pub fn into_items(self) -> Vec<V> {
        self.items
    }
}

/// Handle to a running join. Dropping it does not cancel anything; the state
/// lives as long as outstanding completion handles do.
pub struct Join<K, V> {
    state: Arc<Mutex<JoinState<K, V>>>,
}

impl<V> Join<usize, V> {
    /// Start `tasks`, keyed by their submission index.
    pub fn new(tasks: Vec<Task<usize, V>>) -> Self {
        Self::keyed(tasks.into_iter().enumerate().collect())
    }
}

impl<K, V> Join<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Start `tasks` with caller-supplied keys. Each task constructor runs
    /// before this returns and may complete synchronously.
    pub fn keyed(tasks: Vec<(K, Task<K, V>)>) -> Self {
        let total = tasks.len();
        let state = Arc::new(Mutex::new(JoinState {
            total,
            pending: total,
            slots: (0..total).map(|_| None).collect(),
            done: vec![false; total],
            by_key: HashMap::with_capacity(total),
            terminal: Terminal::Pending(None),
        }));
        debug!(total, "join started");
        for (slot, (key, task)) in tasks.into_iter().enumerate() {
            task(Completion {
                state: Arc::clone(&state),
                slot,
                key,
            });
        }
        Join { state }
    }

    /// Register the terminal continuation. Fires immediately when every task
    /// has already completed.
    pub fn on_complete<F>(&self, continuation: F) -> Result<(), JoinError>
    where
        F: FnOnce(JoinResults<K, V>) + Send + 'static,
    {
        let ready = {
            let mut state = self.state.lock();
            match &mut state.terminal {
                Terminal::Fired => return Err(JoinError::AlreadyFired),
                Terminal::Pending(registered) => {
                    if registered.is_some() {
                        debug!("replacing previously registered continuation");
                    }
                    *registered = Some(Box::new(continuation));
                }
            }
            state.take_ready()
        };
        if let Some((continuation, results)) = ready {
            continuation(results);
        }
        Ok(())
    }

    pub fn is_fired(&self) -> bool {
        matches!(self.state.lock().terminal, Terminal::Fired)
    }

    pub fn total(&self) -> usize {
        self.state.lock().total
    }

    pub fn pending(&self) -> usize {
        self.state.lock().pending
    }

    pub fn completed(&self) -> usize {
        self.state.lock().completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    type Stash = Arc<Mutex<Vec<Completion<usize, i32>>>>;

    /// Task that parks its completion handle so the test decides when it fires.
    fn parked(stash: &Stash) -> Task<usize, i32> {
        let stash = Arc::clone(stash);
        Box::new(move |done| stash.lock().push(done))
    }

    fn immediate(value: i32) -> Task<usize, i32> {
        Box::new(move |done| {
            done.complete(value);
        })
    }

    #[test]
    fn test_zero_tasks_fire_synchronously_with_empty_results() {
        let join: Join<usize, i32> = Join::new(Vec::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        join.on_complete(move |results| {
            assert!(results.items().is_empty());
            f.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(join.is_fired());
    }

    #[test]
    fn test_synchronous_tasks_are_held_until_registration() {
        let join = Join::new(vec![immediate(1), immediate(2)]);
        assert_eq!(join.completed(), 2);
        assert!(!join.is_fired());
        let (tx, rx) = mpsc::channel();
        join.on_complete(move |results| tx.send(results.into_items()).unwrap())
            .unwrap();
        assert_eq!(rx.try_recv().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_fires_once_only_after_last_completion() {
        let stash: Stash = Arc::new(Mutex::new(Vec::new()));
        let join = Join::new(vec![parked(&stash), parked(&stash), parked(&stash)]);
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        join.on_complete(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let handles: Vec<_> = stash.lock().drain(..).collect();
        handles[0].complete(10);
        handles[1].complete(20);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(join.pending(), 1);
        handles[2].complete(30);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(join.pending(), 0);
    }

    #[test]
    fn test_submission_order_survives_reverse_completion() {
        let stash: Stash = Arc::new(Mutex::new(Vec::new()));
        let join = Join::new(vec![parked(&stash), parked(&stash), parked(&stash)]);
        let (tx, rx) = mpsc::channel();
        join.on_complete(move |results| tx.send(results.into_items()).unwrap())
            .unwrap();

        let handles: Vec<_> = stash.lock().drain(..).collect();
        // first submitted completes last
        handles[2].complete(3);
        handles[1].complete(2);
        handles[0].complete(1);
        assert_eq!(rx.try_recv().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_keyed_results_are_retrievable_by_name() {
        let html: Task<&'static str, String> = Box::new(|done| {
            done.complete("markup".to_string());
        });
        let js: Task<&'static str, String> = Box::new(|done| {
            let key = done.key().to_string();
            done.complete(format!("{key}-scripts"));
        });
        let join = Join::keyed(vec![("html", html), ("js", js)]);
        let (tx, rx) = mpsc::channel();
        join.on_complete(move |results| tx.send(results).unwrap())
            .unwrap();
        let results = rx.try_recv().unwrap();
        assert_eq!(results.get(&"html").map(String::as_str), Some("markup"));
        assert_eq!(results.get(&"js").map(String::as_str), Some("js-scripts"));
        assert_eq!(results.get(&"css"), None);
    }

    #[test]
    fn test_double_completion_is_ignored_first_value_wins() {
        let stash: Stash = Arc::new(Mutex::new(Vec::new()));
        let join = Join::new(vec![parked(&stash), parked(&stash)]);
        let handles: Vec<_> = stash.lock().drain(..).collect();

        assert!(handles[0].complete(1));
        assert!(!handles[0].clone().complete(99));
        assert_eq!(join.completed(), 1);
        assert_eq!(join.pending(), 1);

        let (tx, rx) = mpsc::channel();
        join.on_complete(move |results| tx.send(results.into_items()).unwrap())
            .unwrap();
        assert!(rx.try_recv().is_err());
        handles[1].complete(2);
        assert_eq!(rx.try_recv().unwrap(), vec![1, 2]);
        // late duplicate after firing changes nothing
        assert!(!handles[1].complete(7));
        assert_eq!(join.completed(), 2);
    }

    #[test]
    fn test_repeated_key_counts_each_task_and_last_completion_wins() {
        let stash: Arc<Mutex<Vec<Completion<&'static str, i32>>>> =
            Arc::new(Mutex::new(Vec::new()));
        let park = |stash: &Arc<Mutex<Vec<Completion<&'static str, i32>>>>| {
            let stash = Arc::clone(stash);
            let task: Task<&'static str, i32> = Box::new(move |done| stash.lock().push(done));
            task
        };
        let join = Join::keyed(vec![("same", park(&stash)), ("same", park(&stash))]);
        let (tx, rx) = mpsc::channel();
        join.on_complete(move |results| tx.send(results).unwrap())
            .unwrap();
        let handles: Vec<_> = stash.lock().drain(..).collect();
        handles[1].complete(2);
        handles[0].complete(1);
        let results = rx.try_recv().unwrap();
        assert_eq!(results.items(), &[1, 2]);
        assert_eq!(results.get(&"same"), Some(&1));
    }

    #[test]
    fn test_reregistration_before_firing_replaces_continuation() {
        let stash: Stash = Arc::new(Mutex::new(Vec::new()));
        let join = Join::new(vec![parked(&stash)]);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&first);
        join.on_complete(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        let s = Arc::clone(&second);
        join.on_complete(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        let handle = stash.lock().pop().unwrap();
        handle.complete(5);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registration_after_firing_is_rejected() {
        let join = Join::new(vec![immediate(1)]);
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        join.on_complete(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        let f = Arc::clone(&fired);
        let err = join
            .on_complete(move |_| {
                f.fetch_add(100, Ordering::SeqCst);
            })
            .unwrap_err();
        assert_eq!(err, JoinError::AlreadyFired);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_completions_racing_from_threads_fire_exactly_once() {
        let n = 16;
        let tasks: Vec<Task<usize, usize>> = (0..n)
            .map(|i| {
                let task: Task<usize, usize> = Box::new(move |done| {
                    std::thread::spawn(move || {
                        std::thread::sleep(Duration::from_millis(((n - i) % 5) as u64));
                        done.complete(i * 10);
                    });
                });
                task
            })
            .collect();
        let join = Join::new(tasks);
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        let (tx, rx) = mpsc::channel();
        join.on_complete(move |results| {
            f.fetch_add(1, Ordering::SeqCst);
            tx.send(results.into_items()).unwrap();
        })
        .unwrap();
        let items = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(items, (0..n).map(|i| i * 10).collect::<Vec<_>>());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}

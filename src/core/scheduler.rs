//! Cooperative Scheduler
//!
//! Single-threaded timer and step queue. Every piece of deferred work (countdown
//! ticks, respawn ticks, staged player materialization, restore retries) is a
//! plain data value queued here together with the owner that scheduled it.
//! The host advances the clock; due jobs are popped one at a time in
//! `(due time, insertion order)` order so that a job may schedule or cancel
//! other jobs before the next one is handed out.
//!
//! Owners cancel their work explicitly on teardown. A popped job whose owner
//! has been torn down is a bug in the owner, not something this queue hides.

use std::collections::BTreeMap;

/// Milliseconds since the scheduler was created.
pub type Millis = u64;

/// One second in scheduler time.
pub const SECOND: Millis = 1000;

/// Convert whole seconds to scheduler time.
#[inline]
pub const fn secs(seconds: u64) -> Millis {
    seconds * SECOND
}

/// Handle to a scheduled job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

/// A job handed back by [`Scheduler::pop_due`].
#[derive(Clone, Debug, PartialEq)]
pub struct Due<O, A> {
    /// Job handle (repeating jobs keep the same handle)
    pub id: TaskId,
    /// Who scheduled it
    pub owner: O,
    /// What to do
    pub action: A,
    /// When it was due
    pub at: Millis,
}

#[derive(Clone, Debug)]
struct Entry<O, A> {
    owner: O,
    action: A,
    repeat: Option<Millis>,
}

/// Single-threaded cooperative scheduler.
#[derive(Clone, Debug)]
pub struct Scheduler<O, A> {
    now: Millis,
    next_id: u64,
    queue: BTreeMap<(Millis, u64), Entry<O, A>>,
    due_index: BTreeMap<u64, Millis>,
}

impl<O, A> Default for Scheduler<O, A> {
    fn default() -> Self {
        Self {
            now: 0,
            next_id: 0,
            queue: BTreeMap::new(),
            due_index: BTreeMap::new(),
        }
    }
}

impl<O: Clone + PartialEq, A: Clone> Scheduler<O, A> {
    /// Create an empty scheduler at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scheduler time.
    #[inline]
    pub fn now(&self) -> Millis {
        self.now
    }

    /// Number of pending jobs.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// No pending jobs.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Run `action` once after `delay`.
    pub fn schedule_once(&mut self, owner: O, delay: Millis, action: A) -> TaskId {
        self.insert(owner, self.now + delay, action, None)
    }

    /// Run `action` after `delay`, then every `interval`.
    pub fn schedule_repeating(&mut self, owner: O, delay: Millis, interval: Millis, action: A) -> TaskId {
        self.insert(owner, self.now + delay, action, Some(interval.max(1)))
    }

    fn insert(&mut self, owner: O, at: Millis, action: A, repeat: Option<Millis>) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.insert((at, id), Entry { owner, action, repeat });
        self.due_index.insert(id, at);
        TaskId(id)
    }

    /// Cancel a single job. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.due_index.remove(&id.0) {
            Some(at) => self.queue.remove(&(at, id.0)).is_some(),
            None => false,
        }
    }

    /// Cancel every job whose owner matches. Returns the number cancelled.
    pub fn cancel_where<F>(&mut self, mut matches: F) -> usize
    where
        F: FnMut(&O, &A) -> bool,
    {
        let doomed: Vec<(Millis, u64)> = self
            .queue
            .iter()
            .filter(|(_, e)| matches(&e.owner, &e.action))
            .map(|(k, _)| *k)
            .collect();

        for key in &doomed {
            self.queue.remove(key);
            self.due_index.remove(&key.1);
        }
        doomed.len()
    }

    /// Cancel every job scheduled by `owner`.
    pub fn cancel_owner(&mut self, owner: &O) -> usize {
        self.cancel_where(|o, _| o == owner)
    }

    /// Is there a pending job matching the predicate?
    pub fn any<F>(&self, mut matches: F) -> bool
    where
        F: FnMut(&O, &A) -> bool,
    {
        self.queue.values().any(|e| matches(&e.owner, &e.action))
    }

    /// Pop the earliest job due at or before `until`, advancing the clock to
    /// its due time. Repeating jobs are re-armed before being returned.
    pub fn pop_due(&mut self, until: Millis) -> Option<Due<O, A>> {
        let (&(at, raw), _) = self.queue.iter().next()?;
        if at > until {
            return None;
        }

        let entry = self.queue.remove(&(at, raw))?;
        self.due_index.remove(&raw);
        self.now = self.now.max(at);

        if let Some(interval) = entry.repeat {
            let next = at + interval;
            self.queue.insert((next, raw), entry.clone());
            self.due_index.insert(raw, next);
        }

        Some(Due {
            id: TaskId(raw),
            owner: entry.owner,
            action: entry.action,
            at,
        })
    }

    /// Move the clock forward to `to` once all due jobs have been drained.
    pub fn settle(&mut self, to: Millis) {
        self.now = self.now.max(to);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum Job {
        Ping,
        Pong,
    }

    fn drain(s: &mut Scheduler<u8, Job>, until: Millis) -> Vec<(u8, Job, Millis)> {
        let mut out = Vec::new();
        while let Some(due) = s.pop_due(until) {
            out.push((due.owner, due.action, due.at));
        }
        s.settle(until);
        out
    }

    #[test]
    fn test_once_runs_in_due_order() {
        let mut s = Scheduler::new();
        s.schedule_once(1, 200, Job::Pong);
        s.schedule_once(1, 100, Job::Ping);

        let ran = drain(&mut s, 1000);
        assert_eq!(ran, vec![(1, Job::Ping, 100), (1, Job::Pong, 200)]);
        assert!(s.is_empty());
        assert_eq!(s.now(), 1000);
    }

    #[test]
    fn test_same_due_time_keeps_insertion_order() {
        let mut s = Scheduler::new();
        s.schedule_once(1, 50, Job::Pong);
        s.schedule_once(2, 50, Job::Ping);

        let ran = drain(&mut s, 50);
        assert_eq!(ran[0].0, 1);
        assert_eq!(ran[1].0, 2);
    }

    #[test]
    fn test_repeating_rearms() {
        let mut s = Scheduler::new();
        s.schedule_repeating(7, SECOND, SECOND, Job::Ping);

        let ran = drain(&mut s, secs(3));
        assert_eq!(ran.len(), 3);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_cancel_owner_halts_work() {
        let mut s = Scheduler::new();
        s.schedule_repeating(1, SECOND, SECOND, Job::Ping);
        s.schedule_once(2, SECOND, Job::Pong);

        assert_eq!(s.cancel_owner(&1), 1);
        let ran = drain(&mut s, secs(5));
        assert_eq!(ran, vec![(2, Job::Pong, SECOND)]);
    }

    #[test]
    fn test_cancel_single() {
        let mut s = Scheduler::new();
        let id = s.schedule_once(1, 10, Job::Ping);
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(drain(&mut s, 100).is_empty());
    }

    #[test]
    fn test_not_due_yet() {
        let mut s = Scheduler::new();
        s.schedule_once(1, 500, Job::Ping);
        assert!(s.pop_due(499).is_none());
        assert!(s.pop_due(500).is_some());
    }
}

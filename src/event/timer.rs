//! Game Timer
//!
//! Single-owner 1 Hz countdown. The ticking itself is a repeating job in the
//! owner's scheduler; this struct tracks what is left and what happens when
//! it runs out. Pushing the display to participants is the owner's job.

use crate::core::scheduler::{Scheduler, TaskId, SECOND};

/// What happens when the countdown reaches zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerExpiry {
    /// Prestart countdown finished
    StartEvent,
    /// Time limit reached
    EndEvent,
}

/// Result of one timer tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimerTick {
    /// Timer not running (stale tick)
    Idle,
    /// Still counting down
    Display {
        /// Formatted remaining time
        clock: String,
        /// Label shown next to the clock
        message: String,
    },
    /// Reached zero. Delivered exactly once per start.
    Expired(TimerExpiry),
}

/// Countdown owned by one event instance.
#[derive(Clone, Debug, Default)]
pub struct GameTimer {
    remaining: u32,
    message: String,
    expiry: Option<TimerExpiry>,
    task: Option<TaskId>,
}

impl GameTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Is the countdown running?
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Seconds left.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Label shown with the clock.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Start (or restart) the countdown. `tick` is queued every second.
    pub fn start<O, A>(
        &mut self,
        scheduler: &mut Scheduler<O, A>,
        owner: O,
        tick: A,
        duration_secs: u32,
        message: &str,
        expiry: TimerExpiry,
    ) where
        O: Clone + PartialEq,
        A: Clone,
    {
        self.cancel_task(scheduler);

        self.remaining = duration_secs;
        self.message = message.to_string();
        self.expiry = Some(expiry);
        self.task = Some(scheduler.schedule_repeating(owner, SECOND, SECOND, tick));
    }

    /// Advance one second.
    pub fn tick<O, A>(&mut self, scheduler: &mut Scheduler<O, A>) -> TimerTick
    where
        O: Clone + PartialEq,
        A: Clone,
    {
        if self.task.is_none() {
            return TimerTick::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.cancel_task(scheduler);
            return match self.expiry.take() {
                Some(expiry) => TimerTick::Expired(expiry),
                None => TimerTick::Idle,
            };
        }

        TimerTick::Display {
            clock: format_clock(self.remaining),
            message: self.message.clone(),
        }
    }

    /// Stop ticking. Safe to call when not running; returns whether it was.
    pub fn stop<O, A>(&mut self, scheduler: &mut Scheduler<O, A>) -> bool
    where
        O: Clone + PartialEq,
        A: Clone,
    {
        let was_running = self.cancel_task(scheduler);
        self.remaining = 0;
        self.expiry = None;
        self.message.clear();
        was_running
    }

    fn cancel_task<O, A>(&mut self, scheduler: &mut Scheduler<O, A>) -> bool
    where
        O: Clone + PartialEq,
        A: Clone,
    {
        match self.task.take() {
            Some(task) => scheduler.cancel(task),
            None => false,
        }
    }
}

/// Format seconds as `mm:ss`, or `hh:mm:ss` once an hour or more is left.
pub fn format_clock(total_secs: u32) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

// =============================================================================
// TESTS
// =============================================================================

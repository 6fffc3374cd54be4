//! Timers as explicit fires-at timestamps
//!
//! The engine never arms free-running callbacks. It records when the next
//! automatic transition is due and the driver calls `Engine::poll` once
//! that time has passed. Replacing or cancelling a timer is a plain data
//! update, so a stale timer cannot fire after the turn moved on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

// ============================================================================
// CLOCKS
// ============================================================================

/// Millisecond time source
pub trait Clock: Send {
    fn now_ms(&self) -> u64;
}

/// Wall clock, counted from creation
#[derive(Clone, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock; clones share the same time
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ============================================================================
// TIMERS
// ============================================================================

/// Automatic transition the engine may perform on its own
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    /// Nothing is movable: pass the turn on
    AutoAdvance,
    /// A human's only legal move, played for them
    AutoMove(u8),
    /// An AI seat picks its move
    AiMove,
    /// An AI seat rolls
    AiRoll,
    /// The current player ran out of time
    TurnTimeout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timer {
    pub kind: TimerKind,
    pub fires_at: u64,
    /// Increases with every timer armed by this scheduler
    pub generation: u64,
}

/// Holds at most one pending action plus the turn deadline
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    action: Option<Timer>,
    deadline: Option<Timer>,
    generation: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn arm(&mut self, kind: TimerKind, fires_at: u64) -> Timer {
        self.generation += 1;
        Timer {
            kind,
            fires_at,
            generation: self.generation,
        }
    }

    /// Arm the action timer, replacing whatever was pending
    pub fn schedule(&mut self, kind: TimerKind, fires_at: u64) {
        self.action = Some(self.arm(kind, fires_at));
    }

    /// Arm the turn deadline, replacing the previous one
    pub fn set_deadline(&mut self, fires_at: u64) {
        self.deadline = Some(self.arm(TimerKind::TurnTimeout, fires_at));
    }

    pub fn cancel_action(&mut self) {
        self.action = None;
    }

    pub fn cancel_all(&mut self) {
        self.action = None;
        self.deadline = None;
    }

    pub fn pending(&self) -> Option<Timer> {
        self.action
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline.map(|t| t.fires_at)
    }

    /// Generation of the most recently armed timer
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Earliest moment anything is due
    pub fn next_fire_at(&self) -> Option<u64> {
        [self.action, self.deadline]
            .into_iter()
            .flatten()
            .map(|t| t.fires_at)
            .min()
    }

    /// Remove and return the earliest timer due at `now` that was armed
    /// no later than generation `armed_by`.
    ///
    /// Timers armed after that point wait for the next call, so a zero
    /// delay cannot keep a single poll busy. The action timer wins a tie
    /// with the deadline.
    pub fn pop_due(&mut self, now: u64, armed_by: u64) -> Option<Timer> {
        let ready = |t: &Timer| t.fires_at <= now && t.generation <= armed_by;
        let action_due = self.action.filter(ready);
        let deadline_due = self.deadline.filter(ready);

        match (action_due, deadline_due) {
            (Some(a), Some(d)) if d.fires_at < a.fires_at => self.deadline.take(),
            (Some(_), _) => self.action.take(),
            (None, Some(_)) => self.deadline.take(),
            (None, None) => None,
        }
    }
}

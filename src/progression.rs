// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Progression state machine.
//!
//! Tracks which pose of the session is current and decides, for every similarity score or
//! manual skip, whether to stay, advance to the next pose, or finish the session.
//!
//! ```text
//!   InProgress(0) --advance--> InProgress(1) --> ... --> InProgress(N-1) --advance--> Completed
//! ```
//!
//! `Completed` is terminal: further triggers are ignored and never produce a second finish.

use std::fmt;

use crate::verbose;

/// Where the session is in its pose sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseProgress {
    /// Matching the pose at this index (`0 <= index < N`).
    InProgress(usize),
    /// Every pose has been matched or skipped.
    Completed,
}

impl fmt::Display for PoseProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress(i) => write!(f, "in progress ({})", i + 1),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// What caused an advance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// The live pose scored above the similarity threshold.
    Matched(f32),
    /// The user asked to move on.
    ManualSkip,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched(score) => write!(f, "match {score:.2}"),
            Self::ManualSkip => write!(f, "manual skip"),
        }
    }
}

/// Outcome of feeding a score or skip into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed.
    Stay,
    /// Moved to the pose at `index`.
    Advanced {
        /// New current index.
        index: usize,
    },
    /// The last pose was cleared; the session is now complete.
    Finished,
    /// The session already completed (or never loaded); the trigger had no effect.
    Ignored,
    /// An advance already happened in this sampling cycle; the trigger was not applied.
    Deferred,
}

impl Transition {
    /// Whether the current pose changed.
    #[must_use]
    pub const fn is_advance(&self) -> bool {
        matches!(self, Self::Advanced { .. } | Self::Finished)
    }
}

/// Progression through `total` poses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progression {
    current: usize,
    total: usize,
    last_advance_cycle: Option<u64>,
}

impl Progression {
    /// Start at the first of `total` poses. With no poses the session is already complete.
    #[must_use]
    pub const fn new(total: usize) -> Self {
        Self {
            current: 0,
            total,
            last_advance_cycle: None,
        }
    }

    /// Index of the current pose; equals `total` once complete.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current
    }

    /// Number of poses in the session.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PoseProgress {
        if self.current >= self.total {
            PoseProgress::Completed
        } else {
            PoseProgress::InProgress(self.current)
        }
    }

    /// Whether every pose has been cleared.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.current >= self.total
    }

    /// Feed a similarity score observed in sampling cycle `cycle`.
    ///
    /// Advances only when `score` is strictly greater than `threshold`.
    pub fn observe(&mut self, score: f32, threshold: f32, cycle: u64) -> Transition {
        if self.is_completed() {
            return Transition::Ignored;
        }
        if score > threshold {
            self.advance(Trigger::Matched(score), cycle)
        } else {
            Transition::Stay
        }
    }

    /// Apply a manual skip in sampling cycle `cycle`. Behaves exactly like a match.
    pub fn skip(&mut self, cycle: u64) -> Transition {
        self.advance(Trigger::ManualSkip, cycle)
    }

    /// Move to the next pose, or finish after the last one.
    ///
    /// At most one advance is applied per `cycle`; a second request in the same cycle returns
    /// [`Transition::Deferred`] without touching the state.
    pub fn advance(&mut self, trigger: Trigger, cycle: u64) -> Transition {
        if self.is_completed() {
            return Transition::Ignored;
        }
        if self.last_advance_cycle == Some(cycle) {
            return Transition::Deferred;
        }
        self.last_advance_cycle = Some(cycle);
        verbose!("Pose {}/{} cleared by {trigger}", self.current + 1, self.total);
        self.current += 1;
        if self.current < self.total {
            Transition::Advanced {
                index: self.current,
            }
        } else {
            Transition::Finished
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stays_below_threshold() {
        let mut progression = Progression::new(3);
        assert_eq!(progression.observe(0.85, 0.85, 0), Transition::Stay);
        assert_eq!(progression.observe(0.2, 0.85, 1), Transition::Stay);
        assert_eq!(progression.state(), PoseProgress::InProgress(0));
    }

    #[test]
    fn test_advances_then_finishes() {
        let mut progression = Progression::new(3);
        assert_eq!(progression.observe(0.9, 0.85, 0), Transition::Advanced { index: 1 });
        assert_eq!(progression.skip(1), Transition::Advanced { index: 2 });
        assert_eq!(progression.observe(1.0, 0.85, 2), Transition::Finished);
        assert_eq!(progression.state(), PoseProgress::Completed);
        assert_eq!(progression.current_index(), 3);
    }

    #[test]
    fn test_terminal_idempotence() {
        let mut progression = Progression::new(1);
        assert_eq!(progression.skip(0), Transition::Finished);
        for cycle in 1..10 {
            assert_eq!(progression.skip(cycle), Transition::Ignored);
            assert_eq!(progression.observe(1.0, 0.85, cycle), Transition::Ignored);
        }
        assert_eq!(progression.current_index(), 1);
    }

    #[test]
    fn test_single_advance_per_cycle() {
        let mut progression = Progression::new(5);
        assert_eq!(progression.observe(0.99, 0.85, 4), Transition::Advanced { index: 1 });
        assert_eq!(progression.skip(4), Transition::Deferred);
        assert_eq!(progression.observe(0.99, 0.85, 4), Transition::Deferred);
        assert_eq!(progression.current_index(), 1);
        assert_eq!(progression.skip(5), Transition::Advanced { index: 2 });
    }

    #[test]
    fn test_monotonic_by_one() {
        let mut progression = Progression::new(7);
        let mut previous = progression.current_index();
        for cycle in 0..20 {
            let score = if cycle % 3 == 0 { 0.95 } else { 0.5 };
            let transition = progression.observe(score, 0.85, cycle);
            let now = progression.current_index();
            assert!(now >= previous);
            assert_eq!(now - previous, usize::from(transition.is_advance()));
            previous = now;
        }
        assert!(progression.is_completed());
    }

    #[test]
    fn test_empty_session_is_complete() {
        let mut progression = Progression::new(0);
        assert_eq!(progression.state(), PoseProgress::Completed);
        assert_eq!(progression.skip(0), Transition::Ignored);
    }
}

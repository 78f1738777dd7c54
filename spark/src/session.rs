//! The practice session and its transition function.
//!
//! A `Session` is an immutable value. `reduce` consumes it and returns the
//! next one; blocks are shared between successive values through `Arc`, and
//! only the block a transition touches is reallocated. Renderers can compare
//! blocks with `Arc::ptr_eq` to find what changed.

use crate::schedule::{Block, Schedule};
use spark_ipc::{BlockStatus, Control, SessionStatus};
use std::sync::Arc;

/// Input to [`Session::reduce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Wall-clock milliseconds since the previous tick.
    Tick { delta_ms: u64 },
    Control(Control),
}

impl From<Control> for Event {
    fn from(control: Control) -> Self {
        Event::Control(control)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    status: SessionStatus,
    current_index: usize,
    blocks: Arc<[Arc<Block>]>,
    schedule: Arc<Schedule>,
}

impl Session {
    pub fn new(schedule: Schedule) -> Self {
        Self::from_schedule(Arc::new(schedule))
    }

    /// The reference SPARK schedule at the production block duration.
    pub fn initial() -> Self {
        Self::new(Schedule::default())
    }

    fn from_schedule(schedule: Arc<Schedule>) -> Self {
        Self {
            status: SessionStatus::Initial,
            current_index: 0,
            blocks: schedule.blocks().into_iter().map(Arc::new).collect(),
            schedule,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn blocks(&self) -> &[Arc<Block>] {
        &self.blocks
    }

    pub fn current_block(&self) -> Option<&Block> {
        self.blocks.get(self.current_index).map(AsRef::as_ref)
    }

    pub fn reduce(self, event: Event) -> Self {
        match event {
            Event::Tick { delta_ms } => self.tick(delta_ms),
            Event::Control(control) => self.control(control),
        }
    }

    fn tick(self, delta_ms: u64) -> Self {
        if self.status != SessionStatus::Running {
            return self;
        }
        let Some(current) = self.current_block() else {
            return self;
        };

        let elapsed = current.elapsed_ms().saturating_add(delta_ms);
        if elapsed < current.total_ms() {
            if delta_ms == 0 {
                return self;
            }
            return self.update_current(|block| block.with_elapsed(elapsed));
        }

        let ticked = self.update_current(Block::finished);
        if ticked.current_index + 1 < ticked.blocks.len() {
            // Time past the boundary is dropped, not carried over.
            Self {
                status: SessionStatus::Running,
                current_index: ticked.current_index + 1,
                ..ticked
            }
            .update_current(|block| block.with_status(BlockStatus::Running))
        } else {
            Self {
                status: SessionStatus::Ended,
                ..ticked
            }
        }
    }

    fn control(self, control: Control) -> Self {
        match (control, self.status) {
            (Control::Reset, _) => Self::from_schedule(self.schedule),
            (Control::Start, SessionStatus::Initial) if !self.blocks.is_empty() => Self {
                status: SessionStatus::Running,
                ..self
            }
            .update_current(|block| block.with_status(BlockStatus::Running)),
            (Control::Pause, SessionStatus::Running) => Self {
                status: SessionStatus::Paused,
                ..self
            },
            (Control::Resume, SessionStatus::Paused | SessionStatus::Waiting) => Self {
                status: SessionStatus::Running,
                ..self
            },
            _ => self,
        }
    }

    /// Replaces the block at `current_index` with `update(block)`, sharing
    /// every other block with `self`.
    fn update_current(self, update: impl FnOnce(&Block) -> Block) -> Self {
        let index = self.current_index;
        let Some(current) = self.blocks.get(index) else {
            return self;
        };
        let updated = Arc::new(update(current));
        let blocks = self
            .blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                if i == index {
                    Arc::clone(&updated)
                } else {
                    Arc::clone(block)
                }
            })
            .collect();
        Self { blocks, ..self }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const TOTAL: u64 = 5_000;

    fn session() -> Session {
        Session::new(Schedule::spark(TOTAL))
    }

    fn started() -> Session {
        session().reduce(Control::Start.into())
    }

    fn tick(session: Session, delta_ms: u64) -> Session {
        session.reduce(Event::Tick { delta_ms })
    }

    fn assert_invariants(session: &Session) {
        let running: Vec<_> = session
            .blocks()
            .iter()
            .enumerate()
            .filter(|(_, b)| b.status() == BlockStatus::Running)
            .map(|(i, _)| i)
            .collect();
        assert!(running.len() <= 1, "more than one running block: {running:?}");
        if matches!(
            session.status(),
            SessionStatus::Running | SessionStatus::Paused
        ) {
            assert_eq!(running, vec![session.current_index()]);
        }

        for block in session.blocks() {
            assert!(block.elapsed_ms() <= block.total_ms());
            if block.elapsed_ms() == block.total_ms() {
                assert_eq!(block.status(), BlockStatus::Done);
            }
        }

        let done = session
            .blocks()
            .iter()
            .take_while(|b| b.status() == BlockStatus::Done)
            .count();
        assert!(session.blocks()[done..]
            .iter()
            .all(|b| b.status() != BlockStatus::Done));
        assert!(session.current_index() < session.blocks().len());
    }

    #[test]
    fn initial_session_is_pending_at_first_block() {
        let session = Session::initial();
        assert_eq!(session.status(), SessionStatus::Initial);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.blocks().len(), 6);
        assert!(session
            .blocks()
            .iter()
            .all(|b| b.status() == BlockStatus::Pending && b.elapsed_ms() == 0));
        assert_eq!(session.blocks()[0].total_ms(), 5 * 60 * 1000);
    }

    #[test]
    fn start_runs_first_block() {
        let session = started();
        assert_eq!(session.status(), SessionStatus::Running);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.blocks()[0].status(), BlockStatus::Running);
        assert_eq!(session.blocks()[0].elapsed_ms(), 0);
        assert_invariants(&session);
    }

    #[test]
    fn tick_within_block_accumulates_elapsed() {
        let session = tick(tick(started(), 1_200), 800);
        assert_eq!(session.blocks()[0].elapsed_ms(), 2_000);
        assert_eq!(session.blocks()[0].status(), BlockStatus::Running);
        assert_eq!(session.status(), SessionStatus::Running);
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn tick_within_block_shares_other_blocks() {
        let before = started();
        let after = tick(before.clone(), 100);
        assert!(!Arc::ptr_eq(&before.blocks()[0], &after.blocks()[0]));
        for (old, new) in before.blocks()[1..].iter().zip(&after.blocks()[1..]) {
            assert!(Arc::ptr_eq(old, new));
        }
        assert_eq!(before.blocks()[0].elapsed_ms(), 0);
    }

    #[test]
    fn tick_across_boundary_shares_untouched_blocks() {
        let before = tick(started(), 100);
        let after = tick(before.clone(), TOTAL);
        assert_eq!(after.current_index(), 1);
        assert!(!Arc::ptr_eq(&before.blocks()[0], &after.blocks()[0]));
        assert!(!Arc::ptr_eq(&before.blocks()[1], &after.blocks()[1]));
        for (old, new) in before.blocks()[2..].iter().zip(&after.blocks()[2..]) {
            assert!(Arc::ptr_eq(old, new));
        }
        assert_eq!(before.blocks()[0].elapsed_ms(), 100);
        assert_eq!(before.blocks()[0].status(), BlockStatus::Running);
        assert_eq!(before.blocks()[1].status(), BlockStatus::Pending);
    }

    #[test]
    fn zero_tick_leaves_session_unchanged() {
        let before = tick(started(), 300);
        let after = tick(before.clone(), 0);
        assert_eq!(before, after);
        assert!(Arc::ptr_eq(&before.blocks()[0], &after.blocks()[0]));
    }

    #[test]
    fn ticks_are_ignored_unless_running() {
        let initial = session();
        assert_eq!(tick(initial.clone(), 1_000), initial);

        let paused = tick(started(), 100).reduce(Control::Pause.into());
        assert_eq!(tick(paused.clone(), 1_000), paused);
    }

    #[test]
    fn exhausting_block_advances_to_next() {
        let session = tick(started(), TOTAL);
        assert_eq!(session.status(), SessionStatus::Running);
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.blocks()[0].status(), BlockStatus::Done);
        assert_eq!(session.blocks()[0].elapsed_ms(), TOTAL);
        assert_eq!(session.blocks()[1].status(), BlockStatus::Running);
        assert_eq!(session.blocks()[1].elapsed_ms(), 0);
        assert_invariants(&session);
    }

    #[test]
    fn overflow_is_not_carried_into_next_block() {
        let session = tick(started(), TOTAL * 3);
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.blocks()[1].elapsed_ms(), 0);
        assert_eq!(session.blocks()[2].status(), BlockStatus::Pending);
    }

    #[test]
    fn last_block_exhausted_ends_session() {
        let mut session = started();
        for _ in 0..5 {
            session = tick(session, TOTAL);
        }
        assert_eq!(session.current_index(), 5);
        session = tick(session, TOTAL - 1);
        assert_eq!(session.status(), SessionStatus::Running);

        session = tick(session, 10);
        assert_eq!(session.status(), SessionStatus::Ended);
        assert_eq!(session.current_index(), 5);
        assert_eq!(session.blocks()[5].status(), BlockStatus::Done);
        assert_eq!(session.blocks()[5].elapsed_ms(), TOTAL);
        assert!(session
            .blocks()
            .iter()
            .all(|b| b.status() == BlockStatus::Done));
    }

    #[test]
    fn ended_session_ignores_everything_but_reset() {
        let mut ended = started();
        for _ in 0..6 {
            ended = tick(ended, TOTAL);
        }
        assert_eq!(ended.status(), SessionStatus::Ended);

        for event in [
            Event::Tick { delta_ms: 1_000 },
            Control::Start.into(),
            Control::Pause.into(),
            Control::Resume.into(),
        ] {
            assert_eq!(ended.clone().reduce(event), ended);
        }
        assert_eq!(ended.reduce(Control::Reset.into()), session());
    }

    #[test]
    fn pause_resume_round_trip_keeps_progress() {
        let running = tick(tick(started(), TOTAL), 1_500);
        let paused = running.clone().reduce(Control::Pause.into());
        assert_eq!(paused.status(), SessionStatus::Paused);
        assert_eq!(paused.blocks()[1].status(), BlockStatus::Running);
        assert_invariants(&paused);

        let resumed = paused.reduce(Control::Resume.into());
        assert_eq!(resumed, running);
    }

    #[test]
    fn reset_returns_fresh_session_from_any_status() {
        let running = tick(started(), 2_000);
        let paused = running.clone().reduce(Control::Pause.into());
        let advanced = tick(started(), TOTAL);

        for session in [running, paused, advanced] {
            assert_eq!(session.reduce(Control::Reset.into()), self::session());
        }
        assert_eq!(
            Session::initial()
                .reduce(Control::Start.into())
                .reduce(Control::Reset.into()),
            Session::initial()
        );
    }

    #[test]
    fn out_of_order_controls_are_ignored() {
        let initial = session();
        assert_eq!(initial.clone().reduce(Control::Pause.into()), initial);
        assert_eq!(initial.clone().reduce(Control::Resume.into()), initial);

        let running = tick(started(), 10);
        assert_eq!(running.clone().reduce(Control::Start.into()), running);
        assert_eq!(running.clone().reduce(Control::Resume.into()), running);

        let paused = running.reduce(Control::Pause.into());
        assert_eq!(paused.clone().reduce(Control::Pause.into()), paused);
        assert_eq!(paused.clone().reduce(Control::Start.into()), paused);
    }

    #[test]
    fn empty_schedule_never_starts() {
        let empty = Session::new(Schedule::new(1_000, Vec::<String>::new()));
        let after = empty.clone().reduce(Control::Start.into());
        assert_eq!(after.status(), SessionStatus::Initial);
        assert_eq!(tick(after, 5_000), empty);
    }

    #[test]
    fn invariants_hold_over_long_event_sequences() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut session = session();
        let mut last_index = 0;
        for _ in 0..5_000 {
            let event: Event = match rng.random_range(0..10) {
                0 => Control::Start.into(),
                1 => Control::Pause.into(),
                2 => Control::Resume.into(),
                3 if rng.random_range(0..20) == 0 => Control::Reset.into(),
                _ => Event::Tick {
                    delta_ms: rng.random_range(0..TOTAL * 2),
                },
            };
            let is_reset = event == Event::Control(Control::Reset);
            session = session.reduce(event);
            assert_invariants(&session);
            if is_reset {
                assert_eq!(session.current_index(), 0);
            } else {
                assert!(session.current_index() >= last_index);
            }
            last_index = session.current_index();
        }
    }
}

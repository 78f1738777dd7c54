//! Read-only helpers the UI and status output derive from a session.

use crate::schedule::Block;
use spark_ipc::{BlockStatus, Control, SessionStatus};

/// How a block row is styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAppearance {
    /// Before the session starts every block looks the same.
    Neutral,
    Pending,
    Running,
    Done,
}

/// Share of the block already used, in `0.0..=1.0`.
pub fn progress_fraction(block: &Block) -> f64 {
    if block.total_ms() == 0 {
        return 0.0;
    }
    (block.elapsed_ms() as f64 / block.total_ms() as f64).min(1.0)
}

/// Remaining time rounded to the nearest second: `M:SS` from one minute up,
/// `Ns` below.
pub fn remaining_label(block: &Block) -> String {
    format_remaining(block.remaining_ms())
}

pub fn format_remaining(remaining_ms: u64) -> String {
    let seconds = remaining_ms.saturating_add(500) / 1000;
    let minutes = seconds / 60;
    let seconds = seconds % 60;
    if minutes == 0 {
        format!("{}s", seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

pub fn block_appearance(block: &Block, session: SessionStatus) -> BlockAppearance {
    if session == SessionStatus::Initial {
        return BlockAppearance::Neutral;
    }
    match block.status() {
        BlockStatus::Pending => BlockAppearance::Pending,
        BlockStatus::Running => BlockAppearance::Running,
        BlockStatus::Done => BlockAppearance::Done,
    }
}

/// The countdown is only shown while the block is actually counting down.
pub fn shows_remaining(block: &Block, session: SessionStatus) -> bool {
    block.status() == BlockStatus::Running && session == SessionStatus::Running
}

/// Controls the user may issue in `status`.
pub fn available_controls(status: SessionStatus) -> &'static [Control] {
    match status {
        SessionStatus::Initial => &[Control::Start],
        SessionStatus::Running => &[Control::Pause],
        SessionStatus::Paused | SessionStatus::Waiting => &[Control::Resume, Control::Reset],
        SessionStatus::Ended => &[Control::Reset],
    }
}

use spark_ipc::BlockStatus;

/// The blocks of a SPARK practice session, in the order they run.
pub const SPARK_BLOCKS: [&str; 6] = [
    "SOUND",
    "PERFORMANCE",
    "ATTUNED Intonation",
    "RHYTHM",
    "KINETIC Integration",
    "PAUSE",
];

pub const DEFAULT_BLOCK_DURATION_MS: u64 = 5 * 60 * 1000;

/// One named, fixed-duration phase of a practice session.
///
/// Invariant: `elapsed_ms <= total_ms`, and a block whose time is used up is
/// `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    title: String,
    total_ms: u64,
    elapsed_ms: u64,
    status: BlockStatus,
}

impl Block {
    pub fn new(title: impl Into<String>, total_ms: u64) -> Self {
        Self {
            title: title.into(),
            total_ms,
            elapsed_ms: 0,
            status: BlockStatus::Pending,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn remaining_ms(&self) -> u64 {
        self.total_ms.saturating_sub(self.elapsed_ms)
    }

    pub fn status(&self) -> BlockStatus {
        self.status
    }

    pub(crate) fn with_elapsed(&self, elapsed_ms: u64) -> Self {
        Self {
            elapsed_ms: elapsed_ms.min(self.total_ms),
            ..self.clone()
        }
    }

    pub(crate) fn with_status(&self, status: BlockStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// The block with all of its time used up.
    pub(crate) fn finished(&self) -> Self {
        Self {
            elapsed_ms: self.total_ms,
            status: BlockStatus::Done,
            ..self.clone()
        }
    }
}

/// The fixed ordered list of block titles and the single duration every
/// block runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    block_duration_ms: u64,
    titles: Vec<String>,
}

impl Schedule {
    pub fn new<I, S>(block_duration_ms: u64, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            block_duration_ms,
            titles: titles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn spark(block_duration_ms: u64) -> Self {
        Self::new(block_duration_ms, SPARK_BLOCKS)
    }

    /// Fresh pending blocks, one per title.
    pub fn blocks(&self) -> Vec<Block> {
        self.titles
            .iter()
            .map(|title| Block::new(title.as_str(), self.block_duration_ms))
            .collect()
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::spark(DEFAULT_BLOCK_DURATION_MS)
    }
}

//! Record set to split-flap cells.
//!
//! Row `i` and cell `j` of the board keep their animators across refreshes,
//! so a changed value rolls from whatever the cell showed before. Rows and
//! cells that disappear drop their animators, which removes them from the
//! activity registry.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::api::health::HealthState;
use crate::audio::AudioDriver;
use crate::config::columns;
use crate::flap::alphabet::ALPHABET_LEN;
use crate::flap::{FlapActivity, FlapAnimator};
use crate::types::BidRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    pub width: usize,
    pub right_aligned: bool,
}

impl Column {
    const fn from_layout((title, width, right_aligned): (&'static str, usize, bool)) -> Self {
        Self {
            title,
            width,
            right_aligned,
        }
    }

    /// Pad `text` to the column width. Longer text is kept whole.
    pub fn pad(&self, text: &str) -> String {
        let w = self.width;
        if self.right_aligned {
            format!("{text:>w$}")
        } else {
            format!("{text:<w$}")
        }
    }
}

pub const COLUMNS: [Column; 4] = [
    Column::from_layout(columns::ITEM),
    Column::from_layout(columns::DESCRIPTION),
    Column::from_layout(columns::BIDDER),
    Column::from_layout(columns::BID_AMOUNT),
];

/// Padded display text of one record, in column order.
pub fn row_text(record: &BidRecord) -> [String; 4] {
    let fields = record.display_fields();
    std::array::from_fn(|i| COLUMNS[i].pad(&fields[i]))
}

type BoardRow = [Vec<FlapAnimator>; 4];

// ---------------------------------------------------------------------------
// FlapBoard
// ---------------------------------------------------------------------------

pub struct FlapBoard {
    activity: Arc<FlapActivity>,
    rows: Vec<BoardRow>,
    rng: StdRng,
}

impl FlapBoard {
    pub fn new(activity: Arc<FlapActivity>) -> Self {
        Self::with_rng(activity, StdRng::from_entropy())
    }

    pub fn with_seed(activity: Arc<FlapActivity>, seed: u64) -> Self {
        Self::with_rng(activity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(activity: Arc<FlapActivity>, rng: StdRng) -> Self {
        Self {
            activity,
            rows: Vec::new(),
            rng,
        }
    }

    /// Point the board at a new record set.
    pub fn apply(&mut self, records: &[BidRecord]) {
        self.rows.truncate(records.len());
        for (i, record) in records.iter().enumerate() {
            let text = row_text(record);
            if i == self.rows.len() {
                self.rows.push(Default::default());
            }
            for (col, s) in text.iter().enumerate() {
                let cells = &mut self.rows[i][col];
                let wanted = s.chars().count();
                cells.truncate(wanted);
                for (j, c) in s.chars().enumerate() {
                    match cells.get(j) {
                        Some(flap) => flap.set_char(c),
                        None => {
                            // New flaps start at a random glyph.
                            let start = self.rng.gen_range(0..ALPHABET_LEN);
                            cells.push(FlapAnimator::mount(&self.activity, c, start));
                        }
                    }
                }
            }
        }
    }

    /// Advance every flap one position. Returns the busy count sampled after the step.
    pub fn tick(&self) -> usize {
        for row in &self.rows {
            for cells in row {
                for flap in cells {
                    flap.tick();
                }
            }
        }
        self.activity.sample()
    }

    pub fn rows(&self) -> &[BoardRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Text currently showing in row `row`, column `col`.
    pub fn showing(&self, row: usize, col: usize) -> Option<String> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|cells| cells.iter().map(FlapAnimator::glyph).collect())
    }

    pub fn activity(&self) -> &Arc<FlapActivity> {
        &self.activity
    }
}

// ---------------------------------------------------------------------------
// BoardDriver
// ---------------------------------------------------------------------------

/// Board plus the audio it drives. One [`step`](BoardDriver::step) per flap interval.
pub struct BoardDriver {
    board: FlapBoard,
    audio: AudioDriver,
    health: Arc<HealthState>,
    busy: usize,
}

impl BoardDriver {
    pub fn new(board: FlapBoard, audio: AudioDriver, health: Arc<HealthState>) -> Self {
        Self {
            board,
            audio,
            health,
            busy: 0,
        }
    }

    pub fn apply(&mut self, records: &[BidRecord]) {
        self.board.apply(records);
    }

    pub fn step(&mut self) -> usize {
        self.busy = self.board.tick();
        self.audio.apply(self.busy);
        self.health.set_busy_flaps(self.busy);
        self.busy
    }

    pub fn board(&self) -> &FlapBoard {
        &self.board
    }

    /// Busy count of the last step.
    pub fn busy(&self) -> usize {
        self.busy
    }

    pub fn playback_rate(&self) -> Option<f32> {
        self.audio.current_rate()
    }
}

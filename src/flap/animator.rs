use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::activity::{FlapActivity, Registration};
use super::alphabet::{glyph, index_of, ALPHABET_LEN};

/// Wheel position shared between the animator and its liveness query.
#[derive(Debug)]
struct FlapCell {
    current: AtomicUsize,
    target: AtomicUsize,
}

impl FlapCell {
    fn is_busy(&self) -> bool {
        self.current.load(Ordering::Relaxed) != self.target.load(Ordering::Relaxed)
    }
}

/// One character cell of the board.
///
/// Each [`tick`](FlapAnimator::tick) moves the wheel a single position toward
/// the glyph last passed to [`set_char`](FlapAnimator::set_char), so a change
/// rolls through the intermediate glyphs instead of jumping.
#[derive(Debug)]
pub struct FlapAnimator {
    cell: Arc<FlapCell>,
    _registration: Registration,
}

impl FlapAnimator {
    /// Mount a flap at wheel position `start` heading for `desired`.
    pub fn mount(activity: &Arc<FlapActivity>, desired: char, start: usize) -> Self {
        let cell = Arc::new(FlapCell {
            current: AtomicUsize::new(start.min(ALPHABET_LEN - 1)),
            target: AtomicUsize::new(index_of(desired)),
        });
        let probe = Arc::downgrade(&cell);
        let registration = activity.register(move || probe.upgrade().is_some_and(|c| c.is_busy()));
        Self {
            cell,
            _registration: registration,
        }
    }

    /// Retarget the flap. The latest call wins.
    pub fn set_char(&self, desired: char) {
        self.cell.target.store(index_of(desired), Ordering::Relaxed);
    }

    /// Advance one position toward the target. Returns whether the wheel moved.
    pub fn tick(&self) -> bool {
        let current = self.current_index();
        let next = step_toward(current, self.target_index());
        self.cell.current.store(next, Ordering::Relaxed);
        next != current
    }

    pub fn is_busy(&self) -> bool {
        self.cell.is_busy()
    }

    pub fn current_index(&self) -> usize {
        self.cell.current.load(Ordering::Relaxed)
    }

    pub fn target_index(&self) -> usize {
        self.cell.target.load(Ordering::Relaxed)
    }

    /// Glyph currently showing.
    pub fn glyph(&self) -> char {
        glyph(self.current_index())
    }

    /// Glyph the wheel will show after the next tick (same as `glyph` when settled).
    pub fn next_glyph(&self) -> char {
        glyph(step_toward(self.current_index(), self.target_index()))
    }
}

fn step_toward(current: usize, target: usize) -> usize {
    match current.cmp(&target) {
        std::cmp::Ordering::Less => current + 1,
        std::cmp::Ordering::Greater => current - 1,
        std::cmp::Ordering::Equal => current,
    }
}

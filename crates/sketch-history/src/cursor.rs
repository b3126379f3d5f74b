//! Cursor bookkeeping shared by the history and checkpoint sequences.
//!
//! Both counts move together: the checkpoint count changes only when the
//! history count crosses a multiple of the checkpoint gap.

/// Change in the valid checkpoint count when the valid history count moves
/// from `old_count` to `new_count`.
///
/// Positive when boundaries are crossed forward, negative when crossed back.
pub fn checkpoint_delta(old_count: usize, new_count: usize, gap: usize) -> isize {
    debug_assert!(gap > 0, "checkpoint gap must be positive");
    (new_count / gap) as isize - (old_count / gap) as isize
}

/// Logical counts of valid history layers and valid checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursors {
    /// Valid (non-undone) history layers.
    pub history: usize,
    /// Valid checkpoints.
    pub checkpoints: usize,
}

impl Cursors {
    /// Moves one layer back. Returns `false` at the oldest state.
    pub fn step_back(&mut self, gap: usize) -> bool {
        if self.history == 0 {
            return false;
        }
        self.move_to(self.history - 1, gap);
        true
    }

    /// Moves one layer forward.
    pub fn step_forward(&mut self, gap: usize) {
        self.move_to(self.history + 1, gap);
    }

    /// Offset of the first history layer not covered by the last valid checkpoint.
    pub fn tail_start(&self, gap: usize) -> usize {
        self.history.min(self.checkpoints * gap)
    }

    fn move_to(&mut self, history: usize, gap: usize) {
        let delta = checkpoint_delta(self.history, history, gap);
        self.history = history;
        self.checkpoints = self.checkpoints.saturating_add_signed(delta);
    }
}

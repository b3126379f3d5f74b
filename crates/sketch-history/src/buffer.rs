/// Checkpointed undo/redo history buffer.
///
/// Layers are appended to a history sequence. Every `checkpoint_gap` layers a
/// cumulative checkpoint is sealed, so reducing the whole valid history costs
/// one checkpoint plus fewer than `checkpoint_gap` layers. Undo and redo only
/// move cursors; the next append after an undo truncates what was undone.
use std::fmt;

use crate::config::HistoryConfig;
use crate::cursor::Cursors;

/// Fold function: combines `next` into `acc` in place.
pub type Combiner<T> = Box<dyn Fn(&mut T, &T)>;

/// Undo/redo history of immutable layers with periodic cumulative checkpoints.
///
/// Single-owner and single-threaded. Checkpoint `k` holds the fold of layers
/// `[0, (k + 1) * gap)` and is owned independently of the layers it covers.
pub struct HistoryBuffer<T> {
    /// Every layer physically present, including undone ones.
    history: Vec<T>,
    /// Cumulative folds, one per completed block of `gap` layers.
    checkpoints: Vec<T>,
    /// Valid prefix lengths of `history` and `checkpoints`.
    cursors: Cursors,
    /// Set by `undo()`; cleared by truncation or a redo reaching the end.
    in_undo: bool,
    config: HistoryConfig,
    combiner: Combiner<T>,
}

impl<T> fmt::Debug for HistoryBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryBuffer")
            .field("history_len", &self.history.len())
            .field("checkpoints_len", &self.checkpoints.len())
            .field("cursors", &self.cursors)
            .field("in_undo", &self.in_undo)
            .field("config", &self.config)
            .finish()
    }
}

impl<T> HistoryBuffer<T> {
    /// Creates an empty buffer with the default configuration.
    pub fn new(combiner: impl Fn(&mut T, &T) + 'static) -> Self {
        Self::with_config(HistoryConfig::default(), combiner)
    }

    /// Creates an empty buffer with a custom configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config` has a zero checkpoint gap or a maximum count not
    /// bigger than 1. Use [`HistoryConfig::validate`] first for configuration
    /// coming from outside the program.
    pub fn with_config(config: HistoryConfig, combiner: impl Fn(&mut T, &T) + 'static) -> Self {
        if let Err(e) = config.validate() {
            panic!("invalid history config: {e}");
        }
        Self {
            history: Vec::new(),
            checkpoints: Vec::new(),
            cursors: Cursors::default(),
            in_undo: false,
            config,
            combiner: Box::new(combiner),
        }
    }

    /// Returns the configuration the buffer was built with.
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Returns the checkpoint gap.
    pub fn gap(&self) -> usize {
        self.config.checkpoint_gap
    }

    /// Number of valid (non-undone) layers.
    pub fn len(&self) -> usize {
        self.cursors.history
    }

    /// Whether there are no valid layers at the current undo position.
    pub fn is_empty(&self) -> bool {
        self.cursors.history == 0
    }

    /// Number of layers physically stored, including undone ones.
    pub fn physical_len(&self) -> usize {
        self.history.len()
    }

    /// Number of valid checkpoints.
    pub fn checkpoint_count(&self) -> usize {
        self.cursors.checkpoints
    }

    /// Whether an undo is outstanding.
    pub fn in_undo(&self) -> bool {
        self.in_undo
    }

    /// Whether `undo()` would move the cursor.
    pub fn can_undo(&self) -> bool {
        self.cursors.history > 0
    }

    /// Whether `redo()` would move the cursor.
    pub fn can_redo(&self) -> bool {
        self.in_undo && self.cursors.history < self.history.len()
    }

    /// The valid layers, oldest first.
    pub fn valid_layers(&self) -> &[T] {
        &self.history[..self.valid_end()]
    }

    /// Returns the most recent valid layer.
    ///
    /// # Panics
    ///
    /// Panics if there is no valid layer. Guard with [`Self::is_empty`].
    pub fn last(&self) -> &T {
        let Some(index) = self.valid_end().checked_sub(1) else {
            panic!("no valid layer: history is empty at the current undo position");
        };
        &self.history[index]
    }

    /// Returns the latest valid checkpoint, if any.
    pub fn last_checkpoint(&self) -> Option<&T> {
        self.cursors
            .checkpoints
            .checked_sub(1)
            .and_then(|index| self.checkpoints.get(index))
    }

    /// Folds the valid history into `acc` using the buffer's combiner.
    ///
    /// Equivalent to folding every valid layer from the oldest, but starts
    /// from the latest valid checkpoint.
    pub fn reduce_into(&self, acc: &mut T) {
        self.visit(|item| (self.combiner)(acc, item));
    }

    /// Calls `f` on the latest valid checkpoint (if any), then on each valid
    /// layer it does not cover, in order.
    pub fn visit<F: FnMut(&T)>(&self, mut f: F) {
        let (checkpoint, tail) = self.replay_parts();
        if let Some(checkpoint) = checkpoint {
            f(checkpoint);
        }
        for layer in tail {
            f(layer);
        }
    }

    /// Number of items a reduction touches: the checkpoint plus the tail.
    pub fn replay_len(&self) -> usize {
        let (checkpoint, tail) = self.replay_parts();
        usize::from(checkpoint.is_some()) + tail.len()
    }

    /// End of the valid prefix, checked against the stored layers.
    fn valid_end(&self) -> usize {
        let end = self.cursors.history;
        assert!(
            end <= self.history.len(),
            "history shrunk below the valid cursor: {end} valid, {} stored",
            self.history.len()
        );
        end
    }

    fn replay_parts(&self) -> (Option<&T>, &[T]) {
        let end = self.valid_end();
        match self.last_checkpoint() {
            Some(checkpoint) => {
                let start = self.cursors.tail_start(self.gap());
                (Some(checkpoint), &self.history[start..end])
            }
            None => (None, &self.history[..end]),
        }
    }

    /// Steps one layer back.
    ///
    /// Always enters undo mode, even when nothing is left to undo.
    /// Returns `true` if the cursor moved, `false` if already at the oldest state.
    pub fn undo(&mut self) -> bool {
        self.in_undo = true;
        let gap = self.gap();
        let moved = self.cursors.step_back(gap);
        if moved {
            tracing::trace!(
                history = self.cursors.history,
                checkpoints = self.cursors.checkpoints,
                "undo"
            );
        }
        moved
    }

    /// Steps one layer forward.
    ///
    /// The result is **not** a success flag. It reports whether further redo
    /// is still available: a redo landing on the newest layer moves the
    /// cursor, leaves undo mode, and returns `false`. Without an outstanding
    /// undo this is a no-op returning `false`.
    pub fn redo(&mut self) -> bool {
        if !self.in_undo {
            return false;
        }
        if self.cursors.history >= self.history.len() {
            // Undo was requested on an empty history; nothing to step over.
            self.in_undo = false;
            return false;
        }

        let gap = self.gap();
        let reaches_end = self.cursors.history + 1 == self.history.len();
        self.cursors.step_forward(gap);
        if reaches_end {
            self.in_undo = false;
        }
        tracing::trace!(
            history = self.cursors.history,
            checkpoints = self.cursors.checkpoints,
            reaches_end,
            "redo"
        );
        !reaches_end
    }

    /// Raw access to every stored layer, bypassing the cursors.
    ///
    /// Undone layers are included until the next append truncates them.
    pub fn underlying(&self) -> &Vec<T> {
        &self.history
    }

    /// Mutable raw access to every stored layer, bypassing the cursors.
    ///
    /// Neither cursors nor checkpoints are adjusted for changes made here.
    ///
    /// # Panics
    ///
    /// Shrinking the vector below [`Self::len`] makes [`Self::last`],
    /// [`Self::valid_layers`], [`Self::reduce_into`] and [`Self::visit`] panic
    /// until enough layers are pushed back.
    pub fn underlying_mut(&mut self) -> &mut Vec<T> {
        &mut self.history
    }

    /// Drops everything past the cursors and leaves undo mode.
    fn truncate(&mut self) {
        let dropped_layers = self.history.len().saturating_sub(self.cursors.history);
        let dropped_checkpoints = self
            .checkpoints
            .len()
            .saturating_sub(self.cursors.checkpoints);
        self.history.truncate(self.cursors.history);
        self.checkpoints.truncate(self.cursors.checkpoints);
        self.in_undo = false;
        tracing::debug!(dropped_layers, dropped_checkpoints, "truncated undone history");
    }
}

impl<T: Clone> HistoryBuffer<T> {
    /// Appends a layer and returns a reference to the stored copy.
    ///
    /// In undo mode, undone layers and checkpoints are discarded first. A
    /// checkpoint is sealed when the new layer completes a block of `gap`.
    pub fn append(&mut self, layer: T) -> &T {
        if self.in_undo {
            self.truncate();
        }

        self.history.push(layer);
        self.cursors.history = self.history.len();

        if self.completes_block() {
            self.seal_checkpoint();
        }

        let index = self.history.len() - 1;
        &self.history[index]
    }

    /// Whether the stored layers end exactly on the boundary of the next
    /// checkpoint to build. A boundary whose checkpoint survived truncation
    /// never qualifies.
    fn completes_block(&self) -> bool {
        (self.checkpoints.len() + 1) * self.gap() == self.history.len()
    }

    fn seal_checkpoint(&mut self) {
        let end = self.history.len();
        let start = end - self.gap();
        let (mut checkpoint, rest) = match self.checkpoints.last() {
            Some(previous) => (previous.clone(), &self.history[start..end]),
            None => (self.history[0].clone(), &self.history[1..end]),
        };
        for layer in rest {
            (self.combiner)(&mut checkpoint, layer);
        }
        self.checkpoints.push(checkpoint);
        self.cursors.checkpoints = self.checkpoints.len();
        tracing::trace!(
            checkpoints = self.checkpoints.len(),
            covered = end,
            "sealed checkpoint"
        );
    }
}

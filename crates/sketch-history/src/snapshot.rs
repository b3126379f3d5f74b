/// Serializable snapshot of the valid layers of a `HistoryBuffer`.
///
/// Only the valid prefix is captured: undone layers and checkpoints are not.
/// Restoring re-appends every layer, so checkpoints are recomputed by the
/// combiner instead of being read back.
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::buffer::HistoryBuffer;
use crate::config::HistoryConfig;

/// Valid layers of a buffer together with the configuration it used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub config: HistoryConfig,
    /// Valid layers, oldest first.
    pub layers: Vec<T>,
}

impl<T: Serialize> Snapshot<T> {
    /// Encodes the snapshot with bincode.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer fails to serialize.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).context("Failed to serialize history snapshot")
    }
}

impl<T: DeserializeOwned> Snapshot<T> {
    /// Decodes a snapshot produced by [`Snapshot::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not decode or carry an invalid config.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: Snapshot<T> =
            bincode::deserialize(bytes).context("Failed to deserialize history snapshot")?;
        snapshot
            .config
            .validate()
            .context("History snapshot carries an invalid config")?;
        Ok(snapshot)
    }
}

impl<T: Clone> HistoryBuffer<T> {
    /// Captures the valid layers. The redo tail is not part of the snapshot.
    pub fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            config: *self.config(),
            layers: self.valid_layers().to_vec(),
        }
    }

    /// Rebuilds a buffer by appending every layer of `snapshot` in order.
    ///
    /// # Panics
    ///
    /// Panics if the snapshot config is invalid. Snapshots obtained through
    /// [`Snapshot::from_bytes`] are already validated.
    pub fn from_snapshot(snapshot: Snapshot<T>, combiner: impl Fn(&mut T, &T) + 'static) -> Self {
        let mut buffer = Self::with_config(snapshot.config, combiner);
        for layer in snapshot.layers {
            buffer.append(layer);
        }
        tracing::debug!(
            layers = buffer.len(),
            checkpoints = buffer.checkpoint_count(),
            "restored history from snapshot"
        );
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adder(acc: &mut i64, next: &i64) {
        *acc += *next;
    }

    fn filled(gap: usize, count: i64) -> HistoryBuffer<i64> {
        let mut buf = HistoryBuffer::with_config(HistoryConfig::with_gap(gap), adder);
        for value in 1..=count {
            buf.append(value);
        }
        buf
    }

    #[test]
    fn test_snapshot_excludes_redo_tail() {
        let mut buf = filled(3, 7);
        buf.undo();
        buf.undo();
        let snapshot = buf.snapshot();
        assert_eq!(snapshot.layers, vec![1, 2, 3, 4, 5]);
        assert_eq!(snapshot.config.checkpoint_gap, 3);
    }

    #[test]
    fn test_restore_recomputes_checkpoints() {
        let buf = filled(3, 10);
        let restored = HistoryBuffer::from_snapshot(buf.snapshot(), adder);
        assert_eq!(restored.len(), 10);
        assert_eq!(restored.checkpoint_count(), 3);
        assert_eq!(restored.last_checkpoint(), Some(&45));
        assert!(!restored.in_undo());
    }

    #[test]
    fn test_bytes_roundtrip_restores_state() {
        let buf = filled(4, 9);
        let bytes = buf.snapshot().to_bytes().expect("serialize");
        let decoded: Snapshot<i64> = Snapshot::from_bytes(&bytes).expect("deserialize");
        let restored = HistoryBuffer::from_snapshot(decoded, adder);
        let mut sum = 0;
        restored.reduce_into(&mut sum);
        assert_eq!(sum, 45);
        assert_eq!(*restored.last(), 9);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let result = Snapshot::<i64>::from_bytes(&[1, 2, 3]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_bytes_rejects_invalid_config() {
        let snapshot = Snapshot {
            config: HistoryConfig {
                checkpoint_gap: 0,
                max_count: 10,
            },
            layers: vec![1_i64],
        };
        let bytes = snapshot.to_bytes().expect("serialize");
        let err = Snapshot::<i64>::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("invalid config"));
    }

    #[test]
    fn test_empty_snapshot() {
        let buf = filled(3, 0);
        let restored = HistoryBuffer::from_snapshot(buf.snapshot(), adder);
        assert!(restored.is_empty());
        assert_eq!(restored.last_checkpoint(), None);
    }
}

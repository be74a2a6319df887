//! Epoch-Bucketed Volume Window
//!
//! The reserve box keeps two rolling windows of trade volume, one per
//! transmutation direction, each a fixed number of epoch buckets ordered most
//! recent first. When an operation lands in a later epoch than the box's last
//! recorded one, the window is shifted right by the number of elapsed epochs
//! and zero buckets are prepended, so volume ages out after `bucket_len`
//! epochs.
//!
//! ```text
//!   before (last epoch E):      [v0, v1, v2, ..., v13]
//!   two epochs later:           [ 0,  0, v0, ..., v11]
//!   after adding `a`:           [ a,  0, v0, ..., v11]
//! ```

use crate::{
    error::ReactorError,
    math::{checked_sum, MathError},
    registers::{encode_long_array, EncodeError},
};

/// Transmutation direction, naming which volume window it feeds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// Volatile tokens converted into stable tokens (R7)
    ToStable,
    /// Stable tokens converted into volatile tokens (R8)
    ToVolatile,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Direction::ToStable => Direction::ToVolatile,
            Direction::ToVolatile => Direction::ToStable,
        }
    }
}

/// Per-epoch volume in nanoERG, most recent epoch first.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VolumeBuckets(Vec<u64>);

impl VolumeBuckets {
    pub fn new(buckets: Vec<u64>) -> Self {
        Self(buckets)
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all buckets.
    pub fn total(&self) -> Result<u64, MathError> {
        checked_sum(self.0.iter().copied())
    }

    /// Shift right by `epochs`, prepending empty buckets. The result always
    /// holds exactly `bucket_len` buckets.
    pub fn shifted(&self, epochs: usize, bucket_len: usize) -> Self {
        let epochs = epochs.min(bucket_len);
        let mut buckets = vec![0u64; epochs];
        buckets.extend(self.0.iter().copied());
        buckets.resize(bucket_len, 0);
        Self(buckets)
    }

    /// Add `amount` into the current (first) bucket.
    pub fn with_added(mut self, amount: u64) -> Result<Self, MathError> {
        match self.0.first_mut() {
            Some(current) => *current = current.checked_add(amount).ok_or(MathError::Overflow)?,
            None => self.0.push(amount),
        }
        Ok(self)
    }

    /// Sum of the `days` most recent buckets.
    pub fn accumulate(&self, days: usize, bucket_len: usize) -> Result<u64, ReactorError> {
        if days > bucket_len {
            return Err(ReactorError::Range {
                requested: days,
                max: bucket_len,
            });
        }
        Ok(checked_sum(self.0.iter().take(days).copied())?)
    }

    /// Encode as a `Coll[Long]` register value.
    pub fn encode(&self) -> Result<String, EncodeError> {
        encode_long_array(&self.0)
    }
}

/// Whole epochs between the box's last epoch boundary and `height`, capped at
/// `bucket_len`. A height behind the box counts as zero elapsed epochs.
pub fn epochs_elapsed(last_epoch_height: u64, height: u64, epoch_len: u64, bucket_len: usize) -> usize {
    if epoch_len == 0 {
        return 0;
    }
    let epochs = height.saturating_sub(last_epoch_height) / epoch_len;
    usize::try_from(epochs).map_or(bucket_len, |e| e.min(bucket_len))
}

/// Epoch boundary at or below `height`.
pub fn epoch_floor(height: u64, epoch_len: u64) -> u64 {
    if epoch_len == 0 {
        return height;
    }
    height / epoch_len * epoch_len
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn window() -> VolumeBuckets {
        VolumeBuckets::new((1..=14).collect())
    }

    #[test]
    fn test_shift_by_zero_keeps_window() {
        assert_eq!(window().shifted(0, 14), window());
    }

    #[test]
    fn test_shift_prepends_zeros_and_truncates() {
        let shifted = window().shifted(2, 14);
        assert_eq!(shifted.len(), 14);
        assert_eq!(&shifted.as_slice()[..3], &[0, 0, 1]);
        assert_eq!(shifted.as_slice()[13], 12);
    }

    #[test]
    fn test_shift_past_window_clears_everything() {
        let shifted = window().shifted(100, 14);
        assert_eq!(shifted, VolumeBuckets::new(vec![0; 14]));
    }

    #[test]
    fn test_short_window_is_padded() {
        let shifted = VolumeBuckets::new(vec![5]).shifted(1, 4);
        assert_eq!(shifted.as_slice(), &[0, 5, 0, 0]);
    }

    #[test]
    fn test_with_added() {
        let buckets = window().shifted(1, 14).with_added(7).unwrap();
        assert_eq!(buckets.as_slice()[0], 7);
        assert_eq!(buckets.as_slice()[1], 1);

        let overflow = VolumeBuckets::new(vec![u64::MAX]).with_added(1);
        assert_eq!(overflow, Err(MathError::Overflow));
    }

    #[test]
    fn test_accumulate() {
        let w = window();
        assert_eq!(w.accumulate(0, 14).unwrap(), 0);
        assert_eq!(w.accumulate(1, 14).unwrap(), 1);
        assert_eq!(w.accumulate(7, 14).unwrap(), 28);
        assert_eq!(w.accumulate(14, 14).unwrap(), 105);
        assert_matches!(
            w.accumulate(15, 14),
            Err(ReactorError::Range { requested: 15, max: 14 })
        );
    }

    #[test]
    fn test_epochs_elapsed() {
        assert_eq!(epochs_elapsed(1440, 1440, 720, 14), 0);
        assert_eq!(epochs_elapsed(1440, 2159, 720, 14), 0);
        assert_eq!(epochs_elapsed(1440, 2160, 720, 14), 1);
        assert_eq!(epochs_elapsed(1440, 1_000_000, 720, 14), 14);
        // Height behind the box
        assert_eq!(epochs_elapsed(1440, 100, 720, 14), 0);
    }

    #[test]
    fn test_epoch_floor() {
        assert_eq!(epoch_floor(0, 720), 0);
        assert_eq!(epoch_floor(719, 720), 0);
        assert_eq!(epoch_floor(1_234_567, 720), 1_234_080);
    }

    #[test]
    fn test_encode() {
        assert_eq!(VolumeBuckets::new(vec![1, 2]).encode().unwrap(), "11020204");
    }
}

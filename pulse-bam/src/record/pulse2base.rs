//! Pulse-to-base position cache.
//!
//! Built from the pulse-call string (`pc` tag): an uppercase character is a
//! basecalled pulse, lowercase is a squashed one.

use crate::BamError;

#[derive(Clone, Debug)]
pub struct PulseToBaseCache {
    bits: Vec<u64>,
    num_pulses: usize,
    num_bases: usize,
}

impl PulseToBaseCache {
    pub fn new(pulse_calls: &str) -> PulseToBaseCache {
        let num_pulses = pulse_calls.len();
        let mut bits = vec![0u64; (num_pulses + 63) / 64];
        let mut num_bases = 0;
        for (i, b) in pulse_calls.bytes().enumerate() {
            if b.is_ascii_uppercase() {
                bits[i / 64] |= 1 << (i % 64);
                num_bases += 1;
            }
        }
        PulseToBaseCache {
            bits,
            num_pulses,
            num_bases,
        }
    }

    pub fn num_pulses(&self) -> usize {
        self.num_pulses
    }

    pub fn num_bases(&self) -> usize {
        self.num_bases
    }

    pub fn is_basecall_at(&self, pos: usize) -> bool {
        pos < self.num_pulses && (self.bits[pos / 64] >> (pos % 64)) & 1 == 1
    }

    /// Position of the first basecalled pulse.
    pub fn find_first(&self) -> Option<usize> {
        self.find_from(0)
    }

    /// Position of the next basecalled pulse after `from`.
    pub fn find_next(&self, from: usize) -> Option<usize> {
        self.find_from(from + 1)
    }

    fn find_from(&self, start: usize) -> Option<usize> {
        if start >= self.num_pulses {
            return None;
        }
        let mut block = start / 64;
        // mask off bits below the start position in the first block
        let mut word = self.bits[block] & (u64::MAX << (start % 64));
        loop {
            if word != 0 {
                let pos = block * 64 + word.trailing_zeros() as usize;
                return (pos < self.num_pulses).then_some(pos);
            }
            block += 1;
            if block >= self.bits.len() {
                return None;
            }
            word = self.bits[block];
        }
    }

    /// Projects a per-pulse slice down to base space.
    ///
    /// The input length must match the pulse count; feeding already-squashed
    /// data is an invariant violation, not a request to rebuild.
    pub fn keep_basecalls<T: Clone>(&self, pulse_data: &[T]) -> Result<Vec<T>, BamError> {
        if pulse_data.len() != self.num_pulses {
            return Err(BamError::InvariantViolated(format!(
                "per-pulse data length {} does not match pulse count {}",
                pulse_data.len(),
                self.num_pulses
            )));
        }
        let mut result = Vec::with_capacity(self.num_bases);
        for (i, value) in pulse_data.iter().enumerate() {
            if self.is_basecall_at(i) {
                result.push(value.clone());
            }
        }
        Ok(result)
    }

    /// String form of `keep_basecalls`, for pulse-call style data.
    pub fn keep_basecalls_str(&self, pulse_data: &str) -> Result<String, BamError> {
        let bytes = self.keep_basecalls(pulse_data.as_bytes())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let cache = PulseToBaseCache::new("AccGt");
        assert_eq!(cache.num_pulses(), 5);
        assert_eq!(cache.num_bases(), 2);
        assert!(cache.is_basecall_at(0));
        assert!(!cache.is_basecall_at(1));
        assert!(cache.is_basecall_at(3));
    }

    #[test]
    fn test_find() {
        let cache = PulseToBaseCache::new("ccAgTt");
        assert_eq!(cache.find_first(), Some(2));
        assert_eq!(cache.find_next(2), Some(4));
        assert_eq!(cache.find_next(4), None);

        let empty = PulseToBaseCache::new("acgt");
        assert_eq!(empty.find_first(), None);
    }

    #[test]
    fn test_find_across_blocks() {
        let mut calls = "a".repeat(70);
        calls.push('G');
        let cache = PulseToBaseCache::new(&calls);
        assert_eq!(cache.find_first(), Some(70));
    }

    #[test]
    fn test_projection() {
        let cache = PulseToBaseCache::new("AccGt");
        let projected = cache.keep_basecalls(&[10u16, 20, 30, 40, 50]).unwrap();
        assert_eq!(projected, vec![10, 40]);
        assert_eq!(cache.keep_basecalls_str("AccGt").unwrap(), "AG");
    }

    #[test]
    fn test_squashed_input_rejected() {
        let cache = PulseToBaseCache::new("AccGt");
        // base-space data (length == num_bases) must not be re-projected
        let err = cache.keep_basecalls(&[1u8, 2]).unwrap_err();
        assert!(matches!(err, BamError::InvariantViolated(_)));
    }
}

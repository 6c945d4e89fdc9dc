use std::ops::{Deref, DerefMut};

use once_cell::sync::Lazy;

/// Largest frame count representable by the lossy 8-bit encoding.
pub const MAX_FRAMEPOINT: u16 = 952;

// The 8-bit code space covers [0, 952] in four regimes of widening
// granularity: steps of 1, 2, 4, then 8 frames, 64 codes apiece.
static FRAMEPOINTS: Lazy<[u16; 256]> = Lazy::new(|| {
    let mut table = [0u16; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let i = i as u16;
        *entry = match i {
            0..=63 => i,
            64..=127 => 64 + (i - 64) * 2,
            128..=191 => 192 + (i - 128) * 4,
            _ => 448 + (i - 192) * 8,
        };
    }
    table
});

fn code_for(frame: u16) -> u8 {
    if frame >= MAX_FRAMEPOINT {
        return 255;
    }
    // framepoints are strictly increasing, so pick the insertion
    // neighbor whose decoded value is nearest; ties go to the lower code
    match FRAMEPOINTS.binary_search(&frame) {
        Ok(i) => i as u8,
        Err(i) => {
            let above = FRAMEPOINTS[i];
            let below = FRAMEPOINTS[i - 1];
            if (frame - below) <= (above - frame) {
                (i - 1) as u8
            } else {
                i as u8
            }
        }
    }
}

/// A sequence of 16-bit pulse-frame counts.
///
/// Carries the raw data; the lossy `CodecV1` form is produced on demand by
/// `encode` and consumed by `decode`. A round trip through the lossy form
/// is idempotent after the first pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frames(Vec<u16>);

impl Frames {
    pub fn new() -> Frames {
        Frames(Vec::new())
    }

    pub fn data(&self) -> &[u16] {
        &self.0
    }

    pub fn into_data(self) -> Vec<u16> {
        self.0
    }

    pub fn set_data(&mut self, data: Vec<u16>) {
        self.0 = data;
    }

    /// Expand lossy 8-bit codes to frame counts.
    pub fn decode(codes: &[u8]) -> Frames {
        Frames(codes.iter().map(|c| FRAMEPOINTS[*c as usize]).collect())
    }

    /// Downsample frame counts to lossy 8-bit codes.
    pub fn encode(&self) -> Vec<u8> {
        self.0.iter().map(|f| code_for(*f)).collect()
    }
}

impl Deref for Frames {
    type Target = Vec<u16>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Frames {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<u16>> for Frames {
    fn from(data: Vec<u16>) -> Frames {
        Frames(data)
    }
}

impl FromIterator<u16> for Frames {
    fn from_iter<T: IntoIterator<Item = u16>>(iter: T) -> Frames {
        Frames(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_regimes() {
        assert_eq!(FRAMEPOINTS[0], 0);
        assert_eq!(FRAMEPOINTS[63], 63);
        assert_eq!(FRAMEPOINTS[64], 64);
        assert_eq!(FRAMEPOINTS[127], 190);
        assert_eq!(FRAMEPOINTS[128], 192);
        assert_eq!(FRAMEPOINTS[191], 444);
        assert_eq!(FRAMEPOINTS[192], 448);
        assert_eq!(FRAMEPOINTS[255], MAX_FRAMEPOINT);
    }

    #[test]
    fn test_exact_codes_roundtrip() {
        for code in 0..=255u8 {
            let frames = Frames::decode(&[code]);
            assert_eq!(frames.encode(), vec![code]);
        }
    }

    #[test]
    fn test_nearest_with_low_tie() {
        // 65 sits exactly between framepoints 64 and 66
        assert_eq!(code_for(65), 64);
        assert_eq!(code_for(66), 65);
        assert_eq!(code_for(191), 127);
        assert_eq!(code_for(193), 128);
    }

    #[test]
    fn test_saturation() {
        assert_eq!(code_for(952), 255);
        assert_eq!(code_for(u16::MAX), 255);
    }

    #[test]
    fn test_lossy_idempotence() {
        let raw = Frames::from(vec![0, 10, 63, 65, 200, 500, 1000]);
        let once = Frames::decode(&raw.encode());
        let twice = Frames::decode(&once.encode());
        assert_eq!(once, twice);
    }
}

use std::fmt::{self, Display};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use crate::CommonError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
// CIGAR operations
// See SAM v1 section 1.4.6
pub enum CigarOp {
    M(u32),
    I(u32),
    D(u32),
    N(u32),
    S(u32),
    H(u32),
    P(u32),
    Eq(u32),
    X(u32),
}

impl CigarOp {
    pub fn len(&self) -> u32 {
        match *self {
            CigarOp::M(v)
            | CigarOp::I(v)
            | CigarOp::D(v)
            | CigarOp::N(v)
            | CigarOp::S(v)
            | CigarOp::H(v)
            | CigarOp::P(v)
            | CigarOp::Eq(v)
            | CigarOp::X(v) => v,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn op_char(&self) -> char {
        match self {
            CigarOp::M(_) => 'M',
            CigarOp::I(_) => 'I',
            CigarOp::D(_) => 'D',
            CigarOp::N(_) => 'N',
            CigarOp::S(_) => 'S',
            CigarOp::H(_) => 'H',
            CigarOp::P(_) => 'P',
            CigarOp::Eq(_) => '=',
            CigarOp::X(_) => 'X',
        }
    }

    /// Operation code as packed in BAM CIGAR words.
    pub fn code(&self) -> u32 {
        match self {
            CigarOp::M(_) => 0,
            CigarOp::I(_) => 1,
            CigarOp::D(_) => 2,
            CigarOp::N(_) => 3,
            CigarOp::S(_) => 4,
            CigarOp::H(_) => 5,
            CigarOp::P(_) => 6,
            CigarOp::Eq(_) => 7,
            CigarOp::X(_) => 8,
        }
    }

    pub fn from_char(op: char, len: u32) -> Result<CigarOp, CommonError> {
        match op {
            'M' => Ok(CigarOp::M(len)),
            'I' => Ok(CigarOp::I(len)),
            'D' => Ok(CigarOp::D(len)),
            'N' => Ok(CigarOp::N(len)),
            'S' => Ok(CigarOp::S(len)),
            'H' => Ok(CigarOp::H(len)),
            'P' => Ok(CigarOp::P(len)),
            '=' => Ok(CigarOp::Eq(len)),
            'X' => Ok(CigarOp::X(len)),
            otherwise => Err(CommonError::InvalidCigarOp(otherwise)),
        }
    }

    pub fn from_code(code: u32, len: u32) -> Result<CigarOp, CommonError> {
        match code {
            0 => Ok(CigarOp::M(len)),
            1 => Ok(CigarOp::I(len)),
            2 => Ok(CigarOp::D(len)),
            3 => Ok(CigarOp::N(len)),
            4 => Ok(CigarOp::S(len)),
            5 => Ok(CigarOp::H(len)),
            6 => Ok(CigarOp::P(len)),
            7 => Ok(CigarOp::Eq(len)),
            8 => Ok(CigarOp::X(len)),
            otherwise => Err(CommonError::InvalidCigarCode(otherwise)),
        }
    }

    /// Unpacks a 28-bit length | 4-bit op BAM CIGAR word.
    ///
    /// See SAM v1 4.2
    pub fn from_word(word: u32) -> Result<CigarOp, CommonError> {
        CigarOp::from_code(word & 0xF, word >> 4)
    }

    pub fn to_word(&self) -> u32 {
        (self.len() << 4) | self.code()
    }

    pub fn consumes_query(&self) -> bool {
        matches!(
            self,
            CigarOp::M(_) | CigarOp::I(_) | CigarOp::S(_) | CigarOp::Eq(_) | CigarOp::X(_)
        )
    }

    pub fn consumes_reference(&self) -> bool {
        matches!(
            self,
            CigarOp::M(_) | CigarOp::D(_) | CigarOp::N(_) | CigarOp::Eq(_) | CigarOp::X(_)
        )
    }

    pub fn is_clip(&self) -> bool {
        matches!(self, CigarOp::S(_) | CigarOp::H(_))
    }

    /// Same operation with a different length.
    pub fn with_len(&self, len: u32) -> CigarOp {
        match self {
            CigarOp::M(_) => CigarOp::M(len),
            CigarOp::I(_) => CigarOp::I(len),
            CigarOp::D(_) => CigarOp::D(len),
            CigarOp::N(_) => CigarOp::N(len),
            CigarOp::S(_) => CigarOp::S(len),
            CigarOp::H(_) => CigarOp::H(len),
            CigarOp::P(_) => CigarOp::P(len),
            CigarOp::Eq(_) => CigarOp::Eq(len),
            CigarOp::X(_) => CigarOp::X(len),
        }
    }
}

impl Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len(), self.op_char())
    }
}

/// An ordered CIGAR operation sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cigar(Vec<CigarOp>);

impl Cigar {
    pub fn new() -> Cigar {
        Cigar(Vec::new())
    }

    pub fn from_ops(ops: Vec<CigarOp>) -> Cigar {
        Cigar(ops)
    }

    pub fn into_ops(self) -> Vec<CigarOp> {
        self.0
    }

    /// Query length implied by {M, I, S, =, X} operations.
    pub fn query_length(&self) -> u32 {
        self.0
            .iter()
            .filter(|op| op.consumes_query())
            .map(CigarOp::len)
            .sum()
    }

    /// Reference length implied by {M, D, N, =, X} operations.
    pub fn reference_length(&self) -> u32 {
        self.0
            .iter()
            .filter(|op| op.consumes_reference())
            .map(CigarOp::len)
            .sum()
    }

    pub fn from_words(words: &[u32]) -> Result<Cigar, CommonError> {
        let mut ops = Vec::with_capacity(words.len());
        for w in words {
            ops.push(CigarOp::from_word(*w)?);
        }
        Ok(Cigar(ops))
    }

    pub fn to_words(&self) -> Vec<u32> {
        self.0.iter().map(CigarOp::to_word).collect()
    }
}

impl Deref for Cigar {
    type Target = Vec<CigarOp>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Cigar {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<CigarOp>> for Cigar {
    fn from(ops: Vec<CigarOp>) -> Cigar {
        Cigar(ops)
    }
}

impl FromIterator<CigarOp> for Cigar {
    fn from_iter<T: IntoIterator<Item = CigarOp>>(iter: T) -> Cigar {
        Cigar(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Cigar {
    type Item = &'a CigarOp;
    type IntoIter = std::slice::Iter<'a, CigarOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.0 {
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

impl FromStr for Cigar {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Cigar, CommonError> {
        let mut ops = Vec::new();
        let mut len: u32 = 0;
        let mut saw_digit = false;
        for c in s.chars() {
            if let Some(d) = c.to_digit(10) {
                len = len
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(d))
                    .ok_or_else(|| CommonError::MalformedCigar(s.to_string()))?;
                saw_digit = true;
            } else {
                if !saw_digit {
                    return Err(CommonError::MalformedCigar(s.to_string()));
                }
                ops.push(CigarOp::from_char(c, len)?);
                len = 0;
                saw_digit = false;
            }
        }
        if saw_digit {
            // trailing length with no operation
            return Err(CommonError::MalformedCigar(s.to_string()));
        }
        Ok(Cigar(ops))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cigar_roundtrip_text() {
        let c: Cigar = "3=1D2I4=".parse().unwrap();
        assert_eq!(
            *c,
            vec![
                CigarOp::Eq(3),
                CigarOp::D(1),
                CigarOp::I(2),
                CigarOp::Eq(4)
            ]
        );
        assert_eq!(c.to_string(), "3=1D2I4=");
    }

    #[test]
    fn test_cigar_bad_text() {
        assert!("10Z".parse::<Cigar>().is_err());
        assert!("M10".parse::<Cigar>().is_err());
        assert!("10".parse::<Cigar>().is_err());
    }

    #[test]
    fn test_word_packing() {
        let op = CigarOp::S(6);
        let w = op.to_word();
        assert_eq!(w, (6 << 4) | 4);
        assert_eq!(CigarOp::from_word(w).unwrap(), op);
    }

    #[test]
    fn test_lengths() {
        let c: Cigar = "2S3=1D2I4X5H".parse().unwrap();
        assert_eq!(c.query_length(), 2 + 3 + 2 + 4);
        assert_eq!(c.reference_length(), 3 + 1 + 4);
    }

    #[test]
    fn test_invalid_code() {
        assert!(CigarOp::from_code(9, 1).is_err());
    }
}

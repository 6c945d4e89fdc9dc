pub mod cigar;
pub mod frames;
pub mod position;
pub mod qual;
pub mod sequence;

use thiserror::Error;

pub use cigar::{Cigar, CigarOp};
pub use frames::Frames;
pub use position::{Position, Strand, UNMAPPED_POSITION};
pub use qual::QualityValues;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("invalid CIGAR operation '{0}'")]
    InvalidCigarOp(char),
    #[error("invalid CIGAR operation code {0}")]
    InvalidCigarCode(u32),
    #[error("malformed CIGAR string '{0}'")]
    MalformedCigar(String),
    #[error("quality value {0} out of range [0, 93]")]
    QualityOutOfRange(u8),
    #[error("FASTQ character {0:#x} out of printable range")]
    InvalidFastqChar(u8),
}

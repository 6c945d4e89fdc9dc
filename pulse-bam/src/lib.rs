pub mod chemistry;
pub mod codec;
pub mod header;
pub mod query;
pub mod record;
pub mod sam;
pub mod tag;
pub mod tags;
pub mod validator;

mod error;

pub use error::BamError;
pub use header::{
    BamHeader, BarcodeMode, BarcodeQualityType, BaseFeature, FrameCodec, PlatformModel,
    ProgramInfo, ReadGroupInfo, SequenceInfo, Version,
};
pub use record::{
    BamRecord, ClipType, FrameEncoding, LocalContextFlags, Orientation, PulseBehavior,
    PulseToBaseCache, RawRecord, RecordBuilder, RecordFlags, RecordType,
};
pub use tag::{Tag, TagCollection, TagModifier};
pub use tags::RecordTag;
pub use validator::{ValidationErrors, Validator};

/// SAM/BAM format version written when a header carries none.
pub const SAM_VERSION: &str = "1.5";

/// Oldest supported value of the @HD `pb` tag.
pub const MINIMUM_PACBIO_BAM_VERSION: &str = "3.0.1";

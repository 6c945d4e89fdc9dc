//! Incremental record assembly.

use pulse_common::{Cigar, Position, UNMAPPED_POSITION};

use crate::header::SharedHeader;
use crate::record::{BamRecord, RawRecord, RecordFlags};
use crate::tag::{Tag, TagCollection};
use crate::BamError;

/// Accumulates record fields and emits a finished record in one step.
///
/// Derived values (bin, cigar count, sequence length) are computed at
/// emission; `build` is a pure function of the builder's state.
#[derive(Clone, Debug, Default)]
pub struct RecordBuilder {
    header: Option<SharedHeader>,
    name: String,
    sequence: String,
    qualities: String,
    cigar: Cigar,
    tags: TagCollection,
    flags: RecordFlags,
    reference_id: i32,
    position: Position,
    mate_reference_id: i32,
    mate_position: Position,
    insert_size: i32,
    map_quality: u8,
}

impl RecordBuilder {
    pub fn new() -> RecordBuilder {
        let mut builder = RecordBuilder::default();
        builder.reset();
        builder
    }

    pub fn with_header(header: SharedHeader) -> RecordBuilder {
        let mut builder = RecordBuilder::new();
        builder.header = Some(header);
        builder
    }

    /// Seeds the builder from an existing record.
    pub fn from_prototype(prototype: &BamRecord) -> Result<RecordBuilder, BamError> {
        let raw = prototype.raw();
        Ok(RecordBuilder {
            header: Some(prototype.header().clone()),
            name: raw.name(),
            sequence: raw.sequence(),
            qualities: raw.qualities().to_fastq(),
            cigar: raw.cigar(),
            tags: raw.tags()?,
            flags: raw.flags(),
            reference_id: raw.reference_id(),
            position: raw.position(),
            mate_reference_id: raw.mate_reference_id(),
            mate_position: raw.mate_position(),
            insert_size: raw.insert_size(),
            map_quality: raw.map_quality(),
        })
    }

    /// Clears all state back to an unmapped, empty record.
    pub fn reset(&mut self) {
        self.name.clear();
        self.sequence.clear();
        self.qualities.clear();
        self.cigar = Cigar::new();
        self.tags.clear();
        self.flags = RecordFlags::UNMAPPED;
        self.reference_id = -1;
        self.position = UNMAPPED_POSITION;
        self.mate_reference_id = -1;
        self.mate_position = UNMAPPED_POSITION;
        self.insert_size = 0;
        self.map_quality = 255;
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_string();
        self
    }

    pub fn sequence(&mut self, sequence: &str) -> &mut Self {
        self.sequence = sequence.to_string();
        self
    }

    /// FASTQ-encoded qualities; empty means "not stored".
    pub fn qualities(&mut self, qualities: &str) -> &mut Self {
        self.qualities = qualities.to_string();
        self
    }

    pub fn cigar(&mut self, cigar: Cigar) -> &mut Self {
        self.cigar = cigar;
        self
    }

    pub fn tag(&mut self, name: &str, value: Tag) -> &mut Self {
        self.tags.insert(name.to_string(), value);
        self
    }

    pub fn tags(&mut self, tags: TagCollection) -> &mut Self {
        self.tags = tags;
        self
    }

    pub fn reference_id(&mut self, id: i32) -> &mut Self {
        self.reference_id = id;
        self
    }

    pub fn position(&mut self, pos: Position) -> &mut Self {
        self.position = pos;
        self
    }

    pub fn mate_reference_id(&mut self, id: i32) -> &mut Self {
        self.mate_reference_id = id;
        self
    }

    pub fn mate_position(&mut self, pos: Position) -> &mut Self {
        self.mate_position = pos;
        self
    }

    pub fn insert_size(&mut self, size: i32) -> &mut Self {
        self.insert_size = size;
        self
    }

    pub fn map_quality(&mut self, quality: u8) -> &mut Self {
        self.map_quality = quality;
        self
    }

    fn set_flag(&mut self, flag: RecordFlags, on: bool) -> &mut Self {
        self.flags.set(flag, on);
        self
    }

    pub fn set_mapped(&mut self, mapped: bool) -> &mut Self {
        self.set_flag(RecordFlags::UNMAPPED, !mapped)
    }

    pub fn set_reverse_strand(&mut self, reverse: bool) -> &mut Self {
        self.set_flag(RecordFlags::REVERSE_STRAND, reverse)
    }

    pub fn set_paired(&mut self, paired: bool) -> &mut Self {
        self.set_flag(RecordFlags::PAIRED, paired)
    }

    pub fn set_proper_pair(&mut self, proper: bool) -> &mut Self {
        self.set_flag(RecordFlags::PROPER_PAIR, proper)
    }

    pub fn set_first_mate(&mut self, first: bool) -> &mut Self {
        self.set_flag(RecordFlags::MATE_1, first)
    }

    pub fn set_second_mate(&mut self, second: bool) -> &mut Self {
        self.set_flag(RecordFlags::MATE_2, second)
    }

    pub fn set_secondary(&mut self, secondary: bool) -> &mut Self {
        self.set_flag(RecordFlags::SECONDARY, secondary)
    }

    pub fn set_supplementary(&mut self, supplementary: bool) -> &mut Self {
        self.set_flag(RecordFlags::SUPPLEMENTARY, supplementary)
    }

    pub fn set_duplicate(&mut self, duplicate: bool) -> &mut Self {
        self.set_flag(RecordFlags::DUPLICATE, duplicate)
    }

    pub fn set_failed_qc(&mut self, failed: bool) -> &mut Self {
        self.set_flag(RecordFlags::FAILED_QC, failed)
    }

    /// Emits a complete record; the builder is untouched and reusable.
    pub fn build(&self) -> Result<BamRecord, BamError> {
        let mut raw = RawRecord::new();
        raw.set_flags(self.flags);
        raw.set_reference_id(self.reference_id);
        raw.set_mate_reference_id(self.mate_reference_id);
        raw.set_mate_position(self.mate_position);
        raw.set_insert_size(self.insert_size);
        raw.set_map_quality(self.map_quality);
        raw.set_name(&self.name)?;
        raw.set_sequence_and_qualities(&self.sequence, &self.qualities)?;
        raw.set_tags(&self.tags)?;
        raw.set_cigar(&self.cigar);
        // position last: bin derives from position + cigar
        raw.set_position(self.position);

        let record = match &self.header {
            Some(header) => BamRecord::from_raw_with_header(raw, header.clone()),
            None => BamRecord::from_raw(raw),
        };
        Ok(record)
    }
}

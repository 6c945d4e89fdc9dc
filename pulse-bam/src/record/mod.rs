//! High-level PacBio record API over the raw record core.

pub mod builder;
pub mod clip;
pub mod pulse2base;
pub mod raw;

pub use builder::RecordBuilder;
pub use clip::ClipType;
pub use pulse2base::PulseToBaseCache;
pub use raw::{reg2bin, RawRecord, RecordFlags, MISSING_QUALITY, UNMAPPED_BIN};

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use bitflags::bitflags;

use pulse_common::sequence::{reverse_complement, reverse_complement_case_sensitive};
use pulse_common::{Cigar, CigarOp, Frames, Position, QualityValues, Strand, UNMAPPED_POSITION};

use crate::header::{ReadGroupInfo, SharedHeader};
use crate::tag::Tag;
use crate::tags::RecordTag;
use crate::BamError;

/// Scale factor between stored photon counts (u16) and API values (f32).
pub const PHOTON_FACTOR: f32 = 10.0;

/// Which way sequence-indexed data is facing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// As produced by the instrument.
    Native,
    /// Strand-flipped to match the reference.
    Genomic,
}

/// Whether per-pulse queries see every pulse or only basecalled ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PulseBehavior {
    All,
    BasecallsOnly,
}

/// How frame data is written back to the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameEncoding {
    Raw,
    Lossy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordType {
    Zmw,
    Polymerase,
    HqRegion,
    Subread,
    Ccs,
    Scrap,
    Transcript,
    Unknown,
}

impl RecordType {
    pub fn from_name(name: &str) -> RecordType {
        match name {
            "ZMW" => RecordType::Zmw,
            "POLYMERASE" => RecordType::Polymerase,
            "HQREGION" => RecordType::HqRegion,
            "SUBREAD" => RecordType::Subread,
            "CCS" => RecordType::Ccs,
            "SCRAP" => RecordType::Scrap,
            "TRANSCRIPT" => RecordType::Transcript,
            _ => RecordType::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RecordType::Zmw => "ZMW",
            RecordType::Polymerase => "POLYMERASE",
            RecordType::HqRegion => "HQREGION",
            RecordType::Subread => "SUBREAD",
            RecordType::Ccs => "CCS",
            RecordType::Scrap => "SCRAP",
            RecordType::Transcript => "TRANSCRIPT",
            RecordType::Unknown => "UNKNOWN",
        }
    }

    pub fn is_ccs_or_transcript(&self) -> bool {
        matches!(self, RecordType::Ccs | RecordType::Transcript)
    }
}

bitflags! {
    /// The `cx` tag: where a subread sat within its polymerase read.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct LocalContextFlags: u8 {
        const ADAPTER_BEFORE = 1;
        const ADAPTER_AFTER  = 2;
        const BARCODE_BEFORE = 4;
        const BARCODE_AFTER  = 8;
        const FORWARD_PASS   = 16;
        const REVERSE_PASS   = 32;
    }
}

fn hole_number_from_name(name: &str) -> Result<i32, BamError> {
    let tokens: Vec<&str> = name.split('/').collect();
    let malformed = || BamError::MalformedInput(format!("malformed record name '{name}'"));
    let hole = if tokens.first() == Some(&"transcript") {
        if tokens.len() != 2 {
            return Err(malformed());
        }
        tokens[1]
    } else {
        if tokens.len() != 3 {
            return Err(malformed());
        }
        tokens[1]
    };
    hole.parse().map_err(|_| malformed())
}

fn query_interval_from_name(name: &str) -> Result<(Position, Position), BamError> {
    let malformed = || BamError::MalformedInput(format!("malformed record name '{name}'"));
    let tokens: Vec<&str> = name.split('/').collect();
    if tokens.len() != 3 {
        return Err(malformed());
    }
    let (start, end) = tokens[2].split_once('_').ok_or_else(malformed)?;
    Ok((
        start.parse().map_err(|_| malformed())?,
        end.parse().map_err(|_| malformed())?,
    ))
}

fn orient_bases(
    bases: &mut String,
    current: Orientation,
    requested: Orientation,
    is_reverse_strand: bool,
    is_pulse: bool,
) {
    if current != requested && is_reverse_strand {
        if is_pulse {
            // lowercase squashed-pulse markers keep their case
            reverse_complement_case_sensitive(bases);
        } else {
            reverse_complement(bases);
        }
    }
}

fn orient_data<T>(data: &mut [T], current: Orientation, requested: Orientation, is_reverse: bool) {
    if current != requested && is_reverse {
        data.reverse();
    }
}

/// Walks the CIGAR emitting, filling, or skipping positions.
///
/// Per op: M/=/X/I copy; D/P emit the fill value when aligned; N/H skip;
/// S copies unless excised.
fn clip_and_gapify<T: Clone>(
    cigar: &Cigar,
    aligned: bool,
    excise_soft_clips: bool,
    data: &[T],
    padding_fill: T,
    deletion_fill: T,
) -> Result<Vec<T>, BamError> {
    let mut out = Vec::with_capacity(data.len());
    let mut src = 0usize;
    for op in cigar {
        let len = op.len() as usize;
        match op {
            CigarOp::H(_) | CigarOp::N(_) => {}
            CigarOp::S(_) => {
                if excise_soft_clips {
                    src += len;
                } else {
                    let end = src + len;
                    if end > data.len() {
                        return Err(length_mismatch(data.len(), cigar));
                    }
                    out.extend_from_slice(&data[src..end]);
                    src = end;
                }
            }
            CigarOp::D(_) => {
                if aligned {
                    out.extend(std::iter::repeat(deletion_fill.clone()).take(len));
                }
            }
            CigarOp::P(_) => {
                if aligned {
                    out.extend(std::iter::repeat(padding_fill.clone()).take(len));
                }
            }
            CigarOp::M(_) | CigarOp::Eq(_) | CigarOp::X(_) | CigarOp::I(_) => {
                let end = src + len;
                if end > data.len() {
                    return Err(length_mismatch(data.len(), cigar));
                }
                out.extend_from_slice(&data[src..end]);
                src = end;
            }
        }
    }
    Ok(out)
}

fn length_mismatch(len: usize, cigar: &Cigar) -> BamError {
    BamError::InvariantViolated(format!(
        "data length {len} shorter than CIGAR query length {}",
        cigar.query_length()
    ))
}

fn incompatible_pulse_request() -> BamError {
    BamError::IncompatibleRequest(
        "cannot gap or soft-clip data over all pulses; request basecalls only".to_string(),
    )
}

/// A PacBio BAM record.
///
/// Wraps the raw core with a shared header, lazily-computed aligned
/// coordinates, and a lazily-built pulse-to-base cache.
#[derive(Debug)]
pub struct BamRecord {
    raw: RawRecord,
    header: SharedHeader,
    aligned_start: Cell<Position>,
    aligned_end: Cell<Position>,
    p2b_cache: RefCell<Option<PulseToBaseCache>>,
}

impl Default for BamRecord {
    fn default() -> BamRecord {
        BamRecord::new()
    }
}

impl Clone for BamRecord {
    fn clone(&self) -> BamRecord {
        BamRecord {
            raw: self.raw.clone(),
            header: Arc::clone(&self.header),
            aligned_start: self.aligned_start.clone(),
            aligned_end: self.aligned_end.clone(),
            // rebuilt on demand
            p2b_cache: RefCell::new(None),
        }
    }
}

impl PartialEq for BamRecord {
    fn eq(&self, other: &BamRecord) -> bool {
        self.raw == other.raw && self.header == other.header
    }
}

impl BamRecord {
    pub fn new() -> BamRecord {
        BamRecord::from_raw(RawRecord::new())
    }

    pub fn with_header(header: SharedHeader) -> BamRecord {
        let mut record = BamRecord::new();
        record.header = header;
        record
    }

    pub fn from_raw(raw: RawRecord) -> BamRecord {
        BamRecord {
            raw,
            header: SharedHeader::default(),
            aligned_start: Cell::new(UNMAPPED_POSITION),
            aligned_end: Cell::new(UNMAPPED_POSITION),
            p2b_cache: RefCell::new(None),
        }
    }

    pub fn from_raw_with_header(raw: RawRecord, header: SharedHeader) -> BamRecord {
        let mut record = BamRecord::from_raw(raw);
        record.header = header;
        record
    }

    pub fn raw(&self) -> &RawRecord {
        &self.raw
    }

    /// Mutable access to the core; drops the cached aligned coordinates and
    /// pulse mapping, which are rebuilt on demand.
    pub fn raw_mut(&mut self) -> &mut RawRecord {
        self.reset_cached_positions();
        *self.p2b_cache.borrow_mut() = None;
        &mut self.raw
    }

    pub fn header(&self) -> &SharedHeader {
        &self.header
    }

    pub fn set_header(&mut self, header: SharedHeader) -> &mut Self {
        self.header = header;
        self
    }

    fn reset_cached_positions(&self) {
        self.aligned_start.set(UNMAPPED_POSITION);
        self.aligned_end.set(UNMAPPED_POSITION);
    }

    // ---- identity ----

    pub fn full_name(&self) -> String {
        self.raw.name()
    }

    pub fn record_type(&self) -> RecordType {
        match self.read_group() {
            Ok(rg) => RecordType::from_name(rg.read_type()),
            Err(_) => {
                // no read group; peek at the name
                let name = self.full_name();
                if name.starts_with("transcript/") {
                    RecordType::Transcript
                } else if name.contains("/ccs") {
                    RecordType::Ccs
                } else {
                    RecordType::Unknown
                }
            }
        }
    }

    pub fn has_hole_number(&self) -> bool {
        self.raw.has_tag(RecordTag::HoleNumber.label())
    }

    /// ZMW hole number, from the `zm` tag or, failing that, the name.
    pub fn hole_number(&self) -> Result<i32, BamError> {
        match self.raw.tag_value(RecordTag::HoleNumber.label()) {
            Some(tag) => tag.to_i32(),
            None => hole_number_from_name(&self.full_name()),
        }
    }

    pub fn set_hole_number(&mut self, hole_number: i32) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::HoleNumber, &Tag::from(hole_number))?;
        Ok(self)
    }

    pub fn movie_name(&self) -> Result<String, BamError> {
        if let Ok(rg) = self.read_group() {
            return Ok(rg.movie_name().to_string());
        }
        let name = self.full_name();
        name.split('/')
            .next()
            .filter(|prefix| !prefix.is_empty())
            .map(str::to_string)
            .ok_or_else(|| BamError::MalformedInput(format!("record has invalid name '{name}'")))
    }

    pub fn has_query_start(&self) -> bool {
        self.raw.has_tag(RecordTag::QueryStart.label())
    }

    pub fn has_query_end(&self) -> bool {
        self.raw.has_tag(RecordTag::QueryEnd.label())
    }

    /// Query start from the `qs` tag, falling back to the record name.
    pub fn query_start(&self) -> Result<Position, BamError> {
        if let Some(tag) = self.raw.tag_value(RecordTag::QueryStart.label()) {
            return tag.to_i32();
        }
        let record_type = self.record_type();
        if record_type.is_ccs_or_transcript() {
            return Err(BamError::NotFound(format!(
                "no query start for {} records",
                record_type.name()
            )));
        }
        Ok(query_interval_from_name(&self.full_name())
            .map(|(start, _)| start)
            .unwrap_or(0))
    }

    /// Query end from the `qe` tag, falling back to the record name.
    pub fn query_end(&self) -> Result<Position, BamError> {
        if let Some(tag) = self.raw.tag_value(RecordTag::QueryEnd.label()) {
            return tag.to_i32();
        }
        let record_type = self.record_type();
        if record_type.is_ccs_or_transcript() {
            return Err(BamError::NotFound(format!(
                "no query end for {} records",
                record_type.name()
            )));
        }
        Ok(query_interval_from_name(&self.full_name())
            .map(|(_, end)| end)
            .unwrap_or(0))
    }

    pub fn set_query_start(&mut self, pos: Position) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::QueryStart, &Tag::from(pos))?;
        self.update_name()?;
        Ok(self)
    }

    pub fn set_query_end(&mut self, pos: Position) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::QueryEnd, &Tag::from(pos))?;
        self.update_name()?;
        Ok(self)
    }

    pub fn read_group_id(&self) -> Option<String> {
        self.raw
            .tag_value(RecordTag::ReadGroup.label())
            .and_then(|tag| tag.to_str().map(str::to_string).ok())
    }

    pub fn read_group(&self) -> Result<&ReadGroupInfo, BamError> {
        let id = self
            .read_group_id()
            .ok_or_else(|| BamError::NotFound("record carries no RG tag".to_string()))?;
        self.header.read_group(&id)
    }

    pub fn set_read_group(&mut self, read_group: &ReadGroupInfo) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::ReadGroup, &Tag::from(read_group.id()))?;
        self.update_name()?;
        Ok(self)
    }

    /// Rebuilds the record name from movie, hole number, and read span.
    pub fn update_name(&mut self) -> Result<(), BamError> {
        let hole = match self.hole_number() {
            Ok(n) => n.to_string(),
            Err(_) => "?".to_string(),
        };
        let name = if self.record_type() == RecordType::Transcript {
            format!("transcript/{hole}")
        } else {
            let movie = self.movie_name().unwrap_or_default();
            if self.record_type() == RecordType::Ccs {
                format!("{movie}/{hole}/ccs")
            } else {
                let qs = match self.raw.tag_value(RecordTag::QueryStart.label()) {
                    Some(tag) => tag.to_i32()?.to_string(),
                    None => "?".to_string(),
                };
                let qe = match self.raw.tag_value(RecordTag::QueryEnd.label()) {
                    Some(tag) => tag.to_i32()?.to_string(),
                    None => "?".to_string(),
                };
                format!("{movie}/{hole}/{qs}_{qe}")
            }
        };
        self.raw.set_name(&name)?;
        Ok(())
    }

    // ---- alignment ----

    pub fn is_mapped(&self) -> bool {
        self.raw.is_mapped()
    }

    pub fn aligned_strand(&self) -> Strand {
        if self.raw.is_reverse_strand() {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    pub fn reference_start(&self) -> Position {
        self.raw.position()
    }

    pub fn reference_end(&self) -> Position {
        if !self.raw.is_mapped() || self.raw.position() < 0 {
            return UNMAPPED_POSITION;
        }
        self.raw.position() + self.raw.cigar().reference_length() as Position
    }

    pub fn reference_id(&self) -> i32 {
        self.raw.reference_id()
    }

    pub fn reference_name(&self) -> Result<&str, BamError> {
        if !self.is_mapped() {
            return Err(BamError::NotFound(
                "unmapped record has no reference name".to_string(),
            ));
        }
        self.header.sequence_name(self.raw.reference_id())
    }

    pub fn map_quality(&self) -> u8 {
        self.raw.map_quality()
    }

    /// Start of the aligned (soft-clip-excised) region, in query coordinates.
    pub fn aligned_start(&self) -> Position {
        if self.aligned_start.get() == UNMAPPED_POSITION {
            self.calculate_aligned_positions();
        }
        self.aligned_start.get()
    }

    /// End of the aligned (soft-clip-excised) region, in query coordinates.
    pub fn aligned_end(&self) -> Position {
        if self.aligned_end.get() == UNMAPPED_POSITION {
            self.calculate_aligned_positions();
        }
        self.aligned_end.get()
    }

    fn calculate_aligned_positions(&self) {
        self.reset_cached_positions();
        if !self.raw.is_mapped() {
            return;
        }

        let seq_length = self.raw.sequence_length() as Position;
        let is_ccs_or_transcript = self.record_type().is_ccs_or_transcript();
        let q_start = if is_ccs_or_transcript {
            0
        } else {
            match self.query_start() {
                Ok(qs) => qs,
                Err(_) => return,
            }
        };
        let q_end = if is_ccs_or_transcript {
            seq_length
        } else {
            match self.query_end() {
                Ok(qe) => qe,
                Err(_) => return,
            }
        };

        // offsets of the soft-clip-excised region within the sequence
        let cigar = self.raw.cigar();
        let mut start_offset: Position = 0;
        let mut end_offset: Position = seq_length;
        for op in cigar.iter() {
            match op {
                CigarOp::H(_) => {}
                CigarOp::S(len) => start_offset += *len as Position,
                _ => break,
            }
        }
        for op in cigar.iter().rev() {
            match op {
                CigarOp::H(_) => {}
                CigarOp::S(len) => end_offset -= *len as Position,
                _ => break,
            }
        }

        if self.raw.is_reverse_strand() {
            self.aligned_start.set(q_start + (seq_length - end_offset));
            self.aligned_end.set(q_end - start_offset);
        } else {
            self.aligned_start.set(q_start + start_offset);
            self.aligned_end.set(q_end - (seq_length - end_offset));
        }
    }

    pub fn cigar_data(&self, excise_all_clips: bool) -> Cigar {
        let cigar = self.raw.cigar();
        if excise_all_clips {
            cigar.into_ops().into_iter().filter(|op| !op.is_clip()).collect()
        } else {
            cigar
        }
    }

    pub fn num_deleted_bases(&self) -> usize {
        self.raw
            .cigar()
            .iter()
            .filter_map(|op| match op {
                CigarOp::D(len) => Some(*len as usize),
                _ => None,
            })
            .sum()
    }

    pub fn num_inserted_bases(&self) -> usize {
        self.raw
            .cigar()
            .iter()
            .filter_map(|op| match op {
                CigarOp::I(len) => Some(*len as usize),
                _ => None,
            })
            .sum()
    }

    pub fn num_matches_and_mismatches(&self) -> (usize, usize) {
        let mut result = (0, 0);
        for op in &self.raw.cigar() {
            match op {
                CigarOp::Eq(len) => result.0 += *len as usize,
                CigarOp::X(len) => result.1 += *len as usize,
                _ => {}
            }
        }
        result
    }

    /// Marks the record mapped, flipping stored SEQ/QUAL to genomic
    /// orientation for reverse-strand alignments.
    pub fn map_record(
        &mut self,
        reference_id: i32,
        reference_start: Position,
        strand: Strand,
        cigar: &Cigar,
        map_quality: u8,
    ) -> Result<&mut Self, BamError> {
        self.raw.set_reference_id(reference_id);
        self.raw.set_mapped(true);
        self.raw.set_position(reference_start);
        self.raw.set_cigar(cigar);
        self.raw.set_map_quality(map_quality);

        match strand {
            Strand::Forward => {
                self.raw.set_reverse_strand(false);
            }
            Strand::Reverse => {
                self.raw.set_reverse_strand(true);
                let mut sequence = self.raw.sequence();
                let mut qualities = self.raw.qualities();
                reverse_complement(&mut sequence);
                qualities.reverse();
                self.raw
                    .set_sequence_and_qualities(&sequence, &qualities.to_fastq())?;
            }
        }
        self.reset_cached_positions();
        *self.p2b_cache.borrow_mut() = None;
        Ok(self)
    }

    // ---- fetch pipeline ----

    pub(crate) fn with_pulse_cache<R>(
        &self,
        f: impl FnOnce(&PulseToBaseCache) -> Result<R, BamError>,
    ) -> Result<R, BamError> {
        let mut slot = self.p2b_cache.borrow_mut();
        if slot.is_none() {
            let pulse_calls = match self.raw.tag_value(RecordTag::PulseCall.label()) {
                Some(tag) => tag.to_str()?.to_string(),
                None => {
                    return Err(BamError::NotFound(
                        "cannot build pulse-to-base mapping without the 'pc' tag".to_string(),
                    ))
                }
            };
            *slot = Some(PulseToBaseCache::new(&pulse_calls));
        }
        match slot.as_ref() {
            Some(cache) => f(cache),
            None => Err(BamError::NotFound("pulse-call data unavailable".to_string())),
        }
    }

    fn fetch_string_raw(&self, tag: RecordTag) -> Result<String, BamError> {
        match self.raw.tag_value(tag.label()) {
            Some(value) => Ok(value.to_str()?.to_string()),
            None => Ok(String::new()),
        }
    }

    pub(crate) fn fetch_bases(
        &self,
        tag: RecordTag,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<String, BamError> {
        let is_seq = tag == RecordTag::Seq;
        let is_pulse = tag.is_pulse();

        // SEQ lives in genomic orientation, tags in native
        let (mut bases, mut current) = if is_seq {
            (self.raw.sequence(), Orientation::Genomic)
        } else {
            (self.fetch_string_raw(tag)?, Orientation::Native)
        };

        if is_pulse && pulse_behavior == PulseBehavior::BasecallsOnly && !bases.is_empty() {
            bases = self.with_pulse_cache(|cache| cache.keep_basecalls_str(&bases))?;
        }

        if (aligned || excise_soft_clips) && !bases.is_empty() {
            if is_pulse && pulse_behavior != PulseBehavior::BasecallsOnly {
                return Err(incompatible_pulse_request());
            }
            if self.raw.is_mapped() {
                orient_bases(
                    &mut bases,
                    current,
                    Orientation::Genomic,
                    self.raw.is_reverse_strand(),
                    is_pulse,
                );
                current = Orientation::Genomic;
                let gapped = clip_and_gapify(
                    &self.raw.cigar(),
                    aligned,
                    excise_soft_clips,
                    bases.as_bytes(),
                    b'*',
                    b'-',
                )?;
                bases = String::from_utf8_lossy(&gapped).into_owned();
            }
        }

        orient_bases(
            &mut bases,
            current,
            orientation,
            self.raw.is_reverse_strand(),
            is_pulse,
        );
        Ok(bases)
    }

    pub(crate) fn fetch_qualities(
        &self,
        tag: RecordTag,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<QualityValues, BamError> {
        let is_qual = tag == RecordTag::Qual;
        let is_pulse = tag.is_pulse();

        let (quals, mut current) = if is_qual {
            (self.raw.qualities(), Orientation::Genomic)
        } else {
            let fastq = self.fetch_string_raw(tag)?;
            (QualityValues::from_fastq(&fastq)?, Orientation::Native)
        };
        let mut quals = quals.into_vec();

        if is_pulse && pulse_behavior == PulseBehavior::BasecallsOnly && !quals.is_empty() {
            quals = self.with_pulse_cache(|cache| cache.keep_basecalls(&quals))?;
        }

        if (aligned || excise_soft_clips) && !quals.is_empty() {
            if is_pulse && pulse_behavior != PulseBehavior::BasecallsOnly {
                return Err(incompatible_pulse_request());
            }
            if self.raw.is_mapped() {
                orient_data(&mut quals, current, Orientation::Genomic, self.raw.is_reverse_strand());
                current = Orientation::Genomic;
                quals = clip_and_gapify(
                    &self.raw.cigar(),
                    aligned,
                    excise_soft_clips,
                    &quals,
                    0,
                    0,
                )?;
            }
        }

        orient_data(&mut quals, current, orientation, self.raw.is_reverse_strand());
        Ok(QualityValues::from(quals))
    }

    fn fetch_frames_raw(&self, tag: RecordTag) -> Result<Frames, BamError> {
        match self.raw.tag_value(tag.label()) {
            None => Ok(Frames::new()),
            Some(value) => {
                if value.is_uint8_array() {
                    // lossy frame codes
                    Ok(Frames::decode(value.to_u8_array()?))
                } else if value.is_uint16_array() {
                    Ok(Frames::from(value.to_u16_array()?.to_vec()))
                } else {
                    Err(BamError::InvalidValue(format!(
                        "frame tag '{}' is neither uint8 nor uint16 array",
                        tag.label()
                    )))
                }
            }
        }
    }

    pub(crate) fn fetch_frames(
        &self,
        tag: RecordTag,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<Frames, BamError> {
        let is_pulse = tag.is_pulse();
        let mut data = self.fetch_frames_raw(tag)?.into_data();
        let mut current = Orientation::Native;

        if is_pulse && pulse_behavior == PulseBehavior::BasecallsOnly && !data.is_empty() {
            data = self.with_pulse_cache(|cache| cache.keep_basecalls(&data))?;
        }

        if (aligned || excise_soft_clips) && !data.is_empty() {
            if is_pulse && pulse_behavior != PulseBehavior::BasecallsOnly {
                return Err(incompatible_pulse_request());
            }
            if self.raw.is_mapped() {
                orient_data(&mut data, current, Orientation::Genomic, self.raw.is_reverse_strand());
                current = Orientation::Genomic;
                data = clip_and_gapify(
                    &self.raw.cigar(),
                    aligned,
                    excise_soft_clips,
                    &data,
                    0,
                    0,
                )?;
            }
        }

        orient_data(&mut data, current, orientation, self.raw.is_reverse_strand());
        Ok(Frames::from(data))
    }

    fn fetch_photons_raw(&self, tag: RecordTag) -> Result<Vec<f32>, BamError> {
        match self.raw.tag_value(tag.label()) {
            None => Ok(Vec::new()),
            Some(value) => {
                let stored = value.to_u16_array().map_err(|_| {
                    BamError::InvalidValue(format!(
                        "photon tag '{}' is not a uint16 array",
                        tag.label()
                    ))
                })?;
                Ok(stored.iter().map(|p| f32::from(*p) / PHOTON_FACTOR).collect())
            }
        }
    }

    pub(crate) fn fetch_photons(
        &self,
        tag: RecordTag,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<Vec<f32>, BamError> {
        let is_pulse = tag.is_pulse();
        let mut data = self.fetch_photons_raw(tag)?;
        let mut current = Orientation::Native;

        if is_pulse && pulse_behavior == PulseBehavior::BasecallsOnly && !data.is_empty() {
            data = self.with_pulse_cache(|cache| cache.keep_basecalls(&data))?;
        }

        if (aligned || excise_soft_clips) && !data.is_empty() {
            if is_pulse && pulse_behavior != PulseBehavior::BasecallsOnly {
                return Err(incompatible_pulse_request());
            }
            if self.raw.is_mapped() {
                orient_data(&mut data, current, Orientation::Genomic, self.raw.is_reverse_strand());
                current = Orientation::Genomic;
                data = clip_and_gapify(
                    &self.raw.cigar(),
                    aligned,
                    excise_soft_clips,
                    &data,
                    0.0,
                    0.0,
                )?;
            }
        }

        orient_data(&mut data, current, orientation, self.raw.is_reverse_strand());
        Ok(data)
    }

    pub(crate) fn fetch_u32s(
        &self,
        tag: RecordTag,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<Vec<u32>, BamError> {
        let is_pulse = tag.is_pulse();
        let mut data = match self.raw.tag_value(tag.label()) {
            None => Vec::new(),
            Some(value) => value.to_u32_array()?.to_vec(),
        };
        let mut current = Orientation::Native;

        if is_pulse && pulse_behavior == PulseBehavior::BasecallsOnly && !data.is_empty() {
            data = self.with_pulse_cache(|cache| cache.keep_basecalls(&data))?;
        }

        if (aligned || excise_soft_clips) && !data.is_empty() {
            if is_pulse && pulse_behavior != PulseBehavior::BasecallsOnly {
                return Err(incompatible_pulse_request());
            }
            if self.raw.is_mapped() {
                orient_data(&mut data, current, Orientation::Genomic, self.raw.is_reverse_strand());
                current = Orientation::Genomic;
                data = clip_and_gapify(&self.raw.cigar(), aligned, excise_soft_clips, &data, 0, 0)?;
            }
        }

        orient_data(&mut data, current, orientation, self.raw.is_reverse_strand());
        Ok(data)
    }

    pub(crate) fn fetch_u8s(
        &self,
        tag: RecordTag,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<Vec<u8>, BamError> {
        let is_pulse = tag.is_pulse();
        let mut data = match self.raw.tag_value(tag.label()) {
            None => Vec::new(),
            Some(value) => value.to_u8_array()?.to_vec(),
        };
        let mut current = Orientation::Native;

        if is_pulse && pulse_behavior == PulseBehavior::BasecallsOnly && !data.is_empty() {
            data = self.with_pulse_cache(|cache| cache.keep_basecalls(&data))?;
        }

        if (aligned || excise_soft_clips) && !data.is_empty() {
            if is_pulse && pulse_behavior != PulseBehavior::BasecallsOnly {
                return Err(incompatible_pulse_request());
            }
            if self.raw.is_mapped() {
                orient_data(&mut data, current, Orientation::Genomic, self.raw.is_reverse_strand());
                current = Orientation::Genomic;
                data = clip_and_gapify(&self.raw.cigar(), aligned, excise_soft_clips, &data, 0, 0)?;
            }
        }

        orient_data(&mut data, current, orientation, self.raw.is_reverse_strand());
        Ok(data)
    }

    pub(crate) fn create_or_edit(&mut self, tag: RecordTag, value: &Tag) -> Result<(), BamError> {
        let label = tag.label();
        if self.raw.has_tag(label) {
            self.raw.edit_tag(label, value)?;
        } else {
            self.raw.add_tag(label, value)?;
        }
        *self.p2b_cache.borrow_mut() = None;
        Ok(())
    }

    pub(crate) fn encode_photons(data: &[f32]) -> Vec<u16> {
        data.iter().map(|p| (p * PHOTON_FACTOR) as u16).collect()
    }

    // ---- SEQ / QUAL ----

    pub fn sequence(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
    ) -> Result<String, BamError> {
        self.fetch_bases(
            RecordTag::Seq,
            orientation,
            aligned,
            excise_soft_clips,
            PulseBehavior::All,
        )
    }

    pub fn qualities(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
    ) -> Result<QualityValues, BamError> {
        self.fetch_qualities(
            RecordTag::Qual,
            orientation,
            aligned,
            excise_soft_clips,
            PulseBehavior::All,
        )
    }

    pub fn set_sequence_and_qualities(
        &mut self,
        sequence: &str,
        qualities: &str,
    ) -> Result<&mut Self, BamError> {
        self.raw.set_sequence_and_qualities(sequence, qualities)?;
        self.reset_cached_positions();
        *self.p2b_cache.borrow_mut() = None;
        Ok(self)
    }

    // ---- per-base QVs and tags ----

    pub fn has_deletion_qv(&self) -> bool {
        self.raw.has_tag(RecordTag::DeletionQv.label())
    }

    pub fn deletion_qv(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
    ) -> Result<QualityValues, BamError> {
        self.fetch_qualities(
            RecordTag::DeletionQv,
            orientation,
            aligned,
            excise_soft_clips,
            PulseBehavior::All,
        )
    }

    pub fn set_deletion_qv(&mut self, qvs: &QualityValues) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::DeletionQv, &Tag::from(qvs.to_fastq()))?;
        Ok(self)
    }

    pub fn has_insertion_qv(&self) -> bool {
        self.raw.has_tag(RecordTag::InsertionQv.label())
    }

    pub fn insertion_qv(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
    ) -> Result<QualityValues, BamError> {
        self.fetch_qualities(
            RecordTag::InsertionQv,
            orientation,
            aligned,
            excise_soft_clips,
            PulseBehavior::All,
        )
    }

    pub fn set_insertion_qv(&mut self, qvs: &QualityValues) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::InsertionQv, &Tag::from(qvs.to_fastq()))?;
        Ok(self)
    }

    pub fn has_merge_qv(&self) -> bool {
        self.raw.has_tag(RecordTag::MergeQv.label())
    }

    pub fn merge_qv(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
    ) -> Result<QualityValues, BamError> {
        self.fetch_qualities(
            RecordTag::MergeQv,
            orientation,
            aligned,
            excise_soft_clips,
            PulseBehavior::All,
        )
    }

    pub fn set_merge_qv(&mut self, qvs: &QualityValues) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::MergeQv, &Tag::from(qvs.to_fastq()))?;
        Ok(self)
    }

    pub fn has_substitution_qv(&self) -> bool {
        self.raw.has_tag(RecordTag::SubstitutionQv.label())
    }

    pub fn substitution_qv(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
    ) -> Result<QualityValues, BamError> {
        self.fetch_qualities(
            RecordTag::SubstitutionQv,
            orientation,
            aligned,
            excise_soft_clips,
            PulseBehavior::All,
        )
    }

    pub fn set_substitution_qv(&mut self, qvs: &QualityValues) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::SubstitutionQv, &Tag::from(qvs.to_fastq()))?;
        Ok(self)
    }

    pub fn has_deletion_tag(&self) -> bool {
        self.raw.has_tag(RecordTag::DeletionTag.label())
    }

    pub fn deletion_tag(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
    ) -> Result<String, BamError> {
        self.fetch_bases(
            RecordTag::DeletionTag,
            orientation,
            aligned,
            excise_soft_clips,
            PulseBehavior::All,
        )
    }

    pub fn set_deletion_tag(&mut self, tags: &str) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::DeletionTag, &Tag::from(tags))?;
        Ok(self)
    }

    pub fn has_substitution_tag(&self) -> bool {
        self.raw.has_tag(RecordTag::SubstitutionTag.label())
    }

    pub fn substitution_tag(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
    ) -> Result<String, BamError> {
        self.fetch_bases(
            RecordTag::SubstitutionTag,
            orientation,
            aligned,
            excise_soft_clips,
            PulseBehavior::All,
        )
    }

    pub fn set_substitution_tag(&mut self, tags: &str) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::SubstitutionTag, &Tag::from(tags))?;
        Ok(self)
    }

    // ---- frame data ----

    pub fn has_ipd(&self) -> bool {
        self.raw.has_tag(RecordTag::Ipd.label())
    }

    pub fn ipd(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
    ) -> Result<Frames, BamError> {
        self.fetch_frames(
            RecordTag::Ipd,
            orientation,
            aligned,
            excise_soft_clips,
            PulseBehavior::All,
        )
    }

    pub fn set_ipd(&mut self, frames: &Frames, encoding: FrameEncoding) -> Result<&mut Self, BamError> {
        let tag = match encoding {
            FrameEncoding::Lossy => Tag::from(frames.encode()),
            FrameEncoding::Raw => Tag::from(frames.data().to_vec()),
        };
        self.create_or_edit(RecordTag::Ipd, &tag)?;
        Ok(self)
    }

    /// IPD codes as stored, without lossy expansion.
    pub fn ipd_raw(&self, orientation: Orientation) -> Result<Frames, BamError> {
        self.stored_frames(RecordTag::Ipd, orientation)
    }

    pub fn has_pulse_width(&self) -> bool {
        self.raw.has_tag(RecordTag::PulseWidth.label())
    }

    pub fn pulse_width(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
    ) -> Result<Frames, BamError> {
        self.fetch_frames(
            RecordTag::PulseWidth,
            orientation,
            aligned,
            excise_soft_clips,
            PulseBehavior::All,
        )
    }

    pub fn set_pulse_width(
        &mut self,
        frames: &Frames,
        encoding: FrameEncoding,
    ) -> Result<&mut Self, BamError> {
        let tag = match encoding {
            FrameEncoding::Lossy => Tag::from(frames.encode()),
            FrameEncoding::Raw => Tag::from(frames.data().to_vec()),
        };
        self.create_or_edit(RecordTag::PulseWidth, &tag)?;
        Ok(self)
    }

    /// Pulse-width codes as stored, without lossy expansion.
    pub fn pulse_width_raw(&self, orientation: Orientation) -> Result<Frames, BamError> {
        self.stored_frames(RecordTag::PulseWidth, orientation)
    }

    fn stored_frames(&self, tag: RecordTag, orientation: Orientation) -> Result<Frames, BamError> {
        let mut data = match self.raw.tag_value(tag.label()) {
            None => Vec::new(),
            Some(value) => {
                if value.is_uint8_array() {
                    value.to_u8_array()?.iter().map(|c| u16::from(*c)).collect()
                } else {
                    value.to_u16_array()?.to_vec()
                }
            }
        };
        orient_data(
            &mut data,
            Orientation::Native,
            orientation,
            self.raw.is_reverse_strand(),
        );
        Ok(Frames::from(data))
    }

    // ---- per-pulse data ----

    pub fn has_pulse_call(&self) -> bool {
        self.raw.has_tag(RecordTag::PulseCall.label())
    }

    pub fn pulse_call(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<String, BamError> {
        self.fetch_bases(
            RecordTag::PulseCall,
            orientation,
            aligned,
            excise_soft_clips,
            pulse_behavior,
        )
    }

    pub fn set_pulse_call(&mut self, calls: &str) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::PulseCall, &Tag::from(calls))?;
        Ok(self)
    }

    pub fn has_alt_label_tag(&self) -> bool {
        self.raw.has_tag(RecordTag::AltLabelTag.label())
    }

    pub fn alt_label_tag(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<String, BamError> {
        self.fetch_bases(
            RecordTag::AltLabelTag,
            orientation,
            aligned,
            excise_soft_clips,
            pulse_behavior,
        )
    }

    pub fn set_alt_label_tag(&mut self, tags: &str) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::AltLabelTag, &Tag::from(tags))?;
        Ok(self)
    }

    pub fn has_label_qv(&self) -> bool {
        self.raw.has_tag(RecordTag::LabelQv.label())
    }

    pub fn label_qv(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<QualityValues, BamError> {
        self.fetch_qualities(
            RecordTag::LabelQv,
            orientation,
            aligned,
            excise_soft_clips,
            pulse_behavior,
        )
    }

    pub fn set_label_qv(&mut self, qvs: &QualityValues) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::LabelQv, &Tag::from(qvs.to_fastq()))?;
        Ok(self)
    }

    pub fn has_alt_label_qv(&self) -> bool {
        self.raw.has_tag(RecordTag::AltLabelQv.label())
    }

    pub fn alt_label_qv(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<QualityValues, BamError> {
        self.fetch_qualities(
            RecordTag::AltLabelQv,
            orientation,
            aligned,
            excise_soft_clips,
            pulse_behavior,
        )
    }

    pub fn set_alt_label_qv(&mut self, qvs: &QualityValues) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::AltLabelQv, &Tag::from(qvs.to_fastq()))?;
        Ok(self)
    }

    pub fn has_pulse_merge_qv(&self) -> bool {
        self.raw.has_tag(RecordTag::PulseMergeQv.label())
    }

    pub fn pulse_merge_qv(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<QualityValues, BamError> {
        self.fetch_qualities(
            RecordTag::PulseMergeQv,
            orientation,
            aligned,
            excise_soft_clips,
            pulse_behavior,
        )
    }

    pub fn set_pulse_merge_qv(&mut self, qvs: &QualityValues) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::PulseMergeQv, &Tag::from(qvs.to_fastq()))?;
        Ok(self)
    }

    pub fn has_pkmean(&self) -> bool {
        self.raw.has_tag(RecordTag::Pkmean.label())
    }

    pub fn pkmean(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<Vec<f32>, BamError> {
        self.fetch_photons(
            RecordTag::Pkmean,
            orientation,
            aligned,
            excise_soft_clips,
            pulse_behavior,
        )
    }

    pub fn set_pkmean(&mut self, photons: &[f32]) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::Pkmean, &Tag::from(Self::encode_photons(photons)))?;
        Ok(self)
    }

    pub fn has_pkmid(&self) -> bool {
        self.raw.has_tag(RecordTag::Pkmid.label())
    }

    pub fn pkmid(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<Vec<f32>, BamError> {
        self.fetch_photons(
            RecordTag::Pkmid,
            orientation,
            aligned,
            excise_soft_clips,
            pulse_behavior,
        )
    }

    pub fn set_pkmid(&mut self, photons: &[f32]) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::Pkmid, &Tag::from(Self::encode_photons(photons)))?;
        Ok(self)
    }

    pub fn has_pkmean2(&self) -> bool {
        self.raw.has_tag(RecordTag::Pkmean2.label())
    }

    pub fn pkmean2(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<Vec<f32>, BamError> {
        self.fetch_photons(
            RecordTag::Pkmean2,
            orientation,
            aligned,
            excise_soft_clips,
            pulse_behavior,
        )
    }

    pub fn set_pkmean2(&mut self, photons: &[f32]) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::Pkmean2, &Tag::from(Self::encode_photons(photons)))?;
        Ok(self)
    }

    pub fn has_pkmid2(&self) -> bool {
        self.raw.has_tag(RecordTag::Pkmid2.label())
    }

    pub fn pkmid2(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<Vec<f32>, BamError> {
        self.fetch_photons(
            RecordTag::Pkmid2,
            orientation,
            aligned,
            excise_soft_clips,
            pulse_behavior,
        )
    }

    pub fn set_pkmid2(&mut self, photons: &[f32]) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::Pkmid2, &Tag::from(Self::encode_photons(photons)))?;
        Ok(self)
    }

    pub fn has_pre_pulse_frames(&self) -> bool {
        self.raw.has_tag(RecordTag::PrePulseFrames.label())
    }

    pub fn pre_pulse_frames(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<Frames, BamError> {
        self.fetch_frames(
            RecordTag::PrePulseFrames,
            orientation,
            aligned,
            excise_soft_clips,
            pulse_behavior,
        )
    }

    pub fn set_pre_pulse_frames(
        &mut self,
        frames: &Frames,
        encoding: FrameEncoding,
    ) -> Result<&mut Self, BamError> {
        let tag = match encoding {
            FrameEncoding::Lossy => Tag::from(frames.encode()),
            FrameEncoding::Raw => Tag::from(frames.data().to_vec()),
        };
        self.create_or_edit(RecordTag::PrePulseFrames, &tag)?;
        Ok(self)
    }

    pub fn has_pulse_call_width(&self) -> bool {
        self.raw.has_tag(RecordTag::PulseCallWidth.label())
    }

    pub fn pulse_call_width(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<Frames, BamError> {
        self.fetch_frames(
            RecordTag::PulseCallWidth,
            orientation,
            aligned,
            excise_soft_clips,
            pulse_behavior,
        )
    }

    pub fn set_pulse_call_width(
        &mut self,
        frames: &Frames,
        encoding: FrameEncoding,
    ) -> Result<&mut Self, BamError> {
        let tag = match encoding {
            FrameEncoding::Lossy => Tag::from(frames.encode()),
            FrameEncoding::Raw => Tag::from(frames.data().to_vec()),
        };
        self.create_or_edit(RecordTag::PulseCallWidth, &tag)?;
        Ok(self)
    }

    pub fn has_start_frame(&self) -> bool {
        self.raw.has_tag(RecordTag::StartFrame.label())
    }

    pub fn start_frame(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<Vec<u32>, BamError> {
        self.fetch_u32s(
            RecordTag::StartFrame,
            orientation,
            aligned,
            excise_soft_clips,
            pulse_behavior,
        )
    }

    pub fn set_start_frame(&mut self, start_frame: &[u32]) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::StartFrame, &Tag::from(start_frame.to_vec()))?;
        Ok(self)
    }

    pub fn has_pulse_exclusion(&self) -> bool {
        self.raw.has_tag(RecordTag::PulseExclusion.label())
    }

    pub fn pulse_exclusion(
        &self,
        orientation: Orientation,
        aligned: bool,
        excise_soft_clips: bool,
        pulse_behavior: PulseBehavior,
    ) -> Result<Vec<u8>, BamError> {
        self.fetch_u8s(
            RecordTag::PulseExclusion,
            orientation,
            aligned,
            excise_soft_clips,
            pulse_behavior,
        )
    }

    pub fn set_pulse_exclusion(&mut self, reasons: &[u8]) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::PulseExclusion, &Tag::from(reasons.to_vec()))?;
        Ok(self)
    }

    // ---- scalar tags ----

    pub fn has_num_passes(&self) -> bool {
        self.raw.has_tag(RecordTag::NumPasses.label())
    }

    pub fn num_passes(&self) -> Result<i32, BamError> {
        self.raw
            .tag_value(RecordTag::NumPasses.label())
            .ok_or_else(|| BamError::NotFound("record carries no np tag".to_string()))?
            .to_i32()
    }

    pub fn set_num_passes(&mut self, num_passes: i32) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::NumPasses, &Tag::from(num_passes))?;
        Ok(self)
    }

    pub fn has_read_accuracy(&self) -> bool {
        self.raw.has_tag(RecordTag::ReadAccuracy.label())
    }

    pub fn read_accuracy(&self) -> Result<f32, BamError> {
        self.raw
            .tag_value(RecordTag::ReadAccuracy.label())
            .ok_or_else(|| BamError::NotFound("record carries no rq tag".to_string()))?
            .to_float()
    }

    pub fn set_read_accuracy(&mut self, accuracy: f32) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::ReadAccuracy, &Tag::from(accuracy))?;
        Ok(self)
    }

    pub fn has_signal_to_noise(&self) -> bool {
        self.raw.has_tag(RecordTag::SignalToNoise.label())
    }

    pub fn signal_to_noise(&self) -> Result<Vec<f32>, BamError> {
        Ok(self
            .raw
            .tag_value(RecordTag::SignalToNoise.label())
            .ok_or_else(|| BamError::NotFound("record carries no sn tag".to_string()))?
            .to_float_array()?
            .to_vec())
    }

    pub fn set_signal_to_noise(&mut self, snr: &[f32]) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::SignalToNoise, &Tag::from(snr.to_vec()))?;
        Ok(self)
    }

    pub fn has_local_context_flags(&self) -> bool {
        self.raw.has_tag(RecordTag::ContextFlags.label())
    }

    pub fn local_context_flags(&self) -> Result<LocalContextFlags, BamError> {
        let value = self
            .raw
            .tag_value(RecordTag::ContextFlags.label())
            .ok_or_else(|| BamError::NotFound("record carries no cx tag".to_string()))?
            .to_u8()?;
        Ok(LocalContextFlags::from_bits_truncate(value))
    }

    pub fn set_local_context_flags(
        &mut self,
        flags: LocalContextFlags,
    ) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::ContextFlags, &Tag::from(flags.bits()))?;
        Ok(self)
    }

    pub fn has_barcodes(&self) -> bool {
        self.raw.has_tag(RecordTag::Barcodes.label())
    }

    /// Forward/reverse barcode ids from the `bc` tag.
    ///
    /// Stored on the wire as a uint16 array of exactly two entries.
    pub fn barcodes(&self) -> Result<(i16, i16), BamError> {
        let tag = self
            .raw
            .tag_value(RecordTag::Barcodes.label())
            .ok_or_else(|| BamError::NotFound("record carries no bc tag".to_string()))?;
        let values = tag.to_u16_array().map_err(|_| {
            BamError::InvalidValue("bc tag should be a uint16 array of size 2".to_string())
        })?;
        if values.len() != 2 {
            return Err(BamError::InvalidValue(
                "bc tag should be a uint16 array of size 2".to_string(),
            ));
        }
        Ok((values[0] as i16, values[1] as i16))
    }

    pub fn set_barcodes(&mut self, barcodes: (i16, i16)) -> Result<&mut Self, BamError> {
        let data = vec![barcodes.0 as u16, barcodes.1 as u16];
        self.create_or_edit(RecordTag::Barcodes, &Tag::from(data))?;
        Ok(self)
    }

    pub fn has_barcode_quality(&self) -> bool {
        self.raw.has_tag(RecordTag::BarcodeQuality.label())
    }

    pub fn barcode_quality(&self) -> Result<u8, BamError> {
        match self.raw.tag_value(RecordTag::BarcodeQuality.label()) {
            Some(tag) => tag.to_u8(),
            None => Ok(0),
        }
    }

    pub fn set_barcode_quality(&mut self, quality: u8) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::BarcodeQuality, &Tag::from(quality))?;
        Ok(self)
    }

    pub fn has_scrap_region_type(&self) -> bool {
        self.raw.has_tag(RecordTag::ScrapRegionType.label())
    }

    pub fn scrap_region_type(&self) -> Result<char, BamError> {
        let value = self
            .raw
            .tag_value(RecordTag::ScrapRegionType.label())
            .ok_or_else(|| BamError::NotFound("record carries no sc tag".to_string()))?
            .to_u8()?;
        Ok(value as char)
    }

    pub fn set_scrap_region_type(&mut self, region_type: char) -> Result<&mut Self, BamError> {
        self.create_or_edit(
            RecordTag::ScrapRegionType,
            &Tag::ascii(region_type as u8)?,
        )?;
        Ok(self)
    }

    pub fn has_scrap_zmw_type(&self) -> bool {
        self.raw.has_tag(RecordTag::ScrapZmwType.label())
    }

    pub fn scrap_zmw_type(&self) -> Result<char, BamError> {
        let value = self
            .raw
            .tag_value(RecordTag::ScrapZmwType.label())
            .ok_or_else(|| BamError::NotFound("record carries no sz tag".to_string()))?
            .to_u8()?;
        Ok(value as char)
    }

    pub fn set_scrap_zmw_type(&mut self, zmw_type: char) -> Result<&mut Self, BamError> {
        self.create_or_edit(RecordTag::ScrapZmwType, &Tag::ascii(zmw_type as u8)?)?;
        Ok(self)
    }

    // ---- clipping ----

    /// Clips the record in place.
    pub fn clip(
        &mut self,
        clip_type: ClipType,
        start: Position,
        end: Position,
        excise_flanking_inserts: bool,
    ) -> Result<&mut Self, BamError> {
        match clip_type {
            ClipType::None => Ok(self),
            ClipType::ClipToQuery => {
                clip::clip_to_query(self, start, end)?;
                Ok(self)
            }
            ClipType::ClipToReference => {
                clip::clip_to_reference(self, start, end, excise_flanking_inserts)?;
                Ok(self)
            }
        }
    }

    /// Returns a clipped copy, leaving this record untouched.
    pub fn clipped(
        &self,
        clip_type: ClipType,
        start: Position,
        end: Position,
        excise_flanking_inserts: bool,
    ) -> Result<BamRecord, BamError> {
        let mut result = self.clone();
        result.clip(clip_type, start, end, excise_flanking_inserts)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_record(seq: &str, reverse: bool) -> BamRecord {
        let mut record = BamRecord::new();
        {
            let raw = record.raw_mut();
            raw.set_name("m/1/0_4").unwrap();
            raw.set_sequence_and_qualities(seq, "").unwrap();
            raw.set_mapped(true);
            raw.set_position(100);
            raw.set_reference_id(0);
            raw.set_reverse_strand(reverse);
            raw.set_cigar(&format!("{}=", seq.len()).parse().unwrap());
        }
        record
    }

    #[test]
    fn test_orientation_walk() {
        // stored SEQ is genomic; native request on a reverse-strand record
        // reverse-complements, and converts back losslessly
        let record = plain_record("ACGT", true);
        let genomic = record.sequence(Orientation::Genomic, false, false).unwrap();
        assert_eq!(genomic, "ACGT");
        let native = record.sequence(Orientation::Native, false, false).unwrap();
        assert_eq!(native, "ACGT");

        let record = plain_record("AACG", true);
        assert_eq!(
            record.sequence(Orientation::Genomic, false, false).unwrap(),
            "AACG"
        );
        assert_eq!(
            record.sequence(Orientation::Native, false, false).unwrap(),
            "CGTT"
        );
    }

    #[test]
    fn test_aligned_gap_fill() {
        let mut record = plain_record("ACGTAC", false);
        record.raw_mut().set_cigar(&"3=2D3=".parse().unwrap());
        let aligned = record.sequence(Orientation::Genomic, true, false).unwrap();
        assert_eq!(aligned, "ACG--TAC");

        // quality gaps fill with zero
        record
            .raw_mut()
            .set_sequence_and_qualities("ACGTAC", "IIIIII")
            .unwrap();
        record.raw_mut().set_cigar(&"3=2D3=".parse().unwrap());
        let quals = record.qualities(Orientation::Genomic, true, false).unwrap();
        assert_eq!(*quals, vec![40, 40, 40, 0, 0, 40, 40, 40]);
    }

    #[test]
    fn test_soft_clip_excision() {
        let mut record = plain_record("AACGTT", false);
        record.raw_mut().set_cigar(&"2S2=2S".parse().unwrap());
        assert_eq!(
            record.sequence(Orientation::Genomic, false, true).unwrap(),
            "CG"
        );
        assert_eq!(
            record.sequence(Orientation::Genomic, true, true).unwrap(),
            "CG"
        );
        assert_eq!(
            record.sequence(Orientation::Genomic, true, false).unwrap(),
            "AACGTT"
        );
    }

    #[test]
    fn test_pulse_projection() {
        let mut record = BamRecord::new();
        record
            .raw_mut()
            .set_sequence_and_qualities("AG", "")
            .unwrap();
        record.set_pulse_call("AccG").unwrap();
        record.set_pkmid(&[1.0, 2.0, 3.0, 4.0]).unwrap();

        let all = record
            .pkmid(Orientation::Native, false, false, PulseBehavior::All)
            .unwrap();
        assert_eq!(all, vec![1.0, 2.0, 3.0, 4.0]);

        let basecalls = record
            .pkmid(Orientation::Native, false, false, PulseBehavior::BasecallsOnly)
            .unwrap();
        assert_eq!(basecalls, vec![1.0, 4.0]);
    }

    #[test]
    fn test_incompatible_pulse_request() {
        let mut record = plain_record("AG", false);
        record.raw_mut().set_cigar(&"2=".parse().unwrap());
        record.set_pulse_call("AccG").unwrap();

        let err = record
            .pulse_call(Orientation::Genomic, true, false, PulseBehavior::All)
            .unwrap_err();
        assert!(matches!(err, BamError::IncompatibleRequest(_)));

        assert!(record
            .pulse_call(Orientation::Genomic, true, false, PulseBehavior::BasecallsOnly)
            .is_ok());
    }

    #[test]
    fn test_photon_scaling() {
        let mut record = BamRecord::new();
        record.set_pkmean(&[1.25, 3.59]).unwrap();
        // stored as u16 tenths, truncated
        let stored = record
            .raw()
            .tag_value("pa")
            .unwrap()
            .to_u16_array()
            .unwrap()
            .to_vec();
        assert_eq!(stored, vec![12, 35]);
        let read = record
            .pkmean(Orientation::Native, false, false, PulseBehavior::All)
            .unwrap();
        assert_eq!(read, vec![1.2, 3.5]);
    }

    #[test]
    fn test_hole_number_fallbacks() {
        let mut record = BamRecord::new();
        record.raw_mut().set_name("movie1/54130/0_10").unwrap();
        assert_eq!(record.hole_number().unwrap(), 54130);

        record.set_hole_number(42).unwrap();
        assert_eq!(record.hole_number().unwrap(), 42);

        let mut transcript = BamRecord::new();
        transcript.raw_mut().set_name("transcript/1234").unwrap();
        assert_eq!(transcript.hole_number().unwrap(), 1234);
    }

    #[test]
    fn test_query_interval_from_name() {
        let mut record = BamRecord::new();
        record.raw_mut().set_name("movie1/8/100_250").unwrap();
        assert_eq!(record.query_start().unwrap(), 100);
        assert_eq!(record.query_end().unwrap(), 250);
    }

    #[test]
    fn test_aligned_positions() {
        let mut record = BamRecord::new();
        {
            let raw = record.raw_mut();
            raw.set_name("m/1/10_20").unwrap();
            raw.set_sequence_and_qualities("AAACCCGGGT", "").unwrap();
            raw.set_mapped(true);
            raw.set_position(500);
            raw.set_cigar(&"2S6=2S".parse().unwrap());
        }
        record.raw_mut().add_tag("qs", &Tag::from(10i32)).unwrap();
        record.raw_mut().add_tag("qe", &Tag::from(20i32)).unwrap();

        assert_eq!(record.aligned_start(), 12);
        assert_eq!(record.aligned_end(), 18);
        assert_eq!(record.reference_end(), 506);
    }

    #[test]
    fn test_local_context_flags() {
        let mut record = BamRecord::new();
        record
            .set_local_context_flags(LocalContextFlags::ADAPTER_BEFORE | LocalContextFlags::ADAPTER_AFTER)
            .unwrap();
        let flags = record.local_context_flags().unwrap();
        assert!(flags.contains(LocalContextFlags::ADAPTER_BEFORE));
        assert!(!flags.contains(LocalContextFlags::BARCODE_BEFORE));
    }

    #[test]
    fn test_barcodes() {
        let mut record = BamRecord::new();
        record.set_barcodes((3, 7)).unwrap();
        assert_eq!(record.barcodes().unwrap(), (3, 7));

        record
            .raw_mut()
            .edit_tag("bc", &Tag::from(vec![1u16, 2, 3]))
            .unwrap();
        assert!(record.barcodes().is_err());
    }

    #[test]
    fn test_update_name() {
        let mut record = BamRecord::new();
        record.raw_mut().set_name("old/0/0_0").unwrap();
        record.set_hole_number(8).unwrap();
        record.set_query_start(0).unwrap();
        record.set_query_end(10).unwrap();
        // no read group: movie comes from the name prefix
        assert_eq!(record.full_name(), "old/8/0_10");
    }
}

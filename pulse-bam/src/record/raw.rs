//! The fixed record header plus its single variable-length data block.
//!
//! Block layout: `name\0 (padded to 4) | cigar words | packed seq | qual |
//! tag block`. Section edits shift the trailing bytes in place; the buffer
//! grows to the next power of two.

use std::cell::RefCell;

use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};
use fxhash::FxHashMap;
use nom::number::complete::{le_i32, le_u16, le_u32, le_u8};
use nom::IResult;

use pulse_common::{Cigar, Position, QualityValues, UNMAPPED_POSITION};

use crate::codec;
use crate::tag::{Tag, TagCollection};
use crate::BamError;

/// `reg2bin(-1, 0)`, the bin of any unplaced record.
pub const UNMAPPED_BIN: u16 = 4680;

/// Sentinel quality byte: a block of these means "qualities not stored".
pub const MISSING_QUALITY: u8 = 0xFF;

const SEQ_LOOKUP: &[u8; 16] = b"=ACMGRSVTWYHKDBN";

fn nt16(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'=' => 0,
        b'A' => 1,
        b'C' => 2,
        b'M' => 3,
        b'G' => 4,
        b'R' => 5,
        b'S' => 6,
        b'V' => 7,
        b'T' | b'U' => 8,
        b'W' => 9,
        b'Y' => 10,
        b'H' => 11,
        b'K' => 12,
        b'D' => 13,
        b'B' => 14,
        _ => 15,
    }
}

/// UCSC binning for [beg, end), min_shift 14, 5 levels.
pub fn reg2bin(beg: i32, end: i32) -> u16 {
    let end = end - 1;
    if beg >> 14 == end >> 14 {
        return (((1 << 15) - 1) / 7 + (beg >> 14)) as u16;
    }
    if beg >> 17 == end >> 17 {
        return (((1 << 12) - 1) / 7 + (beg >> 17)) as u16;
    }
    if beg >> 20 == end >> 20 {
        return (((1 << 9) - 1) / 7 + (beg >> 20)) as u16;
    }
    if beg >> 23 == end >> 23 {
        return (((1 << 6) - 1) / 7 + (beg >> 23)) as u16;
    }
    if beg >> 26 == end >> 26 {
        return (((1 << 3) - 1) / 7 + (beg >> 26)) as u16;
    }
    0
}

bitflags! {
    /// The standard SAM flag word.
    ///
    /// See SAM v1 section 1.4
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RecordFlags: u16 {
        const PAIRED              = 0x0001;
        const PROPER_PAIR         = 0x0002;
        const UNMAPPED            = 0x0004;
        const MATE_UNMAPPED       = 0x0008;
        const REVERSE_STRAND      = 0x0010;
        const MATE_REVERSE_STRAND = 0x0020;
        const MATE_1              = 0x0040;
        const MATE_2              = 0x0080;
        const SECONDARY           = 0x0100;
        const FAILED_QC           = 0x0200;
        const DUPLICATE           = 0x0400;
        const SUPPLEMENTARY       = 0x0800;
    }
}

#[derive(Clone, Debug)]
pub struct RawRecord {
    ref_id: i32,
    pos: Position,
    bin: u16,
    map_quality: u8,
    flags: RecordFlags,
    mate_ref_id: i32,
    mate_pos: Position,
    insert_size: i32,
    l_qname: usize,
    n_cigar: u32,
    seq_len: usize,
    data: Vec<u8>,
    // name-code -> type-char offset into the tag block, built on demand
    tag_offsets: RefCell<Option<FxHashMap<u16, usize>>>,
}

impl Default for RawRecord {
    fn default() -> RawRecord {
        RawRecord::new()
    }
}

impl PartialEq for RawRecord {
    fn eq(&self, other: &RawRecord) -> bool {
        self.ref_id == other.ref_id
            && self.pos == other.pos
            && self.bin == other.bin
            && self.map_quality == other.map_quality
            && self.flags == other.flags
            && self.mate_ref_id == other.mate_ref_id
            && self.mate_pos == other.mate_pos
            && self.insert_size == other.insert_size
            && self.l_qname == other.l_qname
            && self.n_cigar == other.n_cigar
            && self.seq_len == other.seq_len
            && self.data == other.data
    }
}

impl RawRecord {
    pub fn new() -> RawRecord {
        RawRecord {
            ref_id: -1,
            pos: UNMAPPED_POSITION,
            bin: UNMAPPED_BIN,
            map_quality: 255,
            flags: RecordFlags::UNMAPPED,
            mate_ref_id: -1,
            mate_pos: UNMAPPED_POSITION,
            insert_size: 0,
            l_qname: 4,
            n_cigar: 0,
            seq_len: 0,
            data: vec![0u8; 4],
            tag_offsets: RefCell::new(None),
        }
    }

    fn cigar_offset(&self) -> usize {
        self.l_qname
    }

    fn seq_offset(&self) -> usize {
        self.l_qname + 4 * self.n_cigar as usize
    }

    fn qual_offset(&self) -> usize {
        self.seq_offset() + (self.seq_len + 1) / 2
    }

    fn tag_block_offset(&self) -> usize {
        self.qual_offset() + self.seq_len
    }

    fn invalidate_tag_map(&self) {
        *self.tag_offsets.borrow_mut() = None;
    }

    fn reserve_pow2(&mut self, needed: usize) {
        if needed > self.data.capacity() {
            let target = needed.next_power_of_two().max(32);
            self.data.reserve_exact(target - self.data.len());
        }
    }

    /// Resizes the section `[start, start + old_len)` to `new_len` bytes,
    /// shifting everything after it. Contents of the resized section are
    /// unspecified afterwards.
    fn resize_section(&mut self, start: usize, old_len: usize, new_len: usize) {
        let old_total = self.data.len();
        let tail_start = start + old_len;
        let tail_len = old_total - tail_start;
        let new_total = old_total - old_len + new_len;
        if new_len > old_len {
            self.reserve_pow2(new_total);
            self.data.resize(new_total, 0);
            // trailing data moves right-to-left from the far end
            self.data
                .copy_within(tail_start..tail_start + tail_len, start + new_len);
        } else if new_len < old_len {
            // trailing data moves left-to-right before truncation
            self.data
                .copy_within(tail_start..tail_start + tail_len, start + new_len);
            self.data.truncate(new_total);
        }
        self.invalidate_tag_map();
    }

    pub fn reference_id(&self) -> i32 {
        self.ref_id
    }

    pub fn set_reference_id(&mut self, id: i32) -> &mut Self {
        self.ref_id = id;
        self
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn set_position(&mut self, pos: Position) -> &mut Self {
        self.pos = pos;
        self.update_bin();
        self
    }

    pub fn bin(&self) -> u16 {
        self.bin
    }

    pub fn map_quality(&self) -> u8 {
        self.map_quality
    }

    pub fn set_map_quality(&mut self, quality: u8) -> &mut Self {
        self.map_quality = quality;
        self
    }

    pub fn flags(&self) -> RecordFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: RecordFlags) -> &mut Self {
        self.flags = flags;
        self
    }

    pub fn mate_reference_id(&self) -> i32 {
        self.mate_ref_id
    }

    pub fn set_mate_reference_id(&mut self, id: i32) -> &mut Self {
        self.mate_ref_id = id;
        self
    }

    pub fn mate_position(&self) -> Position {
        self.mate_pos
    }

    pub fn set_mate_position(&mut self, pos: Position) -> &mut Self {
        self.mate_pos = pos;
        self
    }

    pub fn insert_size(&self) -> i32 {
        self.insert_size
    }

    pub fn set_insert_size(&mut self, size: i32) -> &mut Self {
        self.insert_size = size;
        self
    }

    pub fn is_mapped(&self) -> bool {
        !self.flags.contains(RecordFlags::UNMAPPED)
    }

    pub fn set_mapped(&mut self, mapped: bool) -> &mut Self {
        self.flags.set(RecordFlags::UNMAPPED, !mapped);
        self.update_bin();
        self
    }

    pub fn is_reverse_strand(&self) -> bool {
        self.flags.contains(RecordFlags::REVERSE_STRAND)
    }

    pub fn set_reverse_strand(&mut self, reverse: bool) -> &mut Self {
        self.flags.set(RecordFlags::REVERSE_STRAND, reverse);
        self
    }

    pub fn is_duplicate(&self) -> bool {
        self.flags.contains(RecordFlags::DUPLICATE)
    }

    pub fn is_failed_qc(&self) -> bool {
        self.flags.contains(RecordFlags::FAILED_QC)
    }

    pub fn is_secondary(&self) -> bool {
        self.flags.contains(RecordFlags::SECONDARY)
    }

    pub fn is_supplementary(&self) -> bool {
        self.flags.contains(RecordFlags::SUPPLEMENTARY)
    }

    pub fn name(&self) -> String {
        let end = self.data[..self.l_qname]
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(self.l_qname);
        String::from_utf8_lossy(&self.data[..end]).into_owned()
    }

    pub fn set_name(&mut self, name: &str) -> Result<&mut Self, BamError> {
        // NULL terminator, then pad to a 4-byte multiple
        let padded = (name.len() + 1 + 3) & !3;
        if padded > 255 {
            return Err(BamError::InvalidValue(format!(
                "record name too long ({} chars)",
                name.len()
            )));
        }
        self.resize_section(0, self.l_qname, padded);
        self.l_qname = padded;
        self.data[..name.len()].copy_from_slice(name.as_bytes());
        for b in &mut self.data[name.len()..padded] {
            *b = 0;
        }
        Ok(self)
    }

    pub fn cigar(&self) -> Cigar {
        let start = self.cigar_offset();
        let mut ops = Vec::with_capacity(self.n_cigar as usize);
        for i in 0..self.n_cigar as usize {
            let word = LittleEndian::read_u32(&self.data[start + 4 * i..start + 4 * i + 4]);
            // codes written by set_cigar/from_wire are always in range
            if let Ok(op) = pulse_common::CigarOp::from_word(word) {
                ops.push(op);
            }
        }
        Cigar::from_ops(ops)
    }

    pub fn set_cigar(&mut self, cigar: &Cigar) -> &mut Self {
        let old_len = 4 * self.n_cigar as usize;
        let new_len = 4 * cigar.len();
        let start = self.cigar_offset();
        self.resize_section(start, old_len, new_len);
        self.n_cigar = cigar.len() as u32;
        for (i, op) in cigar.iter().enumerate() {
            LittleEndian::write_u32(
                &mut self.data[start + 4 * i..start + 4 * i + 4],
                op.to_word(),
            );
        }
        self.update_bin();
        self
    }

    /// Recomputed whenever CIGAR or position changes.
    fn update_bin(&mut self) {
        if self.is_mapped() && self.pos >= 0 {
            let ref_len = self.cigar().reference_length() as i32;
            let end = if ref_len > 0 { self.pos + ref_len } else { self.pos + 1 };
            self.bin = reg2bin(self.pos, end);
        } else {
            self.bin = UNMAPPED_BIN;
        }
    }

    pub fn sequence_length(&self) -> usize {
        self.seq_len
    }

    pub fn sequence(&self) -> String {
        let start = self.seq_offset();
        let mut out = String::with_capacity(self.seq_len);
        for i in 0..self.seq_len {
            let byte = self.data[start + (i >> 1)];
            let code = if i % 2 == 0 { byte >> 4 } else { byte & 0x0F };
            out.push(SEQ_LOOKUP[code as usize] as char);
        }
        out
    }

    /// Replaces sequence and qualities together.
    ///
    /// `qualities` is FASTQ text; empty means "not stored" and writes the
    /// 0xFF sentinel block. Mismatched lengths fail without mutation.
    pub fn set_sequence_and_qualities(
        &mut self,
        sequence: &str,
        qualities: &str,
    ) -> Result<&mut Self, BamError> {
        if !qualities.is_empty() && qualities.len() != sequence.len() {
            return Err(BamError::InvariantViolated(format!(
                "sequence/quality length mismatch ({} vs {})",
                sequence.len(),
                qualities.len()
            )));
        }
        if qualities.bytes().any(|b| !(33..=126).contains(&b)) {
            return Err(BamError::InvalidValue(
                "quality string contains non-printable characters".to_string(),
            ));
        }

        let old_len = (self.seq_len + 1) / 2 + self.seq_len;
        let new_seq_len = sequence.len();
        let new_len = (new_seq_len + 1) / 2 + new_seq_len;
        let start = self.seq_offset();
        self.resize_section(start, old_len, new_len);
        self.seq_len = new_seq_len;

        // pack two 4-bit codes per byte; odd tails leave the low nibble zero
        let encoded_len = (new_seq_len + 1) / 2;
        for b in &mut self.data[start..start + encoded_len] {
            *b = 0;
        }
        for (i, base) in sequence.bytes().enumerate() {
            self.data[start + (i >> 1)] |= nt16(base) << ((!i & 1) << 2);
        }

        let qual_start = self.qual_offset();
        if qualities.is_empty() {
            for b in &mut self.data[qual_start..qual_start + new_seq_len] {
                *b = MISSING_QUALITY;
            }
        } else {
            for (i, q) in qualities.bytes().enumerate() {
                self.data[qual_start + i] = q - 33;
            }
        }
        Ok(self)
    }

    pub fn qualities(&self) -> QualityValues {
        if self.seq_len == 0 {
            return QualityValues::new();
        }
        let start = self.qual_offset();
        if self.data[start] == MISSING_QUALITY {
            return QualityValues::new();
        }
        QualityValues::from(&self.data[start..start + self.seq_len])
    }

    fn tag_block(&self) -> &[u8] {
        &self.data[self.tag_block_offset()..]
    }

    fn build_tag_map(&self) -> FxHashMap<u16, usize> {
        let block = self.tag_block();
        let mut map = FxHashMap::default();
        let mut i = 0;
        while i + 2 < block.len() {
            let code = u16::from(block[i]) << 8 | u16::from(block[i + 1]);
            let type_pos = i + 2;
            match codec::payload_end(block, type_pos) {
                Ok(end) => {
                    map.insert(code, type_pos);
                    i = end;
                }
                Err(e) => {
                    log::debug!("stopping tag walk on malformed block: {e}");
                    break;
                }
            }
        }
        map
    }

    fn tag_offset(&self, name: &str) -> Option<usize> {
        if name.len() != 2 {
            return None;
        }
        let bytes = name.as_bytes();
        let code = u16::from(bytes[0]) << 8 | u16::from(bytes[1]);
        let mut cache = self.tag_offsets.borrow_mut();
        if cache.is_none() {
            *cache = Some(self.build_tag_map());
        }
        cache.as_ref().and_then(|map| map.get(&code).copied())
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tag_offset(name).is_some()
    }

    /// Fetches one tag; `None` when absent.
    pub fn tag_value(&self, name: &str) -> Option<Tag> {
        let offset = self.tag_offset(name)?;
        let start = self.tag_block_offset();
        codec::decode_tag_payload(&self.data[start + offset..]).ok()
    }

    /// Appends a tag; `Ok(false)` if one with this name already exists.
    pub fn add_tag(&mut self, name: &str, value: &Tag) -> Result<bool, BamError> {
        if name.len() != 2 {
            return Err(BamError::MalformedInput(format!(
                "malformed tag name '{name}'"
            )));
        }
        if self.has_tag(name) {
            return Ok(false);
        }
        let type_code = codec::type_code_for(value)?;
        let payload = codec::encode_tag_payload(value)?;
        self.reserve_pow2(self.data.len() + 3 + payload.len());
        self.data.extend_from_slice(name.as_bytes());
        self.data.push(type_code);
        self.data.extend_from_slice(&payload);
        self.invalidate_tag_map();
        Ok(true)
    }

    /// Removes a tag; `false` if absent.
    pub fn remove_tag(&mut self, name: &str) -> bool {
        let Some(offset) = self.tag_offset(name) else {
            return false;
        };
        let block_start = self.tag_block_offset();
        let Ok(end) = codec::payload_end(self.tag_block(), offset) else {
            return false;
        };
        let entry_start = block_start + offset - 2;
        let entry_len = (end - offset) + 2;
        self.resize_section(entry_start, entry_len, 0);
        true
    }

    /// Replaces an existing tag's value; `Ok(false)` if absent.
    pub fn edit_tag(&mut self, name: &str, value: &Tag) -> Result<bool, BamError> {
        if !self.remove_tag(name) {
            return Ok(false);
        }
        self.add_tag(name, value)
    }

    pub fn tags(&self) -> Result<TagCollection, BamError> {
        codec::decode_tags(self.tag_block())
    }

    /// Replaces the whole tag block.
    pub fn set_tags(&mut self, tags: &TagCollection) -> Result<&mut Self, BamError> {
        let encoded = codec::encode_tags(tags)?;
        let start = self.tag_block_offset();
        let old_len = self.data.len() - start;
        self.resize_section(start, old_len, encoded.len());
        self.data[start..].copy_from_slice(&encoded);
        Ok(self)
    }

    /// Serializes to the BAM on-disk record layout (without the leading
    /// `block_size` word).
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 + self.data.len());
        let mut w4 = [0u8; 4];
        let mut w2 = [0u8; 2];

        LittleEndian::write_i32(&mut w4, self.ref_id);
        buf.extend_from_slice(&w4);
        LittleEndian::write_i32(&mut w4, self.pos);
        buf.extend_from_slice(&w4);
        buf.push(self.l_qname as u8);
        buf.push(self.map_quality);
        LittleEndian::write_u16(&mut w2, self.bin);
        buf.extend_from_slice(&w2);
        LittleEndian::write_u16(&mut w2, self.n_cigar as u16);
        buf.extend_from_slice(&w2);
        LittleEndian::write_u16(&mut w2, self.flags.bits());
        buf.extend_from_slice(&w2);
        LittleEndian::write_u32(&mut w4, self.seq_len as u32);
        buf.extend_from_slice(&w4);
        LittleEndian::write_i32(&mut w4, self.mate_ref_id);
        buf.extend_from_slice(&w4);
        LittleEndian::write_i32(&mut w4, self.mate_pos);
        buf.extend_from_slice(&w4);
        LittleEndian::write_i32(&mut w4, self.insert_size);
        buf.extend_from_slice(&w4);
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Parses the BAM on-disk record layout.
    pub fn from_wire(bytes: &[u8]) -> Result<RawRecord, BamError> {
        fn fixed(input: &[u8]) -> IResult<&[u8], (i32, i32, u8, u8, u16, u16, u16, u32, i32, i32, i32)> {
            let (i, ref_id) = le_i32(input)?;
            let (i, pos) = le_i32(i)?;
            let (i, l_read_name) = le_u8(i)?;
            let (i, mapq) = le_u8(i)?;
            let (i, bin) = le_u16(i)?;
            let (i, n_cigar) = le_u16(i)?;
            let (i, flag) = le_u16(i)?;
            let (i, l_seq) = le_u32(i)?;
            let (i, next_ref_id) = le_i32(i)?;
            let (i, next_pos) = le_i32(i)?;
            let (i, tlen) = le_i32(i)?;
            Ok((i, (ref_id, pos, l_read_name, mapq, bin, n_cigar, flag, l_seq, next_ref_id, next_pos, tlen)))
        }

        let (data, (ref_id, pos, l_read_name, mapq, bin, n_cigar, flag, l_seq, next_ref_id, next_pos, tlen)) =
            fixed(bytes)
                .map_err(|_| BamError::MalformedInput("truncated record header".to_string()))?;

        let l_qname = l_read_name as usize;
        let seq_len = l_seq as usize;
        let expected_min = l_qname + 4 * n_cigar as usize + (seq_len + 1) / 2 + seq_len;
        if data.len() < expected_min {
            return Err(BamError::MalformedInput(
                "record data block shorter than its sections".to_string(),
            ));
        }

        let record = RawRecord {
            ref_id,
            pos,
            bin,
            map_quality: mapq,
            flags: RecordFlags::from_bits_truncate(flag),
            mate_ref_id: next_ref_id,
            mate_pos: next_pos,
            insert_size: tlen,
            l_qname,
            n_cigar: n_cigar as u32,
            seq_len,
            data: data.to_vec(),
            tag_offsets: RefCell::new(None),
        };

        // fail fast on an undecodable tag block
        record.tags()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let r = RawRecord::new();
        assert_eq!(r.reference_id(), -1);
        assert_eq!(r.position(), UNMAPPED_POSITION);
        assert_eq!(r.map_quality(), 255);
        assert_eq!(r.bin(), UNMAPPED_BIN);
        assert!(!r.is_mapped());
        assert_eq!(r.name(), "");
        assert_eq!(r.sequence(), "");
        assert!(r.qualities().is_empty());
    }

    #[test]
    fn test_reg2bin() {
        assert_eq!(reg2bin(-1, 0), 4680);
        assert_eq!(reg2bin(0, 1), 4681);
        assert_eq!(reg2bin(0, 1 << 14), 4681);
        assert_eq!(reg2bin(1 << 14, (1 << 14) + 1), 4682);
        assert_eq!(reg2bin(0, (1 << 14) + 1), 585);
    }

    #[test]
    fn test_name_padding() {
        let mut r = RawRecord::new();
        r.set_name("abc").unwrap();
        assert_eq!(r.name(), "abc");
        assert_eq!(r.l_qname, 4);

        r.set_name("abcd").unwrap();
        assert_eq!(r.name(), "abcd");
        assert_eq!(r.l_qname, 8);

        let too_long = "x".repeat(300);
        assert!(r.set_name(&too_long).is_err());
    }

    #[test]
    fn test_sequence_packing() {
        let mut r = RawRecord::new();
        r.set_sequence_and_qualities("ACGT", "!!II").unwrap();
        assert_eq!(r.sequence(), "ACGT");
        assert_eq!(*r.qualities(), vec![0, 0, 40, 40]);

        // odd length leaves a zero low nibble in the final byte
        r.set_sequence_and_qualities("ACGTN", "").unwrap();
        assert_eq!(r.sequence(), "ACGTN");
        assert!(r.qualities().is_empty());
    }

    #[test]
    fn test_seq_qual_mismatch_rejected() {
        let mut r = RawRecord::new();
        let err = r.set_sequence_and_qualities("ACGT", "!!").unwrap_err();
        assert!(matches!(err, BamError::InvariantViolated(_)));
        // nothing mutated
        assert_eq!(r.sequence(), "");
    }

    #[test]
    fn test_section_ordering_survives_edits() {
        let mut r = RawRecord::new();
        r.set_name("m/1/0_4").unwrap();
        r.set_sequence_and_qualities("ACGT", "IIII").unwrap();
        r.set_cigar(&"4=".parse().unwrap());
        let mut tags = TagCollection::new();
        tags.insert("zm".to_string(), Tag::from(1i32));
        r.set_tags(&tags).unwrap();

        // grow the name, everything else must survive the shift
        r.set_name("movie_with_long_name/1/0_4").unwrap();
        assert_eq!(r.sequence(), "ACGT");
        assert_eq!(r.cigar().to_string(), "4=");
        assert_eq!(r.tag_value("zm").unwrap().to_i32().unwrap(), 1);

        // shrink it again
        r.set_name("m").unwrap();
        assert_eq!(r.sequence(), "ACGT");
        assert_eq!(r.tag_value("zm").unwrap().to_i32().unwrap(), 1);
    }

    #[test]
    fn test_tag_add_edit_remove() {
        let mut r = RawRecord::new();
        assert!(r.add_tag("zm", &Tag::from(42i32)).unwrap());
        assert!(!r.add_tag("zm", &Tag::from(43i32)).unwrap());
        assert!(r.has_tag("zm"));
        assert_eq!(r.tag_value("zm").unwrap().to_i32().unwrap(), 42);

        assert!(r.edit_tag("zm", &Tag::from(54130i32)).unwrap());
        assert_eq!(r.tag_value("zm").unwrap().to_i32().unwrap(), 54130);

        assert!(r.add_tag("rq", &Tag::from(0.9f32)).unwrap());
        assert!(r.remove_tag("zm"));
        assert!(!r.has_tag("zm"));
        assert!(!r.remove_tag("zm"));
        assert_eq!(r.tag_value("rq").unwrap().to_float().unwrap(), 0.9);
    }

    #[test]
    fn test_bin_recomputed() {
        let mut r = RawRecord::new();
        r.set_mapped(true);
        r.set_position(100);
        r.set_cigar(&"10=".parse().unwrap());
        assert_eq!(r.bin(), reg2bin(100, 110));

        r.set_position(1 << 20);
        assert_eq!(r.bin(), reg2bin(1 << 20, (1 << 20) + 10));
    }

    #[test]
    fn test_wire_roundtrip() {
        let mut r = RawRecord::new();
        r.set_name("m/42/0_10").unwrap();
        r.set_mapped(true);
        r.set_position(100);
        r.set_reference_id(0);
        r.set_cigar(&"10=".parse().unwrap());
        r.set_sequence_and_qualities("ACGTACGTAC", "!!!!!!!!!!").unwrap();
        let mut tags = TagCollection::new();
        tags.insert("zm".to_string(), Tag::from(42i32));
        tags.insert("RG".to_string(), Tag::from("3f58e5b8"));
        r.set_tags(&tags).unwrap();

        let wire = r.to_wire();
        let reparsed = RawRecord::from_wire(&wire).unwrap();
        assert_eq!(reparsed, r);
        assert_eq!(reparsed.to_wire(), wire);
    }

    #[test]
    fn test_from_wire_truncated() {
        assert!(RawRecord::from_wire(&[0u8; 10]).is_err());
    }
}

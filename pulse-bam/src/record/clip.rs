//! Record clipping: to query coordinates or to a reference window.
//!
//! Clipping rewrites the CIGAR and mapped position, substrings SEQ/QUAL in
//! native coordinates, re-slices every per-base tag, and re-slices per-pulse
//! tags through the pulse-to-base cache taken over the original record.

use pulse_common::sequence::reverse_complement;
use pulse_common::{Cigar, CigarOp, Position};

use crate::record::{BamRecord, Orientation};
use crate::tag::{Tag, TagValue};
use crate::tags::RecordTag;
use crate::BamError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipType {
    None,
    ClipToQuery,
    ClipToReference,
}

const PER_BASE_TAGS: &[RecordTag] = &[
    RecordTag::DeletionQv,
    RecordTag::InsertionQv,
    RecordTag::MergeQv,
    RecordTag::SubstitutionQv,
    RecordTag::DeletionTag,
    RecordTag::SubstitutionTag,
    RecordTag::Ipd,
    RecordTag::PulseWidth,
];

const PER_PULSE_TAGS: &[RecordTag] = &[
    RecordTag::AltLabelQv,
    RecordTag::AltLabelTag,
    RecordTag::LabelQv,
    RecordTag::Pkmean,
    RecordTag::Pkmean2,
    RecordTag::Pkmid,
    RecordTag::Pkmid2,
    RecordTag::PrePulseFrames,
    RecordTag::PulseCall,
    RecordTag::PulseCallWidth,
    RecordTag::PulseExclusion,
    RecordTag::PulseMergeQv,
    RecordTag::StartFrame,
];

/// Slices an array- or string-valued tag, preserving its stored width.
fn sliced_tag(tag: &Tag, from: usize, len: usize) -> Result<Tag, BamError> {
    let out_of_range = || {
        BamError::InvariantViolated(format!(
            "tag shorter than clip window ({} < {})",
            tag.len(),
            from + len
        ))
    };
    if tag.len() < from + len {
        return Err(out_of_range());
    }
    let value = match tag.value() {
        TagValue::String(s) => TagValue::String(s[from..from + len].to_string()),
        TagValue::Int8Array(v) => TagValue::Int8Array(v[from..from + len].to_vec()),
        TagValue::UInt8Array(v) => TagValue::UInt8Array(v[from..from + len].to_vec()),
        TagValue::Int16Array(v) => TagValue::Int16Array(v[from..from + len].to_vec()),
        TagValue::UInt16Array(v) => TagValue::UInt16Array(v[from..from + len].to_vec()),
        TagValue::Int32Array(v) => TagValue::Int32Array(v[from..from + len].to_vec()),
        TagValue::UInt32Array(v) => TagValue::UInt32Array(v[from..from + len].to_vec()),
        TagValue::FloatArray(v) => TagValue::FloatArray(v[from..from + len].to_vec()),
        _ => {
            return Err(BamError::InvalidValue(
                "cannot clip a scalar tag".to_string(),
            ))
        }
    };
    let mut sliced = Tag::from(value);
    sliced.set_modifier(tag.modifier())?;
    Ok(sliced)
}

/// Pulse-index span covering basecalls [from, from + len) of the original
/// record, interior squashed pulses included.
fn pulse_window(
    record: &BamRecord,
    from: usize,
    len: usize,
) -> Result<Option<(usize, usize)>, BamError> {
    if !record.raw().has_tag(RecordTag::PulseCall.label()) {
        return Ok(None);
    }
    if len == 0 {
        return Ok(Some((0, 0)));
    }
    let span = record.with_pulse_cache(|cache| {
        let missing = || {
            BamError::InvariantViolated(
                "pulse-call tag has fewer basecalls than the clip window".to_string(),
            )
        };
        let mut pos = cache.find_first().ok_or_else(missing)?;
        for _ in 0..from {
            pos = cache.find_next(pos).ok_or_else(missing)?;
        }
        let start = pos;
        for _ in 1..len {
            pos = cache.find_next(pos).ok_or_else(missing)?;
        }
        Ok((start, pos + 1))
    })?;
    Ok(Some(span))
}

/// Re-slices SEQ, QUAL, and all tags to the native window
/// [clip_from, clip_from + clip_length), updating qs/qe.
fn clip_fields(
    record: &mut BamRecord,
    clip_from: usize,
    clip_length: usize,
    new_query_start: Position,
    new_query_end: Position,
) -> Result<(), BamError> {
    // everything below reads the ORIGINAL record; mutations come last
    let native_seq = record.sequence(Orientation::Native, false, false)?;
    let native_quals = record.qualities(Orientation::Native, false, false)?;
    let pulse_span = pulse_window(record, clip_from, clip_length)?;

    let mut tags = record.raw().tags()?;
    for tag in PER_BASE_TAGS {
        if let Some(value) = tags.get(tag.label()) {
            let sliced = sliced_tag(value, clip_from, clip_length)?;
            tags.insert(tag.label().to_string(), sliced);
        }
    }
    if let Some((pulse_from, pulse_to)) = pulse_span {
        for tag in PER_PULSE_TAGS {
            if let Some(value) = tags.get(tag.label()) {
                let sliced = sliced_tag(value, pulse_from, pulse_to - pulse_from)?;
                tags.insert(tag.label().to_string(), sliced);
            }
        }
    }
    tags.insert(
        RecordTag::QueryStart.label().to_string(),
        Tag::from(new_query_start),
    );
    tags.insert(
        RecordTag::QueryEnd.label().to_string(),
        Tag::from(new_query_end),
    );

    let mut seq = native_seq
        .get(clip_from..clip_from + clip_length)
        .ok_or_else(|| {
            BamError::InvariantViolated("clip window exceeds sequence length".to_string())
        })?
        .to_string();
    let mut quals: Vec<u8> = if native_quals.is_empty() {
        Vec::new()
    } else {
        native_quals[clip_from..clip_from + clip_length].to_vec()
    };

    // store back in genomic orientation
    if record.raw().is_reverse_strand() {
        reverse_complement(&mut seq);
        quals.reverse();
    }
    let fastq: String = quals.iter().map(|q| (q + 33) as char).collect();

    let raw = record.raw_mut();
    raw.set_sequence_and_qualities(&seq, &fastq)?;
    raw.set_tags(&tags)?;
    Ok(())
}

/// New CIGAR and leading reference shift for a genomic-space query window.
fn clip_cigar_to_query(cigar: &Cigar, g_start: i64, g_end: i64) -> (Cigar, Position) {
    let mut ops: Vec<CigarOp> = Vec::new();
    let mut q: i64 = 0;
    let mut ref_shift: i64 = 0;
    let mut started = false;

    for op in cigar {
        let len = i64::from(op.len());
        match op {
            CigarOp::H(_) => ops.push(*op),
            CigarOp::D(_) | CigarOp::N(_) => {
                if started && q < g_end {
                    ops.push(*op);
                } else if !started {
                    ref_shift += len;
                }
            }
            CigarOp::P(_) => {
                if started && q < g_end {
                    ops.push(*op);
                }
            }
            _ => {
                // query-consuming op
                let ov_beg = q.max(g_start);
                let ov_end = (q + len).min(g_end);
                if ov_end > ov_beg {
                    ops.push(op.with_len((ov_end - ov_beg) as u32));
                    started = true;
                }
                if op.consumes_reference() {
                    ref_shift += (g_start - q).clamp(0, len);
                }
                q += len;
            }
        }
    }

    // a clip boundary may leave dangling reference-only ops
    while matches!(
        ops.last(),
        Some(CigarOp::D(_) | CigarOp::N(_) | CigarOp::P(_))
    ) {
        ops.pop();
    }
    (Cigar::from_ops(ops), ref_shift as Position)
}

pub(crate) fn clip_to_query(
    record: &mut BamRecord,
    start: Position,
    end: Position,
) -> Result<(), BamError> {
    let seq_length = record.raw().sequence_length() as Position;
    let is_ccs_or_transcript = record.record_type().is_ccs_or_transcript();
    let orig_q_start = if is_ccs_or_transcript {
        0
    } else {
        record.query_start()?
    };
    let orig_q_end = if is_ccs_or_transcript {
        seq_length
    } else {
        record.query_end()?
    };

    // already covered: nothing to do
    if start <= orig_q_start && end >= orig_q_end {
        return Ok(());
    }

    let start = start.max(orig_q_start);
    let end = end.min(orig_q_end).max(start);
    let clip_from = (start - orig_q_start) as usize;
    let clip_length = (end - start) as usize;

    if record.is_mapped() {
        let (g_start, g_end) = if record.raw().is_reverse_strand() {
            (
                i64::from(seq_length) - (clip_from + clip_length) as i64,
                i64::from(seq_length) - clip_from as i64,
            )
        } else {
            (clip_from as i64, (clip_from + clip_length) as i64)
        };
        let (new_cigar, ref_shift) = clip_cigar_to_query(&record.raw().cigar(), g_start, g_end);
        let new_pos = record.raw().position() + ref_shift;
        clip_fields(record, clip_from, clip_length, start, end)?;
        let raw = record.raw_mut();
        raw.set_cigar(&new_cigar);
        raw.set_position(new_pos);
    } else {
        clip_fields(record, clip_from, clip_length, start, end)?;
    }
    Ok(())
}

pub(crate) fn clip_to_reference(
    record: &mut BamRecord,
    start: Position,
    end: Position,
    excise_flanking_inserts: bool,
) -> Result<(), BamError> {
    // clipping to reference coordinates only makes sense for mapped records
    if !record.is_mapped() {
        return Ok(());
    }

    let seq_length = record.raw().sequence_length() as Position;
    let is_ccs_or_transcript = record.record_type().is_ccs_or_transcript();
    let orig_q_start = if is_ccs_or_transcript {
        0
    } else {
        record.query_start()?
    };
    let orig_q_end = if is_ccs_or_transcript {
        seq_length
    } else {
        record.query_end()?
    };
    let orig_t_start = record.reference_start();
    let orig_t_end = record.reference_end();

    if start <= orig_t_start && end >= orig_t_end {
        return Ok(());
    }

    let cigar = record.raw().cigar();
    let mut t = i64::from(orig_t_start);
    let mut q: i64 = 0;
    let start_i = i64::from(start);
    let end_i = i64::from(end);
    let mut g_start: Option<i64> = None;
    let mut g_end: i64 = 0;
    let mut new_ops: Vec<CigarOp> = Vec::new();
    let mut new_pos = i64::from(orig_t_start.max(start));

    for op in &cigar {
        let len = i64::from(op.len());
        match op {
            CigarOp::H(_) => new_ops.push(*op),
            CigarOp::M(_) | CigarOp::Eq(_) | CigarOp::X(_) => {
                let ov_beg = t.max(start_i);
                let ov_end = (t + len).min(end_i);
                if ov_end > ov_beg {
                    if g_start.is_none() {
                        g_start = Some(q + (ov_beg - t));
                        new_pos = ov_beg;
                    }
                    g_end = q + (ov_end - t);
                    new_ops.push(op.with_len((ov_end - ov_beg) as u32));
                }
                t += len;
                q += len;
            }
            CigarOp::D(_) | CigarOp::N(_) => {
                let ov = (t + len).min(end_i) - t.max(start_i);
                if ov > 0 && g_start.is_some() {
                    new_ops.push(op.with_len(ov as u32));
                }
                t += len;
            }
            CigarOp::I(_) => {
                let interior = t > start_i && t < end_i;
                let flanking = t == start_i || t == end_i;
                if interior || (flanking && !excise_flanking_inserts) {
                    if g_start.is_none() {
                        g_start = Some(q);
                    }
                    g_end = q + len;
                    new_ops.push(*op);
                }
                q += len;
            }
            CigarOp::S(_) => {
                // soft clips sit outside any reference window
                q += len;
            }
            CigarOp::P(_) => {
                if g_start.is_some() && t > start_i && t < end_i {
                    new_ops.push(*op);
                }
            }
        }
    }

    while matches!(
        new_ops.last(),
        Some(CigarOp::D(_) | CigarOp::N(_) | CigarOp::P(_))
    ) {
        new_ops.pop();
    }

    let (g_start, g_end) = match g_start {
        Some(gs) => (gs, g_end),
        None => (0, 0), // window missed the alignment entirely
    };

    let (new_q_start, new_q_end) = if record.raw().is_reverse_strand() {
        (
            orig_q_end - g_end as Position,
            orig_q_end - g_start as Position,
        )
    } else {
        (
            orig_q_start + g_start as Position,
            orig_q_start + g_end as Position,
        )
    };
    let clip_from = (new_q_start - orig_q_start) as usize;
    let clip_length = (new_q_end - new_q_start) as usize;

    clip_fields(record, clip_from, clip_length, new_q_start, new_q_end)?;
    let raw = record.raw_mut();
    raw.set_cigar(&Cigar::from_ops(new_ops));
    raw.set_position(new_pos as Position);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FrameEncoding, PulseBehavior};
    use crate::tag::TagCollection;
    use pulse_common::Frames;

    fn subject() -> BamRecord {
        let mut record = BamRecord::new();
        {
            let raw = record.raw_mut();
            raw.set_name("m/42/0_10").unwrap();
            raw.set_mapped(true);
            raw.set_reference_id(0);
            raw.set_position(100);
            raw.set_cigar(&"10=".parse().unwrap());
            raw.set_sequence_and_qualities("ACGTACGTAC", "!!!!!!!!!!")
                .unwrap();
            let mut tags = TagCollection::new();
            tags.insert("qs".to_string(), Tag::from(0i32));
            tags.insert("qe".to_string(), Tag::from(10i32));
            tags.insert("zm".to_string(), Tag::from(42i32));
            tags.insert("dq".to_string(), Tag::from("2222'$22'2"));
            raw.set_tags(&tags).unwrap();
        }
        record
    }

    #[test]
    fn test_clip_to_query() {
        let mut record = subject();
        record.clip(ClipType::ClipToQuery, 2, 8, false).unwrap();

        assert_eq!(
            record.sequence(Orientation::Native, false, false).unwrap(),
            "GTACGT"
        );
        assert_eq!(
            record
                .qualities(Orientation::Native, false, false)
                .unwrap()
                .to_fastq(),
            "!!!!!!"
        );
        assert_eq!(record.raw().cigar().to_string(), "6=");
        assert_eq!(record.reference_start(), 102);
        assert_eq!(record.query_start().unwrap(), 2);
        assert_eq!(record.query_end().unwrap(), 8);
        // per-base tags re-sliced alongside
        assert_eq!(
            record
                .deletion_qv(Orientation::Native, false, false)
                .unwrap()
                .to_fastq(),
            "22'$22"
        );
    }

    #[test]
    fn test_clip_covering_range_is_noop() {
        let mut record = subject();
        let before = record.clone();
        record.clip(ClipType::ClipToQuery, 0, 10, false).unwrap();
        assert_eq!(record, before);

        record.clip(ClipType::ClipToQuery, -5, 50, false).unwrap();
        assert_eq!(record, before);
    }

    #[test]
    fn test_clip_none_is_noop() {
        let mut record = subject();
        let before = record.clone();
        record.clip(ClipType::None, 2, 8, false).unwrap();
        assert_eq!(record, before);
    }

    #[test]
    fn test_clip_to_empty_range() {
        let mut record = subject();
        record.clip(ClipType::ClipToQuery, 4, 4, false).unwrap();
        assert_eq!(record.raw().sequence_length(), 0);
        assert_eq!(record.query_start().unwrap(), 4);
        assert_eq!(record.query_end().unwrap(), 4);
        // scalar tags untouched
        assert_eq!(record.hole_number().unwrap(), 42);
    }

    #[test]
    fn test_clip_with_insertion_cigar() {
        let mut record = subject();
        record.raw_mut().set_cigar(&"4=2I4=".parse().unwrap());
        record.clip(ClipType::ClipToQuery, 2, 8, false).unwrap();
        assert_eq!(record.raw().cigar().to_string(), "2=2I2=");
        assert_eq!(record.reference_start(), 102);
        assert_eq!(
            record.sequence(Orientation::Native, false, false).unwrap(),
            "GTACGT"
        );
    }

    #[test]
    fn test_clip_reverse_strand() {
        let mut record = subject();
        record.raw_mut().set_reverse_strand(true);
        record.clip(ClipType::ClipToQuery, 2, 8, false).unwrap();

        // native window [2, 8) maps to genomic window [2, 8) of the stored
        // sequence only on the forward strand; on the reverse strand it is
        // the mirrored window
        assert_eq!(record.raw().cigar().to_string(), "6=");
        assert_eq!(record.reference_start(), 102);
        assert_eq!(record.raw().sequence_length(), 6);
        assert_eq!(record.query_start().unwrap(), 2);
        assert_eq!(record.query_end().unwrap(), 8);
    }

    #[test]
    fn test_clip_per_pulse_tags() {
        let mut record = subject();
        {
            let raw = record.raw_mut();
            let mut tags = raw.tags().unwrap();
            // 10 basecalls, squashed pulses interleaved at the front
            tags.insert("pc".to_string(), Tag::from("aACGTACGTAC"));
            tags.insert(
                "sf".to_string(),
                Tag::from((0..11u32).collect::<Vec<u32>>()),
            );
            raw.set_tags(&tags).unwrap();
        }
        record.clip(ClipType::ClipToQuery, 2, 8, false).unwrap();

        let pc = record
            .pulse_call(Orientation::Native, false, false, PulseBehavior::All)
            .unwrap();
        assert_eq!(pc, "GTACGT");
        let sf = record
            .start_frame(Orientation::Native, false, false, PulseBehavior::All)
            .unwrap();
        assert_eq!(sf, vec![3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_clip_preserves_frame_width() {
        let mut record = subject();
        record
            .set_ipd(&Frames::from(vec![8u16, 9, 10, 11, 12, 13, 14, 15, 16, 17]), FrameEncoding::Lossy)
            .unwrap();
        record.clip(ClipType::ClipToQuery, 2, 8, false).unwrap();
        // still stored as lossy codes
        assert!(record.raw().tag_value("ip").unwrap().is_uint8_array());
        assert_eq!(
            record.ipd(Orientation::Native, false, false).unwrap().data(),
            &[10, 11, 12, 13, 14, 15]
        );
    }

    #[test]
    fn test_clip_to_reference() {
        let mut record = subject();
        record.clip(ClipType::ClipToReference, 103, 107, false).unwrap();
        assert_eq!(record.reference_start(), 103);
        assert_eq!(record.raw().cigar().to_string(), "4=");
        assert_eq!(
            record.sequence(Orientation::Native, false, false).unwrap(),
            "TACG"
        );
        assert_eq!(record.query_start().unwrap(), 3);
        assert_eq!(record.query_end().unwrap(), 7);
    }

    #[test]
    fn test_clip_to_reference_spanning_deletion() {
        let mut record = subject();
        record.raw_mut().set_cigar(&"5=3D5=".parse().unwrap());
        // window [102, 111) keeps 3=3D3= (ref 102..111)
        record.clip(ClipType::ClipToReference, 102, 111, false).unwrap();
        assert_eq!(record.reference_start(), 102);
        assert_eq!(record.raw().cigar().to_string(), "3=3D3=");
        assert_eq!(record.raw().sequence_length(), 6);
    }

    #[test]
    fn test_clip_to_reference_flanking_insert() {
        let mut base = subject();
        base.raw_mut().set_cigar(&"4=2I4=".parse().unwrap());

        // insertion sits at reference position 104
        let mut kept = base.clone();
        kept.clip(ClipType::ClipToReference, 104, 108, false).unwrap();
        assert_eq!(kept.raw().cigar().to_string(), "2I4=");
        assert_eq!(kept.raw().sequence_length(), 6);

        let mut excised = base.clone();
        excised
            .clip(ClipType::ClipToReference, 104, 108, true)
            .unwrap();
        assert_eq!(excised.raw().cigar().to_string(), "4=");
        assert_eq!(excised.raw().sequence_length(), 4);
    }

    #[test]
    fn test_clip_to_reference_unmapped_is_noop() {
        let mut record = subject();
        record.raw_mut().set_mapped(false);
        let before = record.clone();
        record.clip(ClipType::ClipToReference, 102, 105, false).unwrap();
        assert_eq!(record, before);
    }
}

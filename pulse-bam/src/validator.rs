//! PacBio conformance validation over headers, read groups, and records.
//!
//! Rules collect their findings into a bounded accumulator rather than
//! failing on the first problem; the accumulated set surfaces as one
//! `validation failed` error.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use crate::header::{make_read_group_id, BamHeader, ReadGroupInfo, Version};
use crate::record::BamRecord;
use crate::tags::RecordTag;
use crate::BamError;

const KNOWN_SORT_ORDERS: &[&str] = &["unknown", "unsorted", "queryname", "coordinate"];

const KNOWN_READ_TYPES: &[&str] = &[
    "ZMW",
    "POLYMERASE",
    "HQREGION",
    "SUBREAD",
    "CCS",
    "SCRAP",
    "TRANSCRIPT",
    "UNKNOWN",
];

// length-bearing per-base tags (scalars like bq/cx are excluded)
const LENGTH_CHECKED_PER_BASE: &[RecordTag] = &[
    RecordTag::DeletionQv,
    RecordTag::DeletionTag,
    RecordTag::InsertionQv,
    RecordTag::MergeQv,
    RecordTag::SubstitutionQv,
    RecordTag::SubstitutionTag,
    RecordTag::Ipd,
    RecordTag::PulseWidth,
];

const LENGTH_CHECKED_PER_PULSE: &[RecordTag] = &[
    RecordTag::AltLabelQv,
    RecordTag::AltLabelTag,
    RecordTag::LabelQv,
    RecordTag::Pkmean,
    RecordTag::Pkmean2,
    RecordTag::Pkmid,
    RecordTag::Pkmid2,
    RecordTag::PrePulseFrames,
    RecordTag::PulseCallWidth,
    RecordTag::PulseExclusion,
    RecordTag::PulseMergeQv,
    RecordTag::StartFrame,
];

/// Errors gathered during a validation pass, bucketed by origin.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    max_errors: usize,
    total: usize,
    file_errors: BTreeMap<String, Vec<String>>,
    read_group_errors: BTreeMap<String, Vec<String>>,
    record_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// `max_errors` of 0 means unlimited.
    pub fn new(max_errors: usize) -> ValidationErrors {
        let max_errors = if max_errors == 0 {
            usize::MAX
        } else {
            max_errors
        };
        ValidationErrors {
            max_errors,
            ..ValidationErrors::default()
        }
    }

    pub fn max_errors(&self) -> usize {
        self.max_errors
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn file_errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.file_errors
    }

    pub fn read_group_errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.read_group_errors
    }

    pub fn record_errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.record_errors
    }

    pub fn add_file_error(&mut self, file: &str, details: String) -> Result<(), BamError> {
        self.file_errors
            .entry(file.to_string())
            .or_default()
            .push(details);
        self.on_error_added()
    }

    pub fn add_read_group_error(&mut self, id: &str, details: String) -> Result<(), BamError> {
        self.read_group_errors
            .entry(id.to_string())
            .or_default()
            .push(details);
        self.on_error_added()
    }

    pub fn add_record_error(&mut self, name: &str, details: String) -> Result<(), BamError> {
        self.record_errors
            .entry(name.to_string())
            .or_default()
            .push(details);
        self.on_error_added()
    }

    pub fn add_tag_length_error(
        &mut self,
        name: &str,
        tag_label: &str,
        observed: usize,
        expected: usize,
    ) -> Result<(), BamError> {
        self.add_record_error(
            name,
            format!("{tag_label} tag length {observed} does not match expected length {expected}"),
        )
    }

    fn on_error_added(&mut self) -> Result<(), BamError> {
        self.total += 1;
        if self.total >= self.max_errors {
            return Err(BamError::ValidationFailed(self.clone()));
        }
        Ok(())
    }

    /// Wraps the accumulated errors, empty or not, into the error kind.
    pub fn into_error(self) -> BamError {
        BamError::ValidationFailed(self)
    }

    /// `Ok` when nothing was collected, the error bundle otherwise.
    pub fn into_result(self) -> Result<(), BamError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {} error(s)", self.total)?;
        for (file, errors) in &self.file_errors {
            for e in errors {
                write!(f, "\n  in file '{file}': {e}")?;
            }
        }
        for (rg, errors) in &self.read_group_errors {
            for e in errors {
                write!(f, "\n  in read group '{rg}': {e}")?;
            }
        }
        for (name, errors) in &self.record_errors {
            for e in errors {
                write!(f, "\n  in record '{name}': {e}")?;
            }
        }
        Ok(())
    }
}

/// Single-pass validation entry points.
pub struct Validator;

impl Validator {
    pub fn validate_header(header: &BamHeader, max_errors: usize) -> Result<(), BamError> {
        let mut errors = ValidationErrors::new(max_errors);
        Self::header_rules(header, &mut errors)?;
        errors.into_result()
    }

    pub fn validate_read_group(
        read_group: &ReadGroupInfo,
        max_errors: usize,
    ) -> Result<(), BamError> {
        let mut errors = ValidationErrors::new(max_errors);
        Self::read_group_rules(read_group, &mut errors)?;
        errors.into_result()
    }

    pub fn validate_record(record: &BamRecord, max_errors: usize) -> Result<(), BamError> {
        let mut errors = ValidationErrors::new(max_errors);
        Self::record_rules(record, &mut errors)?;
        errors.into_result()
    }

    fn header_rules(header: &BamHeader, errors: &mut ValidationErrors) -> Result<(), BamError> {
        let bucket = "header";

        if header.version().parse::<Version>().is_err() {
            errors.add_file_error(
                bucket,
                format!("SAM version '{}' is not a valid version", header.version()),
            )?;
        }
        if !KNOWN_SORT_ORDERS.contains(&header.sort_order()) {
            errors.add_file_error(
                bucket,
                format!("sort order '{}' is unrecognized", header.sort_order()),
            )?;
        }
        if header.pacbio_bam_version().is_empty() {
            errors.add_file_error(bucket, "PacBio BAM version (@HD pb) is missing".to_string())?;
        } else if header.pacbio_bam_version().parse::<Version>().is_err() {
            errors.add_file_error(
                bucket,
                format!(
                    "PacBio BAM version '{}' is not a valid version",
                    header.pacbio_bam_version()
                ),
            )?;
        }

        for read_group in header.read_groups() {
            Self::read_group_rules(read_group, errors)?;
        }
        Ok(())
    }

    fn read_group_rules(
        read_group: &ReadGroupInfo,
        errors: &mut ValidationErrors,
    ) -> Result<(), BamError> {
        let id = read_group.id();
        let bucket = if id.is_empty() { "(no id)" } else { id };

        if id.is_empty() {
            errors.add_read_group_error(bucket, "missing ID".to_string())?;
        }
        if read_group.movie_name().is_empty() {
            errors.add_read_group_error(bucket, "missing movie name (PU tag)".to_string())?;
        }
        if read_group.read_type().is_empty() {
            errors.add_read_group_error(bucket, "missing read type".to_string())?;
        } else if !KNOWN_READ_TYPES.contains(&read_group.read_type()) {
            errors.add_read_group_error(
                bucket,
                format!("read type '{}' is unrecognized", read_group.read_type()),
            )?;
        }
        if read_group.binding_kit().is_empty() {
            errors.add_read_group_error(bucket, "missing binding kit".to_string())?;
        }
        if read_group.sequencing_kit().is_empty() {
            errors.add_read_group_error(bucket, "missing sequencing kit".to_string())?;
        }
        if read_group.basecaller_version().is_empty() {
            errors.add_read_group_error(bucket, "missing basecaller version".to_string())?;
        }
        if read_group.frame_rate_hz().is_empty() {
            errors.add_read_group_error(bucket, "missing frame rate".to_string())?;
        } else if read_group.frame_rate_hz().parse::<f64>().is_err() {
            errors.add_read_group_error(
                bucket,
                format!("frame rate '{}' is not numeric", read_group.frame_rate_hz()),
            )?;
        }

        if !read_group.binding_kit().is_empty()
            && !read_group.sequencing_kit().is_empty()
            && !read_group.basecaller_version().is_empty()
            && read_group.sequencing_chemistry().is_err()
        {
            errors.add_read_group_error(
                bucket,
                "invalid sequencing chemistry combination".to_string(),
            )?;
        }

        if !id.is_empty()
            && !read_group.movie_name().is_empty()
            && !read_group.read_type().is_empty()
        {
            let expected = make_read_group_id(read_group.movie_name(), read_group.read_type());
            if read_group.base_id() != expected {
                errors.add_read_group_error(
                    bucket,
                    format!(
                        "stored ID does not match derived ID ({} vs {expected})",
                        read_group.base_id()
                    ),
                )?;
            }
        }
        Ok(())
    }

    fn record_rules(record: &BamRecord, errors: &mut ValidationErrors) -> Result<(), BamError> {
        let name = record.full_name();
        let raw = record.raw();
        let seq_len = raw.sequence_length();

        if record.is_mapped() {
            if raw.reference_id() < 0 {
                errors.add_record_error(&name, "mapped record has no reference ID".to_string())?;
            }
            if raw.position() < 0 {
                errors.add_record_error(&name, "mapped record has no position".to_string())?;
            }
        } else {
            if raw.reference_id() >= 0 {
                errors
                    .add_record_error(&name, "unmapped record carries a reference ID".to_string())?;
            }
            if raw.position() >= 0 {
                errors.add_record_error(&name, "unmapped record carries a position".to_string())?;
            }
        }

        let qual_len = raw.qualities().len();
        if qual_len != 0 && qual_len != seq_len {
            errors.add_record_error(
                &name,
                format!("quality length {qual_len} does not match sequence length {seq_len}"),
            )?;
        }

        let cigar = raw.cigar();
        if !cigar.is_empty() && cigar.query_length() as usize != seq_len {
            errors.add_record_error(
                &name,
                format!(
                    "CIGAR query length {} does not match sequence length {seq_len}",
                    cigar.query_length()
                ),
            )?;
        }

        let record_type = record.record_type();
        if record_type != crate::record::RecordType::Transcript
            && !raw.has_tag(RecordTag::HoleNumber.label())
        {
            errors.add_record_error(&name, "missing hole number (zm tag)".to_string())?;
        }

        if !record_type.is_ccs_or_transcript() {
            let qs = raw
                .tag_value(RecordTag::QueryStart.label())
                .and_then(|t| t.to_i32().ok());
            let qe = raw
                .tag_value(RecordTag::QueryEnd.label())
                .and_then(|t| t.to_i32().ok());
            match (qs, qe) {
                (Some(qs), Some(qe)) => {
                    if qs < 0 {
                        errors.add_record_error(&name, "negative query start".to_string())?;
                    }
                    if qe < qs {
                        errors.add_record_error(
                            &name,
                            format!("query end {qe} precedes query start {qs}"),
                        )?;
                    } else if (qe - qs) as usize != seq_len {
                        errors.add_record_error(
                            &name,
                            format!(
                                "query span {} does not match sequence length {seq_len}",
                                qe - qs
                            ),
                        )?;
                    }
                }
                _ => {
                    errors.add_record_error(&name, "missing query start/end (qs/qe)".to_string())?;
                }
            }
        }

        if record_type == crate::record::RecordType::Subread {
            if let Some(np) = raw.tag_value(RecordTag::NumPasses.label()) {
                if np.to_i32().unwrap_or(0) != 1 {
                    errors
                        .add_record_error(&name, "subread must have np == 1".to_string())?;
                }
            }
        }

        for tag in LENGTH_CHECKED_PER_BASE {
            if let Some(value) = raw.tag_value(tag.label()) {
                if value.len() != seq_len {
                    errors.add_tag_length_error(&name, tag.label(), value.len(), seq_len)?;
                }
            }
        }

        if let Some(pc) = raw.tag_value(RecordTag::PulseCall.label()) {
            let num_pulses = pc.len();
            for tag in LENGTH_CHECKED_PER_PULSE {
                if let Some(value) = raw.tag_value(tag.label()) {
                    if value.len() != num_pulses {
                        errors.add_tag_length_error(&name, tag.label(), value.len(), num_pulses)?;
                    }
                }
            }
            if let Ok(calls) = pc.to_str() {
                let basecalled = calls.bytes().filter(u8::is_ascii_uppercase).count();
                if basecalled != seq_len {
                    errors.add_record_error(
                        &name,
                        format!(
                            "pulse-call basecall count {basecalled} does not match sequence length {seq_len}"
                        ),
                    )?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordBuilder;
    use crate::tag::Tag;

    fn good_read_group() -> ReadGroupInfo {
        let mut rg = ReadGroupInfo::from_movie("movie32", "CCS");
        rg.set_binding_kit("100372700")
            .set_sequencing_kit("100612400")
            .set_basecaller_version("2.3")
            .set_frame_rate_hz("100")
            .set_control(true);
        rg
    }

    fn good_subread() -> BamRecord {
        let mut builder = RecordBuilder::new();
        builder
            .name("movie1/54130/0_10")
            .sequence("AATGAGGAGA")
            .qualities("IIIIIIIIII")
            .cigar("10=".parse().unwrap())
            .reference_id(0)
            .position(100)
            .set_mapped(true)
            .tag("RG", Tag::from("3f58e5b8"))
            .tag("dq", Tag::from("2222'$22'2"))
            .tag("dt", Tag::from("NNNNAGNNGN"))
            .tag("iq", Tag::from("(+#1'$#*1&"))
            .tag("mq", Tag::from("&1~51*5&~2"))
            .tag("sq", Tag::from("<32<4<<<<3"))
            .tag("ip", Tag::from(vec![2u8, 0, 10, 22, 34, 0, 2, 3, 0, 16]))
            .tag("np", Tag::from(1i32))
            .tag("qe", Tag::from(10i32))
            .tag("qs", Tag::from(0i32))
            .tag("zm", Tag::from(54130i32))
            .tag("rq", Tag::from(0.854f32))
            .tag("sn", Tag::from(vec![2.0f32, 2.0, 2.0, 2.0]));
        builder.build().unwrap()
    }

    #[test]
    fn test_good_record_passes() {
        let record = good_subread();
        assert!(Validator::validate_record(&record, 0).is_ok());
    }

    #[test]
    fn test_read_group_rules() {
        let rg = good_read_group();
        assert!(Validator::validate_read_group(&rg, 0).is_ok());

        let mut bad = good_read_group();
        bad.set_binding_kit("");
        assert!(Validator::validate_read_group(&bad, 0).is_err());

        let mut bad = good_read_group();
        bad.set_read_type("FOO");
        assert!(Validator::validate_read_group(&bad, 0).is_err());

        let mut bad = good_read_group();
        bad.set_basecaller_version("0.42");
        assert!(Validator::validate_read_group(&bad, 0).is_err());

        let mut bad = good_read_group();
        bad.set_frame_rate_hz("foo");
        assert!(Validator::validate_read_group(&bad, 0).is_err());

        // read type changed without re-deriving the ID
        let mut bad = good_read_group();
        bad.set_read_type("SUBREAD");
        assert!(Validator::validate_read_group(&bad, 0).is_err());
    }

    #[test]
    fn test_error_accumulation() {
        // missing qs/qe, missing zm, seq/qual mismatch
        let mut builder = RecordBuilder::new();
        builder.name("movie1/8/0_10").sequence("AATGAGGAGA");
        let mut record = builder.build().unwrap();
        record
            .raw_mut()
            .add_tag("dq", &Tag::from("22222"))
            .unwrap();

        let err = Validator::validate_record(&record, 5).unwrap_err();
        match err {
            BamError::ValidationFailed(errors) => {
                let bucket = &errors.record_errors()["movie1/8/0_10"];
                assert_eq!(errors.total(), 3);
                assert_eq!(bucket.len(), 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_threshold_raises_early() {
        let mut errors = ValidationErrors::new(1);
        assert!(errors.add_file_error("foo", "you".to_string()).is_err());

        let mut errors = ValidationErrors::new(2);
        assert!(errors.add_file_error("foo", "you".to_string()).is_ok());
        assert!(errors.add_file_error("foo", "me".to_string()).is_err());
    }

    #[test]
    fn test_zero_max_is_unlimited() {
        let mut errors = ValidationErrors::new(0);
        for i in 0..100 {
            assert!(errors.add_record_error("r", format!("e{i}")).is_ok());
        }
        assert_eq!(errors.total(), 100);
    }

    #[test]
    fn test_per_pulse_length_rule() {
        let mut record = good_subread();
        {
            let raw = record.raw_mut();
            raw.add_tag("pc", &Tag::from("AATGAGGAGAcc")).unwrap();
            raw.add_tag("pq", &Tag::from("IIIIIIIIIIII")).unwrap();
        }
        // pc basecall count (10) matches; pq matches pulse count (12)
        assert!(Validator::validate_record(&record, 0).is_ok());

        record
            .raw_mut()
            .edit_tag("pq", &Tag::from("III"))
            .unwrap();
        assert!(Validator::validate_record(&record, 0).is_err());
    }

    #[test]
    fn test_header_rules() {
        let header = BamHeader::from_sam("@HD\tVN:1.5\tSO:coordinate\tpb:3.0.1").unwrap();
        assert!(Validator::validate_header(&header, 0).is_ok());

        let mut bad = header.clone();
        bad.set_sort_order("sideways");
        assert!(Validator::validate_header(&bad, 0).is_err());

        let mut bad = header;
        bad.set_version("one.five");
        assert!(Validator::validate_header(&bad, 0).is_err());
    }
}

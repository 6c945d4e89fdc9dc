//! SAM header model: @HD line, sequences, read groups, programs, comments.

pub mod program_info;
pub mod read_group;
pub mod sequence_info;

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;

use fxhash::FxHashMap;

use crate::{BamError, MINIMUM_PACBIO_BAM_VERSION, SAM_VERSION};

pub use program_info::ProgramInfo;
pub use read_group::{
    make_read_group_id, BarcodeMode, BarcodeQualityType, BaseFeature, FrameCodec, PlatformModel,
    ReadGroupInfo,
};
pub use sequence_info::SequenceInfo;

/// A "major.minor[.revision]" version number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    major: u32,
    minor: u32,
    revision: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, revision: u32) -> Version {
        Version {
            major,
            minor,
            revision,
        }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }
}

impl FromStr for Version {
    type Err = BamError;

    fn from_str(s: &str) -> Result<Version, BamError> {
        let malformed = || BamError::MalformedInput(format!("invalid version number '{s}'"));
        let fields: Vec<&str> = s.split('.').collect();
        if fields.len() < 2 || fields.len() > 3 {
            return Err(malformed());
        }
        let mut parts = [0u32; 3];
        for (i, f) in fields.iter().enumerate() {
            parts[i] = f.parse().map_err(|_| malformed())?;
        }
        Ok(Version::new(parts[0], parts[1], parts[2]))
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}

pub(crate) fn sam_tag(tag: &str, value: &str) -> String {
    format!("\t{tag}:{value}")
}

/// Splits a `@XX\t...` header line into `(2-char tag, value)` tokens.
pub(crate) fn line_tokens(line: &str) -> impl Iterator<Item = (&str, &str)> {
    line.split('\t').skip(1).filter_map(|token| {
        if token.len() >= 3 && token.as_bytes()[2] == b':' {
            Some((&token[..2], &token[3..]))
        } else {
            None
        }
    })
}

/// The parsed SAM header.
///
/// Cheap to clone field-by-field; records share one via `Arc` (see
/// `SharedHeader`). Treat a parsed header as immutable and use `deep_copy`
/// before mutating.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BamHeader {
    version: String,
    pacbio_bam_version: String,
    sort_order: String,
    custom: BTreeMap<String, String>,
    sequences: Vec<SequenceInfo>,
    sequence_ids: FxHashMap<String, i32>,
    read_groups: BTreeMap<String, ReadGroupInfo>,
    programs: BTreeMap<String, ProgramInfo>,
    comments: Vec<String>,
}

/// Reference-counted header handle shared across records.
pub type SharedHeader = Arc<BamHeader>;

impl BamHeader {
    pub fn new() -> BamHeader {
        BamHeader::default()
    }

    pub fn from_sam(text: &str) -> Result<BamHeader, BamError> {
        let mut header = BamHeader::new();
        for line in text.lines() {
            // too short to hold a real token
            if line.len() < 5 {
                continue;
            }
            match &line[..3] {
                "@HD" => {
                    for (tag, value) in line_tokens(line) {
                        match tag {
                            "VN" => header.version = value.to_string(),
                            "SO" => header.sort_order = value.to_string(),
                            "pb" => header.set_pacbio_bam_version(value)?,
                            _ => {
                                header.custom.insert(tag.to_string(), value.to_string());
                            }
                        }
                    }
                    if header.version.is_empty() {
                        header.version = SAM_VERSION.to_string();
                    }
                }
                "@SQ" => {
                    header.add_sequence(SequenceInfo::from_sam(line)?);
                }
                "@RG" => {
                    header.add_read_group(ReadGroupInfo::from_sam(line)?);
                }
                "@PG" => {
                    header.add_program(ProgramInfo::from_sam(line)?);
                }
                "@CO" => {
                    header.add_comment(&line[4..]);
                }
                _ => {}
            }
        }
        Ok(header)
    }

    pub fn to_sam(&self) -> String {
        let version = if self.version.is_empty() {
            SAM_VERSION
        } else {
            &self.version
        };
        let sort_order = if self.sort_order.is_empty() {
            "unknown"
        } else {
            &self.sort_order
        };
        let pb_version = if self.pacbio_bam_version.is_empty() {
            MINIMUM_PACBIO_BAM_VERSION
        } else {
            &self.pacbio_bam_version
        };

        let mut lines = Vec::new();
        let mut hd = format!(
            "@HD{}{}{}",
            sam_tag("VN", version),
            sam_tag("SO", sort_order),
            sam_tag("pb", pb_version)
        );
        for (tag, value) in &self.custom {
            hd.push_str(&sam_tag(tag, value));
        }
        lines.push(hd);

        for seq in &self.sequences {
            lines.push(seq.to_sam());
        }
        // BTreeMap iteration keeps @RG output sorted by ID, reproducible
        // across decoders
        for rg in self.read_groups.values() {
            lines.push(rg.to_sam());
        }
        for pg in self.programs.values() {
            lines.push(pg.to_sam());
        }
        for comment in &self.comments {
            lines.push(format!("@CO\t{comment}"));
        }
        lines.join("\n")
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: &str) -> &mut Self {
        self.version = version.to_string();
        self
    }

    pub fn sort_order(&self) -> &str {
        &self.sort_order
    }

    pub fn set_sort_order(&mut self, order: &str) -> &mut Self {
        self.sort_order = order.to_string();
        self
    }

    pub fn pacbio_bam_version(&self) -> &str {
        &self.pacbio_bam_version
    }

    pub fn set_pacbio_bam_version(&mut self, version: &str) -> Result<(), BamError> {
        let parsed: Version = version.parse().map_err(|_| {
            BamError::UnsupportedFeature(format!("invalid PacBio BAM version '{version}'"))
        })?;
        let minimum: Version = MINIMUM_PACBIO_BAM_VERSION
            .parse()
            .unwrap_or_default();
        if parsed < minimum {
            return Err(BamError::UnsupportedFeature(format!(
                "PacBio BAM version '{version}' is older than the minimum supported ({MINIMUM_PACBIO_BAM_VERSION})"
            )));
        }
        self.pacbio_bam_version = version.to_string();
        Ok(())
    }

    pub fn custom_tags(&self) -> &BTreeMap<String, String> {
        &self.custom
    }

    pub fn add_sequence(&mut self, sequence: SequenceInfo) -> &mut Self {
        self.sequence_ids
            .insert(sequence.name().to_string(), self.sequences.len() as i32);
        self.sequences.push(sequence);
        self
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn sequences(&self) -> &[SequenceInfo] {
        &self.sequences
    }

    pub fn has_sequence(&self, name: &str) -> bool {
        self.sequence_ids.contains_key(name)
    }

    pub fn sequence(&self, name: &str) -> Option<&SequenceInfo> {
        self.sequence_ids
            .get(name)
            .and_then(|id| self.sequences.get(*id as usize))
    }

    pub fn sequence_at(&self, id: i32) -> Option<&SequenceInfo> {
        if id < 0 {
            return None;
        }
        self.sequences.get(id as usize)
    }

    pub fn sequence_id(&self, name: &str) -> Result<i32, BamError> {
        self.sequence_ids
            .get(name)
            .copied()
            .ok_or_else(|| BamError::NotFound(format!("sequence '{name}' not in header")))
    }

    pub fn sequence_name(&self, id: i32) -> Result<&str, BamError> {
        self.sequence_at(id)
            .map(SequenceInfo::name)
            .ok_or_else(|| BamError::NotFound(format!("sequence id {id} not in header")))
    }

    pub fn add_read_group(&mut self, read_group: ReadGroupInfo) -> &mut Self {
        self.read_groups
            .insert(read_group.id().to_string(), read_group);
        self
    }

    pub fn has_read_group(&self, id: &str) -> bool {
        self.read_groups.contains_key(id)
    }

    pub fn read_group(&self, id: &str) -> Result<&ReadGroupInfo, BamError> {
        self.read_groups
            .get(id)
            .ok_or_else(|| BamError::NotFound(format!("read group '{id}' not in header")))
    }

    pub fn read_groups(&self) -> impl Iterator<Item = &ReadGroupInfo> {
        self.read_groups.values()
    }

    pub fn read_group_ids(&self) -> impl Iterator<Item = &str> {
        self.read_groups.keys().map(String::as_str)
    }

    pub fn add_program(&mut self, program: ProgramInfo) -> &mut Self {
        self.programs.insert(program.id().to_string(), program);
        self
    }

    pub fn has_program(&self, id: &str) -> bool {
        self.programs.contains_key(id)
    }

    pub fn program(&self, id: &str) -> Result<&ProgramInfo, BamError> {
        self.programs
            .get(id)
            .ok_or_else(|| BamError::NotFound(format!("program '{id}' not in header")))
    }

    pub fn programs(&self) -> impl Iterator<Item = &ProgramInfo> {
        self.programs.values()
    }

    pub fn add_comment(&mut self, comment: &str) -> &mut Self {
        self.comments.push(comment.to_string());
        self
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn deep_copy(&self) -> BamHeader {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "@HD\tVN:1.5\tSO:coordinate\tpb:3.0.1\n\
        @SQ\tSN:chr1\tLN:25000\tM5:734d5f3b2859595f4bd87a2fe6b7389b\n\
        @SQ\tSN:chr2\tLN:12000\n\
        @RG\tID:3f58e5b8\tPL:PACBIO\tDS:READTYPE=SUBREAD;BINDINGKIT=100-619-300;\
SEQUENCINGKIT=100-867-300;BASECALLERVERSION=3.1;FRAMERATEHZ=100\tPU:movie1\tPM:SEQUEL\n\
        @PG\tID:baz2bam\tVN:1.0\n\
        @CO\thello world";

    #[test]
    fn test_parse() {
        let header = BamHeader::from_sam(SAMPLE).unwrap();
        assert_eq!(header.version(), "1.5");
        assert_eq!(header.sort_order(), "coordinate");
        assert_eq!(header.pacbio_bam_version(), "3.0.1");
        assert_eq!(header.num_sequences(), 2);
        assert_eq!(header.sequence_id("chr2").unwrap(), 1);
        assert!(header.has_read_group("3f58e5b8"));
        assert!(header.has_program("baz2bam"));
        assert_eq!(header.comments(), &["hello world".to_string()]);
    }

    #[test]
    fn test_sam_roundtrip() {
        let header = BamHeader::from_sam(SAMPLE).unwrap();
        let text = header.to_sam();
        let reparsed = BamHeader::from_sam(&text).unwrap();
        assert_eq!(reparsed, header);
        // stable serialization, no trailing newline
        assert_eq!(reparsed.to_sam(), text);
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn test_version_parse() {
        let v: Version = "3.0.1".parse().unwrap();
        assert_eq!(v, Version::new(3, 0, 1));
        assert_eq!("3.1".parse::<Version>().unwrap(), Version::new(3, 1, 0));
        assert!("3".parse::<Version>().is_err());
        assert!("3.0b".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_version_ordering() {
        let min: Version = "3.0.1".parse().unwrap();
        assert!("3.0.0".parse::<Version>().unwrap() < min);
        assert!("3.0.2".parse::<Version>().unwrap() > min);
        assert!("2.9.9".parse::<Version>().unwrap() < min);
        assert!("3.1.0".parse::<Version>().unwrap() > min);
    }

    #[test]
    fn test_pb_version_enforced() {
        let mut header = BamHeader::new();
        assert!(header.set_pacbio_bam_version("3.0.1").is_ok());
        assert!(header.set_pacbio_bam_version("3.1").is_ok());
        assert!(matches!(
            header.set_pacbio_bam_version("3.0.0"),
            Err(BamError::UnsupportedFeature(_))
        ));
        assert!(matches!(
            header.set_pacbio_bam_version("x.y"),
            Err(BamError::UnsupportedFeature(_))
        ));
        // failed sets leave the last good value in place
        assert_eq!(header.pacbio_bam_version(), "3.1");
    }

    #[test]
    fn test_defaults_on_write() {
        let header = BamHeader::new();
        let text = header.to_sam();
        assert!(text.starts_with("@HD\tVN:1.5\tSO:unknown\tpb:3.0.1"));
    }

    #[test]
    fn test_unknown_hd_tokens_kept() {
        let header = BamHeader::from_sam("@HD\tVN:1.5\tzz:custom").unwrap();
        assert_eq!(header.custom_tags()["zz"], "custom");
        let reparsed = BamHeader::from_sam(&header.to_sam()).unwrap();
        assert_eq!(reparsed.custom_tags()["zz"], "custom");
    }
}

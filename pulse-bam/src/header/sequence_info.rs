use std::collections::BTreeMap;

use crate::header::{line_tokens, sam_tag};
use crate::BamError;

/// One @SQ line: a reference sequence dictionary entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceInfo {
    name: String,
    length: String,
    assembly_id: String,
    checksum: String,
    species: String,
    uri: String,
    custom: BTreeMap<String, String>,
}

impl SequenceInfo {
    pub fn new(name: &str, length: &str) -> SequenceInfo {
        SequenceInfo {
            name: name.to_string(),
            length: length.to_string(),
            ..SequenceInfo::default()
        }
    }

    pub fn from_sam(line: &str) -> Result<SequenceInfo, BamError> {
        let mut seq = SequenceInfo::default();
        for (tag, value) in line_tokens(line) {
            match tag {
                "SN" => seq.name = value.to_string(),
                "LN" => seq.length = value.to_string(),
                "AS" => seq.assembly_id = value.to_string(),
                "M5" => seq.checksum = value.to_string(),
                "SP" => seq.species = value.to_string(),
                "UR" => seq.uri = value.to_string(),
                _ => {
                    seq.custom.insert(tag.to_string(), value.to_string());
                }
            }
        }
        Ok(seq)
    }

    pub fn to_sam(&self) -> String {
        let mut out = format!("@SQ{}", sam_tag("SN", &self.name));
        if !self.length.is_empty() {
            out.push_str(&sam_tag("LN", &self.length));
        }
        if !self.assembly_id.is_empty() {
            out.push_str(&sam_tag("AS", &self.assembly_id));
        }
        if !self.checksum.is_empty() {
            out.push_str(&sam_tag("M5", &self.checksum));
        }
        if !self.species.is_empty() {
            out.push_str(&sam_tag("SP", &self.species));
        }
        if !self.uri.is_empty() {
            out.push_str(&sam_tag("UR", &self.uri));
        }
        for (tag, value) in &self.custom {
            out.push_str(&sam_tag(tag, value));
        }
        out
    }

    pub fn is_valid(&self) -> bool {
        if self.name.is_empty() {
            return false;
        }
        match self.length.parse::<i64>() {
            Ok(l) => l >= 0 && l <= i64::from(i32::MAX),
            Err(_) => false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_string();
        self
    }

    pub fn length(&self) -> &str {
        &self.length
    }

    pub fn set_length(&mut self, length: &str) -> &mut Self {
        self.length = length.to_string();
        self
    }

    pub fn assembly_id(&self) -> &str {
        &self.assembly_id
    }

    pub fn set_assembly_id(&mut self, id: &str) -> &mut Self {
        self.assembly_id = id.to_string();
        self
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn set_checksum(&mut self, checksum: &str) -> &mut Self {
        self.checksum = checksum.to_string();
        self
    }

    pub fn species(&self) -> &str {
        &self.species
    }

    pub fn set_species(&mut self, species: &str) -> &mut Self {
        self.species = species.to_string();
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: &str) -> &mut Self {
        self.uri = uri.to_string();
        self
    }

    pub fn custom_tags(&self) -> &BTreeMap<String, String> {
        &self.custom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let line = "@SQ\tSN:chr1\tLN:25000\tM5:734d5f3b2859595f4bd87a2fe6b7389b\tXX:extra";
        let seq = SequenceInfo::from_sam(line).unwrap();
        assert_eq!(seq.name(), "chr1");
        assert_eq!(seq.length(), "25000");
        assert_eq!(seq.custom_tags()["XX"], "extra");
        assert_eq!(seq.to_sam(), line);
    }

    #[test]
    fn test_validity() {
        assert!(SequenceInfo::new("chr1", "0").is_valid());
        assert!(SequenceInfo::new("chr1", "2147483647").is_valid());
        assert!(!SequenceInfo::new("chr1", "2147483648").is_valid());
        assert!(!SequenceInfo::new("chr1", "-1").is_valid());
        assert!(!SequenceInfo::new("", "100").is_valid());
        assert!(!SequenceInfo::new("chr1", "foo").is_valid());
    }
}

use std::collections::BTreeMap;

use crate::header::{line_tokens, sam_tag};
use crate::BamError;

/// One @PG line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramInfo {
    id: String,
    name: String,
    version: String,
    description: String,
    previous_program_id: String,
    command_line: String,
    custom: BTreeMap<String, String>,
}

impl ProgramInfo {
    pub fn new(id: &str) -> ProgramInfo {
        ProgramInfo {
            id: id.to_string(),
            ..ProgramInfo::default()
        }
    }

    pub fn from_sam(line: &str) -> Result<ProgramInfo, BamError> {
        let mut prog = ProgramInfo::default();
        for (tag, value) in line_tokens(line) {
            match tag {
                "ID" => prog.id = value.to_string(),
                "PN" => prog.name = value.to_string(),
                "VN" => prog.version = value.to_string(),
                "DS" => prog.description = value.to_string(),
                "PP" => prog.previous_program_id = value.to_string(),
                "CL" => prog.command_line = value.to_string(),
                _ => {
                    prog.custom.insert(tag.to_string(), value.to_string());
                }
            }
        }
        Ok(prog)
    }

    pub fn to_sam(&self) -> String {
        let mut out = format!("@PG{}", sam_tag("ID", &self.id));
        if !self.name.is_empty() {
            out.push_str(&sam_tag("PN", &self.name));
        }
        if !self.version.is_empty() {
            out.push_str(&sam_tag("VN", &self.version));
        }
        if !self.description.is_empty() {
            out.push_str(&sam_tag("DS", &self.description));
        }
        if !self.previous_program_id.is_empty() {
            out.push_str(&sam_tag("PP", &self.previous_program_id));
        }
        if !self.command_line.is_empty() {
            out.push_str(&sam_tag("CL", &self.command_line));
        }
        for (tag, value) in &self.custom {
            out.push_str(&sam_tag(tag, value));
        }
        out
    }

    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: &str) -> &mut Self {
        self.id = id.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_string();
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: &str) -> &mut Self {
        self.version = version.to_string();
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) -> &mut Self {
        self.description = description.to_string();
        self
    }

    pub fn previous_program_id(&self) -> &str {
        &self.previous_program_id
    }

    pub fn set_previous_program_id(&mut self, id: &str) -> &mut Self {
        self.previous_program_id = id.to_string();
        self
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn set_command_line(&mut self, cmd: &str) -> &mut Self {
        self.command_line = cmd.to_string();
        self
    }

    pub fn custom_tags(&self) -> &BTreeMap<String, String> {
        &self.custom
    }
}

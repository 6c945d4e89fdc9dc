//! Sequencing chemistry lookup.
//!
//! A (binding kit, sequencing kit, basecaller version) triple resolves to a
//! chemistry name. A mapping table shipped alongside an instrument bundle
//! (`$SMRT_CHEMISTRY_BUNDLE_DIR/chemistry.xml`) overrides the built-in
//! table when present.

use std::sync::Mutex;

use fxhash::FxHashMap;
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::BamError;

pub const CHEMISTRY_BUNDLE_ENV: &str = "SMRT_CHEMISTRY_BUNDLE_DIR";

type ChemistryRow = [String; 4];

// BindingKit, SequencingKit, BasecallerVersion (major.minor), Chemistry
#[rustfmt::skip]
static BUILT_IN_TABLE: &[[&str; 4]] = &[
    // RS
    ["100356300",   "100356200",   "2.1", "P6-C4"],
    ["100356300",   "100356200",   "2.3", "P6-C4"],
    ["100356300",   "100612400",   "2.1", "P6-C4"],
    ["100356300",   "100612400",   "2.3", "P6-C4"],
    ["100372700",   "100356200",   "2.1", "P6-C4"],
    ["100372700",   "100356200",   "2.3", "P6-C4"],
    ["100372700",   "100612400",   "2.1", "P6-C4"],
    ["100372700",   "100612400",   "2.3", "P6-C4"],

    // S/P1-C1/beta
    ["100-619-300", "100-620-000", "3.0", "S/P1-C1/beta"],
    ["100-619-300", "100-620-000", "3.1", "S/P1-C1/beta"],

    // S/P1-C1.1
    ["100-619-300", "100-867-300", "3.1", "S/P1-C1.1"],
    ["100-619-300", "100-867-300", "3.2", "S/P1-C1.1"],
    ["100-619-300", "100-867-300", "3.3", "S/P1-C1.1"],

    // S/P1-C1.2
    ["100-619-300", "100-902-100", "3.1", "S/P1-C1.2"],
    ["100-619-300", "100-902-100", "3.2", "S/P1-C1.2"],
    ["100-619-300", "100-902-100", "3.3", "S/P1-C1.2"],
    ["100-619-300", "100-902-100", "4.0", "S/P1-C1.2"],
    ["100-619-300", "100-902-100", "4.1", "S/P1-C1.2"],

    // S/P1-C1.3
    ["100-619-300", "100-972-200", "3.2", "S/P1-C1.3"],
    ["100-619-300", "100-972-200", "3.3", "S/P1-C1.3"],
    ["100-619-300", "100-972-200", "4.0", "S/P1-C1.3"],
    ["100-619-300", "100-972-200", "4.1", "S/P1-C1.3"],

    // S/P2-C2
    ["100-862-200", "100-861-800", "4.0", "S/P2-C2"],
    ["100-862-200", "100-861-800", "4.1", "S/P2-C2"],
    ["100-862-200", "101-093-700", "4.1", "S/P2-C2"],

    // S/P2-C2/5.0
    ["100-862-200", "100-861-800", "5.0", "S/P2-C2/5.0"],
    ["100-862-200", "101-093-700", "5.0", "S/P2-C2/5.0"],
];

// per-bundle-path cache; loaded once per process for a given path
static ENV_TABLE_CACHE: Lazy<Mutex<FxHashMap<String, Vec<ChemistryRow>>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

fn mapping_error(path: &str, detail: &str) -> BamError {
    BamError::MalformedInput(format!("chemistry mapping '{path}': {detail}"))
}

/// Parses a `MappingTable` XML document into rows of four fields.
pub fn table_from_xml(path: &str, xml: &str) -> Result<Vec<ChemistryRow>, BamError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut table = Vec::new();
    let mut saw_root = false;
    let mut in_mapping = false;
    let mut field: Option<usize> = None;
    let mut row: ChemistryRow = Default::default();
    let mut filled = [false; 4];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let name = name.as_ref();
                if !saw_root {
                    if name != b"MappingTable" {
                        return Err(mapping_error(path, "MappingTable not found"));
                    }
                    saw_root = true;
                } else if name == b"Mapping" {
                    in_mapping = true;
                    row = Default::default();
                    filled = [false; 4];
                } else if in_mapping {
                    field = match name {
                        b"BindingKit" => Some(0),
                        b"SequencingKit" => Some(1),
                        b"SoftwareVersion" => Some(2),
                        b"SequencingChemistry" => Some(3),
                        _ => None,
                    };
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(i) = field {
                    let text = e
                        .unescape()
                        .map_err(|e| mapping_error(path, &e.to_string()))?;
                    row[i] = text.into_owned();
                    filled[i] = true;
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let name = name.as_ref();
                if name == b"Mapping" {
                    if filled != [true; 4] {
                        return Err(mapping_error(path, "Mapping entry is missing fields"));
                    }
                    table.push(std::mem::take(&mut row));
                    in_mapping = false;
                }
                if field.is_some() && name != b"Mapping" {
                    field = None;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(mapping_error(path, &format!("unparseable XML: {e}"))),
        }
    }

    if !saw_root {
        return Err(mapping_error(path, "MappingTable not found"));
    }
    Ok(table)
}

fn env_table() -> Result<Vec<ChemistryRow>, BamError> {
    let dir = match std::env::var(CHEMISTRY_BUNDLE_ENV) {
        Ok(d) if !d.is_empty() => d,
        _ => return Ok(Vec::new()),
    };

    let mut cache = ENV_TABLE_CACHE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(table) = cache.get(&dir) {
        return Ok(table.clone());
    }

    let path = format!("{dir}/chemistry.xml");
    let xml = std::fs::read_to_string(&path).map_err(|_| {
        mapping_error(&path, "SMRT_CHEMISTRY_BUNDLE_DIR defined but file not found")
    })?;
    let table = table_from_xml(&path, &xml)?;
    log::debug!("loaded {} chemistry mappings from {path}", table.len());
    cache.insert(dir, table.clone());
    Ok(table)
}

/// Resolve a chemistry triple to its chemistry name.
///
/// The basecaller version is compared on major.minor only. The bundle
/// override, when present, wins over the built-in table.
pub fn sequencing_chemistry(
    binding_kit: &str,
    sequencing_kit: &str,
    basecaller_version: &str,
) -> Result<String, BamError> {
    let miss = || BamError::InvalidChemistry {
        binding_kit: binding_kit.to_string(),
        sequencing_kit: sequencing_kit.to_string(),
        basecaller_version: basecaller_version.to_string(),
    };

    let mut fields = basecaller_version.split('.');
    let version = match (fields.next(), fields.next()) {
        (Some(major), Some(minor)) => format!("{major}.{minor}"),
        _ => return Err(miss()),
    };

    for row in env_table()? {
        if binding_kit == row[0] && sequencing_kit == row[1] && version == row[2] {
            return Ok(row[3].clone());
        }
    }
    for row in BUILT_IN_TABLE {
        if binding_kit == row[0] && sequencing_kit == row[1] && version == row[2] {
            return Ok(row[3].to_string());
        }
    }
    Err(miss())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_in_lookup() {
        assert_eq!(
            sequencing_chemistry("100372700", "100612400", "2.3").unwrap(),
            "P6-C4"
        );
        // revision digits beyond major.minor are ignored
        assert_eq!(
            sequencing_chemistry("100-862-200", "100-861-800", "5.0.1").unwrap(),
            "S/P2-C2/5.0"
        );
    }

    #[test]
    fn test_lookup_miss() {
        let err = sequencing_chemistry("foo", "bar", "9.9").unwrap_err();
        match err {
            BamError::InvalidChemistry {
                binding_kit,
                sequencing_kit,
                basecaller_version,
            } => {
                assert_eq!(binding_kit, "foo");
                assert_eq!(sequencing_kit, "bar");
                assert_eq!(basecaller_version, "9.9");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_version_rejected() {
        assert!(sequencing_chemistry("100372700", "100612400", "2").is_err());
    }

    #[test]
    fn test_xml_table() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<MappingTable>
  <Mapping>
    <BindingKit>101-490-800</BindingKit>
    <SequencingKit>101-490-900</SequencingKit>
    <SoftwareVersion>5.0</SoftwareVersion>
    <SequencingChemistry>S/P3-C3/5.0</SequencingChemistry>
  </Mapping>
</MappingTable>"#;
        let table = table_from_xml("test.xml", xml).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0][0], "101-490-800");
        assert_eq!(table[0][3], "S/P3-C3/5.0");
    }

    #[test]
    fn test_xml_field_order_free() {
        let xml = "<MappingTable><Mapping>\
            <SequencingChemistry>X</SequencingChemistry>\
            <SoftwareVersion>1.0</SoftwareVersion>\
            <SequencingKit>b</SequencingKit>\
            <BindingKit>a</BindingKit>\
            </Mapping></MappingTable>";
        let table = table_from_xml("test.xml", xml).unwrap();
        assert_eq!(table[0], ["a".to_string(), "b".into(), "1.0".into(), "X".into()]);
    }

    #[test]
    fn test_xml_errors() {
        assert!(table_from_xml("t.xml", "<NotMapping/>").is_err());
        assert!(table_from_xml(
            "t.xml",
            "<MappingTable><Mapping><BindingKit>a</BindingKit></Mapping></MappingTable>"
        )
        .is_err());
    }
}

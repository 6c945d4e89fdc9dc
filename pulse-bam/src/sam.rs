//! SAM text tag codec.
//!
//! Text tags are `NN:T:value` tokens separated by tabs. All integer widths
//! are written as type `i`; on decode the narrowest fitting variant is
//! stored.

use crate::tag::{Tag, TagCollection, TagModifier, TagValue};
use crate::BamError;

fn malformed(token: &str) -> BamError {
    BamError::MalformedInput(format!("malformed SAM tag '{token}'"))
}

fn narrowest_int(text: &str, token: &str) -> Result<Tag, BamError> {
    if text.starts_with('-') {
        let x: i32 = text.parse().map_err(|_| malformed(token))?;
        if x >= i32::from(i8::MIN) {
            Ok(Tag::from(x as i8))
        } else if x >= i32::from(i16::MIN) {
            Ok(Tag::from(x as i16))
        } else {
            Ok(Tag::from(x))
        }
    } else {
        let x: u32 = text.parse().map_err(|_| malformed(token))?;
        if x <= u32::from(u8::MAX) {
            Ok(Tag::from(x as u8))
        } else if x <= u32::from(u16::MAX) {
            Ok(Tag::from(x as u16))
        } else {
            Ok(Tag::from(x))
        }
    }
}

fn parse_array<T>(data: &str, token: &str) -> Result<Vec<T>, BamError>
where
    T: std::str::FromStr,
{
    data.split(',')
        .skip(1) // data starts with the separator after the element type
        .map(|v| v.parse::<T>().map_err(|_| malformed(token)))
        .collect()
}

/// Decode a tab-separated run of SAM tag tokens.
pub fn decode_sam_tags(text: &str) -> Result<TagCollection, BamError> {
    let mut tags = TagCollection::new();
    for token in text.split('\t') {
        if token.is_empty() {
            continue;
        }
        // NN:T:value
        let bytes = token.as_bytes();
        if bytes.len() < 6 || bytes[2] != b':' || bytes[4] != b':' {
            return Err(malformed(token));
        }
        let name = &token[..2];
        let type_char = bytes[3];
        let value = &token[5..];

        let tag = match type_char {
            b'A' | b'a' => {
                let c = value.bytes().next().ok_or_else(|| malformed(token))?;
                Tag::ascii(c)?
            }
            // SAM is more "user-edited" than BAM, so accept explicit width
            // codes here too
            b'c' | b'C' | b's' | b'S' | b'i' | b'I' => narrowest_int(value, token)?,
            b'f' => Tag::from(value.parse::<f32>().map_err(|_| malformed(token))?),
            b'Z' => Tag::from(value),
            b'H' => Tag::with_modifier(value, TagModifier::HexString)?,
            b'B' => {
                let elem = value.bytes().next().ok_or_else(|| malformed(token))?;
                match elem {
                    b'c' => Tag::from(parse_array::<i8>(value, token)?),
                    b'C' => Tag::from(parse_array::<u8>(value, token)?),
                    b's' => Tag::from(parse_array::<i16>(value, token)?),
                    b'S' => Tag::from(parse_array::<u16>(value, token)?),
                    b'i' => Tag::from(parse_array::<i32>(value, token)?),
                    b'I' => Tag::from(parse_array::<u32>(value, token)?),
                    b'f' => Tag::from(parse_array::<f32>(value, token)?),
                    otherwise => {
                        return Err(BamError::UnsupportedFeature(format!(
                            "unknown array element type '{}'",
                            otherwise as char
                        )))
                    }
                }
            }
            otherwise => {
                return Err(BamError::UnsupportedFeature(format!(
                    "unknown tag type '{}'",
                    otherwise as char
                )))
            }
        };
        tags.insert(name.to_string(), tag);
    }
    Ok(tags)
}

fn push_array<T: std::fmt::Display>(out: &mut String, elem: char, values: &[T]) {
    out.push_str("B:");
    out.push(elem);
    for v in values {
        out.push(',');
        out.push_str(&v.to_string());
    }
}

/// Encode a collection as tab-separated SAM tag tokens, sorted by name.
pub fn encode_sam_tags(tags: &TagCollection) -> Result<String, BamError> {
    let mut out = String::new();
    for (name, tag) in tags {
        if name.len() != 2 {
            return Err(BamError::MalformedInput(format!(
                "malformed tag name '{name}'"
            )));
        }
        if tag.is_null() {
            continue;
        }
        if !out.is_empty() {
            out.push('\t');
        }
        out.push_str(name);
        out.push(':');

        if tag.has_modifier(TagModifier::AsciiChar) {
            out.push_str("A:");
            out.push(tag.to_ascii()? as char);
            continue;
        }

        match tag.value() {
            TagValue::Int8(v) => out.push_str(&format!("i:{v}")),
            TagValue::UInt8(v) => out.push_str(&format!("i:{v}")),
            TagValue::Int16(v) => out.push_str(&format!("i:{v}")),
            TagValue::UInt16(v) => out.push_str(&format!("i:{v}")),
            TagValue::Int32(v) => out.push_str(&format!("i:{v}")),
            TagValue::UInt32(v) => out.push_str(&format!("i:{v}")),
            TagValue::Float(v) => out.push_str(&format!("f:{v}")),
            TagValue::String(s) => {
                if tag.has_modifier(TagModifier::HexString) {
                    out.push_str("H:");
                } else {
                    out.push_str("Z:");
                }
                out.push_str(s);
            }
            TagValue::Int8Array(v) => push_array(&mut out, 'c', v),
            TagValue::UInt8Array(v) => push_array(&mut out, 'C', v),
            TagValue::Int16Array(v) => push_array(&mut out, 's', v),
            TagValue::UInt16Array(v) => push_array(&mut out, 'S', v),
            TagValue::Int32Array(v) => push_array(&mut out, 'i', v),
            TagValue::UInt32Array(v) => push_array(&mut out, 'I', v),
            TagValue::FloatArray(v) => push_array(&mut out, 'f', v),
            // nulls were skipped above
            TagValue::Blank => continue,
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_sorted() {
        let mut tags = TagCollection::new();
        tags.insert(
            "HX".to_string(),
            Tag::with_modifier("1abc75", TagModifier::HexString).unwrap(),
        );
        tags.insert("CA".to_string(), Tag::from(vec![34u8, 5, 125]));
        tags.insert("XY".to_string(), Tag::from(-42i32));

        let text = encode_sam_tags(&tags).unwrap();
        assert_eq!(text, "CA:B:C,34,5,125\tHX:H:1abc75\tXY:i:-42");
    }

    #[test]
    fn test_decode_narrowest_width() {
        let tags = decode_sam_tags("aa:i:3\tbb:i:300\tcc:i:70000\tdd:i:-3\tee:i:-300").unwrap();
        assert!(tags["aa"].is_uint8());
        assert!(tags["bb"].is_uint16());
        assert!(tags["cc"].is_uint32());
        assert!(tags["dd"].is_int8());
        assert!(tags["ee"].is_int16());
    }

    #[test]
    fn test_roundtrip_modulo_widening() {
        let text = "CA:B:C,34,5,125\tHX:H:1abc75\tXY:i:-42";
        let tags = decode_sam_tags(text).unwrap();
        assert_eq!(encode_sam_tags(&tags).unwrap(), text);
    }

    #[test]
    fn test_float_and_ascii() {
        let tags = decode_sam_tags("fl:f:1.25\tch:A:!").unwrap();
        assert_eq!(tags["fl"].to_float().unwrap(), 1.25);
        assert_eq!(tags["ch"].to_ascii().unwrap(), b'!');
        assert_eq!(
            encode_sam_tags(&tags).unwrap(),
            "ch:A:!\tfl:f:1.25"
        );
    }

    #[test]
    fn test_malformed_name() {
        assert!(decode_sam_tags("abc:i:1").is_err());

        let mut tags = TagCollection::new();
        tags.insert("abc".to_string(), Tag::from(1u8));
        assert!(encode_sam_tags(&tags).is_err());
    }

    #[test]
    fn test_unsupported_array_type() {
        assert!(matches!(
            decode_sam_tags("aa:B:Z,1,2"),
            Err(BamError::UnsupportedFeature(_))
        ));
    }
}

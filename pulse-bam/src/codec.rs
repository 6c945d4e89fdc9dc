//! Binary (BAM aux block) tag codec.
//!
//! Each wire tag is `[2-char name][type char][payload]`; array payloads are
//! `[elem type char][u32 count][count * elem]`, strings run to a NULL.

use nom::{
    bytes::complete::{take, take_until},
    multi::count,
    number::complete::{le_f32, le_i16, le_i32, le_i8, le_u16, le_u32, le_u8},
    IResult,
};

use byteorder::{ByteOrder, LittleEndian};

use crate::tag::{Tag, TagCollection, TagModifier, TagValue};
use crate::BamError;

fn truncated() -> BamError {
    BamError::MalformedInput("truncated tag data".to_string())
}

/// Parse bytes until encountering NULL (\0)
///
/// Consumes but does not return NULL.
fn null_terminated_bytes(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (i, r) = take_until(&[0u8] as &[u8])(input)?;
    let (i, _) = take(1usize)(i)?;
    Ok((i, r))
}

fn string_value(input: &[u8]) -> Result<(&[u8], String), BamError> {
    let (i, bytes) = null_terminated_bytes(input).map_err(|_| truncated())?;
    let s = std::str::from_utf8(bytes)
        .map_err(|_| BamError::MalformedInput("tag string is not UTF-8".to_string()))?;
    Ok((i, s.to_string()))
}

/// Read an array payload into the matching array variant.
///
/// Consumes element type, length, and data.
fn array_value(input: &[u8]) -> Result<(&[u8], TagValue), BamError> {
    let (i, (elem_type, n)) = (|input| -> IResult<&[u8], (u8, u32)> {
        let (i, elem_type) = le_u8(input)?;
        let (i, n) = le_u32(i)?;
        Ok((i, (elem_type, n)))
    })(input)
    .map_err(|_| truncated())?;

    let n = n as usize;
    let parsed: IResult<&[u8], TagValue> = match elem_type {
        b'c' => count(le_i8, n)(i).map(|(i, v)| (i, TagValue::Int8Array(v))),
        b'C' => count(le_u8, n)(i).map(|(i, v)| (i, TagValue::UInt8Array(v))),
        b's' => count(le_i16, n)(i).map(|(i, v)| (i, TagValue::Int16Array(v))),
        b'S' => count(le_u16, n)(i).map(|(i, v)| (i, TagValue::UInt16Array(v))),
        b'i' => count(le_i32, n)(i).map(|(i, v)| (i, TagValue::Int32Array(v))),
        b'I' => count(le_u32, n)(i).map(|(i, v)| (i, TagValue::UInt32Array(v))),
        b'f' => count(le_f32, n)(i).map(|(i, v)| (i, TagValue::FloatArray(v))),
        otherwise => {
            return Err(BamError::UnsupportedFeature(format!(
                "unknown array element type '{}'",
                otherwise as char
            )))
        }
    };
    parsed.map_err(|_| truncated())
}

/// Decode one payload, dispatching on the leading type character.
fn value_of_type(type_char: u8, input: &[u8]) -> Result<(&[u8], Tag), BamError> {
    fn scalar(r: IResult<&[u8], TagValue>) -> Result<(&[u8], Tag), BamError> {
        r.map(|(i, v)| (i, Tag::from(v))).map_err(|_| truncated())
    }

    match type_char {
        b'A' | b'a' => {
            let (i, v) = le_u8::<_, nom::error::Error<&[u8]>>(input).map_err(|_| truncated())?;
            let mut tag = Tag::from(v);
            tag.set_modifier(TagModifier::AsciiChar)?;
            Ok((i, tag))
        }
        b'c' => scalar(le_i8(input).map(|(i, v)| (i, TagValue::Int8(v)))),
        b'C' => scalar(le_u8(input).map(|(i, v)| (i, TagValue::UInt8(v)))),
        b's' => scalar(le_i16(input).map(|(i, v)| (i, TagValue::Int16(v)))),
        b'S' => scalar(le_u16(input).map(|(i, v)| (i, TagValue::UInt16(v)))),
        b'i' => scalar(le_i32(input).map(|(i, v)| (i, TagValue::Int32(v)))),
        b'I' => scalar(le_u32(input).map(|(i, v)| (i, TagValue::UInt32(v)))),
        b'f' => scalar(le_f32(input).map(|(i, v)| (i, TagValue::Float(v)))),
        b'Z' | b'H' => {
            let (i, s) = string_value(input)?;
            let mut tag = Tag::from(s);
            if type_char == b'H' {
                tag.set_modifier(TagModifier::HexString)?;
            }
            Ok((i, tag))
        }
        b'B' => {
            let (i, v) = array_value(input)?;
            Ok((i, Tag::from(v)))
        }
        otherwise => Err(BamError::UnsupportedFeature(format!(
            "unknown tag type '{}'",
            otherwise as char
        ))),
    }
}

/// Decode a whole tag block into a collection.
///
/// Aborts on the first unknown type code or truncation; nothing partial is
/// returned.
pub fn decode_tags(data: &[u8]) -> Result<TagCollection, BamError> {
    let mut tags = TagCollection::new();
    let mut input = data;
    while !input.is_empty() {
        if input.len() < 3 {
            return Err(truncated());
        }
        let name = std::str::from_utf8(&input[..2])
            .map_err(|_| BamError::MalformedInput("tag name is not UTF-8".to_string()))?
            .to_string();
        let type_char = input[2];
        let (rest, tag) = value_of_type(type_char, &input[3..])?;
        tags.insert(name, tag);
        input = rest;
    }
    Ok(tags)
}

/// Decode a single payload whose leading byte is the type character.
pub fn decode_tag_payload(data: &[u8]) -> Result<Tag, BamError> {
    if data.is_empty() {
        return Err(truncated());
    }
    let (_, tag) = value_of_type(data[0], &data[1..])?;
    Ok(tag)
}

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    let mut b = [0u8; 2];
    LittleEndian::write_u16(&mut b, v);
    buf.extend_from_slice(&b);
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    let mut b = [0u8; 4];
    LittleEndian::write_u32(&mut b, v);
    buf.extend_from_slice(&b);
}

fn put_f32(buf: &mut Vec<u8>, v: f32) {
    let mut b = [0u8; 4];
    LittleEndian::write_f32(&mut b, v);
    buf.extend_from_slice(&b);
}

fn put_array_body<T, F>(buf: &mut Vec<u8>, elems: &[T], mut put: F)
where
    F: FnMut(&mut Vec<u8>, &T),
{
    put_u32(buf, elems.len() as u32);
    for e in elems {
        put(buf, e);
    }
}

/// Wire type code for a tag, honoring the ASCII marker.
pub fn type_code_for(tag: &Tag) -> Result<u8, BamError> {
    if tag.has_modifier(TagModifier::AsciiChar) {
        // validity (integer, printable) checked here
        tag.to_ascii()?;
        return Ok(b'A');
    }
    match tag.value() {
        TagValue::Int8(_) => Ok(b'c'),
        TagValue::UInt8(_) => Ok(b'C'),
        TagValue::Int16(_) => Ok(b's'),
        TagValue::UInt16(_) => Ok(b'S'),
        TagValue::Int32(_) => Ok(b'i'),
        TagValue::UInt32(_) => Ok(b'I'),
        TagValue::Float(_) => Ok(b'f'),
        TagValue::String(_) => {
            if tag.has_modifier(TagModifier::HexString) {
                Ok(b'H')
            } else {
                Ok(b'Z')
            }
        }
        TagValue::Int8Array(_)
        | TagValue::UInt8Array(_)
        | TagValue::Int16Array(_)
        | TagValue::UInt16Array(_)
        | TagValue::Int32Array(_)
        | TagValue::UInt32Array(_)
        | TagValue::FloatArray(_) => Ok(b'B'),
        TagValue::Blank => Err(BamError::UnsupportedFeature(
            "blank tag has no wire type".to_string(),
        )),
    }
}

/// Encode just the payload of a tag (no name, no leading type code).
///
/// For arrays the payload starts with the element type character; for ASCII
/// tags it is the single printable byte.
pub fn encode_tag_payload(tag: &Tag) -> Result<Vec<u8>, BamError> {
    let mut buf = Vec::new();
    if tag.has_modifier(TagModifier::AsciiChar) {
        buf.push(tag.to_ascii()?);
        return Ok(buf);
    }
    match tag.value() {
        TagValue::Int8(v) => buf.push(*v as u8),
        TagValue::UInt8(v) => buf.push(*v),
        TagValue::Int16(v) => put_u16(&mut buf, *v as u16),
        TagValue::UInt16(v) => put_u16(&mut buf, *v),
        TagValue::Int32(v) => put_u32(&mut buf, *v as u32),
        TagValue::UInt32(v) => put_u32(&mut buf, *v),
        TagValue::Float(v) => put_f32(&mut buf, *v),
        TagValue::String(s) => {
            buf.extend_from_slice(s.as_bytes());
            buf.push(0);
        }
        TagValue::Int8Array(v) => {
            buf.push(b'c');
            put_array_body(&mut buf, v, |b, e| b.push(*e as u8));
        }
        TagValue::UInt8Array(v) => {
            buf.push(b'C');
            put_array_body(&mut buf, v, |b, e| b.push(*e));
        }
        TagValue::Int16Array(v) => {
            buf.push(b's');
            put_array_body(&mut buf, v, |b, e| put_u16(b, *e as u16));
        }
        TagValue::UInt16Array(v) => {
            buf.push(b'S');
            put_array_body(&mut buf, v, |b, e| put_u16(b, *e));
        }
        TagValue::Int32Array(v) => {
            buf.push(b'i');
            put_array_body(&mut buf, v, |b, e| put_u32(b, *e as u32));
        }
        TagValue::UInt32Array(v) => {
            buf.push(b'I');
            put_array_body(&mut buf, v, |b, e| put_u32(b, *e));
        }
        TagValue::FloatArray(v) => {
            buf.push(b'f');
            put_array_body(&mut buf, v, |b, e| put_f32(b, *e));
        }
        TagValue::Blank => {
            return Err(BamError::UnsupportedFeature(
                "blank tag has no wire form".to_string(),
            ))
        }
    }
    Ok(buf)
}

/// Encode a collection in sorted name order.
///
/// Sorted output keeps encoding bytewise-stable across round trips.
pub fn encode_tags(tags: &TagCollection) -> Result<Vec<u8>, BamError> {
    let mut buf = Vec::with_capacity(tags.len() * 8);
    for (name, tag) in tags {
        if name.len() != 2 {
            return Err(BamError::MalformedInput(format!(
                "malformed tag name '{name}'"
            )));
        }
        if tag.is_null() {
            continue;
        }
        buf.extend_from_slice(name.as_bytes());
        buf.push(type_code_for(tag)?);
        buf.extend_from_slice(&encode_tag_payload(tag)?);
    }
    Ok(buf)
}

/// Index just past the payload whose type character sits at `type_pos`.
///
/// Used to walk the tag block without materializing values.
pub(crate) fn payload_end(block: &[u8], type_pos: usize) -> Result<usize, BamError> {
    let type_char = *block.get(type_pos).ok_or_else(truncated)?;
    let start = type_pos + 1;
    let end = match type_char {
        b'A' | b'a' | b'c' | b'C' => start + 1,
        b's' | b'S' => start + 2,
        b'i' | b'I' | b'f' => start + 4,
        b'Z' | b'H' => {
            let nul = block[start..]
                .iter()
                .position(|b| *b == 0)
                .ok_or_else(truncated)?;
            start + nul + 1
        }
        b'B' => {
            let elem_type = *block.get(start).ok_or_else(truncated)?;
            let elem_size = match elem_type {
                b'c' | b'C' => 1,
                b's' | b'S' => 2,
                b'i' | b'I' | b'f' => 4,
                otherwise => {
                    return Err(BamError::UnsupportedFeature(format!(
                        "unknown array element type '{}'",
                        otherwise as char
                    )))
                }
            };
            if block.len() < start + 5 {
                return Err(truncated());
            }
            let n = LittleEndian::read_u32(&block[start + 1..start + 5]) as usize;
            start + 5 + n * elem_size
        }
        otherwise => {
            return Err(BamError::UnsupportedFeature(format!(
                "unknown tag type '{}'",
                otherwise as char
            )))
        }
    };
    if end > block.len() {
        return Err(truncated());
    }
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_collection() -> TagCollection {
        let mut tags = TagCollection::new();
        tags.insert(
            "HX".to_string(),
            Tag::with_modifier("1abc75", TagModifier::HexString).unwrap(),
        );
        tags.insert("CA".to_string(), Tag::from(vec![34u8, 5, 125]));
        tags.insert("XY".to_string(), Tag::from(-42i32));
        tags
    }

    #[test]
    fn test_encode_known_bytes() {
        let encoded = encode_tags(&sample_collection()).unwrap();
        let expected: Vec<u8> = vec![
            b'C', b'A', b'B', b'C', 0x03, 0x00, 0x00, 0x00, 0x22, 0x05, 0x7D, // CA
            b'H', b'X', b'H', 0x31, 0x61, 0x62, 0x63, 0x37, 0x35, 0x00, // HX
            b'X', b'Y', b'i', 0xD6, 0xFF, 0xFF, 0xFF, // XY
        ];
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_roundtrip() {
        let tags = sample_collection();
        let encoded = encode_tags(&tags).unwrap();
        let decoded = decode_tags(&encoded).unwrap();
        assert_eq!(decoded, tags);

        // bytewise-stable under re-encode
        assert_eq!(encode_tags(&decoded).unwrap(), encoded);
    }

    #[test]
    fn test_ascii_tag() {
        let mut tags = TagCollection::new();
        tags.insert("ZC".to_string(), Tag::ascii(b'!').unwrap());
        let encoded = encode_tags(&tags).unwrap();
        assert_eq!(encoded, vec![b'Z', b'C', b'A', b'!']);
        assert_eq!(decode_tags(&encoded).unwrap(), tags);
    }

    #[test]
    fn test_unknown_type_aborts() {
        let data = vec![b'X', b'Y', b'q', 0x00];
        assert!(matches!(
            decode_tags(&data),
            Err(BamError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_unknown_array_elem_aborts() {
        let data = vec![b'X', b'Y', b'B', b'Z', 0x01, 0x00, 0x00, 0x00, 0x00];
        assert!(matches!(
            decode_tags(&data),
            Err(BamError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_truncated_input() {
        let data = vec![b'X', b'Y', b'i', 0x01, 0x02];
        assert!(matches!(
            decode_tags(&data),
            Err(BamError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_payload_helpers() {
        let tag = Tag::from(vec![1i16, -2, 3]);
        let payload = encode_tag_payload(&tag).unwrap();
        let mut with_type = vec![b'B'];
        with_type.extend_from_slice(&payload);
        assert_eq!(decode_tag_payload(&with_type).unwrap(), tag);
    }

    #[test]
    fn test_payload_end_walk() {
        let encoded = encode_tags(&sample_collection()).unwrap();
        // first entry: name at 0..2, type char at 2
        let end = payload_end(&encoded, 2).unwrap();
        assert_eq!(&encoded[end..end + 2], b"HX");
    }

    #[test]
    fn test_blank_tags_skipped() {
        let mut tags = TagCollection::new();
        tags.insert("aa".to_string(), Tag::default());
        tags.insert("bb".to_string(), Tag::from(7u8));
        let encoded = encode_tags(&tags).unwrap();
        assert_eq!(encoded, vec![b'b', b'b', b'C', 7]);
    }
}

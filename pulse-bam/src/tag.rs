use std::collections::BTreeMap;

use crate::BamError;

/// Display/encoding hint carried alongside a tag value.
///
/// `AsciiChar` is only valid over integer values in [33, 126]; `HexString`
/// only over string values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TagModifier {
    #[default]
    None,
    AsciiChar,
    HexString,
}

/// The value payload of an auxiliary tag.
///
/// See SAM v1 section 4.2.4; arrays (`B` type) exist for every numeric
/// element type, but not for strings.
#[derive(Clone, Debug, PartialEq)]
pub enum TagValue {
    Blank,
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Float(f32),
    String(String),
    Int8Array(Vec<i8>),
    UInt8Array(Vec<u8>),
    Int16Array(Vec<i16>),
    UInt16Array(Vec<u16>),
    Int32Array(Vec<i32>),
    UInt32Array(Vec<u32>),
    FloatArray(Vec<f32>),
}

/// An auxiliary tag value plus its modifier.
///
/// Equality is structural and includes the modifier.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tag {
    value: TagValue,
    modifier: TagModifier,
}

impl Default for TagValue {
    fn default() -> TagValue {
        TagValue::Blank
    }
}

impl Tag {
    pub fn new(value: impl Into<Tag>) -> Tag {
        value.into()
    }

    /// Builds a tag with a modifier, enforcing the modifier validity rules.
    pub fn with_modifier(value: impl Into<Tag>, modifier: TagModifier) -> Result<Tag, BamError> {
        let mut tag = value.into();
        tag.set_modifier(modifier)?;
        Ok(tag)
    }

    /// The canonical way to produce a SAM `A` tag.
    pub fn ascii(c: u8) -> Result<Tag, BamError> {
        Tag::with_modifier(TagValue::UInt8(c), TagModifier::AsciiChar)
    }

    pub fn value(&self) -> &TagValue {
        &self.value
    }

    pub fn modifier(&self) -> TagModifier {
        self.modifier
    }

    pub fn has_modifier(&self, modifier: TagModifier) -> bool {
        self.modifier == modifier
    }

    pub fn set_modifier(&mut self, modifier: TagModifier) -> Result<(), BamError> {
        match modifier {
            TagModifier::None => {}
            TagModifier::AsciiChar => {
                // only integers in the printable range may carry the marker
                self.to_ascii().map_err(|_| {
                    BamError::InvalidValue("ASCII modifier requires an integer in [33, 126]".into())
                })?;
            }
            TagModifier::HexString => {
                if !self.is_string() {
                    return Err(BamError::InvalidValue(
                        "hex-string modifier requires a string value".into(),
                    ));
                }
            }
        }
        self.modifier = modifier;
        Ok(())
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, TagValue::Blank)
    }

    pub fn is_int8(&self) -> bool {
        matches!(self.value, TagValue::Int8(_))
    }

    pub fn is_uint8(&self) -> bool {
        matches!(self.value, TagValue::UInt8(_))
    }

    pub fn is_int16(&self) -> bool {
        matches!(self.value, TagValue::Int16(_))
    }

    pub fn is_uint16(&self) -> bool {
        matches!(self.value, TagValue::UInt16(_))
    }

    pub fn is_int32(&self) -> bool {
        matches!(self.value, TagValue::Int32(_))
    }

    pub fn is_uint32(&self) -> bool {
        matches!(self.value, TagValue::UInt32(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self.value, TagValue::Float(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self.value, TagValue::String(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.value,
            TagValue::Int8(_)
                | TagValue::UInt8(_)
                | TagValue::Int16(_)
                | TagValue::UInt16(_)
                | TagValue::Int32(_)
                | TagValue::UInt32(_)
        )
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self.value,
            TagValue::Int8Array(_)
                | TagValue::UInt8Array(_)
                | TagValue::Int16Array(_)
                | TagValue::UInt16Array(_)
                | TagValue::Int32Array(_)
                | TagValue::UInt32Array(_)
                | TagValue::FloatArray(_)
        )
    }

    pub fn is_uint8_array(&self) -> bool {
        matches!(self.value, TagValue::UInt8Array(_))
    }

    pub fn is_uint16_array(&self) -> bool {
        matches!(self.value, TagValue::UInt16Array(_))
    }

    pub fn is_uint32_array(&self) -> bool {
        matches!(self.value, TagValue::UInt32Array(_))
    }

    pub fn is_float_array(&self) -> bool {
        matches!(self.value, TagValue::FloatArray(_))
    }

    /// Element count for arrays and strings, 1 for scalars, 0 for blanks.
    pub fn len(&self) -> usize {
        match &self.value {
            TagValue::Blank => 0,
            TagValue::String(s) => s.len(),
            TagValue::Int8Array(v) => v.len(),
            TagValue::UInt8Array(v) => v.len(),
            TagValue::Int16Array(v) => v.len(),
            TagValue::UInt16Array(v) => v.len(),
            TagValue::Int32Array(v) => v.len(),
            TagValue::UInt32Array(v) => v.len(),
            TagValue::FloatArray(v) => v.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn integer_value(&self) -> Result<i64, BamError> {
        match self.value {
            TagValue::Int8(v) => Ok(i64::from(v)),
            TagValue::UInt8(v) => Ok(i64::from(v)),
            TagValue::Int16(v) => Ok(i64::from(v)),
            TagValue::UInt16(v) => Ok(i64::from(v)),
            TagValue::Int32(v) => Ok(i64::from(v)),
            TagValue::UInt32(v) => Ok(i64::from(v)),
            _ => Err(BamError::InvalidValue(
                "tag value is not an integer".into(),
            )),
        }
    }

    pub fn to_i8(&self) -> Result<i8, BamError> {
        let v = self.integer_value()?;
        i8::try_from(v).map_err(|_| out_of_range(v, "int8"))
    }

    pub fn to_u8(&self) -> Result<u8, BamError> {
        let v = self.integer_value()?;
        u8::try_from(v).map_err(|_| out_of_range(v, "uint8"))
    }

    pub fn to_i16(&self) -> Result<i16, BamError> {
        let v = self.integer_value()?;
        i16::try_from(v).map_err(|_| out_of_range(v, "int16"))
    }

    pub fn to_u16(&self) -> Result<u16, BamError> {
        let v = self.integer_value()?;
        u16::try_from(v).map_err(|_| out_of_range(v, "uint16"))
    }

    pub fn to_i32(&self) -> Result<i32, BamError> {
        let v = self.integer_value()?;
        i32::try_from(v).map_err(|_| out_of_range(v, "int32"))
    }

    pub fn to_u32(&self) -> Result<u32, BamError> {
        let v = self.integer_value()?;
        u32::try_from(v).map_err(|_| out_of_range(v, "uint32"))
    }

    pub fn to_ascii(&self) -> Result<u8, BamError> {
        let v = self.integer_value()?;
        if (33..=126).contains(&v) {
            Ok(v as u8)
        } else {
            Err(BamError::InvalidValue(format!(
                "integer value {v} is not a printable ASCII character"
            )))
        }
    }

    pub fn to_float(&self) -> Result<f32, BamError> {
        match self.value {
            TagValue::Float(v) => Ok(v),
            _ => Err(exact_type_mismatch("float")),
        }
    }

    pub fn to_str(&self) -> Result<&str, BamError> {
        match &self.value {
            TagValue::String(s) => Ok(s),
            _ => Err(exact_type_mismatch("string")),
        }
    }

    pub fn to_i8_array(&self) -> Result<&[i8], BamError> {
        match &self.value {
            TagValue::Int8Array(v) => Ok(v),
            _ => Err(exact_type_mismatch("int8 array")),
        }
    }

    pub fn to_u8_array(&self) -> Result<&[u8], BamError> {
        match &self.value {
            TagValue::UInt8Array(v) => Ok(v),
            _ => Err(exact_type_mismatch("uint8 array")),
        }
    }

    pub fn to_i16_array(&self) -> Result<&[i16], BamError> {
        match &self.value {
            TagValue::Int16Array(v) => Ok(v),
            _ => Err(exact_type_mismatch("int16 array")),
        }
    }

    pub fn to_u16_array(&self) -> Result<&[u16], BamError> {
        match &self.value {
            TagValue::UInt16Array(v) => Ok(v),
            _ => Err(exact_type_mismatch("uint16 array")),
        }
    }

    pub fn to_i32_array(&self) -> Result<&[i32], BamError> {
        match &self.value {
            TagValue::Int32Array(v) => Ok(v),
            _ => Err(exact_type_mismatch("int32 array")),
        }
    }

    pub fn to_u32_array(&self) -> Result<&[u32], BamError> {
        match &self.value {
            TagValue::UInt32Array(v) => Ok(v),
            _ => Err(exact_type_mismatch("uint32 array")),
        }
    }

    pub fn to_float_array(&self) -> Result<&[f32], BamError> {
        match &self.value {
            TagValue::FloatArray(v) => Ok(v),
            _ => Err(exact_type_mismatch("float array")),
        }
    }
}

fn out_of_range(value: i64, target: &str) -> BamError {
    BamError::InvalidValue(format!("integer value {value} out of {target} range"))
}

fn exact_type_mismatch(expected: &str) -> BamError {
    BamError::InvalidValue(format!("tag value is not a {expected}"))
}

impl From<TagValue> for Tag {
    fn from(value: TagValue) -> Tag {
        Tag {
            value,
            modifier: TagModifier::None,
        }
    }
}

macro_rules! tag_from {
    ($src:ty, $variant:ident) => {
        impl From<$src> for Tag {
            fn from(value: $src) -> Tag {
                Tag::from(TagValue::$variant(value))
            }
        }
    };
}

tag_from!(i8, Int8);
tag_from!(u8, UInt8);
tag_from!(i16, Int16);
tag_from!(u16, UInt16);
tag_from!(i32, Int32);
tag_from!(u32, UInt32);
tag_from!(f32, Float);
tag_from!(String, String);
tag_from!(Vec<i8>, Int8Array);
tag_from!(Vec<u8>, UInt8Array);
tag_from!(Vec<i16>, Int16Array);
tag_from!(Vec<u16>, UInt16Array);
tag_from!(Vec<i32>, Int32Array);
tag_from!(Vec<u32>, UInt32Array);
tag_from!(Vec<f32>, FloatArray);

impl From<&str> for Tag {
    fn from(value: &str) -> Tag {
        Tag::from(TagValue::String(value.to_string()))
    }
}

/// Two-character tag names mapped to values; iteration (and hence wire
/// output) is in sorted name order.
pub type TagCollection = BTreeMap<String, Tag>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widening() {
        let t = Tag::from(-42i8);
        assert_eq!(t.to_i8().unwrap(), -42);
        assert_eq!(t.to_i16().unwrap(), -42);
        assert_eq!(t.to_i32().unwrap(), -42);
        assert!(t.to_u8().is_err());
    }

    #[test]
    fn test_integer_narrowing() {
        let t = Tag::from(300u16);
        assert!(t.to_u8().is_err());
        assert_eq!(t.to_u16().unwrap(), 300);
        assert_eq!(t.to_i16().unwrap(), 300);
    }

    #[test]
    fn test_exact_match_conversions() {
        let t = Tag::from(1.5f32);
        assert_eq!(t.to_float().unwrap(), 1.5);
        assert!(t.to_i32().is_err());
        assert!(Tag::from(1i32).to_float().is_err());

        let t = Tag::from(vec![1u16, 2]);
        assert_eq!(t.to_u16_array().unwrap(), &[1, 2]);
        assert!(t.to_u32_array().is_err());
    }

    #[test]
    fn test_ascii_marker() {
        let t = Tag::ascii(b'!').unwrap();
        assert!(t.has_modifier(TagModifier::AsciiChar));
        assert_eq!(t.to_ascii().unwrap(), b'!');

        // out of printable range
        assert!(Tag::with_modifier(10u8, TagModifier::AsciiChar).is_err());
        // non-integer
        assert!(Tag::with_modifier("x", TagModifier::AsciiChar).is_err());
    }

    #[test]
    fn test_hex_marker() {
        assert!(Tag::with_modifier("1abc75", TagModifier::HexString).is_ok());
        assert!(Tag::with_modifier(7i32, TagModifier::HexString).is_err());
    }

    #[test]
    fn test_equality_includes_modifier() {
        let plain = Tag::from(b'A');
        let marked = Tag::ascii(b'A').unwrap();
        assert_ne!(plain, marked);
        assert_eq!(marked, Tag::ascii(b'A').unwrap());
    }

    #[test]
    fn test_null() {
        let t = Tag::default();
        assert!(t.is_null());
        assert_eq!(t.len(), 0);
    }
}

//! Column name codecs
//!
//! Column metadata is keyed by packed bytes, so a display-form column name has
//! to be encoded with the family's comparator before it can be compared against
//! remote metadata.

use chrono::{DateTime, SecondsFormat, Utc};
use num_bigint::BigInt;
use uuid::Uuid;

use crate::schema::{SchemaError, SchemaResult};

/// Separator between components of a composite display name.
///
/// There is no escape: a component containing `:` must go through
/// `Codec::pack_components`.
pub const COMPOSITE_SEPARATOR: char = ':';

/// Prefix that marks a `BytesType` display name as hex
pub const HEX_PREFIX: &str = "0x";

/// Encoder / decoder for one marshal type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Codec {
    /// Raw bytes. The display form is the name's own bytes, or hex after `0x`
    Bytes,
    Ascii,
    Utf8,
    /// 8-byte big-endian signed integer
    Long,
    /// 4-byte big-endian signed integer
    Int32,
    /// Arbitrary-precision two's-complement integer
    Integer,
    Uuid,
    /// Version 1 UUID
    TimeUuid,
    LexicalUuid,
    Boolean,
    Double,
    Float,
    /// Milliseconds since the epoch
    Date,
    /// Reversed ordering; same bytes as the inner type
    Reversed(Box<Codec>),
    Composite(Vec<Codec>),
}

impl Codec {
    /// Short type name, for messages
    pub fn type_name(&self) -> String {
        match self {
            Codec::Bytes => "BytesType".into(),
            Codec::Ascii => "AsciiType".into(),
            Codec::Utf8 => "UTF8Type".into(),
            Codec::Long => "LongType".into(),
            Codec::Int32 => "Int32Type".into(),
            Codec::Integer => "IntegerType".into(),
            Codec::Uuid => "UUIDType".into(),
            Codec::TimeUuid => "TimeUUIDType".into(),
            Codec::LexicalUuid => "LexicalUUIDType".into(),
            Codec::Boolean => "BooleanType".into(),
            Codec::Double => "DoubleType".into(),
            Codec::Float => "FloatType".into(),
            Codec::Date => "DateType".into(),
            Codec::Reversed(inner) => format!("ReversedType({})", inner.type_name()),
            Codec::Composite(parts) => format!(
                "CompositeType({})",
                parts.iter().map(Codec::type_name).collect::<Vec<_>>().join(",")
            ),
        }
    }

    /// Encodes a display-form name into its packed bytes
    pub fn pack(&self, display: &str) -> SchemaResult<Vec<u8>> {
        let invalid = |reason: &str| SchemaError::invalid_column_name(display, self.type_name(), reason);

        match self {
            Codec::Bytes => match display.strip_prefix(HEX_PREFIX) {
                Some(hex) => decode_hex(hex).ok_or_else(|| invalid("expected hex digits after 0x")),
                None => Ok(display.as_bytes().to_vec()),
            },
            Codec::Ascii => {
                if display.is_ascii() {
                    Ok(display.as_bytes().to_vec())
                } else {
                    Err(invalid("non-ASCII character"))
                }
            }
            Codec::Utf8 => Ok(display.as_bytes().to_vec()),
            Codec::Long => display
                .trim()
                .parse::<i64>()
                .map(|n| n.to_be_bytes().to_vec())
                .map_err(|e| invalid(&e.to_string())),
            Codec::Int32 => display
                .trim()
                .parse::<i32>()
                .map(|n| n.to_be_bytes().to_vec())
                .map_err(|e| invalid(&e.to_string())),
            Codec::Integer => display
                .trim()
                .parse::<BigInt>()
                .map(|n| n.to_signed_bytes_be())
                .map_err(|e| invalid(&e.to_string())),
            Codec::Uuid | Codec::LexicalUuid => Uuid::parse_str(display.trim())
                .map(|u| u.as_bytes().to_vec())
                .map_err(|e| invalid(&e.to_string())),
            Codec::TimeUuid => {
                let uuid = Uuid::parse_str(display.trim()).map_err(|e| invalid(&e.to_string()))?;
                if uuid.get_version_num() != 1 {
                    return Err(invalid("not a version 1 UUID"));
                }
                Ok(uuid.as_bytes().to_vec())
            }
            Codec::Boolean => match display.trim() {
                "true" => Ok(vec![1]),
                "false" => Ok(vec![0]),
                _ => Err(invalid("expected 'true' or 'false'")),
            },
            Codec::Double => display
                .trim()
                .parse::<f64>()
                .map(|n| n.to_be_bytes().to_vec())
                .map_err(|e| invalid(&e.to_string())),
            Codec::Float => display
                .trim()
                .parse::<f32>()
                .map(|n| n.to_be_bytes().to_vec())
                .map_err(|e| invalid(&e.to_string())),
            Codec::Date => {
                let trimmed = display.trim();
                let millis = match trimmed.parse::<i64>() {
                    Ok(millis) => millis,
                    Err(_) => DateTime::parse_from_rfc3339(trimmed)
                        .map(|dt| dt.timestamp_millis())
                        .map_err(|e| invalid(&e.to_string()))?,
                };
                Ok(millis.to_be_bytes().to_vec())
            }
            Codec::Reversed(inner) => inner.pack(display),
            Codec::Composite(_) => {
                let components: Vec<&str> = display.split(COMPOSITE_SEPARATOR).collect();
                self.pack_components(&components)
            }
        }
    }

    /// Packs already-split composite components, which may contain the
    /// separator. Any other codec takes exactly one component.
    pub fn pack_components(&self, components: &[&str]) -> SchemaResult<Vec<u8>> {
        let parts = match self {
            Codec::Composite(parts) => parts,
            Codec::Reversed(inner) => return inner.pack_components(components),
            single => {
                return match components {
                    [one] => single.pack(one),
                    _ => Err(SchemaError::invalid_column_name(
                        components.join(&COMPOSITE_SEPARATOR.to_string()),
                        self.type_name(),
                        "expected a single component",
                    )),
                }
            }
        };

        let display = components.join(&COMPOSITE_SEPARATOR.to_string());
        let invalid = |reason: &str| SchemaError::invalid_column_name(&display, self.type_name(), reason);
        if components.len() > parts.len() {
            return Err(invalid("more components than the comparator declares"));
        }

        let mut out = Vec::new();
        for (codec, component) in parts.iter().zip(components) {
            let packed = codec.pack(component)?;
            let len = u16::try_from(packed.len()).map_err(|_| invalid("component too long"))?;
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(&packed);
            out.push(0);
        }
        Ok(out)
    }

    /// Decodes packed bytes into the display form accepted by `pack`
    pub fn unpack(&self, bytes: &[u8]) -> SchemaResult<String> {
        let invalid = |reason: &str| SchemaError::invalid_column_name(encode_hex(bytes), self.type_name(), reason);

        match self {
            Codec::Bytes => match std::str::from_utf8(bytes) {
                Ok(text) if !text.starts_with(HEX_PREFIX) && !text.chars().any(char::is_control) => {
                    Ok(text.to_string())
                }
                _ => Ok(format!("{}{}", HEX_PREFIX, encode_hex(bytes))),
            },
            Codec::Ascii => {
                if bytes.is_ascii() {
                    Ok(String::from_utf8_lossy(bytes).into_owned())
                } else {
                    Err(invalid("non-ASCII byte"))
                }
            }
            Codec::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| invalid(&e.to_string())),
            Codec::Long => fixed::<8>(bytes)
                .map(|b| i64::from_be_bytes(b).to_string())
                .ok_or_else(|| invalid("expected 8 bytes")),
            Codec::Int32 => fixed::<4>(bytes)
                .map(|b| i32::from_be_bytes(b).to_string())
                .ok_or_else(|| invalid("expected 4 bytes")),
            Codec::Integer => {
                if bytes.is_empty() {
                    return Err(invalid("empty integer"));
                }
                Ok(BigInt::from_signed_bytes_be(bytes).to_string())
            }
            Codec::Uuid | Codec::TimeUuid | Codec::LexicalUuid => Uuid::from_slice(bytes)
                .map(|u| u.to_string())
                .map_err(|e| invalid(&e.to_string())),
            Codec::Boolean => match bytes {
                [0] => Ok("false".into()),
                [_] => Ok("true".into()),
                _ => Err(invalid("expected 1 byte")),
            },
            Codec::Double => fixed::<8>(bytes)
                .map(|b| f64::from_be_bytes(b).to_string())
                .ok_or_else(|| invalid("expected 8 bytes")),
            Codec::Float => fixed::<4>(bytes)
                .map(|b| f32::from_be_bytes(b).to_string())
                .ok_or_else(|| invalid("expected 4 bytes")),
            Codec::Date => {
                let millis = fixed::<8>(bytes)
                    .map(i64::from_be_bytes)
                    .ok_or_else(|| invalid("expected 8 bytes"))?;
                DateTime::<Utc>::from_timestamp_millis(millis)
                    .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
                    .ok_or_else(|| invalid("timestamp out of range"))
            }
            Codec::Reversed(inner) => inner.unpack(bytes),
            Codec::Composite(parts) => {
                let mut rest = bytes;
                let mut components = Vec::new();
                for codec in parts {
                    if rest.is_empty() {
                        break;
                    }
                    let len = fixed::<2>(rest.get(..2).unwrap_or_default())
                        .map(u16::from_be_bytes)
                        .ok_or_else(|| invalid("truncated component length"))? as usize;
                    let component = rest
                        .get(2..2 + len)
                        .ok_or_else(|| invalid("truncated component"))?;
                    // one end-of-component byte follows every component
                    if rest.len() < 3 + len {
                        return Err(invalid("missing end-of-component byte"));
                    }
                    components.push(codec.unpack(component)?);
                    rest = &rest[3 + len..];
                }
                if !rest.is_empty() {
                    return Err(invalid("trailing bytes"));
                }
                Ok(components.join(&COMPOSITE_SEPARATOR.to_string()))
            }
        }
    }
}

fn fixed<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
    bytes.try_into().ok()
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    let digits = s.as_bytes();
    if digits.len() % 2 != 0 || !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| std::str::from_utf8(pair).ok().and_then(|p| u8::from_str_radix(p, 16).ok()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_and_ascii() {
        assert_eq!(Codec::Utf8.pack("naïve").unwrap(), "naïve".as_bytes());
        assert!(Codec::Ascii.pack("naïve").is_err());
        assert_eq!(Codec::Ascii.pack("name").unwrap(), b"name");
    }

    #[test]
    fn test_long_is_big_endian() {
        assert_eq!(Codec::Long.pack("1").unwrap(), vec![0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(Codec::Long.unpack(&[0xFF; 8]).unwrap(), "-1");
        assert!(Codec::Long.pack("one").is_err());
    }

    #[test]
    fn test_varint_is_minimal() {
        assert_eq!(Codec::Integer.pack("0").unwrap(), vec![0x00]);
        assert_eq!(Codec::Integer.pack("127").unwrap(), vec![0x7F]);
        assert_eq!(Codec::Integer.pack("128").unwrap(), vec![0x00, 0x80]);
        assert_eq!(Codec::Integer.pack("-1").unwrap(), vec![0xFF]);
        assert_eq!(Codec::Integer.pack("-129").unwrap(), vec![0xFF, 0x7F]);
        assert_eq!(Codec::Integer.unpack(&[0xFF, 0x7F]).unwrap(), "-129");
        assert_eq!(Codec::Integer.unpack(&[0x00, 0x80]).unwrap(), "128");
    }

    #[test]
    fn test_integer_beyond_64_bits() {
        let max = i64::MAX.to_string();
        assert_eq!(Codec::Integer.pack(&max).unwrap(), i64::MAX.to_be_bytes().to_vec());
        assert_eq!(Codec::Integer.pack(&i64::MIN.to_string()).unwrap(), i64::MIN.to_be_bytes().to_vec());

        let above = "9223372036854775808";
        let packed = Codec::Integer.pack(above).unwrap();
        assert_eq!(packed, vec![0x00, 0x80, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(Codec::Integer.unpack(&packed).unwrap(), above);

        let below = "-9223372036854775809";
        let packed = Codec::Integer.pack(below).unwrap();
        assert_eq!(packed, vec![0xFF, 0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(Codec::Integer.unpack(&packed).unwrap(), below);

        let huge = "123456789012345678901234567890";
        assert_eq!(Codec::Integer.unpack(&Codec::Integer.pack(huge).unwrap()).unwrap(), huge);
        assert!(Codec::Integer.unpack(&[]).is_err());
        assert!(Codec::Integer.pack("12x").is_err());
    }

    #[test]
    fn test_time_uuid_requires_version_1() {
        let v1 = "d2177dd0-eaa2-11de-a572-001b779c76e3";
        assert_eq!(Codec::TimeUuid.pack(v1).unwrap().len(), 16);

        let v4 = Uuid::new_v4().to_string();
        assert!(Codec::TimeUuid.pack(&v4).is_err());
        assert!(Codec::Uuid.pack(&v4).is_ok());
    }

    #[test]
    fn test_bytes_packs_name_verbatim() {
        assert_eq!(Codec::Bytes.pack("name").unwrap(), b"name");
        assert_eq!(Codec::Bytes.pack("abc").unwrap(), b"abc");
        assert_eq!(Codec::Bytes.unpack(b"name").unwrap(), "name");
    }

    #[test]
    fn test_bytes_hex_needs_prefix() {
        assert_eq!(Codec::Bytes.pack("0xcafe").unwrap(), vec![0xCA, 0xFE]);
        assert_eq!(Codec::Bytes.unpack(&[0xCA, 0xFE]).unwrap(), "0xcafe");
        assert!(Codec::Bytes.pack("0xabc").is_err());
        assert!(Codec::Bytes.pack("0xzz").is_err());
        // from_str_radix alone would take the sign
        assert!(Codec::Bytes.pack("0x+f+f").is_err());
    }

    #[test]
    fn test_bytes_that_look_like_hex_stay_distinct() {
        let packed = Codec::Bytes.pack("0x").unwrap();
        assert!(packed.is_empty());

        let literal = b"0xcafe";
        let display = Codec::Bytes.unpack(literal).unwrap();
        assert_eq!(display, "0x307863616665");
        assert_eq!(Codec::Bytes.pack(&display).unwrap(), literal.to_vec());
    }

    #[test]
    fn test_date_accepts_millis_and_rfc3339() {
        let from_millis = Codec::Date.pack("1000").unwrap();
        let from_text = Codec::Date.pack("1970-01-01T00:00:01Z").unwrap();
        assert_eq!(from_millis, from_text);
        assert_eq!(Codec::Date.unpack(&from_millis).unwrap(), "1970-01-01T00:00:01.000Z");
    }

    #[test]
    fn test_boolean() {
        assert_eq!(Codec::Boolean.pack("true").unwrap(), vec![1]);
        assert_eq!(Codec::Boolean.unpack(&[0]).unwrap(), "false");
        assert!(Codec::Boolean.pack("yes").is_err());
    }

    #[test]
    fn test_composite_layout() {
        let codec = Codec::Composite(vec![Codec::Utf8, Codec::Long]);
        let packed = codec.pack("a:1").unwrap();
        assert_eq!(
            packed,
            vec![0, 1, b'a', 0, 0, 8, 0, 0, 0, 0, 0, 0, 0, 1, 0]
        );
        assert_eq!(codec.unpack(&packed).unwrap(), "a:1");

        // prefixes are allowed, extra components are not
        assert_eq!(codec.pack("a").unwrap(), vec![0, 1, b'a', 0]);
        assert!(codec.pack("a:1:2").is_err());
        assert!(codec.unpack(&[0, 5, b'a']).is_err());
    }

    #[test]
    fn test_composite_components_may_contain_separator() {
        let codec = Codec::Composite(vec![Codec::Utf8, Codec::Utf8]);
        let packed = codec.pack_components(&["10:30", "x"]).unwrap();
        assert_eq!(packed, vec![0, 5, b'1', b'0', b':', b'3', b'0', 0, 0, 1, b'x', 0]);

        // the display form splits on every separator
        assert!(codec.pack("10:30:x").is_err());
        assert!(codec.pack_components(&["a", "b", "c"]).is_err());
    }

    #[test]
    fn test_single_codec_takes_one_component() {
        assert_eq!(Codec::Utf8.pack_components(&["a:b"]).unwrap(), b"a:b");
        assert!(Codec::Utf8.pack_components(&["a", "b"]).is_err());
    }

    #[test]
    fn test_reversed_packs_like_inner() {
        let codec = Codec::Reversed(Box::new(Codec::Int32));
        assert_eq!(codec.pack("7").unwrap(), Codec::Int32.pack("7").unwrap());
        assert_eq!(codec.type_name(), "ReversedType(Int32Type)");
    }
}

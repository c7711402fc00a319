//! Marshal type name parsing
//!
//! Accepts short (`UTF8Type`) and qualified
//! (`org.apache.cassandra.db.marshal.UTF8Type`) names, plus the parameterised
//! `ReversedType(X)` and `CompositeType(A,B,...)` forms, nested arbitrarily.

use crate::schema::{SchemaError, SchemaResult};

use super::codec::Codec;

/// Returns the codec for a marshal type name
pub fn codec_for(type_name: &str) -> SchemaResult<Codec> {
    let name = type_name.trim();
    let (head, params) = split_head(name)?;
    let short = head.rsplit('.').next().unwrap_or(head);

    let codec = match (short, params) {
        ("ReversedType", Some(inner)) => Codec::Reversed(Box::new(codec_for(inner)?)),
        ("CompositeType", Some(inner)) => {
            let components = split_params(inner)?
                .into_iter()
                .map(codec_for)
                .collect::<SchemaResult<Vec<_>>>()?;
            if components.is_empty() {
                return Err(SchemaError::UnsupportedType(type_name.to_string()));
            }
            Codec::Composite(components)
        }
        (_, Some(_)) => return Err(SchemaError::UnsupportedType(type_name.to_string())),
        ("BytesType", None) => Codec::Bytes,
        ("AsciiType", None) => Codec::Ascii,
        ("UTF8Type", None) => Codec::Utf8,
        ("LongType", None) | ("CounterColumnType", None) => Codec::Long,
        ("Int32Type", None) => Codec::Int32,
        ("IntegerType", None) => Codec::Integer,
        ("UUIDType", None) => Codec::Uuid,
        ("TimeUUIDType", None) => Codec::TimeUuid,
        ("LexicalUUIDType", None) => Codec::LexicalUuid,
        ("BooleanType", None) => Codec::Boolean,
        ("DoubleType", None) => Codec::Double,
        ("FloatType", None) => Codec::Float,
        ("DateType", None) => Codec::Date,
        _ => return Err(SchemaError::UnsupportedType(type_name.to_string())),
    };
    Ok(codec)
}

/// Splits `Head(params)` into its parts
fn split_head(name: &str) -> SchemaResult<(&str, Option<&str>)> {
    match name.find('(') {
        None => Ok((name, None)),
        Some(open) if name.ends_with(')') => Ok((&name[..open], Some(&name[open + 1..name.len() - 1]))),
        Some(_) => Err(SchemaError::UnsupportedType(name.to_string())),
    }
}

/// Splits a parameter list on top-level commas
fn split_params(params: &str) -> SchemaResult<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in params.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| SchemaError::UnsupportedType(params.to_string()))?;
            }
            ',' if depth == 0 => {
                parts.push(params[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(SchemaError::UnsupportedType(params.to_string()));
    }

    let last = params[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    Ok(parts)
}

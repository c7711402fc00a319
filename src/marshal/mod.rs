//! Marshal types
//!
//! Maps comparator / validator type names onto codecs that convert display-form
//! column names into the packed bytes the cluster uses as metadata identity.

mod codec;
mod parser;

pub use codec::{Codec, COMPOSITE_SEPARATOR, HEX_PREFIX};
pub use parser::codec_for;

use crate::schema::SchemaResult;

/// Packs `column` with the codec named by `type_name`
pub fn pack_column_name(type_name: &str, column: &str) -> SchemaResult<Vec<u8>> {
    codec_for(type_name)?.pack(column)
}

/// Renders a packed column name for display
pub fn unpack_column_name(type_name: &str, packed: &[u8]) -> SchemaResult<String> {
    codec_for(type_name)?.unpack(packed)
}

//! Column metadata editing
//!
//! Replaces or inserts one `ColumnDef` inside a column family definition,
//! leaving every other column untouched. Entries are matched by packed name,
//! so the display name is first encoded with the family's column name type.

use super::errors::SchemaResult;
use super::qualify::qualify_type_name;
use super::types::{ColumnDef, ColumnFamilyDef, IndexType};
use crate::marshal::pack_column_name;

/// Requested change to one optional field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit<T> {
    /// Leave the current value alone
    Keep,
    Set(T),
    Clear,
}

impl<T> Default for FieldEdit<T> {
    fn default() -> Self {
        FieldEdit::Keep
    }
}

impl<T> FieldEdit<T> {
    /// `Some` sets, `None` clears. Never `Keep`.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldEdit::Set(v),
            None => FieldEdit::Clear,
        }
    }

    fn apply(self, slot: &mut Option<T>) {
        match self {
            FieldEdit::Keep => {}
            FieldEdit::Set(v) => *slot = Some(v),
            FieldEdit::Clear => *slot = None,
        }
    }
}

/// Edits applied to a single column's metadata
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnEdit {
    /// Short or qualified marshal type name
    pub validation_class: FieldEdit<String>,
    pub index_type: FieldEdit<IndexType>,
    pub index_name: FieldEdit<String>,
}

impl ColumnEdit {
    /// Index the column. The index name is always written, `None` clearing it.
    pub fn create_index(data_type: Option<&str>, index_type: IndexType, index_name: Option<&str>) -> Self {
        Self {
            validation_class: data_type.map_or(FieldEdit::Keep, |t| FieldEdit::Set(t.to_string())),
            index_type: FieldEdit::Set(index_type),
            index_name: FieldEdit::from_option(index_name.map(str::to_string)),
        }
    }

    /// Remove the index, keeping the validation class
    pub fn drop_index() -> Self {
        Self {
            validation_class: FieldEdit::Keep,
            index_type: FieldEdit::Clear,
            index_name: FieldEdit::Clear,
        }
    }

    /// Change only the validation class
    pub fn alter_type(data_type: &str) -> Self {
        Self {
            validation_class: FieldEdit::Set(data_type.to_string()),
            ..Default::default()
        }
    }
}

/// Applies `edit` to the metadata of `column` and returns the updated family.
///
/// An existing entry is removed and re-appended with the edit applied, so the
/// entry count only grows when the column had no metadata before.
pub fn edit_column(mut cf_def: ColumnFamilyDef, column: &str, edit: ColumnEdit) -> SchemaResult<ColumnFamilyDef> {
    let packed = pack_column_name(cf_def.column_name_type(), column)?;

    let mut col_def = match cf_def.column_metadata.iter().position(|c| c.name == packed) {
        Some(index) => cf_def.column_metadata.remove(index),
        None => ColumnDef::named(packed),
    };

    let validation_class = match edit.validation_class {
        FieldEdit::Set(name) => FieldEdit::from_option(qualify_type_name(Some(&name))),
        other => other,
    };
    validation_class.apply(&mut col_def.validation_class);
    edit.index_type.apply(&mut col_def.index_type);
    edit.index_name.apply(&mut col_def.index_name);

    cf_def.column_metadata.push(col_def);
    Ok(cf_def)
}

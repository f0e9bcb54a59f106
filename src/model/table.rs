//! Tabular list responses.

use crate::generate::{Fill, GenResult, Generator};
use crate::model::meta::{ListMeta, TypeMeta};
use crate::model::runtime::RawExtension;
use crate::{impl_fill, impl_object};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// One column of a [`Table`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumnDefinition {
    /// Column title.
    pub name: String,
    /// OpenAPI type of the cells.
    #[serde(rename = "type")]
    pub column_type: String,
    /// OpenAPI format of the cells.
    pub format: String,
    /// Human-readable description.
    pub description: String,
    /// Display priority; zero is highest.
    pub priority: i32,
}

impl_fill!(TableColumnDefinition {
    name,
    column_type,
    format,
    description,
    priority
});

/// A condition attached to a row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRowCondition {
    /// Condition type.
    #[serde(rename = "type")]
    pub condition_type: String,
    /// `True`, `False` or `Unknown`.
    pub status: String,
    /// Machine-readable reason.
    pub reason: String,
    /// Human-readable message.
    pub message: String,
}

impl_fill!(TableRowCondition {
    condition_type,
    status,
    reason,
    message
});

/// A single table cell.
///
/// Text formats write the bare JSON value. Binary formats write a tagged
/// variant since they cannot discover the shape of the next value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Cell {
    /// No value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Text.
    String(String),
    /// Nested list.
    List(Vec<Cell>),
    /// Nested object.
    Map(BTreeMap<String, Cell>),
}

#[derive(Deserialize)]
#[serde(rename = "Cell")]
enum TaggedCell {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<Cell>),
    Map(BTreeMap<String, Cell>),
}

impl From<TaggedCell> for Cell {
    fn from(tagged: TaggedCell) -> Self {
        match tagged {
            TaggedCell::Null => Self::Null,
            TaggedCell::Bool(b) => Self::Bool(b),
            TaggedCell::Int(i) => Self::Int(i),
            TaggedCell::String(s) => Self::String(s),
            TaggedCell::List(l) => Self::List(l),
            TaggedCell::Map(m) => Self::Map(m),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            return match self {
                Self::Null => serializer.serialize_unit(),
                Self::Bool(b) => serializer.serialize_bool(*b),
                Self::Int(i) => serializer.serialize_i64(*i),
                Self::String(s) => serializer.serialize_str(s),
                Self::List(l) => serializer.collect_seq(l),
                Self::Map(m) => serializer.collect_map(m),
            };
        }
        match self {
            Self::Null => serializer.serialize_unit_variant("Cell", 0, "Null"),
            Self::Bool(b) => serializer.serialize_newtype_variant("Cell", 1, "Bool", b),
            Self::Int(i) => serializer.serialize_newtype_variant("Cell", 2, "Int", i),
            Self::String(s) => serializer.serialize_newtype_variant("Cell", 3, "String", s),
            Self::List(l) => serializer.serialize_newtype_variant("Cell", 4, "List", l),
            Self::Map(m) => serializer.serialize_newtype_variant("Cell", 5, "Map", m),
        }
    }
}

struct CellVisitor;

impl<'de> Visitor<'de> for CellVisitor {
    type Value = Cell;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, a boolean, an integer, a string, a list or an object")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Cell, E> {
        Ok(Cell::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Cell, E> {
        Ok(Cell::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Cell, D::Error> {
        Cell::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Cell, E> {
        Ok(Cell::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Cell, E> {
        Ok(Cell::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Cell, E> {
        match i64::try_from(v) {
            Ok(i) => Ok(Cell::Int(i)),
            Err(_) => Err(E::invalid_value(de::Unexpected::Unsigned(v), &self)),
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Cell, E> {
        Err(E::invalid_type(de::Unexpected::Float(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Cell, E> {
        Ok(Cell::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Cell, E> {
        Ok(Cell::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Cell, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Cell::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Cell, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some((key, value)) = map.next_entry()? {
            entries.insert(key, value);
        }
        Ok(Cell::Map(entries))
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(CellVisitor)
        } else {
            TaggedCell::deserialize(deserializer).map(Self::from)
        }
    }
}

impl Fill for Cell {
    fn fill(&mut self, g: &mut Generator<'_, '_>) -> GenResult<()> {
        // scalar cells only; nesting is left to customizers
        *self = match g.cursor().get_int()? % 4 {
            0 => Self::Null,
            1 => Self::Bool(g.cursor().get_bool()?),
            2 => Self::Int(g.cursor().get_i64()?),
            _ => {
                let mut s = String::new();
                g.generate(&mut s)?;
                Self::String(s)
            },
        };
        Ok(())
    }
}

/// One row of a [`Table`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    /// Cell values, one per column.
    pub cells: Vec<Cell>,
    /// Row conditions.
    pub conditions: Option<Vec<TableRowCondition>>,
    /// The full object the row describes, if requested.
    pub object: RawExtension,
}

impl_fill!(TableRow {
    cells,
    conditions,
    object
});

/// A tabular rendering of a list of objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Type tag.
    pub type_meta: TypeMeta,
    /// List metadata.
    pub metadata: ListMeta,
    /// Column headers.
    pub column_definitions: Vec<TableColumnDefinition>,
    /// Rows.
    pub rows: Vec<TableRow>,
}

impl_fill!(Table {
    type_meta,
    metadata,
    column_definitions,
    rows
});
impl_object!(Table);

/// Options for requesting a [`Table`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableOptions {
    /// Type tag.
    pub type_meta: TypeMeta,
    /// Omit column headers. Never sent on the wire.
    #[serde(skip)]
    pub no_headers: bool,
    /// `None`, `Object` or `Metadata`.
    pub include_object: String,
}

impl_fill!(TableOptions {
    type_meta,
    no_headers,
    include_object
});
impl_object!(TableOptions);

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn sample_row() -> TableRow {
        let mut map = BTreeMap::new();
        map.insert("k".to_owned(), Cell::String("v".to_owned()));
        TableRow {
            cells: vec![
                Cell::String("name".to_owned()),
                Cell::Int(-4),
                Cell::Bool(true),
                Cell::Map(map),
                Cell::List(vec![Cell::Int(1), Cell::Int(2)]),
                Cell::Null,
            ],
            conditions: None,
            object: RawExtension::default(),
        }
    }

    #[test]
    fn test_cells_are_bare_json_values() {
        let json = serde_json::to_string(&sample_row().cells).unwrap();
        assert_eq!(json, r#"["name",-4,true,{"k":"v"},[1,2],null]"#);
    }

    #[test]
    fn test_row_survives_json() {
        let row = sample_row();
        let json = serde_json::to_vec(&row).unwrap();
        let back: TableRow = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_row_survives_bincode() {
        let row = sample_row();
        let config = bincode::config::standard();
        let bytes = bincode::serde::encode_to_vec(&row, config).unwrap();
        let (back, _): (TableRow, usize) =
            bincode::serde::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_fractional_cell_is_rejected() {
        assert!(serde_json::from_str::<Cell>("1.5").is_err());
    }

    #[test]
    fn test_no_headers_is_not_serialized() {
        let options = TableOptions {
            no_headers: true,
            ..TableOptions::default()
        };
        let json = serde_json::to_vec(&options).unwrap();
        let back: TableOptions = serde_json::from_slice(&json).unwrap();
        assert!(!back.no_headers);
    }
}

//! Customizers for table kinds.

use super::Customizers;
use crate::generate::{GenResult, Generator};
use crate::model::{Cell, TableOptions, TableRow};
use std::collections::BTreeMap;

pub(super) fn register(customizers: &mut Customizers) {
    customizers.register::<TableOptions, _>(table_options);
    customizers.register::<TableRow, _>(table_row);
}

/// `no_headers` never reaches the wire, so it stays false.
pub fn table_options(o: &mut TableOptions, g: &mut Generator<'_, '_>) -> GenResult<()> {
    g.generate_default(o)?;
    o.no_headers = false;
    Ok(())
}

/// A row whose cells are strings, small integers, booleans, string maps or
/// integer lists. Empty conditions end up absent.
pub fn table_row(r: &mut TableRow, g: &mut Generator<'_, '_>) -> GenResult<()> {
    g.generate(&mut r.object)?;
    g.generate(&mut r.conditions)?;
    if r.conditions.as_ref().is_some_and(Vec::is_empty) {
        r.conditions = None;
    }

    let n = g.cursor().get_int()?;
    let len = if n > 0 { n % 10 } else { 0 };
    let mut cells = Vec::with_capacity(len);
    for _ in 0..len {
        cells.push(cell(g)?);
    }
    r.cells = cells;
    Ok(())
}

fn cell(g: &mut Generator<'_, '_>) -> GenResult<Cell> {
    let max = g.limits().max_string_len;
    let cell = match g.cursor().get_int()? % 5 {
        0 => Cell::String(g.cursor().get_string(max)?),
        1 => Cell::Int(g.cursor().get_int()? as i64),
        2 => Cell::Bool(g.cursor().get_bool()?),
        3 => {
            let entries = g.cursor().get_int()? % 10 + 2;
            let mut map = BTreeMap::new();
            for _ in 0..entries {
                let key = g.cursor().get_string(max)?;
                let value = g.cursor().get_string(max)?;
                map.insert(key, Cell::String(value));
            }
            Cell::Map(map)
        },
        _ => {
            let len = g.cursor().get_int()? % 10;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(Cell::Int(g.cursor().get_int()? as i64));
            }
            Cell::List(items)
        },
    };
    Ok(cell)
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::super::test_support::{bytes, defaults, generate};
    use super::*;
    use crate::generate::GeneratorLimits;

    #[test]
    fn test_table_options_never_hide_headers() {
        let customizers = defaults();
        for seed in 0..16 {
            let o: TableOptions = generate(&customizers, &bytes(seed)).unwrap();
            assert!(!o.no_headers);
            assert!(o.type_meta.is_empty());
        }
    }

    #[test]
    fn test_table_row_shapes() {
        let customizers = defaults();
        for seed in 0..32 {
            let Ok(row) = generate::<TableRow>(&customizers, &bytes(seed)) else {
                continue;
            };
            assert!(row.cells.len() < 10);
            assert!(row.conditions.as_ref().is_none_or(|c| !c.is_empty()));
            assert!(!row.object.raw.is_empty());
            for cell in &row.cells {
                match cell {
                    Cell::String(_) | Cell::Bool(_) => {},
                    Cell::Int(v) => assert!((0..256).contains(v)),
                    Cell::Map(map) => {
                        assert!(!map.is_empty());
                        assert!(map.values().all(|v| matches!(v, Cell::String(_))));
                    },
                    Cell::List(items) => {
                        assert!(items.len() < 10);
                        assert!(items.iter().all(|v| matches!(v, Cell::Int(_))));
                    },
                    Cell::Null => panic!("generated a null cell"),
                }
            }
        }
    }

    #[test]
    fn test_cell_kinds_follow_selector_byte() {
        let customizers = defaults();
        let data = [2u8, 1, 4, 3, 7, 8, 9];
        let mut g = Generator::new(&data, &customizers, GeneratorLimits::default());
        assert_eq!(cell(&mut g).unwrap(), Cell::Bool(true));
        assert_eq!(
            cell(&mut g).unwrap(),
            Cell::List(vec![Cell::Int(7), Cell::Int(8), Cell::Int(9)])
        );
    }
}

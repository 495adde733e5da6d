//! Entity trait: rows with a stable store-assigned id.

use std::collections::BTreeMap;

/// A persisted record identified by its `SERIAL` id.
///
/// Two entities with the same id are the same record, whatever their other
/// fields say.
pub trait Entity {
    type Id: Copy + Ord + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    fn id(&self) -> Self::Id;
}

/// Insert `row` into an id-keyed table, returning the row it replaced.
pub fn upsert_row<E: Entity>(table: &mut BTreeMap<E::Id, E>, row: E) -> Option<E> {
    table.insert(row.id(), row)
}

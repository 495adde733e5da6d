//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are compared by their attribute values.
/// `Money { cents: 999 }` is a value object; a `Product` with an id is an entity.
///
/// To "modify" a value object, build a new one (see `Money::checked_add`).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

//! Pure record-to-graph converters.
//!
//! Each function maps one typed provider record to one entity or
//! relationship. No I/O happens here; steps decide whether a target is known
//! and pass that in.

pub mod authorization;
pub mod database;
pub mod directory;
pub mod network;
pub mod storage;

use nimbus_core::{Entity, Relationship, RelationshipClass, TargetFilter};
use serde::Serialize;

/// Filter property the graph store resolves mapped targets by
pub const KEY_FILTER: &str = "_key";

fn raw<T: Serialize>(record: &T) -> serde_json::Value {
    serde_json::to_value(record).unwrap_or(serde_json::Value::Null)
}

/// `from` -> target, direct when the target is known in job state and
/// mapped by key otherwise
pub fn direct_or_mapped(
    class: RelationshipClass,
    from: &Entity,
    to_key: &str,
    to_type: &str,
    target_known: bool,
) -> Relationship {
    if target_known {
        Relationship::direct_by_key(class, &from.key, &from.entity_type, to_key, to_type)
    } else {
        Relationship::mapped(
            class,
            from,
            TargetFilter::new(to_type)
                .with_filter(KEY_FILTER, to_key)
                .skip_target_creation(true),
        )
    }
}

/// `parent HAS child` between two entities in hand
pub fn has(parent: &Entity, child: &Entity) -> Relationship {
    Relationship::direct(RelationshipClass::Has, parent, child)
}

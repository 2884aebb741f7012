//! Flattening of a message type into the list of types it is dispatched as.

use std::{any::TypeId, collections::HashMap, sync::Arc};

use lazy_static::lazy_static;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::type_tag::TypeTag;

lazy_static! {
    static ref HIERARCHY_CACHE: RwLock<HashMap<TypeId, Arc<[TypeTag]>>> =
        RwLock::new(HashMap::new());
}

/// Returns `tag` followed by each of its base types, nearest first.
///
/// The result is computed once per type and shared by every bus in the
/// process. Two threads racing on the same type both compute it and the
/// last insert wins; the result is the same either way.
pub fn resolve(tag: TypeTag) -> Arc<[TypeTag]> {
    if let Some(hierarchy) = HIERARCHY_CACHE.read().get(&tag.id()) {
        return hierarchy.clone();
    }

    let hierarchy = flatten(tag);
    HIERARCHY_CACHE
        .write()
        .insert(tag.id(), hierarchy.clone());

    hierarchy
}

fn flatten(tag: TypeTag) -> Arc<[TypeTag]> {
    let mut hierarchy: SmallVec<[TypeTag; 4]> = SmallVec::new();
    let mut current = Some(tag);

    while let Some(tag) = current {
        if hierarchy.contains(&tag) {
            log::warn!("message type {} extends itself; hierarchy cut", tag);
            break;
        }

        hierarchy.push(tag);
        current = tag.base();
    }

    hierarchy.into_iter().collect()
}

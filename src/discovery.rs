//! Binding of a target's handler table to descriptors.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, Weak},
};

use lazy_static::lazy_static;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::{
    descriptor::{HandlerDescriptor, ProducerDescriptor, SlotKey, WeakTarget},
    dispatch::Context,
    error::Result,
    handler::{HandlerTable, Subscriber},
    type_tag::TypeTag,
    Message,
};

pub(crate) type HandlerSet = SmallVec<[Arc<HandlerDescriptor>; 4]>;

lazy_static! {
    static ref TABLE_CACHE: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>> =
        RwLock::new(HashMap::new());
}

/// Descriptors for every subscriber and producer of one target.
#[derive(Default)]
pub(crate) struct Discovered {
    pub subscribers: Vec<(TypeTag, HandlerSet)>,
    pub producers: Vec<(TypeTag, Arc<ProducerDescriptor>)>,
}

fn table<T: Subscriber>() -> Result<Arc<HandlerTable<T>>> {
    let cached = TABLE_CACHE.read().get(&TypeId::of::<T>()).cloned();
    if let Some(table) = cached.and_then(|t| t.downcast::<HandlerTable<T>>().ok()) {
        return Ok(table);
    }

    let table = Arc::new(HandlerTable::<T>::describe()?);
    TABLE_CACHE
        .write()
        .insert(TypeId::of::<T>(), table.clone());

    Ok(table)
}

fn liveness<T: Subscriber>(target: &Arc<T>) -> WeakTarget {
    let weak: Weak<T> = Arc::downgrade(target);
    weak
}

/// Builds fresh descriptors for `target`. Two calls for the same target
/// produce descriptors with equal keys.
pub(crate) fn discover<T: Subscriber>(target: &Arc<T>) -> Result<Discovered> {
    let table = table::<T>()?;
    let owner = std::any::type_name::<T>();
    let mut discovered = Discovered::default();

    for slot in &table.subscribers {
        let weak = Arc::downgrade(target);
        let call = slot.call.clone();
        let name = slot.name;

        let descriptor = Arc::new(HandlerDescriptor::new(
            SlotKey::new(target, slot.message, slot.name),
            slot.message,
            owner,
            liveness(target),
            Box::new(move |msg: &dyn Message, ctx: &Context| match weak.upgrade() {
                Some(target) => call(&target, msg, ctx),
                None => {
                    log::trace!("{}::{} target dropped; skipped", owner, name);
                    Ok(())
                }
            }),
        ));

        match discovered
            .subscribers
            .iter_mut()
            .find(|(tag, _)| *tag == slot.message)
        {
            Some((_, set)) => set.push(descriptor),
            None => discovered
                .subscribers
                .push((slot.message, smallvec::smallvec![descriptor])),
        }
    }

    for slot in &table.producers {
        let weak = Arc::downgrade(target);
        let call = slot.call.clone();

        let descriptor = Arc::new(ProducerDescriptor::new(
            SlotKey::new(target, slot.message, slot.name),
            slot.message,
            owner,
            liveness(target),
            Box::new(move || match weak.upgrade() {
                Some(target) => call(&target),
                None => Ok(None),
            }),
        ));

        discovered.producers.push((slot.message, descriptor));
    }

    Ok(discovered)
}

use std::{any::TypeId, collections::HashMap, sync::Arc};

use crate::{
    descriptor::ProducerDescriptor,
    discovery::{Discovered, HandlerSet},
    error::{Error, Result},
    type_tag::TypeTag,
};

/// A producer together with the handlers it must replay its value to.
pub(crate) type Replay = (Arc<ProducerDescriptor>, HandlerSet);

/// Handlers and producers of one bus, keyed by message type.
///
/// Handler sets keep registration order and hold at most one descriptor per
/// key. Empty sets are dropped so that unregistering a target leaves the
/// registry as it was before the target was registered. Descriptors whose
/// target was dropped without being unregistered are evicted lazily, the
/// next time their message type is touched.
#[derive(Default)]
pub(crate) struct Registry {
    handlers_by_type: HashMap<TypeId, HandlerSet>,
    producers_by_type: HashMap<TypeId, Arc<ProducerDescriptor>>,
}

impl Registry {
    #[inline]
    pub fn handlers(&self, tag: &TypeTag) -> Option<&HandlerSet> {
        self.handlers_by_type.get(&tag.id())
    }

    #[inline]
    pub fn producer(&self, tag: &TypeTag) -> Option<&Arc<ProducerDescriptor>> {
        self.producers_by_type.get(&tag.id())
    }

    /// Number of handlers for `tag` whose target is alive.
    pub fn handler_count(&self, tag: &TypeTag) -> usize {
        self.handlers(tag)
            .map_or(0, |set| set.iter().filter(|h| h.is_alive()).count())
    }

    pub fn has_producer(&self, tag: &TypeTag) -> bool {
        self.producer(tag).map_or(false, |p| p.is_alive())
    }

    /// Whether no live handler or producer is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers_by_type
            .values()
            .all(|set| set.iter().all(|h| !h.is_alive()))
            && self.producers_by_type.values().all(|p| !p.is_alive())
    }

    /// Evicts the handlers of `tag` whose target is gone and returns the rest.
    pub fn live_handlers(&mut self, tag: &TypeTag) -> Option<&HandlerSet> {
        self.prune_handlers(tag);
        self.handlers(tag)
    }

    fn prune_handlers(&mut self, tag: &TypeTag) {
        let set = match self.handlers_by_type.get_mut(&tag.id()) {
            Some(set) => set,
            None => return,
        };

        set.retain(|h| {
            if h.is_alive() {
                return true;
            }

            log::trace!("{:?} target dropped; evicted", h);
            h.invalidate();
            false
        });

        if set.is_empty() {
            self.handlers_by_type.remove(&tag.id());
        }
    }

    fn prune_producer(&mut self, tag: &TypeTag) {
        if self.producer(tag).map_or(true, |p| p.is_alive()) {
            return;
        }

        if let Some(producer) = self.producers_by_type.remove(&tag.id()) {
            log::debug!("{:?} target dropped; evicted", producer);
            producer.invalidate();
        }
    }

    /// Installs every producer of `discovered`, or none of them if one
    /// message type already has a producer.
    ///
    /// Returns the handlers already subscribed to each new producer's type.
    pub fn install_producers(&mut self, discovered: &Discovered) -> Result<Vec<Replay>> {
        for (tag, producer) in &discovered.producers {
            self.prune_producer(tag);

            if let Some(existing) = self.producer(tag) {
                log::warn!(
                    "duplicate producer for {}: {:?} conflicts with {:?}",
                    tag,
                    producer,
                    existing
                );

                return Err(Error::duplicate_producer(
                    *tag,
                    producer.owner_type(),
                    existing.owner_type(),
                ));
            }
        }

        let mut replays = Vec::new();

        for (tag, producer) in &discovered.producers {
            self.producers_by_type.insert(tag.id(), producer.clone());

            if let Some(handlers) = self.live_handlers(tag) {
                if !handlers.is_empty() {
                    replays.push((producer.clone(), handlers.clone()));
                }
            }
        }

        Ok(replays)
    }

    /// Adds the handlers of `discovered`; a handler whose key is already
    /// present is left as registered.
    ///
    /// Returns, per message type with a valid producer, the registered
    /// descriptors of the handlers just discovered.
    pub fn add_handlers(&mut self, discovered: &Discovered) -> Vec<Replay> {
        let mut replays = Vec::new();

        for (tag, found) in &discovered.subscribers {
            self.prune_handlers(tag);
            self.prune_producer(tag);

            let set = self.handlers_by_type.entry(tag.id()).or_default();
            let mut registered = HandlerSet::new();

            for handler in found {
                match set.iter().find(|h| h.key() == handler.key()) {
                    Some(existing) => registered.push(existing.clone()),
                    None => {
                        set.push(handler.clone());
                        registered.push(handler.clone());
                    }
                }
            }

            if let Some(producer) = self.producer(tag) {
                if producer.is_valid() && !registered.is_empty() {
                    replays.push((producer.clone(), registered));
                }
            }
        }

        replays
    }

    /// Invalidates and removes the handlers and producers of `discovered`.
    ///
    /// Nothing is removed unless every one of them is currently registered.
    pub fn remove(&mut self, discovered: &Discovered, target: &str) -> Result<()> {
        for (tag, found) in &discovered.subscribers {
            let set = self
                .handlers(tag)
                .ok_or_else(|| Error::missing_subscriber(target))?;

            if !found
                .iter()
                .all(|handler| set.iter().any(|h| h.key() == handler.key()))
            {
                return Err(Error::missing_subscriber(target));
            }
        }

        for (tag, producer) in &discovered.producers {
            match self.producer(tag) {
                Some(existing) if existing.key() == producer.key() => (),
                _ => return Err(Error::missing_producer(target)),
            }
        }

        for (tag, found) in &discovered.subscribers {
            if let Some(set) = self.handlers_by_type.get_mut(&tag.id()) {
                set.retain(|h| {
                    let removed = found.iter().any(|handler| handler.key() == h.key());
                    if removed {
                        h.invalidate();
                    }

                    !removed
                });

                if set.is_empty() {
                    self.handlers_by_type.remove(&tag.id());
                }
            }
        }

        for (tag, _) in &discovered.producers {
            if let Some(producer) = self.producers_by_type.remove(&tag.id()) {
                producer.invalidate();
            }
        }

        Ok(())
    }
}

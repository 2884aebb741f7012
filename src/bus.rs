use core::fmt;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use parking_lot::{Mutex, RwLock};

use crate::{
    builder::BusBuilder,
    discovery::discover,
    dispatch::Context,
    error::Result,
    handler::Subscriber,
    hierarchy,
    msgs::DeadMessage,
    registry::{Registry, Replay},
    thread::ThreadEnforcer,
    Message, TypeTag,
};

pub const DEFAULT_IDENTIFIER: &str = "default";

type DeadMessageListener = Arc<dyn Fn(&DeadMessage) + Send + Sync>;

/// Handle returned by [`Bus::on_dead_message`], used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

pub(crate) struct BusInner {
    identifier: String,
    enforcer: ThreadEnforcer,
    registry: Mutex<Registry>,
    dead_listeners: RwLock<Vec<(ListenerId, DeadMessageListener)>>,
    next_listener: AtomicUsize,
}

impl BusInner {
    pub(crate) fn new(identifier: String, enforcer: ThreadEnforcer) -> Self {
        Self {
            identifier,
            enforcer,
            registry: Mutex::new(Registry::default()),
            dead_listeners: RwLock::new(Vec::new()),
            next_listener: AtomicUsize::new(0),
        }
    }
}

/// A synchronous message bus.
///
/// Cloning is cheap and every clone refers to the same bus. Messages are
/// delivered on the posting thread before [`Bus::post`] returns, to the
/// subscribers of the message's type and of each type it extends.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Bus {
    /// A bus with the default identifier that accepts calls from any thread.
    pub fn new() -> Self {
        Self::from_inner(BusInner::new(
            DEFAULT_IDENTIFIER.to_string(),
            ThreadEnforcer::default(),
        ))
    }

    #[inline]
    pub fn build() -> BusBuilder {
        BusBuilder::new()
    }

    pub(crate) fn from_inner(inner: BusInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    #[inline]
    pub fn identifier(&self) -> &str {
        &self.inner.identifier
    }

    #[inline]
    pub fn thread_enforcer(&self) -> &ThreadEnforcer {
        &self.inner.enforcer
    }

    /// Whether both handles refer to the same bus.
    #[inline]
    pub fn ptr_eq(&self, other: &Bus) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Registers the subscriber and producer methods of `target`.
    ///
    /// A new producer immediately delivers its value to the subscribers
    /// already registered for its type, and every new subscriber immediately
    /// receives the value of an already registered producer of its type.
    /// Registration is not checked against the thread policy.
    pub fn register<T: Subscriber>(&self, target: &Arc<T>) -> Result<()> {
        Context::new(self.clone()).register(target)
    }

    /// Removes every subscriber and producer of `target`.
    ///
    /// Fails without changing anything when one of them is not registered.
    pub fn unregister<T: Subscriber>(&self, target: &Arc<T>) -> Result<()> {
        self.unregister_with(target)
    }

    #[inline]
    pub fn post<M: Message>(&self, msg: M) -> Result<()> {
        self.post_arc(Arc::new(msg))
    }

    pub fn post_arc(&self, msg: Arc<dyn Message>) -> Result<()> {
        Context::new(self.clone()).post_arc(msg)
    }

    /// Calls `listener` for every message that was posted with no subscriber
    /// and whose [`DeadMessage`] found no subscriber either.
    pub fn on_dead_message<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&DeadMessage) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner
            .dead_listeners
            .write()
            .push((id, Arc::new(listener)));

        id
    }

    /// Returns `false` if no listener had this id.
    pub fn remove_dead_message_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.dead_listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);

        listeners.len() != before
    }

    /// Number of subscribers registered for exactly `M` whose target is alive.
    pub fn handler_count<M: Message>(&self) -> usize {
        self.inner.registry.lock().handler_count(&TypeTag::of::<M>())
    }

    /// Whether a producer of exactly `M` is registered and its target is alive.
    pub fn has_producer<M: Message>(&self) -> bool {
        self.inner.registry.lock().has_producer(&TypeTag::of::<M>())
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.registry.lock().is_empty()
    }

    pub(crate) fn register_with<T: Subscriber>(&self, ctx: &Context, target: &Arc<T>) -> Result<()> {
        let discovered = discover(target)?;

        log::debug!(
            "{}: register {} ({} message types, {} producers)",
            self,
            std::any::type_name::<T>(),
            discovered.subscribers.len(),
            discovered.producers.len()
        );

        let replays = self.inner.registry.lock().install_producers(&discovered)?;
        self.replay(ctx, replays)?;

        let replays = self.inner.registry.lock().add_handlers(&discovered);
        self.replay(ctx, replays)
    }

    pub(crate) fn unregister_with<T: Subscriber>(&self, target: &Arc<T>) -> Result<()> {
        self.inner.enforcer.enforce()?;

        let discovered = discover(target)?;

        log::debug!("{}: unregister {}", self, std::any::type_name::<T>());

        self.inner
            .registry
            .lock()
            .remove(&discovered, std::any::type_name::<T>())
    }

    pub(crate) fn post_with(&self, ctx: &Context, msg: Arc<dyn Message>) -> Result<()> {
        self.inner.enforcer.enforce()?;

        let hierarchy = hierarchy::resolve(msg.type_tag());
        let mut dispatched = false;

        {
            let mut registry = self.inner.registry.lock();

            for tag in hierarchy.iter() {
                if let Some(handlers) = registry.live_handlers(tag) {
                    if !handlers.is_empty() {
                        dispatched = true;

                        for handler in handlers {
                            ctx.enqueue(handler.clone(), msg.clone());
                        }
                    }
                }
            }
        }

        if !dispatched {
            match msg.view::<DeadMessage>() {
                Some(dead) => self.notify_dead_message(dead),
                None => {
                    log::debug!("{}: no subscriber for {}", self, msg.type_tag());
                    self.post_with(ctx, Arc::new(DeadMessage::new(self.clone(), msg.clone())))?;
                }
            }
        }

        ctx.drain()
    }

    /// Delivers each producer's current value straight to its handlers,
    /// bypassing the queue.
    fn replay(&self, ctx: &Context, replays: Vec<Replay>) -> Result<()> {
        for (producer, handlers) in replays {
            for handler in handlers.iter() {
                if !producer.is_valid() {
                    break;
                }

                if !handler.is_valid() {
                    continue;
                }

                if let Some(msg) = producer.produce()? {
                    handler.handle(&*msg, ctx)?;
                }
            }
        }

        Ok(())
    }

    fn notify_dead_message(&self, dead: &DeadMessage) {
        let listeners: Vec<DeadMessageListener> = self
            .inner
            .dead_listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        log::debug!(
            "{}: dead message {:?} ({} listeners)",
            self,
            dead.message(),
            listeners.len()
        );

        for listener in listeners {
            listener(dead);
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Bus {}]", self.inner.identifier)
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("identifier", &self.inner.identifier)
            .field("enforcer", &self.inner.enforcer)
            .finish()
    }
}

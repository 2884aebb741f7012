//! Bound subscriber and producer methods.
//!
//! A descriptor pairs a target object with one of its slots. The target is
//! held weakly so the bus never extends its lifetime. Once invalidated a
//! descriptor refuses to run again.

use core::fmt;
use std::{
    any::{Any, TypeId},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use crate::{
    dispatch::Context,
    error::{Error, Result},
    type_tag::TypeTag,
    Message,
};

pub(crate) type HandleFn = dyn Fn(&dyn Message, &Context) -> Result<()> + Send + Sync;
pub(crate) type ProduceFn = dyn Fn() -> Result<Option<Box<dyn Message>>> + Send + Sync;
pub(crate) type WeakTarget = Weak<dyn Any + Send + Sync>;

/// Identity of a descriptor: the target's address, the message type and the slot name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    target: usize,
    message: TypeId,
    slot: &'static str,
}

impl SlotKey {
    pub(crate) fn new<T>(target: &Arc<T>, message: TypeTag, slot: &'static str) -> Self {
        Self {
            target: Arc::as_ptr(target) as *const () as usize,
            message: message.id(),
            slot,
        }
    }
}

pub struct HandlerDescriptor {
    key: SlotKey,
    message: TypeTag,
    owner: &'static str,
    target: WeakTarget,
    valid: AtomicBool,
    handle: Box<HandleFn>,
}

impl HandlerDescriptor {
    pub(crate) fn new(
        key: SlotKey,
        message: TypeTag,
        owner: &'static str,
        target: WeakTarget,
        handle: Box<HandleFn>,
    ) -> Self {
        Self {
            key,
            message,
            owner,
            target,
            valid: AtomicBool::new(true),
            handle,
        }
    }

    #[inline]
    pub fn key(&self) -> &SlotKey {
        &self.key
    }

    #[inline]
    pub fn message_type(&self) -> TypeTag {
        self.message
    }

    /// Type name of the object this handler is bound to.
    #[inline]
    pub fn owner_type(&self) -> &'static str {
        self.owner
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Whether the target object still exists.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }

    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    pub fn handle(&self, msg: &dyn Message, ctx: &Context) -> Result<()> {
        if !self.is_valid() {
            return Err(Error::InvalidOperation(format!(
                "{:?} has been invalidated and can no longer handle messages",
                self
            )));
        }

        log::trace!("{:?} <- {}", self, msg.type_tag());

        (self.handle)(msg, ctx)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[MessageHandler {}::{} <{}>]",
            self.owner,
            self.key.slot,
            self.message_type()
        )
    }
}

pub struct ProducerDescriptor {
    key: SlotKey,
    message: TypeTag,
    owner: &'static str,
    target: WeakTarget,
    valid: AtomicBool,
    produce: Box<ProduceFn>,
}

impl ProducerDescriptor {
    pub(crate) fn new(
        key: SlotKey,
        message: TypeTag,
        owner: &'static str,
        target: WeakTarget,
        produce: Box<ProduceFn>,
    ) -> Self {
        Self {
            key,
            message,
            owner,
            target,
            valid: AtomicBool::new(true),
            produce,
        }
    }

    #[inline]
    pub fn key(&self) -> &SlotKey {
        &self.key
    }

    #[inline]
    pub fn message_type(&self) -> TypeTag {
        self.message
    }

    #[inline]
    pub fn owner_type(&self) -> &'static str {
        self.owner
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Whether the target object still exists.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }

    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    /// Asks the producer for its current value; `None` means it has nothing to offer.
    pub fn produce(&self) -> Result<Option<Box<dyn Message>>> {
        if !self.is_valid() {
            return Err(Error::InvalidOperation(format!(
                "Producer {:?} has already been invalidated",
                self
            )));
        }

        (self.produce)()
    }
}

impl fmt::Debug for ProducerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[MessageProducer {}::{} <{}>]",
            self.owner,
            self.key.slot,
            self.message_type()
        )
    }
}

//! Per-call dispatch queue.
//!
//! Every public bus operation runs inside a [`Context`]. The context owns the
//! queue of pending deliveries and knows whether it is already draining it.
//! Subscribers receive the context and re-enter the bus through it, so a post
//! made from inside a handler is appended to the queue being drained instead
//! of being delivered recursively. Deliveries therefore happen level by level:
//! every direct subscriber of a message runs before anything those
//! subscribers posted.

use core::fmt;
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    sync::Arc,
};

use crate::{
    bus::Bus,
    descriptor::HandlerDescriptor,
    error::Result,
    handler::Subscriber,
    Message,
};

struct Queued {
    handler: Arc<HandlerDescriptor>,
    message: Arc<dyn Message>,
}

pub struct Context {
    bus: Bus,
    queue: RefCell<VecDeque<Queued>>,
    draining: Cell<bool>,
}

impl Context {
    pub(crate) fn new(bus: Bus) -> Self {
        Self {
            bus,
            queue: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
        }
    }

    /// The bus this context dispatches for.
    ///
    /// Calls made on it start a new context of their own. Handlers post
    /// through [`Context::post`] to keep breadth-first delivery.
    #[inline]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    #[inline]
    pub fn post<M: Message>(&self, msg: M) -> Result<()> {
        self.post_arc(Arc::new(msg))
    }

    pub fn post_arc(&self, msg: Arc<dyn Message>) -> Result<()> {
        self.bus.post_with(self, msg)
    }

    pub fn register<T: Subscriber>(&self, target: &Arc<T>) -> Result<()> {
        self.bus.register_with(self, target)
    }

    pub fn unregister<T: Subscriber>(&self, target: &Arc<T>) -> Result<()> {
        self.bus.unregister_with(target)
    }

    /// Whether the queue is being drained, i.e. the caller runs inside a subscriber.
    #[inline]
    pub fn is_dispatching(&self) -> bool {
        self.draining.get()
    }

    /// Number of deliveries waiting in the queue.
    #[inline]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub(crate) fn enqueue(&self, handler: Arc<HandlerDescriptor>, message: Arc<dyn Message>) {
        self.queue.borrow_mut().push_back(Queued { handler, message });
    }

    fn pop(&self) -> Option<Queued> {
        self.queue.borrow_mut().pop_front()
    }

    /// Delivers everything queued, including what the handlers queue meanwhile.
    ///
    /// Returns at once when called while the queue is already being drained.
    /// If a handler fails, its error is returned and the rest of the queue
    /// is dropped.
    pub(crate) fn drain(&self) -> Result<()> {
        if self.draining.replace(true) {
            return Ok(());
        }

        let res = self.drain_queue();
        self.draining.set(false);

        if res.is_err() {
            let dropped = self.queue.borrow_mut().drain(..).count();
            if dropped > 0 {
                log::debug!(
                    "{}: dropped {} queued deliveries after handler failure",
                    self.bus,
                    dropped
                );
            }
        }

        res
    }

    fn drain_queue(&self) -> Result<()> {
        while let Some(Queued { handler, message }) = self.pop() {
            if handler.is_valid() {
                handler.handle(&*message, self)?;
            } else {
                log::trace!("{:?} invalidated; skipped", handler);
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("bus", &self.bus)
            .field("pending", &self.pending())
            .field("draining", &self.draining.get())
            .finish()
    }
}

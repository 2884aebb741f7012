use std::sync::Arc;

use crate::{bus::Bus, derive::Message, Message};

/// Posted in place of a message nobody subscribed to.
///
/// It is routed like any other message. A `DeadMessage` that itself finds no
/// subscriber is reported to the bus's dead message listeners instead of
/// being wrapped again.
#[derive(Debug, Clone, Message)]
pub struct DeadMessage {
    bus: Bus,
    message: Arc<dyn Message>,
}

impl DeadMessage {
    pub fn new(bus: Bus, message: Arc<dyn Message>) -> Self {
        Self { bus, message }
    }

    /// The bus the message was posted on.
    #[inline]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The undelivered message.
    #[inline]
    pub fn message(&self) -> &Arc<dyn Message> {
        &self.message
    }

    #[inline]
    pub fn downcast_ref<M: Message>(&self) -> Option<&M> {
        self.message.view::<M>()
    }
}

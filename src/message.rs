use core::fmt;
use std::any::Any;

use crate::type_tag::TypeTag;

/// A value that can be posted on the bus.
///
/// Routing is keyed by [`Message::type_tag`] and then by every message
/// reachable through [`Message::base`]. Implementations are normally
/// produced by `#[derive(Message)]`; a hand-written impl must keep
/// `TYPE_TAG().base()` and `base()` describing the same parent.
pub trait Message: Any + fmt::Debug + Send + Sync + 'static {
    #[allow(non_snake_case)]
    fn TYPE_TAG() -> TypeTag
    where
        Self: Sized;

    fn type_tag(&self) -> TypeTag;

    fn as_any_ref(&self) -> &dyn Any;

    /// The embedded parent message, if this message extends one.
    fn base(&self) -> Option<&dyn Message> {
        None
    }
}

impl dyn Message {
    /// Borrows the part of this message that a subscriber of `M` receives.
    ///
    /// Walks the chain of base messages until one of type `M` is found.
    pub fn view<M: Message>(&self) -> Option<&M> {
        let mut current: &dyn Message = self;

        loop {
            if let Some(msg) = current.as_any_ref().downcast_ref::<M>() {
                return Some(msg);
            }

            current = current.base()?;
        }
    }

    #[inline]
    pub fn is<M: Message>(&self) -> bool {
        self.as_any_ref().is::<M>()
    }
}

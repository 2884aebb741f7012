//! A synchronous in-process message bus.
//!
//! Objects implement [`Subscriber`] to list their subscriber and producer
//! methods and are registered on a [`Bus`]. A posted message is delivered
//! on the posting thread to every subscriber of its type and of the types
//! it extends. Producers hand their current value to subscribers as soon
//! as both are registered.

extern crate self as muni;

pub mod builder;
pub mod bus;
pub mod descriptor;
mod discovery;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod hierarchy;
pub mod message;
mod message_impls;
pub mod msgs;
mod registry;
pub mod thread;
pub mod type_tag;

pub mod derive {
    pub use muni_derive::Message;
}

pub use builder::{BusBuilder, BusConfig};
pub use bus::{Bus, ListenerId, DEFAULT_IDENTIFIER};
pub use dispatch::Context;
pub use error::{BoxError, Error, Result};
pub use handler::{HandlerResult, HandlerTable, ProducerResult, Subscriber};
pub use message::Message;
pub use msgs::DeadMessage;
pub use thread::{designate_main_thread, is_main_thread, ThreadEnforcer, ThreadPolicy};
pub use type_tag::TypeTag;

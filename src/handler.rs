use std::{any::TypeId, collections::HashSet, sync::Arc};

use crate::{
    dispatch::Context,
    error::{BoxError, Error, Result},
    type_tag::TypeTag,
    Message,
};

/// An object that can be registered on a bus.
///
/// `describe` lists the object's subscriber and producer methods. It runs
/// once per concrete type and the resulting table is reused for every
/// instance of that type.
///
/// ```rust,ignore
/// impl Subscriber for Thermostat {
///     fn describe(table: &mut HandlerTable<Self>) {
///         table
///             .subscribe("on_reading", Self::on_reading)
///             .produce("current_reading", Self::current_reading);
///     }
/// }
/// ```
pub trait Subscriber: Send + Sync + 'static {
    fn describe(table: &mut HandlerTable<Self>)
    where
        Self: Sized;
}

/// Return types accepted from a subscriber method.
pub trait HandlerResult {
    fn into_handler_result(self) -> Result<(), BoxError>;
}

impl HandlerResult for () {
    #[inline]
    fn into_handler_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> HandlerResult for Result<(), E> {
    #[inline]
    fn into_handler_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// Return types accepted from a producer method.
pub trait ProducerResult<M> {
    fn into_producer_result(self) -> Result<Option<M>, BoxError>;
}

impl<M: Message> ProducerResult<M> for Option<M> {
    #[inline]
    fn into_producer_result(self) -> Result<Option<M>, BoxError> {
        Ok(self)
    }
}

impl<M: Message, E: Into<BoxError>> ProducerResult<M> for Result<Option<M>, E> {
    #[inline]
    fn into_producer_result(self) -> Result<Option<M>, BoxError> {
        self.map_err(Into::into)
    }
}

pub(crate) type SubscriberCall<T> =
    Arc<dyn Fn(&T, &dyn Message, &Context) -> Result<()> + Send + Sync>;
pub(crate) type ProducerCall<T> = Arc<dyn Fn(&T) -> Result<Option<Box<dyn Message>>> + Send + Sync>;

pub(crate) struct SubscriberSlot<T> {
    pub message: TypeTag,
    pub name: &'static str,
    pub call: SubscriberCall<T>,
}

pub(crate) struct ProducerSlot<T> {
    pub message: TypeTag,
    pub name: &'static str,
    pub call: ProducerCall<T>,
}

fn subscriber_call<T: 'static, F>(f: F) -> SubscriberCall<T>
where
    F: Fn(&T, &dyn Message, &Context) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn producer_call<T: 'static, F>(f: F) -> ProducerCall<T>
where
    F: Fn(&T) -> Result<Option<Box<dyn Message>>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The subscriber and producer methods of one target type.
pub struct HandlerTable<T> {
    pub(crate) subscribers: Vec<SubscriberSlot<T>>,
    pub(crate) producers: Vec<ProducerSlot<T>>,
    seen: HashSet<(TypeTag, &'static str)>,
    error: Option<Error>,
}

impl<T: Subscriber> HandlerTable<T> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            producers: Vec::new(),
            seen: HashSet::new(),
            error: None,
        }
    }

    pub(crate) fn describe() -> Result<Self> {
        let mut table = Self::new();
        T::describe(&mut table);

        match table.error.take() {
            Some(err) => Err(err),
            None => Ok(table),
        }
    }

    fn fail(&mut self, msg: String) {
        if self.error.is_none() {
            self.error = Some(Error::Registration(msg));
        }
    }

    /// Adds a subscriber method for messages of type `M` and of every type extending `M`.
    pub fn subscribe<M, R, F>(&mut self, slot: &'static str, f: F) -> &mut Self
    where
        M: Message,
        R: HandlerResult,
        F: Fn(&T, &M, &Context) -> R + Send + Sync + 'static,
    {
        let message = M::TYPE_TAG();

        if slot.is_empty() {
            self.fail(format!(
                "Subscriber for type {} on type {} has an empty slot name.",
                message,
                std::any::type_name::<T>()
            ));
            return self;
        }

        if !self.seen.insert((message, slot)) {
            self.fail(format!(
                "Method {} has already been registered as a subscriber for type {}.",
                slot, message
            ));
            return self;
        }

        let call = subscriber_call(move |target: &T, msg: &dyn Message, ctx: &Context| {
            let msg = msg.view::<M>().ok_or_else(|| {
                Error::InvalidOperation(format!(
                    "subscriber {} expects {} but got {}",
                    slot,
                    message,
                    msg.type_tag()
                ))
            })?;

            f(target, msg, ctx)
                .into_handler_result()
                .map_err(Error::from_handler)
        });

        self.subscribers.push(SubscriberSlot {
            message,
            name: slot,
            call,
        });

        self
    }

    /// Adds the producer of type `M`; a target type can produce each message type once.
    pub fn produce<M, R, F>(&mut self, slot: &'static str, f: F) -> &mut Self
    where
        M: Message,
        R: ProducerResult<M>,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        let message = M::TYPE_TAG();

        if slot.is_empty() {
            self.fail(format!(
                "Producer for type {} on type {} has an empty slot name.",
                message,
                std::any::type_name::<T>()
            ));
            return self;
        }

        if message.id() == TypeId::of::<()>() {
            self.fail(format!(
                "Producer {} on type {} must return a value, not {}.",
                slot,
                std::any::type_name::<T>(),
                message
            ));
            return self;
        }

        if self.producers.iter().any(|p| p.message == message) {
            self.fail(format!(
                "A producer for type {} has already been registered.",
                message
            ));
            return self;
        }

        let call = producer_call(move |target: &T| {
            let produced = f(target)
                .into_producer_result()
                .map_err(Error::from_handler)?;

            Ok(produced.map(|msg| Box::new(msg) as Box<dyn Message>))
        });

        self.producers.push(ProducerSlot {
            message,
            name: slot,
            call,
        });

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, crate::derive::Message)]
    struct Ping;

    #[derive(Debug, crate::derive::Message)]
    struct Pong;

    struct Plain;

    impl Plain {
        fn on_ping(&self, _msg: &Ping, _ctx: &Context) {}

        fn on_pong(&self, _msg: &Pong, _ctx: &Context) -> Result<(), std::io::Error> {
            Ok(())
        }

        fn current_ping(&self) -> Option<Ping> {
            Some(Ping)
        }
    }

    impl Subscriber for Plain {
        fn describe(table: &mut HandlerTable<Self>) {
            table
                .subscribe("on_ping", Self::on_ping)
                .subscribe("on_pong", Self::on_pong)
                .produce("current_ping", Self::current_ping);
        }
    }

    struct TwoProducers;

    impl Subscriber for TwoProducers {
        fn describe(table: &mut HandlerTable<Self>) {
            table
                .produce("first", |_: &Self| Some(Ping))
                .produce("second", |_: &Self| Some(Ping));
        }
    }

    struct SameSlotTwice;

    impl Subscriber for SameSlotTwice {
        fn describe(table: &mut HandlerTable<Self>) {
            table
                .subscribe("on_ping", |_: &Self, _: &Ping, _: &Context| {})
                .subscribe("on_ping", |_: &Self, _: &Ping, _: &Context| {});
        }
    }

    struct VoidProducer;

    impl Subscriber for VoidProducer {
        fn describe(table: &mut HandlerTable<Self>) {
            table.produce("nothing", |_: &Self| Some(()));
        }
    }

    struct EmptySlot;

    impl Subscriber for EmptySlot {
        fn describe(table: &mut HandlerTable<Self>) {
            table.subscribe("", |_: &Self, _: &Ping, _: &Context| {});
        }
    }

    #[test]
    fn collects_slots() {
        let table = HandlerTable::<Plain>::describe().unwrap();

        assert_eq!(table.subscribers.len(), 2);
        assert_eq!(table.producers.len(), 1);
        assert_eq!(table.producers[0].message, Ping::TYPE_TAG());
        assert_eq!(table.subscribers[1].name, "on_pong");
    }

    #[test]
    fn second_producer_for_a_type_is_rejected() {
        let err = HandlerTable::<TwoProducers>::describe().err().unwrap();

        assert!(matches!(err, Error::Registration(_)));
    }

    #[test]
    fn duplicate_subscriber_slot_is_rejected() {
        assert!(matches!(
            HandlerTable::<SameSlotTwice>::describe(),
            Err(Error::Registration(_))
        ));
    }

    #[test]
    fn empty_slot_is_rejected() {
        assert!(matches!(
            HandlerTable::<EmptySlot>::describe(),
            Err(Error::Registration(_))
        ));
    }

    #[test]
    fn void_producer_is_rejected() {
        let err = HandlerTable::<VoidProducer>::describe().err().unwrap();

        assert!(matches!(err, Error::Registration(_)));
        assert!(err.to_string().contains("nothing"));
    }
}

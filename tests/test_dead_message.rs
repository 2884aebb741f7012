use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use muni::{derive::Message, Bus, Context, DeadMessage, HandlerTable, Subscriber};
use parking_lot::Mutex;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Message)]
struct Foo;

#[derive(Debug, PartialEq, Message)]
struct Bar(u32);

#[derive(Debug, Message)]
struct Base;

#[derive(Debug, Message)]
struct Derived(#[message(base)] Base);

struct FooHandler;

impl Subscriber for FooHandler {
    fn describe(table: &mut HandlerTable<Self>) {
        table.subscribe("on_foo", |_: &Self, _: &Foo, _: &Context| {});
    }
}

fn collect_dead(bus: &Bus) -> Arc<Mutex<Vec<Arc<dyn muni::Message>>>> {
    let dead = Arc::new(Mutex::new(Vec::new()));
    let sink = dead.clone();

    bus.on_dead_message(move |msg: &DeadMessage| sink.lock().push(msg.message().clone()));

    dead
}

#[test]
fn test_unhandled_message_is_reported_once() {
    init_logger();

    let bus = Bus::new();
    let handler = Arc::new(FooHandler);
    bus.register(&handler).unwrap();
    let dead = collect_dead(&bus);

    bus.post(Foo).unwrap();
    assert!(dead.lock().is_empty());

    let bar = Arc::new(Bar(5));
    bus.post_arc(bar.clone()).unwrap();

    let dead = dead.lock();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].view::<Bar>(), Some(&Bar(5)));
    assert_eq!(
        Arc::as_ptr(&dead[0]) as *const () as usize,
        Arc::as_ptr(&bar) as *const () as usize
    );
}

#[test]
fn test_dead_message_carries_originating_bus() {
    let bus = Bus::build().identifier("sensors").build().unwrap();
    let origin = Arc::new(Mutex::new(None));
    let sink = origin.clone();

    bus.on_dead_message(move |msg| *sink.lock() = Some(msg.bus().clone()));
    bus.post(Bar(1)).unwrap();

    let origin = origin.lock().take().unwrap();
    assert!(origin.ptr_eq(&bus));
    assert_eq!(origin.identifier(), "sensors");
}

#[derive(Default)]
struct Morgue {
    bodies: Mutex<Vec<u32>>,
}

impl Subscriber for Morgue {
    fn describe(table: &mut HandlerTable<Self>) {
        table.subscribe("on_dead", |m: &Self, msg: &DeadMessage, _: &Context| {
            if let Some(bar) = msg.downcast_ref::<Bar>() {
                m.bodies.lock().push(bar.0);
            }
        });
    }
}

#[test]
fn test_dead_message_subscribers_replace_listeners() {
    init_logger();

    let bus = Bus::new();
    let morgue = Arc::new(Morgue::default());
    bus.register(&morgue).unwrap();
    let dead = collect_dead(&bus);

    bus.post(Bar(8)).unwrap();

    assert_eq!(*morgue.bodies.lock(), vec![8]);
    assert!(dead.lock().is_empty());
}

#[test]
fn test_unhandled_dead_message_is_not_wrapped_again() {
    let bus = Bus::new();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    bus.on_dead_message(move |msg| {
        assert!(msg.message().view::<DeadMessage>().is_none());
        counter.fetch_add(1, Ordering::SeqCst);
    });

    bus.post(DeadMessage::new(bus.clone(), Arc::new(Bar(2))))
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_base_subscriber_prevents_dead_message() {
    struct BaseHandler(AtomicU32);

    impl Subscriber for BaseHandler {
        fn describe(table: &mut HandlerTable<Self>) {
            table.subscribe("on_base", |h: &Self, _: &Base, _: &Context| {
                h.0.fetch_add(1, Ordering::SeqCst);
            });
        }
    }

    let bus = Bus::new();
    let handler = Arc::new(BaseHandler(AtomicU32::new(0)));
    bus.register(&handler).unwrap();
    let dead = collect_dead(&bus);

    bus.post(Derived(Base)).unwrap();

    assert_eq!(handler.0.load(Ordering::SeqCst), 1);
    assert!(dead.lock().is_empty());
}

#[test]
fn test_removed_listener_is_not_called() {
    let bus = Bus::new();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let id = bus.on_dead_message(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    bus.post(Foo).unwrap();
    assert!(bus.remove_dead_message_listener(id));
    assert!(!bus.remove_dead_message_listener(id));
    bus.post(Foo).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

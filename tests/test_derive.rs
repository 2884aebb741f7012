use std::{fmt::Debug, sync::Arc};

use muni::{derive::Message, Message, TypeTag};

#[derive(Debug, Message)]
struct Plain;

#[derive(Debug, Message)]
#[namespace("net")]
struct Connected {
    peer: u16,
}

#[derive(Debug, Message)]
#[type_tag("net::Handshake")]
struct Hello;

#[derive(Debug, Message)]
struct Secured(#[message(base)] Connected, &'static str);

#[derive(Debug, Message)]
struct Wrapper<T: Debug + Send + Sync + 'static>(T);

#[derive(Debug, Message)]
enum Command {
    Start,
    Stop(u8),
}

#[test]
fn test_type_tag_names() {
    assert_eq!(Plain::TYPE_TAG().name(), "Plain");
    assert_eq!(Connected::TYPE_TAG().name(), "net::Connected");
    assert_eq!(Hello::TYPE_TAG().name(), "net::Handshake");
    assert_eq!(Command::TYPE_TAG().name(), "Command");
    assert!(Wrapper::<u8>::TYPE_TAG().name().contains("Wrapper<u8>"));
}

#[test]
fn test_generic_instances_are_distinct_types() {
    assert_ne!(Wrapper::<u8>::TYPE_TAG(), Wrapper::<u16>::TYPE_TAG());
    assert_eq!(Wrapper(1u8).type_tag(), TypeTag::of::<Wrapper<u8>>());
}

#[test]
fn test_tuple_base_field() {
    assert_eq!(Secured::TYPE_TAG().base(), Some(Connected::TYPE_TAG()));
    assert_eq!(Connected::TYPE_TAG().base(), None);

    let msg: Arc<dyn Message> = Arc::new(Secured(Connected { peer: 443 }, "tls"));

    assert!(msg.is::<Secured>());
    assert!(!msg.is::<Connected>());
    assert_eq!(msg.view::<Connected>().map(|c| c.peer), Some(443));
    assert_eq!(msg.view::<Secured>().map(|s| s.1), Some("tls"));
    assert!(msg.view::<Hello>().is_none());
}

#[test]
fn test_enums_carry_no_base() {
    let msg: Arc<dyn Message> = Arc::new(Command::Stop(2));

    assert!(msg.base().is_none());
    assert!(matches!(msg.view::<Command>(), Some(Command::Stop(2))));
    assert!(!matches!(msg.view::<Command>(), Some(Command::Start)));
}

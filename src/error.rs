use std::error::Error as StdError;

use thiserror::Error;

use crate::type_tag::TypeTag;

/// An error raised by user subscriber or producer code.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid Argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Registration Error: {0}")]
    Registration(String),

    #[error("Thread Affinity Error: {0}")]
    ThreadAffinity(String),

    #[error("Invalid Operation: {0}")]
    InvalidOperation(String),

    /// A subscriber or producer failed; display and source are the handler's own.
    #[error(transparent)]
    Handler(BoxError),
}

impl Error {
    pub(crate) fn duplicate_producer(message: TypeTag, found_on: &str, owner: &str) -> Self {
        Error::Registration(format!(
            "Producer method for type {} found on type {}, but already registered by type {}",
            message, found_on, owner
        ))
    }

    pub(crate) fn missing_subscriber(target: &str) -> Self {
        Error::Registration(format!(
            "Missing message handler for subscriber method. Is {} registered?",
            target
        ))
    }

    pub(crate) fn missing_producer(target: &str) -> Self {
        Error::Registration(format!(
            "Missing message producer for producer method. Is {} registered?",
            target
        ))
    }

    #[inline]
    pub fn handler<E: Into<BoxError>>(err: E) -> Self {
        Error::Handler(err.into())
    }

    /// Wraps an error returned by user code. Bus errors raised by nested
    /// calls made from that code are passed through as they are.
    pub(crate) fn from_handler(err: BoxError) -> Self {
        match err.downcast::<Error>() {
            Ok(err) => *err,
            Err(err) => Error::Handler(err),
        }
    }

    #[inline]
    pub fn is_handler(&self) -> bool {
        matches!(self, Error::Handler(_))
    }

    /// Returns the handler's error as `E`, if this is a handler failure of that type.
    pub fn downcast_handler_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Error::Handler(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Takes the handler's own error out of this one.
    pub fn into_handler(self) -> std::result::Result<BoxError, Self> {
        match self {
            Error::Handler(err) => Ok(err),
            other => Err(other),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Registration(_) => "registration",
            Error::ThreadAffinity(_) => "thread_affinity",
            Error::InvalidOperation(_) => "invalid_operation",
            Error::Handler(_) => "handler",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("boom {0}")]
    struct Boom(u32);

    #[test]
    fn handler_error_is_transparent() {
        let err = Error::handler(Boom(7));

        assert_eq!(err.to_string(), "boom 7");
        assert_eq!(err.downcast_handler_ref::<Boom>().map(|b| b.0), Some(7));
        assert_eq!(err.as_label(), "handler");

        let inner = err.into_handler().unwrap();
        assert!(inner.downcast_ref::<Boom>().is_some());
    }

    #[test]
    fn nested_bus_errors_are_not_wrapped() {
        let nested: BoxError = Box::new(Error::ThreadAffinity("worker".into()));

        assert!(matches!(
            Error::from_handler(nested),
            Error::ThreadAffinity(_)
        ));
        assert!(Error::from_handler(Box::new(Boom(1))).is_handler());
    }

    #[test]
    fn non_handler_errors_do_not_downcast() {
        let err = Error::InvalidArgument("identifier");

        assert!(!err.is_handler());
        assert!(err.downcast_handler_ref::<Boom>().is_none());
        assert!(err.into_handler().is_err());
    }
}

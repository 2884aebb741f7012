//! Thread affinity policies.
//!
//! A [`ThreadEnforcer`] decides whether the calling thread may post to or
//! unregister from a bus. The main-thread policy asks the process-wide
//! detector below; everything else is decided by the enforcer itself.

use core::fmt;
use std::{
    sync::{Arc, OnceLock},
    thread::{self, ThreadId},
};

use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};

static MAIN_THREAD: OnceLock<ThreadId> = OnceLock::new();

/// Records the calling thread as the process's main thread.
///
/// Only the first call wins; returns `true` when the calling thread is the
/// designated one afterwards.
pub fn designate_main_thread() -> bool {
    let current = thread::current().id();
    *MAIN_THREAD.get_or_init(|| current) == current
}

/// Whether the calling thread is the main thread.
///
/// Falls back to the thread name the runtime gives the main thread when no
/// thread was designated explicitly.
pub fn is_main_thread() -> bool {
    let current = thread::current();

    match MAIN_THREAD.get() {
        Some(id) => *id == current.id(),
        None => current.name() == Some("main"),
    }
}

#[derive(Clone)]
pub enum ThreadEnforcer {
    /// Every thread is allowed.
    AnyThread,

    /// Only the main thread, as reported by [`is_main_thread`].
    MainThread,

    /// Only the given thread.
    Designated(ThreadId),

    /// A caller supplied check; `true` allows the calling thread.
    Custom(Arc<dyn Fn() -> bool + Send + Sync>),
}

impl ThreadEnforcer {
    /// Pins the enforcer to the calling thread.
    pub fn current_thread() -> Self {
        ThreadEnforcer::Designated(thread::current().id())
    }

    pub fn custom<F: Fn() -> bool + Send + Sync + 'static>(check: F) -> Self {
        ThreadEnforcer::Custom(Arc::new(check))
    }

    pub fn enforce(&self) -> Result<()> {
        let allowed = match self {
            ThreadEnforcer::AnyThread => true,
            ThreadEnforcer::MainThread => is_main_thread(),
            ThreadEnforcer::Designated(id) => thread::current().id() == *id,
            ThreadEnforcer::Custom(check) => check(),
        };

        if allowed {
            Ok(())
        } else {
            Err(Error::ThreadAffinity(format!(
                "{:?} does not allow thread {:?}",
                self,
                thread::current().name().unwrap_or("<unnamed>")
            )))
        }
    }
}

impl Default for ThreadEnforcer {
    fn default() -> Self {
        ThreadEnforcer::AnyThread
    }
}

impl fmt::Debug for ThreadEnforcer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadEnforcer::AnyThread => f.write_str("AnyThread"),
            ThreadEnforcer::MainThread => f.write_str("MainThread"),
            ThreadEnforcer::Designated(id) => write!(f, "Designated({:?})", id),
            ThreadEnforcer::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Serializable form of the built-in enforcers, used by [`crate::BusConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadPolicy {
    Any,
    Main,
}

impl Default for ThreadPolicy {
    fn default() -> Self {
        ThreadPolicy::Any
    }
}

impl From<ThreadPolicy> for ThreadEnforcer {
    fn from(policy: ThreadPolicy) -> Self {
        match policy {
            ThreadPolicy::Any => ThreadEnforcer::AnyThread,
            ThreadPolicy::Main => ThreadEnforcer::MainThread,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_thread_always_allows() {
        let enforcer = ThreadEnforcer::AnyThread;

        assert!(enforcer.enforce().is_ok());
        thread::spawn(move || assert!(enforcer.enforce().is_ok()))
            .join()
            .unwrap();
    }

    #[test]
    fn designated_rejects_other_threads() {
        let enforcer = ThreadEnforcer::current_thread();
        assert!(enforcer.enforce().is_ok());

        let res = thread::spawn(move || enforcer.enforce()).join().unwrap();
        assert!(matches!(res, Err(Error::ThreadAffinity(_))));
    }

    #[test]
    fn main_thread_rejects_named_worker() {
        let res = thread::Builder::new()
            .name("worker".into())
            .spawn(|| ThreadEnforcer::MainThread.enforce())
            .unwrap()
            .join()
            .unwrap();

        assert!(matches!(res, Err(Error::ThreadAffinity(_))));
    }

    #[test]
    fn custom_check_is_consulted() {
        assert!(ThreadEnforcer::custom(|| true).enforce().is_ok());
        assert!(ThreadEnforcer::custom(|| false).enforce().is_err());
    }

    #[test]
    fn policy_maps_to_enforcer() {
        assert!(matches!(
            ThreadEnforcer::from(ThreadPolicy::Main),
            ThreadEnforcer::MainThread
        ));
        assert!(matches!(
            ThreadEnforcer::from(ThreadPolicy::default()),
            ThreadEnforcer::AnyThread
        ));
    }
}

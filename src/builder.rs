use serde_derive::{Deserialize, Serialize};

use crate::{
    bus::{Bus, BusInner, DEFAULT_IDENTIFIER},
    error::{Error, Result},
    thread::{ThreadEnforcer, ThreadPolicy},
};

/// Serializable bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Name shown in diagnostics.
    pub identifier: String,

    pub thread_policy: ThreadPolicy,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            identifier: DEFAULT_IDENTIFIER.to_string(),
            thread_policy: ThreadPolicy::default(),
        }
    }
}

#[must_use]
pub struct BusBuilder {
    identifier: String,
    enforcer: ThreadEnforcer,
}

impl BusBuilder {
    pub fn new() -> Self {
        Self {
            identifier: DEFAULT_IDENTIFIER.to_string(),
            enforcer: ThreadEnforcer::default(),
        }
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn thread_enforcer(mut self, enforcer: ThreadEnforcer) -> Self {
        self.enforcer = enforcer;
        self
    }

    pub fn config(self, config: BusConfig) -> Self {
        self.identifier(config.identifier)
            .thread_enforcer(config.thread_policy.into())
    }

    pub fn build(self) -> Result<Bus> {
        if self.identifier.is_empty() {
            return Err(Error::InvalidArgument("bus identifier must not be empty"));
        }

        Ok(Bus::from_inner(BusInner::new(self.identifier, self.enforcer)))
    }
}

impl Default for BusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

use core::fmt;
use std::{
    any::TypeId,
    hash::{Hash, Hasher},
};

use crate::Message;

/// Runtime identity of a message type.
///
/// Equality and hashing only look at the [`TypeId`]; the name is carried
/// for diagnostics and the optional `base` thunk links the type to the
/// message it extends.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
    base: Option<fn() -> TypeTag>,
}

impl TypeTag {
    pub fn new<T: 'static>(name: &'static str, base: Option<fn() -> TypeTag>) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name,
            base,
        }
    }

    #[inline]
    pub fn of<M: Message>() -> Self {
        M::TYPE_TAG()
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The tag of the message this type extends, if any.
    #[inline]
    pub fn base(&self) -> Option<TypeTag> {
        self.base.map(|base| base())
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self.name)
    }
}

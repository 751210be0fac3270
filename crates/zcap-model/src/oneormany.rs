//! A value that is, on the wire, either a single item or a sequence of
//! items. `controller`, `@context`, and `allowedAction` all take this
//! shape; ingest must accept either and round-trip must preserve whichever
//! shape the input used.

use serde::{Deserialize, Serialize};

/// Either exactly one `T`, or an ordered, non-empty sequence of `T`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn one(value: T) -> Self {
        OneOrMany::One(value)
    }

    /// Borrow the contained values as a slice-like iterator, in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        match self {
            OneOrMany::One(v) => std::slice::from_ref(v).iter(),
            OneOrMany::Many(vs) => vs.iter(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(vs) => vs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            OneOrMany::One(_) => false,
            OneOrMany::Many(vs) => vs.is_empty(),
        }
    }

    /// The first element, the natural "primary" value of either shape.
    pub fn first(&self) -> Option<&T> {
        self.iter().next()
    }
}

impl<T: PartialEq> OneOrMany<T> {
    pub fn contains(&self, value: &T) -> bool {
        self.iter().any(|v| v == value)
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        OneOrMany::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        OneOrMany::Many(values)
    }
}

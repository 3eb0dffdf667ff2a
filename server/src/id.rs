use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub struct Id<T> {
    pub value: u64,
    phantom: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(value: u64) -> Id<T> {
        Id { value, phantom: PhantomData }
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

// Connection ids travel as strings so they can be compared against the
// actor ids clients put into their payloads.
impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse::<u64>().map(Id::new).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug)]
pub struct IdSource<T> {
    next_id: u64,
    phantom: PhantomData<T>,
}

impl<T> IdSource<T> {
    pub fn new(first_id: u64) -> IdSource<T> {
        IdSource { next_id: first_id, phantom: PhantomData }
    }

    pub fn next(&mut self) -> Id<T> {
        let id = Id::new(self.next_id);
        self.next_id += 1;
        id
    }
}

impl<T> Clone for IdSource<T> {
    fn clone(&self) -> Self {
        Self { next_id: self.next_id, phantom: self.phantom }
    }
}

//! Key/value store abstraction.
//!
//! The processor only needs a handful of operations from its store, and every
//! state transition it makes has to land in a single round trip. Multi-step
//! updates are therefore expressed as a [`Batch`] that the backend applies
//! all-or-nothing.

mod redis_store;

pub use self::redis_store::RedisStore;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// One write inside a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    SetField {
        key: String,
        field: String,
        value: String,
    },
    RemoveField {
        key: String,
        field: String,
    },
    AddMember {
        set: String,
        member: String,
    },
    Delete {
        key: String,
    },
}

/// Writes applied atomically, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    ops: Vec<Op>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_field(
        &mut self,
        key: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.ops.push(Op::SetField {
            key: key.into(),
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn remove_field(&mut self, key: impl Into<String>, field: impl Into<String>) -> &mut Self {
        self.ops.push(Op::RemoveField {
            key: key.into(),
            field: field.into(),
        });
        self
    }

    pub fn add_member(&mut self, set: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.ops.push(Op::AddMember {
            set: set.into(),
            member: member.into(),
        });
        self
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(Op::Delete { key: key.into() });
        self
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Storage operations the processor depends on.
#[async_trait]
pub trait Store: Send + Sync {
    /// Pop an arbitrary member of `set` and record it under `in_flight`
    /// (a hash keyed by member) with `marker` as the value.
    ///
    /// Both steps happen atomically. Returns `None` when the set is empty, or
    /// when the popped member already has a marker; that member is put back
    /// in `set` so it is picked up again once its running job releases it.
    async fn claim(&self, set: &str, in_flight: &str, marker: &str) -> Result<Option<String>>;

    /// All fields of the hash at `key`. A missing key yields an empty map.
    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Apply every operation of `batch` or none of them.
    async fn apply(&self, batch: Batch) -> Result<()>;
}

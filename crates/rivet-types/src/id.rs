//! Unique identifier for host types

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a `HostType`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u64);

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

impl TypeId {
    /// Generate a new unique TypeId
    pub fn next() -> Self {
        TypeId(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

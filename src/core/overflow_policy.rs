//! Overflow policies for the bootstrap buffers
//!
//! A bootstrap buffer holds at most `capacity` records. When a replay target
//! is already attached, overflow simply pushes the oldest records through to
//! it. Before that, something has to be dropped; these policies decide what,
//! and the buffer always says so on stderr the first time it happens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Policy for a full bootstrap buffer with no replay target
///
/// # Example
///
/// ```
/// use bootlog::OverflowPolicy;
///
/// assert_eq!(OverflowPolicy::default(), OverflowPolicy::DropOldest);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Evict the oldest buffered record to make room
    ///
    /// Keeps the records closest to the point where configuration happens,
    /// which are usually the ones that explain a failed startup.
    #[default]
    DropOldest,

    /// Refuse the incoming record and keep the existing queue
    DropNewest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
        }
    }
}

/// Callback for overflow notifications
///
/// Called each time a buffer drops a record. The parameter is the total
/// count of records that buffer has dropped so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

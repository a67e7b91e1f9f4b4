//! Ordering rules and the sequence counter that stamps them.
//!
//! Every [`Order`] carries a `sequence_id` drawn from a [`SequenceCounter`].
//! Ids only ever grow, so rules declared on different criteria nodes of one
//! query can be merged back into declaration order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Direction {
    /// Returns `true` if this is ascending order.
    pub fn is_asc(self) -> bool {
        matches!(self, Direction::Asc)
    }

    /// Returns `true` if this is descending order.
    pub fn is_desc(self) -> bool {
        matches!(self, Direction::Desc)
    }

    /// Returns the display name of this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single ordering rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    field: String,
    direction: Direction,
    nulls_first: bool,
    sequence_id: u64,
}

impl Order {
    pub(crate) fn new(
        field: impl Into<String>,
        direction: Direction,
        nulls_first: bool,
        sequence_id: u64,
    ) -> Self {
        Order {
            field: field.into(),
            direction,
            nulls_first,
            sequence_id,
        }
    }

    /// The field to sort by.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The sort direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether nulls sort before non-null values.
    pub fn nulls_first(&self) -> bool {
        self.nulls_first
    }

    /// Global declaration stamp; the only tie-breaker when merging rules.
    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nulls = if self.nulls_first { "FIRST" } else { "LAST" };
        write!(f, "{} {} NULLS {}", self.field, self.direction, nulls)
    }
}

/// Monotonic, thread-safe id source for ordering rules and cursors.
///
/// A [`CriteriaFactory`](crate::CriteriaFactory) owns one counter and shares
/// it with every node it creates. A fresh counter starts at 1, which keeps
/// ids deterministic in tests.
#[derive(Debug)]
pub struct SequenceCounter {
    next: AtomicU64,
}

impl SequenceCounter {
    /// Creates a counter whose first id is 1.
    pub fn new() -> Self {
        SequenceCounter {
            next: AtomicU64::new(1),
        }
    }

    /// Returns the next id.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, AtomicOrdering::Relaxed)
    }

    /// Returns the id the next call to [`next_id`](Self::next_id) will hand out.
    pub fn peek(&self) -> u64 {
        self.next.load(AtomicOrdering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        SequenceCounter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Asc.to_string(), "ASC");
        assert_eq!(Direction::Desc.to_string(), "DESC");
        assert!(Direction::default().is_asc());
    }

    #[test]
    fn order_display() {
        let order = Order::new("created_at", Direction::Desc, true, 1);
        assert_eq!(order.to_string(), "created_at DESC NULLS FIRST");
    }

    #[test]
    fn counter_starts_at_one_and_grows() {
        let counter = SequenceCounter::new();
        assert_eq!(counter.peek(), 1);
        assert_eq!(counter.next_id(), 1);
        assert_eq!(counter.next_id(), 2);
        assert_eq!(counter.peek(), 3);
    }

    #[test]
    fn counter_is_unique_across_threads() {
        let counter = Arc::new(SequenceCounter::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || (0..250).map(|_| counter.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 1000);
        assert_eq!(ids.first(), Some(&1));
        assert_eq!(ids.last(), Some(&1000));
    }
}

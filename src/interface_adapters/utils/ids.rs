use crate::domain::state::EntityId;
use rand::Rng;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Returns a process-unique, increasing id for connections and arena players.
///
/// The counter starts at a random offset so ids from a restarted server do not repeat the
/// previous run's.
pub fn next_id() -> EntityId {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU64::new(rand::rng().random_range(1u64 << 20..1u64 << 40)));
    counter.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_ids_are_drawn_then_they_never_repeat() {
        let a = next_id();
        let b = next_id();
        assert!(b > a);
    }
}

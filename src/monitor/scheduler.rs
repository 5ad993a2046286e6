//! Due-time bookkeeping for every monitored target.
//!
//! A single min-heap holds the next check of each running target. Entries are
//! never removed from the middle of the heap: pausing or rescheduling bumps the
//! target's generation, and entries with an old generation are dropped when
//! they surface.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tokio::time::Instant;

use crate::app::{ReupError, Result};
use crate::monitor::state::{MonitorPhase, MonitorState};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Scheduled {
    due: Instant,
    seq: u64,
    id: String,
    generation: u64,
}

/// A check that is due now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueTick {
    pub id: String,
    pub instance: u64,
}

#[derive(Debug)]
pub struct Slot {
    pub state: MonitorState,
    /// Distinguishes a re-added target from the one stopped before it
    pub instance: u64,
    generation: u64,
    /// Came due while the previous instance still had a check running
    deferred: bool,
}

#[derive(Debug, Default)]
pub struct Registry {
    slots: HashMap<String, Slot>,
    queue: BinaryHeap<Reverse<Scheduled>>,
    /// Ids with a check in progress, including checks of stopped instances
    in_flight: HashSet<String>,
    next_seq: u64,
    next_instance: u64,
}

impl Registry {
    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Slot> {
        self.slots.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Slot> {
        self.slots.get_mut(id)
    }

    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains(id)
    }

    /// Register a new monitor. Fails if the id already has one.
    pub fn insert(&mut self, state: MonitorState) -> Result<u64> {
        let id = state.id().to_string();
        if self.slots.contains_key(&id) {
            return Err(ReupError::AlreadyMonitored(id));
        }

        let instance = self.next_instance;
        self.next_instance += 1;
        self.slots.insert(
            id,
            Slot {
                state,
                instance,
                generation: 0,
                deferred: false,
            },
        );
        Ok(instance)
    }

    pub fn remove(&mut self, id: &str) -> Option<Slot> {
        self.slots.remove(id)
    }

    /// Replace any pending check of `id` with one at `due`.
    pub fn schedule(&mut self, id: &str, due: Instant) {
        let Some(slot) = self.slots.get_mut(id) else {
            return;
        };
        slot.generation += 1;
        slot.state.next_check_at = Some(due);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Scheduled {
            due,
            seq,
            id: id.to_string(),
            generation: slot.generation,
        }));
    }

    /// Drop the pending check of `id`, if any.
    pub fn cancel(&mut self, id: &str) {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.generation += 1;
            slot.state.next_check_at = None;
        }
    }

    /// Pop every live entry due at or before `now` and mark it in flight.
    pub fn take_due(&mut self, now: Instant) -> Vec<DueTick> {
        let mut due = Vec::new();

        while self.queue.peek().is_some_and(|Reverse(top)| top.due <= now) {
            let Some(Reverse(entry)) = self.queue.pop() else {
                break;
            };
            let Some(slot) = self.slots.get_mut(&entry.id) else {
                continue;
            };
            if slot.generation != entry.generation || slot.state.phase != MonitorPhase::Running {
                continue;
            }

            slot.state.next_check_at = None;
            if self.in_flight.contains(&entry.id) {
                slot.deferred = true;
                continue;
            }

            self.in_flight.insert(entry.id.clone());
            due.push(DueTick {
                id: entry.id,
                instance: slot.instance,
            });
        }

        due
    }

    /// Earliest live due time, discarding stale entries on top of the heap.
    pub fn next_due(&mut self) -> Option<Instant> {
        while let Some(Reverse(top)) = self.queue.peek() {
            let live = self.slots.get(&top.id).is_some_and(|slot| {
                slot.generation == top.generation && slot.state.phase == MonitorPhase::Running
            });
            if live {
                return Some(top.due);
            }
            self.queue.pop();
        }
        None
    }

    /// Clear the in-flight mark of a finished check.
    ///
    /// Returns the slot only if it still belongs to the instance that ran the
    /// check. A newer instance that came due meanwhile is scheduled now.
    pub fn finish(&mut self, id: &str, instance: u64, now: Instant) -> Option<&mut Slot> {
        self.in_flight.remove(id);

        let current = self.slots.get(id).map(|slot| (slot.instance, slot.deferred))?;
        match current {
            (current, _) if current == instance => {
                let slot = self.slots.get_mut(id)?;
                slot.deferred = false;
                Some(slot)
            }
            (_, true) => {
                if let Some(slot) = self.slots.get_mut(id) {
                    slot.deferred = false;
                }
                self.schedule(id, now);
                None
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TargetRef;
    use crate::monitor::state::MonitorLabel;
    use std::time::Duration;

    fn state(id: &str) -> MonitorState {
        MonitorState::new(
            TargetRef::new(format!("https://www.bestbuy.ca/en-ca/product/{id}"), id),
            MonitorLabel::Product,
            Duration::from_secs(15),
        )
    }

    fn ids(ticks: &[DueTick]) -> Vec<&str> {
        ticks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut registry = Registry::default();
        registry.insert(state("1111111")).unwrap();
        assert!(matches!(
            registry.insert(state("1111111")),
            Err(ReupError::AlreadyMonitored(_))
        ));

        registry.remove("1111111");
        assert!(registry.insert(state("1111111")).is_ok());
    }

    #[test]
    fn test_due_in_time_order() {
        let now = Instant::now();
        let mut registry = Registry::default();
        for id in ["a", "b", "c"] {
            registry.insert(state(id)).unwrap();
        }
        registry.schedule("a", now + Duration::from_secs(30));
        registry.schedule("b", now + Duration::from_secs(10));
        registry.schedule("c", now + Duration::from_secs(20));

        assert_eq!(registry.next_due(), Some(now + Duration::from_secs(10)));
        assert!(registry.take_due(now).is_empty());

        let due = registry.take_due(now + Duration::from_secs(25));
        assert_eq!(ids(&due), ["b", "c"]);
        assert_eq!(registry.next_due(), Some(now + Duration::from_secs(30)));
    }

    #[test]
    fn test_reschedule_supersedes_old_entry() {
        let now = Instant::now();
        let mut registry = Registry::default();
        registry.insert(state("a")).unwrap();
        registry.schedule("a", now);
        registry.schedule("a", now + Duration::from_secs(60));

        assert_eq!(registry.next_due(), Some(now + Duration::from_secs(60)));
        assert!(registry.take_due(now + Duration::from_secs(1)).is_empty());
        assert_eq!(registry.take_due(now + Duration::from_secs(60)).len(), 1);
    }

    #[test]
    fn test_cancelled_and_paused_entries_skipped() {
        let now = Instant::now();
        let mut registry = Registry::default();
        registry.insert(state("a")).unwrap();
        registry.insert(state("b")).unwrap();
        registry.schedule("a", now);
        registry.schedule("b", now);

        registry.cancel("a");
        registry.get_mut("b").unwrap().state.phase = MonitorPhase::Paused;

        assert!(registry.take_due(now).is_empty());
        assert_eq!(registry.next_due(), None);
        assert!(registry.get("a").unwrap().state.next_check_at.is_none());
    }

    #[test]
    fn test_no_second_tick_while_in_flight() {
        let now = Instant::now();
        let mut registry = Registry::default();
        let instance = registry.insert(state("a")).unwrap();
        registry.schedule("a", now);

        assert_eq!(ids(&registry.take_due(now)), ["a"]);
        assert!(registry.is_in_flight("a"));

        // A stray schedule while the check runs is held back.
        registry.schedule("a", now);
        assert!(registry.take_due(now).is_empty());

        assert!(registry.finish("a", instance, now).is_some());
        assert!(!registry.is_in_flight("a"));
    }

    #[test]
    fn test_stopped_instance_result_discarded() {
        let now = Instant::now();
        let mut registry = Registry::default();
        let old = registry.insert(state("a")).unwrap();
        registry.schedule("a", now);
        registry.take_due(now);

        registry.remove("a");
        assert!(registry.finish("a", old, now).is_none());
    }

    #[test]
    fn test_readded_target_waits_for_old_check() {
        let now = Instant::now();
        let mut registry = Registry::default();
        let old = registry.insert(state("a")).unwrap();
        registry.schedule("a", now);
        registry.take_due(now);

        registry.remove("a");
        let new = registry.insert(state("a")).unwrap();
        assert_ne!(old, new);
        registry.schedule("a", now);

        // The old check is still running, so the new one is deferred.
        assert!(registry.take_due(now).is_empty());

        let later = now + Duration::from_secs(3);
        assert!(registry.finish("a", old, later).is_none());
        assert_eq!(registry.next_due(), Some(later));

        let due = registry.take_due(later);
        assert_eq!(due, [DueTick { id: "a".to_string(), instance: new }]);
    }
}

//! Event model and event tree
//!
//! Events are hierarchical: an event may reference a super event, to
//! arbitrary depth. Sub-events inherit registration context from their
//! ancestors, so queries like "all ways to register for this event" walk the
//! tree. The walk is an explicit arena traversal with a bounded or unbounded
//! depth parameter, never an implicit join unrolling.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::lifecycle::EntityState;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub slug: String,
    pub name: String,
    /// Start of the event; None for dateless events
    pub start_date_time: Option<DateTime<Utc>>,
    /// End of the event; None for dateless or open-ended events
    pub end_date_time: Option<DateTime<Utc>>,
    pub super_event_id: Option<i64>,
    pub series_id: Option<i64>,
    pub event_type: Option<String>,
    pub public_on_web: bool,
    pub state: EntityState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub slug: String,
    pub name: String,
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
    pub super_event_id: Option<i64>,
    pub series_id: Option<i64>,
    pub event_type: Option<String>,
    pub public_on_web: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
    pub super_event_id: Option<i64>,
    pub event_type: Option<String>,
    pub public_on_web: Option<bool>,
}

/// Arena-based view of the event hierarchy
///
/// Built from a flat list of events; holds an id-to-index map and per-node
/// child indices. Traversal is cycle-safe, so a corrupted parent link cannot
/// loop forever.
#[derive(Debug, Clone)]
pub struct EventTree {
    nodes: Vec<Event>,
    index_by_id: HashMap<i64, usize>,
    children: Vec<Vec<usize>>,
}

impl EventTree {
    /// Build the arena from a flat event list
    pub fn new(events: Vec<Event>) -> Self {
        let index_by_id: HashMap<i64, usize> =
            events.iter().enumerate().map(|(i, e)| (e.id, i)).collect();
        let mut children = vec![Vec::new(); events.len()];
        for (index, event) in events.iter().enumerate() {
            if let Some(parent_id) = event.super_event_id {
                if let Some(&parent_index) = index_by_id.get(&parent_id) {
                    children[parent_index].push(index);
                }
            }
        }
        Self {
            nodes: events,
            index_by_id,
            children,
        }
    }

    pub fn get(&self, event_id: i64) -> Option<&Event> {
        self.index_by_id.get(&event_id).map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of the event and its sub-events, breadth-first
    ///
    /// `max_depth` bounds the walk: depth 1 returns only the root, depth 2
    /// adds direct sub-events, and so on. None walks the whole subtree.
    /// Deleted events are skipped together with their subtrees unless
    /// `include_deleted` is set.
    pub fn descendant_ids(
        &self,
        root_id: i64,
        max_depth: Option<usize>,
        include_deleted: bool,
    ) -> Vec<i64> {
        let Some(&root_index) = self.index_by_id.get(&root_id) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back((root_index, 1usize));

        while let Some((index, depth)) = queue.pop_front() {
            if !visited.insert(index) {
                continue;
            }
            let event = &self.nodes[index];
            if event.state.is_deleted() && !include_deleted {
                continue;
            }
            result.push(event.id);

            if max_depth.map_or(true, |max| depth < max) {
                for &child in &self.children[index] {
                    queue.push_back((child, depth + 1));
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: i64, super_event_id: Option<i64>, state: EntityState) -> Event {
        Event {
            id,
            slug: format!("event-{id}"),
            name: format!("Event {id}"),
            start_date_time: None,
            end_date_time: None,
            super_event_id,
            series_id: None,
            event_type: None,
            public_on_web: true,
            state,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_tree() -> EventTree {
        // 1 -> (2 -> 4, 3), 5 standalone
        EventTree::new(vec![
            event(1, None, EntityState::Active),
            event(2, Some(1), EntityState::Active),
            event(3, Some(1), EntityState::Active),
            event(4, Some(2), EntityState::Active),
            event(5, None, EntityState::Active),
        ])
    }

    #[test]
    fn test_unbounded_walk_collects_subtree() {
        let tree = sample_tree();
        let ids = tree.descendant_ids(1, None, false);
        assert_eq!(ids.len(), 4);
        assert!(ids.contains(&4));
        assert!(!ids.contains(&5));
    }

    #[test]
    fn test_bounded_walk_respects_depth() {
        let tree = sample_tree();
        assert_eq!(tree.descendant_ids(1, Some(1), false), vec![1]);

        let two_levels = tree.descendant_ids(1, Some(2), false);
        assert_eq!(two_levels.len(), 3);
        assert!(!two_levels.contains(&4));
    }

    #[test]
    fn test_deleted_subtree_skipped() {
        let tree = EventTree::new(vec![
            event(1, None, EntityState::Active),
            event(2, Some(1), EntityState::Deleted),
            event(3, Some(2), EntityState::Active),
        ]);
        // 3 hangs under the deleted 2, so the default walk drops both
        assert_eq!(tree.descendant_ids(1, None, false), vec![1]);
        assert_eq!(tree.descendant_ids(1, None, true).len(), 3);
    }

    #[test]
    fn test_cycle_does_not_loop() {
        let tree = EventTree::new(vec![
            event(1, Some(2), EntityState::Active),
            event(2, Some(1), EntityState::Active),
        ]);
        let ids = tree.descendant_ids(1, None, false);
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_unknown_root_returns_empty() {
        let tree = sample_tree();
        assert!(tree.descendant_ids(42, None, false).is_empty());
    }
}

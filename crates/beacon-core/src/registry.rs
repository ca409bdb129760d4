//! Presence registry: who is here and where.
//!
//! Holds one [`PresenceRecord`] per joined connection. Records are created
//! by [`PresenceRegistry::register_join`], overwritten in place by
//! [`PresenceRegistry::update_location`] and dropped by
//! [`PresenceRegistry::remove`]. The registry performs no I/O; callers that
//! share it between connection tasks wrap it in a lock (see
//! [`crate::coordinator::PresenceCoordinator`]).

use std::collections::HashMap;

use crate::ids::ConnectionId;
use crate::location::Location;
use crate::protocol::UserSummary;

/// Per-connection presence state.
#[derive(Clone, Debug, PartialEq)]
pub struct PresenceRecord {
    /// Owning connection.
    pub connection_id: ConnectionId,
    /// Name supplied at join.
    pub display_name: String,
    /// Last reported position.
    pub location: Option<Location>,
}

impl PresenceRecord {
    /// Roster entry for this record.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.connection_id.clone(),
            username: self.display_name.clone(),
            location: self.location,
        }
    }
}

/// Mapping from connection to presence record.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    records: HashMap<ConnectionId, PresenceRecord>,
}

impl PresenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or rename the record for `connection_id`.
    ///
    /// A repeated join overwrites the name and keeps any known location.
    pub fn register_join(
        &mut self,
        connection_id: &ConnectionId,
        display_name: String,
    ) -> &PresenceRecord {
        let record = self
            .records
            .entry(connection_id.clone())
            .or_insert_with(|| PresenceRecord {
                connection_id: connection_id.clone(),
                display_name: String::new(),
                location: None,
            });
        record.display_name = display_name;
        record
    }

    /// Overwrite the location of a joined connection.
    ///
    /// Returns `None` without touching anything when the connection has no
    /// record.
    pub fn update_location(
        &mut self,
        connection_id: &ConnectionId,
        location: Location,
    ) -> Option<&PresenceRecord> {
        let record = self.records.get_mut(connection_id)?;
        record.location = Some(location);
        Some(record)
    }

    /// Drop the record for `connection_id`, returning it if it existed.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<PresenceRecord> {
        self.records.remove(connection_id)
    }

    /// Every current record as a roster, ordered by connection id.
    pub fn snapshot(&self) -> Vec<UserSummary> {
        let mut users: Vec<UserSummary> =
            self.records.values().map(PresenceRecord::summary).collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    /// Record for `connection_id`, if joined.
    pub fn get(&self, connection_id: &ConnectionId) -> Option<&PresenceRecord> {
        self.records.get(connection_id)
    }

    /// Whether `connection_id` has a record.
    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.records.contains_key(connection_id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(s: &str) -> ConnectionId {
        ConnectionId::from(s)
    }

    fn loc(lat: f64, lon: f64) -> Location {
        Location::new(lat, lon).unwrap()
    }

    #[test]
    fn join_creates_record_without_location() {
        let mut reg = PresenceRegistry::new();
        let _ = reg.register_join(&id("c"), "Alice".into());

        let snapshot = reg.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id("c"));
        assert_eq!(snapshot[0].username, "Alice");
        assert!(snapshot[0].location.is_none());
    }

    #[test]
    fn second_join_overwrites_name_and_keeps_location() {
        let mut reg = PresenceRegistry::new();
        let _ = reg.register_join(&id("c"), "Alice".into());
        let _ = reg.update_location(&id("c"), loc(1.0, 2.0));
        let record = reg.register_join(&id("c"), "Alicia".into());

        assert_eq!(record.display_name, "Alicia");
        assert_eq!(record.location, Some(loc(1.0, 2.0)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn location_before_join_is_noop() {
        let mut reg = PresenceRegistry::new();
        assert!(reg.update_location(&id("ghost"), loc(1.0, 2.0)).is_none());
        assert!(reg.is_empty());
        assert!(!reg.contains(&id("ghost")));
    }

    #[test]
    fn consecutive_updates_overwrite() {
        let mut reg = PresenceRegistry::new();
        let _ = reg.register_join(&id("c"), "Alice".into());
        let _ = reg.update_location(&id("c"), loc(1.0, 1.0));
        let _ = reg.update_location(&id("c"), loc(3.0, 4.0));

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(&id("c")).unwrap().location, Some(loc(3.0, 4.0)));
    }

    #[test]
    fn remove_returns_record_once() {
        let mut reg = PresenceRegistry::new();
        let _ = reg.register_join(&id("c"), "Alice".into());

        let removed = reg.remove(&id("c")).unwrap();
        assert_eq!(removed.display_name, "Alice");
        assert!(reg.remove(&id("c")).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn snapshot_of_empty_registry() {
        let reg = PresenceRegistry::new();
        assert!(reg.snapshot().is_empty());
    }

    #[test]
    fn snapshot_is_ordered_by_id() {
        let mut reg = PresenceRegistry::new();
        let _ = reg.register_join(&id("c3"), "Carol".into());
        let _ = reg.register_join(&id("c1"), "Alice".into());
        let _ = reg.register_join(&id("c2"), "Bob".into());

        let names: Vec<_> = reg.snapshot().into_iter().map(|u| u.username).collect();
        assert_eq!(names, ["Alice", "Bob", "Carol"]);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Join(u8),
        Locate(u8),
        Leave(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..4).prop_map(Op::Join),
            (0u8..4).prop_map(Op::Locate),
            (0u8..4).prop_map(Op::Leave),
        ]
    }

    proptest! {
        #[test]
        fn record_exists_iff_joined_and_not_left(
            ops in prop::collection::vec(op_strategy(), 0..64)
        ) {
            let mut reg = PresenceRegistry::new();
            let mut joined = [false; 4];

            for op in ops {
                match op {
                    Op::Join(c) => {
                        let _ = reg.register_join(&id(&c.to_string()), format!("user{c}"));
                        joined[c as usize] = true;
                    }
                    Op::Locate(c) => {
                        let _ = reg.update_location(&id(&c.to_string()), loc(f64::from(c), 0.0));
                    }
                    Op::Leave(c) => {
                        let _ = reg.remove(&id(&c.to_string()));
                        joined[c as usize] = false;
                    }
                }
            }

            for (c, expected) in joined.iter().enumerate() {
                prop_assert_eq!(reg.contains(&id(&c.to_string())), *expected);
            }
            prop_assert_eq!(reg.len(), joined.iter().filter(|j| **j).count());
        }
    }
}

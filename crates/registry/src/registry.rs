//! In-memory registry of parent events and their occurrences.
//!
//! Lookups are linear scans; per-user registries hold a handful of records.

use {
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
};

use crate::record::{Classification, EventKind, EventRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRegistry {
    records: Vec<EventRecord>,
}

impl From<Vec<EventRecord>> for EventRegistry {
    fn from(records: Vec<EventRecord>) -> Self {
        Self { records }
    }
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<EventRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record whose parent ID is `event_id`.
    pub fn record(&self, event_id: &str) -> Option<&EventRecord> {
        self.records.iter().find(|r| r.parent_event_id == event_id)
    }

    /// Record owning `instance_id` as an occurrence.
    pub fn owner_of(&self, instance_id: &str) -> Option<&EventRecord> {
        self.records
            .iter()
            .find(|r| r.instances.iter().any(|i| i == instance_id))
    }

    /// Classify an event ID. Parent IDs are matched before occurrences.
    pub fn classify(&self, event_id: &str) -> Classification {
        if let Some(record) = self.record(event_id) {
            let kind = if record.is_parent() {
                EventKind::ParentEvent
            } else {
                EventKind::SingleEvent
            };
            return Classification {
                kind,
                alias: Some(record.alias.clone()),
                parent_event_id: None,
                parent_event_alias: None,
            };
        }
        if let Some(record) = self.owner_of(event_id) {
            return Classification {
                kind: EventKind::RecurrentEvent,
                alias: Some(record.alias.clone()),
                parent_event_id: Some(record.parent_event_id.clone()),
                parent_event_alias: Some(record.alias.clone()),
            };
        }
        Classification::unknown()
    }

    /// Track a newly created event. Returns `false` if the ID is already
    /// registered, in which case the existing record is kept.
    pub fn register_created(
        &mut self,
        alias: impl Into<String>,
        parent_event_id: impl Into<String>,
    ) -> bool {
        let parent_event_id = parent_event_id.into();
        if self.record(&parent_event_id).is_some() {
            warn!(event_id = %parent_event_id, "event already registered");
            return false;
        }
        debug!(event_id = %parent_event_id, "registering event");
        self.records.push(EventRecord::new(alias, parent_event_id));
        true
    }

    /// Replace the occurrence list of a record. No-op when the record is
    /// missing; returns whether it was found.
    pub fn attach_instances(&mut self, parent_event_id: &str, instances: Vec<String>) -> bool {
        match self
            .records
            .iter_mut()
            .find(|r| r.parent_event_id == parent_event_id)
        {
            Some(record) => {
                debug!(event_id = parent_event_id, count = instances.len(), "attaching occurrences");
                record.instances = instances;
                true
            },
            None => {
                debug!(event_id = parent_event_id, "attach skipped, no such record");
                false
            },
        }
    }

    /// Drop the record whose parent ID is `event_id`.
    pub fn remove_single(&mut self, event_id: &str) -> Option<EventRecord> {
        let pos = self
            .records
            .iter()
            .position(|r| r.parent_event_id == event_id)?;
        Some(self.records.remove(pos))
    }

    /// Drop `event_id` from whichever record lists it. The record survives.
    pub fn remove_instance(&mut self, event_id: &str) -> bool {
        for record in &mut self.records {
            let before = record.instances.len();
            record.instances.retain(|i| i != event_id);
            if record.instances.len() != before {
                return true;
            }
        }
        false
    }

    /// Empty the occurrence list of a record, returning the removed IDs.
    pub fn clear_instances(&mut self, parent_event_id: &str) -> Vec<String> {
        self.records
            .iter_mut()
            .find(|r| r.parent_event_id == parent_event_id)
            .map(|r| std::mem::take(&mut r.instances))
            .unwrap_or_default()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn sample() -> EventRegistry {
        EventRegistry::from(vec![
            EventRecord {
                alias: "5K Run".into(),
                parent_event_id: "p1".into(),
                instances: vec!["i1".into(), "i2".into()],
            },
            EventRecord::new("Dentist", "s1"),
        ])
    }

    #[rstest]
    #[case("p1", EventKind::ParentEvent)]
    #[case("i2", EventKind::RecurrentEvent)]
    #[case("s1", EventKind::SingleEvent)]
    #[case("zz", EventKind::Unknown)]
    fn classifies_each_category(#[case] id: &str, #[case] expected: EventKind) {
        assert_eq!(sample().classify(id).kind, expected);
    }

    #[test]
    fn occurrence_reports_parent_alias() {
        let c = sample().classify("i1");
        assert_eq!(c.alias.as_deref(), Some("5K Run"));
        assert_eq!(c.parent_event_alias.as_deref(), Some("5K Run"));
        assert_eq!(c.parent_event_id.as_deref(), Some("p1"));
    }

    #[test]
    fn parent_match_wins_over_foreign_occurrence() {
        let registry = EventRegistry::from(vec![
            EventRecord {
                alias: "A".into(),
                parent_event_id: "a".into(),
                instances: vec!["x".into()],
            },
            EventRecord::new("X", "x"),
        ]);
        let c = registry.classify("x");
        assert_eq!(c.kind, EventKind::SingleEvent);
        assert_eq!(c.alias.as_deref(), Some("X"));
    }

    #[test]
    fn single_becomes_parent_after_attach() {
        let mut registry = EventRegistry::new();
        assert!(registry.register_created("5K Run", "p1"));
        assert_eq!(registry.classify("p1").kind, EventKind::SingleEvent);

        assert!(registry.attach_instances("p1", vec!["i1".into(), "i2".into()]));
        assert_eq!(registry.classify("p1").kind, EventKind::ParentEvent);

        let c = registry.classify("i1");
        assert_eq!(c.kind, EventKind::RecurrentEvent);
        assert_eq!(c.parent_event_alias.as_deref(), Some("5K Run"));
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let mut registry = EventRegistry::new();
        assert!(registry.register_created("first", "p1"));
        assert!(!registry.register_created("second", "p1"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.record("p1").unwrap().alias, "first");
    }

    #[test]
    fn attach_to_missing_record_is_noop() {
        let mut registry = sample();
        let before = registry.clone();
        assert!(!registry.attach_instances("nope", vec!["x".into()]));
        assert_eq!(registry, before);
    }

    #[test]
    fn remove_instance_keeps_parent() {
        let mut registry = sample();
        assert!(registry.remove_instance("i1"));
        assert_eq!(registry.record("p1").unwrap().instances, vec!["i2".to_string()]);
        assert!(!registry.remove_instance("i1"));
    }

    #[test]
    fn remove_single_drops_record() {
        let mut registry = sample();
        assert_eq!(registry.remove_single("s1").unwrap().alias, "Dentist");
        assert_eq!(registry.classify("s1").kind, EventKind::Unknown);
        assert!(registry.remove_single("s1").is_none());
    }

    #[test]
    fn clear_instances_returns_removed() {
        let mut registry = sample();
        assert_eq!(registry.clear_instances("p1"), vec!["i1".to_string(), "i2".to_string()]);
        assert_eq!(registry.classify("p1").kind, EventKind::SingleEvent);
    }

    #[test]
    fn serializes_as_plain_list() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.is_array());
        let back: EventRegistry = serde_json::from_value(value).unwrap();
        assert_eq!(back, sample());
    }
}

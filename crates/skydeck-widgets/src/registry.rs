//! Ordered collection of widget slots.
//!
//! All operations address slots by [`WidgetId`], never by position, so a
//! refresh that completes after an unrelated add or delete still lands on the
//! slot it was issued for.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use skydeck_weather::WeatherReading;
use thiserror::Error;

use crate::widget::{WidgetId, WidgetSlot, WidgetView};

/// Largest id a slot may carry, persisted or freshly assigned
pub const MAX_WIDGET_ID: u64 = u32::MAX as u64;

/// Serializable copy of the registry's slots, in display order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrySnapshot(Vec<WidgetSlot>);

impl RegistrySnapshot {
    pub fn slots(&self) -> &[WidgetSlot] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check the invariants a live registry relies on
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.0.is_empty() {
            return Err(SnapshotError::Empty);
        }

        let mut seen = std::collections::HashSet::with_capacity(self.0.len());
        for slot in &self.0 {
            if slot.id().0 > MAX_WIDGET_ID {
                return Err(SnapshotError::IdOutOfRange(slot.id()));
            }
            if !seen.insert(slot.id()) {
                return Err(SnapshotError::DuplicateId(slot.id()));
            }
            if slot.is_resolved() && slot.weather_data().is_none() {
                return Err(SnapshotError::ResolvedWithoutReading(slot.id()));
            }
        }
        Ok(())
    }
}

/// Persisted state that cannot seed a registry
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot holds no widgets")]
    Empty,
    #[error("widget id {0} appears more than once")]
    DuplicateId(WidgetId),
    #[error("widget {0} is marked resolved but has no reading")]
    ResolvedWithoutReading(WidgetId),
    #[error("widget id {0} is out of range")]
    IdOutOfRange(WidgetId),
}

/// A lookup in flight for one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    pub id: WidgetId,
    pub city: String,
    seq: u64,
}

/// What happened to a lookup result handed back to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// A newer result, a reset or a reload already replaced this one
    Superseded,
    /// The slot was deleted meanwhile
    Missing,
}

#[derive(Debug)]
pub struct WidgetRegistry {
    slots: Vec<WidgetSlot>,
    next_id: u64,
    next_seq: u64,
    /// Highest sequence number whose result may no longer be applied, per slot
    watermarks: HashMap<WidgetId, u64>,
}

impl WidgetRegistry {
    /// Create `default_count` unbound slots with ids starting at 1.
    ///
    /// The registry never holds fewer than one slot, so a count of zero
    /// yields a single slot.
    pub fn initialize(default_count: usize) -> Self {
        let mut registry = Self {
            slots: Vec::with_capacity(default_count.max(1)),
            next_id: 1,
            next_seq: 0,
            watermarks: HashMap::new(),
        };

        if default_count == 0 {
            tracing::warn!("Widget registry requested with zero slots; creating one");
        }
        for _ in 0..default_count.max(1) {
            registry.add_slot();
        }
        registry
    }

    /// Replace every slot with a previously persisted snapshot.
    ///
    /// On error the registry is left untouched.
    pub fn load_from(&mut self, snapshot: RegistrySnapshot) -> Result<usize, SnapshotError> {
        snapshot.validate()?;

        let max_id = snapshot.0.iter().map(|s| s.id().0).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id.saturating_add(1));
        self.slots = snapshot.0;

        // Results of lookups issued before the reload belong to the old slots
        self.watermarks = self.slots.iter().map(|s| (s.id(), self.next_seq)).collect();

        tracing::debug!("Loaded {} widgets from snapshot", self.slots.len());
        Ok(self.slots.len())
    }

    /// Bind a reading to the slot with `id`. Returns false if no slot matches.
    pub fn bind_and_update(&mut self, id: WidgetId, reading: WeatherReading) -> bool {
        let next_seq = self.next_seq;
        let Some(slot) = self.slot_mut(id) else {
            tracing::debug!("bind_and_update: no widget with id {}", id);
            return false;
        };

        slot.bind(reading);
        self.watermarks.insert(id, next_seq);
        true
    }

    /// Clear a slot's content, keeping its id. Returns false if no slot matches.
    pub fn reset_slot(&mut self, id: WidgetId) -> bool {
        let next_seq = self.next_seq;
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };

        slot.clear();
        self.watermarks.insert(id, next_seq);
        true
    }

    /// Clear every slot that holds a reading. Returns how many were cleared.
    pub fn reset_all(&mut self) -> usize {
        let mut cleared = 0;
        for slot in &mut self.slots {
            if slot.weather_data().is_some() {
                slot.clear();
                self.watermarks.insert(slot.id(), self.next_seq);
                cleared += 1;
            }
        }
        cleared
    }

    /// Remove the slot with `id` unless it is the only one left.
    pub fn delete_slot(&mut self, id: WidgetId) -> bool {
        if self.slots.len() <= 1 {
            tracing::debug!("Refusing to delete the last widget ({})", id);
            return false;
        }

        let Some(index) = self.slots.iter().position(|s| s.id() == id) else {
            return false;
        };

        self.slots.remove(index);
        self.watermarks.remove(&id);
        true
    }

    /// Append one unbound slot and return its fresh id.
    ///
    /// Returns `None` once every id up to [`MAX_WIDGET_ID`] has been handed out.
    pub fn add_slot(&mut self) -> Option<WidgetId> {
        let Some(next_id) = self
            .next_id
            .checked_add(1)
            .filter(|_| self.next_id <= MAX_WIDGET_ID)
        else {
            tracing::warn!("Widget ids exhausted; not adding a widget");
            return None;
        };

        let id = WidgetId(self.next_id);
        self.next_id = next_id;
        self.slots.push(WidgetSlot::unbound(id));
        self.watermarks.insert(id, self.next_seq);
        Some(id)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot(self.slots.clone())
    }

    /// Issue a lookup for the slot's bound name.
    ///
    /// Returns `None` when the slot is gone or unbound: no lookup is ever
    /// issued without a name.
    pub fn begin_request(&mut self, id: WidgetId) -> Option<RequestTicket> {
        let city = self.get(id).filter(|s| s.is_bound())?.name().trim().to_string();
        Some(self.issue(id, city))
    }

    /// Issue a lookup for a city the user typed into the slot
    pub fn begin_request_for(&mut self, id: WidgetId, city: &str) -> Option<RequestTicket> {
        let city = city.trim();
        if city.is_empty() || self.get(id).is_none() {
            return None;
        }
        Some(self.issue(id, city.to_string()))
    }

    fn issue(&mut self, id: WidgetId, city: String) -> RequestTicket {
        self.next_seq += 1;
        RequestTicket {
            id,
            city,
            seq: self.next_seq,
        }
    }

    /// Apply a lookup result if it is newer than anything already applied
    pub fn complete_request(&mut self, ticket: &RequestTicket, reading: WeatherReading) -> UpdateOutcome {
        let Some(slot) = self.slots.iter_mut().find(|s| s.id() == ticket.id) else {
            return UpdateOutcome::Missing;
        };

        let watermark = self.watermarks.entry(ticket.id).or_insert(0);
        if ticket.seq <= *watermark {
            tracing::debug!(
                "Discarding superseded result for widget {} (seq {} <= {})",
                ticket.id,
                ticket.seq,
                *watermark
            );
            return UpdateOutcome::Superseded;
        }

        slot.bind(reading);
        *watermark = ticket.seq;
        UpdateOutcome::Applied
    }

    pub fn get(&self, id: WidgetId) -> Option<&WidgetSlot> {
        self.slots.iter().find(|s| s.id() == id)
    }

    fn slot_mut(&mut self, id: WidgetId) -> Option<&mut WidgetSlot> {
        self.slots.iter_mut().find(|s| s.id() == id)
    }

    pub fn slots(&self) -> &[WidgetSlot] {
        &self.slots
    }

    pub fn ids(&self) -> Vec<WidgetId> {
        self.slots.iter().map(WidgetSlot::id).collect()
    }

    pub fn views(&self) -> Vec<WidgetView> {
        self.slots.iter().map(WidgetSlot::view).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True when more slots exist than fit on screen at once
    pub fn overflows(&self, visible: usize) -> bool {
        self.slots.len() > visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::TemperatureSummary;

    fn paris() -> WeatherReading {
        WeatherReading::new("Paris", 15.0, 10.0, 18.0)
    }

    fn assert_unique_ids(registry: &WidgetRegistry) {
        let mut ids = registry.ids();
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), before, "duplicate ids in {:?}", registry.ids());
    }

    #[test]
    fn test_initialize_creates_unbound_slots() {
        let registry = WidgetRegistry::initialize(2);
        assert_eq!(registry.ids(), vec![WidgetId(1), WidgetId(2)]);
        assert!(registry.slots().iter().all(|s| !s.is_bound() && !s.is_resolved()));
    }

    #[test]
    fn test_initialize_zero_still_has_one_slot() {
        let registry = WidgetRegistry::initialize(0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_bind_and_update_only_touches_target() {
        let mut registry = WidgetRegistry::initialize(2);
        assert!(registry.bind_and_update(WidgetId(1), paris()));

        let first = registry.get(WidgetId(1)).unwrap();
        assert!(first.is_resolved());
        assert_eq!(first.name(), "Paris");
        assert_eq!(first.temperature().current, 15.0);

        let second = registry.get(WidgetId(2)).unwrap();
        assert!(!second.is_resolved());
        assert_eq!(second.name(), "");
    }

    #[test]
    fn test_bind_and_update_unknown_id_is_noop() {
        let mut registry = WidgetRegistry::initialize(2);
        registry.bind_and_update(WidgetId(1), paris());
        let before = registry.snapshot();

        assert!(!registry.bind_and_update(WidgetId(99), WeatherReading::new("Oslo", 1.0, 0.0, 2.0)));
        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn test_reset_slot_clears_content_keeps_id() {
        let mut registry = WidgetRegistry::initialize(2);
        registry.bind_and_update(WidgetId(2), paris());

        assert!(registry.reset_slot(WidgetId(2)));
        let slot = registry.get(WidgetId(2)).unwrap();
        assert_eq!(slot.id(), WidgetId(2));
        assert!(!slot.is_resolved());
        assert_eq!(slot.temperature(), TemperatureSummary::default());
        assert!(!registry.reset_slot(WidgetId(42)));
    }

    #[test]
    fn test_reset_all_only_counts_slots_with_data() {
        let mut registry = WidgetRegistry::initialize(3);
        registry.bind_and_update(WidgetId(1), paris());
        registry.bind_and_update(WidgetId(3), WeatherReading::new("Oslo", 1.0, 0.0, 2.0));

        assert_eq!(registry.reset_all(), 2);
        assert!(registry.slots().iter().all(|s| !s.is_resolved()));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_delete_last_slot_rejected() {
        let mut registry = WidgetRegistry::initialize(2);
        assert!(registry.delete_slot(WidgetId(1)));
        assert!(!registry.delete_slot(WidgetId(2)));
        assert_eq!(registry.ids(), vec![WidgetId(2)]);
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let mut registry = WidgetRegistry::initialize(2);
        assert!(!registry.delete_slot(WidgetId(9)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_add_never_reuses_ids() {
        let mut registry = WidgetRegistry::initialize(2);
        registry.delete_slot(WidgetId(2));
        let id = registry.add_slot();
        assert_eq!(id, Some(WidgetId(3)));
        assert_unique_ids(&registry);
    }

    #[test]
    fn test_add_delete_sequences_keep_invariants() {
        let mut registry = WidgetRegistry::initialize(2);
        // Deterministic LCG so the sequence mixes adds and deletes of live,
        // dead and last-remaining ids.
        let mut state: u64 = 0x2545_f491;
        for _ in 0..500 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let roll = (state >> 33) % 3;
            if roll == 0 {
                registry.add_slot();
            } else {
                let candidate = WidgetId((state >> 40) % (registry.next_id + 1));
                registry.delete_slot(candidate);
            }
            assert!(registry.len() >= 1);
            assert_unique_ids(&registry);
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut registry = WidgetRegistry::initialize(2);
        registry.bind_and_update(WidgetId(1), paris());
        registry.add_slot();
        let snapshot = registry.snapshot();

        let mut restored = WidgetRegistry::initialize(1);
        assert_eq!(restored.load_from(snapshot.clone()), Ok(3));
        assert_eq!(restored.snapshot(), snapshot);

        // Fresh ids continue past the loaded ones
        assert_eq!(restored.add_slot(), Some(WidgetId(4)));
    }

    #[test]
    fn test_snapshot_serde_roundtrip() {
        let mut registry = WidgetRegistry::initialize(2);
        registry.bind_and_update(WidgetId(2), paris());

        let json = serde_json::to_string(&registry.snapshot()).unwrap();
        let parsed: RegistrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, registry.snapshot());
    }

    #[test]
    fn test_load_rejects_invalid_snapshots() {
        let mut registry = WidgetRegistry::initialize(2);
        let before = registry.snapshot();

        let empty: RegistrySnapshot = serde_json::from_str("[]").unwrap();
        assert_eq!(registry.load_from(empty), Err(SnapshotError::Empty));

        let dup: RegistrySnapshot =
            serde_json::from_str(r#"[{"id": 1}, {"id": 1}]"#).unwrap();
        assert_eq!(registry.load_from(dup), Err(SnapshotError::DuplicateId(WidgetId(1))));

        let hollow: RegistrySnapshot =
            serde_json::from_str(r#"[{"id": 5, "name": "Rome", "is_resolved": true}]"#).unwrap();
        assert_eq!(
            registry.load_from(hollow),
            Err(SnapshotError::ResolvedWithoutReading(WidgetId(5)))
        );

        let huge: RegistrySnapshot =
            serde_json::from_str(r#"[{"id": 1}, {"id": 18446744073709551615}]"#).unwrap();
        assert_eq!(
            registry.load_from(huge),
            Err(SnapshotError::IdOutOfRange(WidgetId(u64::MAX)))
        );

        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn test_add_stops_at_id_ceiling() {
        let mut registry = WidgetRegistry::initialize(1);
        let snapshot: RegistrySnapshot =
            serde_json::from_str(&format!(r#"[{{"id": {}}}]"#, MAX_WIDGET_ID - 1)).unwrap();
        assert_eq!(registry.load_from(snapshot), Ok(1));

        assert_eq!(registry.add_slot(), Some(WidgetId(MAX_WIDGET_ID)));
        assert_eq!(registry.add_slot(), None);
        assert_eq!(registry.len(), 2);
        assert_unique_ids(&registry);
    }

    #[test]
    fn test_request_requires_bound_name() {
        let mut registry = WidgetRegistry::initialize(2);
        assert!(registry.begin_request(WidgetId(1)).is_none());
        assert!(registry.begin_request(WidgetId(77)).is_none());
        assert!(registry.begin_request_for(WidgetId(1), "   ").is_none());

        let ticket = registry.begin_request_for(WidgetId(1), " Paris ").unwrap();
        assert_eq!(ticket.city, "Paris");
    }

    #[test]
    fn test_older_result_after_newer_is_discarded() {
        let mut registry = WidgetRegistry::initialize(1);
        let first = registry.begin_request_for(WidgetId(1), "Paris").unwrap();
        let second = registry.begin_request_for(WidgetId(1), "Paris").unwrap();

        let newer = WeatherReading::new("Paris", 16.0, 10.0, 18.0);
        assert_eq!(registry.complete_request(&second, newer), UpdateOutcome::Applied);
        assert_eq!(registry.complete_request(&first, paris()), UpdateOutcome::Superseded);
        assert_eq!(registry.get(WidgetId(1)).unwrap().temperature().current, 16.0);
    }

    #[test]
    fn test_results_in_issue_order_all_apply() {
        let mut registry = WidgetRegistry::initialize(1);
        let first = registry.begin_request_for(WidgetId(1), "Paris").unwrap();
        let second = registry.begin_request_for(WidgetId(1), "Paris").unwrap();

        assert_eq!(registry.complete_request(&first, paris()), UpdateOutcome::Applied);
        assert_eq!(
            registry.complete_request(&second, WeatherReading::new("Paris", 17.0, 10.0, 18.0)),
            UpdateOutcome::Applied
        );
    }

    #[test]
    fn test_reset_supersedes_in_flight_request() {
        let mut registry = WidgetRegistry::initialize(1);
        registry.bind_and_update(WidgetId(1), paris());
        let ticket = registry.begin_request(WidgetId(1)).unwrap();

        registry.reset_slot(WidgetId(1));
        assert_eq!(registry.complete_request(&ticket, paris()), UpdateOutcome::Superseded);
        assert!(!registry.get(WidgetId(1)).unwrap().is_resolved());
    }

    #[test]
    fn test_result_for_deleted_slot_is_missing() {
        let mut registry = WidgetRegistry::initialize(2);
        let ticket = registry.begin_request_for(WidgetId(2), "Paris").unwrap();
        registry.delete_slot(WidgetId(2));

        assert_eq!(registry.complete_request(&ticket, paris()), UpdateOutcome::Missing);
        assert_eq!(registry.ids(), vec![WidgetId(1)]);
    }

    #[test]
    fn test_overflows() {
        let mut registry = WidgetRegistry::initialize(1);
        assert!(!registry.overflows(1));
        registry.add_slot();
        assert!(registry.overflows(1));
        assert!(!registry.overflows(2));
    }
}

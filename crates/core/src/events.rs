//! Realtime change notifications.
//!
//! Every mutation publishes an entity event (`appointmentCreated`, `patientDeleted`, ...)
//! followed by a generic `dashboardUpdate`. Clients treat them as hints to re-fetch.

use crate::constants::EVENT_CHANNEL_CAPACITY;
use hms_uuid::RecordId;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Appointment,
    Patient,
    Prescription,
}

impl EntityKind {
    fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Appointment => "appointment",
            EntityKind::Patient => "patient",
            EntityKind::Prescription => "prescription",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

impl ChangeAction {
    fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Created => "created",
            ChangeAction::Updated => "updated",
            ChangeAction::Deleted => "deleted",
        }
    }
}

/// Name of the entity-specific event for a change.
pub fn event_name(kind: EntityKind, action: ChangeAction) -> &'static str {
    match (kind, action) {
        (EntityKind::Appointment, ChangeAction::Created) => "appointmentCreated",
        (EntityKind::Appointment, ChangeAction::Updated) => "appointmentUpdated",
        (EntityKind::Appointment, ChangeAction::Deleted) => "appointmentDeleted",
        (EntityKind::Patient, ChangeAction::Created) => "patientCreated",
        (EntityKind::Patient, ChangeAction::Updated) => "patientUpdated",
        (EntityKind::Patient, ChangeAction::Deleted) => "patientDeleted",
        (EntityKind::Prescription, ChangeAction::Created) => "prescriptionAdded",
        (EntityKind::Prescription, ChangeAction::Updated) => "prescriptionUpdated",
        (EntityKind::Prescription, ChangeAction::Deleted) => "prescriptionDeleted",
    }
}

pub const DASHBOARD_UPDATE: &str = "dashboardUpdate";

/// One message on the push channel, sent to clients as a JSON text frame.
#[derive(Clone, Debug, Serialize, ToSchema, PartialEq)]
pub struct HospitalEvent {
    pub event: String,
    #[schema(value_type = Object)]
    pub data: Value,
}

#[derive(Clone, Debug)]
pub struct EventHub {
    tx: broadcast::Sender<HospitalEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HospitalEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: HospitalEvent) {
        // A send error only means nobody is listening.
        let _ = self.tx.send(event);
    }

    /// Publishes the entity event for a change and the matching `dashboardUpdate`.
    pub fn publish_change<T: Serialize>(&self, kind: EntityKind, action: ChangeAction, data: &T) {
        let data = match serde_json::to_value(data) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!("failed to serialise {} event: {}", kind.as_str(), e);
                return;
            }
        };
        tracing::debug!(
            event = event_name(kind, action),
            receivers = self.tx.receiver_count(),
            "publishing change"
        );
        self.publish(HospitalEvent {
            event: event_name(kind, action).to_string(),
            data: data.clone(),
        });
        self.publish(HospitalEvent {
            event: DASHBOARD_UPDATE.to_string(),
            data: json!({
                "type": kind.as_str(),
                "action": action.as_str(),
                "data": data,
            }),
        });
    }

    /// Publishes a deletion, whose payload is just `{ "id": ... }`.
    pub fn publish_deleted(&self, kind: EntityKind, id: RecordId) {
        self.publish_change(kind, ChangeAction::Deleted, &json!({ "id": id.to_string() }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishing_without_subscribers_is_a_no_op() {
        let hub = EventHub::new();
        hub.publish_deleted(EntityKind::Patient, RecordId::new());
    }

    #[tokio::test]
    async fn change_is_followed_by_dashboard_update() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();

        hub.publish_change(
            EntityKind::Prescription,
            ChangeAction::Created,
            &json!({ "notes": "Metformin" }),
        );

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event, "prescriptionAdded");
        assert_eq!(first.data["notes"], "Metformin");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.event, "dashboardUpdate");
        assert_eq!(second.data["type"], "prescription");
        assert_eq!(second.data["action"], "created");
        assert_eq!(second.data["data"]["notes"], "Metformin");
    }

    #[tokio::test]
    async fn deletes_carry_only_the_id() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();
        let id = RecordId::new();

        hub.publish_deleted(EntityKind::Appointment, id);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, "appointmentDeleted");
        assert_eq!(event.data, json!({ "id": id.to_string() }));
    }
}

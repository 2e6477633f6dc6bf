use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::entities::BatchStatus;

/// Domain events published after a unit of work commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    InspectionSubmitted {
        inspection_id: Uuid,
        farm_id: Uuid,
        vendor_id: Uuid,
        estimated_boxes: i32,
    },
    InspectionApproved {
        inspection_id: Uuid,
        batch_id: Uuid,
        batch_code: String,
        vendor_id: Uuid,
    },
    InspectionRejected {
        inspection_id: Uuid,
        vendor_id: Uuid,
        reason: Option<String>,
    },
    BatchStatusChanged {
        batch_id: Uuid,
        from: BatchStatus,
        to: BatchStatus,
    },
    HarvestReported {
        batch_id: Uuid,
        report_id: Uuid,
        boxes_packed: i32,
        harvested_boxes: i32,
        remaining_boxes: i32,
    },
    GatePassCreated {
        gate_pass_id: Uuid,
        gate_pass_no: String,
        batch_id: Uuid,
        total_boxes: i32,
    },
    GatePassReceived {
        gate_pass_id: Uuid,
        batch_id: Uuid,
        received_boxes: i32,
    },
    GatePassShortage {
        gate_pass_id: Uuid,
        gate_pass_no: String,
        batch_id: Uuid,
        total_boxes: i32,
        received_boxes: i32,
        shortage: i32,
    },
    CostsRecalculated {
        batch_id: Uuid,
        total_cost: Decimal,
        final_cost_per_box: Decimal,
        calculated_at: DateTime<Utc>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::InspectionSubmitted { .. } => "inspection_submitted",
            Event::InspectionApproved { .. } => "inspection_approved",
            Event::InspectionRejected { .. } => "inspection_rejected",
            Event::BatchStatusChanged { .. } => "batch_status_changed",
            Event::HarvestReported { .. } => "harvest_reported",
            Event::GatePassCreated { .. } => "gate_pass_created",
            Event::GatePassReceived { .. } => "gate_pass_received",
            Event::GatePassShortage { .. } => "gate_pass_shortage",
            Event::CostsRecalculated { .. } => "costs_recalculated",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, waiting for channel capacity.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Fire-and-forget publish. A full or closed channel is logged and the
    /// event dropped; callers never see the failure.
    pub fn notify(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.sender.try_send(event) {
            metrics::counter!("harvest_api.events.dropped", 1, "event" => name);
            warn!(event = name, error = %e, "Dropping notification");
        }
    }
}

/// Delivery side of notifications (push, email, SMS...). Only the log
/// notifier ships with this service.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &Event) -> Result<(), String>;
}

/// Writes every event as a structured log line.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &Event) -> Result<(), String> {
        match event {
            Event::GatePassShortage {
                gate_pass_no,
                batch_id,
                shortage,
                ..
            } => warn!(
                event = event.name(),
                gate_pass_no = %gate_pass_no,
                batch_id = %batch_id,
                shortage,
                "Gate pass received short"
            ),
            Event::InspectionApproved { batch_code, vendor_id, .. } => info!(
                event = event.name(),
                batch_code = %batch_code,
                vendor_id = %vendor_id,
                "Inspection approved, batch opened"
            ),
            _ => {
                let payload = serde_json::to_string(event).map_err(|e| e.to_string())?;
                info!(event = event.name(), payload = %payload, "Notification");
            }
        }
        Ok(())
    }
}

/// Drains the channel until every sender is dropped. Notifier failures are
/// logged and never propagate.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, notifier: Arc<dyn Notifier>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        metrics::counter!("harvest_api.events.processed", 1, "event" => event.name());
        if let Err(e) = notifier.notify(&event).await {
            error!(event = event.name(), error = %e, "Notifier failed");
        }
    }

    info!("Event channel closed; stopping event processing");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<Event>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, event: &Event) -> Result<(), String> {
            self.seen.lock().unwrap().push(event.clone());
            if self.fail {
                Err("smtp down".into())
            } else {
                Ok(())
            }
        }
    }

    fn received(id: Uuid) -> Event {
        Event::GatePassReceived {
            gate_pass_id: id,
            batch_id: id,
            received_boxes: 10,
        }
    }

    #[tokio::test]
    async fn process_events_delivers_in_order_and_survives_failures() {
        let (tx, rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        let notifier = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        sender.notify(received(a));
        sender.send(received(b)).await.unwrap();
        drop(sender);

        process_events(rx, notifier.clone()).await;
        let seen = notifier.seen.lock().unwrap();
        assert_eq!(*seen, vec![received(a), received(b)]);
    }

    #[tokio::test]
    async fn notify_on_full_channel_does_not_block_or_fail() {
        let (tx, mut rx) = mpsc::channel(1);
        let sender = EventSender::new(tx);
        sender.notify(received(Uuid::new_v4()));
        sender.notify(received(Uuid::new_v4()));

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(Event::BatchStatusChanged {
            batch_id: Uuid::nil(),
            from: BatchStatus::DispatchCompleted,
            to: BatchStatus::InTransit,
        })
        .unwrap();
        assert_eq!(json["type"], "batch_status_changed");
        assert_eq!(json["to"], "IN_TRANSIT");
    }

    #[tokio::test]
    async fn log_notifier_accepts_every_event() {
        let n = LogNotifier;
        assert!(n.notify(&received(Uuid::nil())).await.is_ok());
    }
}

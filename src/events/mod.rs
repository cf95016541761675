use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by services after a successful mutation. Handlers
/// run outside the request path; a full channel must never block a write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),

    CategoryCreated(Uuid),
    CategoryUpdated(Uuid),
    CategoryDeleted(Uuid),

    SupplierCreated(Uuid),
    SupplierUpdated(Uuid),
    SupplierDeleted(Uuid),

    UserRegistered(Uuid),
    UserUpdated(Uuid),
    UserDeactivated(Uuid),

    StockMovementRecorded {
        movement_id: Uuid,
        product_id: Uuid,
        quantity_change: i32,
        new_quantity: i32,
    },
    StockMovementReversed {
        movement_id: Uuid,
        product_id: Uuid,
        new_quantity: i32,
    },
    LowStockDetected {
        product_id: Uuid,
        quantity: i32,
        threshold: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Fire-and-forget variant used inside request handling. Drops the event
    /// with a warning if the channel is full rather than stalling the caller.
    pub fn send_or_log(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("event channel full, dropping event: {}", e);
        }
    }
}

/// Processes events from the channel until all senders are dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::LowStockDetected {
                product_id,
                quantity,
                threshold,
            } => {
                warn!(
                    product_id = %product_id,
                    quantity,
                    threshold,
                    "product is at or below its low-stock threshold"
                );
            }
            Event::StockMovementRecorded {
                movement_id,
                product_id,
                quantity_change,
                new_quantity,
            } => {
                info!(
                    movement_id = %movement_id,
                    product_id = %product_id,
                    quantity_change,
                    new_quantity,
                    "stock movement recorded"
                );
            }
            other => {
                info!(event = ?other, "event received");
            }
        }
    }

    info!("Event processing loop stopped");
}

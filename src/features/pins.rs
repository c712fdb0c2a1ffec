//! Pin Board
//!
//! Shared task/pin items. A pin placed on one node floods to every node as a
//! task message; each board keeps its own local list.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::mesh::service::{MeshService, SendError, SubscriptionId};
use crate::mesh::transport::BroadcastOutcome;
use crate::message::message_types::{MessageKind, MessagePayload};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    pub title: String,
    pub text_context: String,
    /// Opaque attachment payload (e.g. a base64 blob or a path).
    pub file_data: String,
    pub placed_by: String,
    pub placed_at: DateTime<Utc>,
}

pub struct PinBoard {
    mesh: Arc<MeshService>,
    pins: Arc<Mutex<Vec<Pin>>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl PinBoard {
    pub fn new(mesh: Arc<MeshService>) -> Self {
        Self {
            mesh,
            pins: Arc::new(Mutex::new(Vec::new())),
            subscription: Mutex::new(None),
        }
    }

    /// Start collecting task messages from the mesh into this board.
    pub fn attach(&self) {
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            return;
        }
        let pins = Arc::clone(&self.pins);
        let id = self.mesh.subscribe(MessageKind::Task, move |message| {
            if let MessagePayload::Task {
                title,
                text_context,
                file_data,
            } = &message.payload
            {
                info!("pin received from {}: {title}", message.sender_display_name());
                pins.lock().push(Pin {
                    title: title.clone(),
                    text_context: text_context.clone(),
                    file_data: file_data.clone(),
                    placed_by: message.sender_display_name().to_string(),
                    placed_at: Utc::now(),
                });
            }
        });
        *subscription = Some(id);
    }

    pub fn detach(&self) {
        if let Some(id) = self.subscription.lock().take() {
            self.mesh.unsubscribe(id);
        }
    }

    /// Place a pin locally and share it with the mesh.
    pub async fn share_pin(
        &self,
        title: &str,
        text_context: &str,
        file_data: &str,
    ) -> Result<BroadcastOutcome, SendError> {
        let outcome = self
            .mesh
            .send(MessagePayload::task(title, text_context, file_data))
            .await?;

        // Own sends never flood back, so the local copy is added here.
        self.pins.lock().push(Pin {
            title: title.to_string(),
            text_context: text_context.to_string(),
            file_data: file_data.to_string(),
            placed_by: self.mesh.identity().name(),
            placed_at: Utc::now(),
        });
        Ok(outcome)
    }

    pub fn pins(&self) -> Vec<Pin> {
        self.pins.lock().clone()
    }

    /// Drop the first pin with a matching title. Returns false when no pin
    /// matched.
    pub fn remove_pin(&self, title: &str) -> bool {
        let mut pins = self.pins.lock();
        if let Some(index) = pins.iter().position(|pin| pin.title == title) {
            pins.remove(index);
            true
        } else {
            false
        }
    }
}

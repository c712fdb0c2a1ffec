//! Quick Chat
//!
//! One-tap alert beacons carrying the sender's position and a canned phrase.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::mesh::service::{MeshService, SendError, SubscriptionId};
use crate::mesh::transport::BroadcastOutcome;
use crate::message::message_types::{MessageKind, MessagePayload, QuickChatKind};

impl QuickChatKind {
    /// Canned phrase shown for an alert of this kind.
    pub fn phrase(self) -> &'static str {
        match self {
            QuickChatKind::Help => "Need assistance at my position immediately.",
            QuickChatKind::Found => "Objective located. Converge on my position.",
            QuickChatKind::Other => "Status update from the field.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuickAlert {
    pub sender: String,
    pub longitude: f32,
    pub latitude: f32,
    pub kind: QuickChatKind,
    pub received_at: DateTime<Utc>,
}

pub struct QuickChatService {
    mesh: Arc<MeshService>,
    alerts: Arc<Mutex<Vec<QuickAlert>>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl QuickChatService {
    pub fn new(mesh: Arc<MeshService>) -> Self {
        Self {
            mesh,
            alerts: Arc::new(Mutex::new(Vec::new())),
            subscription: Mutex::new(None),
        }
    }

    pub fn attach(&self) {
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            return;
        }
        let alerts = Arc::clone(&self.alerts);
        let id = self.mesh.subscribe(MessageKind::QuickChat, move |message| {
            if let MessagePayload::QuickChat {
                longitude,
                latitude,
                kind,
            } = &message.payload
            {
                alerts.lock().push(QuickAlert {
                    sender: message.sender_display_name().to_string(),
                    longitude: *longitude,
                    latitude: *latitude,
                    kind: *kind,
                    received_at: Utc::now(),
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

    pub async fn send_alert(
        &self,
        longitude: f32,
        latitude: f32,
        kind: QuickChatKind,
    ) -> Result<BroadcastOutcome, SendError> {
        self.mesh
            .send(MessagePayload::quick_chat(longitude, latitude, kind))
            .await
    }

    pub fn alerts(&self) -> Vec<QuickAlert> {
        self.alerts.lock().clone()
    }
}

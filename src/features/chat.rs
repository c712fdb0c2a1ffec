//! Chat
//!
//! Text messaging over the mesh service.

use std::sync::Arc;

use crate::mesh::service::{MeshService, SendError, SubscriptionId};
use crate::mesh::transport::BroadcastOutcome;
use crate::message::message_types::{MeshMessage, MessageHeader, MessageKind, MessagePayload};

pub struct ChatService {
    mesh: Arc<MeshService>,
}

impl ChatService {
    pub fn new(mesh: Arc<MeshService>) -> Self {
        Self { mesh }
    }

    pub async fn send_chat(&self, text: &str) -> Result<BroadcastOutcome, SendError> {
        self.mesh.send(MessagePayload::text(text)).await
    }

    /// Register a callback for incoming chat text.
    pub fn subscribe_chat<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&MessageHeader, &str) + Send + Sync + 'static,
    {
        self.mesh.subscribe(MessageKind::Text, move |message| {
            if let MessagePayload::Text { message: body } = &message.payload {
                handler(&message.header, body);
            }
        })
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.mesh.unsubscribe(id)
    }

    /// Full chat history in receipt order, own messages included.
    pub fn chat_messages(&self) -> Vec<MeshMessage> {
        self.mesh.messages_of_kind(MessageKind::Text)
    }

    pub async fn participant_count(&self) -> usize {
        self.mesh.participant_count().await
    }
}

//! TrailMesh Simulator
//!
//! Runs a three-node line topology (alpha — bravo — charlie) over the
//! loopback transport in one process. Alpha and charlie have no direct
//! link; everything they exchange travels through bravo's re-broadcasts.
//!
//! Run with `RUST_LOG=debug` to watch frames flood and duplicates drop.

use std::sync::Arc;

use anyhow::Result;
use log::info;
use tokio::time::{sleep, Duration};

use trailmesh::{
    ChatService, LoopbackMesh, LogReporter, MemoryPreferences, MeshService, MessageKind,
    MessagePayload, NodeIdentity, PinBoard, QuickChatKind, QuickChatService,
};

fn spawn_node(
    mesh: &Arc<LoopbackMesh>,
    endpoint_id: &str,
    node_id: u8,
    name: &str,
) -> Result<Arc<MeshService>> {
    let identity = NodeIdentity::with_id(node_id, Arc::new(MemoryPreferences::new()));
    identity.set_name(name);
    let transport = Arc::new(mesh.endpoint(endpoint_id, name));
    let service = MeshService::new(identity, transport, Arc::new(LogReporter));
    service.start()?;
    Ok(service)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    info!("=== TrailMesh: flood-routing simulation ===");

    let mesh = LoopbackMesh::new();
    let alpha = spawn_node(&mesh, "node-alpha", 1, "Alpha")?;
    let bravo = spawn_node(&mesh, "node-bravo", 2, "Bravo")?;
    let charlie = spawn_node(&mesh, "node-charlie", 3, "Charlie")?;

    // Line topology: alpha and charlie can only reach each other via bravo.
    mesh.link("node-alpha", "node-bravo");
    mesh.link("node-bravo", "node-charlie");

    charlie.subscribe(MessageKind::Text, |message| {
        info!(
            "[charlie] chat from {}: {}",
            message.sender_display_name(),
            message.as_text().unwrap_or_default()
        );
    });

    let charlie_pins = PinBoard::new(Arc::clone(&charlie));
    charlie_pins.attach();
    let alpha_alerts = QuickChatService::new(Arc::clone(&alpha));
    alpha_alerts.attach();

    for service in [&alpha, &bravo, &charlie] {
        service.announce_connected().await?;
    }

    let chat = ChatService::new(Arc::clone(&alpha));
    chat.send_chat("Hello from the trailhead").await?;
    alpha
        .send(MessagePayload::task(
            "Water cache",
            "two liters behind the cairn at the fork",
            "",
        ))
        .await?;

    let charlie_quick = QuickChatService::new(Arc::clone(&charlie));
    charlie_quick
        .send_alert(8.5417, 47.3769, QuickChatKind::Found)
        .await?;

    // Let the frames flood through bravo.
    sleep(Duration::from_millis(200)).await;

    info!(
        "alpha sees {} participants, charlie has {} pin(s), alpha has {} alert(s)",
        alpha.participant_count().await,
        charlie_pins.pins().len(),
        alpha_alerts.alerts().len()
    );
    for alert in alpha_alerts.alerts() {
        info!(
            "[alpha] {} @ ({:.4}, {:.4}): {}",
            alert.sender,
            alert.longitude,
            alert.latitude,
            alert.kind.phrase()
        );
    }

    info!("bravo status: {}", bravo.status().await);

    Ok(())
}

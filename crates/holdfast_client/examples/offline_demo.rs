//! Walks through an offline editing session followed by a reconnect.
//!
//! Run with `cargo run --example offline_demo` and watch the tracing
//! output to see the journal fill up and drain.

use holdfast_client::{ClientConfig, MockRemote, OfflineClient};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("demo.log");

    let client = OfflineClient::open(
        &path,
        MockRemote::new(),
        ClientConfig::default().starting_offline(),
    )?;

    // Edits made while offline land in the local store and the journal.
    client.create(
        "p1",
        "presentation",
        serde_json::to_vec(&serde_json::json!({"title": "Offline first"}))?,
    )?;
    client.save(
        "s1",
        "slide",
        serde_json::to_vec(&serde_json::json!({"order": 1, "layout": "title"}))?,
    )?;
    client.save(
        "p1",
        "presentation",
        serde_json::to_vec(&serde_json::json!({"title": "Offline first, revised"}))?,
    )?;

    println!("offline: {} changes queued", client.pending_count());

    // Coming back online drains the journal oldest-first.
    client.set_online(true);

    println!("online: {} changes queued", client.pending_count());
    for change in client.remote().applied() {
        println!(
            "  pushed {} {} ({})",
            change.action.as_str(),
            change.entity_id,
            change.entity_type
        );
    }

    Ok(())
}

//! Example: connect to a bridge and print every notification it emits.

use lutron_lip_bridge::BridgeRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let registry = BridgeRegistry::new();
    let session = registry.get_or_create("192.168.1.100");

    session.open().await;
    println!("Connected: {}", session.is_connected());

    session.register(|frame| {
        println!(
            "~{},{},{},{:.2}",
            frame.mode, frame.integration_id, frame.action, frame.value
        );
    });
    session.start();

    println!("Press Ctrl+C to disconnect...");
    tokio::signal::ctrl_c().await?;
    session.stop().await;
    println!("Disconnected.");

    Ok(())
}

//! Scan command implementation.

use anyhow::{Context, Result};

use gale_core::discovery;
use gale_core::registry::Peer;

use super::ScanArgs;

/// Run the scan command.
pub async fn run(args: ScanArgs) -> Result<()> {
    let global_config = super::load_config();
    let port = args
        .discovery_port
        .unwrap_or(global_config.network.discovery_port);

    let duration = super::parse_duration(&args.duration)
        .context("Invalid duration format. Use formats like '5s', '10s', '30s'")?;

    if !args.json {
        println!();
        println!("Listening for devices ({})...", args.duration);
        println!();
    }

    let mut peers = discovery::scan(port, duration)
        .await
        .context("Failed to listen on the discovery port")?;
    peers.sort_by(|a, b| a.name.cmp(&b.name));

    if args.json {
        output_json(&peers);
    } else {
        display_peers(&peers);
    }

    Ok(())
}

/// Output peers as JSON.
fn output_json(peers: &[Peer]) {
    let output = serde_json::json!({
        "devices": peers.iter().map(|p| serde_json::json!({
            "name": p.name,
            "address": p.address.to_string(),
        })).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}

/// Display peers as a text table.
fn display_peers(peers: &[Peer]) {
    if peers.is_empty() {
        println!("No devices found.");
        println!();
        println!("Make sure another device is running 'gale serve' on this network.");
        return;
    }

    println!("Devices on Network:");
    println!("{}", "─".repeat(40));
    println!("  {:20}  {:15}", "Name", "Address");
    println!("{}", "─".repeat(40));
    for peer in peers {
        println!("  {:20}  {:15}", peer.name, peer.address);
    }
    println!();
    println!("{} device(s) found.", peers.len());
}

//! Serve command implementation.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use gale_core::access::AccessPolicy;
use gale_core::discovery::DiscoveryService;
use gale_core::registry::PeerRegistry;
use gale_core::share::ShareRoot;
use gale_core::web::{self, AppState, ServerConfig};
use gale_core::Error;

use super::ServeArgs;

/// Run the serve command.
pub async fn run(args: ServeArgs) -> Result<()> {
    let mut config = super::load_config();

    if let Some(name) = args.name {
        config.general.device_name = name;
    }
    if let Some(port) = args.port {
        config.network.port = port;
    }
    if let Some(port) = args.discovery_port {
        config.network.discovery_port = port;
    }
    if let Some(secret) = args.secret {
        config.security.access_secret = secret;
    }
    if args.localhost_only {
        config.network.localhost_only = true;
    }

    let root_path = args.root.unwrap_or_else(|| config.share.root.clone());
    if root_path.as_os_str().is_empty() {
        bail!(
            "No share root configured.\n\
             Pass one with --root <dir> or persist it with 'gale config set root <dir>'."
        );
    }

    let share = ShareRoot::open(&root_path)
        .with_context(|| format!("cannot open share root {}", root_path.display()))?;

    let registry = Arc::new(PeerRegistry::new());

    let discovery = if args.no_discovery {
        None
    } else {
        match DiscoveryService::start(
            &config.general.device_name,
            config.network.discovery_port,
            config.network.broadcast_interval,
            Arc::clone(&registry),
        )
        .await
        {
            Ok(service) => Some(service),
            // Discovery is best-effort: file serving stays up without it.
            Err(e @ Error::BindFailed { .. }) => {
                tracing::warn!("discovery disabled: {}", e);
                None
            }
            Err(e) => return Err(e.into()),
        }
    };

    let policy = AccessPolicy::from(&config.security);
    let state = AppState::new(share, policy, Arc::clone(&registry));

    let server_config = ServerConfig {
        port: config.network.port,
        localhost_only: config.network.localhost_only,
    };

    println!();
    println!("Gale");
    println!("{}", "─".repeat(40));
    println!();
    println!("  Sharing:  {}", root_path.display());
    println!("  Device:   {}", config.general.device_name);
    println!("  API:      http://localhost:{}", config.network.port);
    if discovery.is_some() {
        println!("  Discovery: udp/{}", config.network.discovery_port);
    } else {
        println!("  Discovery: off");
    }
    if !config.security.access_secret.is_empty() {
        println!("  Access:   secret required");
    }
    println!();
    println!("Press Ctrl+C to stop.");
    println!();

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    let served = web::serve(&server_config, state, shutdown).await;

    if let Some(discovery) = discovery {
        discovery.stop().await;
    }

    served?;

    println!();
    println!("Server stopped.");

    Ok(())
}

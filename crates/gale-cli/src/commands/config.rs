//! Config command implementation.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use gale_core::config::Config;

use super::{ConfigAction, ConfigArgs};

/// Run the config command.
pub fn run(args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => show(),
        ConfigAction::Path => {
            println!("{}", Config::config_path().display());
            Ok(())
        }
        ConfigAction::Set { key, value } => set(&key, &value),
        ConfigAction::Allow { ip } => allow(&ip, true),
        ConfigAction::Disallow { ip } => allow(&ip, false),
        ConfigAction::GenSecret => gen_secret(),
    }
}

fn show() -> Result<()> {
    let config = super::load_config();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("Failed to render configuration")?
    );
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    let mut config = super::load_config();

    match key {
        "device-name" => config.general.device_name = value.to_string(),
        "root" => config.share.root = PathBuf::from(value),
        "port" => config.network.port = value.parse().context("port must be a number")?,
        "discovery-port" => {
            config.network.discovery_port = value.parse().context("port must be a number")?;
        }
        "secret" => config.security.access_secret = value.to_string(),
        other => bail!(
            "Unknown key '{other}'.\n\
             Available keys: device-name, root, port, discovery-port, secret"
        ),
    }

    config.save()?;
    println!("✓ Set {key}");
    Ok(())
}

fn allow(ip: &str, add: bool) -> Result<()> {
    let ip: IpAddr = ip.parse().context("not a valid IP address")?;
    let mut config = super::load_config();

    if add {
        config.security.allowed_ips.insert(ip);
        println!("✓ {ip} added to the allow list");
    } else if config.security.allowed_ips.remove(&ip) {
        println!("✓ {ip} removed from the allow list");
    } else {
        println!("{ip} was not on the allow list");
    }

    config.save()?;
    Ok(())
}

fn gen_secret() -> Result<()> {
    let secret = generate_secret();

    let mut config = super::load_config();
    config.security.access_secret = secret.clone();
    config.save()?;

    println!("✓ Access secret set");
    println!();
    println!("  Secret: {secret}");
    println!();
    println!("Peers must send it in the Authorization header.");
    Ok(())
}

/// Generate a random access secret.
///
/// The charset omits easily confused characters (0/O, 1/l/I).
fn generate_secret() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    (0..12)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

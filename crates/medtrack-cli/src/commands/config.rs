use std::path::PathBuf;

use clap::Subcommand;
use medtrack_core::Config;
use serde::Serialize;

/// Keys computed from the stored settings rather than stored themselves.
const RESOLVED_KEYS: [&str; 2] = ["zone", "database_location"];

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one setting, or a resolved value ("zone", "database_location")
    Get {
        /// Dot path such as "timezone" or "engine.rate_window_days"
        key: String,
    },
    /// Change a stored setting; the new value is validated before saving
    Set {
        key: String,
        value: String,
    },
    /// Show stored settings alongside the zone and database they resolve to
    List,
    /// Restore default settings (UTC, 365-day lookback, 30-day rate window)
    Reset,
}

#[derive(Serialize)]
struct Resolved {
    zone: &'static str,
    database_location: PathBuf,
}

#[derive(Serialize)]
struct Listing<'a> {
    settings: &'a Config,
    resolved: Resolved,
}

fn resolve(config: &Config) -> Result<Resolved, Box<dyn std::error::Error>> {
    Ok(Resolved {
        zone: config.zone()?.name(),
        database_location: config.database_location()?,
    })
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = match key.as_str() {
                "zone" => Some(resolve(&config)?.zone.to_string()),
                "database_location" => {
                    Some(resolve(&config)?.database_location.display().to_string())
                }
                _ => config.get(&key),
            };
            let value = value.ok_or_else(|| {
                format!(
                    "unknown key: {key} (resolved keys: {})",
                    RESOLVED_KEYS.join(", ")
                )
            })?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            tracing::info!(%key, %value, "configuration updated");
            println!("{key} = {}", config.get(&key).unwrap_or(value));
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let listing = Listing {
                settings: &config,
                resolved: resolve(&config)?,
            };
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("timezone = {}", config.timezone);
        }
    }
    Ok(())
}

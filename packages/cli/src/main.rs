#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line browser for the incident map.
//!
//! ```text
//! incident_map frame [--near] [--all] [--years 2024] [--months 1,2] [--categories Vol]
//!                    [--highlight ID] [--hide-stations]
//! incident_map vocab
//! incident_map feed [--near] [--all] [--limit 50]
//! incident_map home show
//! incident_map home set (--lat 45.5 --lng -73.6 | --address "...") [--radius 400]
//! incident_map home clear
//! ```
//!
//! Configuration comes from `INCIDENT_MAP_*` environment variables (see
//! [`incident_map_client::ClientConfig::from_env`]). Set `RUST_LOG=debug`
//! to see stale-result and retry decisions.

mod filters;

use clap::{Parser, Subcommand};
use incident_map_cli_utils::{MultiProgress, with_spinner};
use incident_map_client::{ApiClient, ClientConfig};
use incident_map_filter::{apply_filters, feed::newest_first};
use incident_map_incident_models::{DEFAULT_HOME_RADIUS_M, HomeProfile, IncidentId, IncidentPoint};
use incident_map_session::{
    LoadOutcome, Session, SessionError,
    frame::{FrameOptions, build_frame},
    hover::HoverLink,
};

use crate::filters::FilterArgs;

#[derive(Parser)]
#[command(name = "incident_map", about = "Browse incidents from the incident map backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the map's render frame and print it as JSON
    Frame {
        #[command(flatten)]
        filters: FilterArgs,
        /// Show incidents near the saved home location (needs a token)
        #[arg(long)]
        near: bool,
        /// Incident id to highlight
        #[arg(long)]
        highlight: Option<String>,
        /// Leave out the police station layer
        #[arg(long)]
        hide_stations: bool,
    },
    /// Print the years and categories available as filters
    Vocab,
    /// Print the filtered incidents, newest first
    Feed {
        #[command(flatten)]
        filters: FilterArgs,
        /// Show incidents near the saved home location (needs a token)
        #[arg(long)]
        near: bool,
        /// Maximum number of incidents to print
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Show, save or clear the home location
    Home {
        #[command(subcommand)]
        command: HomeCommand,
    },
}

#[derive(Subcommand)]
enum HomeCommand {
    /// Print the saved home location
    Show,
    /// Save the home location from coordinates or an address
    Set {
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Address to geocode instead of coordinates
        #[arg(long, conflicts_with_all = ["lat", "lng"])]
        address: Option<String>,
        /// Radius in meters (clamped to 50-5000)
        #[arg(long, default_value_t = DEFAULT_HOME_RADIUS_M)]
        radius: f64,
    },
    /// Remove the home coordinates
    Clear {
        /// Radius in meters to keep on the profile
        #[arg(long, default_value_t = DEFAULT_HOME_RADIUS_M)]
        radius: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = incident_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = ClientConfig::from_env();
    log::debug!("Using backend at {}", config.api_base);
    let client = ApiClient::new(config)?;

    match cli.command {
        Commands::Frame {
            filters,
            near,
            highlight,
            hide_stations,
        } => {
            let session = load_session(&multi, client, near).await?;

            let mut hover = HoverLink::new();
            if let Some(id) = highlight {
                hover.set_highlighted(Some(&IncidentId::from(id)));
                if hover.highlighted().is_none() {
                    log::warn!("Highlight id is not numeric; nothing will be highlighted");
                }
            }
            let options = FrameOptions {
                show_police_stations: !hide_stations,
            };

            let frame = session
                .read(|s| build_frame(s, &filters.to_state(s.vocabulary()), &hover, options))
                .await;
            println!("{}", serde_json::to_string_pretty(&frame)?);
        }
        Commands::Vocab => {
            let session = load_session(&multi, client, false).await?;
            let vocabulary = session.read(|s| s.vocabulary().clone()).await;
            println!("{}", serde_json::to_string_pretty(&vocabulary)?);
        }
        Commands::Feed {
            filters,
            near,
            limit,
        } => {
            let session = load_session(&multi, client, near).await?;
            let (dataset, items) = session
                .read(|s| {
                    let filtered = apply_filters(s.active_incidents(), &filters.to_state(s.vocabulary()));
                    let items: Vec<IncidentPoint> =
                        newest_first(&filtered).into_iter().take(limit).cloned().collect();
                    (s.effective(), items)
                })
                .await;

            if items.is_empty() {
                println!("No incidents match.");
                return Ok(());
            }

            println!("{:<22} {:<28} {:<12} LOCATION", "DATE", "CATEGORY", "ID");
            println!("{}", "-".repeat(90));
            for incident in &items {
                println!(
                    "{:<22} {:<28} {:<12} {:.5}, {:.5}",
                    incident.timestamp.as_deref().unwrap_or("-"),
                    incident.category(),
                    incident.id.to_string(),
                    incident.latitude,
                    incident.longitude
                );
            }
            println!("\n{} {dataset} incident(s)", items.len());
        }
        Commands::Home { command } => run_home(&multi, &client, command).await?,
    }

    Ok(())
}

/// Loads the latest feed and, with `near`, switches to the near feed.
///
/// Problems with the near feed are logged and leave the latest feed
/// active, the same fallback the map uses.
async fn load_session(
    multi: &MultiProgress,
    client: ApiClient,
    near: bool,
) -> Result<Session<ApiClient>, SessionError> {
    let authenticated = client.config().is_authenticated();
    let limits = client.config().limits;
    let session = Session::new(client, limits);
    session.set_authenticated(authenticated).await;

    with_spinner(multi, "Fetching latest incidents", session.refresh_latest(), |r| match r {
        Ok(LoadOutcome::Loaded(count)) => format!("Loaded {count} latest incidents"),
        Ok(LoadOutcome::Discarded) => "Latest load superseded".to_string(),
        Err(e) => format!("Latest load failed: {e}"),
    })
    .await?;

    if near {
        let result = with_spinner(multi, "Fetching nearby incidents", session.select_near(), |r| {
            match r {
                Ok(LoadOutcome::Loaded(count)) => format!("Loaded {count} nearby incidents"),
                Ok(LoadOutcome::Discarded) => "Nearby load superseded".to_string(),
                Err(e) => format!("Nearby incidents unavailable: {e}"),
            }
        })
        .await;

        if let Err(e) = result {
            log::warn!("Showing latest incidents instead: {e}");
        }
    }

    Ok(session)
}

async fn run_home(
    multi: &MultiProgress,
    client: &ApiClient,
    command: HomeCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        HomeCommand::Show => {
            let profile = client.home_profile().await?;
            match profile.as_ref().and_then(HomeProfile::location) {
                Some(home) => println!("{}", serde_json::to_string_pretty(&home)?),
                None => println!("Home location not set."),
            }
        }
        HomeCommand::Set {
            lat,
            lng,
            address,
            radius,
        } => {
            let (latitude, longitude) = match (lat, lng, address) {
                (Some(lat), Some(lng), None) => (lat, lng),
                (None, None, Some(address)) => {
                    let found = with_spinner(
                        multi,
                        "Geocoding address",
                        client.geocode_address(&address),
                        |r| match r {
                            Ok(Some(found)) => format!(
                                "Found {}",
                                found.display_name.as_deref().unwrap_or("a match")
                            ),
                            Ok(None) => "No match".to_string(),
                            Err(e) => format!("Geocoding failed: {e}"),
                        },
                    )
                    .await?;
                    let Some(found) = found else {
                        return Err(format!("address not found: {address}").into());
                    };
                    (found.latitude, found.longitude)
                }
                _ => return Err("pass either --lat and --lng, or --address".into()),
            };

            let saved = client.update_home(latitude, longitude, radius).await?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        HomeCommand::Clear { radius } => {
            client.clear_home(radius).await?;
            println!("Home location cleared.");
        }
    }

    Ok(())
}

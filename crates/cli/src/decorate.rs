//! Emulates one page load: apply the pubcid configuration, run the
//! request-bids hooks over a bid request and persist the resulting storage.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pubcid_common::bid_request::BidRequestConfig;
use pubcid_common::clock::{Clock, SystemClock};
use pubcid_common::constants::{PUBCID_CONFIG_TOPIC, PUBCID_OPT_OUT_KEY};
use pubcid_common::host::Host;
use pubcid_common::pubcid::{init_pubcid, PubcidEnvironment};
use pubcid_common::settings::Settings;
use pubcid_common::storage::StorageAdapter;
use serde_json::{Map, Value};

use crate::error::CliError;
use crate::state::BrowserState;

/// Decorate `request` using the browser state at `state_path`.
///
/// Returns the decorated request as pretty JSON and saves the updated state.
pub fn decorate(
    request: &Path,
    state_path: &Path,
    settings: &Settings,
    clock: Arc<dyn Clock>,
) -> Result<String, CliError> {
    let mut bid_request = BidRequestConfig::from_json(&fs::read_to_string(request)?)?;

    let page = BrowserState::load(state_path)?.open(clock);

    let mut host: Host<BidRequestConfig> = Host::new();
    if init_pubcid(&mut host, PubcidEnvironment::new(page.storage().clone())).is_none() {
        log::info!("Browser has opted out of pubcid, request left as is");
    }
    apply_pubcid_settings(&mut host, settings)?;

    let dispatched = host.request_bids(&mut bid_request, |req| req.clone());

    page.close().save(state_path)?;
    Ok(dispatched.to_json_pretty()?)
}

/// Entry point for the `decorate` subcommand.
pub fn run(
    request: PathBuf,
    state: PathBuf,
    settings: &Settings,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let decorated = decorate(&request, &state, settings, Arc::new(SystemClock))?;
    match output {
        Some(path) => {
            fs::write(&path, decorated)?;
            log::info!("Decorated bid request written to {}", path.display());
        }
        None => println!("{}", decorated),
    }
    Ok(())
}

/// Set or clear the opt-out marker in the saved browser state.
pub fn opt_out(state_path: &Path, clear: bool, clock: Arc<dyn Clock>) -> Result<(), CliError> {
    let page = BrowserState::load(state_path)?.open(clock);
    let storage = page.storage();

    if clear {
        storage.cookies().remove(PUBCID_OPT_OUT_KEY);
        storage.local().remove(PUBCID_OPT_OUT_KEY);
        log::info!("Cleared pubcid opt-out marker");
    } else {
        storage.local().set(PUBCID_OPT_OUT_KEY, "1", None);
        log::info!("Set pubcid opt-out marker");
    }

    page.close().save(state_path)
}

fn apply_pubcid_settings(
    host: &mut Host<BidRequestConfig>,
    settings: &Settings,
) -> Result<(), CliError> {
    let mut options = Map::new();
    options.insert(
        PUBCID_CONFIG_TOPIC.to_string(),
        serde_json::to_value(&settings.pubcid)?,
    );
    host.config_mut().set_config(Value::Object(options))?;
    Ok(())
}

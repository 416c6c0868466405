//! Probe command - report a module's exports and its ABI variant.

use super::load_config;
use anyhow::Result;
use pitlane_host::adapter::AdapterKind;
use pitlane_host::registry::DecisionRegistry;
use serde_json::json;

/// Run the probe command.
pub async fn run(url: &str, config: Option<&str>) -> Result<()> {
    let config = load_config(config)?;
    let registry = DecisionRegistry::from_config(&config)?;

    tracing::info!(url = %url, "Probing module");
    let module = registry.loader().load(url).await?;
    let capabilities = module.capabilities();
    let variant = AdapterKind::probe(capabilities);

    let report = json!({
        "url": url,
        "capabilities": capabilities,
        "variant": variant,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if variant.is_none() {
        anyhow::bail!("Module exports no recognised decision ABI: {}", url);
    }
    Ok(())
}

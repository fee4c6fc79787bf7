//! CLI command implementations.

use deckhand_config::plugins::{self, PluginRegistry};
use deckhand_config::{Environ, Settings};

/// Resolve the configuration and print every setting.
pub fn config(json: bool) -> anyhow::Result<()> {
    let env = Environ::capture();
    let settings = Settings::resolve(&env)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings.to_json())?);
        return Ok(());
    }

    println!(
        "# project: {} (prefix {})",
        settings.project_name(),
        settings.project_name_safe()
    );
    match settings.active_ci() {
        Some(mapper) => println!("# CI: {}", mapper),
        None => println!("# CI: none detected"),
    }
    for (key, value) in settings.iter() {
        println!("{}={}", key, value);
    }

    Ok(())
}

/// Run kubeconfig selection and print what was adopted.
pub fn kubeconfig(track: Option<String>) -> anyhow::Result<()> {
    let mut env = Environ::capture();
    let mut settings = Settings::resolve(&env)?;
    let track = track.unwrap_or_else(|| settings.default_track().to_string());

    let selection = settings.setup_kubeconfig(&mut env, &track)?;
    println!("{} (from {})", selection.kubeconfig, selection.source_key);

    Ok(())
}

/// Try to configure every shipped plugin and report the outcome.
pub fn plugins() -> anyhow::Result<()> {
    let env = Environ::capture();
    let mut registry = PluginRegistry::new();

    for plugin in plugins::core_plugins() {
        let name = plugin.verbose_name();
        if registry.load(&env, plugin) {
            println!("{}: configured", name);
        } else {
            println!("{}: skipped (missing configuration)", name);
        }
    }

    Ok(())
}

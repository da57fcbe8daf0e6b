//! Command handlers. Results go to stdout, failures are returned to `main`.
use std::error::Error;

use abacus_core::storage::config::ConfigUpdate;
use abacus_core::storage::ConfigFormat;
use abacus_core::{Application, ContainerId, InstanceOptions};
use serde_json::Value;

pub type CliResult = Result<(), Box<dyn Error>>;

/// Actor recorded for config changes made from the command line
const CLI_ACTOR: &str = "cli";

/// Container every `run` instance is mounted into
const CLI_CONTAINER: &str = "cli";

/// Read a command-line value as JSON, falling back to a plain string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_input(pair: &str) -> Result<(&str, Value), String> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), parse_value(value))),
        _ => Err(format!("invalid input '{}', expected KEY=VALUE", pair)),
    }
}

fn display(value: Option<&Value>) -> String {
    value.map(Value::to_string).unwrap_or_else(|| "-".to_string())
}

pub async fn list_plugins(app: &Application) -> CliResult {
    let ids = app.registry().ids();
    if ids.is_empty() {
        println!("No plugins registered.");
        return Ok(());
    }
    println!("Registered plugins:");
    for id in ids {
        let state = app.plugin_state(&id).await;
        match app.loader().load_module(&id).await {
            Ok(bundle) => {
                let manifest = bundle.manifest();
                println!(
                    "  - {} v{} ({}) [{}]",
                    id,
                    manifest.version,
                    manifest.name.resolve("en"),
                    state
                );
            }
            Err(e) => println!("  - {} [{}] load failed: {}", id, state, e),
        }
    }
    Ok(())
}

pub async fn check_plugin(app: &Application, id: &str) -> CliResult {
    let report = app.check_compatibility(id).await?;
    let issues: Vec<_> = report.errors().chain(report.warnings()).collect();
    for issue in &issues {
        println!("  {}", issue);
    }
    if report.is_compatible() {
        println!("'{}' is compatible ({} warning(s))", id, report.warnings().count());
        Ok(())
    } else {
        Err(format!("'{}' is not compatible ({} error(s))", id, report.errors().count()).into())
    }
}

pub async fn run_calculation(app: &Application, id: &str, inputs: &[String], locale: &str) -> CliResult {
    let handle = app
        .create_instance(
            id,
            ContainerId::new(CLI_CONTAINER),
            InstanceOptions::default().with_locale(locale),
        )
        .await?;

    for pair in inputs {
        let (key, value) = parse_input(pair)?;
        if !handle.set_input(key, value).await {
            handle.destroy().await;
            return Err(format!("'{}' has no field '{}'", id, key).into());
        }
    }

    let outcome = handle.calculate().await;
    if let Some(text) = handle.output_text().await {
        print!("{}", text);
    }
    handle.destroy().await;

    match outcome {
        Ok(_) => Ok(()),
        Err(e) => {
            if let Some(errors) = e.field_errors() {
                for (field, message) in errors {
                    eprintln!("  {}: {}", field, message);
                }
            }
            Err(e.user_message().into())
        }
    }
}

pub fn show_config(app: &Application, id: &str) -> CliResult {
    let config = app.config_manager().export_config(id, false)?;
    println!("plugin:      {}", config.plugin_id);
    println!("template:    {}", config.template_id);
    println!("enabled:     {}", config.enabled);
    println!("environment: {}", config.environment);
    println!("settings:");
    for (key, value) in &config.settings {
        println!("  {} = {}", key, value);
    }
    Ok(())
}

pub fn export_config(app: &Application, id: &str, format: &str, include_secrets: bool) -> CliResult {
    let format = ConfigFormat::from_name(format).ok_or_else(|| format!("unsupported format '{}'", format))?;
    let document = app
        .config_manager()
        .export_config_as(id, include_secrets, format)?;
    println!("{}", document.trim_end());
    Ok(())
}

pub async fn set_config(app: &Application, id: &str, key: &str, raw: &str) -> CliResult {
    let update = ConfigUpdate::new().setting(key, parse_value(raw));
    let events = app.update_plugin_config(id, update, CLI_ACTOR).await?;
    if events.is_empty() {
        println!("No change.");
    }
    for event in events {
        println!(
            "{}: {} -> {}",
            event.path,
            display(event.old_value.as_ref()),
            display(event.new_value.as_ref())
        );
    }
    Ok(())
}

pub fn config_history(app: &Application, id: &str) -> CliResult {
    let history = app.config_manager().history(Some(id));
    if history.is_empty() {
        println!("No changes recorded for '{}'.", id);
        return Ok(());
    }
    for event in history {
        println!(
            "{} {} {}: {} -> {}",
            event.timestamp,
            event.actor,
            event.path,
            display(event.old_value.as_ref()),
            display(event.new_value.as_ref())
        );
    }
    Ok(())
}

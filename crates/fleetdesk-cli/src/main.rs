//! Fleetdesk CLI
//!
//! Command-line console for the fleet management backend

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use fleetdesk_api::{Credentials, ListParams};
use fleetdesk_client::{App, ClientConfig};
use fleetdesk_core::{Action, Record, Resource};
use fleetdesk_observability::init_logging;
use fleetdesk_query::{MemoryNotifier, NotificationLevel, QueryResult};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(name = "fleetdesk")]
#[command(about = "Fleetdesk - transport fleet management console", long_about = None)]
struct Cli {
    /// Config file (YAML or TOML)
    #[arg(long, global = true, env = "FLEETDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "FLEETDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Check a permission, e.g. `can invoice edit`
    Can { resource: Resource, action: Action },
    /// List records
    List {
        resource: Resource,

        /// Filter as key=value; repeatable
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    /// Show one record
    Get { resource: Resource, id: String },
    /// Create a record from a JSON object
    Create {
        resource: Resource,

        #[arg(long)]
        data: String,
    },
    /// Update a record from a JSON object
    Update {
        resource: Resource,
        id: String,

        #[arg(long)]
        data: String,
    },
    /// Delete a record
    Delete { resource: Resource, id: String },
    /// Show or change UI preferences
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Show the signed-in user's tenant
    Tenant,
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    /// Set a field by its JSON name, e.g. `set themeMode dark`
    Set { field: String, value: String },
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let notifier = Arc::new(MemoryNotifier::new());
    let app = App::start_with_notifier(config, notifier.clone()).await?;
    debug!("State persistent: {}", app.is_persistent());

    let result = run(&app, cli.command).await;

    for notification in notifier.take() {
        match notification.level {
            NotificationLevel::Error => eprintln!("✗ {}", notification.message),
            _ => eprintln!("✓ {}", notification.message),
        }
    }
    app.shutdown().await;
    result
}

async fn run(app: &App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Login { email, password } => {
            let user = app
                .login(&Credentials::new(email, password))
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("Signed in as {}", user.name.as_deref().unwrap_or(&user.id));
        }
        Commands::Logout => {
            app.logout().await;
            println!("Signed out");
        }
        Commands::Whoami => {
            let user = require_user(app)?;
            print_json(&serde_json::to_value(&user)?)?;
        }
        Commands::Can { resource, action } => {
            let allowed = app.session().has_permission(resource, action);
            println!("{}", if allowed { "yes" } else { "no" });
        }
        Commands::List { resource, params } => {
            require_user(app)?;
            let params = ListParams::from_pairs(params.iter().map(String::as_str))?;
            let records = settle(app.query::<Record>(resource).list(&params).await)?;
            let records: Vec<Value> = records.into_iter().map(Record::into_value).collect();
            print_json(&Value::Array(records))?;
        }
        Commands::Get { resource, id } => {
            require_user(app)?;
            let record = settle(app.query::<Record>(resource).get_by_id(Some(&id)).await)?;
            print_json(&record.into_value())?;
        }
        Commands::Create { resource, data } => {
            require_user(app)?;
            let payload = parse_payload(&data)?;
            let record = app
                .query::<Record>(resource)
                .create(&payload)
                .await
                .map_err(|e| anyhow::anyhow!("{} not created: {}", resource.label(), e))?;
            print_json(&record.into_value())?;
        }
        Commands::Update { resource, id, data } => {
            require_user(app)?;
            let payload = parse_payload(&data)?;
            let record = app
                .query::<Record>(resource)
                .update(&id, &payload)
                .await
                .map_err(|e| anyhow::anyhow!("{} not updated: {}", resource.label(), e))?;
            print_json(&record.into_value())?;
        }
        Commands::Delete { resource, id } => {
            require_user(app)?;
            app.query::<Record>(resource)
                .delete(&id)
                .await
                .map_err(|e| anyhow::anyhow!("{} not deleted: {}", resource.label(), e))?;
        }
        Commands::Settings { command } => match command {
            SettingsCommand::Show => print_json(&serde_json::to_value(app.settings().current())?)?,
            SettingsCommand::Set { field, value } => {
                app.settings().set_field(&field, &value).await?;
                print_json(&serde_json::to_value(app.settings().current())?)?;
            }
            SettingsCommand::Reset => {
                app.settings().reset().await;
                println!("Settings reset");
            }
        },
        Commands::Tenant => {
            require_user(app)?;
            let tenant = app.tenant();
            let tenant = tenant.require_tenant()?;
            print_json(&serde_json::to_value(tenant)?)?;
        }
    }
    Ok(())
}

fn require_user(app: &App) -> anyhow::Result<fleetdesk_core::User> {
    match app.session().user() {
        Some(user) => Ok(user),
        None => bail!("Not signed in; run `fleetdesk login` first"),
    }
}

/// Turn a query outcome into data or a user-facing error
fn settle<T>(result: QueryResult<T>) -> anyhow::Result<T> {
    match result.into_result() {
        Ok(Some(data)) => Ok(data),
        Ok(None) => bail!("Nothing to show"),
        Err(e) => bail!(e.user_message()),
    }
}

fn parse_payload(data: &str) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_str(data).context("--data must be valid JSON")?;
    if !value.is_object() {
        bail!("--data must be a JSON object");
    }
    Ok(value)
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

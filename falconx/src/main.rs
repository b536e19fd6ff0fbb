// FalconX - download catalog backed by a GitHub repository
// Entry point and command dispatch

use anyhow::Context;
use clap::{Parser, Subcommand};
use falconx::app::{self, AppState};
use falconx::commands;
use falconx::config::AppConfig;
use falconx::database::CatalogType;
use falconx::error::AppError;
use falconx::services::settings::{Language, Theme};
use falconx::services::sync::{SkipReason, SyncOutcome};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "falconx", version, about = "FalconX download catalog")]
struct Cli {
    /// Directory holding the local store and exports
    #[arg(long, env = "FALCONX_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a catalog (defaults to the last opened tab)
    List {
        catalog: Option<CatalogType>,
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show one item
    Show { catalog: CatalogType, id: i64 },
    /// Open a shared `?tab=&item=` link
    Open { link: String },
    /// Print a shareable link for an item
    Share { catalog: CatalogType, id: i64 },
    /// List a catalog's categories
    Categories { catalog: CatalogType },
    AddCategory { catalog: CatalogType, name: String },
    DeleteCategory { catalog: CatalogType, name: String },
    /// Add an item from a JSON file
    Add { catalog: CatalogType, file: PathBuf },
    /// Replace an item with the contents of a JSON file
    Update {
        catalog: CatalogType,
        id: i64,
        file: PathBuf,
    },
    Delete { catalog: CatalogType, id: i64 },
    /// Sign in with a GitHub personal access token
    Login {
        #[arg(long, env = "FALCONX_TOKEN", hide_env_values = true)]
        token: String,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        repo: Option<String>,
        /// Keep the token for later sessions
        #[arg(long)]
        remember: bool,
    },
    /// Check a token and list the repositories it can reach
    Repos {
        #[arg(long, env = "FALCONX_TOKEN", hide_env_values = true)]
        token: String,
    },
    Logout {
        /// Also forget the remembered token
        #[arg(long)]
        forget: bool,
    },
    /// Show application and session status
    Status,
    /// Pull the published catalog now
    Sync,
    /// Pull only if the repository changed since the local data
    Check,
    /// Keep pulling on the sync interval until Ctrl+C
    Watch,
    /// Save the catalog to GitHub
    Publish,
    /// Export the catalog as JSON
    Export { path: Option<PathBuf> },
    /// Replace the catalog with an exported file
    Import { path: PathBuf },
    /// List exports in the data directory
    Exports,
    /// Preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),
}

#[derive(Subcommand)]
enum PrefsCommand {
    Show,
    Theme { theme: Theme },
    Language { language: Language },
    Dismiss { warning: String },
    ResetWarnings,
    /// Repository the site reads without logging in
    Repo { owner: String, repo: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "falconx=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }

    tracing::info!("Starting FalconX {}", env!("CARGO_PKG_VERSION"));
    let state = app::setup(config)
        .await
        .context("Failed to initialize application")?;

    run(&state, cli.command, cli.json).await
}

async fn run(state: &AppState, command: Command, json: bool) -> anyhow::Result<()> {
    match command {
        Command::List {
            catalog,
            query,
            category,
        } => {
            let (catalog, items) =
                commands::list_items(state, catalog, query.as_deref(), category.as_deref())
                    .await?;
            if json {
                print_json(&items)?;
            } else {
                print!("{}", commands::render_grid(catalog, &items));
            }
        }
        Command::Show { catalog, id } => {
            print_json(&commands::show_item(state, catalog, id).await?)?;
        }
        Command::Open { link } => {
            let (link, item) = commands::open_link(state, &link).await?;
            match item {
                Some(item) => print_json(&item)?,
                None => {
                    let (catalog, items) =
                        commands::list_items(state, Some(link.catalog), None, None).await?;
                    print!("{}", commands::render_grid(catalog, &items));
                }
            }
        }
        Command::Share { catalog, id } => {
            println!("{}", commands::share_link(state, catalog, id).await?);
        }
        Command::Categories { catalog } => {
            let categories = commands::list_categories(state, catalog).await;
            if json {
                print_json(&categories)?;
            } else {
                for name in categories {
                    println!("{}", name);
                }
            }
        }
        Command::AddCategory { catalog, name } => {
            if !commands::add_category(state, catalog, &name).await? {
                println!("Category '{}' already exists", name);
            }
        }
        Command::DeleteCategory { catalog, name } => {
            if !commands::delete_category(state, catalog, &name).await? {
                println!("No category '{}'", name);
            }
        }
        Command::Add { catalog, file } => {
            let body = read_file(&file).await?;
            let item = commands::add_item(state, catalog, &body).await?;
            println!("Added {} ({})", item.name, item.id);
        }
        Command::Update { catalog, id, file } => {
            let body = read_file(&file).await?;
            let item = commands::update_item(state, catalog, id, &body).await?;
            println!("Updated {} ({})", item.name, item.id);
        }
        Command::Delete { catalog, id } => {
            if !commands::delete_item(state, catalog, id).await? {
                println!("No item {} in {}", id, catalog);
            }
        }
        Command::Login {
            token,
            owner,
            repo,
            remember,
        } => match commands::login(state, &token, owner, repo, remember).await {
            Ok(status) => println!(
                "Signed in to {} until {}",
                status.repo,
                status.expires_at.format("%Y-%m-%d %H:%M UTC")
            ),
            Err(e) => anyhow::bail!(login_failure(state, e).await),
        },
        Command::Repos { token } => match commands::check_token(state, &token).await {
            Ok(choice) => {
                if json {
                    print_json(&choice)?;
                } else {
                    println!("Signed in as {}", choice.login);
                    for repo in &choice.repos {
                        println!("{}", repo.full_name);
                    }
                }
            }
            Err(e) => anyhow::bail!(login_failure(state, e).await),
        },
        Command::Logout { forget } => commands::logout(state, forget).await?,
        Command::Status => print_json(&commands::get_app_info(state).await?)?,
        Command::Sync => print_outcome(&commands::sync_now(state).await),
        Command::Check => print_outcome(&commands::check_for_updates(state).await),
        Command::Watch => commands::watch(state).await?,
        Command::Publish => match commands::publish(state).await {
            Ok(receipt) => println!(
                "Saved {} items to {} ({})",
                receipt.items, receipt.repo, receipt.sha
            ),
            Err(e) => anyhow::bail!(login_failure(state, e).await),
        },
        Command::Export { path } => {
            let path = commands::export_catalog(state, path.as_deref()).await?;
            println!("{}", path.display());
        }
        Command::Import { path } => {
            let items = commands::import_catalog(state, &path).await?;
            println!("Imported {} items", items);
        }
        Command::Exports => {
            for record in commands::list_exports(state).await? {
                println!(
                    "{}  {:>8} bytes  {}",
                    record.created_at.format("%Y-%m-%d %H:%M:%S"),
                    record.size,
                    record.path.display()
                );
            }
        }
        Command::Prefs(prefs) => run_prefs(state, prefs).await?,
    }

    Ok(())
}

async fn run_prefs(state: &AppState, command: PrefsCommand) -> anyhow::Result<()> {
    match command {
        PrefsCommand::Show => print_json(&commands::get_preferences(state).await?)?,
        PrefsCommand::Theme { theme } => commands::set_theme(state, theme).await?,
        PrefsCommand::Language { language } => commands::set_language(state, language).await?,
        PrefsCommand::Dismiss { warning } => commands::dismiss_warning(state, &warning).await?,
        PrefsCommand::ResetWarnings => {
            let count = commands::reset_warnings(state).await?;
            println!("Reset {} warnings", count);
        }
        PrefsCommand::Repo { owner, repo } => {
            commands::set_repository(state, &owner, &repo).await?
        }
    }
    Ok(())
}

/// Auth errors read as the login form would show them
async fn login_failure(state: &AppState, err: AppError) -> String {
    commands::login_error_message(state, &err).await
}

fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Updated { items } => println!("Catalog updated ({} items)", items),
        SyncOutcome::Unchanged => println!("Catalog unchanged"),
        SyncOutcome::UpToDate => println!("Already up to date"),
        SyncOutcome::Skipped(SkipReason::NotConfigured) => {
            println!("No repository configured")
        }
        SyncOutcome::Skipped(SkipReason::InProgress) => println!("A sync is already running"),
        SyncOutcome::Skipped(SkipReason::Cooldown { remaining_secs }) => {
            println!("Synced recently, next sync in {}s", remaining_secs)
        }
        SyncOutcome::Failed(reason) => println!("Sync failed: {}", reason),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn read_file(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

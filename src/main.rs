//! Binary entry point for searchdeck.
//!
//! This binary provides the command-line interface to a search engine
//! instance: filter building, export, import, and index administration.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use searchdeck::client::HttpClient;
use searchdeck::config::AppConfig;
use searchdeck::io::{ExportOptions, Format, ImportOptions, ImportService, export_documents};
use searchdeck::observability::{self, LoggingConfig};
use searchdeck::services::{CredentialsRecord, CredentialsStore, IndexOperations, SigningKey};
use searchdeck::utils::format_duration;
use searchdeck::{AppliedFilters, GeoBoundingBox, TaskProcessor};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Searchdeck - administration toolkit for Meilisearch-compatible engines.
#[derive(Parser)]
#[command(name = "searchdeck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "SEARCHDECK_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Saved instance to use instead of the active one.
    #[arg(short, long, global = true)]
    instance: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Build a filter expression from facet selections.
    Filter {
        /// Include a value, as `facet=value`.
        #[arg(long = "include", value_name = "FACET=VALUE")]
        include: Vec<String>,

        /// Exclude a value, as `facet=value`.
        #[arg(long = "exclude", value_name = "FACET=VALUE")]
        exclude: Vec<String>,

        /// Numeric range, as `facet=min..max`.
        #[arg(long = "range", value_name = "FACET=MIN..MAX")]
        range: Vec<String>,

        /// Geo bounding box, as `top,left,bottom,right`.
        #[arg(long, allow_hyphen_values = true)]
        bbox: Option<String>,
    },

    /// Export documents from an index.
    Export {
        /// Index uid.
        index: String,

        /// Output file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: json or ndjson.
        #[arg(long)]
        format: Option<Format>,

        /// Filter expression.
        #[arg(long)]
        filter: Option<String>,

        /// Fields to export (comma-separated).
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Maximum number of documents.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Import documents from a JSON or NDJSON file.
    Import {
        /// Index uid.
        index: String,

        /// Input file.
        file: PathBuf,

        /// Primary key of the documents.
        #[arg(long)]
        primary_key: Option<String>,

        /// Documents per request.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Return once tasks are enqueued.
        #[arg(long)]
        no_wait: bool,
    },

    /// Copy an index with its settings and documents.
    Duplicate {
        /// Source index uid.
        index: String,

        /// Target uid (default: `<index>-copy`).
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Rename an index.
    Rename {
        /// Source index uid.
        index: String,

        /// New uid (default: `<index>-new`).
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Sign a tenant token.
    TenantToken {
        /// Search rules as JSON.
        #[arg(long)]
        rules: String,

        /// Uid of the signing API key.
        #[arg(long)]
        key_uid: String,

        /// Signing API key; defaults to the configured key.
        #[arg(long, env = "SEARCHDECK_SIGNING_KEY", hide_env_values = true)]
        key: Option<String>,

        /// Expiry as RFC 3339.
        #[arg(long)]
        expires_at: Option<String>,
    },

    /// Render an ISO 8601 duration.
    Duration {
        /// Duration such as `PT1.5S`.
        value: String,
    },

    /// Manage saved instances.
    Instances {
        /// Instance action.
        #[command(subcommand)]
        action: InstanceAction,
    },
}

/// Instance actions.
#[derive(Subcommand)]
enum InstanceAction {
    /// List saved instances.
    List,

    /// Save an instance and make it active.
    Add {
        /// Base URL.
        url: String,

        /// API key.
        #[arg(long, env = "SEARCHDECK_API_KEY", hide_env_values = true, default_value = "")]
        key: String,

        /// Friendly name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Make a saved instance active.
    Use {
        /// Instance id.
        id: String,
    },

    /// Remove a saved instance.
    Remove {
        /// Instance id.
        id: String,
    },

    /// Forget every saved instance.
    Logout,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init(LoggingConfig::from_settings(
        Some(&config.logging),
        cli.verbose,
    )) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Filter {
            include,
            exclude,
            range,
            bbox,
        } => cmd_filter(&include, &exclude, &range, bbox.as_deref()),

        Commands::Export {
            index,
            output,
            format,
            filter,
            fields,
            limit,
        } => {
            let client = connect(&config, cli.instance.as_deref())?;
            let mut options = ExportOptions::default().with_batch_size(config.export.batch_size);
            if let Some(filter) = filter {
                options = options.with_filter(filter);
            }
            if !fields.is_empty() {
                options = options.with_fields(fields);
            }
            if let Some(limit) = limit {
                options = options.with_limit(limit);
            }
            cmd_export(&client, &index, &options, output.as_deref(), format).await
        },

        Commands::Import {
            index,
            file,
            primary_key,
            chunk_size,
            no_wait,
        } => {
            let client = connect(&config, cli.instance.as_deref())?;
            let mut options = ImportOptions::default()
                .with_chunk_size(chunk_size.unwrap_or(config.export.chunk_size))
                .with_wait(!no_wait);
            if let Some(primary_key) = primary_key {
                options = options.with_primary_key(primary_key);
            }
            let service = ImportService::new(TaskProcessor::from_config(&client, &config.tasks));
            let result = service.import_from_file(&index, &file, &options).await?;
            println!(
                "Imported {} documents into `{index}` ({} tasks)",
                result.imported,
                result.task_uids.len()
            );
            Ok(())
        },

        Commands::Duplicate { index, target } => {
            let client = connect(&config, cli.instance.as_deref())?;
            let operations = IndexOperations::new(TaskProcessor::from_config(&client, &config.tasks));
            let result = operations.duplicate_index(&index, target.as_deref()).await?;
            println!(
                "Duplicated `{index}` into `{}` ({} documents)",
                result.index_uid, result.documents
            );
            Ok(())
        },

        Commands::Rename { index, target } => {
            let client = connect(&config, cli.instance.as_deref())?;
            let operations = IndexOperations::new(TaskProcessor::from_config(&client, &config.tasks));
            let result = operations.rename_index(&index, target.as_deref()).await?;
            println!("Renamed `{index}` to `{}`", result.index_uid);
            Ok(())
        },

        Commands::TenantToken {
            rules,
            key_uid,
            key,
            expires_at,
        } => cmd_tenant_token(&config, &rules, key_uid, key, expires_at.as_deref()),

        Commands::Duration { value } => {
            println!("{}", format_duration(&value)?);
            Ok(())
        },

        Commands::Instances { action } => cmd_instances(&config, action),
    }
}

/// Loads configuration.
fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::load_default(),
    };
    Ok(config.with_env_overrides())
}

/// Builds the engine client.
///
/// An explicit `--instance` wins, then the active saved instance, then the
/// configured URL and key.
fn connect(config: &AppConfig, instance: Option<&str>) -> anyhow::Result<HttpClient> {
    let store = open_store(config)?;
    let record = match instance {
        Some(id) => Some(
            store
                .get(id)
                .with_context(|| format!("no saved instance `{id}`"))?,
        ),
        None => store.current(),
    };

    let client = match record {
        Some(record) => {
            tracing::debug!(id = %record.id, "using saved instance");
            let client = HttpClient::new(&record.base_uri);
            if record.access_key.expose_secret().is_empty() {
                client
            } else {
                client.with_api_key(record.access_key.clone())
            }
        },
        None => {
            let client = HttpClient::new(&config.instance.url);
            match &config.instance.api_key {
                Some(key) => client.with_api_key(key.clone()),
                None => client,
            }
        },
    };
    Ok(client)
}

fn open_store(config: &AppConfig) -> anyhow::Result<CredentialsStore> {
    let path = CredentialsStore::path_in(&config.data_dir);
    CredentialsStore::open(&path).with_context(|| format!("opening {}", path.display()))
}

/// Splits `facet=value`.
fn split_pair(arg: &str) -> anyhow::Result<(&str, &str)> {
    match arg.split_once('=') {
        Some((facet, value)) if !facet.is_empty() => Ok((facet, value)),
        _ => bail!("expected FACET=VALUE, got `{arg}`"),
    }
}

fn parse_f64(value: &str) -> anyhow::Result<f64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("`{value}` is not a number"))
}

fn cmd_filter(
    include: &[String],
    exclude: &[String],
    range: &[String],
    bbox: Option<&str>,
) -> anyhow::Result<()> {
    let mut filters = AppliedFilters::new();

    for arg in include {
        let (facet, value) = split_pair(arg)?;
        filters.apply_string_filter(facet, value);
    }
    for arg in exclude {
        let (facet, value) = split_pair(arg)?;
        // Unset -> include -> exclude.
        filters.apply_string_filter(facet, value);
        filters.apply_string_filter(facet, value);
    }
    for arg in range {
        let (facet, bounds) = split_pair(arg)?;
        let (min, max) = bounds
            .split_once("..")
            .with_context(|| format!("expected MIN..MAX, got `{bounds}`"))?;
        filters.apply_range_filter(facet, (parse_f64(min)?, parse_f64(max)?));
    }
    if let Some(bbox) = bbox {
        let corners = bbox
            .split(',')
            .map(parse_f64)
            .collect::<anyhow::Result<Vec<_>>>()?;
        let [top, left, bottom, right] = corners[..] else {
            bail!("expected top,left,bottom,right, got `{bbox}`");
        };
        filters.apply_bounding_box(GeoBoundingBox::new((top, left), (bottom, right)));
    }

    tracing::debug!(applied = filters.length(), "filter built");
    println!("{filters}");
    Ok(())
}

async fn cmd_export(
    client: &HttpClient,
    index: &str,
    options: &ExportOptions,
    output: Option<&Path>,
    format: Option<Format>,
) -> anyhow::Result<()> {
    let exporter = export_documents(client, index, options);
    match output {
        Some(path) => {
            let result = exporter.export_to_file(path, format).await?;
            eprintln!(
                "Exported {} documents to {} ({})",
                result.exported,
                path.display(),
                result.format
            );
        },
        None => {
            exporter
                .export_to_writer(std::io::stdout(), format.unwrap_or_default())
                .await?;
            println!();
        },
    }
    Ok(())
}

fn cmd_tenant_token(
    config: &AppConfig,
    rules: &str,
    key_uid: String,
    key: Option<String>,
    expires_at: Option<&str>,
) -> anyhow::Result<()> {
    let rules: serde_json::Value =
        serde_json::from_str(rules).context("search rules are not valid JSON")?;
    let key = match key {
        Some(key) => SecretString::from(key),
        None => config
            .instance
            .api_key
            .clone()
            .context("no signing key given and no API key configured")?,
    };
    let expires_at = expires_at
        .map(searchdeck::services::tenant_token::parse_expiry)
        .transpose()?;

    let token =
        searchdeck::services::create_tenant_token(rules, &SigningKey::new(key_uid, key), expires_at)?;
    println!("{token}");
    Ok(())
}

fn cmd_instances(config: &AppConfig, action: InstanceAction) -> anyhow::Result<()> {
    let mut store = open_store(config)?;

    match action {
        InstanceAction::List => {
            let current = store.current().map(|r| r.id.clone());
            if store.records().is_empty() {
                println!("No saved instances");
            }
            for record in store.records() {
                let marker = if current.as_deref() == Some(record.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {}  {}  {}", record.id, record.display_name(), record.base_uri);
            }
            return Ok(());
        },
        InstanceAction::Add { url, key, name } => {
            let mut record = CredentialsRecord::new(url, SecretString::from(key));
            if let Some(name) = name {
                record = record.with_name(name);
            }
            let id = store.authenticate(record);
            println!("Saved instance {id}");
        },
        InstanceAction::Use { id } => {
            let record = store.switch(&id)?;
            println!("Using {} ({})", record.display_name(), record.base_uri);
        },
        InstanceAction::Remove { id } => {
            if !store.remove(&id) {
                bail!("no saved instance `{id}`");
            }
            println!("Removed instance {id}");
        },
        InstanceAction::Logout => {
            store.logout();
            println!("Forgot all instances");
        },
    }

    store.persist()?;
    Ok(())
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use credgate::assistant::{Assistant, TabEvent};
use credgate::backend::{BackendStatus, CredentialBackend, SiteEntry};
use credgate::config::{default_config_path, Config};
use credgate::dom::{Document, Selector};
use credgate::fields::{FieldClassifier, FieldSummary};
use credgate::host::{BrowserHost, PageSnapshot, TabId};
use credgate::indicator::{resolve_indicator, Indicator, IndicatorInputs, PopupView};
use credgate::otp::OtpHeuristic;
use credgate::site::{normalize_url, site_match};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "credgate")]
#[command(about = "Credential fill decisions: site matching, login field detection, indicator state")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a site pattern authorizes a page URL
    Match { pattern: String, url: String },

    /// Print the normalized form of a URL
    Normalize { url: String },

    /// Scan a DOM snapshot (JSON) for login fields
    Scan {
        snapshot: PathBuf,

        /// Selector of a control to activate before scanning
        #[arg(long)]
        reveal: Option<String>,
    },

    /// Resolve the indicator for a combination of inputs
    Indicator {
        #[arg(long)]
        unreachable: bool,
        #[arg(long)]
        locked: bool,
        #[arg(long)]
        update_available: bool,
        #[arg(long, default_value_t = 0)]
        candidates: usize,
        /// Stored entries authorized for the page
        #[arg(long, default_value_t = 0)]
        matched: usize,
    },

    /// Run the full decision flow for one page snapshot against stored entries
    Simulate {
        snapshot: PathBuf,

        /// JSON array of stored entries: [{"name", "login", "password", "url"}]
        #[arg(long)]
        entries: Option<PathBuf>,

        #[arg(long)]
        unreachable: bool,
        #[arg(long)]
        locked: bool,
    },

    /// Show current configuration
    Config,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

fn load_snapshot(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    Document::from_json(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))
}

#[derive(Debug, Deserialize)]
struct EntryFile {
    name: String,
    #[serde(default)]
    login: String,
    #[serde(default)]
    password: String,
    url: String,
}

fn load_entries(path: &Path) -> Result<Vec<EntryFile>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read entries: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse entries: {}", path.display()))
}

/// Backend answering from a fixed status and entry list.
struct StaticBackend {
    status: BackendStatus,
    entries: Vec<EntryFile>,
}

#[async_trait]
impl CredentialBackend for StaticBackend {
    async fn status(&self) -> Result<BackendStatus> {
        Ok(self.status)
    }

    async fn entries_for(&self, _page_url: &str) -> Result<Vec<SiteEntry>> {
        Ok(self
            .entries
            .iter()
            .map(|e| SiteEntry::new(&e.name, &e.login, &e.password, &e.url))
            .collect())
    }
}

/// Host with a single tab showing one snapshot; pushes are logged.
struct SnapshotHost {
    page: PageSnapshot,
}

const SIMULATED_TAB: TabId = TabId(1);

#[async_trait]
impl BrowserHost for SnapshotHost {
    async fn active_tab(&self) -> Result<Option<TabId>> {
        Ok(Some(SIMULATED_TAB))
    }

    async fn page(&self, tab: TabId) -> Result<Option<PageSnapshot>> {
        Ok((tab == SIMULATED_TAB).then(|| self.page.clone()))
    }

    fn set_indicator(&self, tab: TabId, indicator: &Indicator) {
        info!(tab = %tab, state = %indicator.state, badge = %indicator.badge.text, "set indicator");
    }

    fn open_popup(&self, tab: TabId, popup: PopupView) {
        info!(tab = %tab, popup = %popup.path(), "set popup");
    }

    async fn send_ignore_site(&self, tab: TabId, url: &str) -> Result<()> {
        info!(tab = %tab, url = %url, "ignore_site");
        Ok(())
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load credgate config: {}", config_path.display()))?;

    match cli.command {
        Command::Match { pattern, url } => {
            println!("{}", site_match(&pattern, &url));
        }
        Command::Normalize { url } => {
            println!("{}", normalize_url(&url));
        }
        Command::Scan { snapshot, reveal } => {
            let mut document = load_snapshot(&snapshot)?;
            let reveal = reveal.or_else(|| {
                document
                    .url
                    .as_deref()
                    .and_then(|url| config.site_preference(url))
                    .and_then(|pref| pref.reveal_trigger.clone())
            });
            let classifier = FieldClassifier::new(OtpHeuristic::new(&config.otp));
            let fields: Vec<FieldSummary> = match reveal {
                Some(raw) => {
                    let trigger = Selector::parse(&raw)
                        .with_context(|| format!("Invalid reveal selector: {raw}"))?;
                    classifier
                        .scan_after_reveal(&mut document, &trigger)
                        .iter()
                        .map(|c| c.summary())
                        .collect()
                }
                None => classifier
                    .scan(&document)
                    .iter()
                    .map(|c| c.summary())
                    .collect(),
            };
            print_json(&fields)?;
        }
        Command::Indicator {
            unreachable,
            locked,
            update_available,
            candidates,
            matched,
        } => {
            let indicator = resolve_indicator(&IndicatorInputs {
                backend: BackendStatus {
                    reachable: !unreachable,
                    locked,
                    update_available,
                },
                candidate_fields: candidates,
                matched_entries: matched,
            });
            print_json(&indicator)?;
        }
        Command::Simulate {
            snapshot,
            entries,
            unreachable,
            locked,
        } => {
            let document = load_snapshot(&snapshot)?;
            let url = document
                .url
                .clone()
                .context("Snapshot has no url; add a top-level \"url\" field")?;
            let entries = match entries {
                Some(path) => load_entries(&path)?,
                None => Vec::new(),
            };
            let backend = StaticBackend {
                status: BackendStatus {
                    reachable: !unreachable,
                    locked,
                    update_available: false,
                },
                entries,
            };
            let host = SnapshotHost {
                page: PageSnapshot::new(url, document),
            };
            let assistant = Assistant::new(Arc::new(backend), Arc::new(host), &config);
            let decision = assistant
                .handle(None, TabEvent::NavigationCompleted)
                .await
                .context("Simulated host reported no active tab")?;
            print_json(&decision)?;
        }
        Command::Config => {
            println!("Config file: {}", config_path.display());
            println!(
                "OTP maxlength band: {}..={}",
                config.otp.min_max_length, config.otp.max_max_length
            );
            println!("Extra OTP fingerprints: {}", config.otp.extra_fingerprints.len());
            println!("Site preferences: {}", config.sites.len());
            for site in &config.sites {
                let mut notes = Vec::new();
                if site.ignore {
                    notes.push("ignored".to_string());
                }
                if let Some(trigger) = &site.reveal_trigger {
                    notes.push(format!("reveal {trigger}"));
                }
                println!("  {} {}", site.pattern, notes.join(", "));
            }
        }
    }

    Ok(())
}

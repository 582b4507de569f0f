//! EcoDash CLI
//!
//! Command-line front end for the dashboard refresh client:
//! - Watch the dashboard charts on the refresh schedule
//! - Refresh once and print the series
//! - Export a chart as CSV
//! - Manage the theme preference

use anyhow::Context;
use clap::{Parser, Subcommand};
use ecodash::{
    export_widget_csv, format_number, generate_default_config, ChartBoard, Config, HttpChartApi,
    PreferenceStore, RefreshLoop, Theme, ThemeManager, TickReport, UpdateStatus, WidgetKind,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ecodash")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Keeps energy dashboard charts in sync with the dashboard API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Dashboard API URL, overrides the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refresh the charts on schedule until Ctrl-C
    Watch {
        /// Page path the client is on; polling only happens on the dashboard route
        #[arg(short, long, default_value = "/dashboard")]
        path: String,
    },

    /// Refresh every chart once and print the series
    Refresh {
        /// Decimals shown for values
        #[arg(short, long, default_value = "2")]
        decimals: usize,
    },

    /// Refresh once and export one chart as CSV
    Export {
        /// Chart id (consumptionChart, emissionsChart, forecastChart)
        widget: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or change the theme preference
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ThemeAction {
    /// Print the saved theme
    Get,
    /// Save a theme (light or dark)
    Set { theme: Theme },
    /// Switch between light and dark
    Toggle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = cli.api_url {
        config.api.url = url;
    }

    init_logging(&config);

    match cli.command {
        Commands::Watch { path } => watch(&config, &path).await?,

        Commands::Refresh { decimals } => {
            let (refresher, board) = build(&config)?;
            let report = refresher.refresh_now().await;

            for widget in board.widgets().await {
                println!("{}", widget.id);
                let Some(series) = widget.primary_series() else {
                    continue;
                };
                for (label, value) in series.x.iter().zip(&series.y) {
                    println!("  {:<12} {:>10}", label, format_number(*value, decimals));
                }
            }
            print_failures(&report);
        }

        Commands::Export { widget, output } => {
            if WidgetKind::from_id(&widget).is_none() {
                anyhow::bail!("unknown chart '{}'", widget);
            }

            let (refresher, board) = build(&config)?;
            let report = refresher.refresh_now().await;
            print_failures(&report);

            let rows = match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("failed to create {:?}", path))?;
                    let rows = export_widget_csv(&board, &widget, file).await?;
                    println!("Exported {} rows to {:?}", rows, path);
                    rows
                }
                None => export_widget_csv(&board, &widget, std::io::stdout().lock()).await?,
            };
            tracing::info!(widget = %widget, rows, "Export complete");
        }

        Commands::Theme { action } => {
            let store = PreferenceStore::new(config.preferences_path());
            let mut themes = ThemeManager::init(store);
            let theme = match action {
                ThemeAction::Get => themes.current(),
                ThemeAction::Set { theme } => {
                    themes.set_theme(theme);
                    theme
                }
                ThemeAction::Toggle => themes.toggle(),
            };
            println!("{}", theme);
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("ecodash={}", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Refresh loop wired to the HTTP API and a board holding the three charts
fn build(config: &Config) -> anyhow::Result<(RefreshLoop, Arc<ChartBoard>)> {
    let api = Arc::new(HttpChartApi::new(config.client_config())?);
    let board = Arc::new(ChartBoard::with_widgets(
        WidgetKind::ALL.iter().map(|k| k.id()),
    ));
    let refresher = RefreshLoop::new(api, board.clone(), config.refresh_config());
    Ok((refresher, board))
}

async fn watch(config: &Config, path: &str) -> anyhow::Result<()> {
    tracing::info!("EcoDash v{} watching {}", env!("CARGO_PKG_VERSION"), config.api.url);

    let (mut refresher, _board) = build(config)?;
    if !refresher.start(path) {
        tracing::info!(
            "{} is not the dashboard route ({}), nothing to refresh",
            path,
            config.dashboard.route
        );
        return Ok(());
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    refresher.stop().await;

    Ok(())
}

fn print_failures(report: &TickReport) {
    for outcome in &report.outcomes {
        if let UpdateStatus::Failed(e) = &outcome.status {
            eprintln!("{}: {}", outcome.kind, e);
        }
    }
}

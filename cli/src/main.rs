use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use toolcard::card::Card;
use toolcard::config::{BuildPolicy, CardConfig, CardOptions, ConfigError};
use toolcard::coords::Viewport;
use toolcard::entity::StaticSource;
use toolcard::registry::ToolRegistry;
use toolcard::toolset::ToolsetError;

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("invalid entity states: {0}")]
    InvalidStates(serde_json::Error),
    #[error("failed to serialize output: {0}")]
    Output(serde_json::Error),
    #[error("card build failed: {0}")]
    Build(#[from] ToolsetError),
    #[error("viewport must be a positive number, got {0}")]
    InvalidViewport(f64),
}

#[derive(Parser, Debug)]
#[command(name = "toolcard", about = "Render toolset cards to SVG")]
struct Cli {
    /// Viewport edge in SVG units. Overrides TOOLCARD_VIEWPORT.
    #[arg(long)]
    viewport: Option<f64>,

    /// Fail on the first broken tool instead of skipping it.
    #[arg(long, default_value_t = false)]
    abort_on_error: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a card config to an SVG document.
    Render(RenderArgs),
    /// List supported tool types.
    Types(TypesArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[arg(long, help = "Card config, YAML or JSON")]
    config: PathBuf,

    #[arg(long, help = "JSON array of entity snapshots")]
    states: Option<PathBuf>,

    #[arg(long, help = "Output file; stdout when omitted")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TypesArgs {
    #[arg(long, default_value_t = false, help = "Load deferred types before reporting")]
    preload: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let options = resolve_options(&cli)?;

    match cli.command {
        Command::Render(args) => run_render(options, args).await,
        Command::Types(args) => run_types(args).await,
    }
}

fn resolve_options(cli: &Cli) -> Result<CardOptions, CliError> {
    let mut options = CardOptions::from_env()?;
    if let Some(size) = cli.viewport {
        if !(size.is_finite() && size > 0.0) {
            return Err(CliError::InvalidViewport(size));
        }
        options.viewport = Viewport::new(size);
    }
    if cli.abort_on_error {
        options.build_policy = BuildPolicy::Abort;
    }
    Ok(options)
}

async fn run_render(options: CardOptions, args: RenderArgs) -> Result<(), CliError> {
    let config = CardConfig::from_path(&args.config)?;
    let source = match &args.states {
        Some(path) => parse_states(&read_file(path)?)?,
        None => StaticSource::new(),
    };
    tracing::debug!(entities = source.len(), "loaded entity states");

    let mut card = Card::new(options);
    card.configure(config, Arc::new(source)).await?;
    let svg = card.to_svg();

    match args.output {
        Some(path) => std::fs::write(&path, svg).map_err(|source| CliError::Write { path, source }),
        None => {
            println!("{svg}");
            Ok(())
        }
    }
}

async fn run_types(args: TypesArgs) -> Result<(), CliError> {
    let registry = ToolRegistry::shared();
    if args.preload {
        let candidates = registry.loader().candidate_types();
        registry.loader().preload(&candidates).await;
    }

    let stats = registry.loader().stats();
    let report = json!({
        "supported": registry.supported_types(),
        "immediately_available": registry
            .supported_types()
            .into_iter()
            .filter(|t| registry.is_immediately_available(t))
            .collect::<Vec<_>>(),
        "migration": registry.migration_status(),
        "loader": {
            "resolved_count": stats.resolved_count,
            "candidate_types": stats.candidate_types,
            "resolved_types": stats.resolved_types,
        },
    });
    print_json(&report)
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_path_buf(), source })
}

fn parse_states(text: &str) -> Result<StaticSource, CliError> {
    StaticSource::from_json(text).map_err(CliError::InvalidStates)
}

fn render_json(value: &Value) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(CliError::Output)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = render_json(value)?;
    println!("{rendered}");
    Ok(())
}

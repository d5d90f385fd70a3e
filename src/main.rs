use anyhow::{Context, Result, bail};
use clap::Parser;
use library_organizer::config::Config;
use library_organizer::library::Library;
use library_organizer::logging;
use library_organizer::watcher::handler::LibraryReconciler;
use library_organizer::watcher::service::OrganizerService;
use std::path::PathBuf;
use tracing::info;

/// Hard links newly arrived TV episodes into a library sorted by series.
#[derive(Debug, Parser)]
#[command(name = "library-organizer", version)]
struct Cli {
    /// Config file (defaults to $LIBRARY_ORGANIZER_CONFIG or the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Library root, overrides the config file
    #[arg(short, long)]
    library: Option<PathBuf>,

    /// Watch directory, may be repeated; overrides the config file
    #[arg(short, long = "watch")]
    watch: Vec<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Sync the library once and exit instead of watching
    #[arg(long)]
    once: bool,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => Config::default_path().ok().filter(|path| path.exists()),
    };

    let mut config = match (path, &cli.library) {
        (Some(path), _) => Config::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        (None, Some(library)) => Config::new(library.clone(), cli.watch.clone()),
        (None, None) => bail!("no config file found; pass --config or --library and --watch"),
    };

    if let Some(library) = &cli.library {
        config.library = library.clone();
    }
    if !cli.watch.is_empty() {
        config.watch = cli.watch.clone();
    }
    if cli.log_level.is_some() {
        config.log_level = cli.log_level.clone();
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    logging::init(config.log_level()?);

    let library = Library::open(&config.library).context("Failed to open library")?;
    let reconciler = LibraryReconciler::new(library)
        .with_parser(config.parser())
        .with_extensions(config.media_extensions.clone(), config.canonical_extension.clone());
    let mut service = OrganizerService::new(reconciler);

    if cli.once {
        let outcomes = service.sync(&config.watch)?;
        info!(events = outcomes.len(), "Sync complete");
        return Ok(());
    }

    info!(library = %config.library.display(), watch_dirs = ?config.watch, "Starting");
    service.watch(&config.watch)?;
    service.sync(&config.watch)?;
    service.run()?;

    Ok(())
}

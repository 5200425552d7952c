//! eeprops CLI
//!
//! Bootstraps a resolver, loads the package configuration and prints the
//! result.

use std::fs::OpenOptions;
use std::io::Write;

use anyhow::{Result, bail};
use clap::Parser;
use eeprops::cli::{Cli, Command, GetArgs, ListArgs};
use eeprops::config::{
    ADDITIONAL_CONFIGURATION_PATHS, ConfigResolver, LoadOutcome, SystemProperties,
};
use eeprops::format::{OutputFormat, format_definitions, format_store, property_to_json};
use tracing::{Level, debug, warn};
use tracing_subscriber::FmtSubscriber;

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn report(outcomes: &[LoadOutcome]) {
    for outcome in outcomes {
        match outcome {
            LoadOutcome::Loaded { origin, keys } => debug!("loaded {keys} keys from {origin}"),
            LoadOutcome::NotFound { file_name } => debug!("{file_name} not found"),
            LoadOutcome::Failed { file_name, error } => warn!("{file_name}: {error}"),
        }
    }
}

fn run_list(resolver: &ConfigResolver, args: &ListArgs) -> Result<()> {
    print!("{}", format_store(&resolver.snapshot(), args.format));
    Ok(())
}

fn run_get(resolver: &ConfigResolver, args: &GetArgs) -> Result<()> {
    let Some(raw) = resolver.get(&args.key) else {
        bail!("property '{}' is not defined", args.key);
    };
    if args.typed {
        let typed = resolver.get_typed(&args.key);
        println!(
            "{}",
            serde_json::to_string_pretty(&property_to_json(&raw, typed.as_ref()))?
        );
    } else {
        println!("{raw}");
    }
    Ok(())
}

fn run_sources(resolver: &ConfigResolver, args: &ListArgs) -> Result<()> {
    let definitions = resolver.load_definitions();
    if definitions.is_empty() && args.format == OutputFormat::Text {
        println!("no configuration files loaded");
        return Ok(());
    }
    print!("{}", format_definitions(&definitions, args.format));
    std::io::stdout().flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let system = SystemProperties::global();
    for (key, value) in &cli.defines {
        system.set(key.clone(), value.clone());
    }

    let options = cli.call_options();
    let resolver = ConfigResolver::with_system(options.clone(), system);
    debug!(
        "runtime environment {}, search paths {:?}",
        resolver.runtime_environment(),
        resolver.search_paths()
    );

    // Search paths from the options were already added during bootstrap.
    let mut load_options = options;
    load_options.remove(ADDITIONAL_CONFIGURATION_PATHS);
    let root = cli.resource_root();
    let outcomes = resolver.load_package_configuration(&root, &load_options);
    report(&outcomes);

    match &cli.command {
        None => run_list(&resolver, &ListArgs::default()),
        Some(Command::List(args)) => run_list(&resolver, args),
        Some(Command::Get(args)) => run_get(&resolver, args),
        Some(Command::Sources(args)) => run_sources(&resolver, args),
    }
}

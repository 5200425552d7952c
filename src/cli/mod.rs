//! CLI command definitions for eeprops
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Args, Parser, Subcommand};

use crate::config::{
    ADDITIONAL_CONFIGURATION_PATHS, Options, ResourceRoot, RUNTIME_ENVIRONMENT,
};
use crate::format::OutputFormat;

/// Parse a `KEY=VALUE` argument.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_str(s).ok_or_else(|| format!("unknown format '{s}' (expected text or json)"))
}

/// Resolve layered configuration and inspect the result
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set a process-wide setting (system property)
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", value_parser = parse_key_value, global = true)]
    pub defines: Vec<(String, String)>,

    /// Set a call-site option (highest precedence)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value, global = true)]
    pub options: Vec<(String, String)>,

    /// Runtime environment (shorthand for -o eeprops.runtime.environment=ENV)
    #[arg(long, global = true)]
    pub env: Option<String>,

    /// Additional search directory, checked before the resource directory
    #[arg(long = "path", value_name = "DIR", global = true)]
    pub paths: Vec<String>,

    /// Directory holding the application's bundled configuration files
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    pub resources: String,

    /// Package sub-path, e.g. net/example/app
    #[arg(long, default_value = "", global = true)]
    pub package: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Call-site options assembled from `-o`, `--env` and `--path`.
    pub fn call_options(&self) -> Options {
        let mut options: Options = self.options.iter().cloned().collect();
        if let Some(env) = &self.env {
            options.set(RUNTIME_ENVIRONMENT, env.clone());
        }
        if !self.paths.is_empty() {
            let mut paths = options
                .get(ADDITIONAL_CONFIGURATION_PATHS)
                .map(str::to_string)
                .unwrap_or_default();
            for path in &self.paths {
                if !paths.is_empty() {
                    paths.push(':');
                }
                paths.push_str(path);
            }
            options.set(ADDITIONAL_CONFIGURATION_PATHS, paths);
        }
        options
    }

    pub fn resource_root(&self) -> ResourceRoot {
        ResourceRoot::directory("resources", &self.resources).with_package(&self.package)
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every resolved property (default if no subcommand given)
    List(ListArgs),

    /// Print one property
    Get(GetArgs),

    /// Show which files were loaded, in order
    Sources(ListArgs),
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Output format: text or json
    #[arg(short, long, default_value = "text", value_parser = parse_format)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Property name
    pub key: String,

    /// Print the typed value and its type instead of the raw text
    #[arg(long)]
    pub typed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("a.b=c=d"),
            Ok(("a.b".to_string(), "c=d".to_string()))
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_call_options() {
        let cli = Cli::parse_from([
            "eeprops",
            "--env",
            "production",
            "--path",
            "/etc/a",
            "--path",
            "/etc/b",
            "-o",
            "x=1",
            "list",
        ]);
        let options = cli.call_options();
        assert_eq!(options.get(RUNTIME_ENVIRONMENT), Some("production"));
        assert_eq!(options.get(ADDITIONAL_CONFIGURATION_PATHS), Some("/etc/a:/etc/b"));
        assert_eq!(options.get("x"), Some("1"));
    }

    #[test]
    fn test_get_command() {
        let cli = Cli::parse_from(["eeprops", "-D", "k=v", "get", "app.port", "--typed"]);
        assert_eq!(cli.defines, vec![("k".to_string(), "v".to_string())]);
        match cli.command {
            Some(Command::Get(args)) => {
                assert_eq!(args.key, "app.port");
                assert!(args.typed);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}

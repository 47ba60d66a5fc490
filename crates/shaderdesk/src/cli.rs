use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "shaderdesk",
    author,
    version,
    about = "Expression calculator and text-to-shader playground",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub options: SharedArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct SharedArgs {
    /// Shader generation service endpoint.
    #[arg(
        long,
        env = "SHADERDESK_ENDPOINT",
        default_value = shadergen::DEFAULT_ENDPOINT,
        value_name = "URL"
    )]
    pub endpoint: String,

    /// Skip the remote call and rely on the canned fallback table only.
    #[arg(long)]
    pub offline: bool,

    /// Replace the built-in fallback table with rules from a TOML file.
    #[arg(long, value_name = "FILE")]
    pub fallback_rules: Option<PathBuf>,

    /// Render surface size (e.g. `400x400`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate an arithmetic expression and print the result.
    Calc {
        #[arg(value_name = "EXPRESSION")]
        expression: String,
    },
    /// Generate a shader from a description, render it, and report the outcome.
    Generate {
        #[arg(value_name = "DESCRIPTION")]
        description: String,

        /// Write the rendered frame to this PNG path.
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,
    },
    /// Drive both panels interactively from stdin.
    Session,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32)> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .with_context(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let width = width
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid width in '{value}'"))?;
    let height = height
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid height in '{value}'"))?;
    if width == 0 || height == 0 {
        bail!("surface size must be positive, got '{value}'");
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_sizes() {
        assert_eq!(parse_surface_size("400x400").unwrap(), (400, 400));
        assert_eq!(parse_surface_size("1280X720").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size(" 640 x 480 ").unwrap(), (640, 480));
    }

    #[test]
    fn rejects_malformed_surface_sizes() {
        assert!(parse_surface_size("400").is_err());
        assert!(parse_surface_size("0x400").is_err());
        assert!(parse_surface_size("wide x tall").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

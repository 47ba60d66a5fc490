use std::path::Path;

use anyhow::{Context, Result};
use evaluator::Evaluator;
use renderer::{RenderOutcome, RenderPipeline, RendererConfig, DEFAULT_SURFACE_SIZE};
use shadergen::{
    FallbackTable, GeneratorClient, GeneratorConfig, ShaderOrigin, ShaderProvider,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{parse_surface_size, Cli, Command, SharedArgs};
use crate::session;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Calc { expression } => run_calc(&expression),
        Command::Generate {
            description,
            export,
        } => run_generate(&cli.options, &description, export.as_deref()),
        Command::Session => {
            let provider = build_provider(&cli.options)?;
            let pipeline = build_pipeline(&cli.options)?;
            session::run_session(Evaluator::new(), provider, pipeline)
        }
    }
}

fn run_calc(expression: &str) -> Result<()> {
    let evaluator = Evaluator::new();
    match evaluator.evaluate(expression) {
        Ok(value) => println!("{value}"),
        Err(err) => println!("error: {err}"),
    }
    Ok(())
}

fn run_generate(args: &SharedArgs, description: &str, export: Option<&Path>) -> Result<()> {
    let provider = build_provider(args)?;
    let mut pipeline = build_pipeline(args)?;

    let shader = match provider.provide(description) {
        Ok(shader) => shader,
        Err(err) => {
            println!("error: {err}");
            return Ok(());
        }
    };
    match &shader.origin {
        ShaderOrigin::Remote => tracing::info!("using remotely generated shader"),
        ShaderOrigin::Fallback { transport_error } => {
            let rule = shader.rule.as_deref().unwrap_or("unnamed");
            println!("generation failed ({transport_error}); using canned shader '{rule}'");
        }
    }
    println!("{}", shader.source.trim_end());

    match pipeline.render(&shader.source) {
        RenderOutcome::Rendered => {
            let (width, height) = pipeline.surface_size();
            println!("rendered {width}x{height} frame");
            if let Some(path) = export {
                pipeline.export_png(path)?;
                println!("wrote {}", path.display());
            }
        }
        RenderOutcome::CompileError { stage, log } => {
            println!("shader {stage} compilation failed:\n{log}");
        }
        RenderOutcome::ContextUnavailable => {
            println!("graphics context unavailable; shader not rendered");
        }
    }
    Ok(())
}

fn build_provider(args: &SharedArgs) -> Result<ShaderProvider> {
    let table = match &args.fallback_rules {
        Some(path) => FallbackTable::load(path)?,
        None => FallbackTable::builtin(),
    };
    let client = if args.offline {
        tracing::info!("remote generation disabled (--offline)");
        None
    } else {
        let config =
            GeneratorConfig::new(&args.endpoint).context("invalid generator endpoint")?;
        Some(GeneratorClient::new(config).context("failed to construct generator client")?)
    };
    Ok(ShaderProvider::new(client, table))
}

fn build_pipeline(args: &SharedArgs) -> Result<RenderPipeline> {
    let surface_size = args
        .size
        .as_ref()
        .map(|value| parse_surface_size(value))
        .transpose()?
        .unwrap_or(DEFAULT_SURFACE_SIZE);
    Ok(RenderPipeline::new(RendererConfig { surface_size }))
}

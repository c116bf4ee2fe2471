use std::{fs::File, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::AppConfig;

mod config;
mod run;

/// Generates struct copy functions from the annotated converter trait of a Rust file.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Rust file declaring the converter trait
    input: PathBuf,

    /// Output file, `<stem>.<suffix>.rs` next to the input by default
    #[clap(short, long)]
    out: Option<PathBuf>,

    /// Additional file or directory declaring structs, converters and hooks
    #[clap(short = 'I', long)]
    include: Vec<PathBuf>,

    /// TOML configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Write logs to `<output>.log`
    #[clap(short, long)]
    log: bool,

    /// Do not write the output file
    #[clap(short, long)]
    dry: bool,

    /// Print the generated code
    #[clap(short, long)]
    print: bool,

    /// Write specs, plans and diagnostics as JSON
    #[clap(long)]
    plan: Option<PathBuf>,
}

fn init_logging(config: &AppConfig, log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(config.level_filter()?);
    builder.parse_default_env();
    if let Some(path) = log_file {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init().context("failed to initialize logging")
}

fn try_main(args: &CliArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;
    let output = run::output_path(&args.input, args.out.as_deref(), &config.output_suffix);
    let log_file = args.log.then(|| run::log_path(&output));
    init_logging(&config, log_file.as_deref())?;
    run::run(args, &config, &output)?;
    Ok(())
}

fn main() {
    let args = CliArgs::parse();
    if let Err(err) = try_main(&args) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

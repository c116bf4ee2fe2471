use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use structcopy::{
    catalog::loader::SourceLoader,
    diagnostic::Severity,
    generator::{generate_from, GeneratedFile},
};

use crate::{config::AppConfig, CliArgs};

/// `<dir>/<stem>.<suffix>.rs` next to the input, unless `out` is given.
pub fn output_path(input: &Path, out: Option<&Path>, suffix: &str) -> PathBuf {
    if let Some(out) = out {
        return out.to_owned();
    }
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}.{}.rs", stem, suffix))
}

pub fn log_path(output: &Path) -> PathBuf {
    let mut path = output.as_os_str().to_owned();
    path.push(".log");
    PathBuf::from(path)
}

pub fn run(args: &CliArgs, config: &AppConfig, output: &Path) -> Result<GeneratedFile> {
    let mut loader = SourceLoader::new()
        .input_path(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    for include in &args.include {
        loader = loader
            .include_path(include)
            .with_context(|| format!("failed to read {}", include.display()))?;
    }
    let generated = generate_from(loader, &config.generator_config())?;

    for diagnostic in &generated.diagnostics {
        match diagnostic.severity {
            Severity::Warning => log::warn!("{}", diagnostic),
            Severity::Error => log::error!("{}", diagnostic),
        }
    }

    if let Some(plan) = &args.plan {
        fs::write(plan, generated.plan_json()?)
            .with_context(|| format!("failed to write {}", plan.display()))?;
    }
    if args.print {
        println!("{}", generated.code);
    }
    if args.dry {
        log::info!("dry run, {} not written", output.display());
    } else {
        fs::write(output, &generated.code)
            .with_context(|| format!("failed to write {}", output.display()))?;
        log::info!("wrote {}", output.display());
    }
    Ok(generated)
}

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use nestml::{CompilerContext, LoggingLevel, ModelParser};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Level {
    Info,
    Warning,
    Error,
}

impl From<Level> for LoggingLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Info => LoggingLevel::Info,
            Level::Warning => LoggingLevel::Warning,
            Level::Error => LoggingLevel::Error,
        }
    }
}

/// checks NESTML neuron and synapse models and prints their diagnostics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model files, or directories containing .nestml files
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Minimum level of the diagnostics to print
    #[arg(short, long, value_enum, default_value_t = Level::Warning)]
    level: Level,
}

/// files given directly, plus the `.nestml` files directly inside the given
/// directories, in name order
fn model_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let mut found = Vec::new();
        let entries = fs::read_dir(path)
            .with_context(|| format!("cannot read directory {}", path.display()))?;
        for entry in entries {
            let entry = entry?.path();
            if entry.is_file() && entry.extension().is_some_and(|ext| ext == "nestml") {
                found.push(entry);
            }
        }
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Args::parse();
    let context = CompilerContext::initialized(cli.level.into());
    let files = model_files(&cli.paths)?;
    let mut rejected = 0;
    for file in &files {
        let mut context = context.fork();
        let result = ModelParser::new(&mut context).parse_model(file);
        for diagnostic in context.logger.sorted_diagnostics() {
            println!("{}: {}", file.display(), diagnostic);
        }
        match result {
            Ok(unit) => println!("{}: ok, {} model(s)", file.display(), unit.models.len()),
            Err(err) => {
                rejected += 1;
                println!("{}: {}", file.display(), err);
            }
        }
    }
    println!("checked {} file(s), {} rejected", files.len(), rejected);
    info!("done");
    Ok(if rejected == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

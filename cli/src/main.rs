use std::{
    fs,
    path::{Path, PathBuf},
    process::exit,
};

use anyhow::{anyhow, Context};
use bb::{diagnostics, unit_name, CompileOptions, ErrorS};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "BB_LOG";

/// Compile bb templates in to Rust render units
#[derive(Parser, Debug)]
#[command(name = "bb", author, version, about, long_about = None, arg_required_else_help = true)]
struct Args {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the tokens of a template as JSON
    Tokens {
        /// Path to template file
        path: PathBuf,
    },
    /// Print the parsed and inferred template as JSON
    Ast {
        /// Path to template file
        path: PathBuf,
    },
    /// Check that a template compiles
    Check {
        /// Path to template file
        path: PathBuf,
    },
    /// Compile a template in to Rust source
    Compile {
        /// Path to template file
        path: PathBuf,

        /// Name of the generated module, defaults to the file name
        #[arg(long)]
        name: Option<String>,

        /// Write the generated source to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose);

    if let Err(err) = run(args.command) {
        eprintln!("{err:#}");
        exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Tokens { path } => {
            let source = read(&path)?;
            let tokens = bb::tokenize(&source).map_err(|err| reported(&err, &path, &source))?;

            print_json(&tokens)
        }
        Commands::Ast { path } => {
            let source = read(&path)?;
            let template = bb::analyze(&source).map_err(|err| reported(&err, &path, &source))?;

            print_json(&template)
        }
        Commands::Check { path } => {
            let source = read(&path)?;

            compile(&path, &source, None)?;

            debug!(path = %path.display(), "template compiles");

            Ok(())
        }
        Commands::Compile { path, name, output } => {
            let source = read(&path)?;
            let generated = compile(&path, &source, name)?;

            match output {
                Some(output) => fs::write(&output, generated)
                    .with_context(|| format!("Unable to write {}", output.display())),
                None => {
                    print!("{generated}");
                    Ok(())
                }
            }
        }
    }
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Unable to read {}", path.display()))
}

fn compile(path: &Path, source: &str, name: Option<String>) -> anyhow::Result<String> {
    let options = CompileOptions::default()
        .with_name(name.unwrap_or_else(|| unit_name(path)))
        .with_file_name(path.display().to_string());

    bb::compile(source, &options).map_err(|err| reported(&err, path, source))
}

fn reported(err: &ErrorS, path: &Path, source: &str) -> anyhow::Error {
    anyhow!(diagnostics::report(err, &path.display().to_string(), source))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

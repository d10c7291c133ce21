use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sway_out::common::config::{Layout, Settings};
use sway_out::common::log;
use sway_out::ipc::socket::SwayConnection;
use sway_out::layout_engine::{LayoutEngine, WorkspaceCheck};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity. Repeat for more.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Arrange workspaces as described by a layout file, launching missing
    /// applications.
    Apply {
        file: PathBuf,
    },
    /// Report whether the live workspaces match a layout file. Exits with
    /// status 1 on any mismatch.
    Check {
        file: PathBuf,
        /// Draw the live tree of workspaces that do not match.
        #[arg(long)]
        tree: bool,
    },
    /// Write the current workspaces as a layout document.
    Capture {
        /// Write to this file instead of standard output.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Workspaces to capture. All of them when none are given.
        workspaces: Vec<String>,
    },
    /// Validate a layout file without connecting to the window manager.
    Validate {
        file: PathBuf,
    },
}

fn main() {
    sigpipe::reset();
    let opt = Cli::parse();
    log::init_logging(opt.verbose);

    match run(opt) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(2);
        }
    }
}

/// Returns whether the command succeeded in the sense of its exit status.
fn run(opt: Cli) -> anyhow::Result<bool> {
    let settings = Settings::load(opt.config.as_deref())?;

    if let Commands::Validate { file } = &opt.command {
        Layout::read(file, settings.relocation_mark)?;
        println!("Layout validation passed");
        return Ok(true);
    }

    let conn = SwayConnection::connect().context("Could not connect to the window manager")?;
    let mut engine = LayoutEngine::new(conn, settings);

    match opt.command {
        Commands::Apply { file } => {
            let layout = Layout::read(&file, engine.settings().relocation_mark)?;
            engine.apply(&layout)?;
            Ok(true)
        }
        Commands::Check { file, tree } => {
            let layout = Layout::read(&file, engine.settings().relocation_mark)?;
            let checks = engine.check(&layout)?;
            if tree {
                print_trees(&mut engine, &checks)?;
            }
            report(&checks);
            Ok(checks.iter().all(WorkspaceCheck::is_match))
        }
        Commands::Capture { output, workspaces } => {
            let layout = engine.capture(&workspaces)?;
            write_document(output.as_deref(), &layout.to_yaml()?)?;
            Ok(true)
        }
        Commands::Validate { .. } => Ok(true),
    }
}

fn report(checks: &[WorkspaceCheck]) {
    for check in checks {
        match &check.comparison {
            None => println!("{}: workspace not found", check.name),
            Some(comparison) if comparison.is_match() => println!("{}: matches", check.name),
            Some(comparison) => {
                println!("{}: does not match", check.name);
                for mismatch in &comparison.mismatches {
                    println!("  {mismatch}");
                }
            }
        }
    }
}

fn print_trees(
    engine: &mut LayoutEngine<SwayConnection>,
    checks: &[WorkspaceCheck],
) -> anyhow::Result<()> {
    let tree = engine.tree()?;
    for check in checks.iter().filter(|c| !c.is_match()) {
        if let Some(drawing) = check.id.and_then(|id| tree.draw(id)) {
            println!("{drawing}");
        }
    }
    Ok(())
}

fn write_document(path: Option<&Path>, document: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, document)
            .with_context(|| format!("Could not write {}", path.display())),
        None => {
            std::io::stdout().write_all(document.as_bytes())?;
            Ok(())
        }
    }
}

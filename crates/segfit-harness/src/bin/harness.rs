//! CLI entrypoint for the segfit trace harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use segfit_harness::{Script, replay};

/// Trace tooling for the segfit allocator.
#[derive(Debug, Parser)]
#[command(name = "segfit-harness")]
#[command(about = "Trace replay harness for the segfit allocator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay an allocation script against a fresh heap.
    Replay {
        /// Script file (`a <slot> <size>` / `r <slot> <size>` / `f <slot>`).
        #[arg(long)]
        script: PathBuf,
        /// Output path for the JSON report (prints to stdout when omitted).
        #[arg(long)]
        report: Option<PathBuf>,
        /// Run the structural validator every N operations (0 = end only).
        #[arg(long, default_value_t = 0)]
        validate_every: usize,
    },
    /// Generate a deterministic pseudo-random script.
    Generate {
        /// Number of operations.
        #[arg(long, default_value_t = 1000)]
        ops: usize,
        /// Seed for the trace generator.
        #[arg(long, default_value_t = 0xDEAD_BEEF)]
        seed: u64,
        /// Output script path.
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Replay {
            script,
            report,
            validate_every,
        } => {
            let text = std::fs::read_to_string(&script)?;
            let parsed = Script::parse(&text)?;
            eprintln!(
                "Replaying {} operations from {}",
                parsed.ops.len(),
                script.display()
            );
            let result = replay(&parsed, validate_every)?;
            let json = result.to_json()?;
            match report {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    eprintln!("Report written to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Generate { ops, seed, output } => {
            let script = Script::generate(ops, seed);
            std::fs::write(&output, script.to_text())?;
            eprintln!(
                "Wrote {} operations to {}",
                script.ops.len(),
                output.display()
            );
        }
    }

    Ok(())
}

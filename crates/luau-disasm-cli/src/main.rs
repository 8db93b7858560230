//! luau-disasm - print Luau bytecode as a readable listing.
//!
//! Disassembles either a compiled bytecode file directly, or a Luau script
//! after running it through an external compiler.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

mod commands;
mod compiler;
mod config;

#[derive(Parser)]
#[command(
    name = "luau-disasm",
    version,
    about = "Luau bytecode disassembler",
    long_about = "Decodes Luau bytecode and prints one line per instruction.\n\n\
                  Compiled bytecode:  luau-disasm bytecode script.luauc\n\
                  Luau source:        luau-disasm source script.luau"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level: -v debug, -vv trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Disassemble a compiled bytecode file
    Bytecode(commands::bytecode::BytecodeCommand),
    /// Compile a Luau script and disassemble it
    Source(commands::source::SourceCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Bytecode(cmd) => cmd.run(&config),
        Commands::Source(cmd) => cmd.run(&config),
    }
}

//! CLI command implementations.

pub mod bytecode;
pub mod source;

use anyhow::{Context, Result};
use clap::Args;
use luau_disasm::{DumpOptions, Module, dump};
use std::io::Read;
use std::path::Path;

use crate::config::{Config, OutputFormat};

/// Output flags shared by every command
#[derive(Args, Debug, Default)]
pub struct OutputArgs {
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Prefix instructions with their source line
    #[arg(long)]
    pub lines: bool,

    /// Prefix instructions with their word offset
    #[arg(long)]
    pub pc: bool,
}

impl OutputArgs {
    /// Merge flags over the config file defaults
    pub fn resolve(&self, config: &Config) -> (OutputFormat, DumpOptions) {
        let format = self.format.or(config.output.format).unwrap_or_default();
        let options = DumpOptions {
            show_lines: self.lines || config.output.lines,
            show_pc: self.pc || config.output.pc,
        };
        (format, options)
    }

    /// Render a decoded module in the requested format
    pub fn render(&self, config: &Config, module: &Module) -> Result<String> {
        let (format, options) = self.resolve(config);
        match format {
            OutputFormat::Text => Ok(dump(module, &options)),
            OutputFormat::Json => {
                serde_json::to_string_pretty(module).context("Failed to serialize module")
            }
        }
    }
}

/// Read a whole input file, `-` meaning stdin
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("Failed to read stdin")?;
        return Ok(bytes);
    }

    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

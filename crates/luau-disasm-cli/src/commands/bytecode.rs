//! Bytecode command - disassemble a compiled Luau bytecode file.

use anyhow::{Context, Result};
use clap::Args;
use luau_disasm::{BytecodeEncoding, Module};
use std::path::PathBuf;

use super::{OutputArgs, read_input};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct BytecodeCommand {
    /// Bytecode file (`-` for stdin)
    pub file: PathBuf,

    /// Opcode encoding: `luau` for compiler output, `roblox` for permuted opcodes
    #[arg(long, value_name = "ENCODING")]
    pub encoding: Option<BytecodeEncoding>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl BytecodeCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let bytes = read_input(&self.file)?;
        let encoding = self
            .encoding
            .or(config.output.encoding)
            .unwrap_or_default();
        tracing::debug!(
            "Decoding {} bytes from {:?} as {}",
            bytes.len(),
            self.file,
            encoding
        );

        let module = Module::decode(&bytes, encoding)
            .with_context(|| format!("Failed to decode {}", self.file.display()))?;
        print!("{}", self.output.render(config, &module)?);
        Ok(())
    }
}

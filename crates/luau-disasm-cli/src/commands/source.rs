//! Source command - compile a Luau script and disassemble the result.

use anyhow::{Context, Result};
use clap::Args;
use luau_disasm::{BytecodeEncoding, Compile, Module};
use std::path::{Path, PathBuf};

use super::{OutputArgs, read_input};
use crate::compiler::ExternalCompiler;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct SourceCommand {
    /// Luau script (`-` for stdin)
    pub file: PathBuf,

    /// Compiler executable, overriding the config file
    #[arg(long, value_name = "PATH")]
    pub compiler: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl SourceCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let program = self
            .compiler
            .as_deref()
            .or(config.compiler.path.as_deref());
        let compiler = ExternalCompiler::locate(program, config.compiler.args.clone())?;

        let bytes = if self.file == Path::new("-") {
            let source = String::from_utf8(read_input(&self.file)?)
                .context("Script on stdin is not valid UTF-8")?;
            compiler.compile(&source)?
        } else {
            compiler
                .compile_file(&self.file)
                .with_context(|| format!("Failed to compile {}", self.file.display()))?
        };

        // Compiler output always uses the direct opcode encoding
        let module = Module::decode(&bytes, BytecodeEncoding::Direct)
            .context("Failed to decode compiler output")?;
        print!("{}", self.output.render(config, &module)?);
        Ok(())
    }
}

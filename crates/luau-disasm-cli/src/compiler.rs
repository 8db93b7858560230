//! External `luau-compile` process used as the source compiler.

use anyhow::Context;
use luau_disasm::{Compile, CompileError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Compiler looked up on PATH when none is configured
pub const DEFAULT_COMPILER: &str = "luau-compile";

/// Runs `<program> <args...> <script>` and takes stdout as the bytecode.
#[derive(Debug, Clone)]
pub struct ExternalCompiler {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalCompiler {
    /// Resolve `program` (or [`DEFAULT_COMPILER`]) through PATH
    pub fn locate(program: Option<&Path>, args: Vec<String>) -> anyhow::Result<Self> {
        let name = program.unwrap_or(Path::new(DEFAULT_COMPILER));
        let program = which::which(name).with_context(|| {
            format!(
                "Luau compiler {:?} not found (set [compiler] path in luau-disasm.toml or pass --compiler)",
                name
            )
        })?;
        tracing::debug!("Using compiler at {:?}", program);
        Ok(Self { program, args })
    }

    /// Compile a script that is already on disk
    pub fn compile_file(&self, script: &Path) -> Result<Vec<u8>, CompileError> {
        tracing::debug!("Compiling {:?} with {:?} {:?}", script, self.program, self.args);

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                CompileError::new(format!("Failed to spawn {:?}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            return Err(CompileError::new(if stderr.is_empty() {
                format!("{:?} exited with {}", self.program, output.status)
            } else {
                stderr.to_string()
            }));
        }

        Ok(output.stdout)
    }
}

impl Compile for ExternalCompiler {
    /// Write `source` to a temporary `.luau` file and compile it
    fn compile(&self, source: &str) -> Result<Vec<u8>, CompileError> {
        let mut file = tempfile::Builder::new()
            .prefix("luau-disasm-")
            .suffix(".luau")
            .tempfile()
            .map_err(|e| CompileError::new(format!("Failed to create temp file: {}", e)))?;
        file.write_all(source.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| CompileError::new(format!("Failed to write temp file: {}", e)))?;

        self.compile_file(file.path())
    }
}

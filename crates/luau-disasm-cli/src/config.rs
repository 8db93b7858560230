//! Configuration file parsing for luau-disasm.toml.

use anyhow::Context;
use clap::ValueEnum;
use luau_disasm::BytecodeEncoding;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// Config file names searched for, in order, in each directory
const CONFIG_NAMES: &[&str] = &["luau-disasm.toml", ".luau-disasm.toml"];

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// External compiler settings
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Output defaults
    #[serde(default)]
    pub output: OutputConfig,
}

/// External compiler configuration.
#[derive(Debug, Deserialize)]
pub struct CompilerConfig {
    /// Executable name or path
    pub path: Option<PathBuf>,

    /// Arguments placed before the script path
    #[serde(default = "default_compiler_args")]
    pub args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            path: None,
            args: default_compiler_args(),
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Disassembly listing
    #[default]
    Text,
    /// Decoded module as JSON
    Json,
}

/// Output defaults; command-line flags take precedence.
#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Opcode encoding for the `bytecode` command
    #[serde(default, deserialize_with = "deserialize_encoding")]
    pub encoding: Option<BytecodeEncoding>,

    /// Output format
    pub format: Option<OutputFormat>,

    /// Prefix instructions with source lines
    #[serde(default)]
    pub lines: bool,

    /// Prefix instructions with word offsets
    #[serde(default)]
    pub pc: bool,
}

fn default_compiler_args() -> Vec<String> {
    vec!["--binary".to_string()]
}

fn deserialize_encoding<'de, D>(deserializer: D) -> Result<Option<BytecodeEncoding>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    value
        .map(|s| s.parse().map_err(serde::de::Error::custom))
        .transpose()
}

/// Load configuration from a file or search for default config files.
///
/// An explicitly given path must exist; a missing searched-for file just
/// means defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            tracing::debug!("Loaded config from {:?}", path);
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

/// Search for configuration file in the current directory and parent directories.
fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_ancestors(&cwd)
}

fn find_config_in_ancestors(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.is_file() {
                return Some(path);
            }
        }
        dir = current.parent();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.compiler.path, None);
        assert_eq!(config.compiler.args, vec!["--binary"]);
        assert_eq!(config.output.encoding, None);
        assert!(!config.output.lines);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[compiler]
path = "/opt/luau/luau-compile"
args = ["--binary", "-O2"]

[output]
encoding = "roblox"
format = "json"
pc = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.compiler.path,
            Some(PathBuf::from("/opt/luau/luau-compile"))
        );
        assert_eq!(config.compiler.args, vec!["--binary", "-O2"]);
        assert_eq!(
            config.output.encoding,
            Some(BytecodeEncoding::PermutedOpcode)
        );
        assert_eq!(config.output.format, Some(OutputFormat::Json));
        assert!(config.output.pc);
        assert!(!config.output.lines);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: Config = toml::from_str("[compiler]\npath = \"luau\"\n").unwrap();
        assert_eq!(config.compiler.args, vec!["--binary"]);
        assert_eq!(config.output.format, None);
    }

    #[test]
    fn test_invalid_encoding() {
        let err = toml::from_str::<Config>("[output]\nencoding = \"lua51\"\n").unwrap_err();
        assert!(err.to_string().contains("unknown bytecode encoding"));
    }

    #[test]
    fn test_load_explicit_and_search() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        let path = dir.path().join("luau-disasm.toml");
        std::fs::write(&path, "[output]\nlines = true\n").unwrap();

        assert_eq!(find_config_in_ancestors(&nested), Some(path.clone()));

        let config = load_config(Some(&path)).unwrap();
        assert!(config.output.lines);

        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }
}

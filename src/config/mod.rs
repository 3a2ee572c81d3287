use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ingest::chunking;
use crate::retrieval;

/// Per-service configuration block from config.toml.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct ServiceConfig {
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// Pipeline defaults, overridable per invocation from the CLI.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Defaults {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_chunk_tokens: usize,
    pub vector_weight: f64,
    pub text_weight: f64,
    pub top_k: usize,
    pub strategy: String,
    pub retrieval_mode: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            chunk_size: chunking::DEFAULT_CHUNK_SIZE,
            chunk_overlap: chunking::DEFAULT_OVERLAP,
            max_chunk_tokens: chunking::DEFAULT_MAX_CHUNK_TOKENS,
            vector_weight: retrieval::DEFAULT_VECTOR_WEIGHT,
            text_weight: retrieval::DEFAULT_TEXT_WEIGHT,
            top_k: retrieval::DEFAULT_TOP_K,
            strategy: "speaker_turn".to_string(),
            retrieval_mode: "hybrid".to_string(),
        }
    }
}

/// Top-level mrag config file structure.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct MragConfig {
    pub openai: Option<ServiceConfig>,
    pub supabase: Option<ServiceConfig>,
    pub anthropic: Option<ServiceConfig>,
    #[serde(default)]
    pub defaults: Option<Defaults>,
}

impl MragConfig {
    /// Load config from ~/.mrag/config.toml. Returns default if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(MragConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: MragConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;
        Ok(config)
    }

    /// Get service config by name.
    pub fn service_config(&self, service: &str) -> Option<&ServiceConfig> {
        match service {
            "openai" => self.openai.as_ref(),
            "supabase" => self.supabase.as_ref(),
            "anthropic" => self.anthropic.as_ref(),
            _ => None,
        }
    }

    pub fn defaults(&self) -> Defaults {
        self.defaults.clone().unwrap_or_default()
    }

    /// Display config with secrets redacted.
    pub fn display_redacted(&self) -> String {
        let mut lines = Vec::new();
        for (name, sc) in [
            ("openai", self.openai.as_ref()),
            ("supabase", self.supabase.as_ref()),
            ("anthropic", self.anthropic.as_ref()),
        ] {
            if let Some(sc) = sc {
                lines.push(format!("[{name}]"));
                display_service_config(&mut lines, sc);
            }
        }
        if lines.is_empty() {
            lines.push("(no services configured)".to_string());
        }
        lines.join("\n")
    }
}

fn display_service_config(lines: &mut Vec<String>, sc: &ServiceConfig) {
    if let Some(ref key) = sc.api_key {
        lines.push(format!("  api_key = \"{}\"", redact_key(key)));
    }
    if let Some(ref cmd) = sc.api_key_command {
        lines.push(format!("  api_key_command = \"{cmd}\""));
    }
    if let Some(ref url) = sc.base_url {
        lines.push(format!("  base_url = \"{url}\""));
    }
    if let Some(ref model) = sc.model {
        lines.push(format!("  model = \"{model}\""));
    }
}

/// Keep the first and last four bytes of a long key visible. Falls back to
/// full masking for short keys or when byte 4 is not a char boundary.
fn redact_key(key: &str) -> String {
    if key.len() > 8 {
        if let (Some(head), Some(tail)) = (key.get(..4), key.get(key.len() - 4..)) {
            return format!("{head}...{tail}");
        }
    }
    "****".to_string()
}

/// Resolve a credential through the chain: CLI flag > env var > config key > config command.
pub fn resolve_credential(
    cli_flag: Option<&str>,
    env_var_name: &str,
    config: Option<&ServiceConfig>,
) -> Result<String> {
    // 1. CLI flag
    if let Some(key) = cli_flag {
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }

    // 2. Environment variable
    if let Ok(val) = std::env::var(env_var_name) {
        if !val.is_empty() {
            return Ok(val);
        }
    }

    if let Some(sc) = config {
        // 3. Config file api_key
        if let Some(ref key) = sc.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }

        // 4. External command
        if let Some(ref cmd) = sc.api_key_command {
            if !cmd.is_empty() {
                let output = std::process::Command::new("sh")
                    .arg("-c")
                    .arg(cmd)
                    .output()
                    .with_context(|| format!("Failed to run api_key_command: {cmd}"))?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    bail!(
                        "api_key_command failed (exit {}): {}",
                        output.status.code().unwrap_or(-1),
                        stderr.trim()
                    );
                }

                let secret = String::from_utf8(output.stdout)
                    .context("api_key_command output is not valid UTF-8")?
                    .trim()
                    .to_string();

                if !secret.is_empty() {
                    return Ok(secret);
                }
            }
        }
    }

    bail!(
        "No API key found. Provide via {} env var or ~/.mrag/config.toml",
        env_var_name
    );
}

/// Path to the config file: ~/.mrag/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".mrag").join("config.toml"))
}

/// Default config template content.
pub fn default_config_template() -> &'static str {
    r#"# ~/.mrag/config.toml
# Credential resolution order: env var > api_key > api_key_command

[openai]
# api_key = "your-openai-api-key"
# api_key_command = "your-secrets-manager-command-here"
# model = "text-embedding-3-small"

[supabase]
# base_url = "https://your-project.supabase.co"
# api_key = "your-supabase-service-key"

[anthropic]
# api_key = "your-anthropic-api-key"
# model = "claude-sonnet-4-20250514"

[defaults]
# chunk_size = 500
# chunk_overlap = 50
# max_chunk_tokens = 500
# vector_weight = 0.7
# text_weight = 0.3
# top_k = 10
# strategy = "speaker_turn"
# retrieval_mode = "hybrid"
"#
}

/// Create the default config file if it doesn't already exist.
pub fn init_config() -> Result<bool> {
    let path = config_path()?;
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, default_config_template())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_constants() {
        let d = Defaults::default();
        assert_eq!(d.chunk_size, 500);
        assert_eq!(d.chunk_overlap, 50);
        assert_eq!(d.vector_weight, 0.7);
        assert_eq!(d.text_weight, 0.3);
    }

    #[test]
    fn partial_defaults_block_fills_in_rest() {
        let config: MragConfig = toml::from_str("[defaults]\nchunk_size = 200\n").unwrap();
        let d = config.defaults();
        assert_eq!(d.chunk_size, 200);
        assert_eq!(d.chunk_overlap, 50);
    }

    #[test]
    fn redaction_masks_multibyte_keys_without_panicking() {
        // Byte 4 lands inside a multi-byte character.
        assert_eq!(redact_key("abcé-secret-material"), "****");
        assert_eq!(redact_key("€€€€"), "****");
        assert_eq!(redact_key("short"), "****");
        assert_eq!(redact_key("sk-abcdef1234567890"), "sk-a...7890");
    }

    #[test]
    fn redaction_hides_key_material() {
        let config: MragConfig =
            toml::from_str("[openai]\napi_key = \"sk-abcdef1234567890\"\n").unwrap();
        let shown = config.display_redacted();
        assert!(shown.contains("sk-a...7890"));
        assert!(!shown.contains("abcdef123456"));
    }
}

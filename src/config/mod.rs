//! Configuration management for the Helpdesk CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::agentos::{AgentOsClient, DEFAULT_BASE_URL};
use crate::core::auth::{KeychainSession, StaticToken, SupabaseAuth, TokenProvider};
use crate::core::notes::NotesClient;
use crate::core::stream::{DEFAULT_KNOWLEDGE_TOOL, Reducer};
use crate::core::{Error, Result};

/// Overrides the AgentOS base URL.
pub const BACKEND_URL_ENV: &str = "HELPDESK_BACKEND_URL";
/// Overrides the Supabase project URL.
pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
/// Overrides the Supabase anon key.
pub const SUPABASE_ANON_KEY_ENV: &str = "SUPABASE_ANON_KEY";
/// Fixed bearer token; bypasses the keychain session.
pub const TOKEN_ENV: &str = "HELPDESK_TOKEN";

/// Agent used when none is configured.
pub const DEFAULT_AGENT: &str = "helpdesk-assistant";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AgentOS backend.
    pub agentos: AgentOsConfig,

    /// Supabase project used for sign-in and notes.
    pub supabase: SupabaseConfig,

    /// Bearer token from the environment. Never written to disk.
    #[serde(skip)]
    pub token: Option<String>,
}

/// AgentOS settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentOsConfig {
    /// Backend base URL.
    pub base_url: String,

    /// Agent to chat with.
    pub agent: String,

    /// Tool whose results carry knowledge-base citations.
    pub knowledge_tool: String,

    /// Stream answers as they are produced.
    pub stream: bool,

    /// User id sent with each run so the backend can scope sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Default for AgentOsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            agent: DEFAULT_AGENT.to_string(),
            knowledge_tool: DEFAULT_KNOWLEDGE_TOOL.to_string(),
            stream: true,
            user_id: None,
        }
    }
}

/// Supabase settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Publishable (anon) key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
}

impl Config {
    /// Load configuration from the default paths and the environment.
    ///
    /// Loads global config first, then merges project-local config if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        let project = Self::project_config_path().ok();
        let mut config = Self::load_from(&Self::config_path()?, project.as_deref())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load and merge the given files, ignoring ones that don't exist.
    ///
    /// Merging is key by key: any key the project file sets wins, including
    /// one set back to its default value.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_from(global: &Path, project: Option<&Path>) -> anyhow::Result<Self> {
        let mut table = if global.exists() {
            Self::read(global)?
        } else {
            toml::Table::new()
        };

        if let Some(project) = project.filter(|p| p.exists()) {
            tracing::debug!(path = %project.display(), "merging project config");
            merge(&mut table, Self::read(project)?);
        }

        toml::Value::Table(table)
            .try_into()
            .map_err(|e| anyhow::anyhow!("invalid config: {e}"))
    }

    /// Read one file, checking it against the config schema on its own.
    fn read(path: &Path) -> anyhow::Result<toml::Table> {
        let contents = std::fs::read_to_string(path)?;
        let table: toml::Table = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        toml::Value::Table(table.clone())
            .try_into::<Self>()
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        Ok(table)
    }

    /// Apply environment overrides. `lookup` resolves a variable name.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(BACKEND_URL_ENV) {
            self.agentos.base_url = url;
        }
        if let Some(url) = lookup(SUPABASE_URL_ENV) {
            self.supabase.url = Some(url);
        }
        if let Some(key) = lookup(SUPABASE_ANON_KEY_ENV) {
            self.supabase.anon_key = Some(key);
        }
        if let Some(token) = lookup(TOKEN_ENV) {
            self.token = Some(token);
        }
    }

    /// Get the configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the config directory path (`~/.config/helpdesk/cli/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config_home).join("helpdesk").join("cli"));
        }

        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

        Ok(base.config_dir().join("helpdesk").join("cli"))
    }

    /// Get the project-local configuration file path.
    ///
    /// Looks for `.helpdesk/config.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory is unavailable.
    pub fn project_config_path() -> anyhow::Result<PathBuf> {
        let cwd = std::env::current_dir()?;
        Ok(cwd.join(".helpdesk").join("config.toml"))
    }

    /// Supabase auth client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the project URL or anon key is missing.
    pub fn supabase_auth(&self) -> Result<SupabaseAuth> {
        let url = self.supabase.url.as_deref().ok_or_else(|| {
            Error::Config(format!("Supabase URL is not configured (set {SUPABASE_URL_ENV})"))
        })?;
        let anon_key = self.supabase.anon_key.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "Supabase anon key is not configured (set {SUPABASE_ANON_KEY_ENV})"
            ))
        })?;
        SupabaseAuth::new(url, anon_key)
    }

    /// Where bearer tokens come from: the environment token if set, else
    /// the keychain session.
    #[must_use]
    pub fn token_provider(&self) -> Arc<dyn TokenProvider> {
        if let Some(token) = &self.token {
            tracing::debug!("using token from {TOKEN_ENV}");
            return Arc::new(StaticToken::new(token.clone()));
        }
        Arc::new(KeychainSession::new(self.supabase_auth().ok()))
    }

    /// AgentOS client.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid.
    pub fn agentos_client(&self) -> Result<AgentOsClient> {
        AgentOsClient::new(&self.agentos.base_url, self.token_provider())
    }

    /// Notes client.
    ///
    /// # Errors
    ///
    /// Returns error if Supabase is not configured.
    pub fn notes_client(&self) -> Result<NotesClient> {
        NotesClient::new(self.supabase_auth()?, self.token_provider())
    }

    /// Reducer using the configured knowledge tool.
    #[must_use]
    pub fn reducer(&self) -> Reducer {
        Reducer::new(self.agentos.knowledge_tool.clone())
    }
}

/// Overlay `other` onto `base`. Nested tables merge; other values replace.
fn merge(base: &mut toml::Table, other: toml::Table) {
    for (key, value) in other {
        if let toml::Value::Table(nested) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge(existing, nested);
                continue;
            }
            base.insert(key, toml::Value::Table(nested));
        } else {
            base.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_point_at_local_backend() {
        let config = Config::default();
        assert_eq!(config.agentos.base_url, "http://localhost:8000");
        assert_eq!(config.agentos.agent, "helpdesk-assistant");
        assert_eq!(config.agentos.knowledge_tool, "search_knowledge_base");
        assert!(config.agentos.stream);
        assert!(config.supabase.url.is_none());
    }

    #[test]
    fn missing_files_give_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml"), None).unwrap();
        assert_eq!(config.agentos, AgentOsConfig::default());
    }

    #[test]
    fn project_config_overrides_global() {
        let dir = TempDir::new().unwrap();
        let global = write(
            &dir,
            "global.toml",
            r#"
[agentos]
base_url = "https://agents.example.com"
agent = "general-assistant"

[supabase]
url = "https://xyz.supabase.co"
anon_key = "anon"
"#,
        );
        let project = write(
            &dir,
            "project.toml",
            r#"
[agentos]
agent = "billing-assistant"
stream = false
"#,
        );

        let config = Config::load_from(&global, Some(&project)).unwrap();
        assert_eq!(config.agentos.base_url, "https://agents.example.com");
        assert_eq!(config.agentos.agent, "billing-assistant");
        assert!(!config.agentos.stream);
        assert_eq!(config.supabase.url.as_deref(), Some("https://xyz.supabase.co"));
    }

    #[test]
    fn project_config_can_restore_defaults() {
        let dir = TempDir::new().unwrap();
        let global = write(
            &dir,
            "global.toml",
            "[agentos]\nstream = false\nagent = \"general-assistant\"\n",
        );
        let project = write(
            &dir,
            "project.toml",
            "[agentos]\nstream = true\nagent = \"helpdesk-assistant\"\n",
        );

        let config = Config::load_from(&global, Some(&project)).unwrap();
        assert!(config.agentos.stream);
        assert_eq!(config.agentos.agent, DEFAULT_AGENT);
    }

    #[test]
    fn wrong_value_type_names_the_file() {
        let dir = TempDir::new().unwrap();
        let global = write(&dir, "global.toml", "[agentos]\nagent = \"a\"\n");
        let project = write(&dir, "project.toml", "[agentos]\nstream = \"yes\"\n");
        let err = Config::load_from(&global, Some(&project)).unwrap_err();
        assert!(err.to_string().contains("project.toml"));
    }

    #[test]
    fn invalid_toml_is_reported() {
        let dir = TempDir::new().unwrap();
        let global = write(&dir, "bad.toml", "[agentos\nagent = 1");
        let err = Config::load_from(&global, None).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn environment_overrides_files() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (BACKEND_URL_ENV, "http://10.0.0.2:7777"),
            (SUPABASE_URL_ENV, "https://env.supabase.co"),
            (SUPABASE_ANON_KEY_ENV, "env-anon"),
            (TOKEN_ENV, "tok"),
        ]);

        let mut config = Config::default();
        config.apply_env(|k| vars.get(k).map(ToString::to_string));

        assert_eq!(config.agentos.base_url, "http://10.0.0.2:7777");
        assert_eq!(config.supabase.url.as_deref(), Some("https://env.supabase.co"));
        assert_eq!(config.supabase.anon_key.as_deref(), Some("env-anon"));
        assert_eq!(config.token.as_deref(), Some("tok"));
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(|_| Some("  ".to_string()));
        assert_eq!(config.agentos.base_url, DEFAULT_BASE_URL);
        assert!(config.token.is_none());
    }

    #[test]
    fn token_is_never_serialized() {
        let config = Config {
            token: Some("secret-token".into()),
            ..Config::default()
        };
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("[agentos]"));
    }

    #[test]
    fn supabase_auth_requires_url_and_key() {
        let mut config = Config::default();
        assert!(matches!(config.supabase_auth(), Err(Error::Config(_))));

        config.supabase.url = Some("https://xyz.supabase.co".into());
        assert!(matches!(config.supabase_auth(), Err(Error::Config(_))));

        config.supabase.anon_key = Some("anon".into());
        assert!(config.supabase_auth().is_ok());
        assert!(config.notes_client().is_ok());
    }

    #[test]
    fn env_token_is_used_directly() {
        let config = Config {
            token: Some("tok".into()),
            ..Config::default()
        };
        let token = tokio_test::block_on(config.token_provider().token()).unwrap();
        assert_eq!(token.as_deref(), Some("tok"));
    }

    #[test]
    fn reducer_uses_configured_tool() {
        let mut config = Config::default();
        config.agentos.knowledge_tool = "search_docs".into();
        assert_eq!(config.reducer().knowledge_tool(), "search_docs");
    }
}

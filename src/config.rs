//! TOML configuration parsing.
//!
//! Every section is optional; an empty file (or no file at all) yields the
//! defaults below. Relative directories resolve against `paths.root`.
//!
//! ```toml
//! [paths]
//! root = "."
//! schemas_dir = "schemas"
//!
//! [fetch]
//! concurrency = 4
//! max_schemas = 0   # 0 = unlimited; MAX_SCHEMAS overrides
//!
//! [community]
//! repo = "mercurai/openapi-schema-directory"
//! token_env = "GITHUB_TOKEN"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding `fetch.max_schemas`.
pub const MAX_SCHEMAS_ENV: &str = "MAX_SCHEMAS";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub community: CommunityConfig,
    #[serde(default)]
    pub guru: GuruConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_schemas_dir")]
    pub schemas_dir: PathBuf,
    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: PathBuf,
    #[serde(default = "default_sources_dir")]
    pub sources_dir: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            schemas_dir: default_schemas_dir(),
            catalog_dir: default_catalog_dir(),
            sources_dir: default_sources_dir(),
            cache_dir: default_cache_dir(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_schemas_dir() -> PathBuf {
    PathBuf::from("schemas")
}
fn default_catalog_dir() -> PathBuf {
    PathBuf::from("catalog")
}
fn default_sources_dir() -> PathBuf {
    PathBuf::from("sources")
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from(".cache")
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub max_schemas: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            max_schemas: 0,
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_concurrency() -> usize {
    4
}
fn default_user_agent() -> String {
    format!("schema-atlas/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    #[serde(default = "default_suffixes")]
    pub suffixes: Vec<String>,
    #[serde(default = "default_targets_file")]
    pub targets_file: PathBuf,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            suffixes: default_suffixes(),
            targets_file: default_targets_file(),
        }
    }
}

/// Well-known schema locations, tried in this order.
pub fn default_suffixes() -> Vec<String> {
    [
        "/openapi.json",
        "/swagger.json",
        "/v1/openapi.json",
        "/api-docs",
        "/.well-known/openapi.json",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_targets_file() -> PathBuf {
    PathBuf::from("discovery-targets.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommunityConfig {
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            api_base: default_api_base(),
            token_env: default_token_env(),
        }
    }
}

fn default_repo() -> String {
    "mercurai/openapi-schema-directory".to_string()
}
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuruConfig {
    #[serde(default = "default_list_url")]
    pub list_url: String,
}

impl Default for GuruConfig {
    fn default() -> Self {
        Self {
            list_url: default_list_url(),
        }
    }
}

fn default_list_url() -> String {
    "https://api.apis.guru/v2/list.json".to_string()
}

impl Config {
    /// A config rooted at `root` with every other setting defaulted.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let mut config = Config::default();
        config.paths.root = root.into();
        config
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.paths.root.join(path)
        }
    }

    pub fn root(&self) -> &Path {
        &self.paths.root
    }

    pub fn schemas_dir(&self) -> PathBuf {
        self.resolve(&self.paths.schemas_dir)
    }

    pub fn catalog_dir(&self) -> PathBuf {
        self.resolve(&self.paths.catalog_dir)
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.resolve(&self.paths.sources_dir)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.resolve(&self.paths.cache_dir)
    }

    pub fn discovery_targets_path(&self) -> PathBuf {
        let targets = &self.discovery.targets_file;
        if targets.is_absolute() {
            targets.clone()
        } else {
            self.sources_dir().join(targets)
        }
    }

    /// Access token for the issue tracker, if the configured variable is set.
    pub fn community_token(&self) -> Option<String> {
        std::env::var(&self.community.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Use `path` when given, else `./config/atlas.toml` if present, else defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => {
            let fallback = Path::new("./config/atlas.toml");
            if fallback.exists() {
                load_config(fallback)
            } else {
                let mut config = Config::default();
                apply_env_overrides(&mut config)?;
                validate(&config)?;
                Ok(config)
            }
        }
    }
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(raw) = std::env::var(MAX_SCHEMAS_ENV) {
        if !raw.trim().is_empty() {
            config.fetch.max_schemas = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a non-negative integer", MAX_SCHEMAS_ENV))?;
        }
    }
    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    if config.fetch.concurrency == 0 {
        anyhow::bail!("fetch.concurrency must be > 0");
    }
    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be > 0");
    }
    if config.discovery.suffixes.is_empty() {
        anyhow::bail!("discovery.suffixes must not be empty");
    }
    if let Some(bad) = config
        .discovery
        .suffixes
        .iter()
        .find(|s| !s.starts_with('/'))
    {
        anyhow::bail!("discovery suffix '{}' must start with '/'", bad);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.fetch.concurrency, 4);
        assert_eq!(config.fetch.max_schemas, 0);
        assert_eq!(config.discovery.suffixes.len(), 5);
        assert_eq!(config.discovery.suffixes[0], "/openapi.json");
        assert_eq!(config.community.token_env, "GITHUB_TOKEN");
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn relative_dirs_resolve_against_root() {
        let config = Config::with_root("/srv/atlas");
        assert_eq!(config.schemas_dir(), PathBuf::from("/srv/atlas/schemas"));
        assert_eq!(config.catalog_dir(), PathBuf::from("/srv/atlas/catalog"));
        assert_eq!(
            config.discovery_targets_path(),
            PathBuf::from("/srv/atlas/sources/discovery-targets.json")
        );
    }

    #[test]
    fn rejects_zero_concurrency() {
        let config: Config = toml::from_str("[fetch]\nconcurrency = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_suffix_without_slash() {
        let config: Config =
            toml::from_str("[discovery]\nsuffixes = [\"openapi.json\"]\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("atlas.toml");
        std::fs::write(
            &path,
            "[paths]\nroot = \"/data\"\n\n[fetch]\ntimeout_secs = 5\n",
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.root(), Path::new("/data"));
        assert_eq!(config.fetch.timeout_secs, 5);
    }

    #[test]
    fn example_config_is_valid() {
        let config: Config = toml::from_str(include_str!("../config/atlas.example.toml")).unwrap();
        assert!(validate(&config).is_ok());
        assert_eq!(config.discovery.suffixes, default_suffixes());
        assert_eq!(config.community.repo, "mercurai/openapi-schema-directory");
    }
}

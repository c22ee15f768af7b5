use serde::{Deserialize, Serialize};

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache generation version, e.g. `v3`. Store names are derived from it.
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub control: ControlConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            classifier: ClassifierConfig::default(),
            cache: CacheConfig::default(),
            stats: StatsConfig::default(),
            control: ControlConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// When enabled, known-legitimate injected resources are matched but not blocked.
    #[serde(default = "default_true")]
    pub whitelist_enabled: bool,
    /// Injector ids blocked in addition to the built-in deny table.
    #[serde(default)]
    pub extra_blocked_ids: Vec<String>,
    /// URL prefixes whitelisted in addition to the built-in allow table.
    #[serde(default)]
    pub extra_allowed_prefixes: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            whitelist_enabled: true,
            extra_blocked_ids: vec![],
            extra_allowed_prefixes: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Base URL the precache manifest paths are resolved against.
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Root-relative asset paths pre-populated into the static store on install.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            precache_manifest: default_precache_manifest(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Capacity of the in-memory log ring buffer.
    #[serde(default = "default_max_log_entries")]
    pub max_log_entries: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            max_log_entries: default_max_log_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_control_listen")]
    pub listen: String,
    #[serde(default = "default_true")]
    pub cors: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            listen: default_control_listen(),
            cors: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path, version = %config.version, "configuration loaded");
        Ok(config)
    }

    /// Validate the configuration for consistency.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.version.is_empty() || self.version.contains(char::is_whitespace) {
            anyhow::bail!("version must be a non-empty token, got {:?}", self.version);
        }

        if self.stats.max_log_entries == 0 {
            anyhow::bail!("stats.max_log_entries must be at least 1");
        }

        for path in &self.cache.precache_manifest {
            if !path.starts_with('/') {
                anyhow::bail!("precache manifest entry must be root-relative: {:?}", path);
            }
        }

        Ok(())
    }

    /// Name of the static store for the configured version.
    pub fn static_store_name(&self) -> String {
        format!("static-{}", self.version)
    }

    /// Name of the dynamic store for the configured version.
    pub fn dynamic_store_name(&self) -> String {
        format!("dynamic-{}", self.version)
    }
}

fn default_true() -> bool {
    true
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_origin() -> String {
    "http://localhost:8080".to_string()
}

fn default_precache_manifest() -> Vec<String> {
    vec![
        "/".to_string(),
        "/index.html".to_string(),
        "/manifest.json".to_string(),
        "/favicon.ico".to_string(),
        "/assets/app.js".to_string(),
        "/assets/app.css".to_string(),
    ]
}

fn default_max_log_entries() -> usize {
    500
}

fn default_control_listen() -> String {
    "127.0.0.1:9301".to_string()
}

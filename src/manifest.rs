//! Content manifest model and loading
//!
//! The manifest (`manifest.json` inside the content directory) registers
//! every module with its files, dependencies and cache policy, plus
//! per-environment override directories.

use crate::error::{ContentError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Deployment environment a request is served for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Staging,
    #[default]
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }
}

impl FromStr for Environment {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dev" => Ok(Environment::Dev),
            "staging" => Ok(Environment::Staging),
            "prod" => Ok(Environment::Prod),
            other => Err(ContentError::InvalidQuery(format!(
                "env must be one of dev, staging, prod; got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration of one content module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    /// Files merged in order; later files win on conflicts
    #[serde(default)]
    pub files: Vec<String>,

    /// Modules whose data forms the lower-precedence base
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Response TTL in milliseconds
    #[serde(default)]
    pub cache_duration: u64,

    /// Informational size label
    #[serde(default)]
    pub size: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_strategy: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModuleConfig {
    /// Defaults for a module that an environment adds by id alone
    pub fn conditional(module_id: &str) -> Self {
        ModuleConfig {
            files: vec![module_id.to_string()],
            dependencies: vec!["core".to_string()],
            cache_duration: 300_000,
            size: "small".to_string(),
            priority: Some(10),
            load_strategy: Some("conditional".to_string()),
            extra: Map::new(),
        }
    }
}

/// Per-environment manifest settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    /// Directories searched for `{moduleId}.json` overrides
    #[serde(default)]
    pub overrides: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_modules: Vec<String>,

    /// Module ids to hide; a trailing `*` matches by prefix
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_modules: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The content manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,

    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,

    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// Load and parse a manifest file
    ///
    /// # Returns
    /// * `Err(ContentError::ManifestNotFound)` if the file does not exist
    /// * `Err(ContentError::ManifestLoadError)` if it cannot be read or parsed
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ContentError::ManifestNotFound(path.display().to_string())
            } else {
                ContentError::ManifestLoadError(format!("{}: {}", path.display(), e))
            }
        })?;

        let manifest: Manifest = serde_json::from_str(&content).map_err(|e| {
            ContentError::ManifestLoadError(format!("Invalid manifest format: {}", e))
        })?;

        debug!(
            "Loaded manifest: version={}, modules={}, environments={}",
            manifest.version,
            manifest.modules.len(),
            manifest.environments.len()
        );
        Ok(manifest)
    }

    pub fn module(&self, module_id: &str) -> Option<&ModuleConfig> {
        self.modules.get(module_id)
    }

    pub fn environment(&self, env: Environment) -> Option<&EnvironmentConfig> {
        self.environments.get(env.as_str())
    }

    /// The manifest as seen by clients of `env`
    ///
    /// Environment-specific additional modules are registered with
    /// [`ModuleConfig::conditional`] defaults, excluded modules are removed
    /// and the performance block is adjusted for prod and dev.
    pub fn resolve_for_environment(&self, env: Environment) -> Manifest {
        let mut resolved = self.clone();

        if let Some(env_config) = self.environment(env) {
            for module_id in &env_config.additional_modules {
                resolved
                    .modules
                    .entry(module_id.clone())
                    .or_insert_with(|| ModuleConfig::conditional(module_id));
            }

            for pattern in &env_config.exclude_modules {
                match pattern.strip_suffix('*') {
                    Some(prefix) => resolved.modules.retain(|id, _| !id.starts_with(prefix)),
                    None => {
                        resolved.modules.remove(pattern);
                    }
                }
            }

            let overrides = match env {
                Environment::Prod => Some(json!({
                    "enableCompression": true,
                    "enableCDN": true,
                    "preloadModules": ["core/global"],
                    "criticalModules": ["core/ui", "core/accessibility"],
                    "maxConcurrentLoads": 5,
                })),
                Environment::Dev => Some(json!({
                    "enableCompression": false,
                    "enableCDN": false,
                    "maxConcurrentLoads": 10,
                })),
                Environment::Staging => None,
            };
            if let Some(Value::Object(overrides)) = overrides {
                let performance = resolved.performance.get_or_insert_with(Map::new);
                for (key, value) in overrides {
                    performance.insert(key, value);
                }
            }
        }

        resolved
    }
}

//! Module composition
//!
//! Builds one JSON document for a module by layering, lowest precedence
//! first: dependency files (shallow-assigned together), the module's own
//! files (deep-merged in listed order), then `{dir}/{moduleId}.json` from
//! each override directory of the requested environment.
//!
//! Individual file failures never abort a composition. They are collected
//! as [`CompositionWarning`]s and surfaced in the response metadata.

use crate::error::{ContentError, Result};
use crate::manifest::{Environment, Manifest};
use crate::merge::{deep_merge, shallow_assign};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Check a module id against the allowed character set
///
/// Ids are non-empty and consist of ASCII letters, digits, `_`, `-` and `/`.
/// Anything else (including `.`) is rejected before the filesystem is touched.
pub fn validate_module_id(module_id: &str) -> Result<()> {
    if module_id.is_empty() {
        return Err(ContentError::InvalidModuleId("module ID must not be empty".to_string()));
    }
    match module_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/')))
    {
        Some(c) => Err(ContentError::InvalidModuleId(format!(
            "Invalid module ID format: unexpected character '{}'",
            c
        ))),
        None => Ok(()),
    }
}

/// Which composition layer a file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositionStage {
    Base,
    Override,
    Dependency,
}

impl fmt::Display for CompositionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompositionStage::Base => "base",
            CompositionStage::Override => "override",
            CompositionStage::Dependency => "dependency",
        };
        f.write_str(name)
    }
}

/// A file that could not be merged into a composition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionWarning {
    pub file: String,
    pub stage: CompositionStage,
    pub message: String,
}

/// Result of composing one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub data: Value,
    pub dependencies: Vec<String>,
    pub warnings: Vec<CompositionWarning>,
}

/// Metadata block of a module response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMetadata {
    pub loaded_at: String,
    pub environment: Environment,
    pub version: String,
    pub dependencies: Vec<String>,
    pub cache_duration: u64,
    /// Serialized length of `data` in bytes
    pub size: usize,
    /// Serialized length of the whole response in bytes
    pub response_size_bytes: usize,
    pub load_time_ms: u64,
    pub compression: String,
    pub warnings: Vec<CompositionWarning>,
}

/// Body of a successful module response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleResponse {
    pub id: String,
    pub data: Value,
    pub metadata: ModuleMetadata,
}

impl ModuleResponse {
    /// Serialize the response with `responseSizeBytes` equal to the final length
    ///
    /// The size field is part of the body it measures, so serialization is
    /// repeated until the number stops changing.
    pub fn to_json_bytes(&mut self) -> Result<Vec<u8>> {
        let mut body = serde_json::to_vec(self)?;
        for _ in 0..8 {
            if body.len() == self.metadata.response_size_bytes {
                return Ok(body);
            }
            self.metadata.response_size_bytes = body.len();
            body = serde_json::to_vec(self)?;
        }
        Err(ContentError::InternalError(
            "response size did not stabilize".to_string(),
        ))
    }
}

/// Composes modules from files under a content directory
#[derive(Debug, Clone)]
pub struct ModuleComposer {
    content_dir: PathBuf,
}

impl ModuleComposer {
    pub fn new<P: Into<PathBuf>>(content_dir: P) -> Self {
        ModuleComposer {
            content_dir: content_dir.into(),
        }
    }

    /// Compose `module_id` for `env`
    ///
    /// # Returns
    /// * `Err(ContentError::InvalidModuleId)` if the id fails validation
    /// * `Err(ContentError::ModuleNotFound)` if the manifest has no such module
    /// * `Ok(Composition)` otherwise, possibly carrying warnings
    pub async fn compose(
        &self,
        manifest: &Manifest,
        module_id: &str,
        env: Environment,
    ) -> Result<Composition> {
        validate_module_id(module_id)?;
        let module = manifest
            .module(module_id)
            .ok_or_else(|| ContentError::ModuleNotFound(module_id.to_string()))?;

        let mut warnings = Vec::new();

        let mut data = Value::Object(Map::new());
        for file in &module.files {
            match self.read_json(file).await {
                Ok(layer) => data = deep_merge(data, layer),
                Err(e) => {
                    warn!("Could not load file {} for module {}: {}", file, module_id, e);
                    warnings.push(warning(file, CompositionStage::Base, &e));
                }
            }
        }

        if let Some(env_config) = manifest.environment(env) {
            for dir in &env_config.overrides {
                let file = format!("{}/{}.json", dir.trim_end_matches('/'), module_id);
                match self.read_json(&file).await {
                    Ok(layer) => {
                        debug!("Applied {} override for module {}: {}", env, module_id, file);
                        data = deep_merge(data, layer);
                    }
                    Err(ContentError::FileNotFound(_)) => {}
                    Err(e) => {
                        warn!("Could not apply override {} for module {}: {}", file, module_id, e);
                        warnings.push(warning(&file, CompositionStage::Override, &e));
                    }
                }
            }
        }

        if !module.dependencies.is_empty() {
            let mut base = Map::new();
            for dep_id in &module.dependencies {
                let Some(dep) = manifest.module(dep_id) else {
                    debug!("Skipping unknown dependency {} of module {}", dep_id, module_id);
                    continue;
                };
                for file in &dep.files {
                    match self.read_json(file).await {
                        Ok(layer) => shallow_assign(&mut base, layer),
                        Err(e) => {
                            warn!(
                                "Could not load dependency file {} ({}) for module {}: {}",
                                file, dep_id, module_id, e
                            );
                            warnings.push(warning(file, CompositionStage::Dependency, &e));
                        }
                    }
                }
            }
            data = deep_merge(Value::Object(base), data);
        }

        debug!(
            "Composed module {} for {}: files={}, dependencies={}, warnings={}",
            module_id,
            env,
            module.files.len(),
            module.dependencies.len(),
            warnings.len()
        );

        Ok(Composition {
            data,
            dependencies: module.dependencies.clone(),
            warnings,
        })
    }

    async fn read_json(&self, relative: &str) -> Result<Value> {
        let path = self.resolve(relative);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ContentError::FileNotFound(relative.to_string())
            } else {
                ContentError::from(e)
            }
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Join a manifest-relative path onto the content directory
    ///
    /// Root and prefix components are dropped so absolute paths in the
    /// manifest still resolve inside the content directory.
    fn resolve(&self, relative: &str) -> PathBuf {
        let mut path = self.content_dir.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::ParentDir => path.push(".."),
                Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            }
        }
        path
    }
}

fn warning(file: &str, stage: CompositionStage, err: &ContentError) -> CompositionWarning {
    CompositionWarning {
        file: file.to_string(),
        stage,
        message: err.to_string(),
    }
}

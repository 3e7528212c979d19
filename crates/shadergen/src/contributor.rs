//! Lets out-of-tree platforms extend the shader registry without touching the
//! built-in table. A contributor yields `PlatformShader` tuples, or reports
//! that it is unavailable; unavailable contributors are skipped so one broken
//! extension never blocks generation for the other platforms.
//!
//! Types:
//!
//! - `PlatformShader` is the `(shader type, base compiler, platform, asset
//!   platform)` tuple an extension contributes.
//! - `Contribution` is either a lazy sequence of tuples or an explicit
//!   `Unavailable` signal carrying the reason.
//! - `PlatformContributor` is the capability every extension implements.
//! - `StaticContributor` registers a fixed list compiled into the binary.
//! - `ManifestContributor` reads the `gen_shaders.toml` manifest of one
//!   extension directory.
//!
//! Functions:
//!
//! - `discover_manifests` enumerates extension directories under a root.
//! - `ShaderRegistry::apply_contributors` drains every contributor into the
//!   registry.
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::registry::ShaderRegistry;

/// File every extension directory exposes its platforms through.
pub const MANIFEST_FILE: &str = "gen_shaders.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlatformShader {
    pub shader_type: String,
    #[serde(rename = "compiler")]
    pub base_compiler: String,
    #[serde(default)]
    pub platform: String,
    pub asset_platform: String,
}

impl PlatformShader {
    pub fn new(shader_type: &str, base_compiler: &str, platform: &str, asset_platform: &str) -> Self {
        Self {
            shader_type: shader_type.to_string(),
            base_compiler: base_compiler.to_string(),
            platform: platform.to_string(),
            asset_platform: asset_platform.to_string(),
        }
    }
}

pub enum Contribution {
    Available(Box<dyn Iterator<Item = PlatformShader>>),
    Unavailable { reason: String },
}

impl Contribution {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

pub trait PlatformContributor {
    fn name(&self) -> &str;

    fn contribute(&self) -> Contribution;
}

#[derive(Debug, Clone)]
pub struct StaticContributor {
    name: String,
    shaders: Vec<PlatformShader>,
}

impl StaticContributor {
    pub fn new(name: impl Into<String>, shaders: Vec<PlatformShader>) -> Self {
        Self {
            name: name.into(),
            shaders,
        }
    }
}

impl PlatformContributor for StaticContributor {
    fn name(&self) -> &str {
        &self.name
    }

    fn contribute(&self) -> Contribution {
        Contribution::Available(Box::new(self.shaders.clone().into_iter()))
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct PlatformManifest {
    #[serde(default)]
    restricted_platform_shader: Vec<PlatformShader>,
}

#[derive(Debug, Clone)]
pub struct ManifestContributor {
    name: String,
    root: PathBuf,
}

impl ManifestContributor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Self { name, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    fn load(&self) -> Result<Vec<PlatformShader>, ManifestError> {
        let path = self.manifest_path();
        let raw = fs::read_to_string(&path).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        let manifest: PlatformManifest =
            toml::from_str(&raw).map_err(|source| ManifestError::Parse { path, source })?;
        Ok(manifest.restricted_platform_shader)
    }
}

impl PlatformContributor for ManifestContributor {
    fn name(&self) -> &str {
        &self.name
    }

    fn contribute(&self) -> Contribution {
        if !self.manifest_path().is_file() {
            return Contribution::unavailable(format!(
                "no {MANIFEST_FILE} in {}",
                self.root.display()
            ));
        }

        match self.load() {
            Ok(shaders) => Contribution::Available(Box::new(shaders.into_iter())),
            Err(err) => Contribution::unavailable(err.to_string()),
        }
    }
}

/// Lists one `ManifestContributor` per subdirectory of `root`, sorted by name.
/// A missing or unreadable root yields nothing.
pub fn discover_manifests(root: &Path) -> Vec<ManifestContributor> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(root = %root.display(), error = %err, "extension root not readable");
            return Vec::new();
        }
    };

    let mut directories: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    directories.sort();

    debug!(root = %root.display(), count = directories.len(), "discovered extension directories");
    directories
        .into_iter()
        .map(|dir| ManifestContributor::new(dir))
        .collect()
}

impl ShaderRegistry {
    /// Merges every available contribution, in contributor order.
    pub fn apply_contributors(&mut self, contributors: &[Box<dyn PlatformContributor>]) {
        for contributor in contributors {
            match contributor.contribute() {
                Contribution::Available(shaders) => {
                    let mut merged = 0usize;
                    for shader in shaders {
                        self.merge(shader);
                        merged += 1;
                    }
                    debug!(extension = contributor.name(), merged, "applied platform contributor");
                }
                Contribution::Unavailable { reason } => {
                    debug!(extension = contributor.name(), %reason, "skipping platform contributor");
                }
            }
        }
    }
}

/// Boxes manifest contributors so they can be mixed with compiled-in ones.
pub fn boxed<C>(contributors: impl IntoIterator<Item = C>) -> Vec<Box<dyn PlatformContributor>>
where
    C: PlatformContributor + 'static,
{
    contributors
        .into_iter()
        .map(|contributor| Box::new(contributor) as Box<dyn PlatformContributor>)
        .collect()
}

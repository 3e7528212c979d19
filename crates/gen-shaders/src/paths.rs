//! Resolves the directories scanned for restricted platform extensions. The
//! engine tree is always searched first, followed by a per-user directory that
//! can be redirected through `GEN_SHADERS_PLATFORMS_DIR`.
use std::env;
use std::path::{Path, PathBuf};

use directories_next::ProjectDirs;
use shadergen::{boxed, discover_manifests, PlatformContributor};
use tracing::{debug, warn};

pub const ENV_PLATFORMS_DIR: &str = "GEN_SHADERS_PLATFORMS_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "PakShaders";
const APPLICATION: &str = "gen-shaders";

#[derive(Debug, Clone)]
pub struct ExtensionRoots {
    roots: Vec<PathBuf>,
}

impl ExtensionRoots {
    pub fn discover(engine_path: Option<&Path>) -> Self {
        let mut roots = Vec::new();
        if let Some(engine) = engine_path {
            roots.push(engine_extension_dir(engine));
        }
        match user_platforms_dir() {
            Some(dir) => roots.push(dir),
            None => warn!("failed to determine user directories; skipping user platform extensions"),
        }
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn contributors(&self) -> Vec<Box<dyn PlatformContributor>> {
        let mut contributors = Vec::new();
        for root in &self.roots {
            let found = discover_manifests(root);
            debug!(root = %root.display(), extensions = found.len(), "scanned extension root");
            contributors.extend(boxed(found));
        }
        contributors
    }
}

/// Directory of the engine tree that holds one sub-folder per restricted platform.
pub fn engine_extension_dir(engine_path: &Path) -> PathBuf {
    engine_path.join("Tools").join("PakShaders")
}

fn user_platforms_dir() -> Option<PathBuf> {
    if let Some(value) = env_override(ENV_PLATFORMS_DIR) {
        return Some(value);
    }
    ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .map(|dirs| dirs.config_dir().join("platforms"))
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::fs;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::TempDir;

    static PLATFORMS_DIR_LOCK: Mutex<()> = Mutex::new(());

    /// Points `GEN_SHADERS_PLATFORMS_DIR` at `dir` until dropped.
    struct PlatformsDirOverride {
        previous: Option<OsString>,
        _lock: MutexGuard<'static, ()>,
    }

    impl PlatformsDirOverride {
        fn new(dir: &Path) -> Self {
            let lock = PLATFORMS_DIR_LOCK
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let previous = env::var_os(ENV_PLATFORMS_DIR);
            env::set_var(ENV_PLATFORMS_DIR, dir);
            Self {
                previous,
                _lock: lock,
            }
        }
    }

    impl Drop for PlatformsDirOverride {
        fn drop(&mut self) {
            match self.previous.take() {
                Some(value) => env::set_var(ENV_PLATFORMS_DIR, value),
                None => env::remove_var(ENV_PLATFORMS_DIR),
            }
        }
    }

    fn write_extension(root: &Path, name: &str, shader_type: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(shadergen::MANIFEST_FILE),
            format!(
                "[[restricted_platform_shader]]\nshader_type = \"{shader_type}\"\ncompiler = \"BASE\"\nplatform = \"{name}\"\nasset_platform = \"{name}\"\n"
            ),
        )
        .unwrap();
    }

    #[test]
    fn env_override_replaces_user_directory() {
        let root = TempDir::new().unwrap();
        let user_dir = root.path().join("platforms");
        let _override = PlatformsDirOverride::new(&user_dir);

        let roots = ExtensionRoots::discover(Some(Path::new("/engine")));
        assert_eq!(
            roots.roots(),
            [PathBuf::from("/engine/Tools/PakShaders"), user_dir]
        );
    }

    #[test]
    fn engine_extensions_come_before_user_extensions() {
        let root = TempDir::new().unwrap();
        let engine = root.path().join("engine");
        let user_dir = root.path().join("user");
        write_extension(&engine_extension_dir(&engine), "console", "VULKAN");
        write_extension(&user_dir, "handheld", "VULKAN");
        fs::create_dir_all(engine_extension_dir(&engine).join("__pycache__")).unwrap();
        let _override = PlatformsDirOverride::new(&user_dir);

        let contributors = ExtensionRoots::discover(Some(&engine)).contributors();
        let names: Vec<_> = contributors.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["__pycache__", "console", "handheld"]);

        let registry = shadergen::build_registry(&contributors);
        let vulkan = registry.find_shader_type("VULKAN").unwrap();
        let platforms: Vec<_> = vulkan
            .configurations()
            .iter()
            .map(|config| config.platform().to_string())
            .collect();
        assert_eq!(platforms, vec!["console", "handheld"]);
    }
}

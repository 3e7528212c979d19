//! Prepares the asset cache for a resolved request and hands control to the
//! `ShaderCacheGen` executable. Everything here is side effects: directories
//! are created, the shader list is staged, the stale per-type cache is purged
//! and the compiler runs to completion on the calling thread.
//!
//! Types:
//!
//! - `HostPlatform` captures the host-dependent folder names and executable
//!   suffix.
//! - `CacheLayout` computes the `Cache/<game>/<assets>/user` paths the
//!   compiler reads from and writes to.
//! - `CompilerInvocation` is the resolved executable plus its arguments.
//! - `GenerateOutcome` reports what was staged and the compiler's exit status.
//! - `GenerateError` classifies the fatal staging and launch failures.
//!
//! Functions:
//!
//! - `generate` runs the whole sequence for the current host.
//! - `select_shader_list`, `stage_shader_list` and `purge_shader_cache`
//!   implement the individual staging steps.
use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::request::ResolvedRequest;

pub const COMPILER_EXECUTABLE: &str = "ShaderCacheGen";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Unable to create the required cache folder '{}': {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy shader list from {} to {}: {source}", .from.display(), .to.display())]
    CopyShaderList {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ShaderCacheGen could not be found at {}", .0.display())]
    CompilerNotFound(PathBuf),

    #[error("failed to launch {}: {source}", .path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    Other,
}

impl HostPlatform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Other
        }
    }

    /// Output folder of the remote shader compiler for this host.
    pub fn compiler_folder(self) -> &'static str {
        match self {
            Self::Windows => "x64",
            Self::Other => "osx",
        }
    }

    pub fn executable_suffix(self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::Other => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    asset_cache_root: PathBuf,
}

impl CacheLayout {
    pub fn new(game_path: &Path, game_name: &str, asset_platform: &str) -> Self {
        Self {
            asset_cache_root: game_path.join("Cache").join(game_name).join(asset_platform),
        }
    }

    pub fn for_request(request: &ResolvedRequest<'_>) -> Self {
        Self::new(
            &request.game_path,
            &request.game_name,
            request.asset_platform(),
        )
    }

    pub fn asset_cache_root(&self) -> &Path {
        &self.asset_cache_root
    }

    pub fn user_folder(&self) -> PathBuf {
        self.asset_cache_root.join("user")
    }

    fn shaders_folder(&self) -> PathBuf {
        self.user_folder().join("cache").join("shaders")
    }

    /// Where `ShaderCacheGen` expects the list of shaders to build.
    pub fn shader_list(&self) -> PathBuf {
        self.shaders_folder().join("shaderlist.txt")
    }

    pub fn shader_cache_dir(&self, shader_type: &str) -> PathBuf {
        self.shaders_folder()
            .join("cache")
            .join(shader_type.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInvocation {
    program: PathBuf,
    arguments: Vec<String>,
}

impl CompilerInvocation {
    pub fn new(program: PathBuf, shader_type: &str, asset_platform: &str) -> Self {
        Self {
            program,
            arguments: vec![
                "/BuildGlobalCache".to_string(),
                format!("/ShadersPlatform={shader_type}"),
                format!("/TargetPlatform={asset_platform}"),
            ],
        }
    }

    /// Resolves `engine/bin_folder/ShaderCacheGen`, failing when no such file exists.
    pub fn locate(request: &ResolvedRequest<'_>, host: HostPlatform) -> Result<Self, GenerateError> {
        let program = compiler_path(&request.engine_path, &request.bin_folder, host);
        if !program.is_file() {
            return Err(GenerateError::CompilerNotFound(program));
        }
        Ok(Self::new(
            program,
            request.shader_type_name(),
            request.asset_platform(),
        ))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.arguments.iter().cloned());
        parts.join(" ")
    }

    /// Runs the compiler with inherited stdio and waits for it to exit.
    pub fn run(&self) -> Result<ExitStatus, GenerateError> {
        Command::new(&self.program)
            .args(&self.arguments)
            .status()
            .map_err(|source| GenerateError::Launch {
                path: self.program.clone(),
                source,
            })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GenerateOutcome {
    pub status: ExitStatus,
    pub copied_shader_list: bool,
    pub purged_cache: bool,
}

impl GenerateOutcome {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

pub fn compiler_path(engine_path: &Path, bin_folder: &Path, host: HostPlatform) -> PathBuf {
    let file_name = format!("{COMPILER_EXECUTABLE}{}", host.executable_suffix());
    engine_path.join(bin_folder).join(file_name)
}

/// Shader list written by the remote shader compiler for this configuration.
pub fn default_shader_list(
    engine_path: &Path,
    game_name: &str,
    compiler: &str,
    shader_type: &str,
    host: HostPlatform,
) -> PathBuf {
    engine_path
        .join("Tools")
        .join("CrySCompileServer")
        .join(host.compiler_folder())
        .join("profile")
        .join("Cache")
        .join(game_name)
        .join(compiler)
        .join(format!("ShaderList_{shader_type}.txt"))
}

/// Picks the shader list to stage. Falls back to the cache copy itself when
/// no override is given and the compiler server never produced a list.
pub fn select_shader_list(
    request: &ResolvedRequest<'_>,
    layout: &CacheLayout,
    host: HostPlatform,
) -> PathBuf {
    if let Some(override_path) = &request.shader_list {
        let source = request.game_path.join(override_path);
        info!("Using shader list {}", source.display());
        return source;
    }

    let candidate = default_shader_list(
        &request.engine_path,
        &request.game_name,
        request.configuration.compiler(),
        request.shader_type_name(),
        host,
    );
    let source = if candidate.is_file() {
        candidate
    } else {
        debug!(missing = %candidate.display(), "no compiler server shader list");
        layout.shader_list()
    };
    info!(
        "Source Shader List not specified, using {} by default",
        source.display()
    );
    source
}

/// Copies `source` over `destination` unless both resolve to the same file.
/// Returns whether a copy happened.
pub fn stage_shader_list(source: &Path, destination: &Path) -> Result<bool, GenerateError> {
    if comparable_path(source) == comparable_path(destination)
        || same_existing_file(source, destination)
    {
        debug!(path = %destination.display(), "shader list already in place");
        return Ok(false);
    }

    if let Some(parent) = destination.parent() {
        ensure_directory(parent)?;
    }

    info!(
        "Copying shader_list from {} to {}",
        source.display(),
        destination.display()
    );
    fs::copy(source, destination).map_err(|err| GenerateError::CopyShaderList {
        from: source.to_path_buf(),
        to: destination.to_path_buf(),
        source: err,
    })?;
    Ok(true)
}

/// Removes the stale cache of one shader type. Returns whether anything was removed.
pub fn purge_shader_cache(dir: &Path) -> bool {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!(path = %dir.display(), "purged stale shader cache");
            true
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => false,
        Err(err) => {
            warn!(path = %dir.display(), error = %err, "failed to purge stale shader cache");
            false
        }
    }
}

pub fn generate(request: &ResolvedRequest<'_>) -> Result<GenerateOutcome, GenerateError> {
    generate_on(request, HostPlatform::current())
}

pub fn generate_on(
    request: &ResolvedRequest<'_>,
    host: HostPlatform,
) -> Result<GenerateOutcome, GenerateError> {
    let layout = CacheLayout::for_request(request);
    ensure_directory(&layout.user_folder())?;

    let destination = layout.shader_list();
    let source = select_shader_list(request, &layout, host);
    let copied_shader_list = stage_shader_list(&source, &destination)?;

    let purged_cache = purge_shader_cache(&layout.shader_cache_dir(request.shader_type_name()));

    let invocation = CompilerInvocation::locate(request, host)?;
    if request.verbose {
        info!("Running: {}", invocation.command_line());
    } else {
        debug!(command = %invocation.command_line(), "running shader compiler");
    }
    let status = invocation.run()?;
    if !status.success() {
        warn!(%status, "ShaderCacheGen exited with a failure status");
    }

    Ok(GenerateOutcome {
        status,
        copied_shader_list,
        purged_cache,
    })
}

fn ensure_directory(path: &Path) -> Result<(), GenerateError> {
    if path.is_dir() {
        debug!(path = %path.display(), "reusing existing directory");
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|source| GenerateError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "created cache directory");
    Ok(())
}

/// Absolute, symlink-resolved form of `path` used to decide whether two paths
/// name the same file. Symlinks are resolved before `..` is applied, so only
/// the part of the path that does not exist yet is normalised lexically.
fn comparable_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    fold_case(resolve_existing_prefix(&absolute))
}

fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let components: Vec<Component<'_>> = path.components().collect();
    for split in (1..=components.len()).rev() {
        let prefix: PathBuf = components[..split].iter().collect();
        if let Ok(resolved) = fs::canonicalize(&prefix) {
            return append_lexically(resolved, &components[split..]);
        }
    }
    append_lexically(PathBuf::new(), &components)
}

fn append_lexically(mut base: PathBuf, tail: &[Component<'_>]) -> PathBuf {
    for component in tail {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                base.pop();
            }
            other => base.push(other.as_os_str()),
        }
    }
    base
}

fn same_existing_file(left: &Path, right: &Path) -> bool {
    match (fs::canonicalize(left), fs::canonicalize(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

fn fold_case(path: PathBuf) -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(path.to_string_lossy().to_lowercase())
    } else {
        path
    }
}

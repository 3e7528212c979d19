mod contributor;
mod generate;
mod registry;
mod request;

pub use contributor::{
    boxed, discover_manifests, Contribution, ManifestContributor, ManifestError,
    PlatformContributor, PlatformShader, StaticContributor, MANIFEST_FILE,
};
pub use generate::{
    compiler_path, default_shader_list, generate, generate_on, purge_shader_cache,
    select_shader_list, stage_shader_list, CacheLayout, CompilerInvocation, GenerateError,
    GenerateOutcome, HostPlatform, COMPILER_EXECUTABLE,
};
pub use registry::{find_configuration, Configuration, ShaderRegistry, ShaderType};
pub use request::{RequestError, ResolvedRequest, ShaderRequest};

/// Builds the registry the generator resolves requests against: the built-in
/// shader types followed by every available contribution.
pub fn build_registry(contributors: &[Box<dyn PlatformContributor>]) -> ShaderRegistry {
    let mut registry = ShaderRegistry::builtin();
    registry.apply_contributors(contributors);
    registry
}

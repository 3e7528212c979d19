//! Owns the table of shader types the generator knows about and the lookup
//! rules that map a `(platform, asset platform)` pair onto one of their
//! configurations. `request` resolves user input through it, and `contributor`
//! merges restricted platforms into it before any lookup happens.
//!
//! Types:
//!
//! - `Configuration` is one valid platform/asset-platform pairing with the
//!   compiler identifier derived from its owning shader type.
//! - `ShaderType` names a compiler backend family and keeps its configurations
//!   in registration order.
//! - `ShaderRegistry` stores every `ShaderType` and enforces name uniqueness
//!   when contributions are merged.
//!
//! Functions:
//!
//! - `ShaderRegistry::builtin` seeds the non-restricted shader types.
//! - `ShaderRegistry::find_shader_type` and the free `find_configuration`
//!   implement the first-match lookups used during validation.
//! - `ShaderRegistry::merge` appends a contributed configuration, creating the
//!   shader type on first sight.
use std::fmt;

use tracing::debug;

use crate::contributor::PlatformShader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    platform: String,
    asset_platform: String,
    compiler: String,
}

impl Configuration {
    fn new(platform: &str, asset_platform: &str, core_compiler: &str) -> Self {
        Self {
            platform: platform.to_string(),
            asset_platform: asset_platform.to_string(),
            compiler: format!("{platform}-{core_compiler}"),
        }
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn asset_platform(&self) -> &str {
        &self.asset_platform
    }

    /// Compiler identifier, used to locate the shader list produced by the
    /// remote shader compiler.
    pub fn compiler(&self) -> &str {
        &self.compiler
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.platform, self.asset_platform)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderType {
    name: String,
    core_compiler: String,
    configurations: Vec<Configuration>,
}

impl ShaderType {
    pub fn new(name: &str, base_compiler: &str) -> Self {
        Self {
            name: name.to_string(),
            core_compiler: format!("{base_compiler}-{name}"),
            configurations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn core_compiler(&self) -> &str {
        &self.core_compiler
    }

    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    pub fn add_configuration(&mut self, platform: &str, asset_platform: &str) {
        self.configurations
            .push(Configuration::new(platform, asset_platform, &self.core_compiler));
    }

    pub fn find_configuration(&self, platform: &str, asset_platform: &str) -> Option<&Configuration> {
        find_configuration(platform, asset_platform, &self.configurations)
    }
}

/// Returns the first configuration matching `asset_platform` and, when it is
/// not empty, `platform`.
pub fn find_configuration<'a>(
    platform: &str,
    asset_platform: &str,
    configurations: &'a [Configuration],
) -> Option<&'a Configuration> {
    configurations.iter().find(|config| {
        if platform.is_empty() {
            config.asset_platform == asset_platform
        } else {
            config.platform == platform && config.asset_platform == asset_platform
        }
    })
}

#[derive(Debug, Clone, Default)]
pub struct ShaderRegistry {
    shader_types: Vec<ShaderType>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shader types for the non-restricted platforms.
    pub fn builtin() -> Self {
        let mut d3d11 = ShaderType::new("D3D11", "D3D11_FXC");
        d3d11.add_configuration("PC", "pc");

        let mut gl4 = ShaderType::new("GL4", "GLSL_HLSLcc");
        gl4.add_configuration("PC", "pc");

        let mut gles3 = ShaderType::new("GLES3", "GLSL_HLSLcc");
        gles3.add_configuration("Android", "es3");

        let mut metal = ShaderType::new("METAL", "METAL_LLVM_DXC");
        metal.add_configuration("Mac", "osx_gl");
        metal.add_configuration("iOS", "ios");

        Self {
            shader_types: vec![d3d11, gl4, gles3, metal],
        }
    }

    pub fn find_shader_type(&self, name: &str) -> Option<&ShaderType> {
        self.shader_types.iter().find(|shader| shader.name == name)
    }

    pub fn shader_type_names(&self) -> Vec<String> {
        self.shader_types
            .iter()
            .map(|shader| shader.name.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShaderType> {
        self.shader_types.iter()
    }

    pub fn len(&self) -> usize {
        self.shader_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shader_types.is_empty()
    }

    /// Adds one contributed configuration. The base compiler of an existing
    /// shader type is never replaced.
    pub fn merge(&mut self, shader: PlatformShader) {
        let index = match self
            .shader_types
            .iter()
            .position(|existing| existing.name == shader.shader_type)
        {
            Some(index) => index,
            None => {
                debug!(
                    shader_type = %shader.shader_type,
                    compiler = %shader.base_compiler,
                    "registering contributed shader type"
                );
                self.shader_types
                    .push(ShaderType::new(&shader.shader_type, &shader.base_compiler));
                self.shader_types.len() - 1
            }
        };

        let target = &mut self.shader_types[index];
        target.add_configuration(&shader.platform, &shader.asset_platform);
        debug!(
            shader_type = %target.name,
            platform = %shader.platform,
            asset_platform = %shader.asset_platform,
            "added shader configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shader(name: &str, base: &str, platform: &str, assets: &str) -> PlatformShader {
        PlatformShader::new(name, base, platform, assets)
    }

    #[test]
    fn finds_every_builtin_shader_type() {
        let registry = ShaderRegistry::builtin();
        for name in ["D3D11", "GL4", "GLES3", "METAL"] {
            let found = registry.find_shader_type(name).expect("builtin shader type");
            assert_eq!(found.name(), name);
        }
        assert_eq!(
            registry.shader_type_names(),
            vec!["D3D11", "GL4", "GLES3", "METAL"]
        );
    }

    #[test]
    fn shader_type_lookup_is_case_sensitive() {
        let registry = ShaderRegistry::builtin();
        assert!(registry.find_shader_type("d3d11").is_none());
        assert!(registry.find_shader_type("Vulkan").is_none());
        assert!(registry.find_shader_type("").is_none());
    }

    #[test]
    fn builtin_compilers_are_derived() {
        let registry = ShaderRegistry::builtin();
        let metal = registry.find_shader_type("METAL").unwrap();
        assert_eq!(metal.core_compiler(), "METAL_LLVM_DXC-METAL");
        let compilers: Vec<_> = metal
            .configurations()
            .iter()
            .map(Configuration::compiler)
            .collect();
        assert_eq!(
            compilers,
            vec!["Mac-METAL_LLVM_DXC-METAL", "iOS-METAL_LLVM_DXC-METAL"]
        );

        let gles3 = registry.find_shader_type("GLES3").unwrap();
        assert_eq!(
            gles3.configurations()[0].compiler(),
            "Android-GLSL_HLSLcc-GLES3"
        );
    }

    #[test]
    fn empty_platform_matches_on_asset_platform_alone() {
        let registry = ShaderRegistry::builtin();
        let metal = registry.find_shader_type("METAL").unwrap();
        for config in metal.configurations() {
            let by_assets = metal.find_configuration("", config.asset_platform());
            let by_both = metal.find_configuration(config.platform(), config.asset_platform());
            assert_eq!(by_assets, by_both);
            assert_eq!(by_assets, Some(config));
        }
    }

    #[test]
    fn platform_must_match_when_given() {
        let registry = ShaderRegistry::builtin();
        let metal = registry.find_shader_type("METAL").unwrap();
        assert!(metal.find_configuration("Mac", "ios").is_none());
        assert!(metal.find_configuration("mac", "osx_gl").is_none());
        assert!(metal.find_configuration("", "bogus").is_none());
    }

    #[test]
    fn duplicate_asset_platform_resolves_to_first_registered() {
        let mut shader_type = ShaderType::new("VK", "SPIRV");
        shader_type.add_configuration("Linux", "pc");
        shader_type.add_configuration("Windows", "pc");

        let found = shader_type.find_configuration("", "pc").unwrap();
        assert_eq!(found.platform(), "Linux");

        let explicit = shader_type.find_configuration("Windows", "pc").unwrap();
        assert_eq!(explicit.platform(), "Windows");
    }

    #[test]
    fn merge_extends_existing_shader_type() {
        let mut registry = ShaderRegistry::builtin();
        let before = registry.len();
        registry.merge(shader("METAL", "OTHER_BASE", "tvOS", "appletv"));

        assert_eq!(registry.len(), before);
        let metal = registry.find_shader_type("METAL").unwrap();
        assert_eq!(metal.configurations().len(), 3);
        let added = metal.configurations().last().unwrap();
        assert_eq!(added.compiler(), "tvOS-METAL_LLVM_DXC-METAL");
        assert_eq!(metal.core_compiler(), "METAL_LLVM_DXC-METAL");
    }

    #[test]
    fn merge_creates_new_shader_type_once() {
        let mut registry = ShaderRegistry::builtin();
        registry.merge(shader("VULKAN", "SPIRV_DXC", "Console", "console"));
        registry.merge(shader("VULKAN", "IGNORED", "Handheld", "handheld"));

        assert_eq!(registry.len(), 5);
        assert_eq!(registry.shader_type_names().last().unwrap(), "VULKAN");
        let vulkan = registry.find_shader_type("VULKAN").unwrap();
        assert_eq!(vulkan.core_compiler(), "SPIRV_DXC-VULKAN");
        let compilers: Vec<_> = vulkan
            .configurations()
            .iter()
            .map(|config| config.compiler().to_string())
            .collect();
        assert_eq!(
            compilers,
            vec!["Console-SPIRV_DXC-VULKAN", "Handheld-SPIRV_DXC-VULKAN"]
        );
    }

    #[test]
    fn configuration_display_pairs_platform_and_assets() {
        let registry = ShaderRegistry::builtin();
        let gles3 = registry.find_shader_type("GLES3").unwrap();
        assert_eq!(gles3.configurations()[0].to_string(), "Android (es3)");
    }
}

//! Turns a user request into a configuration the generator can act on, or a
//! diagnostic listing the valid choices. Validation never touches the
//! filesystem, so a rejected request leaves the cache untouched.
use std::path::PathBuf;

use thiserror::Error;

use crate::registry::{Configuration, ShaderRegistry, ShaderType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Invalid shader type {requested}. Must be one of [{}]", .known.join(" "))]
    UnknownShaderType {
        requested: String,
        known: Vec<String>,
    },

    #[error(
        "Invalid configuration for shader type \"{shader_type}\". It must be one of the following: {}",
        .available.join(", ")
    )]
    UnknownConfiguration {
        shader_type: String,
        available: Vec<String>,
    },
}

/// Everything needed to generate one shader cache.
#[derive(Debug, Clone, Default)]
pub struct ShaderRequest {
    pub game_name: String,
    pub asset_platform: String,
    pub shader_type: String,
    /// Target platform; empty lets the asset platform alone pick the configuration.
    pub platform: String,
    pub shader_list: Option<PathBuf>,
    pub bin_folder: PathBuf,
    pub game_path: Option<PathBuf>,
    pub engine_path: PathBuf,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct ResolvedRequest<'a> {
    pub shader_type: &'a ShaderType,
    pub configuration: &'a Configuration,
    /// Platform as given by the user, possibly empty.
    pub requested_platform: String,
    pub game_name: String,
    pub game_path: PathBuf,
    pub engine_path: PathBuf,
    pub bin_folder: PathBuf,
    pub shader_list: Option<PathBuf>,
    pub verbose: bool,
}

impl ShaderRequest {
    pub fn resolve(self, registry: &ShaderRegistry) -> Result<ResolvedRequest<'_>, RequestError> {
        let shader_type = registry.find_shader_type(&self.shader_type).ok_or_else(|| {
            RequestError::UnknownShaderType {
                requested: self.shader_type.clone(),
                known: registry.shader_type_names(),
            }
        })?;

        let configuration = shader_type
            .find_configuration(&self.platform, &self.asset_platform)
            .ok_or_else(|| RequestError::UnknownConfiguration {
                shader_type: shader_type.name().to_string(),
                available: shader_type
                    .configurations()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            })?;

        // Non-external projects keep the game inside the engine tree.
        let game_path = self.game_path.unwrap_or_else(|| self.engine_path.clone());

        Ok(ResolvedRequest {
            shader_type,
            configuration,
            requested_platform: self.platform,
            game_name: self.game_name,
            game_path,
            engine_path: self.engine_path,
            bin_folder: self.bin_folder,
            shader_list: self.shader_list,
            verbose: self.verbose,
        })
    }
}

impl ResolvedRequest<'_> {
    pub fn shader_type_name(&self) -> &str {
        self.shader_type.name()
    }

    pub fn asset_platform(&self) -> &str {
        self.configuration.asset_platform()
    }
}

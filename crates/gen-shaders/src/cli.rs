use std::fmt::Display;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use shadergen::ShaderRequest;

#[derive(Parser, Debug)]
#[command(
    name = "gen-shaders",
    author,
    version,
    about = "Generates the shaders for a specific platform and shader type."
)]
pub struct Cli {
    /// Name of the game.
    #[arg(value_name = "GAME_NAME", required_unless_present = "list")]
    pub game_name: Option<String>,

    /// The asset cache sub folder to use for shader generation.
    #[arg(value_name = "ASSET_PLATFORM", required_unless_present = "list")]
    pub asset_platform: Option<String>,

    /// The shader type to use.
    #[arg(value_name = "SHADER_TYPE", required_unless_present = "list")]
    pub shader_type: Option<String>,

    /// The target platform to generate shaders for.
    #[arg(short = 'p', long, alias = "shader_platform", value_name = "PLATFORM")]
    pub shader_platform: Option<String>,

    /// Folder where the ShaderCacheGen executable lives, relative to the engine path.
    #[arg(
        short = 'b',
        long,
        alias = "bin_folder",
        value_name = "DIR",
        env = "GEN_SHADERS_BIN_FOLDER",
        required_unless_present = "list"
    )]
    pub bin_folder: Option<PathBuf>,

    /// Path to the engine root folder.
    #[arg(
        short = 'e',
        long,
        alias = "engine_path",
        value_name = "PATH",
        env = "GEN_SHADERS_ENGINE_PATH",
        required_unless_present = "list"
    )]
    pub engine_path: Option<PathBuf>,

    /// Path to the game root folder; defaults to the engine path for non external projects.
    #[arg(short = 'g', long, alias = "game_path", value_name = "PATH")]
    pub game_path: Option<PathBuf>,

    /// Optional shader list, relative to the game path. Defaults to the list
    /// generated by the remote shader compiler.
    #[arg(short = 's', long, alias = "shader_list", value_name = "PATH")]
    pub shader_list: Option<PathBuf>,

    /// Increase the logging output.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Print every known shader type and configuration, then exit.
    #[arg(long)]
    pub list: bool,
}

impl Cli {
    pub fn into_request(self) -> Result<ShaderRequest> {
        Ok(ShaderRequest {
            game_name: required(self.game_name, "GAME_NAME")?,
            asset_platform: required(self.asset_platform, "ASSET_PLATFORM")?,
            shader_type: required(self.shader_type, "SHADER_TYPE")?,
            platform: self.shader_platform.unwrap_or_default(),
            shader_list: self.shader_list,
            bin_folder: required(self.bin_folder, "--bin-folder")?,
            game_path: self.game_path,
            engine_path: required(self.engine_path, "--engine-path")?,
            verbose: self.verbose,
        })
    }
}

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| anyhow!("missing required argument {name}"))
}

pub fn parse() -> Cli {
    Cli::parse()
}

/// Reports an invalid request the same way clap reports bad arguments, then exits.
pub fn exit_with_usage_error(message: impl Display) -> ! {
    Cli::command().error(ErrorKind::InvalidValue, message).exit()
}

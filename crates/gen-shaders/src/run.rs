//! Drives one invocation: builds the registry from the built-in shader types
//! and discovered extensions, validates the request, stages the cache and
//! maps the compiler's exit status onto the process exit code.
use std::process::{ExitCode, ExitStatus};

use anyhow::{Context, Result};
use shadergen::{build_registry, generate, ResolvedRequest, ShaderRegistry};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{self, Cli};
use crate::paths::ExtensionRoots;

pub fn run(args: Cli) -> Result<ExitCode> {
    let roots = ExtensionRoots::discover(args.engine_path.as_deref());
    debug!(roots = ?roots.roots(), "resolved extension roots");
    let registry = build_registry(&roots.contributors());

    if args.list {
        print!("{}", describe_registry(&registry));
        return Ok(ExitCode::SUCCESS);
    }

    let request = args.into_request()?;
    let resolved = match request.resolve(&registry) {
        Ok(resolved) => resolved,
        Err(err) => cli::exit_with_usage_error(err),
    };

    info!("{}", banner(&resolved));
    let outcome = generate(&resolved).context("shader generation failed")?;
    info!("Finish generating shaders");

    Ok(ExitCode::from(exit_code(outcome.status)))
}

pub fn initialise_tracing(verbose: bool) {
    let default_filter = if verbose {
        "warn,gen_shaders=debug,shadergen=debug"
    } else {
        "warn,gen_shaders=info,shadergen=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn banner(resolved: &ResolvedRequest<'_>) -> String {
    format!(
        "Generating shaders for {} (shaders={}, platform={}, assets={})",
        resolved.game_name,
        resolved.shader_type_name(),
        resolved.requested_platform,
        resolved.asset_platform()
    )
}

fn describe_registry(registry: &ShaderRegistry) -> String {
    let mut out = String::from("Shader types:\n");
    for shader_type in registry.iter() {
        out.push_str(&format!(
            "  {:<8} compiler={}\n",
            shader_type.name(),
            shader_type.core_compiler()
        ));
        for config in shader_type.configurations() {
            out.push_str(&format!(
                "    {:<24} {}\n",
                config.to_string(),
                config.compiler()
            ));
        }
    }
    out
}

/// A signal-terminated compiler, or a code outside the portable range, maps to 1.
fn exit_code(status: ExitStatus) -> u8 {
    if status.success() {
        return 0;
    }
    status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_builtin_registry() {
        let text = describe_registry(&ShaderRegistry::builtin());
        assert!(text.starts_with("Shader types:\n"));
        assert!(text.contains("  D3D11    compiler=D3D11_FXC-D3D11\n"));
        assert!(text.contains("Mac (osx_gl)"));
        assert!(text.contains("iOS-METAL_LLVM_DXC-METAL"));
        assert_eq!(text.lines().count(), 1 + 4 + 5);
    }

    #[test]
    fn banner_shows_requested_platform() {
        use shadergen::ShaderRequest;
        use std::path::PathBuf;

        let registry = ShaderRegistry::builtin();
        let mut request = ShaderRequest {
            game_name: "SamplesProject".into(),
            asset_platform: "pc".into(),
            shader_type: "D3D11".into(),
            bin_folder: PathBuf::from("Bin64vc141"),
            engine_path: PathBuf::from("/engine"),
            ..ShaderRequest::default()
        };
        assert_eq!(
            banner(&request.clone().resolve(&registry).unwrap()),
            "Generating shaders for SamplesProject (shaders=D3D11, platform=, assets=pc)"
        );

        request.platform = "PC".into();
        assert!(banner(&request.resolve(&registry).unwrap()).contains("platform=PC,"));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_propagated() {
        use std::os::unix::process::ExitStatusExt;

        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(7 << 8)), 7);
        // Killed by SIGKILL.
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 1);
    }
}

//! CLI commands and argument parsing.

pub mod mirror;
pub mod resolve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use regmirror_core::{ImageReference, RegistryMap, DEFAULT_LOCAL_REGISTRY};

/// Regmirror - mirror container images into a local registry
#[derive(Parser)]
#[command(name = "regmirror")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Pull, tag and push images into the local registry
    Mirror(mirror::MirrorArgs),

    /// Print the pull and push references for images without mirroring
    Resolve(resolve::ResolveArgs),

    /// Print version information
    Version,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document on stdout
    Json,
}

/// Registry settings shared by commands that resolve references.
#[derive(Args, Debug, Clone)]
pub struct RegistryArgs {
    /// Local registry address (host:port) images are pushed to
    #[arg(long, env = "LOCAL_REGISTRY", default_value = DEFAULT_LOCAL_REGISTRY)]
    pub local_registry: String,

    /// Registry map as a JSON object, e.g. '{"docker.io": "mirror.example:5000"}'
    #[arg(long, env = "REGISTRIES")]
    pub registries: Option<String>,

    /// File containing the registry map as a JSON object (takes precedence over --registries)
    #[arg(long)]
    pub registries_file: Option<PathBuf>,
}

impl RegistryArgs {
    /// Loads the registry map, falling back to the built-in defaults.
    pub fn load_registry_map(&self) -> Result<RegistryMap> {
        if let Some(path) = &self.registries_file {
            let document = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read registry map {}", path.display()))?;
            return RegistryMap::from_json(&document)
                .with_context(|| format!("Invalid registry map in {}", path.display()));
        }

        match &self.registries {
            Some(document) => {
                RegistryMap::from_json(document).context("Invalid registry map in --registries")
            }
            None => Ok(RegistryMap::defaults()),
        }
    }
}

/// Parses image arguments, skipping empty comma-separated segments.
pub fn parse_images(raw: &[String]) -> Result<Vec<ImageReference>> {
    raw.iter()
        .map(String::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| ImageReference::parse(s).with_context(|| format!("Invalid image '{s}'")))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::CommandFactory;
    use tempfile::NamedTempFile;

    use super::*;

    fn registry_args(registries: Option<&str>, file: Option<PathBuf>) -> RegistryArgs {
        RegistryArgs {
            local_registry: DEFAULT_LOCAL_REGISTRY.to_string(),
            registries: registries.map(String::from),
            registries_file: file,
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_images_skips_empty_segments() {
        let raw = vec![
            "docker.io/a:1".to_string(),
            String::new(),
            " quay.io/b:2 ".to_string(),
        ];
        let images = parse_images(&raw).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[1].as_str(), "quay.io/b:2");
    }

    #[test]
    fn test_parse_images_rejects_bare_names() {
        let err = parse_images(&["nginx".to_string()]).unwrap_err();
        assert!(err.to_string().contains("nginx"));
    }

    #[test]
    fn test_registry_map_defaults_when_absent() {
        let map = registry_args(None, None).load_registry_map().unwrap();
        assert_eq!(map, RegistryMap::defaults());
    }

    #[test]
    fn test_registry_map_from_flag() {
        let map = registry_args(Some(r#"{"docker.io": "mirror.example"}"#), None)
            .load_registry_map()
            .unwrap();
        assert_eq!(map.get("docker.io"), Some("mirror.example"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_registry_map_file_takes_precedence() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"quay.io": "quay-mirror.example"}}"#).unwrap();

        let map = registry_args(
            Some(r#"{"docker.io": "mirror.example"}"#),
            Some(file.path().to_path_buf()),
        )
        .load_registry_map()
        .unwrap();
        assert_eq!(map.get("quay.io"), Some("quay-mirror.example"));
        assert_eq!(map.get("docker.io"), None);
    }

    #[test]
    fn test_registry_map_invalid_json() {
        let err = registry_args(Some("[1, 2]"), None)
            .load_registry_map()
            .unwrap_err();
        assert!(err.to_string().contains("--registries"));
    }

    #[test]
    fn test_registry_map_missing_file() {
        let result =
            registry_args(None, Some(PathBuf::from("/nonexistent/registries.json"))).load_registry_map();
        assert!(result.is_err());
    }
}

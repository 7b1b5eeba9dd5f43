//! Resolve command: show what would be pulled and pushed, without any I/O.

use anyhow::Result;
use clap::Args;
use regmirror_core::{ReferenceResolver, ResolvedReference};

use super::{parse_images, OutputFormat, RegistryArgs};

/// Arguments for the resolve command.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Images to resolve (comma-separated)
    #[arg(value_delimiter = ',')]
    pub images: Vec<String>,

    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// Run the resolve command.
pub fn run(args: &ResolveArgs) -> Result<()> {
    let resolved = resolve_all(args)?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolved)?),
        OutputFormat::Text => {
            for r in &resolved {
                println!("{}", r.image);
                println!("   pull: {}", r.pull);
                println!("   push: {}", r.push);
            }
        }
    }
    Ok(())
}

fn resolve_all(args: &ResolveArgs) -> Result<Vec<ResolvedReference>> {
    let images = parse_images(&args.images)?;
    let resolver = ReferenceResolver::new(
        args.registry.load_registry_map()?,
        args.registry.local_registry.clone(),
    );
    tracing::debug!(
        local_registry = %resolver.local_registry(),
        redirects = resolver.redirects(),
        "resolving images"
    );
    Ok(images.iter().map(|image| resolver.resolve(image)).collect())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn args(images: &[&str], registries: Option<&str>) -> ResolveArgs {
        ResolveArgs {
            images: images.iter().map(ToString::to_string).collect(),
            registry: RegistryArgs {
                local_registry: "registry.local:9001".to_string(),
                registries: registries.map(String::from),
                registries_file: None::<PathBuf>,
            },
            output: OutputFormat::Text,
        }
    }

    #[test]
    fn test_resolve_with_defaults() {
        let resolved = resolve_all(&args(&["myreg.io:5000/ns/app:v1"], None)).unwrap();
        assert_eq!(resolved[0].pull, "myreg.io:5000/ns/app:v1");
        assert_eq!(resolved[0].push, "registry.local:9001/myreg.io/ns/app:v1");
    }

    #[test]
    fn test_resolve_with_mirror() {
        let resolved = resolve_all(&args(
            &["docker.io/foo:1", "mirror.example/foo:1"],
            Some(r#"{"docker.io": "mirror.example"}"#),
        ))
        .unwrap();
        assert_eq!(resolved[0].pull, "mirror.example/foo:1");
        assert_eq!(resolved[1].pull, "mirror.example/foo:1");
        assert_eq!(resolved[0].push, "registry.local:9001/docker.io/foo:1");
    }

    #[test]
    fn test_resolve_rejects_invalid_image() {
        assert!(resolve_all(&args(&["nginx"], None)).is_err());
    }

    #[test]
    fn test_run_json_output() {
        let mut a = args(&["docker.io/foo:1"], None);
        a.output = OutputFormat::Json;
        assert!(run(&a).is_ok());
    }
}

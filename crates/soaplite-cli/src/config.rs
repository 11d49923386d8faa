use crate::cli::ComputeArgs;
use crate::error::{CliError, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use soaplite::core::models::element::{parse_species, symbol_of};
use soaplite::engine::config::{SoapConfig, SoapConfigBuilder};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the native module directory.
pub const LIBRARY_DIR_ENV: &str = "SOAPLITE_LIB_DIR";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum PartialSpecies {
    Number(u32),
    Symbol(String),
}

impl PartialSpecies {
    fn resolve(&self) -> Result<u32> {
        match self {
            PartialSpecies::Number(z) if symbol_of(*z).is_some() => Ok(*z),
            PartialSpecies::Number(z) => Err(CliError::Config(format!(
                "Atomic number {} in `descriptor.species` is out of range",
                z
            ))),
            PartialSpecies::Symbol(token) => parse_species(token).ok_or_else(|| {
                CliError::Config(format!("Unknown species '{}' in `descriptor.species`", token))
            }),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialDescriptorConfig {
    cutoff: Option<f64>,
    n_max: Option<usize>,
    l_max: Option<usize>,
    cross_species: Option<bool>,
    species: Option<Vec<PartialSpecies>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialBasisConfig {
    path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialNativeConfig {
    library_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialSoapConfig {
    descriptor: Option<PartialDescriptorConfig>,
    basis: Option<PartialBasisConfig>,
    native: Option<PartialNativeConfig>,
    /// Directory relative paths in the file are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// Everything the `compute` command needs after merging file, CLI and environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeSettings {
    pub soap: SoapConfig,
    pub basis_path: PathBuf,
    pub library_dir: PathBuf,
}

impl PartialSoapConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    fn resolve_file_path(&self, path: PathBuf) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }

    pub fn merge_with_cli(
        mut self,
        args: &ComputeArgs,
        env_library_dir: Option<OsString>,
    ) -> Result<ComputeSettings> {
        let descriptor = self.descriptor.take().unwrap_or_default();
        let basis = self.basis.take().unwrap_or_default();
        let native = self.native.take().unwrap_or_default();

        let mut builder = SoapConfigBuilder::new();
        if let Some(cutoff) = args.cutoff.or(descriptor.cutoff) {
            builder = builder.cutoff(cutoff);
        }
        if let Some(n_max) = args.n_max.or(descriptor.n_max) {
            builder = builder.n_max(n_max);
        }
        if let Some(l_max) = args.l_max.or(descriptor.l_max) {
            builder = builder.l_max(l_max);
        }
        if args.no_cross_species {
            builder = builder.cross_species(false);
        } else if let Some(cross) = descriptor.cross_species {
            builder = builder.cross_species(cross);
        }

        let species = if args.species.is_empty() {
            descriptor
                .species
                .unwrap_or_default()
                .iter()
                .map(PartialSpecies::resolve)
                .collect::<Result<Vec<_>>>()?
        } else {
            parse_species_list(&args.species)?
        };
        builder = builder.species(species);

        let soap = builder.build().map_err(|e| CliError::Config(e.to_string()))?;

        let basis_path = match (&args.basis, basis.path) {
            (Some(path), _) => path.clone(),
            (None, Some(path)) => self.resolve_file_path(path),
            (None, None) => {
                return Err(CliError::Config(
                    "A radial basis file is required either via `--basis` or `[basis] path`."
                        .to_string(),
                ));
            }
        };

        let file_library_dir = native.library_dir.map(|p| self.resolve_file_path(p));
        let library_dir = resolve_library_dir(
            args.library_dir.clone(),
            file_library_dir,
            env_library_dir,
        )?;

        debug!(
            "Resolved settings: {:?}, basis {:?}, library dir {:?}",
            soap, basis_path, library_dir
        );
        Ok(ComputeSettings {
            soap,
            basis_path,
            library_dir,
        })
    }
}

/// Parses species tokens given as element symbols or atomic numbers.
pub fn parse_species_list(tokens: &[String]) -> Result<Vec<u32>> {
    tokens
        .iter()
        .map(|token| {
            parse_species(token.trim())
                .ok_or_else(|| CliError::Argument(format!("Unknown species '{}'", token)))
        })
        .collect()
}

/// Picks the native module directory: CLI, then config file, then environment, then the
/// platform data directory.
pub fn resolve_library_dir(
    cli: Option<PathBuf>,
    file: Option<PathBuf>,
    env: Option<OsString>,
) -> Result<PathBuf> {
    if let Some(dir) = cli.or(file) {
        return Ok(dir);
    }
    match env {
        Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => default_library_dir(),
    }
}

pub fn default_library_dir() -> Result<PathBuf> {
    ProjectDirs::from("org", "singroup", "soaplite")
        .map(|dirs| dirs.data_dir().join("lib"))
        .ok_or_else(|| {
            CliError::Config("Could not determine the default native module directory.".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    fn compute_args(extra: &[&str]) -> ComputeArgs {
        let mut argv = vec!["soaplite", "compute", "-i", "in.xyz", "-o", "out.csv"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Compute(args) => args,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("soap.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn file_values_are_loaded_and_relative_paths_resolved() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [descriptor]
            cutoff = 6.0
            n-max = 8
            l-max = 4
            cross-species = false
            species = ["O", 1]

            [basis]
            path = "basis.toml"

            [native]
            library-dir = "lib"
            "#,
        );

        let settings = PartialSoapConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&compute_args(&[]), None)
            .unwrap();

        assert_eq!(settings.soap.cutoff, 6.0);
        assert_eq!(settings.soap.n_max, 8);
        assert_eq!(settings.soap.l_max, 4);
        assert!(!settings.soap.cross_species);
        assert_eq!(settings.soap.species(), Some(&[8, 1][..]));
        assert_eq!(settings.basis_path, dir.path().join("basis.toml"));
        assert_eq!(settings.library_dir, dir.path().join("lib"));
    }

    #[test]
    fn cli_overrides_take_precedence_over_file() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [descriptor]
            cutoff = 6.0
            n-max = 8
            species = [1, 8]

            [basis]
            path = "basis.toml"

            [native]
            library-dir = "/from/file"
            "#,
        );
        let args = compute_args(&[
            "--cutoff",
            "3.5",
            "--n-max",
            "4",
            "--species",
            "C,H",
            "--no-cross-species",
            "--basis",
            "/cli/basis.toml",
            "--library-dir",
            "/from/cli",
        ]);

        let settings = PartialSoapConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args, Some(OsString::from("/from/env")))
            .unwrap();

        assert_eq!(settings.soap.cutoff, 3.5);
        assert_eq!(settings.soap.n_max, 4);
        assert_eq!(settings.soap.l_max, 5);
        assert!(!settings.soap.cross_species);
        assert_eq!(settings.soap.species(), Some(&[6, 1][..]));
        assert_eq!(settings.basis_path, PathBuf::from("/cli/basis.toml"));
        assert_eq!(settings.library_dir, PathBuf::from("/from/cli"));
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let args = compute_args(&["--basis", "b.toml"]);
        let settings = PartialSoapConfig::default()
            .merge_with_cli(&args, Some(OsString::from("/from/env")))
            .unwrap();

        assert_eq!(settings.soap, SoapConfig::default());
        assert_eq!(settings.basis_path, PathBuf::from("b.toml"));
        assert_eq!(settings.library_dir, PathBuf::from("/from/env"));
    }

    #[test]
    fn missing_basis_is_a_configuration_error() {
        let result = PartialSoapConfig::default().merge_with_cli(&compute_args(&[]), None);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        let args = compute_args(&["--basis", "b.toml", "--l-max", "10"]);
        let result = PartialSoapConfig::default().merge_with_cli(&args, None);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[descriptor]\nrcut = 5.0\n");
        assert!(matches!(
            PartialSoapConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn unknown_species_in_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[descriptor]\nspecies = [\"Xx\"]\n[basis]\npath = \"b.toml\"\n",
        );
        let result = PartialSoapConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&compute_args(&[]), None);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn library_dir_precedence() {
        let cli = Some(PathBuf::from("/cli"));
        let file = Some(PathBuf::from("/file"));
        let env = Some(OsString::from("/env"));

        assert_eq!(
            resolve_library_dir(cli, file.clone(), env.clone()).unwrap(),
            PathBuf::from("/cli")
        );
        assert_eq!(
            resolve_library_dir(None, file, env.clone()).unwrap(),
            PathBuf::from("/file")
        );
        assert_eq!(
            resolve_library_dir(None, None, env).unwrap(),
            PathBuf::from("/env")
        );
    }

    #[test]
    fn empty_environment_value_falls_back_to_default() {
        if let Ok(default) = default_library_dir() {
            let resolved = resolve_library_dir(None, None, Some(OsString::new())).unwrap();
            assert_eq!(resolved, default);
            assert!(resolved.ends_with("lib"));
        }
    }

    #[test]
    fn species_tokens_accept_symbols_and_numbers() {
        let tokens = vec!["H".to_string(), " 8".to_string(), "si".to_string()];
        assert_eq!(parse_species_list(&tokens).unwrap(), vec![1, 8, 14]);
        assert!(matches!(
            parse_species_list(&["Qq".to_string()]),
            Err(CliError::Argument(_))
        ));
    }
}

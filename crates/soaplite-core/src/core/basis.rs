use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Number of angular-degree blocks in the coefficient tables (`l = 0..=9`).
pub const ANGULAR_BLOCKS: usize = 10;

#[derive(Debug, Error)]
pub enum BasisError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Expected {expected} {table} coefficients for n_max = {n_max}, found {found}")]
    Length {
        table: &'static str,
        n_max: usize,
        expected: usize,
        found: usize,
    },
    #[error("Non-finite value in {table} coefficients at index {index}")]
    NonFinite { table: &'static str, index: usize },
}

/// Radial basis coefficients passed through to the native modules.
///
/// `alphas` holds `ANGULAR_BLOCKS * n_max` values and `betas` holds
/// `ANGULAR_BLOCKS * n_max * n_max`, one block per angular degree. Their numerical meaning
/// belongs to the native library; this type only carries and validates them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RadialBasis {
    pub alphas: Vec<f64>,
    pub betas: Vec<f64>,
}

impl RadialBasis {
    pub fn new(alphas: Vec<f64>, betas: Vec<f64>) -> Self {
        Self { alphas, betas }
    }

    /// Loads coefficients from a TOML file with top-level `alphas` and `betas` arrays.
    pub fn load(path: &Path) -> Result<Self, BasisError> {
        let content = std::fs::read_to_string(path).map_err(|e| BasisError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let basis: Self = toml::from_str(&content).map_err(|e| BasisError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        debug!(
            "Loaded radial basis from {:?}: {} alphas, {} betas",
            path,
            basis.alphas.len(),
            basis.betas.len()
        );
        Ok(basis)
    }

    /// Radial basis size implied by the length of `alphas`, if it is a whole number of blocks.
    pub fn inferred_n_max(&self) -> Option<usize> {
        (!self.alphas.is_empty() && self.alphas.len() % ANGULAR_BLOCKS == 0)
            .then(|| self.alphas.len() / ANGULAR_BLOCKS)
    }

    /// Checks that both tables have the lengths expected for `n_max` and hold finite values.
    pub fn validate(&self, n_max: usize) -> Result<(), BasisError> {
        let checks = [
            ("alpha", &self.alphas, ANGULAR_BLOCKS * n_max),
            ("beta", &self.betas, ANGULAR_BLOCKS * n_max * n_max),
        ];
        for (table, values, expected) in checks {
            if values.len() != expected {
                return Err(BasisError::Length {
                    table,
                    n_max,
                    expected,
                    found: values.len(),
                });
            }
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(BasisError::NonFinite { table, index });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn basis_for(n_max: usize) -> RadialBasis {
        RadialBasis::new(
            vec![0.5; ANGULAR_BLOCKS * n_max],
            vec![0.25; ANGULAR_BLOCKS * n_max * n_max],
        )
    }

    #[test]
    fn validate_accepts_matching_lengths() {
        assert!(basis_for(5).validate(5).is_ok());
        assert_eq!(basis_for(5).inferred_n_max(), Some(5));
    }

    #[test]
    fn validate_rejects_wrong_alpha_length() {
        let result = basis_for(4).validate(5);
        assert!(matches!(
            result,
            Err(BasisError::Length {
                table: "alpha",
                expected: 50,
                found: 40,
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_wrong_beta_length() {
        let mut basis = basis_for(3);
        basis.betas.pop();
        assert!(matches!(
            basis.validate(3),
            Err(BasisError::Length { table: "beta", .. })
        ));
    }

    #[test]
    fn validate_rejects_non_finite_values() {
        let mut basis = basis_for(2);
        basis.betas[7] = f64::NAN;
        assert!(matches!(
            basis.validate(2),
            Err(BasisError::NonFinite {
                table: "beta",
                index: 7
            })
        ));
    }

    #[test]
    fn inferred_n_max_requires_whole_blocks() {
        assert_eq!(RadialBasis::new(vec![1.0; 15], vec![]).inferred_n_max(), None);
        assert_eq!(RadialBasis::new(vec![], vec![]).inferred_n_max(), None);
    }

    #[test]
    fn load_reads_toml_tables() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("basis.toml");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "alphas = [1.0, 2.0]").unwrap();
        writeln!(file, "betas = [3.0, 4.0, 5.0]").unwrap();

        let basis = RadialBasis::load(&path).unwrap();
        assert_eq!(basis.alphas, vec![1.0, 2.0]);
        assert_eq!(basis.betas, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn load_reports_missing_file_and_bad_toml() {
        let dir = tempdir().unwrap();
        let missing = RadialBasis::load(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(BasisError::Io { .. })));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "alphas = [1.0\n").unwrap();
        assert!(matches!(
            RadialBasis::load(&path),
            Err(BasisError::Toml { .. })
        ));
    }
}

use super::config::ConfigError;
use crate::core::basis::BasisError;
use crate::core::formatting::FormatError;
use crate::core::supercell::SupercellError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SoapError {
    #[error("Invalid parameter: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Structure formatting failed: {source}")]
    Format {
        #[from]
        source: FormatError,
    },

    #[error("Supercell construction failed: {source}")]
    Supercell {
        #[from]
        source: SupercellError,
    },

    #[error("Radial basis error: {source}")]
    Basis {
        #[from]
        source: BasisError,
    },

    #[error("Unsupported species cardinality: {0} (native modules exist for 1 to 6 species)")]
    UnsupportedSpeciesCount(usize),

    #[error("Native module '{module}' not found in '{dir}'", dir = dir.display())]
    NativeModuleNotFound { module: String, dir: PathBuf },

    #[error("Failed to load native module '{path}': {source}", path = path.display())]
    NativeLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("Native module '{path}' does not export '{symbol}': {source}", path = path.display())]
    NativeSymbol {
        path: PathBuf,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("Native module '{path}' returned a null descriptor buffer", path = path.display())]
    NativeCallFailed { path: PathBuf },

    #[error("{name} = {value} does not fit in a C int")]
    IntegerOverflow { name: &'static str, value: usize },

    #[error("Descriptor buffer has {found} values, expected {expected}")]
    BufferSize { expected: usize, found: usize },
}

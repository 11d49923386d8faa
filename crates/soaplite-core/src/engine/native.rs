//! Locating, loading and caching the precompiled SOAPLite modules.
//!
//! There is one module per supported species count with cross-species terms
//! (`libsoapPy2` through `libsoapPy6`) and a generic module (`libsoapPy`) that serves
//! single-species requests and every request without cross-species terms. All of them export
//! the same C entry point, `soap`.

use super::error::SoapError;
use super::kernel::{KernelInput, SoapKernel};
use libloading::{Library, Symbol};
use std::collections::HashMap;
use std::ffi::{c_double, c_int};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, info, trace};

pub const ENTRY_POINT: &str = "soap";
const ENTRY_POINT_SYMBOL: &[u8] = b"soap\0";

type SoapEntryPoint = unsafe extern "C" fn(
    output: *mut c_double,
    positions: *const c_double,
    queries: *const c_double,
    alphas: *const c_double,
    betas: *const c_double,
    species_counts: *const c_int,
    hard_cutoff: c_double,
    total_atoms: c_int,
    species_count: c_int,
    n_max: c_int,
    l_max: c_int,
    query_count: c_int,
) -> *mut c_double;

/// Number of distinct species in a request, bounded by the available native modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpeciesCount {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
}

impl SpeciesCount {
    pub const ALL: [SpeciesCount; 6] = [
        SpeciesCount::One,
        SpeciesCount::Two,
        SpeciesCount::Three,
        SpeciesCount::Four,
        SpeciesCount::Five,
        SpeciesCount::Six,
    ];

    pub fn get(self) -> usize {
        self as usize + 1
    }
}

impl TryFrom<usize> for SpeciesCount {
    type Error = SoapError;

    fn try_from(count: usize) -> Result<Self, Self::Error> {
        count
            .checked_sub(1)
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(SoapError::UnsupportedSpeciesCount(count))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CrossMode {
    Enabled,
    Disabled,
}

impl CrossMode {
    pub fn is_enabled(self) -> bool {
        self == CrossMode::Enabled
    }
}

impl From<bool> for CrossMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            CrossMode::Enabled
        } else {
            CrossMode::Disabled
        }
    }
}

/// Selection key for a native module: species count times cross-species mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey {
    pub species: SpeciesCount,
    pub cross: CrossMode,
}

impl ModuleKey {
    pub fn new(species: SpeciesCount, cross: CrossMode) -> Self {
        Self { species, cross }
    }

    /// Every supported key, in a stable order.
    pub fn all() -> impl Iterator<Item = ModuleKey> {
        SpeciesCount::ALL.into_iter().flat_map(|species| {
            [CrossMode::Enabled, CrossMode::Disabled]
                .into_iter()
                .map(move |cross| ModuleKey::new(species, cross))
        })
    }

    /// Library name without the `lib` prefix and file extension.
    pub fn stem(&self) -> String {
        match (self.species, self.cross) {
            (SpeciesCount::One, _) | (_, CrossMode::Disabled) => "soapPy".to_string(),
            (species, CrossMode::Enabled) => format!("soapPy{}", species.get()),
        }
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cross = if self.cross.is_enabled() {
            "with"
        } else {
            "without"
        };
        write!(
            f,
            "{} species {} cross terms",
            self.species.get(),
            cross
        )
    }
}

fn has_library_suffix(name: &str) -> bool {
    name.ends_with(std::env::consts::DLL_SUFFIX) || name.ends_with(".so")
}

/// Finds the module file for `key` in `dir`.
///
/// Module files are matched by the prefix `lib<stem>.` and a shared-library suffix, which
/// also accepts interpreter-tagged names such as `libsoapPy2.cpython-311-x86_64-linux-gnu.so`.
/// When several files match, the lexicographically first is used.
pub fn locate_module(dir: &Path, key: ModuleKey) -> Result<PathBuf, SoapError> {
    let prefix = format!("lib{}.", key.stem());
    let not_found = || SoapError::NativeModuleNotFound {
        module: format!("lib{}", key.stem()),
        dir: dir.to_path_buf(),
    };

    let entries = fs::read_dir(dir).map_err(|e| {
        debug!("Cannot read native module directory {:?}: {}", dir, e);
        not_found()
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| name.starts_with(&prefix) && has_library_suffix(name))
        })
        .collect();
    candidates.sort();
    trace!("Candidates for {}: {:?}", key, candidates);
    candidates.into_iter().next().ok_or_else(not_found)
}

fn to_c_int(name: &'static str, value: usize) -> Result<c_int, SoapError> {
    c_int::try_from(value).map_err(|_| SoapError::IntegerOverflow { name, value })
}

/// A loaded native module.
#[derive(Debug)]
pub struct NativeModule {
    key: ModuleKey,
    path: PathBuf,
    library: Library,
}

impl NativeModule {
    /// Loads the module at `path` and checks that it exports the entry point.
    pub fn load(path: &Path, key: ModuleKey) -> Result<Self, SoapError> {
        // SAFETY: loading runs the module's static initializers. The SOAPLite modules are plain
        // numerical C code without initializers that depend on the host process.
        let library = unsafe { Library::new(path) }.map_err(|source| SoapError::NativeLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let module = Self {
            key,
            path: path.to_path_buf(),
            library,
        };
        module.entry_point()?;
        Ok(module)
    }

    pub fn key(&self) -> ModuleKey {
        self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entry_point(&self) -> Result<Symbol<'_, SoapEntryPoint>, SoapError> {
        // SAFETY: `SoapEntryPoint` matches the C declaration of `soap` exported by every module.
        unsafe { self.library.get::<SoapEntryPoint>(ENTRY_POINT_SYMBOL) }.map_err(|source| {
            SoapError::NativeSymbol {
                path: self.path.clone(),
                symbol: ENTRY_POINT,
                source,
            }
        })
    }

    /// Runs the entry point on `input`, writing into `output`.
    pub fn compute(&self, input: &KernelInput<'_>, output: &mut [f64]) -> Result<(), SoapError> {
        let expected = input.output_len();
        if output.len() != expected {
            return Err(SoapError::BufferSize {
                expected,
                found: output.len(),
            });
        }

        let species_counts: Vec<c_int> = input
            .species_counts
            .iter()
            .map(|&count| to_c_int("species atom count", count))
            .collect::<Result<_, _>>()?;
        let total_atoms = to_c_int("total_atoms", input.total_atoms())?;
        let species_count = to_c_int("species_count", input.species_count())?;
        let n_max = to_c_int("n_max", input.n_max)?;
        let l_max = to_c_int("l_max", input.l_max)?;
        let query_count = to_c_int("query_count", input.query_count())?;

        let entry = self.entry_point()?;
        debug!(
            "Calling {:?} with {} atoms, {} queries ({})",
            self.path,
            total_atoms,
            query_count,
            self.key
        );
        // SAFETY: every pointer refers to a live slice whose length agrees with the sizes
        // passed alongside it, and `output` holds exactly the values the module writes.
        let result = unsafe {
            entry(
                output.as_mut_ptr(),
                input.positions.as_ptr(),
                input.queries.as_ptr(),
                input.alphas.as_ptr(),
                input.betas.as_ptr(),
                species_counts.as_ptr(),
                input.hard_cutoff,
                total_atoms,
                species_count,
                n_max,
                l_max,
                query_count,
            )
        };
        if result.is_null() {
            return Err(SoapError::NativeCallFailed {
                path: self.path.clone(),
            });
        }
        if result != output.as_mut_ptr() {
            debug!(
                "{:?} returned its own buffer; copying {} values",
                self.path, expected
            );
            // SAFETY: the returned pointer is the module's descriptor buffer, which holds the
            // same `expected` values it would otherwise have written into `output`.
            let returned = unsafe { std::slice::from_raw_parts(result, expected) };
            output.copy_from_slice(returned);
        }
        Ok(())
    }
}

static GLOBAL_CACHE: OnceLock<Arc<ModuleCache>> = OnceLock::new();

/// Loaded modules keyed by library directory and [`ModuleKey`].
///
/// Modules are stateless between calls, so one handle per key is shared by every caller.
#[derive(Debug, Default)]
pub struct ModuleCache {
    modules: Mutex<HashMap<(PathBuf, ModuleKey), Arc<NativeModule>>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> Arc<Self> {
        GLOBAL_CACHE.get_or_init(|| Arc::new(Self::new())).clone()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(PathBuf, ModuleKey), Arc<NativeModule>>> {
        self.modules.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached module for `key`, loading it from `dir` on first use.
    pub fn get_or_load(&self, dir: &Path, key: ModuleKey) -> Result<Arc<NativeModule>, SoapError> {
        let mut modules = self.lock();
        let cache_key = (dir.to_path_buf(), key);
        if let Some(module) = modules.get(&cache_key) {
            trace!("Native module cache hit for {}", key);
            return Ok(Arc::clone(module));
        }

        let path = locate_module(dir, key)?;
        info!("Loading native module {:?} ({}).", path, key);
        let module = Arc::new(NativeModule::load(&path, key)?);
        modules.insert(cache_key, Arc::clone(&module));
        Ok(module)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every cached handle and returns how many were held.
    ///
    /// Modules still referenced by an in-flight computation stay loaded until it finishes.
    pub fn clear(&self) -> usize {
        let mut modules = self.lock();
        let count = modules.len();
        modules.clear();
        debug!("Released {} native module handle(s).", count);
        count
    }
}

/// [`SoapKernel`] backed by the compiled SOAPLite modules in one directory.
#[derive(Debug, Clone)]
pub struct NativeKernel {
    library_dir: PathBuf,
    cache: Arc<ModuleCache>,
}

impl NativeKernel {
    /// Creates a kernel that shares the process-wide module cache.
    pub fn new(library_dir: impl Into<PathBuf>) -> Self {
        Self::with_cache(library_dir, ModuleCache::global())
    }

    pub fn with_cache(library_dir: impl Into<PathBuf>, cache: Arc<ModuleCache>) -> Self {
        Self {
            library_dir: library_dir.into(),
            cache,
        }
    }

    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    /// Resolves the module file for `key` without loading it.
    pub fn resolve(&self, key: ModuleKey) -> Result<PathBuf, SoapError> {
        locate_module(&self.library_dir, key)
    }
}

impl SoapKernel for NativeKernel {
    fn compute(&self, input: &KernelInput<'_>, output: &mut [f64]) -> Result<(), SoapError> {
        let module = self.cache.get_or_load(&self.library_dir, input.module)?;
        module.compute(input, output)
    }
}

use super::descriptor::feature_count;
use super::error::SoapError;
use super::native::ModuleKey;

/// Flat inputs for one descriptor computation, laid out the way the native modules read them.
#[derive(Debug, Clone, Copy)]
pub struct KernelInput<'a> {
    /// Which native module variant the request is for.
    pub module: ModuleKey,
    /// Atom positions, `x y z` per atom, in species-major order.
    pub positions: &'a [f64],
    /// Query positions, `x y z` per point.
    pub queries: &'a [f64],
    pub alphas: &'a [f64],
    pub betas: &'a [f64],
    /// Atoms per species, parallel to the species order used for `positions`.
    pub species_counts: &'a [usize],
    pub hard_cutoff: f64,
    pub n_max: usize,
    pub l_max: usize,
}

impl KernelInput<'_> {
    pub fn total_atoms(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn query_count(&self) -> usize {
        self.queries.len() / 3
    }

    pub fn species_count(&self) -> usize {
        self.species_counts.len()
    }

    pub fn cross_species(&self) -> bool {
        self.module.cross.is_enabled()
    }

    pub fn feature_count(&self) -> usize {
        feature_count(
            self.n_max,
            self.l_max,
            self.species_count(),
            self.cross_species(),
        )
    }

    /// Number of values the kernel writes into the output buffer.
    pub fn output_len(&self) -> usize {
        self.feature_count() * self.query_count()
    }
}

/// Computes SOAP descriptors from flat inputs.
///
/// Implementations fill `output` (of length [`KernelInput::output_len`]) in row-major
/// `(query, feature)` order. The production implementation is
/// [`super::native::NativeKernel`].
pub trait SoapKernel: Send + Sync {
    fn compute(&self, input: &KernelInput<'_>, output: &mut [f64]) -> Result<(), SoapError>;
}

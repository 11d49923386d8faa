use super::config::SoapConfig;
use super::descriptor::{SoapDescriptor, feature_count};
use super::error::SoapError;
use super::kernel::{KernelInput, SoapKernel};
use super::native::{CrossMode, ModuleKey, SpeciesCount};
use crate::core::basis::RadialBasis;
use crate::core::formatting::SpeciesGrouping;
use crate::core::utils::geometry::flatten_points;
use nalgebra::{DMatrix, Point3};
use tracing::{debug, instrument};

/// Validates a request, runs the kernel and reshapes its output into a descriptor matrix.
///
/// Every precondition is checked before the kernel is invoked, so an invalid request never
/// reaches native code. An empty query set yields a `0 x F` matrix without a kernel call.
#[instrument(skip_all, name = "soap_dispatch")]
pub fn dispatch(
    grouping: &SpeciesGrouping,
    queries: &[Point3<f64>],
    basis: &RadialBasis,
    config: &SoapConfig,
    kernel: &dyn SoapKernel,
) -> Result<SoapDescriptor, SoapError> {
    config.validate()?;
    let species = SpeciesCount::try_from(grouping.species_count())?;
    basis.validate(config.n_max)?;

    let module = ModuleKey::new(species, CrossMode::from(config.cross_species));
    let features = feature_count(
        config.n_max,
        config.l_max,
        grouping.species_count(),
        config.cross_species,
    );
    let species_list = grouping.species().to_vec();

    if queries.is_empty() {
        debug!("No query points; returning an empty descriptor.");
        return Ok(SoapDescriptor::new(
            DMatrix::zeros(0, features),
            species_list,
            config.cross_species,
        ));
    }

    let flat_queries = flatten_points(queries);
    let input = KernelInput {
        module,
        positions: grouping.positions(),
        queries: &flat_queries,
        alphas: &basis.alphas,
        betas: &basis.betas,
        species_counts: grouping.counts(),
        hard_cutoff: config.hard_cutoff(),
        n_max: config.n_max,
        l_max: config.l_max,
    };
    let mut buffer = vec![0.0; input.output_len()];
    debug!(
        "Computing {} x {} descriptor for {} atoms via {}",
        queries.len(),
        features,
        grouping.total_atoms(),
        module
    );
    kernel.compute(&input, &mut buffer)?;

    let values = DMatrix::from_row_slice(queries.len(), features, &buffer);
    Ok(SoapDescriptor::new(
        values,
        species_list,
        config.cross_species,
    ))
}

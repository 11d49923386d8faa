use crate::core::basis::RadialBasis;
use crate::core::formatting::SpeciesGrouping;
use crate::core::models::structure::AtomicStructure;
use crate::core::supercell::build_supercell;
use crate::engine::config::SoapConfig;
use crate::engine::descriptor::SoapDescriptor;
use crate::engine::dispatch::dispatch;
use crate::engine::error::SoapError;
use crate::engine::kernel::SoapKernel;
use crate::engine::progress::{Progress, ProgressReporter};
use nalgebra::Point3;
use rayon::prelude::*;
use tracing::{info, instrument, warn};

/// How the batch workflow decides whether a frame is periodic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodicMode {
    /// Periodic exactly when the frame carries a cell.
    #[default]
    Auto,
    Periodic,
    NonPeriodic,
}

impl PeriodicMode {
    fn is_periodic(self, structure: &AtomicStructure) -> bool {
        match self {
            PeriodicMode::Auto => structure.is_periodic(),
            PeriodicMode::Periodic => true,
            PeriodicMode::NonPeriodic => false,
        }
    }
}

/// Descriptors at arbitrary points around a finite structure.
///
/// Any cell on `structure` is ignored.
pub fn soap_locals(
    structure: &AtomicStructure,
    queries: &[Point3<f64>],
    basis: &RadialBasis,
    config: &SoapConfig,
    kernel: &dyn SoapKernel,
) -> Result<SoapDescriptor, SoapError> {
    let grouping = SpeciesGrouping::from_structure(structure, config.species())?;
    dispatch(&grouping, queries, basis, config, kernel)
}

/// Descriptors centred on every atom of a finite structure.
///
/// Rows follow the species-grouped atom order: all atoms of the lowest atomic number first,
/// each species in its original order.
pub fn soap_structure(
    structure: &AtomicStructure,
    basis: &RadialBasis,
    config: &SoapConfig,
    kernel: &dyn SoapKernel,
) -> Result<SoapDescriptor, SoapError> {
    let grouping = SpeciesGrouping::from_structure(structure, config.species())?;
    let queries = grouping.grouped_points();
    dispatch(&grouping, &queries, basis, config, kernel)
}

/// Descriptors at arbitrary points in a periodic structure.
///
/// The structure is expanded into a supercell large enough for the configured cutoff, with
/// the original cell at its centre, so query points inside the original cell see all of
/// their periodic neighbours.
pub fn periodic_soap_locals(
    structure: &AtomicStructure,
    queries: &[Point3<f64>],
    basis: &RadialBasis,
    config: &SoapConfig,
    kernel: &dyn SoapKernel,
) -> Result<SoapDescriptor, SoapError> {
    config.validate()?;
    let supercell = build_supercell(structure, config.cutoff)?;
    soap_locals(supercell.structure(), queries, basis, config, kernel)
}

/// Descriptors centred on every atom of a periodic structure.
///
/// Rows follow the original atom order.
pub fn periodic_soap_structure(
    structure: &AtomicStructure,
    basis: &RadialBasis,
    config: &SoapConfig,
    kernel: &dyn SoapKernel,
) -> Result<SoapDescriptor, SoapError> {
    config.validate()?;
    let supercell = build_supercell(structure, config.cutoff)?;
    let queries = structure.positions();
    soap_locals(supercell.structure(), &queries, basis, config, kernel)
}

/// Computes descriptors for many frames in parallel.
///
/// With `centers`, every frame is evaluated at those points; otherwise at its own atoms.
/// One failing frame does not stop the others; results keep the frame order.
#[instrument(skip_all, name = "batch_workflow")]
pub fn compute_frames(
    frames: &[AtomicStructure],
    centers: Option<&[Point3<f64>]>,
    basis: &RadialBasis,
    config: &SoapConfig,
    kernel: &dyn SoapKernel,
    mode: PeriodicMode,
    reporter: &ProgressReporter,
) -> Vec<Result<SoapDescriptor, SoapError>> {
    info!(
        "Computing descriptors for {} frame(s) (mode {:?}).",
        frames.len(),
        mode
    );
    reporter.report(Progress::BatchStart {
        total_frames: frames.len() as u64,
    });

    let results: Vec<_> = frames
        .par_iter()
        .enumerate()
        .map(|(index, frame)| {
            let periodic = mode.is_periodic(frame);
            let result = match (periodic, centers) {
                (true, Some(points)) => periodic_soap_locals(frame, points, basis, config, kernel),
                (true, None) => periodic_soap_structure(frame, basis, config, kernel),
                (false, Some(points)) => soap_locals(frame, points, basis, config, kernel),
                (false, None) => soap_structure(frame, basis, config, kernel),
            };
            match &result {
                Ok(_) => reporter.report(Progress::FrameFinished { index }),
                Err(e) => {
                    warn!("Frame {} failed: {}", index + 1, e);
                    reporter.report(Progress::FrameFailed {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
            result
        })
        .collect();

    reporter.report(Progress::BatchFinish);
    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(
        "Batch complete: {} succeeded, {} failed.",
        results.len() - failed,
        failed
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::cell::Cell;
    use crate::core::supercell::SupercellError;
    use crate::engine::config::SoapConfigBuilder;
    use crate::engine::dispatch::tests::{RecordingKernel, basis_for};
    use crate::engine::kernel::KernelInput;
    use std::sync::Mutex;

    /// Echoes each query's coordinates into the first three features of its row.
    #[derive(Default)]
    struct EchoKernel {
        total_atoms: Mutex<Vec<usize>>,
    }

    impl SoapKernel for EchoKernel {
        fn compute(&self, input: &KernelInput<'_>, output: &mut [f64]) -> Result<(), SoapError> {
            let features = input.feature_count();
            for (row, query) in input.queries.chunks_exact(3).enumerate() {
                output[row * features..row * features + 3].copy_from_slice(query);
            }
            self.total_atoms.lock().unwrap().push(input.total_atoms());
            Ok(())
        }
    }

    fn small_config() -> SoapConfig {
        SoapConfigBuilder::new()
            .cutoff(1.0)
            .n_max(2)
            .l_max(1)
            .build()
            .unwrap()
    }

    fn mixed_cluster() -> AtomicStructure {
        AtomicStructure::new(vec![
            Atom::new(8, Point3::new(0.0, 0.0, 0.0)),
            Atom::new(1, Point3::new(1.0, 0.0, 0.0)),
            Atom::new(8, Point3::new(2.0, 0.0, 0.0)),
            Atom::new(1, Point3::new(3.0, 0.0, 0.0)),
        ])
    }

    fn periodic_pair() -> AtomicStructure {
        AtomicStructure::periodic(
            vec![
                Atom::new(14, Point3::new(0.5, 0.5, 0.5)),
                Atom::new(8, Point3::new(2.0, 1.0, 1.5)),
            ],
            Cell::cubic(4.0),
        )
    }

    fn first_columns(descriptor: &SoapDescriptor) -> Vec<f64> {
        descriptor.rows().map(|r| r[0]).collect()
    }

    #[test]
    fn soap_structure_rows_follow_species_grouped_order() {
        let kernel = EchoKernel::default();
        let descriptor =
            soap_structure(&mixed_cluster(), &basis_for(2), &small_config(), &kernel).unwrap();

        assert_eq!(descriptor.query_count(), 4);
        assert_eq!(first_columns(&descriptor), vec![1.0, 3.0, 0.0, 2.0]);
        assert_eq!(descriptor.species(), &[1, 8]);
    }

    #[test]
    fn soap_locals_evaluates_given_points() {
        let kernel = EchoKernel::default();
        let points = [Point3::new(0.25, 0.0, 0.0), Point3::new(-1.0, 0.0, 0.0)];
        let descriptor =
            soap_locals(&mixed_cluster(), &points, &basis_for(2), &small_config(), &kernel)
                .unwrap();

        assert_eq!(first_columns(&descriptor), vec![0.25, -1.0]);
        assert_eq!(*kernel.total_atoms.lock().unwrap(), vec![4]);
    }

    #[test]
    fn periodic_structure_uses_supercell_atoms_and_original_order() {
        let kernel = EchoKernel::default();
        let structure = periodic_pair();
        let config = small_config();
        let descriptor =
            periodic_soap_structure(&structure, &basis_for(2), &config, &kernel).unwrap();

        // hard cutoff 6 over a 4 A cube needs two images per side: 5^3 copies.
        assert_eq!(*kernel.total_atoms.lock().unwrap(), vec![2 * 125]);
        assert_eq!(first_columns(&descriptor), vec![0.5, 2.0]);
    }

    #[test]
    fn periodic_workflows_require_a_cell() {
        let kernel = EchoKernel::default();
        let result = periodic_soap_structure(
            &mixed_cluster(),
            &basis_for(2),
            &small_config(),
            &kernel,
        );
        assert!(matches!(
            result,
            Err(SoapError::Supercell {
                source: SupercellError::MissingCell
            })
        ));
    }

    #[test]
    fn batch_keeps_frame_order_and_reports_failures() {
        let kernel = RecordingKernel::default();
        let frames = vec![mixed_cluster(), periodic_pair(), mixed_cluster()];
        let events = Mutex::new(Vec::new());
        let reporter =
            ProgressReporter::with_callback(Box::new(|e| events.lock().unwrap().push(e)));

        let results = compute_frames(
            &frames,
            None,
            &basis_for(2),
            &small_config(),
            &kernel,
            PeriodicMode::Periodic,
            &reporter,
        );
        drop(reporter);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().query_count(), 2);
        assert!(results[2].is_err());

        let events = events.into_inner().unwrap();
        assert_eq!(events.first(), Some(&Progress::BatchStart { total_frames: 3 }));
        assert_eq!(events.last(), Some(&Progress::BatchFinish));
        let failed = events
            .iter()
            .filter(|e| matches!(e, Progress::FrameFailed { .. }))
            .count();
        assert_eq!(failed, 2);
    }

    #[test]
    fn batch_auto_mode_and_shared_centers() {
        let kernel = EchoKernel::default();
        let frames = vec![mixed_cluster(), periodic_pair()];
        let centers = [Point3::new(1.5, 0.0, 0.0)];

        let results = compute_frames(
            &frames,
            Some(&centers),
            &basis_for(2),
            &small_config(),
            &kernel,
            PeriodicMode::Auto,
            &ProgressReporter::new(),
        );

        for result in &results {
            let descriptor = result.as_ref().unwrap();
            assert_eq!(first_columns(descriptor), vec![1.5]);
        }
        let mut sizes = kernel.total_atoms.lock().unwrap().clone();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![4, 250]);
    }
}

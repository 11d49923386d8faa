use crate::cli::{ComputeArgs, Periodicity};
use crate::config::{LIBRARY_DIR_ENV, PartialSoapConfig};
use crate::error::{CliError, Result};
use crate::tables::{frame_output_path, read_centers_from_path, write_descriptor_to_path};
use crate::utils::progress::CliProgressHandler;
use soaplite::{
    core::basis::RadialBasis,
    core::io::{traits::StructureFile, xyz::XyzFile},
    engine::error::SoapError,
    engine::native::NativeKernel,
    engine::progress::ProgressReporter,
    workflows::soap::{PeriodicMode, compute_frames},
};
use tracing::{debug, error, info};

fn periodic_mode(flags: Periodicity) -> PeriodicMode {
    if flags.periodic {
        PeriodicMode::Periodic
    } else if flags.non_periodic {
        PeriodicMode::NonPeriodic
    } else {
        PeriodicMode::Auto
    }
}

pub fn run(args: ComputeArgs) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialSoapConfig::from_file(path)?,
        None => PartialSoapConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let settings = partial_config.merge_with_cli(&args, std::env::var_os(LIBRARY_DIR_ENV))?;

    let basis = RadialBasis::load(&settings.basis_path).map_err(SoapError::from)?;

    info!("Loading input structures from {:?}", &args.input);
    let frames = XyzFile::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
        path: args.input.clone(),
        source: e.into(),
    })?;
    if frames.is_empty() {
        return Err(CliError::Argument(format!(
            "No frames found in '{}'",
            args.input.display()
        )));
    }

    let centers = args
        .centers
        .as_deref()
        .map(read_centers_from_path)
        .transpose()?;
    let mode = periodic_mode(args.periodicity);
    let kernel = NativeKernel::new(&settings.library_dir);
    debug!("Using native modules from {:?}", kernel.library_dir());

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Computing SOAP descriptors for {} frame(s)...", frames.len());
    let results = compute_frames(
        &frames,
        centers.as_deref(),
        &basis,
        &settings.soap,
        &kernel,
        mode,
        &reporter,
    );

    let total = results.len();
    let mut failures = Vec::new();
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(descriptor) => {
                let output_path = frame_output_path(&args.output, i + 1, total);
                info!(
                    "Writing {} x {} descriptor for frame {} to {:?}",
                    descriptor.query_count(),
                    descriptor.feature_count(),
                    i + 1,
                    &output_path
                );
                write_descriptor_to_path(&descriptor, &output_path)?;
                println!(
                    "  ✓ frame {} ({} x {}) written to: {}",
                    i + 1,
                    descriptor.query_count(),
                    descriptor.feature_count(),
                    output_path.display()
                );
            }
            Err(e) => {
                error!("Frame {} failed: {}", i + 1, e);
                failures.push((i + 1, e));
            }
        }
    }

    kernel.cache().clear();

    match failures.len() {
        0 => Ok(()),
        _ if total == 1 => Err(failures.remove(0).1.into()),
        count => {
            let (frame, first) = &failures[0];
            Err(CliError::Other(anyhow::anyhow!(
                "{} of {} frame(s) failed; first failure (frame {}): {}",
                count,
                total,
                frame,
                first
            )))
        }
    }
}

use crate::cli::SupercellArgs;
use crate::error::{CliError, Result};
use soaplite::{
    core::io::{traits::StructureFile, xyz::XyzFile},
    core::models::structure::AtomicStructure,
    core::supercell::build_supercell,
    engine::config::DEFAULT_CUTOFF,
    engine::error::SoapError,
};
use tracing::{info, warn};

/// Expands every periodic frame; finite frames are skipped.
fn expand_frames(frames: &[AtomicStructure], cutoff: f64) -> Result<Vec<AtomicStructure>> {
    let mut expanded = Vec::with_capacity(frames.len());
    for (i, frame) in frames.iter().enumerate() {
        if !frame.is_periodic() {
            warn!("Frame {} has no lattice; skipping.", i + 1);
            continue;
        }
        let supercell = build_supercell(frame, cutoff).map_err(SoapError::from)?;
        println!(
            "  frame {}: {:?} repeats, {} atoms",
            i + 1,
            supercell.repeats(),
            supercell.structure().len()
        );
        expanded.push(supercell.into_structure());
    }
    Ok(expanded)
}

pub fn run(args: SupercellArgs) -> Result<()> {
    let cutoff = args.cutoff.unwrap_or(DEFAULT_CUTOFF);

    info!("Loading input structures from {:?}", &args.input);
    let frames = XyzFile::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
        path: args.input.clone(),
        source: e.into(),
    })?;

    let expanded = expand_frames(&frames, cutoff)?;
    if expanded.is_empty() {
        return Err(CliError::Argument(format!(
            "'{}' contains no periodic frames",
            args.input.display()
        )));
    }

    XyzFile::write_to_path(&expanded, &args.output).map_err(|e| CliError::FileParsing {
        path: args.output.clone(),
        source: e.into(),
    })?;
    println!(
        "✓ {} supercell(s) written to: {}",
        expanded.len(),
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use nalgebra::Point3;
    use soaplite::core::models::atom::Atom;
    use soaplite::core::models::cell::Cell;
    use soaplite::core::supercell::SupercellError;
    use tempfile::tempdir;

    fn periodic_frame() -> AtomicStructure {
        AtomicStructure::periodic(
            vec![Atom::new(26, Point3::new(0.0, 0.0, 0.0))],
            Cell::cubic(6.0),
        )
    }

    #[test]
    fn finite_frames_are_skipped() {
        let finite = AtomicStructure::new(vec![Atom::new(1, Point3::origin())]);
        let expanded = expand_frames(&[finite, periodic_frame()], 0.5).unwrap();
        assert_eq!(expanded.len(), 1);
        // hard cutoff 5.5 over a 6 A cube: one image per side.
        assert_eq!(expanded[0].len(), 27);
    }

    #[test]
    fn oversized_cutoff_is_an_error() {
        let result = expand_frames(&[periodic_frame()], 1e300);
        assert!(matches!(
            result,
            Err(CliError::Core(SoapError::Supercell {
                source: SupercellError::TooLarge
            }))
        ));
    }

    #[test]
    fn supercells_are_written_as_xyz() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.xyz");
        let output = dir.path().join("out.xyz");
        XyzFile::write_to_path(&[periodic_frame()], &input).unwrap();

        let cli = Cli::parse_from([
            "soaplite",
            "supercell",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--cutoff",
            "0.5",
        ]);
        let Commands::Supercell(args) = cli.command else {
            panic!("expected supercell command");
        };
        run(args).unwrap();

        let frames = XyzFile::read_from_path(&output).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 27);
        let side = frames[0].cell().unwrap().vector(0).norm();
        assert!((side - 18.0).abs() < 1e-9);
    }

    #[test]
    fn input_without_periodic_frames_is_an_error() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.xyz");
        let finite = AtomicStructure::new(vec![Atom::new(1, Point3::origin())]);
        XyzFile::write_to_path(&[finite], &input).unwrap();

        let args = SupercellArgs {
            input,
            output: dir.path().join("out.xyz"),
            cutoff: None,
        };
        assert!(matches!(run(args), Err(CliError::Argument(_))));
    }
}

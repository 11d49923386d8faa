//! Periodic expansion of a structure into a re-centred supercell.
//!
//! The native modules only see a finite cluster of atoms, so a periodic structure is
//! replicated along each lattice vector until every sphere of radius `cutoff + margin`
//! around an atom of the original cell lies inside the replica.

use crate::core::models::cell::Cell;
use crate::core::models::structure::AtomicStructure;
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, info};

/// Extra distance added to the cutoff radius to obtain the hard cutoff.
pub const CUTOFF_MARGIN: f64 = 5.0;

/// Cells whose normalized volume falls below this are treated as degenerate.
///
/// The measure is scale-free, so a tiny but well-shaped cell passes; such cells are
/// stopped by [`MAX_SUPERCELL_ATOMS`] instead.
pub const DEGENERACY_TOLERANCE: f64 = 1e-6;

/// Largest supercell, in atoms (or images for an empty structure), that will be built.
pub const MAX_SUPERCELL_ATOMS: usize = 1 << 26;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SupercellError {
    #[error("Structure has no cell; periodic expansion requires lattice vectors")]
    MissingCell,
    #[error("Degenerate cell: normalized volume {normalized_volume:.3e} is below 1e-6")]
    DegenerateCell { normalized_volume: f64 },
    #[error("Invalid cutoff radius {0}: the hard cutoff (cutoff + 5) must be finite and positive")]
    InvalidCutoff(f64),
    #[error("Supercell too large: more than 67108864 atoms would be needed")]
    TooLarge,
}

/// A supercell together with the bookkeeping needed to locate the original cell in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Supercell {
    structure: AtomicStructure,
    half_repeats: [usize; 3],
    source_atoms: usize,
}

impl Supercell {
    pub fn structure(&self) -> &AtomicStructure {
        &self.structure
    }

    pub fn into_structure(self) -> AtomicStructure {
        self.structure
    }

    /// Images added on each side of the original cell along each lattice vector.
    pub fn half_repeats(&self) -> [usize; 3] {
        self.half_repeats
    }

    /// Total repetitions along each lattice vector (`1 + 2n`).
    pub fn repeats(&self) -> [usize; 3] {
        self.half_repeats.map(|n| 1 + 2 * n)
    }

    pub fn num_images(&self) -> usize {
        self.repeats().iter().product()
    }

    /// Atom indices of the image that coincides with the original cell.
    pub fn central_image(&self) -> Range<usize> {
        let [_, r2, r3] = self.repeats();
        let [n1, n2, n3] = self.half_repeats;
        let image = (n1 * r2 + n2) * r3 + n3;
        image * self.source_atoms..(image + 1) * self.source_atoms
    }
}

/// Minimal number of images on each side of the cell so that its perpendicular extent
/// covers `cutoff + CUTOFF_MARGIN` along every lattice direction.
///
/// # Errors
///
/// Returns [`SupercellError::DegenerateCell`] for flat or zero-length cells,
/// [`SupercellError::InvalidCutoff`] when the hard cutoff is not a positive finite number
/// and [`SupercellError::TooLarge`] when a single axis already needs more images than
/// [`MAX_SUPERCELL_ATOMS`].
pub fn replication_counts(cell: &Cell, cutoff: f64) -> Result<[usize; 3], SupercellError> {
    let hard_cutoff = cutoff + CUTOFF_MARGIN;
    if !hard_cutoff.is_finite() || hard_cutoff <= 0.0 {
        return Err(SupercellError::InvalidCutoff(cutoff));
    }

    let normalized_volume = cell.normalized_volume();
    if normalized_volume.is_nan() || normalized_volume < DEGENERACY_TOLERANCE {
        return Err(SupercellError::DegenerateCell { normalized_volume });
    }
    let heights = cell
        .perpendicular_heights()
        .ok_or(SupercellError::DegenerateCell { normalized_volume })?;

    let counts = heights.map(|h| (hard_cutoff / h).ceil());
    if counts.iter().any(|&n| n > MAX_SUPERCELL_ATOMS as f64) {
        return Err(SupercellError::TooLarge);
    }
    Ok(counts.map(|n| n as usize))
}

/// Full repetitions `1 + 2n` for each half count `n`.
fn full_repeats(half_repeats: [usize; 3]) -> Result<[usize; 3], SupercellError> {
    let mut repeats = [0; 3];
    for (full, half) in repeats.iter_mut().zip(half_repeats) {
        *full = half
            .checked_mul(2)
            .and_then(|n| n.checked_add(1))
            .ok_or(SupercellError::TooLarge)?;
    }
    Ok(repeats)
}

/// Atoms in a tiling of `atoms_per_image` atoms, bounded by [`MAX_SUPERCELL_ATOMS`].
///
/// Empty structures count one per image so the loop over images stays bounded too.
fn tiled_atom_count(repeats: [usize; 3], atoms_per_image: usize) -> Result<usize, SupercellError> {
    let total = repeats
        .iter()
        .try_fold(atoms_per_image.max(1), |acc, &r| acc.checked_mul(r))
        .filter(|&total| total <= MAX_SUPERCELL_ATOMS)
        .ok_or(SupercellError::TooLarge)?;
    Ok(if atoms_per_image == 0 { 0 } else { total })
}

/// Tiles `structure` `repeats[i]` times along lattice vector `i`.
///
/// Atoms are ordered image by image: for each lattice offset `(m1, m2, m3)` in lexicographic
/// order, every atom of the source structure in its original order. The resulting cell is
/// the source cell scaled by `repeats`.
pub fn repeat(
    structure: &AtomicStructure,
    repeats: [usize; 3],
) -> Result<AtomicStructure, SupercellError> {
    let cell = structure.cell().ok_or(SupercellError::MissingCell)?;
    let capacity = tiled_atom_count(repeats, structure.len())?;

    let mut out = AtomicStructure::periodic(
        Vec::with_capacity(capacity),
        cell.repeated(repeats),
    );
    for m1 in 0..repeats[0] {
        for m2 in 0..repeats[1] {
            for m3 in 0..repeats[2] {
                let offset = cell.lattice_point([m1 as f64, m2 as f64, m3 as f64]);
                for atom in structure.atoms() {
                    let mut image = *atom;
                    image.position += offset;
                    out.push(image);
                }
            }
        }
    }
    Ok(out)
}

/// Builds the re-centred supercell of a periodic structure for the given cutoff.
///
/// The structure is repeated `1 + 2n` times along each lattice vector, with `n` from
/// [`replication_counts`], and shifted by `-(n1 a1 + n2 a2 + n3 a3)` so that the central
/// image lies exactly on top of the original cell.
pub fn build_supercell(
    structure: &AtomicStructure,
    cutoff: f64,
) -> Result<Supercell, SupercellError> {
    let cell = structure.cell().ok_or(SupercellError::MissingCell)?;
    let half_repeats = replication_counts(cell, cutoff)?;
    let repeats = full_repeats(half_repeats)?;
    debug!(
        "Cutoff {} requires {:?} images on each side ({:?} total repeats)",
        cutoff, half_repeats, repeats
    );

    let mut expanded = repeat(structure, repeats)?;
    let shift = cell.lattice_point(half_repeats.map(|n| n as f64));
    expanded.translate(&-shift);

    info!(
        "Built supercell of {} atoms from {} atoms in the unit cell.",
        expanded.len(),
        structure.len()
    );
    Ok(Supercell {
        structure: expanded,
        half_repeats,
        source_atoms: structure.len(),
    })
}

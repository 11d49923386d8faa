//! Converts an [`AtomicStructure`] into the flat, species-grouped arrays read by the
//! native SOAP modules.
//!
//! The native layer receives positions as one contiguous `x y z` array in species-major
//! order together with a parallel array of per-species atom counts. Both are produced
//! from the same sorted species list here, so they can never disagree on ordering.

use crate::core::models::structure::AtomicStructure;
use crate::core::utils::geometry::flatten_points;
use nalgebra::Point3;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, trace};

/// Largest number of distinct species the native modules support.
pub const MAX_SPECIES: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Structure contains no atoms")]
    EmptyStructure,
    #[error("Unsupported species cardinality: {count} distinct species (at most 6 are supported)")]
    UnsupportedSpeciesCount { count: usize },
    #[error("Atom {index} has atomic number {atomic_number}, which is not in the requested species list")]
    UnknownSpecies { index: usize, atomic_number: u32 },
}

/// Atom positions partitioned by species.
///
/// Species are sorted by ascending atomic number, and within each species the atoms keep
/// their order from the source structure.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesGrouping {
    species: Vec<u32>,
    counts: Vec<usize>,
    positions: Vec<f64>,
}

impl SpeciesGrouping {
    /// Groups the atoms of `structure` by species.
    ///
    /// When `species` is given and non-empty it fixes the species list, which lets several
    /// structures share one descriptor layout even if some lack a species (its count is then
    /// zero). Otherwise the species observed in the structure are used.
    ///
    /// # Errors
    ///
    /// Fails on an empty structure, on more than [`MAX_SPECIES`] species, and on atoms whose
    /// species is missing from an explicit list.
    pub fn from_structure(
        structure: &AtomicStructure,
        species: Option<&[u32]>,
    ) -> Result<Self, FormatError> {
        if structure.is_empty() {
            return Err(FormatError::EmptyStructure);
        }

        let species: Vec<u32> = match species {
            Some(explicit) if !explicit.is_empty() => explicit
                .iter()
                .copied()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            _ => structure.species(),
        };
        if species.len() > MAX_SPECIES {
            return Err(FormatError::UnsupportedSpeciesCount {
                count: species.len(),
            });
        }

        let mut buckets: Vec<Vec<Point3<f64>>> = vec![Vec::new(); species.len()];
        for (index, atom) in structure.atoms().iter().enumerate() {
            let slot = species
                .binary_search(&atom.atomic_number)
                .map_err(|_| FormatError::UnknownSpecies {
                    index,
                    atomic_number: atom.atomic_number,
                })?;
            buckets[slot].push(atom.position);
        }

        let counts: Vec<usize> = buckets.iter().map(Vec::len).collect();
        let positions = buckets.iter().flat_map(|b| flatten_points(b)).collect();

        debug!(
            "Grouped {} atoms into species {:?} with counts {:?}",
            structure.len(),
            species,
            counts
        );
        Ok(Self {
            species,
            counts,
            positions,
        })
    }

    /// Sorted atomic numbers, one per group.
    pub fn species(&self) -> &[u32] {
        &self.species
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    /// Atom count per species, parallel to [`Self::species`].
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn total_atoms(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Flattened `x y z` positions in species-major order.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Positions in species-major order as points.
    pub fn grouped_points(&self) -> Vec<Point3<f64>> {
        self.positions
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect()
    }

    /// Flattened positions of the atoms of one species, if it is part of the grouping.
    pub fn positions_of(&self, atomic_number: u32) -> Option<&[f64]> {
        let slot = self.species.binary_search(&atomic_number).ok()?;
        let start: usize = self.counts[..slot].iter().sum::<usize>() * 3;
        let end = start + self.counts[slot] * 3;
        trace!("Species {} occupies flat range {}..{}", atomic_number, start, end);
        Some(&self.positions[start..end])
    }
}

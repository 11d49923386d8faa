use super::atom::Atom;
use super::cell::Cell;
use nalgebra::{Point3, Vector3};
use std::collections::BTreeSet;

/// An ordered collection of atoms with an optional periodic cell.
///
/// Atom order is significant: the species grouping preserves it within each species,
/// and whole-structure descriptors report rows in an order derived from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomicStructure {
    atoms: Vec<Atom>,
    cell: Option<Cell>,
}

impl AtomicStructure {
    /// Creates a non-periodic structure.
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self { atoms, cell: None }
    }

    /// Creates a periodic structure with the given cell.
    pub fn periodic(atoms: Vec<Atom>, cell: Cell) -> Self {
        Self {
            atoms,
            cell: Some(cell),
        }
    }

    /// Builds a structure from parallel slices of atomic numbers and positions.
    ///
    /// Returns `None` if the slices differ in length.
    pub fn from_parts(
        atomic_numbers: &[u32],
        positions: &[Point3<f64>],
        cell: Option<Cell>,
    ) -> Option<Self> {
        if atomic_numbers.len() != positions.len() {
            return None;
        }
        let atoms = atomic_numbers
            .iter()
            .zip(positions)
            .map(|(&z, &p)| Atom::new(z, p))
            .collect();
        Some(Self { atoms, cell })
    }

    pub fn with_cell(mut self, cell: Option<Cell>) -> Self {
        self.cell = cell;
        self
    }

    pub fn push(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn cell(&self) -> Option<&Cell> {
        self.cell.as_ref()
    }

    pub fn is_periodic(&self) -> bool {
        self.cell.is_some()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    pub fn atomic_numbers(&self) -> Vec<u32> {
        self.atoms.iter().map(|a| a.atomic_number).collect()
    }

    /// Distinct atomic numbers present, in ascending order.
    pub fn species(&self) -> Vec<u32> {
        self.atoms
            .iter()
            .map(|a| a.atomic_number)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Shifts every atom by `offset`. The cell is left unchanged.
    pub fn translate(&mut self, offset: &Vector3<f64>) {
        for atom in &mut self.atoms {
            atom.position += offset;
        }
    }
}

use super::element;
use nalgebra::Point3;

/// A single atom of a structure.
///
/// The atomic number doubles as the species identifier consumed by the native
/// SOAP modules; no other chemical information is needed for the descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atom {
    /// Atomic number (species identifier), e.g. `1` for hydrogen.
    pub atomic_number: u32,
    /// Cartesian position in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates a new atom from its atomic number and Cartesian position.
    pub fn new(atomic_number: u32, position: Point3<f64>) -> Self {
        Self {
            atomic_number,
            position,
        }
    }

    /// Returns the element symbol of this atom, if the atomic number is known.
    pub fn symbol(&self) -> Option<&'static str> {
        element::symbol_of(self.atomic_number)
    }
}

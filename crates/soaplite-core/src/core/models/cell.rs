use crate::core::utils::geometry::perpendicular_component;
use nalgebra::{Matrix3, Vector3};

/// A periodic simulation cell described by three lattice vectors.
///
/// The vectors are stored as rows, matching the convention of most structure
/// formats (the extended-XYZ `Lattice` key lists `a1`, `a2`, `a3` in order).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    vectors: [Vector3<f64>; 3],
}

impl Cell {
    pub fn new(a1: Vector3<f64>, a2: Vector3<f64>, a3: Vector3<f64>) -> Self {
        Self {
            vectors: [a1, a2, a3],
        }
    }

    /// Builds a cell from a matrix whose rows are the lattice vectors.
    pub fn from_rows(matrix: &Matrix3<f64>) -> Self {
        Self::new(
            matrix.row(0).transpose(),
            matrix.row(1).transpose(),
            matrix.row(2).transpose(),
        )
    }

    pub fn cubic(side: f64) -> Self {
        Self::orthorhombic(side, side, side)
    }

    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Self {
        Self::new(
            Vector3::new(a, 0.0, 0.0),
            Vector3::new(0.0, b, 0.0),
            Vector3::new(0.0, 0.0, c),
        )
    }

    pub fn vectors(&self) -> &[Vector3<f64>; 3] {
        &self.vectors
    }

    pub fn vector(&self, axis: usize) -> &Vector3<f64> {
        &self.vectors[axis]
    }

    /// Returns the lattice vectors as the rows of a matrix.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::from_rows(&[
            self.vectors[0].transpose(),
            self.vectors[1].transpose(),
            self.vectors[2].transpose(),
        ])
    }

    pub fn volume(&self) -> f64 {
        self.vectors[0].dot(&self.vectors[1].cross(&self.vectors[2])).abs()
    }

    /// Volume divided by the product of the lattice vector lengths.
    ///
    /// This is `1` for an orthogonal cell and approaches `0` as the cell flattens, which
    /// makes it a scale-free measure of degeneracy. Zero-length vectors yield `0`.
    pub fn normalized_volume(&self) -> f64 {
        let lengths: f64 = self.vectors.iter().map(|v| v.norm()).product();
        if lengths == 0.0 {
            0.0
        } else {
            self.volume() / lengths
        }
    }

    /// Distance between the two faces of the cell that are not crossed by each lattice vector.
    ///
    /// For lattice vector `a1` this is the length of its component perpendicular to the
    /// plane of `a2` and `a3`; likewise for the other axes. Returns `None` for a cell whose
    /// other two vectors are parallel along any axis.
    pub fn perpendicular_heights(&self) -> Option<[f64; 3]> {
        let [a1, a2, a3] = &self.vectors;
        Some([
            perpendicular_component(a1, a2, a3)?.norm(),
            perpendicular_component(a2, a3, a1)?.norm(),
            perpendicular_component(a3, a1, a2)?.norm(),
        ])
    }

    /// Returns the cell scaled by an integer repetition count along each lattice vector.
    pub fn repeated(&self, repeats: [usize; 3]) -> Self {
        Self::new(
            self.vectors[0] * repeats[0] as f64,
            self.vectors[1] * repeats[1] as f64,
            self.vectors[2] * repeats[2] as f64,
        )
    }

    /// Cartesian offset of the lattice point `(m1, m2, m3)`.
    pub fn lattice_point(&self, indices: [f64; 3]) -> Vector3<f64> {
        self.vectors[0] * indices[0] + self.vectors[1] * indices[1] + self.vectors[2] * indices[2]
    }

    /// Lattice vectors flattened row by row (`a1x a1y a1z a2x ...`).
    pub fn to_flat(&self) -> [f64; 9] {
        let [a1, a2, a3] = &self.vectors;
        [
            a1.x, a1.y, a1.z, a2.x, a2.y, a2.z, a3.x, a3.y, a3.z,
        ]
    }

    pub fn from_flat(values: &[f64; 9]) -> Self {
        Self::new(
            Vector3::new(values[0], values[1], values[2]),
            Vector3::new(values[3], values[4], values[5]),
            Vector3::new(values[6], values[7], values[8]),
        )
    }
}

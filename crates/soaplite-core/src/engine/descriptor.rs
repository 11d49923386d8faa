use nalgebra::DMatrix;

/// Number of unordered radial basis pairs `(n, n')` with `n <= n'`.
pub fn basis_pair_count(n_max: usize) -> usize {
    n_max * (n_max + 1) / 2
}

/// Number of species terms per basis pair and angular degree.
///
/// With cross-species terms every unordered species pair contributes a block; without them
/// only the diagonal (same-species) blocks remain.
pub fn species_term_count(species_count: usize, cross_species: bool) -> usize {
    if cross_species {
        species_count * (species_count + 1) / 2
    } else {
        species_count
    }
}

/// Length of one descriptor row.
pub fn feature_count(n_max: usize, l_max: usize, species_count: usize, cross_species: bool) -> usize {
    basis_pair_count(n_max) * (l_max + 1) * species_term_count(species_count, cross_species)
}

/// SOAP descriptors for a set of query points.
///
/// Row `i` belongs to query point `i`. The column layout is defined by the native library
/// and depends on the species list and the cross-species flag stored alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct SoapDescriptor {
    values: DMatrix<f64>,
    species: Vec<u32>,
    cross_species: bool,
}

impl SoapDescriptor {
    pub(crate) fn new(values: DMatrix<f64>, species: Vec<u32>, cross_species: bool) -> Self {
        Self {
            values,
            species,
            cross_species,
        }
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn into_values(self) -> DMatrix<f64> {
        self.values
    }

    /// Sorted species the descriptor was computed for.
    pub fn species(&self) -> &[u32] {
        &self.species
    }

    pub fn cross_species(&self) -> bool {
        self.cross_species
    }

    pub fn query_count(&self) -> usize {
        self.values.nrows()
    }

    pub fn feature_count(&self) -> usize {
        self.values.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    /// Copies one row out as a plain vector.
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        (index < self.query_count()).then(|| self.values.row(index).iter().copied().collect())
    }

    /// Iterates over rows as vectors, in query order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        self.values
            .row_iter()
            .map(|row| row.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_count_for_two_species_with_cross_terms() {
        assert_eq!(basis_pair_count(5), 15);
        assert_eq!(species_term_count(2, true), 3);
        assert_eq!(feature_count(5, 5, 2, true), 270);
    }

    #[test]
    fn feature_count_without_cross_terms_uses_species_count() {
        assert_eq!(species_term_count(4, false), 4);
        assert_eq!(species_term_count(4, true), 10);
        assert_eq!(feature_count(3, 0, 4, false), 6 * 4);
    }

    #[test]
    fn single_species_layout_is_identical_in_both_modes() {
        assert_eq!(feature_count(8, 6, 1, true), feature_count(8, 6, 1, false));
    }

    #[test]
    fn rows_follow_row_major_input() {
        let values = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let descriptor = SoapDescriptor::new(values, vec![1], true);
        assert_eq!(descriptor.shape(), (2, 3));
        assert_eq!(descriptor.row(1), Some(vec![4.0, 5.0, 6.0]));
        assert_eq!(descriptor.row(2), None);
        let rows: Vec<Vec<f64>> = descriptor.rows().collect();
        assert_eq!(rows[0], vec![1.0, 2.0, 3.0]);
    }
}

/// Eigenvalues of a 3x3 symmetric matrix, in no particular order.
pub type EigenvalueTriple = [f64; 3];

/// A symmetric N x N matrix stored densely.
///
/// Only the symmetric setter [`SymmetricMatrix::set`] writes entries, which keeps
/// `m[i][j] == m[j][i]` for every matrix built through this type. A Hessian volume uses
/// `SymmetricMatrix<3>` as its sample type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SymmetricMatrix<const N: usize> {
    data: [[f64; N]; N],
}

impl<const N: usize> Default for SymmetricMatrix<N> {
    fn default() -> Self {
        Self {
            data: [[0.0; N]; N],
        }
    }
}

impl<const N: usize> SymmetricMatrix<N> {
    /// The zero matrix.
    pub fn zeros() -> Self {
        Self::default()
    }

    /// A diagonal matrix with the given diagonal entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use sheetness_volume::SymmetricMatrix;
    ///
    /// let m = SymmetricMatrix::from_diagonal([1.0, 2.0, 3.0]);
    ///
    /// assert_eq!(m.get(1, 1), 2.0);
    /// assert_eq!(m.get(0, 2), 0.0);
    /// ```
    pub fn from_diagonal(diagonal: [f64; N]) -> Self {
        let mut m = Self::zeros();
        for (i, d) in diagonal.into_iter().enumerate() {
            m.data[i][i] = d;
        }
        m
    }

    /// Build a matrix from its upper triangle. Entries below the diagonal are ignored.
    pub fn from_upper(data: [[f64; N]; N]) -> Self {
        let mut m = Self::zeros();
        for i in 0..N {
            for j in i..N {
                m.set(i, j, data[i][j]);
            }
        }
        m
    }

    /// Matrix dimension.
    pub const fn dimension(&self) -> usize {
        N
    }

    /// Entry at row `i`, column `j`.
    ///
    /// PRECONDITION: `i < N` and `j < N`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i][j]
    }

    /// Set the entries `(i, j)` and `(j, i)` to `val`.
    ///
    /// PRECONDITION: `i < N` and `j < N`.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, val: f64) {
        self.data[i][j] = val;
        self.data[j][i] = val;
    }

    /// The dense row-major entries.
    pub fn as_array(&self) -> &[[f64; N]; N] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_setter() {
        let mut m = SymmetricMatrix::<3>::zeros();
        m.set(0, 2, 5.0);
        assert_eq!(m.get(0, 2), 5.0);
        assert_eq!(m.get(2, 0), 5.0);
        assert_eq!(m.dimension(), 3);
    }

    #[test]
    fn test_from_upper() {
        let m = SymmetricMatrix::from_upper([[1.0, 2.0], [-7.0, 3.0]]);
        assert_eq!(m.as_array(), &[[1.0, 2.0], [2.0, 3.0]]);
    }
}

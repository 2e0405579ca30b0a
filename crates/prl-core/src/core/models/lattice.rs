use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Determinant magnitude below which a lattice is treated as degenerate.
const SINGULAR_VOLUME_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LatticeError {
    #[error("Lattice matrix is singular (volume {0:.3e} Å³)")]
    Singular(f64),
    #[error("Angles cannot be satisfied: {0}, {1}, {2}")]
    InvalidAngles(f64, f64, f64),
    #[error("Target volume must be positive and finite, got {0}")]
    InvalidVolume(f64),
    #[error("Supercell matrix must have a positive determinant, got {0}")]
    InvalidSupercell(i32),
}

/// A periodic lattice, stored as a matrix whose columns are the lattice vectors a, b, c in Å.
///
/// Fractional coordinates are column vectors, so the Cartesian position of a point is `M * frac`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LatticeDocument", into = "LatticeDocument")]
pub struct Lattice {
    m: Matrix3<f64>,
    inv_m: Matrix3<f64>,
}

/// The serialized form of a lattice: one row per lattice vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LatticeDocument {
    matrix: [[f64; 3]; 3],
}

impl TryFrom<LatticeDocument> for Lattice {
    type Error = LatticeError;

    fn try_from(doc: LatticeDocument) -> Result<Self, Self::Error> {
        Lattice::from_rows(doc.matrix)
    }
}

impl From<Lattice> for LatticeDocument {
    fn from(lattice: Lattice) -> Self {
        Self {
            matrix: lattice.to_rows(),
        }
    }
}

impl Lattice {
    /// Creates a lattice from a matrix whose columns are the lattice vectors.
    pub fn new(m: Matrix3<f64>) -> Result<Self, LatticeError> {
        let det = m.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_VOLUME_TOLERANCE {
            return Err(LatticeError::Singular(det));
        }
        let inv_m = m.try_inverse().ok_or(LatticeError::Singular(det))?;
        Ok(Self { m, inv_m })
    }

    /// Creates a lattice from three row vectors, the layout used by POSCAR files and JSON documents.
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Result<Self, LatticeError> {
        let vectors = rows.map(|r| Vector3::new(r[0], r[1], r[2]));
        Self::new(Matrix3::from_columns(&vectors))
    }

    pub fn cubic(a: f64) -> Result<Self, LatticeError> {
        Self::new(Matrix3::from_diagonal_element(a))
    }

    pub fn hexagonal(a: f64, c: f64) -> Result<Self, LatticeError> {
        Self::try_from_parameters(a, a, c, 90.0, 90.0, 120.0)
    }

    /// Initializes from a, b, c, α, β, γ (Å and degrees), choosing the orientation with a along x
    /// and b in the xy-plane.
    pub fn try_from_parameters(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Result<Self, LatticeError> {
        // https://journals.iucr.org/a/issues/2011/01/00/au5114/au5114.pdf
        for expr in &[
            alpha + beta + gamma,
            alpha + beta - gamma,
            alpha - beta + gamma,
            -alpha + beta + gamma,
        ] {
            if !(0f64..360f64).contains(expr) {
                return Err(LatticeError::InvalidAngles(alpha, beta, gamma));
            }
        }
        let (cos_a, cos_b) = (alpha.to_radians().cos(), beta.to_radians().cos());
        let (sin_y, cos_y) = gamma.to_radians().sin_cos();

        let a_vec = Vector3::x().scale(a);
        let b_vec = Vector3::new(cos_y, sin_y, 0.0).scale(b);
        let cx = cos_b;
        let cy = (cos_a - cos_b * cos_y) / sin_y;
        let cz_sq = 1.0 - cx * cx - cy * cy;
        if cz_sq <= 0.0 {
            return Err(LatticeError::InvalidAngles(alpha, beta, gamma));
        }
        let c_vec = Vector3::new(cx, cy, cz_sq.sqrt()).scale(c);

        Self::new(Matrix3::from_columns(&[a_vec, b_vec, c_vec]))
    }

    /// The lattice matrix, with lattice vectors as columns.
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.m
    }

    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        let mut rows = [[0.0; 3]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            let v = self.m.column(i);
            *row = [v[0], v[1], v[2]];
        }
        rows
    }

    pub fn vector(&self, i: usize) -> Vector3<f64> {
        self.m.column(i).into_owned()
    }

    /// Lengths of a, b and c in Å.
    pub fn abc(&self) -> [f64; 3] {
        [0, 1, 2].map(|i| self.m.column(i).norm())
    }

    /// The angles α, β and γ in degrees.
    pub fn angles(&self) -> [f64; 3] {
        let (a, b, c) = (self.vector(0), self.vector(1), self.vector(2));
        [b.angle(&c), c.angle(&a), a.angle(&b)].map(f64::to_degrees)
    }

    /// Cell volume in Å³.
    pub fn volume(&self) -> f64 {
        self.m.determinant().abs()
    }

    pub fn to_cartesian(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        self.m * frac
    }

    pub fn to_fractional(&self, cart: &Vector3<f64>) -> Vector3<f64> {
        self.inv_m * cart
    }

    /// Returns this lattice scaled isotropically to the given volume.
    pub fn scaled_to_volume(&self, volume: f64) -> Result<Self, LatticeError> {
        if !volume.is_finite() || volume <= 0.0 {
            return Err(LatticeError::InvalidVolume(volume));
        }
        let factor = (volume / self.volume()).cbrt();
        Self::new(self.m * factor)
    }

    /// Returns the lattice of a supercell. Row `i` of the scaling matrix gives the new vector `i`
    /// as an integer combination of the old ones.
    pub fn supercell(&self, scaling: &SupercellMatrix) -> Result<Self, LatticeError> {
        let det = scaling.determinant();
        if det <= 0 {
            return Err(LatticeError::InvalidSupercell(det));
        }
        let s = scaling.matrix().map(f64::from);
        Self::new(self.m * s.transpose())
    }
}

/// An integer scaling matrix for building supercells.
///
/// Deserializes from either `[2, 2, 2]` (diagonal) or a full 3×3 nested array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SupercellMatrix {
    Diagonal([i32; 3]),
    Full([[i32; 3]; 3]),
}

impl SupercellMatrix {
    pub fn matrix(&self) -> Matrix3<i32> {
        match self {
            Self::Diagonal(d) => Matrix3::from_diagonal(&Vector3::new(d[0], d[1], d[2])),
            Self::Full(rows) => Matrix3::from_fn(|i, j| rows[i][j]),
        }
    }

    pub fn determinant(&self) -> i32 {
        let m = self.matrix();
        m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
            - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
            + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-8, "{} != {}", a, b);
    }

    #[test]
    fn cubic_lattice_has_expected_volume_and_angles() {
        let lattice = Lattice::cubic(3.0).unwrap();
        assert_close(lattice.volume(), 27.0);
        for angle in lattice.angles() {
            assert_close(angle, 90.0);
        }
        assert_eq!(lattice.abc(), [3.0, 3.0, 3.0]);
    }

    #[test]
    fn parameters_roundtrip() {
        let lattice = Lattice::try_from_parameters(3.0, 4.0, 5.0, 80.0, 95.0, 110.0).unwrap();
        let [a, b, c] = lattice.abc();
        let [alpha, beta, gamma] = lattice.angles();
        assert_close(a, 3.0);
        assert_close(b, 4.0);
        assert_close(c, 5.0);
        assert_close(alpha, 80.0);
        assert_close(beta, 95.0);
        assert_close(gamma, 110.0);
    }

    #[test]
    fn impossible_angles_are_rejected() {
        let result = Lattice::try_from_parameters(1.0, 1.0, 1.0, 170.0, 170.0, 170.0);
        assert!(matches!(result, Err(LatticeError::InvalidAngles(..))));
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let rows = [[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(matches!(
            Lattice::from_rows(rows),
            Err(LatticeError::Singular(_))
        ));
    }

    #[test]
    fn rows_are_lattice_vectors() {
        let rows = [[1.0, 0.0, 0.0], [0.5, 2.0, 0.0], [0.0, 0.0, 3.0]];
        let lattice = Lattice::from_rows(rows).unwrap();
        assert_eq!(lattice.vector(1), Vector3::new(0.5, 2.0, 0.0));
        assert_eq!(lattice.to_rows(), rows);
        let cart = lattice.to_cartesian(&Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(cart, Vector3::new(0.5, 2.0, 0.0));
    }

    #[test]
    fn fractional_and_cartesian_are_inverse() {
        let lattice = Lattice::hexagonal(2.5, 4.1).unwrap();
        let frac = Vector3::new(1.0 / 3.0, 2.0 / 3.0, 0.25);
        let back = lattice.to_fractional(&lattice.to_cartesian(&frac));
        assert!((back - frac).norm() < 1e-12);
    }

    #[test]
    fn scaling_to_volume_preserves_shape() {
        let lattice = Lattice::hexagonal(2.5, 4.1).unwrap();
        let scaled = lattice.scaled_to_volume(2.0 * lattice.volume()).unwrap();
        assert_close(scaled.volume(), 2.0 * lattice.volume());
        let ratio = scaled.abc()[0] / scaled.abc()[2];
        assert_close(ratio, 2.5 / 4.1);
        assert!(matches!(
            lattice.scaled_to_volume(-1.0),
            Err(LatticeError::InvalidVolume(_))
        ));
    }

    #[test]
    fn supercell_multiplies_volume_by_determinant() {
        let lattice = Lattice::cubic(2.0).unwrap();
        let diag = SupercellMatrix::Diagonal([2, 1, 3]);
        assert_eq!(diag.determinant(), 6);
        assert_close(lattice.supercell(&diag).unwrap().volume(), 48.0);

        let full = SupercellMatrix::Full([[1, 1, 0], [-1, 1, 0], [0, 0, 1]]);
        assert_eq!(full.determinant(), 2);
        let sc = lattice.supercell(&full).unwrap();
        assert_eq!(sc.vector(0), Vector3::new(2.0, 2.0, 0.0));
        assert_close(sc.volume(), 16.0);
    }

    #[test]
    fn supercell_with_non_positive_determinant_is_rejected() {
        let lattice = Lattice::cubic(2.0).unwrap();
        let flipped = SupercellMatrix::Diagonal([-1, 1, 1]);
        assert_eq!(
            lattice.supercell(&flipped),
            Err(LatticeError::InvalidSupercell(-1))
        );
    }

    #[test]
    fn supercell_matrix_deserializes_both_forms() {
        let diag: SupercellMatrix = serde_json::from_str("[2, 2, 2]").unwrap();
        assert_eq!(diag, SupercellMatrix::Diagonal([2, 2, 2]));
        let full: SupercellMatrix =
            serde_json::from_str("[[2, 1, 0], [0, 3, 0], [0, 0, 1]]").unwrap();
        assert_eq!(full.determinant(), 6);
    }

    #[test]
    fn lattice_serializes_as_rows() {
        let lattice = Lattice::from_rows([[3.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 4.0]]).unwrap();
        let json = serde_json::to_value(&lattice).unwrap();
        assert_eq!(json["matrix"][2][2], 4.0);
        let back: Lattice = serde_json::from_value(json).unwrap();
        assert_eq!(back, lattice);
    }
}

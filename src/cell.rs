use std::f64::consts::FRAC_PI_2;

use glam::{DMat3, DVec3};

/// Ångström per nanometer.
pub const ANGS_PER_NM: f64 = 10.0;
/// Square Ångström per square nanometer.
pub const ANGS2_PER_NM2: f64 = 100.0;

/// The box vectors as stored in a trajectory, in nanometers.
///
/// Each column is one box edge: `x_axis` is **a**, `y_axis` is **b**, `z_axis` is **c**.
pub type BoxVec = DMat3;

/// Create a [`BoxVec`] from nine basis components laid out as a{xyz} b{xyz} c{xyz}.
pub fn boxvec_from_components(xyz: &[f64; 9]) -> BoxVec {
    DMat3::from_cols_array(xyz)
}

/// Simulation cell as edge lengths (Å) and angles (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    /// Lengths of **a**, **b** and **c**.
    pub lengths: [f64; 3],
    /// The angles α (between **b** and **c**), β (**a** and **c**) and γ (**a** and **b**).
    pub angles: [f64; 3],
}

impl UnitCell {
    /// The cell reported when there is no (usable) box: zero lengths, right angles.
    pub const DEGENERATE: Self = Self {
        lengths: [0.0; 3],
        angles: [90.0; 3],
    };

    /// Reconstruct lengths and angles from the box vectors.
    ///
    /// If any of the edges has no length, the cell is [degenerate][`Self::DEGENERATE`].
    pub fn from_basis(boxvec: &BoxVec) -> Self {
        let [a, b, c] = [boxvec.x_axis, boxvec.y_axis, boxvec.z_axis];
        let lengths = [a, b, c].map(|edge| norm(edge) * ANGS_PER_NM);
        // Also catches NaN lengths.
        if !lengths.iter().all(|&l| l > 0.0) {
            return Self::DEGENERATE;
        }

        let [la, lb, lc] = lengths;
        let angle = |u: DVec3, v: DVec3, lu: f64, lv: f64| {
            let cos = dot(u, v) * ANGS2_PER_NM2 / (lu * lv);
            cos.clamp(-1.0, 1.0).acos() * 90.0 / FRAC_PI_2
        };
        let gamma = angle(a, b, la, lb);
        let beta = angle(a, c, la, lc);
        let alpha = angle(b, c, lb, lc);

        Self {
            lengths,
            angles: [alpha, beta, gamma],
        }
    }

    /// The cell as `[a, b, c, alpha, beta, gamma]`.
    pub fn to_array(&self) -> [f64; 6] {
        let [a, b, c] = self.lengths;
        let [alpha, beta, gamma] = self.angles;
        [a, b, c, alpha, beta, gamma]
    }

    pub fn is_degenerate(&self) -> bool {
        self.lengths.iter().all(|&l| l == 0.0)
    }
}

impl Default for UnitCell {
    fn default() -> Self {
        Self::DEGENERATE
    }
}

// Spelled out such that the order of operations is fixed.
#[inline]
fn dot(u: DVec3, v: DVec3) -> f64 {
    u.x * v.x + u.y * v.y + u.z * v.z
}

#[inline]
fn norm(u: DVec3) -> f64 {
    (u.x * u.x + u.y * u.y + u.z * u.z).sqrt()
}

use sheetness_volume::EigenvalueTriple;

use super::{BinaryFunctor, UnaryFunctor};

/// Degeneracy threshold on eigenvalue magnitudes and external references.
pub const EPS: f64 = f64::EPSILON;

/// Which sheets a functor responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SheetPolarity {
    /// Bright sheets on a dark background (cortical bone in CT).
    #[default]
    Bright,
    /// Dark sheets on a bright background.
    Dark,
}

impl SheetPolarity {
    /// Sign applied to the eigenvalue term: `-1` for bright sheets and `+1` for dark sheets.
    pub fn sign(&self) -> f64 {
        match self {
            SheetPolarity::Bright => -1.0,
            SheetPolarity::Dark => 1.0,
        }
    }

    /// Whether a dominant eigenvalue `a3` belongs to the other polarity: bright detection
    /// rejects `a3 > 0` and dark detection rejects `a3 < 0`.
    pub fn rejects(&self, a3: f64) -> bool {
        match self {
            SheetPolarity::Bright => a3 > 0.0,
            SheetPolarity::Dark => a3 < 0.0,
        }
    }
}

/// Denominator of the Gaussian terms `exp(-r² / (k a²))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExponentConvention {
    /// `k = 1`, as published by Krcah, Szekely and Blanc (ISBI 2011).
    Unit,
    /// `k = 2`, as published by Descoteaux, Audette, Chinzei and Siddiqi (MICCAI 2005).
    Half,
}

impl ExponentConvention {
    /// Evaluate `exp(-ratio² / (k scale²))`.
    #[inline]
    pub fn gaussian(&self, ratio: f64, scale: f64) -> f64 {
        let k = match self {
            ExponentConvention::Unit => 1.0,
            ExponentConvention::Half => 2.0,
        };
        (-(ratio * ratio) / (k * scale * scale)).exp()
    }
}

/// Sort eigenvalues by magnitude, keeping each sign with its magnitude.
///
/// Returns the signed eigenvalues and their magnitudes with `l1 <= l2 <= l3`. The sort is
/// stable: eigenvalues of equal magnitude keep their input order.
///
/// # Examples
///
/// ```
/// use sheetness_imgproc::functor::sort_by_magnitude;
///
/// let (a, l) = sort_by_magnitude(&[-3.0, 1.0, 2.0]);
///
/// assert_eq!(a, [1.0, 2.0, -3.0]);
/// assert_eq!(l, [1.0, 2.0, 3.0]);
/// ```
pub fn sort_by_magnitude(eigenvalues: &EigenvalueTriple) -> (EigenvalueTriple, [f64; 3]) {
    let mut a = *eigenvalues;
    for i in 1..3 {
        let mut j = i;
        while j > 0 && a[j - 1].abs() > a[j].abs() {
            a.swap(j - 1, j);
            j -= 1;
        }
    }
    (a, a.map(f64::abs))
}

// sign(a3) · G(Rsheet, α) · G(Rtube, β) · (1 - G(Rnoise, γ)), without the polarity sign
fn plate_response(
    eigenvalues: &EigenvalueTriple,
    reference: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
    convention: ExponentConvention,
) -> f64 {
    let ([_, _, a3], [l1, l2, l3]) = sort_by_magnitude(eigenvalues);

    if l3 < EPS || l2 < EPS || reference.abs() < EPS {
        return 0.0;
    }

    let r_sheet = l2 / l3;
    let r_tube = l1 / (l2 * l3);
    let r_noise = (l1 + l2 + l3) / reference;

    a3.signum()
        * convention.gaussian(r_sheet, alpha)
        * convention.gaussian(r_tube, beta)
        * (1.0 - convention.gaussian(r_noise, gamma))
}

fn magnitude_sum(eigenvalues: &EigenvalueTriple) -> f64 {
    eigenvalues.iter().map(|v| v.abs()).sum()
}

/// Descoteaux sheetness measure.
///
/// As a [`UnaryFunctor`] the noise reference is the local magnitude sum `l1 + l2 + l3`; as a
/// [`BinaryFunctor`] the reference is supplied by the second operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescoteauxSheetness {
    /// Sheet-versus-blob sensitivity.
    pub alpha: f64,
    /// Tube suppression.
    pub beta: f64,
    /// Noise normalization.
    pub gamma: f64,
    /// Which sheets produce a positive response.
    pub polarity: SheetPolarity,
    /// Exponent convention of the Gaussian terms.
    pub convention: ExponentConvention,
}

impl Default for DescoteauxSheetness {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.5,
            gamma: 0.5,
            polarity: SheetPolarity::Bright,
            convention: ExponentConvention::Half,
        }
    }
}

impl DescoteauxSheetness {
    /// Evaluate the measure with an explicit noise reference.
    pub fn evaluate(&self, eigenvalues: &EigenvalueTriple, reference: f64) -> f64 {
        self.polarity.sign()
            * plate_response(
                eigenvalues,
                reference,
                self.alpha,
                self.beta,
                self.gamma,
                self.convention,
            )
    }
}

impl UnaryFunctor<EigenvalueTriple, f64> for DescoteauxSheetness {
    fn call(&self, a: &EigenvalueTriple) -> f64 {
        self.evaluate(a, magnitude_sum(a))
    }
}

impl BinaryFunctor<EigenvalueTriple, f64, f64> for DescoteauxSheetness {
    fn call(&self, a: &EigenvalueTriple, reference: &f64) -> f64 {
        self.evaluate(a, *reference)
    }
}

/// Krcah sheetness measure with an external noise reference, typically the mean Hessian
/// trace.
///
/// Voxels whose dominant eigenvalue has the wrong polarity are gated to zero; the
/// surviving response carries the sign `-sign(a3)`.
///
/// # Examples
///
/// ```
/// use sheetness_imgproc::functor::KrcahSheetness;
///
/// let krcah = KrcahSheetness::default();
///
/// assert!(krcah.evaluate(&[0.1, 0.2, -3.0], 2.0) > 0.8);
/// assert_eq!(krcah.evaluate(&[0.1, 0.2, 3.0], 2.0), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KrcahSheetness {
    /// Sheet-versus-blob sensitivity.
    pub alpha: f64,
    /// Tube suppression.
    pub beta: f64,
    /// Noise normalization.
    pub gamma: f64,
    /// Which sheets produce a positive response.
    pub polarity: SheetPolarity,
    /// Exponent convention of the Gaussian terms.
    pub convention: ExponentConvention,
}

impl Default for KrcahSheetness {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.5,
            gamma: 0.25,
            polarity: SheetPolarity::Bright,
            convention: ExponentConvention::Unit,
        }
    }
}

impl KrcahSheetness {
    /// Evaluate the gated measure with the noise reference `reference`.
    pub fn evaluate(&self, eigenvalues: &EigenvalueTriple, reference: f64) -> f64 {
        let ([_, _, a3], _) = sort_by_magnitude(eigenvalues);
        if self.polarity.rejects(a3) {
            return 0.0;
        }

        -plate_response(
            eigenvalues,
            reference,
            self.alpha,
            self.beta,
            self.gamma,
            self.convention,
        )
    }
}

impl BinaryFunctor<EigenvalueTriple, f64, f64> for KrcahSheetness {
    fn call(&self, a: &EigenvalueTriple, reference: &f64) -> f64 {
        self.evaluate(a, *reference)
    }
}

/// Krcah sheetness tuned for femur segmentation.
///
/// The noise reference is the local magnitude sum, so the noise term is the constant
/// `1 - exp(-1 / γ²)`. Voxels whose dominant eigenvalue has the wrong polarity are gated
/// to zero: bright detection ignores `a3 > 0` and dark detection ignores `a3 < 0`. The
/// surviving response carries the sign `-sign(a3)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FemurSheetness {
    /// Sheet-versus-blob sensitivity.
    pub alpha: f64,
    /// Tube suppression.
    pub beta: f64,
    /// Noise normalization.
    pub gamma: f64,
    /// Which sheets pass the gate.
    pub polarity: SheetPolarity,
    /// Exponent convention of the Gaussian terms.
    pub convention: ExponentConvention,
}

impl Default for FemurSheetness {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.5,
            gamma: 0.25,
            polarity: SheetPolarity::Bright,
            convention: ExponentConvention::Unit,
        }
    }
}

impl FemurSheetness {
    /// Evaluate the gated measure.
    pub fn evaluate(&self, eigenvalues: &EigenvalueTriple) -> f64 {
        let ([_, _, a3], _) = sort_by_magnitude(eigenvalues);
        if self.polarity.rejects(a3) {
            return 0.0;
        }

        -plate_response(
            eigenvalues,
            magnitude_sum(eigenvalues),
            self.alpha,
            self.beta,
            self.gamma,
            self.convention,
        )
    }
}

impl UnaryFunctor<EigenvalueTriple, f64> for FemurSheetness {
    fn call(&self, a: &EigenvalueTriple) -> f64 {
        self.evaluate(a)
    }
}

/// Modified sheetness measure.
///
/// `polarity · (a3 / l3) · exp(-Rt² / (2α²)) · (1 - exp(-Rn² / (2C²)))` with
/// `Rt = l1 / sqrt(l2² + l3²)` and `Rn = sqrt(l1² + l2² + l3²)`. There is no sheet-ratio
/// term and only `l3` guards against degeneracy.
///
/// # Examples
///
/// ```
/// use sheetness_imgproc::functor::ModifiedSheetness;
///
/// let sheetness = ModifiedSheetness::default();
///
/// assert_eq!(sheetness.evaluate(&[0.0, 0.0, 0.0]), 0.0);
/// assert!((sheetness.evaluate(&[1.0, 0.0, 0.0]) + 0.3934693402873666).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModifiedSheetness {
    /// Tube suppression.
    pub alpha: f64,
    /// Noise normalization constant C.
    pub c: f64,
    /// Which sheets produce a positive response.
    pub polarity: SheetPolarity,
}

impl Default for ModifiedSheetness {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            c: 1.0,
            polarity: SheetPolarity::Bright,
        }
    }
}

impl ModifiedSheetness {
    /// Evaluate the measure.
    pub fn evaluate(&self, eigenvalues: &EigenvalueTriple) -> f64 {
        let ([_, _, a3], [l1, l2, l3]) = sort_by_magnitude(eigenvalues);

        if l3 < EPS {
            return 0.0;
        }

        let r_tube = l1 / (l2 * l2 + l3 * l3).sqrt();
        let r_noise = (l1 * l1 + l2 * l2 + l3 * l3).sqrt();

        self.polarity.sign()
            * (a3 / l3)
            * ExponentConvention::Half.gaussian(r_tube, self.alpha)
            * (1.0 - ExponentConvention::Half.gaussian(r_noise, self.c))
    }
}

impl UnaryFunctor<EigenvalueTriple, f64> for ModifiedSheetness {
    fn call(&self, a: &EigenvalueTriple) -> f64 {
        self.evaluate(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const PERMUTATIONS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    fn permute(e: [f64; 3], p: [usize; 3]) -> [f64; 3] {
        [e[p[0]], e[p[1]], e[p[2]]]
    }

    fn dark_modified() -> ModifiedSheetness {
        ModifiedSheetness {
            polarity: SheetPolarity::Dark,
            ..Default::default()
        }
    }

    #[test]
    fn test_sort_by_magnitude_is_stable() {
        let (a, l) = sort_by_magnitude(&[2.0, -2.0, 1.0]);
        assert_eq!(a, [1.0, 2.0, -2.0]);
        assert_eq!(l, [1.0, 2.0, 2.0]);

        let (a, _) = sort_by_magnitude(&[-2.0, 2.0, 1.0]);
        assert_eq!(a, [1.0, -2.0, 2.0]);
    }

    #[test]
    fn test_all_zero_is_zero() {
        let zero = [0.0; 3];
        assert_eq!(ModifiedSheetness::default().evaluate(&zero), 0.0);
        assert_eq!(FemurSheetness::default().evaluate(&zero), 0.0);
        assert_eq!(KrcahSheetness::default().evaluate(&zero, 1.0), 0.0);
        assert_eq!(DescoteauxSheetness::default().evaluate(&zero, 1.0), 0.0);
        assert_eq!(
            UnaryFunctor::call(&DescoteauxSheetness::default(), &zero),
            0.0
        );
    }

    #[test]
    fn test_modified_single_eigenvalue() {
        let bright = ModifiedSheetness::default();
        for p in PERMUTATIONS {
            let e = permute([1.0, 0.0, 0.0], p);
            assert_relative_eq!(bright.evaluate(&e), -0.3934693402873666, epsilon = 1e-15);
            assert_relative_eq!(dark_modified().evaluate(&e), 0.3934693402873666, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_modified_reference_values() {
        let bright = ModifiedSheetness::default();
        let cases = [
            ([1.0, 1.0, 0.0], -0.6321205588285578),
            ([2.0, 1.0, 1.0], -0.6369467760753132),
            ([-2.0, 1.0, 1.0], 0.6369467760753132),
            ([1.1, 1.0, 1.0], -0.32328095982825455),
            ([-1.1, 1.0, 1.0], 0.32328095982825455),
            ([1.0, 2.0, 3.0], -0.8566220679893631),
            ([1.0, 2.0, -3.0], 0.8566220679893631),
        ];
        for (e, expected) in cases {
            for p in PERMUTATIONS {
                let e = permute(e, p);
                assert_relative_eq!(bright.evaluate(&e), expected, epsilon = 1e-14);
                assert_relative_eq!(dark_modified().evaluate(&e), -expected, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_modified_parameters() {
        let e = [1.0, 2.0, 3.0];
        let with = |alpha: f64, c: f64| ModifiedSheetness {
            alpha,
            c,
            ..Default::default()
        };
        assert_relative_eq!(with(1.0, 1.0).evaluate(&e), -0.961391238876612, epsilon = 1e-14);
        assert_relative_eq!(with(2.5, 1.0).evaluate(&e), -0.9929587623609664, epsilon = 1e-14);
        assert_relative_eq!(with(0.5, 0.5).evaluate(&e), -0.8574039191598484, epsilon = 1e-14);
        assert_relative_eq!(with(0.5, 2.5).evaluate(&e), -0.5776503445077833, epsilon = 1e-14);
    }

    #[test]
    fn test_descoteaux_internal_and_external_reference() {
        let sheetness = DescoteauxSheetness::default();
        assert_relative_eq!(
            UnaryFunctor::call(&sheetness, &[1.0, 2.0, 3.0]),
            -0.33626427268727915,
            epsilon = 1e-14
        );
        assert_relative_eq!(
            UnaryFunctor::call(&sheetness, &[-0.1, -0.2, -3.0]),
            0.810699436300358,
            epsilon = 1e-14
        );
        assert_relative_eq!(
            BinaryFunctor::call(&sheetness, &[0.1, 0.2, -3.0], &1.0),
            0.9375882007226772,
            epsilon = 1e-14
        );
        assert_eq!(BinaryFunctor::call(&sheetness, &[0.1, 0.2, -3.0], &0.0), 0.0);
    }

    #[test]
    fn test_krcah_reference_values() {
        let krcah = KrcahSheetness::default();
        assert_relative_eq!(krcah.evaluate(&[0.1, 0.2, -3.0], 2.0), 0.8790716347454989, epsilon = 1e-14);
        assert_relative_eq!(krcah.evaluate(&[-0.5, -1.0, -2.0], 10.0), 0.24614818358815893, epsilon = 1e-14);

        // degenerate second eigenvalue
        assert_eq!(krcah.evaluate(&[0.0, 0.0, -5.0], 2.0), 0.0);

        let dark = KrcahSheetness {
            polarity: SheetPolarity::Dark,
            ..Default::default()
        };
        for p in PERMUTATIONS {
            let e = permute([-0.1, -0.2, 3.0], p);
            assert_relative_eq!(dark.evaluate(&e, 2.0), -0.8790716347454989, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_krcah_gating() {
        let bright = KrcahSheetness::default();
        let dark = KrcahSheetness {
            polarity: SheetPolarity::Dark,
            ..Default::default()
        };

        for p in PERMUTATIONS {
            // dark sheet seen by bright detection and the other way round
            assert_eq!(bright.evaluate(&permute([0.1, 0.2, 3.0], p), 2.0), 0.0);
            assert_eq!(bright.evaluate(&permute([-0.1, 0.2, 3.0], p), 2.0), 0.0);
            assert_eq!(bright.evaluate(&permute([0.5, 1.0, 2.0], p), 10.0), 0.0);
            assert_eq!(dark.evaluate(&permute([0.1, 0.2, -3.0], p), 2.0), 0.0);
        }

        // the gate never produces a response of the rejected sign
        for e in [[0.3, -1.0, 4.0], [2.0, -0.2, -5.0], [0.01, 0.02, 7.0]] {
            assert!(bright.evaluate(&e, 1.0) >= 0.0);
            assert!(dark.evaluate(&e, 1.0) <= 0.0);
        }
    }

    #[test]
    fn test_exponent_conventions_differ() {
        let unit = DescoteauxSheetness {
            convention: ExponentConvention::Unit,
            ..Default::default()
        };
        let half = DescoteauxSheetness::default();
        let e = [0.1, 0.2, -3.0];
        assert!(unit.evaluate(&e, 1.0) < half.evaluate(&e, 1.0));
        assert_relative_eq!(ExponentConvention::Unit.gaussian(1.0, 1.0), (-1.0f64).exp());
        assert_relative_eq!(ExponentConvention::Half.gaussian(1.0, 1.0), (-0.5f64).exp());
    }

    #[test]
    fn test_femur_gating() {
        let bright = FemurSheetness::default();
        assert_relative_eq!(bright.evaluate(&[0.1, 0.2, -3.0]), 0.8790715358190189, epsilon = 1e-14);
        assert_eq!(bright.evaluate(&[0.1, 0.2, 3.0]), 0.0);

        let dark = FemurSheetness {
            polarity: SheetPolarity::Dark,
            ..Default::default()
        };
        assert_eq!(dark.evaluate(&[0.1, 0.2, -3.0]), 0.0);
        assert_relative_eq!(dark.evaluate(&[0.1, 0.2, 3.0]), -0.8790715358190189, epsilon = 1e-14);
    }
}

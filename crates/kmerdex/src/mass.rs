use serde::{Deserialize, Serialize};

/// Weight assigned to the ambiguous residue codes `X` and `Z`
pub const AMBIGUOUS_WEIGHT: f64 = 0.0;

#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Tolerance {
    Ppm(f64, f64),
    Da(f64, f64),
}

impl Tolerance {
    /// Compute the (`lower`, `upper`) window (in Da) for a monoisotopic
    /// mass and a given tolerance
    pub fn bounds(&self, center: f64) -> (f64, f64) {
        match self {
            Tolerance::Ppm(lo, hi) => {
                let delta_lo = center * lo / 1_000_000.0;
                let delta_hi = center * hi / 1_000_000.0;
                (center + delta_lo, center + delta_hi)
            }
            Tolerance::Da(lo, hi) => (center + lo, center + hi),
        }
    }

    pub fn contains(&self, center: f64, rhs: f64) -> bool {
        let (lo, hi) = self.bounds(center);
        rhs >= lo && rhs <= hi
    }
}

/// Every residue code with a defined weight, including the ambiguous
/// codes `X` and `Z`
pub const VALID_CODES: [u8; 24] = [
    b'A', b'R', b'N', b'D', b'C', b'E', b'Q', b'G', b'H', b'I', b'L', b'K', b'M', b'F', b'P', b'S',
    b'T', b'U', b'W', b'Y', b'V', b'B', b'X', b'Z',
];

/// Monoisotopic residue weight for a single-letter amino acid code.
///
/// Returns `None` for any code outside [`VALID_CODES`]; callers decide how
/// to report it; a missing weight must never end up inside a window sum.
pub fn monoisotopic(code: u8) -> Option<f64> {
    let weight = match code {
        b'A' => 71.037114,
        b'R' => 156.101111,
        b'N' => 114.042927,
        b'D' => 115.026943,
        b'C' => 103.009185,
        b'E' => 129.042593,
        b'Q' => 128.058578,
        b'G' => 57.021464,
        b'H' => 137.058912,
        b'I' => 113.084064,
        b'L' => 113.084064,
        b'K' => 128.094963,
        b'M' => 131.040485,
        b'F' => 147.068414,
        b'P' => 97.052764,
        b'S' => 87.032028,
        b'T' => 101.047679,
        b'U' => 150.95363,
        b'W' => 186.079313,
        b'Y' => 163.06332,
        b'V' => 99.068414,
        // Asx is weighed as leucine/isoleucine
        b'B' => 113.084064,
        b'X' | b'Z' => AMBIGUOUS_WEIGHT,
        _ => return None,
    };
    Some(weight)
}

/// Round to two decimal places, based on the exact binary value of `x`:
/// `2.675` is stored as `2.67499..` and rounds down.
pub fn round2(x: f64) -> f64 {
    let scaled = x * 100.0;
    // Scaling can itself round onto a half (714.1949999999999 * 100 is
    // 71419.5), so values near a half take the exact decimal expansion
    if !scaled.is_finite() || (scaled.fract().abs() - 0.5).abs() > 1e-6 {
        return scaled.round() / 100.0;
    }
    format!("{:.2}", x).parse().unwrap_or(x)
}

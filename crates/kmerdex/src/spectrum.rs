use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Abundance given to the synthetic fragment derived from a precursor: it
/// marks "not an observed intensity"
pub const PRECURSOR_ABUNDANCE: f64 = 999999.0;

/// An observed spectrometer peak
#[derive(PartialEq, PartialOrd, Copy, Clone, Default, Debug, Serialize, Deserialize)]
pub struct Fragment {
    pub weight: f64,
    pub abundance: f64,
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Precursor {
    pub id: String,
    pub precursor_weight: f64,
    pub precursor_charge: u8,
    pub fragments: Vec<Fragment>,
}

/// A scan as produced by a spectrum file reader, before validation
#[derive(Clone, Default, Debug, PartialEq)]
pub struct RawScan {
    pub id: String,
    pub ms_level: u8,
    /// Selected precursor m/z, if the scan has a precursor
    pub precursor_mz: Option<f64>,
    pub precursor_charge: Option<u8>,
    /// M/z array
    pub mz: Vec<f64>,
    /// Intensity array, same length as `mz`
    pub intensity: Vec<f64>,
}

impl TryFrom<RawScan> for Precursor {
    type Error = Error;

    fn try_from(scan: RawScan) -> Result<Self> {
        let malformed = |reason| Error::MalformedSpectrum {
            id: scan.id.clone(),
            reason,
        };
        let precursor_weight = scan.precursor_mz.ok_or_else(|| malformed("missing precursor m/z"))?;
        let precursor_charge = scan
            .precursor_charge
            .ok_or_else(|| malformed("missing precursor charge"))?;
        if scan.mz.len() != scan.intensity.len() {
            return Err(malformed("m/z and intensity arrays differ in length"));
        }

        let fragments = scan
            .mz
            .iter()
            .zip(scan.intensity.iter())
            .map(|(&weight, &abundance)| Fragment { weight, abundance })
            .collect();

        Ok(Precursor {
            id: scan.id,
            precursor_weight,
            precursor_charge,
            fragments,
        })
    }
}

/// Fragments to query for a given charge amount: for every precursor, a
/// synthetic fragment at `precursor_weight * charge_amount` followed by each
/// observed fragment with its weight scaled by `charge_amount`
pub fn charge_adjusted_fragments(precursors: &[Precursor], charge_amount: u8) -> Vec<Fragment> {
    let scale = charge_amount as f64;
    let mut fragments =
        Vec::with_capacity(precursors.iter().map(|p| p.fragments.len() + 1).sum());
    for precursor in precursors {
        fragments.push(Fragment {
            weight: precursor.precursor_weight * scale,
            abundance: PRECURSOR_ABUNDANCE,
        });
        fragments.extend(precursor.fragments.iter().map(|fragment| Fragment {
            weight: fragment.weight * scale,
            abundance: fragment.abundance,
        }));
    }
    fragments
}

/// Fragment count statistics over a run
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct PrecursorSummary {
    pub precursors: usize,
    pub total_fragments: usize,
    pub average_fragments: f64,
    pub lowest_fragments: usize,
    pub highest_fragments: usize,
}

impl From<&[Precursor]> for PrecursorSummary {
    fn from(precursors: &[Precursor]) -> Self {
        if precursors.is_empty() {
            return PrecursorSummary::default();
        }
        let counts = precursors.iter().map(|p| p.fragments.len());
        let total_fragments = counts.clone().sum::<usize>();
        PrecursorSummary {
            precursors: precursors.len(),
            total_fragments,
            average_fragments: total_fragments as f64 / precursors.len() as f64,
            lowest_fragments: counts.clone().min().unwrap_or_default(),
            highest_fragments: counts.max().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn precursor(id: &str, weight: f64, peaks: &[(f64, f64)]) -> Precursor {
        Precursor {
            id: id.into(),
            precursor_weight: weight,
            precursor_charge: 2,
            fragments: peaks
                .iter()
                .map(|&(weight, abundance)| Fragment { weight, abundance })
                .collect(),
        }
    }

    #[test]
    fn synthetic_precursor_fragment_first() {
        let precursors = vec![
            precursor("scan=1", 500.0, &[(100.5, 20.0), (250.25, 35.0)]),
            precursor("scan=2", 321.0, &[(75.0, 1.0)]),
        ];
        let fragments = charge_adjusted_fragments(&precursors, 2);
        assert_eq!(
            fragments,
            vec![
                Fragment {
                    weight: 1000.0,
                    abundance: 999999.0
                },
                Fragment {
                    weight: 201.0,
                    abundance: 20.0
                },
                Fragment {
                    weight: 500.5,
                    abundance: 35.0
                },
                Fragment {
                    weight: 642.0,
                    abundance: 999999.0
                },
                Fragment {
                    weight: 150.0,
                    abundance: 1.0
                },
            ]
        );

        let unscaled = charge_adjusted_fragments(&precursors, 1);
        assert_eq!(unscaled[0].weight, 500.0);
        assert_eq!(unscaled[2], precursors[0].fragments[1]);
    }

    #[test]
    fn raw_scan_conversion() -> Result<()> {
        let scan = RawScan {
            id: "17".into(),
            ms_level: 2,
            precursor_mz: Some(445.12),
            precursor_charge: Some(3),
            mz: vec![110.0, 120.5],
            intensity: vec![5.0, 7.5],
        };
        let precursor = Precursor::try_from(scan)?;
        assert_eq!(precursor.id, "17");
        assert_eq!(precursor.precursor_weight, 445.12);
        assert_eq!(precursor.precursor_charge, 3);
        assert_eq!(
            precursor.fragments[1],
            Fragment {
                weight: 120.5,
                abundance: 7.5
            }
        );
        Ok(())
    }

    #[test]
    fn malformed_scans() {
        let base = RawScan {
            id: "9".into(),
            ms_level: 2,
            precursor_mz: Some(445.12),
            precursor_charge: Some(2),
            mz: vec![1.0],
            intensity: vec![1.0],
        };

        let missing_mz = RawScan {
            precursor_mz: None,
            ..base.clone()
        };
        let missing_charge = RawScan {
            precursor_charge: None,
            ..base.clone()
        };
        let ragged = RawScan {
            intensity: vec![],
            ..base.clone()
        };
        for scan in [missing_mz, missing_charge, ragged] {
            assert!(matches!(
                Precursor::try_from(scan),
                Err(Error::MalformedSpectrum { ref id, .. }) if id == "9"
            ));
        }
        assert!(Precursor::try_from(base).is_ok());
    }

    #[test]
    fn summary() {
        let precursors = vec![
            precursor("a", 1.0, &[(1.0, 1.0)]),
            precursor("b", 1.0, &[(1.0, 1.0), (2.0, 1.0), (3.0, 1.0)]),
        ];
        let summary = PrecursorSummary::from(precursors.as_slice());
        assert_eq!(summary.precursors, 2);
        assert_eq!(summary.total_fragments, 4);
        assert_eq!(summary.average_fragments, 2.0);
        assert_eq!(summary.lowest_fragments, 1);
        assert_eq!(summary.highest_fragments, 3);
        assert_eq!(PrecursorSummary::from(&[] as &[Precursor]), PrecursorSummary::default());
    }
}

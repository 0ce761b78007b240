//! Query every charge-adjusted fragment against a peptide match service

use crate::error::{Error, LookupError, Result};
use crate::spectrum::{charge_adjusted_fragments, Fragment, Precursor};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fragmentation series used to interpret a fragment mass
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IonCharge {
    B,
    Y,
}

impl std::fmt::Display for IonCharge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IonCharge::B => f.write_str("B"),
            IonCharge::Y => f.write_str("Y"),
        }
    }
}

impl std::str::FromStr for IonCharge {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "B" | "b" => Ok(IonCharge::B),
            "Y" | "y" => Ok(IonCharge::Y),
            _ => Err(format!("unknown ion charge `{}`, expected `B` or `Y`", s)),
        }
    }
}

/// A match returned by the lookup service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMatch {
    #[serde(rename = "ProteinName")]
    pub protein_name: String,
    #[serde(rename = "StartIndex")]
    pub start_index: usize,
    #[serde(rename = "KMers", default)]
    pub kmers: BTreeMap<String, serde_json::Value>,
}

/// Lookup results for one fragment under one (ion charge, charge amount)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FragmentReferenceMatches {
    pub ion_charge: IonCharge,
    pub charge_amount: u8,
    pub fragment: Fragment,
    pub matches: Vec<ReferenceMatch>,
}

/// A stateless, idempotent weight lookup
pub trait MatchService: Send + Sync {
    fn lookup(
        &self,
        weight: f64,
        ion_charge: IonCharge,
        ppm_tolerance: f64,
    ) -> std::result::Result<Vec<ReferenceMatch>, LookupError>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Execution {
    Sequential,
    /// Fixed-size worker pool, each worker issuing one request at a time
    Parallel { workers: usize },
}

#[derive(Debug)]
pub struct FailedLookup {
    pub ion_charge: IonCharge,
    pub charge_amount: u8,
    pub fragment: Fragment,
    pub error: LookupError,
}

impl From<FailedLookup> for Error {
    fn from(failed: FailedLookup) -> Self {
        Error::Lookup {
            weight: failed.fragment.weight,
            ion_charge: failed.ion_charge,
            source: failed.error,
        }
    }
}

/// Results for every fragment under one (ion charge, charge amount) pair
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChargeSet {
    pub ion_charge: IonCharge,
    pub charge_amount: u8,
    pub results: Vec<FragmentReferenceMatches>,
}

#[derive(Debug, Default)]
pub struct FanoutResults {
    pub sets: Vec<ChargeSet>,
    pub failures: Vec<FailedLookup>,
}

impl FanoutResults {
    /// Number of fragments that were successfully looked up
    pub fn len(&self) -> usize {
        self.sets.iter().map(|set| set.results.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reference matches per protein, least frequent first (ties by name)
    pub fn protein_counts(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for reference in self
            .sets
            .iter()
            .flat_map(|set| set.results.iter())
            .flat_map(|result| result.matches.iter())
        {
            *counts.entry(reference.protein_name.as_str()).or_default() += 1;
        }
        let mut counts = counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect::<Vec<_>>();
        // Stable sort keeps the name order within equal counts
        counts.sort_by_key(|(_, count)| *count);
        counts
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Fanout {
    pub ion_charges: Vec<IonCharge>,
    pub charge_amounts: Vec<u8>,
    pub ppm_tolerance: f64,
    pub execution: Execution,
    /// Stop at the first failed lookup instead of recording it and moving on
    pub fail_fast: bool,
}

impl Default for Fanout {
    fn default() -> Self {
        Self {
            ion_charges: vec![IonCharge::B, IonCharge::Y],
            charge_amounts: vec![1, 2],
            ppm_tolerance: 0.01,
            execution: Execution::Parallel { workers: 16 },
            fail_fast: false,
        }
    }
}

impl Fanout {
    fn lookup<S: MatchService + ?Sized>(
        &self,
        service: &S,
        ion_charge: IonCharge,
        charge_amount: u8,
        fragment: &Fragment,
    ) -> std::result::Result<FragmentReferenceMatches, FailedLookup> {
        match service.lookup(fragment.weight, ion_charge, self.ppm_tolerance) {
            Ok(matches) => Ok(FragmentReferenceMatches {
                ion_charge,
                charge_amount,
                fragment: *fragment,
                matches,
            }),
            Err(error) => Err(FailedLookup {
                ion_charge,
                charge_amount,
                fragment: *fragment,
                error,
            }),
        }
    }

    /// Look up every charge-adjusted fragment of `precursors`, for every
    /// configured (ion charge, charge amount) pair. All requests are
    /// finished before this returns.
    pub fn run<S: MatchService + ?Sized>(
        &self,
        service: &S,
        precursors: &[Precursor],
    ) -> Result<FanoutResults> {
        let pool = match self.execution {
            Execution::Sequential => None,
            Execution::Parallel { workers } => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(workers.max(1))
                    .thread_name(|idx| format!("kmerdex-lookup-{}", idx))
                    .build()?,
            ),
        };

        let mut output = FanoutResults::default();
        for &ion_charge in &self.ion_charges {
            for &charge_amount in &self.charge_amounts {
                let fragments = charge_adjusted_fragments(precursors, charge_amount);
                log::trace!(
                    "looking up {} fragments ({} ions, charge amount {})",
                    fragments.len(),
                    ion_charge,
                    charge_amount
                );

                let lookup = |fragment: &Fragment| {
                    self.lookup(service, ion_charge, charge_amount, fragment)
                };

                let results = if self.fail_fast {
                    let results = match &pool {
                        Some(pool) => pool.install(|| {
                            fragments
                                .par_iter()
                                .map(&lookup)
                                .collect::<std::result::Result<Vec<_>, _>>()
                        }),
                        None => fragments
                            .iter()
                            .map(&lookup)
                            .collect::<std::result::Result<Vec<_>, _>>(),
                    };
                    results.map_err(Error::from)?
                } else {
                    let outcomes = match &pool {
                        Some(pool) => {
                            pool.install(|| fragments.par_iter().map(&lookup).collect::<Vec<_>>())
                        }
                        None => fragments.iter().map(&lookup).collect::<Vec<_>>(),
                    };
                    let mut results = Vec::with_capacity(outcomes.len());
                    for outcome in outcomes {
                        match outcome {
                            Ok(result) => results.push(result),
                            Err(failed) => {
                                log::warn!(
                                    "lookup of weight {} ({} ions) failed: {}",
                                    failed.fragment.weight,
                                    failed.ion_charge,
                                    failed.error
                                );
                                output.failures.push(failed);
                            }
                        }
                    }
                    results
                };

                output.sets.push(ChargeSet {
                    ion_charge,
                    charge_amount,
                    results,
                });
            }
        }
        Ok(output)
    }
}

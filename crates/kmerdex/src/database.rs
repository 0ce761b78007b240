use crate::error::{Error, Result};
use crate::fasta::Fasta;
use crate::mass::Tolerance;
use crate::protein::Protein;
use crate::window::complete_windows;
use fnv::FnvHashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::sync::Arc;

#[derive(Deserialize, Serialize, Default, Clone, Debug)]
/// Parameters used for generating the k-mer weight database
pub struct Builder {
    /// Number of consecutive residues summed into each window
    pub kmer_length: Option<usize>,
    /// Abort the whole build on the first protein with an unknown residue,
    /// instead of skipping that protein
    pub strict: Option<bool>,
    /// Path to fasta database
    pub fasta: Option<String>,
}

impl Builder {
    pub fn make_parameters(self) -> Result<Parameters> {
        let kmer_length = self.kmer_length.unwrap_or(9);
        if kmer_length == 0 {
            return Err(Error::InvalidKmerLength);
        }
        Ok(Parameters {
            kmer_length,
            strict: self.strict.unwrap_or(false),
            fasta: self.fasta,
        })
    }

    pub fn update_fasta(&mut self, fasta: String) {
        self.fasta = Some(fasta)
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Parameters {
    pub kmer_length: usize,
    pub strict: bool,
    pub fasta: Option<String>,
}

/// One complete k-mer window of one protein
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProteinMatch {
    pub protein_name: Arc<str>,
    /// Window weight, rounded to two decimal places
    pub weight: f64,
    /// 0-based, inclusive
    pub start_index: usize,
    /// Exclusive, always `start_index + kmer_length`
    pub end_index: usize,
}

/// All windows sharing exactly the same rounded weight, in discovery order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightBucket {
    pub weight: f64,
    pub matches: Vec<ProteinMatch>,
}

/// Emit one [`ProteinMatch`] per complete window of `protein`.
///
/// Proteins shorter than `kmer_length` produce nothing.
pub fn protein_matches(protein: &Protein, kmer_length: usize) -> Vec<ProteinMatch> {
    let name: Arc<str> = Arc::from(protein.name.as_str());
    complete_windows(&protein.weights(), kmer_length)
        .map(|(start_index, weight)| ProteinMatch {
            protein_name: name.clone(),
            weight,
            start_index,
            end_index: start_index + kmer_length,
        })
        .collect()
}

// Weights are already rounded, so bit equality is exact float equality;
// the only two equal floats with distinct bits are the two zeroes.
fn weight_key(weight: f64) -> u64 {
    if weight == 0.0 {
        0.0f64.to_bits()
    } else {
        weight.to_bits()
    }
}

/// Groups matches into [`WeightBucket`]s, keeping buckets in the order their
/// weight was first seen and matches in the order they were pushed
#[derive(Default, Debug)]
pub struct BucketBuilder {
    buckets: Vec<WeightBucket>,
    index: FnvHashMap<u64, usize>,
}

impl BucketBuilder {
    pub fn push(&mut self, protein_match: ProteinMatch) {
        match self.index.entry(weight_key(protein_match.weight)) {
            Entry::Occupied(entry) => self.buckets[*entry.get()].matches.push(protein_match),
            Entry::Vacant(entry) => {
                entry.insert(self.buckets.len());
                self.buckets.push(WeightBucket {
                    weight: protein_match.weight,
                    matches: vec![protein_match],
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn finish(self) -> Vec<WeightBucket> {
        self.buckets
    }
}

impl Extend<ProteinMatch> for BucketBuilder {
    fn extend<I: IntoIterator<Item = ProteinMatch>>(&mut self, iter: I) {
        for protein_match in iter {
            self.push(protein_match);
        }
    }
}

impl FromIterator<ProteinMatch> for BucketBuilder {
    fn from_iter<I: IntoIterator<Item = ProteinMatch>>(iter: I) -> Self {
        let mut builder = BucketBuilder::default();
        builder.extend(iter);
        builder
    }
}

/// Group a flat, ordered sequence of matches by weight
pub fn group_matches<I>(matches: I) -> Vec<WeightBucket>
where
    I: IntoIterator<Item = ProteinMatch>,
{
    matches.into_iter().collect::<BucketBuilder>().finish()
}

/// A FASTA entry that could not be converted into masses
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedProtein {
    pub description: String,
    pub reason: String,
}

impl Parameters {
    pub fn build(&self, fasta: &Fasta) -> Result<IndexedDatabase> {
        log::trace!("windowing {} proteins", fasta.len());
        let kmer_length = self.kmer_length;

        // Each protein is independent, so conversion and windowing run in
        // parallel; results stay in file order
        let partials = fasta
            .entries
            .par_iter()
            .map(|(description, sequence)| {
                Protein::from_fasta_entry(description, sequence)
                    .map(|protein| protein_matches(&protein, kmer_length))
            })
            .collect::<Vec<_>>();

        log::trace!("grouping windows by weight");
        let mut builder = BucketBuilder::default();
        let mut skipped = Vec::new();
        for (partial, (description, _)) in partials.into_iter().zip(fasta.entries.iter()) {
            match partial {
                Ok(matches) => builder.extend(matches),
                Err(err) if self.strict => return Err(err),
                Err(err) => {
                    log::warn!("skipping protein: {}", err);
                    skipped.push(SkippedProtein {
                        description: description.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let mut database = IndexedDatabase::from_buckets(kmer_length, builder.finish());
        database.skipped = skipped;
        Ok(database)
    }
}

#[derive(Debug, Clone)]
pub struct IndexedDatabase {
    pub kmer_length: usize,
    /// Buckets in first-seen weight order, as persisted
    pub buckets: Vec<WeightBucket>,
    /// Number of distinct protein names with at least one window. Derived
    /// from the buckets alone, so a reloaded index reports the same count
    pub proteins: usize,
    pub skipped: Vec<SkippedProtein>,
    /// Indices into `buckets`, sorted by weight
    by_weight: Vec<usize>,
}

impl IndexedDatabase {
    pub fn from_buckets(kmer_length: usize, buckets: Vec<WeightBucket>) -> Self {
        let mut by_weight = (0..buckets.len()).collect::<Vec<_>>();
        by_weight.sort_unstable_by(|&a, &b| buckets[a].weight.total_cmp(&buckets[b].weight));
        let proteins = buckets
            .iter()
            .flat_map(|bucket| bucket.matches.iter().map(|m| &m.protein_name))
            .collect::<std::collections::HashSet<_>>()
            .len();
        IndexedDatabase {
            kmer_length,
            buckets,
            proteins,
            skipped: Vec::new(),
            by_weight,
        }
    }

    /// Total number of windows across all buckets
    pub fn size(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.matches.len()).sum()
    }

    /// All buckets whose weight lies within `tolerance` of `weight`,
    /// in ascending weight order
    pub fn query(
        &self,
        weight: f64,
        tolerance: Tolerance,
    ) -> impl Iterator<Item = &WeightBucket> + '_ {
        let (lo, hi) = tolerance.bounds(weight);
        let (left, right) = binary_search_slice(
            &self.by_weight,
            |&ix, bound| self.buckets[ix].weight.total_cmp(bound),
            lo,
            hi,
        );
        self.by_weight[left..right]
            .iter()
            .map(move |&ix| &self.buckets[ix])
            .filter(move |bucket| tolerance.contains(weight, bucket.weight))
    }
}

/// Return the widest `left` and `right` indices into a `slice` (sorted by the
/// function `key`) such that all values between `low` and `high` are
/// contained in `slice[left..right]`
///
/// # Invariants
///
/// * `slice[left] <= low || left == 0`
/// * `slice[right] <= high && (slice[right+1] > high || right == slice.len())`
/// * `0 <= left <= right <= slice.len()`
#[inline]
pub fn binary_search_slice<T, F, S>(slice: &[T], key: F, low: S, high: S) -> (usize, usize)
where
    F: Fn(&T, &S) -> Ordering,
{
    let left_idx = match slice.binary_search_by(|a| key(a, &low)) {
        Ok(idx) | Err(idx) => {
            let mut idx = idx.saturating_sub(1);
            while idx > 0 && key(&slice[idx], &low) != Ordering::Less {
                idx -= 1;
            }
            idx
        }
    };

    let right_idx = match slice[left_idx..].binary_search_by(|a| key(a, &high)) {
        Ok(idx) | Err(idx) => {
            let mut idx = idx + left_idx;
            while idx < slice.len() && key(&slice[idx], &high) != Ordering::Greater {
                idx = idx.saturating_add(1);
            }
            idx.min(slice.len())
        }
    };
    (left_idx, right_idx)
}

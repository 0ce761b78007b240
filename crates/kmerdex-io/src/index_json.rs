//! JSON serialization for IndexedDatabase
//!
//! The index is a single array of weight buckets, in first-seen order:
//! `[{"weight": 174.05, "matches": [{"protein_name": .., "weight": ..,
//! "start_index": .., "end_index": ..}]}]`

use crate::Error;
use kmerdex_core::database::{IndexedDatabase, WeightBucket};
use std::path::{Path, PathBuf};

pub fn index_file_name(kmer_length: usize) -> String {
    format!("all_weight_protein_matches_kmer{}.json", kmer_length)
}

/// Write the index into `dir`, returning the path of the written file
pub fn serialize_index(db: &IndexedDatabase, dir: &Path) -> Result<PathBuf, Error> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(index_file_name(db.kmer_length));
    crate::write_json(&path, &db.buckets)?;
    Ok(path)
}

pub fn deserialize_index(path: &Path, kmer_length: usize) -> Result<IndexedDatabase, Error> {
    let buckets: Vec<WeightBucket> = crate::read_json(path)?;
    Ok(IndexedDatabase::from_buckets(kmer_length, buckets))
}

#[derive(Debug)]
pub enum ValidationError {
    BucketCountMismatch { expected: usize, actual: usize },
    BucketMismatch { index: usize, field: &'static str },
    MatchMismatch { bucket: usize, index: usize, field: &'static str },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BucketCountMismatch { expected, actual } => {
                write!(f, "bucket count: expected {expected}, got {actual}")
            }
            Self::BucketMismatch { index, field } => write!(f, "bucket[{index}].{field} mismatch"),
            Self::MatchMismatch {
                bucket,
                index,
                field,
            } => write!(f, "bucket[{bucket}].matches[{index}].{field} mismatch"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check that a reloaded index is identical, bit for bit, to the one that
/// was written
pub fn validate_index(a: &IndexedDatabase, b: &IndexedDatabase) -> Result<(), ValidationError> {
    macro_rules! check {
        ($cond:expr, $err:expr) => {
            if $cond {
                return Err($err);
            }
        };
    }

    check!(
        a.buckets.len() != b.buckets.len(),
        ValidationError::BucketCountMismatch {
            expected: a.buckets.len(),
            actual: b.buckets.len()
        }
    );

    for (i, (o, l)) in a.buckets.iter().zip(&b.buckets).enumerate() {
        check!(
            o.weight.to_bits() != l.weight.to_bits(),
            ValidationError::BucketMismatch {
                index: i,
                field: "weight"
            }
        );
        check!(
            o.matches.len() != l.matches.len(),
            ValidationError::BucketMismatch {
                index: i,
                field: "matches"
            }
        );
        for (j, (om, lm)) in o.matches.iter().zip(&l.matches).enumerate() {
            check!(
                om.protein_name != lm.protein_name,
                ValidationError::MatchMismatch {
                    bucket: i,
                    index: j,
                    field: "protein_name"
                }
            );
            check!(
                om.weight.to_bits() != lm.weight.to_bits(),
                ValidationError::MatchMismatch {
                    bucket: i,
                    index: j,
                    field: "weight"
                }
            );
            check!(
                om.start_index != lm.start_index || om.end_index != lm.end_index,
                ValidationError::MatchMismatch {
                    bucket: i,
                    index: j,
                    field: "position"
                }
            );
        }
    }
    Ok(())
}

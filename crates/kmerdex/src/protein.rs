use crate::error::{Error, Result};
use crate::mass::monoisotopic;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AminoAcid {
    pub code: u8,
    pub weight: f64,
}

impl AminoAcid {
    pub fn new(code: u8) -> Option<Self> {
        monoisotopic(code).map(|weight| AminoAcid { code, weight })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Protein {
    pub name: String,
    pub residues: Vec<AminoAcid>,
}

/// Protein name from a pipe-delimited FASTA description: the token after
/// the last `|`, up to the first whitespace.
///
/// ```
/// use kmerdex_core::protein::extract_protein_name;
/// assert_eq!(
///     extract_protein_name("sp|P01308|INS_HUMAN Insulin OS=Homo sapiens"),
///     "INS_HUMAN"
/// );
/// ```
pub fn extract_protein_name(description: &str) -> &str {
    let tail = match description.rfind('|') {
        Some(idx) => &description[idx + 1..],
        None => description,
    };
    tail.split_whitespace().next().unwrap_or_default()
}

impl Protein {
    /// Convert a residue sequence into per-residue masses.
    ///
    /// Fails on the first code outside the weight table.
    pub fn new<S: Into<String>>(name: S, sequence: &str) -> Result<Self> {
        let name = name.into();
        let residues = sequence
            .bytes()
            .enumerate()
            .map(|(position, code)| {
                AminoAcid::new(code).ok_or_else(|| Error::UnknownResidue {
                    protein: name.clone(),
                    code: code as char,
                    position,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Protein { name, residues })
    }

    pub fn from_fasta_entry(description: &str, sequence: &str) -> Result<Self> {
        Self::new(extract_protein_name(description), sequence)
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.residues.iter().map(|aa| aa.weight).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn protein_names() {
        assert_eq!(extract_protein_name("sp|Q99536|VAT1_HUMAN Synaptic"), "VAT1_HUMAN");
        assert_eq!(extract_protein_name("tr|A0A000|TEST_MOUSE"), "TEST_MOUSE");
        assert_eq!(extract_protein_name("PLAIN description here"), "PLAIN");
        assert_eq!(extract_protein_name("sp|A|B|C\tD"), "C");
        assert_eq!(extract_protein_name(""), "");
        assert_eq!(extract_protein_name("sp|"), "");
    }

    #[test]
    fn conversion_preserves_order() -> Result<()> {
        let protein = Protein::new("TEST", "ACXZU")?;
        assert_eq!(protein.len(), 5);
        assert_eq!(
            protein.residues.iter().map(|aa| aa.code).collect::<Vec<_>>(),
            b"ACXZU".to_vec()
        );
        assert_eq!(
            protein.weights(),
            vec![71.037114, 103.009185, 0.0, 0.0, 150.95363]
        );
        Ok(())
    }

    #[test]
    fn unknown_residue_is_an_error() {
        match Protein::new("BROKEN", "ACOG") {
            Err(Error::UnknownResidue {
                protein,
                code,
                position,
            }) => {
                assert_eq!(protein, "BROKEN");
                assert_eq!(code, 'O');
                assert_eq!(position, 2);
            }
            other => panic!("expected unknown residue error, got {:?}", other),
        }
    }

    #[test]
    fn empty_sequence() -> Result<()> {
        let protein = Protein::from_fasta_entry("sp|X|EMPTY", "")?;
        assert_eq!(protein.name, "EMPTY");
        assert!(protein.is_empty());
        Ok(())
    }
}

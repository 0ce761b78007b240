use crate::fanout::IonCharge;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("protein `{protein}` contains unknown residue `{code}` at position {position}")]
    UnknownResidue {
        protein: String,
        code: char,
        position: usize,
    },
    #[error("k-mer length must be greater than zero")]
    InvalidKmerLength,
    #[error("malformed spectrum `{id}`: {reason}")]
    MalformedSpectrum { id: String, reason: &'static str },
    #[error("lookup of weight {weight} ({ion_charge} ions) failed: {source}")]
    Lookup {
        weight: f64,
        ion_charge: IonCharge,
        #[source]
        source: LookupError,
    },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Failure of a single request against a [`crate::fanout::MatchService`]
#[derive(thiserror::Error, Debug)]
pub enum LookupError {
    #[error("network failure: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("service responded with status {status}")]
    Status { status: u16 },
    #[error("malformed service response: {0}")]
    Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

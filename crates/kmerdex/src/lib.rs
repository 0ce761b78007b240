pub mod database;
pub mod error;
pub mod fanout;
pub mod fasta;
pub mod mass;
pub mod protein;
pub mod spectrum;
pub mod window;

pub use error::{Error, LookupError, Result};

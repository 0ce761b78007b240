use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use kmerdex_core::fasta::Fasta;
use kmerdex_core::spectrum::Precursor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

pub mod index_json;
pub mod mzxml;
pub mod service;

/// Does the path end in "gz" or "gzip"?
fn gzip_heuristic(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => ext.to_ascii_lowercase() == "gz" || ext.to_ascii_lowercase() == "gzip",
        _ => false,
    }
}

/// Open a buffered reader, transparently decompressing gzipped files
pub fn open<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead + Send>, Error> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.display().to_string(),
        source,
    })?;
    match gzip_heuristic(path) {
        true => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        false => Ok(Box::new(BufReader::new(file))),
    }
}

pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String, Error> {
    let mut contents = String::new();
    open(path)?.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Write `bytes` to `path`, gzip compressing them if the path asks for it
pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), Error> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| Error::Open {
        path: path.display().to_string(),
        source,
    })?;
    let mut wtr = BufWriter::new(file);
    match gzip_heuristic(path) {
        true => {
            let mut gz = GzEncoder::new(wtr, Compression::default());
            gz.write_all(bytes)?;
            gz.finish()?.flush()?;
        }
        false => {
            wtr.write_all(bytes)?;
            wtr.flush()?;
        }
    }
    Ok(())
}

pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, Error> {
    Ok(serde_json::from_reader(open(path)?)?)
}

pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(path: P, value: &T) -> Result<(), Error> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes(path, &bytes)
}

pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<Fasta, Error> {
    let contents = read_to_string(path)?;
    Ok(Fasta::parse(contents))
}

/// Read every scan of `ms_level` from an mzXML file and validate it into a
/// [`Precursor`]
pub fn read_mzxml<P: AsRef<Path>>(path: P, ms_level: u8) -> Result<Vec<Precursor>, Error> {
    let path = path.as_ref();
    let scans = mzxml::MzXmlReader::with_level_filter(ms_level).parse(open(path)?)?;
    log::trace!("{}: read {} scans", path.display(), scans.len());
    let precursors = scans
        .into_iter()
        .map(Precursor::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(precursors)
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to open `{path}`: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("mzXML error: {0}")]
    MzXml(#[from] mzxml::MzXmlError),
    #[error(transparent)]
    Core(#[from] kmerdex_core::Error),
}

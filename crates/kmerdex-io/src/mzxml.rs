use flate2::read::ZlibDecoder;
use kmerdex_core::spectrum::RawScan;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufRead, Read};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// Which tag are we collecting text for?
enum State {
    PrecursorMz,
    Peaks,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct PeakEncoding {
    precision: usize,
    big_endian: bool,
    zlib: bool,
}

impl Default for PeakEncoding {
    fn default() -> Self {
        Self {
            precision: 32,
            big_endian: true,
            zlib: false,
        }
    }
}

#[derive(Default)]
pub struct MzXmlReader {
    ms_level: Option<u8>,
}

fn attribute(ev: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, MzXmlError> {
    match ev.try_get_attribute(key)? {
        Some(attr) => Ok(Some(std::str::from_utf8(&attr.value)?.to_string())),
        None => Ok(None),
    }
}

impl MzXmlReader {
    /// Create a new [`MzXmlReader`] that only returns scans of one MS level
    ///
    /// # Example
    ///
    /// A level of 2 will not return MS1 survey scans
    pub fn with_level_filter(ms_level: u8) -> Self {
        Self {
            ms_level: Some(ms_level),
        }
    }

    fn start_scan(ev: &BytesStart<'_>) -> Result<RawScan, MzXmlError> {
        let id = attribute(ev, b"num")?.ok_or(MzXmlError::Malformed("scan without `num`"))?;
        let ms_level = match attribute(ev, b"msLevel")? {
            Some(level) => level.parse()?,
            None => 0,
        };
        Ok(RawScan {
            id,
            ms_level,
            ..Default::default()
        })
    }

    fn peak_encoding(ev: &BytesStart<'_>) -> Result<PeakEncoding, MzXmlError> {
        let mut encoding = PeakEncoding::default();
        if let Some(precision) = attribute(ev, b"precision")? {
            encoding.precision = match precision.as_str() {
                "32" => 32,
                "64" => 64,
                _ => return Err(MzXmlError::Malformed("peak precision must be 32 or 64")),
            };
        }
        if let Some(order) = attribute(ev, b"byteOrder")? {
            encoding.big_endian = order != "little";
        }
        if let Some(compression) = attribute(ev, b"compressionType")? {
            encoding.zlib = compression == "zlib";
        }
        Ok(encoding)
    }

    /// Decode base64 `(m/z, intensity)` pairs into the two arrays of `scan`
    fn decode_peaks(
        text: &str,
        encoding: PeakEncoding,
        scan: &mut RawScan,
    ) -> Result<(), MzXmlError> {
        let text = text.trim();
        // Scans without any peaks are written with an empty element
        if text.is_empty() {
            return Ok(());
        }
        let decoded = base64::decode(text.as_bytes())?;
        let bytes = match encoding.zlib {
            false => decoded,
            true => {
                let mut inflated = Vec::with_capacity(decoded.len() * 2);
                ZlibDecoder::new(decoded.as_slice()).read_to_end(&mut inflated)?;
                inflated
            }
        };

        let width = encoding.precision / 8;
        if bytes.len() % (2 * width) != 0 {
            return Err(MzXmlError::Malformed("peak data is not a whole number of pairs"));
        }

        let values = bytes.chunks_exact(width).map(|chunk| match width {
            4 => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(chunk);
                match encoding.big_endian {
                    true => f32::from_be_bytes(buf) as f64,
                    false => f32::from_le_bytes(buf) as f64,
                }
            }
            _ => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                match encoding.big_endian {
                    true => f64::from_be_bytes(buf),
                    false => f64::from_le_bytes(buf),
                }
            }
        });

        scan.mz.clear();
        scan.intensity.clear();
        for (idx, value) in values.enumerate() {
            match idx % 2 {
                0 => scan.mz.push(value),
                _ => scan.intensity.push(value),
            }
        }
        Ok(())
    }

    /// Parse every `<scan>` element, including scans nested inside their
    /// survey scan. Scans are returned in the order their elements close.
    pub fn parse<B: BufRead>(&self, b: B) -> Result<Vec<RawScan>, MzXmlError> {
        let mut reader = Reader::from_reader(b);
        let mut buf = Vec::new();

        let mut open_scans: Vec<RawScan> = Vec::new();
        let mut state = None;
        let mut text = String::new();
        let mut encoding = PeakEncoding::default();
        let mut scans = Vec::new();

        let keep = |scan: &RawScan| self.ms_level.map(|l| l == scan.ms_level).unwrap_or(true);

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref ev) => match ev.name().into_inner() {
                    b"scan" => open_scans.push(Self::start_scan(ev)?),
                    b"precursorMz" => {
                        let charge = attribute(ev, b"precursorCharge")?;
                        if let Some(scan) = open_scans.last_mut() {
                            // Only the first precursor of a scan is used
                            if scan.precursor_mz.is_none() {
                                if let Some(charge) = charge {
                                    scan.precursor_charge = Some(charge.parse()?);
                                }
                            }
                        }
                        state = Some(State::PrecursorMz);
                        text.clear();
                    }
                    b"peaks" => {
                        encoding = Self::peak_encoding(ev)?;
                        state = Some(State::Peaks);
                        text.clear();
                    }
                    _ => {}
                },
                Event::Empty(ref ev) => {
                    if ev.name().into_inner() == b"scan" {
                        let scan = Self::start_scan(ev)?;
                        if keep(&scan) {
                            scans.push(scan);
                        }
                    }
                }
                Event::Text(ev) => {
                    if state.is_some() {
                        text.push_str(&ev.unescape()?);
                    }
                }
                Event::End(ev) => match (state, ev.name().into_inner()) {
                    (Some(State::PrecursorMz), b"precursorMz") => {
                        let scan = open_scans
                            .last_mut()
                            .ok_or(MzXmlError::Malformed("precursorMz outside of a scan"))?;
                        if scan.precursor_mz.is_none() {
                            scan.precursor_mz = Some(text.trim().parse()?);
                        }
                        state = None;
                    }
                    (Some(State::Peaks), b"peaks") => {
                        let scan = open_scans
                            .last_mut()
                            .ok_or(MzXmlError::Malformed("peaks outside of a scan"))?;
                        Self::decode_peaks(&text, encoding, scan)?;
                        state = None;
                    }
                    (_, b"scan") => {
                        let scan = open_scans
                            .pop()
                            .ok_or(MzXmlError::Malformed("unbalanced scan element"))?;
                        if keep(&scan) {
                            scans.push(scan);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !open_scans.is_empty() {
            return Err(MzXmlError::Malformed("unterminated scan element"));
        }
        Ok(scans)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MzXmlError {
    #[error("malformed mzXML: {0}")]
    Malformed(&'static str),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
    #[error("utf8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("error parsing float: {0}")]
    Float(#[from] std::num::ParseFloatError),
    #[error("error parsing int: {0}")]
    Int(#[from] std::num::ParseIntError),
    #[error("error decoding base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

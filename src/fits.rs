//! Minimal FITS primary HDU reader and writer.
//!
//! Covers just enough of the standard for focus frames: 2880-byte blocks,
//! 80-character header cards, `BITPIX` 8/16/32/-32/-64 with `BSCALE`/`BZERO`
//! rescaling and big-endian payloads. Extensions and multi-HDU files are out
//! of scope.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const BLOCK_SIZE: usize = 2880;
const CARD_SIZE: usize = 80;
const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

#[derive(thiserror::Error, Debug)]
pub enum FitsError {
    #[error("failed to access the FITS file")]
    Io(#[from] std::io::Error),
    #[error("not a FITS file, the first card is not SIMPLE")]
    NotFits,
    #[error("header ended without an END card")]
    UnterminatedHeader,
    #[error("missing or invalid {0} card")]
    MissingCard(&'static str),
    #[error("unsupported BITPIX value: {0}")]
    UnsupportedBitpix(i64),
    #[error("only 2-dimensional images are supported, got NAXIS = {0}")]
    NotAnImage(i64),
    #[error("payload is truncated, expected {expected} bytes, got {actual}")]
    TruncatedData { expected: usize, actual: usize },
}

/// A FITS header card value.
#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    Str(String),
    Int(i64),
    Real(f64),
    Logical(bool),
}

impl CardValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CardValue::Str(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CardValue::Int(v) => Some(*v),
            CardValue::Real(v) => Some(*v as i64),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CardValue::Real(v) => Some(*v),
            CardValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl std::fmt::Display for CardValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardValue::Str(s) => write!(f, "{}", s),
            CardValue::Int(v) => write!(f, "{}", v),
            CardValue::Real(v) => write!(f, "{}", v),
            CardValue::Logical(v) => write!(f, "{}", if *v { "T" } else { "F" }),
        }
    }
}

/// An ordered set of header cards.
#[derive(Debug, Clone, Default)]
pub struct Header {
    cards: Vec<(String, CardValue)>,
}

impl Header {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn get(&self, key: &str) -> Option<&CardValue> {
        self.cards
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
    /// Insert or replace a card.
    pub fn set<V: Into<CardValue>>(&mut self, key: &str, value: V) {
        let value = value.into();
        match self.cards.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.cards.push((key.to_owned(), value)),
        }
    }
    pub fn str_value(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(CardValue::as_str)
    }
    pub fn f64_value(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(CardValue::as_f64)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CardValue)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<&str> for CardValue {
    fn from(value: &str) -> Self {
        CardValue::Str(value.to_owned())
    }
}
impl From<String> for CardValue {
    fn from(value: String) -> Self {
        CardValue::Str(value)
    }
}
impl From<i64> for CardValue {
    fn from(value: i64) -> Self {
        CardValue::Int(value)
    }
}
impl From<f64> for CardValue {
    fn from(value: f64) -> Self {
        CardValue::Real(value)
    }
}
impl From<bool> for CardValue {
    fn from(value: bool) -> Self {
        CardValue::Logical(value)
    }
}

/// Primary HDU: header plus a `rows` x `cols` image in row-major order.
#[derive(Debug, Clone)]
pub struct Hdu {
    pub header: Header,
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

/// Read the primary HDU of a FITS file.
pub fn read_primary<P: AsRef<Path>>(path: P) -> Result<Hdu, FitsError> {
    let mut reader = BufReader::new(File::open(path)?);
    let header = read_header(&mut reader)?;

    let bitpix = header
        .get("BITPIX")
        .and_then(CardValue::as_i64)
        .ok_or(FitsError::MissingCard("BITPIX"))?;
    let naxis = header
        .get("NAXIS")
        .and_then(CardValue::as_i64)
        .ok_or(FitsError::MissingCard("NAXIS"))?;
    if naxis != 2 {
        return Err(FitsError::NotAnImage(naxis));
    }
    let cols = header
        .get("NAXIS1")
        .and_then(CardValue::as_i64)
        .ok_or(FitsError::MissingCard("NAXIS1"))? as usize;
    let rows = header
        .get("NAXIS2")
        .and_then(CardValue::as_i64)
        .ok_or(FitsError::MissingCard("NAXIS2"))? as usize;
    let bscale = header.f64_value("BSCALE").unwrap_or(1.0);
    let bzero = header.f64_value("BZERO").unwrap_or(0.0);

    let npix = rows * cols;
    let bytes_per_pixel = (bitpix.unsigned_abs() / 8) as usize;
    let mut payload = vec![0u8; npix * bytes_per_pixel];
    let mut read = 0;
    while read < payload.len() {
        match reader.read(&mut payload[read..])? {
            0 => {
                return Err(FitsError::TruncatedData {
                    expected: payload.len(),
                    actual: read,
                })
            }
            n => read += n,
        }
    }

    let raw: Vec<f64> = match bitpix {
        8 => payload.iter().map(|&b| b as f64).collect(),
        16 => payload
            .chunks_exact(2)
            .map(|c| i16::from_be_bytes([c[0], c[1]]) as f64)
            .collect(),
        32 => payload
            .chunks_exact(4)
            .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        -32 => payload
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        -64 => payload
            .chunks_exact(8)
            .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect(),
        other => return Err(FitsError::UnsupportedBitpix(other)),
    };
    let data = raw.into_iter().map(|v| bscale * v + bzero).collect();

    Ok(Hdu {
        header,
        rows,
        cols,
        data,
    })
}

fn read_header<R: Read>(reader: &mut R) -> Result<Header, FitsError> {
    let mut header = Header::new();
    let mut block = [0u8; BLOCK_SIZE];
    let mut first_card = true;
    loop {
        if let Err(e) = reader.read_exact(&mut block) {
            return Err(if e.kind() == std::io::ErrorKind::UnexpectedEof {
                FitsError::UnterminatedHeader
            } else {
                e.into()
            });
        }
        for card in block.chunks_exact(CARD_SIZE) {
            let keyword = String::from_utf8_lossy(&card[..8]).trim_end().to_owned();
            if first_card {
                if keyword != "SIMPLE" {
                    return Err(FitsError::NotFits);
                }
                first_card = false;
            }
            if keyword == "END" {
                return Ok(header);
            }
            if keyword.is_empty() || keyword == "COMMENT" || keyword == "HISTORY" {
                continue;
            }
            // Only cards with a value indicator carry a value.
            if &card[8..10] != b"= " {
                continue;
            }
            if let Some(value) = parse_value(&card[10..]) {
                header.set(&keyword, value);
            }
        }
    }
}

fn parse_value(field: &[u8]) -> Option<CardValue> {
    let text = String::from_utf8_lossy(field);
    let text = text.as_ref();
    if let Some(start) = text.find('\'') {
        // Quoted string, with '' as an escaped quote; trailing blanks are
        // padding, not content.
        let mut value = String::new();
        let mut chars = text[start + 1..].chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    value.push('\'');
                } else {
                    break;
                }
            } else {
                value.push(c);
            }
        }
        return Some(CardValue::Str(value.trim_end().to_owned()));
    }
    let value = match text.find('/') {
        Some(slash) => text[..slash].trim(),
        None => text.trim(),
    };
    if value.is_empty() {
        return None;
    }
    match value {
        "T" => Some(CardValue::Logical(true)),
        "F" => Some(CardValue::Logical(false)),
        _ => {
            if let Ok(v) = value.parse::<i64>() {
                Some(CardValue::Int(v))
            } else {
                // Fortran-style exponents show up in old headers.
                value
                    .replace(['D', 'd'], "E")
                    .parse::<f64>()
                    .ok()
                    .map(CardValue::Real)
            }
        }
    }
}

/// Write a `rows` x `cols` image as a BITPIX -32 primary HDU.
pub fn write_primary<P: AsRef<Path>>(
    path: P,
    header: &Header,
    rows: usize,
    cols: usize,
    data: &[f64],
) -> Result<(), FitsError> {
    let mut writer = BufWriter::new(File::create(path)?);

    let mut cards: Vec<String> = vec![
        format_card("SIMPLE", &CardValue::Logical(true)),
        format_card("BITPIX", &CardValue::Int(-32)),
        format_card("NAXIS", &CardValue::Int(2)),
        format_card("NAXIS1", &CardValue::Int(cols as i64)),
        format_card("NAXIS2", &CardValue::Int(rows as i64)),
    ];
    const STRUCTURAL: [&str; 5] = ["SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2"];
    for (key, value) in header.iter() {
        if !STRUCTURAL.contains(&key) {
            cards.push(format_card(key, value));
        }
    }
    cards.push(format!("{:<80}", "END"));

    let mut block = String::with_capacity(BLOCK_SIZE);
    for chunk in cards.chunks(CARDS_PER_BLOCK) {
        block.clear();
        for card in chunk {
            block.push_str(card);
        }
        while block.len() < BLOCK_SIZE {
            block.push(' ');
        }
        writer.write_all(block.as_bytes())?;
    }

    let mut payload = Vec::with_capacity(data.len() * 4);
    for &v in data {
        payload.extend_from_slice(&(v as f32).to_be_bytes());
    }
    while payload.len() % BLOCK_SIZE != 0 {
        payload.push(0);
    }
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

fn format_card(key: &str, value: &CardValue) -> String {
    let body = match value {
        CardValue::Str(s) => format!("{:<8}= '{}'", key, s.replace('\'', "''")),
        CardValue::Int(v) => format!("{:<8}= {:>20}", key, v),
        CardValue::Real(v) => format!("{:<8}= {:>20}", key, format_real(*v)),
        CardValue::Logical(v) => format!("{:<8}= {:>20}", key, if *v { "T" } else { "F" }),
    };
    format!("{:<80}", body)
}

fn format_real(v: f64) -> String {
    // A plain Display round-trips integers without a decimal point, which
    // would read back as CardValue::Int.
    let s = format!("{}", v);
    if s.contains('.') || s.contains('E') || s.contains('e') {
        s
    } else {
        format!("{}.0", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_fits(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("focus-finder-fits-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn round_trip_primary_hdu() {
        let mut header = Header::new();
        header.set("OBSTYPE", "FOCUS");
        header.set("CAM_FOC", -571.0);
        header.set("RDNOISE", 3.89);
        header.set("GAIN", 1i64);
        header.set("SLIT", "0.4 slit");

        let rows = 7;
        let cols = 11;
        let data: Vec<f64> = (0..rows * cols).map(|i| i as f64 / 4.0).collect();

        let path = temp_fits("round_trip.fits");
        write_primary(&path, &header, rows, cols, &data).unwrap();
        let hdu = read_primary(&path).unwrap();

        assert_eq!(hdu.rows, rows);
        assert_eq!(hdu.cols, cols);
        assert_eq!(hdu.header.str_value("OBSTYPE"), Some("FOCUS"));
        assert_eq!(hdu.header.f64_value("CAM_FOC"), Some(-571.0));
        assert_eq!(hdu.header.f64_value("RDNOISE"), Some(3.89));
        assert_eq!(hdu.header.f64_value("GAIN"), Some(1.0));
        assert_eq!(hdu.header.str_value("SLIT"), Some("0.4 slit"));
        for (a, b) in hdu.data.iter().zip(&data) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn string_card_with_escaped_quote() {
        let card = format_card("OBJECT", &CardValue::Str("O'Brian".into()));
        assert_eq!(card.len(), 80);
        let value = parse_value(card[10..].as_bytes()).unwrap();
        assert_eq!(value, CardValue::Str("O'Brian".into()));
    }

    #[test]
    fn value_comment_is_stripped() {
        let value = parse_value(b"                  16 / number of bits         ").unwrap();
        assert_eq!(value, CardValue::Int(16));
    }

    #[test]
    fn rejects_non_fits_file() {
        let path = temp_fits("not_a_fits.fits");
        std::fs::write(&path, vec![b' '; 2880]).unwrap();
        assert!(matches!(read_primary(&path), Err(FitsError::NotFits)));
    }
}

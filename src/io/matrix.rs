//! # Sample Matrix Reader
//!
//! Plain-text haplotype matrices: one sample per line, one `0`/`1` character
//! per site. Whitespace inside a row is ignored, blank lines and lines
//! starting with `#` are skipped. Files ending in `.gz` are decompressed on
//! the fly.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tracing::info_span;

use crate::data::storage::SampleMatrix;
use crate::error::{AncestralError, Result};

/// Open a possibly gzipped text file for buffered reading
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    let is_gzipped = path.extension().map(|e| e == "gz").unwrap_or(false);
    let reader: Box<dyn BufRead + Send> = if is_gzipped {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// Read a sample matrix from disk
pub fn read_sample_matrix(path: &Path) -> Result<SampleMatrix> {
    info_span!("read_sample_matrix", path = ?path)
        .in_scope(|| parse_sample_matrix(open_text(path)?))
}

/// Parse a sample matrix from any buffered reader
pub fn parse_sample_matrix<R: BufRead>(reader: R) -> Result<SampleMatrix> {
    let mut rows: Vec<Vec<u8>> = Vec::new();
    let mut n_sites: Option<usize> = None;

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut row = Vec::with_capacity(n_sites.unwrap_or(line.len()));
        for c in line.chars().filter(|c| !c.is_whitespace()) {
            match c {
                '0' => row.push(0),
                '1' => row.push(1),
                other => {
                    return Err(AncestralError::parse(
                        line_num + 1,
                        format!("unexpected character {:?}, expected 0 or 1", other),
                    ))
                }
            }
        }

        match n_sites {
            None => n_sites = Some(row.len()),
            Some(expected) if expected != row.len() => {
                return Err(AncestralError::parse(
                    line_num + 1,
                    format!("row has {} sites, expected {}", row.len(), expected),
                ));
            }
            Some(_) => {}
        }
        rows.push(row);
    }

    let n_sites = n_sites.ok_or_else(|| AncestralError::parse(0, "no sample rows found"))?;
    SampleMatrix::from_rows(rows.len(), n_sites, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleIdx, SiteIdx};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    #[test]
    fn test_parse_with_comments_and_spaces() {
        let text = "# two samples\n0 1 1\n\n110\n";
        let matrix = parse_sample_matrix(Cursor::new(text)).unwrap();
        assert_eq!(matrix.n_samples(), 2);
        assert_eq!(matrix.n_sites(), 3);
        assert_eq!(matrix.allele(SampleIdx(1), SiteIdx(0)), 1);
        assert_eq!(matrix.frequencies(), vec![1, 2, 1]);
    }

    #[test]
    fn test_parse_errors() {
        let ragged = parse_sample_matrix(Cursor::new("011\n01\n"));
        assert!(matches!(ragged, Err(AncestralError::Parse { line: 2, .. })));

        let bad_char = parse_sample_matrix(Cursor::new("0x1\n"));
        assert!(matches!(bad_char, Err(AncestralError::Parse { line: 1, .. })));

        assert!(parse_sample_matrix(Cursor::new("# nothing\n")).is_err());
    }

    #[test]
    fn test_read_gzipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b"1100\n0110\n").unwrap();
        encoder.finish().unwrap();

        let matrix = read_sample_matrix(&path).unwrap();
        assert_eq!(matrix.sample_haplotype(SampleIdx(1)), vec![0, 1, 1, 0]);
    }
}

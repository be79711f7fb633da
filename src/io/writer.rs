//! # Result Writers
//!
//! - Ancestors as JSON lines, one record per matcher ancestor (root excluded).
//! - Copying paths as a TSV edge table: `kind id left right parent`, where
//!   `[left, right)` is a half-open site interval.
//!
//! Paths ending in `.gz` are gzip-compressed.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::data::haplotype::{haplotype_string, SiteIdx};
use crate::error::Result;
use crate::model::builder::Ancestor;
use crate::model::path::CopyingPath;

/// Output text file, gzip-compressed when its path ends in `.gz`
pub enum TextWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl TextWriter {
    /// Flush everything, writing the gzip trailer if compressed
    pub fn finish(self) -> Result<()> {
        match self {
            TextWriter::Plain(mut w) => w.flush()?,
            TextWriter::Gzip(encoder) => encoder.finish()?.flush()?,
        }
        Ok(())
    }
}

impl Write for TextWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            TextWriter::Plain(w) => w.write(buf),
            TextWriter::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            TextWriter::Plain(w) => w.flush(),
            TextWriter::Gzip(w) => w.flush(),
        }
    }
}

/// Create a possibly gzipped output file
pub fn create_text(path: &Path) -> Result<TextWriter> {
    let file = BufWriter::new(File::create(path)?);
    let is_gzipped = path.extension().map(|e| e == "gz").unwrap_or(false);
    Ok(if is_gzipped {
        TextWriter::Gzip(GzEncoder::new(file, Compression::default()))
    } else {
        TextWriter::Plain(file)
    })
}

/// One line of the ancestors file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestorRecord {
    /// Index in the matcher library (root is 0)
    pub id: u32,
    pub start: SiteIdx,
    pub end: SiteIdx,
    pub time: u32,
    pub focal_sites: Vec<SiteIdx>,
    /// `0`, `1` or `.` per site
    pub haplotype: String,
}

impl AncestorRecord {
    pub fn new(id: u32, ancestor: &Ancestor) -> Self {
        let d = &ancestor.descriptor;
        Self {
            id,
            start: d.start,
            end: d.end,
            time: d.time,
            focal_sites: d.focal_sites.clone(),
            haplotype: haplotype_string(&ancestor.haplotype),
        }
    }
}

/// Write ancestors in build order; the i-th ancestor gets id `i + 1`
pub fn write_ancestors<W: Write>(writer: &mut W, ancestors: &[Ancestor]) -> Result<()> {
    for (i, ancestor) in ancestors.iter().enumerate() {
        let record = AncestorRecord::new(i as u32 + 1, ancestor);
        serde_json::to_writer(&mut *writer, &record)?;
        writeln!(writer)?;
    }
    Ok(())
}

/// Which population a path belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathKind {
    Ancestor,
    Sample,
}

impl PathKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PathKind::Ancestor => "ancestor",
            PathKind::Sample => "sample",
        }
    }
}

/// Streaming writer for the path edge table
pub struct PathWriter<W: Write> {
    writer: W,
    rows: usize,
}

impl<W: Write> PathWriter<W> {
    /// Wrap `writer` and emit the header line
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "kind\tid\tleft\tright\tparent")?;
        Ok(Self { writer, rows: 0 })
    }

    /// Append every run of `path` for entity `id`
    pub fn write_path(&mut self, kind: PathKind, id: u32, path: &CopyingPath) -> Result<()> {
        for run in path.runs() {
            writeln!(
                self.writer,
                "{}\t{}\t{}\t{}\t{}",
                kind.as_str(),
                id,
                run.left.0,
                run.right.0,
                run.parent
            )?;
            self.rows += 1;
        }
        Ok(())
    }

    /// Data rows written so far
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and hand back the inner writer
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::haplotype::{AncestorIdx, UNKNOWN_ALLELE};
    use crate::model::builder::AncestorDescriptor;

    #[test]
    fn test_write_ancestors_jsonl() {
        let ancestor = Ancestor {
            haplotype: vec![UNKNOWN_ALLELE, 1, 0],
            descriptor: AncestorDescriptor {
                start: SiteIdx(1),
                end: SiteIdx(3),
                focal_sites: vec![SiteIdx(1)],
                time: 4,
            },
        };
        let mut buf = Vec::new();
        write_ancestors(&mut buf, &[ancestor]).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let record: AncestorRecord = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.haplotype, ".10");
        assert_eq!(record.focal_sites, vec![SiteIdx(1)]);
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_gzip_output_is_complete() {
        use crate::io::matrix::open_text;
        use std::io::Read;

        let dir = tempfile::tempdir().unwrap();
        let gz = dir.path().join("paths.tsv.gz");
        let path = CopyingPath {
            start_site: 0,
            end_site: 1,
            ancestors: vec![Some(AncestorIdx(2)), Some(AncestorIdx(2))],
        };

        let mut writer = PathWriter::new(create_text(&gz).unwrap()).unwrap();
        writer.write_path(PathKind::Ancestor, 3, &path).unwrap();
        writer.finish().unwrap().finish().unwrap();

        let raw = std::fs::read(&gz).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        let mut text = String::new();
        open_text(&gz).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "kind\tid\tleft\tright\tparent\nancestor\t3\t0\t2\t2\n");
    }

    #[test]
    fn test_path_writer_rows() {
        let path = CopyingPath {
            start_site: 0,
            end_site: 2,
            ancestors: vec![Some(AncestorIdx(1)), Some(AncestorIdx(1)), Some(AncestorIdx(0))],
        };
        let mut writer = PathWriter::new(Vec::new()).unwrap();
        writer.write_path(PathKind::Sample, 7, &path).unwrap();
        assert_eq!(writer.rows(), 2);

        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(
            text,
            "kind\tid\tleft\tright\tparent\nsample\t7\t0\t2\t1\nsample\t7\t2\t3\t0\n"
        );
    }
}

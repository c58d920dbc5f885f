//! # Reads Input
//!
//! FASTA/FASTQ parsing for quasimap, gzip handled transparently by
//! `needletail`. Records are decoded to the `1..=4` alphabet; records
//! containing any other character are unmappable by definition and are
//! counted rather than carried forward.

use std::path::Path;

use needletail::parse_fastx_file;

use crate::data::alphabet::{self, Base};
use crate::error::{PrgmapError, Result};

/// Reads of one file, decoded, plus the number of skipped records
#[derive(Debug)]
pub struct EncodedReads {
    pub reads: Vec<Vec<Base>>,
    pub skipped: u64,
}

/// Parse and encode every record of a FASTA/FASTQ file
pub fn load_encoded_reads(path: &Path) -> Result<EncodedReads> {
    let mut reader = parse_fastx_file(path).map_err(|e| {
        PrgmapError::parse(format!("cannot parse reads file {}: {e}", path.display()))
    })?;

    let mut reads = Vec::new();
    let mut skipped = 0u64;
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| {
            PrgmapError::parse(format!("bad record in {}: {e}", path.display()))
        })?;
        match alphabet::encode_read(&record.seq()) {
            Some(read) => reads.push(read),
            None => skipped += 1,
        }
    }
    Ok(EncodedReads { reads, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_fasta_records() {
        let file = write_temp(">r1\nACGT\n>r2\nggtt\n", ".fa");
        let encoded = load_encoded_reads(file.path()).unwrap();
        assert_eq!(encoded.reads, vec![vec![1, 2, 3, 4], vec![3, 3, 4, 4]]);
        assert_eq!(encoded.skipped, 0);
    }

    #[test]
    fn test_load_fastq_records() {
        let file = write_temp("@r1\nACGT\n+\nIIII\n", ".fq");
        let encoded = load_encoded_reads(file.path()).unwrap();
        assert_eq!(encoded.reads, vec![vec![1, 2, 3, 4]]);
    }

    #[test]
    fn test_non_acgt_records_are_skipped() {
        let file = write_temp(">r1\nACNT\n>r2\nACGT\n", ".fa");
        let encoded = load_encoded_reads(file.path()).unwrap();
        assert_eq!(encoded.reads.len(), 1);
        assert_eq!(encoded.skipped, 1);
    }
}

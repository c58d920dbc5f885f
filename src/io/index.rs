//! # Build Artifact Persistence
//!
//! Everything `build` writes under the gram directory and `quasimap`
//! loads back: the encoded PRG, the site and allele masks, the FM-index
//! components, and the kmer index as four streams (prefix-diffed kmers,
//! per-kmer stats, flat suffix-array intervals, flat variant-site paths).

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::data::alphabet::Base;
use crate::data::masks::Masks;
use crate::data::prg::Prg;
use crate::error::{PrgmapError, Result};
use crate::io::packed::{read_u32, read_u64, read_u8, PackedIntVec};
use crate::model::fm_index::{FmIndex, SaInterval};
use crate::model::kmer_index::KmerIndex;
use crate::model::prg_index::PrgIndex;
use crate::model::search::{SearchState, SearchStates, VariantLocus, VariantSiteState};

const KMERS_MAGIC: &[u8; 8] = b"PRGMKMRS";
const STATS_MAGIC: &[u8; 8] = b"PRGMSTAT";
const INTERVALS_MAGIC: &[u8; 8] = b"PRGMSAIV";
const PATHS_MAGIC: &[u8; 8] = b"PRGMPATH";
const STREAM_VERSION: u32 = 1;

/// All file locations under one gram directory
#[derive(Debug, Clone)]
pub struct GramPaths {
    pub prg: PathBuf,
    pub sites_mask: PathBuf,
    pub allele_mask: PathBuf,
    pub fm_index: PathBuf,
    pub kmers: PathBuf,
    pub kmers_stats: PathBuf,
    pub sa_intervals: PathBuf,
    pub paths: PathBuf,
    pub allele_sum_coverage: PathBuf,
    pub allele_base_coverage: PathBuf,
    pub grouped_allele_counts: PathBuf,
    pub report: PathBuf,
}

impl GramPaths {
    pub fn new(dir: &Path) -> Self {
        Self {
            prg: dir.join("prg.bin"),
            sites_mask: dir.join("sites_mask.bin"),
            allele_mask: dir.join("allele_mask.bin"),
            fm_index: dir.join("fm_index.bin"),
            kmers: dir.join("kmers.bin"),
            kmers_stats: dir.join("kmers_stats.bin"),
            sa_intervals: dir.join("sa_intervals.bin"),
            paths: dir.join("paths.bin"),
            allele_sum_coverage: dir.join("allele_sum_coverage"),
            allele_base_coverage: dir.join("allele_base_coverage.json"),
            grouped_allele_counts: dir.join("grouped_allele_counts.json"),
            report: dir.join("report.json"),
        }
    }
}

/// Persist a built index and its kmer index under `dir`
pub fn save_build(dir: &Path, index: &PrgIndex, kmer_index: &KmerIndex) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let paths = GramPaths::new(dir);

    write_packed(&paths.prg, &to_u64(&index.prg.encoded))?;
    write_packed(&paths.sites_mask, &to_u64(&index.masks.sites))?;
    write_packed(&paths.allele_mask, &to_u64(&index.masks.alleles))?;

    let mut fm_writer = BufWriter::new(File::create(&paths.fm_index)?);
    PackedIntVec::from_values(&to_u64(index.fm.text())).write_to(&mut fm_writer)?;
    PackedIntVec::from_values(&to_u64(index.fm.sa_slice())).write_to(&mut fm_writer)?;
    fm_writer.flush()?;

    save_kmer_index(&paths, kmer_index)?;
    Ok(())
}

/// Load a persisted index pair back for quasimapping
pub fn load_build(dir: &Path) -> Result<(PrgIndex, KmerIndex)> {
    let paths = GramPaths::new(dir);

    let encoded = to_u32(&read_packed(&paths.prg)?)?;
    let sites = to_u32(&read_packed(&paths.sites_mask)?)?;
    let alleles = to_u32(&read_packed(&paths.allele_mask)?)?;
    let prg = Prg::from_encoded(encoded);
    let masks = Masks::from_parts(&prg.encoded, sites, alleles)?;

    let mut fm_reader = BufReader::new(File::open(&paths.fm_index)?);
    let text = to_u32(&PackedIntVec::read_from(&mut fm_reader)?.values())?;
    let sa = to_u32(&PackedIntVec::read_from(&mut fm_reader)?.values())?;
    let fm = FmIndex::from_parts(text, sa);

    let index = PrgIndex::from_parts(prg, fm, masks)?;
    let kmer_index = load_kmer_index(&paths)?;
    Ok((index, kmer_index))
}

fn write_packed(path: &Path, values: &[u64]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    PackedIntVec::from_values(values).write_to(&mut writer)?;
    writer.flush()?;
    Ok(())
}

fn read_packed(path: &Path) -> Result<Vec<u64>> {
    let mut reader = BufReader::new(File::open(path)?);
    Ok(PackedIntVec::read_from(&mut reader)?.values())
}

fn to_u64(values: &[u32]) -> Vec<u64> {
    values.iter().map(|&v| v as u64).collect()
}

fn to_u32(values: &[u64]) -> Result<Vec<u32>> {
    values
        .iter()
        .map(|&v| {
            u32::try_from(v).map_err(|_| PrgmapError::parse("persisted value exceeds 32 bits"))
        })
        .collect()
}

/// Rightmost index at which two kmers differ, scanning from the right.
///
/// The emitted diff is the kmer's prefix up to that index; the shared
/// suffix is implicit from the previous kmer.
fn prefix_diff(previous: &[Base], kmer: &[Base]) -> Vec<Base> {
    debug_assert_eq!(previous.len(), kmer.len());
    for i in (0..kmer.len()).rev() {
        if kmer[i] != previous[i] {
            return kmer[..=i].to_vec();
        }
    }
    Vec::new()
}

fn save_kmer_index(paths: &GramPaths, kmer_index: &KmerIndex) -> Result<()> {
    let entries = kmer_index.ordered_entries();

    let mut kmers = BufWriter::new(File::create(&paths.kmers)?);
    let mut stats = BufWriter::new(File::create(&paths.kmers_stats)?);
    let mut intervals = BufWriter::new(File::create(&paths.sa_intervals)?);
    let mut path_stream = BufWriter::new(File::create(&paths.paths)?);

    kmers.write_all(KMERS_MAGIC)?;
    kmers.write_all(&STREAM_VERSION.to_le_bytes())?;
    kmers.write_all(&(kmer_index.kmer_size() as u32).to_le_bytes())?;
    kmers.write_all(&(entries.len() as u64).to_le_bytes())?;
    stats.write_all(STATS_MAGIC)?;
    stats.write_all(&STREAM_VERSION.to_le_bytes())?;
    intervals.write_all(INTERVALS_MAGIC)?;
    intervals.write_all(&STREAM_VERSION.to_le_bytes())?;
    path_stream.write_all(PATHS_MAGIC)?;
    path_stream.write_all(&STREAM_VERSION.to_le_bytes())?;

    let mut previous: Option<&Vec<Base>> = None;
    for &(kmer, states) in &entries {
        let diff = match previous {
            Some(prev) => prefix_diff(prev, kmer),
            None => kmer.to_vec(),
        };
        kmers.write_all(&[diff.len() as u8])?;
        kmers.write_all(&diff)?;
        previous = Some(kmer);

        stats.write_all(&(states.len() as u32).to_le_bytes())?;
        for state in states.iter() {
            stats.write_all(&(state.path.len() as u32).to_le_bytes())?;
            intervals.write_all(&(state.sa_interval.start as u64).to_le_bytes())?;
            intervals.write_all(&(state.sa_interval.end as u64).to_le_bytes())?;
            for locus in &state.path {
                path_stream.write_all(&locus.site.to_le_bytes())?;
                path_stream.write_all(&locus.allele.to_le_bytes())?;
            }
        }
    }

    kmers.flush()?;
    stats.flush()?;
    intervals.flush()?;
    path_stream.flush()?;
    Ok(())
}

fn check_magic<R: Read>(reader: &mut R, expected: &[u8; 8], what: &str) -> Result<()> {
    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != expected {
        return Err(PrgmapError::parse(format!("bad magic in {what} stream")));
    }
    let version = read_u32(reader)?;
    if version != STREAM_VERSION {
        return Err(PrgmapError::parse(format!(
            "unsupported {what} stream version {version}"
        )));
    }
    Ok(())
}

fn load_kmer_index(paths: &GramPaths) -> Result<KmerIndex> {
    let mut kmers = BufReader::new(File::open(&paths.kmers)?);
    let mut stats = BufReader::new(File::open(&paths.kmers_stats)?);
    let mut intervals = BufReader::new(File::open(&paths.sa_intervals)?);
    let mut path_stream = BufReader::new(File::open(&paths.paths)?);

    check_magic(&mut kmers, KMERS_MAGIC, "kmers")?;
    let kmer_size = read_u32(&mut kmers)? as usize;
    let count = read_u64(&mut kmers)?;
    check_magic(&mut stats, STATS_MAGIC, "stats")?;
    check_magic(&mut intervals, INTERVALS_MAGIC, "sa-intervals")?;
    check_magic(&mut path_stream, PATHS_MAGIC, "paths")?;

    let mut entries: Vec<(Vec<Base>, SearchStates)> = Vec::with_capacity(count as usize);
    let mut previous: Vec<Base> = Vec::new();

    for _ in 0..count {
        let diff_len = read_u8(&mut kmers)? as usize;
        if diff_len > kmer_size {
            return Err(PrgmapError::parse("kmer prefix diff longer than kmer"));
        }
        let mut kmer = vec![0u8; diff_len];
        kmers.read_exact(&mut kmer)?;
        if diff_len < kmer_size {
            if previous.len() != kmer_size {
                return Err(PrgmapError::parse("kmer stream starts with partial kmer"));
            }
            kmer.extend_from_slice(&previous[diff_len..]);
        }

        let num_states = read_u32(&mut stats)?;
        let mut states = Vec::with_capacity(num_states as usize);
        for _ in 0..num_states {
            let path_len = read_u32(&mut stats)?;
            let start = read_u64(&mut intervals)? as usize;
            let end = read_u64(&mut intervals)? as usize;
            let mut path = Vec::with_capacity(path_len as usize);
            for _ in 0..path_len {
                let site = read_u32(&mut path_stream)?;
                let allele = read_u32(&mut path_stream)?;
                path.push(VariantLocus { site, allele });
            }
            states.push(SearchState {
                sa_interval: SaInterval::new(start, end),
                path,
                site_state: VariantSiteState::Unknown,
            });
        }

        previous = kmer.clone();
        entries.push((kmer, states));
    }

    Ok(KmerIndex::from_entries(kmer_size, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::kmer_index::KmerIndex;

    fn build_index(raw: &[u8]) -> PrgIndex {
        PrgIndex::build(Prg::parse(raw).unwrap()).unwrap()
    }

    #[test]
    fn test_prefix_diff_shares_suffix() {
        assert_eq!(prefix_diff(&[1, 2, 3], &[2, 2, 3]), vec![2]);
        assert_eq!(prefix_diff(&[1, 2, 3], &[1, 3, 3]), vec![1, 3]);
        assert_eq!(prefix_diff(&[1, 2, 3], &[4, 4, 4]), vec![4, 4, 4]);
    }

    #[test]
    fn test_full_build_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let index = build_index(b"gct5c6g6t5ac7cc8a7");
        let kmer_index = KmerIndex::build(3, 10, false, &index);
        save_build(dir.path(), &index, &kmer_index).unwrap();

        let (loaded_index, loaded_kmers) = load_build(dir.path()).unwrap();
        assert_eq!(loaded_index.prg, index.prg);
        assert_eq!(loaded_index.masks.sites, index.masks.sites);
        assert_eq!(loaded_index.masks.alleles, index.masks.alleles);
        assert_eq!(loaded_kmers.kmer_size(), 3);
        assert_eq!(loaded_kmers.len(), kmer_index.len());

        for (kmer, states) in kmer_index.ordered_entries() {
            let loaded_states = loaded_kmers.get(kmer).expect("kmer survived round trip");
            assert_eq!(loaded_states.len(), states.len());
            for (loaded, original) in loaded_states.iter().zip(states.iter()) {
                assert_eq!(loaded.sa_interval, original.sa_interval);
                assert_eq!(loaded.path, original.path);
                assert_eq!(loaded.site_state, VariantSiteState::Unknown);
            }
        }
    }

    #[test]
    fn test_truncated_stream_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = build_index(b"a5g6t5c");
        let kmer_index = KmerIndex::build(2, 4, false, &index);
        save_build(dir.path(), &index, &kmer_index).unwrap();

        let paths = GramPaths::new(dir.path());
        let kmers = std::fs::read(&paths.kmers).unwrap();
        std::fs::write(&paths.kmers, &kmers[..10]).unwrap();
        assert!(load_build(dir.path()).is_err());
    }
}

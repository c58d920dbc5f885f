//! # Coverage Output
//!
//! The three quasimap coverage dumps plus the run report. Allele sums go
//! out as a line-oriented integer matrix; base-level and grouped counts
//! as JSON. Grouped counts assign each distinct allele-id set a group id
//! in first-encountered order, with the id-to-set table dumped alongside
//! the per-site counts.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::json;

use crate::data::coverage::{AlleleGroup, Coverage};
use crate::error::Result;

/// Quasimap run statistics, serialized as `report.json`
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReadStats {
    pub reads_processed: u64,
    pub reads_mapped: u64,
    pub reads_skipped: u64,
    pub seed: Option<u64>,
}

/// One line per site, one space-separated counter per allele
pub fn write_allele_sum(path: &Path, coverage: &Coverage) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for site in coverage.allele_sum_counts() {
        let line: Vec<String> = site.iter().map(u64::to_string).collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    writer.flush()?;
    Ok(())
}

/// `{"allele_base_counts": [[[...],...],...]}`
pub fn write_allele_base(path: &Path, coverage: &Coverage) -> Result<()> {
    let payload = json!({ "allele_base_counts": coverage.allele_base_counts() });
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{payload}")?;
    writer.flush()?;
    Ok(())
}

/// Grouped counts with a `site_counts` section (per site, group id to
/// count) and an `allele_groups` section (group id to 0-based allele ids)
pub fn write_grouped_allele_counts(path: &Path, coverage: &Coverage) -> Result<()> {
    let sites = coverage.grouped_counts();

    let mut group_ids: BTreeMap<AlleleGroup, u64> = BTreeMap::new();
    let mut site_counts: Vec<BTreeMap<String, u64>> = Vec::with_capacity(sites.len());
    for site in &sites {
        // iterate each site's groups in a stable order so group ids are
        // deterministic across runs
        let ordered: BTreeMap<&AlleleGroup, u64> =
            site.iter().map(|(group, &count)| (group, count)).collect();
        let mut counts = BTreeMap::new();
        for (group, count) in ordered {
            let next_id = group_ids.len() as u64;
            let id = *group_ids.entry(group.clone()).or_insert(next_id);
            counts.insert(id.to_string(), count);
        }
        site_counts.push(counts);
    }

    let allele_groups: BTreeMap<String, AlleleGroup> = group_ids
        .into_iter()
        .map(|(group, id)| (id.to_string(), group))
        .collect();

    let payload = json!({
        "grouped_allele_counts": {
            "site_counts": site_counts,
            "allele_groups": allele_groups,
        }
    });
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{payload}")?;
    writer.flush()?;
    Ok(())
}

/// Serialize the run report
pub fn write_report(path: &Path, stats: &ReadStats) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{}", serde_json::to_string_pretty(stats)?)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::masks::Masks;
    use crate::data::prg::Prg;

    fn coverage_for(raw: &[u8]) -> Coverage {
        let prg = Prg::parse(raw).unwrap();
        let masks = Masks::from_prg(&prg.encoded);
        Coverage::empty(&masks, prg.num_sites())
    }

    #[test]
    fn test_allele_sum_matrix_lines() {
        let dir = tempfile::tempdir().unwrap();
        let coverage = coverage_for(b"gct5c6g6t5ac7cc8a7");
        coverage.add_allele_sum(0, 0);
        coverage.add_allele_sum(1, 1);
        coverage.add_allele_sum(1, 1);

        let path = dir.path().join("allele_sum_coverage");
        write_allele_sum(&path, &coverage).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "1 0 0\n0 2\n");
    }

    #[test]
    fn test_allele_base_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let coverage = coverage_for(b"a5g6t5c");
        coverage.add_base(0, 0, 0);

        let path = dir.path().join("allele_base_coverage.json");
        write_allele_base(&path, &coverage).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value["allele_base_counts"], json!([[[1], [0]]]));
    }

    #[test]
    fn test_grouped_counts_json_sections() {
        let dir = tempfile::tempdir().unwrap();
        let coverage = coverage_for(b"gct5c6g6t5ac7cc8a7");
        coverage.add_group(0, vec![0]);
        coverage.add_group(0, vec![2]);
        coverage.add_group(1, vec![0, 1]);

        let path = dir.path().join("grouped_allele_counts.json");
        write_grouped_allele_counts(&path, &coverage).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        let grouped = &value["grouped_allele_counts"];

        assert_eq!(grouped["site_counts"][0]["0"], json!(1));
        assert_eq!(grouped["site_counts"][0]["1"], json!(1));
        assert_eq!(grouped["site_counts"][1]["2"], json!(1));
        assert_eq!(grouped["allele_groups"]["0"], json!([0]));
        assert_eq!(grouped["allele_groups"]["1"], json!([2]));
        assert_eq!(grouped["allele_groups"]["2"], json!([0, 1]));
    }

    #[test]
    fn test_report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let stats = ReadStats {
            reads_processed: 10,
            reads_mapped: 7,
            reads_skipped: 1,
            seed: Some(42),
        };
        let path = dir.path().join("report.json");
        write_report(&path, &stats).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["reads_mapped"], json!(7));
        assert_eq!(value["seed"], json!(42));
    }
}

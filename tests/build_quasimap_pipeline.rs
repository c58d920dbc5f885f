//! Full pipeline round trip: PRG file in, coverage files out.
//!
//! Exercises the same path the binary takes: build artifacts to disk,
//! reload them, map reads from a FASTA file, dump coverage.

use std::io::Write;
use std::path::Path;

use prgmap::config::{BuildArgs, QuasimapArgs};
use prgmap::io::GramPaths;
use prgmap::pipelines::{BuildPipeline, QuasimapPipeline};

fn write_file(path: &Path, contents: &str) {
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
}

#[test]
fn build_then_quasimap_produces_expected_coverage() {
    let dir = tempfile::tempdir().unwrap();
    let prg_path = dir.path().join("prg.txt");
    let reads_path = dir.path().join("reads.fa");
    let gram_dir = dir.path().join("gram");

    write_file(&prg_path, "gct5c6g6t5ac7cc8a7");
    write_file(&reads_path, ">r1\ngctc\n>r2\nNNNN\n>r3\ntttt\n");

    let build = BuildArgs {
        gram_dir: gram_dir.clone(),
        prg: prg_path,
        kmer_size: 3,
        max_read_size: 10,
        all_kmers: false,
    };
    BuildPipeline::new(build).run().unwrap();

    let quasimap = QuasimapArgs {
        gram_dir: gram_dir.clone(),
        reads: vec![reads_path],
        threads: Some(2),
        seed: Some(7),
    };
    let stats = QuasimapPipeline::new(quasimap).run().unwrap();

    assert_eq!(stats.reads_processed, 3);
    assert_eq!(stats.reads_mapped, 1);
    assert_eq!(stats.reads_skipped, 1);
    assert_eq!(stats.seed, Some(7));

    let paths = GramPaths::new(&gram_dir);
    let allele_sum = std::fs::read_to_string(&paths.allele_sum_coverage).unwrap();
    assert_eq!(allele_sum, "1 0 0\n0 0\n");

    let base: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.allele_base_coverage).unwrap())
            .unwrap();
    assert_eq!(
        base["allele_base_counts"],
        serde_json::json!([[[1], [0], [0]], [[0, 0], [0]]])
    );

    let grouped: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.grouped_allele_counts).unwrap())
            .unwrap();
    assert_eq!(
        grouped["grouped_allele_counts"]["allele_groups"]["0"],
        serde_json::json!([0])
    );
    assert_eq!(
        grouped["grouped_allele_counts"]["site_counts"][0]["0"],
        serde_json::json!(1)
    );

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.report).unwrap()).unwrap();
    assert_eq!(report["reads_mapped"], serde_json::json!(1));
}

#[test]
fn all_kmers_build_maps_reads_far_from_sites() {
    let dir = tempfile::tempdir().unwrap();
    let prg_path = dir.path().join("prg.txt");
    let reads_path = dir.path().join("reads.fq");
    let gram_dir = dir.path().join("gram");

    write_file(&prg_path, "ttttgggg5a6c5aaaa");
    write_file(&reads_path, "@r1\ntggg\n+\nIIII\n");

    let build = BuildArgs {
        gram_dir: gram_dir.clone(),
        prg: prg_path,
        kmer_size: 2,
        max_read_size: 4,
        all_kmers: true,
    };
    BuildPipeline::new(build).run().unwrap();

    let quasimap = QuasimapArgs {
        gram_dir,
        reads: vec![reads_path],
        threads: Some(1),
        seed: None,
    };
    let stats = QuasimapPipeline::new(quasimap).run().unwrap();
    assert_eq!(stats.reads_mapped, 1);
}

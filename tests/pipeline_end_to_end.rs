use ancestral::config::Config;
use ancestral::io::writer::AncestorRecord;
use ancestral::pipelines::InferencePipeline;
use ancestral::utils::telemetry::{Stage, TelemetryBlackboard};
use clap::Parser;
use std::collections::HashMap;
use std::fs;
use std::io::Write;

const MATRIX: &str = "\
# 6 samples, 8 sites
11010010
11100011
01111010
00011100
10011011
01100110
";

fn run_on(input: &str, out: &str) -> ancestral::pipelines::InferenceSummary {
    let config = Config::parse_from([
        "ancestral",
        "--input",
        input,
        "--out",
        out,
        "--rho",
        "0.5",
        "--heartbeat",
        "0",
    ]);
    config.validate().unwrap();
    let telemetry = TelemetryBlackboard::new();
    let mut pipeline = InferencePipeline::new(config, Some(telemetry.clone())).unwrap();
    let summary = pipeline.run().unwrap();

    assert_eq!(telemetry.stage(), Stage::WritingOutput);
    assert_eq!(telemetry.samples_matched(), summary.num_samples as u64);
    assert_eq!(telemetry.ancestors_matched(), summary.num_ancestors as u64);
    summary
}

#[test]
fn pipeline_writes_ancestors_and_paths() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("samples.txt");
    fs::File::create(&input).unwrap().write_all(MATRIX.as_bytes()).unwrap();
    let out = dir.path().join("result");

    let summary = run_on(input.to_str().unwrap(), out.to_str().unwrap());
    assert_eq!(summary.num_samples, 6);
    assert_eq!(summary.num_sites, 8);

    // Ancestors: one JSON record per line, ids from 1
    let ancestors = fs::read_to_string(dir.path().join("result.ancestors.jsonl")).unwrap();
    let records: Vec<AncestorRecord> = ancestors
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), summary.num_ancestors);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.id as usize, i + 1);
        assert_eq!(record.haplotype.len(), 8);
    }

    // Paths: every sample's runs tile [0, 8) with parents from the library
    let paths = fs::read_to_string(dir.path().join("result.paths.tsv")).unwrap();
    let mut lines = paths.lines();
    assert_eq!(lines.next(), Some("kind\tid\tleft\tright\tparent"));

    let mut sample_cover: HashMap<u32, u32> = HashMap::new();
    for line in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 5);
        let id: u32 = fields[1].parse().unwrap();
        let left: u32 = fields[2].parse().unwrap();
        let right: u32 = fields[3].parse().unwrap();
        let parent: usize = fields[4].parse().unwrap();
        assert!(left < right);

        match fields[0] {
            "sample" => {
                assert!(parent <= summary.num_ancestors);
                let covered = sample_cover.entry(id).or_insert(0);
                assert_eq!(*covered, left);
                *covered = right;
            }
            "ancestor" => assert!(parent < id as usize),
            other => panic!("unexpected kind {}", other),
        }
    }
    assert_eq!(sample_cover.len(), 6);
    assert!(sample_cover.values().all(|&end| end == 8));
}

#[test]
fn pipeline_reads_gzipped_input() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let dir = tempfile::tempdir().unwrap();
    let plain = dir.path().join("samples.txt");
    fs::write(&plain, MATRIX).unwrap();
    let gz = dir.path().join("samples.txt.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&gz).unwrap(), Compression::default());
    encoder.write_all(MATRIX.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let a = run_on(plain.to_str().unwrap(), dir.path().join("a").to_str().unwrap());
    let b = run_on(gz.to_str().unwrap(), dir.path().join("b").to_str().unwrap());
    assert_eq!(a, b);

    let paths_a = fs::read_to_string(dir.path().join("a.paths.tsv")).unwrap();
    let paths_b = fs::read_to_string(dir.path().join("b.paths.tsv")).unwrap();
    assert_eq!(paths_a, paths_b);
}

#[test]
fn pipeline_compresses_outputs() {
    use ancestral::io::matrix::open_text;
    use std::io::Read;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("samples.txt");
    fs::write(&input, MATRIX).unwrap();
    run_on(input.to_str().unwrap(), dir.path().join("plain").to_str().unwrap());

    let config = Config::parse_from([
        "ancestral",
        "--input",
        input.to_str().unwrap(),
        "--out",
        dir.path().join("packed").to_str().unwrap(),
        "--rho",
        "0.5",
        "--compress",
    ]);
    InferencePipeline::new(config, None).unwrap().run().unwrap();

    for name in ["ancestors.jsonl", "paths.tsv"] {
        let plain = fs::read_to_string(dir.path().join(format!("plain.{}", name))).unwrap();
        let mut unpacked = String::new();
        open_text(&dir.path().join(format!("packed.{}.gz", name)))
            .unwrap()
            .read_to_string(&mut unpacked)
            .unwrap();
        assert_eq!(plain, unpacked, "{} differs after gzip", name);
    }
}

#[test]
fn pipeline_rejects_ragged_matrix() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.txt");
    fs::write(&input, "0101\n011\n").unwrap();

    let config = Config::parse_from([
        "ancestral",
        "--input",
        input.to_str().unwrap(),
        "--out",
        dir.path().join("bad").to_str().unwrap(),
    ]);
    let mut pipeline = InferencePipeline::new(config, None).unwrap();
    assert!(pipeline.run().is_err());
}

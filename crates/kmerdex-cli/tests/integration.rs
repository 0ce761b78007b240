use kmerdex_cli::input::{Input, Mode};
use kmerdex_cli::{command, Runner};
use kmerdex_core::error::LookupError;
use kmerdex_core::fanout::{IonCharge, MatchService, ReferenceMatch};
use std::path::Path;
use tempfile::TempDir;

const FASTA: &str = ">sp|P1|FIRST\nAC\n>sp|P2|SECOND\nGCA\n>sp|P3|BROKEN\nAC1\n";

// Two MS2 scans, the second carrying two peaks
const MZXML: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<mzXML><msRun scanCount="3">
  <scan num="1" msLevel="1"><peaks precision="32">P4AAAEAAAAA=</peaks></scan>
  <scan num="2" msLevel="2"><precursorMz precursorCharge="2">80.0</precursorMz><peaks precision="32"></peaks></scan>
  <scan num="3" msLevel="2"><precursorMz precursorCharge="2">500.25</precursorMz><peaks precision="32">QskAAEGgAABDekAAQgwAAA==</peaks></scan>
</msRun></mzXML>
"#;

/// Matches a weight to "HEAVY" above 400 Da and "LIGHT" otherwise; refuses
/// to answer for exactly 1000.5
struct Service;

impl MatchService for Service {
    fn lookup(
        &self,
        weight: f64,
        _: IonCharge,
        _: f64,
    ) -> Result<Vec<ReferenceMatch>, LookupError> {
        if weight == 1000.5 {
            return Err(LookupError::Status { status: 503 });
        }
        let name = match weight > 400.0 {
            true => "HEAVY",
            false => "LIGHT",
        };
        Ok(vec![ReferenceMatch {
            protein_name: name.into(),
            start_index: 0,
            kmers: Default::default(),
        }])
    }
}

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.display().to_string()
}

#[test]
fn build_pipeline() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let fasta = write(tmp.path(), "proteome.fasta", FASTA);
    let params = write(
        tmp.path(),
        "params.json",
        r#"{ "database": { "kmer_length": 9 } }"#,
    );
    let out = tmp.path().join("out");

    let matches = command().try_get_matches_from([
        "kmerdex",
        "build",
        params.as_str(),
        "--fasta",
        fasta.as_str(),
        "-o",
        out.to_str().unwrap(),
        "-k",
        "2",
        "--validate",
    ])?;
    let (_, matches) = matches.subcommand().unwrap();
    let settings = Input::from_arguments(matches, Mode::Build)?.build()?;
    assert_eq!(settings.database.kmer_length, 2);

    let settings = Runner::new(settings).run(Mode::Build)?;
    assert_eq!(settings.output_paths.len(), 3);

    let index = out.join("all_weight_protein_matches_kmer2.json");
    let database = kmerdex_io::index_json::deserialize_index(&index, 2)?;
    assert_eq!(database.buckets.len(), 2);
    assert_eq!(database.buckets[0].weight, 174.05);
    assert_eq!(database.size(), 3);

    let skipped = std::fs::read_to_string(out.join("skipped_proteins.tsv"))?;
    assert!(skipped.contains("sp|P3|BROKEN"));
    assert!(out.join("results.json").exists());
    Ok(())
}

#[test]
fn strict_build_fails() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let fasta = write(tmp.path(), "proteome.fasta", FASTA);
    let params = write(tmp.path(), "params.json", "{}");

    let matches = command().try_get_matches_from([
        "kmerdex",
        "build",
        params.as_str(),
        "-f",
        fasta.as_str(),
        "-o",
        tmp.path().to_str().unwrap(),
        "--strict",
    ])?;
    let (_, matches) = matches.subcommand().unwrap();
    let settings = Input::from_arguments(matches, Mode::Build)?.build()?;
    assert!(Runner::new(settings).run(Mode::Build).is_err());
    Ok(())
}

#[test]
fn required_parameters() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let params = write(tmp.path(), "params.json", "{}");

    let matches = command().try_get_matches_from(["kmerdex", "build", params.as_str()])?;
    let (_, matches) = matches.subcommand().unwrap();
    assert!(Input::from_arguments(matches, Mode::Build).is_err());

    let matches =
        command().try_get_matches_from(["kmerdex", "search", params.as_str(), "run.mzXML"])?;
    let (_, matches) = matches.subcommand().unwrap();
    let err = Input::from_arguments(matches, Mode::Search).unwrap_err();
    assert!(err.to_string().contains("service.url"));

    let missing = tmp.path().join("missing.json");
    let matches = command().try_get_matches_from([
        "kmerdex",
        "build",
        missing.to_str().unwrap(),
        "-f",
        "x.fasta",
    ])?;
    let (_, matches) = matches.subcommand().unwrap();
    assert!(Input::from_arguments(matches, Mode::Build).is_err());
    Ok(())
}

#[test]
fn search_pipeline() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let mzxml = write(tmp.path(), "run.mzXML", MZXML);
    let params = write(
        tmp.path(),
        "params.json",
        r#"{ "ion_charges": ["B"], "service": { "url": "http://localhost:7071/api/proteinmatch" } }"#,
    );

    let matches = command().try_get_matches_from([
        "kmerdex",
        "search",
        params.as_str(),
        mzxml.as_str(),
        "-o",
        tmp.path().to_str().unwrap(),
        "--workers",
        "4",
    ])?;
    let (_, matches) = matches.subcommand().unwrap();
    let settings = Input::from_arguments(matches, Mode::Search)?.build()?;
    assert_eq!(settings.workers, 4);

    let mut runner = Runner::new(settings);
    let results = runner.search_with(&Service)?;

    // Charge 1: 80, 500.25, 100.5, 250.25; charge 2: 160, 1000.5 (fails), 201, 500.5
    assert_eq!(results.sets.len(), 2);
    assert_eq!(results.len(), 7);
    assert_eq!(results.failures.len(), 1);
    assert_eq!(results.failures[0].charge_amount, 2);
    assert_eq!(
        results.protein_counts(),
        vec![("HEAVY".to_string(), 2), ("LIGHT".to_string(), 5)]
    );

    let counts = std::fs::read_to_string(tmp.path().join("protein_counts.tsv"))?;
    assert_eq!(counts, "protein\treference_matches\nHEAVY\t2\nLIGHT\t5\n");

    let failures = std::fs::read_to_string(tmp.path().join("failed_lookups.tsv"))?;
    assert_eq!(failures.lines().count(), 2);
    assert!(failures.contains("B\t2\t1000.5\t999999"));

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(
        tmp.path().join("fragment_reference_matches.json"),
    )?)?;
    assert_eq!(json[0]["charge_amount"], 1);
    assert_eq!(json[0]["results"][0]["fragment"]["weight"], 80.0);
    assert_eq!(json[0]["results"][0]["matches"][0]["ProteinName"], "LIGHT");
    assert_eq!(runner.parameters.output_paths.len(), 3);
    Ok(())
}

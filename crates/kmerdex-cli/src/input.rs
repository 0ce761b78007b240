use anyhow::{ensure, Context};
use clap::ArgMatches;
use kmerdex_core::database::{Builder, Parameters};
use kmerdex_core::fanout::{Execution, Fanout, IonCharge};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::path::PathBuf;
use std::time::Duration;

/// Which pipeline the parameters are resolved for
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Build,
    Search,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ServiceSettings {
    pub url: String,
    pub timeout_secs: u64,
    pub retries: u32,
}

impl ServiceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Serialize, Clone, Debug)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Settings {
    pub version: String,
    pub database: Parameters,
    pub mzxml_paths: Vec<String>,
    pub ms_level: u8,
    pub service: Option<ServiceSettings>,
    pub ion_charges: Vec<IonCharge>,
    pub charge_amounts: Vec<u8>,
    pub ppm_tolerance: f64,
    pub workers: usize,
    pub parallel: bool,
    pub fail_fast: bool,
    pub output_paths: Vec<String>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,

    /// Reload the written index and compare it against the built one
    #[serde(skip_serializing)]
    pub validate_index: bool,
}

impl Settings {
    pub fn fanout(&self) -> Fanout {
        Fanout {
            ion_charges: self.ion_charges.clone(),
            charge_amounts: self.charge_amounts.clone(),
            ppm_tolerance: self.ppm_tolerance,
            execution: match self.parallel {
                true => Execution::Parallel {
                    workers: self.workers,
                },
                false => Execution::Sequential,
            },
            fail_fast: self.fail_fast,
        }
    }
}

#[derive(Deserialize, Default, Debug)]
pub struct ServiceOptions {
    url: Option<String>,
    timeout_secs: Option<u64>,
    retries: Option<u32>,
}

#[derive(Deserialize, Default, Debug)]
/// Input parameters deserialized from JSON file
pub struct Input {
    #[serde(default)]
    database: Builder,
    output_directory: Option<String>,
    mzxml_paths: Option<Vec<String>>,
    ms_level: Option<u8>,
    service: Option<ServiceOptions>,
    ion_charges: Option<Vec<IonCharge>>,
    charge_amounts: Option<Vec<u8>>,
    ppm_tolerance: Option<f64>,
    workers: Option<usize>,
    parallel: Option<bool>,
    fail_fast: Option<bool>,

    #[serde(skip)]
    validate_index: bool,
}

impl Input {
    pub fn from_arguments(matches: &ArgMatches, mode: Mode) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .context("missing parameters file")?;
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }

        match mode {
            Mode::Build => {
                if let Some(fasta) = matches.get_one::<String>("fasta") {
                    log::trace!("overriding `database.fasta` parameter.");
                    input.database.update_fasta(fasta.into());
                }
                if let Some(kmer_length) = matches.get_one::<usize>("kmer_length").copied() {
                    log::trace!("overriding `database.kmer_length` parameter.");
                    input.database.kmer_length = Some(kmer_length);
                }
                if matches.get_flag("strict") {
                    input.database.strict = Some(true);
                }
                input.validate_index = matches.get_flag("validate");

                ensure!(
                    input.database.fasta.is_some(),
                    "`database.fasta` must be set. For more information try '--help'"
                );
            }
            Mode::Search => {
                if let Some(mzxml_paths) = matches.get_many::<String>("mzxml_paths") {
                    log::trace!("overriding `mzxml_paths` parameter.");
                    input.mzxml_paths = Some(mzxml_paths.map(|p| p.into()).collect());
                }
                if let Some(url) = matches.get_one::<String>("url") {
                    log::trace!("overriding `service.url` parameter.");
                    input.service.get_or_insert_with(Default::default).url = Some(url.into());
                }
                if let Some(workers) = matches.get_one::<usize>("workers").copied() {
                    input.workers = Some(workers);
                }
                if matches.get_flag("sequential") {
                    input.parallel = Some(false);
                }
                if matches.get_flag("fail_fast") {
                    input.fail_fast = Some(true);
                }

                ensure!(
                    input.mzxml_paths.is_some(),
                    "`mzxml_paths` must be set. For more information try '--help'"
                );
                ensure!(
                    input.service.as_ref().and_then(|s| s.url.as_ref()).is_some(),
                    "`service.url` must be set. For more information try '--help'"
                );
            }
        }

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        kmerdex_io::read_json(path.as_ref()).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Settings> {
        let database = self.database.make_parameters()?;
        if database.kmer_length > 50 {
            log::warn!(
                "`database.kmer_length` of {} is longer than most peptide fragments",
                database.kmer_length
            );
        }

        let service = match self.service {
            Some(ServiceOptions {
                url: Some(url),
                timeout_secs,
                retries,
            }) => {
                let service = ServiceSettings {
                    url,
                    timeout_secs: timeout_secs.unwrap_or(30),
                    retries: retries.unwrap_or(2),
                };
                ensure!(
                    service.timeout_secs > 0,
                    "`service.timeout_secs` must be greater than 0"
                );
                Some(service)
            }
            _ => None,
        };

        let ion_charges = dedup(
            "ion_charges",
            self.ion_charges
                .unwrap_or_else(|| vec![IonCharge::B, IonCharge::Y]),
        );
        ensure!(!ion_charges.is_empty(), "`ion_charges` must not be empty");

        let charge_amounts = dedup(
            "charge_amounts",
            self.charge_amounts.unwrap_or_else(|| vec![1, 2]),
        );
        ensure!(
            !charge_amounts.is_empty() && charge_amounts.iter().all(|&c| c > 0),
            "`charge_amounts` must be a non-empty list of positive charges"
        );

        let ppm_tolerance = self.ppm_tolerance.unwrap_or(0.01);
        ensure!(
            ppm_tolerance > 0.0,
            "`ppm_tolerance` must be greater than 0"
        );
        if ppm_tolerance > 100.0 {
            log::warn!("`ppm_tolerance` is higher than expected: {}", ppm_tolerance);
        }

        let workers = self.workers.unwrap_or(16);
        ensure!(workers >= 1, "`workers` must be at least 1");

        let output_directory = match self.output_directory {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::create_dir_all(&path).with_context(|| {
                    format!("Failed to create output directory `{}`", path.display())
                })?;
                path
            }
            None => std::env::current_dir()?,
        };

        Ok(Settings {
            version: clap::crate_version!().into(),
            database,
            mzxml_paths: self.mzxml_paths.unwrap_or_default(),
            ms_level: self.ms_level.unwrap_or(2),
            service,
            ion_charges,
            charge_amounts,
            ppm_tolerance,
            workers,
            parallel: self.parallel.unwrap_or(true),
            fail_fast: self.fail_fast.unwrap_or(false),
            output_paths: Vec::new(),
            output_directory,
            validate_index: self.validate_index,
        })
    }
}

/// Drop repeated entries, keeping the first occurrence of each
fn dedup<T: Copy + Eq + Hash + Debug>(field: &str, mut values: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    let len = values.len();
    values.retain(|value| seen.insert(*value));
    if values.len() < len {
        log::warn!("`{}` lists duplicate entries, using {:?}", field, values);
    }
    values
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() -> anyhow::Result<()> {
        let input: Input = serde_json::from_str(
            r#"{ "database": { "fasta": "proteome.fasta" }, "service": { "url": "http://localhost/api" } }"#,
        )?;
        let settings = input.build()?;
        assert_eq!(settings.database.kmer_length, 9);
        assert!(!settings.database.strict);
        assert_eq!(settings.ms_level, 2);
        assert_eq!(settings.ion_charges, vec![IonCharge::B, IonCharge::Y]);
        assert_eq!(settings.charge_amounts, vec![1, 2]);
        assert_eq!(settings.ppm_tolerance, 0.01);
        assert_eq!(
            settings.service,
            Some(ServiceSettings {
                url: "http://localhost/api".into(),
                timeout_secs: 30,
                retries: 2
            })
        );
        assert_eq!(
            settings.fanout().execution,
            Execution::Parallel { workers: 16 }
        );
        Ok(())
    }

    #[test]
    fn sequential_fanout() -> anyhow::Result<()> {
        let input: Input = serde_json::from_str(
            r#"{ "ion_charges": ["Y"], "charge_amounts": [3], "parallel": false, "fail_fast": true }"#,
        )?;
        let fanout = input.build()?.fanout();
        assert_eq!(fanout.ion_charges, vec![IonCharge::Y]);
        assert_eq!(fanout.charge_amounts, vec![3]);
        assert_eq!(fanout.execution, Execution::Sequential);
        assert!(fanout.fail_fast);
        Ok(())
    }

    #[test]
    fn rejects_invalid_values() {
        for json in [
            r#"{ "database": { "kmer_length": 0 } }"#,
            r#"{ "charge_amounts": [] }"#,
            r#"{ "charge_amounts": [1, 0] }"#,
            r#"{ "ion_charges": [] }"#,
            r#"{ "ppm_tolerance": -1.0 }"#,
            r#"{ "workers": 0 }"#,
            r#"{ "service": { "url": "http://localhost", "timeout_secs": 0 } }"#,
        ] {
            let input: Input = serde_json::from_str(json).unwrap();
            assert!(input.build().is_err(), "{} should be rejected", json);
        }
    }

    #[test]
    fn duplicate_charges_are_dropped() -> anyhow::Result<()> {
        let input: Input = serde_json::from_str(
            r#"{ "ion_charges": ["Y", "B", "Y"], "charge_amounts": [2, 1, 2, 2] }"#,
        )?;
        let settings = input.build()?;
        assert_eq!(settings.ion_charges, vec![IonCharge::Y, IonCharge::B]);
        assert_eq!(settings.charge_amounts, vec![2, 1]);
        Ok(())
    }

    #[test]
    fn unknown_ion_charge() {
        assert!(serde_json::from_str::<Input>(r#"{ "ion_charges": ["C"] }"#).is_err());
    }
}

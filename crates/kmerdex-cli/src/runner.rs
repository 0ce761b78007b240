use crate::input::{Mode, Settings};
use anyhow::Context;
use kmerdex_core::database::IndexedDatabase;
use kmerdex_core::fanout::{FanoutResults, MatchService};
use kmerdex_core::spectrum::{Precursor, PrecursorSummary};
use kmerdex_io::index_json;
use kmerdex_io::service::HttpMatchService;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

pub struct Runner {
    pub parameters: Settings,
    start: Instant,
}

impl Runner {
    pub fn new(parameters: Settings) -> Self {
        Self {
            parameters,
            start: Instant::now(),
        }
    }

    // Create a path for `file_name` in the output directory
    pub(crate) fn make_path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        self.parameters.output_directory.join(file_name.as_ref())
    }

    /// Build the k-mer weight index from the configured FASTA file and write
    /// it to the output directory
    pub fn build_index(&mut self) -> anyhow::Result<IndexedDatabase> {
        let fasta_path = self
            .parameters
            .database
            .fasta
            .clone()
            .context("`database.fasta` must be set")?;

        let start = Instant::now();
        let fasta = kmerdex_io::read_fasta(&fasta_path)
            .with_context(|| format!("Failed to build database from `{}`", fasta_path))?;
        let database = self.parameters.database.build(&fasta)?;

        info!(
            "generated {} windows, {} weight buckets covering {} proteins in {:#?}",
            database.size(),
            database.buckets.len(),
            database.proteins,
            start.elapsed()
        );
        if !database.skipped.is_empty() {
            log::warn!(
                "skipped {} proteins containing unknown residues",
                database.skipped.len()
            );
            let path = self.write_skipped(&database)?;
            self.parameters.output_paths.push(path);
        }

        let path = index_json::serialize_index(&database, &self.parameters.output_directory)
            .with_context(|| "Failed to save index")?;
        info!("saved index to {}", path.display());

        if self.parameters.validate_index {
            info!("validating written index...");
            let loaded = index_json::deserialize_index(&path, database.kmer_length)
                .with_context(|| format!("Failed to load index from `{}`", path.display()))?;
            index_json::validate_index(&database, &loaded)
                .with_context(|| "Index validation failed")?;
            info!("index validation passed!");
        }

        self.parameters.output_paths.push(path.display().to_string());
        Ok(database)
    }

    fn read_precursors(&self) -> anyhow::Result<Vec<Precursor>> {
        let mut precursors = Vec::new();
        for path in &self.parameters.mzxml_paths {
            let start = Instant::now();
            let scans = kmerdex_io::read_mzxml(path, self.parameters.ms_level)
                .with_context(|| format!("Failed to read spectra from `{}`", path))?;
            info!(
                "read {} MS{} spectra from {} in {:#?}",
                scans.len(),
                self.parameters.ms_level,
                path,
                start.elapsed()
            );
            precursors.extend(scans);
        }
        Ok(precursors)
    }

    /// Look up every charge-adjusted fragment of the configured mzXML files
    /// against `service`
    pub fn search_with<S: MatchService + ?Sized>(
        &mut self,
        service: &S,
    ) -> anyhow::Result<FanoutResults> {
        let precursors = self.read_precursors()?;
        let summary = PrecursorSummary::from(precursors.as_slice());
        info!("- precursors:          {:8}", summary.precursors);
        info!("- fragments:           {:8}", summary.total_fragments);
        info!("- fragments/precursor: {:8.2}", summary.average_fragments);
        info!("- lowest fragments:    {:8}", summary.lowest_fragments);
        info!("- highest fragments:   {:8}", summary.highest_fragments);

        let start = Instant::now();
        let results = self.parameters.fanout().run(service, &precursors)?;
        let duration = start.elapsed().as_millis() as usize;
        let lookups = results.len() + results.failures.len();
        info!(
            "- lookups: {:8} ms ({} lookups/s)",
            duration,
            lookups * 1000 / (duration + 1)
        );
        info!("- fragment matches:    {:8}", results.len());
        if !results.failures.is_empty() {
            log::warn!("{} of {} lookups failed", results.failures.len(), lookups);
        }

        let paths = vec![
            self.write_matches(&results)?,
            self.write_protein_counts(&results)?,
            self.write_failures(&results)?,
        ];
        self.parameters.output_paths.extend(paths);
        Ok(results)
    }

    pub fn search(&mut self) -> anyhow::Result<FanoutResults> {
        let settings = self
            .parameters
            .service
            .clone()
            .context("`service.url` must be set")?;
        let service = HttpMatchService::new(&settings.url, settings.timeout(), settings.retries)?;
        self.search_with(&service)
    }

    pub fn run(mut self, mode: Mode) -> anyhow::Result<Settings> {
        match mode {
            Mode::Build => {
                self.build_index()?;
            }
            Mode::Search => {
                self.search()?;
            }
        }

        let path = self.make_path("results.json");
        self.parameters
            .output_paths
            .push(path.display().to_string());
        println!("{}", serde_json::to_string_pretty(&self.parameters)?);
        kmerdex_io::write_json(&path, &self.parameters)?;

        let run_time = (Instant::now() - self.start).as_secs();
        info!("finished in {}s", run_time);
        Ok(self.parameters)
    }
}

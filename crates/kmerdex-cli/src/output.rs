use crate::Runner;
use kmerdex_core::database::IndexedDatabase;
use kmerdex_core::fanout::FanoutResults;

impl Runner {
    fn write_tsv(&self, file_name: &str, wtr: csv::Writer<Vec<u8>>) -> anyhow::Result<String> {
        let path = self.make_path(file_name);
        let bytes = wtr.into_inner()?;
        kmerdex_io::write_bytes(&path, &bytes)?;
        Ok(path.display().to_string())
    }

    fn tsv_writer() -> csv::Writer<Vec<u8>> {
        csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(vec![])
    }

    pub fn write_matches(&self, results: &FanoutResults) -> anyhow::Result<String> {
        let path = self.make_path("fragment_reference_matches.json");
        kmerdex_io::write_json(&path, &results.sets)?;
        Ok(path.display().to_string())
    }

    pub fn write_protein_counts(&self, results: &FanoutResults) -> anyhow::Result<String> {
        let mut wtr = Self::tsv_writer();
        wtr.write_record(["protein", "reference_matches"])?;
        for (protein, count) in results.protein_counts() {
            wtr.write_record([protein, count.to_string()])?;
        }
        wtr.flush()?;
        self.write_tsv("protein_counts.tsv", wtr)
    }

    pub fn write_failures(&self, results: &FanoutResults) -> anyhow::Result<String> {
        let mut wtr = Self::tsv_writer();
        wtr.write_record([
            "ion_charge",
            "charge_amount",
            "weight",
            "abundance",
            "error",
        ])?;
        for failed in &results.failures {
            wtr.write_record([
                failed.ion_charge.to_string(),
                failed.charge_amount.to_string(),
                failed.fragment.weight.to_string(),
                failed.fragment.abundance.to_string(),
                failed.error.to_string(),
            ])?;
        }
        wtr.flush()?;
        self.write_tsv("failed_lookups.tsv", wtr)
    }

    pub fn write_skipped(&self, database: &IndexedDatabase) -> anyhow::Result<String> {
        let mut wtr = Self::tsv_writer();
        wtr.write_record(["description", "reason"])?;
        for skipped in &database.skipped {
            wtr.write_record([skipped.description.as_str(), skipped.reason.as_str()])?;
        }
        wtr.flush()?;
        self.write_tsv("skipped_proteins.tsv", wtr)
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::data::filter::discover;
use crate::data::loader::load_measurement;
use crate::data::model::FrequencyReport;
use crate::error::{ConvertError, Result};

/// Name of the report written into the input directory.
pub const OUTPUT_FILE_NAME: &str = "frequencies.json";

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// One-shot conversion of a directory of measurement pickles.
#[derive(Debug, Clone)]
pub struct Converter {
    input_dir: PathBuf,
}

impl Converter {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Where [`Converter::run`] writes the report.
    pub fn output_path(&self) -> PathBuf {
        self.input_dir.join(OUTPUT_FILE_NAME)
    }

    /// Discover, decode and accumulate every measurement file.
    ///
    /// Touches nothing on disk. The first bad file aborts the whole batch.
    pub fn collect(&self) -> Result<FrequencyReport> {
        let files = discover(&self.input_dir)?;
        info!(
            "found {} measurement file(s) in {}",
            files.len(),
            self.input_dir.display()
        );

        let mut report = FrequencyReport::new();
        for path in &files {
            let measurement = load_measurement(path)?;
            let voltage = measurement.voltage.clone();
            if report.insert(measurement).is_some() {
                warn!(
                    "{} replaces earlier results for {voltage}V",
                    path.display()
                );
            }
        }
        Ok(report)
    }

    /// Collect and write the report, returning the path written.
    ///
    /// Nothing is written unless every input file converted cleanly.
    pub fn run(&self) -> Result<PathBuf> {
        let report = self.collect()?;
        let output = self.output_path();
        write_report(&report, &output)?;
        info!(
            "wrote {} voltage(s) to {}",
            report.len(),
            output.display()
        );
        Ok(output)
    }
}

/// Serialize `report` and write it to `path`, replacing any existing file.
///
/// The document is fully encoded before the file is touched.
pub fn write_report(report: &FrequencyReport, path: &Path) -> Result<()> {
    let bytes = report.to_json_pretty()?;
    debug!("writing {} bytes to {}", bytes.len(), path.display());
    fs::write(path, bytes).map_err(|source| ConvertError::Write {
        path: path.to_path_buf(),
        source,
    })
}

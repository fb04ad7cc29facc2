//! The seam shared by the clock, reset and power generators.

use std::fmt;
use std::path::PathBuf;

use serde_yaml::Value;

use crate::celllib::{CellCatalog, CellFileOutcome, CellFilePolicy, CellLibrary};
use crate::diag::Diagnostics;
use crate::error::Result;
use crate::report::GenerationReport;

/// Per-instance generator settings.
#[derive(Debug, Clone, Default)]
pub struct GeneratorOptions {
    /// Directory holding the shared cell library. `None` leaves cell files alone.
    pub cell_dir: Option<PathBuf>,
    /// Rewrite the cell library in full instead of merging.
    pub force_overwrite: bool,
}

impl GeneratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cell_dir = Some(dir.into());
        self
    }

    pub fn force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }
}

/// A controller generator: one YAML node in, one Verilog module out.
pub trait Generator {
    /// Top-level YAML key this generator handles.
    fn domain(&self) -> &'static str;

    fn options(&self) -> &GeneratorOptions;

    /// Template cells the generated modules instantiate.
    fn catalog(&self) -> CellCatalog;

    fn cell_policy(&self) -> CellFilePolicy;

    /// Parse, validate and emit one controller.
    ///
    /// Nothing is written to `out` unless the call succeeds.
    fn generate(&self, node: &Value, out: &mut dyn fmt::Write) -> Result<GenerationReport>;

    /// Bring the shared cell library up to date, if a directory is configured.
    fn update_cell_library(&self) -> Result<Option<CellFileOutcome>> {
        let options = self.options();
        let Some(dir) = &options.cell_dir else {
            return Ok(None);
        };
        CellLibrary::new(dir)
            .update(&self.catalog(), self.cell_policy(), options.force_overwrite)
            .map(Some)
    }

    /// Final step of a pass: refuse on aborting diagnostics, update the cell
    /// library, then hand the rendered module to the sink.
    fn finish(
        &self,
        module_name: String,
        text: String,
        diags: Diagnostics,
        out: &mut dyn fmt::Write,
    ) -> Result<GenerationReport> {
        diags.check()?;
        let cell_file = self.update_cell_library()?;
        out.write_str(&text)?;
        Ok(GenerationReport {
            domain: self.domain(),
            module_name,
            diagnostics: diags.into_vec(),
            cell_file,
        })
    }
}

//! CLI command implementations.

pub mod cells;
pub mod generate;
pub mod init;

use ctrlgen_clock::ClockGenerator;
use ctrlgen_core::generator::{Generator, GeneratorOptions};
use ctrlgen_power::PowerGenerator;
use ctrlgen_reset::ResetGenerator;

use crate::OutputSettings;

/// Top-level YAML keys, in generation order.
pub const DOMAINS: [&str; 3] = ["clock", "reset", "power"];

/// One generator per domain, all writing cell libraries into the output directory.
pub fn generators(settings: &OutputSettings) -> Vec<Box<dyn Generator>> {
    let options = GeneratorOptions::new()
        .with_cell_dir(&settings.dir)
        .force_overwrite(settings.force_overwrite);
    vec![
        Box::new(ClockGenerator::new(options.clone())),
        Box::new(ResetGenerator::new(options.clone())),
        Box::new(PowerGenerator::new(options)),
    ]
}

//! `ctrlgen cells`: write or refresh the shared cell libraries.

use std::fs;

use anyhow::{Context, Result};

use crate::commands::generators;
use crate::OutputSettings;

pub fn run(settings: &OutputSettings) -> Result<()> {
    fs::create_dir_all(&settings.dir)
        .with_context(|| format!("creating {}", settings.dir.display()))?;
    for generator in generators(settings) {
        let outcome = generator
            .update_cell_library()
            .with_context(|| format!("updating {} cell library", generator.domain()))?;
        if let Some(outcome) = outcome {
            println!(
                "{}: {} ({outcome:?})",
                generator.domain(),
                settings.dir.join(generator.catalog().file_name()).display()
            );
        }
    }
    Ok(())
}

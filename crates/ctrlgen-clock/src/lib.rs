//! Clock controller generation.
//!
//! Turns a `clock` YAML node into a Verilog module with per-target processing
//! chains: link-level ICG, divider and inverter stages, an optional
//! multiplexer over the links, then the same stages at target level.
//!
//! ## Modules
//!
//! - [`config`] — Typed controller model and parser
//! - [`ports`] — Port collection through the shared registry
//! - [`chain`] — Stage, multiplexer and STA-guide emission
//! - [`cells`] — The `clock_cell.v` catalogue

pub mod cells;
pub mod chain;
pub mod config;
pub mod ports;

use std::fmt;

use ctrlgen_core::celllib::{CellCatalog, CellFilePolicy};
use ctrlgen_core::diag::Diagnostics;
use ctrlgen_core::error::Result;
use ctrlgen_core::generator::{Generator, GeneratorOptions};
use ctrlgen_core::naming::{clock_link_base, clock_link_instance};
use ctrlgen_core::registry::SignalRegistry;
use ctrlgen_core::report::GenerationReport;
use ctrlgen_core::verilog::ModuleText;
use serde_yaml::Value;

use chain::{emit_chain, emit_mux, ChainNames};
pub use config::ClockControllerConfig;

/// Generator for the `clock` domain.
#[derive(Debug, Clone, Default)]
pub struct ClockGenerator {
    options: GeneratorOptions,
}

impl ClockGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        ClockGenerator { options }
    }
}

impl Generator for ClockGenerator {
    fn domain(&self) -> &'static str {
        "clock"
    }

    fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    fn catalog(&self) -> CellCatalog {
        cells::catalog()
    }

    fn cell_policy(&self) -> CellFilePolicy {
        CellFilePolicy::AppendMissing
    }

    fn generate(&self, node: &Value, out: &mut dyn fmt::Write) -> Result<GenerationReport> {
        let mut diags = Diagnostics::new(self.domain());
        let config = config::parse(node, &mut diags)?;
        let ports = ports::collect(&config, &mut diags);
        let text = render(&config, &ports);
        log::debug!(
            "clock controller `{}`: {} target(s), {} port(s)",
            config.name,
            config.targets.len(),
            ports.len()
        );
        self.finish(config.module_name.clone(), text, diags, out)
    }
}

/// Render the controller module.
pub fn render(config: &ClockControllerConfig, ports: &SignalRegistry) -> String {
    let mut module = ModuleText::new(&config.module_name);
    module.describe(format!("Clock controller {}", config.name));
    module.describe("");
    module.describe(format!(
        "{} input(s), {} target(s)",
        config.inputs.len(),
        config.targets.len()
    ));
    if let Some(reference) = &config.ref_clock {
        module.describe(format!("Reference clock: {reference}"));
    }
    let test_enable = config.default_test_enable();

    for target in &config.targets {
        let title = match &target.freq {
            Some(freq) => format!("Target {} ({freq})", target.name),
            None => format!("Target {}", target.name),
        };
        module.section(&title);

        let mut link_outputs = Vec::with_capacity(target.links.len());
        for link in &target.links {
            let names = ChainNames::new(
                clock_link_base(&target.name, &link.source, link.index),
                clock_link_instance(&target.name, &link.source, link.index),
            );
            let fragment = emit_chain(&link.stages, &link.source, &names, test_enable);
            module.raw(&fragment.text);
            let signal = if link.invert {
                format!("~{}", fragment.output)
            } else {
                fragment.output
            };
            link_outputs.push(signal);
        }

        let mut current = match &target.mux {
            Some(mux) => {
                let fragment = emit_mux(&target.name, mux, &link_outputs, test_enable);
                module.raw(&fragment.text);
                fragment.output
            }
            None => link_outputs.swap_remove(0),
        };

        let names = ChainNames::new(format!("clk_{}", target.name), format!("u_{}", target.name));
        let fragment = emit_chain(&target.stages, &current, &names, test_enable);
        module.raw(&fragment.text);
        current = fragment.output;
        module.assign(&target.name, &current);
    }

    module.render(ports)
}

//! Reset controller generation.
//!
//! Each target combines one or more reset sources. A source is normalized to
//! active-low, optionally shaped by a chain of synchronizer, pipeline and
//! counter cells, and ANDed with the other links of the target. The result is
//! shaped again at target level and driven out at the target's own polarity.
//! An optional recorder captures which source caused the last reset.
//!
//! ## Modules
//!
//! - [`config`] — Typed controller model and parser
//! - [`ports`] — Port collection
//! - [`chain`] — Shaping component emission
//! - [`reason`] — Sticky reset reason recorder
//! - [`cells`] — The `reset_cell.v` catalogue

pub mod cells;
pub mod chain;
pub mod config;
pub mod ports;
pub mod reason;

use std::fmt;

use ctrlgen_core::celllib::{CellCatalog, CellFilePolicy};
use ctrlgen_core::diag::Diagnostics;
use ctrlgen_core::error::Result;
use ctrlgen_core::generator::{Generator, GeneratorOptions};
use ctrlgen_core::naming::{invert_expr, reset_link_wire};
use ctrlgen_core::registry::SignalRegistry;
use ctrlgen_core::report::GenerationReport;
use ctrlgen_core::verilog::ModuleText;
use serde_yaml::Value;

use chain::emit_chain;
use config::Active;
pub use config::ResetControllerConfig;

/// Generator for the `reset` domain.
#[derive(Debug, Clone, Default)]
pub struct ResetGenerator {
    options: GeneratorOptions,
}

impl ResetGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        ResetGenerator { options }
    }
}

impl Generator for ResetGenerator {
    fn domain(&self) -> &'static str {
        "reset"
    }

    fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    fn catalog(&self) -> CellCatalog {
        cells::catalog()
    }

    fn cell_policy(&self) -> CellFilePolicy {
        CellFilePolicy::AlwaysRegenerate
    }

    fn generate(&self, node: &Value, out: &mut dyn fmt::Write) -> Result<GenerationReport> {
        let mut diags = Diagnostics::new(self.domain());
        let config = config::parse(node, &mut diags)?;
        let ports = ports::collect(&config, &mut diags);
        let text = render(&config, &ports, &mut diags);
        log::debug!(
            "reset controller `{}`: {} source(s), {} target(s)",
            config.name,
            config.sources.len(),
            config.targets.len()
        );
        self.finish(config.module_name.clone(), text, diags, out)
    }
}

/// Render the controller module.
pub fn render(
    config: &ResetControllerConfig,
    ports: &SignalRegistry,
    diags: &mut Diagnostics,
) -> String {
    let mut module = ModuleText::new(&config.module_name);
    module.describe(format!("Reset controller {}", config.name));
    module.describe("");
    module.describe(format!(
        "{} source(s), {} target(s)",
        config.sources.len(),
        config.targets.len()
    ));
    if config.reason.is_some() {
        module.describe("Includes a reset reason recorder");
    }

    for target in &config.targets {
        let title = match &target.comment {
            Some(comment) => format!("Target {}: {comment}", target.name),
            None => format!("Target {}", target.name),
        };
        module.section(&title);

        if target.links.is_empty() {
            diags.warning(format!(
                "target `{}` has no valid links and is tied inactive",
                target.name
            ));
            let inactive = match target.active {
                Active::Low => "1'b1",
                Active::High => "1'b0",
            };
            module.assign(&target.name, inactive);
            continue;
        }

        let mut link_wires = Vec::with_capacity(target.links.len());
        for (index, link) in target.links.iter().enumerate() {
            let input = config
                .source(&link.source)
                .map(|s| s.normalized())
                .unwrap_or_else(|| link.source.clone());
            let base = format!("{}_link{index}", target.name);
            let fragment = emit_chain(&link.components, &input, &target.name, &base, Some(index));
            module.raw(&fragment.text);
            let wire = reset_link_wire(&target.name, index);
            module.wire_assign(&wire, &fragment.output);
            link_wires.push(wire);
        }

        let combined = if link_wires.len() == 1 {
            link_wires.swap_remove(0)
        } else {
            let all = format!("{}_all_n", target.name);
            module.wire_assign(&all, &link_wires.join(" & "));
            all
        };

        let fragment = emit_chain(&target.components, &combined, &target.name, &target.name, None);
        module.raw(&fragment.text);
        let drive = match target.active {
            Active::Low => fragment.output,
            Active::High => invert_expr(&fragment.output),
        };
        module.assign(&target.name, &drive);
    }

    if let Some(reason) = &config.reason {
        module.section(&format!(
            "Reset reason recorder (root: {})",
            reason.root_reset
        ));
        module.raw(&reason::emit(config, reason));
    }

    module.render(ports)
}

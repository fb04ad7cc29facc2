//! Power controller generation.
//!
//! One sequencing FSM per domain, all clocked by the host clock and reset.
//! Domains are ordered by hard and soft dependencies on each other's ready
//! outputs. Follow entries resynchronize the system reset, gated by the
//! domain's reset release, into domain clocks.
//!
//! ## Modules
//!
//! - [`config`] — Typed controller model, domain classification and parser
//! - [`deps`] — Dependency aggregation and cycle detection
//! - [`ports`] — Port collection
//! - [`emit`] — FSM and follow synchronizer instances
//! - [`cells`] — The `power_cell.v` catalogue

pub mod cells;
pub mod config;
pub mod deps;
pub mod emit;
pub mod ports;

use std::fmt;

use ctrlgen_core::celllib::{CellCatalog, CellFilePolicy};
use ctrlgen_core::diag::Diagnostics;
use ctrlgen_core::error::Result;
use ctrlgen_core::generator::{Generator, GeneratorOptions};
use ctrlgen_core::registry::SignalRegistry;
use ctrlgen_core::report::GenerationReport;
use ctrlgen_core::verilog::ModuleText;
use serde_yaml::Value;

pub use config::PowerControllerConfig;

/// Generator for the `power` domain.
#[derive(Debug, Clone, Default)]
pub struct PowerGenerator {
    options: GeneratorOptions,
}

impl PowerGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        PowerGenerator { options }
    }
}

impl Generator for PowerGenerator {
    fn domain(&self) -> &'static str {
        "power"
    }

    fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    fn catalog(&self) -> CellCatalog {
        cells::catalog()
    }

    fn cell_policy(&self) -> CellFilePolicy {
        CellFilePolicy::RegenerateIfIncomplete
    }

    fn generate(&self, node: &Value, out: &mut dyn fmt::Write) -> Result<GenerationReport> {
        let mut diags = Diagnostics::new(self.domain());
        let config = config::parse(node, &mut diags)?;
        deps::check(&config, &mut diags);
        let ports = ports::collect(&config, &mut diags);
        let text = render(&config, &ports);
        log::debug!(
            "power controller `{}`: {} domain(s), {} port(s)",
            config.name,
            config.domains.len(),
            ports.len()
        );
        self.finish(config.module_name.clone(), text, diags, out)
    }
}

/// Render the controller module.
pub fn render(config: &PowerControllerConfig, ports: &SignalRegistry) -> String {
    let mut module = ModuleText::new(&config.module_name);
    module.describe(format!("Power controller {}", config.name));
    module.describe("");
    module.describe(format!(
        "{} domain(s) sequenced on {} / {}",
        config.domains.len(),
        config.host_clock,
        config.host_reset
    ));

    module.section("Dependency aggregation");
    for domain in &config.domains {
        module.raw(&emit::dependency_wires(domain));
    }

    module.section("Power FSM instances");
    for domain in &config.domains {
        module.instance(&emit::fsm_instance(config, domain));
    }

    if config.has_follow_entries() {
        module.section("Follow reset synchronizers");
        for domain in &config.domains {
            module.raw(&emit::follow_synchronizers(config, domain));
        }
    }

    module.render(ports)
}

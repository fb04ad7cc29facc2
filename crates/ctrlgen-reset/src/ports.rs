//! Port collection for a reset controller.

use ctrlgen_core::diag::Diagnostics;
use ctrlgen_core::naming::identifiers;
use ctrlgen_core::registry::{Port, SignalRegistry};

use crate::config::{Component, ResetControllerConfig, ResetSource};

fn source_comment(source: &ResetSource) -> String {
    match &source.comment {
        Some(comment) => format!("{comment} ({})", source.active),
        None => source.active.to_string(),
    }
}

pub fn collect(config: &ResetControllerConfig, diags: &mut Diagnostics) -> SignalRegistry {
    let mut ports = SignalRegistry::new();

    if let Some(clock) = &config.clock {
        ports.declare(Port::input(clock).comment("controller clock"), diags);
    }
    if let Some(test_enable) = &config.test_enable {
        ports.declare(Port::input(test_enable).comment("test enable"), diags);
    }
    for source in &config.sources {
        ports.declare(
            Port::input(&source.name).comment(source_comment(source)),
            diags,
        );
    }

    for target in &config.targets {
        let comment = match &target.comment {
            Some(comment) => format!("{comment} ({})", target.active),
            None => target.active.to_string(),
        };
        ports.declare(Port::output(&target.name).comment(comment), diags);
        for link in &target.links {
            component_ports(&link.components, &mut ports, diags);
        }
        component_ports(&target.components, &mut ports, diags);
    }

    if let Some(reason) = &config.reason {
        ports.input(&reason.clock, diags);
        if let Some(clear) = &reason.clear {
            ports.declare(Port::input(clear).comment("reset reason clear"), diags);
        }
        ports.declare(
            Port::output(&reason.output)
                .width(reason.vector_width())
                .comment("reset reason flags"),
            diags,
        );
        ports.declare(
            Port::output(&reason.valid).comment("reset reason valid"),
            diags,
        );
    }
    ports
}

fn component_ports(components: &[Component], ports: &mut SignalRegistry, diags: &mut Diagnostics) {
    for component in components {
        ports.input(&component.clock, diags);
        for name in identifiers(&component.test_enable) {
            ports.input(name, diags);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse;
    use ctrlgen_core::registry::PortDirection;
    use serde_yaml::Value;

    #[test]
    fn collects_sources_targets_and_component_clocks() {
        let node: Value = serde_yaml::from_str(
            r#"
name: r0
source: {por_n: low, wdt_rst: {active: high, comment: watchdog}}
target:
  sys_rst_n:
    active: low
    link: {por_n: {async: {clock: clk_sys, test_enable: dft_en}}, wdt_rst: {}}
reason: {root_reset: por_n, clock: clk_ao, clear: rsn_clr}
"#,
        )
        .unwrap();
        let mut diags = ctrlgen_core::diag::Diagnostics::new("reset");
        let config = parse(&node, &mut diags).unwrap();
        let ports = collect(&config, &mut diags);
        let names: Vec<&str> = ports.ports().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            ["por_n", "wdt_rst", "sys_rst_n", "clk_sys", "dft_en", "clk_ao", "rsn_clr", "reason", "reason_valid"]
        );
        assert_eq!(ports.direction("reason"), Some(PortDirection::Output));
        let wdt = ports.ports().iter().find(|p| p.name == "wdt_rst").unwrap();
        assert_eq!(wdt.comment.as_deref(), Some("watchdog (active-high)"));
    }
}

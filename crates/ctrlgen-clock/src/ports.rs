//! Port collection for a clock controller.
//!
//! Inputs are seeded first, then each target contributes its output followed
//! by every control signal it references. The registry resolves names that are
//! both produced and consumed (cascaded targets) to a single output.

use ctrlgen_core::diag::Diagnostics;
use ctrlgen_core::naming::{identifiers, select_width};
use ctrlgen_core::registry::{Port, SignalRegistry};

use crate::config::{ClockControllerConfig, DividerControl, MuxKind, Stage};

pub fn collect(config: &ClockControllerConfig, diags: &mut Diagnostics) -> SignalRegistry {
    let mut ports = SignalRegistry::new();

    for input in &config.inputs {
        ports.declare(
            Port::input(&input.name).comment_opt(input.port_comment().as_deref()),
            diags,
        );
    }
    if let Some(reference) = &config.ref_clock {
        ports.declare(Port::input(reference).comment("reference clock"), diags);
    }
    if let Some(test_enable) = &config.test_enable {
        ports.declare(Port::input(test_enable).comment("test enable"), diags);
    }

    for target in &config.targets {
        ports.declare(
            Port::output(&target.name).comment_opt(target.port_comment().as_deref()),
            diags,
        );
        for link in &target.links {
            ports.input(&link.source, diags);
            let owner = format!("target `{}` link `{}`", target.name, link.source);
            stage_ports(&link.stages, &owner, &mut ports, diags);
        }
        if let Some(mux) = &target.mux {
            ports.declare(
                Port::input(&mux.select).width(select_width(target.links.len())),
                diags,
            );
            if let MuxKind::GlitchFree {
                reset,
                test_enable,
                test_clock,
            } = &mux.kind
            {
                ports.input(reset, diags);
                for signal in [test_enable, test_clock].into_iter().flatten() {
                    ports.input(signal, diags);
                }
            }
        }
        let owner = format!("target `{}`", target.name);
        stage_ports(&target.stages, &owner, &mut ports, diags);
    }
    ports
}

fn stage_ports(stages: &[Stage], owner: &str, ports: &mut SignalRegistry, diags: &mut Diagnostics) {
    for stage in stages {
        match stage {
            Stage::Icg(icg) => {
                expression_inputs(&icg.enable, ports, diags);
                if let Some(te) = &icg.test_enable {
                    ports.input(te, diags);
                }
            }
            Stage::Div(div) => {
                for signal in [&div.reset, &div.test_enable].into_iter().flatten() {
                    ports.input(signal, diags);
                }
                if let Some(enable) = &div.enable {
                    expression_inputs(enable, ports, diags);
                }
                if let DividerControl::Dynamic {
                    value,
                    valid,
                    ready,
                } = &div.control
                {
                    if ports.reserve_unique(value, owner, diags) {
                        ports.declare(Port::input(value).width(div.width), diags);
                    }
                    if let Some(valid) = valid {
                        if ports.reserve_unique(valid, owner, diags) {
                            ports.input(valid, diags);
                        }
                    }
                    if let Some(ready) = ready {
                        if ports.reserve_unique(ready, owner, diags) {
                            ports.output(ready, diags);
                        }
                    }
                }
                if let Some(count) = &div.count {
                    if ports.reserve_unique(count, owner, diags) {
                        ports.declare(Port::output(count).width(div.width), diags);
                    }
                }
            }
            Stage::Inv(_) => {}
        }
    }
}

fn expression_inputs(expr: &str, ports: &mut SignalRegistry, diags: &mut Diagnostics) {
    for name in identifiers(expr) {
        ports.input(name, diags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use ctrlgen_core::registry::PortDirection;
    use serde_yaml::Value;

    fn collect_str(text: &str) -> (SignalRegistry, Diagnostics) {
        let node: Value = serde_yaml::from_str(text).unwrap();
        let mut diags = Diagnostics::new("clock");
        let config = config::parse(&node, &mut diags).unwrap();
        let ports = collect(&config, &mut diags);
        (ports, diags)
    }

    #[test]
    fn cascaded_target_is_declared_once_as_output() {
        let (ports, _) = collect_str(
            r#"
name: c0
input: {osc: {}}
target:
  clk_a: {link: {clk_b: {}}}
  clk_b: {link: {osc: {}}}
"#,
        );
        let names: Vec<_> = ports.ports().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["osc", "clk_a", "clk_b"]);
        assert_eq!(ports.direction("clk_b"), Some(PortDirection::Output));
    }

    #[test]
    fn test_clock_reused_from_output_is_not_an_input() {
        let (ports, _) = collect_str(
            r#"
name: c0
input: {a: {}, b: {}}
target:
  clk_test: {link: {a: {}}}
  clk_func:
    link: {a: {}, b: {}}
    select: sel
    reset: rst_n
    test_enable: te
    test_clock: clk_test
"#,
        );
        assert_eq!(ports.direction("clk_test"), Some(PortDirection::Output));
        assert_eq!(
            ports.ports().iter().filter(|p| p.name == "clk_test").count(),
            1
        );
        assert_eq!(ports.direction("rst_n"), Some(PortDirection::Input));
        assert_eq!(ports.direction("te"), Some(PortDirection::Input));
    }

    #[test]
    fn select_width_matches_link_count() {
        let (ports, _) = collect_str(
            r#"
name: c0
input: {a: {}, b: {}, c: {}}
target:
  clk0: {link: {a: {}, b: {}, c: {}}, select: sel}
"#,
        );
        let sel = ports.ports().iter().find(|p| p.name == "sel").unwrap();
        assert_eq!(sel.width, 2);
    }

    #[test]
    fn duplicate_dynamic_divider_signal_aborts() {
        let (_, diags) = collect_str(
            r#"
name: c0
input: {osc: {}}
target:
  clk_a: {link: {osc: {}}, div: {default: 2, width: 4, value: div_cfg}}
  clk_b: {link: {osc: {}}, div: {default: 2, width: 4, value: div_cfg}}
"#,
        );
        assert!(diags.has_aborts());
    }

    #[test]
    fn divider_buses_use_resolved_width() {
        let (ports, diags) = collect_str(
            r#"
name: c0
input: {osc: {}}
target:
  clk_a:
    link: {osc: {}}
    div: {default: 2, width: 4, value: div_cfg, valid: div_vld, ready: div_rdy, count: div_cnt}
"#,
        );
        assert!(!diags.has_aborts());
        let find = |n: &str| ports.ports().iter().find(|p| p.name == n).unwrap().clone();
        assert_eq!(find("div_cfg").width, 4);
        assert_eq!(find("div_cnt").width, 4);
        assert_eq!(find("div_cnt").direction, PortDirection::Output);
        assert_eq!(find("div_rdy").direction, PortDirection::Output);
        assert_eq!(find("div_vld").direction, PortDirection::Input);
    }

    #[test]
    fn icg_expression_declares_each_signal() {
        let (ports, _) = collect_str(
            "name: c0\ninput: {osc: {}}\ntarget: {clk0: {link: {osc: {}}, icg: {enable: 'en & mode'}}}",
        );
        assert!(ports.contains("en"));
        assert!(ports.contains("mode"));
    }
}

//! Per-domain emission: dependency wires, FSM instance and follow synchronizers.

use std::fmt::Write;

use ctrlgen_core::verilog::Instance;

use crate::config::{DependencyKind, DomainKind, PowerControllerConfig, PowerDomain};
use crate::deps::{aggregate_expr, aggregate_wire, ready_signal};

pub const FSM_CELL: &str = "qsoc_power_fsm";
pub const RST_SYNC_CELL: &str = "qsoc_power_rst_sync";

/// Gate wire releasing follow resets of `domain`.
pub fn reset_gate_wire(domain: &str) -> String {
    format!("rst_gate_{domain}_n")
}

/// `wire dep_hard_all_<d> = ...;` and the soft counterpart.
pub fn dependency_wires(domain: &PowerDomain) -> String {
    let mut out = String::new();
    for kind in [DependencyKind::Hard, DependencyKind::Soft] {
        let _ = writeln!(
            out,
            "    wire {} = {};",
            aggregate_wire(&domain.name, kind),
            aggregate_expr(domain, kind)
        );
    }
    out
}

pub fn fsm_instance(config: &PowerControllerConfig, domain: &PowerDomain) -> Instance {
    let d = &domain.name;
    let always_on = domain.kind.is_always_on();
    let comment = match domain.v_mv {
        Some(mv) => format!("{d}: {}, {mv} mV", domain.kind.describe()),
        None => format!("{d}: {}", domain.kind.describe()),
    };
    let (enable, clear, switch) = match domain.kind {
        DomainKind::AlwaysOn => ("1'b1".to_string(), "1'b0".to_string(), String::new()),
        DomainKind::Root | DomainKind::Normal => {
            (format!("en_{d}"), format!("clr_{d}"), format!("sw_{d}"))
        }
    };
    Instance::new(FSM_CELL, format!("u_pwr_{d}"))
        .comment(comment)
        .param("HAS_SWITCH", if always_on { 0 } else { 1 })
        .param("WAIT_DEP_CYCLES", domain.wait_dep)
        .param("SETTLE_ON_CYCLES", domain.settle_on)
        .param("SETTLE_OFF_CYCLES", domain.settle_off)
        .connect("clk", config.host_clock.as_str())
        .connect("rst_n", config.host_reset.as_str())
        .connect("test_en", config.test_enable_or_tie())
        .connect("ctrl_enable", enable)
        .connect("fault_clear", clear)
        .connect("dep_hard_all", aggregate_wire(d, DependencyKind::Hard))
        .connect("dep_soft_all", aggregate_wire(d, DependencyKind::Soft))
        .connect("pgood", domain.pgood.as_deref().unwrap_or("1'b1"))
        .connect("clk_enable", format!("icg_en_{d}"))
        .connect("rst_allow", format!("rst_allow_{d}"))
        .connect("pwr_switch", switch)
        .connect("ready", ready_signal(d))
        .connect("valid", "")
        .connect("fault", format!("flt_{d}"))
}

/// Gate wire and one synchronizer per surviving follow entry.
pub fn follow_synchronizers(config: &PowerControllerConfig, domain: &PowerDomain) -> String {
    if domain.follow.is_empty() {
        return String::new();
    }
    let d = &domain.name;
    let gate = reset_gate_wire(d);
    let mut out = String::new();
    let _ = writeln!(out, "    wire {gate} = rst_allow_{d};");
    for entry in &domain.follow {
        let instance = Instance::new(RST_SYNC_CELL, format!("u_rst_sync_{d}_{}", entry.index))
            .param("STAGE", entry.stage)
            .connect("clk_dom", entry.clock.as_str())
            .connect("rst_gate_n", format!("rst_sys_n & {gate}"))
            .connect("test_en", config.test_enable_or_tie())
            .connect("rst_dom_n", entry.reset.as_str());
        out.push_str(&instance.render());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse;
    use ctrlgen_core::diag::Diagnostics;
    use serde_yaml::Value;

    fn config(text: &str) -> PowerControllerConfig {
        let node: Value = serde_yaml::from_str(text).unwrap();
        parse(&node, &mut Diagnostics::new("power")).unwrap()
    }

    fn squash(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    const TWO: &str = r#"
name: p0
host_clock: clk_ao
host_reset: rst_ao_n
domain:
  - {name: aon, v_mv: 800}
  - name: cpu
    depend: [{name: aon}]
    pgood: cpu_pg
    follow: [{clock: clk_cpu, reset: cpu_rst_n}]
"#;

    #[test]
    fn always_on_fsm_has_no_switch() {
        let cfg = config(TWO);
        let text = squash(&fsm_instance(&cfg, &cfg.domains[0]).render());
        assert!(text.contains("/*aon:AOdomain(nodependkey),800mV*/"));
        assert!(text.contains(".HAS_SWITCH(0)"));
        assert!(text.contains(".ctrl_enable(1'b1)"));
        assert!(text.contains(".fault_clear(1'b0)"));
        assert!(text.contains(".pwr_switch()"));
        assert!(text.contains(".pgood(1'b1)"));
        assert!(text.contains(".test_en(1'b0)"));
    }

    #[test]
    fn normal_fsm_uses_controls() {
        let cfg = config(TWO);
        let text = squash(&fsm_instance(&cfg, &cfg.domains[1]).render());
        assert!(text.contains("qsoc_power_fsm#(.HAS_SWITCH(1),.WAIT_DEP_CYCLES(100),.SETTLE_ON_CYCLES(100),.SETTLE_OFF_CYCLES(50))u_pwr_cpu("));
        assert!(text.contains(".ctrl_enable(en_cpu)"));
        assert!(text.contains(".pwr_switch(sw_cpu)"));
        assert!(text.contains(".dep_hard_all(dep_hard_all_cpu)"));
        assert!(text.contains(".pgood(cpu_pg)"));
        assert!(text.contains(".valid()"));
        assert!(squash(&dependency_wires(&cfg.domains[1])).contains("wiredep_hard_all_cpu=rdy_aon;wiredep_soft_all_cpu=1'b1;"));
    }

    #[test]
    fn follow_sync_gates_system_reset() {
        let cfg = config(TWO);
        assert!(follow_synchronizers(&cfg, &cfg.domains[0]).is_empty());
        let text = squash(&follow_synchronizers(&cfg, &cfg.domains[1]));
        assert!(text.contains("wirerst_gate_cpu_n=rst_allow_cpu;"));
        assert!(text.contains("qsoc_power_rst_sync#(.STAGE(4))u_rst_sync_cpu_0("));
        assert!(text.contains(".rst_gate_n(rst_sys_n&rst_gate_cpu_n)"));
        assert!(text.contains(".rst_dom_n(cpu_rst_n)"));
    }
}

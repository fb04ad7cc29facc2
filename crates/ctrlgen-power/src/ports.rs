//! Port collection for a power controller.
//!
//! All inputs are declared before any output so the header reads as
//! controls first, status second.

use std::collections::HashSet;

use ctrlgen_core::diag::Diagnostics;
use ctrlgen_core::naming::identifiers;
use ctrlgen_core::registry::{Port, SignalRegistry};

use crate::config::{DependencyKind, PowerControllerConfig};
use crate::deps::{aggregate_wire, external_dependencies, ready_signal};
use crate::emit::reset_gate_wire;

pub fn collect(config: &PowerControllerConfig, diags: &mut Diagnostics) -> SignalRegistry {
    let mut ports = SignalRegistry::new();
    ports.declare(Port::input(&config.host_clock).comment("host clock"), diags);
    ports.declare(Port::input(&config.host_reset).comment("host reset, active-low"), diags);
    if let Some(test_enable) = &config.test_enable {
        ports.declare(Port::input(test_enable).comment("test enable"), diags);
    }
    if config.has_follow_entries() {
        ports.declare(Port::input("rst_sys_n").comment("system reset for follow resets"), diags);
    }

    for domain in &config.domains {
        let d = &domain.name;
        if let Some(pgood) = &domain.pgood {
            for name in identifiers(pgood) {
                ports.declare(Port::input(name).comment(format!("{d} power good")), diags);
            }
        }
        if !domain.kind.is_always_on() {
            ports.declare(Port::input(format!("en_{d}")).comment(format!("enable {d}")), diags);
            ports.declare(
                Port::input(format!("clr_{d}")).comment(format!("clear {d} fault")),
                diags,
            );
        }
        for entry in &domain.follow {
            ports.declare(
                Port::input(&entry.clock).comment(format!("{d} follow clock")),
                diags,
            );
        }
    }
    for name in external_dependencies(config) {
        ports.declare(
            Port::input(ready_signal(name)).comment(format!("external {name} ready")),
            diags,
        );
    }

    for domain in &config.domains {
        let d = &domain.name;
        ports.declare(
            Port::output(format!("icg_en_{d}")).comment(format!("{d} clock enable")),
            diags,
        );
        ports.declare(
            Port::output(format!("rst_allow_{d}")).comment(format!("{d} reset release")),
            diags,
        );
        if !domain.kind.is_always_on() {
            ports.declare(
                Port::output(format!("sw_{d}")).comment(format!("{d} power switch")),
                diags,
            );
        }
        ports.declare(Port::output(ready_signal(d)).comment(format!("{d} ready")), diags);
        ports.declare(Port::output(format!("flt_{d}")).comment(format!("{d} fault")), diags);
    }
    let internal = internal_wires(config);
    for domain in &config.domains {
        for entry in &domain.follow {
            let owner = format!("domain `{}` follow #{}", domain.name, entry.index);
            if !ports.reserve_unique(&entry.reset, &owner, diags) {
                continue;
            }
            if ports.contains(&entry.reset) || internal.contains(&entry.reset) {
                diags.reject(format!(
                    "{owner}: reset `{}` collides with a signal the controller already uses",
                    entry.reset
                ));
                continue;
            }
            ports.declare(
                Port::output(&entry.reset)
                    .comment(format!("{} reset in {}", domain.name, entry.clock)),
                diags,
            );
        }
    }
    ports
}

/// Wires declared inside the module body.
fn internal_wires(config: &PowerControllerConfig) -> HashSet<String> {
    let mut wires = HashSet::new();
    for domain in &config.domains {
        wires.insert(aggregate_wire(&domain.name, DependencyKind::Hard));
        wires.insert(aggregate_wire(&domain.name, DependencyKind::Soft));
        if !domain.follow.is_empty() {
            wires.insert(reset_gate_wire(&domain.name));
        }
    }
    wires
}

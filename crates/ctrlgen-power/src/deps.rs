//! Domain dependency graph: aggregation signals and cycle detection.

use std::collections::HashMap;

use ctrlgen_core::diag::Diagnostics;

use crate::config::{DependencyKind, PowerControllerConfig, PowerDomain};

/// Ready output of a domain, also the dependency input of its dependents.
pub fn ready_signal(domain: &str) -> String {
    format!("rdy_{domain}")
}

/// Name of the aggregated dependency wire for `kind`.
pub fn aggregate_wire(domain: &str, kind: DependencyKind) -> String {
    format!("dep_{kind}_all_{domain}")
}

/// AND of the ready signals of every `kind` dependency, `1'b1` when there are none.
pub fn aggregate_expr(domain: &PowerDomain, kind: DependencyKind) -> String {
    let signals: Vec<String> = domain
        .dependencies(kind)
        .map(|d| ready_signal(&d.name))
        .collect();
    if signals.is_empty() {
        "1'b1".to_string()
    } else {
        signals.join(" & ")
    }
}

/// Dependencies that name no declared domain, in first-seen order.
pub fn external_dependencies(config: &PowerControllerConfig) -> Vec<&str> {
    let mut external: Vec<&str> = Vec::new();
    for domain in &config.domains {
        for dep in &domain.depends {
            if config.domain(&dep.name).is_none() && !external.contains(&dep.name.as_str()) {
                external.push(&dep.name);
            }
        }
    }
    external
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Every dependency cycle among declared domains, each as the list of domain
/// names along the cycle. Search order follows declaration order.
pub fn find_cycles(config: &PowerControllerConfig) -> Vec<Vec<String>> {
    let index: HashMap<&str, usize> = config
        .domains
        .iter()
        .enumerate()
        .map(|(i, d)| (d.name.as_str(), i))
        .collect();
    let edges: Vec<Vec<usize>> = config
        .domains
        .iter()
        .map(|d| {
            d.depends
                .iter()
                .filter_map(|dep| index.get(dep.name.as_str()).copied())
                .collect()
        })
        .collect();

    let mut marks = vec![Mark::Unvisited; edges.len()];
    let mut stack = Vec::new();
    let mut cycles = Vec::new();
    for start in 0..edges.len() {
        if marks[start] == Mark::Unvisited {
            visit(start, &edges, &mut marks, &mut stack, &mut cycles);
        }
    }
    cycles
        .into_iter()
        .map(|cycle: Vec<usize>| cycle.into_iter().map(|i| config.domains[i].name.clone()).collect())
        .collect()
}

fn visit(
    node: usize,
    edges: &[Vec<usize>],
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
    cycles: &mut Vec<Vec<usize>>,
) {
    marks[node] = Mark::InProgress;
    stack.push(node);
    for &next in &edges[node] {
        match marks[next] {
            Mark::Unvisited => visit(next, edges, marks, stack, cycles),
            Mark::InProgress => {
                if let Some(pos) = stack.iter().position(|&n| n == next) {
                    cycles.push(stack[pos..].to_vec());
                }
            }
            Mark::Done => {}
        }
    }
    stack.pop();
    marks[node] = Mark::Done;
}

/// Report external dependencies as warnings and cycles as errors.
pub fn check(config: &PowerControllerConfig, diags: &mut Diagnostics) {
    for name in external_dependencies(config) {
        diags.warning(format!(
            "dependency `{name}` is not a domain of this controller; `{}` becomes an input",
            ready_signal(name)
        ));
    }
    for cycle in find_cycles(config) {
        let mut path = cycle.join(" -> ");
        if let Some(first) = cycle.first() {
            path.push_str(" -> ");
            path.push_str(first);
        }
        diags.error(format!("dependency cycle: {path}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse;
    use ctrlgen_core::diag::Severity;
    use serde_yaml::Value;

    fn config(text: &str) -> PowerControllerConfig {
        let node: Value = serde_yaml::from_str(text).unwrap();
        parse(&node, &mut Diagnostics::new("power")).unwrap()
    }

    #[test]
    fn aggregation_splits_hard_and_soft() {
        let cfg = config(
            r#"
name: p0
host_clock: clk
host_reset: rst_n
domain:
  - name: soc
    depend: [{name: vddcore}, {name: vddio, type: soft}, {name: vddpll, type: hard}]
"#,
        );
        let soc = &cfg.domains[0];
        assert_eq!(aggregate_expr(soc, DependencyKind::Hard), "rdy_vddcore & rdy_vddpll");
        assert_eq!(aggregate_expr(soc, DependencyKind::Soft), "rdy_vddio");
        assert_eq!(aggregate_wire("soc", DependencyKind::Soft), "dep_soft_all_soc");
        assert_eq!(external_dependencies(&cfg), ["vddcore", "vddio", "vddpll"]);
    }

    #[test]
    fn detects_cycle_once() {
        let cfg = config(
            r#"
name: p0
host_clock: clk
host_reset: rst_n
domain:
  - {name: a, depend: [{name: c}]}
  - {name: b, depend: [{name: a}]}
  - {name: c, depend: [{name: b}]}
  - {name: d, depend: [{name: a}]}
"#,
        );
        let cycles = find_cycles(&cfg);
        assert_eq!(cycles, vec![vec!["a".to_string(), "c".into(), "b".into()]]);
        let mut diags = Diagnostics::new("power");
        check(&cfg, &mut diags);
        assert!(diags.mentions(Severity::Error, "a -> c -> b -> a"));
    }

    #[test]
    fn acyclic_graph_is_clean() {
        let cfg = config(
            r#"
name: p0
host_clock: clk
host_reset: rst_n
domain:
  - {name: top, depend: []}
  - {name: mid, depend: [{name: top}]}
  - {name: leaf, depend: [{name: mid}, {name: top, type: soft}]}
"#,
        );
        assert!(find_cycles(&cfg).is_empty());
        let mut diags = Diagnostics::new("power");
        check(&cfg, &mut diags);
        assert!(diags.is_empty());
    }
}

//! Typed reset controller model and its YAML parser.

use std::collections::HashSet;
use std::fmt;

use ctrlgen_core::diag::Diagnostics;
use ctrlgen_core::error::{GenError, Result};
use ctrlgen_core::naming::is_valid_identifier;
use ctrlgen_core::yaml::{self, Entry};
use serde::Deserialize;
use serde_yaml::Value;

/// Active level of a reset signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Active {
    High,
    Low,
}

impl fmt::Display for Active {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Active::High => write!(f, "active-high"),
            Active::Low => write!(f, "active-low"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResetSource {
    pub name: String,
    pub active: Active,
    pub comment: Option<String>,
}

impl ResetSource {
    /// The source as an active-low expression.
    pub fn normalized(&self) -> String {
        match self.active {
            Active::Low => self.name.clone(),
            Active::High => format!("~{}", self.name),
        }
    }
}

/// The three reset shaping cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Asynchronous assert, synchronous release (`qsoc_rst_sync`).
    Async,
    /// Fully synchronous pipeline (`qsoc_rst_pipe`).
    Sync,
    /// Release after a fixed number of cycles (`qsoc_rst_count`).
    Count,
}

impl ComponentKind {
    /// Chain order: async, sync, count.
    pub const ALL: [ComponentKind; 3] = [ComponentKind::Async, ComponentKind::Sync, ComponentKind::Count];

    pub fn key(self) -> &'static str {
        match self {
            ComponentKind::Async => "async",
            ComponentKind::Sync => "sync",
            ComponentKind::Count => "count",
        }
    }

    pub fn cell(self) -> &'static str {
        match self {
            ComponentKind::Async => "qsoc_rst_sync",
            ComponentKind::Sync => "qsoc_rst_pipe",
            ComponentKind::Count => "qsoc_rst_count",
        }
    }

    /// YAML key and Verilog parameter holding the depth.
    pub fn depth_key(self) -> (&'static str, &'static str) {
        match self {
            ComponentKind::Async | ComponentKind::Sync => ("stage", "STAGE"),
            ComponentKind::Count => ("cycle", "CYCLE"),
        }
    }

    pub fn default_depth(self) -> u64 {
        match self {
            ComponentKind::Async => 3,
            ComponentKind::Sync => 4,
            ComponentKind::Count => 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub kind: ComponentKind,
    pub clock: String,
    pub depth: u64,
    pub test_enable: String,
}

#[derive(Debug, Clone)]
pub struct ResetLink {
    pub source: String,
    pub components: Vec<Component>,
}

#[derive(Debug, Clone)]
pub struct ResetTarget {
    pub name: String,
    pub active: Active,
    pub comment: Option<String>,
    pub links: Vec<ResetLink>,
    pub components: Vec<Component>,
}

#[derive(Debug, Clone)]
pub struct ReasonConfig {
    pub clock: String,
    pub output: String,
    pub valid: String,
    pub clear: Option<String>,
    pub root_reset: String,
    /// Every declared source except the root, in declaration order. Bit `i`
    /// of the output records `source_order[i]`.
    pub source_order: Vec<String>,
}

impl ReasonConfig {
    pub fn vector_width(&self) -> u32 {
        u32::try_from(self.source_order.len()).unwrap_or(u32::MAX).max(1)
    }
}

#[derive(Debug, Clone)]
pub struct ResetControllerConfig {
    pub name: String,
    pub module_name: String,
    pub clock: Option<String>,
    pub test_enable: Option<String>,
    pub sources: Vec<ResetSource>,
    pub targets: Vec<ResetTarget>,
    pub reason: Option<ReasonConfig>,
}

impl ResetControllerConfig {
    pub fn source(&self, name: &str) -> Option<&ResetSource> {
        self.sources.iter().find(|s| s.name == name)
    }
}

/// Parse one reset controller node.
pub fn parse(node: &Value, diags: &mut Diagnostics) -> Result<ResetControllerConfig> {
    yaml::ensure_mapping(node, "reset controller")?;
    let name = yaml::required_str(node, "name", "reset controller")?;
    let ctx = format!("reset controller `{name}`");
    let module_name = yaml::str_field(node, "module_name").unwrap_or_else(|| name.clone());
    if !is_valid_identifier(&module_name) {
        return Err(GenError::InvalidValue {
            context: ctx,
            detail: format!("`{module_name}` is not a valid Verilog module name"),
        });
    }
    let clock = yaml::str_field(node, "clock");
    let test_enable = yaml::str_field(node, "test_enable");

    let sources = parse_sources(node, &ctx, diags)?;

    let target_entries = yaml::named_entries(yaml::get(node, "target"), &ctx)?;
    if target_entries.is_empty() {
        return Err(GenError::MissingField {
            context: ctx,
            field: "target".into(),
        });
    }
    let defaults = ComponentDefaults {
        clock: clock.as_deref(),
        test_enable: test_enable.as_deref(),
    };
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for entry in target_entries {
        if let Some(target) = parse_target(entry, &ctx, &sources, &defaults, &mut seen, diags) {
            targets.push(target);
        }
    }
    if targets.is_empty() {
        return Err(GenError::InvalidValue {
            context: ctx,
            detail: "no valid targets remain after validation".into(),
        });
    }

    let reason = match yaml::get(node, "reason") {
        Some(reason) if !reason.is_null() => {
            Some(parse_reason(reason, &ctx, clock.as_deref(), &sources)?)
        }
        _ => None,
    };

    Ok(ResetControllerConfig {
        name,
        module_name,
        clock,
        test_enable,
        sources,
        targets,
        reason,
    })
}

fn checked_name(entry: &Entry<'_>, ctx: &str, what: &str, diags: &mut Diagnostics) -> Option<String> {
    let Some(name) = entry.name else {
        diags.error(format!(
            "{ctx}: {what} #{} has no name and is skipped",
            entry.position
        ));
        return None;
    };
    if !is_valid_identifier(name) {
        diags.error(format!(
            "{ctx}: {what} `{name}` is not a valid Verilog identifier and is skipped"
        ));
        return None;
    }
    Some(name.to_string())
}

/// `active` from a mapping body, or the body itself for the `name: low` form.
fn active_of(node: &Value) -> Option<&Value> {
    match node {
        Value::Mapping(_) => yaml::get(node, "active").filter(|v| !v.is_null()),
        Value::Null => None,
        other => Some(other),
    }
}

fn parse_active(node: &Value, ctx: &str, diags: &mut Diagnostics) -> Option<Active> {
    let Some(value) = active_of(node) else {
        diags.error(format!("{ctx}: missing required `active` level; skipped"));
        return None;
    };
    match serde_yaml::from_value::<Active>(value.clone()) {
        Ok(active) => Some(active),
        Err(_) => {
            diags.error(format!("{ctx}: `active` must be `high` or `low`; skipped"));
            None
        }
    }
}

fn parse_sources(node: &Value, ctx: &str, diags: &mut Diagnostics) -> Result<Vec<ResetSource>> {
    let mut sources: Vec<ResetSource> = Vec::new();
    for entry in yaml::named_entries(yaml::get(node, "source"), ctx)? {
        let Some(name) = checked_name(&entry, ctx, "source", diags) else {
            continue;
        };
        let sctx = format!("{ctx} source `{name}`");
        if sources.iter().any(|s| s.name == name) {
            diags.error(format!("{sctx}: duplicate source ignored"));
            continue;
        }
        let Some(active) = parse_active(entry.node, &sctx, diags) else {
            continue;
        };
        sources.push(ResetSource {
            comment: yaml::str_field(entry.node, "comment"),
            name,
            active,
        });
    }
    Ok(sources)
}

struct ComponentDefaults<'a> {
    clock: Option<&'a str>,
    test_enable: Option<&'a str>,
}

fn parse_target(
    entry: Entry<'_>,
    ctx: &str,
    sources: &[ResetSource],
    defaults: &ComponentDefaults<'_>,
    seen: &mut HashSet<String>,
    diags: &mut Diagnostics,
) -> Option<ResetTarget> {
    let name = checked_name(&entry, ctx, "target", diags)?;
    let tctx = format!("{ctx} target `{name}`");
    if sources.iter().any(|s| s.name == name) {
        diags.error(format!("{tctx}: target has the same name as a source; skipped"));
        return None;
    }
    if !seen.insert(name.clone()) {
        diags.error(format!("{tctx}: duplicate target skipped"));
        return None;
    }
    let node = entry.node;
    let active = parse_active(node, &tctx, diags)?;

    let link_entries = match yaml::named_entries(yaml::get(node, "link"), &tctx) {
        Ok(entries) => entries,
        Err(e) => {
            diags.error(format!("{e}; target skipped"));
            return None;
        }
    };
    let mut links = Vec::new();
    for link in link_entries {
        let Some(source) = checked_name(&link, &tctx, "link", diags) else {
            continue;
        };
        let lctx = format!("{tctx} link `{source}`");
        if !sources.iter().any(|s| s.name == source) {
            diags.error(format!("{lctx}: source is not declared; link skipped"));
            continue;
        }
        links.push(ResetLink {
            components: parse_components(link.node, &lctx, defaults, diags),
            source,
        });
    }

    Some(ResetTarget {
        comment: yaml::str_field(node, "comment"),
        components: parse_components(node, &tctx, defaults, diags),
        name,
        active,
        links,
    })
}

/// Components configured on a link or target, in async, sync, count order.
fn parse_components(
    node: &Value,
    ctx: &str,
    defaults: &ComponentDefaults<'_>,
    diags: &mut Diagnostics,
) -> Vec<Component> {
    let mut components = Vec::new();
    for kind in ComponentKind::ALL {
        let Some(body) = yaml::get(node, kind.key()) else {
            continue;
        };
        let cctx = format!("{ctx} {}", kind.key());
        match body {
            Value::Mapping(_) | Value::Null | Value::Bool(true) => {}
            Value::Bool(false) => continue,
            _ => {
                diags.error(format!("{cctx}: expected a mapping; component skipped"));
                continue;
            }
        }
        let Some(clock) = yaml::str_field(body, "clock").or_else(|| defaults.clock.map(str::to_string)) else {
            diags.error(format!(
                "{cctx}: no `clock` given and the controller has none; component skipped"
            ));
            continue;
        };
        let (depth_key, _) = kind.depth_key();
        let depth = match yaml::u64_field(body, depth_key, &cctx) {
            Ok(Some(0)) => {
                diags.error(format!(
                    "{cctx}: `{depth_key}` must be at least 1; using {}",
                    kind.default_depth()
                ));
                kind.default_depth()
            }
            Ok(Some(depth)) => {
                if depth < 2 && kind != ComponentKind::Count {
                    diags.warning(format!(
                        "{cctx}: a single synchronizer stage does not protect against metastability"
                    ));
                }
                depth
            }
            Ok(None) => kind.default_depth(),
            Err(e) => {
                diags.error(format!("{e}; using {}", kind.default_depth()));
                kind.default_depth()
            }
        };
        let test_enable = yaml::str_field(body, "test_enable")
            .or_else(|| defaults.test_enable.map(str::to_string))
            .unwrap_or_else(|| "1'b0".to_string());
        components.push(Component {
            kind,
            clock,
            depth,
            test_enable,
        });
    }
    components
}

fn parse_reason(
    node: &Value,
    ctx: &str,
    controller_clock: Option<&str>,
    sources: &[ResetSource],
) -> Result<ReasonConfig> {
    let rctx = format!("{ctx} reason");
    yaml::ensure_mapping(node, &rctx)?;
    let root_reset = yaml::required_str(node, "root_reset", &rctx)?;
    if !sources.iter().any(|s| s.name == root_reset) {
        return Err(GenError::UndeclaredSource {
            context: format!("{rctx} root_reset"),
            source_name: root_reset,
        });
    }
    let clock = yaml::str_field(node, "clock")
        .or_else(|| controller_clock.map(str::to_string))
        .ok_or_else(|| GenError::MissingField {
            context: rctx.clone(),
            field: "clock".into(),
        })?;
    Ok(ReasonConfig {
        clock,
        output: yaml::str_field(node, "output").unwrap_or_else(|| "reason".into()),
        valid: yaml::str_field(node, "valid").unwrap_or_else(|| "reason_valid".into()),
        clear: yaml::str_field(node, "clear"),
        source_order: sources
            .iter()
            .filter(|s| s.name != root_reset)
            .map(|s| s.name.clone())
            .collect(),
        root_reset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctrlgen_core::diag::Severity;

    fn parse_str(text: &str) -> (Result<ResetControllerConfig>, Diagnostics) {
        let node: Value = serde_yaml::from_str(text).unwrap();
        let mut diags = Diagnostics::new("reset");
        let result = parse(&node, &mut diags);
        (result, diags)
    }

    #[test]
    fn requires_name_and_target() {
        let (result, _) = parse_str("source: {por_n: low}\ntarget: {t: {active: low}}");
        assert!(matches!(result, Err(GenError::MissingField { ref field, .. }) if field == "name"));
        let (result, _) = parse_str("name: r0\nsource: {por_n: low}");
        assert!(matches!(result, Err(GenError::MissingField { ref field, .. }) if field == "target"));
    }

    #[test]
    fn source_shorthand_and_normalization() {
        let (result, _) = parse_str(
            r#"
name: r0
source:
  por_n: low
  wdt_rst: {active: high}
target:
  sys_rst_n: {active: low, link: {por_n: {}}}
"#,
        );
        let config = result.unwrap();
        assert_eq!(config.source("por_n").unwrap().normalized(), "por_n");
        assert_eq!(config.source("wdt_rst").unwrap().normalized(), "~wdt_rst");
    }

    #[test]
    fn missing_active_skips_entry() {
        let (result, diags) = parse_str(
            r#"
name: r0
source:
  por_n: {}
  ext_n: low
target:
  bad: {link: {ext_n: {}}}
  good: {active: low, link: {por_n: {}, ext_n: {}}}
"#,
        );
        let config = result.unwrap();
        assert!(config.source("por_n").is_none());
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].links.len(), 1);
        assert_eq!(diags.count(Severity::Error), 3);
    }

    #[test]
    fn components_use_fixed_order_and_defaults() {
        let (result, _) = parse_str(
            r#"
name: r0
clock: clk_sys
test_enable: dft_en
source: {por_n: low}
target:
  t:
    active: low
    link:
      por_n:
        count: {cycle: 8}
        async: {}
        sync: {clock: clk_fast, stage: 2}
"#,
        );
        let config = result.unwrap();
        let comps = &config.targets[0].links[0].components;
        let kinds: Vec<_> = comps.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, [ComponentKind::Async, ComponentKind::Sync, ComponentKind::Count]);
        assert_eq!(comps[0].depth, 3);
        assert_eq!(comps[0].clock, "clk_sys");
        assert_eq!(comps[0].test_enable, "dft_en");
        assert_eq!(comps[1].clock, "clk_fast");
        assert_eq!(comps[2].depth, 8);
    }

    #[test]
    fn component_without_any_clock_is_skipped() {
        let (result, diags) = parse_str(
            "name: r0\nsource: {por_n: low}\ntarget: {t: {active: low, link: {por_n: {async: {}}}}}",
        );
        let config = result.unwrap();
        assert!(config.targets[0].links[0].components.is_empty());
        assert!(diags.mentions(Severity::Error, "no `clock`"));
    }

    #[test]
    fn stage_zero_uses_default_and_single_stage_warns() {
        let (result, diags) = parse_str(
            r#"
name: r0
clock: clk
source: {por_n: low}
target:
  t: {active: low, async: {stage: 0}, sync: {stage: 1}, link: {por_n: {}}}
"#,
        );
        let config = result.unwrap();
        let comps = &config.targets[0].components;
        assert_eq!(comps[0].depth, 3);
        assert_eq!(comps[1].depth, 1);
        assert_eq!(diags.count(Severity::Error), 1);
        assert_eq!(diags.count(Severity::Warning), 1);
    }

    #[test]
    fn reason_orders_non_root_sources() {
        let (result, _) = parse_str(
            r#"
name: r0
clock: clk_ao
source: {ext_n: low, por_n: low, wdt: high}
target: {t: {active: low, link: {por_n: {}}}}
reason: {root_reset: por_n}
"#,
        );
        let reason = result.unwrap().reason.unwrap();
        assert_eq!(reason.source_order, ["ext_n", "wdt"]);
        assert_eq!(reason.vector_width(), 2);
        assert_eq!(reason.output, "reason");
        assert_eq!(reason.valid, "reason_valid");
        assert_eq!(reason.clock, "clk_ao");
    }

    #[test]
    fn undeclared_root_reset_is_fatal() {
        let (result, _) = parse_str(
            r#"
name: r0
clock: clk
source: {por_n: low}
target: {t: {active: low, link: {por_n: {}}}}
reason: {root_reset: missing_n}
"#,
        );
        assert!(matches!(result, Err(GenError::UndeclaredSource { ref source_name, .. }) if source_name == "missing_n"));
    }
}

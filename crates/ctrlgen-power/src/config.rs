//! Typed power controller model and its YAML parser.
//!
//! Domain classification is decided here, once, from the shape of the
//! `depend` key: absent means always-on, present but empty means a root
//! domain, otherwise a normal domain with dependencies.

use std::collections::HashSet;
use std::fmt;

use ctrlgen_core::diag::Diagnostics;
use ctrlgen_core::error::{GenError, Result};
use ctrlgen_core::naming::is_valid_identifier;
use ctrlgen_core::yaml;
use serde::Deserialize;
use serde_yaml::Value;

pub const DEFAULT_WAIT_DEP: u64 = 100;
pub const DEFAULT_SETTLE_ON: u64 = 100;
pub const DEFAULT_SETTLE_OFF: u64 = 50;
pub const DEFAULT_FOLLOW_STAGE: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Hard,
    Soft,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKind::Hard => write!(f, "hard"),
            DependencyKind::Soft => write!(f, "soft"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub kind: DependencyKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    /// No `depend` key: no switch, always enabled.
    AlwaysOn,
    /// `depend: []`: switchable with no prerequisites.
    Root,
    Normal,
}

impl DomainKind {
    pub fn is_always_on(self) -> bool {
        self == DomainKind::AlwaysOn
    }

    pub fn describe(self) -> &'static str {
        match self {
            DomainKind::AlwaysOn => "AO domain (no depend key)",
            DomainKind::Root => "Root domain (depend: [])",
            DomainKind::Normal => "Normal domain",
        }
    }
}

/// A reset resynchronized into a domain clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowEntry {
    /// Position in the domain's `follow` list; names the synchronizer.
    pub index: usize,
    pub clock: String,
    pub reset: String,
    pub stage: u64,
}

#[derive(Debug, Clone)]
pub struct PowerDomain {
    pub name: String,
    pub kind: DomainKind,
    pub depends: Vec<Dependency>,
    /// Nominal voltage in millivolts. Documentation only.
    pub v_mv: Option<u64>,
    pub pgood: Option<String>,
    pub wait_dep: u64,
    pub settle_on: u64,
    pub settle_off: u64,
    pub follow: Vec<FollowEntry>,
}

impl PowerDomain {
    pub fn dependencies(&self, kind: DependencyKind) -> impl Iterator<Item = &Dependency> {
        self.depends.iter().filter(move |d| d.kind == kind)
    }
}

#[derive(Debug, Clone)]
pub struct PowerControllerConfig {
    pub name: String,
    pub module_name: String,
    pub host_clock: String,
    pub host_reset: String,
    pub test_enable: Option<String>,
    pub domains: Vec<PowerDomain>,
}

impl PowerControllerConfig {
    pub fn domain(&self, name: &str) -> Option<&PowerDomain> {
        self.domains.iter().find(|d| d.name == name)
    }

    pub fn test_enable_or_tie(&self) -> &str {
        self.test_enable.as_deref().unwrap_or("1'b0")
    }

    pub fn has_follow_entries(&self) -> bool {
        self.domains.iter().any(|d| !d.follow.is_empty())
    }
}

/// Parse one power controller node.
pub fn parse(node: &Value, diags: &mut Diagnostics) -> Result<PowerControllerConfig> {
    yaml::ensure_mapping(node, "power controller")?;
    let name = yaml::required_str(node, "name", "power controller")?;
    let ctx = format!("power controller `{name}`");
    let host_clock = yaml::required_str(node, "host_clock", &ctx)?;
    let host_reset = yaml::required_str(node, "host_reset", &ctx)?;
    let module_name = yaml::str_field(node, "module_name").unwrap_or_else(|| name.clone());
    if !is_valid_identifier(&module_name) {
        return Err(GenError::InvalidValue {
            context: ctx,
            detail: format!("`{module_name}` is not a valid Verilog module name"),
        });
    }
    let test_enable = yaml::str_field(node, "test_enable");

    let entries = yaml::named_entries(yaml::get(node, "domain"), &ctx)?;
    if entries.is_empty() {
        return Err(GenError::MissingField {
            context: ctx,
            field: "domain".into(),
        });
    }

    let host = HostSignals {
        clock: &host_clock,
        reset: &host_reset,
    };
    let mut seen = HashSet::new();
    let mut domains = Vec::new();
    for entry in entries {
        let Some(domain_name) = entry.name else {
            diags.error(format!(
                "{ctx}: domain #{} has no name and is skipped",
                entry.position
            ));
            continue;
        };
        if !is_valid_identifier(domain_name) {
            diags.error(format!(
                "{ctx}: domain `{domain_name}` is not a valid identifier and is skipped"
            ));
            continue;
        }
        if !seen.insert(domain_name.to_string()) {
            diags.error(format!("{ctx}: duplicate domain `{domain_name}` skipped"));
            continue;
        }
        let dctx = format!("{ctx} domain `{domain_name}`");
        match parse_domain(domain_name, entry.node, &dctx, &host, diags) {
            Ok(domain) => domains.push(domain),
            Err(e) => diags.error(format!("{e}; domain skipped")),
        }
    }
    if domains.is_empty() {
        return Err(GenError::InvalidValue {
            context: ctx,
            detail: "no valid domains remain after validation".into(),
        });
    }

    Ok(PowerControllerConfig {
        name,
        module_name,
        host_clock,
        host_reset,
        test_enable,
        domains,
    })
}

struct HostSignals<'a> {
    clock: &'a str,
    reset: &'a str,
}

fn parse_domain(
    name: &str,
    node: &Value,
    ctx: &str,
    host: &HostSignals<'_>,
    diags: &mut Diagnostics,
) -> Result<PowerDomain> {
    let (kind, depends) = match yaml::get(node, "depend") {
        None => (DomainKind::AlwaysOn, Vec::new()),
        Some(depend) => {
            let depends = parse_depends(name, depend, ctx, diags)?;
            let kind = if depends.is_empty() {
                DomainKind::Root
            } else {
                DomainKind::Normal
            };
            (kind, depends)
        }
    };

    let timer = |key: &str, default: u64| -> Result<u64> {
        Ok(yaml::u64_field(node, key, ctx)?.unwrap_or(default))
    };

    Ok(PowerDomain {
        name: name.to_string(),
        kind,
        depends,
        v_mv: yaml::u64_field(node, "v_mv", ctx)?,
        pgood: yaml::str_field(node, "pgood"),
        wait_dep: timer("wait_dep", DEFAULT_WAIT_DEP)?,
        settle_on: timer("settle_on", DEFAULT_SETTLE_ON)?,
        settle_off: timer("settle_off", DEFAULT_SETTLE_OFF)?,
        follow: parse_follow(node, ctx, host, diags),
    })
}

/// Dependencies in declaration order. Accepts `[{name, type}]`, bare names,
/// or a `name: type` mapping.
fn parse_depends(
    domain: &str,
    depend: &Value,
    ctx: &str,
    diags: &mut Diagnostics,
) -> Result<Vec<Dependency>> {
    let raw: Vec<(Option<String>, Option<&Value>)> = match depend {
        Value::Null => Vec::new(),
        Value::Sequence(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => (Some(s.trim().to_string()), None),
                other => (yaml::str_field(other, "name"), yaml::get(other, "type")),
            })
            .collect(),
        Value::Mapping(map) => map
            .iter()
            .map(|(key, body)| {
                let kind = if body.is_mapping() { yaml::get(body, "type") } else { Some(body) };
                (key.as_str().map(str::to_string), kind)
            })
            .collect(),
        _ => {
            return Err(GenError::InvalidValue {
                context: ctx.to_string(),
                detail: "`depend` must be a list".into(),
            })
        }
    };

    let mut depends: Vec<Dependency> = Vec::new();
    for (position, (dep_name, kind)) in raw.into_iter().enumerate() {
        let Some(dep_name) = dep_name.filter(|n| !n.is_empty()) else {
            diags.error(format!("{ctx}: dependency #{position} has no name; skipped"));
            continue;
        };
        if !is_valid_identifier(&dep_name) {
            diags.error(format!(
                "{ctx}: dependency `{dep_name}` is not a valid identifier; skipped"
            ));
            continue;
        }
        if dep_name == domain {
            diags.error(format!("{ctx}: domain depends on itself; dependency skipped"));
            continue;
        }
        let kind = match kind.filter(|v| !v.is_null()) {
            None => DependencyKind::Hard,
            Some(value) => match serde_yaml::from_value::<DependencyKind>(value.clone()) {
                Ok(kind) => kind,
                Err(_) => {
                    diags.error(format!(
                        "{ctx}: dependency `{dep_name}` has unknown type (expected hard or soft); skipped"
                    ));
                    continue;
                }
            },
        };
        if depends.iter().any(|d| d.name == dep_name) {
            diags.warning(format!("{ctx}: dependency `{dep_name}` listed twice"));
            continue;
        }
        depends.push(Dependency {
            name: dep_name,
            kind,
        });
    }
    Ok(depends)
}

fn parse_follow(
    node: &Value,
    ctx: &str,
    host: &HostSignals<'_>,
    diags: &mut Diagnostics,
) -> Vec<FollowEntry> {
    let mut entries = Vec::new();
    for (index, item) in yaml::items(node, "follow").into_iter().enumerate() {
        let fctx = format!("{ctx} follow #{index}");
        let (Some(clock), Some(reset)) = (yaml::str_field(item, "clock"), yaml::str_field(item, "reset"))
        else {
            diags.error(format!("{fctx}: `clock` and `reset` are required; entry skipped"));
            continue;
        };
        if clock == host.clock || reset == host.reset {
            diags.fatal(format!(
                "{fctx}: follow entry reuses the host clock or reset ({clock}, {reset}); entry dropped"
            ));
            continue;
        }
        let stage = match yaml::u64_field(item, "stage", &fctx) {
            Ok(Some(0)) => {
                diags.error(format!(
                    "{fctx}: `stage` must be at least 1; using {DEFAULT_FOLLOW_STAGE}"
                ));
                DEFAULT_FOLLOW_STAGE
            }
            Ok(Some(stage)) => {
                if stage < 2 {
                    diags.warning(format!(
                        "{fctx}: a single synchronizer stage does not protect against metastability"
                    ));
                }
                stage
            }
            Ok(None) => DEFAULT_FOLLOW_STAGE,
            Err(e) => {
                diags.error(format!("{e}; using {DEFAULT_FOLLOW_STAGE}"));
                DEFAULT_FOLLOW_STAGE
            }
        };
        entries.push(FollowEntry {
            index,
            clock,
            reset,
            stage,
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctrlgen_core::diag::Severity;

    fn parse_str(text: &str) -> (Result<PowerControllerConfig>, Diagnostics) {
        let node: Value = serde_yaml::from_str(text).unwrap();
        let mut diags = Diagnostics::new("power");
        let result = parse(&node, &mut diags);
        (result, diags)
    }

    #[test]
    fn host_signals_are_required() {
        let (result, _) = parse_str("name: p0\nhost_reset: rst_n\ndomain: [{name: ao}]");
        assert!(matches!(result, Err(GenError::MissingField { ref field, .. }) if field == "host_clock"));
        let (result, _) = parse_str("name: p0\nhost_clock: clk\ndomain: [{name: ao}]");
        assert!(matches!(result, Err(GenError::MissingField { ref field, .. }) if field == "host_reset"));
        let (result, _) = parse_str("name: p0\nhost_clock: clk\nhost_reset: rst_n");
        assert!(matches!(result, Err(GenError::MissingField { ref field, .. }) if field == "domain"));
    }

    #[test]
    fn classification_follows_depend_shape() {
        let (result, _) = parse_str(
            r#"
name: p0
host_clock: clk
host_reset: rst_n
domain:
  - {name: ao}
  - {name: root, depend: []}
  - {name: root2, depend: ~}
  - {name: cpu, depend: [{name: root}]}
"#,
        );
        let config = result.unwrap();
        let kinds: Vec<_> = config.domains.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            [DomainKind::AlwaysOn, DomainKind::Root, DomainKind::Root, DomainKind::Normal]
        );
        assert_eq!(config.domains[3].depends[0].kind, DependencyKind::Hard);
    }

    #[test]
    fn dependency_names_must_be_identifiers() {
        let (result, diags) = parse_str(
            r#"
name: p0
host_clock: clk
host_reset: rst_n
domain:
  - name: a
    depend:
      - {name: "vdd io"}
      - {name: "1v8"}
      - {name: vddio, type: soft}
"#,
        );
        let config = result.unwrap();
        let domain = &config.domains[0];
        assert_eq!(domain.kind, DomainKind::Normal);
        assert_eq!(domain.depends.len(), 1);
        assert_eq!(domain.depends[0].name, "vddio");
        assert!(diags.mentions(Severity::Error, "`vdd io` is not a valid identifier"));
        assert_eq!(diags.count(Severity::Error), 2);
    }

    #[test]
    fn timers_default_and_override() {
        let (result, _) = parse_str(
            "name: p0\nhost_clock: clk\nhost_reset: rst_n\ndomain: [{name: a, wait_dep: 10, v_mv: 900}]",
        );
        let domain = &result.unwrap().domains[0];
        assert_eq!(domain.wait_dep, 10);
        assert_eq!(domain.settle_on, DEFAULT_SETTLE_ON);
        assert_eq!(domain.settle_off, DEFAULT_SETTLE_OFF);
        assert_eq!(domain.v_mv, Some(900));
    }

    #[test]
    fn bad_dependencies_are_skipped() {
        let (result, diags) = parse_str(
            r#"
name: p0
host_clock: clk
host_reset: rst_n
domain:
  - name: gpu
    depend:
      - {name: gpu}
      - {name: vdd, type: maybe}
      - {name: io, type: soft}
      - aon
"#,
        );
        let domain = &result.unwrap().domains[0];
        let names: Vec<_> = domain.depends.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["io", "aon"]);
        assert_eq!(domain.depends[0].kind, DependencyKind::Soft);
        assert_eq!(diags.count(Severity::Error), 2);
    }

    #[test]
    fn follow_entry_on_host_clock_is_dropped_as_fatal() {
        let (result, diags) = parse_str(
            r#"
name: p0
host_clock: clk_ao
host_reset: rst_ao_n
domain:
  - name: cpu
    depend: []
    follow:
      - {clock: clk_ao, reset: cpu_rst_n}
      - {clock: clk_cpu, reset: cpu_core_rst_n, stage: 3}
      - {clock: clk_cpu}
"#,
        );
        let domain = &result.unwrap().domains[0];
        assert_eq!(domain.follow.len(), 1);
        assert_eq!(domain.follow[0].index, 1);
        assert_eq!(domain.follow[0].stage, 3);
        assert_eq!(diags.count(Severity::Fatal), 1);
        assert_eq!(diags.count(Severity::Error), 1);
        assert!(!diags.has_aborts());
    }
}

//! Typed clock controller model and its YAML parser.
//!
//! Parsing fails closed on the top-level requirements (`name`, at least one
//! input and one target). A malformed nested entry is reported and skipped.

use std::collections::HashSet;

use ctrlgen_core::diag::Diagnostics;
use ctrlgen_core::error::{GenError, Result};
use ctrlgen_core::naming::{bits_for_value, format_condition, is_valid_identifier};
use ctrlgen_core::yaml::{self, Entry};
use serde::Deserialize;
use serde_yaml::Value;

/// Width used when a dynamically controlled divider omits `width`.
pub const FALLBACK_DIVIDER_WIDTH: u32 = 8;

#[derive(Debug, Clone)]
pub struct ClockControllerConfig {
    pub name: String,
    pub module_name: String,
    pub test_enable: Option<String>,
    pub ref_clock: Option<String>,
    pub inputs: Vec<ClockInput>,
    pub targets: Vec<ClockTarget>,
}

impl ClockControllerConfig {
    /// Test-enable expression used when a stage has no override.
    pub fn default_test_enable(&self) -> &str {
        self.test_enable.as_deref().unwrap_or("1'b0")
    }
}

/// A primary clock input. Frequency and duty are documentation only.
#[derive(Debug, Clone)]
pub struct ClockInput {
    pub name: String,
    pub freq: Option<String>,
    pub duty: Option<String>,
    pub comment: Option<String>,
}

impl ClockInput {
    /// Port comment combining the free-form comment and the frequency data.
    pub fn port_comment(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(c) = &self.comment {
            parts.push(c.clone());
        }
        if let Some(f) = &self.freq {
            parts.push(f.clone());
        }
        if let Some(d) = &self.duty {
            parts.push(format!("duty {d}"));
        }
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

#[derive(Debug, Clone)]
pub struct ClockTarget {
    pub name: String,
    pub freq: Option<String>,
    pub comment: Option<String>,
    pub links: Vec<ClockLink>,
    /// Present exactly when the target has two or more links.
    pub mux: Option<MuxSpec>,
    pub stages: Vec<Stage>,
}

impl ClockTarget {
    pub fn port_comment(&self) -> Option<String> {
        match (&self.comment, &self.freq) {
            (Some(c), Some(f)) => Some(format!("{c}, {f}")),
            (Some(c), None) => Some(c.clone()),
            (None, Some(f)) => Some(f.clone()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClockLink {
    pub source: String,
    /// Occurrence of the same source earlier in this target's link list.
    pub index: usize,
    pub stages: Vec<Stage>,
    /// Deprecated plain inversion applied when the link is aggregated.
    pub invert: bool,
}

impl ClockLink {
    pub fn is_pass_through(&self) -> bool {
        self.stages.is_empty()
    }
}

/// One processing stage. Chains hold stages in the fixed order ICG, divider,
/// inverter.
#[derive(Debug, Clone)]
pub enum Stage {
    Icg(IcgStage),
    Div(DividerStage),
    Inv(InvStage),
}

impl Stage {
    pub fn suffix(&self) -> &'static str {
        match self {
            Stage::Icg(_) => "icg",
            Stage::Div(_) => "div",
            Stage::Inv(_) => "inv",
        }
    }

    pub fn sta_guide(&self) -> Option<&StaGuide> {
        match self {
            Stage::Icg(s) => s.sta_guide.as_ref(),
            Stage::Div(s) => s.sta_guide.as_ref(),
            Stage::Inv(s) => s.sta_guide.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    High,
    Low,
}

#[derive(Debug, Clone)]
pub struct IcgStage {
    /// Enable expression with literals already sized.
    pub enable: String,
    pub polarity: Polarity,
    pub test_enable: Option<String>,
    pub sta_guide: Option<StaGuide>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DividerControl {
    /// Fixed ratio, `qsoc_clk_div_auto`.
    Static,
    /// Runtime ratio through a value/valid/ready handshake, `qsoc_clk_div`.
    Dynamic {
        value: String,
        valid: Option<String>,
        ready: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct DividerStage {
    pub control: DividerControl,
    pub default: u64,
    /// Resolved width, explicit or inferred.
    pub width: u32,
    pub reset: Option<String>,
    pub enable: Option<String>,
    pub test_enable: Option<String>,
    pub count: Option<String>,
    pub clock_on_reset: bool,
    pub sta_guide: Option<StaGuide>,
}

#[derive(Debug, Clone)]
pub struct InvStage {
    pub sta_guide: Option<StaGuide>,
}

/// A timing-analysis guide cell inserted after a stage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StaGuide {
    #[serde(default = "default_sta_cell")]
    pub cell: String,
    #[serde(rename = "in", default = "default_sta_in")]
    pub input: String,
    #[serde(rename = "out", default = "default_sta_out")]
    pub output: String,
    #[serde(default)]
    pub instance: Option<String>,
}

fn default_sta_cell() -> String {
    "qsoc_tc_clk_buf".into()
}

fn default_sta_in() -> String {
    "clk".into()
}

fn default_sta_out() -> String {
    "clk_out".into()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxKind {
    /// Combinational selection, `qsoc_clk_mux_raw`.
    Standard,
    /// Synchronised switch-over, `qsoc_clk_mux_gf`.
    GlitchFree {
        reset: String,
        test_enable: Option<String>,
        test_clock: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct MuxSpec {
    pub kind: MuxKind,
    pub select: String,
    pub sta_guide: Option<StaGuide>,
}

/// Parse one clock controller node.
pub fn parse(node: &Value, diags: &mut Diagnostics) -> Result<ClockControllerConfig> {
    yaml::ensure_mapping(node, "clock controller")?;
    let name = yaml::required_str(node, "name", "clock controller")?;
    let ctx = format!("clock controller `{name}`");
    let module_name = yaml::str_field(node, "module_name").unwrap_or_else(|| name.clone());
    if !is_valid_identifier(&module_name) {
        return Err(GenError::InvalidValue {
            context: ctx,
            detail: format!("`{module_name}` is not a valid Verilog module name"),
        });
    }

    let inputs = parse_inputs(node, &ctx, diags)?;
    if inputs.is_empty() {
        return Err(GenError::MissingField {
            context: ctx,
            field: "input".into(),
        });
    }

    let target_entries = yaml::named_entries(yaml::get(node, "target"), &ctx)?;
    if target_entries.is_empty() {
        return Err(GenError::MissingField {
            context: ctx,
            field: "target".into(),
        });
    }

    let input_names: HashSet<&str> = inputs.iter().map(|i| i.name.as_str()).collect();
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for entry in target_entries {
        if let Some(target) = parse_target(entry, &ctx, &input_names, &mut seen, diags) {
            targets.push(target);
        }
    }
    if targets.is_empty() {
        return Err(GenError::InvalidValue {
            context: ctx,
            detail: "no valid targets remain after validation".into(),
        });
    }

    Ok(ClockControllerConfig {
        test_enable: yaml::str_field(node, "test_enable"),
        ref_clock: yaml::str_field(node, "ref_clock"),
        name,
        module_name,
        inputs,
        targets,
    })
}

fn parse_inputs(node: &Value, ctx: &str, diags: &mut Diagnostics) -> Result<Vec<ClockInput>> {
    let mut inputs: Vec<ClockInput> = Vec::new();
    for entry in yaml::named_entries(yaml::get(node, "input"), ctx)? {
        let Some(name) = checked_name(&entry, ctx, "input", diags) else {
            continue;
        };
        if inputs.iter().any(|i| i.name == name) {
            diags.error(format!("{ctx}: duplicate input `{name}` ignored"));
            continue;
        }
        inputs.push(ClockInput {
            freq: yaml::str_field(entry.node, "freq"),
            duty: yaml::str_field(entry.node, "duty"),
            comment: yaml::str_field(entry.node, "comment"),
            name,
        });
    }
    Ok(inputs)
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

fn parse_target(
    entry: Entry<'_>,
    ctx: &str,
    inputs: &HashSet<&str>,
    seen: &mut HashSet<String>,
    diags: &mut Diagnostics,
) -> Option<ClockTarget> {
    let name = checked_name(&entry, ctx, "target", diags)?;
    if inputs.contains(name.as_str()) {
        diags.error(format!(
            "{ctx}: target `{name}` has the same name as an input and is skipped"
        ));
        return None;
    }
    if !seen.insert(name.clone()) {
        diags.error(format!("{ctx}: duplicate target `{name}` is skipped"));
        return None;
    }
    let node = entry.node;
    let tctx = format!("{ctx} target `{name}`");

    let link_entries = match yaml::named_entries(yaml::get(node, "link"), &tctx) {
        Ok(entries) => entries,
        Err(e) => {
            diags.error(format!("{e}; target skipped"));
            return None;
        }
    };
    let mut links: Vec<ClockLink> = Vec::new();
    for link in link_entries {
        let Some(source) = checked_name(&link, &tctx, "link", diags) else {
            continue;
        };
        let lctx = format!("{tctx} link `{source}`");
        let invert = yaml::bool_field(link.node, "invert").unwrap_or(false);
        if yaml::has_key(link.node, "invert") {
            diags.warning(format!(
                "{lctx}: `invert` is deprecated, use `inv` for an inverter cell"
            ));
        }
        let index = links.iter().filter(|l| l.source == source).count();
        links.push(ClockLink {
            stages: parse_stages(link.node, &lctx, diags),
            source,
            index,
            invert,
        });
    }
    if links.is_empty() {
        diags.error(format!("{tctx}: no links; target skipped"));
        return None;
    }

    let mux = if links.len() >= 2 {
        Some(parse_mux(node, &tctx, diags)?)
    } else {
        for key in ["select", "reset", "test_clock"] {
            if yaml::has_key(node, key) {
                diags.warning(format!(
                    "{tctx}: `{key}` only applies to targets with two or more links"
                ));
            }
        }
        None
    };

    Some(ClockTarget {
        freq: yaml::str_field(node, "freq"),
        comment: yaml::str_field(node, "comment"),
        stages: parse_stages(node, &tctx, diags),
        name,
        links,
        mux,
    })
}

/// Multiplexer settings for a multi-link target; `None` when `select` is missing.
fn parse_mux(node: &Value, ctx: &str, diags: &mut Diagnostics) -> Option<MuxSpec> {
    let legacy = yaml::get(node, "mux");
    let field = |key: &str, diags: &mut Diagnostics| {
        yaml::str_field(node, key).or_else(|| {
            let value = legacy.and_then(|m| yaml::str_field(m, key))?;
            diags.warning(format!("{ctx}: `mux.{key}` is deprecated, use `{key}`"));
            Some(value)
        })
    };

    let Some(select) = field("select", diags) else {
        diags.error(format!(
            "{ctx}: `select` is required for a target with multiple links; target skipped"
        ));
        return None;
    };
    let reset = field("reset", diags);
    let test_enable = field("test_enable", diags);
    let test_clock = field("test_clock", diags);

    let kind = match reset {
        Some(reset) => MuxKind::GlitchFree {
            reset,
            test_enable,
            test_clock,
        },
        None => {
            if test_clock.is_some() {
                diags.warning(format!(
                    "{ctx}: `test_clock` is only used by the glitch-free mux (set `reset`)"
                ));
            }
            MuxKind::Standard
        }
    };
    let sta_guide = legacy.and_then(|m| parse_sta_guide(m, ctx, diags));
    Some(MuxSpec {
        kind,
        select,
        sta_guide,
    })
}

/// Stages configured on a link or target, in ICG, divider, inverter order.
fn parse_stages(node: &Value, ctx: &str, diags: &mut Diagnostics) -> Vec<Stage> {
    let mut stages = Vec::new();
    if let Some(icg) = yaml::get(node, "icg") {
        if let Some(stage) = parse_icg(icg, ctx, diags) {
            stages.push(Stage::Icg(stage));
        }
    }
    if let Some(div) = yaml::get(node, "div") {
        if let Some(stage) = parse_divider(div, ctx, diags) {
            stages.push(Stage::Div(stage));
        }
    }
    if let Some(inv) = yaml::get(node, "inv") {
        match inv {
            Value::Bool(true) => stages.push(Stage::Inv(InvStage { sta_guide: None })),
            Value::Bool(false) | Value::Null => {}
            Value::Mapping(_) => stages.push(Stage::Inv(InvStage {
                sta_guide: parse_sta_guide(inv, ctx, diags),
            })),
            _ => diags.error(format!("{ctx}: `inv` must be a boolean or a mapping")),
        }
    }
    stages
}

fn parse_icg(node: &Value, ctx: &str, diags: &mut Diagnostics) -> Option<IcgStage> {
    let (enable, body) = match node {
        Value::Mapping(_) => (yaml::str_field(node, "enable"), Some(node)),
        other => (yaml::scalar_string(other), None),
    };
    let Some(enable) = enable.filter(|e| !e.is_empty()) else {
        diags.error(format!("{ctx}: ICG requires `enable`; stage skipped"));
        return None;
    };
    let polarity = match body.and_then(|b| yaml::str_field(b, "polarity")).as_deref() {
        None | Some("high") => Polarity::High,
        Some("low") => Polarity::Low,
        Some(other) => {
            diags.error(format!(
                "{ctx}: ICG polarity `{other}` is not `high` or `low`; using high"
            ));
            Polarity::High
        }
    };
    Some(IcgStage {
        enable: format_condition(&enable),
        polarity,
        test_enable: body.and_then(|b| yaml::str_field(b, "test_enable")),
        sta_guide: body.and_then(|b| parse_sta_guide(b, ctx, diags)),
    })
}

fn parse_divider(node: &Value, ctx: &str, diags: &mut Diagnostics) -> Option<DividerStage> {
    let dctx = format!("{ctx} divider");
    let node = match node {
        Value::Mapping(_) => node,
        _ => {
            diags.error(format!("{dctx}: expected a mapping; stage skipped"));
            return None;
        }
    };
    let integer = |key: &str, diags: &mut Diagnostics| match yaml::u64_field(node, key, &dctx) {
        Ok(v) => v,
        Err(e) => {
            diags.error(format!("{e}; ignored"));
            None
        }
    };

    let control = match yaml::str_field(node, "value") {
        Some(value) => DividerControl::Dynamic {
            value,
            valid: yaml::str_field(node, "valid"),
            ready: yaml::str_field(node, "ready"),
        },
        None => {
            for key in ["valid", "ready"] {
                if yaml::has_key(node, key) {
                    diags.warning(format!("{dctx}: `{key}` has no effect without `value`"));
                }
            }
            DividerControl::Static
        }
    };

    let default = match integer("default", diags).or_else(|| integer("ratio", diags)) {
        Some(v) => v,
        None => {
            if control == DividerControl::Static {
                diags.error(format!(
                    "{dctx}: static divider without `default` ratio; using 1"
                ));
            }
            1
        }
    };

    let explicit = match integer("width", diags) {
        Some(0) => {
            diags.error(format!("{dctx}: `width` must be at least 1; ignored"));
            None
        }
        Some(w) => Some(u32::try_from(w).unwrap_or(u32::MAX).min(64)),
        None => None,
    };
    let width = match (&control, explicit) {
        (_, Some(w)) => w,
        (DividerControl::Dynamic { .. }, None) => {
            diags.error(format!(
                "{dctx}: dynamic divider requires an explicit `width`; using {FALLBACK_DIVIDER_WIDTH}"
            ));
            FALLBACK_DIVIDER_WIDTH
        }
        (DividerControl::Static, None) => bits_for_value(default),
    };
    if bits_for_value(default) > width {
        diags.error(format!(
            "{dctx}: default ratio {default} does not fit in {width} bit(s)"
        ));
    }

    Some(DividerStage {
        control,
        default,
        width,
        reset: yaml::str_field(node, "reset"),
        enable: yaml::str_field(node, "enable").map(|e| format_condition(&e)),
        test_enable: yaml::str_field(node, "test_enable"),
        count: yaml::str_field(node, "count"),
        clock_on_reset: yaml::bool_field(node, "clock_on_reset").unwrap_or(false),
        sta_guide: parse_sta_guide(node, &dctx, diags),
    })
}

fn parse_sta_guide(node: &Value, ctx: &str, diags: &mut Diagnostics) -> Option<StaGuide> {
    let guide = yaml::get(node, "sta_guide")?;
    match serde_yaml::from_value::<StaGuide>(guide.clone()) {
        Ok(g) => Some(g),
        Err(e) => {
            diags.error(format!("{ctx}: invalid `sta_guide` ({e}); ignored"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctrlgen_core::diag::Severity;

    fn parse_str(text: &str) -> (Result<ClockControllerConfig>, Diagnostics) {
        let node: Value = serde_yaml::from_str(text).unwrap();
        let mut diags = Diagnostics::new("clock");
        let result = parse(&node, &mut diags);
        (result, diags)
    }

    #[test]
    fn missing_name_fails() {
        let (result, _) = parse_str("input: {osc: {}}\ntarget: {clk0: {link: {osc: {}}}}");
        assert!(matches!(result, Err(GenError::MissingField { ref field, .. }) if field == "name"));
    }

    #[test]
    fn missing_inputs_or_targets_fail() {
        let (result, _) = parse_str("name: c0\ntarget: {clk0: {link: {osc: {}}}}");
        assert!(matches!(result, Err(GenError::MissingField { ref field, .. }) if field == "input"));
        let (result, _) = parse_str("name: c0\ninput: {osc: {}}");
        assert!(matches!(result, Err(GenError::MissingField { ref field, .. }) if field == "target"));
    }

    #[test]
    fn pass_through_link_has_no_stages() {
        let (result, diags) =
            parse_str("name: c0\ninput: {osc: {freq: 24MHz}}\ntarget: {clk0: {link: {osc: {}}}}");
        let config = result.unwrap();
        assert!(diags.is_empty());
        assert_eq!(config.module_name, "c0");
        let target = &config.targets[0];
        assert!(target.links[0].is_pass_through());
        assert!(target.mux.is_none());
        assert_eq!(config.inputs[0].port_comment().as_deref(), Some("24MHz"));
    }

    #[test]
    fn mux_kind_follows_reset() {
        let (result, _) = parse_str(
            r#"
name: c0
input: {a: {}, b: {}}
target:
  gf: {link: {a: {}, b: {}}, select: sel, reset: rst_n}
  raw: {link: {a: {}, b: {}}, select: sel2}
"#,
        );
        let config = result.unwrap();
        let gf = config.targets[0].mux.as_ref().unwrap();
        assert!(matches!(gf.kind, MuxKind::GlitchFree { ref reset, .. } if reset == "rst_n"));
        let raw = config.targets[1].mux.as_ref().unwrap();
        assert_eq!(raw.kind, MuxKind::Standard);
    }

    #[test]
    fn multi_link_without_select_is_skipped() {
        let (result, diags) = parse_str(
            r#"
name: c0
input: {a: {}, b: {}}
target:
  bad: {link: {a: {}, b: {}}}
  good: {link: {a: {}}}
"#,
        );
        let config = result.unwrap();
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].name, "good");
        assert!(diags.mentions(Severity::Error, "select"));
    }

    #[test]
    fn duplicate_target_is_reported_not_fatal() {
        let (result, diags) = parse_str(
            r#"
name: c0
input: {osc: {}}
target:
  - {name: clk0, link: {osc: {}}}
  - {name: clk0, link: {osc: {}}}
"#,
        );
        let config = result.unwrap();
        assert_eq!(config.targets.len(), 1);
        assert!(diags.mentions(Severity::Error, "duplicate target `clk0`"));
        assert!(!diags.has_aborts());
    }

    #[test]
    fn stages_follow_fixed_order() {
        let (result, _) = parse_str(
            r#"
name: c0
input: {osc: {}}
target:
  clk0:
    link:
      osc:
        inv: true
        div: {default: 4}
        icg: {enable: 1}
"#,
        );
        let config = result.unwrap();
        let suffixes: Vec<_> = config.targets[0].links[0]
            .stages
            .iter()
            .map(Stage::suffix)
            .collect();
        assert_eq!(suffixes, ["icg", "div", "inv"]);
        match &config.targets[0].links[0].stages[0] {
            Stage::Icg(icg) => assert_eq!(icg.enable, "1'b1"),
            other => panic!("unexpected stage {other:?}"),
        }
    }

    #[test]
    fn icg_without_enable_is_skipped() {
        let (result, diags) = parse_str(
            "name: c0\ninput: {osc: {}}\ntarget: {clk0: {link: {osc: {}}, icg: {polarity: low}}}",
        );
        let config = result.unwrap();
        assert!(config.targets[0].stages.is_empty());
        assert!(diags.mentions(Severity::Error, "ICG requires `enable`"));
    }

    #[test]
    fn static_divider_infers_width() {
        let (result, diags) = parse_str(
            "name: c0\ninput: {osc: {}}\ntarget: {clk0: {link: {osc: {}}, div: {default: 5}}}",
        );
        let config = result.unwrap();
        match &config.targets[0].stages[0] {
            Stage::Div(div) => {
                assert_eq!(div.width, 3);
                assert_eq!(div.control, DividerControl::Static);
            }
            other => panic!("unexpected stage {other:?}"),
        }
        assert!(diags.is_empty());
    }

    #[test]
    fn dynamic_divider_without_width_falls_back() {
        let (result, diags) = parse_str(
            "name: c0\ninput: {osc: {}}\ntarget: {clk0: {link: {osc: {}}, div: {default: 2, value: div_val}}}",
        );
        let config = result.unwrap();
        match &config.targets[0].stages[0] {
            Stage::Div(div) => assert_eq!(div.width, FALLBACK_DIVIDER_WIDTH),
            other => panic!("unexpected stage {other:?}"),
        }
        assert!(diags.mentions(Severity::Error, "explicit `width`"));
        assert!(!diags.has_aborts());
    }

    #[test]
    fn default_exceeding_width_is_reported() {
        let (result, diags) = parse_str(
            "name: c0\ninput: {osc: {}}\ntarget: {clk0: {link: {osc: {}}, div: {default: 9, width: 3}}}",
        );
        let config = result.unwrap();
        match &config.targets[0].stages[0] {
            Stage::Div(div) => assert_eq!(div.width, 3),
            other => panic!("unexpected stage {other:?}"),
        }
        assert!(diags.mentions(Severity::Error, "does not fit in 3 bit(s)"));
    }

    #[test]
    fn deprecated_invert_warns() {
        let (result, diags) =
            parse_str("name: c0\ninput: {osc: {}}\ntarget: {clk0: {link: {osc: {invert: true}}}}");
        let config = result.unwrap();
        assert!(config.targets[0].links[0].invert);
        assert!(diags.mentions(Severity::Warning, "deprecated"));
    }

    #[test]
    fn sta_guide_defaults() {
        let (result, _) = parse_str(
            "name: c0\ninput: {osc: {}}\ntarget: {clk0: {link: {osc: {}}, inv: {sta_guide: {cell: FOUNDRY_BUF}}}}",
        );
        let config = result.unwrap();
        let guide = config.targets[0].stages[0].sta_guide().unwrap();
        assert_eq!(guide.cell, "FOUNDRY_BUF");
        assert_eq!(guide.input, "clk");
        assert_eq!(guide.output, "clk_out");
        assert_eq!(guide.instance, None);
    }
}

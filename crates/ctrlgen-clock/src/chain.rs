//! Stage, multiplexer and STA-guide emission.
//!
//! Every function returns the text it produced together with the name of the
//! signal now carrying the clock, so one stage can be rendered in isolation.

use ctrlgen_core::naming::{invert_expr, select_width};
use ctrlgen_core::verilog::{concat, Instance};

use crate::config::{
    DividerControl, DividerStage, IcgStage, MuxKind, MuxSpec, Polarity, Stage, StaGuide,
};

/// Emitted text plus the signal driven at the end of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub output: String,
}

/// Wire and instance prefixes for one chain.
#[derive(Debug, Clone)]
pub struct ChainNames {
    pub wire: String,
    pub instance: String,
}

impl ChainNames {
    pub fn new(wire: impl Into<String>, instance: impl Into<String>) -> Self {
        ChainNames {
            wire: wire.into(),
            instance: instance.into(),
        }
    }
}

/// Apply `stages` in order starting from `input`.
pub fn emit_chain(stages: &[Stage], input: &str, names: &ChainNames, test_enable: &str) -> Fragment {
    let mut text = String::new();
    let mut current = input.to_string();
    for stage in stages {
        let fragment = emit_stage(stage, &current, names, test_enable);
        text.push_str(&fragment.text);
        current = fragment.output;
    }
    Fragment {
        text,
        output: current,
    }
}

/// Emit one stage, followed by its STA guide when configured.
pub fn emit_stage(stage: &Stage, input: &str, names: &ChainNames, test_enable: &str) -> Fragment {
    let wire = format!("{}_{}", names.wire, stage.suffix());
    let instance_name = format!("{}_{}", names.instance, stage.suffix());
    let driven = match stage.sta_guide() {
        Some(_) => format!("{wire}_presta"),
        None => wire.clone(),
    };

    let instance = match stage {
        Stage::Icg(icg) => icg_instance(icg, &instance_name, input, &driven, test_enable),
        Stage::Div(div) => divider_instance(div, &instance_name, input, &driven, test_enable),
        Stage::Inv(_) => Instance::new("qsoc_tc_clk_inv", &instance_name)
            .connect("clk_in", input)
            .connect("clk_out", &driven),
    };

    let mut text = format!("    wire {wire};\n");
    if driven != wire {
        text.push_str(&format!("    wire {driven};\n"));
    }
    text.push_str(&instance.render());
    if let Some(guide) = stage.sta_guide() {
        text.push_str(&sta_guide_instance(guide, &instance_name, &driven, &wire).render());
    }
    Fragment { text, output: wire }
}

fn icg_instance(icg: &IcgStage, name: &str, input: &str, output: &str, test_enable: &str) -> Instance {
    let enable = match icg.polarity {
        Polarity::High => icg.enable.clone(),
        Polarity::Low => invert_expr(&icg.enable),
    };
    Instance::new("qsoc_tc_clk_gate", name)
        .connect("clk", input)
        .connect("en", enable)
        .connect("test_en", icg.test_enable.as_deref().unwrap_or(test_enable))
        .connect("clk_out", output)
}

fn divider_instance(
    div: &DividerStage,
    name: &str,
    input: &str,
    output: &str,
    test_enable: &str,
) -> Instance {
    let cell = match div.control {
        DividerControl::Static => "qsoc_clk_div_auto",
        DividerControl::Dynamic { .. } => "qsoc_clk_div",
    };
    let mut instance = Instance::new(cell, name)
        .param("WIDTH", div.width)
        .param("DEFAULT_VAL", div.default)
        .param("CLOCK_DURING_RESET", u8::from(div.clock_on_reset))
        .connect("clk", input)
        .connect("rst_n", div.reset.as_deref().unwrap_or("1'b1"))
        .connect("en", div.enable.as_deref().unwrap_or("1'b1"))
        .connect("test_en", div.test_enable.as_deref().unwrap_or(test_enable));
    if let DividerControl::Dynamic {
        value,
        valid,
        ready,
    } = &div.control
    {
        instance = instance
            .connect("div", value.as_str())
            .connect("div_valid", valid.as_deref().unwrap_or("1'b1"))
            .connect("div_ready", ready.as_deref().unwrap_or(""));
    }
    instance
        .connect("clk_out", output)
        .connect("count", div.count.as_deref().unwrap_or(""))
}

/// Guide cell driving `wire` from `driven`, keeping the logical name stable.
pub fn sta_guide_instance(guide: &StaGuide, stage_instance: &str, driven: &str, wire: &str) -> Instance {
    let name = guide
        .instance
        .clone()
        .unwrap_or_else(|| format!("{stage_instance}_sta"));
    Instance::new(&guide.cell, name)
        .connect(&guide.input, driven)
        .connect(&guide.output, wire)
}

/// Multiplexer over already-processed link signals, `inputs[i]` selected by `i`.
pub fn emit_mux(
    target: &str,
    mux: &MuxSpec,
    inputs: &[String],
    default_test_enable: &str,
) -> Fragment {
    let wire = format!("clk_{target}_mux");
    let instance_name = format!("u_{target}_mux");
    let driven = match mux.sta_guide {
        Some(_) => format!("{wire}_presta"),
        None => wire.clone(),
    };
    let msb_first: Vec<&str> = inputs.iter().rev().map(String::as_str).collect();

    let base = |cell: &str| {
        Instance::new(cell, &instance_name)
            .param("NUM_CLK", inputs.len())
            .param("SEL_WIDTH", select_width(inputs.len()))
            .connect("clk_in", concat(&msb_first))
    };
    let instance = match &mux.kind {
        MuxKind::Standard => base("qsoc_clk_mux_raw")
            .connect("clk_sel", mux.select.as_str())
            .connect("clk_out", &driven),
        MuxKind::GlitchFree {
            reset,
            test_enable,
            test_clock,
        } => base("qsoc_clk_mux_gf")
            .connect("async_sel", mux.select.as_str())
            .connect("async_rst_n", reset.as_str())
            .connect("test_en", test_enable.as_deref().unwrap_or(default_test_enable))
            .connect("test_clk", test_clock.as_deref().unwrap_or("1'b0"))
            .connect("clk_out", &driven),
    };

    let mut text = format!("    wire {wire};\n");
    if driven != wire {
        text.push_str(&format!("    wire {driven};\n"));
    }
    text.push_str(&instance.render());
    if let Some(guide) = &mux.sta_guide {
        text.push_str(&sta_guide_instance(guide, &instance_name, &driven, &wire).render());
    }
    Fragment { text, output: wire }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InvStage;

    fn squash(text: &str) -> String {
        text.split_whitespace().collect()
    }

    fn names() -> ChainNames {
        ChainNames::new("clk_cpu", "u_cpu")
    }

    fn icg(polarity: Polarity) -> Stage {
        Stage::Icg(IcgStage {
            enable: "cpu_en".into(),
            polarity,
            test_enable: None,
            sta_guide: None,
        })
    }

    fn divider(control: DividerControl) -> Stage {
        Stage::Div(DividerStage {
            control,
            default: 4,
            width: 3,
            reset: Some("rst_n".into()),
            enable: None,
            test_enable: None,
            count: None,
            clock_on_reset: false,
            sta_guide: None,
        })
    }

    #[test]
    fn empty_chain_is_pass_through() {
        let fragment = emit_chain(&[], "osc", &names(), "1'b0");
        assert_eq!(fragment.output, "osc");
        assert!(fragment.text.is_empty());
    }

    #[test]
    fn icg_low_polarity_inverts_enable() {
        let fragment = emit_stage(&icg(Polarity::Low), "pll", &names(), "dft_en");
        assert_eq!(fragment.output, "clk_cpu_icg");
        let text = squash(&fragment.text);
        assert!(text.contains("wireclk_cpu_icg;"));
        assert!(text.contains("qsoc_tc_clk_gateu_cpu_icg("));
        assert!(text.contains(".en(~cpu_en)"));
        assert!(text.contains(".test_en(dft_en)"));
        assert!(text.contains(".clk(pll)"));
    }

    #[test]
    fn static_divider_uses_auto_cell() {
        let fragment = emit_stage(&divider(DividerControl::Static), "pll", &names(), "1'b0");
        let text = squash(&fragment.text);
        assert!(text.contains("qsoc_clk_div_auto#(.WIDTH(3),.DEFAULT_VAL(4),.CLOCK_DURING_RESET(0))u_cpu_div("));
        assert!(!text.contains(".div_valid"));
        assert!(text.contains(".rst_n(rst_n)"));
        assert!(text.contains(".count()"));
    }

    #[test]
    fn dynamic_divider_connects_handshake() {
        let stage = divider(DividerControl::Dynamic {
            value: "cpu_div".into(),
            valid: None,
            ready: Some("cpu_div_rdy".into()),
        });
        let fragment = emit_stage(&stage, "pll", &names(), "1'b0");
        let text = squash(&fragment.text);
        assert!(text.contains("qsoc_clk_div#("));
        assert!(text.contains(".div(cpu_div)"));
        assert!(text.contains(".div_valid(1'b1)"));
        assert!(text.contains(".div_ready(cpu_div_rdy)"));
    }

    #[test]
    fn chain_threads_signal_through_stages() {
        let stages = vec![
            icg(Polarity::High),
            divider(DividerControl::Static),
            Stage::Inv(InvStage { sta_guide: None }),
        ];
        let fragment = emit_chain(&stages, "pll", &names(), "1'b0");
        assert_eq!(fragment.output, "clk_cpu_inv");
        let text = squash(&fragment.text);
        assert!(text.contains(".clk(clk_cpu_icg)"));
        assert!(text.contains(".clk_in(clk_cpu_div)"));
    }

    #[test]
    fn sta_guide_keeps_logical_name() {
        let stage = Stage::Inv(InvStage {
            sta_guide: Some(StaGuide {
                cell: "FOUNDRY_BUF".into(),
                input: "I".into(),
                output: "Z".into(),
                instance: None,
            }),
        });
        let fragment = emit_stage(&stage, "pll", &names(), "1'b0");
        assert_eq!(fragment.output, "clk_cpu_inv");
        let text = squash(&fragment.text);
        assert!(text.contains(".clk_out(clk_cpu_inv_presta)"));
        assert!(text.contains("FOUNDRY_BUFu_cpu_inv_sta(.I(clk_cpu_inv_presta),.Z(clk_cpu_inv));"));
    }

    #[test]
    fn glitch_free_mux_connections() {
        let mux = MuxSpec {
            kind: MuxKind::GlitchFree {
                reset: "rst_n".into(),
                test_enable: None,
                test_clock: None,
            },
            select: "sel".into(),
            sta_guide: None,
        };
        let inputs = vec!["pll".to_string(), "osc".to_string(), "clk_x_from_ext_div".to_string()];
        let fragment = emit_mux("x", &mux, &inputs, "1'b0");
        assert_eq!(fragment.output, "clk_x_mux");
        let text = squash(&fragment.text);
        assert!(text.contains("qsoc_clk_mux_gf#(.NUM_CLK(3),.SEL_WIDTH(2))u_x_mux("));
        assert!(text.contains(".clk_in({clk_x_from_ext_div,osc,pll})"));
        assert!(text.contains(".async_sel(sel)"));
        assert!(text.contains(".async_rst_n(rst_n)"));
        assert!(text.contains(".test_clk(1'b0)"));
    }

    #[test]
    fn standard_mux_connections() {
        let mux = MuxSpec {
            kind: MuxKind::Standard,
            select: "sel".into(),
            sta_guide: None,
        };
        let inputs = vec!["a".to_string(), "b".to_string()];
        let text = squash(&emit_mux("y", &mux, &inputs, "1'b0").text);
        assert!(text.contains("qsoc_clk_mux_raw#(.NUM_CLK(2),.SEL_WIDTH(1))u_y_mux("));
        assert!(text.contains(".clk_sel(sel)"));
        assert!(!text.contains("async"));
    }
}

//! Reset shaping chains.
//!
//! Each component consumes an active-low reset and produces a new active-low
//! wire named `<base>_<kind>_n`, so a chain reads left to right in the
//! generated body.

use std::fmt::Write;

use ctrlgen_core::naming::reset_instance;
use ctrlgen_core::verilog::Instance;

use crate::config::Component;

/// Text and resulting active-low signal of an emitted chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub output: String,
}

/// Emit `components` in order, starting from the active-low `input`.
///
/// `base` names the stage wires; `link` selects link-level instance names.
pub fn emit_chain(
    components: &[Component],
    input: &str,
    target: &str,
    base: &str,
    link: Option<usize>,
) -> Fragment {
    let mut text = String::new();
    let mut current = input.to_string();
    for component in components {
        let key = component.kind.key();
        let wire = format!("{base}_{key}_n");
        let (_, param) = component.kind.depth_key();
        let instance = Instance::new(component.kind.cell(), reset_instance(target, link, key))
            .param(param, component.depth)
            .connect("clk", component.clock.as_str())
            .connect("rst_in_n", current.as_str())
            .connect("test_enable", component.test_enable.as_str())
            .connect("rst_out_n", wire.as_str());
        let _ = writeln!(text, "    wire {wire};");
        text.push_str(&instance.render());
        current = wire;
    }
    Fragment {
        text,
        output: current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComponentKind;

    fn component(kind: ComponentKind, depth: u64) -> Component {
        Component {
            kind,
            clock: "clk_sys".into(),
            depth,
            test_enable: "1'b0".into(),
        }
    }

    fn squash(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn empty_chain_passes_input_through() {
        let fragment = emit_chain(&[], "~wdt", "sys_rst_n", "sys_rst_n_link0", Some(0));
        assert!(fragment.text.is_empty());
        assert_eq!(fragment.output, "~wdt");
    }

    #[test]
    fn chain_links_components_in_order() {
        let comps = [component(ComponentKind::Async, 3), component(ComponentKind::Count, 16)];
        let fragment = emit_chain(&comps, "por_n", "sys_rst_n", "sys_rst_n_link0", Some(0));
        let text = squash(&fragment.text);
        assert!(text.contains("qsoc_rst_sync#(.STAGE(3))u_sys_rst_n_link0_async("));
        assert!(text.contains(".rst_in_n(por_n)"));
        assert!(text.contains(".rst_out_n(sys_rst_n_link0_async_n)"));
        assert!(text.contains("qsoc_rst_count#(.CYCLE(16))u_sys_rst_n_link0_count("));
        assert!(text.contains(".rst_in_n(sys_rst_n_link0_async_n)"));
        assert_eq!(fragment.output, "sys_rst_n_link0_count_n");
    }

    #[test]
    fn target_level_instances_have_no_link_index() {
        let comps = [component(ComponentKind::Sync, 4)];
        let fragment = emit_chain(&comps, "sys_rst_n_all_n", "sys_rst_n", "sys_rst_n", None);
        assert!(squash(&fragment.text).contains("qsoc_rst_pipe#(.STAGE(4))u_sys_rst_n_sync("));
        assert_eq!(fragment.output, "sys_rst_n_sync_n");
    }
}

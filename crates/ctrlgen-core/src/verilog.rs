//! Verilog text builders.
//!
//! Emission functions return owned text so a single stage can be rendered and
//! inspected on its own; [`ModuleText`] composes the pieces into one module.

use std::fmt::Write as _;

use crate::naming::escape_comment;
use crate::registry::SignalRegistry;

const INDENT: &str = "    ";

/// A cell instantiation with ordered parameters and port connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    cell: String,
    name: String,
    comment: Option<String>,
    params: Vec<(String, String)>,
    connections: Vec<(String, String)>,
}

impl Instance {
    pub fn new(cell: impl Into<String>, name: impl Into<String>) -> Self {
        Instance {
            cell: cell.into(),
            name: name.into(),
            comment: None,
            params: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comment = Some(text.into());
        self
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    /// Connect `port` to `expr`. An empty expression leaves the port open.
    pub fn connect(mut self, port: &str, expr: impl Into<String>) -> Self {
        self.connections.push((port.to_string(), expr.into()));
        self
    }

    pub fn cell(&self) -> &str {
        &self.cell
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render at one level of indentation.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(comment) = &self.comment {
            let _ = writeln!(out, "{INDENT}/* {} */", escape_comment(comment));
        }
        if self.params.is_empty() {
            let _ = writeln!(out, "{INDENT}{} {} (", self.cell, self.name);
        } else {
            let _ = writeln!(out, "{INDENT}{} #(", self.cell);
            push_bindings(&mut out, &self.params);
            let _ = writeln!(out, "{INDENT}) {} (", self.name);
        }
        push_bindings(&mut out, &self.connections);
        let _ = writeln!(out, "{INDENT});");
        out
    }
}

fn push_bindings(out: &mut String, bindings: &[(String, String)]) {
    let width = bindings.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    let last = bindings.len().saturating_sub(1);
    for (i, (name, value)) in bindings.iter().enumerate() {
        let comma = if i == last { "" } else { "," };
        let _ = writeln!(out, "{INDENT}{INDENT}.{name:<width$} ({value}){comma}");
    }
}

/// Verilog concatenation, most significant element first.
pub fn concat<S: AsRef<str>>(items: &[S]) -> String {
    let parts: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    format!("{{{}}}", parts.join(", "))
}

/// A module under construction: description, body sections and the port list.
#[derive(Debug, Clone)]
pub struct ModuleText {
    name: String,
    description: Vec<String>,
    body: String,
}

impl ModuleText {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleText {
            name: name.into(),
            description: Vec::new(),
            body: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a line to the module banner.
    pub fn describe(&mut self, line: impl Into<String>) {
        self.description.push(line.into());
    }

    /// Start a commented body section.
    pub fn section(&mut self, title: &str) {
        if !self.body.is_empty() {
            self.body.push('\n');
        }
        let _ = writeln!(self.body, "{INDENT}/* {} */", escape_comment(title));
    }

    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.body, "{INDENT}{text}");
    }

    /// Verbatim text, already indented. Empty text is ignored.
    pub fn raw(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.body.push_str(text);
        if !text.ends_with('\n') {
            self.body.push('\n');
        }
    }

    pub fn wire(&mut self, name: &str, width: u32) {
        if width > 1 {
            self.line(&format!("wire [{}:0] {name};", width - 1));
        } else {
            self.line(&format!("wire {name};"));
        }
    }

    /// `wire name = expr;`
    pub fn wire_assign(&mut self, name: &str, expr: &str) {
        self.line(&format!("wire {name} = {expr};"));
    }

    pub fn assign(&mut self, lhs: &str, rhs: &str) {
        self.line(&format!("assign {lhs} = {rhs};"));
    }

    pub fn instance(&mut self, instance: &Instance) {
        self.body.push_str(&instance.render());
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Render the complete module, ending in exactly one `endmodule`.
    pub fn render(&self, ports: &SignalRegistry) -> String {
        let mut out = String::new();
        if !self.description.is_empty() {
            out.push_str("/**\n");
            for line in &self.description {
                if line.is_empty() {
                    out.push_str(" *\n");
                } else {
                    let _ = writeln!(out, " * {}", escape_comment(line));
                }
            }
            out.push_str(" */\n");
        }
        if ports.is_empty() {
            let _ = writeln!(out, "module {};", self.name);
        } else {
            let _ = writeln!(out, "module {} (", self.name);
            out.push_str(&ports.render_ports());
            out.push_str(");\n");
        }
        if !self.body.is_empty() {
            out.push('\n');
            out.push_str(&self.body);
        }
        out.push_str("\nendmodule\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Diagnostics;

    fn squash(text: &str) -> String {
        text.split_whitespace().collect()
    }

    #[test]
    fn instance_without_params() {
        let inst = Instance::new("qsoc_tc_clk_inv", "u_a_inv")
            .connect("clk_in", "clk_a")
            .connect("clk_out", "clk_a_inv");
        let text = inst.render();
        assert!(text.starts_with("    qsoc_tc_clk_inv u_a_inv ("));
        assert!(squash(&text).contains(".clk_in(clk_a),.clk_out(clk_a_inv));"));
    }

    #[test]
    fn instance_with_params_and_open_port() {
        let inst = Instance::new("qsoc_rst_sync", "u_t_async")
            .comment("async */ sync")
            .param("STAGE", 3)
            .connect("clk", "clk_sys")
            .connect("rst_out_n", "");
        let text = inst.render();
        assert!(text.contains("/* async * / sync */"));
        assert!(squash(&text).contains("qsoc_rst_sync#(.STAGE(3))u_t_async("));
        assert!(squash(&text).contains(".rst_out_n()"));
    }

    #[test]
    fn concat_orders_as_given() {
        assert_eq!(concat(&["b", "a"]), "{b, a}");
    }

    #[test]
    fn module_renders_once() {
        let mut d = Diagnostics::new("test");
        let mut ports = SignalRegistry::new();
        ports.input("osc", &mut d);
        ports.output("clk0", &mut d);
        let mut m = ModuleText::new("c0");
        m.describe("Clock controller c0");
        m.section("Outputs");
        m.assign("clk0", "osc");
        let text = m.render(&ports);
        assert_eq!(text.matches("endmodule").count(), 1);
        assert!(text.contains("module c0 ("));
        assert!(text.contains("assign clk0 = osc;"));
        assert!(text.starts_with("/**\n * Clock controller c0\n */\n"));
    }
}

//! Module port registry with the output-wins resolution rule.
//!
//! Generators declare every signal they reference while building a module.
//! A name is declared at most once:
//!
//! - input then output: the port is upgraded to an output in place
//! - output then input: the input declaration is suppressed
//! - same direction twice: the second declaration is a no-op
//!
//! Literals and expressions (`1'b0`, `a & b`) are never declared.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::diag::Diagnostics;
use crate::naming::{escape_comment, signal_base};

/// Direction of a module port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => write!(f, "input"),
            PortDirection::Output => write!(f, "output"),
        }
    }
}

/// A declared module port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    pub direction: PortDirection,
    pub width: u32,
    pub comment: Option<String>,
}

impl Port {
    pub fn input(name: impl Into<String>) -> Self {
        Port {
            name: name.into(),
            direction: PortDirection::Input,
            width: 1,
            comment: None,
        }
    }

    pub fn output(name: impl Into<String>) -> Self {
        Port {
            name: name.into(),
            direction: PortDirection::Output,
            width: 1,
            comment: None,
        }
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = width.max(1);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        let text = comment.into();
        if !text.is_empty() {
            self.comment = Some(text);
        }
        self
    }

    pub fn comment_opt(self, comment: Option<&str>) -> Self {
        match comment {
            Some(text) => self.comment(text),
            None => self,
        }
    }
}

/// What happened to a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declared {
    New,
    Upgraded,
    Suppressed,
    Existing,
    /// The expression is a literal or compound expression, not a port.
    NotASignal,
}

/// Ordered set of module ports.
#[derive(Debug, Clone, Default)]
pub struct SignalRegistry {
    ports: Vec<Port>,
    index: HashMap<String, usize>,
    reserved: HashMap<String, String>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a port, applying the output-wins rule.
    ///
    /// Bit selects declare their base signal (`sel[0]` declares `sel`).
    pub fn declare(&mut self, port: Port, diags: &mut Diagnostics) -> Declared {
        let Some(base) = signal_base(&port.name) else {
            return Declared::NotASignal;
        };
        let base = base.to_string();

        if let Some(&slot) = self.index.get(&base) {
            let existing = &mut self.ports[slot];
            if existing.width != port.width && base == port.name {
                diags.warning(format!(
                    "signal `{base}` declared with width {} and {}; keeping {}",
                    existing.width, port.width, existing.width
                ));
            }
            if existing.comment.is_none() {
                existing.comment = port.comment;
            }
            return match (existing.direction, port.direction) {
                (PortDirection::Input, PortDirection::Output) => {
                    existing.direction = PortDirection::Output;
                    Declared::Upgraded
                }
                (PortDirection::Output, PortDirection::Input) => Declared::Suppressed,
                _ => Declared::Existing,
            };
        }

        let width = if base == port.name { port.width } else { 1 };
        self.index.insert(base.clone(), self.ports.len());
        self.ports.push(Port {
            name: base,
            width,
            ..port
        });
        Declared::New
    }

    pub fn input(&mut self, name: &str, diags: &mut Diagnostics) -> Declared {
        self.declare(Port::input(name), diags)
    }

    pub fn output(&mut self, name: &str, diags: &mut Diagnostics) -> Declared {
        self.declare(Port::output(name), diags)
    }

    /// Claim `name` for `owner`. A second owner is an aborting diagnostic.
    pub fn reserve_unique(&mut self, name: &str, owner: &str, diags: &mut Diagnostics) -> bool {
        match self.reserved.get(name) {
            Some(previous) => {
                diags.reject(format!(
                    "signal `{name}` is driven by both {previous} and {owner}"
                ));
                false
            }
            None => {
                self.reserved.insert(name.to_string(), owner.to_string());
                true
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn direction(&self, name: &str) -> Option<PortDirection> {
        self.index.get(name).map(|&i| self.ports[i].direction)
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Render the ANSI-style port list, one port per line.
    pub fn render_ports(&self) -> String {
        let ranges: Vec<String> = self
            .ports
            .iter()
            .map(|p| {
                if p.width > 1 {
                    format!("[{}:0] ", p.width - 1)
                } else {
                    String::new()
                }
            })
            .collect();
        let range_width = ranges.iter().map(String::len).max().unwrap_or(0);
        let name_width = self.ports.iter().map(|p| p.name.len()).max().unwrap_or(0);

        let mut out = String::new();
        let last = self.ports.len().saturating_sub(1);
        for (i, (port, range)) in self.ports.iter().zip(&ranges).enumerate() {
            let comma = if i == last { "" } else { "," };
            let decl = format!(
                "    {:<6} wire {:<rw$}{}{}",
                port.direction.to_string(),
                range,
                port.name,
                comma,
                rw = range_width
            );
            match &port.comment {
                Some(comment) => {
                    let pad = name_width + 1 - port.name.len() - comma.len() + 1;
                    out.push_str(&format!(
                        "{decl}{:pad$}/**< {} */\n",
                        "",
                        escape_comment(comment)
                    ));
                }
                None => {
                    out.push_str(&decl);
                    out.push('\n');
                }
            }
        }
        out
    }
}

//! Deterministic wire and instance naming plus small Verilog text helpers.
//!
//! Every generator derives its internal names here so that the same
//! `(target, source, index)` tuple always yields the same wire.

/// Verilog-2005 reserved words rejected by [`is_valid_identifier`].
const RESERVED_WORDS: &[&str] = &[
    "always", "and", "assign", "begin", "buf", "bufif0", "bufif1", "case", "casex", "casez",
    "cmos", "deassign", "default", "defparam", "disable", "edge", "else", "end", "endcase",
    "endfunction", "endmodule", "endprimitive", "endspecify", "endtable", "endtask", "event",
    "for", "force", "forever", "fork", "function", "highz0", "highz1", "if", "ifnone", "initial",
    "inout", "input", "integer", "join", "large", "medium", "module", "nand", "negedge", "nmos",
    "nor", "not", "notif0", "notif1", "or", "output", "parameter", "pmos", "posedge",
    "primitive", "pull0", "pull1", "pulldown", "pullup", "rcmos", "real", "realtime", "reg",
    "release", "repeat", "rnmos", "rpmos", "rtran", "rtranif0", "rtranif1", "scalared", "small",
    "specify", "specparam", "strength", "strong0", "strong1", "supply0", "supply1", "table",
    "task", "time", "tran", "tranif0", "tranif1", "tri", "tri0", "tri1", "triand", "trior",
    "trireg", "vectored", "wait", "wand", "weak0", "weak1", "while", "wire", "wor", "xnor",
    "xor",
];

/// `ceil(log2(n))`, zero for `n <= 1`.
pub fn clog2(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        64 - (n - 1).leading_zeros()
    }
}

/// Bits needed to hold `value`, never less than one.
pub fn bits_for_value(value: u64) -> u32 {
    match value.checked_add(1) {
        Some(v) => clog2(v).max(1),
        None => 64,
    }
}

/// Width of a select bus choosing among `count` inputs.
pub fn select_width(count: usize) -> u32 {
    clog2(count as u64).max(1)
}

/// Base name for a clock link wire: `clk_<target>_from_<source>[_<index>]`.
pub fn clock_link_base(target: &str, source: &str, index: usize) -> String {
    if index == 0 {
        format!("clk_{target}_from_{source}")
    } else {
        format!("clk_{target}_from_{source}_{index}")
    }
}

/// Instance prefix for a clock link: `u_<target>_<source>[_<index>]`.
pub fn clock_link_instance(target: &str, source: &str, index: usize) -> String {
    if index == 0 {
        format!("u_{target}_{source}")
    } else {
        format!("u_{target}_{source}_{index}")
    }
}

/// Wire carrying the shaped, active-low reset of one link.
pub fn reset_link_wire(target: &str, index: usize) -> String {
    format!("{target}_link{index}_n")
}

/// Instance name for a reset shaping component.
///
/// Link-level components are `u_<target>_link<i>_<kind>`, target-level
/// components are `u_<target>_<kind>`.
pub fn reset_instance(target: &str, link: Option<usize>, kind: &str) -> String {
    match link {
        Some(index) => format!("u_{target}_link{index}_{kind}"),
        None => format!("u_{target}_{kind}"),
    }
}

/// Replace bare decimal numbers in `condition` with sized Verilog literals.
///
/// `0` and `1` become `1'b0`/`1'b1`, larger values are emitted in hex with
/// the smallest of 4, 8, 16 or 32 bits that holds them. Digits that are part
/// of an identifier or of an already-sized literal are left untouched.
pub fn format_condition(condition: &str) -> String {
    let chars: Vec<char> = condition.chars().collect();
    let mut out = String::with_capacity(condition.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !c.is_ascii_digit() {
            out.push(c);
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let digits: String = chars[start..i].iter().collect();
        let glued_before = start > 0 && is_literal_char(chars[start - 1]);
        let glued_after = i < chars.len() && is_literal_char(chars[i]);
        match digits.parse::<u64>() {
            Ok(value) if !glued_before && !glued_after => out.push_str(&sized_literal(value)),
            _ => out.push_str(&digits),
        }
    }
    out
}

fn is_literal_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '\''
}

fn sized_literal(value: u64) -> String {
    match value {
        0 | 1 => format!("1'b{value}"),
        2..=15 => format!("4'h{value:x}"),
        16..=255 => format!("8'h{value:x}"),
        256..=65535 => format!("16'h{value:x}"),
        _ => format!("32'h{value:x}"),
    }
}

/// Whether `name` is a legal, non-reserved Verilog identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return false;
    }
    !RESERVED_WORDS.contains(&name.to_lowercase().as_str())
}

/// Neutralise comment terminators inside text placed in a block comment.
pub fn escape_comment(text: &str) -> String {
    text.replace("*/", "* /").replace("//", "/ /")
}

/// Logical inversion of an expression.
///
/// `x` becomes `~x`, `~x` becomes `x`, anything compound is parenthesised.
pub fn invert_expr(expr: &str) -> String {
    let expr = expr.trim();
    match expr {
        "1'b0" => return "1'b1".to_string(),
        "1'b1" => return "1'b0".to_string(),
        _ => {}
    }
    if let Some(inner) = expr.strip_prefix('~') {
        if is_simple_operand(inner) || is_wrapped(inner) {
            return inner.to_string();
        }
    }
    if is_simple_operand(expr) {
        format!("~{expr}")
    } else {
        format!("~({expr})")
    }
}

/// `(…)` where the opening parenthesis closes at the very end.
fn is_wrapped(expr: &str) -> bool {
    if !expr.starts_with('(') || !expr.ends_with(')') {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in expr.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != expr.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// An identifier, optionally followed by a constant bit select.
fn is_simple_operand(expr: &str) -> bool {
    match signal_base(expr) {
        Some(base) => {
            let rest = &expr[base.len()..];
            rest.is_empty() || (rest.starts_with('[') && rest.ends_with(']'))
        }
        None => false,
    }
}

/// The identifier a port would be declared for, if `expr` is a plain signal
/// reference (`sig` or `sig[3]`). Literals and expressions yield `None`.
pub fn signal_base(expr: &str) -> Option<&str> {
    let expr = expr.trim();
    let end = expr.find('[').unwrap_or(expr.len());
    let base = &expr[..end];
    if !is_valid_identifier(base) {
        return None;
    }
    if end < expr.len() {
        let select = &expr[end..];
        let body = select.strip_prefix('[')?.strip_suffix(']')?;
        if !body
            .chars()
            .all(|c| c.is_ascii_digit() || c == ':' || c.is_whitespace())
        {
            return None;
        }
    }
    Some(base)
}

/// Signal names referenced by an expression, in order of first appearance.
///
/// Sized literals (`4'hA`) and reserved words are skipped.
pub fn identifiers(expr: &str) -> Vec<&str> {
    let bytes = expr.as_bytes();
    let mut found: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && is_ident_byte(bytes[i]) {
                i += 1;
            }
            let word = &expr[start..i];
            let in_literal = start > 0 && bytes[start - 1] == b'\'';
            if !in_literal && is_valid_identifier(word) && !found.contains(&word) {
                found.push(word);
            }
        } else if c.is_ascii_digit() {
            while i < bytes.len() && (is_ident_byte(bytes[i]) || bytes[i] == b'\'') {
                i += 1;
            }
        } else {
            i += 1;
        }
    }
    found
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

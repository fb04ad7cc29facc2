//! Reset reason recorder.
//!
//! One sticky flag per non-root source. A flag is set asynchronously while its
//! source is asserted and cleared synchronously during a two-cycle window that
//! opens after the root reset releases and again on each software clear pulse.
//! Flags are deliberately outside the root reset so the cause of the last
//! reset survives it.

use std::fmt::Write;

use ctrlgen_core::verilog::concat;

use crate::config::{ReasonConfig, ResetControllerConfig};

/// Wire name of the active-low event for `source`.
pub fn event_wire(reason: &ReasonConfig, source: &str) -> String {
    format!("{}_evt_{source}_n", reason.output)
}

/// Emit the recorder body.
pub fn emit(config: &ResetControllerConfig, reason: &ReasonConfig) -> String {
    let p = &reason.output;
    let clk = &reason.clock;
    let width = reason.vector_width();
    let mut out = String::new();

    let root = config
        .source(&reason.root_reset)
        .map(|s| s.normalized())
        .unwrap_or_else(|| reason.root_reset.clone());
    let _ = writeln!(out, "    wire {p}_root_n = {root};");

    for source in &reason.source_order {
        let expr = config
            .source(source)
            .map(|s| s.normalized())
            .unwrap_or_else(|| source.clone());
        let _ = writeln!(out, "    wire {} = {expr};", event_wire(reason, source));
    }

    match &reason.clear {
        Some(clear) => {
            let _ = write!(
                out,
                r#"
    /* Software clear: synchronize and detect the rising edge */
    reg  [1:0] {p}_clr_sync;
    reg        {p}_clr_q;
    always @(posedge {clk} or negedge {p}_root_n) begin
        if (!{p}_root_n) begin
            {p}_clr_sync <= 2'b00;
            {p}_clr_q    <= 1'b0;
        end else begin
            {p}_clr_sync <= {{{p}_clr_sync[0], {clear}}};
            {p}_clr_q    <= {p}_clr_sync[1];
        end
    end
    wire {p}_clr_pulse = {p}_clr_sync[1] & ~{p}_clr_q;
"#
            );
        }
        None => {
            let _ = writeln!(out, "    wire {p}_clr_pulse = 1'b0;");
        }
    }

    let _ = write!(
        out,
        r#"
    /* Clear window: two cycles after root release and after each clear pulse */
    reg        {p}_init_done;
    reg  [1:0] {p}_clr_cnt;
    always @(posedge {clk} or negedge {p}_root_n) begin
        if (!{p}_root_n) begin
            {p}_init_done <= 1'b0;
            {p}_clr_cnt   <= 2'd0;
        end else if (!{p}_init_done) begin
            {p}_init_done <= 1'b1;
            {p}_clr_cnt   <= 2'd2;
        end else if ({p}_clr_pulse) begin
            {p}_clr_cnt   <= 2'd2;
        end else if ({p}_clr_cnt != 2'd0) begin
            {p}_clr_cnt   <= {p}_clr_cnt - 2'd1;
        end
    end
    wire {p}_clr_win = ({p}_clr_cnt != 2'd0);
"#
    );

    let mut flags = Vec::with_capacity(reason.source_order.len());
    if reason.source_order.is_empty() {
        flags.push("1'b0".to_string());
    }
    for (bit, source) in reason.source_order.iter().enumerate() {
        let flag = format!("{p}_flag_{bit}");
        let evt = event_wire(reason, source);
        let _ = write!(
            out,
            r#"
    /* Bit {bit}: {source} */
    reg {flag};
    always @(posedge {clk} or negedge {evt}) begin
        if (!{evt}) begin
            {flag} <= 1'b1;
        end else if ({p}_clr_win) begin
            {flag} <= 1'b0;
        end
    end
"#
        );
        flags.push(flag);
    }
    flags.reverse();

    let range = if width > 1 {
        format!("[{}:0] ", width - 1)
    } else {
        String::new()
    };
    let valid = &reason.valid;
    let _ = write!(
        out,
        r#"
    wire {range}{p}_flags = {flags};
    assign {valid} = {p}_init_done & ~{p}_clr_win;
    assign {p} = {valid} ? {p}_flags : {width}'d0;
"#,
        flags = if flags.len() == 1 {
            flags[0].clone()
        } else {
            concat(&flags)
        },
    );
    out
}

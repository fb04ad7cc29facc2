//! Template cells instantiated by power controllers (`power_cell.v`).

use ctrlgen_core::celllib::CellCatalog;

use crate::emit::{FSM_CELL, RST_SYNC_CELL};

pub const FILE_NAME: &str = "power_cell.v";

pub fn catalog() -> CellCatalog {
    CellCatalog::new(FILE_NAME, "Template power cells for power controllers")
        .with_cell(FSM_CELL, POWER_FSM)
        .with_cell(RST_SYNC_CELL, POWER_RST_SYNC)
}

const POWER_FSM: &str = r#"/**
 * @brief Per-domain power sequencing FSM
 *
 * Power up:   switch on, pgood settle, clock on, then reset release.
 * Power down: reset assert, then clock off and switch off, pgood drop settle.
 * A missed hard dependency faults and retries after a cooldown; a missed
 * soft dependency sets the sticky fault flag and proceeds. test_en forces
 * the fully-on outputs without touching the state register.
 *
 * @param HAS_SWITCH        1 to drive pwr_switch
 * @param WAIT_DEP_CYCLES   Dependency wait window
 * @param SETTLE_ON_CYCLES  Power-on settle window
 * @param SETTLE_OFF_CYCLES Power-off settle window
 */
module qsoc_power_fsm #(
    parameter integer HAS_SWITCH        = 1,
    parameter integer WAIT_DEP_CYCLES   = 100,
    parameter integer SETTLE_ON_CYCLES  = 100,
    parameter integer SETTLE_OFF_CYCLES = 50
) (
    input  wire clk,
    input  wire rst_n,
    input  wire test_en,
    input  wire ctrl_enable,
    input  wire fault_clear,
    input  wire dep_hard_all,
    input  wire dep_soft_all,
    input  wire pgood,
    output reg  clk_enable,
    output reg  rst_allow,
    output reg  pwr_switch,
    output reg  ready,
    output reg  valid,
    output reg  fault
);
    function integer bits_for;
        input integer n;
        integer v;
        begin
            v = (n < 2) ? 1 : n - 1;
            bits_for = 0;
            while (v > 0) begin
                bits_for = bits_for + 1;
                v = v >> 1;
            end
            if (bits_for < 1) bits_for = 1;
        end
    endfunction

    localparam integer MAX_SETTLE =
        (SETTLE_ON_CYCLES > SETTLE_OFF_CYCLES) ? SETTLE_ON_CYCLES : SETTLE_OFF_CYCLES;
    localparam integer MAX_CYCLES =
        (MAX_SETTLE > WAIT_DEP_CYCLES) ? MAX_SETTLE : WAIT_DEP_CYCLES;
    localparam integer WIDTH = bits_for(MAX_CYCLES);

    localparam [2:0] S_OFF        = 3'd0;
    localparam [2:0] S_WAIT_DEP   = 3'd1;
    localparam [2:0] S_TURN_ON    = 3'd2;
    localparam [2:0] S_ON         = 3'd3;
    localparam [2:0] S_TURN_OFF   = 3'd4;
    localparam [2:0] S_FAULT      = 3'd5;
    localparam [2:0] S_CLK_ON     = 3'd6;
    localparam [2:0] S_RST_ASSERT = 3'd7;

    reg [2:0]       state, state_n;
    reg [WIDTH-1:0] t_dep, t_on, t_off;
    reg             ld_dep, dec_dep;
    reg             ld_on, dec_on;
    reg             ld_off, dec_off;
    reg             soft_miss;

    /* Timers load N-1; zero means no wait */
    always @(posedge clk or negedge rst_n) begin
        if (!rst_n) begin
            state <= S_OFF;
            t_dep <= {WIDTH{1'b0}};
            t_on  <= {WIDTH{1'b0}};
            t_off <= {WIDTH{1'b0}};
            fault <= 1'b0;
        end else begin
            state <= state_n;

            if (ld_dep)
                t_dep <= (WAIT_DEP_CYCLES == 0) ? {WIDTH{1'b0}} : WAIT_DEP_CYCLES - 1;
            else if (dec_dep && t_dep != 0)
                t_dep <= t_dep - 1'b1;

            if (ld_on)
                t_on <= (SETTLE_ON_CYCLES == 0) ? {WIDTH{1'b0}} : SETTLE_ON_CYCLES - 1;
            else if (dec_on && t_on != 0)
                t_on <= t_on - 1'b1;

            if (ld_off)
                t_off <= (SETTLE_OFF_CYCLES == 0) ? {WIDTH{1'b0}} : SETTLE_OFF_CYCLES - 1;
            else if (dec_off && t_off != 0)
                t_off <= t_off - 1'b1;

            if (soft_miss || state_n == S_FAULT)
                fault <= 1'b1;
            if (state == S_FAULT && fault_clear)
                fault <= 1'b0;
        end
    end

    always @* begin
        state_n   = state;
        ld_dep    = 1'b0;
        dec_dep   = 1'b0;
        ld_on     = 1'b0;
        dec_on    = 1'b0;
        ld_off    = 1'b0;
        dec_off   = 1'b0;
        soft_miss = 1'b0;

        case (state)
        S_OFF: begin
            if (ctrl_enable) begin
                state_n = S_WAIT_DEP;
                ld_dep  = 1'b1;
            end
        end
        S_WAIT_DEP: begin
            if (!ctrl_enable) begin
                state_n = S_OFF;
            end else if (dep_hard_all && (dep_soft_all || t_dep == 0)) begin
                soft_miss = !dep_soft_all;
                state_n   = S_TURN_ON;
                ld_on     = 1'b1;
            end else if (!dep_hard_all && t_dep == 0) begin
                state_n = S_FAULT;
                ld_dep  = 1'b1;
            end else begin
                dec_dep = 1'b1;
            end
        end
        S_TURN_ON: begin
            if (!ctrl_enable) begin
                state_n = S_TURN_OFF;
                ld_off  = 1'b1;
            end else if (t_on == 0) begin
                if (pgood) begin
                    state_n = S_CLK_ON;
                end else begin
                    state_n = S_FAULT;
                    ld_dep  = 1'b1;
                end
            end else begin
                dec_on = 1'b1;
            end
        end
        S_CLK_ON: begin
            /* Clock runs one cycle before reset release */
            state_n = S_ON;
        end
        S_ON: begin
            if (!ctrl_enable)
                state_n = S_RST_ASSERT;
        end
        S_RST_ASSERT: begin
            /* Reset asserts while the clock still runs */
            state_n = S_TURN_OFF;
            ld_off  = 1'b1;
        end
        S_TURN_OFF: begin
            if (t_off == 0) begin
                if (!pgood) begin
                    state_n = S_OFF;
                end else begin
                    state_n = S_FAULT;
                    ld_dep  = 1'b1;
                end
            end else begin
                dec_off = 1'b1;
            end
        end
        S_FAULT: begin
            if (!ctrl_enable) begin
                state_n = S_OFF;
            end else if (dep_hard_all && t_dep == 0) begin
                state_n = S_WAIT_DEP;
                ld_dep  = 1'b1;
            end else begin
                dec_dep = 1'b1;
            end
        end
        default: state_n = S_FAULT;
        endcase
    end

    always @* begin
        clk_enable = 1'b0;
        rst_allow  = 1'b0;
        pwr_switch = 1'b0;
        ready      = 1'b0;
        valid      = 1'b0;

        case (state)
        S_TURN_ON: begin
            pwr_switch = HAS_SWITCH != 0;
            valid      = pgood;
        end
        S_CLK_ON, S_RST_ASSERT: begin
            pwr_switch = HAS_SWITCH != 0;
            clk_enable = 1'b1;
            valid      = pgood;
        end
        S_ON: begin
            pwr_switch = HAS_SWITCH != 0;
            clk_enable = 1'b1;
            rst_allow  = 1'b1;
            ready      = 1'b1;
            valid      = 1'b1;
        end
        S_TURN_OFF: begin
            valid = pgood;
        end
        default: begin
        end
        endcase

        if (test_en) begin
            pwr_switch = HAS_SWITCH != 0;
            clk_enable = 1'b1;
            rst_allow  = 1'b1;
            ready      = 1'b1;
            valid      = 1'b1;
        end
    end
endmodule
"#;

const POWER_RST_SYNC: &str = r#"/**
 * @brief Follow-reset synchronizer for a power domain clock
 *
 * Asserts asynchronously, releases after STAGE edges of clk_dom. test_en
 * releases immediately.
 *
 * @param STAGE Number of synchronizer flip-flops
 */
module qsoc_power_rst_sync #(
    parameter integer STAGE = 4
) (
    input  wire clk_dom,
    input  wire rst_gate_n,
    input  wire test_en,
    output wire rst_dom_n
);
    reg  [STAGE-1:0] sync_q;
    wire             rst_n_int = test_en | rst_gate_n;

    always @(posedge clk_dom or negedge rst_n_int) begin
        if (!rst_n_int) begin
            sync_q <= {STAGE{1'b0}};
        end else begin
            sync_q <= {sync_q, 1'b1};
        end
    end

    assign rst_dom_n = test_en | sync_q[STAGE-1];
endmodule
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_holds_fsm_and_synchronizer() {
        let catalog = catalog();
        assert_eq!(catalog.names(), ["qsoc_power_fsm", "qsoc_power_rst_sync"]);
        let text = catalog.render();
        assert_eq!(text.matches("endmodule").count(), 2);
        for state in ["S_OFF", "S_WAIT_DEP", "S_TURN_ON", "S_CLK_ON", "S_ON", "S_RST_ASSERT", "S_TURN_OFF", "S_FAULT"] {
            assert!(text.contains(&format!("localparam [2:0] {state}")), "missing {state}");
        }
    }
}

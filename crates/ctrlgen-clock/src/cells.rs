//! Template cells instantiated by clock controllers (`clock_cell.v`).

use ctrlgen_core::celllib::CellCatalog;

pub const FILE_NAME: &str = "clock_cell.v";

pub fn catalog() -> CellCatalog {
    CellCatalog::new(FILE_NAME, "Template clock cells for clock controllers")
        .with_cell("qsoc_tc_clk_buf", CLK_BUF)
        .with_cell("qsoc_tc_clk_gate", CLK_GATE)
        .with_cell("qsoc_tc_clk_inv", CLK_INV)
        .with_cell("qsoc_tc_clk_and2", CLK_AND2)
        .with_cell("qsoc_tc_clk_or2", CLK_OR2)
        .with_cell("qsoc_tc_clk_mux2", CLK_MUX2)
        .with_cell("qsoc_tc_clk_xor2", CLK_XOR2)
        .with_cell("qsoc_clk_sync", CLK_SYNC)
        .with_cell("qsoc_clk_div", CLK_DIV)
        .with_cell("qsoc_clk_div_auto", CLK_DIV_AUTO)
        .with_cell("qsoc_clk_or_tree", CLK_OR_TREE)
        .with_cell("qsoc_clk_mux_gf", CLK_MUX_GF)
        .with_cell("qsoc_clk_mux_raw", CLK_MUX_RAW)
}

const CLK_BUF: &str = r#"/**
 * @brief Clock buffer
 */
module qsoc_tc_clk_buf (
    input  wire clk,
    output wire clk_out
);
    assign clk_out = clk;
endmodule
"#;

const CLK_GATE: &str = r#"/**
 * @brief Latch-based integrated clock gate
 *
 * The enable is captured while the clock is low, so the gated output never
 * produces a truncated high pulse. test_en forces the clock through.
 */
module qsoc_tc_clk_gate (
    input  wire clk,
    input  wire en,
    input  wire test_en,
    output wire clk_out
);
    reg en_latch;

    always @(clk or en or test_en) begin
        if (!clk) begin
            en_latch = en | test_en;
        end
    end

    assign clk_out = clk & en_latch;
endmodule
"#;

const CLK_INV: &str = r#"/**
 * @brief Clock inverter
 */
module qsoc_tc_clk_inv (
    input  wire clk_in,
    output wire clk_out
);
    assign clk_out = ~clk_in;
endmodule
"#;

const CLK_AND2: &str = r#"/**
 * @brief Two-input clock AND
 */
module qsoc_tc_clk_and2 (
    input  wire clk_in0,
    input  wire clk_in1,
    output wire clk_out
);
    assign clk_out = clk_in0 & clk_in1;
endmodule
"#;

const CLK_OR2: &str = r#"/**
 * @brief Two-input clock OR
 */
module qsoc_tc_clk_or2 (
    input  wire clk_in0,
    input  wire clk_in1,
    output wire clk_out
);
    assign clk_out = clk_in0 | clk_in1;
endmodule
"#;

const CLK_MUX2: &str = r#"/**
 * @brief Two-input combinational clock multiplexer
 */
module qsoc_tc_clk_mux2 (
    input  wire clk_in0,
    input  wire clk_in1,
    input  wire clk_sel,
    output wire clk_out
);
    assign clk_out = clk_sel ? clk_in1 : clk_in0;
endmodule
"#;

const CLK_XOR2: &str = r#"/**
 * @brief Two-input clock XOR
 */
module qsoc_tc_clk_xor2 (
    input  wire clk_in0,
    input  wire clk_in1,
    output wire clk_out
);
    assign clk_out = clk_in0 ^ clk_in1;
endmodule
"#;

const CLK_SYNC: &str = r#"/**
 * @brief Multi-stage synchronizer for a single control bit
 */
module qsoc_clk_sync #(
    parameter integer STAGE = 2
) (
    input  wire clk,
    input  wire rst_n,
    input  wire d,
    output wire q
);
    reg [STAGE-1:0] sync_q;

    always @(posedge clk or negedge rst_n) begin
        if (!rst_n) begin
            sync_q <= {STAGE{1'b0}};
        end else begin
            sync_q <= {sync_q[STAGE-2:0], d};
        end
    end

    assign q = sync_q[STAGE-1];
endmodule
"#;

const CLK_DIV: &str = r#"/**
 * @brief Clock divider with runtime ratio
 *
 * A new ratio is accepted through div/div_valid at the end of a division
 * period, signalled by div_ready. A ratio of 0 or 1 passes the clock through.
 */
module qsoc_clk_div #(
    parameter integer WIDTH              = 4,
    parameter integer DEFAULT_VAL        = 1,
    parameter integer CLOCK_DURING_RESET = 0
) (
    input  wire             clk,
    input  wire             rst_n,
    input  wire             en,
    input  wire             test_en,
    input  wire [WIDTH-1:0] div,
    input  wire             div_valid,
    output wire             div_ready,
    output wire             clk_out,
    output wire [WIDTH-1:0] count
);
    reg  [WIDTH-1:0] ratio_q;
    reg  [WIDTH-1:0] cnt_q;
    reg              en_latch;
    wire [WIDTH-1:0] ratio    = (ratio_q == {WIDTH{1'b0}}) ? {{(WIDTH-1){1'b0}}, 1'b1} : ratio_q;
    wire             cnt_wrap = (cnt_q >= ratio - 1'b1);
    wire             gate_en  = !rst_n ? (CLOCK_DURING_RESET != 0) : (en & cnt_wrap);

    always @(posedge clk or negedge rst_n) begin
        if (!rst_n) begin
            ratio_q <= DEFAULT_VAL;
            cnt_q   <= {WIDTH{1'b0}};
        end else if (en) begin
            cnt_q <= cnt_wrap ? {WIDTH{1'b0}} : cnt_q + 1'b1;
            if (cnt_wrap && div_valid) begin
                ratio_q <= div;
            end
        end
    end

    always @(clk or gate_en or test_en) begin
        if (!clk) begin
            en_latch = gate_en | test_en;
        end
    end

    assign div_ready = cnt_wrap;
    assign count     = cnt_q;
    assign clk_out   = clk & en_latch;
endmodule
"#;

const CLK_DIV_AUTO: &str = r#"/**
 * @brief Clock divider with a fixed ratio
 */
module qsoc_clk_div_auto #(
    parameter integer WIDTH              = 4,
    parameter integer DEFAULT_VAL        = 1,
    parameter integer CLOCK_DURING_RESET = 0
) (
    input  wire             clk,
    input  wire             rst_n,
    input  wire             en,
    input  wire             test_en,
    output wire             clk_out,
    output wire [WIDTH-1:0] count
);
    localparam [WIDTH-1:0] RATIO = (DEFAULT_VAL == 0) ? 1 : DEFAULT_VAL;

    reg  [WIDTH-1:0] cnt_q;
    reg              en_latch;
    wire             cnt_wrap = (cnt_q >= RATIO - 1'b1);
    wire             gate_en  = !rst_n ? (CLOCK_DURING_RESET != 0) : (en & cnt_wrap);

    always @(posedge clk or negedge rst_n) begin
        if (!rst_n) begin
            cnt_q <= {WIDTH{1'b0}};
        end else if (en) begin
            cnt_q <= cnt_wrap ? {WIDTH{1'b0}} : cnt_q + 1'b1;
        end
    end

    always @(clk or gate_en or test_en) begin
        if (!clk) begin
            en_latch = gate_en | test_en;
        end
    end

    assign count   = cnt_q;
    assign clk_out = clk & en_latch;
endmodule
"#;

const CLK_OR_TREE: &str = r#"/**
 * @brief OR reduction of several clocks
 */
module qsoc_clk_or_tree #(
    parameter integer INPUT_COUNT = 2
) (
    input  wire [INPUT_COUNT-1:0] clk_in,
    output wire                   clk_out
);
    assign clk_out = |clk_in;
endmodule
"#;

const CLK_MUX_GF: &str = r#"/**
 * @brief Glitch-free clock multiplexer
 *
 * Each input owns an enable synchronised in its own clock domain. An input is
 * enabled only after every other input has been disabled, so switching never
 * produces a truncated pulse. test_en selects test_clk directly.
 */
module qsoc_clk_mux_gf #(
    parameter integer NUM_CLK     = 2,
    parameter integer SEL_WIDTH   = (NUM_CLK > 1) ? $clog2(NUM_CLK) : 1,
    parameter integer SYNC_STAGES = 2
) (
    input  wire [NUM_CLK-1:0]   clk_in,
    input  wire [SEL_WIDTH-1:0] async_sel,
    input  wire                 async_rst_n,
    input  wire                 test_en,
    input  wire                 test_clk,
    output wire                 clk_out
);
    wire [NUM_CLK-1:0] en_q;
    wire [NUM_CLK-1:0] gated;

    genvar i;
    generate
        for (i = 0; i < NUM_CLK; i = i + 1) begin : g_ch
            wire [NUM_CLK-1:0] self_mask = {{(NUM_CLK-1){1'b0}}, 1'b1} << i;
            wire               want      = (async_sel == i) && ~|(en_q & ~self_mask);
            reg  [SYNC_STAGES-1:0] sync_q;
            reg                    en_neg;

            always @(posedge clk_in[i] or negedge async_rst_n) begin
                if (!async_rst_n) begin
                    sync_q <= {SYNC_STAGES{1'b0}};
                end else begin
                    sync_q <= {sync_q[SYNC_STAGES-2:0], want};
                end
            end

            always @(negedge clk_in[i] or negedge async_rst_n) begin
                if (!async_rst_n) begin
                    en_neg <= 1'b0;
                end else begin
                    en_neg <= sync_q[SYNC_STAGES-1];
                end
            end

            assign en_q[i]  = en_neg;
            assign gated[i] = clk_in[i] & en_neg;
        end
    endgenerate

    assign clk_out = test_en ? test_clk : |gated;
endmodule
"#;

const CLK_MUX_RAW: &str = r#"/**
 * @brief Combinational clock multiplexer
 */
module qsoc_clk_mux_raw #(
    parameter integer NUM_CLK   = 2,
    parameter integer SEL_WIDTH = (NUM_CLK > 1) ? $clog2(NUM_CLK) : 1
) (
    input  wire [NUM_CLK-1:0]   clk_in,
    input  wire [SEL_WIDTH-1:0] clk_sel,
    output wire                 clk_out
);
    assign clk_out = clk_in[clk_sel];
endmodule
"#;

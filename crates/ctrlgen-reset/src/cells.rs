//! Template cells instantiated by reset controllers (`reset_cell.v`).
//!
//! All three share the port list `clk, rst_in_n, test_enable, rst_out_n` and
//! pass `rst_in_n` straight through while `test_enable` is high.

use ctrlgen_core::celllib::CellCatalog;

pub const FILE_NAME: &str = "reset_cell.v";

pub fn catalog() -> CellCatalog {
    CellCatalog::new(FILE_NAME, "Template reset cells for reset controllers")
        .with_cell("qsoc_rst_sync", RST_SYNC)
        .with_cell("qsoc_rst_pipe", RST_PIPE)
        .with_cell("qsoc_rst_count", RST_COUNT)
}

const RST_SYNC: &str = r#"/**
 * @brief Reset synchronizer: asynchronous assert, synchronous release
 *
 * @param STAGE Number of flip-flops in the release path
 */
module qsoc_rst_sync #(
    parameter integer STAGE = 3
) (
    input  wire clk,
    input  wire rst_in_n,
    input  wire test_enable,
    output wire rst_out_n
);
    reg [STAGE-1:0] sync_q;

    always @(posedge clk or negedge rst_in_n) begin
        if (!rst_in_n) begin
            sync_q <= {STAGE{1'b0}};
        end else begin
            sync_q <= {sync_q, 1'b1};
        end
    end

    assign rst_out_n = test_enable ? rst_in_n : sync_q[STAGE-1];
endmodule
"#;

const RST_PIPE: &str = r#"/**
 * @brief Synchronous reset pipeline
 *
 * Both assertion and release are delayed by STAGE clock cycles.
 *
 * @param STAGE Pipeline depth
 */
module qsoc_rst_pipe #(
    parameter integer STAGE = 4
) (
    input  wire clk,
    input  wire rst_in_n,
    input  wire test_enable,
    output wire rst_out_n
);
    reg [STAGE-1:0] pipe_q;

    always @(posedge clk) begin
        pipe_q <= {pipe_q, rst_in_n};
    end

    assign rst_out_n = test_enable ? rst_in_n : pipe_q[STAGE-1];
endmodule
"#;

const RST_COUNT: &str = r#"/**
 * @brief Counter-based reset release
 *
 * Asserts asynchronously and releases CYCLE clock cycles after rst_in_n
 * deasserts.
 *
 * @param CYCLE Release delay in clock cycles
 */
module qsoc_rst_count #(
    parameter integer CYCLE = 16
) (
    input  wire clk,
    input  wire rst_in_n,
    input  wire test_enable,
    output wire rst_out_n
);
    localparam integer WIDTH = (CYCLE > 1) ? $clog2(CYCLE + 1) : 1;

    reg [WIDTH-1:0] cnt_q;
    reg             rel_q;

    always @(posedge clk or negedge rst_in_n) begin
        if (!rst_in_n) begin
            cnt_q <= {WIDTH{1'b0}};
            rel_q <= 1'b0;
        end else if (!rel_q) begin
            if (cnt_q == CYCLE - 1) begin
                rel_q <= 1'b1;
            end else begin
                cnt_q <= cnt_q + 1'b1;
            end
        end
    end

    assign rst_out_n = test_enable ? rst_in_n : rel_q;
endmodule
"#;

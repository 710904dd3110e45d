//! Few-shot design patterns selected by task keywords.

use tracing::info;

/// A reference design shown to the model when the task mentions it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesignPattern {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub example: &'static str,
}

const COUNTER: DesignPattern = DesignPattern {
    name: "counter",
    keywords: &["counter", "count"],
    example: r#"
EXAMPLE: Parameterized Counter
```verilog
module counter #(
    parameter WIDTH = 8
)(
    input  logic             clk,
    input  logic             rst_n,
    input  logic             enable,
    output logic [WIDTH-1:0] count
);
    always_ff @(posedge clk or negedge rst_n) begin
        if (!rst_n)
            count <= '0;
        else if (enable)
            count <= count + 1'b1;
    end
endmodule
```"#,
};

const FIFO: DesignPattern = DesignPattern {
    name: "fifo",
    keywords: &["fifo", "buffer", "queue"],
    example: r#"
EXAMPLE: Synchronous FIFO
```verilog
module sync_fifo #(
    parameter DEPTH = 8,
    parameter WIDTH = 32
)(
    input  logic             clk,
    input  logic             rst_n,
    input  logic             wr_en,
    input  logic             rd_en,
    input  logic [WIDTH-1:0] wr_data,
    output logic [WIDTH-1:0] rd_data,
    output logic             full,
    output logic             empty
);
    logic [WIDTH-1:0] mem [0:DEPTH-1];
    logic [$clog2(DEPTH):0] wr_ptr, rd_ptr;

    assign full  = (wr_ptr[$clog2(DEPTH)] != rd_ptr[$clog2(DEPTH)]) &&
                   (wr_ptr[$clog2(DEPTH)-1:0] == rd_ptr[$clog2(DEPTH)-1:0]);
    assign empty = (wr_ptr == rd_ptr);

    always_ff @(posedge clk or negedge rst_n) begin
        if (!rst_n) begin
            wr_ptr <= '0;
            rd_ptr <= '0;
        end else begin
            if (wr_en && !full)
                wr_ptr <= wr_ptr + 1'b1;
            if (rd_en && !empty)
                rd_ptr <= rd_ptr + 1'b1;
        end
    end

    always_ff @(posedge clk) begin
        if (wr_en && !full)
            mem[wr_ptr[$clog2(DEPTH)-1:0]] <= wr_data;
    end

    assign rd_data = mem[rd_ptr[$clog2(DEPTH)-1:0]];
endmodule
```"#,
};

const FSM: DesignPattern = DesignPattern {
    name: "fsm",
    keywords: &["fsm", "state", "machine"],
    example: r#"
EXAMPLE: Finite State Machine
```verilog
module fsm (
    input  logic clk,
    input  logic rst_n,
    input  logic start,
    input  logic done,
    output logic busy,
    output logic valid
);
    typedef enum logic [1:0] {
        IDLE = 2'b00,
        ACTIVE = 2'b01,
        FINISH = 2'b10
    } state_t;

    state_t current_state, next_state;

    // State register
    always_ff @(posedge clk or negedge rst_n) begin
        if (!rst_n)
            current_state <= IDLE;
        else
            current_state <= next_state;
    end

    // Next state logic
    always_comb begin
        next_state = current_state;
        case (current_state)
            IDLE: if (start) next_state = ACTIVE;
            ACTIVE: if (done) next_state = FINISH;
            FINISH: next_state = IDLE;
            default: next_state = IDLE;
        endcase
    end

    // Output logic
    assign busy = (current_state == ACTIVE);
    assign valid = (current_state == FINISH);
endmodule
```"#,
};

/// Catalogue in presentation order. The first entry doubles as the default.
pub static CATALOGUE: [DesignPattern; 3] = [COUNTER, FIFO, FSM];

/// Patterns whose keywords occur in the task, or the default pattern alone.
pub fn select(task: &str) -> Vec<&'static DesignPattern> {
    let lower = task.to_lowercase();
    let mut selected: Vec<&'static DesignPattern> = CATALOGUE
        .iter()
        .filter(|pattern| pattern.keywords.iter().any(|kw| lower.contains(kw)))
        .collect();

    if selected.is_empty() {
        selected.push(&CATALOGUE[0]);
    }

    info!(
        patterns = ?selected.iter().map(|p| p.name).collect::<Vec<_>>(),
        "Selected few-shot examples"
    );
    selected
}

/// Render the selected patterns as a prompt section.
pub fn render(task: &str) -> String {
    let examples: Vec<&str> = select(task).iter().map(|p| p.example).collect();
    format!("\nDESIGN PATTERNS:\n{}", examples.join("\n"))
}

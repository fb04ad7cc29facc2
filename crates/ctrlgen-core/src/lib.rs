//! Shared building blocks for the ctrlgen controller generators.
//!
//! ## Modules
//!
//! - [`naming`] — Deterministic wire/instance names and literal formatting
//! - [`registry`] — Port registry with the output-wins rule
//! - [`verilog`] — Instance and module text builders
//! - [`celllib`] — Shared cell-library files and their merge policies
//! - [`yaml`] — Field access over YAML controller descriptions
//! - [`diag`] — Severity-tagged diagnostics routed through `log`
//! - [`generator`] — The `Generator` trait and its options
//! - [`report`] — Per-invocation generation report

pub mod celllib;
pub mod diag;
pub mod error;
pub mod generator;
pub mod naming;
pub mod registry;
pub mod report;
pub mod verilog;
pub mod yaml;

pub use celllib::{CellCatalog, CellFileOutcome, CellFilePolicy, CellLibrary};
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use error::{GenError, Result};
pub use generator::{Generator, GeneratorOptions};
pub use registry::{Port, PortDirection, SignalRegistry};
pub use report::GenerationReport;
pub use verilog::{Instance, ModuleText};

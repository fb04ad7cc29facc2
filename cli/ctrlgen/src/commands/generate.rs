//! `ctrlgen generate`: turn a YAML description into Verilog.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ctrlgen_core::error::GenError;
use ctrlgen_core::report::GenerationReport;
use serde_yaml::Value;

use crate::commands::{generators, DOMAINS};
use crate::OutputSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportFormat {
    Human,
    Json,
}

fn resolve_format(format: Option<&str>) -> Result<ReportFormat> {
    match format {
        None | Some("human") => Ok(ReportFormat::Human),
        Some("json") => Ok(ReportFormat::Json),
        Some(other) => bail!("unknown report format '{other}' (expected human or json)"),
    }
}

/// Result of one controller in the document.
#[derive(Debug)]
pub struct ControllerOutcome {
    pub domain: &'static str,
    /// Position within the domain's sequence, 0 for a single mapping.
    pub index: usize,
    pub result: std::result::Result<GenerationReport, GenError>,
}

/// Every controller of a document plus the concatenated Verilog of the
/// ones that succeeded.
#[derive(Debug)]
pub struct DocumentRun {
    pub verilog: String,
    pub controllers: Vec<ControllerOutcome>,
}

impl DocumentRun {
    pub fn failed(&self) -> usize {
        self.controllers.iter().filter(|c| c.result.is_err()).count()
    }
}

pub fn run(input: &Path, settings: &OutputSettings, report_format: Option<&str>) -> Result<()> {
    let format = resolve_format(report_format)?;
    let text =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let document: Value =
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", input.display()))?;

    fs::create_dir_all(&settings.dir)
        .with_context(|| format!("creating {}", settings.dir.display()))?;
    let run = generate_document(&document, settings)?;

    let output = output_path(input, &settings.dir);
    if !run.verilog.is_empty() {
        fs::write(&output, &run.verilog)
            .with_context(|| format!("writing {}", output.display()))?;
    }

    match format {
        ReportFormat::Human => print_human(&run, &output),
        ReportFormat::Json => {
            let json = json_report(&run, input, &output)?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    let failed = run.failed();
    if failed > 0 {
        bail!(
            "{failed} of {} controller(s) failed to generate",
            run.controllers.len()
        );
    }
    Ok(())
}

/// `<dir>/<input stem>.v`
pub fn output_path(input: &Path, dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("controllers");
    dir.join(format!("{stem}.v"))
}

/// Run every controller found under the `clock`, `reset` and `power` keys.
pub fn generate_document(document: &Value, settings: &OutputSettings) -> Result<DocumentRun> {
    let Some(map) = document.as_mapping() else {
        bail!("expected a mapping with clock, reset or power keys");
    };
    for key in map.keys() {
        let known = key.as_str().is_some_and(|k| DOMAINS.contains(&k));
        if !known {
            log::warn!("ignoring unknown top-level key {key:?}");
        }
    }

    let mut verilog = String::new();
    let mut controllers = Vec::new();
    for generator in generators(settings) {
        let domain = generator.domain();
        let nodes: Vec<&Value> = match map.get(domain) {
            None | Some(Value::Null) => continue,
            Some(Value::Sequence(items)) => items.iter().collect(),
            Some(node) => vec![node],
        };
        for (index, node) in nodes.into_iter().enumerate() {
            let mut text = String::new();
            let result = generator.generate(node, &mut text);
            match &result {
                Ok(report) => {
                    log::info!("generated {} module `{}`", domain, report.module_name);
                    if !verilog.is_empty() {
                        verilog.push('\n');
                    }
                    verilog.push_str(&text);
                }
                Err(e) => log::error!("{domain} controller #{index}: {e}"),
            }
            controllers.push(ControllerOutcome {
                domain,
                index,
                result,
            });
        }
    }

    if controllers.is_empty() {
        bail!("no clock, reset or power controllers found");
    }
    Ok(DocumentRun {
        verilog,
        controllers,
    })
}

fn print_human(run: &DocumentRun, output: &Path) {
    for controller in &run.controllers {
        match &controller.result {
            Ok(report) => {
                println!("{}", report.summary());
                for diagnostic in &report.diagnostics {
                    println!("  {diagnostic}");
                }
                if let Some(outcome) = &report.cell_file {
                    println!("  cell library: {outcome:?}");
                }
            }
            Err(e) => {
                println!("{} #{}: failed: {e}", controller.domain, controller.index);
                if let GenError::Validation { diagnostics, .. } = e {
                    for diagnostic in diagnostics {
                        println!("  {diagnostic}");
                    }
                }
            }
        }
    }
    if !run.verilog.is_empty() {
        println!("Wrote {}", output.display());
    }
}

fn json_report(run: &DocumentRun, input: &Path, output: &Path) -> Result<serde_json::Value> {
    let mut controllers = Vec::with_capacity(run.controllers.len());
    for controller in &run.controllers {
        let entry = match &controller.result {
            Ok(report) => serde_json::json!({
                "domain": controller.domain,
                "index": controller.index,
                "status": "ok",
                "report": serde_json::to_value(report)?,
            }),
            Err(e) => {
                let diagnostics = match e {
                    GenError::Validation { diagnostics, .. } => serde_json::to_value(diagnostics)?,
                    _ => serde_json::Value::Array(Vec::new()),
                };
                serde_json::json!({
                    "domain": controller.domain,
                    "index": controller.index,
                    "status": "failed",
                    "error": e.to_string(),
                    "diagnostics": diagnostics,
                })
            }
        };
        controllers.push(entry);
    }
    Ok(serde_json::json!({
        "input": input.display().to_string(),
        "output": (!run.verilog.is_empty()).then(|| output.display().to_string()),
        "failed": run.failed(),
        "controllers": controllers,
    }))
}

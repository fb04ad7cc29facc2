//! `ctrlgen init`: project scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::manifest::{CtrlgenManifest, DEFAULT_OUTPUT_DIR, MANIFEST_FILE};

pub const SAMPLE_FILE: &str = "soc_ctrl.yaml";

/// A small description exercising all three generators.
pub const SAMPLE: &str = r#"# Clock, reset and power controllers for ctrlgen.
clock:
  name: clkctrl
  test_enable: test_en
  input:
    osc_24m: {freq: 24MHz}
    pll_1g: {freq: 1GHz}
  target:
    cpu_clk:
      freq: 500MHz
      link:
        pll_1g:
          div: {default: 2}
        osc_24m: {}
      select: cpu_clk_sel
      reset: por_rst_n
      icg: {enable: cpu_clk_en}
    uart_clk:
      link:
        osc_24m: {}

reset:
  name: rstctrl
  clock: clk_ao
  test_enable: test_en
  source:
    por_rst_n: {active: low, comment: power-on reset}
    wdt_rst: {active: high, comment: watchdog}
  target:
    cpu_rst_n:
      active: low
      link:
        por_rst_n:
          async: {}
        wdt_rst:
          async: {}
      count: {cycle: 32}
  reason:
    root_reset: por_rst_n
    clear: rst_reason_clr

power:
  name: pwrctrl
  host_clock: clk_ao
  host_reset: rst_ao_n
  test_enable: test_en
  domain:
    - name: ao
    - name: vdd_core
      depend: []
      pgood: pg_core
    - name: vdd_cpu
      depend:
        - {name: vdd_core, type: hard}
      follow:
        - {clock: cpu_clk, reset: cpu_dom_rst_n}
"#;

/// Create a new project directory `name` relative to the working directory.
pub fn run(name: &str) -> Result<()> {
    create_project(Path::new(name), name)
}

pub(crate) fn create_project(project_dir: &Path, name: &str) -> Result<()> {
    if project_dir.exists() {
        bail!("directory '{}' already exists", project_dir.display());
    }
    fs::create_dir_all(project_dir.join(DEFAULT_OUTPUT_DIR))
        .with_context(|| format!("creating {}", project_dir.display()))?;
    fs::write(project_dir.join(MANIFEST_FILE), CtrlgenManifest::template(name))
        .with_context(|| format!("writing {MANIFEST_FILE}"))?;
    fs::write(project_dir.join(SAMPLE_FILE), SAMPLE)
        .with_context(|| format!("writing {SAMPLE_FILE}"))?;
    fs::write(project_dir.join(".gitignore"), format!("{DEFAULT_OUTPUT_DIR}/\n"))
        .context("writing .gitignore")?;

    println!("Created project '{name}'");
    println!("  {name}/{MANIFEST_FILE}");
    println!("  {name}/{SAMPLE_FILE}");
    println!("  {name}/{DEFAULT_OUTPUT_DIR}/");
    Ok(())
}

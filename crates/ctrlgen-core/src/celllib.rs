//! Shared cell-library files.
//!
//! Each generator owns a catalogue of template cells written to a single
//! file in the project output directory (`clock_cell.v`, `reset_cell.v`,
//! `power_cell.v`). The file is shared by every controller in a project, so
//! updates are read-modify-write under one process-wide lock.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;

use crate::error::{GenError, Result};

static CELL_FILE_LOCK: Mutex<()> = Mutex::new(());

/// One template cell: its module name and complete definition text.
#[derive(Debug, Clone)]
pub struct CellDef {
    pub name: &'static str,
    pub body: String,
}

/// An ordered catalogue of cells belonging to one library file.
#[derive(Debug, Clone)]
pub struct CellCatalog {
    file_name: &'static str,
    brief: &'static str,
    cells: Vec<CellDef>,
}

impl CellCatalog {
    pub fn new(file_name: &'static str, brief: &'static str) -> Self {
        CellCatalog {
            file_name,
            brief,
            cells: Vec::new(),
        }
    }

    pub fn with_cell(mut self, name: &'static str, body: impl Into<String>) -> Self {
        self.cells.push(CellDef {
            name,
            body: body.into(),
        });
        self
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    pub fn cells(&self) -> &[CellDef] {
        &self.cells
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.cells.iter().map(|c| c.name).collect()
    }

    /// Complete file contents: banner, timescale and every cell.
    pub fn render(&self) -> String {
        let mut out = format!(
            "/**\n * @file {}\n * @brief {}\n *\n * @details Template cells generated by ctrlgen. Replace them with\n *          technology library cells for implementation.\n */\n\n`timescale 1ns / 1ps\n",
            self.file_name, self.brief
        );
        for cell in &self.cells {
            out.push('\n');
            out.push_str(cell.body.trim_end());
            out.push('\n');
        }
        out
    }

    /// Cells whose module is not defined in `content`.
    pub fn missing_in(&self, content: &str) -> Vec<&CellDef> {
        self.cells
            .iter()
            .filter(|c| !defines_module(content, c.name))
            .collect()
    }
}

/// How an existing library file is brought up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFilePolicy {
    /// Append only the cells the file lacks.
    AppendMissing,
    /// Rewrite the whole file if any cell is missing.
    RegenerateIfIncomplete,
    /// Rewrite the whole file on every call.
    AlwaysRegenerate,
}

/// What a library update did to the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellFileOutcome {
    Created,
    Appended(Vec<String>),
    Regenerated,
    UpToDate,
}

/// Whether `content` contains a definition of module `name`.
///
/// Matches `module <name>` followed by a non-identifier character so that
/// `qsoc_clk_div` is not satisfied by `qsoc_clk_div_auto`.
pub fn defines_module(content: &str, name: &str) -> bool {
    let needle = format!("module {name}");
    let mut from = 0;
    while let Some(pos) = content[from..].find(&needle) {
        let start = from + pos;
        let end = start + needle.len();
        let boundary_before = content[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !is_ident_char(c));
        let boundary_after = content[end..]
            .chars()
            .next()
            .map_or(true, |c| !is_ident_char(c));
        if boundary_before && boundary_after {
            return true;
        }
        from = end;
    }
    false
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// A cell-library file in an output directory.
#[derive(Debug, Clone)]
pub struct CellLibrary {
    dir: PathBuf,
}

impl CellLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CellLibrary { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, catalog: &CellCatalog) -> PathBuf {
        self.dir.join(catalog.file_name())
    }

    /// Bring the catalogue's file up to date according to `policy`.
    pub fn update(
        &self,
        catalog: &CellCatalog,
        policy: CellFilePolicy,
        force_overwrite: bool,
    ) -> Result<CellFileOutcome> {
        let _guard = CELL_FILE_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let path = self.path_for(catalog);
        fs::create_dir_all(&self.dir).map_err(|e| cell_error(&self.dir, e))?;

        if !path.is_file() {
            write_file(&path, &catalog.render())?;
            log::info!("created cell library {}", path.display());
            return Ok(CellFileOutcome::Created);
        }
        if force_overwrite || policy == CellFilePolicy::AlwaysRegenerate {
            write_file(&path, &catalog.render())?;
            log::info!("regenerated cell library {}", path.display());
            return Ok(CellFileOutcome::Regenerated);
        }

        let content = fs::read_to_string(&path).map_err(|e| cell_error(&path, e))?;
        let missing = catalog.missing_in(&content);
        if missing.is_empty() {
            log::debug!("cell library {} is complete", path.display());
            return Ok(CellFileOutcome::UpToDate);
        }

        match policy {
            CellFilePolicy::AppendMissing => {
                let mut updated = content;
                if !updated.ends_with('\n') {
                    updated.push('\n');
                }
                for cell in &missing {
                    updated.push('\n');
                    updated.push_str(cell.body.trim_end());
                    updated.push('\n');
                }
                write_file(&path, &updated)?;
                let names: Vec<String> = missing.iter().map(|c| c.name.to_string()).collect();
                log::info!(
                    "appended {} cell(s) to {}: {}",
                    names.len(),
                    path.display(),
                    names.join(", ")
                );
                Ok(CellFileOutcome::Appended(names))
            }
            CellFilePolicy::RegenerateIfIncomplete | CellFilePolicy::AlwaysRegenerate => {
                write_file(&path, &catalog.render())?;
                log::info!("regenerated incomplete cell library {}", path.display());
                Ok(CellFileOutcome::Regenerated)
            }
        }
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| cell_error(path, e))
}

fn cell_error(path: &Path, e: std::io::Error) -> GenError {
    GenError::CellFile {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CellCatalog {
        CellCatalog::new("demo_cell.v", "Demo cells")
            .with_cell("cell_a", "module cell_a (input wire a);\nendmodule\n")
            .with_cell("cell_a_auto", "module cell_a_auto (input wire a);\nendmodule\n")
    }

    #[test]
    fn defines_module_respects_identifier_boundary() {
        let text = "module cell_a_auto (\n);\nendmodule\n";
        assert!(defines_module(text, "cell_a_auto"));
        assert!(!defines_module(text, "cell_a"));
        assert!(defines_module("module cell_a #(", "cell_a"));
        assert!(!defines_module("endmodule cell_a", "cell_a"));
    }

    #[test]
    fn first_write_creates_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let lib = CellLibrary::new(dir.path().join("out"));
        let outcome = lib
            .update(&catalog(), CellFilePolicy::AppendMissing, false)
            .unwrap();
        assert_eq!(outcome, CellFileOutcome::Created);
        let text = fs::read_to_string(lib.path_for(&catalog())).unwrap();
        assert!(text.contains("`timescale 1ns / 1ps"));
        assert!(defines_module(&text, "cell_a"));
        assert!(defines_module(&text, "cell_a_auto"));
    }

    #[test]
    fn rerun_on_complete_file_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let lib = CellLibrary::new(dir.path());
        lib.update(&catalog(), CellFilePolicy::AppendMissing, false)
            .unwrap();
        let before = fs::read(lib.path_for(&catalog())).unwrap();
        for policy in [
            CellFilePolicy::AppendMissing,
            CellFilePolicy::RegenerateIfIncomplete,
        ] {
            let outcome = lib.update(&catalog(), policy, false).unwrap();
            assert_eq!(outcome, CellFileOutcome::UpToDate);
        }
        let after = fs::read(lib.path_for(&catalog())).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn append_adds_only_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let lib = CellLibrary::new(dir.path());
        let path = lib.path_for(&catalog());
        fs::write(&path, "// user edits kept\nmodule cell_a_auto (input wire a);\nendmodule").unwrap();

        let outcome = lib
            .update(&catalog(), CellFilePolicy::AppendMissing, false)
            .unwrap();
        assert_eq!(outcome, CellFileOutcome::Appended(vec!["cell_a".to_string()]));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("// user edits kept\n"));
        assert_eq!(text.matches("module cell_a_auto").count(), 1);
        assert!(defines_module(&text, "cell_a"));
    }

    #[test]
    fn regenerate_if_incomplete_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let lib = CellLibrary::new(dir.path());
        let path = lib.path_for(&catalog());
        fs::write(&path, "module cell_a (input wire a);\nendmodule\n").unwrap();
        let outcome = lib
            .update(&catalog(), CellFilePolicy::RegenerateIfIncomplete, false)
            .unwrap();
        assert_eq!(outcome, CellFileOutcome::Regenerated);
        assert_eq!(fs::read_to_string(&path).unwrap(), catalog().render());
    }

    #[test]
    fn force_overwrite_replaces_user_content() {
        let dir = tempfile::tempdir().unwrap();
        let lib = CellLibrary::new(dir.path());
        let path = lib.path_for(&catalog());
        fs::write(&path, "// custom\n").unwrap();
        let outcome = lib
            .update(&catalog(), CellFilePolicy::AppendMissing, true)
            .unwrap();
        assert_eq!(outcome, CellFileOutcome::Regenerated);
        assert_eq!(fs::read_to_string(&path).unwrap(), catalog().render());
    }

    #[test]
    fn always_regenerate_rewrites_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let lib = CellLibrary::new(dir.path());
        let path = lib.path_for(&catalog());
        let mut text = catalog().render();
        text.push_str("// trailing edit\n");
        fs::write(&path, &text).unwrap();
        let outcome = lib
            .update(&catalog(), CellFilePolicy::AlwaysRegenerate, false)
            .unwrap();
        assert_eq!(outcome, CellFileOutcome::Regenerated);
        assert_eq!(fs::read_to_string(&path).unwrap(), catalog().render());
    }
}

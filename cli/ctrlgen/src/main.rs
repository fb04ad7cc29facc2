//! ctrlgen CLI: generate clock, reset and power controllers from YAML.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use manifest::CtrlgenManifest;

#[derive(Parser)]
#[command(name = "ctrlgen", version, about = "Clock, reset and power controller generator")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project with a manifest and a sample description
    Init {
        /// Project name
        name: String,
    },
    /// Generate Verilog for every controller in a YAML file
    Generate {
        /// Input YAML file
        input: PathBuf,
        /// Output directory (default: [output] dir from ctrlgen.toml, else out)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Rewrite cell libraries instead of merging
        #[arg(long)]
        force: bool,
        /// Report format (human, json)
        #[arg(long)]
        report: Option<String>,
    },
    /// Write or refresh the clock, reset and power cell libraries
    Cells {
        /// Output directory (default: [output] dir from ctrlgen.toml, else out)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Rewrite cell libraries instead of merging
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { name } => commands::init::run(&name),

        Commands::Generate {
            input,
            output_dir,
            force,
            report,
        } => {
            let settings = resolve_output(&cwd, output_dir, force)?;
            commands::generate::run(&input, &settings, report.as_deref())
        }

        Commands::Cells { output_dir, force } => {
            let settings = resolve_output(&cwd, output_dir, force)?;
            commands::cells::run(&settings)
        }
    }
}

/// Where and how output is written, after merging flags over the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub force_overwrite: bool,
}

fn resolve_output(
    cwd: &Path,
    output_dir: Option<PathBuf>,
    force: bool,
) -> anyhow::Result<OutputSettings> {
    let found = CtrlgenManifest::find_and_load(cwd)?;
    Ok(merge_output(cwd, found.as_ref(), output_dir, force))
}

fn merge_output(
    cwd: &Path,
    found: Option<&(CtrlgenManifest, PathBuf)>,
    output_dir: Option<PathBuf>,
    force: bool,
) -> OutputSettings {
    match (output_dir, found) {
        (Some(dir), found) => OutputSettings {
            dir,
            force_overwrite: force || found.is_some_and(|(m, _)| m.output.force_overwrite),
        },
        (None, Some((manifest, project_dir))) => OutputSettings {
            dir: project_dir.join(&manifest.output.dir),
            force_overwrite: force || manifest.output.force_overwrite,
        },
        (None, None) => OutputSettings {
            dir: cwd.join(manifest::DEFAULT_OUTPUT_DIR),
            force_overwrite: force,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_overrides_manifest_directory() {
        let manifest = CtrlgenManifest::from_str(
            "[project]\nname = \"soc\"\n\n[output]\ndir = \"rtl\"\nforce_overwrite = true\n",
        )
        .unwrap();
        let found = (manifest, PathBuf::from("/work/soc"));

        let settings = merge_output(Path::new("/work/soc/sub"), Some(&found), None, false);
        assert_eq!(settings.dir, PathBuf::from("/work/soc/rtl"));
        assert!(settings.force_overwrite);

        let settings = merge_output(
            Path::new("/work/soc/sub"),
            Some(&found),
            Some(PathBuf::from("gen")),
            false,
        );
        assert_eq!(settings.dir, PathBuf::from("gen"));
        assert!(settings.force_overwrite);
    }

    #[test]
    fn no_manifest_defaults_to_out() {
        let settings = merge_output(Path::new("/tmp/x"), None, None, true);
        assert_eq!(settings.dir, PathBuf::from("/tmp/x/out"));
        assert!(settings.force_overwrite);
    }
}

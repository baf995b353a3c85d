//! Command-line and environment configuration for the `velox` driver.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Compile a velox source file into a native executable.
#[derive(Debug, Parser)]
#[command(name = "velox", version, about)]
pub struct Cli {
    /// Source file to compile.
    pub input: PathBuf,

    /// Executable to produce (defaults to the input file stem).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target the generated module is built for.
    #[arg(long, env = "VELOX_TARGET", value_enum, default_value_t = Target::Host)]
    pub target: Target,

    /// Directory receiving tokens.json, ast.json, ast.txt and output.ll.
    #[arg(long, env = "VELOX_ARTIFACTS_DIR", default_value = "artifacts")]
    pub artifacts_dir: PathBuf,

    /// Keep the artifacts directory after a successful build.
    #[arg(long)]
    pub preserve: bool,

    /// Stop after writing output.ll; no external tools are run.
    #[arg(long)]
    pub emit_ir: bool,

    /// LLVM static compiler used to assemble output.ll.
    #[arg(long, env = "VELOX_LLC")]
    pub llc: Option<PathBuf>,

    /// C compiler driver used to link the executable.
    #[arg(long, env = "VELOX_CC")]
    pub cc: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => {
                let stem = self
                    .input
                    .file_stem()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("a.out"));
                if cfg!(windows) {
                    stem.with_extension("exe")
                } else {
                    stem
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Host,
    Linux,
    Windows,
}

impl Target {
    pub fn triple(self) -> String {
        match self {
            Target::Linux => "x86_64-pc-linux-gnu".to_string(),
            Target::Windows => "x86_64-pc-windows-msvc".to_string(),
            Target::Host => host_triple(),
        }
    }
}

fn host_triple() -> String {
    let arch = std::env::consts::ARCH;
    if cfg!(target_os = "macos") {
        let arch = if arch == "aarch64" { "arm64" } else { arch };
        format!("{arch}-apple-darwin")
    } else if cfg!(target_os = "windows") {
        format!("{arch}-pc-windows-msvc")
    } else {
        format!("{arch}-pc-linux-gnu")
    }
}

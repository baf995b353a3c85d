//! External LLVM tools: `llc` turns `output.ll` into assembly and a C compiler
//! driver links it against the C runtime (which provides `printf`).

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, info};

const LLC_CANDIDATES: &[&str] = &["llc", "llc-18", "llc-17", "llc-16", "llc-15", "llc-14"];
const CC_CANDIDATES: &[&str] = &["clang", "cc", "gcc"];

pub struct Toolchain {
    llc: PathBuf,
    cc: PathBuf,
}

impl Toolchain {
    /// Use the given tools, or search `PATH` for the first available candidate.
    pub fn discover(llc: Option<PathBuf>, cc: Option<PathBuf>) -> Result<Self> {
        let llc = match llc {
            Some(path) => path,
            None => find_first(LLC_CANDIDATES)?,
        };
        let cc = match cc {
            Some(path) => path,
            None => find_first(CC_CANDIDATES)?,
        };
        debug!(llc = %llc.display(), cc = %cc.display(), "using toolchain");
        Ok(Self { llc, cc })
    }

    pub fn assemble(&self, ir: &Path, asm: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.llc);
        cmd.arg(ir).arg("-o").arg(asm);
        run(cmd, "llc")
    }

    pub fn link(&self, asm: &Path, exe: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.cc);
        cmd.arg(asm).arg("-o").arg(exe);
        if cfg!(target_os = "linux") {
            cmd.arg("-no-pie");
        }
        run(cmd, "link")?;
        info!(exe = %exe.display(), "linked executable");
        Ok(())
    }
}

fn find_first(candidates: &[&str]) -> Result<PathBuf> {
    candidates
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| anyhow!("none of {} found on PATH", candidates.join(", ")))
}

fn run(mut cmd: Command, step: &str) -> Result<()> {
    debug!(command = ?cmd, "running {step}");
    let output = cmd
        .output()
        .with_context(|| format!("failed to start {}", cmd.get_program().to_string_lossy()))?;
    if !output.status.success() {
        bail!(
            "{step} failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

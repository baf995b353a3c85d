use std::fs;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser as _;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use velox::{
    artifacts::ArtifactDir, codegen, config::Cli, parser, toolchain::Toolchain, tokenize,
    CompileError,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let artifacts = ArtifactDir::prepare(&cli.artifacts_dir)?;
    let report = |err: CompileError| diagnostic(&source, cli, err);

    let tokens = tokenize(&source).map_err(report)?;
    artifacts.write_json("tokens.json", &tokens)?;

    let program = parser::parse(tokens).map_err(report)?;
    artifacts.write_json("ast.json", &program)?;
    artifacts.write_text("ast.txt", &program.to_tree().to_indented_string())?;

    let triple = cli.target.triple();
    let module = codegen::lower(&program, Some(&triple)).map_err(report)?;
    module
        .verify()
        .map_err(|err| anyhow!("generated module is malformed: {err}"))?;
    let ir_path = artifacts.write_text("output.ll", &module.to_string())?;
    info!(path = %ir_path.display(), %triple, "wrote LLVM IR");

    if cli.emit_ir {
        return Ok(());
    }

    let toolchain = Toolchain::discover(cli.llc.clone(), cli.cc.clone())?;
    let asm_path = artifacts.path("output.s");
    toolchain.assemble(&ir_path, &asm_path)?;
    let exe = cli.output_path();
    toolchain.link(&asm_path, &exe)?;

    if !cli.preserve {
        artifacts.cleanup()?;
    }
    println!("Built {}", exe.display());
    Ok(())
}

/// Print the caret diagnostic and turn it into the driver's error.
fn diagnostic(source: &str, cli: &Cli, err: CompileError) -> anyhow::Error {
    eprintln!("{}", err.render(source));
    anyhow!("{} error in {}", err.category(), cli.input.display())
}

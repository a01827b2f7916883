use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use kiln_vm::{Debugger, LineTable, Vm, loader, signals};

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Kiln bytecode VM - interpreter, JIT, and debugger")]
struct Cli {
    /// Bytecode image to execute
    image: PathBuf,
    /// Compile the whole image to native code and run it
    #[arg(long)]
    jit: bool,
    /// Run under the interactive debugger (loads the .dbg sidecar)
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Read RUST_LOG for filtering, defaulting to info.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let image = loader::load_image(&cli.image)
        .with_context(|| format!("failed to load {}", cli.image.display()))?;

    if cli.jit {
        return run_jit(&image);
    }
    run_interpreter(image, cli)
}

fn run_jit(image: &[u8]) -> Result<ExitCode> {
    log::info!("running with JIT");
    let program = kiln_jit::compile(image).context("JIT compilation failed")?;
    let result = program.run();
    println!("JIT Result: {result}");
    Ok(ExitCode::SUCCESS)
}

fn run_interpreter(image: Vec<u8>, cli: &Cli) -> Result<ExitCode> {
    if let Err(err) = signals::install() {
        log::warn!("introspection signals unavailable: {err}");
    }

    let mut vm = Vm::new(image);
    if cli.debug {
        eprintln!("VM running in debug mode. Type 'help' for commands.");
        let mut debugger = Debugger::new();
        if let Some(table) = LineTable::load_for_image(&cli.image) {
            log::info!("loaded debug info ({} entries)", table.len());
            debugger = debugger.with_line_table(table);
        }
        // Start paused before the first instruction.
        debugger.set_step_mode(true);
        vm = vm.with_debugger(debugger);
    }

    match vm.run() {
        Ok(_) => {
            match vm.top_of_stack() {
                Some(value) => println!("Top of stack: {value}"),
                None => println!("Stack empty"),
            }
            let stats = vm.gc_stats();
            if stats.runs > 0 {
                eprintln!(
                    "[GC Stats] Runs: {}, Freed: {}, Total GC Time: {:.6}s, Max Heap: {} words",
                    stats.runs,
                    stats.freed_objects,
                    stats.total_pause.as_secs_f64(),
                    stats.max_heap_used,
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            // Under the debugger the fault was already reported at the
            // terminal stop.
            if !cli.debug {
                eprintln!("Runtime Error: {err}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

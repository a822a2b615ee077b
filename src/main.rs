use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use sap3::machine::Machine;
use sap3::processor::Processor;
use sap3::program::Program;

/// A SAP-3 style 8-bit CPU simulator.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// `.asm` program to assemble and run
    program: PathBuf,

    /// Trace every executed instruction
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init().unwrap(); // logging

    let program = Program::from_file(&args.program)
        .wrap_err_with(|| format!("failed to read {}", args.program.display()))?;

    let processor = Processor::new(program);
    let mut machine = Machine::default();
    let fault = processor.execute_until_halt(&mut machine);

    // the final snapshot is reported even after a fault
    print!("{}", machine);

    if let Some(fault) = fault {
        return Err(fault.into());
    }
    Ok(())
}

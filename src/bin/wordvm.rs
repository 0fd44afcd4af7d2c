//! `wordvm`: assemble source into an image, or run an image. §6/§7.

use std::fs;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use wordvm::assembler;
use wordvm::host::StdIoHost;
use wordvm::interpreter::{Interpreter, InterpreterConfig};
use wordvm::memory::DEFAULT_CAPACITY;
use wordvm::VmError;

#[derive(Parser)]
#[command(name = "wordvm", about = "Assembler and interpreter for a small stack-plus-register VM")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Raise log verbosity: -v for info, -vv for debug.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a source file into a binary image.
    Assemble {
        src: String,
        image: String,
    },
    /// Run a binary image.
    Run {
        image: String,
        #[arg(long, default_value_t = DEFAULT_CAPACITY)]
        cache_capacity: usize,
        #[arg(long, default_value_t = 4096)]
        ram_words: usize,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new().filter_level(level).init();
}

fn run(cli: Cli) -> Result<(), VmError> {
    match cli.command {
        Command::Assemble { src, image } => {
            let source = fs::read_to_string(&src)?;
            let bytes = assembler::assemble(&source)?;
            fs::write(&image, bytes)?;
            Ok(())
        }
        Command::Run {
            image,
            cache_capacity,
            ram_words,
        } => {
            let bytes = fs::read(&image)?;
            let config = InterpreterConfig {
                ram_words,
                cache_capacity,
                ..InterpreterConfig::default()
            };
            let mut vm = Interpreter::load(bytes, StdIoHost::new(), config)?;
            vm.execute()?;
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

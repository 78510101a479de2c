// Licensed under the Apache-2.0 license

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use registers_compiler::tree::parse_int;
use simple_logger::SimpleLogger;
use std::path::PathBuf;

mod block;
mod load;
mod top;

#[derive(Parser, Debug)]
#[command(
    name = "regtool",
    author,
    version,
    about = "Compile register and address-map descriptions"
)]
struct Cli {
    /// Log more (repeat for trace output)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile one block description
    Block {
        /// Hjson register description
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Parameter overrides, e.g. "NumAlerts=3;Depth=0x10"
        #[arg(short = 'p', long = "param", value_name = "NAME=VALUE;...")]
        params: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = BlockFormat::Json)]
        format: BlockFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Assemble a top-level address map
    Top {
        /// Hjson top-level description
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Block descriptions the top level instantiates
        #[arg(short, long = "block", value_name = "FILE")]
        blocks: Vec<PathBuf>,

        /// Directory the address map and rendered artifacts are written to
        #[arg(long, value_name = "DIR", default_value = ".")]
        outdir: PathBuf,

        /// Width of the address space in bits
        #[arg(long, default_value_t = 32)]
        addr_width: u32,

        /// Alignment for entities whose size is not a power of two
        #[arg(long, value_parser = parse_align, default_value = "0x1000")]
        min_align: u64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BlockFormat {
    /// The compiled address map as JSON
    Json,
    /// C header of register defines
    Cdefines,
    /// AsciiDoc register documentation
    Adoc,
}

fn parse_align(s: &str) -> Result<u64, String> {
    match parse_int(s) {
        Some(v) if v.is_power_of_two() => Ok(v),
        Some(v) => Err(format!("{v:#x} is not a power of two")),
        None => Err(format!("{s:?} is not an integer")),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.cmd {
        Commands::Block {
            input,
            params,
            format,
            output,
        } => block::generate(&input, params.as_deref(), format, output.as_deref()),
        Commands::Top {
            input,
            blocks,
            outdir,
            addr_width,
            min_align,
        } => top::generate(&input, &blocks, &outdir, addr_width, min_align),
    }
}

fn main() {
    let cli = Cli::parse();
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    let _ = SimpleLogger::new().with_level(level).init();

    if let Err(err) = run(cli) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

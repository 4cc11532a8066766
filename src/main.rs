use gramzip::cli;
use std::io::{self, BufWriter};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: gramzip [-h] [-c|-d] [-b SIZE]
   -h       Help: displays this help menu.
   -c       Compress: reads raw data from standard input and writes
            compressed blocks to standard output.
   -d       Decompress: reads compressed blocks from standard input and
            writes raw data to standard output.
   -b SIZE  Block size in KiB, 1-1024 (default 1024). Only valid with -c.";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().collect();
    let options = match cli::validate_args(&argv) {
        Ok(options) => options,
        Err(_) => {
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    if options & cli::OPT_HELP != 0 {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());

    let result = if options & cli::OPT_COMPRESS != 0 {
        gramzip::compress(stdin, stdout, cli::block_kib(options))
    } else {
        gramzip::decompress(stdin, stdout)
    };

    match result {
        Ok(bytes) => {
            debug!(bytes, "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("gramzip: {err:#}");
            ExitCode::FAILURE
        }
    }
}

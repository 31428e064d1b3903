use std::process::ExitCode;

use clap::Parser;
use zika_sim::runner::{run, Args};

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("zika-sim: {error}");
            ExitCode::FAILURE
        }
    }
}

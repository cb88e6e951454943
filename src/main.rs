use clap::Parser;
use sigfolio::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}

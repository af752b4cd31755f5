use clap::Parser;
use rew_core::cli::{self, Cli};
use rew_core::logging;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_format, cli.verbose);
    let code = cli::run(&cli);
    std::process::exit(code.as_i32());
}

use clap::Parser;
use env_logger::Env;
use log::error;
use batch_extract::cli::args::Cli;
use batch_extract::cli::CliProcessor;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let processor = CliProcessor::new(cli.timeout);

    if let Err(e) = processor.process_command(cli.command) {
        error!("{}", e);
        std::process::exit(1);
    }
}

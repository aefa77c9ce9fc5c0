use clap::Parser;

use warc2zim_rs::cli::Cli;
use warc2zim_rs::config::Config;
use warc2zim_rs::driver::Converter;
use warc2zim_rs::ConverterError;

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let now = chrono::Local::now();
    let exit_code = match Config::from_cli(cli, now).and_then(|config| Converter::new(config).run()) {
        Ok(()) => 0,
        Err(e @ ConverterError::InputNotFound(_)) => {
            log::error!("{e}");
            100
        }
        Err(e) => {
            log::error!("{e}");
            1
        }
    };
    std::process::exit(exit_code);
}

//! Binary entrypoint for the script plugin.

use std::io::{self, BufReader, Write};
use std::process::ExitCode;

use clap::Parser;
use script_plugin_template::{ServeConfig, run};

fn main() -> ExitCode {
    let config = ServeConfig::parse();

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    match run(&config, &mut reader, &mut writer) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            writeln!(io::stderr().lock(), "{error}").ok();
            ExitCode::FAILURE
        }
    }
}

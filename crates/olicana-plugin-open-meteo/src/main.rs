//! Binary entrypoint for the Open-Meteo plugin.

use std::fmt::Display;
use std::io::{self, BufReader, Write};
use std::process::ExitCode;

use olicana_config::{Config, OrthoConfig as _, telemetry};

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(error) => return fail(&error),
    };
    if let Err(error) = telemetry::initialise(&config) {
        return fail(&error);
    }

    let stdin = io::stdin();
    let reader = BufReader::new(stdin.lock());
    let writer = io::stdout().lock();
    match olicana_plugin_open_meteo::run(&config, reader, writer) {
        Ok(report) => {
            tracing::info!(turns = report.turns(), "host disconnected");
            ExitCode::SUCCESS
        }
        Err(error) => fail(&error),
    }
}

fn fail(error: &dyn Display) -> ExitCode {
    writeln!(io::stderr().lock(), "{error}").ok();
    ExitCode::FAILURE
}

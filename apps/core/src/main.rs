use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let options = nugetfind_core::runtime::CliOptions::parse();

    match nugetfind_core::runtime::run_with_options(options) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("[nugetfind] {error}");
            error.exit_code()
        }
    }
}

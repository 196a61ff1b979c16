/*
    leakroot  -  a memory leak root-cause analyzer
    Copyright (C) 2026  The leakroot Authors

    This program is free software: you can redistribute it and/or modify it
    under the terms of the GNU General Public License as published by the
    Free Software Foundation, either version 3 of the License, or (at your
    option) any later version.

    This program is distributed in the hope that it will be useful, but
    WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License
    for more details.

    You should have received a copy of the GNU General Public License along
    with this program. If not, see <https://www.gnu.org/licenses/>.
*/

mod commandline;
mod config;
mod llm;
mod memcheck;
mod pipeline;
mod renderer;

use commandline::{CommandLineArguments, Mode};
use std::process::ExitCode;

const EXIT_NO_LEAKS: u8 = 0;
const EXIT_LEAKS_FOUND: u8 = 1;
const EXIT_ANALYSIS_FAILURE: u8 = 2;
const EXIT_MISCONFIGURATION: u8 = 3;

fn main() -> ExitCode {
    let args = match CommandLineArguments::parse(&mut std::env::args()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("leakroot: {}", e);
            return ExitCode::from(EXIT_MISCONFIGURATION);
        }
    };

    match args.mode {
        Mode::ShowHelp => {
            commandline::show_help();
            ExitCode::from(EXIT_NO_LEAKS)
        }
        Mode::ReportVersion => {
            commandline::report_version();
            ExitCode::from(EXIT_NO_LEAKS)
        }
        Mode::Configure => match config::run_configure() {
            Ok(()) => ExitCode::from(EXIT_NO_LEAKS),
            Err(e) => {
                eprintln!("leakroot: {}", e);
                ExitCode::from(EXIT_MISCONFIGURATION)
            }
        },
        Mode::Analyze { executable, args: target_args } => run_analyze(&executable, &target_args, args.json, args.no_llm, args.verbose),
    }
}

fn run_analyze(executable: &str, target_args: &[String], json: bool, no_llm: bool, verbose: bool) -> ExitCode {
    let settings = match config::Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("leakroot: {}", e);
            return ExitCode::from(EXIT_MISCONFIGURATION);
        }
    };

    let outcome = match pipeline::run_analysis(executable, target_args, &settings, no_llm, verbose) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("leakroot: analysis failed: {}", e);
            return ExitCode::from(EXIT_ANALYSIS_FAILURE);
        }
    };

    if let Err(e) = pipeline::render_outcome(&outcome, json) {
        eprintln!("leakroot: could not render results: {}", e);
        return ExitCode::from(EXIT_ANALYSIS_FAILURE);
    }

    if outcome.diagnoses.is_empty() {
        if outcome.any_trace_failed {
            ExitCode::from(EXIT_ANALYSIS_FAILURE)
        } else {
            ExitCode::from(EXIT_NO_LEAKS)
        }
    } else {
        ExitCode::from(EXIT_LEAKS_FOUND)
    }
}

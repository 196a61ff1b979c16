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

use std::error::Error;

pub enum Mode {
    Configure,
    Analyze { executable: String, args: Vec<String> },
    ShowHelp,
    ReportVersion,
}

pub struct CommandLineArguments {
    pub mode: Mode,
    pub json: bool,
    pub no_llm: bool,
    pub verbose: bool,
}

pub fn show_help() {
    println!(
        "Usage: leakroot configure
       leakroot [OPTIONS] EXECUTABLE [ARGS...]

    --json          Print one diagnosis per line as JSON
    --no-llm        Skip the narrative explanation step
    -v, --verbose   Print progress to stderr as analysis proceeds
    -h, --help      Show this help text
    --version       Report version
"
    );
}

pub fn report_version() {
    println!("leakroot {}", env!("CARGO_PKG_VERSION"));
}

impl CommandLineArguments {
    pub fn parse(args: &mut dyn Iterator<Item = String>) -> Result<CommandLineArguments, Box<dyn Error>> {
        let mut json = false;
        let mut no_llm = false;
        let mut verbose = false;
        let mut show_help = false;
        let mut report_version = false;

        let mut positional: Vec<String> = Vec::new();
        let mut command_started = false;

        for token in args.skip(1) {
            let mut consumed_token = false;

            if !command_started {
                if token.chars().next() == Some('-') && token != "-" {
                    consumed_token = true;

                    if token.chars().nth(1) == Some('-') {
                        match token.as_str() {
                            "--help" => show_help = true,
                            "--version" => report_version = true,
                            "--json" => json = true,
                            "--no-llm" => no_llm = true,
                            "--verbose" => verbose = true,
                            _ => {
                                eprintln!("Unrecognized argument: {}", token);
                                show_help = true;
                            }
                        }
                    } else {
                        for flag_char in token.chars().skip(1) {
                            match flag_char {
                                'h' => show_help = true,
                                'v' => verbose = true,
                                _ => {
                                    eprintln!("Unrecognized flag: {}", flag_char);
                                    show_help = true;
                                }
                            }
                        }
                    }
                }
            }

            if !consumed_token {
                positional.push(token);
                command_started = true;
            }
        }

        let mode = if show_help {
            Mode::ShowHelp
        } else if report_version {
            Mode::ReportVersion
        } else if positional.first().map(String::as_str) == Some("configure") {
            Mode::Configure
        } else if let Some((executable, rest)) = positional.split_first() {
            Mode::Analyze {
                executable: executable.clone(),
                args: rest.to_vec(),
            }
        } else {
            Mode::ShowHelp
        };

        Ok(CommandLineArguments {
            mode,
            json,
            no_llm,
            verbose,
        })
    }
}

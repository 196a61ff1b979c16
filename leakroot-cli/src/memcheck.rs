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

// Spawns the external memory checker binary and captures its text report.
// The checker itself is an out-of-scope collaborator; this module only
// knows how to run it and hand its stderr text to the report parser.
use std::error::Error;
use std::process::Command;

const DEFAULT_CHECKER: &str = "valgrind";

pub fn run_checker(executable: &str, args: &[String]) -> Result<String, Box<dyn Error>> {
    let checker = std::env::var("LEAKROOT_MEMCHECK_BIN").unwrap_or_else(|_| DEFAULT_CHECKER.to_string());

    let output = Command::new(&checker)
        .arg("--leak-check=full")
        .arg("--show-leak-kinds=definite,indirect,possible")
        .arg(executable)
        .args(args)
        .output()
        .map_err(|e| format!("could not run memory checker `{}`: {}", checker, e))?;

    Ok(String::from_utf8_lossy(&output.stderr).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_checker_is_valgrind() {
        assert_eq!(DEFAULT_CHECKER, "valgrind");
    }
}

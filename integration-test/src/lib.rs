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
use std::process;

// One parsed `--json` diagnosis line from the `leakroot` binary under
// test. Kept as loosely-typed JSON rather than pulling in the engine
// crate, so this black-box test exercises only the process boundary.
#[derive(Clone, Debug)]
pub struct ReportedLeak {
    pub kind: String,
    pub file: String,
    pub line: u32,
    pub roots_at_leak: Vec<String>,
}

// Compile a C fixture under `tracee/`, using the compiler named by `CC`.
// Returns the path to the resulting binary, named after our PID so
// concurrent test runs do not collide.
pub fn compile_source(filename: &str) -> Result<String, Box<dyn Error>> {
    let source_path = format!("{}/{}", std::env::var("TEST_TRACEE_PATH")?, filename);
    let basename = filename.trim_end_matches(".c");
    let binary_path = format!("/tmp/{}-{}", basename, process::id());

    let mut command = process::Command::new(std::env::var("CC").unwrap_or_else(|_| "cc".to_string()));
    command.args(["-g", "-O0", &source_path, "-o", &binary_path]);

    let status = command.spawn()?.wait()?;
    assert_eq!(status.code(), Some(0));

    Ok(binary_path)
}

// Run the `leakroot` binary under test against a compiled fixture with
// `--json --no-llm`, and parse its stdout into ReportedLeak records.
pub fn run_leakroot(binary_path: &str) -> Result<Vec<ReportedLeak>, Box<dyn Error>> {
    let leakroot_bin = std::env::var("TEST_LEAKROOT_BIN")?;

    let output = process::Command::new(&leakroot_bin)
        .args(["--json", "--no-llm", binary_path])
        .output()?;

    let stdout = String::from_utf8(output.stdout)?;
    let mut leaks = Vec::new();
    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(line)?;
        leaks.push(ReportedLeak {
            kind: value["kind"].as_str().unwrap_or_default().to_string(),
            file: value["site"]["file"].as_str().unwrap_or_default().to_string(),
            line: value["witness_line"].as_u64().unwrap_or_default() as u32,
            roots_at_leak: value["roots_at_leak"]
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .map(|v| format!("{}{}", v["head"].as_str().unwrap_or_default(), segments_to_string(&v["segments"])))
                        .collect()
                })
                .unwrap_or_default(),
        });
    }

    Ok(leaks)
}

fn segments_to_string(segments: &serde_json::Value) -> String {
    let Some(array) = segments.as_array() else { return String::new() };
    let mut out = String::new();
    for segment in array {
        if let Some(field) = segment.get("Field").and_then(|v| v.as_str()) {
            out.push_str(&format!(".{}", field));
        } else if let Some(arrow) = segment.get("Arrow").and_then(|v| v.as_str()) {
            out.push_str(&format!("->{}", arrow));
        } else if let Some(index) = segment.get("Index").and_then(|v| v.as_str()) {
            out.push_str(&format!("[{}]", index));
        }
    }
    out
}

// Build a fixture and run the binary under test against it in one step.
pub fn build_and_analyze(source_filename: &str) -> Result<Vec<ReportedLeak>, Box<dyn Error>> {
    let binary_path = compile_source(source_filename)?;
    let result = run_leakroot(&binary_path);
    let _ = std::fs::remove_file(&binary_path);
    result
}

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

// Wires components (A)-(E) together against one executable run: parse the
// checker report, trace the program once, then run the ownership tracker
// and classifier independently per definitely-lost record.
use crate::config::Settings;
use crate::llm::{HttpLlmClient, OfflineLlmClient};
use crate::{memcheck, renderer};
use leakroot_engine::{
    classify, extract, parse_report, scan_functions, track, ExplainRequest, GdbSession, LeakDiagnosis, LeakRecord,
    LlmClient, SourceExcerpt, Tracer,
};
use std::error::Error;
use std::fs;

pub struct AnalysisOutcome {
    pub diagnoses: Vec<LeakDiagnosis>,
    pub any_trace_failed: bool,
}

pub fn run_analysis(
    executable: &str,
    args: &[String],
    settings: &Settings,
    no_llm: bool,
    verbose: bool,
) -> Result<AnalysisOutcome, Box<dyn Error>> {
    if verbose {
        eprintln!("leakroot: running memory checker against {}", executable);
    }
    let report_text = memcheck::run_checker(executable, args)?;
    let parsed = parse_report(&report_text)?;

    if verbose {
        eprintln!(
            "leakroot: {} definitely-lost record(s) to analyze ({} dropped for missing debug info)",
            parsed.definitely_lost.len(),
            parsed.dropped.len()
        );
    }

    let llm_client: Box<dyn LlmClient> = if no_llm {
        Box::new(OfflineLlmClient)
    } else {
        match &settings.api_key {
            Some(key) => Box::new(HttpLlmClient::new(key)),
            None => Box::new(OfflineLlmClient),
        }
    };

    let debugger_path = std::env::var("LEAKROOT_DEBUGGER_BIN").unwrap_or_else(|_| "gdb".to_string());
    let mut any_trace_failed = false;
    let mut diagnoses = Vec::new();

    let trace_result = GdbSession::spawn(&debugger_path, executable, args)
        .map(|session| Tracer::new(session, settings.max_trace_steps).trace_from_main());

    let exec_trace = match trace_result {
        Ok(Ok(trace)) => Some(trace),
        Ok(Err(e)) => {
            eprintln!("leakroot: tracing failed: {}", e);
            any_trace_failed = true;
            None
        }
        Err(e) => {
            eprintln!("leakroot: could not start debugger: {}", e);
            any_trace_failed = true;
            None
        }
    };

    if let Some(trace) = exec_trace {
        // The tracer itself is a singleton per executable run (one spawned
        // debugger, one full replay); everything downstream of the shared
        // trace is read-only and thread-safe, so each definitely-lost
        // record is analyzed on its own worker thread.
        let results: Vec<(usize, Result<LeakDiagnosis, Box<dyn Error + Send + Sync>>)> = std::thread::scope(|scope| {
            let handles: Vec<_> = parsed
                .definitely_lost
                .iter()
                .enumerate()
                .map(|(ix, record)| {
                    let trace = &trace;
                    let llm_client = &*llm_client;
                    let report_text = &report_text;
                    scope.spawn(move || {
                        let result = analyze_one_record(ix as u32 + 1, record, trace, llm_client, report_text, verbose);
                        (ix, result)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().expect("analysis thread panicked")).collect()
        });

        for (ix, result) in results {
            match result {
                Ok(diagnosis) => diagnoses.push(diagnosis),
                Err(e) => {
                    eprintln!("leakroot: record {} inconclusive: {}", ix + 1, e);
                    any_trace_failed = true;
                }
            }
        }
        diagnoses.sort_by_key(|d| d.leak_id);
    }

    Ok(AnalysisOutcome {
        diagnoses,
        any_trace_failed,
    })
}

fn analyze_one_record(
    leak_id: u32,
    record: &LeakRecord,
    trace: &leakroot_engine::ExecTrace,
    llm_client: &dyn LlmClient,
    checker_excerpt: &str,
    verbose: bool,
) -> Result<LeakDiagnosis, Box<dyn Error + Send + Sync>> {
    let innermost = record
        .alloc_stack
        .iter()
        .find(|f| f.has_debug_info() && f.function != "malloc" && f.function != "calloc" && f.function != "realloc")
        .ok_or("no debug info for allocation site")?;

    let cause = track(record, trace)?;
    let kind = classify(&cause)?;

    let mut diagnosis = LeakDiagnosis::from_root_cause(leak_id, record.total_bytes(), kind, &innermost.function, &cause);

    let mut source_excerpts = Vec::new();
    for frame in &record.alloc_stack {
        if !frame.has_debug_info() {
            continue;
        }
        if let Ok(text) = fs::read_to_string(&frame.file) {
            if let Some(line) = frame.line {
                if let Ok(view) = extract(&frame.file, &text, line) {
                    source_excerpts.push(SourceExcerpt { function: view });
                } else {
                    let _ = scan_functions(&frame.file, &text);
                }
            }
        }
    }

    let request = ExplainRequest {
        checker_excerpt: checker_excerpt.to_string(),
        source_excerpts,
        root_cause: cause,
    };

    match llm_client.explain(&request) {
        Ok(narrative) => diagnosis.narrative = Some(narrative),
        Err(e) => {
            if verbose {
                eprintln!("leakroot: narrative unavailable: {}", e);
            }
        }
    }

    Ok(diagnosis)
}

pub fn render_outcome(outcome: &AnalysisOutcome, json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        for diagnosis in &outcome.diagnoses {
            println!("{}", renderer::render_json(diagnosis)?);
        }
    } else {
        for diagnosis in &outcome.diagnoses {
            print!("{}", renderer::render_text(diagnosis));
        }
        let total_bytes: u64 = outcome.diagnoses.iter().map(|d| d.bytes).sum();
        print!("{}", renderer::render_summary(outcome.diagnoses.len(), total_bytes));
    }
    Ok(())
}

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

// Component C: drives a debugger session at line granularity and produces
// a flat ExecTrace that follows the program's actual path -- no unexplored
// branches. The stepping algorithm is written against the `DebuggerSession`
// trait so it can run against a scripted fake in tests as well as a real
// spawned debugger.
use crate::access_path::is_pure_access;
use crate::context::{scan_functions, FunctionView};
use crate::error::TraceError;
use crate::mi::{parse_line, MiRecord, MiValue};
use crate::trace::{ArgBinding, ExecTrace, TraceEvent, TraceEventKind};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

// One observed stop of the debugger: which line it is at, and whatever
// name/value pairs it cares to report (locals, the frame, and so on).
#[derive(Debug, Clone)]
pub struct Stop {
    pub function: String,
    pub file: String,
    pub line: u32,
    pub locals: HashMap<String, String>,
}

// Abstraction over "a thing that understands `run`/`step`/`next`/`finish`/
// `print`/`backtrace`/`info locals` and reports stops" -- a real spawned
// debugger, or a scripted sequence of stops for testing.
pub trait DebuggerSession {
    fn start(&mut self, breakpoint_function: &str) -> Result<Stop, TraceError>;
    fn step(&mut self) -> Result<Option<Stop>, TraceError>;
    fn finish(&mut self) -> Result<Option<Stop>, TraceError>;
    fn print(&mut self, expr: &str) -> Result<String, TraceError>;
}

// Known allocation and free entry points. Anything else encountered at a
// call site is treated as an opaque frame unless it is a recognized free
// wrapper (conservatively assumed to do nothing, per policy).
const ALLOC_FUNCTIONS: &[&str] = &["malloc", "calloc", "realloc"];
const FREE_FUNCTIONS: &[&str] = &["free"];

pub struct Tracer<S: DebuggerSession> {
    session: S,
    max_steps: u64,
    // Function names of the frames currently on the program's call stack,
    // innermost last, maintained independently of the debugger so a
    // transition's direction (call vs. return) can be told apart without
    // relying on GDB to report frame depth directly.
    call_stack: Vec<String>,
    file_cache: HashMap<String, String>,
}

impl<S: DebuggerSession> Tracer<S> {
    pub fn new(session: S, max_steps: u64) -> Tracer<S> {
        Tracer {
            session,
            max_steps,
            call_stack: Vec::new(),
            file_cache: HashMap::new(),
        }
    }

    // Trace from `main` until the process exits or the step budget is
    // exhausted. The returned events are already loop-grouped
    // (`group_loop_iterations`); nested frames are delimited by the
    // Enter/Return events the statement-level interpretation below
    // produces.
    pub fn trace_from_main(&mut self) -> Result<ExecTrace, TraceError> {
        let mut events = Vec::new();
        let mut steps = 0u64;

        let stop = self.session.start("main")?;
        self.call_stack = vec![stop.function.clone()];
        events.push(TraceEvent::new(
            stop.file.clone(),
            stop.line,
            TraceEventKind::Enter {
                function: stop.function.clone(),
                args: Vec::new(),
                alloc_tag: None,
                opaque: false,
            },
        ));

        let mut current = stop;
        loop {
            steps += 1;
            if steps > self.max_steps {
                return Err(TraceError::StepLimitExceeded(self.max_steps));
            }

            match self.session.step()? {
                Some(next) => {
                    if ALLOC_FUNCTIONS.contains(&next.function.as_str()) || FREE_FUNCTIONS.contains(&next.function.as_str()) {
                        // Allocation/free entry points are interpreted from
                        // the call site's own source line (below), not by
                        // descending into libc; skip over this stop without
                        // updating `current`, so the next recognized stop
                        // is still compared against the real caller frame.
                        continue;
                    }
                    events.extend(self.interpret_step(&current, &next));
                    current = next;
                }
                None => {
                    // Process exited. Whatever frame was still active dies
                    // with it; synthesize its return so the ownership
                    // tracker can judge anything still scoped to it instead
                    // of seeing a merely truncated trace.
                    if let Some(function) = self.call_stack.pop() {
                        events.push(TraceEvent::new(
                            current.file.clone(),
                            current.line,
                            TraceEventKind::Return {
                                function,
                                return_expr: None,
                                return_holder: None,
                            },
                        ));
                    }
                    break;
                }
            }
        }

        Ok(ExecTrace::new(group_loop_iterations(events)))
    }

    // Turn a transition between two consecutive, interpretable stops into
    // the TraceEvents it represents: a call descending into a new frame, a
    // return unwinding back to the caller, or (most commonly) a statement
    // that just executed within the same frame.
    fn interpret_step(&mut self, from: &Stop, to: &Stop) -> Vec<TraceEvent> {
        if to.function == from.function {
            let text = self.line_text(&from.file, from.line);
            return Self::event_for_statement(&from.file, from.line, &text).into_iter().collect();
        }

        let is_return = self.call_stack.len() >= 2 && self.call_stack[self.call_stack.len() - 2] == to.function;

        if is_return {
            self.call_stack.pop();
            let return_line = self.line_text(&from.file, from.line);
            let return_expr = parse_return_expr(&return_line);
            let resume_line = self.line_text(&to.file, to.line);
            let return_holder = return_holder_from_line(&resume_line, &from.function);
            vec![TraceEvent::new(
                from.file.clone(),
                from.line,
                TraceEventKind::Return {
                    function: from.function.clone(),
                    return_expr,
                    return_holder,
                },
            )]
        } else {
            self.call_stack.push(to.function.clone());
            let call_line = self.line_text(&from.file, from.line);
            let callee_view = self.find_callee_view(&to.function, &to.file);
            let args = resolve_args(&call_line, &to.function, callee_view.as_ref());
            let opaque = callee_view.is_none();
            vec![TraceEvent::new(
                to.file.clone(),
                to.line,
                TraceEventKind::Enter {
                    function: to.function.clone(),
                    args,
                    alloc_tag: None,
                    opaque,
                },
            )]
        }
    }

    fn read_file(&mut self, path: &str) -> String {
        if let Some(text) = self.file_cache.get(path) {
            return text.clone();
        }
        let text = std::fs::read_to_string(path).unwrap_or_default();
        self.file_cache.insert(path.to_string(), text.clone());
        text
    }

    fn line_text(&mut self, path: &str, line: u32) -> String {
        let text = self.read_file(path);
        text.lines().nth(line.saturating_sub(1) as usize).unwrap_or("").to_string()
    }

    fn find_callee_view(&mut self, callee: &str, callee_file: &str) -> Option<FunctionView> {
        let text = self.read_file(callee_file);
        if text.is_empty() {
            return None;
        }
        scan_functions(callee_file, &text)
            .into_iter()
            .find(|view| signature_function_name(&view.signature).as_deref() == Some(callee))
    }

    // Synthesize the statement-level events (Assign/Alias/Free/Cond) for a
    // single source line already known to belong to the current frame,
    // given its verbatim text. This is the bridge between the dynamic
    // tracer's structural stepping and the source-text interpretation the
    // ownership tracker actually consumes.
    pub fn event_for_statement(file: &str, line: u32, text: &str) -> Option<TraceEvent> {
        let trimmed = text.trim().trim_end_matches(';').trim();

        if let Some(rest) = trimmed.strip_prefix("free(") {
            let argument_expr = rest.trim_end_matches(')').trim().to_string();
            return Some(TraceEvent::new(file, line, TraceEventKind::Free { argument_expr }));
        }

        if let Some(eq_pos) = find_top_level_assign(trimmed) {
            let (lhs_raw, rhs_raw) = trimmed.split_at(eq_pos);
            let rhs = rhs_raw[1..].trim().to_string();
            let (lhs, is_declaration) = split_declaration(lhs_raw.trim());

            if is_declaration && is_pure_access(&rhs) {
                return Some(TraceEvent::new(file, line, TraceEventKind::Alias { lhs, rhs }));
            }
            return Some(TraceEvent::new(
                file,
                line,
                TraceEventKind::Assign {
                    lhs,
                    rhs,
                    is_declaration,
                },
            ));
        }

        None
    }
}

// Find the byte offset of a top-level `=` (not `==`, `!=`, `<=`, `>=`) in a
// statement, ignoring anything inside parentheses or brackets.
fn find_top_level_assign(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut ix = 0;
    while ix < bytes.len() {
        match bytes[ix] {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            b'=' if depth == 0 => {
                let prev = if ix > 0 { bytes[ix - 1] } else { 0 };
                let next = if ix + 1 < bytes.len() { bytes[ix + 1] } else { 0 };
                if next != b'=' && !matches!(prev, b'=' | b'!' | b'<' | b'>') {
                    return Some(ix);
                }
            }
            _ => {}
        }
        ix += 1;
    }
    None
}

// Split `int *p` into (`p`, true) and `p` into (`p`, false): a declaration
// carries a type before the variable name.
fn split_declaration(lhs: &str) -> (String, bool) {
    let lhs = lhs.trim_start_matches('*').trim();
    let mut words: Vec<&str> = lhs.split_whitespace().collect();
    if words.len() > 1 {
        let name = words.pop().unwrap().trim_start_matches('*').to_string();
        (name, true)
    } else {
        (lhs.trim_start_matches('*').to_string(), false)
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

// Does `text` contain a call to `name`, i.e. `name` as a whole identifier
// immediately followed by `(`?
fn calls_function(text: &str, name: &str) -> bool {
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(pos) = text.get(start..).and_then(|rest| rest.find(name)) {
        let abs = start + pos;
        let before_ok = abs == 0 || !is_ident_byte(bytes[abs - 1]);
        let after = abs + name.len();
        let after_ok = after < bytes.len() && bytes[after] == b'(';
        if before_ok && after_ok {
            return true;
        }
        start = abs + 1;
        if start >= text.len() {
            break;
        }
    }
    false
}

// Find a call to `callee` in `line` and split its argument list on
// top-level commas (depth tracking so nested calls/indexing aren't split).
fn call_site_args(line: &str, callee: &str) -> Option<Vec<String>> {
    let bytes = line.as_bytes();
    let mut start = 0;
    while let Some(pos) = line.get(start..).and_then(|rest| rest.find(callee)) {
        let abs = start + pos;
        let before_ok = abs == 0 || !is_ident_byte(bytes[abs - 1]);
        let after = abs + callee.len();
        if before_ok && after < bytes.len() && bytes[after] == b'(' {
            let open = after;
            let mut depth = 1i32;
            let mut end = open + 1;
            while end < bytes.len() && depth > 0 {
                match bytes[end] {
                    b'(' => depth += 1,
                    b')' => depth -= 1,
                    _ => {}
                }
                if depth > 0 {
                    end += 1;
                }
            }
            if end >= bytes.len() {
                return None;
            }
            return Some(split_top_level_commas(&line[open + 1..end]));
        }
        start = abs + 1;
        if start >= line.len() {
            break;
        }
    }
    None
}

fn split_top_level_commas(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    let bytes = text.as_bytes();
    for (ix, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            b',' if depth == 0 => {
                parts.push(text[start..ix].trim().to_string());
                start = ix + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim().to_string());
    parts
}

// Extract the declared function name from a signature string such as
// `"void *mk(int n)"`.
fn signature_function_name(signature: &str) -> Option<String> {
    let paren = signature.find('(')?;
    let name_part = signature[..paren].trim();
    let name = name_part.rsplit(|c: char| c.is_whitespace() || c == '*').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

// Extract parameter names from a signature string, dropping the types and
// any leading `*`/whitespace around each name. `(void)` yields no names.
fn parse_param_names(signature: &str) -> Vec<String> {
    let Some(open) = signature.find('(') else { return Vec::new() };
    let Some(close) = signature.rfind(')') else { return Vec::new() };
    if close <= open {
        return Vec::new();
    }
    let inner = &signature[open + 1..close];
    if inner.trim().is_empty() || inner.trim() == "void" {
        return Vec::new();
    }
    split_top_level_commas(inner)
        .into_iter()
        .filter_map(|param| {
            let name = param.rsplit(|c: char| c.is_whitespace() || c == '*').next()?;
            if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

// Bind each of the callee's parameter names to the textual expression
// passed for it at the call site, positionally. Extra call-site arguments
// beyond the parameters we could name (variadic calls, or a callee whose
// signature didn't parse) are dropped -- they bind to nothing the
// ownership tracker understands.
fn resolve_args(call_line: &str, callee: &str, callee_view: Option<&FunctionView>) -> Vec<ArgBinding> {
    let param_names = callee_view.map(|view| parse_param_names(&view.signature)).unwrap_or_default();
    if param_names.is_empty() {
        return Vec::new();
    }
    let call_exprs = call_site_args(call_line, callee).unwrap_or_default();
    param_names
        .into_iter()
        .enumerate()
        .map(|(ix, name)| ArgBinding { name, expr: call_exprs.get(ix).cloned() })
        .collect()
}

// `return expr;` -> Some("expr"); a bare `return;` or no return statement
// on this line yields None.
fn parse_return_expr(line: &str) -> Option<String> {
    let trimmed = line.trim().trim_end_matches(';').trim();
    let rest = trimmed.strip_prefix("return")?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

// If the call site we've resumed at immediately binds the just-returned
// call's result to something (`holder = callee(...);`), extract `holder`.
fn return_holder_from_line(line: &str, callee: &str) -> Option<String> {
    let trimmed = line.trim().trim_end_matches(';').trim();
    let eq_pos = find_top_level_assign(trimmed)?;
    let (lhs_raw, rhs_raw) = trimmed.split_at(eq_pos);
    let rhs = rhs_raw[1..].trim();
    if !calls_function(rhs, callee) {
        return None;
    }
    let (lhs, _is_declaration) = split_declaration(lhs_raw.trim());
    Some(lhs)
}

// Group a frame's flat event list into LoopIter events by detecting
// repeated runs of (file, line) sequences -- a pure post-processing pass,
// deliberately separate from live debugger stepping so it is testable
// without a real session.
pub fn group_loop_iterations(events: Vec<TraceEvent>) -> Vec<TraceEvent> {
    let mut out: Vec<TraceEvent> = Vec::new();
    let mut ix = 0;

    while ix < events.len() {
        if let Some((period, repeats)) = detect_repeat(&events, ix) {
            let mut body_events = Vec::new();
            for r in 0..repeats {
                let start = ix + r * period;
                body_events.push(TraceEvent::new(
                    events[start].file.clone(),
                    events[start].line,
                    TraceEventKind::LoopIter {
                        iteration_index: r as u32,
                        body_events: events[start..start + period].to_vec(),
                    },
                ));
            }
            out.extend(body_events);
            ix += period * repeats;
        } else {
            out.push(events[ix].clone());
            ix += 1;
        }
    }

    out
}

// Look for the shortest period >= 1 starting at `start` that repeats at
// least twice contiguously, by line-number signature (ignoring nested
// LoopIter contents, which are already grouped if present).
fn detect_repeat(events: &[TraceEvent], start: usize) -> Option<(usize, usize)> {
    let remaining = events.len() - start;
    for period in 1..=remaining / 2 {
        let mut repeats = 1;
        while start + (repeats + 1) * period <= events.len()
            && signature_matches(events, start + (repeats - 1) * period, start + repeats * period, period)
        {
            repeats += 1;
        }
        if repeats >= 2 {
            return Some((period, repeats));
        }
    }
    None
}

fn signature_matches(events: &[TraceEvent], a_start: usize, b_start: usize, period: usize) -> bool {
    for i in 0..period {
        if events[a_start + i].line != events[b_start + i].line || events[a_start + i].file != events[b_start + i].file {
            return false;
        }
    }
    true
}

// A real debugger session speaking MI over stdin/stdout of a spawned
// process, with line-granularity stepping.
pub struct GdbSession {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl GdbSession {
    pub fn spawn(debugger_path: &str, executable: &str, args: &[String]) -> Result<GdbSession, TraceError> {
        let mut command = Command::new(debugger_path);
        command
            .arg("--interpreter=mi2")
            .arg("--args")
            .arg(executable)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = command
            .spawn()
            .map_err(|e| TraceError::DebuggerUnavailable(e.to_string()))?;

        let stdin = child.stdin.take().ok_or_else(|| TraceError::Protocol("no stdin".to_string()))?;
        let stdout = child.stdout.take().ok_or_else(|| TraceError::Protocol("no stdout".to_string()))?;

        Ok(GdbSession {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn send(&mut self, command: &str) -> Result<(), TraceError> {
        writeln!(self.stdin, "{}", command).map_err(|e| TraceError::Protocol(e.to_string()))
    }

    fn read_until_stop(&mut self) -> Result<Option<Stop>, TraceError> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self
                .stdout
                .read_line(&mut line)
                .map_err(|e| TraceError::Protocol(e.to_string()))?;
            if n == 0 {
                return Ok(None);
            }

            match parse_line(&line) {
                MiRecord::Exec { class, results } if class == "stopped" => {
                    return Ok(stop_from_frame(&results));
                }
                MiRecord::Result { class, .. } if class == "error" => {
                    return Err(TraceError::Protocol(line.trim().to_string()));
                }
                _ => continue,
            }
        }
    }
}

fn stop_from_frame(results: &HashMap<String, MiValue>) -> Option<Stop> {
    let frame = results.get("frame")?.as_tuple()?;
    let function = frame.get("func")?.as_str()?.to_string();
    let file = frame
        .get("file")
        .and_then(MiValue::as_str)
        .unwrap_or("?")
        .to_string();
    let line: u32 = frame.get("line").and_then(MiValue::as_str).and_then(|s| s.parse().ok())?;

    Some(Stop {
        function,
        file,
        line,
        locals: HashMap::new(),
    })
}

impl DebuggerSession for GdbSession {
    fn start(&mut self, breakpoint_function: &str) -> Result<Stop, TraceError> {
        self.send(&format!("-break-insert {}", breakpoint_function))?;
        self.send("-exec-run")?;
        self.read_until_stop()?.ok_or(TraceError::SymbolsMissing)
    }

    fn step(&mut self) -> Result<Option<Stop>, TraceError> {
        self.send("-exec-step")?;
        self.read_until_stop()
    }

    fn finish(&mut self) -> Result<Option<Stop>, TraceError> {
        self.send("-exec-finish")?;
        self.read_until_stop()
    }

    fn print(&mut self, expr: &str) -> Result<String, TraceError> {
        self.send(&format!("-data-evaluate-expression \"{}\"", expr))?;
        let mut line = String::new();
        self.stdout
            .read_line(&mut line)
            .map_err(|e| TraceError::Protocol(e.to_string()))?;
        match parse_line(&line) {
            MiRecord::Result { results, .. } => Ok(results
                .get("value")
                .and_then(MiValue::as_str)
                .unwrap_or_default()
                .to_string()),
            _ => Err(TraceError::Protocol(line.trim().to_string())),
        }
    }
}

impl Drop for GdbSession {
    fn drop(&mut self) {
        // Cooperative cancellation: make sure the debugger process does not
        // linger past the tracer session that owns it.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_free_statement() {
        let event = Tracer::<FakeSession>::event_for_statement("leak.c", 12, "free(p);").unwrap();
        match event.kind {
            TraceEventKind::Free { argument_expr } => assert_eq!(argument_expr, "p"),
            _ => panic!("expected Free"),
        }
    }

    #[test]
    fn recognizes_declaration_alias() {
        let event = Tracer::<FakeSession>::event_for_statement("leak.c", 5, "void *q = p;").unwrap();
        match event.kind {
            TraceEventKind::Alias { lhs, rhs } => {
                assert_eq!(lhs, "q");
                assert_eq!(rhs, "p");
            }
            _ => panic!("expected Alias"),
        }
    }

    #[test]
    fn recognizes_declaration_with_call_as_assign() {
        let event = Tracer::<FakeSession>::event_for_statement("leak.c", 4, "void *p = malloc(64);").unwrap();
        match event.kind {
            TraceEventKind::Assign { lhs, rhs, is_declaration } => {
                assert_eq!(lhs, "p");
                assert_eq!(rhs, "malloc(64)");
                assert!(is_declaration);
            }
            _ => panic!("expected Assign"),
        }
    }

    #[test]
    fn recognizes_reassignment_as_assign_even_with_pure_rhs() {
        let event = Tracer::<FakeSession>::event_for_statement("leak.c", 6, "p = other;").unwrap();
        match event.kind {
            TraceEventKind::Assign { is_declaration, .. } => assert!(!is_declaration),
            _ => panic!("expected Assign"),
        }
    }

    #[test]
    fn groups_simple_loop_iterations() {
        let events = vec![
            TraceEvent::new("leak.c", 10, TraceEventKind::Cond { taken: true, text: "i < 3".to_string() }),
            TraceEvent::new(
                "leak.c",
                11,
                TraceEventKind::Assign {
                    lhs: "arr[i]".to_string(),
                    rhs: "malloc(8)".to_string(),
                    is_declaration: false,
                },
            ),
            TraceEvent::new("leak.c", 10, TraceEventKind::Cond { taken: true, text: "i < 3".to_string() }),
            TraceEvent::new(
                "leak.c",
                11,
                TraceEventKind::Assign {
                    lhs: "arr[i]".to_string(),
                    rhs: "malloc(8)".to_string(),
                    is_declaration: false,
                },
            ),
        ];
        let grouped = group_loop_iterations(events);
        assert_eq!(grouped.len(), 2);
        assert!(matches!(grouped[0].kind, TraceEventKind::LoopIter { .. }));
    }

    // A scripted DebuggerSession used only to fix the generic parameter of
    // `Tracer` in tests that never actually exercise the session.
    pub struct FakeSession;
    impl DebuggerSession for FakeSession {
        fn start(&mut self, _breakpoint_function: &str) -> Result<Stop, TraceError> {
            unimplemented!()
        }
        fn step(&mut self) -> Result<Option<Stop>, TraceError> {
            unimplemented!()
        }
        fn finish(&mut self) -> Result<Option<Stop>, TraceError> {
            unimplemented!()
        }
        fn print(&mut self, _expr: &str) -> Result<String, TraceError> {
            unimplemented!()
        }
    }
}

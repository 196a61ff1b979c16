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

//! The deterministic core of leakroot: given a memory checker's report, a
//! source tree, and a traced execution of the program, find the exact
//! event responsible for each definitely-lost allocation becoming
//! unreachable, and classify why.
//!
//! This crate performs no terminal rendering, no credential handling, and
//! no LLM calls of its own; it exposes the pieces `leakroot-cli` composes.

pub mod access_path;
pub mod classify;
pub mod context;
pub mod diagnosis;
pub mod error;
pub mod mi;
pub mod ownership;
pub mod report;
pub mod trace;
pub mod tracer;

pub use access_path::{AccessPath, Segment};
pub use classify::{classify, LeakKind};
pub use context::{extract, scan_functions, FunctionView};
pub use diagnosis::{ExplainRequest, LeakDiagnosis, LlmClient, Site, SourceExcerpt};
pub use ownership::{track, RootCause, WitnessEvent};
pub use report::{parse_report, Frame, LeakRecord, LossCategory, ParsedReport, ReportTotals};
pub use trace::{ArgBinding, ExecTrace, TraceEvent, TraceEventKind};
pub use tracer::{group_loop_iterations, DebuggerSession, GdbSession, Stop, Tracer};

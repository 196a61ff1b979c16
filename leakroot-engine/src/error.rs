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

use crate::classify::LeakKind;
use std::fmt;

// Failures from the report parser (component A).
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    // Reserved for report-level structural failures the parser cannot
    // recover from by skipping a block; a single unreadable loss-record
    // block is not fatal (see `parse_report`), so this is not currently
    // constructed there.
    #[error("malformed checker report: {0}")]
    Malformed(String),

    // The report contains no recognizable leak blocks at all.
    #[error("checker report is empty")]
    Empty,
}

// Failures from the context extractor (component B).
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("could not isolate the function enclosing the requested line")]
    Unresolved,
}

// Failures from the dynamic tracer (component C).
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("debugger binary unavailable: {0}")]
    DebuggerUnavailable(String),

    #[error("symbols missing for traced executable")]
    SymbolsMissing,

    #[error("step limit of {0} exceeded")]
    StepLimitExceeded(u64),

    #[error("debugger protocol error: {0}")]
    Protocol(String),
}

// Reasons the ownership tracker could not reach exactly one RootCause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TrackerInconclusive {
    // The allocation's own enclosing context could not be established.
    NoDebugInfo,

    // The trace ran out before the allocation became unreachable.
    TraceTruncated,

    // An opaque frame's black-box behavior was load-bearing for the
    // outcome and could not be resolved conservatively.
    OpaqueCritical,

    // A `free` resolved directly to the tracked allocation, contradicting
    // the checker's "definitely lost" classification for this record.
    ReasonMismatch,
}

impl fmt::Display for TrackerInconclusive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TrackerInconclusive::NoDebugInfo => "no debug info for allocation site",
            TrackerInconclusive::TraceTruncated => "trace truncated before allocation was lost",
            TrackerInconclusive::OpaqueCritical => "opaque frame was load-bearing for the outcome",
            TrackerInconclusive::ReasonMismatch => "allocation was freed, contradicting the report",
        };
        write!(f, "{}", text)
    }
}

// The classifier found the tracker's RootCause inconsistent with its own
// postcondition check for the claimed LeakKind.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("classifier postcondition failed for {0:?}")]
pub struct ClassifierMismatch(pub LeakKind);

// Failure from the external LLM narrative collaborator. The structural
// diagnosis is still printed when this occurs; only the narrative is
// omitted.
#[derive(Debug, thiserror::Error)]
pub enum LlmClientError {
    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM client is offline or disabled")]
    Offline,

    #[error("LLM request failed: {0}")]
    Transport(String),
}

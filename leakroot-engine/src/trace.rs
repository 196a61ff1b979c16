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

// The linear execution trace the dynamic tracer produces and the ownership
// tracker consumes. Rooted at `main`, one event per observed step; no
// unexplored branches are recorded.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgBinding {
    pub name: String,
    // The textual expression bound to this parameter at the call site, if
    // it was recoverable from source; None for frames entered with no
    // caller context (e.g. the trace root).
    pub expr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceEventKind {
    // A function was entered. `alloc_tag` is set when this call is to
    // `malloc`/`calloc`/`realloc` and the debugger observed the returned
    // address, tagging the allocation this frame produced.
    Enter {
        function: String,
        args: Vec<ArgBinding>,
        alloc_tag: Option<u64>,
        opaque: bool,
    },

    // A function returned. `return_holder` is the access path the return
    // value was immediately bound to at the call site, if any.
    Return {
        function: String,
        return_expr: Option<String>,
        return_holder: Option<String>,
    },

    // `lhs = rhs;` or a declaration `T lhs = rhs;`. Overwrites whatever
    // `lhs` previously held.
    Assign {
        lhs: String,
        rhs: String,
        is_declaration: bool,
    },

    // A declaration whose right-hand side is a pure variable/field/index
    // access -- a subset of Assign that does not create a new root, only
    // an additional name for an existing one.
    Alias { lhs: String, rhs: String },

    // `free(argument_expr);` or a recognized wrapper around it.
    Free { argument_expr: String },

    // A branch was observed taken or not taken.
    Cond { taken: bool, text: String },

    // One iteration of a loop body, with its own nested flat event list
    // before grouping.
    LoopIter {
        iteration_index: u32,
        body_events: Vec<TraceEvent>,
    },

    // The named bindings died as their enclosing scope unwound.
    ScopeExit { bindings_dying: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub file: String,
    pub line: u32,
    pub kind: TraceEventKind,
}

impl TraceEvent {
    pub fn new(file: impl Into<String>, line: u32, kind: TraceEventKind) -> TraceEvent {
        TraceEvent {
            file: file.into(),
            line,
            kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecTrace {
    pub events: Vec<TraceEvent>,
}

impl ExecTrace {
    pub fn new(events: Vec<TraceEvent>) -> ExecTrace {
        ExecTrace { events }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TraceEvent> {
        self.events.iter()
    }
}

impl<'a> IntoIterator for &'a ExecTrace {
    type Item = &'a TraceEvent;
    type IntoIter = std::slice::Iter<'a, TraceEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

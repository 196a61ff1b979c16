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

// Component D: the heart. Consumes an ExecTrace in order for a single
// tracked allocation, maintaining the set of live access paths that would
// currently dereference to it, and finds the exact event that makes the
// allocation unreachable while still unfreed.
use crate::access_path::AccessPath;
use crate::classify::LeakKind;
use crate::error::TrackerInconclusive;
use crate::report::LeakRecord;
use crate::trace::{ArgBinding, ExecTrace, TraceEvent, TraceEventKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootOrigin {
    Allocation,
    Alias,
}

// Frames are identified by an id unique to each Enter, not by function name:
// real C reuses local variable names (`p`, `tmp`, `i`) across unrelated
// frames, and a name-only scope would let a ScopeExit or Return belonging to
// one frame sever or keep alive a root that actually belongs to another.
type FrameId = u64;

#[derive(Debug, Clone)]
struct Root {
    path: AccessPath,
    #[allow(dead_code)]
    origin: RootOrigin,
    scope: FrameId,
    // Set when this root was bound to a parameter of an opaque frame (one
    // whose source could not be resolved): its fate inside that frame is
    // unknown, so if it is still the only thing keeping the allocation
    // reachable when the trace runs out, that is not a plain truncation.
    via_opaque: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WitnessEvent {
    ScopeExit { function: String },
    Reassigned { path: AccessPath, line: u32 },
    ContainerFreed { container: AccessPath, line: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootCause {
    pub file: String,
    pub line: u32,
    pub kind: LeakKind,
    pub last_roots_at_leak: Vec<AccessPath>,
    pub witness_event: WitnessEvent,
}

const ALLOC_PREFIXES: &[&str] = &["malloc(", "calloc(", "realloc("];
const ALLOC_FUNCTION_NAMES: &[&str] = &["malloc", "calloc", "realloc"];

fn alloc_call(rhs: &str) -> Option<&'static str> {
    ALLOC_PREFIXES.iter().find(|p| rhs.starts_with(*p)).copied()
}

fn first_call_arg(rhs: &str, prefix: &str) -> Option<String> {
    let inner = rhs.strip_prefix(prefix)?;
    let end = inner.find(')')?;
    let args = &inner[..end];
    let first = args.split(',').next()?.trim();
    Some(first.to_string())
}

// Recursively unroll LoopIter events into a flat replay sequence, in the
// order they actually executed.
fn flatten<'a>(events: &'a [TraceEvent], out: &mut Vec<&'a TraceEvent>) {
    for event in events {
        match &event.kind {
            TraceEventKind::LoopIter { body_events, .. } => flatten(body_events, out),
            _ => out.push(event),
        }
    }
}

struct Tracker {
    roots: Vec<Root>,
    freed: bool,
    // (function name, frame id) per active call, innermost last.
    frame_stack: Vec<(String, FrameId)>,
    next_frame_id: FrameId,
}

impl Tracker {
    fn new() -> Tracker {
        Tracker {
            roots: Vec::new(),
            freed: false,
            frame_stack: Vec::new(),
            next_frame_id: 0,
        }
    }

    fn current_function(&self) -> String {
        self.frame_stack.last().map(|(f, _)| f.clone()).unwrap_or_else(|| "?".to_string())
    }

    fn current_frame_id(&self) -> FrameId {
        self.frame_stack.last().map(|(_, id)| *id).unwrap_or(0)
    }

    // Push a new frame for `function`, then bind a root for every parameter
    // whose caller-side expression is itself a live root's path (§4.D):
    // passing a tracked pointer into a callee as a plain argument keeps it
    // reachable through that callee's parameter name for the life of the
    // new frame.
    fn enter_frame(&mut self, function: &str, args: &[ArgBinding], opaque: bool) {
        let frame_id = self.next_frame_id;
        self.next_frame_id += 1;
        self.frame_stack.push((function.to_string(), frame_id));

        for binding in args {
            let Some(expr) = binding.expr.as_ref() else { continue };
            let Some(expr_path) = AccessPath::parse(expr) else { continue };
            if self.roots_with_path(&expr_path).is_empty() {
                continue;
            }
            self.roots.push(Root {
                path: AccessPath::new(&binding.name),
                origin: RootOrigin::Alias,
                scope: frame_id,
                via_opaque: opaque,
            });
        }
    }

    fn roots_with_path(&self, path: &AccessPath) -> Vec<usize> {
        self.roots
            .iter()
            .enumerate()
            .filter(|(_, r)| &r.path == path)
            .map(|(ix, _)| ix)
            .collect()
    }

    fn remaining_paths(&self) -> Vec<AccessPath> {
        self.roots.iter().map(|r| r.path.clone()).collect()
    }
}

// Run the ownership tracker over `trace` for the single allocation
// identified by `record`. The trace is expected to begin at or before the
// allocation's own creation point; events before creation are skipped.
pub fn track(record: &LeakRecord, trace: &ExecTrace) -> Result<RootCause, TrackerInconclusive> {
    // The allocation site in user code: the first frame above the
    // allocator entry point itself (`malloc`/`calloc`/`realloc`).
    let innermost = record
        .alloc_stack
        .iter()
        .find(|f| !ALLOC_FUNCTION_NAMES.contains(&f.function.as_str()))
        .filter(|f| f.has_debug_info())
        .ok_or(TrackerInconclusive::NoDebugInfo)?;

    let mut flat = Vec::new();
    flatten(&trace.events, &mut flat);

    let mut tracker = Tracker::new();
    let mut ix = 0;

    // Replay Enter/Return events before the allocation's creation so the
    // frame stack (and hence `scope`) is correct once we find it.
    let mut created = false;
    while ix < flat.len() {
        let event = flat[ix];
        match &event.kind {
            TraceEventKind::Enter { function, args, opaque } => {
                tracker.enter_frame(function, args, *opaque);
            }
            TraceEventKind::Return { .. } => {
                tracker.frame_stack.pop();
            }
            TraceEventKind::Assign { lhs, rhs, .. } | TraceEventKind::Alias { lhs, rhs, .. } => {
                if alloc_call(rhs).is_some() {
                    let Some(path) = AccessPath::parse(lhs) else {
                        return Err(TrackerInconclusive::NoDebugInfo);
                    };
                    tracker.roots.push(Root {
                        path,
                        origin: RootOrigin::Allocation,
                        scope: tracker.current_frame_id(),
                        via_opaque: false,
                    });
                    created = true;
                    ix += 1;
                    break;
                }
            }
            _ => {}
        }
        ix += 1;
    }

    if !created {
        // The allocation's result was never bound to anything -- unassigned
        // result. Per the boundary rule this is a leak at the allocation
        // site itself, attributed to its enclosing function.
        return Ok(RootCause {
            file: innermost.file.clone(),
            line: innermost.line.unwrap_or(0),
            kind: LeakKind::MissingFree,
            last_roots_at_leak: Vec::new(),
            witness_event: WitnessEvent::ScopeExit {
                function: innermost.function.clone(),
            },
        });
    }

    while ix < flat.len() {
        let event = flat[ix];
        ix += 1;

        match &event.kind {
            TraceEventKind::Enter { function, args, opaque } => {
                tracker.enter_frame(function, args, *opaque);
            }

            TraceEventKind::Return {
                function,
                return_expr,
                return_holder,
            } => {
                let returning_frame_id = tracker.current_frame_id();

                // Only a root actually scoped to the frame that is
                // returning can be the one being handed back to the
                // caller -- a same-named root belonging to an unrelated
                // frame must not be rebound here.
                let keep_ix = return_expr.as_ref().and_then(|expr| AccessPath::parse(expr)).and_then(|expr_path| {
                    tracker
                        .roots
                        .iter()
                        .position(|r| r.path == expr_path && r.scope == returning_frame_id)
                });

                if tracker.frame_stack.last().map(|(f, _)| f.as_str()) == Some(function.as_str()) {
                    tracker.frame_stack.pop();
                }
                let caller_scope = tracker.current_frame_id();

                if let (Some(ix0), Some(holder)) = (keep_ix, return_holder.as_ref()) {
                    if let Some(holder_path) = AccessPath::parse(holder) {
                        tracker.roots[ix0].path = holder_path;
                        tracker.roots[ix0].scope = caller_scope;
                        tracker.roots[ix0].via_opaque = false;
                    }
                }

                // I4: every other root still scoped to the frame that just
                // returned dies now -- its head variable was local to that
                // frame and cannot be live any longer.
                let dying: Vec<usize> = tracker
                    .roots
                    .iter()
                    .enumerate()
                    .filter(|(ix, r)| r.scope == returning_frame_id && Some(*ix) != keep_ix)
                    .map(|(ix, _)| ix)
                    .collect();

                if !dying.is_empty() {
                    for &ix in dying.iter().rev() {
                        tracker.roots.remove(ix);
                    }

                    if tracker.roots.is_empty() && !tracker.freed {
                        return Ok(RootCause {
                            file: event.file.clone(),
                            line: event.line,
                            kind: LeakKind::MissingFree,
                            last_roots_at_leak: Vec::new(),
                            witness_event: WitnessEvent::ScopeExit { function: function.clone() },
                        });
                    }
                }
            }

            TraceEventKind::Assign { lhs, rhs, .. } => {
                // realloc is modeled as free-of-old-pointer followed by a
                // new allocation bound to `lhs`; if the freed pointer was
                // one of our roots, the checker's "definitely lost"
                // classification for this record is contradicted. Either
                // way, whatever `lhs` previously held is overwritten here,
                // same as any other reassignment (handled below) -- a
                // second, unrelated allocation landing in a tracked root's
                // slot is itself out of scope for this pass (non-goal:
                // >1 allocation).
                if let Some("realloc(") = alloc_call(rhs) {
                    if let Some(arg) = first_call_arg(rhs, "realloc(") {
                        if let Some(arg_path) = AccessPath::parse(&arg) {
                            if !tracker.roots_with_path(&arg_path).is_empty() {
                                return Err(TrackerInconclusive::ReasonMismatch);
                            }
                        }
                    }
                }

                let Some(lhs_path) = AccessPath::parse(lhs) else { continue };
                let matches = tracker.roots_with_path(&lhs_path);
                if matches.is_empty() {
                    continue;
                }

                for &m in matches.iter().rev() {
                    tracker.roots.remove(m);
                }

                if tracker.roots.is_empty() && !tracker.freed {
                    return Ok(RootCause {
                        file: event.file.clone(),
                        line: event.line,
                        kind: LeakKind::PathLossByReassignment,
                        last_roots_at_leak: Vec::new(),
                        witness_event: WitnessEvent::Reassigned {
                            path: lhs_path,
                            line: event.line,
                        },
                    });
                }
            }

            TraceEventKind::Alias { lhs, rhs } => {
                let Some(rhs_path) = AccessPath::parse(rhs) else { continue };
                if tracker.roots_with_path(&rhs_path).is_empty() {
                    continue;
                }
                let Some(lhs_path) = AccessPath::parse(lhs) else { continue };
                tracker.roots.push(Root {
                    path: lhs_path,
                    origin: RootOrigin::Alias,
                    scope: tracker.current_frame_id(),
                    via_opaque: false,
                });
            }

            TraceEventKind::Free { argument_expr } => {
                let Some(freed_path) = AccessPath::parse(argument_expr) else { continue };

                if !tracker.roots_with_path(&freed_path).is_empty() {
                    return Err(TrackerInconclusive::ReasonMismatch);
                }

                let severed: Vec<usize> = tracker
                    .roots
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| freed_path.is_strict_prefix_of(&r.path))
                    .map(|(ix, _)| ix)
                    .collect();

                if severed.is_empty() {
                    continue;
                }

                let surviving: Vec<AccessPath> = severed.iter().map(|&ix| tracker.roots[ix].path.clone()).collect();
                for &ix in severed.iter().rev() {
                    tracker.roots.remove(ix);
                }

                if tracker.roots.is_empty() && !tracker.freed {
                    return Ok(RootCause {
                        file: event.file.clone(),
                        line: event.line,
                        kind: LeakKind::ContainerFreedFirst,
                        last_roots_at_leak: surviving,
                        witness_event: WitnessEvent::ContainerFreed {
                            container: freed_path,
                            line: event.line,
                        },
                    });
                }
            }

            TraceEventKind::Cond { .. } => {}

            TraceEventKind::LoopIter { .. } => {
                // Already flattened; unreachable in the replay loop.
            }

            TraceEventKind::ScopeExit { bindings_dying } => {
                let current_frame_id = tracker.current_frame_id();
                let dying: Vec<usize> = tracker
                    .roots
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.scope == current_frame_id && bindings_dying.contains(&r.path.head))
                    .map(|(ix, _)| ix)
                    .collect();

                if dying.is_empty() {
                    continue;
                }

                let function = tracker.current_function();
                for &ix in dying.iter().rev() {
                    tracker.roots.remove(ix);
                }

                if tracker.roots.is_empty() && !tracker.freed {
                    return Ok(RootCause {
                        file: event.file.clone(),
                        line: event.line,
                        kind: LeakKind::MissingFree,
                        last_roots_at_leak: Vec::new(),
                        witness_event: WitnessEvent::ScopeExit { function },
                    });
                }
            }
        }
    }

    if tracker.freed {
        return Err(TrackerInconclusive::ReasonMismatch);
    }
    if tracker.roots.is_empty() {
        return Err(TrackerInconclusive::TraceTruncated);
    }

    // The trace ended with live roots remaining and the checker says the
    // allocation was definitely lost: the trace did not run far enough to
    // witness the event that severs the last root. If the only thing still
    // keeping it reachable was handed into an opaque frame, that frame's
    // black-box behavior -- not a short trace -- is what's unresolved.
    let _ = tracker.remaining_paths();
    if tracker.roots.iter().any(|r| r.via_opaque) {
        return Err(TrackerInconclusive::OpaqueCritical);
    }
    Err(TrackerInconclusive::TraceTruncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Frame, LossCategory};

    fn record_with_site(function: &str, file: &str, line: u32) -> LeakRecord {
        LeakRecord {
            bytes_direct: 64,
            bytes_indirect: 0,
            blocks: 1,
            loss_record_index: 1,
            loss_record_total: 1,
            category: LossCategory::Definitely,
            alloc_stack: vec![
                Frame {
                    function: "malloc".to_string(),
                    file: "vg_replace_malloc.c".to_string(),
                    line: Some(299),
                },
                Frame {
                    function: function.to_string(),
                    file: file.to_string(),
                    line: Some(line),
                },
            ],
        }
    }

    fn assign(file: &str, line: u32, lhs: &str, rhs: &str, is_declaration: bool) -> TraceEvent {
        TraceEvent::new(
            file,
            line,
            TraceEventKind::Assign {
                lhs: lhs.to_string(),
                rhs: rhs.to_string(),
                is_declaration,
            },
        )
    }

    fn enter(file: &str, line: u32, function: &str) -> TraceEvent {
        TraceEvent::new(
            file,
            line,
            TraceEventKind::Enter {
                function: function.to_string(),
                args: vec![],
                alloc_tag: None,
                opaque: false,
            },
        )
    }

    fn enter_with_args(file: &str, line: u32, function: &str, args: Vec<(&str, Option<&str>)>, opaque: bool) -> TraceEvent {
        TraceEvent::new(
            file,
            line,
            TraceEventKind::Enter {
                function: function.to_string(),
                args: args
                    .into_iter()
                    .map(|(name, expr)| ArgBinding { name: name.to_string(), expr: expr.map(str::to_string) })
                    .collect(),
                alloc_tag: None,
                opaque,
            },
        )
    }

    fn scope_exit(file: &str, line: u32, bindings: &[&str]) -> TraceEvent {
        TraceEvent::new(
            file,
            line,
            TraceEventKind::ScopeExit {
                bindings_dying: bindings.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    fn ret(file: &str, line: u32, function: &str, expr: Option<&str>, holder: Option<&str>) -> TraceEvent {
        TraceEvent::new(
            file,
            line,
            TraceEventKind::Return {
                function: function.to_string(),
                return_expr: expr.map(str::to_string),
                return_holder: holder.map(str::to_string),
            },
        )
    }

    // Scenario 1: scope leak in `init`.
    #[test]
    fn scenario_scope_leak() {
        let record = record_with_site("init", "leak.c", 4);
        let trace = ExecTrace::new(vec![
            enter("leak.c", 3, "init"),
            assign("leak.c", 4, "p", "malloc(64)", true),
            scope_exit("leak.c", 7, &["p"]),
            ret("leak.c", 7, "init", None, None),
        ]);
        let cause = track(&record, &trace).unwrap();
        assert_eq!(cause.kind, LeakKind::MissingFree);
        assert!(cause.last_roots_at_leak.is_empty());
        assert_eq!(cause.witness_event, WitnessEvent::ScopeExit { function: "init".to_string() });
    }

    // Scenario 2: pointer reuse -- `p = malloc(64);` then later `p =
    // malloc(128);` before the first block was ever freed.
    #[test]
    fn scenario_pointer_reuse() {
        let record = record_with_site("main", "leak.c", 4);
        let trace = ExecTrace::new(vec![
            enter("leak.c", 3, "main"),
            assign("leak.c", 4, "p", "malloc(64)", true),
            assign("leak.c", 6, "p", "malloc(128)", false),
        ]);
        let cause = track(&record, &trace).unwrap();
        assert_eq!(cause.kind, LeakKind::PathLossByReassignment);
        assert_eq!(cause.line, 6);
    }

    // Scenario 3: container freed first -- `free(q->k); free(q);` leaking
    // the still-embedded `q->v`.
    #[test]
    fn scenario_container_freed_first() {
        let record = record_with_site("main", "leak.c", 5);
        let trace = ExecTrace::new(vec![
            enter("leak.c", 3, "main"),
            assign("leak.c", 5, "q->v", "malloc(32)", false),
            TraceEvent::new("leak.c", 8, TraceEventKind::Free { argument_expr: "q->k".to_string() }),
            TraceEvent::new("leak.c", 9, TraceEventKind::Free { argument_expr: "q".to_string() }),
        ]);
        let cause = track(&record, &trace).unwrap();
        assert_eq!(cause.kind, LeakKind::ContainerFreedFirst);
        assert_eq!(cause.line, 9);
        assert_eq!(cause.last_roots_at_leak, vec![AccessPath::parse("q->v").unwrap()]);
    }

    // Scenario 4: array partial cleanup -- a loop frees arr[0..3] but
    // arr[4] was never freed.
    #[test]
    fn scenario_array_partial_cleanup() {
        let record = record_with_site("main", "leak.c", 12);
        let trace = ExecTrace::new(vec![
            enter("leak.c", 10, "main"),
            assign("leak.c", 12, "arr[4]", "malloc(8)", false),
            TraceEvent::new("leak.c", 16, TraceEventKind::Free { argument_expr: "arr[0]".to_string() }),
            TraceEvent::new("leak.c", 16, TraceEventKind::Free { argument_expr: "arr[1]".to_string() }),
            TraceEvent::new("leak.c", 16, TraceEventKind::Free { argument_expr: "arr[2]".to_string() }),
            TraceEvent::new("leak.c", 16, TraceEventKind::Free { argument_expr: "arr[3]".to_string() }),
            scope_exit("leak.c", 20, &["arr"]),
        ]);
        let cause = track(&record, &trace).unwrap();
        assert_eq!(cause.kind, LeakKind::MissingFree);
    }

    // Scenario 5: conditional not taken -- the free inside the untaken
    // branch leaves no trace event, so the root survives to scope exit.
    #[test]
    fn scenario_conditional_not_taken() {
        let record = record_with_site("main", "leak.c", 4);
        let trace = ExecTrace::new(vec![
            enter("leak.c", 3, "main"),
            assign("leak.c", 4, "p", "malloc(16)", true),
            TraceEvent::new("leak.c", 6, TraceEventKind::Cond { taken: false, text: "cond".to_string() }),
            scope_exit("leak.c", 10, &["p"]),
        ]);
        let cause = track(&record, &trace).unwrap();
        assert_eq!(cause.kind, LeakKind::MissingFree);
    }

    // Scenario 6: chained returns through level_5..level_1, finally stored
    // into `node->data` and never freed.
    #[test]
    fn scenario_chained_returns() {
        let record = record_with_site("level_5", "leak.c", 30);
        let trace = ExecTrace::new(vec![
            enter("leak.c", 29, "level_5"),
            assign("leak.c", 30, "data", "malloc(64)", true),
            ret("leak.c", 31, "level_5", Some("data"), Some("tmp4")),
            ret("leak.c", 35, "level_4", Some("tmp4"), Some("tmp3")),
            ret("leak.c", 39, "level_3", Some("tmp3"), Some("tmp2")),
            ret("leak.c", 43, "level_2", Some("tmp2"), Some("tmp1")),
            ret("leak.c", 47, "level_1", Some("tmp1"), Some("node->data")),
            scope_exit("leak.c", 50, &["node"]),
        ]);
        let cause = track(&record, &trace).unwrap();
        assert_eq!(cause.kind, LeakKind::MissingFree);
        assert!(cause.last_roots_at_leak.is_empty());
    }

    // I2: an allocation that never loses all its roots and is never freed
    // before the trace ends is reported as truncated, not silently
    // dropped.
    #[test]
    fn truncated_trace_is_inconclusive() {
        let record = record_with_site("main", "leak.c", 4);
        let trace = ExecTrace::new(vec![enter("leak.c", 3, "main"), assign("leak.c", 4, "p", "malloc(16)", true)]);
        assert_eq!(track(&record, &trace), Err(TrackerInconclusive::TraceTruncated));
    }

    // I3: a free matching the tracked allocation directly contradicts the
    // checker's "definitely lost" classification.
    #[test]
    fn explicit_free_is_reason_mismatch() {
        let record = record_with_site("main", "leak.c", 4);
        let trace = ExecTrace::new(vec![
            enter("leak.c", 3, "main"),
            assign("leak.c", 4, "p", "malloc(16)", true),
            TraceEvent::new("leak.c", 5, TraceEventKind::Free { argument_expr: "p".to_string() }),
        ]);
        assert_eq!(track(&record, &trace), Err(TrackerInconclusive::ReasonMismatch));
    }

    // I5: Alias does not remove the source root.
    #[test]
    fn alias_keeps_original_root_alive() {
        let record = record_with_site("main", "leak.c", 4);
        let trace = ExecTrace::new(vec![
            enter("leak.c", 3, "main"),
            assign("leak.c", 4, "p", "malloc(16)", true),
            TraceEvent::new(
                "leak.c",
                5,
                TraceEventKind::Alias { lhs: "q".to_string(), rhs: "p".to_string() },
            ),
            scope_exit("leak.c", 8, &["q"]),
        ]);
        // `q` dying leaves `p` still alive -- not yet a leak.
        assert_eq!(track(&record, &trace), Err(TrackerInconclusive::TraceTruncated));
    }

    // I4: a ScopeExit belonging to one frame must not sever a root that
    // merely happens to share a variable name with a local of that frame --
    // here `helper`'s own unrelated local `p` dies first, and only main's
    // own `p` going out of scope is the real leak.
    #[test]
    fn scope_exit_does_not_cross_unrelated_frames_with_colliding_names() {
        let record = record_with_site("main", "leak.c", 4);
        let trace = ExecTrace::new(vec![
            enter("leak.c", 3, "main"),
            assign("leak.c", 4, "p", "malloc(64)", true),
            enter("leak.c", 6, "helper"),
            scope_exit("leak.c", 8, &["p"]),
            ret("leak.c", 8, "helper", None, None),
            scope_exit("leak.c", 12, &["p"]),
        ]);
        let cause = track(&record, &trace).unwrap();
        assert_eq!(cause.kind, LeakKind::MissingFree);
        assert_eq!(cause.line, 12);
    }

    // §4.D: passing the tracked pointer into a helper as a plain argument
    // (not returning it) keeps it reachable through the parameter's name.
    // When that helper is opaque, its fate inside is unknown -- that is
    // `OpaqueCritical`, not a generic truncation.
    #[test]
    fn opaque_frame_receiving_tracked_pointer_is_load_bearing() {
        let record = record_with_site("main", "leak.c", 4);
        let trace = ExecTrace::new(vec![
            enter("leak.c", 3, "main"),
            assign("leak.c", 4, "p", "malloc(64)", true),
            enter_with_args("leak.c", 6, "mystery", vec![("q", Some("p"))], true),
        ]);
        assert_eq!(track(&record, &trace), Err(TrackerInconclusive::OpaqueCritical));
    }

    // Unassigned allocation result: the return value of malloc is discarded
    // entirely, so the leak is attributed to the allocation site itself.
    #[test]
    fn unassigned_allocation_result_leaks_at_alloc_site() {
        let record = record_with_site("main", "leak.c", 4);
        let trace = ExecTrace::new(vec![enter("leak.c", 3, "main")]);
        let cause = track(&record, &trace).unwrap();
        assert_eq!(cause.kind, LeakKind::MissingFree);
        assert_eq!(cause.file, "leak.c");
        assert_eq!(cause.line, 4);
    }
}

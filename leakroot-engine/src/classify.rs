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

// Component E: confirms the ownership tracker's RootCause against the
// postcondition for its claimed kind. Deliberately almost degenerate --
// this exists to catch tracker bugs, not to do independent reasoning.
use crate::error::ClassifierMismatch;
use crate::ownership::{RootCause, WitnessEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeakKind {
    // Never freed while any root existed; every root died by scope exit.
    MissingFree,

    // The last surviving root was destroyed by an assignment, overwrite,
    // or explicit NULL-out while the allocation remained unfreed.
    PathLossByReassignment,

    // The allocation was reachable only through a container field, and
    // the container was freed before the field itself.
    ContainerFreedFirst,
}

pub fn classify(cause: &RootCause) -> Result<LeakKind, ClassifierMismatch> {
    let kind = match &cause.witness_event {
        WitnessEvent::ScopeExit { .. } => LeakKind::MissingFree,
        WitnessEvent::Reassigned { .. } => LeakKind::PathLossByReassignment,
        WitnessEvent::ContainerFreed { .. } => LeakKind::ContainerFreedFirst,
    };

    if kind != cause.kind {
        return Err(ClassifierMismatch(cause.kind));
    }

    match &cause.witness_event {
        WitnessEvent::ScopeExit { .. } => {
            if !cause.last_roots_at_leak.is_empty() {
                return Err(ClassifierMismatch(kind));
            }
        }
        WitnessEvent::Reassigned { .. } => {
            // A reassignment witness must have left no live roots behind
            // either; the root it overwrote was the last one.
            if !cause.last_roots_at_leak.is_empty() {
                return Err(ClassifierMismatch(kind));
            }
        }
        WitnessEvent::ContainerFreed { container, .. } => {
            // Every surviving root must actually route through the freed
            // container, or the postcondition for this kind is violated.
            let routes_through_container = cause
                .last_roots_at_leak
                .iter()
                .all(|root| container.is_strict_prefix_of(root));
            if !routes_through_container {
                return Err(ClassifierMismatch(kind));
            }
        }
    }

    Ok(kind)
}

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

// The final, externally-facing shape of a single analyzed leak, and the
// interface by which an LLM narrative (produced entirely outside this
// crate) is attached to it without being interpreted here.
use crate::access_path::AccessPath;
use crate::classify::LeakKind;
use crate::context::FunctionView;
use crate::ownership::RootCause;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub file: String,
    pub function: String,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeakDiagnosis {
    pub leak_id: u32,
    pub bytes: u64,
    pub kind: LeakKind,
    pub site: Site,
    pub witness_line: u32,
    pub roots_at_leak: Vec<AccessPath>,

    // Filled in by the CLI after a successful LLM call; omitted entirely
    // (not merely null) when analysis ran offline or the call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

impl LeakDiagnosis {
    pub fn from_root_cause(leak_id: u32, bytes: u64, kind: LeakKind, function: &str, cause: &RootCause) -> LeakDiagnosis {
        LeakDiagnosis {
            leak_id,
            bytes,
            kind,
            site: Site {
                file: cause.file.clone(),
                function: function.to_string(),
                line: cause.line,
            },
            witness_line: cause.line,
            roots_at_leak: cause.last_roots_at_leak.clone(),
            narrative: None,
        }
    }
}

// One source excerpt handed to the LLM: the function enclosing one frame
// of the allocation's call stack, verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceExcerpt {
    pub function: FunctionView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainRequest {
    pub checker_excerpt: String,
    pub source_excerpts: Vec<SourceExcerpt>,
    pub root_cause: RootCause,
}

// Interface-only collaborator: the engine forwards whatever narrative
// comes back without consuming or validating it. The concrete HTTP-backed
// implementation, prompt template, and credential handling live in the
// CLI, which is outside this crate's scope.
pub trait LlmClient: Send + Sync {
    fn explain(&self, request: &ExplainRequest) -> Result<String, crate::error::LlmClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ownership::WitnessEvent;

    #[test]
    fn diagnosis_omits_narrative_when_none() {
        let cause = RootCause {
            file: "leak.c".to_string(),
            line: 10,
            kind: LeakKind::MissingFree,
            last_roots_at_leak: vec![],
            witness_event: WitnessEvent::ScopeExit { function: "init".to_string() },
        };
        let diagnosis = LeakDiagnosis::from_root_cause(1, 64, LeakKind::MissingFree, "init", &cause);
        let json = serde_json::to_string(&diagnosis).unwrap();
        assert!(!json.contains("narrative"));
    }
}

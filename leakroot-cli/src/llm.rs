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

// The concrete implementation of the LLM narrative collaborator. The
// engine only sees the `LlmClient` trait; this module owns the prompt
// template, the HTTP transport, and per-call timeouts.
use leakroot_engine::error::LlmClientError;
use leakroot_engine::{ExplainRequest, LlmClient};
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct HttpLlmClient {
    endpoint: String,
    api_key: String,
}

impl HttpLlmClient {
    pub fn new(api_key: &str) -> HttpLlmClient {
        HttpLlmClient {
            endpoint: "https://api.leakroot.dev/v1/explain".to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn build_prompt(request: &ExplainRequest) -> String {
        let mut prompt = String::new();
        prompt.push_str("You are helping a developer understand a memory leak.\n\n");
        prompt.push_str("Checker output:\n");
        prompt.push_str(&request.checker_excerpt);
        prompt.push_str("\n\nRelevant source:\n");
        for excerpt in &request.source_excerpts {
            prompt.push_str(&excerpt.function.signature);
            prompt.push('\n');
            for (line_no, text) in &excerpt.function.body_lines {
                prompt.push_str(&format!("{:>5} | {}\n", line_no, text));
            }
            prompt.push('\n');
        }
        prompt.push_str(&format!(
            "Root cause: {:?} at {}:{}\n",
            request.root_cause.kind, request.root_cause.file, request.root_cause.line
        ));
        prompt.push_str("Explain in two or three sentences why this allocation leaked.\n");
        prompt
    }
}

#[derive(Debug, Deserialize)]
struct ExplainResponse {
    narrative: String,
}

impl LlmClient for HttpLlmClient {
    fn explain(&self, request: &ExplainRequest) -> Result<String, LlmClientError> {
        let prompt = Self::build_prompt(request);

        let response = ureq::post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .send_json(ureq::json!({ "prompt": prompt }));

        match response {
            Ok(response) => response
                .into_json::<ExplainResponse>()
                .map(|body| body.narrative)
                .map_err(|e| LlmClientError::Transport(e.to_string())),
            Err(ureq::Error::Status(_, response)) => {
                Err(LlmClientError::Transport(response.status_text().to_string()))
            }
            Err(ureq::Error::Transport(transport)) => {
                if transport.kind() == ureq::ErrorKind::Io {
                    Err(LlmClientError::Transport(transport.to_string()))
                } else {
                    Err(LlmClientError::Timeout)
                }
            }
        }
    }
}

// A client that never calls out, used when `--no-llm` is passed or no API
// key is configured.
pub struct OfflineLlmClient;

impl LlmClient for OfflineLlmClient {
    fn explain(&self, _request: &ExplainRequest) -> Result<String, LlmClientError> {
        Err(LlmClientError::Offline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leakroot_engine::{FunctionView, RootCause, SourceExcerpt, WitnessEvent};

    #[test]
    fn offline_client_always_reports_offline() {
        let client = OfflineLlmClient;
        let request = ExplainRequest {
            checker_excerpt: String::new(),
            source_excerpts: vec![],
            root_cause: RootCause {
                file: "leak.c".to_string(),
                line: 1,
                kind: leakroot_engine::LeakKind::MissingFree,
                last_roots_at_leak: vec![],
                witness_event: WitnessEvent::ScopeExit { function: "main".to_string() },
            },
        };
        assert!(matches!(client.explain(&request), Err(LlmClientError::Offline)));
    }

    #[test]
    fn prompt_includes_function_signature_and_root_cause() {
        let request = ExplainRequest {
            checker_excerpt: "72 bytes definitely lost".to_string(),
            source_excerpts: vec![SourceExcerpt {
                function: FunctionView {
                    signature: "void *mk(int n)".to_string(),
                    file: "leak.c".to_string(),
                    start_line: 7,
                    end_line: 10,
                    body_lines: vec![(8, "void *p = malloc(n);".to_string())],
                },
            }],
            root_cause: RootCause {
                file: "leak.c".to_string(),
                line: 9,
                kind: leakroot_engine::LeakKind::MissingFree,
                last_roots_at_leak: vec![],
                witness_event: WitnessEvent::ScopeExit { function: "mk".to_string() },
            },
        };
        let prompt = HttpLlmClient::build_prompt(&request);
        assert!(prompt.contains("void *mk(int n)"));
        assert!(prompt.contains("MissingFree"));
    }
}

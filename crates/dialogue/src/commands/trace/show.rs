use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Local;
use dialogue_core::trace::{FileTraceStore, InteractionTrace, TraceStore};
use eyre::Result;

use super::super::Command;

pub struct ShowTraceCommand {
    pub output_path: PathBuf,
    pub run_name: String,
    pub id: String,
}

#[async_trait]
impl Command for ShowTraceCommand {
    async fn execute(&self) -> Result<()> {
        let trace = FileTraceStore::for_run(&self.output_path, &self.run_name)
            .load(&self.id)
            .await?;
        write!(std::io::stdout().lock(), "{}", render_trace(&trace))?;
        Ok(())
    }
}

/// Human-readable summary of a trace followed by its transcript.
pub fn render_trace(trace: &InteractionTrace) -> String {
    let mut out = String::new();
    out.push_str(&format!("Trace: {}\n", trace.id));
    out.push_str(&format!("Status: {}\n", trace.status()));
    out.push_str(&format!(
        "User: {}\n",
        trace.user_id.as_deref().unwrap_or("N/A")
    ));
    out.push_str(&format!(
        "Updated: {}\n",
        trace
            .updated_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("Prompt: {}\n", trace.instance.input));

    for (i, round) in trace.rounds.iter().enumerate() {
        out.push_str(&format!("--- round {} ---\n", i + 1));
        if let Some(input) = &round.user_input {
            out.push_str(&format!("User: {}\n", input.input));
        }
        match round
            .request_state
            .result
            .as_ref()
            .and_then(|result| result.first_completion())
        {
            Some(reply) => out.push_str(&format!("Bot: {}\n", reply.text.trim())),
            None => out.push_str("Bot: (no reply)\n"),
        }
    }

    if !trace.surveys.is_empty() {
        out.push_str(&format!("Surveys: {}\n", trace.surveys.len()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_core::api::{RequestResult, Sequence};
    use dialogue_core::test_utils::test_request;
    use dialogue_core::trace::{Instance, InteractionRound, RequestState, UserInput};

    #[test]
    fn renders_transcript_in_order() {
        let mut trace = InteractionTrace::with_id(
            "t-1",
            Instance {
                id: None,
                input: "We adopted a kitten.".to_string(),
            },
        );
        trace.user_id = Some("worker-2".to_string());
        trace.push_round(InteractionRound {
            user_input: None,
            request_state: RequestState {
                request: test_request("opening"),
                result: None,
            },
        });
        trace.push_round(InteractionRound {
            user_input: Some(UserInput {
                input: "She is tiny.".to_string(),
            }),
            request_state: RequestState {
                request: test_request("turn"),
                result: Some(RequestResult {
                    completions: vec![Sequence {
                        text: " Aww, what's her name?\n".to_string(),
                        logprob: 0.0,
                    }],
                    ..RequestResult::empty()
                }),
            },
        });

        let rendered = render_trace(&trace);

        assert!(rendered.starts_with("Trace: t-1\nStatus: awaiting_user_turn\nUser: worker-2\n"));
        assert!(rendered.contains("Prompt: We adopted a kitten.\n"));
        let opening = rendered.find("Bot: (no reply)").unwrap();
        let reply = rendered.find("Bot: Aww, what's her name?").unwrap();
        assert!(opening < reply);
        assert!(!rendered.contains("Surveys:"));
    }
}

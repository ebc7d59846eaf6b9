//! Turns a trace's history into the next model request.

use crate::api::Request;
use crate::run_spec::AdapterSpec;
use crate::trace::{InteractionTrace, RequestState, UserInput};

#[derive(Debug, Clone)]
pub struct DialogueAdapter {
    spec: AdapterSpec,
}

impl DialogueAdapter {
    pub fn new(spec: AdapterSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &AdapterSpec {
        &self.spec
    }

    /// Request for the opening round, before the user has said anything.
    pub fn opening_request(&self, trace: &InteractionTrace) -> RequestState {
        let mut prompt = self.preamble(trace);
        self.push_bot_cue(&mut prompt);
        self.request_state(prompt)
    }

    /// Request answering `user_input` given every answered round so far.
    pub fn turn_request(&self, trace: &InteractionTrace, user_input: &UserInput) -> RequestState {
        let mut prompt = self.preamble(trace);
        for round in &trace.rounds {
            if let Some(input) = &round.user_input {
                self.push_line(&mut prompt, &self.spec.user_name, &input.input);
            }
            if let Some(reply) = round
                .request_state
                .result
                .as_ref()
                .and_then(|result| result.first_completion())
            {
                self.push_line(&mut prompt, &self.spec.bot_name, reply.text.trim());
            }
        }
        self.push_line(&mut prompt, &self.spec.user_name, &user_input.input);
        self.push_bot_cue(&mut prompt);
        self.request_state(prompt)
    }

    fn preamble(&self, trace: &InteractionTrace) -> String {
        let mut prompt = String::new();
        if !self.spec.instructions.is_empty() {
            prompt.push_str(&self.spec.instructions);
            prompt.push('\n');
        }
        prompt.push_str(&self.spec.input_prefix);
        prompt.push_str(&trace.instance.input);
        prompt.push('\n');
        prompt
    }

    fn push_line(&self, prompt: &mut String, speaker: &str, text: &str) {
        prompt.push_str(speaker);
        prompt.push_str(": ");
        prompt.push_str(text);
        prompt.push('\n');
    }

    fn push_bot_cue(&self, prompt: &mut String) {
        prompt.push_str(&self.spec.bot_name);
        prompt.push(':');
    }

    fn request_state(&self, prompt: String) -> RequestState {
        RequestState {
            request: Request {
                model: self.spec.model.clone(),
                prompt,
                temperature: self.spec.temperature,
                num_completions: self.spec.num_outputs,
                max_tokens: self.spec.max_tokens,
                stop_sequences: self.spec.stop_sequences.clone(),
            },
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{RequestResult, Sequence};
    use crate::test_utils::test_adapter_spec;
    use crate::trace::{Instance, InteractionRound};

    fn trace() -> InteractionTrace {
        InteractionTrace::with_id(
            "t",
            Instance {
                id: None,
                input: "I showed a guy how to run a good bead in welding class.".to_string(),
            },
        )
    }

    fn answered(user: Option<&str>, reply: &str) -> InteractionRound {
        InteractionRound {
            user_input: user.map(|input| UserInput {
                input: input.to_string(),
            }),
            request_state: RequestState {
                request: crate::test_utils::test_request("earlier"),
                result: Some(RequestResult {
                    completions: vec![Sequence {
                        text: format!(" {reply}\n"),
                        logprob: 0.0,
                    }],
                    ..RequestResult::empty()
                }),
            },
        }
    }

    #[test]
    fn opening_prompt_cues_the_bot() {
        let adapter = DialogueAdapter::new(AdapterSpec {
            instructions: "Continue the conversation.".to_string(),
            ..test_adapter_spec()
        });
        let state = adapter.opening_request(&trace());

        assert_eq!(
            state.request.prompt,
            "Continue the conversation.\nI showed a guy how to run a good bead in welding class.\nBob:"
        );
        assert!(state.result.is_none());
    }

    #[test]
    fn turn_prompt_replays_history_in_order() {
        let adapter = DialogueAdapter::new(test_adapter_spec());
        let mut trace = trace();
        trace.rounds.push(answered(None, "Nice, was it hard?"));
        trace.rounds.push(answered(Some("A little."), "I bet he was grateful."));

        let state = adapter.turn_request(
            &trace,
            &UserInput {
                input: "He was!".to_string(),
            },
        );

        assert_eq!(
            state.request.prompt,
            "I showed a guy how to run a good bead in welding class.\n\
             Bob: Nice, was it hard?\n\
             Jen: A little.\n\
             Bob: I bet he was grateful.\n\
             Jen: He was!\n\
             Bob:"
        );
    }

    #[test]
    fn request_parameters_come_from_spec_unchanged() {
        let spec = AdapterSpec {
            temperature: 0.5,
            max_tokens: 64,
            num_outputs: 3,
            stop_sequences: vec!["Jen".to_string()],
            ..test_adapter_spec()
        };
        let adapter = DialogueAdapter::new(spec.clone());
        let request = adapter
            .turn_request(
                &trace(),
                &UserInput {
                    input: "hi".to_string(),
                },
            )
            .request;

        assert_eq!(request.model, spec.model);
        assert_eq!(request.temperature, 0.5);
        assert_eq!(request.max_tokens, 64);
        assert_eq!(request.num_completions, 3);
        assert_eq!(request.stop_sequences, vec!["Jen".to_string()]);
    }
}

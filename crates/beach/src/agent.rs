use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::adapters::DataSources;
use crate::compose::{finalize_reply, Composer, Route};
use crate::errors::AgentError;
use crate::intent::IntentClassifier;
use crate::memory::{ConversationMemory, DEFAULT_MAX_MESSAGES};
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall, ToolRequest};
use crate::prompt_template::{system_prompt, SystemInfo};
use crate::providers::base::{Completion, Provider};
use crate::systems::{BeachDataSystem, System};

pub const APOLOGY: &str =
    "I'm sorry, I encountered an error while processing your request. Please try again later.";
pub const NO_RESPONSE: &str = "I don't have a response for that.";

/// Example exchanges seeded after the system prompt to set tone and length.
const EXAMPLES: &[(&str, &str)] = &[
    (
        "What should I bring to the beach?",
        "Sunscreen, water, a towel and a hat are the essentials. If you plan to swim, check the surf report and stay near a lifeguard.",
    ),
    (
        "Is Clearwater Beach good for families?",
        "Yes. Clearwater Beach has calm, shallow water, soft white sand, lifeguards and plenty of nearby restaurants, which makes it a favorite for families.",
    ),
];

/// The reply to one message and the path that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub route: Route,
}

/// One conversation with the beach assistant.
///
/// Each incoming message is classified, answered from the data providers
/// when the intent calls for it, and otherwise handed to the language model
/// together with the tools of the attached systems. A turn must finish
/// before the next starts; callers sharing an agent serialise access.
pub struct BeachAgent {
    provider: Arc<dyn Provider>,
    composer: Composer,
    classifier: IntentClassifier,
    systems: Vec<Box<dyn System>>,
    memory: ConversationMemory,
}

impl BeachAgent {
    pub fn new(provider: Arc<dyn Provider>, sources: DataSources) -> Result<Self> {
        Self::with_capacity(provider, sources, DEFAULT_MAX_MESSAGES)
    }

    pub fn with_capacity(
        provider: Arc<dyn Provider>,
        sources: DataSources,
        capacity: usize,
    ) -> Result<Self> {
        let systems: Vec<Box<dyn System>> = vec![Box::new(BeachDataSystem::new(sources.clone()))];
        let seed = seed_messages(&systems)?;

        Ok(Self {
            provider,
            composer: Composer::new(sources),
            classifier: IntentClassifier::default(),
            systems,
            memory: ConversationMemory::new(capacity, seed),
        })
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Answer one user message. Never fails: errors become an apology.
    pub async fn process_message(&mut self, text: &str) -> String {
        self.process_turn(text).await.reply
    }

    pub async fn process_turn(&mut self, text: &str) -> TurnOutcome {
        self.memory.add(Message::user(text));

        match self.respond(text).await {
            Ok((route, raw)) => {
                let mut reply = finalize_reply(&raw);
                if reply.is_empty() {
                    reply = NO_RESPONSE.to_string();
                }
                self.memory.add(Message::assistant(reply.clone()));
                tracing::info!(?route, "answered message");
                TurnOutcome { reply, route }
            }
            Err(e) => {
                tracing::error!(error = ?e, "error processing message");
                TurnOutcome {
                    reply: APOLOGY.to_string(),
                    route: Route::Language,
                }
            }
        }
    }

    /// Reset the conversation to the system prompt and examples
    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }

    pub fn history(&self) -> Vec<Message> {
        self.memory.snapshot()
    }

    async fn respond(&mut self, text: &str) -> Result<(Route, String)> {
        let signals = self.classifier.classify(text);
        tracing::debug!(
            beach = ?signals.beach_name(),
            tide = signals.wants_tide,
            amenities = signals.wants_amenities,
            weather = signals.wants_weather,
            "classified message"
        );

        if let Some(composed) = self.composer.compose(&signals).await {
            return Ok((composed.route, composed.text));
        }

        let reply = self.language_reply(text).await?;
        Ok((Route::Language, reply))
    }

    async fn language_reply(&mut self, text: &str) -> Result<String> {
        let tools = self.prefixed_tools();

        let (completion, usage) = self.provider.complete(&self.model_context(text), &tools).await?;
        tracing::debug!(?usage, "language model replied");

        let requests = match completion {
            Completion::Text(text) => return Ok(non_empty(text)),
            Completion::ToolCalls(requests) => requests,
        };

        self.memory
            .add(Message::assistant("").with_tool_calls(requests.clone()));
        for request in &requests {
            if let Some(result) = self.run_tool(request).await {
                self.memory.add(result);
            }
        }

        // One tool round only; a second request for tools gets no answer
        let (completion, usage) = self.provider.complete(&self.model_context(text), &tools).await?;
        tracing::debug!(?usage, "language model replied after tools");

        Ok(completion
            .text()
            .map(str::to_string)
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }

    /// The memory as sent to the model, minus tool results whose request was
    /// evicted. The current question is put back when memory no longer holds it.
    fn model_context(&self, text: &str) -> Vec<Message> {
        let mut requested = HashSet::new();
        let mut context: Vec<Message> = self
            .memory
            .snapshot()
            .into_iter()
            .filter(|message| {
                requested.extend(message.tool_calls.iter().map(|r| r.id.clone()));
                message.role != Role::Tool
                    || message
                        .tool_call_id
                        .as_ref()
                        .is_some_and(|id| requested.contains(id))
            })
            .collect();

        if !context.iter().any(|message| message.role == Role::User) {
            context.insert(0, Message::user(text));
        }
        context
    }

    /// Get all tools from all systems with proper system prefixing
    fn prefixed_tools(&self) -> Vec<Tool> {
        self.systems
            .iter()
            .flat_map(|system| {
                system.tools().iter().map(move |tool| {
                    Tool::new(
                        format!("{}__{}", system.name(), tool.name),
                        &tool.description,
                        tool.parameters.clone(),
                    )
                })
            })
            .collect()
    }

    fn system_for_tool<'a>(&self, prefixed_name: &'a str) -> Option<(&dyn System, &'a str)> {
        let (system_name, tool_name) = prefixed_name.split_once("__")?;
        self.systems
            .iter()
            .find(|system| system.name() == system_name)
            .map(|system| (system.as_ref(), tool_name))
    }

    /// Execute one requested tool, producing the tool message that answers it.
    ///
    /// Unknown tools are answered with a not-found error. Malformed requests
    /// are answered when the conversation is sent to the model.
    async fn run_tool(&self, request: &ToolRequest) -> Option<Message> {
        let call = match &request.tool_call {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(id = %request.id, error = %e, "model sent an unusable tool request");
                return None;
            }
        };

        let Some((system, tool_name)) = self.system_for_tool(&call.name) else {
            tracing::warn!(tool = %call.name, "Unknown tool");
            let error = AgentError::ToolNotFound(call.name.clone());
            return Some(Message::tool(&call.name, &request.id, format!("Error: {}", error)));
        };

        let content = match system
            .call(ToolCall::new(tool_name, call.arguments.clone()))
            .await
        {
            Ok(value) => value.to_string(),
            Err(e) => {
                tracing::error!(tool = %call.name, error = %e, "tool call failed");
                format!("Error: {}", e)
            }
        };

        Some(Message::tool(&call.name, &request.id, content))
    }
}

fn non_empty(text: String) -> String {
    if text.trim().is_empty() {
        NO_RESPONSE.to_string()
    } else {
        text
    }
}

fn seed_messages(systems: &[Box<dyn System>]) -> Result<Vec<Message>> {
    let systems_info: Vec<SystemInfo> = systems
        .iter()
        .map(|system| SystemInfo::new(system.name(), system.description(), system.instructions()))
        .collect();
    let prompt = system_prompt(chrono::Utc::now().date_naive(), &systems_info)?;

    let mut seed = vec![Message::system(prompt)];
    for (question, answer) in EXAMPLES {
        seed.push(Message::user(*question));
        seed.push(Message::assistant(*answer));
    }
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::tides::{TideKind, TidePrediction};
    use crate::providers::mock::MockProvider;
    use crate::providers::utils::messages_to_openai_spec;
    use crate::testing::{MockPlaces, MockTides, MockWeather};
    use serde_json::{json, Value};

    const SEED_LEN: usize = 1 + 2 * EXAMPLES.len();

    fn sources() -> DataSources {
        DataSources::default()
            .with_tides(Arc::new(MockTides::with_predictions(vec![
                TidePrediction {
                    time: "2024-06-01 04:12".to_string(),
                    value: "2.61".to_string(),
                    kind: Some(TideKind::High),
                },
                TidePrediction {
                    time: "2024-06-01 10:40".to_string(),
                    value: "-0.12".to_string(),
                    kind: Some(TideKind::Low),
                },
            ])))
            .with_places(Arc::new(MockPlaces::with_names(&["Pier 60", "Palm Pavilion"])))
            .with_weather(Arc::new(MockWeather::sunny()))
    }

    fn agent(provider: Arc<MockProvider>) -> BeachAgent {
        BeachAgent::new(provider, sources()).unwrap()
    }

    fn tide_request(id: &str, beach: &str) -> ToolRequest {
        ToolRequest::new(
            id,
            Ok(ToolCall::new("beach__tide_predictions", json!({"beach": beach}))),
        )
    }

    #[tokio::test]
    async fn test_language_route_for_general_question() {
        let provider = Arc::new(MockProvider::text("there's no curfew at Venice Beach"));
        let mut agent = agent(provider.clone());

        let outcome = agent.process_turn("Is there a curfew at Venice Beach?").await;

        assert_eq!(outcome.route, Route::Language);
        assert_eq!(outcome.reply, "There's no curfew at Venice Beach.");

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        let (messages, tools) = &calls[0];
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages.last().unwrap().content, "Is there a curfew at Venice Beach?");
        assert!(tools.iter().any(|t| t.name == "beach__tide_predictions"));

        let history = agent.history();
        assert_eq!(history.len(), SEED_LEN + 2);
        assert_eq!(history.last().unwrap(), &Message::assistant("There's no curfew at Venice Beach."));
    }

    #[tokio::test]
    async fn test_provider_route_skips_language_model() {
        let provider = Arc::new(MockProvider::text("unused"));
        let mut agent = agent(provider.clone());

        let outcome = agent
            .process_turn("When is high tide at Clearwater Beach?")
            .await;

        assert_eq!(outcome.route, Route::Sections);
        assert!(outcome.reply.contains("NOAA"));
        assert!(outcome.reply.contains("High tide at 2024-06-01 04:12: 2.61 ft"));
        assert!(outcome.reply.ends_with('.'));
        assert!(provider.calls().is_empty());
        assert_eq!(agent.history().len(), SEED_LEN + 2);
    }

    #[tokio::test]
    async fn test_tool_round() {
        let provider = Arc::new(MockProvider::new(vec![
            Completion::ToolCalls(vec![
                tide_request("call_1", "Clearwater Beach"),
                ToolRequest::new("call_2", Ok(ToolCall::new("surf__report", json!({})))),
            ]),
            Completion::Text("high tide is at 4:12 am".to_string()),
        ]));
        let mut agent = agent(provider.clone());

        let reply = agent
            .process_message("Should I go surfing at Clearwater Beach in the morning?")
            .await;
        assert_eq!(reply, "High tide is at 4:12 am.");

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        let (second, _) = &calls[1];
        let n = second.len();
        assert_eq!(second[n - 3].role, Role::Assistant);
        assert_eq!(second[n - 3].tool_calls.len(), 2);

        let tide_result = &second[n - 2];
        assert_eq!(tide_result.role, Role::Tool);
        assert_eq!(tide_result.name.as_deref(), Some("beach__tide_predictions"));
        assert_eq!(tide_result.tool_call_id.as_deref(), Some("call_1"));
        assert!(tide_result.content.contains("8726724"));

        let unknown_result = &second[n - 1];
        assert_eq!(unknown_result.tool_call_id.as_deref(), Some("call_2"));
        assert_eq!(unknown_result.content, "Error: Tool not found: surf__report");

        // every requested call is answered on the wire
        let wire = messages_to_openai_spec(second);
        let requested: Vec<&Value> = wire
            .iter()
            .flat_map(|m| m["tool_calls"].as_array().into_iter().flatten())
            .map(|call| &call["id"])
            .collect();
        let answered: Vec<&Value> = wire
            .iter()
            .filter(|m| m["role"] == "tool")
            .map(|m| &m["tool_call_id"])
            .collect();
        assert_eq!(requested, answered);

        // user, assistant tool request, two tool results, final reply
        assert_eq!(agent.history().len(), SEED_LEN + 5);
    }

    #[tokio::test]
    async fn test_tool_error_is_returned_to_model() {
        let provider = Arc::new(MockProvider::new(vec![
            Completion::ToolCalls(vec![tide_request("call_1", "Miami Beach")]),
            Completion::Text("NOAA is not responding right now.".to_string()),
        ]));
        let sources = DataSources::default().with_tides(Arc::new(MockTides::failing(500)));
        let mut agent = BeachAgent::new(provider.clone(), sources).unwrap();

        let reply = agent.process_message("Can you check on Miami Beach for me?").await;
        assert_eq!(reply, "NOAA is not responding right now.");

        let (second, _) = &provider.calls()[1];
        assert_eq!(
            second.last().unwrap().content,
            "Error: Tool execution failed: Server error: 500"
        );
    }

    #[tokio::test]
    async fn test_provider_failure_apologises() {
        let provider = Arc::new(MockProvider::failing("connection refused"));
        let mut agent = agent(provider);

        let outcome = agent.process_turn("Tell me a beach joke").await;

        assert_eq!(outcome.reply, APOLOGY);
        let history = agent.history();
        assert_eq!(history.len(), SEED_LEN + 1);
        assert_eq!(history.last().unwrap(), &Message::user("Tell me a beach joke"));
    }

    #[tokio::test]
    async fn test_empty_replies() {
        let provider = Arc::new(MockProvider::new(vec![Completion::Text("   ".to_string())]));
        let mut quiet = agent(provider);
        assert_eq!(quiet.process_message("Hello").await, NO_RESPONSE);

        // a second round of tool requests is not honoured
        let provider = Arc::new(MockProvider::new(vec![
            Completion::ToolCalls(vec![tide_request("call_1", "Miami Beach")]),
            Completion::ToolCalls(vec![tide_request("call_2", "Miami Beach")]),
        ]));
        let mut looping = agent(provider.clone());
        assert_eq!(looping.process_message("Hello again").await, NO_RESPONSE);
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_transcript_is_trimmed() {
        let provider = Arc::new(MockProvider::text(
            "pack a windbreaker\nUser: thanks!\nAssistant: you're welcome",
        ));
        let mut agent = agent(provider);
        assert_eq!(agent.process_message("Any tips for a fall trip?").await, "Pack a windbreaker.");
    }

    #[test]
    fn test_clear_memory_restores_seed() {
        tokio_test::block_on(async {
            let provider = Arc::new(MockProvider::text("Hi there!"));
            let mut agent = agent(provider);
            let seed = agent.history();
            assert_eq!(seed.len(), SEED_LEN);
            assert_eq!(seed[1], Message::user(EXAMPLES[0].0));

            agent.process_message("Hello").await;
            assert_eq!(agent.history().len(), SEED_LEN + 2);

            agent.clear_memory();
            assert_eq!(agent.history(), seed);
        });
    }

    #[tokio::test]
    async fn test_orphaned_tool_results_not_sent() {
        let provider = Arc::new(MockProvider::new(vec![
            Completion::ToolCalls(vec![tide_request("call_1", "Miami Beach")]),
            Completion::Text("Done".to_string()),
        ]));
        let mut agent = BeachAgent::with_capacity(provider.clone(), sources(), 1).unwrap();

        agent.process_message("Hello").await;

        // the request was evicted, leaving only its result in memory
        let (second, _) = &provider.calls()[1];
        assert_eq!(second, &vec![Message::user("Hello")]);
    }

    #[tokio::test]
    async fn test_memory_stays_bounded() {
        let provider = Arc::new(MockProvider::text("unused"));
        let mut agent = BeachAgent::with_capacity(provider, sources(), 6).unwrap();

        for _ in 0..10 {
            agent.process_message("Where can I park near Miami Beach?").await;
        }
        let history = agent.history();
        assert_eq!(history.len(), 6);
        assert_eq!(history[0].role, Role::User);
    }
}

//! Chat over a previously generated dictionary.
//!
//! Each call rebuilds the whole session: a grounding instruction carrying the
//! dictionary, the caller's prior turns, then the new message. Nothing is kept
//! between calls.

use std::sync::Arc;

use crate::credentials::ApiKey;
use crate::error::RelayError;
use crate::gateway::{AiGateway, Content, GenerationRequest};
use crate::models::{ChatRequestContext, ChatTurn, DataDictionary};

/// Grounding instruction scoping the assistant to one dictionary.
pub fn grounding_instruction(dictionary: &DataDictionary) -> Result<String, RelayError> {
    let serialized = serde_json::to_string_pretty(dictionary)?;
    Ok(format!(
        "You are an AI assistant helping a user understand a specific database table.\n\
         Here is the Data Dictionary for the table you are discussing:\n\
         {}\n\n\
         Answer questions about the schema, suggest SQL queries, identify potential security \
         concerns (PII), or explain business logic based on this dictionary.",
        serialized
    ))
}

/// Prior turns in gateway form, order preserved.
pub fn session_history(history: &[ChatTurn]) -> Vec<Content> {
    history
        .iter()
        .map(|turn| Content {
            role: turn.role.to_gateway(),
            text: turn.content.clone(),
        })
        .collect()
}

#[derive(Clone)]
pub struct ChatSessionBuilder {
    gateway: Arc<dyn AiGateway>,
}

impl ChatSessionBuilder {
    pub fn new(gateway: Arc<dyn AiGateway>) -> Self {
        Self { gateway }
    }

    /// Assemble the session for `context` without sending it.
    pub fn build(&self, context: &ChatRequestContext) -> Result<GenerationRequest, RelayError> {
        let mut contents = session_history(&context.history);
        contents.push(Content::user(context.message.clone()));

        Ok(GenerationRequest {
            system_instruction: Some(grounding_instruction(&context.dictionary)?),
            contents,
            response_mime_type: None,
            response_schema: None,
        })
    }

    pub async fn reply(&self, key: &ApiKey, context: ChatRequestContext) -> Result<String, RelayError> {
        let request = self.build(&context)?;
        let reply = self.gateway.generate(key, request).await?;

        let text = reply.text.ok_or(RelayError::UpstreamEmptyResponse)?;

        tracing::info!(
            backend = self.gateway.name(),
            table = %context.dictionary.table_name,
            history_turns = context.history.len(),
            "Chat reply produced"
        );

        Ok(text)
    }
}

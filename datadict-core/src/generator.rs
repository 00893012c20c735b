//! Dictionary generation. Turns a raw data sample into a `DataDictionary`
//! through schema-constrained generation.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::credentials::ApiKey;
use crate::error::RelayError;
use crate::gateway::{AiGateway, Content, GenerationRequest};
use crate::models::DataDictionary;

pub const ARCHITECT_INSTRUCTION: &str = "You are a professional Data Architect and Database Engineer. \
Your task is to analyze raw data (CSV, JSON, or Text) and produce a standard data dictionary that \
developers and business analysts can use to understand a database schema. Be precise about types and constraints.";

pub const JSON_MIME_TYPE: &str = "application/json";

/// Prompt with the sample embedded verbatim.
pub fn build_prompt(sample: &str) -> String {
    format!(
        "Analyze the following database table data sample and generate a comprehensive data dictionary.\n\n\
         Data Sample:\n{}\n\n\
         Provide the output as a valid JSON object matching the requested schema.",
        sample
    )
}

/// Response schema in Gemini schema notation.
pub fn dictionary_schema() -> Value {
    let string_list = |description: &str| {
        json!({
            "type": "ARRAY",
            "items": { "type": "STRING" },
            "description": description,
        })
    };

    json!({
        "type": "OBJECT",
        "properties": {
            "table_name": {
                "type": "STRING",
                "description": "Suggested table name based on context"
            },
            "summary": {
                "type": "STRING",
                "description": "A high-level summary of what this table represents"
            },
            "columns": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "inferred_type": {
                            "type": "STRING",
                            "description": "Technical data type (e.g., UUID, VARCHAR(255), INTEGER, TIMESTAMP)"
                        },
                        "description": {
                            "type": "STRING",
                            "description": "Human-readable description of the column's purpose"
                        },
                        "constraints": string_list(
                            "Possible constraints like PRIMARY KEY, NOT NULL, UNIQUE, FOREIGN KEY"
                        ),
                        "example_values": string_list("Representative samples from the data"),
                        "business_logic": {
                            "type": "STRING",
                            "description": "Any inferred business rules or logic"
                        }
                    },
                    "required": ["name", "inferred_type", "description", "constraints", "example_values"]
                }
            }
        },
        "required": ["table_name", "summary", "columns"]
    })
}

/// A checked dictionary together with the exact payload the model returned.
#[derive(Debug, Clone)]
pub struct GeneratedDictionary {
    pub dictionary: DataDictionary,
    /// Returned to callers untouched, including keys the model added and
    /// explicit `null` optionals.
    pub payload: Value,
}

#[derive(Clone)]
pub struct DictionaryGenerator {
    gateway: Arc<dyn AiGateway>,
}

impl DictionaryGenerator {
    pub fn new(gateway: Arc<dyn AiGateway>) -> Self {
        Self { gateway }
    }

    /// Single attempt. An empty reply is `UpstreamEmptyResponse`; a reply that
    /// does not parse into a well-formed dictionary is `UpstreamCallFailure`.
    pub async fn generate(
        &self,
        key: &ApiKey,
        sample: &str,
    ) -> Result<GeneratedDictionary, RelayError> {
        let request = GenerationRequest {
            system_instruction: Some(ARCHITECT_INSTRUCTION.to_string()),
            contents: vec![Content::user(build_prompt(sample))],
            response_mime_type: Some(JSON_MIME_TYPE.to_string()),
            response_schema: Some(dictionary_schema()),
        };

        let reply = self.gateway.generate(key, request).await?;

        let text = match reply.text {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(RelayError::UpstreamEmptyResponse),
        };

        let payload: Value = serde_json::from_str(&text)?;
        let dictionary = DataDictionary::deserialize(&payload)?;
        dictionary
            .validate()
            .map_err(|e| RelayError::UpstreamCallFailure(Box::new(e)))?;

        tracing::info!(
            backend = self.gateway.name(),
            table = %dictionary.table_name,
            columns = dictionary.columns.len(),
            "Generated data dictionary"
        );

        Ok(GeneratedDictionary {
            dictionary,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, GatewayReply, GatewayRole};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a canned reply and records what it was asked.
    struct CannedGateway {
        reply: Mutex<Option<Result<GatewayReply, GatewayError>>>,
        seen: Mutex<Vec<GenerationRequest>>,
        calls: AtomicUsize,
    }

    impl CannedGateway {
        fn new(reply: Result<GatewayReply, GatewayError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                seen: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AiGateway for CannedGateway {
        async fn generate(
            &self,
            _key: &ApiKey,
            request: GenerationRequest,
        ) -> Result<GatewayReply, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request);
            self.reply
                .lock()
                .unwrap()
                .take()
                .expect("gateway called more than once")
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn conformant_payload() -> Value {
        json!({
            "table_name": "people",
            "summary": "People and their names",
            "columns": [
                {
                    "name": "id",
                    "inferred_type": "INTEGER",
                    "description": "Row identifier",
                    "constraints": ["PRIMARY KEY"],
                    "example_values": ["1", "2"]
                },
                {
                    "name": "name",
                    "inferred_type": "VARCHAR(255)",
                    "description": "Person name",
                    "constraints": [],
                    "example_values": []
                }
            ]
        })
    }

    fn key() -> ApiKey {
        ApiKey::new("k")
    }

    #[tokio::test]
    async fn test_generate_returns_parsed_dictionary() {
        let gateway = CannedGateway::new(Ok(GatewayReply::text(conformant_payload().to_string())));
        let generator = DictionaryGenerator::new(gateway.clone());

        let generated = generator.generate(&key(), "id,name\n1,Alice\n2,Bob").await.unwrap();

        assert_eq!(generated.payload, conformant_payload());
        assert_eq!(generated.dictionary.table_name, "people");
        assert_eq!(generated.dictionary.columns.len(), 2);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_payload_keeps_null_optionals_and_extra_keys() {
        let mut payload = conformant_payload();
        payload["columns"][0]["business_logic"] = Value::Null;
        payload["columns"][1]["pii"] = json!(false);
        payload["row_estimate"] = json!(2);
        let generator =
            DictionaryGenerator::new(CannedGateway::new(Ok(GatewayReply::text(payload.to_string()))));

        let generated = generator.generate(&key(), "id,name\n1,Alice").await.unwrap();

        assert_eq!(generated.payload, payload);
        assert!(generated.dictionary.columns[0].business_logic.is_none());
    }

    #[tokio::test]
    async fn test_generate_sends_sample_schema_and_role() {
        let gateway = CannedGateway::new(Ok(GatewayReply::text(conformant_payload().to_string())));
        let generator = DictionaryGenerator::new(gateway.clone());
        let sample = "id,name\n1,Alice\n2,Bob";

        generator.generate(&key(), sample).await.unwrap();

        let seen = gateway.seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.contents.len(), 1);
        assert_eq!(request.contents[0].role, GatewayRole::User);
        assert!(request.contents[0].text.contains(sample));
        assert_eq!(request.response_mime_type.as_deref(), Some("application/json"));
        assert_eq!(
            request.response_schema.as_ref().unwrap()["required"],
            json!(["table_name", "summary", "columns"])
        );
        assert!(request
            .system_instruction
            .as_deref()
            .unwrap()
            .contains("professional Data Architect and Database Engineer"));
    }

    #[tokio::test]
    async fn test_empty_reply_is_upstream_empty_response() {
        for reply in [GatewayReply::empty(), GatewayReply::text(""), GatewayReply::text("  \n")] {
            let generator = DictionaryGenerator::new(CannedGateway::new(Ok(reply)));
            let result = generator.generate(&key(), "a,b").await;
            assert!(matches!(result, Err(RelayError::UpstreamEmptyResponse)));
        }
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_upstream_failure() {
        let generator =
            DictionaryGenerator::new(CannedGateway::new(Ok(GatewayReply::text("not json"))));
        let result = generator.generate(&key(), "a,b").await;
        assert!(matches!(result, Err(RelayError::UpstreamCallFailure(_))));
    }

    #[tokio::test]
    async fn test_partially_shaped_reply_is_rejected() {
        let mut payload = conformant_payload();
        payload["columns"][0]
            .as_object_mut()
            .unwrap()
            .remove("example_values");
        let generator =
            DictionaryGenerator::new(CannedGateway::new(Ok(GatewayReply::text(payload.to_string()))));

        let result = generator.generate(&key(), "a,b").await;
        assert!(matches!(result, Err(RelayError::UpstreamCallFailure(_))));
    }

    #[tokio::test]
    async fn test_blank_column_type_is_rejected() {
        let mut payload = conformant_payload();
        payload["columns"][1]["inferred_type"] = json!("");
        let generator =
            DictionaryGenerator::new(CannedGateway::new(Ok(GatewayReply::text(payload.to_string()))));

        let err = generator.generate(&key(), "a,b").await.unwrap_err();
        assert_eq!(err.detail(), "column 'name' has an empty inferred_type");
    }

    #[tokio::test]
    async fn test_gateway_error_message_is_preserved() {
        let generator = DictionaryGenerator::new(CannedGateway::new(Err(GatewayError::Api {
            code: 503,
            message: "The model is overloaded".to_string(),
        })));

        let err = generator.generate(&key(), "a,b").await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.detail(), "API error (503): The model is overloaded");
    }

    #[test]
    fn test_prompt_embeds_sample_verbatim() {
        let sample = "{\"weird\": \"}{\"}\n\ttabs";
        assert!(build_prompt(sample).contains(sample));
    }

    #[test]
    fn test_column_schema_requires_fields_but_not_business_logic() {
        let schema = dictionary_schema();
        let required = &schema["properties"]["columns"]["items"]["required"];
        assert_eq!(
            required,
            &json!(["name", "inferred_type", "description", "constraints", "example_values"])
        );
        assert!(schema["properties"]["columns"]["items"]["properties"]["business_logic"].is_object());
    }
}

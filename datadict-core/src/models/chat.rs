use serde::{Deserialize, Serialize};

use crate::gateway::GatewayRole;
use crate::models::DataDictionary;

/// Who authored a prior turn. Only the exact string `"user"` is a user turn;
/// anything else the caller sends is treated as a model turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "user" => Role::User,
            _ => Role::Model,
        }
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }

    pub fn to_gateway(self) -> GatewayRole {
        match self {
            Role::User => GatewayRole::User,
            Role::Model => GatewayRole::Model,
        }
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        Role::parse(&raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// Everything one chat call needs; the caller resends it in full each time.
#[derive(Debug, Clone)]
pub struct ChatRequestContext {
    pub dictionary: DataDictionary,
    pub message: String,
    pub history: Vec<ChatTurn>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_exact_user_maps_to_user() {
        assert_eq!(Role::parse("user"), Role::User);
        for other in ["model", "assistant", "User", "system", "", " user"] {
            assert_eq!(Role::parse(other), Role::Model, "role {:?}", other);
        }
    }

    #[test]
    fn test_unknown_role_deserializes_as_model() {
        let turn: ChatTurn =
            serde_json::from_value(json!({"role": "assistant", "content": "hi"})).unwrap();
        assert_eq!(turn.role, Role::Model);
    }

    #[test]
    fn test_role_mapping_is_idempotent() {
        for raw in ["user", "model", "tool", "USER"] {
            let once = Role::parse(raw);
            let twice = Role::parse(once.as_str());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let value = serde_json::to_value(ChatTurn::model("ok")).unwrap();
        assert_eq!(value, json!({"role": "model", "content": "ok"}));
    }

    #[test]
    fn test_to_gateway_is_one_to_one() {
        assert_eq!(Role::User.to_gateway(), GatewayRole::User);
        assert_eq!(Role::Model.to_gateway(), GatewayRole::Model);
    }

    #[test]
    fn test_turn_without_content_is_rejected() {
        let result = serde_json::from_value::<ChatTurn>(json!({"role": "user"}));
        assert!(result.is_err());
    }
}

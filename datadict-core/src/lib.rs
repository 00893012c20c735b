pub mod chat;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod generator;
pub mod models;

pub use chat::ChatSessionBuilder;
pub use config::RelayConfig;
pub use credentials::{ApiKey, CredentialResolver, CredentialSource, EnvCredentials, StaticCredentials};
pub use error::RelayError;
pub use gateway::{AiGateway, Content, GatewayError, GatewayReply, GatewayRole, GeminiClient, GenerationRequest};
pub use generator::{DictionaryGenerator, GeneratedDictionary};
pub use models::{ChatRequestContext, ChatTurn, ColumnSpec, DataDictionary, Role};

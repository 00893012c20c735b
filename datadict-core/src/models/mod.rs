pub mod chat;
pub mod dictionary;

pub use chat::{ChatRequestContext, ChatTurn, Role};
pub use dictionary::{ColumnSpec, DataDictionary, DictionaryError};

//! Public types for the Finmemo API.

mod chat;
mod request;
mod statement;

pub use chat::{Completion, CompletionOptions, Usage};
pub use request::{ChatRequest, DataRequest};
pub use statement::{LineItem, StatementKind, StatementRow, StatementTable};

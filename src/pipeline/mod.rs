//! Consumers of the memoizing cache: financial data and chat.

pub mod chat;
pub mod financial;

pub use chat::{ChatService, render_chat_prompt};
pub use financial::{DATA_IDENTITY, FinancialData, LineItemArgs, REPORT_IDENTITY, ReportArgs};

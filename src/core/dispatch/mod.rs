pub mod ask_questions;
pub mod dispatcher;
pub mod tool_handler;

pub use ask_questions::AskQuestionsTool;
pub use dispatcher::{DispatchOutcome, Dispatcher, ToolCall};
pub use tool_handler::{CallContext, ToolCallHandler};

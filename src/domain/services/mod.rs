pub mod actions;
mod answer_parser;
mod assembler;
mod auth;
mod chat_state;
mod grouper;
mod session_context;

pub use answer_parser::*;
pub use assembler::*;
pub use auth::*;
pub use chat_state::*;
pub use grouper::*;
pub use session_context::*;

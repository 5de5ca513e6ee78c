mod action;
mod answer;
mod approach;
mod author;
mod backend;
mod chat_turn;
mod conversation;
mod event;
mod identity;
mod message;
mod request;
mod session;
mod slash_commands;
mod timestamp;

pub use action::*;
pub use answer::*;
pub use approach::*;
pub use author::*;
pub use backend::*;
pub use chat_turn::*;
pub use conversation::*;
pub use event::*;
pub use identity::*;
pub use message::*;
pub use request::*;
pub use session::*;
pub use slash_commands::*;
pub use timestamp::*;

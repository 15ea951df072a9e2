//! Dialog Store: a content-addressed branching conversation graph with
//! SQLite-backed relational storage.

mod error;
mod id;
mod model;
mod store;

pub use error::DialogError;
pub use model::{
    Block, Message, Role, FIELD_MESSAGE_CREATED_AT, FIELD_MESSAGE_ID, FIELD_MESSAGE_PARENT_ID,
    FIELD_MESSAGE_TITLE,
};
pub use store::{DialogStore, SaveDialog};

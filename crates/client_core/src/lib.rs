//! Client engine for the message service: HTTP api client, session
//! lifecycle, the feed snapshot store, and the conversation views
//! (partner directory, per-partner threads, outgoing routing) derived
//! from it.

pub mod api;
pub mod conversations;
pub mod error;
pub mod identity;
pub mod routing;
pub mod session;
pub mod store;

pub use api::ApiClient;
pub use conversations::{build_partners, select_thread, Partner};
pub use error::ClientError;
pub use identity::{normalize, same_identity};
pub use routing::{RouteError, SelectionContext, SendTarget};
pub use session::{Session, SessionController};
pub use store::{MessageRecord, MessageStore};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

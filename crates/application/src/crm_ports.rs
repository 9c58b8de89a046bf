mod backend;
mod notices;
mod session;

pub use backend::{CrmBackend, PermissionSource};
pub use notices::{Notice, Notifier};
pub use session::TokenStore;

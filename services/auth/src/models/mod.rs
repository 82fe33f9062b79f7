//! Authentication service models

pub mod session;
pub mod user;

// Re-export for convenience
pub use session::{Direction, Session, SessionView, SortOptions, UserTokens};
pub use user::{Identity, SignInInput, SignUpInput};

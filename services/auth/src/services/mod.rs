//! Session and identity orchestration

pub mod identity;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use identity::IdentityService;
pub use session::SessionService;

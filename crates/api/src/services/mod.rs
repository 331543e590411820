//! Application services.
//!
//! Stateless orchestration over the models: token minting and verification,
//! password authentication, and the gated download resolver.

pub mod auth;
pub mod downloads;
pub mod token;

pub use auth::{AuthError, AuthService};
pub use downloads::{DownloadError, DownloadResolver};
pub use token::{Claims, TokenError, TokenService};

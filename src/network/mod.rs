//! Network Layer
//!
//! WebSocket submission endpoint in front of the validator.
//! This layer only routes messages; every accept/reject decision is made in `validator/`.

pub mod auth;
pub mod protocol;
pub mod server;

pub use auth::{authenticate, validate_token, AuthConfig, AuthError, TokenClaims};
pub use protocol::{
    AuthRequest, ClientMessage, ErrorCode, ServerMessage, ValidateRequest, ValidationResponse,
};
pub use server::{ServerConfig, ValidatorServer, ValidatorServerError};

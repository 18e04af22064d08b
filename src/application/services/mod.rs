//! Application Services
//!
//! ## Available Services
//!
//! - **TokenVerifier**: resolves the user behind an access token
//! - **RealtimeServices**: the collaborators a connection session calls

use std::sync::Arc;

use crate::domain::{MessageStore, RoomLookup, UserLookup};

pub mod auth_service;

pub use auth_service::{AuthError, Claims, JwtTokenVerifier, TokenVerifier, VerifiedToken};

#[cfg(test)]
pub use auth_service::MockTokenVerifier;

/// Collaborators shared by every connection session
#[derive(Clone)]
pub struct RealtimeServices {
    pub tokens: Arc<dyn TokenVerifier>,
    pub rooms: Arc<dyn RoomLookup>,
    pub messages: Arc<dyn MessageStore>,
    pub users: Arc<dyn UserLookup>,
}

impl RealtimeServices {
    pub fn new(
        tokens: Arc<dyn TokenVerifier>,
        rooms: Arc<dyn RoomLookup>,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserLookup>,
    ) -> Self {
        Self {
            tokens,
            rooms,
            messages,
            users,
        }
    }
}

//! Application Layer
//!
//! Contains the services the realtime core calls out to before touching
//! the domain: today that is token verification for the `auth` frame.

pub mod services;

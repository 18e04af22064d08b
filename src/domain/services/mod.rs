//! # Domain Services
//!
//! Domain services encapsulate logic that doesn't naturally belong to a
//! single entity.
//!
//! ## Services
//!
//! - **SubscriptionFilter**: which events a subscriber receives (by room or by user)

mod subscription_filter;

pub use subscription_filter::*;

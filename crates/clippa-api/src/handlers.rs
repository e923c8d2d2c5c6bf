//! Request handlers.

pub mod clips;
pub mod health;
pub mod media;

pub use health::{alive, ping};

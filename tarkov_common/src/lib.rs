//! Shared types for Tarkov market data
//!
//! Game vocabulary (modes, trader currencies), the DTOs returned by the
//! tarkov-market REST API and the tarkov.dev query API, and the errors raised
//! while fetching them.

pub mod error;
pub mod game;
pub mod market;

pub use error::{FetchError, QueryError, QueryFailure};
pub use game::{Currency, GameMode};
pub use market::{ItemSlots, KeyProperties, KeyUses, MarketItem};

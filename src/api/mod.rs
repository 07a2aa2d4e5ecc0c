//! External property backend — trait, HTTP client, and data types.

pub mod client;
pub mod types;

pub use client::{HttpPropertyApi, PropertyApi};
pub use types::{ComparableListing, PropertyFacts, PropertyInfo, UploadAck};

//! The object storage client capability the bridge is built against.
//!
//! [`ObjectClient`] is deliberately narrow: existence check, fetch, and asynchronous
//! upload submission returning a [`TransferHandle`]. Real providers implement it over
//! their SDK; [`FakeObjectClient`] implements it in memory for tests.
//!
//! ## Module Structure
//!
//! - [`traits`] - Capability traits, request and metadata types, error type
//! - [`fake`] - In-memory fake implementation for testing

pub mod fake;
pub mod traits;

pub use fake::*;
pub use traits::*;

//! Authentication adapters.
//!
//! Implementations of the `SessionValidator` port:
//!
//! - `mock` - Token map for tests and local development
//! - `crate::adapters::postgres::PostgresSessionValidator` - Session table lookup

mod mock;

pub use mock::MockSessionValidator;

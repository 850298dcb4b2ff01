mod models;

pub use models::{Grant, GrantKind, TokenPair};

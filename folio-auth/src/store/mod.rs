mod file;
mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use crate::common::TokenPair;
use crate::error::AuthError;

/// Durable home of the current token pair.
///
/// `save` must be atomic: a concurrent `load` returns either the previous pair or the new
/// one, never a mix.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<TokenPair>, AuthError>;

    fn save(&self, pair: &TokenPair) -> Result<(), AuthError>;

    fn clear(&self) -> Result<(), AuthError>;
}

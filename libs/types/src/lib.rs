//! Types library for the fractional vault, auction and staking ledgers
//!
//! Shared identifiers and integer amount primitives used by every
//! contract in `fraction-contracts`.
//!
//! # Version
//! v1.0.0
//!
//! # Modules
//! - `ids`: Identifiers (AccountId, VaultId, AuctionId, AssetId, CollectionId, TokenId)
//! - `numeric`: Integer base-unit amounts, unit conversion, checked mul-div
//! - `fee`: Basis-point settlement splits
//! - `errors`: Error taxonomy for the primitives above

// Public modules
pub mod ids;
pub mod numeric;
pub mod fee;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::fee::*;
    pub use crate::errors::*;
}

//! nft command implementations.

pub mod monitor;
pub mod quota;
pub mod table;

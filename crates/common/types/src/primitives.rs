// Re-export the fixed-size hash types so users don't depend on ethereum-types directly
pub use ethereum_types::{H160, H256};

pub type Address = H160;
pub type BlockNumber = u64;
/// How many times an account was self-destructed and re-created.
pub type Incarnation = u64;

pub const ADDRESS_LENGTH: usize = 20;
pub const HASH_LENGTH: usize = 32;
pub const INCARNATION_LENGTH: usize = 8;
pub const BLOCK_NUMBER_LENGTH: usize = 8;

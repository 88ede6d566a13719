// StakeHersh — Token Staking Program
// Stake a fungible token, accrue rewards linearly per second, claim or
// withdraw once the lock-up has elapsed.

pub mod error;
pub mod executor;
pub mod instruction;
pub mod machine;
pub mod processor;
pub mod reward;
pub mod state;
pub mod store;
pub mod token;

pub use error::StakingError;
pub use processor::process_instruction;
pub use state::{ProgramConfig, StakeAccount};

// ---------------------------------------------------------------------------
// Program ID
// ---------------------------------------------------------------------------

solana_program::declare_id!("8SbebuABofE1WbiRU1cy3h4H26ji9r7y8Nta7akgkct3");

// ---------------------------------------------------------------------------
// Seeds
// ---------------------------------------------------------------------------

pub const CONFIG_SEED: &[u8] = b"config";
pub const STAKE_ACCOUNT_SEED: &[u8] = b"stake";
pub const VAULT_AUTHORITY_SEED: &[u8] = b"vault_authority";
pub const STAKE_VAULT_SEED: &[u8] = b"stake_vault";
pub const REWARD_VAULT_SEED: &[u8] = b"reward_vault";

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

#[cfg(not(feature = "no-entrypoint"))]
solana_program::entrypoint!(process_instruction);

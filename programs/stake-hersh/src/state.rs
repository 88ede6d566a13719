// StakeHersh — account state.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

// ---------------------------------------------------------------------------
// Program config (singleton, PDA ["config"])
// ---------------------------------------------------------------------------

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProgramConfig {
    pub is_initialized: bool,
    /// Only identity allowed to change the reward rate, pause, or fund rewards.
    pub admin_authority: Pubkey,
    pub stake_mint: Pubkey,
    pub reward_mint: Pubkey,
    /// Reward units per staked unit per second, scaled by `RATE_SCALE`.
    pub reward_rate: u64,
    /// Seconds a stake must stay deposited after its most recent increase.
    pub lockup_duration: u64,
    pub paused: bool,
    /// Mirrors the stake vault balance.
    pub total_staked: u64,
    pub bump: u8,
}

impl ProgramConfig {
    // 1 + 32 + 32 + 32 + 8 + 8 + 1 + 8 + 1 = 123
    pub const SIZE: usize = 123;
}

// ---------------------------------------------------------------------------
// Stake account (one per owner, PDA ["stake", owner])
// ---------------------------------------------------------------------------

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct StakeAccount {
    pub owner: Pubkey,
    pub staked_amount: u64,
    /// Last settlement time. Never decreases.
    pub last_update_time: i64,
    /// Time of the most recent stake increase; lock-up is measured from here.
    pub lockup_start: i64,
    pub pending_reward: u64,
    /// Sub-unit accrual remainder, scaled by `RATE_SCALE`.
    pub reward_carry: u64,
    pub bump: u8,
}

impl StakeAccount {
    // 32 + 8 + 8 + 8 + 8 + 8 + 1 = 73
    pub const SIZE: usize = 73;

    pub fn new(owner: Pubkey, now: i64, bump: u8) -> Self {
        Self {
            owner,
            staked_amount: 0,
            last_update_time: now,
            lockup_start: now,
            pending_reward: 0,
            reward_carry: 0,
            bump,
        }
    }

    /// A record with nothing staked and nothing owed can be closed.
    pub fn is_closable(&self) -> bool {
        self.staked_amount == 0 && self.pending_reward == 0
    }
}

// StakeHersh — in-process executor.
//
// Runs the state machine against an in-memory store, any `TokenInterface`
// and an injectable clock. Each call stages its transition, moves tokens,
// and only then commits, mirroring how the on-chain processor orders work.

use solana_program::pubkey::Pubkey;

use crate::error::StakingError;
use crate::instruction::{
    find_config_address, find_reward_vault, find_stake_address, find_stake_vault,
};
use crate::machine::{self, InitializeParams, StakeTransition, TokenMovement};
use crate::reward;
use crate::state::{ProgramConfig, StakeAccount};
use crate::store::{MemoryStakeStore, StakeStore};
use crate::token::TokenInterface;

/// Monotonic time source in unix seconds.
pub trait ClockSource {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ManualClock {
    now: i64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self { now }
    }

    pub fn set(&mut self, now: i64) {
        self.now = now;
    }

    pub fn advance(&mut self, seconds: i64) {
        self.now = self.now.saturating_add(seconds);
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> i64 {
        self.now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    Initialize,
    Stake,
    Unstake,
    ClaimReward,
    SetRewardRate,
    Pause,
    Unpause,
    FundRewards,
}

/// Returned for every successful instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub kind: InstructionKind,
    pub signer: Pubkey,
    /// Tokens moved by the instruction, zero for config-only instructions.
    pub amount: u64,
    pub timestamp: i64,
}

pub struct LocalStakingProgram<T, C> {
    config: Option<ProgramConfig>,
    store: MemoryStakeStore,
    tokens: T,
    clock: C,
    stake_vault: Pubkey,
    reward_vault: Pubkey,
}

impl<T: TokenInterface, C: ClockSource> LocalStakingProgram<T, C> {
    pub fn new(tokens: T, clock: C) -> Self {
        let program_id = crate::id();
        Self {
            config: None,
            store: MemoryStakeStore::default(),
            tokens,
            clock,
            stake_vault: find_stake_vault(&program_id).0,
            reward_vault: find_reward_vault(&program_id).0,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn config(&self) -> Option<&ProgramConfig> {
        self.config.as_ref()
    }

    pub fn stake_account(&self, owner: &Pubkey) -> Option<StakeAccount> {
        self.store.load(owner)
    }

    /// Reward `owner` could claim right now, without settling the record.
    pub fn pending_reward(&self, owner: &Pubkey) -> Result<u64, StakingError> {
        let config = self.current_config()?;
        let account = self.store.load(owner).ok_or(StakingError::AccountNotFound)?;
        reward::pending_at(&account, config.reward_rate, self.clock.now())
    }

    pub fn store(&self) -> &MemoryStakeStore {
        &self.store
    }

    pub fn tokens(&self) -> &T {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut T {
        &mut self.tokens
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn stake_vault(&self) -> Pubkey {
        self.stake_vault
    }

    pub fn reward_vault(&self) -> Pubkey {
        self.reward_vault
    }

    fn current_config(&self) -> Result<&ProgramConfig, StakingError> {
        self.config.as_ref().ok_or(StakingError::NotInitialized)
    }

    fn receipt(&self, kind: InstructionKind, signer: Pubkey, amount: u64) -> Receipt {
        Receipt {
            kind,
            signer,
            amount,
            timestamp: self.clock.now(),
        }
    }

    // ── Instructions ────────────────────────────────────────────────────────

    pub fn initialize(
        &mut self,
        admin: Pubkey,
        stake_mint: Pubkey,
        reward_mint: Pubkey,
        reward_rate: u64,
        lockup_duration: u64,
    ) -> Result<Receipt, StakingError> {
        let config = machine::initialize(
            self.config.as_ref(),
            InitializeParams {
                admin,
                stake_mint,
                reward_mint,
                reward_rate,
                lockup_duration,
                bump: find_config_address(&crate::id()).1,
            },
        )?;
        self.config = Some(config);
        Ok(self.receipt(InstructionKind::Initialize, admin, 0))
    }

    pub fn stake(&mut self, owner: Pubkey, amount: u64) -> Result<Receipt, StakingError> {
        let existing = self.store.load(&owner);
        let transition = machine::stake(
            self.current_config()?,
            existing.as_ref(),
            &owner,
            amount,
            self.clock.now(),
            find_stake_address(&owner, &crate::id()).1,
        )?;
        self.commit(transition)?;
        Ok(self.receipt(InstructionKind::Stake, owner, amount))
    }

    pub fn unstake(&mut self, owner: Pubkey, amount: u64) -> Result<Receipt, StakingError> {
        self.unstake_from(owner, owner, amount)
    }

    /// Unstake with `caller` presenting the record stored under `record_owner`.
    pub fn unstake_from(
        &mut self,
        caller: Pubkey,
        record_owner: Pubkey,
        amount: u64,
    ) -> Result<Receipt, StakingError> {
        let existing = self.store.load(&record_owner);
        let transition = machine::unstake(
            self.current_config()?,
            existing.as_ref(),
            &caller,
            amount,
            self.clock.now(),
        )?;
        self.commit(transition)?;
        Ok(self.receipt(InstructionKind::Unstake, caller, amount))
    }

    pub fn claim_reward(&mut self, owner: Pubkey) -> Result<Receipt, StakingError> {
        let existing = self.store.load(&owner);
        let transition =
            machine::claim_reward(self.current_config()?, existing.as_ref(), &owner, self.clock.now())?;
        let amount = transition.movement.amount();
        self.commit(transition)?;
        Ok(self.receipt(InstructionKind::ClaimReward, owner, amount))
    }

    pub fn set_reward_rate(&mut self, admin: Pubkey, new_rate: u64) -> Result<Receipt, StakingError> {
        let next = machine::set_reward_rate(self.current_config()?, &admin, new_rate)?;
        self.config = Some(next);
        Ok(self.receipt(InstructionKind::SetRewardRate, admin, 0))
    }

    pub fn pause(&mut self, admin: Pubkey) -> Result<Receipt, StakingError> {
        let next = machine::pause(self.current_config()?, &admin)?;
        self.config = Some(next);
        Ok(self.receipt(InstructionKind::Pause, admin, 0))
    }

    pub fn unpause(&mut self, admin: Pubkey) -> Result<Receipt, StakingError> {
        let next = machine::unpause(self.current_config()?, &admin)?;
        self.config = Some(next);
        Ok(self.receipt(InstructionKind::Unpause, admin, 0))
    }

    pub fn fund_rewards(&mut self, admin: Pubkey, amount: u64) -> Result<Receipt, StakingError> {
        let movement = machine::fund_rewards(self.current_config()?, &admin, amount)?;
        self.move_tokens(movement)?;
        Ok(self.receipt(InstructionKind::FundRewards, admin, amount))
    }

    // ── Commit ──────────────────────────────────────────────────────────────

    fn move_tokens(&mut self, movement: TokenMovement) -> Result<(), StakingError> {
        let config = self.current_config()?;
        let (stake_mint, reward_mint) = (config.stake_mint, config.reward_mint);

        let result = match movement {
            TokenMovement::Deposit { from, amount } => {
                self.tokens.transfer(&stake_mint, &from, &self.stake_vault, amount)
            }
            TokenMovement::Withdraw { to, amount } => {
                self.tokens.transfer(&stake_mint, &self.stake_vault, &to, amount)
            }
            TokenMovement::Reward { to, amount } => {
                self.tokens.transfer(&reward_mint, &self.reward_vault, &to, amount)
            }
            TokenMovement::Fund { from, amount } => {
                self.tokens.transfer(&reward_mint, &from, &self.reward_vault, amount)
            }
        };
        result.map_err(|_| StakingError::TransferFailed)
    }

    /// Tokens first; staged state lands only if they moved.
    fn commit(&mut self, transition: StakeTransition) -> Result<(), StakingError> {
        self.move_tokens(transition.movement)?;
        self.config = Some(transition.config);
        self.store.apply(transition.account);
        Ok(())
    }
}

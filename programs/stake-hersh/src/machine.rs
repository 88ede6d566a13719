// StakeHersh — staking state machine.
//
// Every operation validates and computes on copies of the current state and
// returns the staged result. Nothing here performs I/O: the caller moves
// tokens first and commits the staged state only once that succeeds, so a
// failed instruction never leaves a partial update behind.

use solana_program::pubkey::Pubkey;

use crate::error::StakingError;
use crate::reward;
use crate::state::{ProgramConfig, StakeAccount};

// ---------------------------------------------------------------------------
// Staged results
// ---------------------------------------------------------------------------

/// Token movement an instruction requires before its state may be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMovement {
    /// Owner wallet → stake vault.
    Deposit { from: Pubkey, amount: u64 },
    /// Stake vault → owner wallet.
    Withdraw { to: Pubkey, amount: u64 },
    /// Reward vault → owner wallet.
    Reward { to: Pubkey, amount: u64 },
    /// Funder wallet → reward vault.
    Fund { from: Pubkey, amount: u64 },
}

impl TokenMovement {
    pub fn amount(&self) -> u64 {
        match *self {
            TokenMovement::Deposit { amount, .. }
            | TokenMovement::Withdraw { amount, .. }
            | TokenMovement::Reward { amount, .. }
            | TokenMovement::Fund { amount, .. } => amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountChange {
    Write(StakeAccount),
    /// Zero stake and zero pending reward: drop the record.
    Close(Pubkey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeTransition {
    pub config: ProgramConfig,
    pub account: AccountChange,
    pub movement: TokenMovement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitializeParams {
    pub admin: Pubkey,
    pub stake_mint: Pubkey,
    pub reward_mint: Pubkey,
    pub reward_rate: u64,
    pub lockup_duration: u64,
    pub bump: u8,
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

fn ensure_initialized(config: &ProgramConfig) -> Result<(), StakingError> {
    if !config.is_initialized {
        return Err(StakingError::NotInitialized);
    }
    Ok(())
}

fn ensure_admin(config: &ProgramConfig, caller: &Pubkey) -> Result<(), StakingError> {
    ensure_initialized(config)?;
    if config.admin_authority != *caller {
        return Err(StakingError::Unauthorized);
    }
    Ok(())
}

/// The caller's own record. A record held by someone else is `Unauthorized`.
fn owned_record<'a>(
    account: Option<&'a StakeAccount>,
    caller: &Pubkey,
) -> Result<&'a StakeAccount, StakingError> {
    let record = account.ok_or(StakingError::AccountNotFound)?;
    if record.owner != *caller {
        return Err(StakingError::Unauthorized);
    }
    Ok(record)
}

fn close_or_write(account: StakeAccount) -> AccountChange {
    if account.is_closable() {
        AccountChange::Close(account.owner)
    } else {
        AccountChange::Write(account)
    }
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

pub fn initialize(
    existing: Option<&ProgramConfig>,
    params: InitializeParams,
) -> Result<ProgramConfig, StakingError> {
    if existing.map_or(false, |c| c.is_initialized) {
        return Err(StakingError::AlreadyInitialized);
    }
    if params.reward_rate > reward::MAX_REWARD_RATE {
        return Err(StakingError::InvalidAmount);
    }

    Ok(ProgramConfig {
        is_initialized: true,
        admin_authority: params.admin,
        stake_mint: params.stake_mint,
        reward_mint: params.reward_mint,
        reward_rate: params.reward_rate,
        lockup_duration: params.lockup_duration,
        paused: false,
        total_staked: 0,
        bump: params.bump,
    })
}

/// Deposit `amount` for `owner`, creating the record on first stake.
/// Each increase restarts the lock-up window.
pub fn stake(
    config: &ProgramConfig,
    account: Option<&StakeAccount>,
    owner: &Pubkey,
    amount: u64,
    now: i64,
    bump: u8,
) -> Result<StakeTransition, StakingError> {
    ensure_initialized(config)?;
    if amount == 0 {
        return Err(StakingError::InvalidAmount);
    }
    if config.paused {
        return Err(StakingError::ProgramPaused);
    }

    let mut staged = match account {
        Some(_) => owned_record(account, owner)?.clone(),
        None => StakeAccount::new(*owner, now, bump),
    };

    reward::settle(&mut staged, config.reward_rate, now)?;

    staged.staked_amount = staged
        .staked_amount
        .checked_add(amount)
        .ok_or(StakingError::Overflow)?;
    staged.lockup_start = now;

    let mut next = config.clone();
    next.total_staked = next
        .total_staked
        .checked_add(amount)
        .ok_or(StakingError::Overflow)?;

    Ok(StakeTransition {
        config: next,
        account: AccountChange::Write(staged),
        movement: TokenMovement::Deposit {
            from: *owner,
            amount,
        },
    })
}

/// Withdraw `amount` of principal once the lock-up has run. Allowed while
/// paused so stakers can always exit.
pub fn unstake(
    config: &ProgramConfig,
    account: Option<&StakeAccount>,
    caller: &Pubkey,
    amount: u64,
    now: i64,
) -> Result<StakeTransition, StakingError> {
    ensure_initialized(config)?;
    let record = owned_record(account, caller)?;

    if amount == 0 {
        return Err(StakingError::InvalidAmount);
    }
    if amount > record.staked_amount {
        return Err(StakingError::InsufficientStake);
    }
    if reward::elapsed_seconds(record.lockup_start, now)? < config.lockup_duration {
        return Err(StakingError::LockupNotExpired);
    }

    let mut staged = record.clone();
    reward::settle_saturating(&mut staged, config.reward_rate, now)?;
    staged.staked_amount = staged
        .staked_amount
        .checked_sub(amount)
        .ok_or(StakingError::InsufficientStake)?;

    let mut next = config.clone();
    next.total_staked = next
        .total_staked
        .checked_sub(amount)
        .ok_or(StakingError::Overflow)?;

    Ok(StakeTransition {
        config: next,
        account: close_or_write(staged),
        movement: TokenMovement::Withdraw {
            to: *caller,
            amount,
        },
    })
}

/// Pay out everything accrued up to `now`.
pub fn claim_reward(
    config: &ProgramConfig,
    account: Option<&StakeAccount>,
    caller: &Pubkey,
    now: i64,
) -> Result<StakeTransition, StakingError> {
    ensure_initialized(config)?;
    if config.paused {
        return Err(StakingError::ProgramPaused);
    }
    let record = owned_record(account, caller)?;

    let mut staged = record.clone();
    reward::settle(&mut staged, config.reward_rate, now)?;

    let amount = staged.pending_reward;
    if amount == 0 {
        return Err(StakingError::NothingToClaim);
    }
    staged.pending_reward = 0;

    Ok(StakeTransition {
        config: config.clone(),
        account: close_or_write(staged),
        movement: TokenMovement::Reward {
            to: *caller,
            amount,
        },
    })
}

// ---------------------------------------------------------------------------
// Admin instructions
// ---------------------------------------------------------------------------

/// New rate applies to every account's unsettled interval from its next
/// settlement onward.
pub fn set_reward_rate(
    config: &ProgramConfig,
    caller: &Pubkey,
    new_rate: u64,
) -> Result<ProgramConfig, StakingError> {
    ensure_admin(config, caller)?;
    if new_rate > reward::MAX_REWARD_RATE {
        return Err(StakingError::InvalidAmount);
    }
    let mut next = config.clone();
    next.reward_rate = new_rate;
    Ok(next)
}

pub fn pause(config: &ProgramConfig, caller: &Pubkey) -> Result<ProgramConfig, StakingError> {
    ensure_admin(config, caller)?;
    let mut next = config.clone();
    next.paused = true;
    Ok(next)
}

pub fn unpause(config: &ProgramConfig, caller: &Pubkey) -> Result<ProgramConfig, StakingError> {
    ensure_admin(config, caller)?;
    let mut next = config.clone();
    next.paused = false;
    Ok(next)
}

pub fn fund_rewards(
    config: &ProgramConfig,
    caller: &Pubkey,
    amount: u64,
) -> Result<TokenMovement, StakingError> {
    ensure_admin(config, caller)?;
    if amount == 0 {
        return Err(StakingError::InvalidAmount);
    }
    Ok(TokenMovement::Fund {
        from: *caller,
        amount,
    })
}

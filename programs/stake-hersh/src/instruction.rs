//! StakeHersh instruction encoding, PDA helpers and instruction builders.
//!
//! Wire format: one discriminator byte followed by the borsh-encoded args.
//!
//! Instructions:
//!   0 = Initialize
//!   1 = Stake
//!   2 = Unstake
//!   3 = ClaimReward
//!   4 = SetRewardRate
//!   5 = Pause
//!   6 = Unpause
//!   7 = FundRewards

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::error::StakingError;
use crate::{
    CONFIG_SEED, REWARD_VAULT_SEED, STAKE_ACCOUNT_SEED, STAKE_VAULT_SEED, VAULT_AUTHORITY_SEED,
};

// ── Discriminators ──────────────────────────────────────────────────────────

const IX_INITIALIZE: u8 = 0;
const IX_STAKE: u8 = 1;
const IX_UNSTAKE: u8 = 2;
const IX_CLAIM_REWARD: u8 = 3;
const IX_SET_REWARD_RATE: u8 = 4;
const IX_PAUSE: u8 = 5;
const IX_UNPAUSE: u8 = 6;
const IX_FUND_REWARDS: u8 = 7;

// ── Args ────────────────────────────────────────────────────────────────────

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitializeArgs {
    pub reward_rate: u64,
    pub lockup_duration: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountArgs {
    pub amount: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardRateArgs {
    pub new_rate: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakingInstruction {
    Initialize(InitializeArgs),
    Stake(AmountArgs),
    Unstake(AmountArgs),
    ClaimReward,
    SetRewardRate(RewardRateArgs),
    Pause,
    Unpause,
    FundRewards(AmountArgs),
}

impl StakingInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&tag, data) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        let ix = match tag {
            IX_INITIALIZE => Self::Initialize(decode(data)?),
            IX_STAKE => Self::Stake(decode(data)?),
            IX_UNSTAKE => Self::Unstake(decode(data)?),
            IX_CLAIM_REWARD => Self::ClaimReward,
            IX_SET_REWARD_RATE => Self::SetRewardRate(decode(data)?),
            IX_PAUSE => Self::Pause,
            IX_UNPAUSE => Self::Unpause,
            IX_FUND_REWARDS => Self::FundRewards(decode(data)?),
            _ => return Err(StakingError::InvalidInstruction.into()),
        };
        Ok(ix)
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        let (tag, args) = match self {
            Self::Initialize(args) => (IX_INITIALIZE, borsh::to_vec(args)?),
            Self::Stake(args) => (IX_STAKE, borsh::to_vec(args)?),
            Self::Unstake(args) => (IX_UNSTAKE, borsh::to_vec(args)?),
            Self::ClaimReward => (IX_CLAIM_REWARD, Vec::new()),
            Self::SetRewardRate(args) => (IX_SET_REWARD_RATE, borsh::to_vec(args)?),
            Self::Pause => (IX_PAUSE, Vec::new()),
            Self::Unpause => (IX_UNPAUSE, Vec::new()),
            Self::FundRewards(args) => (IX_FUND_REWARDS, borsh::to_vec(args)?),
        };
        let mut data = Vec::with_capacity(1 + args.len());
        data.push(tag);
        data.extend_from_slice(&args);
        Ok(data)
    }
}

fn decode<T: BorshDeserialize>(data: &[u8]) -> Result<T, ProgramError> {
    T::try_from_slice(data).map_err(|_| ProgramError::InvalidInstructionData)
}

// ── PDA Helpers ─────────────────────────────────────────────────────────────

pub fn find_config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id)
}

pub fn find_stake_address(owner: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[STAKE_ACCOUNT_SEED, owner.as_ref()], program_id)
}

pub fn find_vault_authority(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_AUTHORITY_SEED], program_id)
}

pub fn find_stake_vault(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[STAKE_VAULT_SEED], program_id)
}

pub fn find_reward_vault(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[REWARD_VAULT_SEED], program_id)
}

// ── Instruction Builders ────────────────────────────────────────────────────

/// Create the config and both token vaults.
///
/// Accounts:
///   0. `[signer, writable]` admin (payer)
///   1. `[writable]` config PDA
///   2. `[]` vault authority PDA
///   3. `[writable]` stake vault PDA
///   4. `[writable]` reward vault PDA
///   5. `[]` stake mint
///   6. `[]` reward mint
///   7. `[]` token program
///   8. `[]` system program
pub fn initialize(
    admin: &Pubkey,
    stake_mint: &Pubkey,
    reward_mint: &Pubkey,
    reward_rate: u64,
    lockup_duration: u64,
) -> Result<Instruction, ProgramError> {
    let program_id = crate::id();
    Ok(Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(*admin, true),
            AccountMeta::new(find_config_address(&program_id).0, false),
            AccountMeta::new_readonly(find_vault_authority(&program_id).0, false),
            AccountMeta::new(find_stake_vault(&program_id).0, false),
            AccountMeta::new(find_reward_vault(&program_id).0, false),
            AccountMeta::new_readonly(*stake_mint, false),
            AccountMeta::new_readonly(*reward_mint, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: StakingInstruction::Initialize(InitializeArgs {
            reward_rate,
            lockup_duration,
        })
        .pack()?,
    })
}

/// Accounts:
///   0. `[signer, writable]` owner (payer)
///   1. `[writable]` stake account PDA
///   2. `[writable]` config PDA
///   3. `[writable]` stake vault PDA
///   4. `[writable]` owner's stake-mint token account
///   5. `[]` token program
///   6. `[]` system program
pub fn stake(
    owner: &Pubkey,
    owner_token_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let program_id = crate::id();
    Ok(Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(*owner, true),
            AccountMeta::new(find_stake_address(owner, &program_id).0, false),
            AccountMeta::new(find_config_address(&program_id).0, false),
            AccountMeta::new(find_stake_vault(&program_id).0, false),
            AccountMeta::new(*owner_token_account, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: StakingInstruction::Stake(AmountArgs { amount }).pack()?,
    })
}

/// Accounts:
///   0. `[signer, writable]` owner (receives rent when the record closes)
///   1. `[writable]` stake account PDA
///   2. `[writable]` config PDA
///   3. `[]` vault authority PDA
///   4. `[writable]` stake vault PDA
///   5. `[writable]` owner's stake-mint token account
///   6. `[]` token program
pub fn unstake(
    owner: &Pubkey,
    owner_token_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    unstake_from(
        owner,
        &find_stake_address(owner, &crate::id()).0,
        owner_token_account,
        amount,
    )
}

/// `unstake` against an explicit stake record, e.g. one the signer does not own.
pub fn unstake_from(
    owner: &Pubkey,
    stake_account: &Pubkey,
    owner_token_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let program_id = crate::id();
    Ok(Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(*owner, true),
            AccountMeta::new(*stake_account, false),
            AccountMeta::new(find_config_address(&program_id).0, false),
            AccountMeta::new_readonly(find_vault_authority(&program_id).0, false),
            AccountMeta::new(find_stake_vault(&program_id).0, false),
            AccountMeta::new(*owner_token_account, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: StakingInstruction::Unstake(AmountArgs { amount }).pack()?,
    })
}

/// Accounts:
///   0. `[signer, writable]` owner
///   1. `[writable]` stake account PDA
///   2. `[]` config PDA
///   3. `[]` vault authority PDA
///   4. `[writable]` reward vault PDA
///   5. `[writable]` owner's reward-mint token account
///   6. `[]` token program
pub fn claim_reward(
    owner: &Pubkey,
    owner_reward_account: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let program_id = crate::id();
    Ok(Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(*owner, true),
            AccountMeta::new(find_stake_address(owner, &program_id).0, false),
            AccountMeta::new_readonly(find_config_address(&program_id).0, false),
            AccountMeta::new_readonly(find_vault_authority(&program_id).0, false),
            AccountMeta::new(find_reward_vault(&program_id).0, false),
            AccountMeta::new(*owner_reward_account, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: StakingInstruction::ClaimReward.pack()?,
    })
}

fn admin_instruction(
    admin: &Pubkey,
    ix: StakingInstruction,
) -> Result<Instruction, ProgramError> {
    let program_id = crate::id();
    Ok(Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new_readonly(*admin, true),
            AccountMeta::new(find_config_address(&program_id).0, false),
        ],
        data: ix.pack()?,
    })
}

/// Accounts:
///   0. `[signer]` admin
///   1. `[writable]` config PDA
pub fn set_reward_rate(admin: &Pubkey, new_rate: u64) -> Result<Instruction, ProgramError> {
    admin_instruction(
        admin,
        StakingInstruction::SetRewardRate(RewardRateArgs { new_rate }),
    )
}

/// Same accounts as `set_reward_rate`.
pub fn pause(admin: &Pubkey) -> Result<Instruction, ProgramError> {
    admin_instruction(admin, StakingInstruction::Pause)
}

/// Same accounts as `set_reward_rate`.
pub fn unpause(admin: &Pubkey) -> Result<Instruction, ProgramError> {
    admin_instruction(admin, StakingInstruction::Unpause)
}

/// Accounts:
///   0. `[signer]` admin
///   1. `[]` config PDA
///   2. `[writable]` reward vault PDA
///   3. `[writable]` admin's reward-mint token account
///   4. `[]` token program
pub fn fund_rewards(
    admin: &Pubkey,
    admin_reward_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let program_id = crate::id();
    Ok(Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new_readonly(*admin, true),
            AccountMeta::new_readonly(find_config_address(&program_id).0, false),
            AccountMeta::new(find_reward_vault(&program_id).0, false),
            AccountMeta::new(*admin_reward_account, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: StakingInstruction::FundRewards(AmountArgs { amount }).pack()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout() {
        let data = StakingInstruction::Initialize(InitializeArgs {
            reward_rate: 1,
            lockup_duration: 2,
        })
        .pack()
        .unwrap();
        assert_eq!(data.len(), 17);
        assert_eq!(data[0], IX_INITIALIZE);
        assert_eq!(&data[1..9], &1u64.to_le_bytes());
        assert_eq!(&data[9..17], &2u64.to_le_bytes());

        assert_eq!(StakingInstruction::ClaimReward.pack().unwrap(), vec![IX_CLAIM_REWARD]);
        let stake = StakingInstruction::Stake(AmountArgs { amount: 9 });
        assert_eq!(StakingInstruction::unpack(&stake.pack().unwrap()).unwrap(), stake);
    }

    #[test]
    fn test_unpack_rejects_bad_data() {
        assert_eq!(
            StakingInstruction::unpack(&[]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            StakingInstruction::unpack(&[255]),
            Err(StakingError::InvalidInstruction.into())
        );
        // Truncated amount
        assert_eq!(
            StakingInstruction::unpack(&[IX_STAKE, 1, 2, 3]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            StakingInstruction::unpack(&[IX_PAUSE]).unwrap(),
            StakingInstruction::Pause
        );
    }

    #[test]
    fn test_stake_builder_uses_owner_pda() {
        let owner = Pubkey::new_unique();
        let token = Pubkey::new_unique();
        let ix = stake(&owner, &token, 5).unwrap();
        assert_eq!(ix.program_id, crate::id());
        assert_eq!(ix.accounts[0].pubkey, owner);
        assert!(ix.accounts[0].is_signer);
        assert_eq!(ix.accounts[1].pubkey, find_stake_address(&owner, &crate::id()).0);
        assert_eq!(ix.accounts[4].pubkey, token);
    }
}

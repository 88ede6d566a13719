// StakeHersh — on-chain instruction processor.
//
// Each handler validates accounts, stages the transition through `machine`,
// moves tokens via SPL Token CPI, and serializes the staged state last.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};

use crate::error::StakingError;
use crate::instruction::{
    find_config_address, find_reward_vault, find_stake_address, find_stake_vault,
    find_vault_authority, AmountArgs, InitializeArgs, RewardRateArgs, StakingInstruction,
};
use crate::machine::{self, AccountChange, InitializeParams};
use crate::state::{ProgramConfig, StakeAccount};
use crate::store::{close_stake_record, load_stake_record, write_stake_record};
use crate::token::{ensure_mint, ensure_transferable, transfer_spl_tokens};
use crate::{
    CONFIG_SEED, REWARD_VAULT_SEED, STAKE_ACCOUNT_SEED, STAKE_VAULT_SEED, VAULT_AUTHORITY_SEED,
};

// ---------------------------------------------------------------------------
// Entrypoint dispatch
// ---------------------------------------------------------------------------

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    match StakingInstruction::unpack(instruction_data)? {
        StakingInstruction::Initialize(args) => process_initialize(program_id, accounts, args),
        StakingInstruction::Stake(args) => process_stake(program_id, accounts, args),
        StakingInstruction::Unstake(args) => process_unstake(program_id, accounts, args),
        StakingInstruction::ClaimReward => process_claim_reward(program_id, accounts),
        StakingInstruction::SetRewardRate(args) => {
            process_set_reward_rate(program_id, accounts, args)
        }
        StakingInstruction::Pause => process_set_paused(program_id, accounts, true),
        StakingInstruction::Unpause => process_set_paused(program_id, accounts, false),
        StakingInstruction::FundRewards(args) => process_fund_rewards(program_id, accounts, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn assert_signer(account: &AccountInfo) -> ProgramResult {
    if !account.is_signer {
        return Err(StakingError::AccountNotSigner.into());
    }
    Ok(())
}

fn assert_writable(account: &AccountInfo) -> ProgramResult {
    if !account.is_writable {
        return Err(StakingError::AccountNotWritable.into());
    }
    Ok(())
}

fn assert_owned_by(account: &AccountInfo, owner: &Pubkey) -> ProgramResult {
    if account.owner != owner {
        return Err(StakingError::InvalidOwner.into());
    }
    Ok(())
}

fn assert_key(account: &AccountInfo, expected: &Pubkey) -> ProgramResult {
    if account.key != expected {
        return Err(StakingError::InvalidPDA.into());
    }
    Ok(())
}

fn assert_token_program(account: &AccountInfo) -> ProgramResult {
    if *account.key != spl_token::id() {
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

fn create_pda_account<'a>(
    payer: &AccountInfo<'a>,
    space: usize,
    owner: &Pubkey,
    system_program: &AccountInfo<'a>,
    new_account: &AccountInfo<'a>,
    seeds: &[&[u8]],
) -> ProgramResult {
    let rent = Rent::get()?;
    let lamports = rent.minimum_balance(space);

    if new_account.lamports() == 0 {
        return invoke_signed(
            &system_instruction::create_account(payer.key, new_account.key, lamports, space as u64, owner),
            &[payer.clone(), new_account.clone(), system_program.clone()],
            &[seeds],
        );
    }

    // PDA addresses are public, so the account may already hold lamports.
    // `create_account` refuses those; top up, then allocate and assign.
    let shortfall = lamports.saturating_sub(new_account.lamports());
    if shortfall > 0 {
        invoke(
            &system_instruction::transfer(payer.key, new_account.key, shortfall),
            &[payer.clone(), new_account.clone(), system_program.clone()],
        )?;
    }
    invoke_signed(
        &system_instruction::allocate(new_account.key, space as u64),
        &[new_account.clone(), system_program.clone()],
        &[seeds],
    )?;
    invoke_signed(
        &system_instruction::assign(new_account.key, owner),
        &[new_account.clone(), system_program.clone()],
        &[seeds],
    )
}

/// Create a PDA token account for `mint`, owned by the vault authority.
fn create_vault<'a>(
    payer: &AccountInfo<'a>,
    vault: &AccountInfo<'a>,
    mint: &AccountInfo<'a>,
    authority: &Pubkey,
    token_program: &AccountInfo<'a>,
    system_program: &AccountInfo<'a>,
    seeds: &[&[u8]],
) -> ProgramResult {
    create_pda_account(
        payer,
        spl_token::state::Account::LEN,
        &spl_token::id(),
        system_program,
        vault,
        seeds,
    )?;

    invoke_signed(
        &spl_token::instruction::initialize_account3(
            &spl_token::id(),
            vault.key,
            mint.key,
            authority,
        )?,
        &[vault.clone(), mint.clone(), token_program.clone()],
        &[seeds],
    )
}

/// Fresh read of the config; nothing is cached across instructions.
fn load_config(config_account: &AccountInfo, program_id: &Pubkey) -> Result<ProgramConfig, ProgramError> {
    assert_owned_by(config_account, program_id)
        .map_err(|_| ProgramError::from(StakingError::NotInitialized))?;
    assert_key(config_account, &find_config_address(program_id).0)?;

    let config = ProgramConfig::try_from_slice(&config_account.try_borrow_data()?)?;
    if !config.is_initialized {
        return Err(StakingError::NotInitialized.into());
    }
    Ok(config)
}

fn store_config(config_account: &AccountInfo, config: &ProgramConfig) -> ProgramResult {
    config.serialize(&mut &mut config_account.try_borrow_mut_data()?[..])?;
    Ok(())
}

fn now() -> Result<i64, ProgramError> {
    Ok(Clock::get()?.unix_timestamp)
}

// ---------------------------------------------------------------------------
// Instruction: Initialize (discriminator 0)
// ---------------------------------------------------------------------------

fn process_initialize(program_id: &Pubkey, accounts: &[AccountInfo], args: InitializeArgs) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let admin = next_account_info(account_iter)?;
    let config_account = next_account_info(account_iter)?;
    let vault_authority = next_account_info(account_iter)?;
    let stake_vault = next_account_info(account_iter)?;
    let reward_vault = next_account_info(account_iter)?;
    let stake_mint = next_account_info(account_iter)?;
    let reward_mint = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;
    let system_prog = next_account_info(account_iter)?;

    assert_signer(admin)?;
    assert_writable(config_account)?;
    assert_writable(stake_vault)?;
    assert_writable(reward_vault)?;
    assert_token_program(token_program)?;
    if *system_prog.key != system_program::id() {
        return Err(ProgramError::IncorrectProgramId);
    }

    let (config_pda, config_bump) = find_config_address(program_id);
    assert_key(config_account, &config_pda)?;

    let existing = if config_account.data_is_empty() {
        None
    } else {
        assert_owned_by(config_account, program_id)?;
        Some(ProgramConfig::try_from_slice(&config_account.try_borrow_data()?)?)
    };

    let config = machine::initialize(
        existing.as_ref(),
        InitializeParams {
            admin: *admin.key,
            stake_mint: *stake_mint.key,
            reward_mint: *reward_mint.key,
            reward_rate: args.reward_rate,
            lockup_duration: args.lockup_duration,
            bump: config_bump,
        },
    )?;

    if stake_mint.owner != &spl_token::id() || reward_mint.owner != &spl_token::id() {
        return Err(StakingError::InvalidMint.into());
    }

    let (authority_pda, _) = find_vault_authority(program_id);
    assert_key(vault_authority, &authority_pda)?;

    let (stake_vault_pda, stake_vault_bump) = find_stake_vault(program_id);
    assert_key(stake_vault, &stake_vault_pda)?;
    let (reward_vault_pda, reward_vault_bump) = find_reward_vault(program_id);
    assert_key(reward_vault, &reward_vault_pda)?;

    create_vault(
        admin,
        stake_vault,
        stake_mint,
        &authority_pda,
        token_program,
        system_prog,
        &[STAKE_VAULT_SEED, &[stake_vault_bump]],
    )?;
    create_vault(
        admin,
        reward_vault,
        reward_mint,
        &authority_pda,
        token_program,
        system_prog,
        &[REWARD_VAULT_SEED, &[reward_vault_bump]],
    )?;

    create_pda_account(
        admin,
        ProgramConfig::SIZE,
        program_id,
        system_prog,
        config_account,
        &[CONFIG_SEED, &[config_bump]],
    )?;
    store_config(config_account, &config)?;

    msg!(
        "EVENT:StakingInitialized:{{\"admin\":\"{}\",\"reward_rate\":{},\"lockup_duration\":{}}}",
        admin.key,
        config.reward_rate,
        config.lockup_duration,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: Stake (discriminator 1)
// ---------------------------------------------------------------------------

fn process_stake(program_id: &Pubkey, accounts: &[AccountInfo], args: AmountArgs) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let owner = next_account_info(account_iter)?;
    let stake_account = next_account_info(account_iter)?;
    let config_account = next_account_info(account_iter)?;
    let stake_vault = next_account_info(account_iter)?;
    let owner_token = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;
    let system_prog = next_account_info(account_iter)?;

    assert_signer(owner)?;
    assert_writable(stake_account)?;
    assert_writable(config_account)?;
    assert_writable(stake_vault)?;
    assert_writable(owner_token)?;
    assert_token_program(token_program)?;

    let config = load_config(config_account, program_id)?;
    assert_key(stake_vault, &find_stake_vault(program_id).0)?;

    let (stake_pda, stake_bump) = find_stake_address(owner.key, program_id);
    assert_key(stake_account, &stake_pda)?;

    let existing = load_stake_record(stake_account, program_id)?;
    let transition = machine::stake(
        &config,
        existing.as_ref(),
        owner.key,
        args.amount,
        now()?,
        stake_bump,
    )?;

    ensure_transferable(owner_token, &config.stake_mint, args.amount)?;

    if existing.is_none() {
        create_pda_account(
            owner,
            StakeAccount::SIZE,
            program_id,
            system_prog,
            stake_account,
            &[STAKE_ACCOUNT_SEED, owner.key.as_ref(), &[stake_bump]],
        )?;
    }

    transfer_spl_tokens(owner_token, stake_vault, owner, token_program, args.amount, &[])?;

    if let AccountChange::Write(ref record) = transition.account {
        write_stake_record(stake_account, record)?;
    }
    store_config(config_account, &transition.config)?;

    msg!(
        "EVENT:Staked:{{\"owner\":\"{}\",\"amount\":{},\"total_staked\":{}}}",
        owner.key,
        args.amount,
        transition.config.total_staked,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: Unstake (discriminator 2)
// ---------------------------------------------------------------------------

fn process_unstake(program_id: &Pubkey, accounts: &[AccountInfo], args: AmountArgs) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let owner = next_account_info(account_iter)?;
    let stake_account = next_account_info(account_iter)?;
    let config_account = next_account_info(account_iter)?;
    let vault_authority = next_account_info(account_iter)?;
    let stake_vault = next_account_info(account_iter)?;
    let owner_token = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;

    assert_signer(owner)?;
    assert_writable(owner)?;
    assert_writable(stake_account)?;
    assert_writable(config_account)?;
    assert_writable(stake_vault)?;
    assert_writable(owner_token)?;
    assert_token_program(token_program)?;

    let config = load_config(config_account, program_id)?;
    let (authority_pda, authority_bump) = find_vault_authority(program_id);
    assert_key(vault_authority, &authority_pda)?;
    assert_key(stake_vault, &find_stake_vault(program_id).0)?;

    // Ownership is decided by the stored record so a stranger presenting
    // someone else's record gets `Unauthorized`, not a PDA mismatch.
    let existing = load_stake_record(stake_account, program_id)?;
    let transition = machine::unstake(&config, existing.as_ref(), owner.key, args.amount, now()?)?;
    assert_key(stake_account, &find_stake_address(owner.key, program_id).0)?;

    ensure_transferable(stake_vault, &config.stake_mint, args.amount)?;
    ensure_mint(owner_token, &config.stake_mint)?;

    transfer_spl_tokens(
        stake_vault,
        owner_token,
        vault_authority,
        token_program,
        args.amount,
        &[VAULT_AUTHORITY_SEED, &[authority_bump]],
    )?;

    let closed = match transition.account {
        AccountChange::Write(ref record) => {
            write_stake_record(stake_account, record)?;
            false
        }
        AccountChange::Close(_) => {
            close_stake_record(stake_account, owner)?;
            true
        }
    };
    store_config(config_account, &transition.config)?;

    msg!(
        "EVENT:Unstaked:{{\"owner\":\"{}\",\"amount\":{},\"total_staked\":{},\"closed\":{}}}",
        owner.key,
        args.amount,
        transition.config.total_staked,
        closed,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: ClaimReward (discriminator 3)
// ---------------------------------------------------------------------------

fn process_claim_reward(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let owner = next_account_info(account_iter)?;
    let stake_account = next_account_info(account_iter)?;
    let config_account = next_account_info(account_iter)?;
    let vault_authority = next_account_info(account_iter)?;
    let reward_vault = next_account_info(account_iter)?;
    let owner_reward_token = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;

    assert_signer(owner)?;
    assert_writable(owner)?;
    assert_writable(stake_account)?;
    assert_writable(reward_vault)?;
    assert_writable(owner_reward_token)?;
    assert_token_program(token_program)?;

    let config = load_config(config_account, program_id)?;
    let (authority_pda, authority_bump) = find_vault_authority(program_id);
    assert_key(vault_authority, &authority_pda)?;
    assert_key(reward_vault, &find_reward_vault(program_id).0)?;

    let existing = load_stake_record(stake_account, program_id)?;
    let transition = machine::claim_reward(&config, existing.as_ref(), owner.key, now()?)?;
    assert_key(stake_account, &find_stake_address(owner.key, program_id).0)?;

    let amount = transition.movement.amount();
    ensure_transferable(reward_vault, &config.reward_mint, amount)?;
    ensure_mint(owner_reward_token, &config.reward_mint)?;

    transfer_spl_tokens(
        reward_vault,
        owner_reward_token,
        vault_authority,
        token_program,
        amount,
        &[VAULT_AUTHORITY_SEED, &[authority_bump]],
    )?;

    match transition.account {
        AccountChange::Write(ref record) => write_stake_record(stake_account, record)?,
        AccountChange::Close(_) => close_stake_record(stake_account, owner)?,
    }

    msg!(
        "EVENT:RewardClaimed:{{\"owner\":\"{}\",\"amount\":{}}}",
        owner.key,
        amount,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Instructions: SetRewardRate / Pause / Unpause (discriminators 4-6)
// ---------------------------------------------------------------------------

fn admin_accounts<'a, 'b>(
    program_id: &Pubkey,
    accounts: &'a [AccountInfo<'b>],
) -> Result<(&'a AccountInfo<'b>, &'a AccountInfo<'b>, ProgramConfig), ProgramError> {
    let account_iter = &mut accounts.iter();
    let admin = next_account_info(account_iter)?;
    let config_account = next_account_info(account_iter)?;

    assert_signer(admin)?;
    assert_writable(config_account)?;
    let config = load_config(config_account, program_id)?;
    Ok((admin, config_account, config))
}

fn process_set_reward_rate(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: RewardRateArgs,
) -> ProgramResult {
    let (admin, config_account, config) = admin_accounts(program_id, accounts)?;

    let next = machine::set_reward_rate(&config, admin.key, args.new_rate)?;
    store_config(config_account, &next)?;

    msg!(
        "EVENT:RewardRateUpdated:{{\"admin\":\"{}\",\"old_rate\":{},\"new_rate\":{}}}",
        admin.key,
        config.reward_rate,
        next.reward_rate,
    );
    Ok(())
}

fn process_set_paused(program_id: &Pubkey, accounts: &[AccountInfo], paused: bool) -> ProgramResult {
    let (admin, config_account, config) = admin_accounts(program_id, accounts)?;

    let next = if paused {
        machine::pause(&config, admin.key)?
    } else {
        machine::unpause(&config, admin.key)?
    };
    store_config(config_account, &next)?;

    if paused {
        msg!("EVENT:StakingPaused:{{\"admin\":\"{}\"}}", admin.key);
    } else {
        msg!("EVENT:StakingUnpaused:{{\"admin\":\"{}\"}}", admin.key);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Instruction: FundRewards (discriminator 7)
// ---------------------------------------------------------------------------

fn process_fund_rewards(program_id: &Pubkey, accounts: &[AccountInfo], args: AmountArgs) -> ProgramResult {
    let account_iter = &mut accounts.iter();
    let admin = next_account_info(account_iter)?;
    let config_account = next_account_info(account_iter)?;
    let reward_vault = next_account_info(account_iter)?;
    let admin_token = next_account_info(account_iter)?;
    let token_program = next_account_info(account_iter)?;

    assert_signer(admin)?;
    assert_writable(reward_vault)?;
    assert_writable(admin_token)?;
    assert_token_program(token_program)?;

    let config = load_config(config_account, program_id)?;
    assert_key(reward_vault, &find_reward_vault(program_id).0)?;

    let movement = machine::fund_rewards(&config, admin.key, args.amount)?;
    ensure_transferable(admin_token, &config.reward_mint, movement.amount())?;

    transfer_spl_tokens(admin_token, reward_vault, admin, token_program, movement.amount(), &[])?;

    msg!(
        "EVENT:RewardsFunded:{{\"admin\":\"{}\",\"amount\":{}}}",
        admin.key,
        movement.amount(),
    );
    Ok(())
}

// StakeHersh — token interface.
//
// The program never owns token logic. Off-chain it drives any
// `TokenInterface`; on-chain it checks balances and CPIs into SPL Token.

use std::collections::HashMap;

use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
};

use crate::error::StakingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Token amount overflow")]
    Overflow,
}

/// Fungible-token primitives the staking core consumes.
pub trait TokenInterface {
    fn mint(&mut self, mint: &Pubkey, owner: &Pubkey, amount: u64) -> Result<(), TokenError>;
    fn transfer(
        &mut self,
        mint: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: u64,
    ) -> Result<(), TokenError>;
    fn burn(&mut self, mint: &Pubkey, owner: &Pubkey, amount: u64) -> Result<(), TokenError>;
    fn balance(&self, mint: &Pubkey, owner: &Pubkey) -> u64;
}

// ---------------------------------------------------------------------------
// In-memory ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct MemoryTokenLedger {
    balances: HashMap<(Pubkey, Pubkey), u64>,
    supply: HashMap<Pubkey, u64>,
}

impl MemoryTokenLedger {
    pub fn supply(&self, mint: &Pubkey) -> u64 {
        self.supply.get(mint).copied().unwrap_or(0)
    }
}

impl TokenInterface for MemoryTokenLedger {
    fn mint(&mut self, mint: &Pubkey, owner: &Pubkey, amount: u64) -> Result<(), TokenError> {
        let supply = self
            .supply(mint)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balance = self
            .balance(mint, owner)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.supply.insert(*mint, supply);
        self.balances.insert((*mint, *owner), balance);
        Ok(())
    }

    fn transfer(
        &mut self,
        mint: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: u64,
    ) -> Result<(), TokenError> {
        let source = self
            .balance(mint, from)
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientFunds)?;
        if from == to {
            return Ok(());
        }
        let destination = self
            .balance(mint, to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.balances.insert((*mint, *from), source);
        self.balances.insert((*mint, *to), destination);
        Ok(())
    }

    fn burn(&mut self, mint: &Pubkey, owner: &Pubkey, amount: u64) -> Result<(), TokenError> {
        let balance = self
            .balance(mint, owner)
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientFunds)?;
        let supply = self
            .supply(mint)
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientFunds)?;
        self.balances.insert((*mint, *owner), balance);
        self.supply.insert(*mint, supply);
        Ok(())
    }

    fn balance(&self, mint: &Pubkey, owner: &Pubkey) -> u64 {
        self.balances.get(&(*mint, *owner)).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// SPL Token (on-chain)
// ---------------------------------------------------------------------------

pub fn unpack_token_account(info: &AccountInfo) -> Result<spl_token::state::Account, ProgramError> {
    if info.owner != &spl_token::id() {
        return Err(StakingError::InvalidOwner.into());
    }
    spl_token::state::Account::unpack(&info.try_borrow_data()?)
}

/// Reject before the CPI when `source` cannot cover `amount` or holds the
/// wrong mint, so the caller sees `TransferFailed` rather than a token
/// program error.
pub fn ensure_transferable(source: &AccountInfo, mint: &Pubkey, amount: u64) -> ProgramResult {
    let account = unpack_token_account(source)?;
    if account.mint != *mint {
        return Err(StakingError::InvalidMint.into());
    }
    if account.amount < amount {
        return Err(StakingError::TransferFailed.into());
    }
    Ok(())
}

/// Destination must hold the expected mint.
pub fn ensure_mint(destination: &AccountInfo, mint: &Pubkey) -> ProgramResult {
    if unpack_token_account(destination)?.mint != *mint {
        return Err(StakingError::InvalidMint.into());
    }
    Ok(())
}

/// Transfer SPL tokens between token accounts.
pub fn transfer_spl_tokens<'a>(
    source: &AccountInfo<'a>,
    destination: &AccountInfo<'a>,
    authority: &AccountInfo<'a>,
    token_program: &AccountInfo<'a>,
    amount: u64,
    signer_seeds: &[&[u8]],
) -> ProgramResult {
    let ix = spl_token::instruction::transfer(
        token_program.key,
        source.key,
        destination.key,
        authority.key,
        &[],
        amount,
    )?;

    let account_infos = [
        source.clone(),
        destination.clone(),
        authority.clone(),
        token_program.clone(),
    ];

    if signer_seeds.is_empty() {
        invoke(&ix, &account_infos)
    } else {
        invoke_signed(&ix, &account_infos, &[signer_seeds])
    }
}

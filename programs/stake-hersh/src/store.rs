// StakeHersh — stake account store.
//
// On-chain each owner's record lives in its own PDA; the in-memory store
// backs the in-process executor. Both apply a staged `AccountChange` as a
// single write per key.

use std::collections::HashMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo, entrypoint::ProgramResult, program_error::ProgramError,
    pubkey::Pubkey, system_program,
};

use crate::error::StakingError;
use crate::machine::AccountChange;
use crate::state::StakeAccount;

pub trait StakeStore {
    fn load(&self, owner: &Pubkey) -> Option<StakeAccount>;
    fn save(&mut self, account: StakeAccount);
    fn remove(&mut self, owner: &Pubkey) -> Option<StakeAccount>;

    fn apply(&mut self, change: AccountChange) {
        match change {
            AccountChange::Write(account) => self.save(account),
            AccountChange::Close(owner) => {
                self.remove(&owner);
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStakeStore {
    accounts: HashMap<Pubkey, StakeAccount>,
}

impl MemoryStakeStore {
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Sum of every record's principal; must equal the stake vault balance.
    pub fn total_staked(&self) -> u128 {
        self.accounts.values().map(|a| a.staked_amount as u128).sum()
    }
}

impl StakeStore for MemoryStakeStore {
    fn load(&self, owner: &Pubkey) -> Option<StakeAccount> {
        self.accounts.get(owner).cloned()
    }

    fn save(&mut self, account: StakeAccount) {
        self.accounts.insert(account.owner, account);
    }

    fn remove(&mut self, owner: &Pubkey) -> Option<StakeAccount> {
        self.accounts.remove(owner)
    }
}

// ---------------------------------------------------------------------------
// On-chain records
// ---------------------------------------------------------------------------

/// `None` when the PDA has not been created yet.
pub fn load_stake_record(
    info: &AccountInfo,
    program_id: &Pubkey,
) -> Result<Option<StakeAccount>, ProgramError> {
    if info.data_is_empty() {
        return Ok(None);
    }
    if info.owner != program_id {
        return Err(StakingError::InvalidOwner.into());
    }
    let account = StakeAccount::try_from_slice(&info.try_borrow_data()?)?;
    Ok(Some(account))
}

pub fn write_stake_record(info: &AccountInfo, account: &StakeAccount) -> ProgramResult {
    account.serialize(&mut &mut info.try_borrow_mut_data()?[..])?;
    Ok(())
}

/// Return the rent to `destination` and hand the account back to the
/// system program with no data.
pub fn close_stake_record<'a>(info: &AccountInfo<'a>, destination: &AccountInfo<'a>) -> ProgramResult {
    let lamports = info.lamports();
    **destination.try_borrow_mut_lamports()? = destination
        .lamports()
        .checked_add(lamports)
        .ok_or(StakingError::Overflow)?;
    **info.try_borrow_mut_lamports()? = 0;

    info.assign(&system_program::id());
    info.realloc(0, false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(staked: u64) -> StakeAccount {
        let mut account = StakeAccount::new(Pubkey::new_unique(), 0, 255);
        account.staked_amount = staked;
        account
    }

    #[test]
    fn test_apply_write_and_close() {
        let mut store = MemoryStakeStore::default();
        let a = record(10);
        let b = record(32);

        store.apply(AccountChange::Write(a.clone()));
        store.apply(AccountChange::Write(b.clone()));
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_staked(), 42);
        assert_eq!(store.load(&a.owner), Some(a.clone()));

        store.apply(AccountChange::Close(a.owner));
        assert_eq!(store.load(&a.owner), None);
        assert_eq!(store.total_staked(), 32);
    }

    #[test]
    fn test_save_replaces_per_owner() {
        let mut store = MemoryStakeStore::default();
        let mut a = record(10);
        store.save(a.clone());
        a.staked_amount = 11;
        store.save(a.clone());
        assert_eq!(store.len(), 1);
        assert_eq!(store.load(&a.owner).unwrap().staked_amount, 11);
    }

    #[test]
    fn test_load_stake_record() {
        let program_id = Pubkey::new_unique();
        let key = Pubkey::new_unique();
        let account = record(77);

        let mut lamports = 1_000_000;
        let mut data = borsh::to_vec(&account).unwrap();
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &program_id, false, 0);
        assert_eq!(load_stake_record(&info, &program_id).unwrap(), Some(account.clone()));

        let foreign = Pubkey::new_unique();
        let mut lamports = 1_000_000;
        let mut data = borsh::to_vec(&account).unwrap();
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &foreign, false, 0);
        assert_eq!(
            load_stake_record(&info, &program_id),
            Err(StakingError::InvalidOwner.into())
        );

        let mut lamports = 0;
        let mut data: Vec<u8> = vec![];
        let system = system_program::id();
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &system, false, 0);
        assert_eq!(load_stake_record(&info, &program_id).unwrap(), None);
    }

    #[test]
    fn test_write_stake_record() {
        let program_id = Pubkey::new_unique();
        let key = Pubkey::new_unique();
        let account = record(5);

        let mut lamports = 1_000_000;
        let mut data = vec![0u8; StakeAccount::SIZE];
        let info = AccountInfo::new(&key, false, true, &mut lamports, &mut data, &program_id, false, 0);
        write_stake_record(&info, &account).unwrap();
        assert_eq!(load_stake_record(&info, &program_id).unwrap(), Some(account));
    }
}

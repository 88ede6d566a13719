// StakeHersh — reward accrual.
//
// accrued = staked_amount * reward_rate * elapsed / RATE_SCALE
//
// All math is integer u128 with checked operations, so results are identical
// on every validator. The remainder below one whole reward unit is carried on
// the stake account instead of being truncated away.

use crate::error::StakingError;
use crate::state::StakeAccount;

/// Fixed-point scale of `reward_rate` (1e9, matching 9-decimal mints).
pub const RATE_SCALE: u128 = 1_000_000_000;

/// Upper bound on `reward_rate`: 1000 reward units per staked unit per second.
pub const MAX_REWARD_RATE: u64 = 1_000 * RATE_SCALE as u64;

/// Seconds between two clock readings. A regressing clock is fatal.
pub fn elapsed_seconds(since: i64, now: i64) -> Result<u64, StakingError> {
    if now < since {
        return Err(StakingError::ClockError);
    }
    let delta = now.checked_sub(since).ok_or(StakingError::Overflow)?;
    u64::try_from(delta).map_err(|_| StakingError::ClockError)
}

/// Reward earned over `elapsed` seconds, still scaled by `RATE_SCALE`.
pub fn accrued_scaled(
    staked_amount: u64,
    reward_rate: u64,
    elapsed: u64,
) -> Result<u128, StakingError> {
    (staked_amount as u128)
        .checked_mul(reward_rate as u128)
        .ok_or(StakingError::Overflow)?
        .checked_mul(elapsed as u128)
        .ok_or(StakingError::Overflow)
}

/// Bring `account` up to `now`: fold the reward earned since the last update
/// into `pending_reward` and advance `last_update_time`.
///
/// Must run before any change to `staked_amount`, so the interval is priced
/// at the balance that was actually in force. Returns the whole units added.
pub fn settle(account: &mut StakeAccount, reward_rate: u64, now: i64) -> Result<u64, StakingError> {
    let elapsed = elapsed_seconds(account.last_update_time, now)?;

    let scaled = accrued_scaled(account.staked_amount, reward_rate, elapsed)?
        .checked_add(account.reward_carry as u128)
        .ok_or(StakingError::Overflow)?;

    let accrued = u64::try_from(scaled / RATE_SCALE).map_err(|_| StakingError::Overflow)?;
    let carry = (scaled % RATE_SCALE) as u64;

    account.pending_reward = account
        .pending_reward
        .checked_add(accrued)
        .ok_or(StakingError::Overflow)?;
    account.reward_carry = carry;
    account.last_update_time = now;

    Ok(accrued)
}

/// `settle`, except a reward that no longer fits in `u64` pins
/// `pending_reward` at `u64::MAX` instead of failing. Used on withdrawal so
/// principal can always leave.
pub fn settle_saturating(
    account: &mut StakeAccount,
    reward_rate: u64,
    now: i64,
) -> Result<u64, StakingError> {
    match settle(account, reward_rate, now) {
        Err(StakingError::Overflow) => {
            let added = u64::MAX - account.pending_reward;
            account.pending_reward = u64::MAX;
            account.reward_carry = 0;
            account.last_update_time = now;
            Ok(added)
        }
        other => other,
    }
}

/// Pending reward `account` would have if settled at `now`, without mutating it.
pub fn pending_at(account: &StakeAccount, reward_rate: u64, now: i64) -> Result<u64, StakingError> {
    let mut preview = account.clone();
    settle(&mut preview, reward_rate, now)?;
    Ok(preview.pending_reward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_program::pubkey::Pubkey;

    const ONE_PER_SECOND: u64 = RATE_SCALE as u64;

    /// Whole reward units earned over `elapsed` seconds, remainder discarded.
    fn accrue(staked_amount: u64, reward_rate: u64, elapsed: u64) -> Result<u64, StakingError> {
        let scaled = accrued_scaled(staked_amount, reward_rate, elapsed)?;
        u64::try_from(scaled / RATE_SCALE).map_err(|_| StakingError::Overflow)
    }

    #[test]
    fn test_accrue_unit_rate() {
        // 100 staked at 1 unit/unit/s for 10s
        assert_eq!(accrue(100, ONE_PER_SECOND, 10).unwrap(), 1_000);
        assert_eq!(accrue(0, ONE_PER_SECOND, 10).unwrap(), 0);
        assert_eq!(accrue(100, 0, 10).unwrap(), 0);
        assert_eq!(accrue(100, ONE_PER_SECOND, 0).unwrap(), 0);
    }

    #[test]
    fn test_accrue_fractional_rate() {
        // 0.5 unit per unit per second
        assert_eq!(accrue(3, ONE_PER_SECOND / 2, 1).unwrap(), 1);
        assert_eq!(accrue(3, ONE_PER_SECOND / 2, 2).unwrap(), 3);
    }

    #[test]
    fn test_accrue_overflow() {
        assert_eq!(
            accrued_scaled(u64::MAX, u64::MAX, u64::MAX),
            Err(StakingError::Overflow)
        );
        // Fits in u128 but not in u64 once descaled.
        assert_eq!(
            accrue(u64::MAX, u64::MAX, 1),
            Err(StakingError::Overflow)
        );
    }

    #[test]
    fn test_elapsed_seconds() {
        assert_eq!(elapsed_seconds(100, 100).unwrap(), 0);
        assert_eq!(elapsed_seconds(100, 160).unwrap(), 60);
        assert_eq!(elapsed_seconds(-10, 10).unwrap(), 20);
        assert_eq!(elapsed_seconds(100, 99), Err(StakingError::ClockError));
    }

    #[test]
    fn test_settle_accumulates_and_advances() {
        let mut account = StakeAccount::new(Pubkey::new_unique(), 0, 255);
        account.staked_amount = 100;

        assert_eq!(settle(&mut account, ONE_PER_SECOND, 10).unwrap(), 1_000);
        assert_eq!(account.pending_reward, 1_000);
        assert_eq!(account.last_update_time, 10);

        assert_eq!(settle(&mut account, ONE_PER_SECOND, 15).unwrap(), 500);
        assert_eq!(account.pending_reward, 1_500);
        assert_eq!(account.last_update_time, 15);
    }

    #[test]
    fn test_settle_carries_remainder() {
        // 1 staked at 0.4/s: three one-second settlements must match one
        // three-second settlement once the carry is accounted for.
        let rate = ONE_PER_SECOND * 4 / 10;
        let mut stepwise = StakeAccount::new(Pubkey::new_unique(), 0, 255);
        stepwise.staked_amount = 1;
        for t in 1..=3 {
            settle(&mut stepwise, rate, t).unwrap();
        }

        let mut single = StakeAccount::new(Pubkey::new_unique(), 0, 255);
        single.staked_amount = 1;
        settle(&mut single, rate, 3).unwrap();

        assert_eq!(stepwise.pending_reward, single.pending_reward);
        assert_eq!(stepwise.reward_carry, single.reward_carry);
        assert_eq!(single.pending_reward, 1);
        assert_eq!(single.reward_carry, 200_000_000);
    }

    #[test]
    fn test_settle_rejects_clock_regression() {
        let mut account = StakeAccount::new(Pubkey::new_unique(), 50, 255);
        account.staked_amount = 10;
        let before = account.clone();

        assert_eq!(
            settle(&mut account, ONE_PER_SECOND, 49),
            Err(StakingError::ClockError)
        );
        assert_eq!(account, before);
    }

    #[test]
    fn test_pending_at_does_not_mutate() {
        let mut account = StakeAccount::new(Pubkey::new_unique(), 0, 255);
        account.staked_amount = 7;
        assert_eq!(pending_at(&account, ONE_PER_SECOND, 3).unwrap(), 21);
        assert_eq!(account.pending_reward, 0);
        assert_eq!(account.last_update_time, 0);
    }

    #[test]
    fn test_settle_saturating_pins_pending() {
        let mut account = StakeAccount::new(Pubkey::new_unique(), 0, 255);
        account.staked_amount = u64::MAX;
        account.pending_reward = u64::MAX - 5;
        account.reward_carry = 7;

        let mut strict = account.clone();
        assert_eq!(
            settle(&mut strict, MAX_REWARD_RATE, 10),
            Err(StakingError::Overflow)
        );

        assert_eq!(settle_saturating(&mut account, MAX_REWARD_RATE, 10).unwrap(), 5);
        assert_eq!(account.pending_reward, u64::MAX);
        assert_eq!(account.reward_carry, 0);
        assert_eq!(account.last_update_time, 10);
    }

    #[test]
    fn test_settle_saturating_matches_settle_in_range() {
        let mut a = StakeAccount::new(Pubkey::new_unique(), 0, 255);
        a.staked_amount = 1;
        let mut b = a.clone();
        settle(&mut a, ONE_PER_SECOND * 2 / 5, 3).unwrap();
        settle_saturating(&mut b, ONE_PER_SECOND * 2 / 5, 3).unwrap();
        assert_eq!(a, b);

        assert_eq!(
            settle_saturating(&mut b, ONE_PER_SECOND, 2),
            Err(StakingError::ClockError)
        );
    }
}

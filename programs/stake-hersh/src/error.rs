// StakeHersh — error taxonomy.
//
// Every variant maps to a stable `ProgramError::Custom` code equal to its
// position in this enum, so clients can branch on the cause.

use solana_program::program_error::ProgramError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StakingError {
    #[error("Program already initialized")]
    AlreadyInitialized,
    #[error("Unauthorized signer")]
    Unauthorized,
    #[error("Amount must be greater than zero")]
    InvalidAmount,
    #[error("Program is paused")]
    ProgramPaused,
    #[error("Insufficient stake balance")]
    InsufficientStake,
    #[error("Lock-up period has not expired")]
    LockupNotExpired,
    #[error("Stake account not found")]
    AccountNotFound,
    #[error("No rewards to claim")]
    NothingToClaim,
    #[error("Token transfer failed")]
    TransferFailed,
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Clock moved backwards")]
    ClockError,
    #[error("Program not initialized")]
    NotInitialized,
    #[error("Invalid instruction discriminator")]
    InvalidInstruction,
    #[error("Invalid PDA derivation")]
    InvalidPDA,
    #[error("Account not writable")]
    AccountNotWritable,
    #[error("Account not signer")]
    AccountNotSigner,
    #[error("Invalid account owner")]
    InvalidOwner,
    #[error("Token account or mint does not match the program config")]
    InvalidMint,
}

impl StakingError {
    const ALL: [StakingError; 18] = [
        StakingError::AlreadyInitialized,
        StakingError::Unauthorized,
        StakingError::InvalidAmount,
        StakingError::ProgramPaused,
        StakingError::InsufficientStake,
        StakingError::LockupNotExpired,
        StakingError::AccountNotFound,
        StakingError::NothingToClaim,
        StakingError::TransferFailed,
        StakingError::Overflow,
        StakingError::ClockError,
        StakingError::NotInitialized,
        StakingError::InvalidInstruction,
        StakingError::InvalidPDA,
        StakingError::AccountNotWritable,
        StakingError::AccountNotSigner,
        StakingError::InvalidOwner,
        StakingError::InvalidMint,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    /// Decode a `ProgramError::Custom` code returned by the program.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

impl From<StakingError> for ProgramError {
    fn from(e: StakingError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

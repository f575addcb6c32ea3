use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the lottery program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum LotteryError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstruction,

    /// Payment is below the configured entry fee
    #[error("Payment is below the entry fee")]
    InsufficientPayment,

    /// Entries are closed while a settlement is outstanding
    #[error("Lottery is not open")]
    NotOpen,

    /// Upkeep is not needed: the lottery is not open, the interval has not
    /// elapsed, or there is nothing to settle
    #[error("Trigger conditions not met")]
    TriggerConditionsNotMet,

    /// The pool could not be moved to the winner
    #[error("Payout to winner failed")]
    PayoutFailed,

    /// Entrant index past the end of the entrant table
    #[error("Entrant index out of range")]
    IndexOutOfRange,

    /// The entrant table has no free slot left this round
    #[error("Lottery is full")]
    LotteryFull,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    /// Fulfillment signed by someone other than the configured oracle
    #[error("Only the oracle authority can fulfill randomness")]
    UnauthorizedOracle,
}

impl From<LotteryError> for ProgramError {
    fn from(e: LotteryError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for LotteryError {
    fn type_of() -> &'static str {
        "Lottery Error"
    }
}

impl PrintProgramError for LotteryError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    entrypoint::ProgramResult, log::sol_log_data, msg, program_error::ProgramError, pubkey::Pubkey,
};

use crate::utils::lamports_to_sol;

/// Events published by the lottery for operators and monitors.
///
/// Each event is logged twice: once as a readable `msg!` line and once as
/// a `Program data:` record holding the borsh-encoded event.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum LotteryEvent {
    EntryRecorded {
        participant: Pubkey,
        entrant_count: u32,
    },
    SettlementRequested {
        request_id: u64,
    },
    WinnerPicked {
        winner: Pubkey,
        amount: u64,
    },
}

impl LotteryEvent {
    pub fn emit(&self) -> ProgramResult {
        match self {
            LotteryEvent::EntryRecorded {
                participant,
                entrant_count,
            } => msg!("EntryRecorded: {} (entrant #{})", participant, entrant_count),
            LotteryEvent::SettlementRequested { request_id } => {
                msg!("SettlementRequested: request {}", request_id)
            }
            LotteryEvent::WinnerPicked { winner, amount } => msg!(
                "WinnerPicked: {} wins {} SOL",
                winner,
                lamports_to_sol(*amount)
            ),
        }
        let data = self
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        sol_log_data(&[data.as_slice()]);
        Ok(())
    }
}

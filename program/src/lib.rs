// Keeper Lottery
// A periodically settled lottery on Solana: players enter while the round is
// open, a keeper closes it once the interval has passed, and an oracle's
// random word picks the winner who takes the whole pool.

pub mod custody;
pub mod engine;
pub mod error;
pub mod events;
pub mod instruction;
pub mod oracle;
pub mod processor;
pub mod state;
pub mod utils;

#[cfg(not(feature = "no-entrypoint"))]
pub mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}

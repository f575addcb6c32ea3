use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::{error::LotteryError, oracle::RandomWord, state::LotteryConfig, utils};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum LotteryInstruction {
    /// Create the lottery and open the first round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The admin paying for the lottery account
    /// 1. `[writable]` The lottery account (PDA of `["lottery", admin]`)
    /// 2. `[]` The oracle authority allowed to deliver randomness
    /// 3. `[]` The system program
    InitializeLottery {
        /// Minimum lamports per entry
        entry_fee: u64,
        /// Seconds between settlements
        interval: UnixTimestamp,
        /// Compute budget forwarded to the oracle
        callback_gas_limit: u32,
        /// Oracle routing key
        routing_key: [u8; 32],
        /// Oracle billing subscription
        subscription_id: u64,
    },

    /// Enter the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player paying the entry
    /// 1. `[writable]` The lottery account
    /// 2. `[]` The system program
    Enter {
        /// Lamports paid, at least the entry fee
        amount: u64,
    },

    /// Report whether settlement is due. Read-only; the `TriggerCheck` is
    /// published as return data.
    ///
    /// Accounts expected:
    /// 0. `[]` The lottery account
    CheckUpkeep,

    /// Close entry and request randomness (anyone can call this)
    ///
    /// Accounts expected:
    /// 0. `[writable]` The lottery account
    PerformUpkeep,

    /// Deliver the oracle's answer and pay the winner
    ///
    /// Accounts expected:
    /// 0. `[signer]` The oracle authority
    /// 1. `[writable]` The lottery account
    /// 2. `[writable]` The winning entrant
    FulfillRandomness {
        request_id: u64,
        random_word: RandomWord,
    },
}

impl LotteryInstruction {
    /// Unpacks a byte buffer into a LotteryInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| LotteryError::InvalidInstruction.into())
    }
}

/// Create initialize_lottery instruction
pub fn initialize_lottery(
    program_id: &Pubkey,
    admin: &Pubkey,
    oracle_authority: &Pubkey,
    config: &LotteryConfig,
) -> Instruction {
    let (lottery, _) = utils::find_lottery_address(program_id, admin);
    Instruction::new_with_borsh(
        *program_id,
        &LotteryInstruction::InitializeLottery {
            entry_fee: config.entry_fee,
            interval: config.interval,
            callback_gas_limit: config.callback_gas_limit,
            routing_key: config.routing_key,
            subscription_id: config.subscription_id,
        },
        vec![
            AccountMeta::new(*admin, true),
            AccountMeta::new(lottery, false),
            AccountMeta::new_readonly(*oracle_authority, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    )
}

/// Create enter instruction
pub fn enter(program_id: &Pubkey, player: &Pubkey, lottery: &Pubkey, amount: u64) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &LotteryInstruction::Enter { amount },
        vec![
            AccountMeta::new(*player, true),
            AccountMeta::new(*lottery, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    )
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, lottery: &Pubkey) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &LotteryInstruction::CheckUpkeep,
        vec![AccountMeta::new_readonly(*lottery, false)],
    )
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(program_id: &Pubkey, lottery: &Pubkey) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &LotteryInstruction::PerformUpkeep,
        vec![AccountMeta::new(*lottery, false)],
    )
}

/// Create fulfill_randomness instruction
pub fn fulfill_randomness(
    program_id: &Pubkey,
    oracle_authority: &Pubkey,
    lottery: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_word: RandomWord,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &LotteryInstruction::FulfillRandomness {
            request_id,
            random_word,
        },
        vec![
            AccountMeta::new_readonly(*oracle_authority, true),
            AccountMeta::new(*lottery, false),
            AccountMeta::new(*winner, false),
        ],
    )
}

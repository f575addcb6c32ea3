// Lottery program - Instruction Processor
use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::UnixTimestamp,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction, system_program,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

use crate::{
    custody::LamportVault,
    engine::LotteryEngine,
    error::LotteryError,
    instruction::LotteryInstruction,
    oracle::{RandomWord, RequestLog},
    state::{Lottery, LotteryConfig},
    utils::{self, LOTTERY_SEED},
};

/// Program state handler.
pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = LotteryInstruction::unpack(instruction_data)?;

        match instruction {
            LotteryInstruction::InitializeLottery {
                entry_fee,
                interval,
                callback_gas_limit,
                routing_key,
                subscription_id,
            } => {
                msg!("Instruction: Initialize Lottery");
                let config = LotteryConfig {
                    entry_fee,
                    interval,
                    callback_gas_limit,
                    routing_key,
                    subscription_id,
                };
                Self::process_initialize_lottery(accounts, config, program_id)
            }
            LotteryInstruction::Enter { amount } => {
                msg!("Instruction: Enter");
                Self::process_enter(accounts, amount, program_id)
            }
            LotteryInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(accounts, program_id)
            }
            LotteryInstruction::PerformUpkeep => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, program_id)
            }
            LotteryInstruction::FulfillRandomness {
                request_id,
                random_word,
            } => {
                msg!("Instruction: Fulfill Randomness");
                Self::process_fulfill_randomness(accounts, request_id, random_word, program_id)
            }
        }
    }

    fn process_initialize_lottery(
        accounts: &[AccountInfo],
        config: LotteryConfig,
        program_id: &Pubkey,
    ) -> ProgramResult {
        // Get accounts
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let oracle_authority_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        // Verify admin is signer
        if !admin_info.is_signer {
            msg!("Admin must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *system_program_info.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }
        if config.entry_fee == 0 {
            msg!("Entry fee must be greater than zero");
            return Err(ProgramError::InvalidArgument);
        }
        if config.interval < 0 {
            msg!("Interval cannot be negative");
            return Err(ProgramError::InvalidArgument);
        }

        let (expected_lottery_pubkey, bump_seed) =
            utils::find_lottery_address(program_id, admin_info.key);
        if *lottery_info.key != expected_lottery_pubkey {
            msg!("Invalid lottery account address");
            return Err(ProgramError::InvalidArgument);
        }

        if lottery_info.owner == program_id {
            if Lottery::unpack_unchecked(&lottery_info.data.borrow())?.is_initialized {
                msg!("Lottery account is already initialized");
                return Err(ProgramError::AccountAlreadyInitialized);
            }
        } else {
            let rent_lamports = Rent::get()?.minimum_balance(Lottery::LEN);
            let bump = [bump_seed];
            let signer_seeds: &[&[u8]] = &[LOTTERY_SEED, admin_info.key.as_ref(), &bump];

            if lottery_info.lamports() == 0 {
                msg!("Creating new lottery account");
                invoke_signed(
                    &system_instruction::create_account(
                        admin_info.key,
                        lottery_info.key,
                        rent_lamports,
                        Lottery::LEN as u64,
                        program_id,
                    ),
                    &[
                        admin_info.clone(),
                        lottery_info.clone(),
                        system_program_info.clone(),
                    ],
                    &[signer_seeds],
                )?;
            } else {
                // create_account refuses a funded address, so build it up step by step
                msg!(
                    "Lottery address already holds {} lamports, claiming it",
                    lottery_info.lamports()
                );
                let shortfall = rent_lamports.saturating_sub(lottery_info.lamports());
                if shortfall > 0 {
                    invoke(
                        &system_instruction::transfer(admin_info.key, lottery_info.key, shortfall),
                        &[
                            admin_info.clone(),
                            lottery_info.clone(),
                            system_program_info.clone(),
                        ],
                    )?;
                }
                invoke_signed(
                    &system_instruction::allocate(lottery_info.key, Lottery::LEN as u64),
                    &[lottery_info.clone(), system_program_info.clone()],
                    &[signer_seeds],
                )?;
                invoke_signed(
                    &system_instruction::assign(lottery_info.key, program_id),
                    &[lottery_info.clone(), system_program_info.clone()],
                    &[signer_seeds],
                )?;
            }
        }

        let now = Clock::get()?.unix_timestamp;
        let lottery = Lottery::new(
            *admin_info.key,
            *oracle_authority_info.key,
            config,
            bump_seed,
            now,
        );
        Lottery::pack(lottery, &mut lottery_info.data.borrow_mut())?;

        msg!(
            "Lottery initialized: EntryFee={} SOL, Interval={}s, Oracle={}",
            utils::lamports_to_sol(config.entry_fee),
            config.interval,
            oracle_authority_info.key
        );
        Ok(())
    }

    fn process_enter(accounts: &[AccountInfo], amount: u64, program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        // Verify player is signer
        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        let mut lottery = Self::load_lottery(lottery_info, program_id)?;

        // Record the entry
        let event = LotteryEngine::new(&mut lottery).enter(*player_info.key, amount)?;

        // Payment lands in the lottery account in the same instruction, so a
        // failed transfer reverts the recorded entry as well.
        invoke(
            &system_instruction::transfer(player_info.key, lottery_info.key, amount),
            &[
                player_info.clone(),
                lottery_info.clone(),
                system_program_info.clone(),
            ],
        )?;
        Lottery::pack(lottery, &mut lottery_info.data.borrow_mut())?;

        event.emit()
    }

    fn process_check_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let lottery_info = next_account_info(account_info_iter)?;

        let lottery = Self::load_lottery(lottery_info, program_id)?;
        let check = lottery.check_trigger(Self::now()?);

        msg!(
            "Upkeep needed: {} (open={}, time_passed={}, has_balance={}, has_players={})",
            check.trigger_due,
            check.diagnostics.is_open,
            check.diagnostics.time_passed,
            check.diagnostics.has_balance,
            check.diagnostics.has_players
        );
        let data = check
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        set_return_data(&data);
        Ok(())
    }

    fn process_perform_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let lottery_info = next_account_info(account_info_iter)?;

        let mut lottery = Self::load_lottery(lottery_info, program_id)?;
        let mut oracle = RequestLog::new(lottery.last_request_id);

        let event = LotteryEngine::new(&mut lottery).request_settlement(Self::now()?, &mut oracle)?;
        Lottery::pack(lottery, &mut lottery_info.data.borrow_mut())?;

        // Publish the request for the oracle nodes
        event.emit()?;
        for request in oracle.drain() {
            request.emit()?;
        }
        Ok(())
    }

    fn process_fulfill_randomness(
        accounts: &[AccountInfo],
        request_id: u64,
        random_word: RandomWord,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let oracle_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        // Only the configured oracle may answer
        if !oracle_info.is_signer {
            msg!("Oracle authority must sign the fulfillment");
            return Err(ProgramError::MissingRequiredSignature);
        }
        let mut lottery = Self::load_lottery(lottery_info, program_id)?;
        if lottery.oracle_authority != *oracle_info.key {
            msg!("{} is not the oracle authority of this lottery", oracle_info.key);
            return Err(LotteryError::UnauthorizedOracle.into());
        }

        let rent_floor = Rent::get()?.minimum_balance(lottery_info.data_len());
        let mut vault = LamportVault::new(lottery_info, winner_info, rent_floor);
        // Pick the winner and pay out
        let settled = LotteryEngine::new(&mut lottery).fulfill_randomness(
            request_id,
            &random_word,
            Self::now()?,
            &mut vault,
        )?;

        match settled {
            Some(event) => {
                Lottery::pack(lottery, &mut lottery_info.data.borrow_mut())?;
                event.emit()
            }
            None => {
                msg!("Request {} is not pending, fulfillment ignored", request_id);
                Ok(())
            }
        }
    }

    fn load_lottery(lottery_info: &AccountInfo, program_id: &Pubkey) -> Result<Lottery, ProgramError> {
        if lottery_info.owner != program_id {
            msg!("Lottery account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        Lottery::unpack(&lottery_info.data.borrow())
    }

    fn now() -> Result<UnixTimestamp, ProgramError> {
        Ok(Clock::get()?.unix_timestamp)
    }
}

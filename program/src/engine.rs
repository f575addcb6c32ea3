// Lottery state machine
//
//   OPEN --request_settlement--> SETTLING --fulfill_randomness--> OPEN
//
// Every mutating operation validates and runs all fallible steps before
// touching the lottery, so a failed call leaves it exactly as it was.
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::{
    custody::FundsCustody,
    error::LotteryError,
    events::LotteryEvent,
    oracle::{RandomWord, RandomnessOracle, RequestParams},
    state::{Lottery, LotteryStatus, MAX_ENTRANTS, NUM_WORDS, REQUEST_CONFIRMATIONS},
};

/// Why upkeep is or is not needed
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepDiagnostics {
    pub is_open: bool,
    pub time_passed: bool,
    pub has_balance: bool,
    pub has_players: bool,
    /// Seconds since the current window opened
    pub elapsed: i64,
}

/// Result of polling the lottery for settlement
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriggerCheck {
    pub trigger_due: bool,
    pub diagnostics: UpkeepDiagnostics,
}

/// Read-only view for operators and monitors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LotterySnapshot {
    pub status: LotteryStatus,
    pub pool: u64,
    pub entrant_count: usize,
    pub interval: UnixTimestamp,
    pub entry_fee: u64,
    pub last_settlement_timestamp: UnixTimestamp,
    pub recent_winner: Pubkey,
    pub rounds_settled: u64,
}

/// Maps a random word onto an entrant index.
///
/// Plain modulo: when `entrant_count` does not divide 2^256 the low indices
/// are favoured by at most one part in 2^256 / entrant_count. With at most
/// `MAX_ENTRANTS` entrants that bias is negligible and accepted as is.
pub fn winner_index(random_word: &RandomWord, entrant_count: usize) -> usize {
    random_word.modulo(entrant_count as u64) as usize
}

impl Lottery {
    /// Pure read: safe to poll as often as the trigger likes.
    pub fn check_trigger(&self, now: UnixTimestamp) -> TriggerCheck {
        let elapsed = now.saturating_sub(self.last_settlement_timestamp);
        let diagnostics = UpkeepDiagnostics {
            is_open: self.is_open(),
            time_passed: elapsed >= self.config.interval,
            has_balance: self.pool > 0,
            has_players: !self.entrants.is_empty(),
            elapsed,
        };
        TriggerCheck {
            trigger_due: diagnostics.is_open
                && diagnostics.time_passed
                && diagnostics.has_balance
                && diagnostics.has_players,
            diagnostics,
        }
    }

    pub fn snapshot(&self) -> LotterySnapshot {
        LotterySnapshot {
            status: self.status,
            pool: self.pool,
            entrant_count: self.entrants.len(),
            interval: self.config.interval,
            entry_fee: self.config.entry_fee,
            last_settlement_timestamp: self.last_settlement_timestamp,
            recent_winner: self.recent_winner,
            rounds_settled: self.rounds_settled,
        }
    }

    pub fn entrant(&self, index: usize) -> Result<Pubkey, LotteryError> {
        self.entrants
            .get(index)
            .copied()
            .ok_or(LotteryError::IndexOutOfRange)
    }
}

/// Drives one lottery through its rounds. Holding `&mut Lottery` makes every
/// mutation exclusive for the lifetime of the engine.
pub struct LotteryEngine<'a> {
    lottery: &'a mut Lottery,
}

impl<'a> LotteryEngine<'a> {
    pub fn new(lottery: &'a mut Lottery) -> Self {
        Self { lottery }
    }

    pub fn lottery(&self) -> &Lottery {
        &*self.lottery
    }

    /// Records one entry paid with `amount_paid` lamports.
    pub fn enter(
        &mut self,
        participant: Pubkey,
        amount_paid: u64,
    ) -> Result<LotteryEvent, LotteryError> {
        if amount_paid < self.lottery.config.entry_fee {
            return Err(LotteryError::InsufficientPayment);
        }
        if !self.lottery.is_open() {
            return Err(LotteryError::NotOpen);
        }
        if self.lottery.entrants.len() >= MAX_ENTRANTS {
            return Err(LotteryError::LotteryFull);
        }
        let pool = self
            .lottery
            .pool
            .checked_add(amount_paid)
            .ok_or(LotteryError::ArithmeticOverflow)?;

        self.lottery.pool = pool;
        self.lottery.entrants.push(participant);
        Ok(LotteryEvent::EntryRecorded {
            participant,
            entrant_count: self.lottery.entrants.len() as u32,
        })
    }

    pub fn check_trigger(&self, now: UnixTimestamp) -> TriggerCheck {
        self.lottery.check_trigger(now)
    }

    /// Closes entry and asks the oracle for randomness. The trigger
    /// conditions are checked again here; a caller's earlier read is not
    /// trusted.
    pub fn request_settlement<O: RandomnessOracle + ?Sized>(
        &mut self,
        now: UnixTimestamp,
        oracle: &mut O,
    ) -> Result<LotteryEvent, LotteryError> {
        if !self.lottery.check_trigger(now).trigger_due {
            return Err(LotteryError::TriggerConditionsNotMet);
        }
        let params = RequestParams {
            routing_key: self.lottery.config.routing_key,
            subscription_id: self.lottery.config.subscription_id,
            request_confirmations: REQUEST_CONFIRMATIONS,
            callback_gas_limit: self.lottery.config.callback_gas_limit,
            num_words: NUM_WORDS,
        };
        let request_id = oracle.request_random_value(&params)?;

        self.lottery.status = LotteryStatus::Settling;
        self.lottery.pending_request_id = Some(request_id);
        self.lottery.last_request_id = self.lottery.last_request_id.max(request_id);
        Ok(LotteryEvent::SettlementRequested { request_id })
    }

    /// Oracle callback. Returns `Ok(None)` without touching anything when
    /// the request is not the one outstanding: oracles redeliver, and a
    /// late or duplicate answer is not a fault.
    pub fn fulfill_randomness<C: FundsCustody + ?Sized>(
        &mut self,
        request_id: u64,
        random_word: &RandomWord,
        now: UnixTimestamp,
        custody: &mut C,
    ) -> Result<Option<LotteryEvent>, LotteryError> {
        if self.lottery.status != LotteryStatus::Settling
            || self.lottery.pending_request_id != Some(request_id)
        {
            return Ok(None);
        }

        let index = winner_index(random_word, self.lottery.entrants.len());
        let winner = self
            .lottery
            .entrants
            .get(index)
            .copied()
            .ok_or(LotteryError::PayoutFailed)?;
        let amount = self.lottery.pool;
        let rounds_settled = self
            .lottery
            .rounds_settled
            .checked_add(1)
            .ok_or(LotteryError::ArithmeticOverflow)?;

        custody.pay_out(&winner, amount)?;

        self.lottery.entrants.clear();
        self.lottery.pool = 0;
        self.lottery.pending_request_id = None;
        self.lottery.status = LotteryStatus::Open;
        self.lottery.last_settlement_timestamp = now;
        self.lottery.recent_winner = winner;
        self.lottery.rounds_settled = rounds_settled;
        Ok(Some(LotteryEvent::WinnerPicked { winner, amount }))
    }
}

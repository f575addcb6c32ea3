// Randomness oracle integration for the lottery program
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    entrypoint::ProgramResult, log::sol_log_data, msg, program_error::ProgramError,
};

use crate::error::LotteryError;

/// 256-bit random value delivered by the oracle, big-endian.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RandomWord(pub [u8; 32]);

impl RandomWord {
    /// Remainder of the full 256-bit value divided by `modulus`.
    /// Returns 0 for a zero modulus.
    pub fn modulo(&self, modulus: u64) -> u64 {
        if modulus == 0 {
            return 0;
        }
        let modulus = modulus as u128;
        self.0
            .iter()
            .fold(0u128, |rem, byte| ((rem << 8) | *byte as u128) % modulus) as u64
    }
}

impl From<u64> for RandomWord {
    fn from(value: u64) -> Self {
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&value.to_be_bytes());
        Self(word)
    }
}

/// What the lottery asks the oracle for on every settlement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestParams {
    pub routing_key: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

/// Issues randomness requests. Must not block: the value arrives later
/// through a separate fulfillment.
pub trait RandomnessOracle {
    fn request_random_value(&mut self, params: &RequestParams) -> Result<u64, LotteryError>;
}

/// Record published for off-chain oracle nodes to pick up
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RandomnessRequested {
    pub request_id: u64,
    pub routing_key: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

impl RandomnessRequested {
    pub fn emit(&self) -> ProgramResult {
        msg!(
            "Randomness requested: id={}, subscription={}, confirmations={}, callback_gas_limit={}, words={}",
            self.request_id,
            self.subscription_id,
            self.request_confirmations,
            self.callback_gas_limit,
            self.num_words
        );
        let data = self
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        sol_log_data(&[b"RandomnessRequested".as_ref(), data.as_slice()]);
        Ok(())
    }
}

/// On-chain side of the oracle: hands out sequential request ids and
/// queues the request records until the state change is committed.
#[derive(Debug, Default)]
pub struct RequestLog {
    last_request_id: u64,
    queued: Vec<RandomnessRequested>,
}

impl RequestLog {
    pub fn new(last_request_id: u64) -> Self {
        Self {
            last_request_id,
            queued: Vec::new(),
        }
    }

    /// Takes the queued request records, oldest first.
    pub fn drain(&mut self) -> Vec<RandomnessRequested> {
        std::mem::take(&mut self.queued)
    }
}

impl RandomnessOracle for RequestLog {
    fn request_random_value(&mut self, params: &RequestParams) -> Result<u64, LotteryError> {
        let request_id = self
            .last_request_id
            .checked_add(1)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        self.last_request_id = request_id;
        self.queued.push(RandomnessRequested {
            request_id,
            routing_key: params.routing_key,
            subscription_id: params.subscription_id,
            request_confirmations: params.request_confirmations,
            callback_gas_limit: params.callback_gas_limit,
            num_words: params.num_words,
        });
        Ok(request_id)
    }
}

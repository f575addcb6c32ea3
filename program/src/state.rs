use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::{Pubkey, PUBKEY_BYTES},
};
use std::convert::TryFrom;

/// Maximum number of entries a single round can hold
pub const MAX_ENTRANTS: usize = 250;

/// Block confirmations the oracle waits for before answering
pub const REQUEST_CONFIRMATIONS: u16 = 3;

/// Random words requested per settlement
pub const NUM_WORDS: u32 = 1;

/// Status of the lottery
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LotteryStatus {
    /// Accepting entries
    Open,
    /// A randomness request is outstanding
    Settling,
}

impl TryFrom<u8> for LotteryStatus {
    type Error = ProgramError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(LotteryStatus::Open),
            1 => Ok(LotteryStatus::Settling),
            _ => Err(ProgramError::InvalidAccountData),
        }
    }
}

impl From<LotteryStatus> for u8 {
    fn from(status: LotteryStatus) -> Self {
        match status {
            LotteryStatus::Open => 0,
            LotteryStatus::Settling => 1,
        }
    }
}

/// Parameters fixed when the lottery is created
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LotteryConfig {
    /// Minimum lamports per entry
    pub entry_fee: u64,
    /// Seconds an open window must last before settlement can trigger
    pub interval: UnixTimestamp,
    /// Compute budget the oracle should spend on the fulfillment callback
    pub callback_gas_limit: u32,
    /// Oracle routing key (key hash of the randomness lane)
    pub routing_key: [u8; 32],
    /// Oracle billing subscription charged for each request
    pub subscription_id: u64,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            entry_fee: 10_000_000, // 0.01 SOL
            interval: 30,
            callback_gas_limit: 500_000,
            routing_key: [
                0x8a, 0xf3, 0x98, 0x99, 0x5b, 0x04, 0xc2, 0x8e, 0x99, 0x51, 0xad, 0xb9, 0x72, 0x1e,
                0xf7, 0x4c, 0x74, 0xf9, 0x3e, 0x6a, 0x47, 0x8f, 0x39, 0xe7, 0xe0, 0x77, 0x7b, 0xe1,
                0x35, 0x27, 0xe7, 0xef,
            ],
            subscription_id: 0,
        }
    }
}

/// Lottery account data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lottery {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Bump seed of the lottery PDA
    pub bump: u8,
    /// Creator of the lottery
    pub admin: Pubkey,
    /// Only signer allowed to deliver randomness
    pub oracle_authority: Pubkey,
    pub config: LotteryConfig,
    pub status: LotteryStatus,
    /// Start of the current open window
    pub last_settlement_timestamp: UnixTimestamp,
    /// Outstanding randomness request, present only while settling
    pub pending_request_id: Option<u64>,
    /// Highest request id issued so far
    pub last_request_id: u64,
    /// Lamports collected this round
    pub pool: u64,
    pub rounds_settled: u64,
    /// Winner of the last settled round (zero before the first settlement)
    pub recent_winner: Pubkey,
    /// Entrants of the current round in entry order
    pub entrants: Vec<Pubkey>,
}

impl Lottery {
    const HEADER_LEN: usize = 1 + 1 + 32 + 32 + 8 + 8 + 4 + 32 + 8 + 1 + 8 + 1 + 8 + 8 + 8 + 8 + 32 + 4;

    pub fn new(
        admin: Pubkey,
        oracle_authority: Pubkey,
        config: LotteryConfig,
        bump: u8,
        now: UnixTimestamp,
    ) -> Self {
        Self {
            is_initialized: true,
            bump,
            admin,
            oracle_authority,
            config,
            status: LotteryStatus::Open,
            last_settlement_timestamp: now,
            pending_request_id: None,
            last_request_id: 0,
            pool: 0,
            rounds_settled: 0,
            recent_winner: Pubkey::default(),
            entrants: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == LotteryStatus::Open
    }
}

impl Sealed for Lottery {}

impl IsInitialized for Lottery {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Lottery {
    const LEN: usize = Lottery::HEADER_LEN + MAX_ENTRANTS * PUBKEY_BYTES;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let (header, table) = array_ref![src, 0, Lottery::LEN].split_at(Lottery::HEADER_LEN);
        let header = array_ref![header, 0, Lottery::HEADER_LEN];
        let (
            is_initialized,
            bump,
            admin,
            oracle_authority,
            entry_fee,
            interval,
            callback_gas_limit,
            routing_key,
            subscription_id,
            status,
            last_settlement_timestamp,
            has_pending_request,
            pending_request_id,
            last_request_id,
            pool,
            rounds_settled,
            recent_winner,
            entrant_count,
        ) = array_refs![header, 1, 1, 32, 32, 8, 8, 4, 32, 8, 1, 8, 1, 8, 8, 8, 8, 32, 4];

        let is_initialized = match is_initialized {
            [0] => false,
            [1] => true,
            _ => return Err(ProgramError::InvalidAccountData),
        };
        let status = LotteryStatus::try_from(status[0])?;
        let pending_request_id = match has_pending_request {
            [0] => None,
            [1] => Some(u64::from_le_bytes(*pending_request_id)),
            _ => return Err(ProgramError::InvalidAccountData),
        };
        if (status == LotteryStatus::Settling) != pending_request_id.is_some() {
            return Err(ProgramError::InvalidAccountData);
        }

        let entrant_count = u32::from_le_bytes(*entrant_count) as usize;
        if entrant_count > MAX_ENTRANTS {
            return Err(ProgramError::InvalidAccountData);
        }
        let entrants = table
            .chunks_exact(PUBKEY_BYTES)
            .take(entrant_count)
            .map(|chunk| {
                let mut key = [0u8; PUBKEY_BYTES];
                key.copy_from_slice(chunk);
                Pubkey::new_from_array(key)
            })
            .collect();

        Ok(Lottery {
            is_initialized,
            bump: bump[0],
            admin: Pubkey::new_from_array(*admin),
            oracle_authority: Pubkey::new_from_array(*oracle_authority),
            config: LotteryConfig {
                entry_fee: u64::from_le_bytes(*entry_fee),
                interval: UnixTimestamp::from_le_bytes(*interval),
                callback_gas_limit: u32::from_le_bytes(*callback_gas_limit),
                routing_key: *routing_key,
                subscription_id: u64::from_le_bytes(*subscription_id),
            },
            status,
            last_settlement_timestamp: UnixTimestamp::from_le_bytes(*last_settlement_timestamp),
            pending_request_id,
            last_request_id: u64::from_le_bytes(*last_request_id),
            pool: u64::from_le_bytes(*pool),
            rounds_settled: u64::from_le_bytes(*rounds_settled),
            recent_winner: Pubkey::new_from_array(*recent_winner),
            entrants,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let (header_dst, table_dst) =
            array_mut_ref![dst, 0, Lottery::LEN].split_at_mut(Lottery::HEADER_LEN);
        let header_dst = array_mut_ref![header_dst, 0, Lottery::HEADER_LEN];
        let (
            is_initialized_dst,
            bump_dst,
            admin_dst,
            oracle_authority_dst,
            entry_fee_dst,
            interval_dst,
            callback_gas_limit_dst,
            routing_key_dst,
            subscription_id_dst,
            status_dst,
            last_settlement_timestamp_dst,
            has_pending_request_dst,
            pending_request_id_dst,
            last_request_id_dst,
            pool_dst,
            rounds_settled_dst,
            recent_winner_dst,
            entrant_count_dst,
        ) = mut_array_refs![header_dst, 1, 1, 32, 32, 8, 8, 4, 32, 8, 1, 8, 1, 8, 8, 8, 8, 32, 4];

        is_initialized_dst[0] = self.is_initialized as u8;
        bump_dst[0] = self.bump;
        admin_dst.copy_from_slice(self.admin.as_ref());
        oracle_authority_dst.copy_from_slice(self.oracle_authority.as_ref());
        *entry_fee_dst = self.config.entry_fee.to_le_bytes();
        *interval_dst = self.config.interval.to_le_bytes();
        *callback_gas_limit_dst = self.config.callback_gas_limit.to_le_bytes();
        *routing_key_dst = self.config.routing_key;
        *subscription_id_dst = self.config.subscription_id.to_le_bytes();
        status_dst[0] = self.status.into();
        *last_settlement_timestamp_dst = self.last_settlement_timestamp.to_le_bytes();
        match self.pending_request_id {
            Some(request_id) => {
                has_pending_request_dst[0] = 1;
                *pending_request_id_dst = request_id.to_le_bytes();
            }
            None => {
                has_pending_request_dst[0] = 0;
                *pending_request_id_dst = [0; 8];
            }
        }
        *last_request_id_dst = self.last_request_id.to_le_bytes();
        *pool_dst = self.pool.to_le_bytes();
        *rounds_settled_dst = self.rounds_settled.to_le_bytes();
        recent_winner_dst.copy_from_slice(self.recent_winner.as_ref());
        // The engine never lets the table grow past MAX_ENTRANTS.
        let entrant_count = self.entrants.len().min(MAX_ENTRANTS);
        *entrant_count_dst = (entrant_count as u32).to_le_bytes();

        table_dst.fill(0);
        for (slot, entrant) in table_dst
            .chunks_exact_mut(PUBKEY_BYTES)
            .zip(self.entrants.iter().take(entrant_count))
        {
            slot.copy_from_slice(entrant.as_ref());
        }
    }
}

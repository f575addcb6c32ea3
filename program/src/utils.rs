// Lottery program - Utility Functions
use solana_program::pubkey::Pubkey;

/// Seed prefix of the lottery PDA
pub const LOTTERY_SEED: &[u8] = b"lottery";

/// Find the program derived address of the lottery created by `admin`
pub fn find_lottery_address(program_id: &Pubkey, admin: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[LOTTERY_SEED, admin.as_ref()], program_id)
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}

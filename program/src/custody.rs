// Funds custody for the lottery pool
use solana_program::{account_info::AccountInfo, msg, pubkey::Pubkey};

use crate::error::LotteryError;

/// Moves the settled pool out to a winner. A failed payout must leave every
/// balance untouched.
pub trait FundsCustody {
    fn pay_out(&mut self, winner: &Pubkey, amount: u64) -> Result<(), LotteryError>;
}

/// Pays the winner straight out of the program-owned lottery account.
pub struct LamportVault<'a, 'info> {
    vault: &'a AccountInfo<'info>,
    recipient: &'a AccountInfo<'info>,
    /// Balance the vault must keep to stay rent-exempt
    rent_floor: u64,
}

impl<'a, 'info> LamportVault<'a, 'info> {
    pub fn new(
        vault: &'a AccountInfo<'info>,
        recipient: &'a AccountInfo<'info>,
        rent_floor: u64,
    ) -> Self {
        Self {
            vault,
            recipient,
            rent_floor,
        }
    }
}

impl FundsCustody for LamportVault<'_, '_> {
    fn pay_out(&mut self, winner: &Pubkey, amount: u64) -> Result<(), LotteryError> {
        if self.recipient.key != winner {
            msg!(
                "Recipient {} is not the selected winner {}",
                self.recipient.key,
                winner
            );
            return Err(LotteryError::PayoutFailed);
        }
        if self.recipient.key == self.vault.key {
            msg!("Vault cannot pay itself");
            return Err(LotteryError::PayoutFailed);
        }
        if !self.recipient.is_writable || self.recipient.executable {
            msg!("Winner account {} cannot receive lamports", winner);
            return Err(LotteryError::PayoutFailed);
        }

        let vault_balance = self
            .vault
            .lamports()
            .checked_sub(amount)
            .filter(|remaining| *remaining >= self.rent_floor)
            .ok_or_else(|| {
                msg!(
                    "Vault holds {} lamports, cannot pay {} and stay rent-exempt",
                    self.vault.lamports(),
                    amount
                );
                LotteryError::PayoutFailed
            })?;
        let recipient_balance = self
            .recipient
            .lamports()
            .checked_add(amount)
            .ok_or(LotteryError::PayoutFailed)?;

        // Take both borrows before writing so a conflict cannot leave a half transfer.
        let mut vault_lamports = self
            .vault
            .try_borrow_mut_lamports()
            .map_err(|_| LotteryError::PayoutFailed)?;
        let mut recipient_lamports = self
            .recipient
            .try_borrow_mut_lamports()
            .map_err(|_| LotteryError::PayoutFailed)?;
        **vault_lamports = vault_balance;
        **recipient_lamports = recipient_balance;
        Ok(())
    }
}

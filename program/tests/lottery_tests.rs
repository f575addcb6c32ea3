use solana_program::program_pack::Pack;
use solana_program_test::*;
use solana_sdk::{
    clock::Clock,
    hash::Hash,
    instruction::{Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
    transaction::{Transaction, TransactionError},
};

use keeper_lottery::{
    error::LotteryError,
    instruction,
    oracle::RandomWord,
    process_instruction,
    state::{Lottery, LotteryConfig, LotteryStatus},
    utils,
};

const ENTRY_FEE: u64 = 10_000_000;
const INTERVAL: i64 = 30;

struct Harness {
    context: ProgramTestContext,
    program_id: Pubkey,
    oracle: Keypair,
    lottery: Pubkey,
}

impl Harness {
    // identical transactions need distinct blockhashes
    async fn fresh_blockhash(&mut self) -> Hash {
        let blockhash = self
            .context
            .banks_client
            .get_new_latest_blockhash(&self.context.last_blockhash)
            .await
            .unwrap();
        self.context.last_blockhash = blockhash;
        blockhash
    }

    async fn send(
        &mut self,
        instructions: &[Instruction],
        extra_signers: &[&Keypair],
    ) -> Result<(), BanksClientError> {
        let blockhash = self.fresh_blockhash().await;
        let mut signers = vec![&self.context.payer];
        signers.extend_from_slice(extra_signers);
        let transaction = Transaction::new_signed_with_payer(
            instructions,
            Some(&self.context.payer.pubkey()),
            &signers,
            blockhash,
        );
        self.context.banks_client.process_transaction(transaction).await
    }

    async fn lottery_state(&mut self) -> Lottery {
        let account = self
            .context
            .banks_client
            .get_account(self.lottery)
            .await
            .unwrap()
            .unwrap();
        Lottery::unpack(&account.data).unwrap()
    }

    async fn balance(&mut self, address: Pubkey) -> u64 {
        self.context.banks_client.get_balance(address).await.unwrap()
    }

    async fn funded_player(&mut self) -> Keypair {
        let player = Keypair::new();
        let fund_ix = system_instruction::transfer(
            &self.context.payer.pubkey(),
            &player.pubkey(),
            1_000_000_000, // 1 SOL
        );
        self.send(&[fund_ix], &[]).await.unwrap();
        player
    }

    async fn enter(&mut self, player: &Keypair, amount: u64) -> Result<(), BanksClientError> {
        let ix = instruction::enter(&self.program_id, &player.pubkey(), &self.lottery, amount);
        self.send(&[ix], &[player]).await
    }

    async fn perform_upkeep(&mut self) -> Result<(), BanksClientError> {
        let ix = instruction::perform_upkeep(&self.program_id, &self.lottery);
        self.send(&[ix], &[]).await
    }

    async fn fulfill(
        &mut self,
        signer: &Keypair,
        winner: &Pubkey,
        request_id: u64,
        random_value: u64,
    ) -> Result<(), BanksClientError> {
        let ix = instruction::fulfill_randomness(
            &self.program_id,
            &signer.pubkey(),
            &self.lottery,
            winner,
            request_id,
            RandomWord::from(random_value),
        );
        self.send(&[ix], &[signer]).await
    }

    async fn check_upkeep_logs(&mut self) -> Vec<String> {
        let blockhash = self.fresh_blockhash().await;
        let transaction = Transaction::new_signed_with_payer(
            &[instruction::check_upkeep(&self.program_id, &self.lottery)],
            Some(&self.context.payer.pubkey()),
            &[&self.context.payer],
            blockhash,
        );
        let simulation = self
            .context
            .banks_client
            .simulate_transaction(transaction)
            .await
            .unwrap();
        simulation.simulation_details.unwrap().logs
    }

    async fn advance_clock(&mut self, seconds: i64) {
        let mut clock: Clock = self.context.banks_client.get_sysvar().await.unwrap();
        clock.unix_timestamp += seconds;
        self.context.set_sysvar(&clock);
    }
}

async fn start() -> (ProgramTestContext, Pubkey) {
    let program_id = Pubkey::new_unique();

    let program_test = ProgramTest::new(
        "keeper_lottery",
        program_id,
        processor!(process_instruction),
    );
    (program_test.start_with_context().await, program_id)
}

async fn setup() -> Harness {
    let (mut context, program_id) = start().await;

    let oracle = Keypair::new();
    let config = LotteryConfig {
        entry_fee: ENTRY_FEE,
        interval: INTERVAL,
        ..LotteryConfig::default()
    };
    let initialize_ix = instruction::initialize_lottery(
        &program_id,
        &context.payer.pubkey(),
        &oracle.pubkey(),
        &config,
    );
    let transaction = Transaction::new_signed_with_payer(
        &[initialize_ix],
        Some(&context.payer.pubkey()),
        &[&context.payer],
        context.last_blockhash,
    );
    context
        .banks_client
        .process_transaction(transaction)
        .await
        .unwrap();

    let (lottery, _) = utils::find_lottery_address(&program_id, &context.payer.pubkey());
    Harness {
        context,
        program_id,
        oracle,
        lottery,
    }
}

fn assert_lottery_error(result: Result<(), BanksClientError>, expected: LotteryError) {
    assert_eq!(
        result.unwrap_err().unwrap(),
        TransactionError::InstructionError(0, InstructionError::Custom(expected as u32))
    );
}

#[tokio::test]
async fn test_initialize_lottery() {
    let mut harness = setup().await;
    let lottery = harness.lottery_state().await;

    assert!(lottery.is_initialized);
    assert_eq!(lottery.admin, harness.context.payer.pubkey());
    assert_eq!(lottery.oracle_authority, harness.oracle.pubkey());
    assert_eq!(lottery.status, LotteryStatus::Open);
    assert_eq!(lottery.pool, 0);
    assert!(lottery.entrants.is_empty());
    assert_eq!(lottery.pending_request_id, None);
    assert_eq!(lottery.config.entry_fee, ENTRY_FEE);
    assert_eq!(lottery.config.interval, INTERVAL);
    assert_eq!(lottery.config.callback_gas_limit, 500_000);

    // a second initialization must not reset the running lottery
    let oracle = harness.oracle.pubkey();
    let reinitialize_ix = instruction::initialize_lottery(
        &harness.program_id,
        &harness.context.payer.pubkey(),
        &oracle,
        &LotteryConfig::default(),
    );
    let result = harness.send(&[reinitialize_ix], &[]).await;
    assert_eq!(
        result.unwrap_err().unwrap(),
        TransactionError::InstructionError(0, InstructionError::AccountAlreadyInitialized)
    );
}

#[tokio::test]
async fn test_initialize_claims_prefunded_address() {
    let (mut context, program_id) = start().await;
    let admin = context.payer.pubkey();
    let (lottery, _) = utils::find_lottery_address(&program_id, &admin);

    // anyone can send lamports to the derived address ahead of the admin
    let griefing_ix = system_instruction::transfer(&admin, &lottery, 1_000_000);
    let transaction = Transaction::new_signed_with_payer(
        &[griefing_ix],
        Some(&admin),
        &[&context.payer],
        context.last_blockhash,
    );
    context
        .banks_client
        .process_transaction(transaction)
        .await
        .unwrap();

    let oracle = Keypair::new();
    let initialize_ix = instruction::initialize_lottery(
        &program_id,
        &admin,
        &oracle.pubkey(),
        &LotteryConfig::default(),
    );
    let transaction = Transaction::new_signed_with_payer(
        &[initialize_ix],
        Some(&admin),
        &[&context.payer],
        context.last_blockhash,
    );
    context
        .banks_client
        .process_transaction(transaction)
        .await
        .unwrap();

    let account = context
        .banks_client
        .get_account(lottery)
        .await
        .unwrap()
        .unwrap();
    let rent = context.banks_client.get_rent().await.unwrap();
    assert_eq!(account.owner, program_id);
    assert_eq!(account.data.len(), Lottery::LEN);
    assert_eq!(account.lamports, rent.minimum_balance(Lottery::LEN));

    let state = Lottery::unpack(&account.data).unwrap();
    assert_eq!(state.status, LotteryStatus::Open);
    assert_eq!(state.oracle_authority, oracle.pubkey());
}

#[tokio::test]
async fn test_enter_rejects_underpayment() {
    let mut harness = setup().await;
    let player = harness.funded_player().await;

    let result = harness.enter(&player, ENTRY_FEE / 2).await;

    assert_lottery_error(result, LotteryError::InsufficientPayment);
    let lottery = harness.lottery_state().await;
    assert_eq!(lottery.pool, 0);
    assert!(lottery.entrants.is_empty());
}

#[tokio::test]
async fn test_enter_records_player_and_takes_payment() {
    let mut harness = setup().await;
    let player = harness.funded_player().await;
    let vault_before = harness.balance(harness.lottery).await;
    let player_before = harness.balance(player.pubkey()).await;

    harness.enter(&player, ENTRY_FEE).await.unwrap();

    let lottery = harness.lottery_state().await;
    assert_eq!(lottery.pool, ENTRY_FEE);
    assert_eq!(lottery.entrant(0), Ok(player.pubkey()));
    assert_eq!(harness.balance(harness.lottery).await, vault_before + ENTRY_FEE);
    assert_eq!(harness.balance(player.pubkey()).await, player_before - ENTRY_FEE);
}

#[tokio::test]
async fn test_enter_keeps_overpayment_in_pool() {
    let mut harness = setup().await;
    let player = harness.funded_player().await;
    let vault_before = harness.balance(harness.lottery).await;
    let paid = ENTRY_FEE + ENTRY_FEE / 2;

    harness.enter(&player, paid).await.unwrap();

    let lottery = harness.lottery_state().await;
    assert_eq!(lottery.pool, paid);
    assert_eq!(lottery.entrants, vec![player.pubkey()]);
    assert_eq!(harness.balance(harness.lottery).await, vault_before + paid);

    // the winner takes everything that was paid in
    harness.advance_clock(INTERVAL).await;
    harness.perform_upkeep().await.unwrap();
    let winner_before = harness.balance(player.pubkey()).await;
    let oracle = Keypair::from_bytes(&harness.oracle.to_bytes()).unwrap();
    harness
        .fulfill(&oracle, &player.pubkey(), 1, 7)
        .await
        .unwrap();
    assert_eq!(harness.balance(player.pubkey()).await, winner_before + paid);
    assert_eq!(harness.balance(harness.lottery).await, vault_before);
}

#[tokio::test]
async fn test_upkeep_waits_for_interval() {
    let mut harness = setup().await;
    let player = harness.funded_player().await;
    harness.enter(&player, ENTRY_FEE).await.unwrap();
    harness.advance_clock(10).await;

    let logs = harness.check_upkeep_logs().await;
    assert!(logs.iter().any(|log| log.contains("Upkeep needed: false")));

    let result = harness.perform_upkeep().await;
    assert_lottery_error(result, LotteryError::TriggerConditionsNotMet);
    assert_eq!(harness.lottery_state().await.status, LotteryStatus::Open);
}

#[tokio::test]
async fn test_upkeep_needs_players() {
    let mut harness = setup().await;
    harness.advance_clock(INTERVAL + 1).await;

    let logs = harness.check_upkeep_logs().await;
    assert!(logs.iter().any(|log| log.contains("Upkeep needed: false")));
    assert_lottery_error(
        harness.perform_upkeep().await,
        LotteryError::TriggerConditionsNotMet,
    );
}

#[tokio::test]
async fn test_full_round() {
    let mut harness = setup().await;
    let player = harness.funded_player().await;
    harness.enter(&player, ENTRY_FEE).await.unwrap();
    harness.advance_clock(INTERVAL + 1).await;

    let logs = harness.check_upkeep_logs().await;
    assert!(logs.iter().any(|log| log.contains("Upkeep needed: true")));

    // keeper closes the round
    harness.perform_upkeep().await.unwrap();
    let settling = harness.lottery_state().await;
    assert_eq!(settling.status, LotteryStatus::Settling);
    assert_eq!(settling.pending_request_id, Some(1));
    assert_eq!(settling.entrants, vec![player.pubkey()]);

    // a racing keeper and a late player are both turned away
    assert_lottery_error(
        harness.perform_upkeep().await,
        LotteryError::TriggerConditionsNotMet,
    );
    let late_player = harness.funded_player().await;
    assert_lottery_error(
        harness.enter(&late_player, ENTRY_FEE).await,
        LotteryError::NotOpen,
    );

    // stale answers are swallowed
    let oracle = Keypair::from_bytes(&harness.oracle.to_bytes()).unwrap();
    harness
        .fulfill(&oracle, &player.pubkey(), 99, 42)
        .await
        .unwrap();
    assert_eq!(harness.lottery_state().await, settling);

    // paying the wrong account rolls the whole fulfillment back
    assert_lottery_error(
        harness.fulfill(&oracle, &late_player.pubkey(), 1, 42).await,
        LotteryError::PayoutFailed,
    );
    assert_eq!(harness.lottery_state().await, settling);

    let vault_before = harness.balance(harness.lottery).await;
    let winner_before = harness.balance(player.pubkey()).await;
    harness
        .fulfill(&oracle, &player.pubkey(), 1, 42)
        .await
        .unwrap();

    let settled = harness.lottery_state().await;
    assert_eq!(settled.status, LotteryStatus::Open);
    assert_eq!(settled.pending_request_id, None);
    assert_eq!(settled.pool, 0);
    assert!(settled.entrants.is_empty());
    assert_eq!(settled.recent_winner, player.pubkey());
    assert_eq!(settled.rounds_settled, 1);
    assert!(settled.last_settlement_timestamp > settling.last_settlement_timestamp);
    assert_eq!(harness.balance(player.pubkey()).await, winner_before + ENTRY_FEE);
    assert_eq!(harness.balance(harness.lottery).await, vault_before - ENTRY_FEE);

    // a redelivered answer changes nothing
    harness
        .fulfill(&oracle, &player.pubkey(), 1, 42)
        .await
        .unwrap();
    assert_eq!(harness.lottery_state().await, settled);
    assert_eq!(harness.balance(player.pubkey()).await, winner_before + ENTRY_FEE);

    // and the next round is open for business
    harness.enter(&late_player, ENTRY_FEE).await.unwrap();
    assert_eq!(harness.lottery_state().await.pool, ENTRY_FEE);
}

#[tokio::test]
async fn test_fulfill_requires_oracle_authority() {
    let mut harness = setup().await;
    let player = harness.funded_player().await;
    harness.enter(&player, ENTRY_FEE).await.unwrap();
    harness.advance_clock(INTERVAL).await;
    harness.perform_upkeep().await.unwrap();
    let settling = harness.lottery_state().await;

    let impostor = Keypair::new();
    assert_lottery_error(
        harness.fulfill(&impostor, &player.pubkey(), 1, 42).await,
        LotteryError::UnauthorizedOracle,
    );
    assert_eq!(harness.lottery_state().await, settling);
}

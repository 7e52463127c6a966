//! Integration tests for bank-statement-counterpart

use bank_statement_counterpart::{
    Account, AccountingStorage, BankStatement, Company, CounterpartConfig, CounterpartReconciler,
    Currency, GuardMode, Journal, LedgerError, MemoryStorage, Move, MoveBuilder, MoveLine,
    MoveState, Origin, Period, RateTable, StatementJournal, StatementLine, StatementLineState,
};
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn at(d: u32) -> NaiveDateTime {
    day(d).and_hms_opt(10, 0, 0).unwrap()
}

struct Env {
    reconciler: CounterpartReconciler<MemoryStorage>,
    storage: MemoryStorage,
}

/// Company `c1` (EUR) with January 2024 open, a receivable (430), a payable
/// (410), sales (700), a bank account (572) and statement journal `BANK`
/// posting against 572
async fn setup_with(journal_currency: Currency, config: CounterpartConfig) -> Env {
    let storage = MemoryStorage::new();
    let eur = Currency::new("EUR", 2);
    let rates = RateTable::new()
        .with_rate(&eur, day(1), BigDecimal::from(1))
        .with_rate(&Currency::new("USD", 2), day(1), BigDecimal::from(2));
    let mut reconciler =
        CounterpartReconciler::new(storage.clone(), Arc::new(rates), config).unwrap();

    let ledger = reconciler.ledger_mut();
    ledger
        .create_company(Company {
            id: "c1".to_string(),
            name: "Acme".to_string(),
            party_id: "p-acme".to_string(),
            currency: eur,
        })
        .await
        .unwrap();
    ledger
        .create_period(Period::new(
            "2024-01".to_string(),
            "c1".to_string(),
            "January 2024".to_string(),
            day(1),
            day(31),
        ))
        .await
        .unwrap();
    for account in [
        Account::new("430".to_string(), "430".to_string(), "Receivable".to_string())
            .reconcilable()
            .with_party_required(),
        Account::new("410".to_string(), "410".to_string(), "Payable".to_string()).reconcilable(),
        Account::new("700".to_string(), "700".to_string(), "Sales".to_string()),
        Account::new("572".to_string(), "572".to_string(), "Bank".to_string()).bank_reconcilable(),
        Account::new("555".to_string(), "555".to_string(), "Suspense".to_string())
            .reconcilable()
            .bank_reconcilable(),
    ] {
        ledger.create_account(account).await.unwrap();
    }
    for (id, name) in [("REV", "Revenue"), ("CASH", "Cash")] {
        ledger
            .create_journal(Journal {
                id: id.to_string(),
                name: name.to_string(),
            })
            .await
            .unwrap();
    }
    ledger
        .create_statement_journal(StatementJournal {
            id: "BANK".to_string(),
            name: "Main Bank".to_string(),
            journal_id: "CASH".to_string(),
            currency: journal_currency,
            debit_account_id: Some("572".to_string()),
            credit_account_id: Some("572".to_string()),
        })
        .await
        .unwrap();

    reconciler
        .statements_mut()
        .create_statement(BankStatement {
            id: "s1".to_string(),
            company_id: "c1".to_string(),
            journal_id: "BANK".to_string(),
            date: day(10),
        })
        .await
        .unwrap();

    Env {
        reconciler,
        storage,
    }
}

async fn setup() -> Env {
    setup_with(Currency::new("EUR", 2), CounterpartConfig::default()).await
}

impl Env {
    /// Post a customer invoice and return its receivable line
    async fn invoice(&mut self, amount: i64) -> MoveLine {
        let (mv, lines) = MoveBuilder::new(
            "c1".to_string(),
            "2024-01".to_string(),
            "REV".to_string(),
            day(3),
        )
        .origin(Origin::External("invoice".to_string()))
        .debit(
            "430".to_string(),
            BigDecimal::from(amount),
            Some("customer".to_string()),
            Some("Invoice".to_string()),
        )
        .credit("700".to_string(), BigDecimal::from(amount), None, None)
        .build()
        .unwrap();
        let (_, lines) = self
            .reconciler
            .ledger_mut()
            .record_move(mv, lines)
            .await
            .unwrap();
        lines.into_iter().find(|l| l.account_id == "430").unwrap()
    }

    /// Post a supplier bill on `account` and return its credit line
    async fn bill(&mut self, account: &str, amount: i64) -> MoveLine {
        let (mv, lines) = MoveBuilder::new(
            "c1".to_string(),
            "2024-01".to_string(),
            "REV".to_string(),
            day(4),
        )
        .debit("700".to_string(), BigDecimal::from(amount), None, None)
        .credit(account.to_string(), BigDecimal::from(amount), None, None)
        .build()
        .unwrap();
        let (_, lines) = self
            .reconciler
            .ledger_mut()
            .record_move(mv, lines)
            .await
            .unwrap();
        lines.into_iter().find(|l| l.account_id == account).unwrap()
    }

    /// Post a customer payment received outside statements and return its
    /// receivable line
    async fn payment(&mut self, amount: i64) -> MoveLine {
        let (mv, lines) = MoveBuilder::new(
            "c1".to_string(),
            "2024-01".to_string(),
            "REV".to_string(),
            day(5),
        )
        .debit("572".to_string(), BigDecimal::from(amount), None, None)
        .credit(
            "430".to_string(),
            BigDecimal::from(amount),
            Some("customer".to_string()),
            Some("Cash payment".to_string()),
        )
        .build()
        .unwrap();
        let (_, lines) = self
            .reconciler
            .ledger_mut()
            .record_move(mv, lines)
            .await
            .unwrap();
        lines.into_iter().find(|l| l.account_id == "430").unwrap()
    }

    async fn statement_line(&mut self, id: &str, amount: i64) -> StatementLine {
        self.reconciler
            .statements_mut()
            .create_line(StatementLine::new(
                id.to_string(),
                "s1".to_string(),
                "c1".to_string(),
                id.to_string(),
                at(10),
                "Customer transfer".to_string(),
                BigDecimal::from(amount),
            ))
            .await
            .unwrap()
    }

    async fn confirm(&mut self, id: &str) {
        self.reconciler
            .statements_mut()
            .confirm_lines(&[id.to_string()])
            .await
            .unwrap();
    }

    async fn line(&self, id: &str) -> MoveLine {
        self.reconciler.ledger().get_line_required(id).await.unwrap()
    }

    /// The move generated for a counterpart, through its reconciliation
    async fn generated_move(&self, counterpart: &MoveLine) -> (Move, Vec<MoveLine>) {
        let counterpart = self.line(&counterpart.id).await;
        let reconciliation = self
            .reconciler
            .ledger()
            .get_reconciliation_required(counterpart.reconciliation_id.as_deref().unwrap())
            .await
            .unwrap();
        for line_id in &reconciliation.line_ids {
            let line = self.line(line_id).await;
            if line.move_id != counterpart.move_id {
                let ledger = self.reconciler.ledger();
                let mv = ledger.get_move_required(&line.move_id).await.unwrap();
                let lines = ledger.get_move_lines(&mv.id).await.unwrap();
                return (mv, lines);
            }
        }
        panic!("no generated move");
    }
}

#[tokio::test]
async fn test_post_generates_balanced_move_and_cancel_restores_state() {
    let mut env = setup().await;
    let invoice = env.invoice(100).await;
    env.statement_line("st1", 100).await;

    let st = env
        .reconciler
        .add_counterpart_lines("st1", &[invoice.id.clone()])
        .await
        .unwrap();
    assert_eq!(st.counterpart_line_ids, vec![invoice.id.clone()]);
    assert_eq!(
        env.reconciler.moves_amount(&st).await.unwrap(),
        BigDecimal::from(100)
    );
    env.confirm("st1").await;
    let moves_before = env.storage.move_count().unwrap();

    env.reconciler.post(&["st1".to_string()]).await.unwrap();

    let st = env
        .reconciler
        .statements()
        .get_line_required("st1")
        .await
        .unwrap();
    assert_eq!(st.state, StatementLineState::Posted);
    assert_eq!(env.storage.move_count().unwrap(), moves_before + 1);

    let (mv, lines) = env.generated_move(&invoice).await;
    assert_eq!(mv.state, MoveState::Posted);
    assert_eq!(mv.journal_id, "CASH");
    assert_eq!(mv.origin, Some(Origin::BankStatement("s1".to_string())));
    assert_eq!(lines.len(), 2);
    let total: BigDecimal = lines.iter().map(|l| l.balance()).sum();
    assert_eq!(total, BigDecimal::from(0));

    let bank = lines.iter().find(|l| l.account_id == "572").unwrap();
    assert_eq!(bank.debit, BigDecimal::from(100));
    assert_eq!(bank.bank_statement_line_counterpart.as_deref(), Some("st1"));
    let mirror = lines.iter().find(|l| l.account_id == "430").unwrap();
    assert_eq!(mirror.credit, BigDecimal::from(100));
    assert_eq!(mirror.party_id.as_deref(), Some("customer"));
    assert!(mirror.is_reconciled());
    assert!(env.line(&invoice.id).await.is_reconciled());

    env.reconciler.cancel(&["st1".to_string()]).await.unwrap();

    let st = env
        .reconciler
        .statements()
        .get_line_required("st1")
        .await
        .unwrap();
    assert_eq!(st.state, StatementLineState::Canceled);
    assert!(st.counterpart_line_ids.is_empty());
    assert_eq!(env.storage.move_count().unwrap(), moves_before);
    assert_eq!(env.storage.reconciliation_count().unwrap(), 0);
    assert!(env.reconciler.ledger().get_move_required(&mv.id).await.is_err());
    assert_eq!(env.line(&invoice.id).await, invoice);
}

#[tokio::test]
async fn test_post_skips_already_reconciled_counterpart() {
    let mut env = setup().await;
    let invoice = env.invoice(80).await;
    env.statement_line("st1", 80).await;
    env.reconciler
        .add_counterpart_lines("st1", &[invoice.id.clone()])
        .await
        .unwrap();

    let created = env.reconciler.create_move("st1", &invoice.id).await.unwrap();
    assert!(created.is_some());
    let again = env.reconciler.create_move("st1", &invoice.id).await.unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn test_auto_match_attaches_unique_candidate() {
    let mut env = setup().await;
    let invoice = env.invoice(250).await;
    env.invoice(99).await;
    env.statement_line("st1", 250).await;

    let matched = env.reconciler.search_reconciliation("st1").await.unwrap();
    assert_eq!(matched.map(|l| l.id), Some(invoice.id.clone()));

    let st = env
        .reconciler
        .statements()
        .get_line_required("st1")
        .await
        .unwrap();
    assert_eq!(st.counterpart_line_ids, vec![invoice.id.clone()]);

    // Now fully explained: a second search does nothing
    assert!(env
        .reconciler
        .search_reconciliation("st1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_auto_match_negative_amount_matches_credit() {
    let mut env = setup().await;
    let bill = env.bill("410", 45).await;
    env.statement_line("st1", -45).await;

    let matched = env.reconciler.search_reconciliation("st1").await.unwrap();
    assert_eq!(matched.map(|l| l.id), Some(bill.id.clone()));

    env.confirm("st1").await;
    env.reconciler.post(&["st1".to_string()]).await.unwrap();
    let (_, lines) = env.generated_move(&bill).await;
    let bank = lines.iter().find(|l| l.account_id == "572").unwrap();
    assert_eq!(bank.credit, BigDecimal::from(45));
    let mirror = lines.iter().find(|l| l.account_id == "410").unwrap();
    assert_eq!(mirror.debit, BigDecimal::from(45));
}

#[tokio::test]
async fn test_auto_match_ambiguous_candidates_leave_line_untouched() {
    let mut env = setup().await;
    env.invoice(100).await;
    env.invoice(100).await;
    let before = env.statement_line("st1", 100).await;

    assert!(env
        .reconciler
        .search_reconciliation("st1")
        .await
        .unwrap()
        .is_none());
    let after = env
        .reconciler
        .statements()
        .get_line_required("st1")
        .await
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_auto_match_ignores_explained_lines_and_disabled_config() {
    let mut env = setup().await;
    let invoice = env.invoice(60).await;
    env.statement_line("st1", 60).await;
    env.reconciler
        .statements_mut()
        .link_move("st1", &invoice.move_id, BigDecimal::from(60), None)
        .await
        .unwrap();
    assert!(env
        .reconciler
        .search_reconciliation("st1")
        .await
        .unwrap()
        .is_none());

    let config = CounterpartConfig {
        auto_match: false,
        ..CounterpartConfig::default()
    };
    let mut env = setup_with(Currency::new("EUR", 2), config).await;
    env.invoice(60).await;
    env.statement_line("st1", 60).await;
    assert!(env
        .reconciler
        .search_reconciliation("st1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_same_account_fails_without_writing() {
    let mut env = setup().await;
    let suspense = env.bill("555", 30).await;
    env.reconciler
        .ledger_mut()
        .create_statement_journal(StatementJournal {
            id: "BANK".to_string(),
            name: "Main Bank".to_string(),
            journal_id: "CASH".to_string(),
            currency: Currency::new("EUR", 2),
            debit_account_id: Some("555".to_string()),
            credit_account_id: Some("555".to_string()),
        })
        .await
        .unwrap();
    env.statement_line("st1", -30).await;
    env.reconciler
        .add_counterpart_lines("st1", &[suspense.id.clone()])
        .await
        .unwrap();
    env.confirm("st1").await;
    let moves_before = env.storage.move_count().unwrap();

    let err = env.reconciler.post(&["st1".to_string()]).await.unwrap_err();
    match err {
        LedgerError::SameAccount {
            account, journal, ..
        } => {
            assert_eq!(account, "555 - Suspense");
            assert_eq!(journal, "Main Bank");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(env.storage.move_count().unwrap(), moves_before);
    let st = env
        .reconciler
        .statements()
        .get_line_required("st1")
        .await
        .unwrap();
    assert_eq!(st.state, StatementLineState::Confirmed);
}

#[tokio::test]
async fn test_journal_configuration_errors() {
    let mut env = setup().await;
    let invoice = env.invoice(20).await;
    env.statement_line("st1", 20).await;
    env.reconciler
        .add_counterpart_lines("st1", &[invoice.id.clone()])
        .await
        .unwrap();

    let mut journal = env
        .reconciler
        .ledger()
        .get_statement_journal_required("BANK")
        .await
        .unwrap();
    journal.credit_account_id = None;
    env.storage.save_statement_journal(&journal).await.unwrap();
    assert!(matches!(
        env.reconciler.create_move("st1", &invoice.id).await,
        Err(LedgerError::MissingJournalAccount { .. })
    ));

    journal.credit_account_id = Some("700".to_string());
    env.storage.save_statement_journal(&journal).await.unwrap();
    assert!(matches!(
        env.reconciler.create_move("st1", &invoice.id).await,
        Err(LedgerError::AccountNotBankReconcilable { .. })
    ));
    assert!(!env.line(&invoice.id).await.is_reconciled());
}

#[tokio::test]
async fn test_generated_records_are_protected_outside_teardown() {
    let mut env = setup().await;
    let invoice = env.invoice(100).await;
    env.statement_line("st1", 100).await;
    env.reconciler
        .add_counterpart_lines("st1", &[invoice.id.clone()])
        .await
        .unwrap();
    env.confirm("st1").await;
    env.reconciler.post(&["st1".to_string()]).await.unwrap();

    let (mv, lines) = env.generated_move(&invoice).await;
    let reconciliation_id = env.line(&invoice.id).await.reconciliation_id.unwrap();

    let err = env
        .reconciler
        .ledger_mut()
        .delete_reconciliations(&[reconciliation_id.clone()], GuardMode::Enforce)
        .await
        .unwrap_err();
    match err {
        LedgerError::ReconciliationDeletionBlocked { statement_line } => {
            assert_eq!(statement_line, "st1 - Customer transfer");
        }
        other => panic!("unexpected error: {other}"),
    }

    let bank = lines.iter().find(|l| l.account_id == "572").unwrap();
    let err = env
        .reconciler
        .ledger_mut()
        .delete_lines(&[bank.id.clone()], GuardMode::Enforce)
        .await
        .unwrap_err();
    match err {
        LedgerError::LineDeletionBlocked {
            move_number,
            statement_line,
        } => {
            assert_eq!(Some(move_number), mv.number.clone());
            assert_eq!(statement_line, "st1 - Customer transfer");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = env
        .reconciler
        .ledger_mut()
        .delete_moves(&[mv.id.clone()], GuardMode::Enforce)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PostedMoveModification(_)));

    // Nothing changed
    assert!(env
        .reconciler
        .ledger()
        .get_reconciliation_required(&reconciliation_id)
        .await
        .is_ok());
    assert_eq!(
        env.reconciler.ledger().get_move_lines(&mv.id).await.unwrap(),
        lines
    );
}

#[tokio::test]
async fn test_cancel_removes_bank_links_of_generated_moves() {
    let mut env = setup().await;
    let invoice = env.invoice(70).await;
    env.statement_line("st1", 70).await;
    env.reconciler
        .add_counterpart_lines("st1", &[invoice.id.clone()])
        .await
        .unwrap();
    env.confirm("st1").await;
    env.reconciler.post(&["st1".to_string()]).await.unwrap();

    let (mv, _) = env.generated_move(&invoice).await;
    env.reconciler
        .statements_mut()
        .link_move("st1", &mv.id, BigDecimal::from(70), None)
        .await
        .unwrap();

    // Linked moves block line deletion even for lines without back-reference
    let lines = env.reconciler.ledger().get_move_lines(&mv.id).await.unwrap();
    let mirror = lines.iter().find(|l| l.account_id == "430").unwrap();
    assert!(matches!(
        env.reconciler
            .ledger_mut()
            .delete_lines(&[mirror.id.clone()], GuardMode::Enforce)
            .await,
        Err(LedgerError::LineDeletionBlocked { .. })
    ));

    env.reconciler.cancel(&["st1".to_string()]).await.unwrap();
    assert!(env
        .reconciler
        .statements()
        .links_of("st1")
        .await
        .unwrap()
        .is_empty());
    assert!(!env.line(&invoice.id).await.is_reconciled());
}

#[tokio::test]
async fn test_second_currency_on_foreign_statement() {
    let mut env = setup_with(Currency::new("USD", 2), CounterpartConfig::default()).await;
    let invoice = env.invoice(100).await;
    env.statement_line("st1", 200).await;
    env.reconciler
        .add_counterpart_lines("st1", &[invoice.id.clone()])
        .await
        .unwrap();
    env.confirm("st1").await;
    env.reconciler.post(&["st1".to_string()]).await.unwrap();

    let (_, lines) = env.generated_move(&invoice).await;
    let mirror = lines.iter().find(|l| l.account_id == "430").unwrap();
    assert_eq!(mirror.second_currency, Some(Currency::new("USD", 2)));
    assert_eq!(mirror.amount_second_currency, Some(BigDecimal::from(-200)));
    let bank = lines.iter().find(|l| l.account_id == "572").unwrap();
    assert_eq!(bank.amount_second_currency, Some(BigDecimal::from(200)));
}

#[tokio::test]
async fn test_post_requires_period_for_account_date() {
    let mut env = setup().await;
    let invoice = env.invoice(10).await;
    env.statement_line("st1", 10).await;
    env.reconciler
        .add_counterpart_lines("st1", &[invoice.id.clone()])
        .await
        .unwrap();

    let mut st = env
        .reconciler
        .statements()
        .get_line_required("st1")
        .await
        .unwrap();
    st.account_date_utc = Some(
        NaiveDate::from_ymd_opt(2024, 2, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
    );
    env.reconciler.statements_mut().save_line(&st).await.unwrap();
    env.confirm("st1").await;
    let moves_before = env.storage.move_count().unwrap();

    assert!(matches!(
        env.reconciler.post(&["st1".to_string()]).await,
        Err(LedgerError::PeriodNotFound { .. })
    ));
    assert_eq!(env.storage.move_count().unwrap(), moves_before);
}

#[tokio::test]
async fn test_counterpart_selection_rules() {
    let mut env = setup().await;
    let invoice = env.invoice(40).await;
    let created = env.statement_line("st1", 40).await;
    assert_eq!(created.account_date_utc, Some(created.date));
    env.statement_line("st2", 40).await;

    env.reconciler
        .add_counterpart_lines("st1", &[invoice.id.clone()])
        .await
        .unwrap();
    // A line selected by another statement line is not available
    assert!(matches!(
        env.reconciler
            .add_counterpart_lines("st2", &[invoice.id.clone()])
            .await,
        Err(LedgerError::IneligibleCounterpart { .. })
    ));
    // Neither are lines on accounts that do not reconcile
    let sales = env
        .reconciler
        .ledger()
        .get_move_lines(&invoice.move_id)
        .await
        .unwrap()
        .into_iter()
        .find(|l| l.account_id == "700")
        .unwrap();
    assert!(env
        .reconciler
        .add_counterpart_lines("st2", &[sales.id])
        .await
        .is_err());

    let st = env
        .reconciler
        .remove_counterpart_lines("st1", &[invoice.id.clone()])
        .await
        .unwrap();
    assert!(st.counterpart_line_ids.is_empty());
    env.reconciler
        .add_counterpart_lines("st2", &[invoice.id.clone()])
        .await
        .unwrap();

    env.confirm("st2").await;
    env.reconciler.post(&["st2".to_string()]).await.unwrap();
    assert!(matches!(
        env.reconciler.add_counterpart_lines("st2", &[]).await,
        Err(LedgerError::InvalidStatementState { .. })
    ));
}

#[tokio::test]
async fn test_post_requires_confirmed_line() {
    let mut env = setup().await;
    env.statement_line("st1", 5).await;
    assert!(matches!(
        env.reconciler.post(&["st1".to_string()]).await,
        Err(LedgerError::InvalidStatementState { .. })
    ));
}

#[tokio::test]
async fn test_canceled_line_can_be_reset_and_posted_again() {
    let mut env = setup().await;
    let invoice = env.invoice(55).await;
    env.statement_line("st1", 55).await;
    env.reconciler
        .add_counterpart_lines("st1", &[invoice.id.clone()])
        .await
        .unwrap();
    env.confirm("st1").await;
    env.reconciler.post(&["st1".to_string()]).await.unwrap();
    env.reconciler.cancel(&["st1".to_string()]).await.unwrap();

    env.reconciler
        .statements_mut()
        .reset_lines(&["st1".to_string()])
        .await
        .unwrap();
    assert!(env
        .reconciler
        .search_reconciliation("st1")
        .await
        .unwrap()
        .is_some());
    env.confirm("st1").await;
    env.reconciler.post(&["st1".to_string()]).await.unwrap();

    let (mv, lines) = env.generated_move(&invoice).await;
    assert!(mv.is_posted());
    assert_eq!(lines.len(), 2);
    assert_eq!(env.storage.reconciliation_count().unwrap(), 1);
}

async fn invoice_settled_outside_statement(env: &mut Env) -> (MoveLine, MoveLine) {
    let invoice = env.invoice(100).await;
    env.statement_line("st1", 100).await;
    env.reconciler
        .add_counterpart_lines("st1", &[invoice.id.clone()])
        .await
        .unwrap();
    env.confirm("st1").await;

    let payment = env.payment(100).await;
    env.reconciler
        .ledger_mut()
        .reconcile(&[invoice.id.clone(), payment.id.clone()], day(5))
        .await
        .unwrap();
    (env.line(&invoice.id).await, payment)
}

async fn assert_settlement_untouched(env: &Env, invoice: &MoveLine, payment: &MoveLine) {
    let ledger = env.reconciler.ledger();
    assert!(ledger.get_move_required(&payment.move_id).await.unwrap().is_posted());
    assert_eq!(env.line(&invoice.id).await, *invoice);
    let reconciliation_id = invoice.reconciliation_id.as_deref().unwrap();
    assert!(ledger
        .get_reconciliation_required(reconciliation_id)
        .await
        .is_ok());
    assert_eq!(env.line(&payment.id).await.reconciliation_id, invoice.reconciliation_id);
}

#[tokio::test]
async fn test_cancel_after_post_keeps_foreign_reconciliation() {
    let mut env = setup().await;
    let (invoice, payment) = invoice_settled_outside_statement(&mut env).await;
    let moves_before = env.storage.move_count().unwrap();

    env.reconciler.post(&["st1".to_string()]).await.unwrap();
    assert_eq!(env.storage.move_count().unwrap(), moves_before);

    env.reconciler.cancel(&["st1".to_string()]).await.unwrap();
    assert_eq!(env.storage.move_count().unwrap(), moves_before);
    assert_eq!(env.storage.reconciliation_count().unwrap(), 1);
    assert_settlement_untouched(&env, &invoice, &payment).await;
}

#[tokio::test]
async fn test_cancel_confirmed_line_keeps_foreign_reconciliation() {
    let mut env = setup().await;
    let (invoice, payment) = invoice_settled_outside_statement(&mut env).await;
    let moves_before = env.storage.move_count().unwrap();

    env.reconciler.cancel(&["st1".to_string()]).await.unwrap();
    assert_eq!(env.storage.move_count().unwrap(), moves_before);
    assert_settlement_untouched(&env, &invoice, &payment).await;

    let st = env
        .reconciler
        .statements()
        .get_line_required("st1")
        .await
        .unwrap();
    assert_eq!(st.state, StatementLineState::Canceled);
    assert!(st.counterpart_line_ids.is_empty());
}

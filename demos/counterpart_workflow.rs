//! Counterpart reconciliation walkthrough
//!
//! Run with `RUST_LOG=bank_statement_counterpart=debug` to follow the ledger
//! operations.

use bank_statement_counterpart::{
    Account, BankStatement, Company, CounterpartConfig, CounterpartReconciler, Currency, Journal,
    MemoryStorage, MoveBuilder, Period, RateTable, StatementJournal, StatementLine,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🏦 Bank Statement Counterpart - Workflow Example\n");

    let storage = MemoryStorage::new();
    let eur = Currency::new("EUR", 2);
    let date = NaiveDate::from_ymd_opt(2024, 3, 12).ok_or("invalid date")?;
    let rates = RateTable::new().with_rate(&eur, date, BigDecimal::from(1));
    let mut reconciler =
        CounterpartReconciler::new(storage.clone(), Arc::new(rates), CounterpartConfig::default())?;

    // 1. Company, period, accounts and journals
    println!("📊 Setting up the ledger...");
    let ledger = reconciler.ledger_mut();
    ledger
        .create_company(Company {
            id: "acme".to_string(),
            name: "Acme Ltd".to_string(),
            party_id: "party-acme".to_string(),
            currency: eur.clone(),
        })
        .await?;
    let period = ledger
        .create_period(Period::new(
            "2024-03".to_string(),
            "acme".to_string(),
            "March 2024".to_string(),
            NaiveDate::from_ymd_opt(2024, 3, 1).ok_or("invalid date")?,
            NaiveDate::from_ymd_opt(2024, 3, 31).ok_or("invalid date")?,
        ))
        .await?;
    for account in [
        Account::new("430".to_string(), "430".to_string(), "Customers".to_string())
            .reconcilable()
            .with_party_required(),
        Account::new("700".to_string(), "700".to_string(), "Sales".to_string()),
        Account::new("572".to_string(), "572".to_string(), "Bank".to_string()).bank_reconcilable(),
    ] {
        let account = ledger.create_account(account).await?;
        println!("  ✓ Account {}", account.rec_name());
    }
    for (id, name) in [("SAL", "Sales"), ("BNK", "Bank")] {
        ledger
            .create_journal(Journal {
                id: id.to_string(),
                name: name.to_string(),
            })
            .await?;
    }
    ledger
        .create_statement_journal(StatementJournal {
            id: "main-bank".to_string(),
            name: "Main Bank".to_string(),
            journal_id: "BNK".to_string(),
            currency: eur.clone(),
            debit_account_id: Some("572".to_string()),
            credit_account_id: Some("572".to_string()),
        })
        .await?;
    println!();

    // 2. An open customer invoice
    println!("🧾 Posting customer invoice...");
    let (invoice, lines) = MoveBuilder::new(
        "acme".to_string(),
        period.id.clone(),
        "SAL".to_string(),
        NaiveDate::from_ymd_opt(2024, 3, 2).ok_or("invalid date")?,
    )
    .debit(
        "430".to_string(),
        BigDecimal::from(1250),
        Some("customer-42".to_string()),
        Some("Invoice 2024/0042".to_string()),
    )
    .credit("700".to_string(), BigDecimal::from(1250), None, None)
    .build()?;
    let (invoice, _) = reconciler.ledger_mut().record_move(invoice, lines).await?;
    println!("  ✓ Posted {} for €1250\n", invoice.rec_name());

    // 3. The bank reports the payment
    println!("📥 Importing bank statement...");
    let statements = reconciler.statements_mut();
    statements
        .create_statement(BankStatement {
            id: "stmt-0312".to_string(),
            company_id: "acme".to_string(),
            journal_id: "main-bank".to_string(),
            date,
        })
        .await?;
    let st_line = statements
        .create_line(StatementLine::new(
            "stl-1".to_string(),
            "stmt-0312".to_string(),
            "acme".to_string(),
            "1".to_string(),
            date.and_hms_opt(8, 30, 0).ok_or("invalid time")?,
            "Transfer customer 42".to_string(),
            BigDecimal::from(1250),
        ))
        .await?;
    println!("  ✓ Statement line {} for €{}\n", st_line.rec_name(), st_line.amount);

    // 4. Match, confirm and post
    println!("🔎 Searching counterpart...");
    match reconciler.search_reconciliation(&st_line.id).await? {
        Some(line) => println!("  ✓ Matched move line {} ({})", line.id, line.debit),
        None => println!("  ✗ No unambiguous counterpart"),
    }
    reconciler
        .statements_mut()
        .confirm_lines(&[st_line.id.clone()])
        .await?;
    reconciler.post(&[st_line.id.clone()]).await?;
    println!(
        "  ✓ Posted statement line, {} moves in ledger\n",
        storage.move_count()?
    );

    // 5. Undo everything
    println!("↩️  Canceling statement line...");
    reconciler.cancel(&[st_line.id.clone()]).await?;
    println!(
        "  ✓ Canceled, {} moves and {} reconciliations left",
        storage.move_count()?,
        storage.reconciliation_count()?
    );

    Ok(())
}

//! Construction of the two lines balancing a statement line against a counterpart

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::traits::CurrencyConverter;
use crate::types::*;

/// Records a counterpart move is built from
pub struct CounterpartContext<'a> {
    pub company: &'a Company,
    pub statement: &'a BankStatement,
    pub statement_line: &'a StatementLine,
    pub journal: &'a StatementJournal,
    /// Account of the counterpart line
    pub account: &'a Account,
    /// Display name of the counterpart line for error messages
    pub line_name: &'a str,
    /// Company-local transaction date of the statement line, for rates
    pub conversion_date: NaiveDate,
}

/// Bank and mirror lines of a counterpart move
#[derive(Debug, Clone, PartialEq)]
pub struct CounterpartLines {
    pub bank: MoveLine,
    pub mirror: MoveLine,
}

impl CounterpartLines {
    pub fn into_vec(self) -> Vec<MoveLine> {
        vec![self.bank, self.mirror]
    }
}

/// Bank account the statement journal posts against for a counterpart of
/// the given signed amount: the credit-side account for non-negative
/// amounts, the debit-side one otherwise
pub fn journal_bank_account_id<'a>(
    journal: &'a StatementJournal,
    amount: &BigDecimal,
) -> LedgerResult<&'a str> {
    let account_id = if *amount >= BigDecimal::from(0) {
        journal.credit_account_id.as_deref()
    } else {
        journal.debit_account_id.as_deref()
    };
    account_id.ok_or_else(|| LedgerError::MissingJournalAccount {
        journal: journal.name.clone(),
    })
}

/// Check the resolved bank account against the counterpart line
pub fn check_bank_account(
    ctx: &CounterpartContext<'_>,
    bank_account: &Account,
) -> LedgerResult<()> {
    if !bank_account.bank_reconcile {
        return Err(LedgerError::AccountNotBankReconcilable {
            journal: ctx.journal.name.clone(),
        });
    }
    if bank_account.id == ctx.account.id {
        return Err(LedgerError::SameAccount {
            account: ctx.account.rec_name(),
            line: ctx.line_name.to_string(),
            journal: ctx.journal.name.clone(),
        });
    }
    Ok(())
}

/// Build the mirror line (counterpart account, debit and credit swapped) and
/// the bank line (journal account) for one counterpart
///
/// The two lines always net to zero.
pub fn build_counterpart_lines(
    ctx: &CounterpartContext<'_>,
    counterpart: &MoveLine,
    bank_account: &Account,
    converter: &dyn CurrencyConverter,
) -> LedgerResult<CounterpartLines> {
    check_bank_account(ctx, bank_account)?;

    let zero = BigDecimal::from(0);
    let amount = counterpart.balance();

    let mut mirror = MoveLine::new(
        counterpart.account_id.clone(),
        counterpart.credit.clone(),
        counterpart.debit.clone(),
    );
    mirror.description = counterpart.description.clone();
    mirror.origin = Some(Origin::BankStatementLine(ctx.statement_line.id.clone()));
    if ctx.account.party_required {
        mirror.party_id = counterpart.party_id.clone();
    }

    let (debit, credit) = if amount >= zero {
        (amount.clone(), zero.clone())
    } else {
        (zero.clone(), -amount.clone())
    };
    let mut bank = MoveLine::new(bank_account.id.clone(), debit, credit);
    bank.description = Some(ctx.statement_line.description.clone());
    bank.origin = Some(Origin::BankStatement(ctx.statement.id.clone()));
    if bank_account.party_required {
        bank.party_id = counterpart
            .party_id
            .clone()
            .or_else(|| Some(ctx.company.party_id.clone()));
    }

    if ctx.journal.currency != ctx.company.currency {
        let converted = converter
            .compute(
                &ctx.company.currency,
                &amount,
                &ctx.journal.currency,
                ctx.conversion_date,
            )?
            .abs();
        // Mirror follows its own side: negative when it credits
        let mirror_amount = if amount > zero {
            -converted
        } else {
            converted
        };
        bank.amount_second_currency = Some(-mirror_amount.clone());
        bank.second_currency = Some(ctx.journal.currency.clone());
        mirror.amount_second_currency = Some(mirror_amount);
        mirror.second_currency = Some(ctx.journal.currency.clone());
    }

    Ok(CounterpartLines { bank, mirror })
}

//! Validation utilities

use bigdecimal::BigDecimal;

use crate::types::*;

/// Validate that an account code and name are usable
pub fn validate_account(account: &Account) -> LedgerResult<()> {
    if account.id.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account ID cannot be empty".to_string(),
        ));
    }

    if account.code.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account code cannot be empty".to_string(),
        ));
    }

    // Codes are alphanumeric with dots and dashes
    if !account
        .code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '.')
    {
        return Err(LedgerError::Validation(
            "Account code can only contain alphanumeric characters, dots, and dashes".to_string(),
        ));
    }

    if account.name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account name cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a move's lines balance (total debit equals total credit)
pub fn validate_balanced(mv: &Move, lines: &[MoveLine]) -> LedgerResult<()> {
    if lines.is_empty() {
        return Err(LedgerError::InvalidMove(format!(
            "move \"{}\" has no lines",
            mv.rec_name()
        )));
    }

    let balance: BigDecimal = lines.iter().map(|line| line.balance()).sum();
    if balance != BigDecimal::from(0) {
        return Err(LedgerError::InvalidMove(format!(
            "move \"{}\" is not balanced: debit - credit = {}",
            mv.rec_name(),
            balance
        )));
    }
    Ok(())
}

/// Validate that line amounts are non-negative and one-sided
pub fn validate_line_amounts(line: &MoveLine) -> LedgerResult<()> {
    let zero = BigDecimal::from(0);
    if line.debit < zero || line.credit < zero {
        return Err(LedgerError::InvalidMove(format!(
            "line \"{}\" has a negative amount",
            line.id
        )));
    }
    if line.debit != zero && line.credit != zero {
        return Err(LedgerError::InvalidMove(format!(
            "line \"{}\" has both debit and credit",
            line.id
        )));
    }
    Ok(())
}

/// Validate that a move line may be selected as counterpart of a statement line
///
/// `tagged_by` holds the statement lines that already selected the line.
pub fn validate_counterpart_candidate(
    statement_line: &StatementLine,
    line: &MoveLine,
    mv: &Move,
    account: &Account,
    tagged_by: &[StatementLine],
) -> LedgerResult<()> {
    let ineligible = |reason: &str| LedgerError::IneligibleCounterpart {
        line: line.id.clone(),
        reason: reason.to_string(),
    };

    if mv.company_id != statement_line.company_id {
        return Err(ineligible("it belongs to another company"));
    }
    if !mv.is_posted() {
        return Err(ineligible("its move is not posted"));
    }
    if !account.reconcile {
        return Err(ineligible("its account is not reconcilable"));
    }
    if line.is_reconciled() {
        return Err(ineligible("it is already reconciled"));
    }
    if line.bank_statement_line_counterpart.is_some() {
        return Err(ineligible("it was generated by a bank statement line"));
    }
    if let Some(other) = tagged_by.iter().find(|st| st.id != statement_line.id) {
        return Err(ineligible(&format!(
            "it is already selected by statement line \"{}\"",
            other.rec_name()
        )));
    }
    Ok(())
}

/// Validate a statement line before it is saved
pub fn validate_statement_line(line: &StatementLine) -> LedgerResult<()> {
    if !line.counterpart_line_ids.is_empty() && line.account_date_utc.is_none() {
        return Err(LedgerError::AccountDateRequired {
            line: line.rec_name(),
        });
    }
    Ok(())
}

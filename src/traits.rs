//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::types::*;

/// Storage abstraction for the ledger and bank statement records
///
/// This trait allows the reconciliation logic to work with any storage
/// backend (PostgreSQL, SQLite, in-memory, etc.) by implementing these methods.
#[async_trait]
pub trait AccountingStorage: Send + Sync {
    /// Save a company
    async fn save_company(&mut self, company: &Company) -> LedgerResult<()>;

    /// Get a company by ID
    async fn get_company(&self, company_id: &str) -> LedgerResult<Option<Company>>;

    /// Save an account
    async fn save_account(&mut self, account: &Account) -> LedgerResult<()>;

    /// Get an account by ID
    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>>;

    /// Save an accounting period
    async fn save_period(&mut self, period: &Period) -> LedgerResult<()>;

    /// Get a period by ID
    async fn get_period(&self, period_id: &str) -> LedgerResult<Option<Period>>;

    /// Find the open period of a company covering a date
    ///
    /// Fails with [`LedgerError::PeriodNotFound`] when no period matches.
    async fn find_period(&self, company_id: &str, date: NaiveDate) -> LedgerResult<Period>;

    /// Save an accounting journal
    async fn save_journal(&mut self, journal: &Journal) -> LedgerResult<()>;

    /// Get an accounting journal by ID
    async fn get_journal(&self, journal_id: &str) -> LedgerResult<Option<Journal>>;

    /// Save a bank statement journal
    async fn save_statement_journal(&mut self, journal: &StatementJournal) -> LedgerResult<()>;

    /// Get a bank statement journal by ID
    async fn get_statement_journal(&self, journal_id: &str)
        -> LedgerResult<Option<StatementJournal>>;

    /// Save a bank statement
    async fn save_statement(&mut self, statement: &BankStatement) -> LedgerResult<()>;

    /// Get a bank statement by ID
    async fn get_statement(&self, statement_id: &str) -> LedgerResult<Option<BankStatement>>;

    /// Save (insert or replace) a statement line
    async fn save_statement_line(&mut self, line: &StatementLine) -> LedgerResult<()>;

    /// Get a statement line by ID
    async fn get_statement_line(&self, line_id: &str) -> LedgerResult<Option<StatementLine>>;

    /// Statement lines that selected the given move line as a counterpart
    async fn statement_lines_with_counterpart(
        &self,
        move_line_id: &str,
    ) -> LedgerResult<Vec<StatementLine>>;

    /// Save (insert or replace) a move header
    async fn save_move(&mut self, mv: &Move) -> LedgerResult<()>;

    /// Get a move by ID
    async fn get_move(&self, move_id: &str) -> LedgerResult<Option<Move>>;

    /// Delete a move header
    async fn delete_move(&mut self, move_id: &str) -> LedgerResult<()>;

    /// Next number in the sequence of the given journal
    async fn next_move_number(&mut self, journal_id: &str) -> LedgerResult<String>;

    /// Save (insert or replace) a move line
    async fn save_move_line(&mut self, line: &MoveLine) -> LedgerResult<()>;

    /// Get a move line by ID
    async fn get_move_line(&self, line_id: &str) -> LedgerResult<Option<MoveLine>>;

    /// All lines of a move
    async fn get_move_lines(&self, move_id: &str) -> LedgerResult<Vec<MoveLine>>;

    /// Search move lines matching every set criterion of the filter
    async fn search_move_lines(&self, filter: &MoveLineFilter) -> LedgerResult<Vec<MoveLine>>;

    /// Delete a move line
    async fn delete_move_line(&mut self, line_id: &str) -> LedgerResult<()>;

    /// Save a reconciliation
    async fn save_reconciliation(&mut self, reconciliation: &Reconciliation) -> LedgerResult<()>;

    /// Get a reconciliation by ID
    async fn get_reconciliation(
        &self,
        reconciliation_id: &str,
    ) -> LedgerResult<Option<Reconciliation>>;

    /// Delete a reconciliation record
    async fn delete_reconciliation(&mut self, reconciliation_id: &str) -> LedgerResult<()>;

    /// Save a statement line to move link
    async fn save_bank_link(&mut self, link: &BankMoveLink) -> LedgerResult<()>;

    /// Links attached to any of the given moves
    async fn bank_links_for_moves(&self, move_ids: &[String]) -> LedgerResult<Vec<BankMoveLink>>;

    /// Links of a statement line
    async fn bank_links_for_statement_line(
        &self,
        statement_line_id: &str,
    ) -> LedgerResult<Vec<BankMoveLink>>;

    /// Delete a statement line to move link
    async fn delete_bank_link(&mut self, link_id: &str) -> LedgerResult<()>;
}

/// Currency conversion collaborator
pub trait CurrencyConverter: Send + Sync {
    /// Convert `amount` from one currency to another at the rate in force on
    /// `date`, rounded to the target currency precision
    fn compute(
        &self,
        from: &Currency,
        amount: &BigDecimal,
        to: &Currency,
        date: NaiveDate,
    ) -> LedgerResult<BigDecimal>;
}

/// Extension point consulted by the ledger before it mutates protected records
///
/// Implementations either allow the operation or return the error that
/// aborts it. The [`GuardMode`] tells the guard which caller is asking.
#[async_trait]
pub trait LedgerGuard<S: AccountingStorage>: Send + Sync {
    /// Validate modification or deletion of moves
    async fn check_modify(&self, storage: &S, moves: &[Move], mode: GuardMode)
        -> LedgerResult<()>;

    /// Validate rewriting a single move line
    async fn check_line_write(
        &self,
        storage: &S,
        old: &MoveLine,
        new: &MoveLine,
        mode: GuardMode,
    ) -> LedgerResult<()>;

    /// Validate deletion of move lines
    async fn check_line_deletion(
        &self,
        storage: &S,
        lines: &[MoveLine],
        mode: GuardMode,
    ) -> LedgerResult<()>;

    /// Validate deletion of reconciliations
    async fn check_reconciliation_deletion(
        &self,
        storage: &S,
        reconciliations: &[Reconciliation],
        mode: GuardMode,
    ) -> LedgerResult<()>;
}

/// Default guard with the base ledger rules: posted moves are immutable and
/// reconciled lines cannot be deleted
#[derive(Debug, Clone)]
pub struct HostGuard {
    modify_exclude: Vec<MoveLineField>,
}

impl HostGuard {
    pub fn new() -> Self {
        Self {
            modify_exclude: vec![MoveLineField::Reconciliation],
        }
    }

    /// Additionally allow writing `field` on lines of posted moves
    pub fn exclude_from_modify_check(mut self, field: MoveLineField) -> Self {
        if !self.modify_exclude.contains(&field) {
            self.modify_exclude.push(field);
        }
        self
    }
}

impl Default for HostGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: AccountingStorage> LedgerGuard<S> for HostGuard {
    async fn check_modify(
        &self,
        _storage: &S,
        moves: &[Move],
        _mode: GuardMode,
    ) -> LedgerResult<()> {
        if let Some(posted) = moves.iter().find(|mv| mv.is_posted()) {
            return Err(LedgerError::PostedMoveModification(posted.rec_name()));
        }
        Ok(())
    }

    async fn check_line_write(
        &self,
        storage: &S,
        old: &MoveLine,
        new: &MoveLine,
        _mode: GuardMode,
    ) -> LedgerResult<()> {
        if old.same_except(new, &self.modify_exclude) {
            return Ok(());
        }
        let mv = storage
            .get_move(&old.move_id)
            .await?
            .ok_or_else(|| LedgerError::MoveNotFound(old.move_id.clone()))?;
        if mv.is_posted() {
            return Err(LedgerError::PostedMoveModification(mv.rec_name()));
        }
        Ok(())
    }

    async fn check_line_deletion(
        &self,
        storage: &S,
        lines: &[MoveLine],
        mode: GuardMode,
    ) -> LedgerResult<()> {
        if let Some(line) = lines.iter().find(|l| l.is_reconciled()) {
            return Err(LedgerError::Reconcile(format!(
                "line \"{}\" is reconciled and cannot be deleted",
                line.id
            )));
        }

        let mut moves = Vec::new();
        for line in lines {
            if moves.iter().any(|mv: &Move| mv.id == line.move_id) {
                continue;
            }
            if let Some(mv) = storage.get_move(&line.move_id).await? {
                moves.push(mv);
            }
        }
        LedgerGuard::<S>::check_modify(self, storage, &moves, mode).await
    }

    async fn check_reconciliation_deletion(
        &self,
        _storage: &S,
        _reconciliations: &[Reconciliation],
        _mode: GuardMode,
    ) -> LedgerResult<()> {
        Ok(())
    }
}

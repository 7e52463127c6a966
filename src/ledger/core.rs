//! Main ledger orchestrator that coordinates accounts, moves and reconciliations

use chrono::NaiveDate;
use std::sync::Arc;

use crate::ledger::{AccountManager, MoveManager, ReconciliationManager};
use crate::traits::*;
use crate::types::*;

/// Main ledger system that orchestrates all accounting operations
pub struct Ledger<S: AccountingStorage> {
    account_manager: AccountManager<S>,
    move_manager: MoveManager<S>,
    reconciliation_manager: ReconciliationManager<S>,
}

impl<S: AccountingStorage + Clone + 'static> Ledger<S> {
    /// Create a new ledger with the base guard rules
    pub fn new(storage: S) -> Self {
        Self::with_guard(storage, Arc::new(HostGuard::new()))
    }

    /// Create a new ledger whose mutations are checked by a custom guard
    pub fn with_guard(storage: S, guard: Arc<dyn LedgerGuard<S>>) -> Self {
        Self {
            account_manager: AccountManager::new(storage.clone()),
            move_manager: MoveManager::new(storage.clone(), guard.clone()),
            reconciliation_manager: ReconciliationManager::new(storage, guard),
        }
    }

    /// Storage backing the ledger
    pub fn storage(&self) -> &S {
        &self.account_manager.storage
    }

    /// Mutable storage backing the ledger
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.account_manager.storage
    }

    // Setup operations
    /// Register a company
    pub async fn create_company(&mut self, company: Company) -> LedgerResult<Company> {
        self.account_manager.create_company(company).await
    }

    /// Get a company by ID, returning an error if not found
    pub async fn get_company_required(&self, company_id: &str) -> LedgerResult<Company> {
        self.account_manager.get_company_required(company_id).await
    }

    /// Create a new account
    pub async fn create_account(&mut self, account: Account) -> LedgerResult<Account> {
        self.account_manager.create_account(account).await
    }

    /// Get an account by ID, returning an error if not found
    pub async fn get_account_required(&self, account_id: &str) -> LedgerResult<Account> {
        self.account_manager.get_account_required(account_id).await
    }

    /// Register an accounting period
    pub async fn create_period(&mut self, period: Period) -> LedgerResult<Period> {
        self.account_manager.create_period(period).await
    }

    /// Close an accounting period
    pub async fn close_period(&mut self, period_id: &str) -> LedgerResult<()> {
        self.account_manager.close_period(period_id).await
    }

    /// Find the open period of a company covering a date
    pub async fn find_period(&self, company_id: &str, date: NaiveDate) -> LedgerResult<Period> {
        self.account_manager
            .storage
            .find_period(company_id, date)
            .await
    }

    /// Register an accounting journal
    pub async fn create_journal(&mut self, journal: Journal) -> LedgerResult<Journal> {
        self.account_manager.create_journal(journal).await
    }

    /// Register a bank statement journal
    pub async fn create_statement_journal(
        &mut self,
        journal: StatementJournal,
    ) -> LedgerResult<StatementJournal> {
        self.account_manager.create_statement_journal(journal).await
    }

    /// Get a bank statement journal by ID, returning an error if not found
    pub async fn get_statement_journal_required(
        &self,
        journal_id: &str,
    ) -> LedgerResult<StatementJournal> {
        self.account_manager
            .get_statement_journal_required(journal_id)
            .await
    }

    // Move operations
    /// Save a new draft move with its lines
    pub async fn create_move(
        &mut self,
        mv: Move,
        lines: Vec<MoveLine>,
    ) -> LedgerResult<(Move, Vec<MoveLine>)> {
        self.move_manager.create_move(mv, lines).await
    }

    /// Save and post a move in one step
    pub async fn record_move(
        &mut self,
        mv: Move,
        lines: Vec<MoveLine>,
    ) -> LedgerResult<(Move, Vec<MoveLine>)> {
        let (mv, lines) = self.move_manager.create_move(mv, lines).await?;
        let mut posted = self.move_manager.post_moves(&[mv.id.clone()]).await?;
        let mv = posted.pop().ok_or_else(|| LedgerError::MoveNotFound(mv.id.clone()))?;
        Ok((mv, lines))
    }

    /// Post draft moves
    pub async fn post_moves(&mut self, move_ids: &[String]) -> LedgerResult<Vec<Move>> {
        self.move_manager.post_moves(move_ids).await
    }

    /// Get a move by ID, returning an error if not found
    pub async fn get_move_required(&self, move_id: &str) -> LedgerResult<Move> {
        self.move_manager.get_move_required(move_id).await
    }

    /// Get a move line by ID, returning an error if not found
    pub async fn get_line_required(&self, line_id: &str) -> LedgerResult<MoveLine> {
        self.move_manager.get_line_required(line_id).await
    }

    /// All lines of a move
    pub async fn get_move_lines(&self, move_id: &str) -> LedgerResult<Vec<MoveLine>> {
        self.move_manager.get_move_lines(move_id).await
    }

    /// Search move lines
    pub async fn search_move_lines(&self, filter: &MoveLineFilter) -> LedgerResult<Vec<MoveLine>> {
        self.move_manager.storage.search_move_lines(filter).await
    }

    /// Rewrite a move line
    pub async fn write_line(&mut self, line: &MoveLine, mode: GuardMode) -> LedgerResult<()> {
        self.move_manager.write_line(line, mode).await
    }

    /// Duplicate a move as a new draft
    pub async fn copy_move(&mut self, move_id: &str, date: Option<NaiveDate>) -> LedgerResult<Move> {
        self.move_manager.copy_move(move_id, date).await
    }

    /// Delete move lines
    pub async fn delete_lines(&mut self, line_ids: &[String], mode: GuardMode) -> LedgerResult<()> {
        self.move_manager.delete_lines(line_ids, mode).await
    }

    /// Delete moves together with their lines
    pub async fn delete_moves(&mut self, move_ids: &[String], mode: GuardMode) -> LedgerResult<()> {
        self.move_manager.delete_moves(move_ids, mode).await
    }

    // Reconciliation operations
    /// Reconcile offsetting lines
    pub async fn reconcile(
        &mut self,
        line_ids: &[String],
        date: NaiveDate,
    ) -> LedgerResult<Reconciliation> {
        self.reconciliation_manager.reconcile(line_ids, date).await
    }

    /// Get a reconciliation by ID, returning an error if not found
    pub async fn get_reconciliation_required(
        &self,
        reconciliation_id: &str,
    ) -> LedgerResult<Reconciliation> {
        self.reconciliation_manager
            .get_reconciliation_required(reconciliation_id)
            .await
    }

    /// Delete reconciliations
    pub async fn delete_reconciliations(
        &mut self,
        reconciliation_ids: &[String],
        mode: GuardMode,
    ) -> LedgerResult<()> {
        self.reconciliation_manager
            .delete_reconciliations(reconciliation_ids, mode)
            .await
    }
}

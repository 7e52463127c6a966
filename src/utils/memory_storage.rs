//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct Tables {
    companies: HashMap<String, Company>,
    accounts: HashMap<String, Account>,
    periods: HashMap<String, Period>,
    journals: HashMap<String, Journal>,
    statement_journals: HashMap<String, StatementJournal>,
    statements: HashMap<String, BankStatement>,
    statement_lines: HashMap<String, StatementLine>,
    moves: HashMap<String, Move>,
    move_lines: HashMap<String, MoveLine>,
    reconciliations: HashMap<String, Reconciliation>,
    bank_links: HashMap<String, BankMoveLink>,
    sequences: HashMap<String, u64>,
}

/// In-memory storage implementation for testing and development
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored moves
    pub fn move_count(&self) -> LedgerResult<usize> {
        Ok(self.read()?.moves.len())
    }

    /// Number of stored reconciliations
    pub fn reconciliation_count(&self) -> LedgerResult<usize> {
        Ok(self.read()?.reconciliations.len())
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| LedgerError::Storage(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| LedgerError::Storage(format!("lock poisoned: {}", e)))
    }
}

fn line_matches(tables: &Tables, line: &MoveLine, filter: &MoveLineFilter) -> bool {
    let mv = tables.moves.get(&line.move_id);

    if let Some(company_id) = &filter.company_id {
        if mv.is_none_or(|mv| &mv.company_id != company_id) {
            return false;
        }
    }
    if let Some(move_ids) = &filter.move_ids {
        if !move_ids.contains(&line.move_id) {
            return false;
        }
    }
    if let Some(account_id) = &filter.account_id {
        if &line.account_id != account_id {
            return false;
        }
    }
    if filter.unreconciled && line.is_reconciled() {
        return false;
    }
    if filter.without_counterpart_reference && line.bank_statement_line_counterpart.is_some() {
        return false;
    }
    if filter.posted_only && !mv.is_some_and(|mv| mv.is_posted()) {
        return false;
    }
    if filter.reconcilable_accounts_only
        && !tables
            .accounts
            .get(&line.account_id)
            .is_some_and(|account| account.reconcile)
    {
        return false;
    }
    if let Some(debit) = &filter.debit {
        if &line.debit != debit {
            return false;
        }
    }
    if let Some(credit) = &filter.credit {
        if &line.credit != credit {
            return false;
        }
    }
    true
}

#[async_trait]
impl AccountingStorage for MemoryStorage {
    async fn save_company(&mut self, company: &Company) -> LedgerResult<()> {
        self.write()?
            .companies
            .insert(company.id.clone(), company.clone());
        Ok(())
    }

    async fn get_company(&self, company_id: &str) -> LedgerResult<Option<Company>> {
        Ok(self.read()?.companies.get(company_id).cloned())
    }

    async fn save_account(&mut self, account: &Account) -> LedgerResult<()> {
        self.write()?
            .accounts
            .insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        Ok(self.read()?.accounts.get(account_id).cloned())
    }

    async fn save_period(&mut self, period: &Period) -> LedgerResult<()> {
        self.write()?
            .periods
            .insert(period.id.clone(), period.clone());
        Ok(())
    }

    async fn get_period(&self, period_id: &str) -> LedgerResult<Option<Period>> {
        Ok(self.read()?.periods.get(period_id).cloned())
    }

    async fn find_period(&self, company_id: &str, date: NaiveDate) -> LedgerResult<Period> {
        let tables = self.read()?;
        tables
            .periods
            .values()
            .filter(|p| p.company_id == company_id && p.state == PeriodState::Open)
            .filter(|p| p.contains(date))
            .min_by_key(|p| p.end_date - p.start_date)
            .cloned()
            .ok_or_else(|| LedgerError::PeriodNotFound {
                company: company_id.to_string(),
                date,
            })
    }

    async fn save_journal(&mut self, journal: &Journal) -> LedgerResult<()> {
        self.write()?
            .journals
            .insert(journal.id.clone(), journal.clone());
        Ok(())
    }

    async fn get_journal(&self, journal_id: &str) -> LedgerResult<Option<Journal>> {
        Ok(self.read()?.journals.get(journal_id).cloned())
    }

    async fn save_statement_journal(&mut self, journal: &StatementJournal) -> LedgerResult<()> {
        self.write()?
            .statement_journals
            .insert(journal.id.clone(), journal.clone());
        Ok(())
    }

    async fn get_statement_journal(
        &self,
        journal_id: &str,
    ) -> LedgerResult<Option<StatementJournal>> {
        Ok(self.read()?.statement_journals.get(journal_id).cloned())
    }

    async fn save_statement(&mut self, statement: &BankStatement) -> LedgerResult<()> {
        self.write()?
            .statements
            .insert(statement.id.clone(), statement.clone());
        Ok(())
    }

    async fn get_statement(&self, statement_id: &str) -> LedgerResult<Option<BankStatement>> {
        Ok(self.read()?.statements.get(statement_id).cloned())
    }

    async fn save_statement_line(&mut self, line: &StatementLine) -> LedgerResult<()> {
        self.write()?
            .statement_lines
            .insert(line.id.clone(), line.clone());
        Ok(())
    }

    async fn get_statement_line(&self, line_id: &str) -> LedgerResult<Option<StatementLine>> {
        Ok(self.read()?.statement_lines.get(line_id).cloned())
    }

    async fn statement_lines_with_counterpart(
        &self,
        move_line_id: &str,
    ) -> LedgerResult<Vec<StatementLine>> {
        let tables = self.read()?;
        Ok(tables
            .statement_lines
            .values()
            .filter(|st| st.counterpart_line_ids.iter().any(|id| id == move_line_id))
            .cloned()
            .collect())
    }

    async fn save_move(&mut self, mv: &Move) -> LedgerResult<()> {
        self.write()?.moves.insert(mv.id.clone(), mv.clone());
        Ok(())
    }

    async fn get_move(&self, move_id: &str) -> LedgerResult<Option<Move>> {
        Ok(self.read()?.moves.get(move_id).cloned())
    }

    async fn delete_move(&mut self, move_id: &str) -> LedgerResult<()> {
        if self.write()?.moves.remove(move_id).is_some() {
            Ok(())
        } else {
            Err(LedgerError::MoveNotFound(move_id.to_string()))
        }
    }

    async fn next_move_number(&mut self, journal_id: &str) -> LedgerResult<String> {
        let mut tables = self.write()?;
        let counter = tables.sequences.entry(journal_id.to_string()).or_insert(0);
        *counter += 1;
        Ok(format!("{}/{:05}", journal_id, counter))
    }

    async fn save_move_line(&mut self, line: &MoveLine) -> LedgerResult<()> {
        self.write()?
            .move_lines
            .insert(line.id.clone(), line.clone());
        Ok(())
    }

    async fn get_move_line(&self, line_id: &str) -> LedgerResult<Option<MoveLine>> {
        Ok(self.read()?.move_lines.get(line_id).cloned())
    }

    async fn get_move_lines(&self, move_id: &str) -> LedgerResult<Vec<MoveLine>> {
        let tables = self.read()?;
        let mut lines: Vec<MoveLine> = tables
            .move_lines
            .values()
            .filter(|line| line.move_id == move_id)
            .cloned()
            .collect();
        lines.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(lines)
    }

    async fn search_move_lines(&self, filter: &MoveLineFilter) -> LedgerResult<Vec<MoveLine>> {
        let tables = self.read()?;
        let mut lines: Vec<MoveLine> = tables
            .move_lines
            .values()
            .filter(|line| line_matches(&tables, line, filter))
            .cloned()
            .collect();
        lines.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(lines)
    }

    async fn delete_move_line(&mut self, line_id: &str) -> LedgerResult<()> {
        if self.write()?.move_lines.remove(line_id).is_some() {
            Ok(())
        } else {
            Err(LedgerError::MoveLineNotFound(line_id.to_string()))
        }
    }

    async fn save_reconciliation(&mut self, reconciliation: &Reconciliation) -> LedgerResult<()> {
        self.write()?
            .reconciliations
            .insert(reconciliation.id.clone(), reconciliation.clone());
        Ok(())
    }

    async fn get_reconciliation(
        &self,
        reconciliation_id: &str,
    ) -> LedgerResult<Option<Reconciliation>> {
        Ok(self.read()?.reconciliations.get(reconciliation_id).cloned())
    }

    async fn delete_reconciliation(&mut self, reconciliation_id: &str) -> LedgerResult<()> {
        if self
            .write()?
            .reconciliations
            .remove(reconciliation_id)
            .is_some()
        {
            Ok(())
        } else {
            Err(LedgerError::ReconciliationNotFound(
                reconciliation_id.to_string(),
            ))
        }
    }

    async fn save_bank_link(&mut self, link: &BankMoveLink) -> LedgerResult<()> {
        self.write()?
            .bank_links
            .insert(link.id.clone(), link.clone());
        Ok(())
    }

    async fn bank_links_for_moves(&self, move_ids: &[String]) -> LedgerResult<Vec<BankMoveLink>> {
        let tables = self.read()?;
        Ok(tables
            .bank_links
            .values()
            .filter(|link| move_ids.contains(&link.move_id))
            .cloned()
            .collect())
    }

    async fn bank_links_for_statement_line(
        &self,
        statement_line_id: &str,
    ) -> LedgerResult<Vec<BankMoveLink>> {
        let tables = self.read()?;
        Ok(tables
            .bank_links
            .values()
            .filter(|link| link.statement_line_id == statement_line_id)
            .cloned()
            .collect())
    }

    async fn delete_bank_link(&mut self, link_id: &str) -> LedgerResult<()> {
        if self.write()?.bank_links.remove(link_id).is_some() {
            Ok(())
        } else {
            Err(LedgerError::Storage(format!(
                "bank statement move link not found: {}",
                link_id
            )))
        }
    }
}

//! Reconciliation of offsetting move lines

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use crate::traits::*;
use crate::types::*;

/// Reconciliation manager for grouping and ungrouping settled lines
pub struct ReconciliationManager<S: AccountingStorage> {
    pub(crate) storage: S,
    guard: Arc<dyn LedgerGuard<S>>,
}

impl<S: AccountingStorage> ReconciliationManager<S> {
    /// Create a new reconciliation manager protected by the given guard
    pub fn new(storage: S, guard: Arc<dyn LedgerGuard<S>>) -> Self {
        Self { storage, guard }
    }

    /// Reconcile lines that share a reconcilable account and offset each other
    pub async fn reconcile(
        &mut self,
        line_ids: &[String],
        date: NaiveDate,
    ) -> LedgerResult<Reconciliation> {
        if line_ids.len() < 2 {
            return Err(LedgerError::Reconcile(
                "at least two lines are required".to_string(),
            ));
        }

        let mut lines = Vec::with_capacity(line_ids.len());
        for line_id in line_ids {
            let line = self
                .storage
                .get_move_line(line_id)
                .await?
                .ok_or_else(|| LedgerError::MoveLineNotFound(line_id.clone()))?;
            if line.is_reconciled() {
                return Err(LedgerError::Reconcile(format!(
                    "line \"{}\" is already reconciled",
                    line.id
                )));
            }
            let mv = self
                .storage
                .get_move(&line.move_id)
                .await?
                .ok_or_else(|| LedgerError::MoveNotFound(line.move_id.clone()))?;
            if !mv.is_posted() {
                return Err(LedgerError::Reconcile(format!(
                    "line \"{}\" belongs to a move that is not posted",
                    line.id
                )));
            }
            lines.push(line);
        }

        let account_id = lines[0].account_id.clone();
        if lines.iter().any(|line| line.account_id != account_id) {
            return Err(LedgerError::Reconcile(
                "lines must share the same account".to_string(),
            ));
        }
        let account = self
            .storage
            .get_account(&account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.clone()))?;
        if !account.reconcile {
            return Err(LedgerError::Reconcile(format!(
                "account \"{}\" is not reconcilable",
                account.rec_name()
            )));
        }

        let balance: BigDecimal = lines.iter().map(|line| line.balance()).sum();
        if balance != BigDecimal::from(0) {
            return Err(LedgerError::Reconcile(format!(
                "lines on \"{}\" do not offset: debit - credit = {}",
                account.rec_name(),
                balance
            )));
        }

        let reconciliation = Reconciliation {
            id: new_id(),
            date,
            line_ids: lines.iter().map(|line| line.id.clone()).collect(),
        };
        self.storage.save_reconciliation(&reconciliation).await?;
        for mut line in lines {
            line.reconciliation_id = Some(reconciliation.id.clone());
            self.storage.save_move_line(&line).await?;
        }
        info!(reconciliation_id = %reconciliation.id, account = %account.rec_name(), "reconciled lines");
        Ok(reconciliation)
    }

    /// Get a reconciliation by ID, returning an error if not found
    pub async fn get_reconciliation_required(
        &self,
        reconciliation_id: &str,
    ) -> LedgerResult<Reconciliation> {
        self.storage
            .get_reconciliation(reconciliation_id)
            .await?
            .ok_or_else(|| LedgerError::ReconciliationNotFound(reconciliation_id.to_string()))
    }

    /// Delete reconciliations, leaving their lines unreconciled
    pub async fn delete_reconciliations(
        &mut self,
        reconciliation_ids: &[String],
        mode: GuardMode,
    ) -> LedgerResult<()> {
        let mut reconciliations = Vec::with_capacity(reconciliation_ids.len());
        for reconciliation_id in reconciliation_ids {
            reconciliations.push(self.get_reconciliation_required(reconciliation_id).await?);
        }
        self.guard
            .check_reconciliation_deletion(&self.storage, &reconciliations, mode)
            .await?;

        for reconciliation in &reconciliations {
            for line_id in &reconciliation.line_ids {
                if let Some(mut line) = self.storage.get_move_line(line_id).await? {
                    line.reconciliation_id = None;
                    self.storage.save_move_line(&line).await?;
                }
            }
            self.storage.delete_reconciliation(&reconciliation.id).await?;
            info!(reconciliation_id = %reconciliation.id, "deleted reconciliation");
        }
        Ok(())
    }
}

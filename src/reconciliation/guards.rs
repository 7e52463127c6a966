//! Ledger guard protecting records created for bank statement lines

use async_trait::async_trait;
use tracing::warn;

use crate::traits::*;
use crate::types::*;

/// Guard layered over [`HostGuard`]
///
/// In [`GuardMode::StatementTeardown`] every check passes. Otherwise lines of
/// moves linked to a statement line and reconciliations holding lines that
/// originate from a statement line cannot be deleted, and the host rules
/// apply with the statement back-reference excluded from the posted-line
/// write check.
#[derive(Debug, Clone)]
pub struct CounterpartGuard {
    host: HostGuard,
}

impl CounterpartGuard {
    pub fn new() -> Self {
        Self {
            host: HostGuard::new().exclude_from_modify_check(MoveLineField::BankStatementLineCounterpart),
        }
    }
}

impl Default for CounterpartGuard {
    fn default() -> Self {
        Self::new()
    }
}

async fn statement_line_name<S: AccountingStorage>(storage: &S, line_id: &str) -> LedgerResult<String> {
    Ok(storage
        .get_statement_line(line_id)
        .await?
        .map(|line| line.rec_name())
        .unwrap_or_else(|| line_id.to_string()))
}

async fn move_name<S: AccountingStorage>(storage: &S, move_id: &str) -> LedgerResult<String> {
    Ok(storage
        .get_move(move_id)
        .await?
        .map(|mv| mv.rec_name())
        .unwrap_or_else(|| move_id.to_string()))
}

#[async_trait]
impl<S: AccountingStorage> LedgerGuard<S> for CounterpartGuard {
    async fn check_modify(&self, storage: &S, moves: &[Move], mode: GuardMode) -> LedgerResult<()> {
        if mode.is_teardown() {
            return Ok(());
        }
        LedgerGuard::<S>::check_modify(&self.host, storage, moves, mode).await
    }

    async fn check_line_write(
        &self,
        storage: &S,
        old: &MoveLine,
        new: &MoveLine,
        mode: GuardMode,
    ) -> LedgerResult<()> {
        if mode.is_teardown() {
            return Ok(());
        }
        LedgerGuard::<S>::check_line_write(&self.host, storage, old, new, mode).await
    }

    async fn check_line_deletion(
        &self,
        storage: &S,
        lines: &[MoveLine],
        mode: GuardMode,
    ) -> LedgerResult<()> {
        if mode.is_teardown() {
            return Ok(());
        }

        let mut move_ids: Vec<String> = Vec::new();
        for line in lines {
            if !move_ids.contains(&line.move_id) {
                move_ids.push(line.move_id.clone());
            }
        }

        let blocked = match storage.bank_links_for_moves(&move_ids).await?.first() {
            Some(link) => Some((link.move_id.clone(), link.statement_line_id.clone())),
            None => lines.iter().find_map(|line| {
                line.bank_statement_line_counterpart
                    .as_ref()
                    .map(|st| (line.move_id.clone(), st.clone()))
            }),
        };
        if let Some((move_id, statement_line_id)) = blocked {
            let move_number = move_name(storage, &move_id).await?;
            let statement_line = statement_line_name(storage, &statement_line_id).await?;
            warn!(%move_number, %statement_line, "blocked deletion of statement move lines");
            return Err(LedgerError::LineDeletionBlocked {
                move_number,
                statement_line,
            });
        }

        LedgerGuard::<S>::check_line_deletion(&self.host, storage, lines, mode).await
    }

    async fn check_reconciliation_deletion(
        &self,
        storage: &S,
        reconciliations: &[Reconciliation],
        mode: GuardMode,
    ) -> LedgerResult<()> {
        if mode.is_teardown() {
            return Ok(());
        }

        for reconciliation in reconciliations {
            for line_id in &reconciliation.line_ids {
                let Some(line) = storage.get_move_line(line_id).await? else {
                    continue;
                };
                if let Some(Origin::BankStatementLine(statement_line_id)) = &line.origin {
                    let statement_line = statement_line_name(storage, statement_line_id).await?;
                    warn!(reconciliation_id = %reconciliation.id, %statement_line, "blocked deletion of statement reconciliation");
                    return Err(LedgerError::ReconciliationDeletionBlocked { statement_line });
                }
            }
        }

        LedgerGuard::<S>::check_reconciliation_deletion(&self.host, storage, reconciliations, mode)
            .await
    }
}

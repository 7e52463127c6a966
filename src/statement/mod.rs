//! Bank statement and statement line lifecycle
//!
//! Statement lines move through `draft → confirmed → posted`, and can be
//! canceled from `confirmed` or `posted`. Lines explain their amount through
//! [`BankMoveLink`] records pointing at ledger moves.

use bigdecimal::BigDecimal;
use chrono::FixedOffset;
use tracing::{debug, info};

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_statement_line;

/// Manager for bank statements, their lines and move links
pub struct StatementLineManager<S: AccountingStorage> {
    pub(crate) storage: S,
    timezone: FixedOffset,
}

impl<S: AccountingStorage> StatementLineManager<S> {
    /// Create a new statement line manager working in the company timezone
    pub fn new(storage: S, timezone: FixedOffset) -> Self {
        Self { storage, timezone }
    }

    pub fn timezone(&self) -> &FixedOffset {
        &self.timezone
    }

    /// Register a bank statement
    pub async fn create_statement(&mut self, statement: BankStatement) -> LedgerResult<BankStatement> {
        if self
            .storage
            .get_statement_journal(&statement.journal_id)
            .await?
            .is_none()
        {
            return Err(LedgerError::JournalNotFound(statement.journal_id.clone()));
        }
        self.storage.save_statement(&statement).await?;
        Ok(statement)
    }

    /// Get a bank statement by ID, returning an error if not found
    pub async fn get_statement_required(&self, statement_id: &str) -> LedgerResult<BankStatement> {
        self.storage
            .get_statement(statement_id)
            .await?
            .ok_or_else(|| LedgerError::StatementNotFound(statement_id.to_string()))
    }

    /// Create a statement line; the account date defaults to the line date
    pub async fn create_line(&mut self, mut line: StatementLine) -> LedgerResult<StatementLine> {
        let statement = self.get_statement_required(&line.statement_id).await?;
        if statement.company_id != line.company_id {
            return Err(LedgerError::Validation(format!(
                "statement line \"{}\" and its statement belong to different companies",
                line.rec_name()
            )));
        }
        if line.account_date_utc.is_none() {
            line.account_date_utc = Some(line.date);
        }
        line.state = StatementLineState::Draft;
        self.save_line(&line).await?;
        debug!(statement_line = %line.id, "created statement line");
        Ok(line)
    }

    /// Get a statement line by ID, returning an error if not found
    pub async fn get_line_required(&self, line_id: &str) -> LedgerResult<StatementLine> {
        self.storage
            .get_statement_line(line_id)
            .await?
            .ok_or_else(|| LedgerError::StatementLineNotFound(line_id.to_string()))
    }

    pub(crate) async fn get_lines_required(
        &self,
        line_ids: &[String],
    ) -> LedgerResult<Vec<StatementLine>> {
        let mut lines = Vec::with_capacity(line_ids.len());
        for line_id in line_ids {
            lines.push(self.get_line_required(line_id).await?);
        }
        Ok(lines)
    }

    /// Validate and persist a statement line
    pub async fn save_line(&mut self, line: &StatementLine) -> LedgerResult<()> {
        validate_statement_line(line)?;
        self.storage.save_statement_line(line).await
    }

    /// Statement journal of the statement a line belongs to
    pub async fn journal_of(&self, line: &StatementLine) -> LedgerResult<StatementJournal> {
        let statement = self.get_statement_required(&line.statement_id).await?;
        self.storage
            .get_statement_journal(&statement.journal_id)
            .await?
            .ok_or_else(|| LedgerError::JournalNotFound(statement.journal_id.clone()))
    }

    /// Confirm draft lines
    pub async fn confirm_lines(&mut self, line_ids: &[String]) -> LedgerResult<()> {
        self.transition(
            line_ids,
            &[StatementLineState::Draft],
            StatementLineState::Confirmed,
            "confirmed",
        )
        .await
    }

    /// Mark confirmed lines as posted
    pub async fn post_lines(&mut self, line_ids: &[String]) -> LedgerResult<()> {
        self.transition(
            line_ids,
            &[StatementLineState::Confirmed],
            StatementLineState::Posted,
            "posted",
        )
        .await
    }

    /// Mark confirmed or posted lines as canceled
    pub async fn cancel_lines(&mut self, line_ids: &[String]) -> LedgerResult<()> {
        self.transition(
            line_ids,
            &[StatementLineState::Confirmed, StatementLineState::Posted],
            StatementLineState::Canceled,
            "canceled",
        )
        .await
    }

    /// Bring canceled lines back to draft
    pub async fn reset_lines(&mut self, line_ids: &[String]) -> LedgerResult<()> {
        self.transition(
            line_ids,
            &[StatementLineState::Canceled],
            StatementLineState::Draft,
            "reset to draft",
        )
        .await
    }

    async fn transition(
        &mut self,
        line_ids: &[String],
        from: &[StatementLineState],
        to: StatementLineState,
        operation: &'static str,
    ) -> LedgerResult<()> {
        let lines = self.get_lines_required(line_ids).await?;
        if let Some(line) = lines.iter().find(|line| !from.contains(&line.state)) {
            return Err(LedgerError::InvalidStatementState {
                line: line.rec_name(),
                state: line.state,
                operation,
            });
        }
        for mut line in lines {
            line.state = to;
            self.storage.save_statement_line(&line).await?;
            info!(statement_line = %line.id, state = %to, "statement line {}", operation);
        }
        Ok(())
    }

    /// Link a posted move to a statement line as part of its explanation
    pub async fn link_move(
        &mut self,
        statement_line_id: &str,
        move_id: &str,
        amount: BigDecimal,
        description: Option<String>,
    ) -> LedgerResult<BankMoveLink> {
        let line = self.get_line_required(statement_line_id).await?;
        let mv = self
            .storage
            .get_move(move_id)
            .await?
            .ok_or_else(|| LedgerError::MoveNotFound(move_id.to_string()))?;
        if mv.company_id != line.company_id {
            return Err(LedgerError::Validation(format!(
                "move \"{}\" belongs to another company",
                mv.rec_name()
            )));
        }

        let link = BankMoveLink {
            id: new_id(),
            statement_line_id: line.id,
            move_id: mv.id,
            amount,
            description,
        };
        self.storage.save_bank_link(&link).await?;
        Ok(link)
    }

    /// Links of a statement line
    pub async fn links_of(&self, statement_line_id: &str) -> LedgerResult<Vec<BankMoveLink>> {
        self.storage
            .bank_links_for_statement_line(statement_line_id)
            .await
    }

    /// Delete statement line to move links
    pub async fn delete_links(&mut self, link_ids: &[String]) -> LedgerResult<()> {
        for link_id in link_ids {
            self.storage.delete_bank_link(link_id).await?;
        }
        Ok(())
    }

    /// Amount of the line already explained by linked moves, company currency
    pub async fn linked_amount(&self, line: &StatementLine) -> LedgerResult<BigDecimal> {
        let links = self.links_of(&line.id).await?;
        Ok(links.iter().map(|link| &link.amount).sum())
    }
}

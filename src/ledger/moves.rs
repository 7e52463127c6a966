//! Move creation, posting and deletion

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_balanced, validate_line_amounts};

/// Move manager for handling move and move line operations
pub struct MoveManager<S: AccountingStorage> {
    pub(crate) storage: S,
    guard: Arc<dyn LedgerGuard<S>>,
}

impl<S: AccountingStorage> MoveManager<S> {
    /// Create a new move manager protected by the given guard
    pub fn new(storage: S, guard: Arc<dyn LedgerGuard<S>>) -> Self {
        Self { storage, guard }
    }

    /// Save a new draft move with its lines
    pub async fn create_move(
        &mut self,
        mut mv: Move,
        mut lines: Vec<MoveLine>,
    ) -> LedgerResult<(Move, Vec<MoveLine>)> {
        let period = self
            .storage
            .get_period(&mv.period_id)
            .await?
            .ok_or_else(|| LedgerError::InvalidMove(format!("unknown period {}", mv.period_id)))?;
        if period.company_id != mv.company_id || !period.contains(mv.date) {
            return Err(LedgerError::InvalidMove(format!(
                "date {} is outside period \"{}\"",
                mv.date, period.name
            )));
        }
        if self.storage.get_journal(&mv.journal_id).await?.is_none() {
            return Err(LedgerError::JournalNotFound(mv.journal_id.clone()));
        }

        for line in &mut lines {
            validate_line_amounts(line)?;
            let account = self
                .storage
                .get_account(&line.account_id)
                .await?
                .ok_or_else(|| LedgerError::AccountNotFound(line.account_id.clone()))?;
            if account.party_required && line.party_id.is_none() {
                return Err(LedgerError::InvalidMove(format!(
                    "account \"{}\" requires a party",
                    account.rec_name()
                )));
            }
            line.move_id = mv.id.clone();
        }

        mv.state = MoveState::Draft;
        mv.number = None;
        self.storage.save_move(&mv).await?;
        for line in &lines {
            self.storage.save_move_line(line).await?;
        }
        debug!(move_id = %mv.id, lines = lines.len(), "created draft move");
        Ok((mv, lines))
    }

    /// Get a move by ID, returning an error if not found
    pub async fn get_move_required(&self, move_id: &str) -> LedgerResult<Move> {
        self.storage
            .get_move(move_id)
            .await?
            .ok_or_else(|| LedgerError::MoveNotFound(move_id.to_string()))
    }

    /// Get a move line by ID, returning an error if not found
    pub async fn get_line_required(&self, line_id: &str) -> LedgerResult<MoveLine> {
        self.storage
            .get_move_line(line_id)
            .await?
            .ok_or_else(|| LedgerError::MoveLineNotFound(line_id.to_string()))
    }

    /// All lines of a move
    pub async fn get_move_lines(&self, move_id: &str) -> LedgerResult<Vec<MoveLine>> {
        self.storage.get_move_lines(move_id).await
    }

    /// Post draft moves: each must balance and sit in an open period
    pub async fn post_moves(&mut self, move_ids: &[String]) -> LedgerResult<Vec<Move>> {
        let mut posted = Vec::with_capacity(move_ids.len());
        for move_id in move_ids {
            let mut mv = self.get_move_required(move_id).await?;
            if mv.is_posted() {
                return Err(LedgerError::InvalidMove(format!(
                    "move \"{}\" is already posted",
                    mv.rec_name()
                )));
            }

            let period = self
                .storage
                .get_period(&mv.period_id)
                .await?
                .ok_or_else(|| {
                    LedgerError::InvalidMove(format!("unknown period {}", mv.period_id))
                })?;
            if period.state != PeriodState::Open {
                return Err(LedgerError::InvalidMove(format!(
                    "period \"{}\" is closed",
                    period.name
                )));
            }

            let lines = self.storage.get_move_lines(&mv.id).await?;
            validate_balanced(&mv, &lines)?;

            mv.number = Some(self.storage.next_move_number(&mv.journal_id).await?);
            mv.state = MoveState::Posted;
            self.storage.save_move(&mv).await?;
            info!(move_id = %mv.id, number = %mv.rec_name(), "posted move");
            posted.push(mv);
        }
        Ok(posted)
    }

    /// Rewrite a move line after the guard accepted the change
    pub async fn write_line(&mut self, line: &MoveLine, mode: GuardMode) -> LedgerResult<()> {
        let old = self.get_line_required(&line.id).await?;
        if old.move_id != line.move_id {
            return Err(LedgerError::InvalidMove(format!(
                "line \"{}\" cannot change move",
                line.id
            )));
        }
        validate_line_amounts(line)?;
        self.guard
            .check_line_write(&self.storage, &old, line, mode)
            .await?;
        self.storage.save_move_line(line).await
    }

    /// Duplicate a move as a new draft with copies of its lines
    pub async fn copy_move(&mut self, move_id: &str, date: Option<NaiveDate>) -> LedgerResult<Move> {
        let original = self.get_move_required(move_id).await?;
        let mut copy = Move::new(
            original.company_id.clone(),
            original.period_id.clone(),
            original.journal_id.clone(),
            date.unwrap_or(original.date),
            original.origin.clone(),
        );
        if copy.date != original.date {
            copy.period_id = self
                .storage
                .find_period(&copy.company_id, copy.date)
                .await?
                .id;
        }

        let lines: Vec<MoveLine> = self
            .storage
            .get_move_lines(move_id)
            .await?
            .iter()
            .map(MoveLine::duplicate)
            .collect();
        let (copy, _) = self.create_move(copy, lines).await?;
        Ok(copy)
    }

    /// Delete move lines
    pub async fn delete_lines(&mut self, line_ids: &[String], mode: GuardMode) -> LedgerResult<()> {
        let mut lines = Vec::with_capacity(line_ids.len());
        for line_id in line_ids {
            lines.push(self.get_line_required(line_id).await?);
        }
        self.guard
            .check_line_deletion(&self.storage, &lines, mode)
            .await?;
        for line in &lines {
            self.storage.delete_move_line(&line.id).await?;
        }
        Ok(())
    }

    /// Delete moves together with their lines
    pub async fn delete_moves(&mut self, move_ids: &[String], mode: GuardMode) -> LedgerResult<()> {
        let moves = self.load_moves(move_ids).await?;
        self.guard.check_modify(&self.storage, &moves, mode).await?;

        let mut lines = Vec::new();
        for mv in &moves {
            lines.extend(self.storage.get_move_lines(&mv.id).await?);
        }
        self.guard
            .check_line_deletion(&self.storage, &lines, mode)
            .await?;

        for line in &lines {
            self.storage.delete_move_line(&line.id).await?;
        }
        for mv in &moves {
            self.storage.delete_move(&mv.id).await?;
            info!(move_id = %mv.id, number = %mv.rec_name(), "deleted move");
        }
        Ok(())
    }

    async fn load_moves(&self, move_ids: &[String]) -> LedgerResult<Vec<Move>> {
        let mut moves = Vec::with_capacity(move_ids.len());
        for move_id in move_ids {
            moves.push(self.get_move_required(move_id).await?);
        }
        Ok(moves)
    }
}

/// Builder for creating moves line by line
#[derive(Debug)]
pub struct MoveBuilder {
    mv: Move,
    lines: Vec<MoveLine>,
}

impl MoveBuilder {
    /// Create a new move builder
    pub fn new(company_id: String, period_id: String, journal_id: String, date: NaiveDate) -> Self {
        Self {
            mv: Move::new(company_id, period_id, journal_id, date, None),
            lines: Vec::new(),
        }
    }

    /// Set the origin of the move
    pub fn origin(mut self, origin: Origin) -> Self {
        self.mv.origin = Some(origin);
        self
    }

    /// Add a debit line
    pub fn debit(
        self,
        account_id: String,
        amount: BigDecimal,
        party_id: Option<String>,
        description: Option<String>,
    ) -> Self {
        self.line(account_id, amount, BigDecimal::from(0), party_id, description)
    }

    /// Add a credit line
    pub fn credit(
        self,
        account_id: String,
        amount: BigDecimal,
        party_id: Option<String>,
        description: Option<String>,
    ) -> Self {
        self.line(account_id, BigDecimal::from(0), amount, party_id, description)
    }

    fn line(
        mut self,
        account_id: String,
        debit: BigDecimal,
        credit: BigDecimal,
        party_id: Option<String>,
        description: Option<String>,
    ) -> Self {
        let mut line = MoveLine::new(account_id, debit, credit);
        line.party_id = party_id;
        line.description = description;
        self.lines.push(line);
        self
    }

    /// Build the move; the lines must balance
    pub fn build(self) -> LedgerResult<(Move, Vec<MoveLine>)> {
        validate_balanced(&self.mv, &self.lines)?;
        Ok((self.mv, self.lines))
    }
}

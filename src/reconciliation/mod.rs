//! Counterpart reconciliation of bank statement lines
//!
//! A statement line can select existing open move lines as counterparts.
//! Posting the statement line generates, for each counterpart, a two-line
//! move between the statement journal's bank account and the counterpart's
//! account, posts it, reconciles the mirror line with the counterpart and
//! tags the bank line with the statement line. Canceling the statement line
//! removes all of it again.

pub mod guards;
pub mod matching;
pub mod move_lines;

pub use guards::*;
pub use matching::*;
pub use move_lines::*;

use bigdecimal::BigDecimal;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::config::CounterpartConfig;
use crate::ledger::Ledger;
use crate::statement::StatementLineManager;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_counterpart_candidate;

/// Orchestrates counterpart selection, posting and cancellation of statement
/// lines on top of the ledger
pub struct CounterpartReconciler<S: AccountingStorage> {
    ledger: Ledger<S>,
    statements: StatementLineManager<S>,
    converter: Arc<dyn CurrencyConverter>,
    config: CounterpartConfig,
}

/// Records resolved once per statement line
struct LineScope {
    line: StatementLine,
    statement: BankStatement,
    journal: StatementJournal,
    company: Company,
}

/// A counterpart move ready to be written
struct PlannedMove {
    counterpart: MoveLine,
    bank_account_id: String,
    lines: CounterpartLines,
}

impl<S: AccountingStorage + Clone + 'static> CounterpartReconciler<S> {
    /// Create a reconciler whose ledger is protected by [`CounterpartGuard`]
    pub fn new(
        storage: S,
        converter: Arc<dyn CurrencyConverter>,
        config: CounterpartConfig,
    ) -> LedgerResult<Self> {
        let timezone = config.timezone()?;
        Ok(Self {
            ledger: Ledger::with_guard(storage.clone(), Arc::new(CounterpartGuard::new())),
            statements: StatementLineManager::new(storage, timezone),
            converter,
            config,
        })
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger<S> {
        &mut self.ledger
    }

    pub fn statements(&self) -> &StatementLineManager<S> {
        &self.statements
    }

    pub fn statements_mut(&mut self) -> &mut StatementLineManager<S> {
        &mut self.statements
    }

    pub fn config(&self) -> &CounterpartConfig {
        &self.config
    }

    /// Select existing move lines as counterparts of a statement line
    #[instrument(skip(self, line_ids), fields(count = line_ids.len()))]
    pub async fn add_counterpart_lines(
        &mut self,
        statement_line_id: &str,
        line_ids: &[String],
    ) -> LedgerResult<StatementLine> {
        let mut st_line = self.statements.get_line_required(statement_line_id).await?;
        ensure_editable(&st_line)?;

        for line_id in line_ids {
            if st_line.counterpart_line_ids.contains(line_id) {
                continue;
            }
            let line = self.ledger.get_line_required(line_id).await?;
            let mv = self.ledger.get_move_required(&line.move_id).await?;
            let account = self.ledger.get_account_required(&line.account_id).await?;
            let tagged_by = self
                .statements
                .storage
                .statement_lines_with_counterpart(&line.id)
                .await?;
            validate_counterpart_candidate(&st_line, &line, &mv, &account, &tagged_by)?;
            st_line.counterpart_line_ids.push(line.id);
        }

        if st_line.account_date_utc.is_none() {
            st_line.account_date_utc = Some(st_line.date);
        }
        self.statements.save_line(&st_line).await?;
        debug!(statement_line = %st_line.id, counterparts = st_line.counterpart_line_ids.len(), "counterparts selected");
        Ok(st_line)
    }

    /// Drop counterparts from a statement line
    pub async fn remove_counterpart_lines(
        &mut self,
        statement_line_id: &str,
        line_ids: &[String],
    ) -> LedgerResult<StatementLine> {
        let mut st_line = self.statements.get_line_required(statement_line_id).await?;
        ensure_editable(&st_line)?;
        st_line
            .counterpart_line_ids
            .retain(|id| !line_ids.contains(id));
        self.statements.save_line(&st_line).await?;
        Ok(st_line)
    }

    /// Amount of the statement line explained so far, company currency
    ///
    /// Linked moves always count; selected counterparts count until the line
    /// is posted, after which their generated moves stand for them.
    pub async fn moves_amount(&self, st_line: &StatementLine) -> LedgerResult<BigDecimal> {
        let mut amount = self.statements.linked_amount(st_line).await?;
        if st_line.state != StatementLineState::Posted {
            for line_id in &st_line.counterpart_line_ids {
                amount += self.ledger.get_line_required(line_id).await?.balance();
            }
        }
        let company = self.ledger.get_company_required(&st_line.company_id).await?;
        Ok(company.currency.round(&amount))
    }

    /// Try to explain the rest of a statement line's amount with a single
    /// open move line of exactly that amount
    ///
    /// Returns the attached line, or `None` when nothing is left to explain
    /// or the match is not unique.
    #[instrument(skip(self))]
    pub async fn search_reconciliation(
        &mut self,
        statement_line_id: &str,
    ) -> LedgerResult<Option<MoveLine>> {
        if !self.config.auto_match {
            return Ok(None);
        }
        let mut st_line = self.statements.get_line_required(statement_line_id).await?;
        ensure_editable(&st_line)?;

        let company = self.ledger.get_company_required(&st_line.company_id).await?;
        let moves_amount = self.moves_amount(&st_line).await?;
        let remaining = search_amount(&st_line.company_amount, &moves_amount, &company.currency);
        let Some(filter) = candidate_filter(&company.id, &remaining) else {
            debug!("statement line fully explained");
            return Ok(None);
        };

        let mut candidates = Vec::new();
        for line in self.ledger.search_move_lines(&filter).await? {
            let tagged = self
                .statements
                .storage
                .statement_lines_with_counterpart(&line.id)
                .await?;
            if tagged.is_empty() {
                candidates.push(line);
            }
        }

        let found = candidates.len();
        let Some(line) = unique_match(candidates) else {
            debug!(%remaining, candidates = found, "no unambiguous counterpart");
            return Ok(None);
        };

        st_line.counterpart_line_ids.push(line.id.clone());
        if st_line.account_date_utc.is_none() {
            st_line.account_date_utc = Some(st_line.date);
        }
        self.statements.save_line(&st_line).await?;
        info!(statement_line = %st_line.id, move_line = %line.id, %remaining, "counterpart matched");
        Ok(Some(line))
    }

    /// Every statement line's account date must fall in an open period
    pub async fn check_period(&self, st_lines: &[StatementLine]) -> LedgerResult<()> {
        let mut checked = HashSet::new();
        for st_line in st_lines {
            let date = st_line.effective_account_date(self.statements.timezone());
            if checked.insert((st_line.company_id.clone(), date)) {
                self.ledger.find_period(&st_line.company_id, date).await?;
            }
        }
        Ok(())
    }

    /// Post confirmed statement lines, generating one move per counterpart
    #[instrument(skip(self, statement_line_ids), fields(count = statement_line_ids.len()))]
    pub async fn post(&mut self, statement_line_ids: &[String]) -> LedgerResult<()> {
        let st_lines = self.statements.get_lines_required(statement_line_ids).await?;
        if let Some(st_line) = st_lines
            .iter()
            .find(|l| l.state != StatementLineState::Confirmed)
        {
            return Err(LedgerError::InvalidStatementState {
                line: st_line.rec_name(),
                state: st_line.state,
                operation: "posted",
            });
        }
        self.check_period(&st_lines).await?;

        // Every counterpart is planned before anything is written
        for st_line in &st_lines {
            let scope = self.scope(st_line.clone()).await?;
            for line_id in &st_line.counterpart_line_ids {
                let counterpart = self.ledger.get_line_required(line_id).await?;
                if !counterpart.is_reconciled() {
                    self.plan_move(&scope, counterpart).await?;
                }
            }
        }

        for st_line in &st_lines {
            for line_id in &st_line.counterpart_line_ids {
                self.create_move(&st_line.id, line_id).await?;
            }
        }

        self.statements.post_lines(statement_line_ids).await
    }

    /// Cancel statement lines and undo their counterpart moves
    #[instrument(skip(self, statement_line_ids), fields(count = statement_line_ids.len()))]
    pub async fn cancel(&mut self, statement_line_ids: &[String]) -> LedgerResult<()> {
        let st_lines = self.statements.get_lines_required(statement_line_ids).await?;
        self.check_period(&st_lines).await?;
        self.statements.cancel_lines(statement_line_ids).await?;
        self.reset_counterpart_move(statement_line_ids).await?;

        for st_line_id in statement_line_ids {
            let mut st_line = self.statements.get_line_required(st_line_id).await?;
            st_line.counterpart_line_ids.clear();
            self.statements.save_line(&st_line).await?;
        }
        Ok(())
    }

    /// Generate, post and reconcile the move balancing a statement line
    /// against one of its counterparts
    ///
    /// Returns `None` when the counterpart is already reconciled.
    #[instrument(skip(self))]
    pub async fn create_move(
        &mut self,
        statement_line_id: &str,
        counterpart_line_id: &str,
    ) -> LedgerResult<Option<Move>> {
        let counterpart = self.ledger.get_line_required(counterpart_line_id).await?;
        if counterpart.is_reconciled() {
            return Ok(None);
        }

        let st_line = self.statements.get_line_required(statement_line_id).await?;
        let date = st_line.effective_account_date(self.statements.timezone());
        let period = self.ledger.find_period(&st_line.company_id, date).await?;
        let scope = self.scope(st_line).await?;
        let plan = self.plan_move(&scope, counterpart).await?;

        let mv = Move::new(
            scope.company.id.clone(),
            period.id,
            scope.journal.journal_id.clone(),
            date,
            Some(Origin::BankStatement(scope.statement.id.clone())),
        );
        let (mv, _) = self.ledger.create_move(mv, plan.lines.into_vec()).await?;
        let mv = self
            .ledger
            .post_moves(&[mv.id.clone()])
            .await?
            .pop()
            .ok_or_else(|| LedgerError::MoveNotFound(mv.id.clone()))?;

        let lines = self.ledger.get_move_lines(&mv.id).await?;
        let mirror = lines
            .iter()
            .find(|line| line.account_id != plan.bank_account_id)
            .ok_or(LedgerError::CounterpartNotFound)?;
        self.ledger
            .reconcile(&[mirror.id.clone(), plan.counterpart.id.clone()], mv.date)
            .await?;

        for line in lines
            .iter()
            .filter(|line| line.account_id == plan.bank_account_id)
        {
            let mut tagged = self.ledger.get_line_required(&line.id).await?;
            tagged.bank_statement_line_counterpart = Some(scope.line.id.clone());
            self.ledger.write_line(&tagged, GuardMode::Enforce).await?;
        }

        self.statements.save_line(&scope.line).await?;
        info!(statement_line = %scope.line.id, move_number = %mv.rec_name(), "counterpart move posted");
        Ok(Some(mv))
    }

    /// Delete the moves, reconciliations and bank links generated for the
    /// counterparts of the given statement lines
    #[instrument(skip(self, statement_line_ids), fields(count = statement_line_ids.len()))]
    pub async fn reset_counterpart_move(&mut self, statement_line_ids: &[String]) -> LedgerResult<()> {
        let mut delete_moves: Vec<String> = Vec::new();
        let mut delete_reconciliations: Vec<String> = Vec::new();

        for st_line in self.statements.get_lines_required(statement_line_ids).await? {
            for line_id in &st_line.counterpart_line_ids {
                let counterpart = self.ledger.get_line_required(line_id).await?;
                let Some(reconciliation_id) = &counterpart.reconciliation_id else {
                    continue;
                };
                let reconciliation = self
                    .ledger
                    .get_reconciliation_required(reconciliation_id)
                    .await?;
                let mut generated = Vec::new();
                for member_id in &reconciliation.line_ids {
                    let member = self.ledger.get_line_required(member_id).await?;
                    if member.move_id == counterpart.move_id || generated.contains(&member.move_id) {
                        continue;
                    }
                    if self.generated_for(&st_line, &member).await? {
                        generated.push(member.move_id);
                    }
                }
                // Reconciled outside this statement line
                if generated.is_empty() {
                    debug!(move_line = %counterpart.id, "counterpart reconciled elsewhere, kept");
                    continue;
                }
                for move_id in generated {
                    if !delete_moves.contains(&move_id) {
                        delete_moves.push(move_id);
                    }
                }
                if !delete_reconciliations.contains(&reconciliation.id) {
                    delete_reconciliations.push(reconciliation.id);
                }
            }
        }

        let links: Vec<String> = self
            .statements
            .storage
            .bank_links_for_moves(&delete_moves)
            .await?
            .into_iter()
            .map(|link| link.id)
            .collect();

        let mode = GuardMode::StatementTeardown;
        if !links.is_empty() {
            self.statements.delete_links(&links).await?;
        }
        if !delete_reconciliations.is_empty() {
            self.ledger
                .delete_reconciliations(&delete_reconciliations, mode)
                .await?;
        }
        if !delete_moves.is_empty() {
            self.ledger.delete_moves(&delete_moves, mode).await?;
        }
        info!(
            moves = delete_moves.len(),
            reconciliations = delete_reconciliations.len(),
            links = links.len(),
            "counterpart moves reset"
        );
        Ok(())
    }

    /// Whether `member` belongs to a move generated for `st_line`: the move
    /// originates from its statement and either the member mirrors the line
    /// or a line of the move carries the back-reference
    async fn generated_for(&self, st_line: &StatementLine, member: &MoveLine) -> LedgerResult<bool> {
        let mv = self.ledger.get_move_required(&member.move_id).await?;
        if mv.origin != Some(Origin::BankStatement(st_line.statement_id.clone())) {
            return Ok(false);
        }
        if member.origin == Some(Origin::BankStatementLine(st_line.id.clone())) {
            return Ok(true);
        }
        Ok(self
            .ledger
            .get_move_lines(&mv.id)
            .await?
            .iter()
            .any(|line| line.bank_statement_line_counterpart.as_deref() == Some(st_line.id.as_str())))
    }

    async fn scope(&self, line: StatementLine) -> LedgerResult<LineScope> {
        let statement = self.statements.get_statement_required(&line.statement_id).await?;
        let journal = self.statements.journal_of(&line).await?;
        let company = self.ledger.get_company_required(&line.company_id).await?;
        Ok(LineScope {
            line,
            statement,
            journal,
            company,
        })
    }

    async fn plan_move(&self, scope: &LineScope, counterpart: MoveLine) -> LedgerResult<PlannedMove> {
        let account = self.ledger.get_account_required(&counterpart.account_id).await?;
        let bank_account_id = journal_bank_account_id(&scope.journal, &counterpart.balance())?;
        let bank_account = self.ledger.get_account_required(bank_account_id).await?;

        let counterpart_move = self.ledger.get_move_required(&counterpart.move_id).await?;
        let line_name = format!("{} - {}", counterpart_move.rec_name(), account.code);
        let ctx = CounterpartContext {
            company: &scope.company,
            statement: &scope.statement,
            statement_line: &scope.line,
            journal: &scope.journal,
            account: &account,
            line_name: &line_name,
            conversion_date: scope.line.local_date(self.statements.timezone()),
        };
        let lines = build_counterpart_lines(&ctx, &counterpart, &bank_account, self.converter.as_ref())?;
        Ok(PlannedMove {
            counterpart,
            bank_account_id: bank_account.id,
            lines,
        })
    }
}

fn ensure_editable(st_line: &StatementLine) -> LedgerResult<()> {
    if st_line.state.allows_counterpart_changes() {
        Ok(())
    } else {
        Err(LedgerError::InvalidStatementState {
            line: st_line.rec_name(),
            state: st_line.state,
            operation: "given counterparts",
        })
    }
}

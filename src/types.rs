//! Core types and data structures for the bank statement counterpart system

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Generate a fresh record identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Currency with its rounding precision
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    /// ISO code, e.g. `EUR`
    pub code: String,
    /// Number of decimal digits amounts are rounded to
    pub digits: i64,
}

impl Currency {
    pub fn new(code: &str, digits: i64) -> Self {
        Self {
            code: code.to_string(),
            digits,
        }
    }

    /// Round an amount half-up to the currency precision
    pub fn round(&self, amount: &BigDecimal) -> BigDecimal {
        amount.with_scale_round(self.digits, RoundingMode::HalfUp)
    }
}

/// Company owning statements, moves and periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    /// Party representing the company itself
    pub party_id: String,
    /// Base currency of the company ledger
    pub currency: Currency,
}

/// Ledger account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub code: String,
    pub name: String,
    /// Lines on this account may be reconciled
    pub reconcile: bool,
    /// Account may be used as the bank side of a statement journal
    pub bank_reconcile: bool,
    /// Lines on this account must carry a party
    pub party_required: bool,
}

impl Account {
    /// Create a plain account with every flag off
    pub fn new(id: String, code: String, name: String) -> Self {
        Self {
            id,
            code,
            name,
            reconcile: false,
            bank_reconcile: false,
            party_required: false,
        }
    }

    pub fn reconcilable(mut self) -> Self {
        self.reconcile = true;
        self
    }

    pub fn bank_reconcilable(mut self) -> Self {
        self.bank_reconcile = true;
        self
    }

    pub fn with_party_required(mut self) -> Self {
        self.party_required = true;
        self
    }

    /// Display name used in user-facing errors
    pub fn rec_name(&self) -> String {
        format!("{} - {}", self.code, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodState {
    Open,
    Closed,
}

/// Accounting period covering a date range of a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub state: PeriodState,
}

impl Period {
    pub fn new(
        id: String,
        company_id: String,
        name: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            company_id,
            name,
            start_date,
            end_date,
            state: PeriodState::Open,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Accounting journal moves are recorded in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub id: String,
    pub name: String,
}

/// Bank statement journal: names the accounting journal and the bank accounts
/// statement transactions are posted against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementJournal {
    pub id: String,
    pub name: String,
    /// Accounting journal generated moves are recorded in
    pub journal_id: String,
    /// Currency statements of this journal are expressed in
    pub currency: Currency,
    /// Bank account used when the bank side of a move is a credit for the statement
    pub debit_account_id: Option<String>,
    /// Bank account used when the bank side of a move is a debit for the statement
    pub credit_account_id: Option<String>,
}

/// Imported bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankStatement {
    pub id: String,
    pub company_id: String,
    /// Statement journal the statement was imported into
    pub journal_id: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementLineState {
    Draft,
    Confirmed,
    Posted,
    Canceled,
}

impl StatementLineState {
    /// Counterpart lines may only change before posting
    pub fn allows_counterpart_changes(&self) -> bool {
        matches!(self, Self::Draft | Self::Confirmed)
    }
}

impl std::fmt::Display for StatementLineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Posted => "posted",
            Self::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

/// One transaction row of an imported bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub id: String,
    pub statement_id: String,
    pub company_id: String,
    pub number: String,
    /// Transaction date as reported by the bank (UTC)
    pub date: NaiveDateTime,
    pub description: String,
    /// Amount in the statement currency
    pub amount: BigDecimal,
    /// Amount in the company currency
    pub company_amount: BigDecimal,
    pub state: StatementLineState,
    /// Effective accounting date (UTC); records written before the UTC
    /// column existed used `account_date`
    #[serde(default, alias = "account_date")]
    pub account_date_utc: Option<NaiveDateTime>,
    /// Existing move lines chosen to be offset against this line
    #[serde(default)]
    pub counterpart_line_ids: Vec<String>,
}

impl StatementLine {
    pub fn new(
        id: String,
        statement_id: String,
        company_id: String,
        number: String,
        date: NaiveDateTime,
        description: String,
        amount: BigDecimal,
    ) -> Self {
        Self {
            id,
            statement_id,
            company_id,
            number,
            date,
            description,
            company_amount: amount.clone(),
            amount,
            state: StatementLineState::Draft,
            account_date_utc: None,
            counterpart_line_ids: Vec::new(),
        }
    }

    /// Display name used in user-facing errors
    pub fn rec_name(&self) -> String {
        if self.description.is_empty() {
            self.number.clone()
        } else {
            format!("{} - {}", self.number, self.description)
        }
    }

    /// Account date expressed in the given timezone
    pub fn account_date(&self, offset: &FixedOffset) -> Option<NaiveDateTime> {
        self.account_date_utc
            .map(|utc| offset.from_utc_datetime(&utc).naive_local())
    }

    /// Store an account date given in the given timezone
    pub fn set_account_date(&mut self, local: Option<NaiveDateTime>, offset: &FixedOffset) {
        self.account_date_utc = local.and_then(|dt| {
            offset
                .from_local_datetime(&dt)
                .single()
                .map(|aware| aware.naive_utc())
        });
    }

    /// Transaction date in the given timezone
    pub fn local_date(&self, offset: &FixedOffset) -> NaiveDate {
        offset.from_utc_datetime(&self.date).naive_local().date()
    }

    /// Date used to pick the accounting period, falling back to the line date
    pub fn effective_account_date(&self, offset: &FixedOffset) -> NaiveDate {
        self.account_date(offset)
            .map(|local| local.date())
            .unwrap_or_else(|| self.local_date(offset))
    }
}

/// Model a move or line was generated from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    BankStatement(String),
    BankStatementLine(String),
    External(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveState {
    Draft,
    Posted,
}

/// Balanced set of ledger lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub id: String,
    /// Assigned when the move is posted
    pub number: Option<String>,
    pub company_id: String,
    pub period_id: String,
    pub journal_id: String,
    pub date: NaiveDate,
    pub origin: Option<Origin>,
    pub state: MoveState,
}

impl Move {
    pub fn new(
        company_id: String,
        period_id: String,
        journal_id: String,
        date: NaiveDate,
        origin: Option<Origin>,
    ) -> Self {
        Self {
            id: new_id(),
            number: None,
            company_id,
            period_id,
            journal_id,
            date,
            origin,
            state: MoveState::Draft,
        }
    }

    pub fn is_posted(&self) -> bool {
        self.state == MoveState::Posted
    }

    /// Number if posted, identifier otherwise
    pub fn rec_name(&self) -> String {
        self.number.clone().unwrap_or_else(|| self.id.clone())
    }
}

/// Fields of a move line the posted-move write guard can be told to ignore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveLineField {
    Reconciliation,
    BankStatementLineCounterpart,
}

/// Single debit or credit line of a move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveLine {
    pub id: String,
    pub move_id: String,
    pub account_id: String,
    pub party_id: Option<String>,
    pub description: Option<String>,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub second_currency: Option<Currency>,
    pub amount_second_currency: Option<BigDecimal>,
    pub reconciliation_id: Option<String>,
    /// Statement line whose counterpart move this line is the bank side of
    pub bank_statement_line_counterpart: Option<String>,
    pub origin: Option<Origin>,
}

impl MoveLine {
    /// Create a line not yet attached to a move
    pub fn new(account_id: String, debit: BigDecimal, credit: BigDecimal) -> Self {
        Self {
            id: new_id(),
            move_id: String::new(),
            account_id,
            party_id: None,
            description: None,
            debit,
            credit,
            second_currency: None,
            amount_second_currency: None,
            reconciliation_id: None,
            bank_statement_line_counterpart: None,
            origin: None,
        }
    }

    /// Signed amount, debit minus credit
    pub fn balance(&self) -> BigDecimal {
        &self.debit - &self.credit
    }

    pub fn is_reconciled(&self) -> bool {
        self.reconciliation_id.is_some()
    }

    /// Duplicate the line under a new identifier. Reconciliation and the
    /// statement back-reference never follow a copy.
    pub fn duplicate(&self) -> Self {
        Self {
            id: new_id(),
            reconciliation_id: None,
            bank_statement_line_counterpart: None,
            ..self.clone()
        }
    }

    /// Compare two versions of a line, ignoring the excluded fields
    pub fn same_except(&self, other: &MoveLine, excluded: &[MoveLineField]) -> bool {
        let mut left = self.clone();
        let mut right = other.clone();
        for field in excluded {
            match field {
                MoveLineField::Reconciliation => {
                    left.reconciliation_id = None;
                    right.reconciliation_id = None;
                }
                MoveLineField::BankStatementLineCounterpart => {
                    left.bank_statement_line_counterpart = None;
                    right.bank_statement_line_counterpart = None;
                }
            }
        }
        left == right
    }
}

/// Group of fully offsetting lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub id: String,
    pub date: NaiveDate,
    pub line_ids: Vec<String>,
}

/// Link between a statement line and a move explaining part of its amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankMoveLink {
    pub id: String,
    pub statement_line_id: String,
    pub move_id: String,
    /// Amount of the statement line explained by the move, company currency
    pub amount: BigDecimal,
    pub description: Option<String>,
}

/// Search criteria for move lines; unset criteria match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveLineFilter {
    pub company_id: Option<String>,
    pub move_ids: Option<Vec<String>>,
    pub account_id: Option<String>,
    pub unreconciled: bool,
    pub without_counterpart_reference: bool,
    pub posted_only: bool,
    pub reconcilable_accounts_only: bool,
    pub debit: Option<BigDecimal>,
    pub credit: Option<BigDecimal>,
}

/// Which caller is mutating ledger records. Guards waive their protections
/// only for the statement teardown path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardMode {
    Enforce,
    StatementTeardown,
}

impl GuardMode {
    pub fn is_teardown(&self) -> bool {
        matches!(self, GuardMode::StatementTeardown)
    }
}

/// Errors that can occur in the ledger and statement reconciliation system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Company not found: {0}")]
    CompanyNotFound(String),
    #[error("Journal not found: {0}")]
    JournalNotFound(String),
    #[error("Bank statement not found: {0}")]
    StatementNotFound(String),
    #[error("Bank statement line not found: {0}")]
    StatementLineNotFound(String),
    #[error("Move not found: {0}")]
    MoveNotFound(String),
    #[error("Move line not found: {0}")]
    MoveLineNotFound(String),
    #[error("Reconciliation not found: {0}")]
    ReconciliationNotFound(String),
    #[error("No open period found for company \"{company}\" on {date}")]
    PeriodNotFound { company: String, date: NaiveDate },
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Move \"{0}\" is posted and cannot be modified")]
    PostedMoveModification(String),
    #[error("Reconciliation failed: {0}")]
    Reconcile(String),
    #[error("Currency conversion failed: {0}")]
    Currency(String),
    #[error("Statement line \"{line}\" is {state} and cannot be {operation}")]
    InvalidStatementState {
        line: String,
        state: StatementLineState,
        operation: &'static str,
    },
    #[error("Statement line \"{line}\" has counterpart lines and requires an account date")]
    AccountDateRequired { line: String },
    #[error("Move line \"{line}\" cannot be used as counterpart: {reason}")]
    IneligibleCounterpart { line: String, reason: String },
    #[error(
        "Account \"{account}\" of line \"{line}\" is the same as the account of statement journal \"{journal}\""
    )]
    SameAccount {
        account: String,
        line: String,
        journal: String,
    },
    #[error("Statement journal \"{journal}\" has no debit or credit account configured")]
    MissingJournalAccount { journal: String },
    #[error("The account of statement journal \"{journal}\" is not flagged for bank reconciliation")]
    AccountNotBankReconcilable { journal: String },
    #[error("No counterpart line found in the generated move")]
    CounterpartNotFound,
    #[error(
        "Lines of move \"{move_number}\" cannot be deleted because it is linked to bank statement line \"{statement_line}\""
    )]
    LineDeletionBlocked {
        move_number: String,
        statement_line: String,
    },
    #[error(
        "Reconciliation cannot be deleted because it contains lines of bank statement line \"{statement_line}\""
    )]
    ReconciliationDeletionBlocked { statement_line: String },
}

impl LedgerError {
    /// Stable identifier of the error kind
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Storage(_) => "storage",
            LedgerError::Validation(_) => "validation",
            LedgerError::AccountNotFound(_) => "account_not_found",
            LedgerError::CompanyNotFound(_) => "company_not_found",
            LedgerError::JournalNotFound(_) => "journal_not_found",
            LedgerError::StatementNotFound(_) => "statement_not_found",
            LedgerError::StatementLineNotFound(_) => "statement_line_not_found",
            LedgerError::MoveNotFound(_) => "move_not_found",
            LedgerError::MoveLineNotFound(_) => "move_line_not_found",
            LedgerError::ReconciliationNotFound(_) => "reconciliation_not_found",
            LedgerError::PeriodNotFound { .. } => "period_not_found",
            LedgerError::InvalidMove(_) => "invalid_move",
            LedgerError::PostedMoveModification(_) => "modify_posted_move",
            LedgerError::Reconcile(_) => "reconcile",
            LedgerError::Currency(_) => "currency",
            LedgerError::InvalidStatementState { .. } => "invalid_statement_state",
            LedgerError::AccountDateRequired { .. } => "account_date_required",
            LedgerError::IneligibleCounterpart { .. } => "ineligible_counterpart",
            LedgerError::SameAccount { .. } => "same_account",
            LedgerError::MissingJournalAccount { .. } => "account_statement_journal",
            LedgerError::AccountNotBankReconcilable { .. } => "account_not_bank_reconcile",
            LedgerError::CounterpartNotFound => "not_found_counterparts",
            LedgerError::LineDeletionBlocked { .. } => "move_line_cannot_delete",
            LedgerError::ReconciliationDeletionBlocked { .. } => "reconciliation_cannot_delete",
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

//! Chart of accounts and company setup

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_account;

/// Account manager for company, account, period and journal records
pub struct AccountManager<S: AccountingStorage> {
    pub(crate) storage: S,
}

impl<S: AccountingStorage> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Register a company
    pub async fn create_company(&mut self, company: Company) -> LedgerResult<Company> {
        if self.storage.get_company(&company.id).await?.is_some() {
            return Err(LedgerError::Validation(format!(
                "Company with ID '{}' already exists",
                company.id
            )));
        }
        self.storage.save_company(&company).await?;
        Ok(company)
    }

    /// Get a company by ID, returning an error if not found
    pub async fn get_company_required(&self, company_id: &str) -> LedgerResult<Company> {
        self.storage
            .get_company(company_id)
            .await?
            .ok_or_else(|| LedgerError::CompanyNotFound(company_id.to_string()))
    }

    /// Create a new account
    pub async fn create_account(&mut self, account: Account) -> LedgerResult<Account> {
        validate_account(&account)?;

        // Check if account already exists
        if self.storage.get_account(&account.id).await?.is_some() {
            return Err(LedgerError::Validation(format!(
                "Account with ID '{}' already exists",
                account.id
            )));
        }

        self.storage.save_account(&account).await?;
        Ok(account)
    }

    /// Get an account by ID, returning an error if not found
    pub async fn get_account_required(&self, account_id: &str) -> LedgerResult<Account> {
        self.storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    /// Register an accounting period
    pub async fn create_period(&mut self, period: Period) -> LedgerResult<Period> {
        if period.start_date > period.end_date {
            return Err(LedgerError::Validation(format!(
                "Period '{}' starts after it ends",
                period.name
            )));
        }
        self.get_company_required(&period.company_id).await?;
        self.storage.save_period(&period).await?;
        Ok(period)
    }

    /// Close a period; no move can be posted in it afterwards
    pub async fn close_period(&mut self, period_id: &str) -> LedgerResult<()> {
        let mut period = self
            .storage
            .get_period(period_id)
            .await?
            .ok_or_else(|| LedgerError::Validation(format!("Period '{}' not found", period_id)))?;
        period.state = PeriodState::Closed;
        self.storage.save_period(&period).await
    }

    /// Register an accounting journal
    pub async fn create_journal(&mut self, journal: Journal) -> LedgerResult<Journal> {
        self.storage.save_journal(&journal).await?;
        Ok(journal)
    }

    /// Register a bank statement journal; its accounting journal and bank
    /// accounts must exist
    pub async fn create_statement_journal(
        &mut self,
        journal: StatementJournal,
    ) -> LedgerResult<StatementJournal> {
        if self.storage.get_journal(&journal.journal_id).await?.is_none() {
            return Err(LedgerError::JournalNotFound(journal.journal_id.clone()));
        }
        for account_id in [&journal.debit_account_id, &journal.credit_account_id]
            .into_iter()
            .flatten()
        {
            self.get_account_required(account_id).await?;
        }
        self.storage.save_statement_journal(&journal).await?;
        Ok(journal)
    }

    /// Get a bank statement journal by ID, returning an error if not found
    pub async fn get_statement_journal_required(
        &self,
        journal_id: &str,
    ) -> LedgerResult<StatementJournal> {
        self.storage
            .get_statement_journal(journal_id)
            .await?
            .ok_or_else(|| LedgerError::JournalNotFound(journal_id.to_string()))
    }
}

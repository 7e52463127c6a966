//! Dated exchange-rate table implementing [`CurrencyConverter`]

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use crate::traits::CurrencyConverter;
use crate::types::*;

/// Exchange rates keyed by currency code, each a date-ordered history of
/// "units of this currency per one unit of the base currency"
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<String, BTreeMap<NaiveDate, BigDecimal>>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the rate of `currency` effective from `date`
    pub fn add_rate(&mut self, currency: &Currency, date: NaiveDate, rate: BigDecimal) {
        self.rates
            .entry(currency.code.clone())
            .or_default()
            .insert(date, rate);
    }

    /// Builder form of [`RateTable::add_rate`]
    pub fn with_rate(mut self, currency: &Currency, date: NaiveDate, rate: BigDecimal) -> Self {
        self.add_rate(currency, date, rate);
        self
    }

    /// Latest rate on or before `date`
    pub fn rate(&self, currency: &Currency, date: NaiveDate) -> LedgerResult<&BigDecimal> {
        self.rates
            .get(&currency.code)
            .and_then(|history| history.range(..=date).next_back())
            .map(|(_, rate)| rate)
            .ok_or_else(|| {
                LedgerError::Currency(format!("no rate for {} on {}", currency.code, date))
            })
    }
}

impl CurrencyConverter for RateTable {
    fn compute(
        &self,
        from: &Currency,
        amount: &BigDecimal,
        to: &Currency,
        date: NaiveDate,
    ) -> LedgerResult<BigDecimal> {
        if from == to {
            return Ok(to.round(amount));
        }
        let from_rate = self.rate(from, date)?;
        let to_rate = self.rate(to, date)?;
        if *from_rate == BigDecimal::from(0) {
            return Err(LedgerError::Currency(format!(
                "zero rate for {} on {}",
                from.code, date
            )));
        }
        Ok(to.round(&(amount * to_rate / from_rate)))
    }
}

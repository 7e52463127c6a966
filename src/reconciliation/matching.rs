//! Amount matching of unexplained statement amounts against open move lines

use bigdecimal::BigDecimal;

use crate::types::*;

/// Part of the statement line amount not explained by linked moves
pub fn search_amount(
    company_amount: &BigDecimal,
    moves_amount: &BigDecimal,
    currency: &Currency,
) -> BigDecimal {
    currency.round(&(company_amount - moves_amount))
}

/// Filter for lines that could explain `search_amount`: unreconciled,
/// unreferenced lines of posted moves on reconcilable accounts whose debit
/// (positive amount) or credit (negative amount) equals it exactly
///
/// Returns `None` when there is nothing to explain.
pub fn candidate_filter(company_id: &str, search_amount: &BigDecimal) -> Option<MoveLineFilter> {
    let zero = BigDecimal::from(0);
    if *search_amount == zero {
        return None;
    }

    let mut filter = MoveLineFilter {
        company_id: Some(company_id.to_string()),
        unreconciled: true,
        without_counterpart_reference: true,
        posted_only: true,
        reconcilable_accounts_only: true,
        ..MoveLineFilter::default()
    };
    if *search_amount > zero {
        filter.debit = Some(search_amount.clone());
    } else {
        filter.credit = Some(search_amount.abs());
    }
    Some(filter)
}

/// The only candidate, if the match is unambiguous
pub fn unique_match(mut candidates: Vec<MoveLine>) -> Option<MoveLine> {
    if candidates.len() == 1 {
        candidates.pop()
    } else {
        None
    }
}

use crate::amount::{last_money, parse_amount_token, round_cents};
use crate::models::NormalizedRow;

/// Header lines searched for balances.
const HEADER_LINES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceKind {
    /// Bank account: ending = beginning + rows.
    Asset,
    /// Card account: new = previous - rows, since purchases are stored negative.
    Liability,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatementBalances {
    pub kind: BalanceKind,
    pub opening: f64,
    pub closing: f64,
}

/// Last money token on the first header line containing `label`.
fn balance_after(lines: &[&str], label: &str) -> Option<f64> {
    lines
        .iter()
        .find(|l| l.to_lowercase().contains(label))
        .and_then(|l| last_money(l))
        .and_then(|raw| parse_amount_token(raw.trim()))
        .map(|t| t.value)
}

pub fn find_balances(text: &str) -> Option<StatementBalances> {
    let lines: Vec<&str> = text.lines().take(HEADER_LINES).collect();

    if let (Some(opening), Some(closing)) = (
        balance_after(&lines, "beginning balance"),
        balance_after(&lines, "ending balance"),
    ) {
        return Some(StatementBalances {
            kind: BalanceKind::Asset,
            opening,
            closing,
        });
    }

    let opening = balance_after(&lines, "previous balance")?;
    let closing = balance_after(&lines, "new balance")?;
    Some(StatementBalances {
        kind: BalanceKind::Liability,
        opening,
        closing,
    })
}

pub struct ReconcileResult {
    pub is_reconciled: bool,
    pub statement_balance: f64,
    pub calculated_balance: f64,
    pub discrepancy: f64,
}

pub fn implied_closing(balances: &StatementBalances, amounts: &[f64]) -> f64 {
    let total: f64 = amounts.iter().sum();
    let implied = match balances.kind {
        BalanceKind::Asset => balances.opening + total,
        BalanceKind::Liability => balances.opening - total,
    };
    round_cents(implied)
}

pub fn reconcile(balances: &StatementBalances, rows: &[NormalizedRow]) -> ReconcileResult {
    let amounts: Vec<f64> = rows.iter().map(|r| r.amount).collect();
    let calculated = implied_closing(balances, &amounts);
    let discrepancy = round_cents(calculated - balances.closing);
    ReconcileResult {
        is_reconciled: discrepancy.abs() < 0.01,
        statement_balance: balances.closing,
        calculated_balance: calculated,
        discrepancy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(opening: f64, closing: f64) -> StatementBalances {
        StatementBalances {
            kind: BalanceKind::Asset,
            opening,
            closing,
        }
    }

    #[test]
    fn test_implied_ending_balance() {
        let b = asset(100.0, 104.5);
        assert_eq!(implied_closing(&b, &[-20.0, -5.5, 30.0]), 104.5);
    }

    #[test]
    fn test_liability_direction() {
        let b = StatementBalances {
            kind: BalanceKind::Liability,
            opening: 200.0,
            closing: 250.0,
        };
        // one purchase of 80 and one payment of 30
        assert_eq!(implied_closing(&b, &[-80.0, 30.0]), 250.0);
    }

    #[test]
    fn test_find_bank_balances() {
        let text = "Beginning Balance $1,000.00\nDeposits 5.00\nEnding Balance (12.50)\n";
        let b = find_balances(text).unwrap();
        assert_eq!(b.kind, BalanceKind::Asset);
        assert_eq!(b.opening, 1000.0);
        assert_eq!(b.closing, -12.5);
    }

    #[test]
    fn test_find_card_balances() {
        let text = "Previous Balance ........ $123.45\nNew Balance ........ $456.78\n";
        let b = find_balances(text).unwrap();
        assert_eq!(b.kind, BalanceKind::Liability);
        assert_eq!((b.opening, b.closing), (123.45, 456.78));
        assert!(find_balances("no balances here").is_none());
    }

    #[test]
    fn test_discrepancy() {
        let b = asset(100.0, 110.0);
        let rows: Vec<NormalizedRow> = Vec::new();
        let result = reconcile(&b, &rows);
        assert!(!result.is_reconciled);
        assert_eq!(result.discrepancy, -10.0);
        assert_eq!(result.calculated_balance, 100.0);
    }
}

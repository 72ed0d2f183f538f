//! Decides whether an unsigned OCR amount is money in or money out.
//!
//! Priority: an explicit sign on the token wins; then the debit/credit
//! keyword scores of the description; then the running-balance delta when
//! one is known; then the configured fallback.

use serde::{Deserialize, Serialize};

use crate::amount::AmountToken;
use crate::settings::Settings;

const DEBIT_HINTS: &[&str] = &[
    "card purchase",
    "pos purchase",
    "debit card",
    "withdrawal",
    "atm withdrawal",
    "atm withdrl",
    "atm",
    "cash withdrawal",
    "cash advance",
    "payment",
    "bill pay",
    "auto pay",
    "autopay",
    "ach debit",
    "ach withdrawal",
    "ach withdrl",
    "recurring card purchase",
    "subscription",
    "online transfer to",
    "transfer to",
    "zelle to",
    "venmo cashout",
    "venmo payment",
    "paypal inst xfer",
    "paypal inst transfer",
    "paypal debit",
    "doordash",
    "uber",
    "lyft",
    "grubhub",
    "postmates",
    "ubereats",
    "instacart",
    "fee",
    "service charge",
    "maintenance fee",
    "overdraft fee",
    "late fee",
    "nsf fee",
    "interest charged",
    "finance charge",
    "charge",
    "purchase",
    "preauth",
    "authorization",
];

const CREDIT_HINTS: &[&str] = &[
    "deposit",
    "direct dep",
    "directdep",
    "directdeposit",
    "direct deposit",
    "payroll",
    "salary",
    "wages",
    "employer",
    "refund",
    "rebate",
    "reversal",
    "returned item",
    "ach credit",
    "ach deposit",
    "ach cr",
    "credit",
    "cr ",
    " interest paid",
    "interest payment",
    "dividend",
    "cashback",
    "cash back",
    "reward",
    "real time transfer recd from",
    "transfer from",
    "online transfer from",
    "zelle from",
    "venmo payment received",
    "venmo cashin",
    "paypal transfer",
    "paypal cashout from",
];

const TRANSFER_HINTS: &[&str] = &[
    "TRANSFER TO",
    "XFER TO",
    "TO SAVINGS",
    "TO CHECKING",
    "REAL TIME TRANSFER RCD TO",
    "PAYMENT TO",
    "PAYPAL TRANSFER TO",
    "VENMO TRANSFER TO",
    "ZELLE TO",
    "CASH APP TO",
];

/// Which way to lean when nothing else decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackDirection {
    /// Over-count spend rather than inflate income.
    #[default]
    Debit,
    Credit,
}

impl FallbackDirection {
    fn sign(&self) -> f64 {
        match self {
            Self::Debit => -1.0,
            Self::Credit => 1.0,
        }
    }
}

/// Lowercased `{keyword: weight}` vocabulary.
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    entries: Vec<(String, u32)>,
}

impl KeywordTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, w)| (k.as_ref().to_lowercase(), w))
                .collect(),
        }
    }

    fn uniform(words: &[&str]) -> Self {
        Self::new(words.iter().map(|w| (*w, 1)))
    }

    /// Sum of the weights of every keyword contained in `normalized`.
    pub fn score(&self, normalized: &str) -> u32 {
        self.entries
            .iter()
            .filter(|(kw, _)| normalized.contains(kw.as_str()))
            .map(|(_, w)| *w)
            .sum()
    }
}

/// Context around an amount token.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectionContext<'a> {
    pub description: &'a str,
    pub balance_before: Option<f64>,
    pub balance_after: Option<f64>,
}

impl<'a> DirectionContext<'a> {
    pub fn new(description: &'a str) -> Self {
        Self {
            description,
            balance_before: None,
            balance_after: None,
        }
    }

    pub fn with_balances(mut self, before: Option<f64>, after: Option<f64>) -> Self {
        self.balance_before = before;
        self.balance_after = after;
        self
    }

    fn normalized(&self) -> String {
        self.description
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

#[derive(Debug, Clone)]
pub struct DirectionRules {
    pub debit: KeywordTable,
    pub credit: KeywordTable,
    pub fallback: FallbackDirection,
}

impl Default for DirectionRules {
    fn default() -> Self {
        Self {
            debit: KeywordTable::uniform(DEBIT_HINTS),
            credit: KeywordTable::uniform(CREDIT_HINTS),
            fallback: FallbackDirection::Debit,
        }
    }
}

impl DirectionRules {
    pub fn from_settings(settings: &Settings) -> Self {
        let mut rules = Self::default();
        if !settings.debit_keywords.is_empty() {
            rules.debit = KeywordTable::new(settings.debit_keywords.iter().map(|(k, w)| (k, *w)));
        }
        if !settings.credit_keywords.is_empty() {
            rules.credit =
                KeywordTable::new(settings.credit_keywords.iter().map(|(k, w)| (k, *w)));
        }
        rules.fallback = settings.fallback_direction;
        rules
    }

    /// +1.0 for money in, -1.0 for money out.
    pub fn infer_sign(&self, token: &AmountToken, ctx: &DirectionContext) -> f64 {
        if token.explicit_sign {
            return if token.value < 0.0 { -1.0 } else { 1.0 };
        }

        let text = ctx.normalized();
        let debit = self.debit.score(&text);
        let credit = self.credit.score(&text);
        if debit > credit {
            return -1.0;
        }
        if credit > debit {
            return 1.0;
        }

        if let (Some(before), Some(after)) = (ctx.balance_before, ctx.balance_after) {
            let delta = after - before;
            if delta > 0.0 {
                return 1.0;
            }
            if delta < 0.0 {
                return -1.0;
            }
        }

        self.fallback.sign()
    }

    /// Final signed amount. Zero stays zero.
    pub fn signed_amount(&self, token: &AmountToken, ctx: &DirectionContext) -> f64 {
        let magnitude = token.magnitude();
        if magnitude == 0.0 {
            return 0.0;
        }
        magnitude * self.infer_sign(token, ctx)
    }
}

/// Internal-movement wording ("transfer to", "zelle to"...).
pub fn is_transfer(description: &str) -> bool {
    let upper = description.to_uppercase();
    TRANSFER_HINTS.iter().any(|k| upper.contains(k))
}

/// Semantic label for reporting; never affects the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Income,
    Interest,
    Fee,
    Refund,
    Transfer,
    Expense,
    Unknown,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Interest => "interest",
            Self::Fee => "fee",
            Self::Refund => "refund",
            Self::Transfer => "transfer",
            Self::Expense => "expense",
            Self::Unknown => "unknown",
        }
    }
}

pub fn classify_kind(description: &str) -> TransactionKind {
    let text = description
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| text.contains(w));

    if any(&["payroll", "direct dep", "direct deposit", "salary", "wages"]) {
        TransactionKind::Income
    } else if any(&["interest paid", "interest payment", "interest income"]) {
        TransactionKind::Interest
    } else if any(&["fee", "service charge"]) {
        TransactionKind::Fee
    } else if any(&["refund", "rebate", "reversal", "returned item"]) {
        TransactionKind::Refund
    } else if any(&["transfer to", "transfer from", "online transfer", "zelle", "venmo", "paypal"]) {
        TransactionKind::Transfer
    } else if any(&["card purchase", "pos purchase", "debit card", "atm", "purchase", "charge", "payment"]) {
        TransactionKind::Expense
    } else {
        TransactionKind::Unknown
    }
}

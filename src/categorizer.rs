use std::sync::OnceLock;

use regex::Regex;

/// Ordered `(label, keywords)` table; the first label with a keyword
/// contained in the upper-cased description wins.
const CATEGORY_TABLE: &[(&str, &[&str])] = &[
    ("Transportation/Gas", &["GAS", "CHEVRON", "ARCO", "SHELL", "COSTCO GAS"]),
    ("Transportation/Other", &["UBER", "LYFT", "TAXI"]),
    (
        "Groceries/General Merchandise",
        &["WALMART", "WAL-MART", "TARGET", "COSTCO", "GROCERY", "GROCERIES"],
    ),
    (
        "Food/Fast Food",
        &["MCDONALD", "CARL'S JR", "CARLS JR", "BURGER KING", "TACO BELL", "KFC", "FAST FOOD"],
    ),
    ("Food/Coffee", &["STARBUCKS", "COFFEE", "CAFE"]),
    ("Food/Delivery", &["DOORDASH", "UBER EATS", "GRUBHUB", "POSTMATES"]),
    (
        "Entertainment/Streaming",
        &["SPOTIFY", "NETFLIX", "HULU", "PARAMOUNT", "DISNEY+", "MAX "],
    ),
    ("Utilities/Phone", &["VERIZON", "T-MOBILE", "AT&T", "ATT MOBILITY"]),
    ("Utilities/Energy", &["ELECTRIC", "SDGE", "PG&E", "GAS & ELECTRIC"]),
    ("Insurance", &["INSURANCE", "PREMIUM"]),
    (
        "Transfer/Person-to-person",
        &["TRANSFER", "ZELLE", "VENMO", "P2P", "PERSON-TO-PERSON"],
    ),
];

/// Best-effort merchant category, or "" when nothing matches.
pub fn guess_category(description: &str) -> String {
    let upper = description.to_uppercase();
    CATEGORY_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| upper.contains(k)))
        .map(|(label, _)| label.to_string())
        .unwrap_or_default()
}

fn account_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:ACCT|ACCOUNT|ENDING IN|CKG|SAV|\.\.\.|\*)\s*(?:NO\.?|NUMBER|#)?\s*:?\s*(\d{4})\b")
            .expect("account suffix pattern")
    })
}

/// `needle` occurs with no letter directly on either side, so "PURCHASE"
/// does not count as "CHASE" while "CHASE_JAN" does.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(|c| c.is_alphabetic()) && !after.is_some_and(|c| c.is_alphabetic())
    })
}

/// Guess `(source_system, account_name)` from the file name plus line text.
pub fn detect_source_and_account(
    line: &str,
    file_name: &str,
    default_source: &str,
) -> (String, String) {
    let text = format!("{file_name} {line}").to_uppercase();

    let mut account = String::new();
    let source = if text.contains("VENMO") {
        if text.contains("WALLET") {
            account = "Venmo Wallet".to_string();
        }
        "Venmo"
    } else if text.contains("PAYPAL") || text.contains("PP*") {
        "PayPal"
    } else if text.contains("BANK OF AMERICA") || text.contains("B OF A") || text.contains("ADV PLUS")
    {
        "Bank of America"
    } else if contains_word(&text, "CHASE") || text.contains("PREMIER PLUS") {
        "Chase"
    } else {
        default_source
    };

    if account.is_empty() {
        if let Some(caps) = account_suffix_re().captures(&text) {
            account = format!("Acct *{}", &caps[1]);
        }
    }

    (source.to_string(), account)
}

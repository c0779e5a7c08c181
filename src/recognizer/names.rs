//! Human-readable names for manufacturer-prefixed identifiers.

/// Manufacturer prefix to brand name.
const BRANDS: &[(&str, &str)] = &[
    ("AEGS", "Aegis"),
    ("ANVL", "Anvil"),
    ("DRAK", "Drake"),
    ("MISC", "MISC"),
    ("RSI", "RSI"),
    ("ORIG", "Origin"),
    ("CRUS", "Crusader"),
    ("ARGO", "ARGO"),
    ("CNOU", "CO"),
    ("BANU", "Banu"),
    ("AOPOA", "Aopoa"),
    ("ESPR", "Esperia"),
    ("GATM", "Gatac"),
    ("MIRA", "Mirai"),
];

/// Normalize a ship identifier such as `AEGS_Gladius_9490661802904`
/// into `Aegis Gladius`.
///
/// Every recognizer that surfaces a vehicle name routes it through here.
#[must_use]
pub fn clean_ship_name(raw: Option<&str>) -> String {
    let raw = match raw.map(str::trim) {
        None | Some("") => return "Ship".to_string(),
        Some("unknown") => return "Unknown".to_string(),
        Some(r) => r,
    };

    let name = match raw.split_once('_') {
        Some((prefix, rest)) if is_manufacturer_prefix(prefix) => {
            match BRANDS.iter().find(|(code, _)| *code == prefix) {
                Some((_, brand)) => format!("{brand} {rest}"),
                None => format!("{prefix} {rest}"),
            }
        }
        _ => raw.to_string(),
    };

    strip_numeric_suffix(&name).replace('_', " ").trim().to_string()
}

fn is_manufacturer_prefix(prefix: &str) -> bool {
    (3..=5).contains(&prefix.len()) && prefix.chars().all(|c| c.is_ascii_uppercase())
}

/// Drop a trailing `_<digits>` entity id.
#[must_use]
pub fn strip_numeric_suffix(name: &str) -> &str {
    match name.rsplit_once('_') {
        Some((head, tail)) if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) => head,
        _ => name,
    }
}

/// Uppercase the first letter of every space-separated word, keeping the
/// rest of each word as-is (`microTech hub` becomes `MicroTech Hub`).
#[must_use]
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse runs of whitespace into single spaces and trim.
#[must_use]
pub fn squash_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Journal entry totals ──
//
// Presentational arithmetic only: totals and the difference are
// recomputed from the lines on screen. Nothing here blocks a submit;
// balancing and posting are decided by the server.

use std::str::FromStr;

use rust_decimal::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::EntityId;

/// Amounts are shown with two decimals, half away from zero.
const DECIMAL_PLACES: u32 = 2;

/// One debit/credit line of a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct JournalLine {
    pub account_id: Option<EntityId>,
    pub cost_center_id: Option<EntityId>,
    pub description: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,
}

impl JournalLine {
    pub fn from_value(value: &Value) -> Self {
        Self {
            account_id: value.get("account_id").and_then(EntityId::from_value),
            cost_center_id: value.get("cost_center_id").and_then(EntityId::from_value),
            description: value
                .get("description")
                .and_then(Value::as_str)
                .map(String::from),
            debit: value.get("debit").map(parse_amount).unwrap_or_default(),
            credit: value.get("credit").map(parse_amount).unwrap_or_default(),
        }
    }

    /// Request-body form of the line. Amounts travel as strings.
    pub fn to_value(&self) -> Value {
        json!({
            "account_id": self.account_id.as_ref().map(EntityId::to_value),
            "cost_center_id": self.cost_center_id.as_ref().map(EntityId::to_value),
            "description": self.description,
            "debit": format_amount(self.debit),
            "credit": format_amount(self.credit),
        })
    }
}

fn raw_lines(entry: &Value) -> Option<&Vec<Value>> {
    ["lines", "details", "items"]
        .iter()
        .find_map(|k| entry.get(k).and_then(Value::as_array))
}

/// Lines of a journal entry payload (`lines`, `details` or `items`).
pub fn lines_of(entry: &Value) -> Vec<JournalLine> {
    raw_lines(entry)
        .map(|items| items.iter().map(JournalLine::from_value).collect())
        .unwrap_or_default()
}

/// Header fields the edit form never sends back.
const READ_ONLY: &[&str] = &[
    "id",
    "attachments",
    "files",
    "lines",
    "details",
    "items",
    "created_at",
    "updated_at",
    "deleted_at",
];

/// Server bookkeeping a line carries but never accepts back.
const LINE_READ_ONLY: &[&str] = &["created_at", "updated_at", "deleted_at"];

/// The edit form's body for `entry`: writable scalar header fields plus
/// every line. Sent as-is when only attachments change.
pub fn edit_body(entry: &Value) -> Value {
    let mut body = Map::new();
    if let Some(fields) = entry.as_object() {
        for (key, value) in fields {
            let scalar = !(value.is_object() || value.is_array() || value.is_null());
            if scalar && !READ_ONLY.contains(&key.as_str()) {
                body.insert(key.clone(), value.clone());
            }
        }
    }
    let lines = raw_lines(entry)
        .map(|items| items.iter().map(line_body).collect())
        .unwrap_or_default();
    body.insert("lines".into(), Value::Array(lines));
    Value::Object(body)
}

/// A line as the server sent it, minus nested records and bookkeeping,
/// with amounts normalized to two-decimal strings.
fn line_body(raw: &Value) -> Value {
    let Some(fields) = raw.as_object() else {
        return JournalLine::from_value(raw).to_value();
    };
    let mut line: Map<String, Value> = fields
        .iter()
        .filter(|(key, value)| {
            !(value.is_object() || value.is_array()) && !LINE_READ_ONLY.contains(&key.as_str())
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    for key in ["debit", "credit"] {
        let amount = fields.get(key).map(parse_amount).unwrap_or_default();
        line.insert(key.into(), Value::String(format_amount(amount)));
    }
    Value::Object(line)
}

/// Lenient amount parsing: numbers, numeric strings (thousands
/// separators allowed) and scientific notation. Anything else is zero.
pub fn parse_amount(value: &Value) -> Decimal {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().replace(',', ""),
        _ => return Decimal::ZERO,
    };
    if raw.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .unwrap_or_default()
}

pub fn format_amount(amount: Decimal) -> String {
    let rounded =
        amount.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

// ── Totals ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balance {
    Balanced,
    Unbalanced { difference: Decimal },
}

/// Column sums. When a sum leaves `Decimal`'s range it is clamped and
/// `overflowed` is set; such totals never count as balanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct JournalTotals {
    pub debit: Decimal,
    pub credit: Decimal,
    pub overflowed: bool,
}

/// `a + b`, clamped to the representable range.
fn clamped_add(a: Decimal, b: Decimal, overflowed: &mut bool) -> Decimal {
    a.checked_add(b).unwrap_or_else(|| {
        *overflowed = true;
        if b.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}

impl JournalTotals {
    pub fn from_lines(lines: &[JournalLine]) -> Self {
        lines.iter().fold(Self::default(), |acc, line| {
            let mut overflowed = acc.overflowed;
            let debit = clamped_add(acc.debit, line.debit, &mut overflowed);
            let credit = clamped_add(acc.credit, line.credit, &mut overflowed);
            Self {
                debit,
                credit,
                overflowed,
            }
        })
    }

    /// Absolute difference, rounded to display precision.
    pub fn difference(&self) -> Decimal {
        self.debit
            .checked_sub(self.credit)
            .map_or(Decimal::MAX, |d| d.abs())
            .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn balance(&self) -> Balance {
        let difference = self.difference();
        if difference.is_zero() && !self.overflowed {
            Balance::Balanced
        } else {
            Balance::Unbalanced { difference }
        }
    }

    pub fn is_balanced(&self) -> bool {
        matches!(self.balance(), Balance::Balanced)
    }

    pub fn difference_text(&self) -> String {
        if self.overflowed {
            "overflow".to_owned()
        } else {
            format_amount(self.difference())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn line(debit: &str, credit: &str) -> JournalLine {
        JournalLine::from_value(&json!({"account_id": 1, "debit": debit, "credit": credit}))
    }

    #[test]
    fn balanced_entry_shows_zero_difference() {
        let totals = JournalTotals::from_lines(&[line("500.00", "0"), line("0", "500.00")]);
        assert_eq!(format_amount(totals.debit), "500.00");
        assert_eq!(format_amount(totals.credit), "500.00");
        assert_eq!(totals.difference_text(), "0.00");
        assert_eq!(totals.balance(), Balance::Balanced);
    }

    #[test]
    fn mismatch_reports_absolute_difference() {
        let totals = JournalTotals::from_lines(&[line("500", ""), line("", "480.5")]);
        assert_eq!(totals.difference_text(), "19.50");
        assert!(!totals.is_balanced());
        assert!(matches!(totals.balance(), Balance::Unbalanced { .. }));

        let reversed = JournalTotals::from_lines(&[line("", "500"), line("480.5", "")]);
        assert_eq!(reversed.difference(), totals.difference());
    }

    #[test]
    fn amounts_parse_leniently() {
        assert_eq!(parse_amount(&json!(12.5)), Decimal::new(125, 1));
        assert_eq!(parse_amount(&json!("1,250.75")), Decimal::new(125_075, 2));
        assert_eq!(parse_amount(&json!("abc")), Decimal::ZERO);
        assert_eq!(parse_amount(&json!(null)), Decimal::ZERO);
        assert_eq!(parse_amount(&json!("  ")), Decimal::ZERO);
    }

    #[test]
    fn sub_cent_noise_is_balanced() {
        let totals = JournalTotals::from_lines(&[line("100.004", "0"), line("0", "100")]);
        assert!(totals.is_balanced());
    }

    #[test]
    fn lines_are_found_under_known_keys() {
        let entry = json!({"id": 3, "details": [{"debit": 1}, {"credit": 1}]});
        assert_eq!(lines_of(&entry).len(), 2);
        assert!(lines_of(&json!({"id": 3})).is_empty());
    }

    #[test]
    fn edit_body_keeps_header_and_lines_only() {
        let entry = json!({
            "id": 7,
            "entry_number": "JE-0007",
            "created_at": "2026-03-01T10:00:00Z",
            "branch": {"id": 2},
            "lines": [{"account_id": 10, "debit": "100", "credit": "0"}],
            "attachments": [{"id": 3}]
        });
        let body = edit_body(&entry);
        assert_eq!(body["entry_number"], "JE-0007");
        assert!(body.get("id").is_none());
        assert!(body.get("created_at").is_none());
        assert!(body.get("branch").is_none());
        assert!(body.get("attachments").is_none());
        assert_eq!(body["lines"][0]["debit"], "100.00");
    }

    #[test]
    fn huge_amounts_clamp_instead_of_panicking() {
        let max = Decimal::MAX.to_string();
        let totals = JournalTotals::from_lines(&[line(&max, "0"), line(&max, "0")]);
        assert!(totals.overflowed);
        assert_eq!(totals.debit, Decimal::MAX);
        assert_eq!(totals.difference_text(), "overflow");
        assert!(!totals.is_balanced());

        let lopsided = JournalTotals::from_lines(&[line(&max, "0"), line("0", &format!("-{max}"))]);
        assert!(!lopsided.overflowed);
        assert_eq!(lopsided.difference(), Decimal::MAX);
    }

    #[test]
    fn edit_body_keeps_line_identity_and_extra_fields() {
        let entry = json!({
            "id": 7,
            "lines": [{
                "id": 41,
                "account_id": 10,
                "account": {"id": 10, "name": "Cash"},
                "currency_id": 2,
                "rate": "3.67",
                "debit": 100,
                "credit": null,
                "updated_at": "2026-03-01T10:00:00Z"
            }]
        });
        let line = &edit_body(&entry)["lines"][0];
        assert_eq!(line["id"], 41);
        assert_eq!(line["currency_id"], 2);
        assert_eq!(line["rate"], "3.67");
        assert_eq!(line["debit"], "100.00");
        assert_eq!(line["credit"], "0.00");
        assert!(line.get("account").is_none());
        assert!(line.get("updated_at").is_none());
    }

    #[test]
    fn line_serializes_amounts_as_strings() {
        let v = line("10", "0").to_value();
        assert_eq!(v["debit"], "10.00");
        assert_eq!(v["account_id"], 1);
    }
}

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Cosmetic row annotation. Pricing never reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividerRule {
    pub start_row: usize,
    /// Inclusive.
    pub end_row: usize,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub color: String,
}

impl DividerRule {
    pub fn contains(&self, row: usize) -> bool {
        (self.start_row..=self.end_row).contains(&row)
    }
}

pub fn label_for_row(rules: &[DividerRule], row: usize) -> Option<&DividerRule> {
    rules.iter().find(|rule| rule.contains(row))
}

pub fn validate_dividers(rules: &[DividerRule]) -> Result<(), DomainError> {
    let mut ordered = rules.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|rule| rule.start_row);

    for rule in &ordered {
        if rule.start_row > rule.end_row {
            return Err(DomainError::InvariantViolation(format!(
                "divider `{}` starts after it ends ({} > {})",
                rule.label, rule.start_row, rule.end_row
            )));
        }
    }

    for pair in ordered.windows(2) {
        if pair[1].start_row <= pair[0].end_row {
            return Err(DomainError::InvariantViolation(format!(
                "dividers `{}` and `{}` overlap",
                pair[0].label, pair[1].label
            )));
        }
    }

    Ok(())
}

//! Static checks on generated plans.
//!
//! Only the leading keyword is inspected. The statement is not parsed, so a
//! forbidden operation hidden in a subquery or comment is not detected here;
//! the execution endpoint must enforce read-only access on its side too.

use super::types::QueryPlan;
use crate::schema_context::SchemaContext;

#[derive(Clone, Debug, PartialEq)]
pub enum ValidationResult {
    /// Passed; soft findings are carried along.
    Valid { warnings: Vec<String> },
    Invalid {
        reason: String,
        suggestions: Vec<String>,
    },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

#[derive(Debug, Clone)]
pub struct QueryValidator {
    keyword: String,
    min_confidence: f64,
}

impl QueryValidator {
    pub fn new(keyword: &str, min_confidence: f64) -> Self {
        Self {
            keyword: keyword.trim().to_ascii_uppercase(),
            min_confidence,
        }
    }

    /// True when `query` starts with the read-only keyword as a whole word,
    /// ignoring case and leading whitespace.
    pub fn is_read_only(&self, query: &str) -> bool {
        let trimmed = query.trim_start();
        let Some(head) = trimmed.get(..self.keyword.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(&self.keyword) {
            return false;
        }
        match trimmed[self.keyword.len()..].chars().next() {
            None => true,
            Some(c) => !(c.is_alphanumeric() || c == '_'),
        }
    }

    pub fn validate(&self, plan: &QueryPlan, context: Option<&SchemaContext>) -> ValidationResult {
        if plan.query.trim().is_empty() {
            return ValidationResult::Invalid {
                reason: "generated query is empty".to_string(),
                suggestions: vec!["Rephrase the request with the data you want returned".to_string()],
            };
        }

        if !self.is_read_only(&plan.query) {
            let leading = plan
                .query
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_ascii_uppercase();
            return ValidationResult::Invalid {
                reason: format!(
                    "only {} statements are allowed, generated statement starts with {leading}",
                    self.keyword
                ),
                suggestions: vec![
                    "Ask for data to be read, not changed".to_string(),
                    "Simplify the request".to_string(),
                ],
            };
        }

        if plan.tables_used.is_empty() {
            return ValidationResult::Invalid {
                reason: "plan does not name any table".to_string(),
                suggestions: vec!["Name the table the data lives in".to_string()],
            };
        }

        if plan.confidence < self.min_confidence {
            return ValidationResult::Invalid {
                reason: format!(
                    "plan confidence {:.2} is below the required {:.2}",
                    plan.confidence, self.min_confidence
                ),
                suggestions: vec![
                    "Simplify the request".to_string(),
                    "Name the tables and fields involved".to_string(),
                ],
            };
        }

        let mut warnings = Vec::new();
        if let Some(context) = context {
            for table in &plan.tables_used {
                if !context.contains_table(table) {
                    warnings.push(format!("table {table} is not part of the schema context"));
                }
            }
        }
        for warning in &warnings {
            tracing::warn!(target: "querysmith.validate", "{warning}");
        }
        ValidationResult::Valid { warnings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_context::{ContextOrigin, TableContext};
    use std::collections::BTreeMap;

    fn plan(query: &str, confidence: f64) -> QueryPlan {
        QueryPlan {
            query: query.to_string(),
            tables_used: vec!["Account".to_string()],
            rationale: String::new(),
            confidence,
        }
    }

    fn validator() -> QueryValidator {
        QueryValidator::new("SELECT", 0.3)
    }

    #[test]
    fn test_mutating_statements_always_rejected() {
        for query in [
            "UPDATE Account SET Name = 'x'",
            "update Account set Name = 'x'",
            "DELETE FROM Account",
            "  delete from Account",
            "Delete Account",
        ] {
            let result = validator().validate(&plan(query, 1.0), None);
            assert!(!result.is_valid(), "{query} should be rejected");
        }
    }

    #[test]
    fn test_select_prefix_accepted() {
        for query in [
            "SELECT Id FROM Account",
            "select Id, (SELECT Id FROM Contacts) FROM Account",
            "\n\tSelect Name FROM Account WHERE Industry = 'Technology'",
            "SELECT",
            "SELECT(Id) FROM Account",
        ] {
            assert!(validator().is_read_only(query), "{query} should pass");
        }
    }

    #[test]
    fn test_keyword_must_be_whole_word() {
        assert!(!validator().is_read_only("SELECTED FROM Account"));
        assert!(!validator().is_read_only("SELECT_ALL"));
        assert!(!validator().is_read_only("SEL"));
        assert!(!validator().is_read_only("ÉSELECT Id"));
    }

    #[test]
    fn test_low_confidence_rejected() {
        let result = validator().validate(&plan("SELECT Id FROM Account", 0.1), None);
        let ValidationResult::Invalid { reason, suggestions } = result else {
            panic!("expected rejection");
        };
        assert!(reason.contains("confidence"));
        assert!(suggestions.iter().any(|s| s == "Simplify the request"));
    }

    #[test]
    fn test_empty_tables_used_rejected() {
        let mut p = plan("SELECT Id FROM Account", 0.9);
        p.tables_used.clear();
        assert!(!validator().validate(&p, None).is_valid());
    }

    #[test]
    fn test_unknown_table_is_warning() {
        let mut tables = BTreeMap::new();
        tables.insert("Contact".to_string(), TableContext::default());
        let context = SchemaContext {
            tables,
            origin: ContextOrigin::Graph,
            missing_tables: Vec::new(),
            join_hints: Vec::new(),
        };
        let result = validator().validate(&plan("SELECT Id FROM Account", 0.9), Some(&context));
        let ValidationResult::Valid { warnings } = result else {
            panic!("expected valid plan");
        };
        assert_eq!(warnings.len(), 1);
    }
}

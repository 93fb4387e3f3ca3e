//! Active rule index: one document per rule activated in a quality profile.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::{QualgateError, Result};
use crate::index::document::{non_empty, DocumentConverter, IndexDocument, RowChange, SourceRow};
use crate::index::indexer::Indexer;

/// Name of the active rule index.
pub const ACTIVE_RULES_INDEX: &str = "active_rules";

/// Severities a rule activation may override.
pub const SEVERITIES: [&str; 5] = ["INFO", "MINOR", "MAJOR", "CRITICAL", "BLOCKER"];

/// Active rule joined with its rule definition, as read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRuleRow {
    /// Active rule id
    pub id: i64,
    /// Owning quality profile
    pub profile_key: String,
    /// Activated rule
    pub rule_id: i64,
    /// Rule repository
    pub rule_repository: String,
    /// Rule key within the repository
    pub rule_key: String,
    /// Rule name
    pub rule_name: String,
    /// Rule language
    pub language: String,
    /// Severity set on the activation, if any
    pub severity: Option<String>,
    /// Inheritance code, if any
    pub inheritance: Option<String>,
    /// Creation time, in epoch milliseconds
    pub created_at: i64,
    /// Last update, in epoch milliseconds
    pub updated_at: i64,
}

impl SourceRow for ActiveRuleRow {
    fn row_key(&self) -> String {
        self.id.to_string()
    }

    fn scope_key(&self) -> &str {
        &self.profile_key
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }
}

/// How an activation relates to the parent profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActiveRuleInheritance {
    /// Activated directly on the profile
    #[default]
    None,
    /// Inherited unchanged from the parent profile
    Inherited,
    /// Inherited with overridden parameters
    Overrides,
}

impl ActiveRuleInheritance {
    /// Stored code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveRuleInheritance::None => "NONE",
            ActiveRuleInheritance::Inherited => "INHERITED",
            ActiveRuleInheritance::Overrides => "OVERRIDES",
        }
    }
}

impl fmt::Display for ActiveRuleInheritance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActiveRuleInheritance {
    type Err = QualgateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "NONE" => Ok(ActiveRuleInheritance::None),
            "INHERITED" => Ok(ActiveRuleInheritance::Inherited),
            "OVERRIDES" => Ok(ActiveRuleInheritance::Overrides),
            other => Err(QualgateError::validation_field(
                format!("unknown inheritance '{other}'"),
                "inheritance",
            )),
        }
    }
}

/// Indexed active rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRuleDoc {
    /// Active rule id
    pub id: String,
    /// Owning quality profile
    pub profile_key: String,
    /// Activated rule
    pub rule_id: i64,
    /// `<repository>:<key>`
    pub rule_key: String,
    /// Rule name
    pub rule_name: String,
    /// Rule language
    pub language: String,
    /// Overridden severity, `None` when the rule default applies
    pub severity: Option<String>,
    /// Inheritance from the parent profile
    pub inheritance: ActiveRuleInheritance,
    /// Creation time, in epoch milliseconds
    pub created_at: i64,
    /// Last update, in epoch milliseconds
    pub updated_at: i64,
}

impl IndexDocument for ActiveRuleDoc {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_key(&self) -> &str {
        &self.profile_key
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }
}

/// Change made to an active rule by a profile write.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveRuleChange {
    /// Rule newly activated
    Activated(ActiveRuleRow),
    /// Existing activation changed
    Updated(ActiveRuleRow),
    /// Activation removed
    Deactivated {
        /// Removed active rule
        active_rule_id: i64,
    },
}

impl From<ActiveRuleChange> for RowChange<ActiveRuleRow> {
    fn from(change: ActiveRuleChange) -> Self {
        match change {
            ActiveRuleChange::Activated(row) | ActiveRuleChange::Updated(row) => RowChange::Upsert(row),
            ActiveRuleChange::Deactivated { active_rule_id } => RowChange::Delete {
                key: active_rule_id.to_string(),
            },
        }
    }
}

/// Converts active rule rows to [`ActiveRuleDoc`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveRuleConverter;

impl DocumentConverter for ActiveRuleConverter {
    type Row = ActiveRuleRow;
    type Doc = ActiveRuleDoc;

    fn index_name(&self) -> &str {
        ACTIVE_RULES_INDEX
    }

    fn convert(&self, row: &ActiveRuleRow) -> Result<Vec<ActiveRuleDoc>> {
        let row_key = row.row_key();

        let severity = non_empty(row.severity.clone());
        if let Some(severity) = &severity {
            if !SEVERITIES.contains(&severity.as_str()) {
                return Err(QualgateError::data(row_key, format!("unknown severity '{severity}'")));
            }
        }

        let inheritance = row
            .inheritance
            .as_deref()
            .map(str::parse::<ActiveRuleInheritance>)
            .transpose()
            .map_err(|e| match e {
                QualgateError::Validation { message, .. } => QualgateError::data(&row_key, message),
                other => other,
            })?
            .unwrap_or_default();

        Ok(vec![ActiveRuleDoc {
            id: row_key,
            profile_key: row.profile_key.clone(),
            rule_id: row.rule_id,
            rule_key: format!("{}:{}", row.rule_repository, row.rule_key),
            rule_name: row.rule_name.clone(),
            language: row.language.clone(),
            severity,
            inheritance,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }])
    }
}

/// Indexer of active rules.
pub type ActiveRuleIndexer = Indexer<ActiveRuleConverter>;

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ActiveRuleRow {
        ActiveRuleRow {
            id: 42,
            profile_key: "java-sonar-way".to_string(),
            rule_id: 7,
            rule_repository: "java".to_string(),
            rule_key: "S1481".to_string(),
            rule_name: "Unused local variables".to_string(),
            language: "java".to_string(),
            severity: None,
            inheritance: None,
            created_at: 1_000,
            updated_at: 2_000,
        }
    }

    #[test]
    fn test_absent_optionals_are_normalized() {
        let mut with_empty = row();
        with_empty.severity = Some(String::new());
        with_empty.inheritance = Some(String::new());

        for row in [row(), with_empty] {
            let doc = ActiveRuleConverter.convert(&row).unwrap().remove(0);
            assert_eq!(doc.severity, None);
            assert_eq!(doc.inheritance, ActiveRuleInheritance::None);
        }
    }

    #[test]
    fn test_document_fields() {
        let mut row = row();
        row.severity = Some("BLOCKER".to_string());
        row.inheritance = Some("OVERRIDES".to_string());

        let docs = ActiveRuleConverter.convert(&row).unwrap();

        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.id(), "42");
        assert_eq!(doc.parent_key(), "java-sonar-way");
        assert_eq!(doc.rule_key, "java:S1481");
        assert_eq!(doc.severity.as_deref(), Some("BLOCKER"));
        assert_eq!(doc.inheritance, ActiveRuleInheritance::Overrides);
    }

    #[test]
    fn test_bad_codes_are_data_errors() {
        let mut bad_severity = row();
        bad_severity.severity = Some("FATAL".to_string());
        let mut bad_inheritance = row();
        bad_inheritance.inheritance = Some("COPIED".to_string());

        for row in [bad_severity, bad_inheritance] {
            let err = ActiveRuleConverter.convert(&row).unwrap_err();
            assert!(matches!(err, QualgateError::Data { ref row_key, .. } if row_key == "42"));
        }
    }

    #[test]
    fn test_inheritance_codes() {
        assert_eq!("".parse::<ActiveRuleInheritance>().unwrap(), ActiveRuleInheritance::None);
        assert_eq!(
            "OVERRIDES".parse::<ActiveRuleInheritance>().unwrap(),
            ActiveRuleInheritance::Overrides
        );

        let err = "COPIED".parse::<ActiveRuleInheritance>().unwrap_err();
        match err {
            QualgateError::Validation { message, field } => {
                assert_eq!(message, "unknown inheritance 'COPIED'");
                assert_eq!(field.as_deref(), Some("inheritance"));
            }
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_changes_map_to_row_changes() {
        let activated: RowChange<ActiveRuleRow> = ActiveRuleChange::Activated(row()).into();
        assert_eq!(activated, RowChange::Upsert(row()));

        let deactivated: RowChange<ActiveRuleRow> =
            ActiveRuleChange::Deactivated { active_rule_id: 42 }.into();
        assert_eq!(deactivated, RowChange::Delete { key: "42".to_string() });
    }

    #[test]
    fn test_serialized_inheritance_is_upper_case() {
        let doc = ActiveRuleConverter.convert(&row()).unwrap().remove(0);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["inheritance"], "NONE");
        assert!(json["severity"].is_null());
    }
}

//! Synthetic columns computed from lead attributes at export time

use crate::export::config::{ColumnFormat, DisplayMode};

/// Lead attribute a system column reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadAttribute {
    FormId,
    FormName,
    Created,
    MemberId,
    MemberName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemColumn {
    pub tag: &'static str,
    pub name: &'static str,
    pub value: DisplayMode,
    pub format: ColumnFormat,
    pub value_source: Option<LeadAttribute>,
    pub label_source: Option<LeadAttribute>,
}

/// Placeholder column that always stays empty
pub const FIELD_PSEUDO_COLUMN: &str = "_field";

pub const SYSTEM_COLUMNS: [SystemColumn; 4] = [
    SystemColumn {
        tag: "_form",
        name: "Form",
        value: DisplayMode::All,
        format: ColumnFormat::Raw,
        value_source: Some(LeadAttribute::FormId),
        label_source: Some(LeadAttribute::FormName),
    },
    SystemColumn {
        tag: "_created",
        name: "Created",
        value: DisplayMode::Value,
        format: ColumnFormat::Datim,
        value_source: Some(LeadAttribute::Created),
        label_source: None,
    },
    SystemColumn {
        tag: "_member",
        name: "Member",
        value: DisplayMode::All,
        format: ColumnFormat::Raw,
        value_source: Some(LeadAttribute::MemberId),
        label_source: Some(LeadAttribute::MemberName),
    },
    SystemColumn {
        tag: "_skip",
        name: "",
        value: DisplayMode::Value,
        format: ColumnFormat::Raw,
        value_source: None,
        label_source: None,
    },
];

/// Columns leading an export in `all` mode
pub const DEFAULT_SYSTEM_COLUMNS: [&str; 3] = ["_form", "_created", "_member"];

pub fn find(tag: &str) -> Option<&'static SystemColumn> {
    SYSTEM_COLUMNS.iter().find(|column| column.tag == tag)
}

pub fn is_system_tag(tag: &str) -> bool {
    tag == FIELD_PSEUDO_COLUMN || find(tag).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags() {
        assert!(is_system_tag("_form"));
        assert!(is_system_tag("_field"));
        assert!(find("_field").is_none());
        assert!(!is_system_tag("_email"));
        assert_eq!(find("_created").map(|c| c.format), Some(ColumnFormat::Datim));
    }
}

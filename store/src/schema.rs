//! Index schema declarations, expressed as plain data so any store
//! implementation can translate them into its own mapping syntax.

/// Shard/replica settings for a new index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexSettings {
    pub shards: u32,
    pub replicas: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    /// Full-text searchable string, optionally through a named analyzer.
    Text { analyzer: Option<String> },
    /// Exact-match string, not analyzed.
    Keyword,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMapping {
    pub name: &'static str,
    pub kind: FieldKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSchema {
    pub settings: IndexSettings,
    pub fields: Vec<FieldMapping>,
}

/// Mapping for per-currency block indices. The `hash` field is searchable
/// by prefix and full text; payload-only fields stay unmapped.
pub fn block_schema() -> IndexSchema {
    IndexSchema {
        settings: IndexSettings {
            shards: 1,
            replicas: 1,
        },
        fields: vec![
            FieldMapping {
                name: "number",
                kind: FieldKind::Integer,
            },
            FieldMapping {
                name: "hash",
                kind: FieldKind::Text { analyzer: None },
            },
            FieldMapping {
                name: "memberCount",
                kind: FieldKind::Integer,
            },
            FieldMapping {
                name: "membersChanges",
                kind: FieldKind::Text { analyzer: None },
            },
            FieldMapping {
                name: "monetaryMass",
                kind: FieldKind::Text { analyzer: None },
            },
        ],
    }
}

/// Mapping for the deletion-tombstone index.
pub fn delete_record_schema(analyzer: &str) -> IndexSchema {
    IndexSchema {
        settings: IndexSettings {
            shards: 2,
            replicas: 1,
        },
        fields: vec![
            FieldMapping {
                name: "index",
                kind: FieldKind::Keyword,
            },
            FieldMapping {
                name: "type",
                kind: FieldKind::Keyword,
            },
            FieldMapping {
                name: "id",
                kind: FieldKind::Keyword,
            },
            FieldMapping {
                name: "time",
                kind: FieldKind::Integer,
            },
            FieldMapping {
                name: "comment",
                kind: FieldKind::Text {
                    analyzer: Some(analyzer.to_string()),
                },
            },
        ],
    }
}

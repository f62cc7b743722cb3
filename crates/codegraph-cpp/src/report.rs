//! Build report: totals and soft failures of one build.

use codegraph::{CodeGraph, EdgeKind, EntityId, MergeOutcome, SourceLocation};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// A soft failure. Issues are collected; they never abort a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BuildIssue {
    /// A declaration whose name or types could not be decoded; it was kept
    /// as an `unknown` entity with its raw text
    MalformedDeclaration {
        /// Qualified name the entity was stored under
        name: String,
        /// Declaration site
        location: SourceLocation,
        /// What was wrong with it
        reason: String,
    },

    /// A name that never resolved; the edge points at an external placeholder
    UnresolvedReference {
        /// Name as written
        name: String,
        /// Kind of the edge that wanted it
        kind: EdgeKind,
        /// Qualified name of the entity that used it
        from: String,
        /// Where the use appears
        location: SourceLocation,
    },

    /// An `inherits` edge that would have closed a cycle; it was dropped
    InheritanceCycleDetected {
        /// Derived class
        derived: String,
        /// Base that would close the cycle
        base: String,
    },

    /// Same structural key, incompatible entity; the newcomer was renamed
    StoreContention {
        /// Name of the entity that kept the key
        name: String,
        /// Suffixed name of the newcomer
        renamed: String,
    },

    /// A method marked `override` with no matching virtual in any base
    OverrideTargetMissing {
        /// Qualified method name
        method: String,
        /// Declaration site
        location: SourceLocation,
    },

    /// A second `contains` parent was refused
    ContainmentConflict {
        /// Entity that already had a parent
        child: String,
        /// Parent that was refused
        rejected_parent: String,
    },
}

impl BuildIssue {
    /// Short kebab-case tag, matching the serialized `type` field.
    pub fn tag(&self) -> &'static str {
        match self {
            BuildIssue::MalformedDeclaration { .. } => "malformed-declaration",
            BuildIssue::UnresolvedReference { .. } => "unresolved-reference",
            BuildIssue::InheritanceCycleDetected { .. } => "inheritance-cycle-detected",
            BuildIssue::StoreContention { .. } => "store-contention",
            BuildIssue::OverrideTargetMissing { .. } => "override-target-missing",
            BuildIssue::ContainmentConflict { .. } => "containment-conflict",
        }
    }
}

/// Summary of one build
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphBuildReport {
    /// Translation units ingested, in order
    pub files: Vec<PathBuf>,

    /// Entities in the store after the build (implicit roots included)
    pub total_entities: usize,

    /// Edges in the store after the build
    pub total_edges: usize,

    /// Entities allocated by this build
    pub entities_created: usize,

    /// Edges added by this build
    pub edges_created: usize,

    /// Declarations that merged into an existing entity
    pub merges: usize,

    /// Distinct names that ended at an external placeholder, sorted
    pub unresolved_symbols: Vec<String>,

    /// Soft failures, in the order they happened
    pub issues: Vec<BuildIssue>,

    /// Wall-clock time of the build
    pub elapsed: Duration,
}

impl GraphBuildReport {
    /// Record a soft failure
    pub fn push(&mut self, issue: BuildIssue) {
        self.issues.push(issue);
    }

    /// Issues with the given tag (see [`BuildIssue::tag`])
    pub fn issues_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a BuildIssue> + 'a {
        self.issues.iter().filter(move |issue| issue.tag() == tag)
    }

    /// Number of issues with the given tag
    pub fn count(&self, tag: &str) -> usize {
        self.issues_tagged(tag).count()
    }

    /// Whether the build was free of soft failures
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Fold a partial build's report into this one (parallel ingestion).
    pub fn absorb(&mut self, other: GraphBuildReport) {
        self.files.extend(other.files);
        self.merges += other.merges;
        self.issues.extend(other.issues);
    }

    /// Record what a partial-graph merge did; names are looked up in `graph`.
    pub fn record_merge(&mut self, outcome: &MergeOutcome, graph: &CodeGraph) {
        let name_of = |id: EntityId| {
            graph
                .entity(id)
                .map(|e| e.qualified_name.to_string())
                .unwrap_or_else(|_| id.to_string())
        };
        self.merges += outcome.entities_merged;
        for contention in &outcome.contentions {
            self.push(BuildIssue::StoreContention {
                name: name_of(contention.original),
                renamed: contention.name.clone(),
            });
        }
        for rejected in &outcome.rejected_edges {
            let issue = match rejected.kind {
                EdgeKind::Inherits => BuildIssue::InheritanceCycleDetected {
                    derived: name_of(rejected.source),
                    base: name_of(rejected.target),
                },
                _ => BuildIssue::ContainmentConflict {
                    child: name_of(rejected.target),
                    rejected_parent: name_of(rejected.source),
                },
            };
            self.push(issue);
        }
    }

    pub(crate) fn note_unresolved(&mut self, name: &str) {
        if let Err(pos) = self.unresolved_symbols.binary_search_by(|s| s.as_str().cmp(name)) {
            self.unresolved_symbols.insert(pos, name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: u32) -> SourceLocation {
        SourceLocation::new("classes.hpp", line, 1)
    }

    #[test]
    fn test_issue_tags_and_counts() {
        let mut report = GraphBuildReport::default();
        report.push(BuildIssue::OverrideTargetMissing {
            method: "shapes::Circle::area".into(),
            location: at(27),
        });
        report.push(BuildIssue::UnresolvedReference {
            name: "std::string".into(),
            kind: EdgeKind::References,
            from: "shapes::Shape".into(),
            location: at(5),
        });
        assert_eq!(report.count("override-target-missing"), 1);
        assert_eq!(report.count("unresolved-reference"), 1);
        assert_eq!(report.count("store-contention"), 0);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_unresolved_symbols_sorted_and_unique() {
        let mut report = GraphBuildReport::default();
        report.note_unresolved("std::vector");
        report.note_unresolved("ExternalBase");
        report.note_unresolved("std::vector");
        assert_eq!(report.unresolved_symbols, vec!["ExternalBase", "std::vector"]);
    }

    #[test]
    fn test_issue_serializes_with_type_tag() {
        let issue = BuildIssue::StoreContention {
            name: "ns::f".into(),
            renamed: "ns::f#2".into(),
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["type"], "store-contention");
        assert_eq!(json["renamed"], "ns::f#2");
    }

    #[test]
    fn test_absorb_accumulates() {
        let mut total = GraphBuildReport::default();
        let mut part = GraphBuildReport {
            files: vec![PathBuf::from("a.cpp")],
            merges: 2,
            ..Default::default()
        };
        part.push(BuildIssue::InheritanceCycleDetected {
            derived: "A".into(),
            base: "B".into(),
        });
        total.absorb(part);
        assert_eq!(total.files.len(), 1);
        assert_eq!(total.merges, 2);
        assert_eq!(total.count("inheritance-cycle-detected"), 1);
    }
}

//! Parallel ingestion: one partial graph per translation unit, merged at the end.
//!
//! Entity ids are derived from structural keys, so partial graphs built
//! independently agree on the id of every shared entity (namespaces reopened
//! in several files, a class declared in a header and defined elsewhere).
//! The merged graph is then finished by a single driver that retries the
//! leftovers of every partial build, which yields the same entities and
//! relationships as a sequential build of the same units.

use crate::config::BuildConfig;
use crate::driver::{IngestionDriver, Partial};
use crate::error::{BuildError, Result};
use crate::report::GraphBuildReport;
use codegraph::{CodeGraph, SharedGraph};
use codegraph_parser_api::TranslationUnit;
use log::{debug, info};
use rayon::prelude::*;
use std::time::Instant;

/// Build a graph from `units` on a worker pool.
///
/// The worker count comes from [`BuildConfig::parallel_workers`] (rayon's
/// default when unset).
///
/// # Errors
///
/// [`BuildError::InvalidConfig`] for an invalid configuration,
/// [`BuildError::ThreadPool`] if the pool cannot start, and fatal store
/// errors from any partial build or from the merge.
pub fn ingest_parallel(
    units: &[TranslationUnit],
    config: &BuildConfig,
) -> Result<(CodeGraph, GraphBuildReport)> {
    config.validate()?;
    let started = Instant::now();

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(num_threads) = config.parallel_workers {
        builder = builder.num_threads(num_threads);
    }
    let pool = builder
        .build()
        .map_err(|e| BuildError::ThreadPool(e.to_string()))?;

    info!(
        "Ingesting {} translation units on {} workers",
        units.len(),
        pool.current_num_threads()
    );

    let partials: Vec<Partial> = pool.install(|| {
        units
            .par_iter()
            .map(|unit| build_partial(unit, config))
            .collect::<Result<Vec<_>>>()
    })?;

    let mut report = GraphBuildReport::default();
    let mut graphs = Vec::with_capacity(partials.len());
    let mut leftovers = Vec::with_capacity(partials.len());
    for partial in partials {
        report.absorb(partial.report);
        graphs.push(partial.graph);
        leftovers.push((partial.pending, partial.deferred));
    }

    let shared = SharedGraph::new(CodeGraph::with_limits(config.store_limits()));
    let outcomes = shared.merge_batch(&graphs)?;
    drop(graphs);
    let merged = shared.into_inner()?;
    for outcome in &outcomes {
        report.record_merge(outcome, &merged);
    }
    debug!(
        "Merged {} partial graphs into {} entities",
        outcomes.len(),
        merged.entity_count()
    );

    let mut driver = IngestionDriver::resume(merged, config.clone(), leftovers, report);
    let report = driver.finish(started)?;
    Ok((driver.into_graph(), report))
}

fn build_partial(unit: &TranslationUnit, config: &BuildConfig) -> Result<Partial> {
    let mut driver = IngestionDriver::new(config.clone());
    driver.walk(unit)?;
    driver.settle()?;
    Ok(driver.into_partial())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph::{Access, EdgeKind, SourceLocation};
    use codegraph_parser_api::{BaseSpecifier, DeclKind, Declaration, SignatureTokens};
    use std::collections::BTreeSet;

    fn at(file: &str, line: u32) -> SourceLocation {
        SourceLocation::new(file, line, 1)
    }

    fn area(file: &str, line: u32, qualifiers: &[&str]) -> Declaration {
        let mut tokens = SignatureTokens::new(Vec::<String>::new()).returns("double");
        for q in qualifiers {
            tokens = tokens.qualified(*q);
        }
        Declaration::new(DeclKind::Method, "area", at(file, line)).with_signature(tokens)
    }

    /// Derived class in one unit, its base in another.
    fn units() -> Vec<TranslationUnit> {
        let circle = TranslationUnit::new("circle.hpp").with(
            Declaration::new(DeclKind::Namespace, "shapes", at("circle.hpp", 1)).with_child(
                Declaration::new(DeclKind::Class, "Circle", at("circle.hpp", 2))
                    .with_base(BaseSpecifier::new("Shape").with_access(Access::Public))
                    .with_child(area("circle.hpp", 3, &["const", "override"])),
            ),
        );
        let shape = TranslationUnit::new("shape.hpp").with(
            Declaration::new(DeclKind::Namespace, "shapes", at("shape.hpp", 1)).with_child(
                Declaration::new(DeclKind::Class, "Shape", at("shape.hpp", 2))
                    .with_child(area("shape.hpp", 3, &["const", "virtual", "pure"])),
            ),
        );
        vec![circle, shape]
    }

    fn names(graph: &CodeGraph) -> BTreeSet<String> {
        graph
            .entities()
            .map(|e| format!("{}:{}", e.kind, e.qualified_name))
            .collect()
    }

    fn edges(graph: &CodeGraph) -> BTreeSet<String> {
        graph
            .edges()
            .map(|e| {
                let name = |id| graph.entity(id).map(|x| x.qualified_name.to_string()).unwrap();
                format!("{} -{}-> {}", name(e.source), e.kind, name(e.target))
            })
            .collect()
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let units = units();
        let config = BuildConfig::default().with_workers(2);
        let (parallel, report) = ingest_parallel(&units, &config).unwrap();

        let mut driver = IngestionDriver::new(config);
        let sequential_report = driver.ingest_all(&units).unwrap();
        let sequential = driver.into_graph();

        assert_eq!(names(&parallel), names(&sequential));
        assert_eq!(edges(&parallel), edges(&sequential));
        assert_eq!(report.total_entities, sequential_report.total_entities);
        assert_eq!(report.entities_created, sequential_report.entities_created);
        assert!(report.is_clean(), "{:?}", report.issues);
        assert_eq!(report.files.len(), 2);
    }

    #[test]
    fn test_cross_unit_override_is_linked() {
        let (graph, _) = ingest_parallel(&units(), &BuildConfig::default()).unwrap();
        let circle_area = graph.find_by_name("shapes::Circle::area")[0].id;
        let shape_area = graph.find_by_name("shapes::Shape::area")[0].id;
        let overridden: Vec<_> = graph
            .edges_from(circle_area, Some(EdgeKind::Overrides))
            .unwrap()
            .iter()
            .map(|e| e.target)
            .collect();
        assert_eq!(overridden, vec![shape_area]);
        assert!(graph.entity(graph.find_by_name("shapes::Shape")[0].id).unwrap().is_abstract);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = BuildConfig {
            parallel_workers: Some(0),
            ..Default::default()
        };
        let err = ingest_parallel(&units(), &config).unwrap_err();
        assert!(matches!(err, BuildError::InvalidConfig(_)));
    }

    #[test]
    fn test_empty_input() {
        let (graph, report) = ingest_parallel(&[], &BuildConfig::default()).unwrap();
        assert_eq!(report.entities_created, 0);
        assert_eq!(graph.entity_count(), CodeGraph::new().entity_count());
    }
}

//! Ingestion driver: walks translation units into a [`CodeGraph`].
//!
//! A build runs in three steps:
//!
//! 1. every unit is walked depth-first; declarations are interned and
//!    `contains` edges committed on the spot, relationships whose target is
//!    already known are committed too, the rest are queued as pending edges
//!    together with a snapshot of the scope stack;
//! 2. out-of-line definitions whose qualifier was unknown are placed, then
//!    pending edges are retried in phase order (`inherits`, `overrides`,
//!    uses), so every override lookup sees the complete inheritance graph;
//! 3. whatever is still unresolved is bound to an external placeholder and
//!    reported, and class abstractness is computed.
//!
//! Parallel ingestion runs step 1 (and a local retry) per unit, merges the
//! partial graphs, and finishes steps 2 and 3 on the merged graph; see
//! [`crate::parallel`].

use crate::config::BuildConfig;
use crate::error::Result;
use crate::interner::{self, Prepared};
use crate::relations;
use crate::report::{BuildIssue, GraphBuildReport};
use crate::scope::{
    split_template_args, strip_template_args, Frame, Resolution, ScopeResolver, Using, Want,
};
use codegraph::{
    Access, CodeGraph, EdgeKind, EdgeMetadata, EntityId, EntityKind, GraphError, QualifiedName,
    SourceLocation,
};
use codegraph_parser_api::{BaseSpecifier, DeclKind, Declaration, NameUse, TranslationUnit, UseKind};
use log::{debug, info, trace, warn};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Retry order of pending edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Inherits,
    Overrides,
    Uses,
}

#[derive(Debug, Clone)]
pub(crate) enum PendingTarget {
    Base {
        base: BaseSpecifier,
        order: usize,
        default_access: Access,
    },
    Override {
        explicit: bool,
    },
    Use(NameUse),
}

/// A relationship whose target was not known when its source was visited.
#[derive(Debug, Clone)]
pub(crate) struct PendingEdge {
    source: EntityId,
    target: PendingTarget,
    frames: Vec<Frame>,
    location: SourceLocation,
}

impl PendingEdge {
    fn phase(&self) -> Phase {
        match self.target {
            PendingTarget::Base { .. } => Phase::Inherits,
            PendingTarget::Override { .. } => Phase::Overrides,
            PendingTarget::Use(_) => Phase::Uses,
        }
    }
}

/// An out-of-line definition whose qualifier did not resolve yet.
#[derive(Debug, Clone)]
pub(crate) struct DeferredDeclaration {
    decl: Declaration,
    frames: Vec<Frame>,
}

/// What a per-unit build leaves for the merged graph to finish.
pub(crate) struct Partial {
    pub graph: CodeGraph,
    pub pending: Vec<PendingEdge>,
    pub deferred: Vec<DeferredDeclaration>,
    pub report: GraphBuildReport,
}

/// Builds a graph from translation units.
///
/// ```
/// use codegraph_cpp::{BuildConfig, IngestionDriver};
/// use codegraph_parser_api::{DeclKind, Declaration, TranslationUnit};
/// use codegraph::SourceLocation;
///
/// let unit = TranslationUnit::new("a.hpp").with(Declaration::new(
///     DeclKind::Class,
///     "Widget",
///     SourceLocation::new("a.hpp", 1, 1),
/// ));
/// let mut driver = IngestionDriver::new(BuildConfig::default());
/// let report = driver.ingest(&unit).unwrap();
/// assert_eq!(report.entities_created, 1);
/// assert_eq!(driver.graph().find_by_name("Widget").len(), 1);
/// ```
pub struct IngestionDriver {
    graph: CodeGraph,
    config: BuildConfig,
    scopes: ScopeResolver,
    pending: Vec<PendingEdge>,
    deferred: Vec<DeferredDeclaration>,
    /// Classes with at least one base still pending
    unsettled: HashSet<EntityId>,
    report: GraphBuildReport,
    baseline: (usize, usize),
}

impl IngestionDriver {
    /// Driver over an empty graph sized by `config`'s limits.
    pub fn new(config: BuildConfig) -> Self {
        let graph = CodeGraph::with_limits(config.store_limits());
        Self::with_graph(graph, config)
    }

    /// Driver that adds to an existing graph.
    pub fn with_graph(graph: CodeGraph, config: BuildConfig) -> Self {
        let scopes = ScopeResolver::new(&graph);
        let baseline = (graph.entity_count(), graph.edge_count());
        Self {
            graph,
            config,
            scopes,
            pending: Vec::new(),
            deferred: Vec::new(),
            unsettled: HashSet::new(),
            report: GraphBuildReport::default(),
            baseline,
        }
    }

    /// The graph built so far.
    pub fn graph(&self) -> &CodeGraph {
        &self.graph
    }

    /// Build configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Consume the driver, keeping the graph.
    pub fn into_graph(self) -> CodeGraph {
        self.graph
    }

    /// Ingest one translation unit and finish the build.
    ///
    /// Re-ingesting a unit that is already in the graph adds nothing.
    ///
    /// # Errors
    ///
    /// Only fatal store errors; everything else lands in the report.
    pub fn ingest(&mut self, unit: &TranslationUnit) -> Result<GraphBuildReport> {
        self.ingest_all(std::slice::from_ref(unit))
    }

    /// Ingest several translation units as one build.
    ///
    /// Names may be used before (or in a different unit than) they are
    /// declared; they resolve once every unit has been walked.
    pub fn ingest_all(&mut self, units: &[TranslationUnit]) -> Result<GraphBuildReport> {
        let started = Instant::now();
        self.begin();
        info!("Ingesting {} translation units", units.len());
        for unit in units {
            self.walk(unit)?;
        }
        self.finish(started)
    }

    fn begin(&mut self) {
        self.baseline = (self.graph.entity_count(), self.graph.edge_count());
        self.report = GraphBuildReport::default();
    }

    /// Walk one unit without finishing the build.
    pub(crate) fn walk(&mut self, unit: &TranslationUnit) -> Result<()> {
        debug!(
            "Walking {} ({} declarations)",
            unit.path.display(),
            unit.declaration_count()
        );
        self.report.files.push(unit.path.clone());
        // usings never leak across units
        self.scopes = ScopeResolver::new(&self.graph);
        for decl in &unit.declarations {
            self.visit(decl)?;
        }
        Ok(())
    }

    /// Retry what the graph built so far can resolve; keep the rest.
    pub(crate) fn settle(&mut self) -> Result<()> {
        self.retry(false)
    }

    /// Hand the graph and the leftovers of a per-unit build to the merge step.
    pub(crate) fn into_partial(self) -> Partial {
        Partial {
            graph: self.graph,
            pending: self.pending,
            deferred: self.deferred,
            report: self.report,
        }
    }

    /// Driver over a merged graph that finishes the leftovers of partial builds.
    ///
    /// Created counts are taken against an empty store, since the partial
    /// graphs were built from scratch.
    pub(crate) fn resume(
        graph: CodeGraph,
        config: BuildConfig,
        leftovers: Vec<(Vec<PendingEdge>, Vec<DeferredDeclaration>)>,
        report: GraphBuildReport,
    ) -> Self {
        let empty = CodeGraph::new();
        let mut driver = Self::with_graph(graph, config);
        driver.baseline = (empty.entity_count(), empty.edge_count());
        driver.report = report;
        for (pending, deferred) in leftovers {
            for item in pending {
                if matches!(item.target, PendingTarget::Base { .. }) {
                    driver.unsettled.insert(item.source);
                }
                driver.pending.push(item);
            }
            driver.deferred.extend(deferred);
        }
        driver
    }

    /// Resolve everything left, bind the rest to placeholders, and report.
    pub(crate) fn finish(&mut self, started: Instant) -> Result<GraphBuildReport> {
        self.retry(true)?;
        self.finalize_abstractness()?;

        let mut report = std::mem::take(&mut self.report);
        report.total_entities = self.graph.entity_count();
        report.total_edges = self.graph.edge_count();
        report.entities_created = report.total_entities.saturating_sub(self.baseline.0);
        report.edges_created = report.total_edges.saturating_sub(self.baseline.1);
        report.elapsed = started.elapsed();
        self.baseline = (report.total_entities, report.total_edges);

        info!(
            "Built graph from {} files: {} entities ({} new, {} merges), {} edges ({} new), {} issues in {:?}",
            report.files.len(),
            report.total_entities,
            report.entities_created,
            report.merges,
            report.total_edges,
            report.edges_created,
            report.issues.len(),
            report.elapsed
        );
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Walk
    // ------------------------------------------------------------------

    fn visit(&mut self, decl: &Declaration) -> Result<()> {
        match decl.kind {
            DeclKind::UsingDirective => {
                self.scopes
                    .add_using(Using::Namespace(QualifiedName::parse(&decl.name)));
                return Ok(());
            }
            DeclKind::UsingDeclaration => {
                self.scopes.add_using(Using::Name(QualifiedName::parse(&decl.name)));
                return Ok(());
            }
            _ => {}
        }

        match self.owner_of(decl) {
            Some((owner, member)) => self.place(decl, owner, member),
            None => {
                trace!(
                    "Deferring {} until {} is declared",
                    decl.name,
                    decl.qualifier.join("::")
                );
                self.deferred.push(DeferredDeclaration {
                    decl: decl.clone(),
                    frames: self.scopes.snapshot(),
                });
                Ok(())
            }
        }
    }

    /// The entity a declaration belongs to, and whether that is a class.
    fn owner_of(&self, decl: &Declaration) -> Option<(EntityId, bool)> {
        let owner = if decl.qualifier.is_empty() {
            self.scopes.current_scope()
        } else {
            let qualifier = decl.qualifier.join("::");
            self.scopes
                .resolve_as(&self.graph, &qualifier, Want::Scope)
                .entity()?
        };
        let member = self.graph.entity(owner).is_ok_and(|e| e.kind.is_record());
        Some((owner, member))
    }

    fn place(&mut self, decl: &Declaration, owner: EntityId, member: bool) -> Result<()> {
        let name = self.graph.entity(owner)?.qualified_name.child(decl.name.clone());
        let Some(prepared) = interner::prepare(decl, name, member) else {
            return Ok(());
        };
        let kind = prepared.entity.kind;
        let id = interner::intern(&mut self.graph, prepared, &mut self.report)?;
        self.commit(owner, id, EdgeKind::Contains, EdgeMetadata::None)?;

        let templated = decl.is_template();
        if templated {
            self.scopes.push_template_params(decl.template_params.clone());
        }

        let default_access = if decl.kind == DeclKind::Struct {
            Access::Public
        } else {
            Access::Private
        };
        for (order, base) in decl.bases.iter().enumerate() {
            self.link_base(id, base, order, default_access, &decl.location)?;
        }

        let opens = decl.kind.opens_scope();
        if opens {
            self.scopes.push_scope(id);
        }

        if kind == EntityKind::Method {
            self.link_override(id, decl)?;
        }
        for name_use in &decl.uses {
            self.link_use(id, name_use)?;
        }
        for child in &decl.children {
            self.visit(child)?;
        }

        if opens {
            self.scopes.pop();
        }
        if templated {
            self.scopes.pop();
        }
        Ok(())
    }

    fn link_base(
        &mut self,
        derived: EntityId,
        base: &BaseSpecifier,
        order: usize,
        default_access: Access,
        location: &SourceLocation,
    ) -> Result<()> {
        match self.scopes.resolve_as(&self.graph, &base.name, Want::Type) {
            Resolution::Entity(target) => {
                let metadata = relations::inheritance_metadata(base, order, default_access);
                self.commit(derived, target, EdgeKind::Inherits, metadata)?;
                self.bind_base_template(derived, target, base, location)?;
            }
            Resolution::TemplateParameter => {
                trace!("Dependent base {} left unbound", base.name);
            }
            Resolution::Unresolved => self.defer(
                derived,
                PendingTarget::Base {
                    base: base.clone(),
                    order,
                    default_access,
                },
                location.clone(),
            ),
        }
        Ok(())
    }

    /// `class D : public Base<int>` also uses the template: bind its
    /// instantiation site to whatever the base resolved to, placeholders included.
    fn bind_base_template(
        &mut self,
        derived: EntityId,
        target: EntityId,
        base: &BaseSpecifier,
        location: &SourceLocation,
    ) -> Result<()> {
        let (template, args) = split_template_args(&base.name);
        if args.is_empty() {
            return Ok(());
        }
        let name_use = NameUse::new(template, UseKind::Type, location.clone()).with_template_args(args);
        self.bind_use(derived, target, &name_use)
    }

    fn link_override(&mut self, method: EntityId, decl: &Declaration) -> Result<()> {
        let explicit = decl.signature.as_ref().is_some_and(|s| s.has("override"));
        if !explicit && !self.config.infer_unmarked_overrides {
            return Ok(());
        }
        if let Some(target) = relations::find_override_target(&self.graph, method) {
            self.commit(method, target, EdgeKind::Overrides, EdgeMetadata::None)?;
            return Ok(());
        }
        let class_unsettled = self
            .graph
            .parent_of(method)
            .is_some_and(|class| self.unsettled.contains(&class));
        if explicit || class_unsettled {
            self.defer(method, PendingTarget::Override { explicit }, decl.location.clone());
        }
        Ok(())
    }

    fn link_use(&mut self, user: EntityId, name_use: &NameUse) -> Result<()> {
        // the object's type is unknown, so member calls wait for the graph-wide search
        if name_use.kind == UseKind::MemberCall {
            self.defer(user, PendingTarget::Use(name_use.clone()), name_use.location.clone());
            return Ok(());
        }
        match self.scopes.resolve_as(&self.graph, &name_use.name, want_for(name_use.kind)) {
            Resolution::Entity(target) => self.bind_use(user, target, name_use),
            Resolution::TemplateParameter => Ok(()),
            Resolution::Unresolved => {
                self.defer(user, PendingTarget::Use(name_use.clone()), name_use.location.clone());
                Ok(())
            }
        }
    }

    /// Commit the edge a resolved use implies: an instantiation site for
    /// `Template<args>`, a `references` edge otherwise.
    fn bind_use(&mut self, user: EntityId, target: EntityId, name_use: &NameUse) -> Result<()> {
        let target_entity = self.graph.entity(target)?;
        let instantiates = name_use.kind == UseKind::Type
            && name_use.is_template_use()
            && matches!(target_entity.kind, EntityKind::Template | EntityKind::External);
        if !instantiates {
            self.commit(user, target, EdgeKind::References, EdgeMetadata::None)?;
            return Ok(());
        }

        let template_name = target_entity.name().to_string();
        let scope = relations::lexical_scope(&self.graph, user)?;
        let (site, metadata) = relations::instantiation_site(
            &self.graph,
            scope,
            &template_name,
            &name_use.template_args,
            name_use.location.clone(),
        )?;
        let prepared = Prepared {
            entity: site,
            malformed: None,
        };
        let site = interner::intern(&mut self.graph, prepared, &mut self.report)?;
        self.commit(scope, site, EdgeKind::Contains, EdgeMetadata::None)?;
        self.commit(user, site, EdgeKind::References, EdgeMetadata::None)?;
        self.commit(site, target, EdgeKind::Instantiates, metadata)?;
        Ok(())
    }

    fn defer(&mut self, source: EntityId, target: PendingTarget, location: SourceLocation) {
        if matches!(target, PendingTarget::Base { .. }) {
            self.unsettled.insert(source);
        }
        self.pending.push(PendingEdge {
            source,
            target,
            frames: self.scopes.snapshot(),
            location,
        });
    }

    /// Put an edge, turning rejections into report issues.
    ///
    /// Returns whether the edge is in the graph afterwards.
    fn commit(
        &mut self,
        source: EntityId,
        target: EntityId,
        kind: EdgeKind,
        metadata: EdgeMetadata,
    ) -> Result<bool> {
        let err = match self.graph.put_edge(source, target, kind, metadata) {
            Ok(_) => return Ok(true),
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => err,
        };

        let issue = match err {
            GraphError::InheritanceCycle { derived, base } => BuildIssue::InheritanceCycleDetected {
                derived: self.display(derived),
                base: self.display(base),
            },
            GraphError::ContainmentConflict {
                child, new_parent, ..
            } => BuildIssue::ContainmentConflict {
                child: self.display(child),
                rejected_parent: self.display(new_parent),
            },
            other => {
                warn!("Dropped {kind} edge: {other}");
                return Ok(false);
            }
        };
        warn!("Dropped {kind} edge: {issue:?}");
        self.report.push(issue);
        Ok(false)
    }

    fn display(&self, id: EntityId) -> String {
        self.graph
            .entity(id)
            .map(|e| e.qualified_name.to_string())
            .unwrap_or_else(|_| id.to_string())
    }

    // ------------------------------------------------------------------
    // Retry
    // ------------------------------------------------------------------

    /// Retry deferred declarations, then pending edges by phase.
    ///
    /// With `finalize`, leftovers are bound to external placeholders and
    /// reported; without it they stay queued.
    fn retry(&mut self, finalize: bool) -> Result<()> {
        self.retry_deferred(finalize)?;

        let mut pending = std::mem::take(&mut self.pending);
        pending.sort_by_key(PendingEdge::phase);
        self.unsettled.clear();
        debug!(
            "Retrying {} pending edges (finalize: {finalize})",
            pending.len()
        );

        let mut member_calls: HashMap<String, Vec<EntityId>> = HashMap::new();
        for item in pending {
            self.retry_edge(item, finalize, &mut member_calls)?;
        }
        Ok(())
    }

    fn retry_deferred(&mut self, finalize: bool) -> Result<()> {
        // placing one definition can make another's qualifier resolvable
        loop {
            let deferred = std::mem::take(&mut self.deferred);
            let before = deferred.len();
            if before == 0 {
                return Ok(());
            }
            for DeferredDeclaration { decl, frames } in deferred {
                let walk_scopes =
                    std::mem::replace(&mut self.scopes, ScopeResolver::from_frames(&self.graph, frames));
                let placed = match self.owner_of(&decl) {
                    Some((owner, member)) => self.place(&decl, owner, member),
                    None => {
                        self.deferred.push(DeferredDeclaration {
                            decl,
                            frames: self.scopes.snapshot(),
                        });
                        Ok(())
                    }
                };
                self.scopes = walk_scopes;
                placed?;
            }
            if self.deferred.len() == before {
                break;
            }
        }

        if !finalize {
            return Ok(());
        }
        for DeferredDeclaration { decl, frames } in std::mem::take(&mut self.deferred) {
            let walk_scopes =
                std::mem::replace(&mut self.scopes, ScopeResolver::from_frames(&self.graph, frames));
            let qualifier = decl.qualifier.join("::");
            let from = self.scopes.current_scope();
            let placed = self
                .placeholder(&qualifier, EdgeKind::Contains, from, &decl.location)
                .and_then(|owner| self.place(&decl, owner, false));
            self.scopes = walk_scopes;
            placed?;
        }
        Ok(())
    }

    fn retry_edge(
        &mut self,
        item: PendingEdge,
        finalize: bool,
        member_calls: &mut HashMap<String, Vec<EntityId>>,
    ) -> Result<()> {
        let resolver = ScopeResolver::from_frames(&self.graph, item.frames.clone());
        match &item.target {
            PendingTarget::Base {
                base,
                order,
                default_access,
            } => {
                let metadata = relations::inheritance_metadata(base, *order, *default_access);
                match resolver.resolve_as(&self.graph, &base.name, Want::Type) {
                    Resolution::Entity(target) => {
                        self.commit(item.source, target, EdgeKind::Inherits, metadata)?;
                        self.bind_base_template(item.source, target, base, &item.location)?;
                    }
                    Resolution::TemplateParameter => {}
                    Resolution::Unresolved if finalize => {
                        let display = strip_display(&base.name);
                        let placeholder =
                            self.placeholder(&display, EdgeKind::Inherits, item.source, &item.location)?;
                        self.commit(item.source, placeholder, EdgeKind::Inherits, metadata)?;
                        self.bind_base_template(item.source, placeholder, base, &item.location)?;
                    }
                    Resolution::Unresolved => {
                        self.unsettled.insert(item.source);
                        self.pending.push(item);
                    }
                }
            }
            PendingTarget::Override { explicit } => {
                if let Some(target) = relations::find_override_target(&self.graph, item.source) {
                    self.commit(item.source, target, EdgeKind::Overrides, EdgeMetadata::None)?;
                    return Ok(());
                }
                let class_unsettled = self
                    .graph
                    .parent_of(item.source)
                    .is_some_and(|class| self.unsettled.contains(&class));
                if !finalize && class_unsettled {
                    self.pending.push(item);
                } else if *explicit {
                    let method = self.display(item.source);
                    warn!("{method} is marked override but overrides nothing");
                    self.report.push(BuildIssue::OverrideTargetMissing {
                        method,
                        location: item.location,
                    });
                }
            }
            PendingTarget::Use(name_use) => {
                let resolution = if name_use.kind == UseKind::MemberCall {
                    Resolution::Unresolved
                } else {
                    resolver.resolve_as(&self.graph, &name_use.name, want_for(name_use.kind))
                };
                match resolution {
                    Resolution::Entity(target) => self.bind_use(item.source, target, name_use)?,
                    Resolution::TemplateParameter => {}
                    Resolution::Unresolved if !finalize => self.pending.push(item),
                    Resolution::Unresolved => {
                        self.finalize_use(item.source, name_use, &item.location, member_calls)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn finalize_use(
        &mut self,
        user: EntityId,
        name_use: &NameUse,
        location: &SourceLocation,
        member_calls: &mut HashMap<String, Vec<EntityId>>,
    ) -> Result<()> {
        if name_use.kind == UseKind::MemberCall && self.config.resolve_member_calls {
            let candidates = member_calls
                .entry(name_use.name.clone())
                .or_insert_with(|| relations::methods_named(&self.graph, &name_use.name))
                .clone();
            if let Some(target) = relations::member_call_target(&self.graph, &candidates) {
                self.commit(user, target, EdgeKind::References, EdgeMetadata::None)?;
                return Ok(());
            }
        }

        // a bare unresolved value is most likely a local the front end could not see
        if name_use.kind == UseKind::Value && !name_use.name.contains("::") {
            trace!("Dropping unresolved value '{}'", name_use.name);
            return Ok(());
        }

        let kind = if name_use.kind == UseKind::Type && name_use.is_template_use() {
            EdgeKind::Instantiates
        } else {
            EdgeKind::References
        };
        let display = strip_display(&name_use.name);
        let placeholder = self.placeholder(&display, kind, user, location)?;
        self.bind_use(user, placeholder, name_use)
    }

    /// External placeholder for a name that never resolved, reported once per use.
    fn placeholder(
        &mut self,
        display: &str,
        kind: EdgeKind,
        from: EntityId,
        location: &SourceLocation,
    ) -> Result<EntityId> {
        let id = self.graph.external_placeholder(display)?;
        let from = self.display(from);
        warn!("Unresolved {kind} target '{display}' used by {from} at {location}");
        self.report.note_unresolved(display);
        self.report.push(BuildIssue::UnresolvedReference {
            name: display.to_string(),
            kind,
            from,
            location: location.clone(),
        });
        Ok(id)
    }

    fn finalize_abstractness(&mut self) -> Result<()> {
        let records = self
            .graph
            .query()
            .kinds(&[EntityKind::Class, EntityKind::Struct, EntityKind::Template])
            .execute();
        for class in records {
            let is_abstract = relations::is_abstract(&self.graph, class);
            self.graph.mark_abstract(class, is_abstract)?;
        }
        Ok(())
    }
}

fn want_for(kind: UseKind) -> Want {
    match kind {
        UseKind::Type => Want::Type,
        UseKind::Call | UseKind::MemberCall => Want::Callable,
        UseKind::Value => Want::Any,
    }
}

/// Name with template arguments stripped from every segment.
fn strip_display(name: &str) -> String {
    QualifiedName::parse(name)
        .segments()
        .iter()
        .map(|s| strip_template_args(s))
        .collect::<Vec<_>>()
        .join("::")
}

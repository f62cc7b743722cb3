//! Scope tracking and name resolution.
//!
//! The resolver keeps the stack of scopes active during a depth-first walk of
//! the declaration tree. Member tables are not duplicated here: the members of
//! a scope are read from the store through the qualified-name index, so a
//! snapshot of the stack (a plain `Vec<Frame>` of entity ids) resolves the
//! same way against any graph holding those entities. Pending edges rely on
//! that when they are retried after other files were merged in.

use codegraph::{CodeGraph, EntityId, EntityKind, QualifiedName, EXTERNAL_ROOT};
use log::trace;

/// A `using` import active in a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Using {
    /// `using namespace N;`
    Namespace(QualifiedName),
    /// `using N::name;`
    Name(QualifiedName),
}

/// What a stack frame contributes to lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    /// Members of an entity (namespace, class, enum, function)
    Scope(EntityId),
    /// Template parameter names; they never become entities
    TemplateParameters(Vec<String>),
}

/// One entry of the scope stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Lookup layer
    pub layer: Layer,
    /// Imports declared while this frame was innermost
    pub usings: Vec<Using>,
}

impl Frame {
    fn new(layer: Layer) -> Self {
        Self {
            layer,
            usings: Vec::new(),
        }
    }
}

/// Result of resolving a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The name denotes this entity (first candidate in creation order)
    Entity(EntityId),
    /// The name is a template parameter of an enclosing template
    TemplateParameter,
    /// Nothing visible has that name
    Unresolved,
}

impl Resolution {
    /// The resolved entity, if any.
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Resolution::Entity(id) => Some(*id),
            _ => None,
        }
    }
}

/// Which entities a lookup may stop at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Want {
    /// Anything
    Any,
    /// Types: classes, structs, templates, enums
    Type,
    /// Functions, methods, and classes (constructor calls)
    Callable,
    /// Anything members can be declared in: namespaces, classes, enums
    Scope,
}

impl Want {
    fn accepts(self, kind: EntityKind) -> bool {
        match self {
            Want::Any => true,
            Want::Type => kind.is_record() || kind.is_enum(),
            Want::Callable => kind.is_callable() || kind.is_record(),
            Want::Scope => opens_scope(kind),
        }
    }
}

enum Lookup {
    Entities(Vec<EntityId>),
    TemplateParameter,
    Nothing,
}

/// Stack of active scopes.
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    global: EntityId,
    frames: Vec<Frame>,
}

impl ScopeResolver {
    /// A stack holding only the global namespace of `graph`.
    pub fn new(graph: &CodeGraph) -> Self {
        let global = graph.global_namespace();
        Self {
            global,
            frames: vec![Frame::new(Layer::Scope(global))],
        }
    }

    /// Rebuild a stack from a snapshot taken with [`Self::snapshot`].
    pub fn from_frames(graph: &CodeGraph, frames: Vec<Frame>) -> Self {
        Self {
            global: graph.global_namespace(),
            frames,
        }
    }

    /// The stack as seen from inside `scope`, rebuilt from `contains` parents.
    ///
    /// Template parameter layers are restored for templates on the chain;
    /// `using` imports are not (they are not stored in the graph).
    pub fn chain_of(graph: &CodeGraph, scope: EntityId) -> Self {
        let mut chain = vec![scope];
        let mut cursor = graph.parent_of(scope);
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = graph.parent_of(parent);
        }

        let mut resolver = Self {
            global: graph.global_namespace(),
            frames: Vec::new(),
        };
        for id in chain.into_iter().rev() {
            if let Ok(entity) = graph.entity(id) {
                if !entity.template_params.is_empty() {
                    resolver.push_template_params(entity.template_params.clone());
                }
            }
            resolver.push_scope(id);
        }
        resolver
    }

    /// Enter the scope of an entity.
    pub fn push_scope(&mut self, id: EntityId) {
        self.frames.push(Frame::new(Layer::Scope(id)));
    }

    /// Enter a template parameter layer.
    pub fn push_template_params(&mut self, params: Vec<String>) {
        self.frames.push(Frame::new(Layer::TemplateParameters(params)));
    }

    /// Leave the innermost frame. The global frame is never popped.
    pub fn pop(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// Record a `using` import in the innermost frame.
    pub fn add_using(&mut self, using: Using) {
        if let Some(frame) = self.frames.last_mut() {
            frame.usings.push(using);
        }
    }

    /// The innermost entity scope.
    pub fn current_scope(&self) -> EntityId {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| match frame.layer {
                Layer::Scope(id) => Some(id),
                Layer::TemplateParameters(_) => None,
            })
            .unwrap_or(self.global)
    }

    /// Number of frames, the global frame included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Copy of the current stack.
    pub fn snapshot(&self) -> Vec<Frame> {
        self.frames.clone()
    }

    /// Resolve a possibly qualified name.
    pub fn resolve(&self, graph: &CodeGraph, name: &str) -> Resolution {
        self.resolve_as(graph, name, Want::Any)
    }

    /// Resolve a name, considering only entities `want` accepts for the last segment.
    pub fn resolve_as(&self, graph: &CodeGraph, name: &str, want: Want) -> Resolution {
        let resolution = match self.lookup(graph, name, want) {
            Lookup::Entities(found) => found
                .first()
                .map_or(Resolution::Unresolved, |id| Resolution::Entity(*id)),
            Lookup::TemplateParameter => Resolution::TemplateParameter,
            Lookup::Nothing => Resolution::Unresolved,
        };
        trace!("resolve '{name}' -> {resolution:?}");
        resolution
    }

    fn lookup(&self, graph: &CodeGraph, name: &str, want: Want) -> Lookup {
        let from_global = name.trim_start().starts_with("::");
        let segments: Vec<String> = QualifiedName::parse(name)
            .segments()
            .iter()
            .map(|s| strip_template_args(s).to_string())
            .collect();
        let Some((first, rest)) = segments.split_first() else {
            return Lookup::Nothing;
        };
        let first_want = if rest.is_empty() { want } else { Want::Any };

        let start = if from_global {
            filtered(graph, member_lookup(graph, self.global, first), first_want)
        } else {
            match self.unqualified(graph, first, first_want) {
                Lookup::Entities(found) => found,
                other => return other,
            }
        };

        match walk_path(graph, start, rest, want) {
            found if found.is_empty() => Lookup::Nothing,
            found => Lookup::Entities(found),
        }
    }

    fn unqualified(&self, graph: &CodeGraph, name: &str, want: Want) -> Lookup {
        for frame in self.frames.iter().rev() {
            match &frame.layer {
                Layer::TemplateParameters(params) => {
                    if params.iter().any(|p| p == name) {
                        return Lookup::TemplateParameter;
                    }
                }
                Layer::Scope(id) => {
                    let found = filtered(graph, member_lookup(graph, *id, name), want);
                    if !found.is_empty() {
                        return Lookup::Entities(found);
                    }
                }
            }
        }

        for depth in (0..self.frames.len()).rev() {
            for using in &self.frames[depth].usings {
                let found = match using {
                    Using::Name(target) if target.name() == name => {
                        self.using_target(graph, depth, target)
                    }
                    Using::Name(_) => continue,
                    Using::Namespace(ns) => self
                        .using_target(graph, depth, ns)
                        .into_iter()
                        .filter(|id| {
                            graph
                                .entity(*id)
                                .is_ok_and(|e| e.kind == EntityKind::Namespace)
                        })
                        .flat_map(|ns_id| member_lookup(graph, ns_id, name))
                        .collect(),
                };
                let found = filtered(graph, found, want);
                if !found.is_empty() {
                    return Lookup::Entities(found);
                }
            }
        }

        Lookup::Nothing
    }

    /// Resolve the operand of a `using` declared at `depth`, ignoring imports.
    fn using_target(&self, graph: &CodeGraph, depth: usize, target: &QualifiedName) -> Vec<EntityId> {
        let Some((first, rest)) = target.segments().split_first() else {
            return Vec::new();
        };
        for frame in self.frames[..=depth].iter().rev() {
            if let Layer::Scope(id) = frame.layer {
                let start = member_lookup(graph, id, first);
                if !start.is_empty() {
                    return walk_path(graph, start, rest, Want::Any);
                }
            }
        }
        Vec::new()
    }
}

/// Resolve `name` as if written inside `scope`.
pub fn resolve_in(graph: &CodeGraph, scope: EntityId, name: &str) -> Resolution {
    ScopeResolver::chain_of(graph, scope).resolve(graph, name)
}

/// Resolve a full qualified name from the global namespace, segment by
/// segment through direct members. Returns every entity with that exact path.
pub fn resolve_qualified(graph: &CodeGraph, name: &QualifiedName) -> Vec<EntityId> {
    // Placeholders hang flat under the external root, whatever their spelling.
    if name.segments().first().is_some_and(|first| first == EXTERNAL_ROOT) {
        let external = graph.external_root();
        return graph
            .entities_named(name)
            .into_iter()
            .filter(|e| graph.parent_of(e.id) == Some(external))
            .map(|e| e.id)
            .collect();
    }
    let mut candidates = vec![graph.global_namespace()];
    for segment in name.segments() {
        let Some(scope) = candidates.first().copied() else {
            return Vec::new();
        };
        candidates = match graph.entity(scope) {
            Ok(entity) => direct_members(graph, scope, &entity.qualified_name, segment),
            Err(_) => Vec::new(),
        };
    }
    candidates
}

/// Members of `scope` named `name`.
///
/// Includes enumerators of unscoped enums declared directly in `scope`; for
/// classes, falls back to the nearest base declaring the name.
pub fn member_lookup(graph: &CodeGraph, scope: EntityId, name: &str) -> Vec<EntityId> {
    let Ok(entity) = graph.entity(scope) else {
        return Vec::new();
    };
    let mut found = direct_members(graph, scope, &entity.qualified_name, name);
    if found.is_empty() {
        found = leaked_enumerators(graph, scope, name);
    }
    if found.is_empty() && entity.kind.is_record() {
        for base in graph.ancestors(scope).unwrap_or_default() {
            let Ok(base_entity) = graph.entity(base) else {
                continue;
            };
            found = direct_members(graph, base, &base_entity.qualified_name, name);
            if found.is_empty() {
                found = leaked_enumerators(graph, base, name);
            }
            if !found.is_empty() {
                break;
            }
        }
    }
    found
}

/// Strip template arguments from one name segment (`vector<int>` → `vector`).
pub fn strip_template_args(segment: &str) -> &str {
    match segment.find('<') {
        Some(pos) => segment[..pos].trim_end(),
        None => segment,
    }
}

fn direct_members(
    graph: &CodeGraph,
    scope: EntityId,
    scope_name: &QualifiedName,
    name: &str,
) -> Vec<EntityId> {
    graph
        .entities_named(&scope_name.child(name))
        .into_iter()
        .filter(|e| graph.parent_of(e.id) == Some(scope))
        .map(|e| e.id)
        .collect()
}

fn leaked_enumerators(graph: &CodeGraph, scope: EntityId, name: &str) -> Vec<EntityId> {
    let Ok(children) = graph.children_of(scope) else {
        return Vec::new();
    };
    children
        .into_iter()
        .filter_map(|child| graph.entity(child).ok())
        .filter(|child| child.kind == EntityKind::Enum)
        .flat_map(|unscoped| direct_members(graph, unscoped.id, &unscoped.qualified_name, name))
        .collect()
}

fn walk_path(graph: &CodeGraph, start: Vec<EntityId>, rest: &[String], want: Want) -> Vec<EntityId> {
    let mut candidates = start;
    for (i, segment) in rest.iter().enumerate() {
        let Some(scope) = candidates
            .iter()
            .copied()
            .find(|id| graph.entity(*id).is_ok_and(|e| opens_scope(e.kind)))
        else {
            return Vec::new();
        };
        candidates = member_lookup(graph, scope, segment);
        if i + 1 == rest.len() {
            candidates = filtered(graph, candidates, want);
        }
        if candidates.is_empty() {
            return Vec::new();
        }
    }
    candidates
}

fn filtered(graph: &CodeGraph, ids: Vec<EntityId>, want: Want) -> Vec<EntityId> {
    if want == Want::Any {
        return ids;
    }
    ids.into_iter()
        .filter(|id| graph.entity(*id).is_ok_and(|e| want.accepts(e.kind)))
        .collect()
}

fn opens_scope(kind: EntityKind) -> bool {
    kind == EntityKind::Namespace || kind.is_record() || kind.is_enum()
}

/// Split `Name<A, B<C>>` into `Name` and its top-level arguments.
pub fn split_template_args(name: &str) -> (String, Vec<String>) {
    let (Some(open), Some(close)) = (name.find('<'), name.rfind('>')) else {
        return (name.trim().to_string(), Vec::new());
    };
    if close < open {
        return (name.trim().to_string(), Vec::new());
    }
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;
    for (i, c) in name[..close].char_indices().skip_while(|(i, _)| *i <= open) {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(name[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = name[start..close].trim();
    if !last.is_empty() {
        args.push(last.to_string());
    }
    (name[..open].trim().to_string(), args)
}

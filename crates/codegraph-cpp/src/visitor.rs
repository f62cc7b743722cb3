//! AST visitor that turns a C++ syntax tree into a declaration stream

use crate::scope::split_template_args;
use codegraph::{Access, QualifiedName, SourceLocation};
use codegraph_parser_api::{
    BaseSpecifier, DeclKind, Declaration, NameUse, SignatureTokens, UseKind,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// Where a declaration appears; decides method vs function and field vs variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Namespace,
    Class,
}

pub struct CppVisitor<'a> {
    pub source: &'a [u8],
    pub declarations: Vec<Declaration>,
    path: PathBuf,
    include_docs: bool,
    extract_uses: bool,
}

impl<'a> CppVisitor<'a> {
    pub fn new(source: &'a [u8], path: &Path) -> Self {
        Self {
            source,
            declarations: Vec::new(),
            path: path.to_path_buf(),
            include_docs: true,
            extract_uses: true,
        }
    }

    pub fn with_docs(mut self, include: bool) -> Self {
        self.include_docs = include;
        self
    }

    pub fn with_uses(mut self, extract: bool) -> Self {
        self.extract_uses = extract;
        self
    }

    fn node_text(&self, node: Node) -> String {
        node.utf8_text(self.source).unwrap_or("").to_string()
    }

    fn first_line(&self, node: Node) -> String {
        self.node_text(node)
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .to_string()
    }

    fn location(&self, node: Node) -> SourceLocation {
        let pos = node.start_position();
        SourceLocation::new(
            self.path.clone(),
            u32::try_from(pos.row + 1).unwrap_or(u32::MAX),
            u32::try_from(pos.column + 1).unwrap_or(u32::MAX),
        )
    }

    pub fn visit_node(&mut self, node: Node) {
        let mut declarations = Vec::new();
        self.visit_items(node, Context::Namespace, None, &mut declarations);
        self.declarations.extend(declarations);
    }

    fn visit_items(
        &self,
        parent: Node,
        context: Context,
        default_access: Option<Access>,
        out: &mut Vec<Declaration>,
    ) {
        let mut access = default_access;
        let mut cursor = parent.walk();
        for child in parent.children(&mut cursor) {
            if child.kind() == "access_specifier" {
                let text = self.node_text(child);
                access = Access::parse(text.trim_end_matches(':')).or(access);
                continue;
            }
            self.visit_item(child, context, access, Vec::new(), out);
        }
    }

    fn visit_item(
        &self,
        node: Node,
        context: Context,
        access: Option<Access>,
        template_params: Vec<String>,
        out: &mut Vec<Declaration>,
    ) {
        match node.kind() {
            "namespace_definition" => self.visit_namespace(node, out),
            "class_specifier" | "struct_specifier" | "union_specifier" => {
                out.extend(self.visit_class(node, access, template_params));
            }
            "enum_specifier" => self.visit_enum(node, access, out),
            "function_definition" => {
                out.push(self.visit_function(node, context, access, template_params));
            }
            "declaration" | "field_declaration" => {
                self.visit_declaration(node, context, access, template_params, out);
            }
            "template_declaration" => {
                self.visit_template(node, context, access, template_params, out);
            }
            "using_declaration" => out.extend(self.visit_using(node)),
            "linkage_specification" => {
                if let Some(body) = node.child_by_field_name("body") {
                    if body.kind() == "declaration_list" {
                        self.visit_items(body, context, access, out);
                    } else {
                        self.visit_item(body, context, access, template_params, out);
                    }
                }
            }
            // conditional blocks are walked as if every branch were taken;
            // error nodes are walked to recover what they still contain
            "preproc_ifdef" | "preproc_if" | "preproc_else" | "preproc_elif" | "declaration_list"
            | "ERROR" => self.visit_items(node, context, access, out),
            _ => {}
        }
    }

    fn visit_namespace(&self, node: Node, out: &mut Vec<Declaration>) {
        let mut members = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_items(body, Context::Namespace, None, &mut members);
        }

        // anonymous namespace members belong to the enclosing scope
        let Some(name_node) = node.child_by_field_name("name") else {
            out.extend(members);
            return;
        };

        let name = self.node_text(name_node);
        let segments: Vec<&str> = name
            .split("::")
            .map(|s| s.trim().trim_start_matches("inline").trim())
            .filter(|s| !s.is_empty())
            .collect();

        let mut namespace: Option<Declaration> = None;
        for segment in segments.iter().rev() {
            let decl = Declaration::new(DeclKind::Namespace, *segment, self.location(node)).definition();
            namespace = Some(match namespace.take() {
                Some(inner) => decl.with_child(inner),
                None => decl.with_children(std::mem::take(&mut members)),
            });
        }

        match namespace {
            Some(mut decl) => {
                if let Some(doc) = self.extract_doc_comment(node) {
                    decl = decl.with_doc(doc);
                }
                out.push(decl);
            }
            None => out.extend(members),
        }
    }

    fn visit_class(
        &self,
        node: Node,
        access: Option<Access>,
        template_params: Vec<String>,
    ) -> Option<Declaration> {
        // anonymous classes only exist through the variables they declare
        let name_node = node.child_by_field_name("name")?;
        let kind = if node.kind() == "class_specifier" {
            DeclKind::Class
        } else {
            DeclKind::Struct
        };
        let (qualifier, name) = self.split_name(name_node);

        let mut decl = Declaration::new(kind, name, self.location(node))
            .with_qualifier(qualifier)
            .with_template_params(template_params);
        if let Some(access) = access {
            decl = decl.with_access(access);
        }
        if let Some(doc) = self.extract_doc_comment(node) {
            decl = decl.with_doc(doc);
        }
        for base in self.extract_base_classes(node) {
            decl = decl.with_base(base);
        }

        if let Some(body) = node.child_by_field_name("body") {
            let default_access = if kind == DeclKind::Class {
                Access::Private
            } else {
                Access::Public
            };
            let mut members = Vec::new();
            self.visit_items(body, Context::Class, Some(default_access), &mut members);
            decl = decl.with_children(members).definition();
        }
        Some(decl)
    }

    fn visit_enum(&self, node: Node, access: Option<Access>, out: &mut Vec<Declaration>) {
        let scoped = self.is_enum_class(node);

        let mut enumerators = Vec::new();
        let body = node.child_by_field_name("body");
        if let Some(body) = body {
            let mut cursor = body.walk();
            for child in body.named_children(&mut cursor) {
                if child.kind() != "enumerator" {
                    continue;
                }
                if let Some(name) = child.child_by_field_name("name") {
                    enumerators.push(
                        Declaration::new(DeclKind::Enumerator, self.node_text(name), self.location(child))
                            .definition(),
                    );
                }
            }
        }

        let Some(name_node) = node.child_by_field_name("name") else {
            // enumerators of an anonymous enum are members of the enclosing scope
            if !scoped {
                out.extend(enumerators);
            }
            return;
        };

        let (qualifier, name) = self.split_name(name_node);
        let kind = if scoped {
            DeclKind::EnumClass
        } else {
            DeclKind::Enum
        };
        let mut decl = Declaration::new(kind, name, self.location(node))
            .with_qualifier(qualifier)
            .with_children(enumerators);
        if body.is_some() {
            decl = decl.definition();
        }
        if let Some(access) = access {
            decl = decl.with_access(access);
        }
        if let Some(doc) = self.extract_doc_comment(node) {
            decl = decl.with_doc(doc);
        }
        out.push(decl);
    }

    fn visit_function(
        &self,
        node: Node,
        context: Context,
        access: Option<Access>,
        template_params: Vec<String>,
    ) -> Declaration {
        let declarator = node.child_by_field_name("declarator");
        let function = declarator.and_then(|d| self.find_function_declarator(d));
        let (Some(declarator), Some(function)) = (declarator, function) else {
            return self.unknown(node, declarator);
        };

        let (decl, parameter_names) =
            self.visit_callable(node, declarator, function, context, access, template_params);
        let mut decl = decl.definition();

        if self.extract_uses {
            let mut locals: HashSet<String> = parameter_names.into_iter().collect();
            let mut uses = Vec::new();
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if matches!(
                    child.kind(),
                    "field_initializer_list" | "compound_statement" | "try_statement"
                ) {
                    self.collect_uses(child, &mut locals, &mut uses);
                }
            }
            for name_use in uses {
                decl = decl.with_use(name_use);
            }
        }
        decl
    }

    /// A function or method declaration; also returns the parameter names.
    fn visit_callable(
        &self,
        node: Node,
        declarator: Node,
        function: Node,
        context: Context,
        access: Option<Access>,
        template_params: Vec<String>,
    ) -> (Declaration, Vec<String>) {
        let (qualifier, name) = match function.child_by_field_name("declarator") {
            Some(name_node) => self.split_name(name_node),
            None => (Vec::new(), String::new()),
        };
        let kind = if context == Context::Class && qualifier.is_empty() {
            DeclKind::Method
        } else {
            DeclKind::Function
        };

        let (parameters, parameter_names) = self.extract_parameters(function);
        let mut signature = SignatureTokens::new(parameters).with_raw(self.first_line(node));
        if let Some(return_type) = self.extract_return_type(node, declarator, function) {
            signature = signature.returns(return_type);
        }
        for keyword in self.extract_qualifiers(node, function) {
            signature = signature.qualified(keyword);
        }

        let mut decl = Declaration::new(kind, name, self.location(node))
            .with_qualifier(qualifier)
            .with_signature(signature)
            .with_template_params(template_params);
        if context == Context::Class {
            if let Some(access) = access {
                decl = decl.with_access(access);
            }
        }
        if let Some(doc) = self.extract_doc_comment(node) {
            decl = decl.with_doc(doc);
        }
        (decl, parameter_names)
    }

    fn visit_declaration(
        &self,
        node: Node,
        context: Context,
        access: Option<Access>,
        template_params: Vec<String>,
        out: &mut Vec<Declaration>,
    ) {
        let mut cursor = node.walk();
        let declarators: Vec<Node> = node.children_by_field_name("declarator", &mut cursor).collect();
        let type_node = node.child_by_field_name("type");

        // `class C { ... } c;` declares the class too; `class C;` is a forward declaration
        if let Some(ty) = type_node {
            let declares_type = ty.child_by_field_name("body").is_some() || declarators.is_empty();
            match ty.kind() {
                "class_specifier" | "struct_specifier" | "union_specifier" if declares_type => {
                    out.extend(self.visit_class(ty, access, template_params.clone()));
                }
                "enum_specifier" if declares_type => self.visit_enum(ty, access, out),
                _ => {}
            }
        }

        for declarator in declarators {
            if let Some(function) = self.find_function_declarator(declarator) {
                let (decl, _) = self.visit_callable(
                    node,
                    declarator,
                    function,
                    context,
                    access,
                    template_params.clone(),
                );
                out.push(decl);
            } else {
                out.extend(self.visit_variable(node, type_node, declarator, context, access));
            }
        }
    }

    fn visit_variable(
        &self,
        node: Node,
        type_node: Option<Node>,
        declarator: Node,
        context: Context,
        access: Option<Access>,
    ) -> Option<Declaration> {
        let name_node = self.find_identifier(declarator)?;
        let (qualifier, name) = self.split_name(name_node);
        let kind = if context == Context::Class && qualifier.is_empty() {
            DeclKind::Field
        } else {
            DeclKind::Variable
        };

        let mut decl = Declaration::new(kind, name, self.location(declarator))
            .with_qualifier(qualifier)
            .with_raw_text(self.first_line(node));
        if !self.has_storage_class(node, "extern") {
            decl = decl.definition();
        }
        if let Some(ty) = type_node {
            decl = decl.with_type(self.declared_type(node, ty, declarator, name_node));
            if self.extract_uses {
                let mut uses = Vec::new();
                self.collect_uses(ty, &mut HashSet::new(), &mut uses);
                for name_use in uses {
                    decl = decl.with_use(name_use);
                }
            }
        }
        if context == Context::Class {
            if let Some(access) = access {
                decl = decl.with_access(access);
            }
        }
        if let Some(doc) = self.extract_doc_comment(node) {
            decl = decl.with_doc(doc);
        }
        Some(decl)
    }

    fn visit_template(
        &self,
        node: Node,
        context: Context,
        access: Option<Access>,
        outer_params: Vec<String>,
        out: &mut Vec<Declaration>,
    ) {
        let mut params = outer_params;
        params.extend(self.extract_template_params(node));

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "template_parameter_list" {
                self.visit_item(child, context, access, params.clone(), out);
            }
        }
    }

    fn visit_using(&self, node: Node) -> Option<Declaration> {
        let mut is_directive = false;
        let mut target = None;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "namespace" => is_directive = true,
                "identifier" | "qualified_identifier" | "namespace_identifier" | "type_identifier" => {
                    target = Some(self.node_text(child));
                }
                _ => {}
            }
        }
        let kind = if is_directive {
            DeclKind::UsingDirective
        } else {
            DeclKind::UsingDeclaration
        };
        Some(Declaration::new(kind, target?, self.location(node)))
    }

    /// A declaration the visitor recognized but could not decode.
    fn unknown(&self, node: Node, declarator: Option<Node>) -> Declaration {
        let name = declarator
            .map(|d| self.first_line(d))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("<unknown:{}>", node.start_position().row + 1));
        Declaration::new(DeclKind::Unknown, name, self.location(node))
            .with_raw_text(self.first_line(node))
    }

    // Uses

    fn collect_uses(&self, node: Node, locals: &mut HashSet<String>, uses: &mut Vec<NameUse>) {
        match node.kind() {
            "call_expression" => {
                if let Some(function) = node.child_by_field_name("function") {
                    self.visit_call_expression(function, locals, uses);
                }
                if let Some(arguments) = node.child_by_field_name("arguments") {
                    self.collect_uses(arguments, locals, uses);
                }
            }
            "field_expression" => {
                if let Some(object) = node.child_by_field_name("argument") {
                    self.collect_uses(object, locals, uses);
                }
            }
            "template_type" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let use_ = NameUse::new(self.node_text(name), UseKind::Type, self.location(node))
                        .with_template_args(self.template_arguments(node));
                    push_use(uses, use_);
                }
                self.collect_argument_uses(node, locals, uses);
            }
            "qualified_identifier" => {
                let (name, args) = split_template_args(&self.node_text(node));
                let kind = match self.innermost_name(node).map(|n| n.kind()) {
                    Some("type_identifier" | "template_type") => UseKind::Type,
                    _ => UseKind::Value,
                };
                push_use(
                    uses,
                    NameUse::new(name, kind, self.location(node)).with_template_args(args),
                );
                self.collect_argument_uses(node, locals, uses);
            }
            "type_identifier" => {
                push_use(
                    uses,
                    NameUse::new(self.node_text(node), UseKind::Type, self.location(node)),
                );
            }
            "identifier" => {
                let name = self.node_text(node);
                if !locals.contains(&name) {
                    push_use(uses, NameUse::new(name, UseKind::Value, self.location(node)));
                }
            }
            "declaration" | "for_range_loop" | "parameter_declaration"
            | "optional_parameter_declaration" => {
                let mut cursor = node.walk();
                for declarator in node.children_by_field_name("declarator", &mut cursor) {
                    if let Some(name) = self.find_identifier(declarator) {
                        locals.insert(self.node_text(name));
                    }
                }
                self.collect_children_uses(node, locals, uses);
            }
            "string_literal" | "raw_string_literal" | "char_literal" | "number_literal"
            | "comment" | "field_identifier" | "namespace_identifier" | "primitive_type"
            | "this" | "true" | "false" | "null" | "nullptr" | "auto"
            | "placeholder_type_specifier" => {}
            _ => self.collect_children_uses(node, locals, uses),
        }
    }

    fn collect_children_uses(&self, node: Node, locals: &mut HashSet<String>, uses: &mut Vec<NameUse>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.collect_uses(child, locals, uses);
        }
    }

    fn visit_call_expression(&self, function: Node, locals: &mut HashSet<String>, uses: &mut Vec<NameUse>) {
        let location = self.location(function);
        match function.kind() {
            "identifier" => {
                let name = self.node_text(function);
                // calling a local (a lambda, a function pointer) uses nothing outside
                if !locals.contains(&name) {
                    push_use(uses, NameUse::new(name, UseKind::Call, location));
                }
            }
            "qualified_identifier" | "template_function" => {
                let (name, args) = split_template_args(&self.node_text(function));
                push_use(
                    uses,
                    NameUse::new(name, UseKind::Call, location).with_template_args(args),
                );
                self.collect_argument_uses(function, locals, uses);
            }
            "field_expression" => {
                if let Some(field) = function.child_by_field_name("field") {
                    let (name, _) = split_template_args(&self.node_text(field));
                    push_use(uses, NameUse::new(name, UseKind::MemberCall, location));
                }
                if let Some(object) = function.child_by_field_name("argument") {
                    self.collect_uses(object, locals, uses);
                }
            }
            _ => self.collect_uses(function, locals, uses),
        }
    }

    /// Uses inside the template argument lists of a name.
    fn collect_argument_uses(&self, node: Node, locals: &mut HashSet<String>, uses: &mut Vec<NameUse>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "template_argument_list" {
                self.collect_children_uses(child, locals, uses);
            } else {
                self.collect_argument_uses(child, locals, uses);
            }
        }
    }

    fn template_arguments(&self, node: Node) -> Vec<String> {
        let Some(arguments) = node.child_by_field_name("arguments") else {
            return Vec::new();
        };
        let mut cursor = arguments.walk();
        let args = arguments
            .named_children(&mut cursor)
            .filter(|arg| arg.kind() != "comment")
            .map(|arg| self.node_text(arg))
            .collect();
        args
    }

    fn innermost_name<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        let mut name = node.child_by_field_name("name")?;
        while name.kind() == "qualified_identifier" {
            name = name.child_by_field_name("name")?;
        }
        Some(name)
    }

    // Helper methods

    /// Split a possibly qualified name node into qualifier segments and the name.
    fn split_name(&self, node: Node) -> (Vec<String>, String) {
        let qualified = QualifiedName::parse(self.node_text(node).trim_start_matches("::"));
        let mut segments = qualified.segments().to_vec();
        let name = segments.pop().unwrap_or_default();
        (segments, name)
    }

    fn find_function_declarator<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        match node.kind() {
            "function_declarator" => Some(node),
            "pointer_declarator" | "reference_declarator" | "attributed_declarator"
            | "parenthesized_declarator" => {
                let mut cursor = node.walk();
                let found = node
                    .named_children(&mut cursor)
                    .find_map(|child| self.find_function_declarator(child));
                found
            }
            _ => None,
        }
    }

    /// The name a declarator declares.
    fn find_identifier<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        match node.kind() {
            "identifier" | "field_identifier" | "qualified_identifier" | "destructor_name"
            | "operator_name" => Some(node),
            _ => {
                if let Some(inner) = node.child_by_field_name("declarator") {
                    return self.find_identifier(inner);
                }
                if !matches!(
                    node.kind(),
                    "reference_declarator" | "attributed_declarator" | "parenthesized_declarator"
                ) {
                    return None;
                }
                let mut cursor = node.walk();
                let found = node
                    .named_children(&mut cursor)
                    .find_map(|child| self.find_identifier(child));
                found
            }
        }
    }

    /// Parameter types (names and default values dropped) and parameter names.
    fn extract_parameters(&self, function: Node) -> (Vec<String>, Vec<String>) {
        let mut params = Vec::new();
        let mut names = Vec::new();
        let Some(param_list) = function.child_by_field_name("parameters") else {
            return (params, names);
        };

        let mut cursor = param_list.walk();
        for child in param_list.children(&mut cursor) {
            match child.kind() {
                "parameter_declaration"
                | "optional_parameter_declaration"
                | "variadic_parameter_declaration" => {
                    let name = child
                        .child_by_field_name("declarator")
                        .and_then(|d| self.find_identifier(d));
                    let end = child
                        .child_by_field_name("default_value")
                        .map_or(child.end_byte(), |value| value.start_byte());

                    let mut text = String::new();
                    match name {
                        Some(name) if name.end_byte() <= end => {
                            text.push_str(&self.slice(child.start_byte(), name.start_byte()));
                            text.push_str(&self.slice(name.end_byte(), end));
                            names.push(self.node_text(name));
                        }
                        _ => text.push_str(&self.slice(child.start_byte(), end)),
                    }
                    params.push(text.trim().trim_end_matches('=').trim().to_string());
                }
                "..." => params.push("...".to_string()),
                _ => {}
            }
        }
        (params, names)
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.source
            .get(start..end)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    fn extract_return_type(&self, node: Node, declarator: Node, function: Node) -> Option<String> {
        // constructors, destructors and conversion operators have none
        let type_node = node.child_by_field_name("type")?;
        let mut return_type = self.declared_type(node, type_node, declarator, function);

        let mut cursor = function.walk();
        let trailing = function
            .children(&mut cursor)
            .find(|c| c.kind() == "trailing_return_type");
        if let Some(trailing) = trailing {
            if return_type == "auto" {
                return_type = self
                    .node_text(trailing)
                    .trim_start_matches("->")
                    .trim()
                    .to_string();
            }
        }
        Some(return_type)
    }

    /// Full type of a declarator: cv-qualifiers, the type specifier, and the
    /// pointer and reference layers between `declarator` and `target`.
    fn declared_type(&self, node: Node, type_node: Node, declarator: Node, target: Node) -> String {
        let mut cursor = node.walk();
        let mut ty: Vec<String> = node
            .children(&mut cursor)
            .take_while(|c| c.id() != type_node.id())
            .filter(|c| c.kind() == "type_qualifier")
            .map(|c| self.node_text(c))
            .collect();
        ty.push(self.node_text(type_node));
        let mut ty = ty.join(" ");

        let mut layer = declarator;
        while layer.id() != target.id() {
            match layer.kind() {
                "pointer_declarator" => ty.push('*'),
                "reference_declarator" => {
                    let op = layer.child(0).map(|c| self.node_text(c)).unwrap_or_default();
                    ty.push_str(if op == "&&" { "&&" } else { "&" });
                }
                _ => {}
            }
            let inner = layer.child_by_field_name("declarator").or_else(|| {
                layer
                    .named_child_count()
                    .checked_sub(1)
                    .and_then(|last| layer.named_child(last))
            });
            match inner {
                Some(inner) => layer = inner,
                None => break,
            }
        }
        ty
    }

    fn extract_qualifiers(&self, node: Node, function: Node) -> Vec<String> {
        let mut qualifiers = Vec::new();

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let text = self.node_text(child);
            if text == "virtual" {
                qualifiers.push(text);
            } else if child.kind() == "storage_class_specifier" && text == "static" {
                qualifiers.push(text);
            } else if child.kind() == "pure_virtual_clause" {
                qualifiers.push("pure".to_string());
            }
        }

        let mut cursor = function.walk();
        for child in function.children(&mut cursor) {
            match child.kind() {
                "type_qualifier" | "virtual_specifier" | "ref_qualifier" => {
                    qualifiers.push(self.node_text(child));
                }
                _ => {}
            }
        }

        if node.kind() != "function_definition" && self.is_pure_virtual(node) {
            qualifiers.push("pure".to_string());
        }
        qualifiers
    }

    fn is_pure_virtual(&self, node: Node) -> bool {
        let compact: String = self
            .node_text(node)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        compact.ends_with("=0;")
    }

    fn extract_base_classes(&self, node: Node) -> Vec<BaseSpecifier> {
        let mut bases = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "base_class_clause" {
                self.extract_base_class_items(child, &mut bases);
            }
        }
        bases
    }

    fn extract_base_class_items(&self, node: Node, bases: &mut Vec<BaseSpecifier>) {
        let mut access = None;
        let mut is_virtual = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            // tree-sitter-cpp 0.22 may use type_identifier directly or base_class_specifier
            match child.kind() {
                "base_class_specifier" => self.extract_base_class_items(child, bases),
                "access_specifier" => access = Access::parse(&self.node_text(child)),
                "type_identifier" | "qualified_identifier" | "template_type" => {
                    let mut base = BaseSpecifier::new(self.node_text(child));
                    base.access = access.take();
                    base.is_virtual = std::mem::take(&mut is_virtual);
                    bases.push(base);
                }
                _ if self.node_text(child) == "virtual" => is_virtual = true,
                _ => {}
            }
        }
    }

    fn extract_template_params(&self, node: Node) -> Vec<String> {
        let mut params = Vec::new();

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "template_parameter_list" {
                continue;
            }
            let mut param_cursor = child.walk();
            for param in child.named_children(&mut param_cursor) {
                let name = match param.kind() {
                    "parameter_declaration"
                    | "optional_parameter_declaration"
                    | "variadic_parameter_declaration" => param
                        .child_by_field_name("declarator")
                        .and_then(|d| self.find_identifier(d))
                        .map(|n| self.node_text(n)),
                    _ => self.type_parameter_name(param),
                };
                params.extend(name);
            }
        }

        params
    }

    fn type_parameter_name(&self, param: Node) -> Option<String> {
        if let Some(name) = param.child_by_field_name("name") {
            return Some(self.node_text(name));
        }
        let mut cursor = param.walk();
        let mut name = None;
        for inner in param.named_children(&mut cursor) {
            match inner.kind() {
                "type_identifier" => name = Some(self.node_text(inner)),
                // template template parameter: the name is on the inner declaration
                "type_parameter_declaration" | "variadic_type_parameter_declaration" => {
                    name = self.type_parameter_name(inner);
                }
                _ => {}
            }
        }
        name
    }

    fn is_enum_class(&self, node: Node) -> bool {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "class" || child.kind() == "struct" {
                return true;
            }
        }
        false
    }

    fn has_storage_class(&self, node: Node, storage_class: &str) -> bool {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "storage_class_specifier" && self.node_text(child) == storage_class {
                return true;
            }
        }
        false
    }

    fn extract_doc_comment(&self, node: Node) -> Option<String> {
        if !self.include_docs {
            return None;
        }
        let mut current = node;
        loop {
            if let Some(prev) = current.prev_sibling() {
                if prev.kind() == "comment" {
                    let text = self.node_text(prev);
                    return (text.starts_with("///") || text.starts_with("/**")).then_some(text);
                }
            }
            // the comment sits before the wrapper: `template<...>`, `class C {} c;`
            let parent = current.parent()?;
            if !matches!(
                parent.kind(),
                "template_declaration" | "declaration" | "field_declaration"
            ) {
                return None;
            }
            current = parent;
        }
    }
}

fn push_use(uses: &mut Vec<NameUse>, name_use: NameUse) {
    if name_use.name.is_empty() {
        return;
    }
    let seen = uses.iter().any(|u| {
        u.name == name_use.name && u.kind == name_use.kind && u.template_args == name_use.template_args
    });
    if !seen {
        uses.push(name_use);
    }
}

//! Template compilation.
//!
//! Compilation walks the tree once, reports every malformed node, and records
//! which methods and slots the template references so that component classes
//! can be checked against it without rendering.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use erpmod_core::ValidationErrors;

use crate::error::TemplateError;
use crate::node::{Attr, Binding, Condition, ViewNode};
use crate::render;

/// Scope roots every render frame provides.
pub const SCOPE_ROOTS: [&str; 4] = ["props", "module", "state", "store"];

/// A validated template, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    id: String,
    root: ViewNode,
    methods: BTreeSet<String>,
    emitted: BTreeSet<String>,
    slots: BTreeSet<String>,
}

impl CompiledTemplate {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &ViewNode {
        &self.root
    }

    /// Method names referenced by `On` attributes.
    pub fn methods(&self) -> &BTreeSet<String> {
        &self.methods
    }

    /// Action names referenced by `Emit` attributes.
    pub fn emitted_actions(&self) -> &BTreeSet<String> {
        &self.emitted
    }

    pub fn slots(&self) -> &BTreeSet<String> {
        &self.slots
    }

    /// Render against a JSON scope object.
    pub fn render(&self, scope: &Value) -> String {
        render::render(&self.root, scope)
    }

    /// Substitute slot content and recompile under `id`.
    ///
    /// Slots not named in `content` keep their fallback.
    pub fn fill(
        &self,
        id: impl Into<String>,
        mut content: BTreeMap<String, ViewNode>,
    ) -> Result<CompiledTemplate, TemplateError> {
        if let Some(unknown) = content.keys().find(|name| !self.slots.contains(*name)) {
            return Err(TemplateError::UnknownSlot {
                template: self.id.clone(),
                slot: unknown.clone(),
            });
        }
        let root = substitute(self.root.clone(), &mut content);
        compile(id, root)
    }
}

fn substitute(node: ViewNode, content: &mut BTreeMap<String, ViewNode>) -> ViewNode {
    match node {
        ViewNode::Slot { name, fallback } => match content.remove(&name) {
            Some(filled) => filled,
            None => ViewNode::Slot { name, fallback },
        },
        ViewNode::Element(mut element) => {
            element.children = element
                .children
                .into_iter()
                .map(|child| substitute(child, content))
                .collect();
            ViewNode::Element(element)
        }
        ViewNode::When {
            condition,
            then,
            otherwise,
        } => ViewNode::When {
            condition,
            then: Box::new(substitute(*then, content)),
            otherwise: otherwise.map(|node| Box::new(substitute(*node, content))),
        },
        ViewNode::Each {
            source,
            alias,
            body,
        } => ViewNode::Each {
            source,
            alias,
            body: Box::new(substitute(*body, content)),
        },
        ViewNode::Fragment { children } => ViewNode::Fragment {
            children: children
                .into_iter()
                .map(|child| substitute(child, content))
                .collect(),
        },
        leaf @ (ViewNode::Text { .. } | ViewNode::Bind { .. }) => leaf,
    }
}

/// Validate `root` and produce a [`CompiledTemplate`].
pub fn compile(id: impl Into<String>, root: ViewNode) -> Result<CompiledTemplate, TemplateError> {
    let id = id.into();
    let mut compiler = Compiler::default();
    if id.trim().is_empty() {
        compiler.errors.push("template id must not be empty");
    }
    compiler.visit(&root, &mut Vec::new());

    if !compiler.errors.is_empty() {
        return Err(TemplateError::Invalid {
            id,
            violations: compiler.errors,
        });
    }
    Ok(CompiledTemplate {
        id,
        root,
        methods: compiler.methods,
        emitted: compiler.emitted,
        slots: compiler.slots,
    })
}

#[derive(Default)]
struct Compiler {
    errors: ValidationErrors,
    methods: BTreeSet<String>,
    emitted: BTreeSet<String>,
    slots: BTreeSet<String>,
}

impl Compiler {
    fn visit(&mut self, node: &ViewNode, aliases: &mut Vec<String>) {
        match node {
            ViewNode::Element(element) => {
                if !is_name(&element.tag) {
                    self.errors.push(format!("invalid element tag `{}`", element.tag));
                }
                for attr in &element.attrs {
                    self.visit_attr(attr, aliases);
                }
                for child in &element.children {
                    self.visit(child, aliases);
                }
            }
            ViewNode::Text { .. } => {}
            ViewNode::Bind { path } => self.check_binding(path, aliases),
            ViewNode::When {
                condition,
                then,
                otherwise,
            } => {
                self.check_condition(condition, aliases);
                self.visit(then, aliases);
                if let Some(otherwise) = otherwise {
                    self.visit(otherwise, aliases);
                }
            }
            ViewNode::Each {
                source,
                alias,
                body,
            } => {
                self.check_binding(source, aliases);
                if !is_identifier(alias) {
                    self.errors.push(format!("invalid loop alias `{alias}`"));
                } else if SCOPE_ROOTS.contains(&alias.as_str()) {
                    self.errors.push(format!("loop alias `{alias}` shadows a scope root"));
                }
                aliases.push(alias.clone());
                self.visit(body, aliases);
                aliases.pop();
            }
            ViewNode::Slot { name, fallback } => {
                if !is_name(name) {
                    self.errors.push(format!("invalid slot name `{name}`"));
                } else if !self.slots.insert(name.clone()) {
                    self.errors.push(format!("slot `{name}` is declared more than once"));
                }
                if let Some(fallback) = fallback {
                    self.visit(fallback, aliases);
                }
            }
            ViewNode::Fragment { children } => {
                for child in children {
                    self.visit(child, aliases);
                }
            }
        }
    }

    fn visit_attr(&mut self, attr: &Attr, aliases: &[String]) {
        if !is_name(attr.name()) {
            self.errors.push(format!("invalid attribute name `{}`", attr.name()));
        }
        match attr {
            Attr::Static { .. } => {}
            Attr::Bound { path, .. } => self.check_binding(path, aliases),
            Attr::On { method, .. } => {
                if is_identifier(method) {
                    self.methods.insert(method.clone());
                } else {
                    self.errors.push(format!("invalid method name `{method}`"));
                }
            }
            Attr::Emit { action, .. } => {
                if is_name(action) {
                    self.emitted.insert(action.clone());
                } else {
                    self.errors.push(format!("invalid action name `{action}`"));
                }
            }
        }
    }

    fn check_condition(&mut self, condition: &Condition, aliases: &[String]) {
        self.check_binding(condition.path(), aliases);
    }

    fn check_binding(&mut self, binding: &Binding, aliases: &[String]) {
        let mut segments = binding.segments();
        let root = segments.next().unwrap_or_default();
        if !is_identifier(root) {
            self.errors.push(format!("invalid binding `{binding}`"));
            return;
        }
        if !SCOPE_ROOTS.contains(&root) && !aliases.iter().any(|alias| alias == root) {
            self.errors
                .push(format!("binding `{binding}` refers to unknown root `{root}`"));
        }
        if segments.any(|segment| segment.is_empty() || !segment.chars().all(is_ident_char)) {
            self.errors.push(format!("invalid binding `{binding}`"));
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_') && chars.all(is_ident_char)
}

// Tags, attribute names, events and slots: letters, digits, `-` and `_`.
fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

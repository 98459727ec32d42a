//! Typed view description.
//!
//! Templates are trees of [`ViewNode`]s built in Rust (or deserialized from
//! JSON). They are validated once by [`crate::compile`] and rendered many
//! times against a JSON scope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dotted path into the render scope, e.g. `state.error` or `row.0.name`.
///
/// The first segment names a scope root (`props`, `module`, `state`, `store`)
/// or an enclosing loop alias. Shape is checked at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Binding(String);

impl Binding {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    pub fn root(&self) -> &str {
        self.segments().next().unwrap_or_default()
    }
}

impl core::fmt::Display for Binding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Binding {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Test used by [`ViewNode::When`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum Condition {
    Truthy { path: Binding },
    Falsy { path: Binding },
    Equals { path: Binding, value: Value },
    /// Absent, null, `""`, `[]` or `{}`.
    Empty { path: Binding },
}

impl Condition {
    pub fn truthy(path: impl Into<Binding>) -> Self {
        Self::Truthy { path: path.into() }
    }

    pub fn falsy(path: impl Into<Binding>) -> Self {
        Self::Falsy { path: path.into() }
    }

    pub fn equals(path: impl Into<Binding>, value: Value) -> Self {
        Self::Equals {
            path: path.into(),
            value,
        }
    }

    pub fn empty(path: impl Into<Binding>) -> Self {
        Self::Empty { path: path.into() }
    }

    pub fn path(&self) -> &Binding {
        match self {
            Condition::Truthy { path }
            | Condition::Falsy { path }
            | Condition::Equals { path, .. }
            | Condition::Empty { path } => path,
        }
    }
}

/// Element attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attr {
    Static { name: String, value: String },
    /// Value read from the scope; `null`/`false` omit the attribute.
    Bound { name: String, path: Binding },
    /// Event handled by a method of the component class.
    On { event: String, method: String },
    /// Event forwarded to the host's `on_action` callback; needs no method.
    Emit { event: String, action: String },
}

impl Attr {
    pub fn name(&self) -> &str {
        match self {
            Attr::Static { name, .. } | Attr::Bound { name, .. } => name,
            Attr::On { event, .. } | Attr::Emit { event, .. } => event,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub attrs: Vec<Attr>,
    #[serde(default)]
    pub children: Vec<ViewNode>,
}

/// One node of a view description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ViewNode {
    Element(Element),
    Text {
        value: String,
    },
    Bind {
        path: Binding,
    },
    When {
        condition: Condition,
        then: Box<ViewNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        otherwise: Option<Box<ViewNode>>,
    },
    Each {
        source: Binding,
        alias: String,
        body: Box<ViewNode>,
    },
    Slot {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<Box<ViewNode>>,
    },
    Fragment {
        children: Vec<ViewNode>,
    },
}

impl From<Element> for ViewNode {
    fn from(value: Element) -> Self {
        ViewNode::Element(value)
    }
}

impl From<&str> for ViewNode {
    fn from(value: &str) -> Self {
        text(value)
    }
}

pub fn el(tag: impl Into<String>) -> Element {
    Element {
        tag: tag.into(),
        attrs: Vec::new(),
        children: Vec::new(),
    }
}

impl Element {
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push(Attr::Static {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value)
    }

    pub fn bind_attr(mut self, name: impl Into<String>, path: impl Into<Binding>) -> Self {
        self.attrs.push(Attr::Bound {
            name: name.into(),
            path: path.into(),
        });
        self
    }

    pub fn on(mut self, event: impl Into<String>, method: impl Into<String>) -> Self {
        self.attrs.push(Attr::On {
            event: event.into(),
            method: method.into(),
        });
        self
    }

    pub fn emit(mut self, event: impl Into<String>, action: impl Into<String>) -> Self {
        self.attrs.push(Attr::Emit {
            event: event.into(),
            action: action.into(),
        });
        self
    }

    pub fn child(mut self, node: impl Into<ViewNode>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = ViewNode>) -> Self {
        self.children.extend(nodes);
        self
    }
}

pub fn text(value: impl Into<String>) -> ViewNode {
    ViewNode::Text {
        value: value.into(),
    }
}

pub fn bind(path: impl Into<Binding>) -> ViewNode {
    ViewNode::Bind { path: path.into() }
}

pub fn when(condition: Condition, then: impl Into<ViewNode>) -> ViewNode {
    ViewNode::When {
        condition,
        then: Box::new(then.into()),
        otherwise: None,
    }
}

pub fn when_else(
    condition: Condition,
    then: impl Into<ViewNode>,
    otherwise: impl Into<ViewNode>,
) -> ViewNode {
    ViewNode::When {
        condition,
        then: Box::new(then.into()),
        otherwise: Some(Box::new(otherwise.into())),
    }
}

pub fn each(source: impl Into<Binding>, alias: impl Into<String>, body: impl Into<ViewNode>) -> ViewNode {
    ViewNode::Each {
        source: source.into(),
        alias: alias.into(),
        body: Box::new(body.into()),
    }
}

pub fn slot(name: impl Into<String>) -> ViewNode {
    ViewNode::Slot {
        name: name.into(),
        fallback: None,
    }
}

pub fn slot_or(name: impl Into<String>, fallback: impl Into<ViewNode>) -> ViewNode {
    ViewNode::Slot {
        name: name.into(),
        fallback: Some(Box::new(fallback.into())),
    }
}

pub fn fragment(children: impl IntoIterator<Item = ViewNode>) -> ViewNode {
    ViewNode::Fragment {
        children: children.into_iter().collect(),
    }
}

//! HTML rendering of view trees against a JSON scope.

use serde_json::Value;

use crate::node::{Attr, Binding, Condition, Element, ViewNode};

const VOID_ELEMENTS: [&str; 8] = ["area", "br", "col", "hr", "img", "input", "link", "meta"];

/// Lookup context: the frame's JSON object plus enclosing loop variables.
struct Scope<'a> {
    root: &'a Value,
    locals: Vec<(&'a str, &'a Value)>,
}

impl<'a> Scope<'a> {
    fn resolve(&self, binding: &Binding) -> Option<&'a Value> {
        let mut segments = binding.segments();
        let first = segments.next()?;
        let mut current = self
            .locals
            .iter()
            .rev()
            .find(|(name, _)| *name == first)
            .map(|(_, value)| *value)
            .or_else(|| self.root.get(first))?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// JavaScript-style truthiness: `null`, `false`, `0`, `""` are falsy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Text form of a bound value; `null` and absent render as nothing.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub(crate) fn render(root: &ViewNode, scope: &Value) -> String {
    let mut scope = Scope {
        root: scope,
        locals: Vec::new(),
    };
    let mut out = String::new();
    render_node(root, &mut scope, &mut out);
    out
}

fn render_node<'a>(node: &'a ViewNode, scope: &mut Scope<'a>, out: &mut String) {
    match node {
        ViewNode::Element(element) => render_element(element, scope, out),
        ViewNode::Text { value } => out.push_str(&escape_html(value)),
        ViewNode::Bind { path } => out.push_str(&escape_html(&display_value(scope.resolve(path)))),
        ViewNode::When {
            condition,
            then,
            otherwise,
        } => {
            if holds(condition, scope) {
                render_node(then, scope, out);
            } else if let Some(otherwise) = otherwise {
                render_node(otherwise, scope, out);
            }
        }
        ViewNode::Each {
            source,
            alias,
            body,
        } => {
            let Some(Value::Array(items)) = scope.resolve(source) else {
                return;
            };
            for item in items {
                scope.locals.push((alias.as_str(), item));
                render_node(body, scope, out);
                scope.locals.pop();
            }
        }
        ViewNode::Slot { fallback, .. } => {
            if let Some(fallback) = fallback {
                render_node(fallback, scope, out);
            }
        }
        ViewNode::Fragment { children } => {
            for child in children {
                render_node(child, scope, out);
            }
        }
    }
}

fn holds(condition: &Condition, scope: &Scope<'_>) -> bool {
    match condition {
        Condition::Truthy { path } => is_truthy(scope.resolve(path)),
        Condition::Falsy { path } => !is_truthy(scope.resolve(path)),
        Condition::Equals { path, value } => scope.resolve(path) == Some(value),
        Condition::Empty { path } => is_empty(scope.resolve(path)),
    }
}

fn render_element<'a>(element: &'a Element, scope: &mut Scope<'a>, out: &mut String) {
    // Attributes sharing a name (typically a static and a bound `class`) are
    // joined with a space, first occurrence keeps its position.
    let mut attrs: Vec<(String, Option<String>)> = Vec::new();
    for attr in &element.attrs {
        let (name, value) = match attr {
            Attr::Static { name, value } => (name.clone(), Some(value.clone())),
            Attr::Bound { name, path } => match scope.resolve(path) {
                None | Some(Value::Null) | Some(Value::Bool(false)) => continue,
                Some(Value::Bool(true)) => (name.clone(), None),
                value => (name.clone(), Some(display_value(value))),
            },
            Attr::On { event, method } => (format!("data-on-{event}"), Some(method.clone())),
            Attr::Emit { event, action } => (format!("data-emit-{event}"), Some(action.clone())),
        };
        match attrs.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, Some(existing))) => {
                if let Some(value) = value.filter(|v| !v.is_empty()) {
                    if !existing.is_empty() {
                        existing.push(' ');
                    }
                    existing.push_str(&value);
                }
            }
            Some((_, slot @ None)) => *slot = value,
            None => attrs.push((name, value)),
        }
    }

    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &attrs {
        out.push(' ');
        out.push_str(name);
        if let Some(value) = value {
            out.push_str("=\"");
            out.push_str(&escape_html(value));
            out.push('"');
        }
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&element.tag.as_str()) {
        return;
    }
    for child in &element.children {
        render_node(child, scope, out);
    }
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Condition, bind, each, el, fragment, slot_or, text, when, when_else};
    use serde_json::json;

    #[test]
    fn escapes_text_and_bound_values() {
        let node = el("p").child(text("a < b")).child(bind("state.error")).into();
        let html = render(&node, &json!({"state": {"error": "<script>\"x\"</script>"}}));
        assert_eq!(html, "<p>a &lt; b&lt;script&gt;&quot;x&quot;&lt;/script&gt;</p>");
    }

    #[test]
    fn merges_class_attributes_and_omits_false_bindings() {
        let node = el("div")
            .class("erp-module")
            .bind_attr("class", "props.className")
            .bind_attr("hidden", "state.hidden")
            .bind_attr("disabled", "state.disabled")
            .bind_attr("data-module-id", "props.moduleId")
            .into();
        let html = render(
            &node,
            &json!({
                "props": {"className": "wide", "moduleId": "dash"},
                "state": {"hidden": false, "disabled": true}
            }),
        );
        assert_eq!(
            html,
            r#"<div class="erp-module wide" disabled data-module-id="dash"></div>"#
        );
    }

    #[test]
    fn conditions_follow_truthiness() {
        let node = when_else(
            Condition::truthy("state.isLoading"),
            "loading",
            when(Condition::equals("state.mode", json!("edit")), "editing"),
        );
        assert_eq!(render(&node, &json!({"state": {"isLoading": true}})), "loading");
        assert_eq!(
            render(&node, &json!({"state": {"isLoading": 0, "mode": "edit"}})),
            "editing"
        );
        assert_eq!(render(&node, &json!({"state": {}})), "");

        let empty = when(Condition::empty("store.items"), "none");
        assert_eq!(render(&empty, &json!({"store": {"items": []}})), "none");
        assert_eq!(render(&empty, &json!({"store": {"items": [1]}})), "");
    }

    #[test]
    fn each_binds_alias_per_item() {
        let node = el("ul")
            .child(each("store.rows", "row", el("li").child(bind("row.name"))))
            .into();
        let html = render(&node, &json!({"store": {"rows": [{"name": "a"}, {"name": "b"}]}}));
        assert_eq!(html, "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn unfilled_slots_render_fallback_and_void_elements_do_not_close() {
        let node = fragment([
            slot_or("footer", text("Ready")),
            el("input").attr("type", "text").into(),
        ]);
        assert_eq!(render(&node, &json!({})), r#"Ready<input type="text">"#);
    }

    #[test]
    fn nested_paths_index_arrays() {
        let node = bind("store.items.1.name");
        let html = render(&node, &json!({"store": {"items": [{"name": "x"}, {"name": "y"}]}}));
        assert_eq!(html, "y");
        assert_eq!(display_value(Some(&json!(42))), "42");
    }
}

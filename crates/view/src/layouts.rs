//! Built-in module layouts.
//!
//! Every layout shares the module chrome: a header with the module title, a
//! loading marker while `state.isLoading`, an error block with a retry button
//! while `state.hasError`, and the module content otherwise. Content is
//! supplied through slots (`default` unless noted).

use crate::node::{Condition, Element, ViewNode, bind, each, el, fragment, slot, slot_or, text, when, when_else};

pub const DEFAULT: &str = "module.default";
pub const LIST: &str = "module.list";
pub const FORM: &str = "module.form";
pub const DASHBOARD: &str = "module.dashboard";

pub const BUILTIN_IDS: [&str; 4] = [DEFAULT, LIST, FORM, DASHBOARD];

/// Every built-in layout with its id.
pub fn builtin() -> Vec<(&'static str, ViewNode)> {
    vec![
        (DEFAULT, default_layout()),
        (LIST, list_layout()),
        (FORM, form_layout()),
        (DASHBOARD, dashboard_layout()),
    ]
}

fn shell(variant: Option<&str>) -> Element {
    let class = match variant {
        Some(variant) => format!("erp-module erp-module-{variant}"),
        None => "erp-module".to_string(),
    };
    el("div")
        .class(class)
        .bind_attr("class", "props.className")
        .bind_attr("data-module-id", "props.moduleId")
        .bind_attr("data-lifecycle", "state.lifecycle")
}

fn header() -> ViewNode {
    el("div")
        .class("erp-module-header")
        .child(when(
            Condition::truthy("module.title"),
            el("h3").child(bind("module.title")),
        ))
        .child(when(
            Condition::truthy("module.showHeaderActions"),
            el("div").class("module-actions").child(slot("headerActions")),
        ))
        .into()
}

/// Loading marker, then the error block, then `ready`.
fn content(loading_text: &str, ready: ViewNode) -> ViewNode {
    el("div")
        .class("erp-module-content")
        .child(when_else(
            Condition::truthy("state.isLoading"),
            el("div")
                .class("module-loading")
                .attr("aria-busy", "true")
                .child(el("p").child(text(loading_text))),
            when_else(Condition::truthy("state.hasError"), error_block(), ready),
        ))
        .into()
}

fn error_block() -> ViewNode {
    el("div")
        .class("module-error")
        .attr("role", "alert")
        .child(el("p").class("error-message").child(bind("state.error")))
        .child(when(
            Condition::truthy("module.showRetryButton"),
            el("button")
                .class("btn btn-secondary")
                .on("click", "retry")
                .child(text("Retry")),
        ))
        .into()
}

fn footer(body: ViewNode) -> ViewNode {
    when(
        Condition::truthy("module.showFooter"),
        el("div").class("erp-module-footer").child(body),
    )
}

fn ready_status() -> ViewNode {
    when(
        Condition::truthy("state.isReady"),
        el("span").class("status-ready").child(text("Ready")),
    )
}

fn default_layout() -> ViewNode {
    shell(None)
        .child(header())
        .child(content(
            "Loading...",
            el("div").class("module-content-inner").child(slot("default")).into(),
        ))
        .child(footer(slot_or("footer", ready_status())))
        .into()
}

/// Slots: `toolbar`, `list`, `empty`, `footer`. The empty state shows while
/// `store.items` is empty.
fn list_layout() -> ViewNode {
    shell(Some("list"))
        .child(header())
        .child(when(
            Condition::truthy("module.showToolbar"),
            el("div").class("module-toolbar").child(slot("toolbar")),
        ))
        .child(content(
            "Loading data...",
            when_else(
                Condition::empty("store.items"),
                el("div")
                    .class("module-empty")
                    .child(slot_or("empty", el("p").child(text("No entries")))),
                el("div").class("module-list-container").child(slot("list")),
            ),
        ))
        .child(footer(slot_or(
            "footer",
            when(
                Condition::truthy("store.totalItems"),
                el("span")
                    .class("items-count")
                    .child(bind("store.totalItems"))
                    .child(text(" entries")),
            ),
        )))
        .into()
}

/// The save button is forwarded to the host as a `save` action; `actions`
/// replaces it.
fn form_layout() -> ViewNode {
    let status = when_else(
        Condition::truthy("store.isDirty"),
        el("span").class("status-modified").child(text("Unsaved changes")),
        when(
            Condition::truthy("store.lastSaved"),
            el("span")
                .class("status-saved")
                .child(text("Saved: "))
                .child(bind("store.lastSaved")),
        ),
    );

    shell(Some("form"))
        .child(header())
        .child(content(
            "Loading form...",
            el("form")
                .class("module-form")
                .child(slot("default"))
                .child(el("div").class("form-status").child(status))
                .into(),
        ))
        .child(footer(slot_or(
            "actions",
            el("button")
                .class("btn btn-primary")
                .attr("type", "submit")
                .emit("click", "save")
                .child(text("Save")),
        )))
        .into()
}

/// Renders one card per entry of `store.widgets` (`{title, value}`) ahead of
/// the `default` slot.
fn dashboard_layout() -> ViewNode {
    let widgets = el("div").class("dashboard-grid").child(each(
        "store.widgets",
        "widget",
        el("div")
            .class("dashboard-widget")
            .child(el("h4").child(bind("widget.title")))
            .child(el("div").class("widget-value").child(bind("widget.value"))),
    ));

    shell(Some("dashboard"))
        .child(header())
        .child(content(
            "Loading dashboard...",
            fragment([widgets.into(), slot("default")]),
        ))
        .child(footer(slot_or(
            "footer",
            when(
                Condition::truthy("state.lastUpdated"),
                el("span")
                    .class("last-updated")
                    .child(text("Updated: "))
                    .child(bind("state.lastUpdated")),
            ),
        )))
        .into()
}

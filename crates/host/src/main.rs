//! Demo host: mounts a dashboard, an inventory list and a finance module
//! backed by an in-process fake backend, then exercises failure, retry,
//! remount and unmount.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};

use erpmod_bridge::ModuleSlot;
use erpmod_core::helpers::{RetryPolicy, format_error, generate_id, retry};
use erpmod_core::{DataLoadError, ModuleConfig, PropKind, PropSpec, StateMap, state_from};
use erpmod_factory::{ModuleDefinition, TemplateRef};
use erpmod_host::{Framework, FrameworkOptions};
use erpmod_module::{MethodTable, Module, ModuleContext};
use erpmod_store::StoreActions;
use erpmod_view::{Condition, bind, each, el, layouts, text, when};

/// Where modules get their data from.
#[async_trait]
trait DataSource: Send + Sync {
    async fn fetch(&self, endpoint: &str) -> anyhow::Result<Value>;
}

/// Canned responses; endpoints in `failing` error until healed.
#[derive(Default)]
struct DemoBackend {
    failing: Mutex<HashSet<String>>,
}

impl DemoBackend {
    fn fail(&self, endpoint: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(endpoint.to_string());
    }

    fn heal(&self, endpoint: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(endpoint);
    }
}

#[async_trait]
impl DataSource for DemoBackend {
    async fn fetch(&self, endpoint: &str) -> anyhow::Result<Value> {
        let request_id = generate_id("req");
        tracing::debug!(%request_id, endpoint, "fetch");
        if self
            .failing
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(endpoint)
        {
            return Err(anyhow!("503 Service Unavailable")).context(format!("GET {endpoint}"));
        }
        Ok(match endpoint {
            "/api/dashboard/widgets" => json!([
                {"title": "Open orders", "value": 12},
                {"title": "Revenue (MTD)", "value": "48,210.00"},
                {"title": "Low stock", "value": 3}
            ]),
            "/api/inventory/items" => json!([
                {"sku": "A-100", "name": "Pallet jack", "stock": 4},
                {"sku": "B-220", "name": "Shelf <steel>", "stock": 0}
            ]),
            "/api/finance/ledger" => json!({"balance": "10,000.00"}),
            _ => return Err(anyhow!("404 Not Found")).context(format!("GET {endpoint}")),
        })
    }
}

/// Loads `endpoint` into store field `field`, retrying transient failures.
struct EndpointLoader {
    source: Arc<dyn DataSource>,
    endpoint: &'static str,
    field: &'static str,
}

#[async_trait]
impl Module for EndpointLoader {
    async fn load_initial_data(&self, ctx: &ModuleContext) -> Result<(), DataLoadError> {
        let path = ctx
            .endpoint(self.endpoint)
            .ok_or_else(|| DataLoadError::message(format!("no `{}` endpoint configured", self.endpoint)))?;

        let policy = RetryPolicy::fixed(1, Duration::from_millis(20));
        let data = retry(
            &policy,
            |_| self.source.fetch(&path),
            |err, attempt| {
                tracing::warn!(module_id = %ctx.module_id(), attempt, error = %format_error(&**err), "fetch failed, retrying")
            },
        )
        .await?;

        let total = data.as_array().map(Vec::len);
        let mut partial = StateMap::new();
        partial.insert(self.field.to_string(), data);
        if let Some(total) = total {
            partial.insert("totalItems".to_string(), json!(total));
        }
        ctx.update_store(partial);
        Ok(())
    }
}

fn register_modules(framework: &Framework, source: Arc<dyn DataSource>) -> anyhow::Result<()> {
    let dashboard_source = Arc::clone(&source);
    framework.register_module(
        ModuleDefinition::new(
            "Dashboard",
            ModuleConfig::new("dashboard")
                .with_title("Dashboard")
                .with_endpoint("widgets", "/api/dashboard/widgets"),
            TemplateRef::layout(layouts::DASHBOARD),
        )
        .with_initial_state(state_from(json!({"widgets": []})))
        .with_behavior(move || {
            Arc::new(EndpointLoader {
                source: Arc::clone(&dashboard_source),
                endpoint: "widgets",
                field: "widgets",
            }) as Arc<dyn Module>
        }),
    )?;

    let inventory_source = Arc::clone(&source);
    let row = el("li")
        .class("inventory-item")
        .child(el("strong").child(bind("item.name")))
        .child(text(" "))
        .child(when(
            Condition::falsy("item.stock"),
            el("span").class("badge").child(text("out of stock")),
        ))
        .child(el("button").on("click", "restock").child(text("Restock")));
    framework.register_module(
        ModuleDefinition::new(
            "Inventory",
            ModuleConfig::new("inventory")
                .with_title("Inventory")
                .with_endpoint("items", "/api/inventory/items"),
            TemplateRef::layout(layouts::LIST)
                .with_slot("list", el("ul").child(each("store.items", "item", row))),
        )
        .with_props([PropSpec::optional("warehouse", PropKind::String)])
        .with_initial_state(state_from(json!({"items": []})))
        .with_store_actions(StoreActions::new().with("restock", |state, payload| {
            let sku = payload.get("sku").and_then(Value::as_str).unwrap_or_default();
            let amount = payload.get("amount").and_then(Value::as_i64).unwrap_or(1);
            let items: Vec<Value> = state
                .get("items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|mut item| {
                    if item.get("sku").and_then(Value::as_str) == Some(sku) {
                        let stock = item.get("stock").and_then(Value::as_i64).unwrap_or(0);
                        item["stock"] = json!(stock + amount);
                    }
                    item
                })
                .collect();
            state_from(json!({"items": items}))
        }))
        .with_methods(MethodTable::new().with("restock", |ctx, payload| {
            ctx.dispatch("restock", payload.clone())?;
            ctx.trigger_action("restocked", payload.clone());
            Ok(())
        }))
        .with_behavior(move || {
            Arc::new(EndpointLoader {
                source: Arc::clone(&inventory_source),
                endpoint: "items",
                field: "items",
            }) as Arc<dyn Module>
        }),
    )?;

    framework.register_module(
        ModuleDefinition::new(
            "Finance",
            ModuleConfig::new("finance")
                .with_title("Finance")
                .with_endpoint("ledger", "/api/finance/ledger"),
            TemplateRef::layout(layouts::DEFAULT).with_slot(
                "default",
                el("p").child(text("Balance: ")).child(bind("store.ledger.balance")),
            ),
        )
        .with_behavior(move || {
            Arc::new(EndpointLoader {
                source: Arc::clone(&source),
                endpoint: "ledger",
                field: "ledger",
            }) as Arc<dyn Module>
        }),
    )?;
    Ok(())
}

fn show(name: &str, slot: &ModuleSlot) {
    println!("--- {name} ({:?})\n{}\n", slot.view(), slot.html());
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let options = FrameworkOptions::from_env()?;
    erpmod_observability::init_with(options.log_format, options.default_log_filter());

    let backend = Arc::new(DemoBackend::default());
    backend.fail("/api/finance/ledger");

    let framework = Framework::new(options);
    register_modules(&framework, backend.clone())?;
    tracing::info!(modules = ?framework.registry().module_ids(), "modules registered");

    let mut dashboard = framework.slot();
    let mut inventory = framework.slot();
    let mut finance = framework.slot();

    dashboard.render(framework.props(ModuleConfig::new("dashboard").with_title("Dashboard")))?;
    inventory.render(
        framework
            .props(ModuleConfig::new("inventory").with_title("Inventory"))
            .on_action(|event| tracing::info!(module_id = %event.module_id, action = %event.action, payload = %event.payload, "host received action")),
    )?;
    finance.render(
        framework
            .props(ModuleConfig::new("finance").with_title("Finance"))
            .on_error(|event| tracing::warn!(module_id = %event.module_id, error = %event.error, "host saw module error")),
    )?;

    dashboard.settle().await;
    inventory.settle().await;
    finance.settle().await;
    show("dashboard", &dashboard);
    show("inventory", &inventory);
    show("finance (failed, others unaffected)", &finance);

    inventory.invoke("restock", json!({"sku": "B-220", "amount": 5})).await?;
    show("inventory after restock", &inventory);

    backend.heal("/api/finance/ledger");
    finance.invoke("retry", Value::Null).await?;
    show("finance after retry", &finance);

    dashboard.render(framework.props(ModuleConfig::new("dashboard").with_title("Dashboard (Q3)")))?;
    dashboard.settle().await;
    show("dashboard remounted", &dashboard);

    let mut missing = framework.slot();
    missing.render(framework.props(ModuleConfig::new("payroll")))?;
    show("payroll (not registered)", &missing);

    for slot in [&mut dashboard, &mut inventory, &mut finance] {
        slot.unmount();
    }
    tracing::info!(
        attached = framework.page().attached_count(),
        stores = framework.stores().len(),
        "all modules unmounted"
    );
    Ok(())
}

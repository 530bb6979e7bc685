//! Name and identity lookups over the platform inventory.
//!
//! Every lookup opens a view, lists its members, and destroys the view on all
//! exit paths. Only names are read while scanning; facts are fetched for the
//! match alone. The first match wins: names are assumed unique, and a
//! duplicate is only logged. Objects deleted mid-scan are skipped.

use anyhow::{Context, Result};
use clonekeeper_common::{ObjectKind, ObjectRef};
use tokio::sync::watch;

use crate::application::ports::{InventoryObject, InventoryView};
use crate::domain::LifecycleError;

/// First object of one of `kinds` named exactly `name`.
///
/// The scan stops between reads once `cancel` is set.
///
/// # Errors
///
/// Returns `Cancelled`, or an error if the view cannot be created or read.
pub async fn find_by_name(
    inventory: &impl InventoryView,
    kinds: &[ObjectKind],
    name: &str,
    cancel: Option<&watch::Receiver<bool>>,
) -> Result<Option<InventoryObject>> {
    let mut matches = Vec::new();
    for obj in members(inventory, kinds).await? {
        if cancel.is_some_and(|rx| *rx.borrow()) {
            return Err(LifecycleError::Cancelled {
                operation: format!("lookup of '{name}'"),
            }
            .into());
        }
        let read = inventory
            .object_name(&obj)
            .await
            .with_context(|| format!("reading name of {obj}"))?;
        if read.as_deref() == Some(name) {
            matches.push(obj);
        }
    }
    if matches.len() > 1 {
        tracing::debug!(
            name,
            count = matches.len(),
            "duplicate inventory names; using the first match"
        );
    }
    for obj in matches {
        if let Some(found) = describe(inventory, &obj, name.to_string()).await? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// Object of `kind` whose platform id is `id`.
///
/// # Errors
///
/// Returns an error if the view cannot be created or read.
pub async fn find_by_id(
    inventory: &impl InventoryView,
    kind: ObjectKind,
    id: &str,
) -> Result<Option<InventoryObject>> {
    let Some(obj) = members(inventory, &[kind]).await?.into_iter().find(|o| o.id == id) else {
        return Ok(None);
    };
    let Some(name) = inventory
        .object_name(&obj)
        .await
        .with_context(|| format!("reading name of {obj}"))?
    else {
        return Ok(None);
    };
    describe(inventory, &obj, name).await
}

async fn members(inventory: &impl InventoryView, kinds: &[ObjectKind]) -> Result<Vec<ObjectRef>> {
    let view = inventory
        .create_view(kinds)
        .await
        .context("creating inventory view")?;
    let members = inventory.view_members(&view).await;
    if let Err(e) = inventory.destroy_view(&view).await {
        tracing::warn!(view = %view.0, error = %e, "failed to destroy inventory view");
    }
    members.context("listing inventory view")
}

async fn describe(inventory: &impl InventoryView, obj: &ObjectRef, name: String) -> Result<Option<InventoryObject>> {
    inventory
        .describe(obj, name)
        .await
        .with_context(|| format!("reading {obj}"))
}

//! Automation REST side of the client: tag categories, tags, associations.

use anyhow::{Context, Result};
use clonekeeper_common::{ObjectKind, ObjectRef};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{VsphereClient, check, decode};
use crate::application::ports::{
    Cardinality, CategoryInfo, CategorySpec, TagInfo, TagService, TagSpec,
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum WireCardinality {
    Single,
    Multiple,
}

impl From<Cardinality> for WireCardinality {
    fn from(c: Cardinality) -> Self {
        match c {
            Cardinality::Single => Self::Single,
            Cardinality::Multiple => Self::Multiple,
        }
    }
}

impl From<WireCardinality> for Cardinality {
    fn from(c: WireCardinality) -> Self {
        match c {
            WireCardinality::Single => Self::Single,
            WireCardinality::Multiple => Self::Multiple,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireCategory {
    id: String,
    name: String,
    cardinality: WireCardinality,
    #[serde(default)]
    associable_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireTag {
    id: String,
    name: String,
    category_id: String,
    #[serde(default)]
    description: String,
}

impl VsphereClient {
    async fn rest_call(&self, method: Method, path: &str, body: Option<serde_json::Value>) -> Result<reqwest::Response> {
        let mut request = self.rest(method.clone(), path);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let resp = request
            .send()
            .await
            .with_context(|| format!("{method} /api/{path}"))?;
        check(resp, path).await
    }

    async fn association(&self, tag_id: &str, action: &str, obj: &ObjectRef) -> Result<()> {
        self.rest_call(
            Method::POST,
            &format!("cis/tagging/tag-association/{tag_id}?action={action}"),
            Some(json!({ "object_id": obj })),
        )
        .await?;
        Ok(())
    }
}

impl TagService for VsphereClient {
    async fn list_categories(&self) -> Result<Vec<String>> {
        let path = "cis/tagging/category";
        decode(self.rest_call(Method::GET, path, None).await?, path).await
    }

    async fn get_category(&self, id: &str) -> Result<CategoryInfo> {
        let path = format!("cis/tagging/category/{id}");
        let wire: WireCategory = decode(self.rest_call(Method::GET, &path, None).await?, &path).await?;
        Ok(CategoryInfo {
            id: wire.id,
            name: wire.name,
            cardinality: wire.cardinality.into(),
            // Types outside our object model (e.g. "Datacenter") are irrelevant here.
            associable_types: wire
                .associable_types
                .iter()
                .filter_map(|t| t.parse::<ObjectKind>().ok())
                .collect(),
        })
    }

    async fn create_category(&self, spec: &CategorySpec) -> Result<String> {
        let path = "cis/tagging/category";
        let body = json!({
            "name": spec.name,
            "description": spec.description,
            "cardinality": WireCardinality::from(spec.cardinality),
            "associable_types": spec.associable_types,
        });
        decode(self.rest_call(Method::POST, path, Some(body)).await?, path).await
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        let path = "cis/tagging/tag";
        decode(self.rest_call(Method::GET, path, None).await?, path).await
    }

    async fn get_tag(&self, id: &str) -> Result<TagInfo> {
        let path = format!("cis/tagging/tag/{id}");
        let wire: WireTag = decode(self.rest_call(Method::GET, &path, None).await?, &path).await?;
        Ok(TagInfo {
            id: wire.id,
            name: wire.name,
            category_id: wire.category_id,
            description: wire.description,
        })
    }

    async fn create_tag(&self, spec: &TagSpec) -> Result<String> {
        let path = "cis/tagging/tag";
        let body = json!({
            "name": spec.name,
            "description": spec.description,
            "category_id": spec.category_id,
        });
        decode(self.rest_call(Method::POST, path, Some(body)).await?, path).await
    }

    async fn attach(&self, tag_id: &str, obj: &ObjectRef) -> Result<()> {
        self.association(tag_id, "attach", obj).await
    }

    async fn detach(&self, tag_id: &str, obj: &ObjectRef) -> Result<()> {
        self.association(tag_id, "detach", obj).await
    }

    async fn list_attached_objects(&self, tag_id: &str) -> Result<Vec<ObjectRef>> {
        let path = format!("cis/tagging/tag-association/{tag_id}?action=list-attached-objects");
        #[derive(Deserialize)]
        struct Attached {
            #[serde(rename = "type")]
            kind: String,
            id: String,
        }
        let attached: Vec<Attached> =
            decode(self.rest_call(Method::POST, &path, None).await?, &path).await?;
        // Tags can be attached to object types this tool never manages.
        Ok(attached
            .into_iter()
            .filter_map(|a| Some(ObjectRef::new(a.kind.parse().ok()?, a.id)))
            .collect())
    }
}

//! Tags as a key-value store for clone lifecycle state.
//!
//! Categories and tags are get-or-create by name so repeated runs converge
//! instead of duplicating. No locking is done here: concurrent creators rely
//! on the platform serializing creation.

use std::cmp::Reverse;
use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clonekeeper_common::{ObjectKind, ObjectRef, timestamp};

use crate::application::ports::{Cardinality, CategorySpec, TagInfo, TagService, TagSpec};
use crate::domain::LifecycleError;
use crate::domain::config::TaggingConfig;

const CLONE_TAG_DESCRIPTION: &str = "Mark VM as linked clone";

/// Get-or-create, attach/detach and predicate queries over a [`TagService`].
pub struct TagStore<'a, T: TagService> {
    tags: &'a T,
}

impl<'a, T: TagService> TagStore<'a, T> {
    #[must_use]
    pub fn new(tags: &'a T) -> Self {
        Self { tags }
    }

    /// Id of the category named `name`, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if categories cannot be listed or read.
    pub async fn find_category(&self, name: &str) -> Result<Option<String>> {
        for id in self.tags.list_categories().await.context("listing tag categories")? {
            let info = self
                .tags
                .get_category(&id)
                .await
                .with_context(|| format!("reading tag category {id}"))?;
            if info.name == name {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Id of the category `name`, creating it (single cardinality, restricted
    /// to `allowed_kinds`) when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the creation fails.
    pub async fn ensure_category(&self, name: &str, allowed_kinds: &[ObjectKind]) -> Result<String> {
        if let Some(id) = self.find_category(name).await? {
            return Ok(id);
        }
        tracing::info!(category = name, "creating tag category");
        self.tags
            .create_category(&CategorySpec {
                name: name.to_string(),
                description: format!("{name} category"),
                cardinality: Cardinality::Single,
                associable_types: allowed_kinds.to_vec(),
            })
            .await
            .with_context(|| format!("creating tag category '{name}'"))
    }

    /// Every tag for which `predicate` holds, in listing order.
    ///
    /// # Errors
    ///
    /// Returns an error if tags cannot be listed or read.
    pub async fn find_tags(&self, predicate: impl Fn(&TagInfo) -> bool) -> Result<Vec<TagInfo>> {
        let mut found = Vec::new();
        for id in self.tags.list_tags().await.context("listing tags")? {
            let info = self
                .tags
                .get_tag(&id)
                .await
                .with_context(|| format!("reading tag {id}"))?;
            if predicate(&info) {
                found.push(info);
            }
        }
        Ok(found)
    }

    /// Id of the tag named `name`, creating it in `category_id` when absent.
    ///
    /// The lookup is by name only: names must be unique across categories,
    /// which the `TS_` prefix convention provides.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the creation fails.
    pub async fn ensure_tag(&self, name: &str, category_id: &str, description: &str) -> Result<String> {
        if let Some(tag) = self.find_tags(|t| t.name == name).await?.into_iter().next() {
            return Ok(tag.id);
        }
        tracing::debug!(tag = name, category_id, "creating tag");
        self.tags
            .create_tag(&TagSpec {
                name: name.to_string(),
                description: description.to_string(),
                category_id: category_id.to_string(),
            })
            .await
            .with_context(|| format!("creating tag '{name}'"))
    }

    /// # Errors
    ///
    /// Returns an error if the platform rejects the association.
    pub async fn attach(&self, tag_id: &str, obj: &ObjectRef) -> Result<()> {
        self.tags
            .attach(tag_id, obj)
            .await
            .with_context(|| format!("attaching tag {tag_id} to {obj}"))
    }

    /// # Errors
    ///
    /// Returns an error if the platform rejects the disassociation.
    pub async fn detach(&self, tag_id: &str, obj: &ObjectRef) -> Result<()> {
        self.tags
            .detach(tag_id, obj)
            .await
            .with_context(|| format!("detaching tag {tag_id} from {obj}"))
    }

    /// # Errors
    ///
    /// Returns an error if the association list cannot be read.
    pub async fn list_attached_objects(&self, tag_id: &str) -> Result<Vec<ObjectRef>> {
        self.tags
            .list_attached_objects(tag_id)
            .await
            .with_context(|| format!("listing objects tagged {tag_id}"))
    }

    /// Tags matching `predicate` that are attached to `obj`.
    ///
    /// # Errors
    ///
    /// Returns an error if tags or their associations cannot be read.
    pub async fn tags_attached_to(
        &self,
        obj: &ObjectRef,
        predicate: impl Fn(&TagInfo) -> bool,
    ) -> Result<Vec<TagInfo>> {
        let mut attached = Vec::new();
        for tag in self.find_tags(predicate).await? {
            if self.list_attached_objects(&tag.id).await?.contains(obj) {
                attached.push(tag);
            }
        }
        Ok(attached)
    }

    /// Id of the clone marker tag, or `None` when it was never created.
    ///
    /// # Errors
    ///
    /// Returns an error if categories or tags cannot be read.
    pub async fn find_clone_tag(&self, cfg: &TaggingConfig) -> Result<Option<String>> {
        let Some(category_id) = self.find_category(&cfg.clone_category).await? else {
            return Ok(None);
        };
        Ok(self
            .find_tags(|t| t.name == cfg.clone_tag && t.category_id == category_id)
            .await?
            .into_iter()
            .next()
            .map(|t| t.id))
    }

    /// Creation times of every tagged object, read from timestamp tags.
    ///
    /// Built once per reaper run. Tags with a malformed name are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if tags or their associations cannot be read.
    pub async fn timestamp_index(&self, cfg: &TaggingConfig) -> Result<TimestampIndex> {
        let mut index = TimestampIndex::default();
        let Some(category_id) = self.find_category(&cfg.timestamp_category).await? else {
            return Ok(index);
        };
        let tags = self
            .find_tags(|t| t.category_id == category_id && timestamp::is_timestamp_tag(&t.name))
            .await?;
        for tag in tags {
            let Some(created) = timestamp::parse(&tag.name) else {
                tracing::debug!(tag = %tag.name, "ignoring malformed timestamp tag");
                continue;
            };
            for obj in self.list_attached_objects(&tag.id).await? {
                index.created.entry(obj).or_default().push(created);
            }
        }
        Ok(index)
    }

    /// Every tag of the timestamp category currently attached to `obj`,
    /// newest first. Malformed names are included and sort last.
    ///
    /// # Errors
    ///
    /// Returns an error if tags or their associations cannot be read.
    pub async fn timestamp_tags_on(&self, obj: &ObjectRef, cfg: &TaggingConfig) -> Result<Vec<TagInfo>> {
        let Some(category_id) = self.find_category(&cfg.timestamp_category).await? else {
            return Ok(Vec::new());
        };
        let mut tags = self
            .tags_attached_to(obj, |t| t.category_id == category_id)
            .await?;
        tags.sort_by_key(|t| Reverse(timestamp::parse(&t.name)));
        Ok(tags)
    }

    /// Id and name of the timestamp tag for `at`, creating category and tag
    /// as needed. Nothing is attached.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the creation fails.
    pub async fn timestamp_tag(
        &self,
        at: NaiveDateTime,
        cfg: &TaggingConfig,
        description: &str,
    ) -> Result<(String, String)> {
        let category_id = self
            .ensure_category(&cfg.timestamp_category, &[ObjectKind::VirtualMachine])
            .await?;
        let name = timestamp::encode(at);
        let tag_id = self.ensure_tag(&name, &category_id, description).await?;
        Ok((tag_id, name))
    }

    /// Attach a timestamp tag for `at` to `obj`. Returns the tag id and name.
    ///
    /// # Errors
    ///
    /// Returns an error if any tag call fails.
    pub async fn stamp_timestamp(
        &self,
        obj: &ObjectRef,
        at: NaiveDateTime,
        cfg: &TaggingConfig,
        description: &str,
    ) -> Result<(String, String)> {
        let (tag_id, name) = self.timestamp_tag(at, cfg, description).await?;
        self.attach(&tag_id, obj).await?;
        Ok((tag_id, name))
    }

    /// Record `obj` as a clone created at `at`: timestamp tag plus clone tag.
    ///
    /// Both attachments land or neither does. If the clone tag cannot be
    /// attached, the timestamp tag is detached again.
    ///
    /// # Errors
    ///
    /// Returns `TagStampFailed` naming the half that failed.
    pub async fn stamp_clone(
        &self,
        obj: &ObjectRef,
        vm_name: &str,
        at: NaiveDateTime,
        cfg: &TaggingConfig,
    ) -> Result<String> {
        let (ts_id, ts_name) = self
            .stamp_timestamp(obj, at, cfg, "Timestamp tag")
            .await
            .map_err(|e| stamp_failed(vm_name, &e))?;

        let clone_tagged = async {
            let category_id = self
                .ensure_category(&cfg.clone_category, &[ObjectKind::VirtualMachine])
                .await?;
            let tag_id = self
                .ensure_tag(&cfg.clone_tag, &category_id, CLONE_TAG_DESCRIPTION)
                .await?;
            self.attach(&tag_id, obj).await
        }
        .await;

        if let Err(e) = clone_tagged {
            if let Err(undo) = self.detach(&ts_id, obj).await {
                tracing::warn!(vm = vm_name, error = %undo, "could not detach timestamp tag after partial stamp");
            }
            return Err(stamp_failed(vm_name, &e));
        }
        Ok(ts_name)
    }
}

fn stamp_failed(vm: &str, cause: &anyhow::Error) -> anyhow::Error {
    LifecycleError::TagStampFailed {
        vm: vm.to_string(),
        reason: format!("{cause:#}"),
    }
    .into()
}

/// Object → parsed creation times from attached timestamp tags.
#[derive(Debug, Default)]
pub struct TimestampIndex {
    created: HashMap<ObjectRef, Vec<NaiveDateTime>>,
}

impl TimestampIndex {
    /// Latest creation time stamped on `obj`.
    ///
    /// With more than one timestamp attached, the newest wins, so the clone
    /// is never judged older than it might be.
    #[must_use]
    pub fn created(&self, obj: &ObjectRef) -> Option<NaiveDateTime> {
        self.created.get(obj).and_then(|t| t.iter().max().copied())
    }
}

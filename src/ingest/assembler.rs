// src/ingest/assembler.rs
//! Record assembly — one raw listing row becomes one normalized record.
//!
//! Assembly is composition, not I/O policy: it pulls flat properties and
//! drives content extraction, attachment retrieval, comment listing, and
//! relation resolution concurrently for the one record. Missing
//! properties become explicit absences; sub-fetch failures that are
//! local to this record (comments, attachments, relations) are absorbed
//! into warnings, while a failed body extraction fails the record.

use super::attachments::fetch_attachments;
use super::extractor::extract_tree;
use super::resolver::RelationResolver;
use crate::api::NotionGateway;
use crate::config::PropertyNames;
use crate::error::AppError;
use crate::model::{properties, RawTask, TaskRecord};
use crate::types::{plain_text, PageId, Warning, WarningLevel};
use futures::future::join_all;
use std::path::Path;

/// Assembles task records for one ingestion run.
pub struct RecordAssembler<'a> {
    gateway: &'a dyn NotionGateway,
    resolver: &'a RelationResolver,
    names: &'a PropertyNames,
    attachment_root: &'a Path,
}

impl<'a> RecordAssembler<'a> {
    pub fn new(
        gateway: &'a dyn NotionGateway,
        resolver: &'a RelationResolver,
        names: &'a PropertyNames,
        attachment_root: &'a Path,
    ) -> Self {
        Self {
            gateway,
            resolver,
            names,
            attachment_root,
        }
    }

    /// Builds the normalized record for one raw listing row.
    pub async fn assemble(&self, raw: &RawTask) -> Result<(TaskRecord, Vec<Warning>), AppError> {
        let props = &raw.properties;
        let names = self.names;
        let mut warnings = Vec::new();

        let nid = properties::unique_id_number(props, &names.nid);
        let record_name = nid
            .map(|n| n.to_string())
            .unwrap_or_else(|| raw.uid.clone());
        let file_refs = properties::file_refs(props, &names.files_media);

        let parent_uid = properties::relation_ids(props, &names.parent_item)
            .into_iter()
            .next();
        let children_uids = properties::relation_ids(props, &names.sub_item);

        let body = async {
            let fragments = extract_tree(self.gateway, &raw.id.cast()).await?;
            Ok::<_, AppError>(fragments.join("\n"))
        };
        let attachments =
            fetch_attachments(self.gateway, self.attachment_root, &record_name, &file_refs);
        let comments = self.flatten_comments(&raw.id);
        let relations = async {
            let parent_nid = match &parent_uid {
                Some(uid) => self.resolve_reference(uid).await,
                None => None,
            };
            let children_nids = join_all(
                children_uids
                    .iter()
                    .map(|uid| self.resolve_reference(uid)),
            )
            .await;
            (parent_nid, children_nids)
        };

        let (body, attachments, comments, (parent_nid, children_nids)) =
            tokio::join!(body, attachments, comments, relations);

        let body_content = body?;
        warnings.extend(attachments.warnings);
        let (comments, comment_warning) = comments;
        warnings.extend(comment_warning);

        let tags = properties::multi_select_names(props, &names.tags);
        let mut parent_tags = properties::rollup_tag_names(props, &names.parent_tags);
        // Dedup and sort: rollups repeat shared tags per related record,
        // and an unstable order would defeat byte-identical reruns.
        parent_tags.sort();
        parent_tags.dedup();

        let record = TaskRecord {
            uid: raw.uid.clone(),
            nid,
            name: properties::title_text(props, &names.title)
                .unwrap_or_else(|| "Untitled".to_string()),
            body_content,
            status: properties::select_name(props, &names.status),
            started: properties::date_start(props, &names.started),
            completed: properties::date_start(props, &names.completed),
            due: properties::date_start(props, &names.due),
            updated_time: raw.last_edited_time.clone(),
            priority: properties::select_name(props, &names.priority),
            files_and_media: attachments.stored,
            created: Some(raw.created_time.clone()).filter(|t| !t.is_empty()),
            parent_uid,
            parent_nid,
            children_uids,
            children_nids,
            tags,
            parent_tags,
            comments,
        };

        Ok((record, warnings))
    }

    /// Resolves one relation reference, treating an unparseable reference
    /// like a failed lookup.
    async fn resolve_reference(&self, uid: &str) -> Option<i64> {
        match PageId::parse(uid) {
            Ok(id) => self.resolver.resolve_nid(self.gateway, &id).await,
            Err(err) => {
                log::warn!("Unresolvable relation reference '{}': {}", uid, err);
                None
            }
        }
    }

    /// Lists and flattens a record's comments. A failed listing costs the
    /// comments field, not the record.
    async fn flatten_comments(&self, id: &PageId) -> (String, Option<Warning>) {
        match self.gateway.list_comments(id).await {
            Ok(comments) => {
                let text = comments
                    .iter()
                    .map(|comment| plain_text(&comment.rich_text))
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                (text, None)
            }
            Err(err) => {
                log::warn!("Failed to fetch comments for {}: {}", id, err);
                (
                    String::new(),
                    Some(
                        Warning::new(WarningLevel::Warning, "comments unavailable")
                            .with_context(format!("{}: {}", id, err)),
                    ),
                )
            }
        }
    }
}

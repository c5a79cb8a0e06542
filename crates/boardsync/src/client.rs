//! Typed board and issue operations.
//!
//! Every round trip goes through [`with_retry`] and every transport failure
//! is classified before it leaves this module. Board and field metadata is
//! fetched fresh by each call; nothing is cached between calls.

use std::{collections::HashMap, sync::Arc};

use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};
use tracing::{debug, info, instrument, warn};

use crate::{
    batch::{self, BatchUpdateResult, FieldUpdate},
    config::ClientConfig,
    error::{Error, wrap_error},
    fields::{self, Field, FieldError, ResolvedValue},
    model::{Issue, IssueStateFilter, Item, ItemFilter, OwnerKind, Project},
    paginate::{MAX_PAGE_SIZE, Page, page_size, paginate},
    queries,
    retry::{RetryPolicy, with_retry},
    transport::{GraphqlRequest, HttpTransport, Transport},
    types::{
        AddCommentData, AddProjectItemData, CreateIssueData, FieldMutationPayload, FieldsHolder,
        GraphQLField, GraphQLIssue, GraphQLItem, IdRef, IssueHolder, IssueProjectItems,
        IssuesHolder, ItemsHolder, NodeData, OwnerProjectData, ParentHolder, ProjectItemRef, RepositoryData,
        SubIssuesHolder, map_field, map_issue, map_item, map_project,
    },
};

/// Entry point for every board operation.
#[derive(Debug, Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl Client {
    /// Creates a client that talks HTTP to the configured endpoint.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_transport(HttpTransport::new(config), config.retry().clone())
    }

    /// Creates a client over any [`Transport`].
    pub fn with_transport(transport: impl Transport + 'static, retry: RetryPolicy) -> Self {
        Self {
            transport: Arc::new(transport),
            retry,
        }
    }

    /// Sends `request`, retrying on rate limits, and classifies failures.
    async fn send(&self, request: &GraphqlRequest) -> Result<JsonValue, Error> {
        with_retry(&self.retry, || async move {
            self.transport.execute(request).await.map_err(Error::from)
        })
        .await
    }

    async fn query<T: DeserializeOwned>(
        &self,
        what: &'static str,
        document: &str,
        variables: JsonValue,
    ) -> Result<T, Error> {
        let data = self.send(&GraphqlRequest::new(document, variables)).await?;
        serde_json::from_value(data).map_err(|e| Error::decode(what, e))
    }

    // Projects

    /// Looks up the board `number` owned by `owner`.
    ///
    /// Users and organizations are resolved through separate lookups; the
    /// user branch is tried first and the organization branch only when the
    /// first reports not found.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if neither branch resolves the board, or the
    /// first non-not-found failure.
    #[instrument(skip(self))]
    pub async fn get_project(&self, owner: &str, number: u32) -> Result<Project, Error> {
        let resource = format!("{owner}/{number}");
        let mut last_not_found = None;

        for kind in [OwnerKind::User, OwnerKind::Organization] {
            match self.project_for_owner(kind, owner, number).await {
                Ok(project) => return Ok(project),
                Err(err) if err.is_not_found() => {
                    debug!(%kind, error = %err, "Project not found for owner kind");
                    last_not_found = Some(err);
                }
                Err(err) => return Err(wrap_error("get project", resource, err)),
            }
        }

        let err = last_not_found.unwrap_or_else(|| Error::not_found(format!("project {resource}")));
        Err(wrap_error("get project", resource, err))
    }

    async fn project_for_owner(&self, kind: OwnerKind, login: &str, number: u32) -> Result<Project, Error> {
        let document = match kind {
            OwnerKind::User => queries::USER_PROJECT,
            OwnerKind::Organization => queries::ORGANIZATION_PROJECT,
        };
        let data: OwnerProjectData = self
            .query("project", document, json!({ "login": login, "number": number }))
            .await?;

        data.owner
            .and_then(|owner| owner.project_v2)
            .map(|project| map_project(project, kind, login))
            .ok_or_else(|| Error::not_found(format!("no project {number} for {kind} {login}")))
    }

    /// Every field of a board, with options for single-select fields.
    ///
    /// # Errors
    ///
    /// Returns a classified error if any page request fails.
    #[instrument(skip(self))]
    pub async fn get_project_fields(&self, project_id: &str) -> Result<Vec<Field>, Error> {
        paginate(0, move |cursor| self.fields_page(project_id, cursor), map_field)
            .await
            .map_err(|err| wrap_error("get fields of", format!("project {project_id}"), err))
    }

    async fn fields_page(&self, project_id: &str, cursor: Option<String>) -> Result<Page<GraphQLField>, Error> {
        let data: NodeData<FieldsHolder> = self
            .query(
                "project fields",
                queries::PROJECT_FIELDS,
                json!({ "projectId": project_id, "first": MAX_PAGE_SIZE, "after": cursor }),
            )
            .await?;
        data.node
            .map(|holder| holder.fields)
            .ok_or_else(|| Error::not_found(format!("project {project_id}")))
    }

    /// Issue items of a board, in board order.
    ///
    /// Entries that do not wrap an issue are skipped, as are issues outside
    /// `filter`. Neither counts toward `limit` (0 means unbounded).
    ///
    /// # Errors
    ///
    /// Returns a classified error if any page request fails; no partial list
    /// is returned.
    #[instrument(skip(self))]
    pub async fn get_project_items(
        &self,
        project_id: &str,
        filter: &ItemFilter,
        limit: usize,
    ) -> Result<Vec<Item>, Error> {
        let first = page_size(limit, !filter.is_empty());
        let items = paginate(
            limit,
            move |cursor| self.items_page(project_id, first, cursor),
            |node| map_item(node).filter(|item| filter.matches(item)),
        )
        .await
        .map_err(|err| wrap_error("get items of", format!("project {project_id}"), err))?;

        debug!(count = items.len(), "Fetched project items");
        Ok(items)
    }

    async fn items_page(
        &self,
        project_id: &str,
        first: usize,
        cursor: Option<String>,
    ) -> Result<Page<GraphQLItem>, Error> {
        let data: NodeData<ItemsHolder> = self
            .query(
                "project items",
                queries::PROJECT_ITEMS,
                json!({ "projectId": project_id, "first": first, "after": cursor }),
            )
            .await?;
        data.node
            .map(|holder| holder.items)
            .ok_or_else(|| Error::not_found(format!("project {project_id}")))
    }

    /// Id of the item wrapping `issue_id` on board `project_id`, if any.
    ///
    /// Walks every board the issue is on until the matching one turns up.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the issue does not exist.
    #[instrument(skip(self))]
    pub async fn get_project_item_id(&self, project_id: &str, issue_id: &str) -> Result<Option<String>, Error> {
        let items = paginate(
            1,
            move |cursor| async move {
                let data: NodeData<IssueProjectItems> = self
                    .query(
                        "issue project items",
                        queries::ISSUE_PROJECT_ITEMS,
                        json!({ "issueId": issue_id, "first": MAX_PAGE_SIZE, "after": cursor }),
                    )
                    .await?;
                data.node
                    .map(|issue| issue.project_items)
                    .ok_or_else(|| Error::not_found(format!("issue {issue_id}")))
            },
            |item: ProjectItemRef| (item.project.id == project_id).then_some(item.id),
        )
        .await
        .map_err(|err| wrap_error("get project items of", format!("issue {issue_id}"), err))?;

        Ok(items.into_iter().next())
    }

    /// Adds an issue (or pull request) to a board and returns the item id.
    ///
    /// Adding content that is already on the board returns the existing item.
    ///
    /// # Errors
    ///
    /// Returns a classified error if the mutation fails.
    #[instrument(skip(self))]
    pub async fn add_issue_to_project(&self, project_id: &str, issue_id: &str) -> Result<String, Error> {
        let resource = format!("issue {issue_id} to project {project_id}");
        let data: AddProjectItemData = self
            .query(
                "added project item",
                queries::ADD_PROJECT_ITEM,
                json!({ "projectId": project_id, "contentId": issue_id }),
            )
            .await
            .map_err(|err| wrap_error("add", resource.clone(), err))?;

        let item = data
            .add_project_v2_item_by_id
            .item
            .ok_or_else(|| wrap_error("add", resource, Error::not_found("no item returned")))?;
        info!(item_id = %item.id, "Added issue to project");
        Ok(item.id)
    }

    // Field values

    /// Sets one field of one item, looking the field up by name.
    ///
    /// An empty value clears a date field.
    ///
    /// # Errors
    ///
    /// Returns an unsupported error for an unknown field, an unsupported field
    /// type or a value that cannot be coerced; otherwise a classified
    /// transport error.
    #[instrument(skip(self))]
    pub async fn set_project_item_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_name: &str,
        value: &str,
    ) -> Result<(), Error> {
        let resource = format!("{field_name:?} on item {item_id}");
        let board_fields = self.get_project_fields(project_id).await?;
        let field = fields::find_field(&board_fields, field_name)
            .ok_or_else(|| FieldError::FieldNotFound(field_name.to_string()))
            .and_then(|field| fields::resolve(field, value).map(|resolved| (field, resolved)));
        let (field, resolved) = field.map_err(|err| wrap_error("set", resource.clone(), err.into()))?;

        let (what, document, variables) = match resolved {
            ResolvedValue::Set(value) => (
                "field update",
                queries::UPDATE_FIELD_VALUE,
                json!({
                    "projectId": project_id,
                    "itemId": item_id,
                    "fieldId": field.id,
                    "value": value,
                }),
            ),
            ResolvedValue::Clear => (
                "field clear",
                queries::CLEAR_FIELD_VALUE,
                json!({ "projectId": project_id, "itemId": item_id, "fieldId": field.id }),
            ),
        };
        self.query::<JsonValue>(what, document, variables)
            .await
            .map_err(|err| wrap_error("set", resource, err))?;
        Ok(())
    }

    /// Applies many field updates in one round trip.
    ///
    /// `fields` must be the board's field metadata, usually from
    /// [`Self::get_project_fields`]. Each update is resolved on its own: one
    /// that fails resolution is reported as a failed result and left out of
    /// the request without affecting the others. If nothing resolves, no
    /// request is sent. Results come back in input order.
    ///
    /// # Errors
    ///
    /// Returns an error only for batch-wide failures: compilation, or a
    /// transport or server failure of the combined request. Such a failure
    /// cannot be attributed to individual updates, and whether any of them
    /// were applied is unknown.
    #[instrument(skip(self, updates, fields), fields(updates = updates.len()))]
    pub async fn batch_update_project_item_fields(
        &self,
        project_id: &str,
        updates: &[FieldUpdate],
        fields: &[Field],
    ) -> Result<Vec<BatchUpdateResult>, Error> {
        let resource = format!("{} field values in project {project_id}", updates.len());
        let mut results: Vec<Option<BatchUpdateResult>> = vec![None; updates.len()];
        let mut resolved = Vec::with_capacity(updates.len());
        let mut positions = Vec::with_capacity(updates.len());

        for (index, update) in updates.iter().enumerate() {
            match batch::resolve_update(update, fields) {
                Ok(update) => {
                    resolved.push(update);
                    positions.push(index);
                }
                Err(err) => {
                    warn!(item_id = %update.item_id, field = %update.field_name, error = %err, "Skipping update");
                    results[index] = Some(BatchUpdateResult::failed(
                        &update.item_id,
                        &update.field_name,
                        err.to_string(),
                    ));
                }
            }
        }

        let compiled = batch::compile(project_id, &resolved)
            .map_err(|err| wrap_error("update", resource.clone(), err))?;
        let Some(compiled) = compiled else {
            debug!("No update resolved; skipping request");
            return Ok(results.into_iter().flatten().collect());
        };

        let data = self
            .send(&compiled.request())
            .await
            .map_err(|err| wrap_error("update", resource.clone(), err))?;
        let payloads: HashMap<String, Option<FieldMutationPayload>> = serde_json::from_value(data)
            .map_err(|err| wrap_error("update", resource, Error::decode("batch update", err)))?;

        for ((alias, index), update) in compiled.aliases.iter().zip(positions).zip(&resolved) {
            let applied = payloads
                .get(alias)
                .and_then(Option::as_ref)
                .and_then(|payload| payload.project_v2_item.as_ref())
                .is_some();
            results[index] = Some(if applied {
                BatchUpdateResult::succeeded(&update.item_id, &update.field_name)
            } else {
                BatchUpdateResult::failed(&update.item_id, &update.field_name, "no result returned for update")
            });
        }

        Ok(results.into_iter().flatten().collect())
    }

    // Issues

    /// # Errors
    ///
    /// Returns a not-found error if the repository or issue does not exist.
    #[instrument(skip(self))]
    pub async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue, Error> {
        let resource = format!("{owner}/{repo}#{number}");
        let data: RepositoryData<IssueHolder<GraphQLIssue>> = self
            .query(
                "issue",
                queries::ISSUE,
                json!({ "owner": owner, "name": repo, "number": number }),
            )
            .await
            .map_err(|err| wrap_error("get issue", resource.clone(), err))?;

        data.repository
            .and_then(|repository| repository.issue)
            .map(map_issue)
            .ok_or_else(|| wrap_error("get issue", resource.clone(), Error::not_found(resource)))
    }

    /// # Errors
    ///
    /// Returns a not-found error if the repository does not exist.
    #[instrument(skip(self))]
    pub async fn get_repository_id(&self, owner: &str, repo: &str) -> Result<String, Error> {
        let resource = format!("{owner}/{repo}");
        let data: RepositoryData<IdRef> = self
            .query("repository", queries::REPOSITORY_ID, json!({ "owner": owner, "name": repo }))
            .await
            .map_err(|err| wrap_error("get repository", resource.clone(), err))?;

        data.repository
            .map(|repository| repository.id)
            .ok_or_else(|| wrap_error("get repository", resource.clone(), Error::not_found(resource)))
    }

    /// Issues in `owner/repo` carrying every label in `labels`.
    ///
    /// The server returns issues carrying any of the labels; those missing one
    /// are dropped here and do not count toward `limit`. Label names compare
    /// case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns a classified error if any page request fails.
    #[instrument(skip(self))]
    pub async fn search_issues_by_labels(
        &self,
        owner: &str,
        repo: &str,
        labels: &[String],
        state: IssueStateFilter,
        limit: usize,
    ) -> Result<Vec<Issue>, Error> {
        let first = page_size(limit, labels.len() > 1);
        paginate(
            limit,
            move |cursor| async move {
                let data: RepositoryData<IssuesHolder> = self
                    .query(
                        "issues",
                        queries::ISSUES_BY_LABELS,
                        json!({
                            "owner": owner,
                            "name": repo,
                            "labels": labels,
                            "states": state.states(),
                            "first": first,
                            "after": cursor,
                        }),
                    )
                    .await?;
                data.repository
                    .map(|repository| repository.issues)
                    .ok_or_else(|| Error::not_found(format!("repository {owner}/{repo}")))
            },
            |node| {
                let issue = map_issue(node);
                has_all_labels(&issue, labels).then_some(issue)
            },
        )
        .await
        .map_err(|err| wrap_error("search issues in", format!("{owner}/{repo}"), err))
    }

    /// # Errors
    ///
    /// Returns a classified error if the mutation fails.
    #[instrument(skip(self, body))]
    pub async fn create_issue(&self, repository_id: &str, title: &str, body: &str) -> Result<Issue, Error> {
        let resource = format!("issue {title:?}");
        let data: CreateIssueData = self
            .query(
                "created issue",
                queries::CREATE_ISSUE,
                json!({ "repositoryId": repository_id, "title": title, "body": body }),
            )
            .await
            .map_err(|err| wrap_error("create", resource.clone(), err))?;

        let issue = data
            .create_issue
            .issue
            .map(map_issue)
            .ok_or_else(|| wrap_error("create", resource, Error::not_found("no issue returned")))?;
        info!(number = issue.number, "Created issue");
        Ok(issue)
    }

    /// # Errors
    ///
    /// Returns a classified error if the mutation fails.
    #[instrument(skip(self))]
    pub async fn close_issue(&self, issue_id: &str) -> Result<(), Error> {
        self.query::<JsonValue>("closed issue", queries::CLOSE_ISSUE, json!({ "issueId": issue_id }))
            .await
            .map_err(|err| wrap_error("close", format!("issue {issue_id}"), err))?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns a classified error if the mutation fails.
    #[instrument(skip(self))]
    pub async fn reopen_issue(&self, issue_id: &str) -> Result<(), Error> {
        self.query::<JsonValue>("reopened issue", queries::REOPEN_ISSUE, json!({ "issueId": issue_id }))
            .await
            .map_err(|err| wrap_error("reopen", format!("issue {issue_id}"), err))?;
        Ok(())
    }

    /// Comments on an issue and returns the comment id.
    ///
    /// # Errors
    ///
    /// Returns a classified error if the mutation fails.
    #[instrument(skip(self, body))]
    pub async fn add_issue_comment(&self, issue_id: &str, body: &str) -> Result<String, Error> {
        let resource = format!("issue {issue_id}");
        let data: AddCommentData = self
            .query(
                "comment",
                queries::ADD_COMMENT,
                json!({ "subjectId": issue_id, "body": body }),
            )
            .await
            .map_err(|err| wrap_error("comment on", resource.clone(), err))?;

        data.add_comment
            .comment_edge
            .and_then(|edge| edge.node)
            .map(|node| node.id)
            .ok_or_else(|| wrap_error("comment on", resource, Error::not_found("no comment returned")))
    }

    // Sub-issues

    /// Links `child_id` under `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns a classified error if the mutation fails.
    #[instrument(skip(self))]
    pub async fn add_sub_issue(&self, parent_id: &str, child_id: &str) -> Result<(), Error> {
        self.query::<JsonValue>(
            "sub-issue link",
            queries::ADD_SUB_ISSUE,
            json!({ "issueId": parent_id, "subIssueId": child_id }),
        )
        .await
        .map_err(|err| wrap_error("link", format!("sub-issue {child_id} to {parent_id}"), err))?;
        Ok(())
    }

    /// Removes the link between `parent_id` and `child_id`.
    ///
    /// # Errors
    ///
    /// Returns a classified error if the mutation fails.
    #[instrument(skip(self))]
    pub async fn remove_sub_issue(&self, parent_id: &str, child_id: &str) -> Result<(), Error> {
        self.query::<JsonValue>(
            "sub-issue unlink",
            queries::REMOVE_SUB_ISSUE,
            json!({ "issueId": parent_id, "subIssueId": child_id }),
        )
        .await
        .map_err(|err| wrap_error("unlink", format!("sub-issue {child_id} from {parent_id}"), err))?;
        Ok(())
    }

    /// Direct children of an issue.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the issue does not exist.
    #[instrument(skip(self))]
    pub async fn get_sub_issues(&self, owner: &str, repo: &str, number: u64, limit: usize) -> Result<Vec<Issue>, Error> {
        let first = page_size(limit, false);
        paginate(
            limit,
            move |cursor| async move {
                let data: RepositoryData<IssueHolder<SubIssuesHolder>> = self
                    .query(
                        "sub-issues",
                        queries::SUB_ISSUES,
                        json!({
                            "owner": owner,
                            "name": repo,
                            "number": number,
                            "first": first,
                            "after": cursor,
                        }),
                    )
                    .await?;
                data.repository
                    .and_then(|repository| repository.issue)
                    .map(|issue| issue.sub_issues)
                    .ok_or_else(|| Error::not_found(format!("issue {owner}/{repo}#{number}")))
            },
            |issue| Some(map_issue(issue)),
        )
        .await
        .map_err(|err| wrap_error("get sub-issues of", format!("{owner}/{repo}#{number}"), err))
    }

    /// Parent of an issue, if it has one.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the issue does not exist.
    #[instrument(skip(self))]
    pub async fn get_parent_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Option<Issue>, Error> {
        let resource = format!("{owner}/{repo}#{number}");
        let data: RepositoryData<IssueHolder<ParentHolder>> = self
            .query(
                "parent issue",
                queries::PARENT_ISSUE,
                json!({ "owner": owner, "name": repo, "number": number }),
            )
            .await
            .map_err(|err| wrap_error("get parent of", resource.clone(), err))?;

        let issue = data
            .repository
            .and_then(|repository| repository.issue)
            .ok_or_else(|| wrap_error("get parent of", resource.clone(), Error::not_found(resource)))?;
        Ok(issue.parent.map(map_issue))
    }
}

fn has_all_labels(issue: &Issue, labels: &[String]) -> bool {
    labels
        .iter()
        .all(|want| issue.labels.iter().any(|have| have.eq_ignore_ascii_case(want)))
}

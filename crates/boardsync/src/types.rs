//! Wire shapes of GraphQL responses and their mapping into public types.

use serde::Deserialize;

use crate::{
    fields::{Field, FieldDataType, FieldOption},
    model::{FieldValue, Issue, IssueState, Item, Owner, OwnerKind, Project},
    paginate::Page,
};

#[derive(Debug, Deserialize)]
pub(crate) struct NodeData<T> {
    pub node: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryData<T> {
    pub repository: Option<T>,
}

// Projects

#[derive(Debug, Deserialize)]
pub(crate) struct OwnerProjectData {
    pub owner: Option<ProjectHolder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProjectHolder {
    pub project_v2: Option<GraphQLProject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQLProject {
    pub id: String,
    pub number: u32,
    pub title: String,
    pub url: String,
    pub closed: bool,
    pub owner: GraphQLOwner,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQLOwner {
    #[serde(rename = "__typename")]
    pub typename: String,
    #[serde(default)]
    pub login: Option<String>,
}

// Fields

#[derive(Debug, Deserialize)]
pub(crate) struct FieldsHolder {
    pub fields: Page<GraphQLField>,
}

/// Field nodes outside the requested fragments decode with every member unset.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphQLField {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_type: Option<FieldDataType>,
    #[serde(default)]
    pub options: Vec<FieldOption>,
}

// Items

#[derive(Debug, Deserialize)]
pub(crate) struct ItemsHolder {
    pub items: Page<GraphQLItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphQLItem {
    pub id: String,
    #[serde(default)]
    pub content: Option<GraphQLContent>,
    #[serde(default)]
    pub field_values: Option<Connection<GraphQLFieldValue>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub(crate) enum GraphQLContent {
    Issue(GraphQLIssue),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQLFieldValue {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub number: Option<f64>,
    #[serde(default)]
    pub date: Option<String>,
    /// Single-select option name.
    #[serde(default)]
    pub name: Option<String>,
    /// Iteration title.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub field: Option<FieldRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FieldRef {
    #[serde(default)]
    pub name: Option<String>,
}

// Issues

#[derive(Debug, Deserialize)]
pub(crate) struct Connection<T> {
    pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphQLIssue {
    pub id: String,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    pub url: String,
    pub repository: RepositoryRef,
    #[serde(default)]
    pub labels: Option<Connection<LabelRef>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RepositoryRef {
    pub name_with_owner: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LabelRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueHolder<T> {
    pub issue: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubIssuesHolder {
    pub sub_issues: Page<GraphQLIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ParentHolder {
    pub parent: Option<GraphQLIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssuesHolder {
    pub issues: Page<GraphQLIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IssueProjectItems {
    pub project_items: Page<ProjectItemRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectItemRef {
    pub id: String,
    pub project: IdRef,
}

// Mutations

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddProjectItemData {
    pub add_project_v2_item_by_id: ItemPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemPayload {
    pub item: Option<IdRef>,
}

/// Payload of one update or clear sub-operation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FieldMutationPayload {
    pub project_v2_item: Option<IdRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateIssueData {
    pub create_issue: IssuePayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssuePayload {
    pub issue: Option<GraphQLIssue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddCommentData {
    pub add_comment: CommentPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommentPayload {
    pub comment_edge: Option<CommentEdge>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentEdge {
    pub node: Option<IdRef>,
}

// Mapping functions

pub(crate) fn map_project(project: GraphQLProject, fallback_kind: OwnerKind, login: &str) -> Project {
    let kind = match project.owner.typename.as_str() {
        "Organization" => OwnerKind::Organization,
        "User" => OwnerKind::User,
        _ => fallback_kind,
    };
    Project {
        id: project.id,
        number: project.number,
        title: project.title,
        url: project.url,
        closed: project.closed,
        owner: Owner {
            kind,
            login: project.owner.login.unwrap_or_else(|| login.to_string()),
        },
    }
}

/// Drops nodes that matched none of the requested fragments.
pub(crate) fn map_field(field: GraphQLField) -> Option<Field> {
    Some(Field {
        id: field.id?,
        name: field.name?,
        data_type: field.data_type?,
        options: field.options,
    })
}

/// Drops entries whose content is not an issue.
pub(crate) fn map_item(item: GraphQLItem) -> Option<Item> {
    let Some(GraphQLContent::Issue(issue)) = item.content else {
        return None;
    };
    let field_values = item
        .field_values
        .map(|values| values.nodes.into_iter().filter_map(map_field_value).collect())
        .unwrap_or_default();
    Some(Item {
        id: item.id,
        issue: map_issue(issue),
        field_values,
    })
}

fn map_field_value(value: GraphQLFieldValue) -> Option<FieldValue> {
    let field_name = value.field?.name?;
    let value = value
        .text
        .or(value.date)
        .or(value.name)
        .or(value.title)
        .or_else(|| value.number.map(|n| n.to_string()))?;
    Some(FieldValue { field_name, value })
}

pub(crate) fn map_issue(issue: GraphQLIssue) -> Issue {
    Issue {
        id: issue.id,
        number: issue.number,
        title: issue.title,
        body: issue.body.unwrap_or_default(),
        state: if issue.state.eq_ignore_ascii_case("CLOSED") {
            IssueState::Closed
        } else {
            IssueState::Open
        },
        url: issue.url,
        repository: issue.repository.name_with_owner,
        labels: issue
            .labels
            .map(|labels| labels.nodes.into_iter().map(|label| label.name).collect())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn issue_json(number: u64, repo: &str) -> serde_json::Value {
        json!({
            "__typename": "Issue",
            "id": format!("I_{number}"),
            "number": number,
            "title": format!("Issue {number}"),
            "body": null,
            "state": "OPEN",
            "url": format!("https://github.com/{repo}/issues/{number}"),
            "repository": { "nameWithOwner": repo },
            "labels": { "nodes": [{ "name": "bug" }] }
        })
    }

    #[test]
    fn test_map_item_keeps_issue_and_field_values() {
        let item: GraphQLItem = serde_json::from_value(json!({
            "id": "PVTI_1",
            "content": issue_json(7, "octo/app"),
            "fieldValues": { "nodes": [
                { "name": "In Progress", "field": { "name": "Status" } },
                { "number": 3.0, "field": { "name": "Estimate" } },
                { "date": "2024-01-15", "field": { "name": "Due" } },
                { },
                { "text": "orphan" }
            ]}
        }))
        .unwrap();

        let item = map_item(item).unwrap();
        assert_eq!(item.issue.number, 7);
        assert_eq!(item.issue.body, "");
        assert_eq!(item.issue.labels, vec!["bug".to_string()]);
        assert_eq!(item.field_value("Status"), Some("In Progress"));
        assert_eq!(item.field_value("Estimate"), Some("3"));
        assert_eq!(item.field_value("Due"), Some("2024-01-15"));
        assert_eq!(item.field_values.len(), 3);
    }

    #[test]
    fn test_map_item_drops_draft_content() {
        let item: GraphQLItem = serde_json::from_value(json!({
            "id": "PVTI_2",
            "content": { "__typename": "DraftIssue", "title": "Idea" },
        }))
        .unwrap();
        assert!(map_item(item).is_none());
    }

    #[test]
    fn test_map_item_drops_missing_content() {
        let item: GraphQLItem = serde_json::from_value(json!({ "id": "PVTI_3", "content": null })).unwrap();
        assert!(map_item(item).is_none());
    }

    #[test]
    fn test_map_field_skips_unmatched_fragments() {
        let field: GraphQLField = serde_json::from_value(json!({})).unwrap();
        assert!(map_field(field).is_none());

        let field: GraphQLField = serde_json::from_value(json!({
            "id": "PVTSSF_1",
            "name": "Status",
            "dataType": "SINGLE_SELECT",
            "options": [{ "id": "o1", "name": "Todo" }]
        }))
        .unwrap();
        let field = map_field(field).unwrap();
        assert_eq!(field.data_type, FieldDataType::SingleSelect);
        assert_eq!(field.option("Todo").unwrap().id, "o1");
    }

    #[test]
    fn test_map_project_reads_owner_kind_from_typename() {
        let project: GraphQLProject = serde_json::from_value(json!({
            "id": "PVT_1",
            "number": 4,
            "title": "Roadmap",
            "url": "https://github.com/orgs/octo/projects/4",
            "closed": false,
            "owner": { "__typename": "Organization", "login": "octo" }
        }))
        .unwrap();

        let project = map_project(project, OwnerKind::User, "octo");
        assert_eq!(project.owner.kind, OwnerKind::Organization);
        assert_eq!(project.owner.login, "octo");
    }
}

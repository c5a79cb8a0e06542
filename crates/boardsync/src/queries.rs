//! Static GraphQL documents for single-operation requests.

macro_rules! issue_fragment {
    () => {
        r"
fragment IssueFields on Issue {
  id
  number
  title
  body
  state
  url
  repository {
    nameWithOwner
  }
  labels(first: 100) {
    nodes {
      name
    }
  }
}"
    };
}

macro_rules! project_fragment {
    () => {
        r"
fragment ProjectFields on ProjectV2 {
  id
  number
  title
  url
  closed
  owner {
    __typename
    ... on User {
      login
    }
    ... on Organization {
      login
    }
  }
}"
    };
}

pub(crate) const USER_PROJECT: &str = concat!(
    r"
query GetUserProject($login: String!, $number: Int!) {
  owner: user(login: $login) {
    projectV2(number: $number) {
      ...ProjectFields
    }
  }
}",
    project_fragment!()
);

pub(crate) const ORGANIZATION_PROJECT: &str = concat!(
    r"
query GetOrganizationProject($login: String!, $number: Int!) {
  owner: organization(login: $login) {
    projectV2(number: $number) {
      ...ProjectFields
    }
  }
}",
    project_fragment!()
);

pub(crate) const PROJECT_FIELDS: &str = r"
query GetProjectFields($projectId: ID!, $first: Int!, $after: String) {
  node(id: $projectId) {
    ... on ProjectV2 {
      fields(first: $first, after: $after) {
        nodes {
          ... on ProjectV2Field {
            id
            name
            dataType
          }
          ... on ProjectV2SingleSelectField {
            id
            name
            dataType
            options {
              id
              name
            }
          }
          ... on ProjectV2IterationField {
            id
            name
            dataType
          }
        }
        pageInfo {
          hasNextPage
          endCursor
        }
      }
    }
  }
}";

pub(crate) const PROJECT_ITEMS: &str = concat!(
    r"
query GetProjectItems($projectId: ID!, $first: Int!, $after: String) {
  node(id: $projectId) {
    ... on ProjectV2 {
      items(first: $first, after: $after) {
        nodes {
          id
          content {
            __typename
            ...IssueFields
          }
          fieldValues(first: 100) {
            nodes {
              ... on ProjectV2ItemFieldTextValue {
                text
                field {
                  ... on ProjectV2FieldCommon {
                    name
                  }
                }
              }
              ... on ProjectV2ItemFieldNumberValue {
                number
                field {
                  ... on ProjectV2FieldCommon {
                    name
                  }
                }
              }
              ... on ProjectV2ItemFieldDateValue {
                date
                field {
                  ... on ProjectV2FieldCommon {
                    name
                  }
                }
              }
              ... on ProjectV2ItemFieldSingleSelectValue {
                name
                field {
                  ... on ProjectV2FieldCommon {
                    name
                  }
                }
              }
              ... on ProjectV2ItemFieldIterationValue {
                title
                field {
                  ... on ProjectV2FieldCommon {
                    name
                  }
                }
              }
            }
          }
        }
        pageInfo {
          hasNextPage
          endCursor
        }
      }
    }
  }
}",
    issue_fragment!()
);

pub(crate) const ISSUE: &str = concat!(
    r"
query GetIssue($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      ...IssueFields
    }
  }
}",
    issue_fragment!()
);

pub(crate) const REPOSITORY_ID: &str = r"
query GetRepositoryId($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    id
  }
}";

pub(crate) const ISSUE_PROJECT_ITEMS: &str = r"
query GetIssueProjectItems($issueId: ID!, $first: Int!, $after: String) {
  node(id: $issueId) {
    ... on Issue {
      projectItems(first: $first, after: $after) {
        nodes {
          id
          project {
            id
          }
        }
        pageInfo {
          hasNextPage
          endCursor
        }
      }
    }
  }
}";

pub(crate) const SUB_ISSUES: &str = concat!(
    r"
query GetSubIssues($owner: String!, $name: String!, $number: Int!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      subIssues(first: $first, after: $after) {
        nodes {
          ...IssueFields
        }
        pageInfo {
          hasNextPage
          endCursor
        }
      }
    }
  }
}",
    issue_fragment!()
);

pub(crate) const PARENT_ISSUE: &str = concat!(
    r"
query GetParentIssue($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      parent {
        ...IssueFields
      }
    }
  }
}",
    issue_fragment!()
);

pub(crate) const ISSUES_BY_LABELS: &str = concat!(
    r"
query SearchIssuesByLabels($owner: String!, $name: String!, $labels: [String!], $states: [IssueState!], $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    issues(first: $first, after: $after, labels: $labels, states: $states, orderBy: {field: CREATED_AT, direction: ASC}) {
      nodes {
        ...IssueFields
      }
      pageInfo {
        hasNextPage
        endCursor
      }
    }
  }
}",
    issue_fragment!()
);

pub(crate) const ADD_PROJECT_ITEM: &str = r"
mutation AddProjectItem($projectId: ID!, $contentId: ID!) {
  addProjectV2ItemById(input: {projectId: $projectId, contentId: $contentId}) {
    item {
      id
    }
  }
}";

pub(crate) const UPDATE_FIELD_VALUE: &str = r"
mutation UpdateProjectItemField($projectId: ID!, $itemId: ID!, $fieldId: ID!, $value: ProjectV2FieldValue!) {
  updateProjectV2ItemFieldValue(input: {projectId: $projectId, itemId: $itemId, fieldId: $fieldId, value: $value}) {
    projectV2Item {
      id
    }
  }
}";

pub(crate) const CLEAR_FIELD_VALUE: &str = r"
mutation ClearProjectItemField($projectId: ID!, $itemId: ID!, $fieldId: ID!) {
  clearProjectV2ItemFieldValue(input: {projectId: $projectId, itemId: $itemId, fieldId: $fieldId}) {
    projectV2Item {
      id
    }
  }
}";

pub(crate) const ADD_SUB_ISSUE: &str = r"
mutation AddSubIssue($issueId: ID!, $subIssueId: ID!) {
  addSubIssue(input: {issueId: $issueId, subIssueId: $subIssueId}) {
    issue {
      id
    }
  }
}";

pub(crate) const REMOVE_SUB_ISSUE: &str = r"
mutation RemoveSubIssue($issueId: ID!, $subIssueId: ID!) {
  removeSubIssue(input: {issueId: $issueId, subIssueId: $subIssueId}) {
    issue {
      id
    }
  }
}";

pub(crate) const CREATE_ISSUE: &str = concat!(
    r"
mutation CreateIssue($repositoryId: ID!, $title: String!, $body: String) {
  createIssue(input: {repositoryId: $repositoryId, title: $title, body: $body}) {
    issue {
      ...IssueFields
    }
  }
}",
    issue_fragment!()
);

pub(crate) const CLOSE_ISSUE: &str = r"
mutation CloseIssue($issueId: ID!) {
  closeIssue(input: {issueId: $issueId}) {
    issue {
      id
    }
  }
}";

pub(crate) const REOPEN_ISSUE: &str = r"
mutation ReopenIssue($issueId: ID!) {
  reopenIssue(input: {issueId: $issueId}) {
    issue {
      id
    }
  }
}";

pub(crate) const ADD_COMMENT: &str = r"
mutation AddIssueComment($subjectId: ID!, $body: String!) {
  addComment(input: {subjectId: $subjectId, body: $body}) {
    commentEdge {
      node {
        id
      }
    }
  }
}";

//! Wire types for the Forge REST API
//!
//! All payloads are JSON with camelCase keys. List endpoints wrap their
//! results in [`Paged`], where an absent `nextPageToken` marks the last
//! page.

use serde::{Deserialize, Serialize};

/// One page of a list response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Paged<T> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A group (namespace) that holds subgroups and projects.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: u64,
    pub name: String,
    /// Canonical path, e.g. `platform/runtime`.
    pub full_path: String,
}

/// A project inside a group.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: u64,
    /// Path component relative to the owning group.
    pub path: String,
    /// Fully-qualified path, e.g. `platform/runtime/api`.
    pub full_path: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request payload for project creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub group_id: u64,
    pub path: String,
    pub description: String,
    pub visibility: String,
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub username: String,
    pub name: String,
    pub email: String,
}

/// A per-project approval rule.
///
/// Reads return the approvers as full [`User`] records; writes go through
/// [`ApprovalRuleUpdate`], which carries ids only.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRule {
    pub id: u64,
    pub name: String,
    pub approvals_required: u32,
    #[serde(default)]
    pub approvers: Vec<User>,
    #[serde(default)]
    pub group_ids: Vec<u64>,
    #[serde(default)]
    pub protected_branch_ids: Vec<u64>,
    #[serde(default)]
    pub applies_to_all_protected_branches: bool,
}

/// Full-record payload for updating an approval rule.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRuleUpdate {
    pub name: String,
    pub approvals_required: u32,
    pub user_ids: Vec<u64>,
    pub group_ids: Vec<u64>,
    pub protected_branch_ids: Vec<u64>,
    pub applies_to_all_protected_branches: bool,
}

impl ApprovalRuleUpdate {
    /// Reconstruct an update payload from an existing rule, substituting
    /// only the approver list.
    pub fn from_rule(rule: &ApprovalRule, user_ids: Vec<u64>) -> Self {
        Self {
            name: rule.name.clone(),
            approvals_required: rule.approvals_required,
            user_ids,
            group_ids: rule.group_ids.clone(),
            protected_branch_ids: rule.protected_branch_ids.clone(),
            applies_to_all_protected_branches: rule.applies_to_all_protected_branches,
        }
    }
}

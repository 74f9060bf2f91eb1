//! Forge client
//!
//! Typed endpoint methods over [`ForgeHttp`]. Every list endpoint takes an
//! opaque page token and returns one [`Paged`] response; callers drive
//! pagination themselves (see `crate::traverse::pager`).

use super::auth::Credentials;
use super::http::{ClientError, ForgeHttp};
use super::types::{ApprovalRule, ApprovalRuleUpdate, Group, NewProject, Paged, Project, User};
use chrono::NaiveDate;

/// Client bound to one Forge instance.
#[derive(Clone)]
pub struct ForgeClient {
    http: ForgeHttp,
}

fn push_page_token(query: &mut Vec<(&'static str, String)>, page_token: Option<&str>) {
    if let Some(token) = page_token {
        query.push(("pageToken", token.to_string()));
    }
}

impl ForgeClient {
    /// Create a client for the given base URL and credentials.
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, ClientError> {
        Ok(Self {
            http: ForgeHttp::new(base_url, credentials)?,
        })
    }

    // =====================================================================
    // Groups
    // =====================================================================

    /// Search groups by name. The service matches substrings; exact-match
    /// filtering is the caller's job.
    pub async fn search_groups(
        &self,
        search: &str,
        page_token: Option<&str>,
    ) -> Result<Paged<Group>, ClientError> {
        let mut query = vec![("search", search.to_string())];
        push_page_token(&mut query, page_token);
        self.http.get_json("api/v1/groups", &query).await
    }

    /// List projects directly in a group, or in its whole subtree when
    /// `include_subgroups` is set.
    pub async fn list_projects(
        &self,
        group_id: u64,
        include_subgroups: bool,
        page_token: Option<&str>,
    ) -> Result<Paged<Project>, ClientError> {
        let mut query = vec![("includeSubgroups", include_subgroups.to_string())];
        push_page_token(&mut query, page_token);
        self.http
            .get_json(&format!("api/v1/groups/{group_id}/projects"), &query)
            .await
    }

    // =====================================================================
    // Projects
    // =====================================================================

    pub async fn create_project(&self, project: &NewProject) -> Result<Project, ClientError> {
        self.http.post_json("api/v1/projects", project).await
    }

    pub async fn delete_project(&self, id: u64) -> Result<(), ClientError> {
        self.http.delete(&format!("api/v1/projects/{id}")).await
    }

    // =====================================================================
    // Approval rules
    // =====================================================================

    pub async fn list_approval_rules(
        &self,
        project_id: u64,
        page_token: Option<&str>,
    ) -> Result<Paged<ApprovalRule>, ClientError> {
        let mut query = Vec::new();
        push_page_token(&mut query, page_token);
        self.http
            .get_json(&format!("api/v1/projects/{project_id}/approval_rules"), &query)
            .await
    }

    pub async fn update_approval_rule(
        &self,
        project_id: u64,
        rule_id: u64,
        update: &ApprovalRuleUpdate,
    ) -> Result<ApprovalRule, ClientError> {
        self.http
            .put_json(
                &format!("api/v1/projects/{project_id}/approval_rules/{rule_id}"),
                update,
            )
            .await
    }

    // =====================================================================
    // Users
    // =====================================================================

    /// Search users by username, name, or e-mail address. An empty search
    /// string matches all users.
    pub async fn search_users(
        &self,
        search: &str,
        created_after: Option<NaiveDate>,
        page_token: Option<&str>,
    ) -> Result<Paged<User>, ClientError> {
        let mut query = Vec::new();
        if !search.is_empty() {
            query.push(("search", search.to_string()));
        }
        if let Some(date) = created_after {
            query.push(("createdAfter", date.format("%Y-%m-%d").to_string()));
        }
        push_page_token(&mut query, page_token);
        self.http.get_json("api/v1/users", &query).await
    }

    pub async fn get_user(&self, id: u64) -> Result<User, ClientError> {
        self.http.get_json(&format!("api/v1/users/{id}"), &[]).await
    }
}

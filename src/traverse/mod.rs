//! Resource traversal
//!
//! Filtered, early-terminating walks over the Forge resource hierarchy,
//! built on lazy page-cursor iteration.
//!
//! # Module Structure
//!
//! - [`pager`] - the page-cursor iterator every walk runs on
//! - this module - root resolution, path filtering, and the
//!   `for_each_*` / `collect_*` entry points
//!
//! Streaming walks must never drive deletion directly: page tokens are
//! defined relative to the current remaining collection, so removing an
//! item invalidates tokens issued before the removal. Deleting callers
//! collect first ([`collect_projects`]) and then mutate the materialized
//! sequence.

pub mod pager;

use chrono::NaiveDate;
use regex::Regex;
use reqwest::StatusCode;
use thiserror::Error;

use crate::forge::types::{ApprovalRule, Group, Project, User};
use crate::forge::{ClientError, ForgeClient};
pub use pager::{Flow, Pager};

/// Why a traversal stopped short.
#[derive(Debug, Error)]
pub enum TraversalError {
    /// The requested root matched nothing exactly.
    #[error("no group found with exact path {name:?}")]
    RootNotFound { name: String },
    /// More than one candidate matched the requested root exactly.
    #[error("multiple matches found for {name:?}: {}", .paths.join(", "))]
    AmbiguousRoot { name: String, paths: Vec<String> },
    /// The filter pattern does not compile.
    #[error("invalid filter pattern {pattern:?}: {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// A backing API call failed; `page` is 1-based.
    #[error("page {page}: {source}")]
    Transport {
        page: u32,
        #[source]
        source: ClientError,
    },
    /// A visitor callback failed.
    #[error("{0}")]
    Visit(anyhow::Error),
}

impl From<anyhow::Error> for TraversalError {
    fn from(err: anyhow::Error) -> Self {
        TraversalError::Visit(err)
    }
}

/// Compiled project filter: a path pattern plus the recursive-descent flag.
///
/// The pattern is matched against fully-qualified paths (`group/sub/proj`),
/// never bare names. An empty pattern matches everything.
#[derive(Debug)]
pub struct Filter {
    pattern: Regex,
    pub recursive: bool,
}

impl Filter {
    pub fn new(expr: &str, recursive: bool) -> Result<Self, TraversalError> {
        let pattern = Regex::new(expr).map_err(|source| TraversalError::InvalidFilter {
            pattern: expr.to_string(),
            source,
        })?;
        Ok(Self { pattern, recursive })
    }

    pub fn matches(&self, full_path: &str) -> bool {
        self.pattern.is_match(full_path)
    }

    pub fn expr(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Resolve a group name to exactly one group.
///
/// The search API matches substrings, so every page is scanned and only
/// candidates whose canonical path equals `name` count. Zero exact matches
/// is [`TraversalError::RootNotFound`]; several (the service allows name
/// collisions across namespaces) is [`TraversalError::AmbiguousRoot`]
/// listing the colliding paths.
pub async fn find_exact_group(client: &ForgeClient, name: &str) -> Result<Group, TraversalError> {
    let mut pager = Pager::new(async |token: Option<String>| {
        client.search_groups(name, token.as_deref()).await
    });

    let mut matches: Vec<Group> = Vec::new();
    pager
        .for_each(async |group: Group| {
            if group.full_path == name {
                matches.push(group);
            }
            Ok(Flow::Continue)
        })
        .await?;

    match matches.len() {
        0 => Err(TraversalError::RootNotFound {
            name: name.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(TraversalError::AmbiguousRoot {
            name: name.to_string(),
            paths: matches.into_iter().map(|g| g.full_path).collect(),
        }),
    }
}

/// Walk the projects under `group`, visiting those whose full path matches
/// the filter.
///
/// The recursive flag is forwarded to the backing API so subgroup projects
/// arrive through the same paginated listing. Early termination follows
/// the pager: a [`Flow::Stop`] verdict or an error halts the walk for
/// good.
pub async fn for_each_project<V>(
    client: &ForgeClient,
    group: &str,
    filter: &Filter,
    mut visit: V,
) -> Result<(), TraversalError>
where
    V: AsyncFnMut(&Group, Project) -> anyhow::Result<Flow>,
{
    let root = find_exact_group(client, group).await?;
    tracing::debug!("resolved group {:?} to id {}", root.full_path, root.id);

    let mut pager = Pager::new(async |token: Option<String>| {
        client
            .list_projects(root.id, filter.recursive, token.as_deref())
            .await
    });

    pager
        .for_each(async |project: Project| {
            if !filter.matches(&project.full_path) {
                return Ok(Flow::Continue);
            }
            match visit(&root, project).await {
                Ok(flow) => Ok(flow),
                Err(err) => Err(TraversalError::Visit(err)),
            }
        })
        .await
}

/// Collect every matching project into one in-memory sequence.
///
/// Required before bulk deletion: the materialized sequence is immutable,
/// so deleting from it cannot disturb pagination the way deleting during a
/// streaming walk would.
pub async fn collect_projects(
    client: &ForgeClient,
    group: &str,
    filter: &Filter,
) -> Result<Vec<Project>, TraversalError> {
    let mut projects = Vec::new();
    for_each_project(client, group, filter, async |_group: &Group, project: Project| {
        projects.push(project);
        Ok(Flow::Continue)
    })
    .await?;
    Ok(projects)
}

/// Walk the approval rules of one project.
pub async fn for_each_rule<V>(
    client: &ForgeClient,
    project_id: u64,
    mut visit: V,
) -> Result<(), TraversalError>
where
    V: AsyncFnMut(ApprovalRule) -> anyhow::Result<Flow>,
{
    let mut pager = Pager::new(async |token: Option<String>| {
        client.list_approval_rules(project_id, token.as_deref()).await
    });

    pager
        .for_each(async |rule: ApprovalRule| match visit(rule).await {
            Ok(flow) => Ok(flow),
            Err(err) => Err(TraversalError::Visit(err)),
        })
        .await
}

/// Collect one project's approval rules before mutating them; same
/// pagination-invalidation argument as [`collect_projects`].
pub async fn collect_rules(
    client: &ForgeClient,
    project_id: u64,
) -> Result<Vec<ApprovalRule>, TraversalError> {
    let mut rules = Vec::new();
    for_each_rule(client, project_id, async |rule: ApprovalRule| {
        rules.push(rule);
        Ok(Flow::Continue)
    })
    .await?;
    Ok(rules)
}

/// Walk users matching a search string (empty matches all), optionally
/// restricted to accounts created after a date.
pub async fn for_each_user<V>(
    client: &ForgeClient,
    search: &str,
    created_after: Option<NaiveDate>,
    mut visit: V,
) -> Result<(), TraversalError>
where
    V: AsyncFnMut(User) -> anyhow::Result<Flow>,
{
    let mut pager = Pager::new(async |token: Option<String>| {
        client
            .search_users(search, created_after, token.as_deref())
            .await
    });

    pager
        .for_each(async |user: User| match visit(user).await {
            Ok(flow) => Ok(flow),
            Err(err) => Err(TraversalError::Visit(err)),
        })
        .await
}

/// Resolve a user query to exactly one user.
///
/// A numeric query is a user id and is fetched directly. Anything else is
/// searched, then filtered client-side for exact equality against
/// username, name, or e-mail address, with the same zero/many taxonomy as
/// [`find_exact_group`].
pub async fn find_exact_user(
    client: &ForgeClient,
    query: &str,
    created_after: Option<NaiveDate>,
) -> Result<User, TraversalError> {
    if let Ok(id) = query.parse::<u64>() {
        return client.get_user(id).await.map_err(|source| match source {
            ClientError::Http { status, .. } if status == StatusCode::NOT_FOUND => {
                TraversalError::RootNotFound {
                    name: query.to_string(),
                }
            }
            source => TraversalError::Transport { page: 1, source },
        });
    }

    let mut matches: Vec<User> = Vec::new();
    for_each_user(client, query, created_after, async |user: User| {
        if user.username == query || user.name == query || user.email == query {
            matches.push(user);
        }
        Ok(Flow::Continue)
    })
    .await?;

    match matches.len() {
        0 => Err(TraversalError::RootNotFound {
            name: query.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(TraversalError::AmbiguousRoot {
            name: query.to_string(),
            paths: matches.into_iter().map(|u| u.username).collect(),
        }),
    }
}

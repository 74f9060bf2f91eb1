//! Users roster file
//!
//! The YAML roster written by `users list --out` and consumed by
//! `projects approval-rules update --approvers`. Writing to an existing
//! file merges: the original order is kept, entries re-looked-up replace
//! their old record (matched by username), and new entries are appended.
//! Writes go through a sibling temp file and an atomic rename.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::forge::types::User;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Roster {
    #[serde(default)]
    users: Vec<User>,
}

/// Read the roster at `path`. Missing or malformed files are errors.
pub fn read_users(path: &Path) -> Result<Vec<User>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read users file {}", path.display()))?;
    let roster: Roster = serde_yaml::from_str(&content)
        .with_context(|| format!("malformed users file {}", path.display()))?;
    Ok(roster.users)
}

/// Write `users` to `dest`, merging into an existing roster.
///
/// `dest` of `-` writes plain YAML to stdout without merging. A duplicate
/// username inside `users` itself is an error.
pub fn write_users(dest: &str, users: &[User]) -> Result<()> {
    if dest.is_empty() {
        bail!("invalid output file name: {:?}", dest);
    }

    let duplicates = duplicate_usernames(users);
    if !duplicates.is_empty() {
        bail!("duplicate users in output set: {}", duplicates.join(", "));
    }

    let merged = if dest == "-" {
        users.to_vec()
    } else {
        merge_into_existing(Path::new(dest), users)
    };

    let content = serde_yaml::to_string(&Roster { users: merged })?;

    if dest == "-" {
        print!("{content}");
        return Ok(());
    }

    let path = Path::new(dest);
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, &content)
        .with_context(|| format!("unable to write users file {}", tmp.display()))?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err).with_context(|| format!("unable to move users file into {}", dest));
    }

    Ok(())
}

fn duplicate_usernames(users: &[User]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for user in users {
        *counts.entry(user.username.as_str()).or_insert(0) += 1;
    }
    let mut duplicates: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect();
    duplicates.sort();
    duplicates
}

/// Overlay `new_users` onto the roster already at `path`. A missing or
/// unreadable file merges as empty.
fn merge_into_existing(path: &Path, new_users: &[User]) -> Vec<User> {
    let original = read_users(path).unwrap_or_default();
    let replaced: HashSet<&str> = new_users.iter().map(|u| u.username.as_str()).collect();

    let mut merged: Vec<User> = original
        .into_iter()
        .filter(|u| !replaced.contains(u.username.as_str()))
        .collect();
    merged.extend(new_users.iter().cloned());
    merged
}

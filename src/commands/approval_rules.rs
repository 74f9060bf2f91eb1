//! `projects approval-rules` subcommands: list, update.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::commands::{Action, Context, Node};
use crate::forge::types::{ApprovalRule, ApprovalRuleUpdate, Group, Project, User};
use crate::mutate::{failed_count, Mutator};
use crate::options::{apply_bool, apply_string, bool_flag, from_cli, require_set, OptionSet, Options};
use crate::traverse::{self, Filter, Flow};
use crate::userfile;

fn group_arg() -> Arg {
    Arg::new("group")
        .short('g')
        .long("group")
        .value_name("PATH")
        .help("full path of the group to operate on")
}

fn expr_arg() -> Arg {
    Arg::new("expr")
        .short('e')
        .long("expr")
        .value_name("REGEX")
        .help("only touch projects whose full path matches this pattern")
}

/// 64-bit digest of an approver set so an operator can eyeball which
/// rules share one: first 8 bytes of the SHA-256 over the sorted,
/// newline-joined usernames. Display only.
pub fn approver_fingerprint(approvers: &[User]) -> u64 {
    let mut names: Vec<&str> = approvers.iter().map(|u| u.username.as_str()).collect();
    names.sort_unstable();
    let digest = Sha256::digest(names.join("\n"));
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

// =========================================================================
// approval-rules list
// =========================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RulesListOptions {
    pub group: String,
    pub expr: String,
    pub recursive: bool,
}

impl OptionSet for RulesListOptions {
    fn register(cmd: Command) -> Command {
        cmd.arg(group_arg())
            .arg(expr_arg())
            .arg(bool_flag("recursive", Some('r'), "include projects in subgroups"))
    }

    fn apply(&mut self, matches: &ArgMatches) {
        apply_string(matches, "group", &mut self.group);
        apply_string(matches, "expr", &mut self.expr);
        apply_bool(matches, "recursive", &mut self.recursive);
    }
}

struct ListRules;

impl Action for ListRules {
    type Opts = RulesListOptions;

    fn name(&self) -> &'static str {
        "list"
    }

    fn path(&self) -> &'static str {
        "projects approval-rules list"
    }

    fn about(&self) -> &'static str {
        "list approval rules of matching projects"
    }

    fn opts<'o>(&self, options: &'o Options) -> &'o RulesListOptions {
        &options.projects.approval_rules.list
    }

    fn opts_mut<'o>(&self, options: &'o mut Options) -> &'o mut RulesListOptions {
        &mut options.projects.approval_rules.list
    }

    fn validate(&self, opts: &RulesListOptions) -> Result<()> {
        require_set(&opts.group, "--group")
    }

    async fn execute(&self, ctx: &Context, options: &Options) -> Result<()> {
        let opts = self.opts(options);
        let filter = Filter::new(&opts.expr, opts.recursive)?;

        traverse::for_each_project(
            &ctx.client,
            &opts.group,
            &filter,
            async |_group: &Group, project: Project| {
                println!("{}:", project.full_path);
                traverse::for_each_rule(&ctx.client, project.id, async |rule: ApprovalRule| {
                    let fingerprint = approver_fingerprint(&rule.approvers);
                    let mut names: Vec<&str> =
                        rule.approvers.iter().map(|u| u.username.as_str()).collect();
                    names.sort_unstable();
                    let approvers = if names.is_empty() {
                        "-".to_string()
                    } else {
                        names.join(", ")
                    };
                    println!(
                        "  {} (rule {}): requires {}, fingerprint {:016x}, approvers: {}",
                        rule.name, rule.id, rule.approvals_required, fingerprint, approvers,
                    );
                    Ok(Flow::Continue)
                })
                .await?;
                Ok(Flow::Continue)
            },
        )
        .await?;
        Ok(())
    }
}

pub fn list() -> Node {
    Node::Leaf(Box::new(ListRules))
}

// =========================================================================
// approval-rules update
// =========================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RulesUpdateOptions {
    pub group: String,
    /// Roster file naming the replacement approvers.
    pub approvers: Option<PathBuf>,
    pub expr: String,
    pub recursive: bool,
    pub dry_run: bool,
    pub fail_fast: bool,
}

impl OptionSet for RulesUpdateOptions {
    fn register(cmd: Command) -> Command {
        cmd.arg(group_arg())
            .arg(
                Arg::new("approvers")
                    .short('a')
                    .long("approvers")
                    .value_name("FILE")
                    .help("roster file with the replacement approvers")
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(expr_arg())
            .arg(bool_flag("recursive", Some('r'), "include projects in subgroups"))
            .arg(bool_flag("dry-run", Some('n'), "report what would change without applying it"))
            .arg(bool_flag("fail-fast", None, "abort at the first failed mutation"))
    }

    fn apply(&mut self, matches: &ArgMatches) {
        apply_string(matches, "group", &mut self.group);
        if from_cli(matches, "approvers") {
            self.approvers = matches.get_one::<PathBuf>("approvers").cloned();
        }
        apply_string(matches, "expr", &mut self.expr);
        apply_bool(matches, "recursive", &mut self.recursive);
        apply_bool(matches, "dry-run", &mut self.dry_run);
        apply_bool(matches, "fail-fast", &mut self.fail_fast);
    }
}

struct UpdateRules;

impl Action for UpdateRules {
    type Opts = RulesUpdateOptions;

    fn name(&self) -> &'static str {
        "update"
    }

    fn path(&self) -> &'static str {
        "projects approval-rules update"
    }

    fn about(&self) -> &'static str {
        "replace the approvers of every rule of matching projects"
    }

    fn opts<'o>(&self, options: &'o Options) -> &'o RulesUpdateOptions {
        &options.projects.approval_rules.update
    }

    fn opts_mut<'o>(&self, options: &'o mut Options) -> &'o mut RulesUpdateOptions {
        &mut options.projects.approval_rules.update
    }

    fn validate(&self, opts: &RulesUpdateOptions) -> Result<()> {
        require_set(&opts.group, "--group")?;
        if opts.approvers.is_none() {
            bail!("--approvers must be set (flag or config file)");
        }
        Ok(())
    }

    async fn execute(&self, ctx: &Context, options: &Options) -> Result<()> {
        let opts = self.opts(options);
        let Some(roster_path) = &opts.approvers else {
            bail!("--approvers must be set (flag or config file)");
        };
        let approvers = userfile::read_users(roster_path)?;
        let user_ids: Vec<u64> = approvers.iter().map(|u| u.id).collect();
        tracing::debug!("replacement approver set has {} users", user_ids.len());

        let filter = Filter::new(&opts.expr, opts.recursive)?;
        let mutator = Mutator::new(opts.dry_run, opts.fail_fast);
        let mut attempted = 0usize;
        let mut failed = 0usize;

        traverse::for_each_project(
            &ctx.client,
            &opts.group,
            &filter,
            async |_group: &Group, project: Project| {
                // Updates do not shrink the rule listing, but collecting
                // per project keeps the mutation loop off the page cursor.
                let rules = traverse::collect_rules(&ctx.client, project.id).await?;
                let reports = mutator
                    .apply(
                        &rules,
                        |rule: &ApprovalRule| format!("{} rule {}", project.full_path, rule.name),
                        async |rule: &ApprovalRule| {
                            let update = ApprovalRuleUpdate::from_rule(rule, user_ids.clone());
                            ctx.client
                                .update_approval_rule(project.id, rule.id, &update)
                                .await?;
                            Ok(())
                        },
                    )
                    .await?;
                attempted += reports.len();
                failed += failed_count(&reports);
                Ok(Flow::Continue)
            },
        )
        .await?;

        if failed > 0 {
            bail!("{failed} of {attempted} rules failed to update");
        }
        Ok(())
    }
}

pub fn update() -> Node {
    Node::Leaf(Box::new(UpdateRules))
}

//! `projects` subcommands: list, create-random, delete.

use anyhow::{bail, Result};
use clap::{Arg, ArgMatches, Command};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commands::{Action, Context, Node};
use crate::forge::types::{Group, NewProject, Project};
use crate::mutate::{failed_count, Mutator};
use crate::options::{apply_bool, apply_string, bool_flag, from_cli, require_set, OptionSet, Options};
use crate::traverse::{self, Filter, Flow};

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

fn recursive_arg() -> Arg {
    bool_flag("recursive", Some('r'), "include projects in subgroups")
}

fn dry_run_arg() -> Arg {
    bool_flag("dry-run", Some('n'), "report what would change without applying it")
}

fn fail_fast_arg() -> Arg {
    bool_flag("fail-fast", None, "abort at the first failed mutation")
}

// =========================================================================
// projects list
// =========================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProjectsListOptions {
    pub group: String,
    pub expr: String,
    pub recursive: bool,
}

impl OptionSet for ProjectsListOptions {
    fn register(cmd: Command) -> Command {
        cmd.arg(group_arg()).arg(expr_arg()).arg(recursive_arg())
    }

    fn apply(&mut self, matches: &ArgMatches) {
        apply_string(matches, "group", &mut self.group);
        apply_string(matches, "expr", &mut self.expr);
        apply_bool(matches, "recursive", &mut self.recursive);
    }
}

struct ListProjects;

impl Action for ListProjects {
    type Opts = ProjectsListOptions;

    fn name(&self) -> &'static str {
        "list"
    }

    fn path(&self) -> &'static str {
        "projects list"
    }

    fn about(&self) -> &'static str {
        "list projects under a group"
    }

    fn opts<'o>(&self, options: &'o Options) -> &'o ProjectsListOptions {
        &options.projects.list
    }

    fn opts_mut<'o>(&self, options: &'o mut Options) -> &'o mut ProjectsListOptions {
        &mut options.projects.list
    }

    fn validate(&self, opts: &ProjectsListOptions) -> Result<()> {
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
                println!("{}: {}", project.id, project.full_path);
                Ok(Flow::Continue)
            },
        )
        .await?;
        Ok(())
    }
}

pub fn list() -> Node {
    Node::Leaf(Box::new(ListProjects))
}

// =========================================================================
// projects create-random
// =========================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CreateRandomOptions {
    pub group: String,
    pub base_name: String,
    pub count: u64,
    pub dry_run: bool,
    pub fail_fast: bool,
}

impl OptionSet for CreateRandomOptions {
    fn register(cmd: Command) -> Command {
        cmd.arg(group_arg())
            .arg(
                Arg::new("base-name")
                    .short('b')
                    .long("base-name")
                    .value_name("NAME")
                    .help("prefix for the generated project names"),
            )
            .arg(
                Arg::new("count")
                    .short('c')
                    .long("count")
                    .value_name("N")
                    .help("how many projects to create")
                    .value_parser(clap::value_parser!(u64)),
            )
            .arg(dry_run_arg())
            .arg(fail_fast_arg())
    }

    fn apply(&mut self, matches: &ArgMatches) {
        apply_string(matches, "group", &mut self.group);
        apply_string(matches, "base-name", &mut self.base_name);
        if from_cli(matches, "count") {
            if let Some(count) = matches.get_one::<u64>("count") {
                self.count = *count;
            }
        }
        apply_bool(matches, "dry-run", &mut self.dry_run);
        apply_bool(matches, "fail-fast", &mut self.fail_fast);
    }
}

/// Names generated for a create-random batch: the base plus a random
/// v4 UUID suffix, fixed before the first request so a dry run prints
/// exactly the names a real run would use.
pub fn random_names(base: &str, count: u64) -> Vec<String> {
    (0..count)
        .map(|_| format!("{base}-{}", Uuid::new_v4()))
        .collect()
}

struct CreateRandom;

impl Action for CreateRandom {
    type Opts = CreateRandomOptions;

    fn name(&self) -> &'static str {
        "create-random"
    }

    fn path(&self) -> &'static str {
        "projects create-random"
    }

    fn about(&self) -> &'static str {
        "create randomly named projects under a group"
    }

    fn opts<'o>(&self, options: &'o Options) -> &'o CreateRandomOptions {
        &options.projects.create_random
    }

    fn opts_mut<'o>(&self, options: &'o mut Options) -> &'o mut CreateRandomOptions {
        &mut options.projects.create_random
    }

    fn validate(&self, opts: &CreateRandomOptions) -> Result<()> {
        require_set(&opts.group, "--group")?;
        require_set(&opts.base_name, "--base-name")?;
        if opts.count == 0 {
            bail!("--count must be at least 1");
        }
        Ok(())
    }

    async fn execute(&self, ctx: &Context, options: &Options) -> Result<()> {
        let opts = self.opts(options);
        let group = traverse::find_exact_group(&ctx.client, &opts.group).await?;
        let names = random_names(&opts.base_name, opts.count);

        let mutator = Mutator::new(opts.dry_run, opts.fail_fast);
        let reports = mutator
            .apply(&names, |name: &String| name.clone(), async |name: &String| {
                let project = NewProject {
                    group_id: group.id,
                    path: name.clone(),
                    description: "Test project".to_string(),
                    visibility: "public".to_string(),
                };
                ctx.client.create_project(&project).await?;
                Ok(())
            })
            .await?;

        let failed = failed_count(&reports);
        if failed > 0 {
            bail!("{failed} of {} projects failed to create", reports.len());
        }
        Ok(())
    }
}

pub fn create_random() -> Node {
    Node::Leaf(Box::new(CreateRandom))
}

// =========================================================================
// projects delete
// =========================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DeleteOptions {
    pub group: String,
    pub expr: String,
    pub recursive: bool,
    pub dry_run: bool,
    pub fail_fast: bool,
}

impl OptionSet for DeleteOptions {
    fn register(cmd: Command) -> Command {
        cmd.arg(group_arg())
            .arg(expr_arg())
            .arg(recursive_arg())
            .arg(dry_run_arg())
            .arg(fail_fast_arg())
    }

    fn apply(&mut self, matches: &ArgMatches) {
        apply_string(matches, "group", &mut self.group);
        apply_string(matches, "expr", &mut self.expr);
        apply_bool(matches, "recursive", &mut self.recursive);
        apply_bool(matches, "dry-run", &mut self.dry_run);
        apply_bool(matches, "fail-fast", &mut self.fail_fast);
    }
}

struct DeleteProjects;

impl Action for DeleteProjects {
    type Opts = DeleteOptions;

    fn name(&self) -> &'static str {
        "delete"
    }

    fn path(&self) -> &'static str {
        "projects delete"
    }

    fn about(&self) -> &'static str {
        "delete matching projects under a group"
    }

    fn opts<'o>(&self, options: &'o Options) -> &'o DeleteOptions {
        &options.projects.delete
    }

    fn opts_mut<'o>(&self, options: &'o mut Options) -> &'o mut DeleteOptions {
        &mut options.projects.delete
    }

    fn validate(&self, opts: &DeleteOptions) -> Result<()> {
        require_set(&opts.group, "--group")
    }

    async fn execute(&self, ctx: &Context, options: &Options) -> Result<()> {
        let opts = self.opts(options);
        let filter = Filter::new(&opts.expr, opts.recursive)?;

        // Deleting while paging would invalidate the server's page tokens,
        // so the full match list is materialized before the first delete.
        let projects = traverse::collect_projects(&ctx.client, &opts.group, &filter).await?;
        tracing::debug!("{} projects matched", projects.len());

        let mutator = Mutator::new(opts.dry_run, opts.fail_fast);
        let reports = mutator
            .apply(
                &projects,
                |project: &Project| project.full_path.clone(),
                async |project: &Project| {
                    ctx.client.delete_project(project.id).await?;
                    Ok(())
                },
            )
            .await?;

        let failed = failed_count(&reports);
        if failed > 0 {
            bail!("{failed} of {} projects failed to delete", reports.len());
        }
        Ok(())
    }
}

pub fn delete() -> Node {
    Node::Leaf(Box::new(DeleteProjects))
}

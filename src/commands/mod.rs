//! Command tree and dispatch
//!
//! Commands form a tree of parent nodes and leaves. Parents hold a map
//! from child name to a generator function; the tree is materialized once
//! per process by invoking each generator exactly one time, and usage
//! listings come straight from the map keys so help never triggers a
//! generator.
//!
//! Dispatch walks the tree level by level: each scope parses exactly the
//! flags it owns with clap, copies CLI-supplied values onto the options
//! tree, then hands the unparsed remainder to the named child. The walk
//! itself is synchronous; only the resolved leaf's `run` is async.

pub mod approval_rules;
pub mod projects;
pub mod users;

use std::collections::BTreeMap;

use anyhow::Result;
use clap::{value_parser, ArgMatches, Command};
use futures::future::LocalBoxFuture;
use thiserror::Error;

use crate::forge::ForgeClient;
use crate::options::{GlobalOptions, OptionSet, Options};

/// Shared handles passed to every executing command.
pub struct Context {
    pub client: ForgeClient,
}

/// Builds one child node on demand.
pub type Generator = fn() -> Node;

pub enum Node {
    Parent(ParentNode),
    Leaf(Box<dyn Leaf>),
}

/// A leaf command as the dispatcher sees it.
pub trait Leaf {
    fn name(&self) -> &'static str;
    /// Full command path, `projects list` style, for error messages.
    fn path(&self) -> &'static str;
    fn about(&self) -> &'static str;
    /// The clap command for this scope, flags included.
    fn command(&self) -> Command;
    /// Copy CLI-supplied flags onto the options tree.
    fn apply(&self, options: &mut Options, matches: &ArgMatches);
    /// Check required fields after full resolution.
    fn validate(&self, options: &Options) -> Result<()>;
    fn run<'a>(&'a self, ctx: &'a Context, options: &'a Options) -> LocalBoxFuture<'a, Result<()>>;
}

/// A leaf command as implementations write it: a typed options substruct
/// plus an async body. The blanket [`Leaf`] impl supplies the dispatch
/// plumbing.
pub trait Action {
    type Opts: OptionSet;

    fn name(&self) -> &'static str;
    fn path(&self) -> &'static str;
    fn about(&self) -> &'static str;
    fn opts<'o>(&self, options: &'o Options) -> &'o Self::Opts;
    fn opts_mut<'o>(&self, options: &'o mut Options) -> &'o mut Self::Opts;

    fn validate(&self, _opts: &Self::Opts) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, ctx: &Context, options: &Options) -> Result<()>;
}

impl<A: Action + 'static> Leaf for A {
    fn name(&self) -> &'static str {
        Action::name(self)
    }

    fn path(&self) -> &'static str {
        Action::path(self)
    }

    fn about(&self) -> &'static str {
        Action::about(self)
    }

    fn command(&self) -> Command {
        A::Opts::register(
            Command::new(Action::name(self))
                .about(Action::about(self))
                .no_binary_name(true),
        )
    }

    fn apply(&self, options: &mut Options, matches: &ArgMatches) {
        self.opts_mut(options).apply(matches);
    }

    fn validate(&self, options: &Options) -> Result<()> {
        Action::validate(self, self.opts(options))
    }

    fn run<'a>(&'a self, ctx: &'a Context, options: &'a Options) -> LocalBoxFuture<'a, Result<()>> {
        Box::pin(self.execute(ctx, options))
    }
}

/// An inner node: its own flag scope plus a generator per child.
pub struct ParentNode {
    name: &'static str,
    about: &'static str,
    register: Option<fn(Command) -> Command>,
    apply: Option<fn(&mut Options, &ArgMatches)>,
    generators: BTreeMap<&'static str, Generator>,
    children: BTreeMap<&'static str, Node>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("missing subcommand\n\n{usage}")]
    MissingSubcommand { usage: String },
    #[error("unknown subcommand {name:?} (expected one of: {expected})")]
    UnknownSubcommand { name: String, expected: String },
    #[error(transparent)]
    Usage(#[from] clap::Error),
}

/// Result of a dispatch walk that did not error.
pub enum Dispatch<'t> {
    /// The resolved leaf; its scope flags are already applied.
    Command(&'t dyn Leaf),
    /// Help was requested and printed somewhere along the path.
    HelpShown,
}

impl std::fmt::Debug for Dispatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatch::Command(leaf) => f.debug_tuple("Command").field(&leaf.name()).finish(),
            Dispatch::HelpShown => f.write_str("HelpShown"),
        }
    }
}

impl ParentNode {
    pub fn new(name: &'static str, about: &'static str) -> Self {
        Self {
            name,
            about,
            register: None,
            apply: None,
            generators: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    /// Attach this scope's own flag set.
    pub fn options(
        mut self,
        register: fn(Command) -> Command,
        apply: fn(&mut Options, &ArgMatches),
    ) -> Self {
        self.register = Some(register);
        self.apply = Some(apply);
        self
    }

    pub fn child(mut self, name: &'static str, generator: Generator) -> Self {
        self.generators.insert(name, generator);
        self
    }

    /// Child names straight from the generator map. Never invokes a
    /// generator.
    pub fn child_names(&self) -> Vec<&'static str> {
        self.generators.keys().copied().collect()
    }

    /// Invoke every generator once, recursively, and memoize the result.
    /// Dispatch only ever looks at the memoized children.
    pub fn materialize(&mut self) {
        for (name, generator) in &self.generators {
            let mut node = generator();
            if let Node::Parent(parent) = &mut node {
                parent.materialize();
            }
            self.children.insert(*name, node);
        }
    }

    /// The clap command for this scope. Child names are listed in the
    /// trailing help block; actual subcommand routing stays in
    /// [`ParentNode::dispatch`].
    pub fn clap_command(&self) -> Command {
        let mut cmd = Command::new(self.name)
            .about(self.about)
            .no_binary_name(true)
            .disable_help_subcommand(true)
            .allow_external_subcommands(true)
            .external_subcommand_value_parser(value_parser!(String))
            .after_help(self.usage_block());
        if let Some(register) = self.register {
            cmd = register(cmd);
        }
        cmd
    }

    fn usage_block(&self) -> String {
        let mut block = String::from("Commands:\n");
        for name in self.generators.keys() {
            block.push_str("  ");
            block.push_str(name);
            block.push('\n');
        }
        block
    }

    /// Rendered help text, used for missing-subcommand errors.
    pub fn render_usage(&self) -> String {
        self.clap_command().render_help().to_string()
    }

    /// Walk the tree with `argv` (binary name already stripped), applying
    /// each scope's CLI flags onto `options` along the way.
    pub fn dispatch<'t>(
        &'t self,
        options: &mut Options,
        argv: &[String],
    ) -> Result<Dispatch<'t>, DispatchError> {
        let Some(matches) = parse_scope(self.clap_command(), argv)? else {
            return Ok(Dispatch::HelpShown);
        };
        if let Some(apply) = self.apply {
            apply(options, &matches);
        }

        let Some((name, sub)) = matches.subcommand() else {
            return Err(DispatchError::MissingSubcommand {
                usage: self.render_usage(),
            });
        };
        let tail: Vec<String> = sub
            .get_many::<String>("")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        match self.children.get(name) {
            None => Err(DispatchError::UnknownSubcommand {
                name: name.to_string(),
                expected: self.child_names().join(", "),
            }),
            Some(Node::Parent(parent)) => parent.dispatch(options, &tail),
            Some(Node::Leaf(leaf)) => {
                let Some(matches) = parse_scope(leaf.command(), &tail)? else {
                    return Ok(Dispatch::HelpShown);
                };
                leaf.apply(options, &matches);
                Ok(Dispatch::Command(leaf.as_ref()))
            }
        }
    }
}

/// Parse one scope's flags. Help requests are printed here and reported
/// as `None`; real parse failures become usage errors.
fn parse_scope(cmd: Command, argv: &[String]) -> Result<Option<ArgMatches>, DispatchError> {
    match cmd.try_get_matches_from(argv) {
        Ok(matches) => Ok(Some(matches)),
        Err(err) if err.kind() == clap::error::ErrorKind::DisplayHelp => {
            err.print().ok();
            Ok(None)
        }
        Err(err) => Err(DispatchError::Usage(err)),
    }
}

fn apply_global(options: &mut Options, matches: &ArgMatches) {
    options.global.apply(matches);
}

fn projects_node() -> Node {
    Node::Parent(
        ParentNode::new("projects", "work with projects under a group")
            .child("list", projects::list)
            .child("create-random", projects::create_random)
            .child("delete", projects::delete)
            .child("approval-rules", approval_rules_node),
    )
}

fn approval_rules_node() -> Node {
    Node::Parent(
        ParentNode::new("approval-rules", "work with per-project approval rules")
            .child("list", approval_rules::list)
            .child("update", approval_rules::update),
    )
}

fn users_node() -> Node {
    Node::Parent(
        ParentNode::new("users", "look up service users").child("list", users::list),
    )
}

/// The full command tree.
pub fn root() -> ParentNode {
    ParentNode::new("forgectl", "administration utility for a Forge service")
        .options(GlobalOptions::register, apply_global)
        .child("projects", projects_node)
        .child("users", users_node)
}

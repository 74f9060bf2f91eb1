//! `users` subcommands: list.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::{Deserialize, Serialize};

use crate::commands::{Action, Context, Node};
use crate::forge::types::User;
use crate::options::{apply_string, from_cli, OptionSet, Options};
use crate::traverse;
use crate::userfile;

/// Accepts `2024-01-02` and `2024/01/02`.
fn parse_date(value: &str) -> Result<NaiveDate, String> {
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date);
        }
    }
    Err(format!(
        "invalid date {value:?}, expected YYYY-MM-DD or YYYY/MM/DD"
    ))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UsersListOptions {
    /// Ids, usernames, display names, or e-mail addresses.
    pub users: Vec<String>,
    pub created_after: Option<NaiveDate>,
    /// Roster file to write; `-` for stdout, empty for no output file.
    pub out: String,
}

impl OptionSet for UsersListOptions {
    fn register(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("users")
                .short('u')
                .long("users")
                .value_name("LIST")
                .help("comma-separated user ids, usernames, names, or e-mail addresses")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("created-after")
                .long("created-after")
                .value_name("DATE")
                .help("only match users created on or after this date")
                .value_parser(parse_date),
        )
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_name("FILE")
                .help("write matches as a roster file (- for stdout)"),
        )
    }

    fn apply(&mut self, matches: &ArgMatches) {
        if from_cli(matches, "users") {
            self.users = matches
                .get_many::<String>("users")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
        }
        if from_cli(matches, "created-after") {
            self.created_after = matches.get_one::<NaiveDate>("created-after").copied();
        }
        apply_string(matches, "out", &mut self.out);
    }
}

struct ListUsers;

impl Action for ListUsers {
    type Opts = UsersListOptions;

    fn name(&self) -> &'static str {
        "list"
    }

    fn path(&self) -> &'static str {
        "users list"
    }

    fn about(&self) -> &'static str {
        "look up users and optionally write a roster file"
    }

    fn opts<'o>(&self, options: &'o Options) -> &'o UsersListOptions {
        &options.users.list
    }

    fn opts_mut<'o>(&self, options: &'o mut Options) -> &'o mut UsersListOptions {
        &mut options.users.list
    }

    async fn execute(&self, ctx: &Context, options: &Options) -> Result<()> {
        let opts = self.opts(options);
        let mut found: Vec<User> = Vec::with_capacity(opts.users.len());

        for query in &opts.users {
            let query = query.trim();
            if query.is_empty() {
                continue;
            }
            if query.contains('@') {
                eprintln!(
                    "warning: {query:?} is an e-mail address; the search API may need \
                     administrator rights to match it"
                );
            }
            let user = traverse::find_exact_user(&ctx.client, query, opts.created_after).await?;
            println!("{}: {} ({}, {})", user.id, user.username, user.name, user.email);
            found.push(user);
        }

        if !opts.out.is_empty() {
            userfile::write_users(&opts.out, &found)?;
        }
        Ok(())
    }
}

pub fn list() -> Node {
    Node::Leaf(Box::new(ListUsers))
}

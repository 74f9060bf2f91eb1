//! Bulk mutation
//!
//! Applies one mutation (create, delete, update) to each item of a
//! materialized sequence, honoring a dry-run flag. Items are independent:
//! a per-item failure is recorded and the batch continues, unless the
//! caller asked for fail-fast. Progress is printed as it happens; the
//! accumulated reports are returned so the caller can pick an exit code.

use std::io::Write;

use anyhow::Context;

/// What happened to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    SkippedDryRun,
    Failed,
}

/// Per-item record of a bulk run.
#[derive(Debug, Clone)]
pub struct MutationReport {
    pub id: String,
    pub outcome: Outcome,
    pub error: Option<String>,
}

/// Number of `Failed` entries in a report sequence.
pub fn failed_count(reports: &[MutationReport]) -> usize {
    reports
        .iter()
        .filter(|r| r.outcome == Outcome::Failed)
        .count()
}

/// Bulk mutation driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mutator {
    pub dry_run: bool,
    pub fail_fast: bool,
}

impl Mutator {
    pub fn new(dry_run: bool, fail_fast: bool) -> Self {
        Self { dry_run, fail_fast }
    }

    /// Apply `op` to every item in order.
    ///
    /// Under dry-run each item yields a `SkippedDryRun` report and `op` is
    /// never invoked, so no network call happens. Otherwise failures are
    /// recorded per item and the loop continues; with `fail_fast` the
    /// first failure aborts the batch with an aggregate error instead.
    pub async fn apply<T, D, Op>(
        &self,
        items: &[T],
        describe: D,
        mut op: Op,
    ) -> anyhow::Result<Vec<MutationReport>>
    where
        D: Fn(&T) -> String,
        Op: AsyncFnMut(&T) -> anyhow::Result<()>,
    {
        let mut reports = Vec::with_capacity(items.len());

        for item in items {
            let id = describe(item);
            print!("- {id} ... ");
            let _ = std::io::stdout().flush();

            if self.dry_run {
                println!("skipped (dry-run)");
                reports.push(MutationReport {
                    id,
                    outcome: Outcome::SkippedDryRun,
                    error: None,
                });
                continue;
            }

            match op(item).await {
                Ok(()) => {
                    println!("done");
                    reports.push(MutationReport {
                        id,
                        outcome: Outcome::Applied,
                        error: None,
                    });
                }
                Err(err) => {
                    println!("FAILED: {err:#}");
                    if self.fail_fast {
                        return Err(err)
                            .with_context(|| format!("aborted after failed mutation of {id}"));
                    }
                    reports.push(MutationReport {
                        id,
                        outcome: Outcome::Failed,
                        error: Some(format!("{err:#}")),
                    });
                }
            }
        }

        Ok(reports)
    }
}

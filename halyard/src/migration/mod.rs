//! Blue/green schema migration
//!
//! Changing a field's type requires a new index. The engine moves an index
//! to a new mapping without downtime by:
//!
//! 1. resolving the index behind the read alias
//! 2. reading its mapping
//! 3. computing the new mapping
//! 4. creating the next generation of the index with it
//! 5. moving the write alias, so new documents land in the new index
//! 6. reindexing existing documents into it
//! 7. moving the read alias
//! 8. confirming both aliases now point at the new index
//!
//! There is no rollback. A failure before step 5, or a write alias update
//! the engine answered with a rejection, leaves the old index serving (plus
//! possibly an unused new one). An unanswered write alias update, or any
//! failure from step 6 on, may leave the aliases split and is reported as
//! [`Error::PartialMigration`](crate::Error::PartialMigration) with the
//! believed alias targets, so an operator can finish or revert by hand.

mod plan;

pub use plan::{next_index_name, plan_mapping, KEYWORD_IGNORE_ABOVE, KEYWORD_SUBFIELD};

use crate::config::MigrationConfig;
use crate::error::{Error, Result};
use crate::model::{IndexIdentity, IndexSettings};
use chrono::{DateTime, Utc};
use halyard_es::admin::{CreateIndexRequest, ReindexRequest, UpdateAliasesRequest};
use halyard_es::mapping::TypeMapping;
use halyard_es::{EngineClient, EngineError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Protocol step, numbered as in the module docs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStep {
    ResolveCurrent,
    ReadMapping,
    ComputeMapping,
    CreateIndex,
    SwapWriteAlias,
    Reindex,
    SwapReadAlias,
    Reconcile,
}

impl MigrationStep {
    pub fn number(self) -> u8 {
        match self {
            MigrationStep::ResolveCurrent => 1,
            MigrationStep::ReadMapping => 2,
            MigrationStep::ComputeMapping => 3,
            MigrationStep::CreateIndex => 4,
            MigrationStep::SwapWriteAlias => 5,
            MigrationStep::Reindex => 6,
            MigrationStep::SwapReadAlias => 7,
            MigrationStep::Reconcile => 8,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MigrationStep::ResolveCurrent => "resolve current index",
            MigrationStep::ReadMapping => "read current mapping",
            MigrationStep::ComputeMapping => "compute new mapping",
            MigrationStep::CreateIndex => "create index",
            MigrationStep::SwapWriteAlias => "swap write alias",
            MigrationStep::Reindex => "reindex",
            MigrationStep::SwapReadAlias => "swap read alias",
            MigrationStep::Reconcile => "reconcile aliases",
        }
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.number(), self.label())
    }
}

/// What the new index should look like
#[derive(Debug, Clone)]
pub enum MigrationTarget {
    /// Derive the mapping from searchable and facetable attributes
    Settings(IndexSettings),
    /// Use this mapping as-is
    Mapping(TypeMapping),
}

/// Summary of a completed migration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub base_name: String,
    pub previous_index: String,
    pub new_index: String,
    pub documents_copied: u64,
    pub reindex_took_ms: u64,
    /// Both aliases were read back and found on the new index
    pub reconciled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Why a guarded remote call did not produce a value
enum Interrupt {
    Cancelled,
    Failed(Error),
}

impl Interrupt {
    fn into_error(self) -> Error {
        match self {
            Interrupt::Cancelled => Error::Cancelled,
            Interrupt::Failed(e) => e,
        }
    }

    fn reason(&self) -> String {
        match self {
            Interrupt::Cancelled => "cancelled".to_string(),
            Interrupt::Failed(e) => e.to_string(),
        }
    }
}

/// Race a remote call against cancellation.
///
/// A token already cancelled wins before the call is first polled, so the
/// request is never sent.
async fn guarded<T, F>(cancel: &CancellationToken, call: F) -> std::result::Result<T, Interrupt>
where
    F: Future<Output = halyard_es::Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupt::Cancelled),
        result = call => result.map_err(|e| Interrupt::Failed(e.into())),
    }
}

/// Runs the migration protocol against the engine
pub struct MigrationEngine {
    engine: Arc<dyn EngineClient>,
    generation_width: usize,
    reconcile: bool,
}

impl MigrationEngine {
    pub fn new(engine: Arc<dyn EngineClient>, config: &MigrationConfig) -> Self {
        Self {
            engine,
            generation_width: config.generation_width,
            reconcile: config.reconcile,
        }
    }

    pub async fn migrate(
        &self,
        identity: &IndexIdentity,
        target: MigrationTarget,
        cancel: &CancellationToken,
    ) -> Result<MigrationReport> {
        let started_at = Utc::now();
        let base = identity.base_name.as_str();

        let failed = |step: MigrationStep,
                      current: Option<&str>,
                      new: Option<&str>,
                      interrupt: Interrupt| {
            let source = interrupt.into_error();
            tracing::warn!(base, %step, error = %source, "Migration failed");
            Error::MigrationStep {
                step,
                base: base.to_string(),
                current: current.map(str::to_string),
                new: new.map(str::to_string),
                source: Box::new(source),
            }
        };

        // 1. Current index behind the read alias
        let step = MigrationStep::ResolveCurrent;
        let bound = guarded(cancel, self.engine.get_alias(&identity.read_alias))
            .await
            .map_err(|i| failed(step, None, None, i))?;
        let current = match bound.as_slice() {
            [index] => index.clone(),
            other => {
                let reason = format!(
                    "read alias {} is bound to {} indices, expected exactly one",
                    identity.read_alias,
                    other.len()
                );
                let interrupt = Interrupt::Failed(Error::Validation(reason));
                return Err(failed(step, None, None, interrupt));
            }
        };
        let new = next_index_name(base, &current, self.generation_width);
        tracing::info!(base, current = %current, new = %new, "Starting migration");

        // 2. Its mapping
        let step = MigrationStep::ReadMapping;
        let (_, current_mapping) = guarded(cancel, self.engine.get_mapping(&current))
            .await
            .map_err(|i| failed(step, Some(current.as_str()), Some(new.as_str()), i))?;

        // 3. The new mapping
        let step = MigrationStep::ComputeMapping;
        if cancel.is_cancelled() {
            let interrupt = Interrupt::Cancelled;
            return Err(failed(step, Some(current.as_str()), Some(new.as_str()), interrupt));
        }
        let new_mapping = match target {
            MigrationTarget::Settings(settings) => plan_mapping(&current_mapping, &settings),
            MigrationTarget::Mapping(mapping) if mapping.properties.is_empty() => Err(
                Error::Validation("explicit mapping declares no properties".to_string()),
            ),
            MigrationTarget::Mapping(mapping) => Ok(mapping),
        }
        .map_err(|e| {
            let interrupt = Interrupt::Failed(e);
            failed(step, Some(current.as_str()), Some(new.as_str()), interrupt)
        })?;

        // 4. The new index
        let step = MigrationStep::CreateIndex;
        guarded(
            cancel,
            self.engine
                .create_index(&new, &CreateIndexRequest::with_mappings(new_mapping)),
        )
        .await
        .map_err(|i| failed(step, Some(current.as_str()), Some(new.as_str()), i))?;
        tracing::info!(base, index = %new, "Created index");

        let partial = |step: MigrationStep, write: &str, read: &str, reason: String| {
            tracing::error!(
                base,
                %step,
                write_alias_target = write,
                read_alias_target = read,
                reason = %reason,
                "Migration left partially applied"
            );
            Error::PartialMigration {
                step,
                base: base.to_string(),
                current: current.clone(),
                new: new.clone(),
                write_alias_target: write.to_string(),
                read_alias_target: read.to_string(),
                reason,
            }
        };
        let unconfirmed = format!("{current} or {new} (unconfirmed)");

        // 5. Write alias; new documents now land in the new index
        let step = MigrationStep::SwapWriteAlias;
        if cancel.is_cancelled() {
            let interrupt = Interrupt::Cancelled;
            return Err(failed(step, Some(current.as_str()), Some(new.as_str()), interrupt));
        }
        let swap_write = UpdateAliasesRequest::swap(&identity.write_alias, &current, &new);
        match guarded(cancel, self.engine.update_aliases(&swap_write)).await {
            Ok(()) => {}
            // The alias update is atomic; an answered rejection moved nothing
            Err(Interrupt::Failed(source @ Error::Engine(EngineError::Status { .. }))) => {
                let interrupt = Interrupt::Failed(source);
                return Err(failed(step, Some(current.as_str()), Some(new.as_str()), interrupt));
            }
            // Sent but unanswered: the engine may have applied it
            Err(interrupt) => {
                return Err(partial(step, &unconfirmed, &current, interrupt.reason()));
            }
        }
        tracing::info!(base, alias = %identity.write_alias, index = %new, "Moved write alias");

        // 6. Backfill
        let step = MigrationStep::Reindex;
        let reindexed = guarded(
            cancel,
            self.engine.reindex(&ReindexRequest::new(&current, &new)),
        )
        .await
        .map_err(|i| partial(step, &new, &current, i.reason()))?;
        if !reindexed.is_clean() {
            let reason = format!(
                "reindex reported {} failures{}",
                reindexed.failures.len(),
                if reindexed.timed_out { " and timed out" } else { "" }
            );
            return Err(partial(step, &new, &current, reason));
        }
        let documents_copied = reindexed.created + reindexed.updated;
        tracing::info!(
            base,
            source = %current,
            dest = %new,
            documents = documents_copied,
            took_ms = reindexed.took,
            "Reindexed"
        );

        // 7. Read alias
        let step = MigrationStep::SwapReadAlias;
        let swap_read = UpdateAliasesRequest::swap(&identity.read_alias, &current, &new);
        guarded(cancel, self.engine.update_aliases(&swap_read))
            .await
            .map_err(|i| match i {
                Interrupt::Cancelled => partial(step, &new, &unconfirmed, i.reason()),
                Interrupt::Failed(_) => partial(step, &new, &current, i.reason()),
            })?;
        tracing::info!(base, alias = %identity.read_alias, index = %new, "Moved read alias");

        // 8. Confirm
        let reconciled = if self.reconcile {
            self.reconcile_aliases(identity, &new, cancel)
                .await
                .map_err(|(write, read, reason)| {
                    partial(MigrationStep::Reconcile, &write, &read, reason)
                })?;
            true
        } else {
            false
        };

        tracing::info!(base, previous = %current, index = %new, reconciled, "Migration complete");

        Ok(MigrationReport {
            base_name: identity.base_name.clone(),
            previous_index: current,
            new_index: new,
            documents_copied,
            reindex_took_ms: reindexed.took,
            reconciled,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Read both aliases back; on mismatch, report what each points at
    async fn reconcile_aliases(
        &self,
        identity: &IndexIdentity,
        new: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), (String, String, String)> {
        let unverified = format!("{new} (unverified)");

        let write = guarded(cancel, self.engine.get_alias(&identity.write_alias))
            .await
            .map_err(|i| (unverified.clone(), unverified.clone(), i.reason()))?;
        let read = guarded(cancel, self.engine.get_alias(&identity.read_alias))
            .await
            .map_err(|i| (describe(&write), unverified.clone(), i.reason()))?;

        if write == [new] && read == [new] {
            Ok(())
        } else {
            Err((
                describe(&write),
                describe(&read),
                "aliases are not both bound to the new index".to_string(),
            ))
        }
    }
}

fn describe(indices: &[String]) -> String {
    match indices {
        [] => "nothing".to_string(),
        [one] => one.clone(),
        many => many.join(", "),
    }
}

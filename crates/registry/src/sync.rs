//! Registry operations that reach out to the calendar.

use {
    cadence_calendar::{CalendarGateway, Result},
    tracing::{debug, info, warn},
};

use crate::{record::EventRecord, registry::EventRegistry};

/// Outcome of [`EventRegistry::remove_parent`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentRemoval {
    /// The dropped record, if the parent was registered.
    pub record: Option<EventRecord>,
    /// Occurrences whose deletion failed and were skipped.
    pub failed_instances: Vec<String>,
}

/// Delete each ID, logging and collecting failures instead of stopping.
pub async fn delete_best_effort(calendar: &dyn CalendarGateway, ids: &[String]) -> Vec<String> {
    let mut failed = Vec::new();
    for id in ids {
        if let Err(e) = calendar.delete(id).await {
            warn!(event_id = %id, error = %e, "failed to delete occurrence, continuing");
            failed.push(id.clone());
        }
    }
    failed
}

impl EventRegistry {
    /// Delete a parent event, all its occurrences, and its record.
    ///
    /// Occurrence deletions are best-effort. Only a failure to delete the
    /// parent itself is returned, and then the registry is left untouched.
    pub async fn remove_parent(
        &mut self,
        event_id: &str,
        calendar: &dyn CalendarGateway,
    ) -> Result<ParentRemoval> {
        let instances = self
            .record(event_id)
            .map(|r| r.instances.clone())
            .unwrap_or_default();

        let failed_instances = delete_best_effort(calendar, &instances).await;
        calendar.delete(event_id).await?;

        let record = self.remove_single(event_id);
        info!(
            event_id,
            occurrences = instances.len(),
            failed = failed_instances.len(),
            "parent event removed"
        );
        Ok(ParentRemoval {
            record,
            failed_instances,
        })
    }

    /// Resynchronize against the calendar and return the surviving records.
    ///
    /// A record whose parent can't be fetched or is cancelled is dropped, and
    /// the parent and every occurrence get a best-effort delete. For live
    /// parents, occurrences that can't be fetched or are cancelled are pruned
    /// without deleting anything.
    pub async fn reconcile(&self, calendar: &dyn CalendarGateway) -> EventRegistry {
        let mut cleaned = Vec::with_capacity(self.len());

        for record in self.records() {
            let parent_live = match calendar.get(&record.parent_event_id).await {
                Ok(parent) => !parent.is_cancelled(),
                Err(e) => {
                    debug!(event_id = %record.parent_event_id, error = %e, "parent fetch failed");
                    false
                },
            };

            if !parent_live {
                info!(
                    event_id = %record.parent_event_id,
                    alias = %record.alias,
                    "parent event missing or cancelled, dropping record"
                );
                if let Err(e) = calendar.delete(&record.parent_event_id).await {
                    debug!(event_id = %record.parent_event_id, error = %e, "parent delete failed");
                }
                delete_best_effort(calendar, &record.instances).await;
                continue;
            }

            let mut instances = Vec::with_capacity(record.instances.len());
            for id in &record.instances {
                match calendar.get(id).await {
                    Ok(event) if !event.is_cancelled() => instances.push(id.clone()),
                    Ok(_) => debug!(event_id = %id, "occurrence cancelled, pruning"),
                    Err(e) => debug!(event_id = %id, error = %e, "occurrence fetch failed, pruning"),
                }
            }
            cleaned.push(EventRecord {
                instances,
                ..record.clone()
            });
        }

        EventRegistry::from(cleaned)
    }
}

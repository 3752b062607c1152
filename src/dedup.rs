use std::collections::HashSet;

use crate::model::JobRecord;

/// Keep the first record for each `url`, in original order, across sources.
pub fn dedup_by_url(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}

use indexmap::map::Entry;

use crate::dataset::{BuildRecord, PipelineRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    AlreadyPresent,
}

/// Appends `candidate` to the pipeline unless its build id is already
/// recorded. An existing record is never touched, even if the candidate
/// carries different data.
pub fn merge(record: &mut PipelineRecord, candidate: BuildRecord) -> MergeOutcome {
    match record.builds.entry(candidate.build_id) {
        Entry::Occupied(_) => MergeOutcome::AlreadyPresent,
        Entry::Vacant(slot) => {
            slot.insert(candidate);
            MergeOutcome::Added
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u64, result: &str) -> BuildRecord {
        BuildRecord {
            build_id: id,
            underlay_type: "AKS_CLUSTER".to_string(),
            result: result.to_string(),
            time: "2023-01-01".to_string(),
            url: format!("url/{id}"),
            cluster: None,
        }
    }

    #[test]
    fn test_merge_adds_new_build() {
        let mut record = PipelineRecord::new("e2e", 1);
        assert_eq!(merge(&mut record, candidate(10, "succeeded")), MergeOutcome::Added);
        assert_eq!(record.builds.len(), 1);
    }

    #[test]
    fn test_merge_ignores_known_build() {
        let mut record = PipelineRecord::new("e2e", 1);
        merge(&mut record, candidate(10, "failed"));

        let outcome = merge(&mut record, candidate(10, "succeeded"));

        assert_eq!(outcome, MergeOutcome::AlreadyPresent);
        assert_eq!(record.builds.len(), 1);
        assert_eq!(record.builds[&10u64].result, "failed");
    }

    #[test]
    fn test_merge_keeps_ids_unique_over_many_passes() {
        let mut record = PipelineRecord::new("e2e", 1);
        for _ in 0..3 {
            for id in [5, 6, 5, 7, 6] {
                merge(&mut record, candidate(id, "succeeded"));
            }
        }

        let ids: Vec<_> = record.builds.keys().copied().collect();
        assert_eq!(ids, vec![5, 6, 7]);
    }
}

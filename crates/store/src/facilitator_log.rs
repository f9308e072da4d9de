//! Per-session facilitator log persistence.

use std::path::Path;

use dialogue_facilitator::FacilitatorLogRecord;

use crate::{atomic_write, Result};

/// Flush the accumulated log a [`dialogue_facilitator::Facilitator`]
/// drained at session end. One file per record, never overwritten
/// (the filename embeds the round, action, and timestamp).
pub fn save_facilitator_log(
    data_dir: impl AsRef<Path>,
    session_id: &str,
    records: &[FacilitatorLogRecord],
) -> Result<()> {
    let dir = data_dir.as_ref().join("logs").join(session_id).join("facilitator");
    for record in records {
        let action = record
            .decision
            .selected_action
            .map(|a| a.as_str().to_string())
            .unwrap_or_else(|| "analyze".to_string());
        let path = dir.join(format!(
            "facilitator-r{}-{}-{}.json",
            record.round_number,
            action,
            record.timestamp.timestamp_millis()
        ));
        atomic_write(&path, serde_json::to_vec_pretty(record)?.as_slice())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dialogue_facilitator::FacilitatorDecision;

    fn record(round: u32) -> FacilitatorLogRecord {
        FacilitatorLogRecord {
            round_number: round,
            timestamp: Utc::now(),
            action: "analyze".to_string(),
            decision: FacilitatorDecision {
                reasoning: "r".to_string(),
                data_analyzed: serde_json::json!({}),
                suggested_actions: vec![],
                selected_action: None,
            },
            execution_details: serde_json::json!({}),
        }
    }

    #[test]
    fn writes_one_file_per_record() {
        let dir = tempfile::tempdir().unwrap();
        save_facilitator_log(dir.path(), "s1", &[record(0), record(1)]).unwrap();
        let files: Vec<_> = std::fs::read_dir(dir.path().join("logs/s1/facilitator")).unwrap().collect();
        assert_eq!(files.len(), 2);
    }
}

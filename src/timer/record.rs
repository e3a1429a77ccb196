//! Task identifiers and the persisted timer record

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a loggable task
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The record kept under the timer key while a task is locked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimerRecord {
    pub task_id: TaskId,
    /// Anchor instant in epoch milliseconds
    pub start_timestamp: i64,
    /// Last computed elapsed seconds; informational only
    #[serde(default)]
    pub elapsed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl TimerRecord {
    /// Parse a stored record. Anything unparseable or incomplete is `None`.
    pub fn decode(raw: &str) -> Option<Self> {
        let record: Self = serde_json::from_str(raw).ok()?;
        record.is_valid().then_some(record)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn is_valid(&self) -> bool {
        !self.task_id.as_str().is_empty() && self.start_timestamp > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_the_camel_case_shape() {
        let record =
            TimerRecord::decode(r#"{"taskId":"task-B","startTimestamp":1700000000000,"elapsed":0}"#)
                .unwrap();
        assert_eq!(
            record,
            TimerRecord {
                task_id: TaskId::from("task-B"),
                start_timestamp: 1_700_000_000_000,
                elapsed: 0,
                duration: None,
            }
        );
    }

    #[test]
    fn elapsed_may_be_missing() {
        let record = TimerRecord::decode(r#"{"taskId":"t","startTimestamp":5}"#).unwrap();
        assert_eq!(record.elapsed, 0);
    }

    #[test]
    fn duration_is_written_only_when_known() {
        let mut record = TimerRecord {
            task_id: TaskId::from("t"),
            start_timestamp: 5,
            elapsed: 2,
            duration: None,
        };
        assert_eq!(record.encode().unwrap(), r#"{"taskId":"t","startTimestamp":5,"elapsed":2}"#);

        record.duration = Some(60);
        assert_eq!(
            record.encode().unwrap(),
            r#"{"taskId":"t","startTimestamp":5,"elapsed":2,"duration":60}"#
        );
    }

    #[test]
    fn malformed_records_are_absent() {
        let cases = [
            "",
            "not json",
            "null",
            "[]",
            r#"{"taskId":"t"}"#,
            r#"{"taskId":"","startTimestamp":5,"elapsed":0}"#,
            r#"{"taskId":"t","startTimestamp":0,"elapsed":0}"#,
            r#"{"taskId":"t","startTimestamp":-3,"elapsed":0}"#,
            r#"{"taskId":"t","startTimestamp":"soon","elapsed":0}"#,
            r#"{"taskId":"t","startTimestamp":5,"elapsed":-1}"#,
            r#"{"taskId":"t","startTimestamp":5,"elapsed":0,"extra":true}"#,
        ];
        for raw in cases {
            assert_eq!(TimerRecord::decode(raw), None, "{raw}");
        }
    }
}

pub mod execute;
pub mod handlers;
pub mod health;
pub mod sop;

use std::path::Path;

use anyhow::Context;
use opsdesk_core::{ActionContext, ActionResult, Performer, StatusTransition};
use serde::Serialize;

use crate::OutputFormat;

/// Read an [`ActionContext`] from a JSON file.
pub fn read_context(path: &Path) -> anyhow::Result<ActionContext> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read context file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid action context in {}", path.display()))
}

/// An action result and the thread status it leads to.
#[derive(Debug, Serialize)]
pub struct ExecutionReport<'a> {
    pub action_type: &'a str,
    pub thread_id: &'a str,
    pub result: &'a ActionResult,
    pub transition: StatusTransition,
}

impl<'a> ExecutionReport<'a> {
    pub fn new(action_type: &'a str, context: &'a ActionContext, result: &'a ActionResult) -> Self {
        Self {
            action_type,
            thread_id: &context.thread.id,
            result,
            transition: StatusTransition::for_outcome(result.outcome, Performer::Automation, false),
        }
    }

    pub fn print(&self, format: &OutputFormat) -> anyhow::Result<()> {
        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(self)?);
            }
            OutputFormat::Text => {
                println!("Action:   {}", self.action_type);
                println!("Thread:   {}", self.thread_id);
                println!("Outcome:  {}", self.result.outcome);
                println!("Notes:    {}", self.result.notes);
                println!("Status:   {}", self.transition.status);
                for (key, value) in &self.result.details {
                    println!("  {key}: {value}");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use opsdesk_core::{OutcomeKind, ThreadStatus};

    use super::*;

    #[test]
    fn reads_context_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"thread": {{"id": "t-1", "location": "downtown", "bay_id": "3"}},
                "parameters": {{"message": "hi"}}}}"#
        )
        .unwrap();

        let context = read_context(file.path()).unwrap();
        assert_eq!(context.thread.id, "t-1");
        assert_eq!(context.thread.bay_id.as_deref(), Some("3"));
        assert_eq!(context.parameter_str("message"), Some("hi"));
    }

    #[test]
    fn malformed_context_names_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = read_context(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid action context"));
    }

    #[test]
    fn report_carries_next_thread_status() {
        let context = ActionContext::new(opsdesk_core::ThreadContext::new("t-1", "downtown"));
        let result = ActionResult::new(OutcomeKind::Partial, "half done");
        let report = ExecutionReport::new("reset_trackman", &context, &result);
        assert_eq!(report.transition.status, ThreadStatus::AwaitingHuman);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["transition"]["status"], "awaiting_human");
        assert_eq!(json["result"]["outcome"], "partial");
    }
}

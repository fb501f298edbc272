use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use opsdesk_dispatcher::ActionDispatcher;

use super::{ExecutionReport, read_context};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct SopArgs {
    /// JSON file holding the action context, including its `sop`.
    #[arg(long)]
    pub context: PathBuf,
}

pub async fn run(
    dispatcher: &ActionDispatcher,
    args: &SopArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let context = read_context(&args.context)?;
    let Some(sop) = &context.sop else {
        bail!("context has no sop to run");
    };
    let result = dispatcher.execute_sop(&context).await;
    let action_type = result
        .detail("fallback_from")
        .and(sop.fallback_action.as_deref())
        .unwrap_or(&sop.primary_action);
    ExecutionReport::new(action_type, &context, &result).print(format)
}

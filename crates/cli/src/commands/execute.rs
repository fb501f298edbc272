use std::path::PathBuf;

use clap::Args;
use opsdesk_dispatcher::ActionDispatcher;

use super::{ExecutionReport, read_context};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ExecuteArgs {
    /// Action type, e.g. `reset_trackman` or `unlock_door`.
    pub action_type: String,
    /// JSON file holding the action context.
    #[arg(long)]
    pub context: PathBuf,
}

pub async fn run(
    dispatcher: &ActionDispatcher,
    args: &ExecuteArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let context = read_context(&args.context)?;
    let result = dispatcher.execute(&args.action_type, &context).await;
    ExecutionReport::new(&args.action_type, &context, &result).print(format)
}

use opsdesk_dispatcher::ActionDispatcher;

use crate::OutputFormat;

pub fn run(dispatcher: &ActionDispatcher, format: &OutputFormat) -> anyhow::Result<()> {
    let handlers = dispatcher.handlers();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&handlers)?);
        }
        OutputFormat::Text => {
            if handlers.is_empty() {
                println!("No handlers registered.");
            }
            for handler in &handlers {
                println!("{:<16} {}", handler.action_type, handler.kind);
            }
        }
    }

    Ok(())
}

use opsdesk_dispatcher::ActionDispatcher;

use crate::OutputFormat;

pub fn run(dispatcher: &ActionDispatcher, format: &OutputFormat) -> anyhow::Result<()> {
    let report = dispatcher.health();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("Handlers: {}", report.handlers.len());
            for handler in &report.handlers {
                println!("  {:<16} {}", handler.action_type, handler.kind);
            }
            println!("Circuit breakers: {}", report.circuit_breakers.len());
            for cb in &report.circuit_breakers {
                println!(
                    "  {:<16} {:<9} failures={}/{} requests={} success_rate={:.2}",
                    cb.target,
                    cb.state,
                    cb.failures,
                    cb.failure_threshold,
                    cb.request_count,
                    cb.success_rate
                );
            }
            let m = &report.metrics;
            println!(
                "Dispatched: {} (succeeded={} partial={} failed={} unconfirmed={})",
                m.dispatched, m.succeeded, m.partial, m.failed, m.unconfirmed
            );
        }
    }

    Ok(())
}

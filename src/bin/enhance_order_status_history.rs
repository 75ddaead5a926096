// Maintenance utility: backfill status history for every order in the database.
//
// Usage:
//   enhance_order_status_history [db_path]
//
// Prints the BackfillReport as JSON. Exits non-zero when the job fails; batches
// committed before the failure stay in the database.

use order_bottleneck_analytics::app::{get_default_db_path, AppState};
use order_bottleneck_analytics::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let db_path = std::env::args()
        .nth(1)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path);

    let state = AppState::new(db_path).await?;

    match state.analytics_api.enhance_orders_with_status_history() {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "status history backfill failed");
            eprintln!("backfill failed: {}", e);
            std::process::exit(1);
        }
    }
}

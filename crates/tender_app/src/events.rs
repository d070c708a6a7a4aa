use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use tender_engine::{EventSink, RunEvent};

/// Writes run events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: RunEvent) {
        match event {
            RunEvent::RunStarted {
                portal_url,
                start_page,
                end_page,
            } => match end_page {
                Some(end) => engine_info!("Harvesting {} pages {}..={}", portal_url, start_page, end),
                None => engine_info!("Harvesting {} from page {} until pagination ends", portal_url, start_page),
            },
            RunEvent::PageReached {
                page,
                attempts,
                strategy,
            } => match strategy {
                Some(strategy) => {
                    engine_info!("Reached page {} via {:?} after {} attempt(s)", page, strategy, attempts)
                }
                None => engine_debug!("Already on page {}", page),
            },
            RunEvent::NavigationFailed {
                page,
                attempt,
                error,
            } => engine_warn!("Attempt {} to reach page {} failed: {}", attempt, page, error),
            RunEvent::EmptyPage { page, attempt } => {
                engine_warn!("Page {} showed no cards (attempt {})", page, attempt)
            }
            RunEvent::PageSkipped { page } => engine_warn!("Skipping page {}: no cards", page),
            RunEvent::RecordsCollected {
                page,
                new_rows,
                duplicates,
                total_rows,
            } => engine_info!(
                "Page {}: {} new, {} duplicate, {} total",
                page,
                new_rows,
                duplicates,
                total_rows
            ),
            RunEvent::Cooldown {
                after_pages,
                duration,
            } => engine_info!("Cooling down for {:?} after {} pages", duration, after_pages),
            RunEvent::RunHalted { page, error } => {
                engine_warn!("Halting at page {}: {}", page, error)
            }
            RunEvent::RunAborted { page, reason } => {
                engine_error!("Aborting at page {}: {}", page, reason)
            }
            RunEvent::RunFinished { stats } => engine_info!(
                "Done: {} pages, {} rows, {} skipped pages, {} duplicates",
                stats.pages_processed,
                stats.rows_collected,
                stats.pages_skipped,
                stats.duplicates_skipped
            ),
        }
    }
}

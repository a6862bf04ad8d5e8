//! Scrape worker: render each tracked offer's ad-library page, read the
//! active-ad count, and reconcile it into the ledger.

pub mod counter;
pub mod error;
pub mod pass;

pub use counter::AdCounter;
pub use error::WorkerError;
pub use pass::{run_scrape_pass, scrape_and_record, PassOptions, PassSummary, ScrapeOutcome};

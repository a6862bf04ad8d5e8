use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("database error: {0}")]
    Db(#[from] adtrack_db::DbError),

    #[error("scraper setup failed: {0}")]
    Scraper(#[from] adtrack_scraper::ScraperError),
}

pub mod error;
pub mod extract;
pub mod page;
pub mod render;

pub use error::ScraperError;
pub use extract::{parse_result_count, Extractor, ResultCountExtractor};
pub use page::RenderedPage;
pub use render::{build_renderer, HttpRenderer, PageRenderer, RegionSelection, RemoteBrowserRenderer};

pub mod browser;
pub mod cleaner;
pub mod error;
pub mod extractor;
pub mod navigator;
pub mod parsers;
pub mod session;

pub use error::ScrapeError;
pub use session::BrowserSession;

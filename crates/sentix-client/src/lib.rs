//! Async client for the Sentix sentiment API and the page controllers built on it.

pub mod api;
pub mod cancel;
pub mod fanout;
pub mod http;
pub mod news;
pub mod retry;
pub mod session;
pub mod youtube;

pub use api::SentixApi;
pub use cancel::InFlightSlot;
pub use http::{ClientError, HttpClient, Payload, UploadFile};
pub use news::{IngestOptions, NewsError, NewsFlow};
pub use session::{AnalysisSession, SessionError, SingleOutcome};
pub use youtube::{YoutubeError, YoutubeFlow};

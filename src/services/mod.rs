//! Service layer.
//!
//! - Novel reads with staleness-driven refresh (`NovelService`)
//! - Visit counting (`VisitCounter`)
//! - Upstream access (`RemoteSource`)
//! - Admission gating (`RateLimiter`)

mod novels;
mod rate_limit;
mod remote;
mod visits;

pub use novels::{Collaborators, NovelService, SearchOutcome};
pub use rate_limit::{RateLimiter, WindowRateLimiter};
pub use remote::{HttpRemoteSource, RemoteSource, create_async_client};
pub use visits::VisitCounter;

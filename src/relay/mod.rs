//! Paginating resource relay
//!
//! ```text
//! inbound path ─▶ target ─▶ paginate ─┬─▶ codec::decode ─▶ normalize ─┐
//!                              ▲      │                              │
//!                              └──────┴──── pageToken ◀──────────────┘
//!                                     │
//!                                     └─▶ response::build ─▶ codec::encode
//! ```
//!
//! - [`codec`] - identity/gzip/deflate/brotli in both directions
//! - [`normalize`] - per resource type page normalizers
//! - [`paginate`] - the page loop
//! - [`response`] - aggregated JSON body and header merge
//! - [`target`] - inbound path to upstream URL

pub mod codec;
mod error;
pub mod normalize;
pub mod paginate;
pub mod response;
pub mod target;

pub use error::{ErrorResponse, RelayError};
pub use normalize::{NormalizedItem, PageResult, ResourceKind};
pub use paginate::{drain_pages, RelayOutcome, RelayRequest};
pub use target::SubService;

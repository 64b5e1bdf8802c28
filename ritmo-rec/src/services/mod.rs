//! External service clients

pub mod itunes_client;

pub use itunes_client::{Enrichment, ItunesClient, ItunesError};

use std::future::Future;

/// Metadata enrichment boundary
///
/// Exactly one outcome per call, delivered asynchronously; no retries, no
/// caching. Callers treat any error as "no enrichment available" and proceed
/// with the un-enriched track.
pub trait MetadataLookup: Clone + Send + Sync + 'static {
    /// Look up preview/artwork URLs for a recognized title/artist pair
    fn lookup(
        &self,
        title: &str,
        artist: &str,
    ) -> impl Future<Output = Result<Enrichment, ItunesError>> + Send;
}

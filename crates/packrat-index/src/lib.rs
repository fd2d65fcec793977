pub mod cache;
pub mod delta;
pub mod error;

pub use cache::SessionCacheFile;
pub use delta::{
    discover_delta, DiscoveryDelta, DiscoveryScope, Enumeration, SignatureMap,
};
pub use error::{Error, Result};

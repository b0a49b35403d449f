//! Riot API access: region routing, the credential-holding proxy and the wire types.

pub mod proxy;
pub mod region;
pub mod transport;
pub mod types;

pub use proxy::{ProxyKind, ProxyRequest, UpstreamProxy};
pub use region::{platform_for_server, region_for};
pub use transport::{HttpTransport, Transport, UpstreamResponse};

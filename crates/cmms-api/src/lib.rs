// cmms-api: Async REST transport for the CMMS backend (Django REST style)

pub mod client;
pub mod envelope;
pub mod error;
pub mod paths;
pub mod transport;

pub use client::{AuthScheme, Credentials, HttpClient, Transport};
pub use envelope::unwrap_list;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};

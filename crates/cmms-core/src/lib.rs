// cmms-core: Data-access layer for the CMMS administrative console
//
// Expiring cache, coordinated (debounced, superseding) reads, resource
// collections with server-confirmed mutations, and metadata-driven CRUD
// screens on top of them.

pub mod cache;
pub mod config;
pub mod console;
pub mod crud;
pub mod error;
pub mod fetch;
pub mod model;
pub mod resource;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────

pub use cache::{DEFAULT_TTL, ExpiringCache, FetchKey};
pub use config::{AuthToken, ConsoleConfig, TlsVerification};
pub use console::Console;
pub use error::{CoreError, FieldError};
pub use fetch::{DEFAULT_DEBOUNCE, FetchController, FetchOptions, FetchOutcome, FetchState};
pub use model::{Entity, PrimaryKey, Record};
pub use resource::{ResourceController, ResourceEndpoint, ResourceState};
pub use stream::StateStream;

pub use crud::{
    ColumnDescriptor, CrudScreen, DisplayTokens, FieldDescriptor, FieldKind, FormMode, FormState,
    ListView, OptionsSource, Overlay, Phase, ScreenConfig, SelectOption,
};

pub use cmms_api::{AuthScheme, Transport};

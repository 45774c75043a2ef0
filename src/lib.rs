#![doc = include_str!("../README.md")]

pub mod dashboard;
pub mod error;
pub mod oauth;
pub mod pkce;
pub mod session;
pub mod spending;
pub mod summary;
pub mod types;
#[cfg(feature = "web")]
pub mod web;

// Re-exports for convenient access
pub use dashboard::{Banner, Dashboard, Effect, Slot, View};
pub use error::Error;
pub use oauth::{AuthClient, AuthorizationRequest, OAuthConfig, SignIn, TokenResponse, UserInfo};
pub use pkce::{PkcePair, generate_state};
pub use session::{
    IdentityClaims, SealedSession, SessionAccessor, SessionArtifact, SessionInvalid,
    SessionInvalidator, SessionState, SessionStore, TokenPair,
};
pub use spending::{
    AllSpending, RefreshOutcome, SpendingApi, SpendingClient, SpendingError, SpendingSummary,
    Totals,
};
pub use summary::{Change, Direction, SummaryCard, change, format_amount};
pub use types::{FilterTab, Period, Subject};

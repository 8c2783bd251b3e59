pub mod connection;
pub mod platform;
pub mod state_token;

pub use connection::{
    ConnectionSummary, LinkedPhotoAccount, Organization, PlatformConnection, ProviderMetadata,
    TokenVariant,
};
pub use platform::{ConnectionKey, Platform};
pub use state_token::AntiForgeryToken;

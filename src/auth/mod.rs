//! Workspace authentication.
//!
//! - [`profile`]: credentials file (`~/.databrickscfg`) parsing
//! - [`delegate`]: token fetch through the companion CLI
//! - [`resolver`]: per-profile token operations and the per-server source chain

pub mod delegate;
pub mod profile;
pub mod resolver;

pub use delegate::{CliDelegate, TokenDelegate};
pub use profile::{Profile, ProfileStore};
pub use resolver::{
    ConfigLiteralSource, Credential, CredentialResolver, EnvVarSource, ProfileSource,
    ResolverChain, TokenOrigin, TokenSource,
};

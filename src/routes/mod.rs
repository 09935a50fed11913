/// Router Module Index
///
/// Splits routes by who may call them. The access middleware in lib.rs is the first
/// gate for every application route; handlers needing an identity check again through
/// the `AuthUser` extractor.

/// Routes callable without a session: the public video listing plus service endpoints
/// (health) that sit outside the access middleware.
pub mod public;

/// Upload routes. Require a resolved session.
pub mod authenticated;

//! Standard Security Handler support: RC4 (the V2 crypt filter), password
//! algorithms, permission bits and the document-level crypter.

mod crypter;
mod permissions;
mod rc4;
mod standard_security;

pub use crypter::Crypter;
pub use permissions::AccessPermissions;
pub use rc4::{rc4_apply, Rc4};
pub use standard_security::{StandardSecurityHandler, PASSWORD_PADDING};

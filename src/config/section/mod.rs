//! Configuration section definitions.
//!
//! Each module corresponds to a section in `ldpd.toml`:
//!
//! | Module    | TOML Section | Purpose                                  |
//! |-----------|--------------|------------------------------------------|
//! | `serve`   | `[serve]`    | Listener, worker pool, request limits    |
//! | `storage` | `[storage]`  | Data root, virtual hosts, companion files |
//! | `auth`    | `[auth]`     | Identity, sessions, access control       |

mod auth;
mod serve;
mod storage;

pub use auth::AuthConfig;
pub use serve::ServeConfig;
pub use storage::StorageConfig;

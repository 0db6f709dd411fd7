// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Server-side browser sessions and pending logins

pub mod cleanup;
pub mod store;
pub mod types;

pub use cleanup::spawn_cleanup_task;
pub use store::SessionStore;
pub use types::{PendingAuthorization, Session};

// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod directory;
pub mod sessions;
pub mod stream;

pub use sessions::SessionService;
pub use stream::StreamService;

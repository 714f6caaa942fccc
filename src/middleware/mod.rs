// SPDX-License-Identifier: MIT

//! Middleware layer.

pub mod auth;
pub mod security;

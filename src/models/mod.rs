// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod backup;
pub mod comment;
pub mod geo;
pub mod slope;
pub mod user;

pub use backup::{CommentImageBackup, ImageRef, ImageSlot, SlopeImageBackup, SlopeImageSet};
pub use comment::Comment;
pub use geo::{DmsComponent, GeoPoint};
pub use slope::{CoordinateGroup, Slope};
pub use user::{RefreshTokenRecord, User, UserProfile};

pub mod auth;
pub mod comments;
pub mod feed;
pub mod groups;
pub mod posts;
pub mod social;
pub mod users;

pub mod invite;
pub mod location;
pub mod media;
pub mod member;
pub mod session;
pub mod trip;
pub mod user;

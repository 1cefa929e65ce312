//! Database repositories

pub mod event;
pub mod moderation;
pub mod user;

pub use event::EventRepository;
pub use moderation::ModerationRepository;
pub use user::UserRepository;

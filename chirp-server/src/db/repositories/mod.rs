mod badge_repository;
mod follow_repository;
mod post_repository;
mod user_repository;

pub use badge_repository::BadgeRepository;
pub use follow_repository::FollowRepository;
pub use post_repository::PostRepository;
pub use user_repository::UserRepository;

//! Engagement rules: posting, likes, follows, point transfers, badges,
//! profile edits and the plan lifecycle. Everything here runs against the
//! [`Store`] contract, and operations that stamp records take the current
//! time explicitly.

pub mod badges;
pub mod engagement;
pub mod error;
pub mod memory;
pub mod plan;
pub mod profile;
pub mod store;

pub use badges::{earned_badges, evaluate_badges, evaluate_user_badges, EngagementStats};
pub use engagement::{
    create_post, toggle_follow, toggle_like, transfer_points, FollowOutcome, LikeOutcome,
    NewPost, PostOutcome, TransferOutcome,
};
pub use error::{EngagementError, EngagementResult};
pub use memory::MemoryStore;
pub use plan::{
    apply_plan, check_expiry, decrement_post_quota, downgrade, expire_all, post_remains,
    register_user, ExpiryOutcome, ExpirySweep, NewUser, PlanTerms, QuotaOutcome,
};
pub use profile::{update_profile, ProfileUpdate};
pub use store::{LikeChange, PostPatch, Store, UserPatch};

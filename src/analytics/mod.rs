//! Match analytics.
//!
//! Pure, stateless computations over raw match data:
//! - **profile**: top-category and cumulative performance summaries
//! - **timeline**: round-by-round event reconstruction with pagination
//!
//! Both are safe to invoke concurrently for unrelated identities/matches.

pub mod profile;
pub mod timeline;

pub use profile::{agent_breakdown, summarize, AgentBreakdown, CategoryCount, ProfileSummary};
pub use timeline::{
    paginate, reconstruct, total_pages, RoundTimeline, TimelinePage, ROUNDS_PER_PAGE,
};

//! Prop allocation and hint delivery for Parlor.
//!
//! Two fairness-critical engines live here:
//!
//! - **Props** ([`props`]): distributes the session's pool of story props
//!   (envelopes) across players so no player ever leads another by more than
//!   one, deterministically and idempotently. Already-placed props are never
//!   reshuffled, only topped up.
//! - **Hints** ([`hints`]): delivers tiered clue text from round-scoped
//!   prepared content. The discoverer keeps their tier; everyone else gets a
//!   degraded tier resolved from a data-driven sharing-rules table. The
//!   designated culprit can destroy a hint, subject to a quota.
//!
//! Both are pure functions over [`SessionState`](parlor_state::SessionState);
//! [`DealEngine`] wraps them with the session lock, persistence, and the
//! targeted/broadcast pushes clients rely on.

mod engine;
mod error;
pub mod hints;
pub mod props;

pub use engine::DealEngine;
pub use error::DealError;
pub use props::{Distribution, PoolSummary, Reassignment};

//! Trip domain logic: derived-field computation and the atomic
//! trip-creation transaction.

pub mod create;
pub mod duration;
pub mod invites;
pub mod waypoint;

pub use create::{create_trip, CreateTripOutcome, CreateTripRequest, InviteSummary};
pub use duration::duration_days;
pub use invites::{answer_invite, InviteAnswer};
pub use waypoint::{classify, WaypointError, WaypointKind};

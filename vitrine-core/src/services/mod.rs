//! Service layer for business logic
//!
//! Services own the rules of the three subsystems and talk to storage only
//! through the repository traits.

pub mod calendar;
pub mod content;
pub mod login_guard;
pub mod notifier;
pub mod reminder;
pub mod sequencer;

pub use calendar::CalendarService;
pub use content::ContentService;
pub use login_guard::LoginGuardService;
pub use notifier::{Notifier, ReminderNotice, TracingNotifier};
pub use reminder::{PollReport, ReminderScheduler};
pub use sequencer::{PositionClaim, PositionSequencer, ShiftReport};

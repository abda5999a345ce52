//! Domain records persisted by the storage backends.

mod calendar;
mod content;
mod login_attempt;

pub use calendar::{
    CalendarEvent, CalendarEventUpdate, CalendarEventView, DueReminder, NewCalendarEvent,
};
pub use content::{
    Blog, BlogPatch, ContentDraft, ContentKind, ContentPatch, Item, ItemPatch, ListQuery, NewBlog,
    NewItem, Orderable,
};
pub use login_attempt::{LockoutStatus, LoginAttempt};

//! Core types: calendar documents, event times, keyword filter, date heuristics

pub mod dates;
pub mod event;
pub mod filter;
pub mod time;
pub mod tracing;

pub use dates::{TimeRange, find_date, find_time_range, nearest_week_day, week_dates};
pub use event::{CalendarDocument, CalendarEvent, CalendarMetadata};
pub use filter::{DEFAULT_KEYWORDS, KeywordFilter};
pub use time::{EventTime, localize, parse_timezone};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};

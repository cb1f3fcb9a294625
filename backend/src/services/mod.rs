pub mod attendance_recorder;
pub mod missed_sessions;
pub mod notification;
pub mod report;
pub mod token_lifecycle;

pub use attendance_recorder::AttendanceRecorder;
pub use missed_sessions::MissedSessionResolver;
pub use notification::{EmailNotifier, LogNotifier, SignatureNotifier};
pub use report::AttendanceReportService;
pub use token_lifecycle::{SignatureService, SignatureSettings};

pub mod attendance;
pub mod timetable;

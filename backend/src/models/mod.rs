pub mod actor;
pub mod attendance;
pub mod class_session;
pub mod report;
pub mod signature_token;
pub mod subject;

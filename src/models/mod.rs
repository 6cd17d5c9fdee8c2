pub mod contact;
pub mod dispatch;
pub mod sos_event;

pub mod synthetic_session;

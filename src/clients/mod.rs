pub mod backend_client;
pub mod google_auth;
pub mod google_calendar;
pub mod openai_client;

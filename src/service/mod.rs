pub mod calendar_service;
pub mod openai_service;
pub mod planner;
pub mod timezone;
pub mod tools;

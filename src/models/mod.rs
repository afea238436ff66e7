pub mod exercise;
pub mod question;

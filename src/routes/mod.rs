pub mod generate;
pub mod health;
pub mod question_types;

pub mod credential_pool;
pub mod distribution_enforcer;
pub mod distribution_planner;
pub mod extraction_service;
pub mod finalizer;
pub mod gemini_client;
pub mod generation_service;
pub mod placeholder;
pub mod prompt_builder;
pub mod type_catalog;

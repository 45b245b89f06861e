pub mod session;
pub mod demo;
pub mod guard;
pub mod convention_workflow;
pub mod offer_service;
pub mod application_service;
pub mod convention_service;
pub mod report_service;
pub mod evaluation_service;
pub mod dashboard_service;
pub mod auth_service;
pub mod profile_service;

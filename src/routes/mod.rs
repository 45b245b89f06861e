pub mod health;
pub mod auth;
pub mod offers;
pub mod applications;
pub mod conventions;
pub mod reports;
pub mod evaluations;
pub mod dashboard;
pub mod profile;
pub mod students;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .service(dashboard::dashboard)
            .configure(auth::auth_routes)
            .configure(offers::offers_routes)
            .configure(applications::applications_routes)
            .configure(conventions::conventions_routes)
            .configure(reports::reports_routes)
            .configure(evaluations::evaluations_routes)
            .configure(profile::profile_routes)
            .configure(students::students_routes)
    );
}

// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admission, class, exam, public, quiz, result, student},
    state::AppState,
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Merges all sub-routers (admissions, students, classes, exams, results, quizzes, public).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store + config).
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let admission_routes = Router::new()
        .route(
            "/admission-settings",
            get(admission::get_settings).put(admission::update_settings),
        )
        .route(
            "/admission-applications",
            get(admission::list_applications).post(admission::submit_application),
        )
        .route(
            "/admission-applications/{id}",
            get(admission::get_application)
                .put(admission::review_application)
                .delete(admission::delete_application),
        );

    let student_routes = Router::new()
        .route("/", get(student::list_students).post(student::create_student))
        .route("/{id}", get(student::get_student));

    let class_routes = Router::new()
        .route("/", get(class::list_classes).post(class::create_class))
        .route(
            "/{id}",
            get(class::get_class)
                .put(class::update_class)
                .delete(class::delete_class),
        );

    let exam_routes = Router::new()
        .route("/", get(exam::list_categories).post(exam::create_category))
        .route(
            "/{id}",
            get(exam::get_category)
                .put(exam::update_category)
                .delete(exam::delete_category),
        )
        .route(
            "/{id}/subjects",
            get(exam::list_subjects).post(exam::create_subject),
        )
        .route(
            "/{id}/subjects/{subject_id}",
            put(exam::update_subject).delete(exam::delete_subject),
        )
        .route("/{id}/summary", get(exam::category_summary));

    let result_routes = Router::new()
        .route("/", get(result::list_results).post(result::enter_score))
        .route("/bulk", post(result::enter_scores_bulk))
        .route("/{id}", delete(result::delete_result));

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes).post(quiz::create_quiz))
        .route(
            "/{id}",
            get(quiz::get_quiz)
                .put(quiz::update_quiz)
                .delete(quiz::delete_quiz),
        )
        .route("/{id}/paper", get(quiz::get_paper))
        .route("/{id}/stats", get(quiz::quiz_stats));

    let attempt_routes = Router::new()
        .route("/", get(quiz::list_attempts).post(quiz::submit_attempt))
        .route("/{id}", delete(quiz::delete_attempt));

    let public_routes = Router::new()
        .route("/quizzes/{id}", get(public::get_public_quiz))
        .route("/quiz-attempts", post(public::submit_public_attempt))
        .route("/results", get(public::public_results));

    let api = Router::new()
        .route("/health", get(public::health))
        .merge(admission_routes)
        .nest("/students", student_routes)
        .nest("/classes", class_routes)
        .nest("/exam-categories", exam_routes)
        .nest("/exam-results", result_routes)
        .nest("/quizzes", quiz_routes)
        .nest("/quiz-attempts", attempt_routes)
        .nest("/public", public_routes);

    Router::new()
        .nest("/api", api)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

//! elearn-api library - course sequencing and progress service
//!
//! Courses, batches, weeks, sessions, tests and enrollments over a REST API.
//! Weeks and sessions stay contiguously numbered, publishing and deletion
//! are gated, and every fact an enrollment records flows into its progress.

use axum::Router;
use elearn_common::{time, ProgressPolicy, ReorderStrategy};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod auth;
pub mod db;
pub mod error;
pub mod response;
pub mod services;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Weights for the progress percentage
    pub policy: ProgressPolicy,
    /// How siblings make room when a week or session is renumbered
    pub reorder_strategy: ReorderStrategy,
}

impl AppState {
    pub fn new(db: SqlitePool, policy: ProgressPolicy, reorder_strategy: ReorderStrategy) -> Self {
        Self {
            db,
            policy,
            reorder_strategy,
        }
    }

    /// Mutation rules as of today
    pub fn rules(&self) -> services::Rules {
        services::Rules {
            policy: self.policy,
            reorder_strategy: self.reorder_strategy,
            as_of: time::today(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, patch, post, put};

    let courses = Router::new()
        .route(
            "/api/courses",
            get(api::courses::list_courses).post(api::courses::create_course),
        )
        .route(
            "/api/courses/:course_id",
            get(api::courses::get_course).delete(api::courses::delete_course),
        )
        .route(
            "/api/courses/:course_id/batches",
            get(api::courses::list_batches).post(api::courses::create_batch),
        );

    let curriculum = Router::new()
        .route(
            "/api/courses/:course_id/weeks",
            get(api::weeks::list_weeks).post(api::weeks::create_week),
        )
        .route(
            "/api/courses/:course_id/weeks/:week_id",
            get(api::weeks::get_week)
                .patch(api::weeks::update_week)
                .delete(api::weeks::delete_week),
        )
        .route(
            "/api/courses/:course_id/weeks/:week_id/sessions",
            get(api::sessions::list_sessions).post(api::sessions::create_session),
        )
        .route(
            "/api/courses/:course_id/weeks/:week_id/sessions/:session_id",
            get(api::sessions::get_session)
                .patch(api::sessions::update_session)
                .delete(api::sessions::delete_session),
        )
        .route(
            "/api/courses/:course_id/weeks/:week_id/test",
            get(api::weekly_tests::get_test)
                .post(api::weekly_tests::create_test)
                .patch(api::weekly_tests::update_test)
                .delete(api::weekly_tests::delete_test),
        );

    let learning = Router::new()
        .route(
            "/api/batches/:batch_id/enrollments",
            post(api::enrollments::enroll),
        )
        .route(
            "/api/enrollments/:enrollment_id",
            patch(api::enrollments::update_status),
        )
        .route(
            "/api/enrollments/:enrollment_id/session-views",
            put(api::enrollments::record_view),
        )
        .route(
            "/api/enrollments/:enrollment_id/submissions",
            post(api::enrollments::submit_test),
        )
        .route(
            "/api/submissions/:submission_id/grade",
            post(api::enrollments::grade_submission),
        )
        .route(
            "/api/enrollments/:enrollment_id/progress",
            get(api::enrollments::get_progress),
        )
        .route(
            "/api/enrollments/:enrollment_id/progress/recompute",
            post(api::enrollments::recompute_progress),
        );

    Router::new()
        .merge(courses)
        .merge(curriculum)
        .merge(learning)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! # sb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the core
//! services. The acting user is resolved from the `Authorization: Bearer`
//! header on every request; nothing about the session lives in cookies.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use askama::Template;
use dashmap::DashMap;
use sb_core::error::AppError;
use sb_core::models::{AppointmentRequest, Comment, Identity, ReviewStatus};
use sb_core::traits::{paths, DocumentStore, IdentityProvider};
use sb_core::{
    BookingService, CommentEditor, CommentSynchronizer, EditorState, PostOrder, ReviewBoard,
};
use sb_ui::{IndexTemplate, PostTemplate};
use serde::Deserialize;
use serde_json::json;

/// State shared across all Actix-web workers.
pub struct AppState {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn IdentityProvider>,
    comments: CommentSynchronizer,
    booking: BookingService,
    reviews: RwLock<ReviewBoard>,
    /// Editors with an action open, one per (session token, post). A second
    /// request from the same session meets the first one's in-flight write.
    editors: DashMap<(String, String), Arc<CommentEditor>>,
    admin_email: Option<String>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn IdentityProvider>,
        order: PostOrder,
    ) -> Self {
        Self {
            comments: CommentSynchronizer::new(store.clone(), order),
            booking: BookingService::new(store.clone()),
            reviews: RwLock::new(ReviewBoard::with_sample_data()),
            editors: DashMap::new(),
            admin_email: None,
            store,
            auth,
        }
    }

    /// Only this account may use the review dashboard.
    pub fn with_admin(mut self, email: Option<String>) -> Self {
        self.admin_email = email.map(|email| email.trim().to_lowercase());
        self
    }

    /// Anonymous callers get a throwaway editor.
    fn editor(&self, session: Option<&Session>, post_id: &str) -> EditorLease<'_> {
        let Some(session) = session else {
            return EditorLease {
                state: self,
                key: None,
                editor: Arc::new(CommentEditor::new(self.store.clone(), post_id)),
            };
        };
        let key = (session.token.clone(), post_id.to_string());
        let editor = self
            .editors
            .entry(key.clone())
            .or_insert_with(|| Arc::new(CommentEditor::new(self.store.clone(), post_id)))
            .value()
            .clone();
        EditorLease {
            state: self,
            key: Some(key),
            editor,
        }
    }

    fn read_reviews(&self) -> Result<RwLockReadGuard<'_, ReviewBoard>, ApiError> {
        self.reviews.read().map_err(|_| reviews_unavailable())
    }

    fn write_reviews(&self) -> Result<RwLockWriteGuard<'_, ReviewBoard>, ApiError> {
        self.reviews.write().map_err(|_| reviews_unavailable())
    }
}

/// A session's editor for the length of one request. Dropping it evicts the
/// editor once no action is left open.
struct EditorLease<'a> {
    state: &'a AppState,
    key: Option<(String, String)>,
    editor: Arc<CommentEditor>,
}

impl Deref for EditorLease<'_> {
    type Target = CommentEditor;

    fn deref(&self) -> &CommentEditor {
        &self.editor
    }
}

impl Drop for EditorLease<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.state.editors.remove_if(&key, |_, editor| {
                matches!(editor.state(), EditorState::Idle | EditorState::Composing)
            });
        }
    }
}

fn reviews_unavailable() -> ApiError {
    log::error!("review board lock poisoned");
    AppError::Internal("reviews are unavailable right now".into()).into()
}

/// An `AppError` on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    error: AppError,
    status: StatusCode,
}

impl ApiError {
    /// A refusal for a signed-in caller means the ownership gate said no.
    fn for_caller(error: AppError, session: Option<&Session>) -> Self {
        let mut api_error = Self::from(error);
        if session.is_some() && matches!(api_error.error, AppError::Unauthorized(_)) {
            api_error.status = StatusCode::FORBIDDEN;
        }
        api_error
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        let status = match &error {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::WriteFailure => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { error, status }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(json!({ "error": self.error.to_string() }))
    }
}

type ApiResult = Result<HttpResponse, ApiError>;

struct Session {
    token: String,
    identity: Identity,
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn session(req: &HttpRequest, data: &AppState) -> Option<Session> {
    let token = bearer_token(req)?;
    let identity = data.auth.identify(token).await?;
    Some(Session {
        token: token.to_string(),
        identity,
    })
}

async fn require_admin(req: &HttpRequest, data: &AppState) -> Result<Identity, ApiError> {
    let session = session(req, data)
        .await
        .ok_or_else(|| AppError::unauthorized("sign in first"))?;
    let is_admin = match (&data.admin_email, &session.identity.email) {
        (Some(admin), Some(email)) => *admin == email.to_lowercase(),
        _ => false,
    };
    if !is_admin {
        return Err(ApiError::for_caller(
            AppError::unauthorized("admin access required"),
            Some(&session),
        ));
    }
    Ok(session.identity)
}

fn render(template: impl Template, status: StatusCode) -> ApiResult {
    let html = template.render().map_err(|err| {
        log::error!("template rendering failed: {err}");
        AppError::Internal("page could not be rendered".into())
    })?;
    Ok(HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(html))
}

async fn ensure_post(data: &AppState, post_id: &str) -> Result<(), ApiError> {
    match data.store.get(&paths::post(post_id)).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(AppError::NotFound("Post".into(), post_id.into()).into()),
        Err(err) => {
            log::error!("reading post {post_id} failed: {err:#}");
            Err(AppError::Internal("posts are unavailable right now".into()).into())
        }
    }
}

async fn load_comment(data: &AppState, post_id: &str, comment_id: &str) -> Result<Comment, ApiError> {
    let path = paths::comment(post_id, comment_id);
    let not_found = || AppError::NotFound("Comment".into(), comment_id.into());

    let record = data
        .store
        .get(&path)
        .await
        .map_err(|err| {
            log::error!("reading {path} failed: {err:#}");
            AppError::Internal("comments are unavailable right now".into())
        })?
        .ok_or_else(not_found)?;
    let mut comment: Comment = serde_json::from_value(record).map_err(|err| {
        log::warn!("comment {path} is malformed: {err}");
        not_found()
    })?;
    comment.id = comment_id.to_string();
    Ok(comment)
}

/// Blog index page.
pub async fn index(data: web::Data<AppState>) -> ApiResult {
    let posts = data.comments.posts().await?;
    render(IndexTemplate::new(&posts), StatusCode::OK)
}

/// Post page. A missing post still renders, with a 404 status.
pub async fn view_post(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let view = data.comments.snapshot(&path.into_inner()).await?;
    let status = if view.current_post.is_some() {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    render(PostTemplate::from_view(&view), status)
}

/// JSON view of a post. `currentPost` is null when the post does not exist.
pub async fn post_view(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let view = data.comments.snapshot(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub async fn sign_in(data: web::Data<AppState>, body: web::Json<Credentials>) -> ApiResult {
    let (token, user) = data.auth.sign_in(&body.email, &body.password).await?;
    Ok(HttpResponse::Ok().json(json!({ "token": token, "user": user })))
}

/// Ends the session and drops any editor it still has open.
pub async fn sign_out(data: web::Data<AppState>, req: HttpRequest) -> ApiResult {
    let token = bearer_token(&req).ok_or_else(|| AppError::unauthorized("not signed in"))?;
    if !data.auth.sign_out(token).await {
        return Err(AppError::unauthorized("not signed in").into());
    }
    data.editors.retain(|(session, _), _| session != token);
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub comment: String,
}

pub async fn add_comment(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<CommentBody>,
) -> ApiResult {
    let post_id = path.into_inner();
    ensure_post(&data, &post_id).await?;

    let session = session(&req, &data).await;
    let editor = data.editor(session.as_ref(), &post_id);
    editor.set_draft(body.into_inner().comment);

    let comment = editor
        .submit(session.as_ref().map(|s| &s.identity))
        .await
        .map_err(|err| ApiError::for_caller(err, session.as_ref()))?;
    Ok(HttpResponse::Created().json(comment))
}

pub async fn edit_comment(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
    body: web::Json<CommentBody>,
) -> ApiResult {
    let (post_id, comment_id) = path.into_inner();
    let comment = load_comment(&data, &post_id, &comment_id).await?;

    let session = session(&req, &data).await;
    let identity = session.as_ref().map(|s| &s.identity);
    let refuse = |err| ApiError::for_caller(err, session.as_ref());
    let editor = data.editor(session.as_ref(), &post_id);

    editor.start_edit(identity, &comment).map_err(refuse)?;
    let saved = match editor.set_edit_text(body.into_inner().comment) {
        Ok(()) => editor.save_edit(identity).await,
        Err(err) => Err(err),
    };
    if let Err(err) = saved {
        editor.cancel_edit();
        return Err(refuse(err));
    }

    let updated = load_comment(&data, &post_id, &comment_id).await?;
    Ok(HttpResponse::Ok().json(updated))
}

pub async fn delete_comment(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> ApiResult {
    let (post_id, comment_id) = path.into_inner();
    let comment = load_comment(&data, &post_id, &comment_id).await?;

    let session = session(&req, &data).await;
    let identity = session.as_ref().map(|s| &s.identity);
    let refuse = |err| ApiError::for_caller(err, session.as_ref());
    let editor = data.editor(session.as_ref(), &post_id);

    editor.request_delete(identity, &comment).map_err(refuse)?;
    if let Err(err) = editor.confirm_delete(identity).await {
        editor.cancel_delete();
        return Err(refuse(err));
    }
    Ok(HttpResponse::NoContent().finish())
}

pub async fn book_appointment(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<AppointmentRequest>,
) -> ApiResult {
    let session = session(&req, &data).await;
    let appointment = data
        .booking
        .book(session.as_ref().map(|s| &s.identity), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(appointment))
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub status: Option<ReviewStatus>,
    pub q: Option<String>,
}

pub async fn list_reviews(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ReviewQuery>,
) -> ApiResult {
    require_admin(&req, &data).await?;
    let board = data.read_reviews()?;
    let reviews = board.filter(query.status, query.q.as_deref());
    Ok(HttpResponse::Ok().json(json!({
        "reviews": reviews,
        "counts": board.counts(),
        "published": board.published().len(),
    })))
}

/// `POST /api/admin/reviews/{id}/{approve|reject|reset}`
pub async fn moderate_review(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> ApiResult {
    let admin = require_admin(&req, &data).await?;
    let (review_id, action) = path.into_inner();

    let mut board = data.write_reviews()?;
    let review = match action.as_str() {
        "approve" => board.approve(&review_id)?.clone(),
        "reject" => board.reject(&review_id)?.clone(),
        "reset" => board.reset(&review_id)?.clone(),
        other => return Err(AppError::NotFound("Action".into(), other.into()).into()),
    };
    log::info!("{} applied {action} to review {review_id}", admin.uid);
    Ok(HttpResponse::Ok().json(review))
}

pub async fn delete_review(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> ApiResult {
    require_admin(&req, &data).await?;
    let removed = data.write_reviews()?.delete(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(removed))
}

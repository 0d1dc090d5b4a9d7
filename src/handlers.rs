use crate::auth::{hash_password, verify_password, BearerToken, CurrentUser};
use crate::db;
use crate::error::{AppError, FormBody, JsonBody, PathParam, QueryParams, Result};
use crate::models::{Link, LinkFilter, NewLink, User};
use crate::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct RegisterUser {
    username: String,
    password: String,
}

/// Form body of `POST /token`. Extra OAuth2 form fields are ignored.
#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub struct AuthToken {
    access_token: String,
    token_type: &'static str,
}

#[derive(Serialize)]
pub struct Message {
    msg: &'static str,
}

#[derive(Serialize)]
pub struct TokenEcho {
    token: String,
}

#[derive(Deserialize)]
pub struct CreateLink {
    url: String,
    descripcion: String,
}

#[derive(Deserialize)]
pub struct PredictRequest {
    content: String,
}

#[derive(Serialize)]
pub struct Prediction {
    prediction: String,
}

pub async fn register_user(
    State(state): State<AppState>,
    JsonBody(user_data): JsonBody<RegisterUser>,
) -> Result<Json<Message>> {
    let password_hash = hash_password(&user_data.password, state.auth.bcrypt_cost).await?;

    db::insert_user(&state.db, &user_data.username, &password_hash).await?;
    tracing::info!(username = %user_data.username, "user registered");

    Ok(Json(Message {
        msg: "User registered successfully!",
    }))
}

pub async fn login(
    State(state): State<AppState>,
    FormBody(login_data): FormBody<LoginForm>,
) -> Result<Json<AuthToken>> {
    let user = db::find_user_by_username(&state.db, &login_data.username).await?;
    let verified = match &user {
        Some(user) => verify_password(&login_data.password, &user.password).await,
        None => false,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::warn!(username = %login_data.username, "failed login");
            return Err(AppError::bad_request("Incorrect username or password"));
        }
    };

    Ok(Json(AuthToken {
        access_token: user.username,
        token_type: "bearer",
    }))
}

pub async fn read_users_me(BearerToken(token): BearerToken) -> Json<TokenEcho> {
    Json(TokenEcho { token })
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    Ok(Json(db::list_users(&state.db).await?))
}

pub async fn create_link(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(link): JsonBody<CreateLink>,
) -> Result<Json<Link>> {
    let page = state
        .extractor
        .extract(&link.url)
        .await
        .ok_or_else(|| AppError::bad_request("Could not extract information from the URL"))?;

    let categoria = state.classifier.predict(&page.contenido);

    let created = db::insert_link(
        &state.db,
        &NewLink {
            url: &link.url,
            descripcion: &link.descripcion,
            titulo: &page.titulo,
            contenido: &page.contenido,
            categoria,
            user_id: user.id,
        },
    )
    .await?;

    tracing::info!(
        link_id = created.id,
        user = %user.username,
        categoria = %created.categoria,
        "link created"
    );

    Ok(Json(created))
}

pub async fn list_links(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    QueryParams(filter): QueryParams<LinkFilter>,
) -> Result<Json<Vec<Link>>> {
    Ok(Json(db::list_links(&state.db, user.id, &filter).await?))
}

pub async fn delete_link(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParam(link_id): PathParam<i64>,
) -> Result<Json<Message>> {
    if !db::delete_link(&state.db, user.id, link_id).await? {
        return Err(AppError::not_found("Link not found"));
    }

    tracing::info!(link_id, user = %user.username, "link deleted");

    Ok(Json(Message {
        msg: "Link deleted successfully",
    }))
}

pub async fn predict(
    State(state): State<AppState>,
    JsonBody(data): JsonBody<PredictRequest>,
) -> Json<Prediction> {
    Json(Prediction {
        prediction: state.classifier.predict(&data.content).to_string(),
    })
}

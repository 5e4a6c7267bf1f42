//! Users API handlers.
//!
//! ```text
//! GET  /api/users
//! GET  /api/users/3fa85f64-5717-4562-b3fc-2c963f66afa6
//! POST /api/users {"email":"ada@example.com","firstName":"Ada","lastName":"Lovelace"}
//! ```

use actix_web::http::header;
use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use utoipa::ToSchema;

use crate::domain::{Error, NewUser, User, UserId, UserValidationError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Wire representation of a stored user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub id: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "Ada")]
    pub first_name: String,
    #[schema(example = "Lovelace")]
    pub last_name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            email: user.email().as_ref().to_owned(),
            first_name: user.first_name().as_ref().to_owned(),
            last_name: user.last_name().as_ref().to_owned(),
        }
    }
}

/// Body of `GET /api/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UsersResponse {
    pub users: Vec<UserResponse>,
}

/// Request body for `POST /api/users`.
///
/// Example JSON:
/// `{"email":"ada@example.com","firstName":"Ada","lastName":"Lovelace"}`
///
/// `email` is required. An omitted name is stored as the empty string. When a
/// key is repeated the last occurrence wins.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[schema(example = "ada@example.com", max_length = 255)]
    pub email: String,
    #[serde(default)]
    #[schema(example = "Ada", max_length = 96)]
    pub first_name: String,
    #[serde(default)]
    #[schema(example = "Lovelace", max_length = 96)]
    pub last_name: String,
}

impl CreateUserRequest {
    /// Read the request from a parsed JSON object.
    ///
    /// Parsing into a map first collapses repeated keys before the fields are
    /// typed, which a derived struct deserializer would reject outright.
    fn from_object(fields: Map<String, Value>) -> Result<Self, Error> {
        serde_json::from_value(Value::Object(fields)).map_err(|err| {
            Error::invalid_request("request body is not valid")
                .with_details(json!({ "reason": err.to_string() }))
        })
    }
}

impl TryFrom<CreateUserRequest> for NewUser {
    type Error = UserValidationError;

    fn try_from(value: CreateUserRequest) -> Result<Self, Self::Error> {
        Self::try_from_strings(value.email, value.first_name, value.last_name)
    }
}

fn map_validation_error(err: UserValidationError) -> Error {
    let details = match &err {
        UserValidationError::InvalidId => json!({ "field": "id", "code": "invalid_uuid" }),
        UserValidationError::EmailTooLong { max } => {
            json!({ "field": "email", "code": "too_long", "max": max })
        }
        UserValidationError::NameTooLong { field, max } => {
            json!({ "field": field, "code": "too_long", "max": max })
        }
    };
    Error::invalid_request(err.to_string()).with_details(details)
}

/// List every user.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use workshop::inbound::http::users::list_users;
///
/// let app = App::new().service(web::scope("/api/users").service(list_users));
/// ```
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Users", body = UsersResponse),
        (status = 503, description = "Store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("")]
pub async fn list_users(state: web::Data<HttpState>) -> ApiResult<web::Json<UsersResponse>> {
    let users = state.users.list().await?;
    Ok(web::Json(UsersResponse {
        users: users.iter().map(UserResponse::from).collect(),
    }))
}

/// Fetch one user by identifier.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User identifier (UUID)")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 400, description = "Identifier is not a UUID", body = ErrorSchema),
        (status = 404, description = "No such user", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "getUser"
)]
#[get("/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<UserResponse>> {
    let id = UserId::new(path.into_inner()).map_err(map_validation_error)?;
    let user = state.users.get(&id).await?;
    Ok(web::Json(UserResponse::from(&user)))
}

/// Create a user and return it with its assigned identifier.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (
            status = 201,
            description = "User created",
            body = UserResponse,
            headers(("Location" = String, description = "Path of the created user"))
        ),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "Email already registered", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "createUser"
)]
#[post("")]
pub async fn create_user(
    state: web::Data<HttpState>,
    payload: web::Json<Map<String, Value>>,
) -> ApiResult<HttpResponse> {
    let request = CreateUserRequest::from_object(payload.into_inner())?;
    let new_user = NewUser::try_from(request).map_err(map_validation_error)?;
    let user = state.users.create(new_user).await?;
    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, format!("/api/users/{}", user.id())))
        .json(UserResponse::from(&user)))
}

/// Register the users routes under `/api/users`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .service(list_users)
            .service(create_user)
            .service(get_user),
    );
}

#[cfg(test)]
mod tests;

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Serialize;

use crate::{
    accounts::AccountService,
    auth::Identity,
    error::ApiError,
    model::{LoginRequest, RegisterRequest, UpdateUserRequest},
};

#[post("/register")]
async fn register(
    accounts: web::Data<AccountService>,
    form: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let resp = accounts.register(form.into_inner()).await?;

    Ok(HttpResponse::Created().json(resp))
}

#[post("/login")]
async fn login(
    accounts: web::Data<AccountService>,
    form: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let resp = accounts.login(form.into_inner()).await?;

    Ok(HttpResponse::Ok().json(resp))
}

#[post("")]
async fn create_user(
    _session: Identity,
    accounts: web::Data<AccountService>,
    form: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = accounts.create(form.into_inner()).await?;

    Ok(HttpResponse::Created().json(user))
}

#[get("")]
async fn list_users(
    _session: Identity,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(accounts.list().await?))
}

#[get("/{id}")]
async fn get_user(
    _session: Identity,
    accounts: web::Data<AccountService>,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(accounts.get(*id).await?))
}

#[put("/{id}")]
async fn update_user(
    _session: Identity,
    accounts: web::Data<AccountService>,
    id: web::Path<i64>,
    form: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = accounts.update(*id, form.into_inner()).await?;

    Ok(HttpResponse::Ok().json(user))
}

#[delete("/{id}")]
async fn delete_user(
    _session: Identity,
    accounts: web::Data<AccountService>,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    #[derive(Serialize)]
    struct Deleted {
        message: &'static str,
    }

    accounts.delete(*id).await?;

    Ok(HttpResponse::Ok().json(Deleted {
        message: "User deleted successfully",
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    let auth = web::scope("/auth").service(register).service(login);

    let users = web::scope("/users")
        .service(create_user)
        .service(list_users)
        .service(get_user)
        .service(update_user)
        .service(delete_user);

    cfg.service(auth).service(users);
}

use std::sync::Arc;

use log::{debug, error, info};

use crate::{
    auth::{self, TokenCodec},
    db::UserStore,
    error::{is_unique_violation, ApiError},
    model::{AuthResponse, LoginRequest, RegisterRequest, UpdateUserRequest, User},
    validation,
};

// same text for unknown email and wrong password
const INVALID_CREDENTIALS: ApiError = ApiError::Auth("invalid email or password");
const EMAIL_TAKEN: ApiError = ApiError::Conflict("user with this email already exists");
const USER_NOT_FOUND: ApiError = ApiError::NotFound("user not found");

/// Registration, login and user management.
#[derive(Clone)]
pub struct AccountService {
    users: UserStore,
    tokens: Arc<TokenCodec>,
}

impl AccountService {
    pub fn new(users: UserStore, tokens: Arc<TokenCodec>) -> Self {
        Self { users, tokens }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, ApiError> {
        validation::registration(&req).map_err(ApiError::Validation)?;

        let user = self.insert_user(&req.name, &req.email, &req.password).await?;

        info!("registered user {} <{}>", user.id, user.email);

        self.authenticated(user)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ApiError> {
        validation::login(&req).map_err(ApiError::Validation)?;

        let user = match self.users.get_by_email(&req.email).await {
            Ok(Some(x)) => x,
            Ok(None) => {
                debug!("login attempt for unknown email");
                return Err(INVALID_CREDENTIALS);
            }
            Err(x) => {
                error!("failed to look up user by email: {x}");
                return Err(INVALID_CREDENTIALS);
            }
        };

        if auth::verify_password(&req.password, &user.password_hash).is_err() {
            debug!("wrong password for user {}", user.id);
            return Err(INVALID_CREDENTIALS);
        }

        self.authenticated(user)
    }

    pub async fn create(&self, req: RegisterRequest) -> Result<User, ApiError> {
        validation::registration(&req).map_err(ApiError::Validation)?;

        self.insert_user(&req.name, &req.email, &req.password).await
    }

    pub async fn get(&self, id: i64) -> Result<User, ApiError> {
        self.users.get_by_id(id).await?.ok_or(USER_NOT_FOUND)
    }

    pub async fn list(&self) -> Result<Vec<User>, ApiError> {
        Ok(self.users.get_all().await?)
    }

    pub async fn update(&self, id: i64, req: UpdateUserRequest) -> Result<User, ApiError> {
        validation::profile(&req).map_err(ApiError::Validation)?;

        if let Some(owner) = self.users.get_by_email(&req.email).await? {
            if owner.id != id {
                return Err(EMAIL_TAKEN);
            }
        }

        match self.users.update(id, &req.name, &req.email).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(USER_NOT_FOUND),
            Err(x) if is_unique_violation(&x) => Err(EMAIL_TAKEN),
            Err(x) => Err(x.into()),
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        if !self.users.delete(id).await? {
            return Err(USER_NOT_FOUND);
        }

        info!("deleted user {id}");

        Ok(())
    }

    async fn insert_user(&self, name: &str, email: &str, password: &str) -> Result<User, ApiError> {
        if self.users.exists_by_email(email).await? {
            return Err(EMAIL_TAKEN);
        }

        let hash = auth::hash_password(password)
            .map_err(|x| ApiError::Internal(format!("failed to hash password: {x}")))?;

        // the existence check above is not atomic with the insert, the
        // UNIQUE constraint catches whoever loses the race
        match self.users.create(name, email, &hash).await {
            Ok(user) => Ok(user),
            Err(x) if is_unique_violation(&x) => Err(EMAIL_TAKEN),
            Err(x) => Err(x.into()),
        }
    }

    fn authenticated(&self, user: User) -> Result<AuthResponse, ApiError> {
        let issued = self.tokens.issue(user.id, &user.email)?;

        Ok(AuthResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            user,
        })
    }
}

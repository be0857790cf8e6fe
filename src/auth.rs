use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use argon2::{
	password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString},
	Argon2, PasswordHash,
};
use futures_util::future::{ready, Ready};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{config::JwtConfig, error::ApiError};

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
	let salt = SaltString::generate(&mut OsRng);

	Ok(Argon2::default()
		.hash_password(password.as_bytes(), &salt)?
		.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<(), argon2::password_hash::Error> {
	Argon2::default().verify_password(password.as_bytes(), &PasswordHash::new(hash)?)
}

/// Payload of a credential token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
	pub user_id: i64,
	pub email: String,
	pub iat: i64,
	pub nbf: i64,
	pub exp: i64,
}

pub struct IssuedToken {
	pub token: String,
	pub expires_at: OffsetDateTime,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid token")]
pub struct InvalidToken(#[source] jsonwebtoken::errors::Error);

/// Issues and checks HMAC-signed JWTs. Tokens are never stored; a token is
/// valid for as long as its signature checks out and `exp` is in the future.
pub struct TokenCodec {
	encoding: EncodingKey,
	decoding: DecodingKey,
	validation: Validation,
	ttl: Duration,
}

impl TokenCodec {
	pub fn new(config: &JwtConfig) -> Self {
		let ttl = Duration::try_from(config.expiration).unwrap_or(Duration::MAX);

		Self::with_ttl(config.secret.as_bytes(), ttl)
	}

	pub fn with_ttl(secret: &[u8], ttl: Duration) -> Self {
		// any HMAC variant is fine, anything else (RSA, EC, none) is rejected
		let mut validation = Validation::new(Algorithm::HS256);
		validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
		validation.leeway = 0;
		validation.validate_nbf = true;
		validation.set_required_spec_claims(&["exp", "nbf"]);

		Self {
			encoding: EncodingKey::from_secret(secret),
			decoding: DecodingKey::from_secret(secret),
			validation,
			ttl,
		}
	}

	pub fn issue(&self, user_id: i64, email: &str) -> Result<IssuedToken, ApiError> {
		let now = OffsetDateTime::now_utc();
		let expires_at = now.saturating_add(self.ttl);

		let claims = Claims {
			user_id,
			email: email.to_owned(),
			iat: now.unix_timestamp(),
			nbf: now.unix_timestamp(),
			exp: expires_at.unix_timestamp(),
		};

		let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
			.map_err(|x| ApiError::Internal(format!("failed to sign token: {x}")))?;

		Ok(IssuedToken { token, expires_at })
	}

	pub fn verify(&self, token: &str) -> Result<Claims, InvalidToken> {
		decode::<Claims>(token, &self.decoding, &self.validation)
			.map(|data| data.claims)
			.map_err(InvalidToken)
	}
}

/// The caller behind a request, as proven by its bearer token.
///
/// Taking an `Identity` argument is what makes a handler protected: the
/// extractor rejects the request with 401 before the handler body runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
	pub user_id: i64,
	pub email: String,
}

impl FromRequest for Identity {
	type Error = ApiError;
	type Future = Ready<Result<Self, Self::Error>>;

	fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
		ready(authenticate(req))
	}
}

fn authenticate(req: &HttpRequest) -> Result<Identity, ApiError> {
	let value = req
		.headers()
		.get(header::AUTHORIZATION)
		.ok_or(ApiError::Auth("authorization header required"))?;

	let mut parts = value.to_str().unwrap_or_default().split(' ');

	let token = match (parts.next(), parts.next(), parts.next()) {
		(Some("Bearer"), Some(token), None) => token,
		_ => return Err(ApiError::Auth("authorization header format must be Bearer {token}")),
	};

	let codec = req
		.app_data::<web::Data<TokenCodec>>()
		.ok_or_else(|| ApiError::Internal("token codec is not registered with the app".into()))?;

	let claims = codec.verify(token).map_err(|x| {
		debug!("rejected bearer token: {:?}", x.0.kind());
		ApiError::Auth("invalid token")
	})?;

	Ok(Identity {
		user_id: claims.user_id,
		email: claims.email,
	})
}

#[cfg(test)]
mod tests {
	use actix_web::{http::StatusCode, test as actix_test, App, HttpResponse};

	use super::*;

	const SECRET: &[u8] = b"test-secret";

	fn codec() -> TokenCodec {
		TokenCodec::with_ttl(SECRET, Duration::hours(24))
	}

	#[test]
	fn password_roundtrip() {
		let hash = hash_password("secretpw").unwrap();

		assert!(hash.starts_with("$argon2"));
		assert!(!hash.contains("secretpw"));
		verify_password("secretpw", &hash).unwrap();
		verify_password("wrongpw", &hash).unwrap_err();

		// salted
		assert_ne!(hash, hash_password("secretpw").unwrap());
	}

	#[test]
	fn token_roundtrip() {
		let codec = codec();

		let issued = codec.issue(7, "alice@x.com").unwrap();
		let claims = codec.verify(&issued.token).unwrap();

		assert_eq!(claims.user_id, 7);
		assert_eq!(claims.email, "alice@x.com");
		assert_eq!(claims.iat, claims.nbf);
		assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
		assert_eq!(claims.exp, issued.expires_at.unix_timestamp());
	}

	#[test]
	fn token_from_other_secret_rejected() {
		let issued = TokenCodec::with_ttl(b"other-secret", Duration::hours(1))
			.issue(7, "alice@x.com")
			.unwrap();

		codec().verify(&issued.token).unwrap_err();
	}

	#[test]
	fn expired_token_rejected() {
		let issued = TokenCodec::with_ttl(SECRET, Duration::seconds(-120))
			.issue(7, "alice@x.com")
			.unwrap();

		codec().verify(&issued.token).unwrap_err();
	}

	#[test]
	fn future_token_rejected() {
		let now = OffsetDateTime::now_utc().unix_timestamp();
		let claims = Claims {
			user_id: 7,
			email: "alice@x.com".into(),
			iat: now,
			nbf: now + 3600,
			exp: now + 7200,
		};

		let token = encode(
			&Header::new(Algorithm::HS256),
			&claims,
			&EncodingKey::from_secret(SECRET),
		)
		.unwrap();

		codec().verify(&token).unwrap_err();
	}

	#[test]
	fn other_hmac_variant_accepted() {
		let now = OffsetDateTime::now_utc().unix_timestamp();
		let claims = Claims {
			user_id: 7,
			email: "alice@x.com".into(),
			iat: now,
			nbf: now,
			exp: now + 60,
		};

		let token = encode(
			&Header::new(Algorithm::HS512),
			&claims,
			&EncodingKey::from_secret(SECRET),
		)
		.unwrap();

		assert_eq!(codec().verify(&token).unwrap().user_id, 7);
	}

	#[test]
	fn unsigned_token_rejected() {
		// {"alg":"none","typ":"JWT"} . {"user_id":1,"email":"alice@x.com",...,"exp":4102444800} . <empty>
		let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.eyJ1c2VyX2lkIjoxLCJlbWFpbCI6ImFsaWNlQHguY29tIiwiaWF0IjoxNzAwMDAwMDAwLCJuYmYiOjE3MDAwMDAwMDAsImV4cCI6NDEwMjQ0NDgwMH0.";

		codec().verify(token).unwrap_err();
	}

	#[test]
	fn garbage_rejected() {
		codec().verify("").unwrap_err();
		codec().verify("not.a.jwt").unwrap_err();
		codec().verify("abc").unwrap_err();
	}

	async fn whoami(identity: Identity) -> HttpResponse {
		HttpResponse::Ok().body(format!("{}:{}", identity.user_id, identity.email))
	}

	async fn call(authorization: Option<&str>) -> (StatusCode, String) {
		let app = actix_test::init_service(
			App::new()
				.app_data(web::Data::new(codec()))
				.route("/whoami", web::get().to(whoami)),
		)
		.await;

		let mut req = actix_test::TestRequest::get().uri("/whoami");
		if let Some(x) = authorization {
			req = req.insert_header((header::AUTHORIZATION, x));
		}

		let resp = actix_test::call_service(&app, req.to_request()).await;
		let status = resp.status();
		let body = actix_test::read_body(resp).await;

		(status, String::from_utf8_lossy(&body).into_owned())
	}

	#[actix_web::test]
	async fn guard_admits_valid_token() {
		let token = codec().issue(7, "alice@x.com").unwrap().token;

		let (status, body) = call(Some(&format!("Bearer {token}"))).await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, "7:alice@x.com");
	}

	#[actix_web::test]
	async fn guard_rejects_uniformly() {
		let token = codec().issue(7, "alice@x.com").unwrap().token;
		let foreign = TokenCodec::with_ttl(b"other-secret", Duration::hours(1))
			.issue(7, "alice@x.com")
			.unwrap()
			.token;
		let expired = TokenCodec::with_ttl(SECRET, Duration::seconds(-120))
			.issue(7, "alice@x.com")
			.unwrap()
			.token;

		let (status, body) = call(None).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert!(body.contains("authorization header required"));

		for header in [
			format!("Basic {token}"),
			format!("bearer {token}"),
			format!("Bearer  {token}"),
			token.clone(),
		] {
			let (status, body) = call(Some(&header)).await;
			assert_eq!(status, StatusCode::UNAUTHORIZED, "{header}");
			assert!(body.contains("must be Bearer"), "{header}");
		}

		for bad in ["garbage".to_owned(), foreign, expired] {
			let (status, body) = call(Some(&format!("Bearer {bad}"))).await;
			assert_eq!(status, StatusCode::UNAUTHORIZED);
			assert_eq!(body, r#"{"error":"invalid token"}"#);
		}
	}

	#[actix_web::test]
	async fn guard_without_codec_is_internal_error() {
		let app =
			actix_test::init_service(App::new().route("/whoami", web::get().to(whoami))).await;

		let req = actix_test::TestRequest::get()
			.uri("/whoami")
			.insert_header((header::AUTHORIZATION, "Bearer abc"))
			.to_request();

		let resp = actix_test::call_service(&app, req).await;

		assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
	}
}

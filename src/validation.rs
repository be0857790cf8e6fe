use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{LoginRequest, RegisterRequest, UpdateUserRequest};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("email regex")
});

pub fn name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is required");
    }

    if name.len() < 3 {
        return Err("name must be at least 3 characters");
    }

    Ok(())
}

pub fn email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("email is required");
    }

    if !EMAIL.is_match(email) {
        return Err("invalid email format");
    }

    Ok(())
}

pub fn password(password: &str) -> Result<(), &'static str> {
    if password.is_empty() {
        return Err("password is required");
    }

    if password.len() < 6 {
        return Err("password must be at least 6 characters");
    }

    Ok(())
}

pub fn registration(req: &RegisterRequest) -> Result<(), &'static str> {
    name(&req.name)?;
    email(&req.email)?;
    password(&req.password)
}

pub fn profile(req: &UpdateUserRequest) -> Result<(), &'static str> {
    name(&req.name)?;
    email(&req.email)
}

/// Login only checks that both fields are present.
pub fn login(req: &LoginRequest) -> Result<(), &'static str> {
    if req.email.is_empty() {
        return Err("email is required");
    }

    if req.password.is_empty() {
        return Err("password is required");
    }

    Ok(())
}

#[test]
fn name_validation() {
    name("Alice").unwrap();
    name("Bob").unwrap();
    assert_eq!(name(""), Err("name is required"));
    assert_eq!(name("Al"), Err("name must be at least 3 characters"));
}

#[test]
fn email_validation() {
    email("alice@x.com").unwrap();
    email("first.last+tag@sub.example.org").unwrap();
    email("a_b%c-d@host-name.io").unwrap();
    assert_eq!(email(""), Err("email is required"));
    email("alice").unwrap_err();
    email("alice@x").unwrap_err();
    email("alice@x.c").unwrap_err();
    email("@x.com").unwrap_err();
    email("alice @x.com").unwrap_err();
    email("alice@x.com\n").unwrap_err();
}

#[test]
fn password_validation() {
    password("secretpw").unwrap();
    password("123456").unwrap();
    assert_eq!(password(""), Err("password is required"));
    assert_eq!(password("12345"), Err("password must be at least 6 characters"));
}

#[test]
fn registration_reports_first_violation() {
    let req = RegisterRequest {
        name: "Al".into(),
        email: "nope".into(),
        password: "".into(),
    };

    assert_eq!(
        registration(&req),
        Err("name must be at least 3 characters")
    );

    let req = RegisterRequest {
        name: "Alice".into(),
        email: "nope".into(),
        password: "".into(),
    };

    assert_eq!(registration(&req), Err("invalid email format"));

    let req = RegisterRequest {
        name: "Alice".into(),
        email: "alice@x.com".into(),
        password: "short".into(),
    };

    assert_eq!(
        registration(&req),
        Err("password must be at least 6 characters")
    );
}

#[test]
fn login_validation() {
    let req = LoginRequest {
        email: "".into(),
        password: "x".into(),
    };
    assert_eq!(login(&req), Err("email is required"));

    let req = LoginRequest {
        email: "not even an email".into(),
        password: "".into(),
    };
    assert_eq!(login(&req), Err("password is required"));

    let req = LoginRequest {
        email: "not even an email".into(),
        password: "x".into(),
    };
    login(&req).unwrap();
}

use std::env;

use axum_extra::extract::CookieJar;
use reqwest;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use serde::Deserialize;

// tower middleware guarding the management routes: resolves the session against the
// authorization service, then checks the resolved identity against the admin allow-list

/// Identity the authorization service resolved from a session token.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
}

/// Administrator emails, fixed at deployment time.
///
/// Read from the `ADMIN_EMAILS` environment variable (comma-separated). The list
/// must come from deployment configuration only; an empty list denies every caller.
#[derive(Debug, Clone)]
pub struct AllowList {
    emails: Vec<String>,
}

impl AllowList {
    pub fn from_env() -> Self {
        let raw = env::var("ADMIN_EMAILS").unwrap_or_default();
        Self::from_entries(raw.split(','))
    }

    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let emails = entries
            .into_iter()
            .map(|entry| entry.trim().to_ascii_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect();

        AllowList { emails }
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    fn contains(&self, email: &str) -> bool {
        let normalized = email.trim().to_ascii_lowercase();
        self.emails.iter().any(|allowed| *allowed == normalized)
    }
}

/// Decides whether the caller may reach the management routes.
///
/// Allowed only when a resolved identity is present AND its email is on the
/// allow-list. Email comparison is case-insensitive.
pub fn authorize(identity: Option<&UserInfo>, allow_list: &AllowList) -> Access {
    match identity {
        Some(user) if allow_list.contains(&user.email) => Access::Allowed,
        _ => Access::Denied,
    }
}

pub async fn admin_gate_middleware(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    // check if we have an authorization header with a valid token
    let mut token = None;
    if let Some(auth_header) = req.headers().get("Authorization") {
        if let Ok(auth_value) = auth_header.to_str() {
            if auth_value.starts_with("Bearer ") {
                token = Some(auth_value.trim_start_matches("Bearer ").to_string());
            }
        }
    }

    if token.is_none() {
        let cookie_jar = CookieJar::from_headers(req.headers());
        // check if we have a session cookie
        if let Some(cookie) = cookie_jar.get("session") {
            token = Some(cookie.value().to_string());
        }
    }

    let token = match token {
        Some(token) => token,
        None => {
            tracing::debug!("No session token on management request, redirecting to login");
            return Ok(Redirect::to("/login?error=unauthorized").into_response());
        }
    };

    let identity = match resolve_identity(&token).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::error!("Error resolving session against the auth service: {}", err);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let identity = match identity {
        Some(identity) => identity,
        None => {
            tracing::debug!("Session token rejected by the auth service, redirecting to login");
            return Ok(Redirect::to("/login?error=unauthorized").into_response());
        }
    };

    let allow_list = AllowList::from_env();
    match authorize(Some(&identity), &allow_list) {
        Access::Allowed => {
            req.extensions_mut().insert(identity);
            Ok(next.run(req).await)
        }
        Access::Denied => {
            tracing::debug!(
                "Identity {} is not on the admin allow-list, redirecting to login",
                identity.email
            );
            Ok(Redirect::to("/login?error=unauthorized").into_response())
        }
    }
}

async fn resolve_identity(token: &str) -> Result<Option<UserInfo>, reqwest::Error> {
    let client = reqwest::Client::new();
    let auth_server_url = env::var("AUTH_SERVICE_URL").expect("AUTH_SERVICE_URL must be set");

    let response = client
        .get(format!("{}/auth/info", auth_server_url))
        .header("Cookie", format!("session={}", token))
        .send()
        .await?;

    if !response.status().is_success() {
        return Ok(None);
    }

    let identity = response.json::<UserInfo>().await?;
    Ok(Some(identity))
}

//! Refresh-token cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const REFRESH_COOKIE: &str = "refreshToken";

/// `refreshToken` cookie: HttpOnly, Secure, SameSite=None, Path=/ and
/// a Max-Age equal to the refresh token lifetime.
pub fn refresh_cookie(token: String, max_age_secs: u64) -> Cookie<'static> {
    let mut cookie = Cookie::new(REFRESH_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie.set_same_site(SameSite::None);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(
        i64::try_from(max_age_secs).unwrap_or(i64::MAX),
    ));
    cookie
}

/// Refresh token sent by the client, empty when absent.
pub fn refresh_token_from(jar: &CookieJar) -> String {
    jar.get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .unwrap_or_default()
}

//! One-shot flash messages carried in a cookie across a redirect.

use axum::response::Redirect;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Name of the flash cookie.
pub const FLASH_COOKIE: &str = "flash";

/// Store a message to be shown by the next rendered page.
pub fn set_flash(jar: CookieJar, message: &str) -> CookieJar {
    jar.add(
        Cookie::build((FLASH_COOKIE, urlencoding::encode(message).into_owned()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

/// Take the pending message, if any, removing the cookie.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    let message = jar.get(FLASH_COOKIE).and_then(|c| {
        urlencoding::decode(c.value())
            .ok()
            .map(|m| m.into_owned())
            .filter(|m| !m.is_empty())
    });

    match message {
        Some(message) => (
            jar.remove(Cookie::build(FLASH_COOKIE).path("/")),
            Some(message),
        ),
        None => (jar, None),
    }
}

/// Redirect with a flash message.
pub fn redirect_with_flash(jar: CookieJar, to: &str, message: &str) -> (CookieJar, Redirect) {
    (set_flash(jar, message), Redirect::to(to))
}

//! Reading and subscription pages.

use axum::{
    extract::{Path, State},
    http::{header::REFERER, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use std::sync::Arc;

use super::AppState;
use crate::feed::{EntryListing, SubscribeOutcome, SubscribedFeed};
use crate::template::{TemplateContext, Value};
use crate::web::error::WebError;
use crate::web::flash::redirect_with_flash;
use crate::web::forms::{first_error, SubscribeForm};
use crate::web::middleware::{AuthUser, OptionalAuthUser};

fn entry_value(listing: &EntryListing, can_like: bool) -> Value {
    let entry = &listing.entry;
    Value::object([
        ("id", Value::from(entry.id)),
        ("url", Value::from(entry.url.as_str())),
        ("title", Value::from(entry.title.clone())),
        ("domain", Value::from(entry.domain_name())),
        ("feed_title", Value::from(listing.feed_title.clone())),
        ("date", Value::from(entry.relative_date(Utc::now()))),
        ("can_like", Value::from(can_like)),
        ("liked", Value::from(listing.liked.unwrap_or(false))),
    ])
}

fn feed_value(subscribed: &SubscribedFeed) -> Value {
    let feed = &subscribed.feed;
    let now = Utc::now();
    Value::object([
        ("id", Value::from(feed.id)),
        ("url", Value::from(feed.url.as_str())),
        ("title", Value::from(feed.display_title())),
        ("homepage_url", Value::from(feed.homepage_url.clone())),
        ("unliked_count", Value::from(subscribed.unliked_count)),
        (
            "fetched",
            Value::from(
                feed.fetched_at
                    .map(|ts| crate::datetime::format_relative(&ts, &now)),
            ),
        ),
    ])
}

fn render_entries(
    state: &AppState,
    jar: CookieJar,
    title: &str,
    current_user: Option<&str>,
    entries: &[EntryListing],
) -> Result<Response, WebError> {
    let can_like = current_user.is_some();
    let mut context = TemplateContext::new();
    context.set(
        "entries",
        Value::List(entries.iter().map(|l| entry_value(l, can_like)).collect()),
    );
    state.render(jar, "entries", title, current_user, context)
}

/// GET /last - Newest entries across all feeds.
pub async fn last(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(claims): OptionalAuthUser,
    jar: CookieJar,
) -> Result<Response, WebError> {
    let entries = state.feeds().latest(claims.as_ref().map(|c| c.sub)).await?;
    let email = claims.as_ref().map(|c| c.email.as_str());
    render_entries(&state, jar, "Latest", email, &entries)
}

/// GET /news - Entries of the user's feeds that are not liked.
pub async fn news(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    jar: CookieJar,
) -> Result<Response, WebError> {
    let entries = state.feeds().news(claims.sub).await?;
    render_entries(&state, jar, "News", Some(&claims.email), &entries)
}

/// GET /liked - Entries the user has liked.
pub async fn liked(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    jar: CookieJar,
) -> Result<Response, WebError> {
    let entries = state.feeds().liked(claims.sub).await?;
    render_entries(&state, jar, "Liked", Some(&claims.email), &entries)
}

/// GET /feeds - Subscriptions and the subscribe form.
pub async fn feeds_page(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    jar: CookieJar,
) -> Result<Response, WebError> {
    let feeds = state.feeds().subscriptions(claims.sub).await?;

    let mut context = TemplateContext::new();
    context.set("feeds", Value::List(feeds.iter().map(feed_value).collect()));
    state.render(jar, "feeds", "Feeds", Some(&claims.email), context)
}

fn subscribe_message(outcome: &SubscribeOutcome) -> String {
    let title = outcome.feed.display_title();
    match (&outcome.refresh, outcome.newly_subscribed) {
        (Some(Err(e)), _) => format!("Subscribed to {title}, but it could not be fetched: {e}"),
        (Some(Ok(report)), true) => {
            format!("Subscribed to {title} ({} new entries)", report.new)
        }
        (_, true) => format!("Subscribed to {title}"),
        (_, false) => format!("Already subscribed to {title}"),
    }
}

/// POST /feeds - Subscribe to a feed URL.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    jar: CookieJar,
    Form(form): Form<SubscribeForm>,
) -> Result<Response, WebError> {
    if let Some(message) = first_error(&form, SubscribeForm::FIELDS) {
        return Ok(redirect_with_flash(jar, "/feeds", &message).into_response());
    }

    let outcome = state
        .feeds()
        .subscribe(claims.sub, &form.url)
        .await
        .map_err(WebError::redirect_to("/feeds"))?;

    Ok(redirect_with_flash(jar, "/feeds", &subscribe_message(&outcome)).into_response())
}

/// POST /feeds/{id}/unsubscribe - Drop a subscription.
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(feed_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, WebError> {
    state.feeds().unsubscribe(claims.sub, feed_id).await?;
    Ok(redirect_with_flash(jar, "/feeds", "Unsubscribed").into_response())
}

/// POST /feeds/{id}/refresh - Fetch a subscribed feed now.
pub async fn refresh_feed(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(feed_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, WebError> {
    let report = state
        .feeds()
        .refresh_for_user(claims.sub, feed_id)
        .await
        .map_err(WebError::redirect_to("/feeds"))?;

    let message = format!(
        "Feed refreshed: {} new, {} updated",
        report.new, report.updated
    );
    Ok(redirect_with_flash(jar, "/feeds", &message).into_response())
}

/// Path of the page that sent the request, or `fallback`.
///
/// Only the path and query of the Referer are used, so the redirect never
/// leaves the site.
fn back_to(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|referer| url::Url::parse(referer).ok())
        .map(|url| match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        })
        .unwrap_or_else(|| fallback.to_string())
}

async fn set_liked(
    state: &AppState,
    user_id: i64,
    entry_id: i64,
    liked: bool,
    headers: &HeaderMap,
) -> Result<Response, WebError> {
    state.feeds().set_liked(user_id, entry_id, liked).await?;
    Ok(Redirect::to(&back_to(headers, "/news")).into_response())
}

/// POST /entries/{id}/like
pub async fn like(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(entry_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    set_liked(&state, claims.sub, entry_id, true, &headers).await
}

/// POST /entries/{id}/unlike
pub async fn unlike(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(entry_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    set_liked(&state, claims.sub, entry_id, false, &headers).await
}

//! Stock [`RouteMatcher`]s.
//!
//! Entity matchers only look at `update.message` and compare the entity text,
//! sliced in UTF-16 units, against the expected value.

use std::sync::Arc;

use crate::{
    api::{
        types::{MessageEntityKind, Update},
        UpdateKind,
    },
    bot::router::RouteMatcher,
    text::utf16_slice,
};

/// Wrap an arbitrary predicate.
pub fn when<F>(predicate: F) -> RouteMatcher
where
    F: Fn(&Update) -> bool + Send + Sync + 'static,
{
    Arc::new(predicate)
}

/// Matches every update.
pub fn any() -> RouteMatcher {
    when(|_| true)
}

pub fn message() -> RouteMatcher {
    when(|update| update.message.is_some())
}

pub fn edited_message() -> RouteMatcher {
    when(|update| update.edited_message.is_some())
}

pub fn channel_post() -> RouteMatcher {
    when(|update| update.channel_post.is_some())
}

pub fn edited_channel_post() -> RouteMatcher {
    when(|update| update.edited_channel_post.is_some())
}

pub fn callback_query() -> RouteMatcher {
    when(|update| update.callback_query.is_some())
}

pub fn inline_query() -> RouteMatcher {
    when(|update| update.inline_query.is_some())
}

pub fn chosen_inline_result() -> RouteMatcher {
    when(|update| update.chosen_inline_result.is_some())
}

pub fn shipping_query() -> RouteMatcher {
    when(|update| update.shipping_query.is_some())
}

pub fn pre_checkout_query() -> RouteMatcher {
    when(|update| update.pre_checkout_query.is_some())
}

/// Matches updates whose (single) populated kind is `kind`.
pub fn update_kind(kind: UpdateKind) -> RouteMatcher {
    when(move |update| update.kind() == Some(kind))
}

/// `/command` in a message, with or without the leading slash and ignoring
/// any `@botname` suffix: `"start"` and `"/start"` both match `/start@mybot`.
pub fn bot_command(command: &str) -> RouteMatcher {
    let expected = normalize_command(command).to_string();
    when(move |update| {
        has_entity(update, MessageEntityKind::BotCommand, |text| {
            normalize_command(text) == expected
        })
    })
}

/// `#tag` with or without the `#`. Case-sensitive.
pub fn hashtag(tag: &str) -> RouteMatcher {
    let expected = strip(tag, '#').to_string();
    when(move |update| {
        has_entity(update, MessageEntityKind::Hashtag, |text| {
            strip(text, '#') == expected
        })
    })
}

/// `@username` mention with or without the `@`. Case-sensitive.
pub fn mention(username: &str) -> RouteMatcher {
    let expected = strip(username, '@').to_string();
    when(move |update| {
        has_entity(update, MessageEntityKind::Mention, |text| {
            strip(text, '@') == expected
        })
    })
}

fn normalize_command(raw: &str) -> &str {
    let raw = strip(raw, '/');
    raw.split('@').next().unwrap_or(raw)
}

fn strip(raw: &str, prefix: char) -> &str {
    raw.strip_prefix(prefix).unwrap_or(raw)
}

fn has_entity(update: &Update, kind: MessageEntityKind, accept: impl Fn(&str) -> bool) -> bool {
    let Some(message) = update.message.as_ref() else {
        return false;
    };
    let Some(text) = message.text.as_deref() else {
        return false;
    };

    message
        .entities()
        .iter()
        .filter(|entity| entity.kind == kind)
        .filter_map(|entity| utf16_slice(text, entity.offset, entity.length))
        .any(|value| accept(&value))
}

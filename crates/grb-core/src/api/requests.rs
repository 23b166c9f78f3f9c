use serde::Serialize;

use crate::{
    api::{port::Params, types::UpdateKind},
    domain::{ChatId, MessageId},
    errors::Error,
    Result,
};

/// Serialize a request struct into the flat parameter map the transport sends.
pub fn to_params<T: Serialize>(req: &T) -> Result<Params> {
    match serde_json::to_value(req)? {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(Params::new()),
        other => Err(Error::External(format!(
            "request must serialize to an object, got {other}"
        ))),
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// 1-100, defaults to 100 server-side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Long polling timeout in seconds; 0 means short polling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_updates: Option<Vec<UpdateKind>>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SetWebhookRequest {
    /// HTTPS url to send updates to; empty string removes the webhook.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_updates: Option<Vec<UpdateKind>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Markdown,
    MarkdownV2,
    #[serde(rename = "HTML")]
    Html,
}

#[derive(Clone, Debug, Serialize)]
pub struct SendMessageRequest {
    pub chat_id: ChatId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_web_page_preview: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_notification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<MessageId>,
    /// Keyboard markup, passed through as JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<serde_json::Value>,
}

impl SendMessageRequest {
    pub fn new(chat_id: impl Into<ChatId>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            parse_mode: None,
            disable_web_page_preview: None,
            disable_notification: None,
            reply_to_message_id: None,
            reply_markup: None,
        }
    }

    pub fn reply_to(mut self, message_id: MessageId) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ForwardMessageRequest {
    pub chat_id: ChatId,
    pub from_chat_id: ChatId,
    pub message_id: MessageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_notification: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatAction {
    Typing,
    UploadPhoto,
    RecordVideo,
    UploadVideo,
    RecordAudio,
    UploadAudio,
    UploadDocument,
    FindLocation,
}

#[derive(Clone, Debug, Serialize)]
pub struct SendChatActionRequest {
    pub chat_id: ChatId,
    pub action: ChatAction,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct AnswerCallbackQueryRequest {
    pub callback_query_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_alert: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_time: Option<i64>,
}

/// One priced line of a shipping option.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LabeledPrice {
    pub label: String,
    /// In the smallest units of the currency.
    pub amount: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShippingOption {
    pub id: String,
    pub title: String,
    pub prices: Vec<LabeledPrice>,
}

/// Reply to a `shipping_query`. `shipping_options` is required when `ok`,
/// `error_message` when not.
#[derive(Clone, Debug, Serialize)]
pub struct AnswerShippingQueryRequest {
    pub shipping_query_id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_options: Option<Vec<ShippingOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AnswerShippingQueryRequest {
    pub fn accept(query_id: impl Into<String>, options: Vec<ShippingOption>) -> Self {
        Self {
            shipping_query_id: query_id.into(),
            ok: true,
            shipping_options: Some(options),
            error_message: None,
        }
    }

    pub fn reject(query_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            shipping_query_id: query_id.into(),
            ok: false,
            shipping_options: None,
            error_message: Some(reason.into()),
        }
    }
}

/// Reply to a `pre_checkout_query`. Telegram expects it within 10 seconds.
#[derive(Clone, Debug, Serialize)]
pub struct AnswerPreCheckoutQueryRequest {
    pub pre_checkout_query_id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AnswerPreCheckoutQueryRequest {
    pub fn accept(query_id: impl Into<String>) -> Self {
        Self {
            pre_checkout_query_id: query_id.into(),
            ok: true,
            error_message: None,
        }
    }

    pub fn reject(query_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            pre_checkout_query_id: query_id.into(),
            ok: false,
            error_message: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn optional_fields_are_omitted() {
        let params = to_params(&SendMessageRequest::new(ChatId::username("news"), "hi")).unwrap();
        assert_eq!(
            serde_json::Value::Object(params),
            json!({"chat_id": "@news", "text": "hi"})
        );
    }

    #[test]
    fn get_updates_serializes_allowed_updates_by_wire_name() {
        let req = GetUpdatesRequest {
            offset: Some(11),
            allowed_updates: Some(vec![UpdateKind::Message, UpdateKind::CallbackQuery]),
            ..GetUpdatesRequest::default()
        };
        let params = to_params(&req).unwrap();
        assert_eq!(params["offset"], json!(11));
        assert_eq!(
            params["allowed_updates"],
            json!(["message", "callback_query"])
        );
        assert!(!params.contains_key("limit"));
    }

    #[test]
    fn parse_mode_html_is_upper_case() {
        let req = SendMessageRequest::new(1, "<b>x</b>").parse_mode(ParseMode::Html);
        assert_eq!(to_params(&req).unwrap()["parse_mode"], json!("HTML"));
    }

    #[test]
    fn shipping_answers_carry_options_or_a_reason() {
        let option = ShippingOption {
            id: "post".to_string(),
            title: "Post".to_string(),
            prices: vec![LabeledPrice {
                label: "Delivery".to_string(),
                amount: 145,
            }],
        };
        let accept = AnswerShippingQueryRequest::accept("q1", vec![option]);
        let accepted = to_params(&accept).unwrap();
        assert_eq!(
            serde_json::Value::Object(accepted),
            json!({
                "shipping_query_id": "q1",
                "ok": true,
                "shipping_options": [
                    {"id": "post", "title": "Post", "prices": [{"label": "Delivery", "amount": 145}]}
                ]
            })
        );

        let reject = AnswerShippingQueryRequest::reject("q1", "no delivery");
        let rejected = to_params(&reject).unwrap();
        assert_eq!(rejected["ok"], json!(false));
        assert_eq!(rejected["error_message"], json!("no delivery"));
        assert!(!rejected.contains_key("shipping_options"));
    }
}

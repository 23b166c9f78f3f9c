use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::{
    api::{
        requests::{
            to_params, AnswerCallbackQueryRequest, AnswerPreCheckoutQueryRequest,
            AnswerShippingQueryRequest, ForwardMessageRequest, GetUpdatesRequest,
            SendChatActionRequest, SendMessageRequest, SetWebhookRequest,
        },
        response::ApiResponse,
        types::{Message, Update, User, WebhookInfo},
    },
    Result,
};

/// Method parameters, keyed by Bot API field name.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// The single outbound capability: call a Bot API method by name.
///
/// The HTTP implementation lives in the adapter crate; tests use in-memory fakes.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, method: &str, params: Params) -> Result<ApiResponse>;
}

/// Typed wrapper over [`ApiTransport`].
///
/// Destination-addressed calls (`send_message`, `forward_message`, ...) should
/// be wrapped in a rate limiter task rather than awaited directly.
#[async_trait]
pub trait BotApi: ApiTransport {
    async fn call<T>(&self, method: &str, params: Params) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.send(method, params).await?.into_result()
    }

    async fn get_updates(&self, req: &GetUpdatesRequest) -> Result<Vec<Update>> {
        self.call("getUpdates", to_params(req)?).await
    }

    async fn set_webhook(&self, req: &SetWebhookRequest) -> Result<bool> {
        self.call("setWebhook", to_params(req)?).await
    }

    async fn delete_webhook(&self) -> Result<bool> {
        self.call("deleteWebhook", Params::new()).await
    }

    async fn get_webhook_info(&self) -> Result<WebhookInfo> {
        self.call("getWebhookInfo", Params::new()).await
    }

    async fn get_me(&self) -> Result<User> {
        self.call("getMe", Params::new()).await
    }

    async fn send_message(&self, req: &SendMessageRequest) -> Result<Message> {
        self.call("sendMessage", to_params(req)?).await
    }

    async fn forward_message(&self, req: &ForwardMessageRequest) -> Result<Message> {
        self.call("forwardMessage", to_params(req)?).await
    }

    async fn send_chat_action(&self, req: &SendChatActionRequest) -> Result<bool> {
        self.call("sendChatAction", to_params(req)?).await
    }

    async fn answer_callback_query(&self, req: &AnswerCallbackQueryRequest) -> Result<bool> {
        self.call("answerCallbackQuery", to_params(req)?).await
    }

    async fn answer_shipping_query(&self, req: &AnswerShippingQueryRequest) -> Result<bool> {
        self.call("answerShippingQuery", to_params(req)?).await
    }

    async fn answer_pre_checkout_query(&self, req: &AnswerPreCheckoutQueryRequest) -> Result<bool> {
        self.call("answerPreCheckoutQuery", to_params(req)?).await
    }
}

impl<T: ApiTransport + ?Sized> BotApi for T {}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::fake::FakeTransport;
    use super::*;
    use crate::{domain::ChatId, errors::Error};

    #[tokio::test]
    async fn send_message_posts_params_and_decodes_message() {
        let api = FakeTransport::new();
        api.push_reply(Ok(ApiResponse::success(json!({
            "message_id": 9,
            "date": 0,
            "chat": {"id": 42, "type": "private"},
            "text": "hi"
        }))));

        let msg = api
            .send_message(&SendMessageRequest::new(ChatId::Int(42), "hi"))
            .await
            .unwrap();
        assert_eq!(msg.text.as_deref(), Some("hi"));

        let calls = api.calls();
        assert_eq!(calls[0].0, "sendMessage");
        assert_eq!(calls[0].1["chat_id"], json!(42));
    }

    #[tokio::test]
    async fn works_through_trait_objects() {
        let fake = FakeTransport::new();
        fake.push_reply(Ok(ApiResponse::failure(401, "Unauthorized")));
        let api: Arc<dyn ApiTransport> = fake;

        let err = api.get_me().await.unwrap_err();
        assert!(matches!(err, Error::Api { code: 401, .. }));
    }

    #[tokio::test]
    async fn answers_pre_checkout_queries() {
        let api = FakeTransport::new();
        api.push_reply(Ok(ApiResponse::success(json!(true))));

        let req = AnswerPreCheckoutQueryRequest::reject("pcq-1", "sold out");
        assert!(api.answer_pre_checkout_query(&req).await.unwrap());

        let calls = api.calls();
        assert_eq!(calls[0].0, "answerPreCheckoutQuery");
        assert_eq!(
            serde_json::Value::Object(calls[0].1.clone()),
            json!({"pre_checkout_query_id": "pcq-1", "ok": false, "error_message": "sold out"})
        );
    }
}

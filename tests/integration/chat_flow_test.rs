//! End-to-end send flows: registry, orchestration and the Gemini client together

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gemchat_conversations::{ConversationId, MessageStatus, Sender};
use gemchat_llm::mock::{MockLlmService, MockOutcome};

use crate::common::{mount_completion, reply_body, TestApp};

mod test_send_message {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_unset_credentials_make_no_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("never")))
            .expect(0)
            .mount(&server)
            .await;
        let test = TestApp::gemini(&server).unwrap();
        let (id, _) = test.app.new_chat();

        let conversation = test.app.send_message(&id, "hello").await.unwrap();

        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].text, "hello");
        assert_eq!(conversation.error(), Some("API key is required"));
        assert!(!conversation.is_loading());
    }

    #[test_log::test(tokio::test)]
    async fn test_successful_reply() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            ResponseTemplate::new(200).set_body_json(reply_body("Hi there")),
        )
        .await;
        let test = TestApp::gemini(&server).unwrap();
        test.configure().unwrap();
        let (id, _) = test.app.new_chat();

        let conversation = test.app.send_message(&id, "hello").await.unwrap();

        let messages = conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert_eq!(messages[1].text, "Hi there");
        assert!(!conversation.is_loading());
        assert_eq!(conversation.error(), None);
    }

    #[test_log::test(tokio::test)]
    async fn test_request_carries_only_the_new_prompt() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            ResponseTemplate::new(200).set_body_json(reply_body("ok")),
        )
        .await;
        let test = TestApp::gemini(&server).unwrap();
        test.configure().unwrap();
        let (id, _) = test.app.new_chat();

        test.app.send_message(&id, "first").await.unwrap();
        test.app.send_message(&id, "second").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let body: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(
            body["contents"],
            json!([{ "role": "user", "parts": [{ "text": "second" }] }])
        );
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test_log::test(tokio::test)]
    async fn test_rate_limited_reply() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "code": 429,
                    "message": "Resource has been exhausted",
                    "status": "RESOURCE_EXHAUSTED"
                }
            })),
        )
        .await;
        let test = TestApp::gemini(&server).unwrap();
        test.configure().unwrap();
        let (id, _) = test.app.new_chat();

        let conversation = test.app.send_message(&id, "hello").await.unwrap();

        assert!(!conversation.is_loading());
        let error = conversation.error().unwrap();
        assert!(!error.is_empty());
        assert!(error.contains("429"));
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].text, "hello");
        assert_eq!(conversation.messages()[0].status, MessageStatus::Error);
    }

    #[test_log::test(tokio::test)]
    async fn test_malformed_reply() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })),
        )
        .await;
        let test = TestApp::gemini(&server).unwrap();
        test.configure().unwrap();
        let (id, _) = test.app.new_chat();

        let conversation = test.app.send_message(&id, "hello").await.unwrap();

        assert!(conversation.error().is_some());
        assert_eq!(conversation.messages().len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_error_cleared_by_next_successful_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "contents": [{ "parts": [{ "text": "fails" }] }]
            })))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "contents": [{ "parts": [{ "text": "works" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("fine")))
            .mount(&server)
            .await;
        let test = TestApp::gemini(&server).unwrap();
        test.configure().unwrap();
        let (id, _) = test.app.new_chat();

        let failed = test.app.send_message(&id, "fails").await.unwrap();
        assert!(failed.error().is_some());

        let recovered = test.app.send_message(&id, "works").await.unwrap();
        assert_eq!(recovered.error(), None);
        assert_eq!(recovered.messages().len(), 3);
        assert_eq!(recovered.messages()[2].text, "fine");
    }
}

mod test_conversations {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_clear_is_idempotent() {
        let llm = MockLlmService::new();
        let test = TestApp::mock(&llm).unwrap();
        test.configure().unwrap();
        let (id, _) = test.app.new_chat();
        test.app.send_message(&id, "hello").await.unwrap();

        let once = test.app.clear_chat(&id).unwrap();
        let twice = test.app.clear_chat(&id).unwrap();

        assert_eq!(*once, *twice);
        assert!(twice.messages().is_empty());
        assert!(!twice.is_loading());
        assert_eq!(twice.error(), None);
    }

    #[test_log::test(tokio::test)]
    async fn test_chats_are_independent() {
        let llm = MockLlmService::new();
        let test = TestApp::mock(&llm).unwrap();
        test.configure().unwrap();

        let a = ConversationId::from("a");
        let b = ConversationId::from("b");
        test.app.select_chat(&a);
        test.app.send_message(&a, "for a").await.unwrap();
        test.app.select_chat(&b);
        test.app.send_message(&b, "for b").await.unwrap();

        let a_conv = test.app.registry().get(&a).unwrap();
        let b_conv = test.app.registry().get(&b).unwrap();
        assert_eq!(a_conv.messages()[1].text, "Mock response to: for a");
        assert_eq!(b_conv.messages()[1].text, "Mock response to: for b");
    }

    #[test_log::test(tokio::test)]
    async fn test_in_flight_reply_lands_in_its_own_chat() {
        let llm = MockLlmService::new();
        llm.behavior().set_prompt_delay_ms("slow", 200);
        let test = TestApp::mock(&llm).unwrap();
        test.configure().unwrap();

        let a = ConversationId::from("a");
        let b = ConversationId::from("b");
        test.app.select_chat(&a);

        let app = test.app.clone();
        let slow_id = a.clone();
        let slow = tokio::spawn(async move { app.send_message(&slow_id, "slow").await });

        let mut waited = 0;
        while !test.app.registry().get(&a).unwrap().is_loading() {
            assert!(waited < 100, "slow send never started");
            tokio::time::sleep(Duration::from_millis(5)).await;
            waited += 1;
        }

        test.app.select_chat(&b);
        let fast = test.app.send_message(&b, "fast").await.unwrap();
        assert_eq!(fast.messages().len(), 2);
        assert!(test.app.registry().get(&a).unwrap().is_loading());

        let slow = slow.await.unwrap().unwrap();
        assert_eq!(slow.id, a);
        assert_eq!(slow.messages().len(), 2);
        assert_eq!(slow.messages()[1].text, "Mock response to: slow");
        assert_eq!(test.app.registry().get(&b).unwrap().messages().len(), 2);
        assert_eq!(
            test.app.registry().selected().as_deref(),
            Some(&b),
            "resolution must not move the selection"
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_second_send_while_loading_is_rejected() {
        let llm = MockLlmService::new();
        llm.behavior().set_prompt_delay_ms("slow", 200);
        let test = TestApp::mock(&llm).unwrap();
        test.configure().unwrap();
        let (id, _) = test.app.new_chat();

        let app = test.app.clone();
        let slow_id = id.clone();
        let slow = tokio::spawn(async move { app.send_message(&slow_id, "slow").await });

        let mut waited = 0;
        while !test.app.registry().get(&id).unwrap().is_loading() {
            assert!(waited < 100, "slow send never started");
            tokio::time::sleep(Duration::from_millis(5)).await;
            waited += 1;
        }

        let err = test.app.send_message(&id, "again").await.unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");

        slow.await.unwrap().unwrap();
        assert_eq!(llm.recorded_requests().len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_clear_then_resend_ignores_earlier_reply() {
        let llm = MockLlmService::new();
        llm.behavior().set_prompt_delay_ms("first question", 100);
        llm.behavior().set_prompt_delay_ms("second question", 300);
        let test = TestApp::mock(&llm).unwrap();
        test.configure().unwrap();
        let (id, _) = test.app.new_chat();

        let app = test.app.clone();
        let first_id = id.clone();
        let first = tokio::spawn(async move { app.send_message(&first_id, "first question").await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        test.app.clear_chat(&id).unwrap();
        let app = test.app.clone();
        let second_id = id.clone();
        let second =
            tokio::spawn(async move { app.send_message(&second_id, "second question").await });

        let after_first = first.await.unwrap().unwrap();
        assert!(after_first.is_loading());
        assert_eq!(after_first.messages().len(), 1);
        assert_eq!(after_first.messages()[0].text, "second question");
        assert_eq!(after_first.messages()[0].status, MessageStatus::Sending);

        let after_second = second.await.unwrap().unwrap();
        let transcript: Vec<(Sender, &str, MessageStatus)> = after_second
            .messages()
            .iter()
            .map(|m| (m.sender, m.text.as_str(), m.status))
            .collect();
        assert_eq!(
            transcript,
            vec![
                (Sender::User, "second question", MessageStatus::Sent),
                (
                    Sender::Assistant,
                    "Mock response to: second question",
                    MessageStatus::Delivered
                ),
            ]
        );
        assert!(!after_second.is_loading());
        assert_eq!(after_second.error(), None);
        assert_eq!(llm.recorded_requests().len(), 2);
    }

    #[test_log::test(tokio::test)]
    async fn test_transport_failure_from_mock() {
        let llm = MockLlmService::new();
        llm.behavior()
            .set_outcome(MockOutcome::TransportError("connection refused".to_string()));
        let test = TestApp::mock(&llm).unwrap();
        test.configure().unwrap();
        let (id, _) = test.app.new_chat();

        let conversation = test.app.send_message(&id, "hello").await.unwrap();

        assert_eq!(conversation.error(), Some("Network error: connection refused"));
    }
}

//! Settings persistence and the model-list cache against a stub API

mod common;

use chrono::{Duration, Utc};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gemchat_settings::{FileStore, KeyValueStore, ModelCache, MODEL_KEY};

use crate::common::{models_body, TestApp, MODEL, VALID_KEY};

mod test_settings {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_settings_survive_restart() {
        let server = MockServer::start().await;
        let test = TestApp::gemini(&server).unwrap();
        test.app.save_settings(VALID_KEY, "gemini-pro").unwrap();

        let restarted = test.restart(&server).unwrap();

        let settings = restarted.settings();
        assert_eq!(settings.api_key(), Some(VALID_KEY));
        assert_eq!(settings.model(), Some(MODEL));
    }

    #[test_log::test(tokio::test)]
    async fn test_invalid_settings_never_reach_disk() {
        let server = MockServer::start().await;
        let test = TestApp::gemini(&server).unwrap();

        let err = test.app.save_settings("short", "gemini-pro").unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(!test.data_dir.path().join("settings.json").exists());

        let err = test.app.save_settings(VALID_KEY, "").unwrap_err();
        assert!(err.to_string().contains("Model selection is required"));
    }

    #[test_log::test(tokio::test)]
    async fn test_bare_model_is_stored_prefixed() {
        let server = MockServer::start().await;
        let test = TestApp::gemini(&server).unwrap();
        test.app.save_settings(VALID_KEY, "gemini-1.5-flash").unwrap();

        let store = FileStore::open(test.data_dir.path().join("settings.json")).unwrap();
        assert_eq!(
            store.get(MODEL_KEY).unwrap().as_deref(),
            Some("models/gemini-1.5-flash")
        );
    }
}

mod test_models {
    use super::*;

    async fn mount_models(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/models"))
            .and(query_param("key", VALID_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(models_body()))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test_log::test(tokio::test)]
    async fn test_model_list_filtered_and_cached() {
        let server = MockServer::start().await;
        mount_models(&server, 1).await;
        let test = TestApp::gemini(&server).unwrap();
        test.configure().unwrap();

        let first = test.app.available_models().await.unwrap();
        let second = test.app.available_models().await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "models/gemini-pro");
        assert_eq!(first[0].display_name, "Gemini Pro");
        assert_eq!(first, second);
    }

    #[test_log::test(tokio::test)]
    async fn test_stale_cache_is_refetched() {
        let server = MockServer::start().await;
        mount_models(&server, 1).await;
        let test = TestApp::gemini(&server).unwrap();
        test.configure().unwrap();

        // Seed a cache entry fetched six minutes ago
        let store = std::sync::Arc::new(
            FileStore::open(test.data_dir.path().join("settings.json")).unwrap(),
        );
        let cache = ModelCache::new(store);
        cache
            .store(&["models/old".to_string()], Utc::now() - Duration::minutes(6))
            .unwrap();
        let restarted = test.restart(&server).unwrap();

        let models = restarted.available_models().await.unwrap();

        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "models/gemini-pro");
    }

    #[test_log::test(tokio::test)]
    async fn test_model_list_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        let test = TestApp::gemini(&server).unwrap();
        test.configure().unwrap();

        let err = test.app.available_models().await.unwrap_err();

        assert_eq!(err.error_code(), "COMPLETION_ERROR");
    }
}

//! Local Ollama backend (`/api/generate`, `/api/version`).

use std::time::Duration;

pub const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn normalize_ollama_host(host: &str) -> String {
    let mut host = host.trim().to_string();
    if host.is_empty() {
        // `localhost` may resolve to ::1 first while Ollama listens on IPv4 only.
        host = DEFAULT_OLLAMA_HOST.to_string();
    }
    if !host.starts_with("http://") && !host.starts_with("https://") {
        host = format!("http://{host}");
    }
    host.trim_end_matches('/').to_string()
}

#[cfg(feature = "ollama")]
pub use client::OllamaClient;

#[cfg(feature = "ollama")]
mod client {
    use super::{normalize_ollama_host, PROBE_TIMEOUT};
    use crate::{GenerateError, TextGenerator};
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    pub struct OllamaClient {
        host: String,
        model: String,
        client: reqwest::blocking::Client,
        probe_client: reqwest::blocking::Client,
    }

    #[derive(Deserialize)]
    struct GenerateResponse {
        #[serde(default)]
        response: String,
    }

    impl OllamaClient {
        pub fn new(host: &str, model: &str, timeout: Duration) -> Result<Self, GenerateError> {
            let host = normalize_ollama_host(host);
            let loopback = ["://127.0.0.1", "://localhost", "://[::1]"]
                .iter()
                .any(|h| host.contains(h));
            let build = |timeout: Duration| {
                let mut builder = reqwest::blocking::Client::builder().timeout(timeout);
                if loopback {
                    builder = builder.no_proxy();
                }
                builder
                    .build()
                    .map_err(|e| GenerateError::Transport {
                        endpoint: host.clone(),
                        message: format!("failed to build http client: {e}"),
                    })
            };
            Ok(Self {
                client: build(timeout)?,
                probe_client: build(PROBE_TIMEOUT.min(timeout))?,
                host,
                model: model.to_string(),
            })
        }

        pub fn host(&self) -> &str {
            &self.host
        }

        pub fn model(&self) -> &str {
            &self.model
        }

        fn send_error(endpoint: &str, e: reqwest::Error) -> GenerateError {
            if e.is_timeout() {
                GenerateError::Timeout {
                    endpoint: endpoint.to_string(),
                }
            } else {
                GenerateError::Transport {
                    endpoint: endpoint.to_string(),
                    message: format!("{e} (is `ollama serve` running? set OLLAMA_HOST to override)"),
                }
            }
        }
    }

    impl TextGenerator for OllamaClient {
        fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
            let url = format!("{}/api/generate", self.host);
            let body = json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
            });

            let resp = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .map_err(|e| Self::send_error(&url, e))?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().unwrap_or_default();
                return Err(GenerateError::Status {
                    status: status.as_u16(),
                    body: text,
                });
            }

            let out: GenerateResponse = resp.json().map_err(|e| {
                if e.is_timeout() {
                    GenerateError::Timeout {
                        endpoint: url.clone(),
                    }
                } else {
                    GenerateError::Decode(format!("ollama returned invalid JSON: {e}"))
                }
            })?;
            Ok(out.response.trim().to_string())
        }

        /// Any HTTP answer counts as alive; only transport failures do not.
        fn probe(&self) -> Result<(), GenerateError> {
            let url = format!("{}/api/version", self.host);
            self.probe_client
                .get(&url)
                .send()
                .map(|_| ())
                .map_err(|e| Self::send_error(&url, e))
        }

        fn describe(&self) -> String {
            format!("ollama({}, model={})", self.host, self.model)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosts_are_normalized() {
        assert_eq!(normalize_ollama_host(""), DEFAULT_OLLAMA_HOST);
        assert_eq!(normalize_ollama_host("gpu-box:11434/"), "http://gpu-box:11434");
        assert_eq!(
            normalize_ollama_host(" https://llm.internal/ "),
            "https://llm.internal"
        );
    }

    #[cfg(feature = "ollama")]
    mod http {
        use super::super::*;
        use crate::{GenerateError, TextGenerator};
        use serde_json::json;
        use std::net::TcpListener;
        use std::time::Duration;
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        /// The blocking client owns its own runtime, so it is built and used
        /// off the test's async workers.
        async fn blocking<T, F>(f: F) -> T
        where
            F: FnOnce() -> T + Send + 'static,
            T: Send + 'static,
        {
            tokio::task::spawn_blocking(f).await.unwrap()
        }

        fn client(host: &str) -> OllamaClient {
            OllamaClient::new(host, "llama3", Duration::from_secs(5)).unwrap()
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn generate_posts_model_and_prompt() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/generate"))
                .and(body_partial_json(json!({"model": "llama3", "stream": false})))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"response": "  Lists files.\n"})),
                )
                .expect(1)
                .mount(&server)
                .await;

            let host = server.uri();
            let text = blocking(move || client(&host).generate("explain ls")).await;
            assert_eq!(text.unwrap(), "Lists files.");

            let requests = server.received_requests().await.unwrap();
            let body: serde_json::Value = requests[0].body_json().unwrap();
            assert_eq!(body["prompt"], "explain ls");
            assert_eq!(body["model"], "llama3");
            assert_eq!(body["stream"], false);
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn non_success_status_is_reported() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/generate"))
                .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "loading"})))
                .mount(&server)
                .await;

            let host = server.uri();
            let err = blocking(move || client(&host).generate("x")).await.unwrap_err();
            match &err {
                GenerateError::Status { status, body } => {
                    assert_eq!(*status, 503);
                    assert!(body.contains("loading"));
                }
                other => panic!("unexpected error: {other:?}"),
            }
            assert!(err.is_transient());
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn undecodable_reply_is_a_decode_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/generate"))
                .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
                .mount(&server)
                .await;

            let host = server.uri();
            let err = blocking(move || client(&host).generate("x")).await.unwrap_err();
            assert!(matches!(err, GenerateError::Decode(_)));
            assert!(!err.is_transient());
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn probe_hits_version_endpoint() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/version"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "0.5.1"})))
                .expect(1)
                .mount(&server)
                .await;

            let host = server.uri();
            assert_eq!(blocking(move || client(&host).probe()).await, Ok(()));
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn any_http_answer_counts_as_alive() {
            // Nothing mounted: every request gets a 404.
            let server = MockServer::start().await;
            let host = server.uri();
            assert_eq!(blocking(move || client(&host).probe()).await, Ok(()));
        }

        #[test]
        fn closed_port_fails_probe() {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);

            let client =
                OllamaClient::new(&format!("http://{addr}"), "llama3", Duration::from_secs(2))
                    .unwrap();
            assert!(matches!(
                client.probe(),
                Err(GenerateError::Transport { .. } | GenerateError::Timeout { .. })
            ));
        }
    }
}

/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock completion backend that simulates different
 * behaviors:
 * - `MockProvider::working()` - Answers every numbered item
 * - `MockProvider::fail_first(n)` - Fails n requests, then works
 * - `MockProvider::unauthorized()` - Rejects the credential
 * - `MockProvider::failing()` - Always fails with a retryable error
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{ChatPrompt, CompletionBackend, Provider, SamplingParams};

static ITEM_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\. .+? text: (.*)$").expect("valid item pattern")
});

static TARGET_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"into (.+?)\.$").expect("valid target pattern")
});

/// Mock request for testing
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// The user prompt
    pub prompt: String,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// The reply text
    pub text: String,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always answers every numbered item
    Working,
    /// Answers every item except the last one
    DropLast,
    /// Fails the first `failures` requests with a server error, then works
    FailFirst { failures: usize },
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with a retryable error
    Failing,
    /// Rejects the API key
    Unauthorized,
    /// Reports insufficient balance
    InsufficientBalance,
    /// Returns an empty reply
    Empty,
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn drop_last() -> Self {
        Self::new(MockBehavior::DropLast)
    }

    pub fn fail_first(failures: usize) -> Self {
        Self::new(MockBehavior::FailFirst { failures })
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn unauthorized() -> Self {
        Self::new(MockBehavior::Unauthorized)
    }

    pub fn insufficient_balance() -> Self {
        Self::new(MockBehavior::InsufficientBalance)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Answer every numbered item of a batch prompt as `[<Target>] <text>`
    pub fn generate_numbered_reply(prompt: &str) -> String {
        let target = prompt
            .lines()
            .next()
            .and_then(|line| TARGET_LINE.captures(line.trim()))
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| "translated".to_string());

        let mut reply = String::new();
        for line in prompt.lines() {
            if let Some(caps) = ITEM_LINE.captures(line) {
                reply.push_str(&format!("{}. [{}] {}\n", &caps[1], target, &caps[2]));
            }
        }
        reply
    }

    fn reply(&self, prompt: &str) -> String {
        let reply = Self::generate_numbered_reply(prompt);
        if reply.is_empty() {
            // Free-form text prompts carry the text after the first blank line
            let text = prompt.split_once("\n\n").map(|(_, text)| text).unwrap_or(prompt);
            return format!("[translated] {}", text);
        }
        reply
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        let text = match self.behavior {
            MockBehavior::Working => self.reply(&request.prompt),

            MockBehavior::DropLast => {
                let reply = self.reply(&request.prompt);
                let mut lines: Vec<&str> = reply.lines().collect();
                lines.pop();
                lines.join("\n")
            }

            MockBehavior::FailFirst { failures } => {
                if count < failures {
                    return Err(ProviderError::ApiError {
                        status_code: 503,
                        message: format!("Simulated failure (request #{})", count + 1),
                    });
                }
                self.reply(&request.prompt)
            }

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    return Err(ProviderError::ConnectionError(format!(
                        "Simulated intermittent failure (request #{})",
                        count + 1
                    )));
                }
                self.reply(&request.prompt)
            }

            MockBehavior::Failing => {
                return Err(ProviderError::ApiError {
                    status_code: 500,
                    message: "Simulated provider failure".to_string(),
                });
            }

            MockBehavior::Unauthorized => {
                return Err(ProviderError::from_status(401, "Authentication Fails, invalid api key"));
            }

            MockBehavior::InsufficientBalance => {
                return Err(ProviderError::from_status(402, "Insufficient Balance"));
            }

            MockBehavior::Empty => String::new(),
        };

        Ok(MockResponse { text })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Unauthorized | MockBehavior::InsufficientBalance | MockBehavior::Failing => self
                .complete(MockRequest { prompt: String::new() })
                .await
                .map(|_| ()),
            _ => Ok(()),
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.text.clone()
    }
}

#[async_trait]
impl CompletionBackend for MockProvider {
    async fn chat(&self, prompt: &ChatPrompt, _params: SamplingParams) -> Result<String, ProviderError> {
        let response = self.complete(MockRequest { prompt: prompt.user.clone() }).await?;
        Ok(Self::extract_text(&response))
    }

    async fn check_connection(&self) -> Result<(), ProviderError> {
        self.test_connection().await
    }
}

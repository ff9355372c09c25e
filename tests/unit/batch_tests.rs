/*!
 * Tests for batch and free-form translation against mock backends
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use lingobatch::errors::ProviderError;
use lingobatch::providers::mock::MockProvider;
use lingobatch::providers::{ChatPrompt, CompletionBackend, SamplingParams};
use lingobatch::translation::{
    BatchItem, BatchLanguages, BatchTranslator, FailureKind, Glossary, LlmTranslationClient, RetryPolicy,
    TextTranslator, TranslationClient,
};

/// Backend that records prompts and answers with a fixed reply
#[derive(Debug)]
struct RecordingBackend {
    reply: String,
    prompts: Mutex<Vec<ChatPrompt>>,
}

impl RecordingBackend {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<ChatPrompt> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl CompletionBackend for RecordingBackend {
    async fn chat(&self, prompt: &ChatPrompt, _params: SamplingParams) -> Result<String, ProviderError> {
        self.prompts.lock().push(prompt.clone());
        Ok(self.reply.clone())
    }
}

fn translator(provider: MockProvider, batch_size: usize) -> BatchTranslator {
    let client: Arc<dyn TranslationClient> = Arc::new(LlmTranslationClient::new(Arc::new(provider)));
    BatchTranslator::new(client, batch_size).with_retry_policy(RetryPolicy::fixed(3, Duration::ZERO))
}

fn texts(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("line {}", i)).collect()
}

#[tokio::test]
async fn test_translateTexts_withIntermittentFailures_shouldRecoverEveryBatch() {
    let provider = MockProvider::intermittent(2);
    let counter = provider.clone();

    let results = translator(provider, 2).translate_texts(&texts(6), "en", "fr").await.unwrap();

    assert_eq!(results.len(), 6);
    for (i, (text, translation)) in results.iter().enumerate() {
        assert_eq!(text, &format!("line {}", i));
        assert_eq!(translation, &format!("[French] line {}", i));
    }
    assert_eq!(counter.request_count(), 5);
}

#[tokio::test]
async fn test_translateTexts_withEmptyReplies_shouldMarkFormatErrors() {
    let provider = MockProvider::empty();
    let counter = provider.clone();

    let results = translator(provider, 10).translate_texts(&texts(3), "en", "de").await.unwrap();

    assert!(results.iter().all(|(_, translation)| translation == FailureKind::FormatError.marker()));
    assert_eq!(counter.request_count(), 4);
}

#[tokio::test]
async fn test_translateTexts_withInsufficientBalance_shouldReturnQuotaError() {
    let provider = MockProvider::insufficient_balance();
    let counter = provider.clone();

    let result = translator(provider, 10).translate_texts(&texts(3), "en", "de").await;

    assert!(matches!(result, Err(ProviderError::QuotaExceeded(_))));
    assert_eq!(counter.request_count(), 1);
}

#[tokio::test]
async fn test_llmClient_withReferences_shouldNameReferenceLanguageInPrompt() {
    let backend = Arc::new(RecordingBackend::new("1. Bonjour"));
    let client = LlmTranslationClient::new(backend.clone());
    let items = vec![BatchItem::with_reference("Hello", Some("Hola".to_string()))];
    let languages = BatchLanguages::new("en", "fr").with_reference(Some("es".to_string()));

    let results = client.translate(&items, &languages).await.unwrap();
    assert_eq!(results[0].translation, "Bonjour");

    let prompt = &backend.prompts()[0];
    assert!(prompt.user.starts_with("Translate the following 1 texts from English into French."));
    assert!(prompt.user.contains("Spanish reference translation"));
    assert!(prompt.user.contains("1. English text: Hello\n   Spanish reference: Hola"));
}

#[tokio::test]
async fn test_textTranslator_shouldInjectOnlyRelevantGlossaryTerms() {
    let backend = Arc::new(RecordingBackend::new("Le moteur"));
    let mut glossary = Glossary::new();
    glossary.add_term("engine", "moteur");
    glossary.add_term("wheel", "roue");

    let result = TextTranslator::new(backend.clone())
        .translate("The Engine", "en", "fr", &glossary)
        .await
        .unwrap();
    assert_eq!(result, "Le moteur");

    let prompt = &backend.prompts()[0];
    assert!(prompt.user.contains("- engine → moteur"));
    assert!(!prompt.user.contains("roue"));
    assert!(prompt.user.ends_with("The Engine"));
}

#[tokio::test]
async fn test_textTranslator_withLongText_shouldTranslateSegmentsInOrder() {
    let backend = Arc::new(RecordingBackend::new("ok"));
    let text = ["a".repeat(600), "b".repeat(600), "c".repeat(300)].join("\n");

    let result = TextTranslator::new(backend.clone())
        .translate(&text, "en", "fr", &Glossary::new())
        .await
        .unwrap();

    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].user.ends_with(&"a".repeat(600)));
    assert!(prompts[1].user.ends_with(&format!("{}\n{}", "b".repeat(600), "c".repeat(300))));
    assert_eq!(result, "ok\nok");
}

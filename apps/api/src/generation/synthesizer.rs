//! Content synthesis: one prompt per resume, retried with jittered exponential backoff,
//! reply parsed into a `SectionPayload`.
//!
//! Failure policy:
//! - A missing credential is fatal and returned immediately.
//! - Everything else (network, API status, empty text) is retried up to
//!   `max_attempts` times, then replaced by `SectionPayload::fallback()`.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::generation::sections::{parse_sections, SectionPayload};
use crate::llm_client::prompts::portfolio_prompt;
use crate::llm_client::{LlmError, TextGenerator};
use crate::models::user::Profile;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation is not configured: {0}")]
    Configuration(String),

    #[error("transient generation failure: {0}")]
    Transient(String),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("generation failed after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: String },
}

impl GenerationError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::EmptyResponse)
    }
}

impl From<LlmError> for GenerationError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingApiKey => Self::Configuration(e.to_string()),
            LlmError::EmptyContent => Self::EmptyResponse,
            other => Self::Transient(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    /// Upper bound of the random extra wait, as a fraction of the base delay.
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            jitter_ratio: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Base wait after the failed attempt numbered `attempt` (0-based): `initial * 2^attempt`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        self.initial_delay.saturating_mul(1u32 << attempt.min(16))
    }

    /// Base delay plus uniform jitter in `[0, jitter_ratio * base]`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter = base.as_secs_f64() * self.jitter_ratio * rand::thread_rng().gen::<f64>();
        base + Duration::from_secs_f64(jitter)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOutput {
    pub sections: SectionPayload,
    pub model_used: String,
    /// True when `sections` is the placeholder payload rather than model output.
    pub fallback: bool,
}

#[derive(Clone)]
pub struct ContentSynthesizer {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl ContentSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: RetryPolicy) -> Self {
        Self { generator, policy }
    }

    /// Produces section content for a resume. Only `Configuration` errors escape;
    /// every other failure degrades to the placeholder payload.
    pub async fn synthesize(
        &self,
        resume_text: &str,
        profile: &Profile,
        template_name: &str,
    ) -> Result<SynthesisOutput, GenerationError> {
        let model_used = self.generator.model_name().to_string();

        if resume_text.trim().is_empty() {
            warn!(
                "No resume text for {}; using placeholder content",
                profile.username
            );
            return Ok(SynthesisOutput {
                sections: SectionPayload::fallback(),
                model_used,
                fallback: true,
            });
        }

        let prompt = portfolio_prompt(profile.display_name(), template_name, resume_text);

        match self.generate_with_retry(&prompt).await {
            Ok(reply) => {
                info!(
                    "Generated portfolio content for {} ({} chars)",
                    profile.username,
                    reply.len()
                );
                Ok(SynthesisOutput {
                    sections: parse_sections(&reply),
                    model_used,
                    fallback: false,
                })
            }
            Err(e @ GenerationError::Configuration(_)) => Err(e),
            Err(e) => {
                error!("Content generation for {} failed: {e}", profile.username);
                Ok(SynthesisOutput {
                    sections: SectionPayload::fallback(),
                    model_used,
                    fallback: true,
                })
            }
        }
    }

    async fn generate_with_retry(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut last_error = GenerationError::EmptyResponse;

        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                let delay = self.policy.delay_for(attempt - 1);
                warn!(
                    "Generation attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let result = match self.generator.generate(prompt).await {
                Ok(text) if text.trim().is_empty() => Err(GenerationError::EmptyResponse),
                Ok(text) => Ok(text),
                Err(e) => Err(GenerationError::from(e)),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!("Generation attempt {} error: {e}", attempt + 1);
                    last_error = e;
                }
            }
        }

        Err(GenerationError::ExhaustedRetries {
            attempts: self.policy.max_attempts,
            last: last_error.to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    /// Plays back a fixed sequence of outcomes; repeats the last one once exhausted.
    pub(crate) struct ScriptedGenerator {
        script: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: AtomicU32,
    }

    impl ScriptedGenerator {
        pub(crate) fn new(script: Vec<Result<String, LlmError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            }
        }

        pub(crate) fn replying(text: &str) -> Self {
            Self::new(vec![Ok(text.to_string())])
        }

        pub(crate) fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn replay(outcome: &Result<String, LlmError>) -> Result<String, LlmError> {
        match outcome {
            Ok(text) => Ok(text.clone()),
            Err(LlmError::MissingApiKey) => Err(LlmError::MissingApiKey),
            Err(LlmError::EmptyContent) => Err(LlmError::EmptyContent),
            Err(LlmError::Api { status, message }) => Err(LlmError::Api {
                status: *status,
                message: message.clone(),
            }),
            Err(other) => Err(LlmError::Api {
                status: 500,
                message: other.to_string(),
            }),
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        fn model_name(&self) -> &str {
            "scripted-model"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                replay(script.front().unwrap())
            }
        }
    }

    fn overloaded() -> Result<String, LlmError> {
        Err(LlmError::Api {
            status: 503,
            message: "overloaded".to_string(),
        })
    }

    fn profile() -> Profile {
        Profile {
            username: "ada_l".to_string(),
            full_name: Some("Ada Lovelace".to_string()),
        }
    }

    const REPLY: &str = "[ABOUT]\nAnalyst.\n[SKILLS]\n* Python\n* Django\n* React";

    fn synthesizer(generator: Arc<ScriptedGenerator>) -> ContentSynthesizer {
        ContentSynthesizer::new(generator, RetryPolicy::default())
    }

    #[test]
    fn test_base_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay(0), Duration::from_secs(1));
        assert_eq!(policy.base_delay(1), Duration::from_secs(2));
        assert_eq!(policy.base_delay(2), Duration::from_secs(4));
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let policy = RetryPolicy::default();
        for attempt in 0..3 {
            let base = policy.base_delay(attempt);
            for _ in 0..50 {
                let delay = policy.delay_for(attempt);
                assert!(delay >= base);
                assert!(delay <= base + base / 10);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let generator = Arc::new(ScriptedGenerator::replying(REPLY));
        let output = synthesizer(generator.clone())
            .synthesize("resume text", &profile(), "Creative Professional")
            .await
            .unwrap();

        assert_eq!(generator.calls(), 1);
        assert!(!output.fallback);
        assert_eq!(output.model_used, "scripted-model");
        assert_eq!(output.sections.skills, vec!["Python", "Django", "React"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_fewer_failures_than_max() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            overloaded(),
            Err(LlmError::EmptyContent),
            Ok(REPLY.to_string()),
        ]));
        let started = Instant::now();

        let output = synthesizer(generator.clone())
            .synthesize("resume text", &profile(), "Creative Professional")
            .await
            .unwrap();

        assert_eq!(generator.calls(), 3);
        assert!(!output.fallback);
        assert_eq!(output.sections.about, "Analyst.");

        // Waits of 1s and 2s, each with at most 10% jitter.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
        assert!(elapsed <= Duration::from_millis(3400), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_fall_back_after_exact_attempts() {
        let generator = Arc::new(ScriptedGenerator::new(vec![overloaded()]));
        let started = Instant::now();

        let output = synthesizer(generator.clone())
            .synthesize("resume text", &profile(), "Creative Professional")
            .await
            .unwrap();

        assert_eq!(generator.calls(), 3);
        assert!(output.fallback);
        assert_eq!(output.sections, SectionPayload::fallback());

        // No sleep after the final attempt.
        assert!(started.elapsed() <= Duration::from_millis(3400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_reply_counts_as_failure() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok("   \n".to_string())]));
        let output = synthesizer(generator.clone())
            .synthesize("resume text", &profile(), "Creative Professional")
            .await
            .unwrap();

        assert_eq!(generator.calls(), 3);
        assert!(output.fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_credential_is_fatal_and_not_retried() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Err(LlmError::MissingApiKey)]));
        let result = synthesizer(generator.clone())
            .synthesize("resume text", &profile(), "Creative Professional")
            .await;

        assert!(matches!(result, Err(GenerationError::Configuration(_))));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_resume_skips_the_model() {
        let generator = Arc::new(ScriptedGenerator::replying(REPLY));
        let output = synthesizer(generator.clone())
            .synthesize("  \n ", &profile(), "Creative Professional")
            .await
            .unwrap();

        assert_eq!(generator.calls(), 0);
        assert!(output.fallback);
        assert_eq!(output.sections, SectionPayload::fallback());
    }
}

use crate::config::GenerationPolicy;
use crate::error::{Error, Result};
use crate::models::exercise::GeneratedExercise;
use crate::models::question::{Difficulty, GeneratedQuestion, LanguageMode};
use crate::services::credential_pool::CredentialPool;
use crate::services::distribution_enforcer::{
    count_by_type, enforce_distribution, sort_by_plan, trim_to_plan,
};
use crate::services::distribution_planner::TypeDistributionPlan;
use crate::services::extraction_service::{extract_questions, ExtractionContext};
use crate::services::finalizer::finalize_exercise;
use crate::services::gemini_client::{
    CompletionClient, CompletionRequest, GeminiClient, ProviderError,
};
use crate::services::prompt_builder::{build_prompt, PromptSettings};
use crate::utils::id_sequence::IdSequence;
use crate::utils::time;
use std::sync::Arc;

/// Raw model output is logged at debug level, cut to this many characters.
const RAW_LOG_CHARS: usize = 500;

/// A validated generation request. Built by the DTO layer; never invalid.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub exercise_name: String,
    pub lesson_name: String,
    pub plan: TypeDistributionPlan,
    pub difficulty: Difficulty,
    /// Options per choice-based question.
    pub num_answers: u32,
    pub language: LanguageMode,
    pub user_id: i64,
}

pub struct GenerationService<C = GeminiClient> {
    client: Arc<C>,
    credentials: Arc<CredentialPool>,
    policy: GenerationPolicy,
    max_output_tokens: u32,
}

impl<C> Clone for GenerationService<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            credentials: Arc::clone(&self.credentials),
            policy: self.policy.clone(),
            max_output_tokens: self.max_output_tokens,
        }
    }
}

impl<C: CompletionClient> GenerationService<C> {
    pub fn new(
        client: C,
        credentials: Arc<CredentialPool>,
        policy: GenerationPolicy,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            client: Arc::new(client),
            credentials,
            policy,
            max_output_tokens,
        }
    }

    pub fn credentials(&self) -> &CredentialPool {
        &self.credentials
    }

    pub async fn generate_exercise(&self, request: &GenerationRequest) -> Result<GeneratedExercise> {
        tracing::info!(
            "Generating {} question(s) for '{}' [{}], difficulty {}",
            request.plan.total(),
            request.lesson_name,
            request.plan,
            request.difficulty.as_str()
        );

        let mut questions = self.generate_questions(request).await?;

        enforce_distribution(&mut questions, &request.plan);
        sort_by_plan(&mut questions, &request.plan);
        let questions = trim_to_plan(questions, &request.plan);
        if request.plan.is_mixed() {
            tracing::info!(
                "Final type counts: {:?}",
                count_by_type(&questions, &request.plan)
            );
        }

        let now = time::now();
        let mut ids = IdSequence::starting_at(now.timestamp_millis());
        Ok(finalize_exercise(
            request,
            questions,
            &mut ids,
            time::to_sql_timestamp(now),
        ))
    }

    /// The retry loop. Each attempt takes the next credential whatever the outcome.
    pub async fn generate_questions(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedQuestion>> {
        let policy = &self.policy;
        let total = request.plan.total_len();
        let attempts = policy.max_retries + 1;

        let prompt = build_prompt(&PromptSettings {
            plan: &request.plan,
            difficulty: request.difficulty,
            lesson_name: &request.lesson_name,
            num_answers: request.num_answers,
            language: request.language,
        });
        let completion = CompletionRequest {
            prompt: prompt.text,
            temperature: request.difficulty.temperature(),
            max_output_tokens: self.max_output_tokens,
        };
        let ctx = ExtractionContext {
            plan: &request.plan,
            num_answers: request.num_answers,
            language: request.language,
            plausibility_threshold: policy.plausibility_threshold,
        };

        let mut short_result: Option<Vec<GeneratedQuestion>> = None;
        let mut last_failure = String::from("no attempt was made");

        for attempt in 0..attempts {
            let (key_index, key) = self.credentials.next();
            let label = format!("attempt {}/{}", attempt + 1, attempts);
            tracing::info!("Calling model with credential #{} ({})", key_index, label);

            let outcome = match tokio::time::timeout(
                policy.call_timeout,
                self.client.complete(key, &completion),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Timeout(policy.call_timeout)),
            };

            let text = match outcome {
                Ok(text) => text,
                Err(e) if e.is_overloaded() => {
                    tracing::warn!(
                        "Credential #{} overloaded, switching key without backoff ({}): {}",
                        key_index,
                        label,
                        e
                    );
                    last_failure = e.to_string();
                    continue;
                }
                Err(e) => {
                    last_failure = e.to_string();
                    if attempt + 1 < attempts {
                        let delay = policy.backoff_delay(attempt);
                        tracing::warn!("{}; retrying in {:?} ({})", e, delay, label);
                        tokio::time::sleep(delay).await;
                    } else {
                        tracing::warn!("{} ({})", e, label);
                    }
                    continue;
                }
            };

            tracing::debug!(
                "Raw model output ({} chars): {}",
                text.chars().count(),
                text.chars().take(RAW_LOG_CHARS).collect::<String>()
            );

            match extract_questions(&text, &ctx) {
                Ok(extraction) if extraction.questions.len() >= total => {
                    tracing::info!(
                        "Accepted {} question(s) via {} ({} padded)",
                        extraction.questions.len(),
                        extraction.layer,
                        extraction.padded
                    );
                    return Ok(extraction.questions);
                }
                Ok(extraction) => {
                    tracing::warn!(
                        "Only {} of {} question(s) extracted, retrying ({})",
                        extraction.questions.len(),
                        total,
                        label
                    );
                    last_failure = format!(
                        "only {} of {} questions extracted",
                        extraction.questions.len(),
                        total
                    );
                    short_result = Some(extraction.questions);
                }
                Err(e) => {
                    tracing::warn!("Extraction failed, retrying immediately ({}): {}", label, e);
                    last_failure = e.to_string();
                }
            }
        }

        settle_exhausted(short_result, attempts, total, last_failure)
    }
}

/// Outcome once every attempt is spent. Extraction pads to the plan total, so a short
/// result only appears if that padding is ever bypassed; it is accepted with a warning.
fn settle_exhausted(
    short_result: Option<Vec<GeneratedQuestion>>,
    attempts: u32,
    total: usize,
    last_failure: String,
) -> Result<Vec<GeneratedQuestion>> {
    match short_result {
        Some(questions) if !questions.is_empty() => {
            tracing::warn!(
                "Retries exhausted; proceeding with {} of {} question(s)",
                questions.len(),
                total
            );
            Ok(questions)
        }
        _ => Err(Error::Generation(format!(
            "no usable model response after {} attempt(s): {}",
            attempts, last_failure
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionType::{self, *};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted outcomes and records which credential each call used.
    struct ScriptedClient {
        replies: Mutex<VecDeque<std::result::Result<String, ProviderError>>>,
        keys_used: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<std::result::Result<String, ProviderError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                keys_used: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionClient for ScriptedClient {
        fn complete(
            &self,
            credential: &str,
            _request: &CompletionRequest,
        ) -> impl Future<Output = std::result::Result<String, ProviderError>> + Send {
            self.keys_used.lock().unwrap().push(credential.to_string());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Transport("script exhausted".into())));
            async move { reply }
        }
    }

    fn service(
        replies: Vec<std::result::Result<String, ProviderError>>,
        keys: &[&str],
    ) -> GenerationService<ScriptedClient> {
        let pool = CredentialPool::new(keys.iter().map(|k| k.to_string()).collect()).unwrap();
        GenerationService::new(
            ScriptedClient::new(replies),
            Arc::new(pool),
            GenerationPolicy::default(),
            8000,
        )
    }

    fn keys_used(service: &GenerationService<ScriptedClient>) -> Vec<String> {
        service.client.keys_used.lock().unwrap().clone()
    }

    fn request(plan: TypeDistributionPlan) -> GenerationRequest {
        GenerationRequest {
            exercise_name: "Unit quiz".to_string(),
            lesson_name: "Physics basics".to_string(),
            plan,
            difficulty: Difficulty::Easy,
            num_answers: 4,
            language: LanguageMode::English,
            user_id: 1,
        }
    }

    fn tf_array(texts: &[&str]) -> String {
        let items: Vec<String> = texts
            .iter()
            .map(|t| {
                format!(
                    r#"{{"question_text":"{}","emoji":"✅","answers":["True (correct)","False"],"explanation":"Basic fact.","suggested_type":"true_false"}}"#,
                    t
                )
            })
            .collect();
        format!("[{}]", items.join(","))
    }

    fn overloaded() -> std::result::Result<String, ProviderError> {
        Err(ProviderError::from_status(503, "The model is overloaded.".into()))
    }

    fn server_error() -> std::result::Result<String, ProviderError> {
        Err(ProviderError::from_status(500, "Internal error".into()))
    }

    fn plan(t: QuestionType, n: u32) -> TypeDistributionPlan {
        TypeDistributionPlan::from_selected(n, &[t]).unwrap()
    }

    const FACTS: [&str; 4] = [
        "Metals generally conduct electricity.",
        "Sound cannot travel through a vacuum.",
        "Ice is less dense than liquid water.",
        "The Earth orbits the Sun once a year.",
    ];

    #[tokio::test(start_paused = true)]
    async fn overload_switches_key_without_waiting() {
        let svc = service(vec![overloaded(), Ok(tf_array(&FACTS))], &["k1", "k2"]);
        let started = tokio::time::Instant::now();
        let questions = svc.generate_questions(&request(plan(TrueFalse, 4))).await.unwrap();
        assert_eq!(questions.len(), 4);
        assert_eq!(keys_used(&svc), vec!["k1", "k2"]);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn other_api_errors_back_off_exponentially() {
        let svc = service(
            vec![server_error(), server_error(), Ok(tf_array(&FACTS))],
            &["k1"],
        );
        let started = tokio::time::Instant::now();
        svc.generate_questions(&request(plan(TrueFalse, 4))).await.unwrap();
        // 1s after the first failure, 2s after the second
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn extraction_failures_retry_immediately() {
        let svc = service(
            vec![Ok("sorry, no JSON today".into()), Ok(tf_array(&FACTS))],
            &["k1", "k2", "k3"],
        );
        let started = tokio::time::Instant::now();
        let questions = svc.generate_questions(&request(plan(TrueFalse, 4))).await.unwrap();
        assert_eq!(questions.len(), 4);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(svc.credentials().cursor(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail_with_a_generation_error() {
        let svc = service(
            vec![overloaded(), overloaded(), overloaded(), overloaded()],
            &["k1", "k2"],
        );
        let err = svc
            .generate_questions(&request(plan(TrueFalse, 2)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        assert!(err.to_string().contains("4 attempt(s)"));
        assert_eq!(keys_used(&svc), vec!["k1", "k2", "k1", "k2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cursor_advances_once_per_attempt_from_its_current_position() {
        let svc = service(vec![server_error(), Ok(tf_array(&FACTS[..2]))], &["a", "b", "c"]);
        svc.credentials().next();
        svc.generate_questions(&request(plan(TrueFalse, 2))).await.unwrap();
        assert_eq!(keys_used(&svc), vec!["b", "c"]);
        assert_eq!(svc.credentials().cursor(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_true_false_with_one_malformed_entry() {
        let raw = format!(
            "{},{{\"question_text\": \"Broken \"entry\", \"emoji\": }}]",
            tf_array(&FACTS[..3]).trim_end_matches(']')
        );
        let svc = service(vec![Ok(raw)], &["k1"]);
        let exercise = svc
            .generate_exercise(&request(plan(TrueFalse, 4)))
            .await
            .unwrap();

        assert_eq!(exercise.questions.len(), 4);
        for q in &exercise.questions {
            assert_eq!(q.question_type, "true_false");
            let answers = q.answers.as_ref().unwrap();
            assert_eq!(answers.len(), 2);
            assert_eq!(answers.iter().filter(|a| a.is_correct).count(), 1);
        }
        let orders: Vec<u32> = exercise.questions.iter().map(|q| q.order_num).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn mixed_output_is_enforced_and_sorted() {
        let raw = r#"[
            {"question_text":"Is copper a good conductor of heat?","emoji":"✅","answers":["True (correct)","False"],"explanation":"Metals conduct.","suggested_type":"true_false"},
            {"question_text":"Which planet is known as the red planet?","emoji":"🔢","answers":["Mars (correct)","Venus","Jupiter","Saturn"],"explanation":"Iron oxide.","suggested_type":"multiple_choice"},
            {"question_text":"Which gas makes up most of the air?","emoji":"🔢","answers":["Nitrogen (correct)","Oxygen","Argon","Helium"],"explanation":"About 78%.","suggested_type":"multiple_choice"},
            {"question_text":"What is the boiling point of water in Celsius?","emoji":"🔢","answers":["100 (correct)","90","80","120"],"explanation":"At sea level.","suggested_type":"multiple_choice"}
        ]"#;
        let plan =
            TypeDistributionPlan::from_quantities(4, &[(MultipleChoice, 2), (TrueFalse, 2)]).unwrap();
        let svc = service(vec![Ok(raw.to_string())], &["k1"]);
        let exercise = svc.generate_exercise(&request(plan)).await.unwrap();

        let types: Vec<&str> = exercise
            .questions
            .iter()
            .map(|q| q.question_type.as_str())
            .collect();
        assert_eq!(
            types,
            vec!["multiple_choice", "multiple_choice", "true_false", "true_false"]
        );
        assert_eq!(exercise.questions[2].question_type_id, 2);
    }

    /// Never answers its first call; later calls return a fixed payload.
    struct StallingClient {
        calls: std::sync::atomic::AtomicUsize,
        keys_used: Mutex<Vec<String>>,
        reply: String,
    }

    impl CompletionClient for StallingClient {
        fn complete(
            &self,
            credential: &str,
            _request: &CompletionRequest,
        ) -> impl Future<Output = std::result::Result<String, ProviderError>> + Send {
            self.keys_used.lock().unwrap().push(credential.to_string());
            let call = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let reply = self.reply.clone();
            async move {
                if call == 0 {
                    std::future::pending::<()>().await;
                }
                Ok(reply)
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out_and_moves_to_the_next_key() {
        let pool = CredentialPool::new(vec!["k1".into(), "k2".into()]).unwrap();
        let svc = GenerationService::new(
            StallingClient {
                calls: Default::default(),
                keys_used: Mutex::new(Vec::new()),
                reply: tf_array(&FACTS),
            },
            Arc::new(pool),
            GenerationPolicy::default(),
            8000,
        );
        let started = tokio::time::Instant::now();
        let questions = svc.generate_questions(&request(plan(TrueFalse, 4))).await.unwrap();
        assert_eq!(questions.len(), 4);
        assert_eq!(*svc.client.keys_used.lock().unwrap(), vec!["k1", "k2"]);
        assert_eq!(svc.credentials().cursor(), 2);
        // 60s call timeout, then the 1s first backoff
        assert_eq!(started.elapsed(), Duration::from_secs(61));
    }

    #[test]
    fn exhaustion_keeps_a_short_parsed_result() {
        let short = vec![GeneratedQuestion {
            question_text: "Sound cannot travel through a vacuum.".into(),
            ..Default::default()
        }];
        let questions =
            settle_exhausted(Some(short), 4, 3, "only 1 of 3 questions extracted".into()).unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn exhaustion_without_a_parsed_result_fails() {
        let err = settle_exhausted(None, 4, 3, "model overloaded".into()).unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        assert!(err.to_string().contains("after 4 attempt(s): model overloaded"));

        let err = settle_exhausted(Some(Vec::new()), 4, 3, "empty".into()).unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }
}

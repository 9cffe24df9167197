use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use foodscan::backend::FoodLookup;
use foodscan::barcode::Barcode;
use foodscan::error::LookupError;
use foodscan::lookup::{lookup_with_retry, Dispatcher, RetryPolicy};
use foodscan::model::FoodItem;
use reqwest::StatusCode;

type Response = Result<Option<FoodItem>, LookupError>;

#[derive(Clone, Default)]
struct RecordingLookup {
    responses: Arc<Mutex<VecDeque<Response>>>,
    calls: Arc<Mutex<Vec<(String, Instant)>>>,
}

impl RecordingLookup {
    fn with_responses(responses: Vec<Response>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Default::default()
        }
    }

    async fn pop_response(&self) -> Response {
        let mut guard = self.responses.lock().await;
        guard
            .pop_front()
            .unwrap_or_else(|| Err(LookupError::Other("request timed out".into())))
    }

    async fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl FoodLookup for RecordingLookup {
    async fn lookup_barcode(&self, barcode: &Barcode) -> Response {
        self.calls
            .lock()
            .await
            .push((barcode.as_str().to_string(), Instant::now()));
        self.pop_response().await
    }
}

fn status(code: u16, message: &str) -> LookupError {
    LookupError::Status {
        status: StatusCode::from_u16(code).unwrap(),
        message: message.into(),
    }
}

fn oat_milk() -> FoodItem {
    serde_json::from_value(serde_json::json!({
        "food_name": "Oat Milk",
        "brand_name": "Oatly",
        "calories": 120.0,
        "carbs": 16.0,
        "sugar": 7.0
    }))
    .unwrap()
}

fn code() -> Barcode {
    Barcode::parse("7394376616228").unwrap()
}

#[tokio::test(start_paused = true)]
async fn transient_failures_use_three_attempts_then_not_found() {
    let lookup = RecordingLookup::default();

    let result = lookup_with_retry(&lookup, &code(), RetryPolicy::default())
        .await
        .unwrap();
    assert!(result.is_none());

    let calls = lookup.calls().await;
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|(c, _)| c == "7394376616228"));
}

#[tokio::test(start_paused = true)]
async fn backoff_is_linear() {
    let lookup = RecordingLookup::default();
    lookup_with_retry(&lookup, &code(), RetryPolicy::default())
        .await
        .unwrap();

    let calls = lookup.calls().await;
    assert_eq!(calls.len(), 3);
    assert!(calls[1].1 - calls[0].1 >= Duration::from_millis(1000));
    assert!(calls[2].1 - calls[1].1 >= Duration::from_millis(2000));
    assert!(calls[2].1 - calls[1].1 < Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn not_found_status_stops_after_one_attempt() {
    let lookup = RecordingLookup::with_responses(vec![Err(status(404, "Product not found"))]);
    let result = lookup_with_retry(&lookup, &code(), RetryPolicy::default())
        .await
        .unwrap();
    assert!(result.is_none());
    assert_eq!(lookup.calls().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn bad_request_status_stops_after_one_attempt() {
    let lookup = RecordingLookup::with_responses(vec![Err(status(
        400,
        "Barcode must be at least 8 characters long",
    ))]);
    let result = lookup_with_retry(&lookup, &code(), RetryPolicy::default())
        .await
        .unwrap();
    assert!(result.is_none());
    assert_eq!(lookup.calls().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn whitelist_rejection_is_raised_immediately() {
    let lookup = RecordingLookup::with_responses(vec![Err(status(
        500,
        "Failed to search by barcode: IP address 198.51.100.4 not whitelisted in FatSecret API. Please add this IP to your whitelist.",
    ))]);
    let err = lookup_with_retry(&lookup, &code(), RetryPolicy::default())
        .await
        .unwrap_err();
    assert_eq!(err.ip.as_deref(), Some("198.51.100.4"));
    assert!(err.to_string().contains("not whitelisted"));
    assert_eq!(lookup.calls().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn success_on_second_attempt_short_circuits() {
    let lookup = RecordingLookup::with_responses(vec![
        Err(status(503, "Service Unavailable")),
        Ok(Some(oat_milk())),
    ]);
    let result = lookup_with_retry(&lookup, &code(), RetryPolicy::default())
        .await
        .unwrap();
    assert_eq!(result, Some(oat_milk()));
    assert_eq!(lookup.calls().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn empty_answer_is_not_retried() {
    let lookup = RecordingLookup::with_responses(vec![Ok(None)]);
    let result = lookup_with_retry(&lookup, &code(), RetryPolicy::default())
        .await
        .unwrap();
    assert!(result.is_none());
    assert_eq!(lookup.calls().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn token_failures_are_retried() {
    let lookup = RecordingLookup::with_responses(vec![
        Err(LookupError::Auth("session expired".into())),
        Err(LookupError::Auth("session expired".into())),
        Ok(Some(oat_milk())),
    ]);
    let result = lookup_with_retry(&lookup, &code(), RetryPolicy::default())
        .await
        .unwrap();
    assert_eq!(result.map(|f| f.food_name), Some("Oat Milk".to_string()));
    assert_eq!(lookup.calls().await.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn custom_policy_bounds_attempts() {
    let lookup = RecordingLookup::default();
    let policy = RetryPolicy {
        max_retries: 4,
        base_delay: Duration::from_millis(50),
    };
    let dispatcher = Dispatcher::new(Arc::new(lookup.clone()), policy);
    assert!(dispatcher.lookup(&code()).await.unwrap().is_none());

    let calls = lookup.calls().await;
    assert_eq!(calls.len(), 5);
    assert!(calls[4].1 - calls[3].1 >= Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn overlapping_lookups_are_independent() {
    let lookup = RecordingLookup::with_responses(vec![Ok(Some(oat_milk())), Ok(Some(oat_milk()))]);
    let dispatcher = Dispatcher::new(Arc::new(lookup.clone()), RetryPolicy::default());
    let barcode = code();

    let (a, b) = tokio::join!(dispatcher.lookup(&barcode), dispatcher.lookup(&barcode));
    assert!(a.unwrap().is_some());
    assert!(b.unwrap().is_some());
    assert_eq!(lookup.calls().await.len(), 2);
}

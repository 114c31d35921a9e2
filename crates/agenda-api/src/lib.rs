//! JSON REST API for the agenda novelty engine.
//!
//! Exposes an axum [`Router`] backed by a [`Scheduler`] over any
//! [`agenda_core::store::NoveltyStore`]. Auth, TLS, and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", agenda_api::api_router(scheduler.clone()))
//! ```

pub mod appointments;
pub mod availability;
pub mod error;
pub mod novelties;

use std::sync::Arc;

use agenda_core::{service::Scheduler, store::NoveltyStore};
use axum::{
  Router,
  routing::{get, post},
};

pub use error::ApiError;

/// Build a fully-materialised API router for `scheduler`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(scheduler: Arc<Scheduler<S>>) -> Router<()>
where
  S: NoveltyStore + 'static,
{
  Router::new()
    // Novelties
    .route("/novelties", get(novelties::list::<S>).post(novelties::create::<S>))
    .route("/novelties/today", get(novelties::today::<S>))
    .route("/novelties/stats", get(novelties::stats::<S>))
    .route(
      "/novelties/{id}",
      get(novelties::get_one::<S>).put(novelties::update_one::<S>),
    )
    .route("/novelties/{id}/void", post(novelties::void_one::<S>))
    // Availability
    .route("/availability", get(availability::handler::<S>))
    // Appointments
    .route("/appointments", get(appointments::list::<S>))
    .route(
      "/appointments/{id}",
      get(appointments::get_one::<S>).put(appointments::save_one::<S>),
    )
    .with_state(scheduler)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use agenda_core::{clock::FixedClock, hours::BusinessHours, service::Scheduler};
  use agenda_store_sqlite::SqliteStore;
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::NaiveDate;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::api_router;

  const TODAY: &str = "2030-06-10";
  const TOMORROW: &str = "2030-06-11";

  async fn make_router() -> axum::Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let today = NaiveDate::from_ymd_opt(2030, 6, 10).unwrap();
    let scheduler = Scheduler::new(store, BusinessHours::default())
      .with_clock(Arc::new(FixedClock(today)));
    api_router(Arc::new(scheduler))
  }

  async fn send(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    let resp = router
      .clone()
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn book(router: &axum::Router, provider: Uuid, date: &str, time: &str) -> Uuid {
    let id = Uuid::new_v4();
    let (status, _) = send(
      router,
      "PUT",
      &format!("/appointments/{id}"),
      Some(json!({ "provider_id": provider, "date": date, "time": time })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    id
  }

  fn full_day(provider: Uuid) -> Value {
    json!({
      "provider_id": provider,
      "date": TOMORROW,
      "state": "absent",
      "absence_kind": "full_day",
      "reason": "medical appointment"
    })
  }

  #[tokio::test]
  async fn create_full_day_cancels_and_blocks_availability() {
    let router = make_router().await;
    let provider = Uuid::new_v4();
    book(&router, provider, TOMORROW, "11:00:00").await;
    book(&router, provider, TOMORROW, "15:00:00").await;

    let (status, novelty) = send(&router, "POST", "/novelties", Some(full_day(provider))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(novelty["state"], "absent");
    assert_eq!(novelty["absence_start"], "10:00:00");

    let (status, appointments) = send(
      &router,
      "GET",
      &format!("/appointments?provider_id={provider}&date={TOMORROW}"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let states: Vec<_> = appointments
      .as_array()
      .unwrap()
      .iter()
      .map(|a| a["state"].as_str().unwrap().to_owned())
      .collect();
    assert_eq!(states, vec!["cancelled_by_novelty", "cancelled_by_novelty"]);

    let (status, report) = send(
      &router,
      "GET",
      &format!("/availability?provider_id={provider}&date={TOMORROW}"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["unavailable"][0]["start"], "10:00:00");
    assert_eq!(report["unavailable"][0]["end"], "20:00:00");
    assert_eq!(report["unavailable"][0]["cause"], "full_day_absence");
    assert_eq!(report["status"], "Unavailable all day");
  }

  #[tokio::test]
  async fn invalid_novelty_returns_field_errors() {
    let router = make_router().await;
    let (status, body) = send(
      &router,
      "POST",
      "/novelties",
      Some(json!({
        "provider_id": Uuid::new_v4(),
        "date": TODAY,
        "state": "late"
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "arrival_time");
  }

  #[tokio::test]
  async fn duplicate_novelty_is_rejected() {
    let router = make_router().await;
    let provider = Uuid::new_v4();
    send(&router, "POST", "/novelties", Some(full_day(provider))).await;

    let (status, body) = send(&router, "POST", "/novelties", Some(full_day(provider))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "non_field_errors");
  }

  #[tokio::test]
  async fn detail_update_and_void_round_trip() {
    let router = make_router().await;
    let provider = Uuid::new_v4();
    let appointment = book(&router, provider, TOMORROW, "15:00:00").await;

    let (_, novelty) = send(&router, "POST", "/novelties", Some(full_day(provider))).await;
    let id = novelty["novelty_id"].as_str().unwrap().to_owned();

    let (status, updated) = send(
      &router,
      "PUT",
      &format!("/novelties/{id}"),
      Some(json!({
        "provider_id": provider,
        "date": TOMORROW,
        "state": "absent",
        "absence_kind": "partial_hours",
        "absence_start": "10:00:00",
        "absence_end": "13:00:00"
      })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["absence_kind"], "partial_hours");

    let (status, detail) = send(&router, "GET", &format!("/novelties/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["message"], "Provider is absent from 10:00 to 13:00.");
    assert_eq!(detail["date_rules"]["tomorrow"], TOMORROW);
    assert_eq!(
      detail["affected_appointments"][0]["appointment_id"],
      appointment.to_string()
    );

    let (status, body) =
      send(&router, "POST", &format!("/novelties/{id}/void"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "void_reason");

    let (status, voided) = send(
      &router,
      "POST",
      &format!("/novelties/{id}/void"),
      Some(json!({ "reason": "recovered" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(voided["state"], "voided");

    let (_, appointments) = send(
      &router,
      "GET",
      &format!("/appointments?provider_id={provider}&date={TOMORROW}"),
      None,
    )
    .await;
    assert_eq!(appointments[0]["state"], "pending");
  }

  #[tokio::test]
  async fn appointment_referencing_unknown_novelty_is_a_400() {
    let router = make_router().await;
    let (status, body) = send(
      &router,
      "PUT",
      &format!("/appointments/{}", Uuid::new_v4()),
      Some(json!({
        "provider_id": Uuid::new_v4(),
        "date": TOMORROW,
        "time": "11:00:00",
        "novelty_id": Uuid::new_v4()
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "novelty_id");
  }

  #[tokio::test]
  async fn unknown_novelty_returns_404() {
    let router = make_router().await;
    let id = Uuid::new_v4();

    let (status, _) = send(&router, "GET", &format!("/novelties/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&router, "GET", &format!("/appointments/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains(&id.to_string()));

    let (status, _) = send(
      &router,
      "POST",
      &format!("/novelties/{id}/void"),
      Some(json!({ "reason": "typo" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn list_today_and_stats() {
    let router = make_router().await;
    let provider = Uuid::new_v4();
    send(
      &router,
      "POST",
      "/novelties",
      Some(json!({
        "provider_id": provider,
        "date": TODAY,
        "state": "late",
        "arrival_time": "11:15:00"
      })),
    )
    .await;
    send(&router, "POST", "/novelties", Some(full_day(Uuid::new_v4()))).await;

    let (status, today) = send(&router, "GET", "/novelties/today", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(today.as_array().unwrap().len(), 1);
    assert_eq!(today[0]["entry_time"], "11:15:00");

    let (_, filtered) =
      send(&router, "GET", &format!("/novelties?provider_id={provider}"), None).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);

    let (status, stats) = send(&router, "GET", "/novelties/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["absences"], 1);
    assert_eq!(stats["late_arrivals"], 1);
    assert_eq!(stats["today"], 1);

    let (_, absent_only) = send(&router, "GET", "/novelties/stats?state=absent", None).await;
    assert_eq!(absent_only["total"], 1);
  }
}

//! A fake WaterSmart portal served from a background thread.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::{json, Value};

use watersmart::models::local_midnight;

pub const USERNAME: &str = "resident@example.com";
pub const PASSWORD: &str = "correct horse";

const SESSION_COOKIE: &str = "PHPSESSID=bootstrap";
const AUTH_COOKIE: &str = "auth=granted";


/// How the fake portal answers.
#[derive(Clone)]
pub struct Behavior {
    pub bootstrap_status: StatusCode,
    pub login_status: StatusCode,
    pub chart_status: StatusCode,
    pub daily: Value,
    pub hourly: Value,
}


impl Default for Behavior {
    fn default() -> Self {
        Self {
            bootstrap_status: StatusCode::OK,
            login_status: StatusCode::OK,
            chart_status: StatusCode::OK,
            daily: daily_payload(),
            hourly: hourly_payload(),
        }
    }
}


pub struct PortalState {
    behavior: Behavior,
    pub logins: AtomicUsize,
    pub chart_hits: AtomicUsize,
}


pub struct FakePortal {
    pub root_url: String,
    pub state: Arc<PortalState>,
}


impl FakePortal {
    pub fn start() -> Self {
        Self::with_behavior(Behavior::default())
    }

    pub fn with_behavior(behavior: Behavior) -> Self {
        let state = Arc::new(PortalState {
            behavior,
            logins: AtomicUsize::new(0),
            chart_hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/index.php/logout", get(bootstrap))
            .route("/index.php/logout/login", post(login))
            .route("/index.php/welcome", get(welcome))
            .route("/index.php/home/index", get(home))
            .route(
                "/index.php/rest/v1/Chart/weatherConsumptionChart",
                get(daily_chart),
            )
            .route("/index.php/rest/v1/Chart/RealTimeChart", get(hourly_chart))
            .with_state(Arc::clone(&state));

        let (tx, rx) = mpsc::channel::<SocketAddr>();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("fake portal runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind fake portal");
                tx.send(listener.local_addr().expect("local addr"))
                    .expect("send address");
                axum::serve(listener, app).await.expect("serve fake portal");
            });
        });

        let addr = rx.recv().expect("fake portal address");
        Self {
            root_url: format!("http://{addr}/index.php"),
            state,
        }
    }

    pub fn provider(&self) -> watersmart::Provider {
        watersmart::Provider::custom("fake", &self.root_url).expect("fake provider")
    }

    pub fn logins(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }

    pub fn chart_hits(&self) -> usize {
        self.state.chart_hits.load(Ordering::SeqCst)
    }
}


pub fn midnight(date: &str) -> i64 {
    local_midnight(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()).unwrap()
}


pub fn daily_payload() -> Value {
    json!({
        "data": {
            "chartData": {
                "dailyData": {
                    "categories": ["2023-06-01", "2023-06-02"],
                    "consumption": [100.0, 110.0],
                    "temperature": [60.0, 62.0],
                    "precipitation": [0.0, 0.1]
                }
            }
        }
    })
}


pub fn hourly_payload() -> Value {
    json!({
        "data": {
            "series": [
                {"read_datetime": 1685602800, "gallons": 3.5, "leak_gallons": 0.0, "flags": ["LEAK"]},
                {"read_datetime": 1685606400, "gallons": 1.25, "leak_gallons": null, "flags": null},
                {"read_datetime": 1685610000, "gallons": 0.0, "leak_gallons": 0.0, "flags": []}
            ]
        }
    })
}


fn has_cookie(headers: &HeaderMap, cookie: &str) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split("; "))
        .any(|c| c == cookie)
}


fn looks_like_browser(headers: &HeaderMap) -> bool {
    let agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    agent.starts_with("Mozilla/5.0") && headers.contains_key("referrer")
}


async fn bootstrap(State(state): State<Arc<PortalState>>) -> Response {
    if state.behavior.bootstrap_status != StatusCode::OK {
        return state.behavior.bootstrap_status.into_response();
    }
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/"))],
        "<html>signed out</html>",
    )
        .into_response()
}


async fn login(
    State(state): State<Arc<PortalState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.logins.fetch_add(1, Ordering::SeqCst);

    if state.behavior.login_status != StatusCode::OK {
        return state.behavior.login_status.into_response();
    }
    if !has_cookie(&headers, SESSION_COOKIE) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let valid = form.get("email").map(String::as_str) == Some(USERNAME)
        && form.get("password").map(String::as_str) == Some(PASSWORD);
    if !valid {
        // Bad logins land back on the signed-out page without an auth cookie.
        return (StatusCode::FOUND, [(header::LOCATION, "/index.php/logout")]).into_response();
    }

    // The auth cookie only appears on the first redirect hop.
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, "/index.php/welcome".to_string()),
            (header::SET_COOKIE, format!("{AUTH_COOKIE}; Path=/")),
        ],
    )
        .into_response()
}


async fn welcome() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/index.php/home/index")]).into_response()
}


async fn home() -> &'static str {
    "<html>home</html>"
}


fn chart(state: &PortalState, headers: &HeaderMap, payload: &Value) -> Response {
    state.chart_hits.fetch_add(1, Ordering::SeqCst);

    if state.behavior.chart_status != StatusCode::OK {
        return state.behavior.chart_status.into_response();
    }
    if !has_cookie(headers, AUTH_COOKIE) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if !looks_like_browser(headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    Json(payload.clone()).into_response()
}


async fn daily_chart(State(state): State<Arc<PortalState>>, headers: HeaderMap) -> Response {
    chart(&state, &headers, &state.behavior.daily)
}


async fn hourly_chart(State(state): State<Arc<PortalState>>, headers: HeaderMap) -> Response {
    chart(&state, &headers, &state.behavior.hourly)
}

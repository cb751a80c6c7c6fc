use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use openscale_store::{Field, Layout, MemoryEeprom, Settings, SettingsStore, StoreError, Value};
use serde::{Deserialize, Serialize};

use crate::{db, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_settings).put(save_settings))
        .route("/raw", get(raw_image))
        .route("/reset", post(reset_settings))
        .route("/{field}", get(read_setting).put(write_setting))
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    layout: Layout,
    initialized: bool,
    settings: Settings,
}

#[derive(Debug, Serialize)]
pub struct FieldValue {
    field: Field,
    value: Value,
}

#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct RawImage {
    len: usize,
    /// Hex dump from the sentinel through the checksum
    bytes: String,
}

/// GET /api/settings - Read the whole settings record
async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingsResponse>, (StatusCode, String)> {
    let store = state.store.read().await;
    let settings = store.load().map_err(store_error)?;

    Ok(Json(SettingsResponse {
        layout: store.layout(),
        initialized: store.is_initialized(),
        settings,
    }))
}

/// PUT /api/settings - Replace the whole settings record
async fn save_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<Settings>,
) -> Result<Json<Settings>, (StatusCode, String)> {
    let mut store = state.store.write().await;
    let before = store.image();
    store.save(&settings).map_err(store_error)?;
    let settings = store.load().map_err(store_error)?;
    persist(&state, &mut store, &before).await?;
    drop(store);

    tracing::info!("Settings saved");

    // Broadcast update to UI clients
    let _ = state.ui_broadcast.send(
        serde_json::json!({
            "type": "settings_saved",
            "settings": settings,
            "at": Utc::now()
        })
        .to_string(),
    );

    Ok(Json(settings))
}

/// GET /api/settings/:field - Read a single setting
async fn read_setting(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<FieldValue>, (StatusCode, String)> {
    let field = name.parse::<Field>().map_err(store_error)?;
    let value = state
        .store
        .read()
        .await
        .read_field(field)
        .map_err(store_error)?;

    Ok(Json(FieldValue { field, value }))
}

/// PUT /api/settings/:field - Write a single setting
async fn write_setting(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<WriteRequest>,
) -> Result<Json<FieldValue>, (StatusCode, String)> {
    let field = name.parse::<Field>().map_err(store_error)?;

    let mut store = state.store.write().await;
    let before = store.image();
    store.write_field(field, request.value).map_err(|e| {
        tracing::warn!("Rejected write to {}: {}", field, e);
        store_error(e)
    })?;
    let value = store.read_field(field).map_err(store_error)?;
    persist(&state, &mut store, &before).await?;
    drop(store);

    tracing::info!("Setting {} changed to {}", field, value);

    // Broadcast update
    let _ = state.ui_broadcast.send(
        serde_json::json!({
            "type": "setting_changed",
            "field": field,
            "value": value,
            "at": Utc::now()
        })
        .to_string(),
    );

    Ok(Json(FieldValue { field, value }))
}

/// POST /api/settings/reset - Restore factory defaults
async fn reset_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Settings>, (StatusCode, String)> {
    let mut store = state.store.write().await;
    let before = store.image();
    store.reset_to_defaults();
    let settings = store.load().map_err(store_error)?;
    persist(&state, &mut store, &before).await?;
    drop(store);

    // Broadcast reset
    let _ = state.ui_broadcast.send(
        serde_json::json!({
            "type": "settings_reset",
            "settings": settings,
            "at": Utc::now()
        })
        .to_string(),
    );

    Ok(Json(settings))
}

/// GET /api/settings/raw - Dump the EEPROM image
async fn raw_image(State(state): State<Arc<AppState>>) -> Json<RawImage> {
    let image = state.store.read().await.image();

    Json(RawImage {
        len: image.len(),
        bytes: image.iter().map(|b| format!("{:02x}", b)).collect(),
    })
}

/// Saves the store image to the database. On failure the store is rolled
/// back to `before`.
async fn persist(
    state: &AppState,
    store: &mut SettingsStore<MemoryEeprom>,
    before: &[u8],
) -> Result<(), (StatusCode, String)> {
    let Err(err) = db::save_image(&state.db, &store.image()).await else {
        return Ok(());
    };

    if let Err(restore_err) = store.restore(before) {
        tracing::error!("Failed to roll back settings: {}", restore_err);
    } else {
        tracing::warn!("Rolled back settings after failed save");
    }
    Err(db_error(err))
}

fn store_error(err: StoreError) -> (StatusCode, String) {
    let status = match &err {
        StoreError::OutOfRange { .. } | StoreError::TypeMismatch { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        StoreError::UnsupportedField { .. } => StatusCode::BAD_REQUEST,
        StoreError::UnknownField(_) => StatusCode::NOT_FOUND,
        StoreError::Uninitialized | StoreError::Corrupt { .. } => StatusCode::CONFLICT,
        StoreError::UnknownLayout(_)
        | StoreError::Capacity { .. }
        | StoreError::ImageLength { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, err.to_string())
}

fn db_error(err: sqlx::Error) -> (StatusCode, String) {
    tracing::error!("Failed to persist settings: {}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use openscale_store::MassUnit;
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::settings::SharedStore;

    async fn test_state(layout: Layout) -> Arc<AppState> {
        let db = db::connect("sqlite::memory:").await.unwrap();
        db::migrate(&db).await.unwrap();

        let mut store = SettingsStore::new(MemoryEeprom::default(), layout).unwrap();
        store.load_or_reset();
        db::save_image(&db, &store.image()).await.unwrap();

        let (ui_broadcast, _) = broadcast::channel(16);
        Arc::new(AppState {
            db,
            config: Config {
                layout,
                ..Config::default()
            },
            store: SharedStore::new(store),
            ui_broadcast,
        })
    }

    async fn send(
        state: &Arc<AppState>,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(json) => request.body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = crate::app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn json(body: &str) -> serde_json::Value {
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn get_settings_returns_defaults() {
        let state = test_state(Layout::Standard).await;
        let (status, body) = send(&state, "GET", "/api/settings", None).await;

        assert_eq!(StatusCode::OK, status);
        let body = json(&body);
        assert_eq!("standard", body["layout"]);
        assert_eq!(true, body["initialized"]);
        assert_eq!(9600, body["settings"]["baud_rate"]);
        assert_eq!("lbs", body["settings"]["mass_unit"]);
    }

    #[tokio::test]
    async fn write_and_read_field() {
        let state = test_state(Layout::Standard).await;
        let (status, body) = send(
            &state,
            "PUT",
            "/api/settings/calibration_factor",
            Some(serde_json::json!({ "value": -12345 })),
        )
        .await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(-12345, json(&body)["value"]);

        let (status, body) = send(&state, "GET", "/api/settings/calibration_factor", None).await;
        assert_eq!(StatusCode::OK, status);
        let body = json(&body);
        assert_eq!("calibration_factor", body["field"]);
        assert_eq!(-12345, body["value"]);
    }

    #[tokio::test]
    async fn out_of_range_baud_is_rejected() {
        let state = test_state(Layout::Standard).await;
        let (status, body) = send(
            &state,
            "PUT",
            "/api/settings/baud_rate",
            Some(serde_json::json!({ "value": 1000 })),
        )
        .await;

        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
        assert!(body.contains("out of range"), "{body}");
        assert_eq!(
            Ok(Value::Unsigned(9600)),
            state.store.read().await.read_field(Field::BaudRate)
        );
    }

    #[tokio::test]
    async fn unknown_and_unsupported_fields() {
        let state = test_state(Layout::Standard).await;

        let (status, _) = send(&state, "GET", "/api/settings/baud", None).await;
        assert_eq!(StatusCode::NOT_FOUND, status);

        let (status, _) = send(&state, "GET", "/api/settings/status_enable", None).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
    }

    #[tokio::test]
    async fn extended_layout_exposes_temperature_flags() {
        let state = test_state(Layout::Extended).await;
        let (status, body) = send(
            &state,
            "PUT",
            "/api/settings/remote_temp_enable",
            Some(serde_json::json!({ "value": true })),
        )
        .await;

        assert_eq!(StatusCode::OK, status);
        assert_eq!(true, json(&body)["value"]);
    }

    #[tokio::test]
    async fn writes_are_persisted() {
        let state = test_state(Layout::Standard).await;
        send(
            &state,
            "PUT",
            "/api/settings/mass_unit",
            Some(serde_json::json!({ "value": "kg" })),
        )
        .await;

        let image = db::load_image(&state.db, 1024).await.unwrap();
        let store =
            SettingsStore::open(MemoryEeprom::from_image(&image, 1024), Layout::Standard).unwrap();
        assert_eq!(MassUnit::Kg, store.load().unwrap().mass_unit);
    }

    #[tokio::test]
    async fn bulk_save_validates_everything_first() {
        let state = test_state(Layout::Standard).await;
        let (status, _) = send(
            &state,
            "PUT",
            "/api/settings",
            Some(serde_json::json!({ "report_rate": 500, "decimal_places": 9 })),
        )
        .await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
        assert_eq!(
            Ok(Value::Unsigned(200)),
            state.store.read().await.read_field(Field::ReportRate)
        );

        let (status, body) = send(
            &state,
            "PUT",
            "/api/settings",
            Some(serde_json::json!({ "report_rate": 500, "decimal_places": 3 })),
        )
        .await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(500, json(&body)["report_rate"]);
    }

    #[tokio::test]
    async fn reset_restores_defaults_and_broadcasts() {
        let state = test_state(Layout::Standard).await;
        send(
            &state,
            "PUT",
            "/api/settings/tare_point",
            Some(serde_json::json!({ "value": 8000 })),
        )
        .await;

        let mut rx = state.ui_broadcast.subscribe();
        let (status, body) = send(&state, "POST", "/api/settings/reset", None).await;

        assert_eq!(StatusCode::OK, status);
        assert_eq!(0, json(&body)["tare_point"]);
        assert_eq!("settings_reset", json(&rx.try_recv().unwrap())["type"]);
    }

    #[tokio::test]
    async fn failed_persist_leaves_store_unchanged() {
        let state = test_state(Layout::Standard).await;
        let before = state.store.read().await.image();
        let mut rx = state.ui_broadcast.subscribe();
        state.db.close().await;

        let (status, _) = send(
            &state,
            "PUT",
            "/api/settings/baud_rate",
            Some(serde_json::json!({ "value": 115200 })),
        )
        .await;
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, status);
        assert_eq!(
            Ok(Value::Unsigned(9600)),
            state.store.read().await.read_field(Field::BaudRate)
        );

        let (status, _) = send(
            &state,
            "PUT",
            "/api/settings",
            Some(serde_json::json!({ "mass_unit": "kg" })),
        )
        .await;
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, status);

        let (status, _) = send(&state, "POST", "/api/settings/reset", None).await;
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, status);

        assert_eq!(before, state.store.read().await.image());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn raw_dump() {
        let state = test_state(Layout::Standard).await;
        let (status, body) = send(&state, "GET", "/api/settings/raw", None).await;

        assert_eq!(StatusCode::OK, status);
        let body = json(&body);
        assert_eq!(20, body["len"]);
        assert!(body["bytes"].as_str().unwrap().starts_with("a101"));
    }

    #[tokio::test]
    async fn board_follows_layout() {
        let state = test_state(Layout::Extended).await;
        let (status, body) = send(&state, "GET", "/api/board", None).await;

        assert_eq!(StatusCode::OK, status);
        let body = json(&body);
        assert_eq!("power-reduction", body["name"]);
        assert_eq!(0x49, body["tmp102_address"]);
        assert_eq!("analog", body["amp_en"]["kind"]);
    }
}

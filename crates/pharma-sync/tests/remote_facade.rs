//! DataStore against an in-process fake of the spreadsheet endpoint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use pharma_core::billing::{bill_item, BillDraft};
use pharma_core::{MedicineDraft, MedicinePatch, Money, PaymentMode, Settings};
use pharma_db::{Database, DbConfig};
use pharma_sync::{DataStore, OutboxSettings, RemoteSettings, SyncConfig, SyncError};

// =============================================================================
// Fake endpoint
// =============================================================================

#[derive(Default)]
struct Sheet {
    medicines: Vec<Value>,
    bills: Vec<Value>,
    settings: Value,
    posts: Vec<Value>,
    reject_writes: bool,
    next_row: u32,
}

type Shared = Arc<Mutex<Sheet>>;

async fn read(State(sheet): State<Shared>, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let sheet = sheet.lock().unwrap();
    let data = match params.get("action").map(String::as_str) {
        Some("getMedicines") => json!(sheet.medicines),
        Some("getBills") => json!(sheet.bills),
        Some("getSettings") => sheet.settings.clone(),
        other => return Json(json!({ "ok": false, "error": format!("unknown action {:?}", other) })),
    };
    Json(json!({ "ok": true, "data": data }))
}

async fn write(State(sheet): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut sheet = sheet.lock().unwrap();
    sheet.posts.push(body.clone());
    if sheet.reject_writes {
        return Json(json!({ "ok": false, "error": "Sheet locked" }));
    }

    match body["action"].as_str() {
        Some("addMedicine") => {
            sheet.next_row += 1;
            let id = format!("row-{}", sheet.next_row);
            let mut data = body["data"].clone();
            data["id"] = json!(id);
            sheet.medicines.push(data);
            Json(json!({ "ok": true, "id": id }))
        }
        Some("updateMedicine") => {
            let id = body["id"].clone();
            if let Some(row) = sheet.medicines.iter_mut().find(|m| m["id"] == id) {
                *row = body["data"].clone();
            }
            Json(json!({ "ok": true }))
        }
        Some("deleteMedicine") => {
            let id = body["id"].clone();
            sheet.medicines.retain(|m| m["id"] != id);
            Json(json!({ "ok": true }))
        }
        Some("saveBill") => {
            sheet.bills.push(body["data"].clone());
            Json(json!({ "ok": true }))
        }
        Some("saveSettings") => {
            sheet.settings = body["data"].clone();
            Json(json!({ "ok": true }))
        }
        _ => Json(json!({ "ok": false, "error": "unknown action" })),
    }
}

struct FakeEndpoint {
    url: String,
    sheet: Shared,
    handle: tokio::task::JoinHandle<()>,
}

impl FakeEndpoint {
    async fn spawn() -> Self {
        let sheet: Shared = Arc::new(Mutex::new(Sheet {
            settings: json!({}),
            ..Default::default()
        }));
        let app = Router::new()
            .route("/exec", get(read).post(write))
            .with_state(sheet.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{}/exec", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { url, sheet, handle }
    }

    fn posts(&self) -> Vec<Value> {
        self.sheet.lock().unwrap().posts.clone()
    }

    fn actions(&self) -> Vec<String> {
        self.posts()
            .iter()
            .map(|p| p["action"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn reject_writes(&self, reject: bool) {
        self.sheet.lock().unwrap().reject_writes = reject;
    }
}

impl Drop for FakeEndpoint {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn local_config(max_attempts: i64) -> SyncConfig {
    SyncConfig {
        remote: RemoteSettings {
            endpoint_prefix: "http://127.0.0.1".to_string(),
            ..Default::default()
        },
        outbox: OutboxSettings {
            max_attempts,
            ..Default::default()
        },
    }
}

async fn store_for(url: &str, max_attempts: i64) -> DataStore {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let store = DataStore::new(db, local_config(max_attempts)).unwrap();
    store.set_endpoint(url).await.unwrap();
    store
}

fn draft(name: &str, stock: i64) -> MedicineDraft {
    MedicineDraft {
        name: name.to_string(),
        generic: "Paracetamol".to_string(),
        stock,
        mrp_cents: 1250,
        tax_rate_bps: 1200,
        ..Default::default()
    }
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn added_medicine_adopts_endpoint_id() {
    let remote = FakeEndpoint::spawn().await;
    let store = store_for(&remote.url, 5).await;

    let added = store.add_medicine(draft("Dolo 650", 40)).await.unwrap();
    assert_eq!(added.id, "row-1");
    assert!(store.medicine_by_id("row-1").await.is_some());
    assert_eq!(store.medicines_cached().await.len(), 1);

    let posts = remote.posts();
    assert_eq!(posts[0]["action"], "addMedicine");
    assert_eq!(posts[0]["data"]["mrp"], "12.50");
    assert_eq!(posts[0]["data"]["gst"], 12);
}

#[tokio::test]
async fn bill_posts_bill_then_each_changed_medicine() {
    let remote = FakeEndpoint::spawn().await;
    let store = store_for(&remote.url, 5).await;
    let a = store.add_medicine(draft("Dolo 650", 40)).await.unwrap();
    let b = store.add_medicine(draft("Calpol 500", 10)).await.unwrap();

    let bill = store
        .create_bill(BillDraft {
            items: vec![bill_item(&a, 2), bill_item(&b, 1)],
            payment_mode: PaymentMode::Upi,
            discount: Money::zero(),
            patient_name: "Ravi".to_string(),
            doctor_name: String::new(),
        })
        .await
        .unwrap();
    assert_eq!(bill.bill_no, "BILL-0001");

    assert_eq!(
        remote.actions(),
        vec!["addMedicine", "addMedicine", "saveBill", "updateMedicine", "updateMedicine"]
    );
    let posts = remote.posts();
    assert_eq!(posts[2]["data"]["billNo"], "BILL-0001");
    assert_eq!(posts[2]["data"]["paymentMode"], "UPI");
    assert_eq!(posts[2]["data"]["items"][0]["qty"], 2);
    assert_eq!(posts[3]["id"], "row-1");
    assert_eq!(posts[3]["data"]["stock"], 38);
    assert_eq!(posts[4]["data"]["stock"], 9);
}

#[tokio::test]
async fn delete_and_settings_are_mirrored() {
    let remote = FakeEndpoint::spawn().await;
    let store = store_for(&remote.url, 5).await;
    let added = store.add_medicine(draft("Dolo 650", 40)).await.unwrap();

    assert!(store.delete_medicine(&added.id).await.unwrap());
    store
        .save_settings(Settings {
            shop_name: "Lakshmi Medicals".to_string(),
            ..Settings::default()
        })
        .await
        .unwrap();

    let posts = remote.posts();
    assert_eq!(posts[1], json!({ "action": "deleteMedicine", "id": "row-1" }));
    assert_eq!(posts[2]["data"]["shopName"], "Lakshmi Medicals");
    assert_eq!(posts[2]["data"]["lowStockThreshold"], 10);
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn refresh_decodes_loose_records_and_replaces_cache() {
    let remote = FakeEndpoint::spawn().await;
    {
        let mut sheet = remote.sheet.lock().unwrap();
        sheet.medicines = vec![
            json!({ "id": "r1", "name": "Azithral 500", "stock": "6", "mrp": "119.5", "gst": "12", "expiry": "2027-03" }),
            json!({ "id": "r2", "name": "Broken", "stock": "many" }),
            json!({ "name": "No id" }),
        ];
        sheet.bills = vec![json!({
            "id": "b1", "billNo": "BILL-0001", "items": "[]", "grandTotal": "50",
            "createdAt": Utc::now().to_rfc3339()
        })];
    }
    let store = store_for(&remote.url, 5).await;
    store.seed_if_empty().await.unwrap();

    let medicines = store.medicines().await.unwrap();
    assert_eq!(medicines.len(), 1);
    assert_eq!(medicines[0].stock, 6);
    assert_eq!(medicines[0].mrp_cents, 11950);
    assert_eq!(store.medicines_cached().await, medicines);

    let bills = store.bills().await.unwrap();
    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0].grand_total_cents, 5000);
    assert!(bills[0].items.is_empty());
}

#[tokio::test]
async fn repeated_refresh_leaves_cache_unchanged() {
    let remote = FakeEndpoint::spawn().await;
    {
        let mut sheet = remote.sheet.lock().unwrap();
        sheet.medicines = vec![
            json!({ "id": "r1", "name": "Azithral 500", "stock": 6, "mrp": "119.5" }),
            json!({ "id": "r2", "name": "Pan 40", "stock": "12", "mrp": 55, "updatedAt": "2026-10-01T10:00:00Z" }),
        ];
        sheet.bills = vec![json!({
            "id": "b1", "billNo": "BILL-0001",
            "items": [{ "medicineId": "r1", "name": "Azithral 500", "qty": 2, "mrp": "119.5" }],
            "grandTotal": "239", "createdAt": "2026-10-15T08:30:00Z"
        })];
    }
    let store = store_for(&remote.url, 5).await;

    store.medicines().await.unwrap();
    store.bills().await.unwrap();
    let medicines = store.medicines_cached().await;
    let bills = store.bills_cached().await;
    assert_eq!(medicines.len(), 2);
    assert_eq!(bills[0].items[0].line_total_cents, 23900);

    store.medicines().await.unwrap();
    store.bills().await.unwrap();
    assert_eq!(store.medicines_cached().await, medicines);
    assert_eq!(store.bills_cached().await, bills);
}

#[tokio::test]
async fn refresh_settings_merges_remote_keys() {
    let remote = FakeEndpoint::spawn().await;
    remote.sheet.lock().unwrap().settings =
        json!({ "shopName": "Sai Pharma", "lowStockThreshold": "25" });
    let store = store_for(&remote.url, 5).await;

    let settings = store.refresh_settings().await.unwrap();
    assert_eq!(settings.shop_name, "Sai Pharma");
    assert_eq!(settings.low_stock_threshold, 25);
    assert_eq!(settings.currency, "₹");
    assert_eq!(store.settings().await, settings);
}

#[tokio::test]
async fn empty_remote_settings_leave_local_alone() {
    let remote = FakeEndpoint::spawn().await;
    let store = store_for(&remote.url, 5).await;
    assert_eq!(store.refresh_settings().await.unwrap(), Settings::default());
}

#[tokio::test]
async fn test_connection_counts_remote_medicines() {
    let remote = FakeEndpoint::spawn().await;
    remote.sheet.lock().unwrap().medicines = vec![json!({ "id": "a" }), json!({ "id": "b" })];
    let store = store_for(&remote.url, 5).await;
    assert_eq!(store.test_connection().await.unwrap(), 2);
}

// =============================================================================
// Outbox
// =============================================================================

#[tokio::test]
async fn failed_writes_are_queued_and_replayed_in_order() {
    let remote = FakeEndpoint::spawn().await;
    let store = store_for(&remote.url, 5).await;

    remote.reject_writes(true);
    let added = store.add_medicine(draft("Dolo 650", 40)).await.unwrap();
    store
        .update_medicine(&added.id, MedicinePatch::stock(55))
        .await
        .unwrap();
    assert_eq!(store.outbox_status().await.unwrap().pending, 2);

    remote.reject_writes(false);
    let report = store.flush_outbox().await.unwrap();
    assert_eq!(report.delivered, 2);
    assert_eq!(report.remaining, 0);

    // The queued update follows the id the endpoint assigned on replay
    let medicine = store.medicines_cached().await.remove(0);
    assert_eq!(medicine.id, "row-1");
    let posts = remote.posts();
    let last = posts.last().unwrap();
    assert_eq!(last["action"], "updateMedicine");
    assert_eq!(last["id"], "row-1");
    assert_eq!(last["data"]["stock"], 55);
}

#[tokio::test]
async fn adopted_id_reaches_cached_bills() {
    let remote = FakeEndpoint::spawn().await;
    let store = store_for(&remote.url, 5).await;

    remote.reject_writes(true);
    let added = store.add_medicine(draft("Dolo 650", 40)).await.unwrap();
    let local_id = added.id.clone();
    store
        .create_bill(BillDraft {
            items: vec![bill_item(&added, 2)],
            payment_mode: PaymentMode::Cash,
            discount: Money::zero(),
            patient_name: String::new(),
            doctor_name: String::new(),
        })
        .await
        .unwrap();

    remote.reject_writes(false);
    store.flush_outbox().await.unwrap();

    let bills = store.bills_cached().await;
    assert_eq!(bills[0].items[0].medicine_id, "row-1");
    assert!(store.medicine_by_id(&local_id).await.is_none());

    // The replayed bill carried the same id
    let posts = remote.posts();
    let saved = posts.iter().rev().find(|p| p["action"] == "saveBill").unwrap();
    assert_eq!(saved["data"]["items"][0]["medicineId"], "row-1");
}

#[tokio::test]
async fn flush_stops_at_first_failure_and_gives_up_eventually() {
    let remote = FakeEndpoint::spawn().await;
    let store = store_for(&remote.url, 2).await;

    remote.reject_writes(true);
    store.add_medicine(draft("Dolo 650", 40)).await.unwrap();
    store.add_medicine(draft("Calpol 500", 10)).await.unwrap();
    let posts_before = remote.posts().len();

    let first = store.flush_outbox().await.unwrap();
    assert_eq!(first.delivered, 0);
    assert_eq!(first.given_up, 0);
    assert_eq!(remote.posts().len(), posts_before + 1);

    let second = store.flush_outbox().await.unwrap();
    assert_eq!(second.given_up, 1);

    let counts = store.outbox_status().await.unwrap();
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.pending, 1);

    assert_eq!(store.retry_failed_writes().await.unwrap(), 1);
    assert_eq!(store.outbox_status().await.unwrap().pending, 2);
}

// =============================================================================
// Explicit sync actions
// =============================================================================

#[tokio::test]
async fn push_all_sends_everything_in_order() {
    let remote = FakeEndpoint::spawn().await;
    let store = store_for(&remote.url, 5).await;
    store.seed_if_empty().await.unwrap();

    let report = store.push_all().await;
    assert!(report.ok, "{:?}", report.error);
    assert_eq!((report.medicines, report.bills), (10, 4));

    let actions = remote.actions();
    assert_eq!(actions.len(), 15);
    assert!(actions[..10].iter().all(|a| a == "addMedicine"));
    assert!(actions[10..14].iter().all(|a| a == "saveBill"));
    assert_eq!(actions[14], "saveSettings");
}

#[tokio::test]
async fn push_all_stops_at_first_rejection() {
    let remote = FakeEndpoint::spawn().await;
    let store = store_for(&remote.url, 5).await;
    store.seed_if_empty().await.unwrap();
    remote.reject_writes(true);

    let report = store.push_all().await;
    assert!(!report.ok);
    assert_eq!((report.medicines, report.bills), (0, 0));
    assert!(report.error.unwrap().contains("Sheet locked"));
    assert_eq!(remote.posts().len(), 1);
}

#[tokio::test]
async fn resync_flushes_then_pulls() {
    let remote = FakeEndpoint::spawn().await;
    let store = store_for(&remote.url, 5).await;

    remote.reject_writes(true);
    store.add_medicine(draft("Dolo 650", 40)).await.unwrap();
    remote.reject_writes(false);

    let report = store.resync().await.unwrap();
    assert!(report.configured);
    assert_eq!(report.flushed, 1);
    assert_eq!(report.medicines, Some(1));
    assert_eq!(report.bills, Some(0));
    assert!(!report.settings);

    assert_eq!(store.medicines_cached().await[0].id, "row-1");
}

// =============================================================================
// Unreachable endpoint
// =============================================================================

#[tokio::test]
async fn unreachable_endpoint_degrades_to_cache() {
    // Bind and release a port so nothing is listening on it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/exec", listener.local_addr().unwrap());
    drop(listener);

    let store = store_for(&url, 5).await;
    store.seed_if_empty().await.unwrap();

    assert_eq!(store.medicines().await.unwrap().len(), 10);
    assert_eq!(store.bills().await.unwrap().len(), 4);

    let medicine = store.medicines_cached().await.remove(0);
    let bill = store
        .create_bill(BillDraft {
            items: vec![bill_item(&medicine, 1)],
            payment_mode: PaymentMode::Cash,
            discount: Money::zero(),
            patient_name: String::new(),
            doctor_name: String::new(),
        })
        .await
        .unwrap();
    assert_eq!(bill.bill_no, "BILL-0005");

    // saveBill plus one updateMedicine
    assert_eq!(store.outbox_status().await.unwrap().pending, 2);

    let err = store.test_connection().await.unwrap_err();
    assert!(err.is_retryable(), "{:?}", err);
    assert!(matches!(err, SyncError::RequestFailed(_)));
}

//! # Data Store
//!
//! The one place feature code reads and writes shop data.
//!
//! ## Write Path
//! ```text
//! ┌──────────────┐  1. mutate    ┌──────────────┐
//! │  DataStore   │ ────────────► │ CacheStore   │  (result returned from here)
//! │              │               └──────────────┘
//! │              │  2. post      ┌──────────────┐
//! │              │ ────────────► │ RemoteClient │  only when configured
//! │              │               └──────┬───────┘
//! │              │  3. on failure       │
//! │              │ ◄────────────────────┘
//! │              │     enqueue   ┌──────────────┐
//! │              │ ────────────► │ sync_outbox  │  replayed by flush_outbox()
//! └──────────────┘               └──────────────┘
//! ```
//!
//! Local writes are never rolled back. A remote `addMedicine` that answers
//! with a different id makes the local record adopt it.
//!
//! ## Read Path
//! `*_cached` reads come straight from the cache. The refreshing forms ask
//! the endpoint first and overwrite the cache with what it returns; if the
//! endpoint is unconfigured or fails they quietly return the cache.
//!
//! Cache read-modify-write sequences are serialized by an internal lock so
//! a background resync cannot interleave with a sale. The lock is never held
//! across a network call.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use pharma_core::billing::{deduct_stock, next_bill_number, BillDraft};
use pharma_core::seed::{demo_bills, demo_medicines};
use pharma_core::validation::{validate_medicine_draft, validate_medicine_name, validate_price};
use pharma_core::{catalog, reports};
use pharma_core::{Bill, Medicine, MedicineDraft, MedicinePatch, Money, Settings};
use pharma_db::{keys, CacheStore, Database, OutboxCounts, OutboxRepository, OutboxStatus};

use crate::backup::{Backup, ImportReport};
use crate::client::RemoteClient;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::protocol::{ReadAction, WriteRequest, WriteResponse};
use crate::wire::{self, WireSettings};

// =============================================================================
// Reports
// =============================================================================

/// Outcome of pushing every local record to the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub ok: bool,
    pub medicines: usize,
    pub bills: usize,
    pub error: Option<String>,
}

/// Outcome of a full refresh from the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResyncReport {
    /// False when there was no endpoint; nothing else was attempted.
    pub configured: bool,
    /// Queued writes delivered before pulling.
    pub flushed: usize,
    /// Whether remote settings were merged in.
    pub settings: bool,
    /// Records pulled, `None` where the endpoint did not answer.
    pub medicines: Option<usize>,
    pub bills: Option<usize>,
}

/// Outcome of replaying the outbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    /// Entries parked as `failed` during this flush.
    pub given_up: usize,
    /// Entries still pending afterwards.
    pub remaining: i64,
}

// =============================================================================
// Data Store
// =============================================================================

#[derive(Debug)]
pub struct DataStore {
    db: Database,
    cache: CacheStore,
    outbox: OutboxRepository,
    client: RemoteClient,
    config: SyncConfig,
    write_lock: Mutex<()>,
}

impl DataStore {
    pub fn new(db: Database, config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        let client = RemoteClient::new(config.remote.clone())?;
        Ok(DataStore {
            cache: db.cache(),
            outbox: db.outbox(),
            db,
            client,
            config,
            write_lock: Mutex::new(()),
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // =========================================================================
    // Endpoint
    // =========================================================================

    /// Stored endpoint URL; empty when none is set.
    pub async fn endpoint(&self) -> String {
        self.cache.endpoint().await
    }

    pub async fn is_configured(&self) -> bool {
        self.client.is_configured(&self.endpoint().await)
    }

    /// Saves the endpoint URL. An empty string clears it.
    pub async fn set_endpoint(&self, endpoint: &str) -> SyncResult<()> {
        let endpoint = endpoint.trim();
        if !endpoint.is_empty() {
            if !self.client.is_configured(endpoint) {
                return Err(SyncError::EndpointRejected {
                    prefix: self.client.settings().endpoint_prefix.clone(),
                });
            }
            url::Url::parse(endpoint)?;
        }

        self.cache.set_endpoint(endpoint).await?;
        info!(configured = !endpoint.is_empty(), "Endpoint updated");
        Ok(())
    }

    // =========================================================================
    // Medicines
    // =========================================================================

    pub async fn medicines_cached(&self) -> Vec<Medicine> {
        self.cache.medicines().await
    }

    /// Medicines, refreshed from the endpoint when it answers.
    pub async fn medicines(&self) -> SyncResult<Vec<Medicine>> {
        match self.pull_medicines().await? {
            Some(remote) => Ok(remote),
            None => Ok(self.medicines_cached().await),
        }
    }

    async fn pull_medicines(&self) -> SyncResult<Option<Vec<Medicine>>> {
        let endpoint = self.endpoint().await;
        let Some(data) = self
            .client
            .fetch_collection(&endpoint, ReadAction::GetMedicines)
            .await
        else {
            return Ok(None);
        };
        let Some(remote) = wire::decode_medicines(data) else {
            return Ok(None);
        };

        let _guard = self.write_lock.lock().await;
        self.cache.set_medicines(&remote).await?;
        debug!(count = remote.len(), "Medicines refreshed from endpoint");
        Ok(Some(remote))
    }

    pub async fn medicine_by_id(&self, id: &str) -> Option<Medicine> {
        self.medicines_cached()
            .await
            .into_iter()
            .find(|m| m.id == id)
    }

    /// Case-insensitive search over name, generic and manufacturer.
    pub async fn search_medicines(&self, query: &str) -> Vec<Medicine> {
        let medicines = self.medicines_cached().await;
        catalog::search(&medicines, query)
            .into_iter()
            .cloned()
            .collect()
    }

    /// In-stock medicines sharing a generic name with `id`.
    pub async fn alternatives(&self, id: &str) -> Vec<Medicine> {
        let medicines = self.medicines_cached().await;
        catalog::alternatives(&medicines, id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn add_medicine(&self, draft: MedicineDraft) -> SyncResult<Medicine> {
        validate_medicine_draft(&draft)?;
        let medicine = draft.into_medicine(Uuid::new_v4().to_string(), Utc::now());

        {
            let _guard = self.write_lock.lock().await;
            let mut medicines = self.cache.medicines().await;
            medicines.push(medicine.clone());
            self.cache.set_medicines(&medicines).await?;
        }
        info!(id = %medicine.id, name = %medicine.name, "Medicine added");

        let response = self
            .send(WriteRequest::AddMedicine {
                data: (&medicine).into(),
            })
            .await;

        match response.and_then(|r| adopted_id(r, &medicine.id)) {
            Some(remote_id) => {
                self.adopt_medicine_id(&medicine.id, &remote_id).await?;
                Ok(Medicine {
                    id: remote_id,
                    ..medicine
                })
            }
            None => Ok(medicine),
        }
    }

    /// Applies a partial update. Stock is clamped at zero.
    pub async fn update_medicine(&self, id: &str, patch: MedicinePatch) -> SyncResult<Medicine> {
        if let Some(name) = &patch.name {
            validate_medicine_name(name)?;
        }
        if let Some(mrp) = patch.mrp_cents {
            validate_price("mrp", Money::from_cents(mrp))?;
        }
        if let Some(cost) = patch.cost_price_cents {
            validate_price("cost price", Money::from_cents(cost))?;
        }

        let updated = {
            let _guard = self.write_lock.lock().await;
            let mut medicines = self.cache.medicines().await;
            let medicine = medicines
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or_else(|| SyncError::NotFound {
                    entity: "Medicine",
                    id: id.to_string(),
                })?;
            patch.apply(medicine, Utc::now());
            let updated = medicine.clone();
            self.cache.set_medicines(&medicines).await?;
            updated
        };
        debug!(id, stock = updated.stock, "Medicine updated");

        self.send(WriteRequest::UpdateMedicine {
            id: updated.id.clone(),
            data: (&updated).into(),
        })
        .await;
        Ok(updated)
    }

    /// Removes a medicine. Returns whether it existed.
    pub async fn delete_medicine(&self, id: &str) -> SyncResult<bool> {
        let removed = {
            let _guard = self.write_lock.lock().await;
            let mut medicines = self.cache.medicines().await;
            let before = medicines.len();
            medicines.retain(|m| m.id != id);
            let removed = medicines.len() < before;
            if removed {
                self.cache.set_medicines(&medicines).await?;
            }
            removed
        };

        if removed {
            info!(id, "Medicine deleted");
            self.send(WriteRequest::DeleteMedicine { id: id.to_string() })
                .await;
        }
        Ok(removed)
    }

    async fn adopt_medicine_id(&self, local_id: &str, remote_id: &str) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut medicines = self.cache.medicines().await;
        if let Some(medicine) = medicines.iter_mut().find(|m| m.id == local_id) {
            medicine.id = remote_id.to_string();
            self.cache.set_medicines(&medicines).await?;
            debug!(local_id, remote_id, "Adopted endpoint id");
        }

        // Bills sold under the local id follow the rename
        let mut bills = self.cache.bills().await;
        let mut renamed = 0usize;
        for item in bills.iter_mut().flat_map(|b| b.items.iter_mut()) {
            if item.medicine_id == local_id {
                item.medicine_id = remote_id.to_string();
                renamed += 1;
            }
        }
        if renamed > 0 {
            self.cache.set_bills(&bills).await?;
            debug!(local_id, remote_id, renamed, "Renamed medicine in cached bills");
        }
        Ok(())
    }

    // =========================================================================
    // Bills
    // =========================================================================

    pub async fn bills_cached(&self) -> Vec<Bill> {
        self.cache.bills().await
    }

    /// Bills, refreshed from the endpoint when it answers.
    pub async fn bills(&self) -> SyncResult<Vec<Bill>> {
        match self.pull_bills().await? {
            Some(remote) => Ok(remote),
            None => Ok(self.bills_cached().await),
        }
    }

    async fn pull_bills(&self) -> SyncResult<Option<Vec<Bill>>> {
        let endpoint = self.endpoint().await;
        let Some(data) = self
            .client
            .fetch_collection(&endpoint, ReadAction::GetBills)
            .await
        else {
            return Ok(None);
        };
        let Some(remote) = wire::decode_bills(data) else {
            return Ok(None);
        };

        let _guard = self.write_lock.lock().await;
        self.cache.set_bills(&remote).await?;
        debug!(count = remote.len(), "Bills refreshed from endpoint");
        Ok(Some(remote))
    }

    pub async fn bill_by_id(&self, id: &str) -> Option<Bill> {
        self.bills_cached().await.into_iter().find(|b| b.id == id)
    }

    /// Bills created on a calendar day, in ledger order.
    pub async fn bills_on(&self, day: NaiveDate) -> Vec<Bill> {
        let bills = self.bills_cached().await;
        reports::bills_on(&bills, day).into_iter().cloned().collect()
    }

    /// Bills created between two days, both inclusive, in ledger order.
    pub async fn bills_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<Bill> {
        let bills = self.bills_cached().await;
        reports::bills_between(&bills, from, to)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Records a sale: numbers the bill, deducts stock, appends the bill,
    /// then tells the endpoint about the bill and each changed medicine.
    pub async fn create_bill(&self, draft: BillDraft) -> SyncResult<Bill> {
        draft.validate()?;
        let now = Utc::now();

        let (bill, changed) = {
            let _guard = self.write_lock.lock().await;
            let mut bills = self.cache.bills().await;
            let bill = draft.into_bill(
                Uuid::new_v4().to_string(),
                next_bill_number(bills.len()),
                now,
            )?;

            let mut medicines = self.cache.medicines().await;
            let touched = deduct_stock(&mut medicines, &bill.items, now);
            self.cache.set_medicines(&medicines).await?;

            bills.push(bill.clone());
            self.cache.set_bills(&bills).await?;

            let changed: Vec<Medicine> = touched
                .iter()
                .filter_map(|id| medicines.iter().find(|m| &m.id == id).cloned())
                .collect();
            (bill, changed)
        };
        info!(
            bill_no = %bill.bill_no,
            total = %bill.grand_total(),
            mode = %bill.payment_mode,
            "Bill recorded"
        );

        self.send(WriteRequest::SaveBill {
            data: (&bill).into(),
        })
        .await;
        for medicine in &changed {
            self.send(WriteRequest::UpdateMedicine {
                id: medicine.id.clone(),
                data: medicine.into(),
            })
            .await;
        }

        Ok(bill)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub async fn settings(&self) -> Settings {
        self.cache.settings().await
    }

    /// Settings with the endpoint's copy merged over the local one.
    pub async fn refresh_settings(&self) -> SyncResult<Settings> {
        match self.pull_settings().await? {
            Some(merged) => Ok(merged),
            None => Ok(self.settings().await),
        }
    }

    async fn pull_settings(&self) -> SyncResult<Option<Settings>> {
        let endpoint = self.endpoint().await;
        let Some(data) = self
            .client
            .fetch_collection(&endpoint, ReadAction::GetSettings)
            .await
        else {
            return Ok(None);
        };
        let Some(remote) = wire::decode_settings(data).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let _guard = self.write_lock.lock().await;
        let merged = remote.merge_into(self.cache.settings().await);
        self.cache.set_settings(&merged).await?;
        debug!("Settings merged from endpoint");
        Ok(Some(merged))
    }

    /// Stores settings as the form would: blank shop name and a bad
    /// threshold fall back to defaults. Returns what was stored.
    pub async fn save_settings(&self, settings: Settings) -> SyncResult<Settings> {
        let settings = settings.normalized();
        {
            let _guard = self.write_lock.lock().await;
            self.cache.set_settings(&settings).await?;
        }
        info!(shop = %settings.shop_name, "Settings saved");

        self.send(WriteRequest::SaveSettings {
            data: WireSettings::from(&settings),
        })
        .await;
        Ok(settings)
    }

    // =========================================================================
    // Remote write plumbing
    // =========================================================================

    /// Posts a write if the endpoint is configured. A failed post is queued.
    async fn send(&self, request: WriteRequest) -> Option<WriteResponse> {
        let endpoint = self.endpoint().await;
        if !self.client.is_configured(&endpoint) {
            return None;
        }

        let response = self.client.post_action(&endpoint, &request).await;
        if response.is_none() {
            debug!(action = request.action(), "Queued for retry");
            self.enqueue(&request).await;
        }
        response
    }

    async fn enqueue(&self, request: &WriteRequest) {
        let payload = match serde_json::to_string(request) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(action = request.action(), error = %e, "Could not serialize write for outbox");
                return;
            }
        };
        if let Err(e) = self
            .outbox
            .enqueue(request.action(), request.entity_id(), &payload)
            .await
        {
            warn!(action = request.action(), error = %e, "Could not queue remote write");
        }
    }

    /// Replays queued writes in order, stopping at the first failure.
    pub async fn flush_outbox(&self) -> SyncResult<FlushReport> {
        let endpoint = self.endpoint().await;
        if !self.client.is_configured(&endpoint) {
            return Err(SyncError::NotConfigured);
        }

        let max_attempts = self.config.outbox.max_attempts;
        let entries = self.outbox.pending(self.config.outbox.batch_size).await?;
        let mut report = FlushReport::default();
        let mut renamed: HashMap<String, String> = HashMap::new();

        for entry in entries {
            let mut request: WriteRequest = match serde_json::from_str(&entry.payload) {
                Ok(request) => request,
                Err(e) => {
                    warn!(id = %entry.id, error = %e, "Dropping unreadable outbox entry");
                    self.outbox.mark_failed(&entry.id, &e.to_string(), 1).await?;
                    report.given_up += 1;
                    continue;
                }
            };
            request.rename_medicine_ids(&renamed);

            match self.client.try_post(&endpoint, &request).await {
                Ok(response) => {
                    self.outbox.mark_synced(&entry.id).await?;
                    report.delivered += 1;

                    if let WriteRequest::AddMedicine { data } = &request {
                        if let Some(remote_id) = adopted_id(response, &data.id) {
                            self.adopt_medicine_id(&data.id, &remote_id).await?;
                            renamed.insert(data.id.clone(), remote_id);
                        }
                    }
                }
                Err(e) => {
                    let status = self
                        .outbox
                        .mark_failed(&entry.id, &e.to_string(), max_attempts)
                        .await?;
                    if status == OutboxStatus::Failed {
                        report.given_up += 1;
                    }
                    debug!(id = %entry.id, error = %e, "Outbox flush stopped");
                    break;
                }
            }
        }

        let pruned = self
            .outbox
            .cleanup_synced(self.config.outbox.keep_synced_days)
            .await?;
        if pruned > 0 {
            debug!(pruned, "Pruned delivered outbox entries");
        }

        report.remaining = self.outbox.counts().await?.pending;
        if report.delivered > 0 || report.given_up > 0 {
            info!(
                delivered = report.delivered,
                given_up = report.given_up,
                remaining = report.remaining,
                "Outbox flushed"
            );
        }
        Ok(report)
    }

    pub async fn outbox_status(&self) -> SyncResult<OutboxCounts> {
        Ok(self.outbox.counts().await?)
    }

    /// Puts given-up writes back in the queue. Returns how many.
    pub async fn retry_failed_writes(&self) -> SyncResult<u64> {
        Ok(self.outbox.retry_failed().await?)
    }

    // =========================================================================
    // Explicit sync actions
    // =========================================================================

    /// Sends every local record to the endpoint.
    pub async fn push_all(&self) -> PushReport {
        let endpoint = self.endpoint().await;
        let mut report = PushReport::default();
        if !self.client.is_configured(&endpoint) {
            report.error = Some(SyncError::NotConfigured.to_string());
            return report;
        }

        for medicine in self.medicines_cached().await {
            let request = WriteRequest::AddMedicine {
                data: (&medicine).into(),
            };
            if let Err(e) = self.client.try_post(&endpoint, &request).await {
                report.error = Some(e.to_string());
                return report;
            }
            report.medicines += 1;
        }

        for bill in self.bills_cached().await {
            let request = WriteRequest::SaveBill {
                data: (&bill).into(),
            };
            if let Err(e) = self.client.try_post(&endpoint, &request).await {
                report.error = Some(e.to_string());
                return report;
            }
            report.bills += 1;
        }

        let request = WriteRequest::SaveSettings {
            data: WireSettings::from(&self.settings().await),
        };
        if let Err(e) = self.client.try_post(&endpoint, &request).await {
            report.error = Some(e.to_string());
            return report;
        }

        report.ok = true;
        info!(
            medicines = report.medicines,
            bills = report.bills,
            "Pushed all data to endpoint"
        );
        report
    }

    /// Delivers queued writes, then pulls settings, medicines and bills.
    pub async fn resync(&self) -> SyncResult<ResyncReport> {
        if !self.is_configured().await {
            return Ok(ResyncReport::default());
        }

        let mut report = ResyncReport {
            configured: true,
            ..Default::default()
        };
        match self.flush_outbox().await {
            Ok(flush) => report.flushed = flush.delivered,
            Err(e) => warn!(error = %e, "Outbox flush failed before resync"),
        }

        report.settings = self.pull_settings().await?.is_some();
        report.medicines = self.pull_medicines().await?.map(|m| m.len());
        report.bills = self.pull_bills().await?.map(|b| b.len());

        info!(
            settings = report.settings,
            medicines = ?report.medicines,
            bills = ?report.bills,
            "Resync finished"
        );
        Ok(report)
    }

    /// Reads medicines from the endpoint without touching the cache and
    /// returns how many it holds.
    pub async fn test_connection(&self) -> SyncResult<usize> {
        let endpoint = self.endpoint().await;
        let data = self
            .client
            .try_fetch(&endpoint, ReadAction::GetMedicines)
            .await?;
        data.as_array()
            .map(Vec::len)
            .ok_or_else(|| SyncError::InvalidResponse("medicines is not a list".into()))
    }

    // =========================================================================
    // Backup, reset, seed
    // =========================================================================

    pub async fn export_backup(&self) -> Backup {
        Backup::full(
            self.medicines_cached().await,
            self.bills_cached().await,
            self.settings().await,
            Utc::now(),
        )
    }

    /// Replaces every collection present in the backup text.
    ///
    /// Invalid text is rejected before anything is written.
    pub async fn import_backup(&self, text: &str) -> SyncResult<ImportReport> {
        let backup = Backup::parse(text)?;
        let mut report = ImportReport::default();

        let _guard = self.write_lock.lock().await;
        if let Some(medicines) = &backup.medicines {
            self.cache.set_medicines(medicines).await?;
            report.medicines = Some(medicines.len());
        }
        if let Some(bills) = &backup.bills {
            self.cache.set_bills(bills).await?;
            report.bills = Some(bills.len());
        }
        if let Some(settings) = &backup.settings {
            self.cache.set_settings(settings).await?;
            report.settings = true;
        }

        info!(
            medicines = ?report.medicines,
            bills = ?report.bills,
            settings = report.settings,
            "Backup imported"
        );
        Ok(report)
    }

    /// Removes every stored key and every queued write.
    pub async fn clear_all(&self) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        for key in keys::ALL {
            self.cache.remove(key).await?;
        }
        let dropped = self.outbox.clear().await?;
        warn!(dropped_writes = dropped, "All local data cleared");
        Ok(())
    }

    /// Writes the demo catalog (and sample bills) when there are no
    /// medicines. Returns whether anything was written.
    pub async fn seed_if_empty(&self) -> SyncResult<bool> {
        let _guard = self.write_lock.lock().await;
        if !self.cache.medicines().await.is_empty() {
            return Ok(false);
        }

        let now = Utc::now();
        let medicines = demo_medicines(now);
        self.cache.set_medicines(&medicines).await?;
        if self.cache.bills().await.is_empty() {
            self.cache.set_bills(&demo_bills(&medicines, now)).await?;
        }
        info!(count = medicines.len(), "Seeded demo catalog");
        Ok(true)
    }
}

/// The id an `addMedicine` response wants the record to have, if different.
fn adopted_id(response: WriteResponse, local_id: &str) -> Option<String> {
    response
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && id != local_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharma_core::billing::bill_item;
    use pharma_core::{CoreError, PaymentMode};
    use pharma_db::DbConfig;

    async fn store() -> DataStore {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        DataStore::new(db, SyncConfig::default()).unwrap()
    }

    async fn seeded() -> DataStore {
        let store = store().await;
        assert!(store.seed_if_empty().await.unwrap());
        store
    }

    fn draft(name: &str, stock: i64) -> MedicineDraft {
        MedicineDraft {
            name: name.to_string(),
            generic: "Ibuprofen".to_string(),
            stock,
            mrp_cents: 3000,
            ..Default::default()
        }
    }

    fn sale(medicine: &Medicine, qty: i64) -> BillDraft {
        BillDraft {
            items: vec![bill_item(medicine, qty)],
            payment_mode: PaymentMode::Cash,
            discount: Money::zero(),
            patient_name: String::new(),
            doctor_name: String::new(),
        }
    }

    #[tokio::test]
    async fn test_seed_only_once() {
        let store = seeded().await;
        assert_eq!(store.medicines_cached().await.len(), 10);
        assert_eq!(store.bills_cached().await.len(), 4);
        assert!(!store.seed_if_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_unconfigured_reads_return_cache() {
        let store = seeded().await;
        assert!(!store.is_configured().await);
        assert_eq!(store.medicines().await.unwrap().len(), 10);
        assert_eq!(store.bills().await.unwrap().len(), 4);
        assert_eq!(store.refresh_settings().await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_add_update_delete_medicine() {
        let store = store().await;
        let added = store.add_medicine(draft("Ibuprofen 400mg", 20)).await.unwrap();
        assert_eq!(store.medicine_by_id(&added.id).await, Some(added.clone()));

        let updated = store
            .update_medicine(&added.id, MedicinePatch::stock(-5))
            .await
            .unwrap();
        assert_eq!(updated.stock, 0);
        assert!(updated.updated_at.is_some());

        assert!(store.delete_medicine(&added.id).await.unwrap());
        assert!(!store.delete_medicine(&added.id).await.unwrap());
        assert!(store.medicine_by_id(&added.id).await.is_none());
    }

    #[tokio::test]
    async fn test_medicine_validation() {
        let store = store().await;
        let err = store.add_medicine(draft("  ", 1)).await.unwrap_err();
        assert!(err.is_validation_error());
        assert!(store.medicines_cached().await.is_empty());

        let err = store
            .update_medicine("missing", MedicinePatch::stock(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_search_and_alternatives() {
        let store = store().await;
        let a = store.add_medicine(draft("Brufen 400", 0)).await.unwrap();
        let b = store.add_medicine(draft("Ibugesic 400", 12)).await.unwrap();

        assert!(store.search_medicines("").await.is_empty());
        assert_eq!(store.search_medicines("IBUPROFEN").await.len(), 2);

        let alternatives = store.alternatives(&a.id).await;
        assert_eq!(alternatives.len(), 1);
        assert_eq!(alternatives[0].id, b.id);
    }

    #[tokio::test]
    async fn test_create_bill_deducts_stock_and_numbers() {
        let store = seeded().await;
        let medicine = store.medicines_cached().await.remove(0);
        let before = medicine.stock;

        let bill = store.create_bill(sale(&medicine, 3)).await.unwrap();
        assert_eq!(bill.bill_no, "BILL-0005");
        assert_eq!(
            store.medicine_by_id(&medicine.id).await.unwrap().stock,
            before - 3
        );
        assert_eq!(store.bill_by_id(&bill.id).await, Some(bill.clone()));

        let today = Utc::now().date_naive();
        assert!(store.bills_on(today).await.iter().any(|b| b.id == bill.id));
        assert_eq!(store.bills_between(today, today).await.len(), 3);
    }

    #[tokio::test]
    async fn test_overselling_floors_stock_at_zero() {
        let store = store().await;
        let medicine = store.add_medicine(draft("Crocin", 2)).await.unwrap();
        store.create_bill(sale(&medicine, 5)).await.unwrap();
        assert_eq!(store.medicine_by_id(&medicine.id).await.unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_rejected_bills_change_nothing() {
        let store = seeded().await;
        let medicine = store.medicines_cached().await.remove(0);

        let empty = BillDraft {
            items: Vec::new(),
            ..sale(&medicine, 1)
        };
        assert!(matches!(
            store.create_bill(empty).await,
            Err(SyncError::Core(CoreError::EmptyCart))
        ));

        let too_generous = BillDraft {
            discount: Money::from_cents(1_000_000),
            ..sale(&medicine, 1)
        };
        assert!(store.create_bill(too_generous).await.is_err());

        assert_eq!(store.bills_cached().await.len(), 4);
        assert_eq!(
            store.medicine_by_id(&medicine.id).await.unwrap().stock,
            medicine.stock
        );
    }

    #[tokio::test]
    async fn test_save_settings_normalizes() {
        let store = store().await;
        let saved = store
            .save_settings(Settings {
                shop_name: "".into(),
                low_stock_threshold: 0,
                ..Settings::default()
            })
            .await
            .unwrap();
        assert_eq!(saved.shop_name, "MediCare Pharmacy");
        assert_eq!(saved.low_stock_threshold, 10);
        assert_eq!(store.settings().await, saved);
    }

    #[tokio::test]
    async fn test_endpoint_prefix_enforced() {
        let store = store().await;
        let err = store
            .set_endpoint("https://evil.example.com/exec")
            .await
            .unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(store.endpoint().await, "");

        store
            .set_endpoint(" https://script.google.com/macros/s/abc/exec ")
            .await
            .unwrap();
        assert!(store.is_configured().await);

        store.set_endpoint("").await.unwrap();
        assert!(!store.is_configured().await);
    }

    #[tokio::test]
    async fn test_explicit_sync_actions_need_an_endpoint() {
        let store = seeded().await;

        let report = store.push_all().await;
        assert!(!report.ok);
        assert_eq!(report.error.as_deref(), Some("Not configured"));

        assert!(matches!(
            store.test_connection().await,
            Err(SyncError::NotConfigured)
        ));
        assert!(matches!(
            store.flush_outbox().await,
            Err(SyncError::NotConfigured)
        ));
        assert_eq!(store.resync().await.unwrap(), ResyncReport::default());
    }

    #[tokio::test]
    async fn test_unconfigured_writes_are_not_queued() {
        let store = store().await;
        store.add_medicine(draft("Combiflam", 5)).await.unwrap();
        assert_eq!(store.outbox_status().await.unwrap(), OutboxCounts::default());
    }

    #[tokio::test]
    async fn test_backup_round_trip() {
        let source = seeded().await;
        let text = source.export_backup().await.to_json_pretty().unwrap();

        let target = store().await;
        let report = target.import_backup(&text).await.unwrap();
        assert_eq!(report.medicines, Some(10));
        assert_eq!(report.bills, Some(4));
        assert!(report.settings);
        assert_eq!(target.medicines_cached().await, source.medicines_cached().await);
        assert_eq!(target.bills_cached().await, source.bills_cached().await);
    }

    #[tokio::test]
    async fn test_import_leaves_missing_collections_alone() {
        let store = seeded().await;
        let report = store.import_backup(r#"{"bills": []}"#).await.unwrap();
        assert_eq!(report.medicines, None);
        assert_eq!(report.bills, Some(0));
        assert_eq!(store.medicines_cached().await.len(), 10);
        assert!(store.bills_cached().await.is_empty());

        assert!(matches!(
            store.import_backup("not json").await,
            Err(SyncError::InvalidBackup(_))
        ));
        assert_eq!(store.medicines_cached().await.len(), 10);
    }

    #[tokio::test]
    async fn test_clear_all_then_reseed() {
        let store = seeded().await;
        store
            .set_endpoint("https://script.google.com/macros/s/abc/exec")
            .await
            .unwrap();

        store.clear_all().await.unwrap();
        assert!(store.medicines_cached().await.is_empty());
        assert!(store.bills_cached().await.is_empty());
        assert_eq!(store.endpoint().await, "");

        assert!(store.seed_if_empty().await.unwrap());
        assert_eq!(store.medicines_cached().await.len(), 10);
    }

    #[test]
    fn test_adopted_id() {
        let response = |id: Option<&str>| WriteResponse {
            id: id.map(str::to_string),
        };
        assert_eq!(adopted_id(response(Some("row-3")), "local"), Some("row-3".into()));
        assert_eq!(adopted_id(response(Some("local")), "local"), None);
        assert_eq!(adopted_id(response(Some(" ")), "local"), None);
        assert_eq!(adopted_id(response(None), "local"), None);
    }
}

//! In-memory reference-data cache backing the synthetic customer endpoints.
//!
//! Loaded once at startup and injected through `AppState`. A failed load
//! degrades to a defined fallback instead of aborting the server; a sampling
//! request that finds the location list empty retries one reload.

use tokio::sync::RwLock;

use gridprep_core::{customer::ReferenceData, store::Warehouse};

pub struct ReferenceCache {
  inner: RwLock<ReferenceData>,
}

impl ReferenceCache {
  pub fn new(initial: ReferenceData) -> Self {
    Self { inner: RwLock::new(initial) }
  }

  /// Load reference data from the store, falling back on failure.
  pub async fn load_or_fallback<S: Warehouse>(store: &S) -> Self {
    match store.load_reference().await {
      Ok(data) => {
        tracing::info!(
          locations = data.locations.len(),
          kinds = data.customer_kinds.len(),
          "reference data loaded"
        );
        Self::new(data)
      }
      Err(e) => {
        tracing::error!(error = %e, "reference load failed; using fallback");
        Self::new(ReferenceData::fallback())
      }
    }
  }

  pub async fn current(&self) -> ReferenceData {
    self.inner.read().await.clone()
  }

  /// Re-load from the store. The previous data stays in place if the reload
  /// fails.
  pub async fn refresh<S: Warehouse>(&self, store: &S) -> Result<(), S::Error> {
    let data = store.load_reference().await?;
    *self.inner.write().await = data;
    Ok(())
  }

  /// Current data, reloading once if the location list is empty — covers
  /// the case where the dimension was populated after startup.
  pub async fn current_or_refresh<S: Warehouse>(
    &self,
    store: &S,
  ) -> ReferenceData {
    let data = self.current().await;
    if !data.locations.is_empty() {
      return data;
    }
    if let Err(e) = self.refresh(store).await {
      tracing::warn!(error = %e, "reference refresh failed");
    }
    self.current().await
  }
}

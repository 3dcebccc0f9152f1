use std::sync::Arc;

use crate::config::AppConfig;
use crate::inference::InferenceClient;
use crate::storage::LocalFileStorage;
use crate::store::ImageRecordStore;

/// Shared application context, built once at startup and handed to every
/// handler through `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: ImageRecordStore,
    pub storage: Arc<LocalFileStorage>,
    pub inference: Arc<InferenceClient>,
    pub config: Arc<AppConfig>,
}

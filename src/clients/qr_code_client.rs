use tracing::{debug, instrument};
use crate::domain::{QrCode, QrCodeCreate, QrCodePatch, QrCodeQuery};
use crate::qr_code_actor::QrCodeError;
use crate::actor_framework::ResourceClient;

/// Client for interacting with the QrCode actor.
#[derive(Clone)]
pub struct QrCodeClient {
    inner: ResourceClient<QrCode>,
}

impl_basic_client!(QrCodeClient, QrCode, QrCodeError, qr_code);

impl QrCodeClient {
    #[instrument(skip(self))]
    pub async fn list_qr_codes(&self, query: QrCodeQuery) -> Result<Vec<QrCode>, QrCodeError> {
        debug!("Sending request");
        let mut items = self.inner.list(query).await.map_err(QrCodeError::from)?;
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    #[instrument(skip(self))]
    pub async fn create_qr_code(&self, qr_code: QrCodeCreate) -> Result<String, QrCodeError> {
        debug!("Sending request");
        self.inner.create(qr_code).await.map_err(QrCodeError::from)
    }

    #[instrument(skip(self))]
    pub async fn set_active(&self, id: String, is_active: bool) -> Result<QrCode, QrCodeError> {
        debug!("Sending request");
        let patch = QrCodePatch { is_active: Some(is_active), ..Default::default() };
        self.inner.update(id, patch).await.map_err(QrCodeError::from)
    }
}

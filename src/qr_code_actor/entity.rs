use crate::actor_framework::{Entity, FrameworkError};
use crate::domain::{QrCode, QrCodeCreate, QrCodePatch, QrCodeQuery};

impl Entity for QrCode {
    type Id = String;
    type CreateParams = QrCodeCreate;
    type Patch = QrCodePatch;
    type Query = QrCodeQuery;
    type Action = ();
    type ActionResult = ();

    fn id(&self) -> &String { &self.id }

    fn from_create_params(id: String, params: QrCodeCreate) -> Result<Self, FrameworkError> {
        if params.table_number.trim().is_empty() {
            return Err(FrameworkError::Rejected("Table number is required".to_string()));
        }
        Ok(Self {
            id,
            restaurant_id: params.restaurant_id,
            table_number: params.table_number,
            is_active: true,
        })
    }

    fn matches(&self, query: &QrCodeQuery) -> bool {
        query.restaurant_id.as_ref().map_or(true, |id| *id == self.restaurant_id)
    }

    fn on_update(&mut self, patch: QrCodePatch) -> Result<(), FrameworkError> {
        if let Some(table_number) = patch.table_number {
            if table_number.trim().is_empty() {
                return Err(FrameworkError::Rejected("Table number is required".to_string()));
            }
            self.table_number = table_number;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        Ok(())
    }

    fn handle_action(&mut self, _action: ()) -> Result<(), FrameworkError> {
        Ok(())
    }
}

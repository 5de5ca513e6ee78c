pub mod docfaq_api;

use anyhow::Result;

use crate::domain::models::BackendBox;

pub struct BackendManager {}

impl BackendManager {
    pub fn get() -> Result<BackendBox> {
        return Ok(Box::<docfaq_api::DocFaqApi>::default());
    }
}

//! Cloud action status traits

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::FetchError;
use crate::types::{ActionId, RemoteAction};

/// Read-only access to the status of cloud actions
#[async_trait]
pub trait ActionSource: Send + Sync {
    /// Fetch the current snapshot of an action
    async fn get_action(&self, id: ActionId) -> Result<RemoteAction, FetchError>;
}

#[async_trait]
impl<T: ActionSource + ?Sized> ActionSource for Arc<T> {
    async fn get_action(&self, id: ActionId) -> Result<RemoteAction, FetchError> {
        (**self).get_action(id).await
    }
}

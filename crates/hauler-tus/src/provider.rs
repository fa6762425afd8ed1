//! `IUploadServer` port implementation for [`TusClient`]
//!
//! Thin adapter delegating each port operation to the corresponding wire
//! function in [`protocol`](crate::protocol).

use tokio_util::sync::CancellationToken;

use hauler_core::domain::newtypes::UploadHandle;
use hauler_core::domain::record::UploadRecord;
use hauler_core::ports::upload_server::{IUploadServer, ProtocolError, RemoteTransferConfig};

use crate::client::TusClient;
use crate::protocol;

#[async_trait::async_trait]
impl IUploadServer for TusClient {
    async fn create_upload(
        &self,
        record: &UploadRecord,
        cancel: &CancellationToken,
    ) -> Result<UploadHandle, ProtocolError> {
        protocol::create_upload(self, record, cancel).await
    }

    async fn query_offset(
        &self,
        handle: &UploadHandle,
        cancel: &CancellationToken,
    ) -> Result<u64, ProtocolError> {
        protocol::query_offset(self, handle, cancel).await
    }

    async fn append_chunk(
        &self,
        handle: &UploadHandle,
        offset: u64,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> Result<u64, ProtocolError> {
        protocol::append_chunk(self, handle, offset, data, cancel).await
    }

    async fn delete_upload(
        &self,
        handle: &UploadHandle,
        cancel: &CancellationToken,
    ) -> Result<(), ProtocolError> {
        protocol::delete_upload(self, handle, cancel).await
    }

    async fn fetch_config(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<RemoteTransferConfig>, ProtocolError> {
        protocol::fetch_config(self, cancel).await
    }
}

//! gRPC client for the keyservice `kms.API/GetDataKey` method.

use std::time::Duration;

use async_trait::async_trait;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};

use super::KekError;

/// Timeout for establishing the keyservice connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fully-qualified gRPC path of the data-key method.
const GET_DATA_KEY_PATH: &str = "/kms.API/GetDataKey";

/// Request message of `kms.API/GetDataKey`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetDataKeyRequest {
    #[prost(string, tag = "1")]
    pub data_key_id: ::prost::alloc::string::String,
    #[prost(uint32, tag = "2")]
    pub length: u32,
}

/// Response message of `kms.API/GetDataKey`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetDataKeyResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub data_key: ::prost::alloc::vec::Vec<u8>,
}

/// Source of named data keys.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyService: Send + Sync {
    /// Fetch the key registered under `id`, `length` bytes long.
    async fn get_data_key(&self, id: &str, length: u32) -> Result<Vec<u8>, KekError>;
}

/// [`KeyService`] backed by a tonic channel to the keyservice.
#[derive(Clone, Debug)]
pub struct GrpcKeyService {
    inner: tonic::client::Grpc<Channel>,
}

impl GrpcKeyService {
    /// Connect to the keyservice at `endpoint` (e.g. `http://key-service.kube-system:9000`).
    ///
    /// # Errors
    ///
    /// Returns [`KekError::Connect`] if the endpoint is malformed or unreachable.
    pub async fn connect(endpoint: &str) -> Result<Self, KekError> {
        let channel = Endpoint::from_shared(endpoint.to_owned())
            .map_err(|e| KekError::Connect(format!("invalid endpoint {endpoint}: {e}")))?
            .connect_timeout(CONNECT_TIMEOUT)
            .connect()
            .await
            .map_err(|e| KekError::Connect(format!("connecting to {endpoint}: {e}")))?;

        Ok(Self {
            inner: tonic::client::Grpc::new(channel),
        })
    }
}

#[async_trait]
impl KeyService for GrpcKeyService {
    async fn get_data_key(&self, id: &str, length: u32) -> Result<Vec<u8>, KekError> {
        let mut grpc = self.inner.clone();
        grpc.ready()
            .await
            .map_err(|e| KekError::Connect(format!("keyservice not ready: {e}")))?;

        let request = tonic::Request::new(GetDataKeyRequest {
            data_key_id: id.to_owned(),
            length,
        });
        let codec = tonic::codec::ProstCodec::<GetDataKeyRequest, GetDataKeyResponse>::default();
        let response = grpc
            .unary(request, PathAndQuery::from_static(GET_DATA_KEY_PATH), codec)
            .await?;

        Ok(response.into_inner().data_key)
    }
}

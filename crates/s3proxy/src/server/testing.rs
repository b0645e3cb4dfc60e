//! In-memory [`ObjectStore`] and state builders for handler tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::aws::{
    GetObjectInput, GetObjectOutput, ObjectHeaders, ObjectStore, PutObjectInput, PutObjectOutput,
    S3Error,
};
use crate::crypto::KEY_LEN;
use crate::kek::Kek;

use super::{forward::Forwarder, state::AppState};

pub const TEST_KEK: [u8; KEY_LEN] = [7u8; KEY_LEN];

/// Object as S3 would hold it.
#[derive(Debug, Clone, Default)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub metadata: HashMap<String, String>,
    pub content_type: Option<String>,
    /// Response fields S3 reports on GetObject.
    pub headers: ObjectHeaders,
}

/// Object store that keeps everything in a map and records every call.
#[derive(Default)]
pub struct FakeStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    gets: Mutex<Vec<GetObjectInput>>,
    puts: Mutex<Vec<PutObjectInput>>,
    failure: Mutex<Option<(Option<u16>, String)>>,
}

impl FakeStore {
    pub fn insert(&self, bucket: &str, key: &str, object: StoredObject) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_owned(), key.to_owned()), object);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_owned(), key.to_owned()))
            .cloned()
    }

    /// Make every following call fail with `status` and `message`.
    pub fn fail_with(&self, status: Option<u16>, message: &str) {
        *self.failure.lock().unwrap() = Some((status, message.to_owned()));
    }

    pub fn gets(&self) -> Vec<GetObjectInput> {
        self.gets.lock().unwrap().clone()
    }

    pub fn puts(&self) -> Vec<PutObjectInput> {
        self.puts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.gets.lock().unwrap().len() + self.puts.lock().unwrap().len()
    }

    fn failure(&self) -> Option<S3Error> {
        self.failure
            .lock()
            .unwrap()
            .clone()
            .map(|(status, message)| S3Error { status, message })
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get_object(&self, input: GetObjectInput) -> Result<GetObjectOutput, S3Error> {
        self.gets.lock().unwrap().push(input.clone());
        if let Some(err) = self.failure() {
            return Err(err);
        }
        let object = self.object(&input.bucket, &input.key).ok_or_else(|| S3Error {
            status: Some(404),
            message: "api error NoSuchKey: The specified key does not exist.".into(),
        })?;
        Ok(GetObjectOutput {
            headers: object.headers,
            content_type: object.content_type,
            metadata: object.metadata,
            body: Bytes::from(object.body),
        })
    }

    async fn put_object(&self, input: PutObjectInput) -> Result<PutObjectOutput, S3Error> {
        self.puts.lock().unwrap().push(input.clone());
        if let Some(err) = self.failure() {
            return Err(err);
        }
        self.insert(
            &input.bucket,
            &input.key,
            StoredObject {
                body: input.body,
                metadata: input.metadata,
                content_type: Some(input.content_type),
                headers: ObjectHeaders {
                    etag: Some("\"etag-get\"".into()),
                    ..Default::default()
                },
            },
        );
        Ok(PutObjectOutput {
            headers: ObjectHeaders {
                etag: Some("\"etag-put\"".into()),
                ..Default::default()
            },
            version_id: None,
            server_side_encryption: "AES256".into(),
        })
    }
}

/// State wired to `store`, the fixed test KEK, and a plain-HTTP forwarder.
pub fn state_with(store: Arc<FakeStore>, allow_multipart: bool) -> AppState {
    AppState::new(
        Kek::from_slice(&TEST_KEK).unwrap(),
        store,
        Forwarder::with_scheme("http").unwrap(),
        allow_multipart,
    )
}

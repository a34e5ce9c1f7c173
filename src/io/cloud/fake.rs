//! Fake implementations for testing.
//!
//! These implementations use in-memory data structures to simulate the storage and queue
//! services, making them ideal for unit testing without external dependencies.

use crate::io::cloud::traits::{
    CloudIOError, CloudResult, ErrorKind, ObjectIO, ObjectMetadata, QueueIO, QueueMessage,
};
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_encoding: Option<String>,
}

// Type aliases for complex nested types
type BucketStorage = Arc<Mutex<HashMap<String, HashMap<String, StoredObject>>>>;
type QueueStorage = Arc<Mutex<HashMap<String, Vec<QueueMessage>>>>;

// ============================================================================
// FakeObjectIO
// ============================================================================

#[derive(Clone)]
pub struct FakeObjectIO {
    storage: BucketStorage,
}

impl FakeObjectIO {
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of objects currently stored in `bucket`.
    ///
    /// # Panics
    ///
    /// Panics if the storage mutex is poisoned.
    #[must_use]
    pub fn object_count(&self, bucket: &str) -> usize {
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .get(bucket)
            .map_or(0, HashMap::len)
    }

    fn store(&self, bucket: &str, key: &str, object: StoredObject) {
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);
    }

    fn not_found(bucket: &str, key: &str) -> CloudIOError {
        CloudIOError::new(
            ErrorKind::NotFound,
            format!("Object {bucket}/{key} not found"),
        )
    }
}

impl Default for FakeObjectIO {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectIO for FakeObjectIO {
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()> {
        self.store(
            bucket,
            key,
            StoredObject {
                data: data.to_vec(),
                content_encoding: None,
            },
        );
        Ok(())
    }

    fn put_object_stream(
        &self,
        bucket: &str,
        key: &str,
        body: &mut dyn Read,
        content_encoding: Option<&str>,
    ) -> CloudResult<()> {
        let mut data = Vec::new();
        body.read_to_end(&mut data).map_err(|e| {
            CloudIOError::new(ErrorKind::Network, format!("upload of {bucket}/{key} aborted"))
                .with_source(e.to_string())
        })?;
        self.store(
            bucket,
            key,
            StoredObject {
                data,
                content_encoding: content_encoding.map(str::to_string),
            },
        );
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        storage
            .get(bucket)
            .and_then(|b| b.get(key))
            .map(|o| o.data.clone())
            .ok_or_else(|| Self::not_found(bucket, key))
    }

    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()> {
        if let Some(bucket_map) = self
            .storage
            .lock()
            .expect("storage mutex poisoned")
            .get_mut(bucket)
        {
            bucket_map.remove(key);
        }
        Ok(())
    }

    fn object_exists(&self, bucket: &str, key: &str) -> CloudResult<bool> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        Ok(storage.get(bucket).is_some_and(|b| b.contains_key(key)))
    }

    fn get_metadata(&self, bucket: &str, key: &str) -> CloudResult<ObjectMetadata> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        storage
            .get(bucket)
            .and_then(|b| b.get(key))
            .map(|object| ObjectMetadata {
                key: key.to_string(),
                size: object.data.len() as u64,
                content_encoding: object.content_encoding.clone(),
                etag: Some(format!("etag-{key}")),
            })
            .ok_or_else(|| Self::not_found(bucket, key))
    }
}

// ============================================================================
// FakeQueueIO
// ============================================================================

#[derive(Clone)]
pub struct FakeQueueIO {
    queues: QueueStorage,
    in_flight: QueueStorage,
    message_counter: Arc<Mutex<u64>>,
}

impl FakeQueueIO {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            message_counter: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of messages received but not yet deleted.
    ///
    /// # Panics
    ///
    /// Panics if the in-flight mutex is poisoned.
    #[must_use]
    pub fn in_flight(&self, queue: &str) -> usize {
        self.in_flight
            .lock()
            .expect("in_flight mutex poisoned")
            .get(queue)
            .map_or(0, Vec::len)
    }

    fn next_id(&self) -> String {
        let mut counter = self
            .message_counter
            .lock()
            .expect("message_counter mutex poisoned");
        *counter += 1;
        let id = *counter;
        drop(counter);
        format!("msg-{id}")
    }
}

impl Default for FakeQueueIO {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueIO for FakeQueueIO {
    fn send(
        &self,
        queue: &str,
        body: &str,
        attributes: HashMap<String, String>,
    ) -> CloudResult<String> {
        let msg_id = self.next_id();
        let message = QueueMessage {
            id: msg_id.clone(),
            receipt_handle: format!("receipt-{msg_id}"),
            body: body.to_string(),
            attributes,
            receive_count: 0,
        };

        self.queues
            .lock()
            .expect("queues mutex poisoned")
            .entry(queue.to_string())
            .or_default()
            .push(message);

        Ok(msg_id)
    }

    fn receive(&self, queue: &str, max_messages: u32) -> CloudResult<Vec<QueueMessage>> {
        let mut queues = self.queues.lock().expect("queues mutex poisoned");
        let q = queues.entry(queue.to_string()).or_default();

        let count = std::cmp::min(max_messages as usize, q.len());
        let messages: Vec<QueueMessage> = q
            .drain(0..count)
            .map(|mut m| {
                m.receive_count += 1;
                m
            })
            .collect();
        drop(queues);

        self.in_flight
            .lock()
            .expect("in_flight mutex poisoned")
            .entry(queue.to_string())
            .or_default()
            .extend(messages.iter().cloned());
        Ok(messages)
    }

    fn delete(&self, queue: &str, receipt_handle: &str) -> CloudResult<()> {
        let mut in_flight = self.in_flight.lock().expect("in_flight mutex poisoned");
        let pending = in_flight.entry(queue.to_string()).or_default();
        let before = pending.len();
        pending.retain(|m| m.receipt_handle != receipt_handle);
        if pending.len() == before {
            return Err(CloudIOError::new(
                ErrorKind::NotFound,
                format!("Unknown receipt handle {receipt_handle} for queue {queue}"),
            ));
        }
        Ok(())
    }

    fn queue_size(&self, queue: &str) -> CloudResult<u64> {
        let queues = self.queues.lock().expect("queues mutex poisoned");
        Ok(queues.get(queue).map_or(0, |q| q.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn stream_put_records_content_encoding() -> CloudResult<()> {
        let storage = FakeObjectIO::new();
        let mut body = Cursor::new(b"payload".to_vec());
        storage.put_object_stream("bucket", "out.csv", &mut body, Some("gzip"))?;

        let meta = storage.get_metadata("bucket", "out.csv")?;
        assert_eq!(meta.size, 7);
        assert_eq!(meta.content_encoding.as_deref(), Some("gzip"));
        assert_eq!(storage.get_object("bucket", "out.csv")?, b"payload");
        Ok(())
    }

    #[test]
    fn failed_stream_put_stores_nothing() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("encoder failed"))
            }
        }

        let storage = FakeObjectIO::new();
        let result = storage.put_object_stream("bucket", "out.csv", &mut Broken, None);
        assert_eq!(result.unwrap_err().kind, ErrorKind::Network);
        assert_eq!(storage.object_count("bucket"), 0);
    }

    #[test]
    fn queue_messages_stay_in_flight_until_deleted() -> CloudResult<()> {
        let queue = FakeQueueIO::new();
        queue.send("jobs", "one", HashMap::new())?;
        queue.send("jobs", "two", HashMap::new())?;

        let received = queue.receive("jobs", 1)?;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].body, "one");
        assert_eq!(queue.queue_size("jobs")?, 1);
        assert_eq!(queue.in_flight("jobs"), 1);

        queue.delete("jobs", &received[0].receipt_handle)?;
        assert_eq!(queue.in_flight("jobs"), 0);
        assert!(queue.delete("jobs", &received[0].receipt_handle).is_err());
        Ok(())
    }
}

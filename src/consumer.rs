//! Dispatch loop feeding job descriptions to a [`JobHandler`], one at a time.

use crate::handler::{JobHandler, TransformResponse};
use crate::io::cloud::{CloudResult, QueueIO};
use crate::request::TransformRequest;
use tracing::{debug, error, info};

/// Decode one JSON job description and run it.
///
/// A missing or blank `requestId` is replaced by a random UUID. Payloads that cannot be
/// decoded produce an error response; they never stop the caller's loop.
pub fn process_message(payload: &[u8], handler: &JobHandler) -> TransformResponse {
    let mut request = match TransformRequest::from_json(payload) {
        Ok(request) => request,
        Err(err) => {
            error!(
                error = %err,
                payload = %String::from_utf8_lossy(payload),
                "unable to decode job description"
            );
            return TransformResponse::from(&err);
        }
    };
    request.ensure_request_id();

    debug!(%request, "about to process");
    let response = handler.handle(&request);
    debug!(%request, success = response.is_success(), "finished processing");
    response
}

/// Drain `queue_name`: receive up to `batch` messages at a time, process each in turn and
/// delete it afterwards, until the queue is empty.
///
/// Returns the number of processed messages. Job failures are reported through the
/// responses and logs; only queue errors end the loop early.
///
/// # Errors
///
/// Returns an error if receiving or deleting a message fails.
pub fn consume_queue(
    queue: &dyn QueueIO,
    queue_name: &str,
    handler: &JobHandler,
    batch: u32,
) -> CloudResult<usize> {
    let mut processed = 0;
    loop {
        let messages = queue.receive(queue_name, batch.max(1))?;
        if messages.is_empty() {
            break;
        }
        for message in messages {
            info!(message_id = %message.id, queue = queue_name, "message received");
            let response = process_message(message.body.as_bytes(), handler);
            queue.delete(queue_name, &message.receipt_handle)?;
            debug!(message_id = %message.id, message = %response.message, "message done");
            processed += 1;
        }
    }
    Ok(processed)
}

use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;

use crate::foundation::error::{ReelError, ReelResult};
use crate::protocol::command::DrawCommand;

/// Callback receiving commands emitted on the producer side (for example by the path registry).
pub type CommandSink = Box<dyn FnMut(DrawCommand)>;

/// Decode one JSON array of command records.
///
/// Each record is decoded on its own: a record that does not decode (unknown tag, missing or
/// mistyped fields) becomes [`DrawCommand::Unknown`] instead of failing the whole batch. A value
/// that is not an array yields an empty batch.
pub fn decode_batch(value: serde_json::Value) -> Vec<DrawCommand> {
    let serde_json::Value::Array(items) = value else {
        tracing::debug!("command batch is not an array; ignoring");
        return Vec::new();
    };
    items.into_iter().map(decode_command).collect()
}

/// Decode a single command record, falling back to [`DrawCommand::Unknown`].
pub fn decode_command(value: serde_json::Value) -> DrawCommand {
    match DrawCommand::deserialize(&value) {
        Ok(cmd) => cmd,
        Err(e) => {
            let tag = value
                .get("type")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("<missing>");
            tracing::debug!(tag, error = %e, "undecodable draw command");
            DrawCommand::Unknown
        }
    }
}

/// Decode a batch from JSON text.
///
/// Only malformed JSON is an error; bad records are tolerated as in [`decode_batch`].
pub fn decode_batch_str(s: &str) -> ReelResult<Vec<DrawCommand>> {
    let value: serde_json::Value = serde_json::from_str(s)
        .map_err(|e| ReelError::serde(format!("parse command batch JSON: {e}")))?;
    Ok(decode_batch(value))
}

/// Decode either a single batch (`[cmd, ...]`) or a list of batches (`[[cmd, ...], ...]`).
pub fn decode_frames_str(s: &str) -> ReelResult<Vec<Vec<DrawCommand>>> {
    let value: serde_json::Value = serde_json::from_str(s)
        .map_err(|e| ReelError::serde(format!("parse command frames JSON: {e}")))?;
    let serde_json::Value::Array(items) = value else {
        return Err(ReelError::serde("command frames must be a JSON array"));
    };
    if !items.is_empty() && items.iter().all(serde_json::Value::is_array) {
        Ok(items.into_iter().map(decode_batch).collect())
    } else {
        Ok(vec![items.into_iter().map(decode_command).collect()])
    }
}

/// Shared, ordered buffer of commands for the frame being produced.
///
/// Cloning yields another handle onto the same buffer, so the guest and the path registry's sink
/// append to one timeline.
#[derive(Clone, Debug, Default)]
pub struct CommandQueue {
    inner: Rc<RefCell<Vec<DrawCommand>>>,
}

impl CommandQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command.
    pub fn push(&self, cmd: DrawCommand) {
        self.inner.borrow_mut().push(cmd);
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Drain every queued command in order.
    pub fn take_batch(&self) -> Vec<DrawCommand> {
        std::mem::take(&mut *self.inner.borrow_mut())
    }

    /// A sink that appends into this queue.
    pub fn sink(&self) -> CommandSink {
        let inner = Rc::clone(&self.inner);
        Box::new(move |cmd| inner.borrow_mut().push(cmd))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/batch.rs"]
mod tests;

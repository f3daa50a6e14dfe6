use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use models::{error::{Error, ErrorKind}, notify::{MessageHandle, Notifier}};
use tokio::{io::{AsyncWrite, AsyncWriteExt}, sync::Mutex};

/// Prints notifications as lines. A terminal can't edit earlier output, so an
/// edit is printed again under the same message number.
pub struct ConsoleNotifier<W> {
    next: AtomicU64,
    out: Mutex<W>,
}

impl<W: AsyncWrite + Send + Unpin> ConsoleNotifier<W> {
    pub fn new(out: W) -> Self {
        Self { next: AtomicU64::new(1), out: Mutex::new(out) }
    }

    async fn write_block(&self, prefix: &str, text: &str) -> Result<(), Error> {
        let mut block = String::new();
        for line in text.trim_end().lines() {
            block.push_str(prefix);
            block.push(' ');
            block.push_str(line);
            block.push('\n');
        }

        // One lock per message keeps concurrent messages from interleaving.
        let mut out = self.out.lock().await;
        out.write_all(block.as_bytes()).await.map_err(notification_error)?;
        out.flush().await.map_err(notification_error)
    }
}

fn notification_error(e: std::io::Error) -> Error {
    Error::new(ErrorKind::Notification(e.to_string()))
}

#[async_trait]
impl<W: AsyncWrite + Send + Unpin> Notifier for ConsoleNotifier<W> {
    async fn send(&self, text: &str) -> Result<MessageHandle, Error> {
        let handle = MessageHandle(self.next.fetch_add(1, Ordering::SeqCst));
        self.write_block(&format!("[#{}]", handle.0), text).await?;
        Ok(handle)
    }

    async fn edit_message(&self, handle: &MessageHandle, text: &str) -> Result<(), Error> {
        self.write_block(&format!("[#{}*]", handle.0), text).await
    }

    async fn send_error(&self, error: &Error, context: &str) -> Result<(), Error> {
        self.write_block(&format!("[error {}]", context), &error.to_string()).await
    }
}

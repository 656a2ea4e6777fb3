use anyhow::{anyhow, Result};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use tokio::sync::Notify;

/// Channel that only keeps the newest value.
///
/// The telemetry reader task pushes every decoded snapshot into the sender
/// side. The control loop runs on its own fixed period and only ever wants
/// the most recent snapshot, so older unread values are overwritten rather
/// than queued.
pub fn latest_value_channel<T>() -> (LatestSender<T>, LatestReceiver<T>) {
    let value = Arc::new(Mutex::new(None));
    let notify = Arc::new(Notify::new());
    let both_alive = Arc::new(AtomicBool::new(true));

    let sender = LatestSender {
        value: Arc::clone(&value),
        notify: Arc::clone(&notify),
        both_alive: Arc::clone(&both_alive),
    };
    let receiver = LatestReceiver {
        value,
        notify,
        both_alive,
    };
    (sender, receiver)
}

pub struct LatestSender<T> {
    value: Arc<Mutex<Option<T>>>,
    notify: Arc<Notify>,
    both_alive: Arc<AtomicBool>,
}

impl<T> LatestSender<T> {
    pub fn send(&self, value: T) -> Result<()> {
        if !self.both_alive.load(Ordering::SeqCst) {
            Err(anyhow!("Receiver dropped"))
        } else {
            *self.value.lock().unwrap() = Some(value);
            self.notify.notify_one();
            Ok(())
        }
    }
}

impl<T> Drop for LatestSender<T> {
    fn drop(&mut self) {
        self.both_alive.store(false, Ordering::SeqCst);
        self.notify.notify_waiters()
    }
}

pub struct LatestReceiver<T> {
    value: Arc<Mutex<Option<T>>>,
    notify: Arc<Notify>,
    both_alive: Arc<AtomicBool>,
}

impl<T> LatestReceiver<T> {
    /// Waits for the next value.
    pub async fn recv(&self) -> Result<T> {
        loop {
            if let Some(value) = self.try_take() {
                return Ok(value);
            }
            if !self.both_alive.load(Ordering::SeqCst) {
                return Err(anyhow!("Sender dropped"));
            }
            self.notify.notified().await;
        }
    }

    /// Takes the newest value without waiting, leaving the slot empty.
    pub fn try_take(&self) -> Option<T> {
        self.value.lock().unwrap().take()
    }
}

impl<T> Drop for LatestReceiver<T> {
    fn drop(&mut self) {
        self.both_alive.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn newest_value_wins() {
        let (sender, receiver) = latest_value_channel();
        sender.send(1).unwrap();
        sender.send(2).unwrap();
        assert_eq!(receiver.try_take(), Some(2));
        assert_eq!(receiver.try_take(), None);
    }

    #[tokio::test]
    async fn recv_returns_pending_value() {
        let (sender, receiver) = latest_value_channel();
        sender.send(7).unwrap();
        assert_eq!(receiver.recv().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn recv_fails_when_sender_drops() {
        let (sender, receiver) = latest_value_channel::<i32>();
        drop(sender);
        assert!(receiver.recv().await.is_err());
    }

    #[tokio::test]
    async fn send_fails_when_receiver_drops() {
        let (sender, receiver) = latest_value_channel();
        drop(receiver);
        assert!(sender.send(1).is_err());
    }
}

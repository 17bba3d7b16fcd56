//! Transport abstraction decoupling nodes from delivery mechanism.
//!
//! `MessagingPort` is the seam the core consumes; only the in-process
//! variant lives here. A distributed (out-of-process) variant is an
//! external collaborator that would satisfy the same trait.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam::channel::{unbounded, Sender as CrossbeamSender};
use parking_lot::RwLock;
use sim_types::{Message, NodeId};

/// A registered node's handler. Invoked on a dedicated worker thread, never
/// on the caller's stack, so `send`/`broadcast` can never trigger unbounded
/// re-entrant recursion through a handler that itself sends messages.
pub type MessageHandler = Box<dyn Fn(Message) + Send + Sync>;

/// Invoked when a registered handler panics, so the failure becomes an
/// observable `ERROR` event instead of silently killing a worker thread.
pub type ErrorPublisher = Arc<dyn Fn(NodeId, String) + Send + Sync>;

/// Transport abstraction: unicast/broadcast delivery, handler registration.
///
/// Delivery is at-most-once, best-effort, unordered across senders, and
/// FIFO per `(sender, receiver)` pair. `send` never fails visibly.
pub trait MessagingPort: Send + Sync {
    fn send(&self, receiver: &NodeId, message: Message);
    fn broadcast(&self, receivers: &[NodeId], message: Message);
    fn register_handler(&self, node_id: NodeId, handler: MessageHandler);
    fn unregister_handler(&self, node_id: &NodeId);
}

struct HandlerEntry {
    sender: CrossbeamSender<Message>,
}

/// In-process `MessagingPort`. Each registered handler owns a dedicated
/// unbounded channel and worker thread; `send`/`broadcast` only enqueue.
pub struct InProcessMessagingPort {
    handlers: RwLock<HashMap<NodeId, HandlerEntry>>,
    error_publisher: ErrorPublisher,
}

impl InProcessMessagingPort {
    pub fn new(error_publisher: ErrorPublisher) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            error_publisher,
        }
    }
}

impl MessagingPort for InProcessMessagingPort {
    fn send(&self, receiver: &NodeId, message: Message) {
        let handlers = self.handlers.read();
        if let Some(entry) = handlers.get(receiver) {
            // Disconnection means the worker already exited (e.g. race with
            // unregister); dropping the message is the documented policy.
            let _ = entry.sender.send(message);
        } else {
            tracing::debug!(receiver = %receiver, "dropping message, no handler registered");
        }
    }

    fn broadcast(&self, receivers: &[NodeId], message: Message) {
        for receiver in receivers {
            self.send(receiver, message.clone());
        }
    }

    fn register_handler(&self, node_id: NodeId, handler: MessageHandler) {
        let (tx, rx) = unbounded::<Message>();
        {
            let mut handlers = self.handlers.write();
            handlers.insert(node_id.clone(), HandlerEntry { sender: tx });
        }

        let error_publisher = self.error_publisher.clone();
        let worker_node_id = node_id.clone();
        std::thread::spawn(move || {
            while let Ok(message) = rx.recv() {
                let outcome = catch_unwind(AssertUnwindSafe(|| handler(message)));
                if outcome.is_err() {
                    tracing::error!(node = %worker_node_id, "message handler panicked");
                    error_publisher(
                        worker_node_id.clone(),
                        "message handler panicked".to_string(),
                    );
                }
            }
        });
    }

    fn unregister_handler(&self, node_id: &NodeId) {
        self.handlers.write().remove(node_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use sim_types::NodeId;
    use std::sync::Arc;
    use std::time::Duration;

    fn no_op_error_publisher() -> ErrorPublisher {
        Arc::new(|_, _| {})
    }

    #[test]
    fn send_to_unregistered_receiver_is_dropped_silently() {
        let port = InProcessMessagingPort::new(no_op_error_publisher());
        let receiver = NodeId::new("0").unwrap();
        let msg = Message::new(receiver.clone(), receiver.clone(), "PING", serde_json::json!(null));
        port.send(&receiver, msg);
    }

    #[test]
    fn fifo_per_sender_receiver_pair() {
        let port = InProcessMessagingPort::new(no_op_error_publisher());
        let sender = NodeId::new("0").unwrap();
        let receiver = NodeId::new("1").unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        port.register_handler(
            receiver.clone(),
            Box::new(move |msg| {
                received_clone.lock().push(msg.seq.unwrap());
            }),
        );

        for seq in 0..10u64 {
            let msg = Message::new(sender.clone(), receiver.clone(), "SEQ", serde_json::json!(null))
                .with_seq(seq);
            port.send(&receiver, msg);
        }

        std::thread::sleep(Duration::from_millis(100));
        let got = received.lock().clone();
        assert_eq!(got, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn unregister_drops_subsequent_messages() {
        let port = InProcessMessagingPort::new(no_op_error_publisher());
        let node = NodeId::new("0").unwrap();
        let count = Arc::new(Mutex::new(0u32));
        let count_clone = count.clone();
        port.register_handler(node.clone(), Box::new(move |_| *count_clone.lock() += 1));

        port.unregister_handler(&node);
        let msg = Message::new(node.clone(), node.clone(), "X", serde_json::json!(null));
        port.send(&node, msg);

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(*count.lock(), 0);
    }

    #[test]
    fn panicking_handler_reports_error_and_keeps_other_nodes_alive() {
        let reported = Arc::new(Mutex::new(Vec::new()));
        let reported_clone = reported.clone();
        let publisher: ErrorPublisher = Arc::new(move |node, msg| {
            reported_clone.lock().push((node, msg));
        });
        let port = InProcessMessagingPort::new(publisher);
        let node = NodeId::new("0").unwrap();
        port.register_handler(node.clone(), Box::new(|_| panic!("boom")));

        let msg = Message::new(node.clone(), node.clone(), "X", serde_json::json!(null));
        port.send(&node, msg);

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(reported.lock().len(), 1);
    }
}

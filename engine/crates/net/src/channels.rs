use session::{SessionId, SessionOutput};
use tokio::sync::mpsc;

use crate::telnet::LineEvent;

/// Framed input from a connection's reader to its session driver.
pub type SessionInputTx = mpsc::UnboundedSender<LineEvent>;
pub type SessionInputRx = mpsc::UnboundedReceiver<LineEvent>;

/// Anything a task wants written to one or all connections.
#[derive(Debug, Clone)]
pub enum Outbound {
    To(SessionOutput),
    Broadcast(String),
}

impl From<SessionOutput> for Outbound {
    fn from(output: SessionOutput) -> Self {
        Outbound::To(output)
    }
}

/// Sender from any task to the output router.
pub type OutputTx = mpsc::UnboundedSender<Outbound>;
/// Receiver in the output router.
pub type OutputRx = mpsc::UnboundedReceiver<Outbound>;

/// Per-session write channel (output router -> connection writer task).
pub type SessionWriteTx = mpsc::UnboundedSender<String>;
pub type SessionWriteRx = mpsc::UnboundedReceiver<String>;

/// Registration message for the output router.
#[derive(Debug)]
pub struct RegisterSession {
    pub session_id: SessionId,
    pub write_tx: SessionWriteTx,
}

pub type RegisterTx = mpsc::UnboundedSender<RegisterSession>;
pub type RegisterRx = mpsc::UnboundedReceiver<RegisterSession>;

pub type UnregisterTx = mpsc::UnboundedSender<SessionId>;
pub type UnregisterRx = mpsc::UnboundedReceiver<SessionId>;

/// Send a line to one session, ignoring a closed router.
pub fn send_to(output: &OutputTx, session_id: SessionId, text: impl Into<String>) {
    let _ = output.send(Outbound::To(SessionOutput::new(session_id, text)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn input_channel_preserves_order() {
        let (tx, mut rx) = mpsc::unbounded_channel::<LineEvent>();
        tx.send(LineEvent::Line("north".into())).unwrap();
        tx.send(LineEvent::Oversized(5000)).unwrap();
        drop(tx);

        assert_eq!(rx.recv().await, Some(LineEvent::Line("north".into())));
        assert_eq!(rx.recv().await, Some(LineEvent::Oversized(5000)));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn send_to_wraps_session_output() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        send_to(&tx, SessionId(42), "Hello!");
        match rx.recv().await.unwrap() {
            Outbound::To(out) => {
                assert_eq!(out.session_id, SessionId(42));
                assert_eq!(out.text, "Hello!");
            }
            other => panic!("expected directed output, got {:?}", other),
        }
    }
}

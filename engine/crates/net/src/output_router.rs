use std::collections::HashMap;

use session::SessionId;

use crate::channels::{Outbound, OutputRx, RegisterRx, SessionWriteTx, UnregisterRx};

/// Routes outbound text to per-session write channels.
///
/// Output is drained before registration changes, so a final message sent
/// just before a session unregisters is still delivered.
pub async fn run_output_router(
    mut output_rx: OutputRx,
    mut register_rx: RegisterRx,
    mut unregister_rx: UnregisterRx,
) {
    let mut writers: HashMap<SessionId, SessionWriteTx> = HashMap::new();

    loop {
        tokio::select! {
            biased;
            Some(outbound) = output_rx.recv() => match outbound {
                Outbound::To(output) => {
                    let Some(tx) = writers.get(&output.session_id) else {
                        continue;
                    };
                    if tx.send(output.text).is_err() {
                        tracing::debug!(session_id = %output.session_id, "Output router: session write channel closed");
                        writers.remove(&output.session_id);
                    } else if output.disconnect {
                        tracing::debug!(session_id = %output.session_id, "Output router: disconnect requested, dropping writer");
                        writers.remove(&output.session_id);
                    }
                }
                Outbound::Broadcast(text) => {
                    writers.retain(|_, tx| tx.send(text.clone()).is_ok());
                }
            },
            Some(reg) = register_rx.recv() => {
                tracing::debug!(session_id = %reg.session_id, "Output router: session registered");
                writers.insert(reg.session_id, reg.write_tx);
            }
            Some(session_id) = unregister_rx.recv() => {
                tracing::debug!(%session_id, "Output router: session unregistered");
                writers.remove(&session_id);
            }
            else => break,
        }
    }

    tracing::info!("Output router shutting down");
}

//! Decoder task: the single consumer of line events.

use std::{io, thread};

use crossbeam_channel::Receiver;
use event_channel::{ChannelError, Outbox};
use shared::Action;

use crate::decoder::{DecoderConfig, EncoderDecoder, LineEvent};

/// Ends when every event sender is dropped, or when the action peer is gone
/// (after running `on_peer_closed`).
pub fn spawn_decoder<F>(
    events: Receiver<LineEvent>,
    actions: Outbox<Action>,
    config: DecoderConfig,
    on_peer_closed: F,
) -> io::Result<thread::JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name("encoder-decoder".to_string())
        .spawn(move || {
            let mut decoder = EncoderDecoder::new(config);
            tracing::debug!("encoder decoder task started");

            for event in events.iter() {
                tracing::trace!(line = ?event.line, edge = ?event.edge, "line edge");
                let Some(action) = decoder.on_event(event) else {
                    continue;
                };
                match actions.send(action) {
                    Ok(()) => tracing::debug!(%action, "encoder action queued"),
                    Err(ChannelError::Full) => {
                        tracing::warn!(%action, "action lane full; dropping encoder action");
                    }
                    Err(err) => {
                        tracing::info!("controller endpoint unavailable ({err}); stopping decoder");
                        on_peer_closed();
                        return;
                    }
                }
            }

            tracing::debug!("encoder decoder task finished");
        })
}

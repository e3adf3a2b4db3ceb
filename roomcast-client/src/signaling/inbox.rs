use roomcast_core::{Frame, PeerId, SignalMessage};
use tracing::{debug, warn};

/// Decodes a frame from the presence channel, dropping local echo and
/// bodies whose claimed sender disagrees with the transport.
pub fn decode(frame: &Frame, local: &PeerId) -> Option<SignalMessage> {
    if frame.is_echo_of(local) {
        return None;
    }

    let message: SignalMessage = match frame.decode() {
        Ok(message) => message,
        Err(e) => {
            warn!("Malformed '{}' from {}: {}", frame.event, frame.sender, e);
            return None;
        }
    };

    if message.sender != frame.sender {
        warn!("'{}' from {} claims sender {}", frame.event, frame.sender, message.sender);
        return None;
    }

    Some(message)
}

/// Like [`decode`], but only keeps messages addressed to `local`.
pub fn accept(frame: &Frame, local: &PeerId) -> Option<SignalMessage> {
    let message = decode(frame, local)?;
    if !message.is_addressed_to(local) {
        debug!("'{}' from {} is not for us", frame.event, frame.sender);
        return None;
    }

    Some(message)
}

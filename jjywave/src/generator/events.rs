//! Generator notifications and delegate dispatch

use std::io;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, FixedOffset};
use tracing::debug;

/// Notifications from a [`Generator`](super::Generator)
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorEvent {
    /// Transmission began; the first second is queued
    Started,
    /// Transmission ended
    Stopped,
    /// Starting failed, or the sink reported a problem
    Error(String),
    /// A new minute frame became active
    FrameRebuilt {
        minute: DateTime<FixedOffset>,
        length: usize,
    },
}

/// Callbacks for [`GeneratorEvent`]s
///
/// Implementations are called from one dispatch thread, one event at a time.
pub trait GeneratorDelegate {
    fn on_started(&mut self);

    fn on_stopped(&mut self);

    fn on_error(&mut self, message: &str);

    fn on_frame_rebuilt(&mut self, _minute: DateTime<FixedOffset>, _length: usize) {}
}

/// Route one event to the matching callback
pub fn dispatch<D: GeneratorDelegate + ?Sized>(delegate: &mut D, event: &GeneratorEvent) {
    match event {
        GeneratorEvent::Started => delegate.on_started(),
        GeneratorEvent::Stopped => delegate.on_stopped(),
        GeneratorEvent::Error(message) => delegate.on_error(message),
        GeneratorEvent::FrameRebuilt { minute, length } => {
            delegate.on_frame_rebuilt(*minute, *length)
        }
    }
}

/// Run `delegate` on a dedicated thread until the generator goes away
///
/// The thread exits once every sender of `events` has been dropped. Joining
/// the returned handle gives the delegate back.
pub fn spawn_delegate_dispatcher<D>(
    events: Receiver<GeneratorEvent>,
    mut delegate: D,
) -> io::Result<JoinHandle<D>>
where
    D: GeneratorDelegate + Send + 'static,
{
    thread::Builder::new()
        .name("jjy-delegate".into())
        .spawn(move || {
            for event in events.iter() {
                dispatch(&mut delegate, &event);
            }
            debug!("Delegate dispatcher finished (channel disconnected)");
            delegate
        })
}

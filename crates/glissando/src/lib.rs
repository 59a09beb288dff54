//! Timeline scheduling and playback transport for partition notation.
//!
//! A [`partition::Partition`] is laid onto an absolute timeline by the
//! [`Scheduler`]: one [`ScheduledEvent`] per sounding note, chords end to
//! end, rests as silent slots. Playback goes through a backend seam
//! ([`ToneSink`], [`OfflineRenderer`], [`OutputDevice`]) in one of two
//! modes:
//!
//! - **rendered**: one pass is rendered offline into a buffer exactly one
//!   pass long and looped by the device;
//! - **live**: passes are scheduled one after another against the device
//!   clock until stopped.
//!
//! [`TransportController`] wraps either mode in a start/pause/resume/stop
//! state machine.
//!
//! # Example
//!
//! ```
//! use glissando::Scheduler;
//!
//! let timeline = Scheduler::default()
//!     .schedule_text("(A,C,E)*2, -, c->a", 120.0, 0.0)
//!     .unwrap();
//! assert_eq!(timeline.events.len(), 4);
//! assert_eq!(timeline.end, 2.0);
//! ```

pub mod backend;
pub mod clock;
pub mod envelope;
pub mod error;
pub mod live;
pub mod render;
pub mod session;
pub mod timeline;
pub mod transport;
pub mod virtual_output;

pub use backend::{
    emit_timeline, DeviceProvider, OfflineContext, OfflineRenderer, OutputDevice, Tone, ToneId,
    ToneList, ToneSink,
};
pub use clock::OutputClock;
pub use envelope::{Envelope, EnvelopeShape};
pub use error::{BackendError, GlissandoError, Result};
pub use live::{run_live_loop, spawn_live_loop, LiveLoop, LiveReport};
pub use render::{frames_for, RenderedBuffer, SineRenderer};
pub use session::{PlaybackHandle, PlaybackSession, TransportState};
pub use timeline::{ChordSlot, ControlPoint, FrequencyPath, ScheduledEvent, Scheduler, Timeline};
pub use transport::TransportController;
pub use virtual_output::{BufferPlayback, VirtualOutput};

pub use glissconf::PlaybackMode;

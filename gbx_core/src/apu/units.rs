mod envelope;
mod frame;
mod lencounter;
mod sweep;

pub use envelope::Envelope;
pub use frame::{FrameSequencer, Step};
pub use lencounter::LengthTimer;
pub use sweep::{Sweep, SweepResult};

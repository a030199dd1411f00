//! Scheduling core: time source, playlist selection and the refresh loop

mod clock;
mod frame_cache;
mod playlist_manager;
mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use frame_cache::FrameCache;
pub use playlist_manager::{local_time_of_day, PlaylistManager, Selection, SelectionError};
pub use scheduler::{
    CycleOutcome, CycleReport, RefreshScheduler, RefreshTarget, RefreshWaitError, SchedulerControl,
    SchedulerError, SchedulerHandle, SchedulerState, Trigger,
};

//! Refresh Scheduler
//!
//! One background thread drives every display update. It sleeps until the
//! current instance's dwell time ran out or something wakes it (a manual
//! refresh, a configuration edit, shutdown), then runs a single cycle:
//! select, render, display, record. Cycles never overlap; a manual request
//! that arrives mid-cycle waits for the cycle boundary.
//!
//! Instances whose refresh policy is not due are shown from the frame cache
//! without calling the plugin.

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use inkplay_core::{
    check_dimensions, BoxedDisplay, Frame, PluginRegistry, RenderError, RenderTarget,
    SharedPlugin, MAX_CYCLE_INTERVAL_SECS,
};
use inkplay_types::{
    CycleFault, DisplayedInstance, FaultKind, InstanceRef, RefreshType, Settings,
};
use log::{debug, error, info, trace, warn};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

use super::clock::Clock;
use super::frame_cache::FrameCache;
use super::playlist_manager::{PlaylistManager, Selection, SelectionError};
use crate::config::{AppConfig, ChangeKind, ConfigStore, SchedulerSettings, StoreError};

/// What a manual refresh should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTarget {
    Next,
    Previous,
    Current,
    Instance { playlist: String, instance: String },
}

impl fmt::Display for RefreshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshTarget::Next => write!(f, "next"),
            RefreshTarget::Previous => write!(f, "previous"),
            RefreshTarget::Current => write!(f, "current"),
            RefreshTarget::Instance { playlist, instance } => write!(f, "{}/{}", playlist, instance),
        }
    }
}

/// Why a cycle runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Timer,
    Manual(RefreshTarget),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Timer => write!(f, "timer"),
            Trigger::Manual(target) => write!(f, "manual {}", target),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Sleeping,
    Selecting,
    Rendering,
    Displaying,
    Recording,
    Paused,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Sleeping => "sleeping",
            SchedulerState::Selecting => "selecting",
            SchedulerState::Rendering => "rendering",
            SchedulerState::Displaying => "displaying",
            SchedulerState::Recording => "recording",
            SchedulerState::Paused => "paused",
            SchedulerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("config store failure: {0}")]
    Store(#[from] StoreError),
    #[error("cannot start scheduler thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("scheduler thread panicked")]
    Panicked,
}

/// Why a blocking refresh request returned without a report
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefreshWaitError {
    #[error("refresh did not finish within {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("scheduler is not running")]
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Displayed {
        instance: InstanceRef,
        unchanged: bool,
        /// Shown from the frame cache; the plugin was not called
        cached: bool,
    },
    NoActivePlaylist,
    Failed { instance: Option<InstanceRef>, kind: FaultKind },
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Displayed { instance, unchanged: true, .. } => {
                write!(f, "{} unchanged", instance)
            }
            CycleOutcome::Displayed { instance, cached: true, .. } => {
                write!(f, "displayed {} (cached)", instance)
            }
            CycleOutcome::Displayed { instance, .. } => write!(f, "displayed {}", instance),
            CycleOutcome::NoActivePlaylist => write!(f, "no active playlist"),
            CycleOutcome::Failed { instance: Some(instance), kind } => {
                write!(f, "{} failed ({})", instance, kind)
            }
            CycleOutcome::Failed { instance: None, kind } => write!(f, "failed ({})", kind),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Time until the next timer cycle
    pub next_interval: Duration,
}

/// What the screen is showing, for choosing the next wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dwell {
    Instance(Option<u64>),
    Idle,
}

fn dwell_interval(settings: &SchedulerSettings, dwell: Dwell) -> Duration {
    let secs = match dwell {
        Dwell::Instance(secs) => secs.unwrap_or(settings.cycle_interval_secs),
        Dwell::Idle => settings.no_active_retry_secs,
    };
    Duration::from_secs(secs.clamp(1, MAX_CYCLE_INTERVAL_SECS))
}

/// Requests waiting for the scheduler thread
#[derive(Debug, Default)]
struct Intents {
    manual: Option<RefreshTarget>,
    /// Callers blocked on the pending manual request
    waiters: Vec<Sender<CycleReport>>,
    config_changed: bool,
    paused: bool,
    shutdown: bool,
}

#[derive(Debug)]
enum Wake {
    Timer,
    Manual(RefreshTarget, Vec<Sender<CycleReport>>),
    ConfigChanged,
    Shutdown,
}

struct Shared {
    intents: Mutex<Intents>,
    wake: Condvar,
    state: Mutex<SchedulerState>,
}

impl Shared {
    fn intents(&self) -> MutexGuard<'_, Intents> {
        self.intents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SchedulerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn state(&self) -> SchedulerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until `deadline` or until a request arrives
    fn wait(&self, deadline: Instant) -> Wake {
        let mut intents = self.intents();
        loop {
            if intents.shutdown {
                return Wake::Shutdown;
            }
            if let Some(target) = intents.manual.take() {
                return Wake::Manual(target, std::mem::take(&mut intents.waiters));
            }
            if intents.config_changed {
                intents.config_changed = false;
                return Wake::ConfigChanged;
            }
            let now = Instant::now();
            if now >= deadline {
                return Wake::Timer;
            }
            intents = match self.wake.wait_timeout(intents, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

/// Cloneable way to talk to a scheduler
#[derive(Clone)]
pub struct SchedulerControl {
    shared: Arc<Shared>,
}

impl SchedulerControl {
    /// Ask for a cycle as soon as possible
    ///
    /// At most one manual request is pending; a newer target replaces the
    /// queued one. Returns `false` when a request was already pending.
    pub fn request_refresh(&self, target: RefreshTarget) -> bool {
        let mut intents = self.shared.intents();
        let fresh = intents.manual.is_none();
        debug!("Manual refresh requested: {}", target);
        intents.manual = Some(target);
        self.shared.wake.notify_all();
        fresh
    }

    /// Ask for a cycle and block until it finished
    ///
    /// Coalesces like [`request_refresh`](Self::request_refresh): when a
    /// newer target replaces a pending one, every waiter gets the report of
    /// the cycle that actually ran.
    pub fn request_refresh_and_wait(
        &self,
        target: RefreshTarget,
        timeout: Duration,
    ) -> Result<CycleReport, RefreshWaitError> {
        let (tx, rx) = bounded(1);
        {
            let mut intents = self.shared.intents();
            if intents.shutdown || self.shared.state() == SchedulerState::Stopped {
                return Err(RefreshWaitError::Stopped);
            }
            debug!("Manual refresh requested, waiting: {}", target);
            intents.manual = Some(target);
            intents.waiters.push(tx);
            self.shared.wake.notify_all();
        }
        match rx.recv_timeout(timeout) {
            Ok(report) => Ok(report),
            Err(RecvTimeoutError::Timeout) => Err(RefreshWaitError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(RefreshWaitError::Stopped),
        }
    }

    pub fn notify_config_changed(&self) {
        self.shared.intents().config_changed = true;
        self.shared.wake.notify_all();
    }

    /// Stop or resume timer cycles; manual requests are served either way
    pub fn set_paused(&self, paused: bool) {
        self.shared.intents().paused = paused;
        let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        match (*state, paused) {
            (SchedulerState::Sleeping, true) => *state = SchedulerState::Paused,
            (SchedulerState::Paused, false) => *state = SchedulerState::Sleeping,
            _ => {}
        }
        info!("Scheduler {}", if paused { "paused" } else { "resumed" });
    }

    /// Flip the pause flag, returning the new value
    pub fn toggle_pause(&self) -> bool {
        let paused = !self.is_paused();
        self.set_paused(paused);
        paused
    }

    pub fn is_paused(&self) -> bool {
        self.shared.intents().paused
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.state()
    }

    fn shutdown(&self) {
        self.shared.intents().shutdown = true;
        self.shared.wake.notify_all();
    }
}

pub struct RefreshScheduler {
    store: Arc<ConfigStore>,
    manager: PlaylistManager,
    display: BoxedDisplay,
    clock: Arc<dyn Clock>,
    shared: Arc<Shared>,
    dwell: Dwell,
    cache: FrameCache,
    /// Render abandoned after a timeout that may still be running
    overrun: Option<Receiver<Result<Frame, RenderError>>>,
}

impl RefreshScheduler {
    pub fn new(
        store: Arc<ConfigStore>,
        registry: Arc<PluginRegistry>,
        display: BoxedDisplay,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            manager: PlaylistManager::new(Arc::clone(&store), registry),
            store,
            display,
            clock,
            shared: Arc::new(Shared {
                intents: Mutex::new(Intents::default()),
                wake: Condvar::new(),
                state: Mutex::new(SchedulerState::Idle),
            }),
            dwell: Dwell::Instance(None),
            cache: FrameCache::in_memory(),
            overrun: None,
        }
    }

    /// Use `cache` for frames reused while an instance is not due
    pub fn with_frame_cache(mut self, cache: FrameCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn control(&self) -> SchedulerControl {
        SchedulerControl {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Start the scheduler loop on its own thread
    pub fn spawn(self) -> Result<SchedulerHandle, SchedulerError> {
        let control = self.control();
        let store = Arc::clone(&self.store);
        let listener_id = {
            let control = control.clone();
            store.on_change(move |kind| {
                if kind == ChangeKind::Configuration {
                    control.notify_config_changed();
                }
            })
        };

        let spawned = thread::Builder::new()
            .name("inkplay-scheduler".to_string())
            .spawn(move || self.run());
        match spawned {
            Ok(thread) => Ok(SchedulerHandle {
                control,
                store,
                listener_id,
                thread,
            }),
            Err(e) => {
                store.remove_listener(&listener_id);
                Err(SchedulerError::Spawn(e))
            }
        }
    }

    fn run(mut self) -> Result<(), SchedulerError> {
        let settings = self.store.scheduler_settings();
        info!(
            "Refresh scheduler started (interval {}s, refresh on start: {})",
            settings.cycle_interval_secs, settings.refresh_on_start
        );
        let mut cycle_start = Instant::now();
        let mut interval = if settings.refresh_on_start {
            Duration::ZERO
        } else {
            dwell_interval(&settings, self.dwell)
        };

        loop {
            let paused = self.shared.intents().paused;
            self.shared.set_state(if paused {
                SchedulerState::Paused
            } else {
                SchedulerState::Sleeping
            });

            let (trigger, waiters) = match self.shared.wait(cycle_start + interval) {
                Wake::Shutdown => break,
                Wake::ConfigChanged => {
                    interval = dwell_interval(&self.store.scheduler_settings(), self.dwell);
                    debug!("Configuration changed, next cycle in {:?}", interval);
                    continue;
                }
                Wake::Timer if self.shared.intents().paused => {
                    trace!("Paused, skipping timer cycle");
                    cycle_start = Instant::now();
                    interval = dwell_interval(&self.store.scheduler_settings(), self.dwell);
                    continue;
                }
                Wake::Timer => (Trigger::Timer, Vec::new()),
                Wake::Manual(target, waiters) => (Trigger::Manual(target), waiters),
            };

            cycle_start = Instant::now();
            match self.run_cycle(trigger) {
                Ok(report) => {
                    interval = report.next_interval;
                    for waiter in waiters {
                        let _ = waiter.send(report.clone());
                    }
                }
                Err(e) => {
                    error!("Refresh scheduler stopped: {}", e);
                    self.stop_serving();
                    return Err(e);
                }
            }
        }

        info!("Refresh scheduler stopped");
        self.stop_serving();
        Ok(())
    }

    /// Mark the loop as gone and release anyone still waiting on it
    fn stop_serving(&self) {
        let mut intents = self.shared.intents();
        self.shared.set_state(SchedulerState::Stopped);
        intents.waiters.clear();
    }

    /// Run one select-render-display-record cycle
    ///
    /// Only a broken config store is returned as an error; every other
    /// failure is recorded and reported in the outcome.
    pub fn run_cycle(&mut self, trigger: Trigger) -> Result<CycleReport, SchedulerError> {
        let started = Instant::now();
        match self.store.reload() {
            Ok(_) => {}
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => warn!("Could not re-read config: {}", e),
        }
        let now = self.clock.now();
        let settings = self.store.scheduler_settings();
        let refresh_type = match trigger {
            Trigger::Timer => RefreshType::Playlist,
            Trigger::Manual(_) => RefreshType::Manual,
        };
        debug!("Cycle started ({})", trigger);

        self.shared.set_state(SchedulerState::Selecting);
        let selected = match &trigger {
            Trigger::Timer | Trigger::Manual(RefreshTarget::Next) => self.manager.select_next(now),
            Trigger::Manual(RefreshTarget::Previous) => self.manager.select_previous(now),
            Trigger::Manual(RefreshTarget::Current) => self.manager.select_current(now),
            Trigger::Manual(RefreshTarget::Instance { playlist, instance }) => {
                self.manager.select_instance(playlist, instance).map(Some)
            }
        };

        // navigation honours refresh policies, an explicit refresh always renders
        let force = matches!(
            trigger,
            Trigger::Manual(RefreshTarget::Current | RefreshTarget::Instance { .. })
        );
        let outcome = match selected {
            Ok(Some(selection)) => {
                self.dwell = Dwell::Instance(selection.interval_secs);
                self.render_and_show(selection, &settings, refresh_type, now, force)?
            }
            Ok(None) => {
                self.dwell = Dwell::Idle;
                let fault = CycleFault::new(
                    FaultKind::NoActivePlaylist,
                    "no playlist is active with a resolvable instance",
                    now,
                );
                self.record(|cfg| {
                    cfg.refresh.last_attempt = Some(now);
                    cfg.refresh.record_idle(fault);
                })?;
                CycleOutcome::NoActivePlaylist
            }
            Err(SelectionError::Store(e)) if e.is_fatal() => return Err(e.into()),
            Err(SelectionError::Store(e)) => {
                warn!("Could not commit selection: {}", e);
                CycleOutcome::Failed {
                    instance: None,
                    kind: FaultKind::InternalError,
                }
            }
            Err(SelectionError::NotFound(instance)) => {
                warn!("Manual refresh target {} does not exist", instance);
                let fault = CycleFault::new(
                    FaultKind::UnresolvedPlugin,
                    format!("instance {} not found", instance),
                    now,
                )
                .for_instance(instance.clone());
                self.record(|cfg| {
                    cfg.refresh.last_attempt = Some(now);
                    cfg.refresh.last_error = Some(fault);
                })?;
                CycleOutcome::Failed {
                    instance: Some(instance),
                    kind: FaultKind::UnresolvedPlugin,
                }
            }
            Err(SelectionError::Unresolved { instance, plugin_id }) => {
                let fault = CycleFault::new(
                    FaultKind::UnresolvedPlugin,
                    format!("plugin '{}' is not registered", plugin_id),
                    now,
                );
                self.record_failure(instance, fault)?
            }
        };

        let next_interval = dwell_interval(&settings, self.dwell);
        info!(
            "Cycle ({}) finished in {:?}: {}; next in {:?}",
            trigger,
            started.elapsed(),
            outcome,
            next_interval
        );
        self.shared.set_state(SchedulerState::Idle);
        Ok(CycleReport {
            outcome,
            next_interval,
        })
    }

    fn render_and_show(
        &mut self,
        selection: Selection,
        settings: &SchedulerSettings,
        refresh_type: RefreshType,
        now: chrono::DateTime<chrono::Utc>,
        force: bool,
    ) -> Result<CycleOutcome, SchedulerError> {
        let instance_ref = selection.instance_ref();
        let plugin_id = selection.instance.plugin_id.clone();
        for skipped in &selection.skipped {
            warn!("Skipped {}: plugin not registered", skipped);
        }

        let device = self.store.device_settings();
        let capabilities = self.display.capabilities();
        let target = RenderTarget::oriented(capabilities, device.orientation);
        let instance = &selection.instance;
        let due = force || instance.refresh.is_due(instance.latest_refresh, now, &device.tz());
        let cached = if due {
            None
        } else {
            self.cache
                .get(&instance_ref, &plugin_id)
                .filter(|frame| frame.dimensions() == (target.width, target.height))
        };

        let from_cache = cached.is_some();
        let frame = match cached {
            Some(frame) => {
                info!(
                    "{} not due for refresh ({}), showing cached frame",
                    instance_ref, instance.refresh
                );
                frame
            }
            None => {
                info!("Rendering {} with plugin '{}'", instance_ref, plugin_id);
                self.shared.set_state(SchedulerState::Rendering);
                let rendered = self.render_bounded(
                    Arc::clone(&selection.plugin),
                    instance.settings.clone(),
                    target,
                    settings.render_timeout(),
                );
                let frame = match rendered {
                    Ok(frame) => frame,
                    Err(e) => {
                        let fault = CycleFault::new(e.kind.into(), e.message, self.clock.now());
                        return self.record_failure(instance_ref, fault);
                    }
                };
                if frame.dimensions() != (target.width, target.height) {
                    let fault = CycleFault::new(
                        FaultKind::DimensionMismatch,
                        format!(
                            "plugin rendered {}x{}, expected {}x{}",
                            frame.width(),
                            frame.height(),
                            target.width,
                            target.height
                        ),
                        self.clock.now(),
                    );
                    return self.record_failure(instance_ref, fault);
                }
                self.cache.put(&instance_ref, &plugin_id, &frame);
                frame
            }
        };

        let frame = frame.oriented(device.orientation, device.inverted_image);
        if let Err(e) = check_dimensions(&capabilities, &frame) {
            let fault = CycleFault::new(FaultKind::DimensionMismatch, e.to_string(), self.clock.now());
            return self.record_failure(instance_ref, fault);
        }

        let hash = frame.content_hash();
        let unchanged =
            settings.skip_unchanged_frames && self.store.refresh_metadata().image_hash == Some(hash);
        if unchanged {
            debug!("Frame for {} is unchanged, not updating the display", instance_ref);
        } else {
            self.shared.set_state(SchedulerState::Displaying);
            if let Err(e) = self.display.show(&frame) {
                let fault = CycleFault::new(FaultKind::DisplayFailure, e.to_string(), self.clock.now());
                return self.record_failure(instance_ref, fault);
            }
        }

        let finished = self.clock.now();
        let displayed = DisplayedInstance {
            playlist: selection.playlist.clone(),
            instance: selection.instance.name.clone(),
            plugin_id,
        };
        self.record(|cfg| {
            cfg.refresh.last_attempt = Some(now);
            cfg.refresh
                .record_success(displayed, refresh_type, hash, unchanged, finished);
            if let Some(instance) = find_instance(cfg, &instance_ref) {
                instance.record_success((!from_cache).then_some(finished));
            }
        })?;
        Ok(CycleOutcome::Displayed {
            instance: instance_ref,
            unchanged,
            cached: from_cache,
        })
    }

    /// Render on a worker thread, giving up after `timeout`
    ///
    /// A render that overruns is abandoned and its result dropped. The next
    /// render first waits for it, so at most one plugin call runs at a time.
    fn render_bounded(
        &mut self,
        plugin: SharedPlugin,
        settings: Settings,
        target: RenderTarget,
        timeout: Duration,
    ) -> Result<Frame, RenderError> {
        if let Some(previous) = self.overrun.take() {
            match previous.recv_timeout(timeout) {
                Err(RecvTimeoutError::Timeout) => {
                    self.overrun = Some(previous);
                    return Err(RenderError::timeout("previous render is still running"));
                }
                Ok(_) | Err(RecvTimeoutError::Disconnected) => {
                    debug!("Abandoned render finished");
                }
            }
        }

        let (tx, rx) = bounded(1);
        let spawned = thread::Builder::new()
            .name("inkplay-render".to_string())
            .spawn(move || {
                let _ = tx.send(plugin.render(&settings, &target));
            });
        if let Err(e) = spawned {
            return Err(RenderError::internal(format!("cannot start render thread: {}", e)));
        }

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                self.overrun = Some(rx);
                Err(RenderError::timeout(format!(
                    "render did not finish within {}s",
                    timeout.as_secs()
                )))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(RenderError::internal("plugin panicked while rendering"))
            }
        }
    }

    fn record_failure(
        &self,
        instance_ref: InstanceRef,
        fault: CycleFault,
    ) -> Result<CycleOutcome, SchedulerError> {
        let fault = fault.for_instance(instance_ref.clone());
        warn!("{} failed: {}", instance_ref, fault);
        let kind = fault.kind;
        self.record(|cfg| {
            cfg.refresh.last_attempt = Some(fault.at);
            if let Some(instance) = find_instance(cfg, &instance_ref) {
                instance.record_failure(fault.clone());
            }
            cfg.refresh.record_failure(instance_ref.clone(), fault);
        })?;
        Ok(CycleOutcome::Failed {
            instance: Some(instance_ref),
            kind,
        })
    }

    /// Persist cycle bookkeeping; only a broken store stops the scheduler
    fn record(&self, f: impl FnOnce(&mut AppConfig)) -> Result<(), SchedulerError> {
        self.shared.set_state(SchedulerState::Recording);
        match self.store.record(|cfg| {
            f(cfg);
            Ok(())
        }) {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!("Failed to persist refresh state: {}", e);
                Ok(())
            }
        }
    }
}

fn find_instance<'a>(
    cfg: &'a mut AppConfig,
    instance_ref: &InstanceRef,
) -> Option<&'a mut inkplay_types::PluginInstance> {
    cfg.find_playlist_mut(&instance_ref.playlist)?
        .find_instance_mut(&instance_ref.instance)
}

/// Running scheduler thread
pub struct SchedulerHandle {
    control: SchedulerControl,
    store: Arc<ConfigStore>,
    listener_id: String,
    thread: JoinHandle<Result<(), SchedulerError>>,
}

impl SchedulerHandle {
    pub fn control(&self) -> SchedulerControl {
        self.control.clone()
    }

    pub fn request_refresh(&self, target: RefreshTarget) -> bool {
        self.control.request_refresh(target)
    }

    pub fn request_refresh_and_wait(
        &self,
        target: RefreshTarget,
        timeout: Duration,
    ) -> Result<CycleReport, RefreshWaitError> {
        self.control.request_refresh_and_wait(target, timeout)
    }

    pub fn notify_config_changed(&self) {
        self.control.notify_config_changed();
    }

    pub fn set_paused(&self, paused: bool) {
        self.control.set_paused(paused);
    }

    pub fn toggle_pause(&self) -> bool {
        self.control.toggle_pause()
    }

    pub fn state(&self) -> SchedulerState {
        self.control.state()
    }

    /// Ask the loop to exit and wait for it
    pub fn stop(self) -> Result<(), SchedulerError> {
        self.control.shutdown();
        self.join()
    }

    /// Wait for the loop to exit on its own
    pub fn join(self) -> Result<(), SchedulerError> {
        let SchedulerHandle {
            store,
            listener_id,
            thread,
            ..
        } = self;
        let result = thread.join().unwrap_or(Err(SchedulerError::Panicked));
        store.remove_listener(&listener_id);
        result
    }
}

// Detection loop: capture -> detect -> assign slots -> update game state
use super::game_state::GameState;
use super::match_image::detector::to_gray;
use super::match_image::{DetectionPass, MultiDetector};
use super::probe::{EdgeTrigger, InterfaceSnapshot, StateProbe};
use super::types::{AutomationCommand, AutomationEvent, GameMode, LoopState};
use crate::capture::FrameSource;
use crate::config::BotConfig;
use crate::template_matching::{DetectionResult, TemplateLoadError, TemplateStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{Duration, Instant, sleep};

/// How often commands are polled while no pass is due.
const COMMAND_POLL: Duration = Duration::from_millis(20);

/// Consecutive failed passes before the game is considered in error.
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

pub struct GameAutomation {
    source: Arc<dyn FrameSource>,
    detector: Arc<MultiDetector>,
    probe: Arc<StateProbe>,
    state: Arc<GameState>,
    config: BotConfig,
    command_rx: mpsc::Receiver<AutomationCommand>,
    event_tx: mpsc::Sender<AutomationEvent>,
    loop_state: LoopState,
    capture_active: Arc<AtomicBool>,
    pass_interval: Duration,
    should_exit: bool,
    consecutive_failures: u32,
    interface: InterfaceSnapshot,
    catch_edge: EdgeTrigger,
}

impl GameAutomation {
    /// Load templates from `config.templates_dir` and build the loop.
    pub fn new(
        source: Arc<dyn FrameSource>,
        config: BotConfig,
        state: Arc<GameState>,
        command_rx: mpsc::Receiver<AutomationCommand>,
        event_tx: mpsc::Sender<AutomationEvent>,
    ) -> Result<Self, TemplateLoadError> {
        let store = load_store(&config)?;
        Ok(Self::with_store(
            source,
            Arc::new(store),
            config,
            state,
            command_rx,
            event_tx,
        ))
    }

    /// Build the loop around an already loaded template store.
    pub fn with_store(
        source: Arc<dyn FrameSource>,
        store: Arc<TemplateStore>,
        config: BotConfig,
        state: Arc<GameState>,
        command_rx: mpsc::Receiver<AutomationCommand>,
        event_tx: mpsc::Sender<AutomationEvent>,
    ) -> Self {
        let detector = MultiDetector::new(store, config.matching.clone(), config.slots.clone());
        let probe = StateProbe::new(config.interface.clone());
        Self {
            source,
            detector: Arc::new(detector),
            probe: Arc::new(probe),
            state,
            pass_interval: rate_to_interval(config.target_hz).unwrap_or(Duration::from_millis(100)),
            config,
            command_rx,
            event_tx,
            loop_state: LoopState::Idle,
            capture_active: Arc::new(AtomicBool::new(false)),
            should_exit: false,
            consecutive_failures: 0,
            interface: InterfaceSnapshot::default(),
            catch_edge: EdgeTrigger::default(),
        }
    }

    /// Flag polled once per iteration. Clearing it stops the loop after the
    /// current pass.
    pub fn capture_active(&self) -> Arc<AtomicBool> {
        self.capture_active.clone()
    }

    pub fn state(&self) -> Arc<GameState> {
        self.state.clone()
    }

    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    async fn emit(&self, event: AutomationEvent) {
        let _ = self.event_tx.send(event).await;
    }

    async fn change_loop_state(&mut self, new_state: LoopState) {
        if self.loop_state != new_state {
            log::debug!("🎮 Detection loop: {:?} -> {:?}", self.loop_state, new_state);
            self.loop_state = new_state;
            self.emit(AutomationEvent::LoopStateChanged(new_state)).await;
        }
    }

    async fn process_command(&mut self, command: AutomationCommand) {
        log::debug!("🤖 Processing automation command: {:?}", command);
        match command {
            AutomationCommand::Start => {
                if self.loop_state == LoopState::Idle {
                    self.capture_active.store(true, Ordering::SeqCst);
                    self.change_loop_state(LoopState::Running).await;
                    log::info!(
                        "🚀 Detection loop started ({:.1} passes/s)",
                        1.0 / self.pass_interval.as_secs_f32()
                    );
                } else {
                    log::debug!("🤖 Loop already started, ignoring start command");
                }
            }
            AutomationCommand::Pause => {
                if self.loop_state == LoopState::Running {
                    self.change_loop_state(LoopState::Paused).await;
                    log::info!("⏸️ Detection loop paused");
                }
            }
            AutomationCommand::Resume => {
                if self.loop_state == LoopState::Paused {
                    self.capture_active.store(true, Ordering::SeqCst);
                    self.change_loop_state(LoopState::Running).await;
                    log::info!("▶️ Detection loop resumed");
                }
            }
            AutomationCommand::Stop => {
                self.capture_active.store(false, Ordering::SeqCst);
                self.change_loop_state(LoopState::Idle).await;
                log::info!("⏹️ Detection loop stopped");
            }
            AutomationCommand::RunOnce => {
                self.run_pass().await;
            }
            AutomationCommand::UpdateRate(hz) => match rate_to_interval(hz) {
                Some(interval) => {
                    self.pass_interval = interval;
                    self.config.target_hz = hz;
                    self.emit(AutomationEvent::RateUpdated(hz)).await;
                    log::info!("⏱️ Detection rate set to {:.1} passes/s", hz);
                }
                None => {
                    self.emit(AutomationEvent::Error(format!("Invalid detection rate: {}", hz)))
                        .await;
                }
            },
            AutomationCommand::ReloadTemplates => {
                if let Err(e) = self.reload_templates().await {
                    log::error!("❌ Template reload failed: {}", e);
                    self.emit(AutomationEvent::Error(e)).await;
                }
            }
            AutomationCommand::Shutdown => {
                self.should_exit = true;
                self.capture_active.store(false, Ordering::SeqCst);
                self.change_loop_state(LoopState::Idle).await;
                log::info!("🛑 Detection loop shutting down");
            }
        }
    }

    pub async fn run(&mut self) {
        log::debug!("🎮 Detection loop task started");
        let mut last_pass: Option<Instant> = None;

        loop {
            match self.command_rx.try_recv() {
                Ok(command) => {
                    self.process_command(command).await;
                    if self.should_exit {
                        break;
                    }
                    continue;
                }
                Err(TryRecvError::Disconnected) => {
                    log::info!("🛑 Command channel closed, stopping detection loop");
                    break;
                }
                Err(TryRecvError::Empty) => {}
            }

            if self.loop_state == LoopState::Running && !self.capture_active.load(Ordering::SeqCst) {
                log::info!("⏹️ Capture cancelled");
                self.change_loop_state(LoopState::Idle).await;
            }

            match self.loop_state {
                LoopState::Idle | LoopState::Paused => sleep(COMMAND_POLL).await,
                LoopState::Running => {
                    let due = last_pass.is_none_or(|t| t.elapsed() >= self.pass_interval);
                    if due {
                        last_pass = Some(Instant::now());
                        self.run_pass().await;
                    } else {
                        let remaining = last_pass
                            .map(|t| self.pass_interval.saturating_sub(t.elapsed()))
                            .unwrap_or_default();
                        sleep(remaining.min(COMMAND_POLL)).await;
                    }
                }
            }
        }

        log::debug!("🎮 Detection loop task ended");
    }

    /// One capture-detect-apply cycle. Failures are reported, never raised.
    pub async fn run_pass(&mut self) {
        let source = self.source.clone();
        let detector = self.detector.clone();
        let probe = self.probe.clone();
        let region = self.config.capture_region.clone();

        let joined = tokio::task::spawn_blocking(
            move || -> DetectionResult<(DetectionPass, InterfaceSnapshot)> {
                let frame = source.capture(region.as_ref())?;
                let gray = to_gray(&frame);
                let pass = detector.detect(&gray);
                let interface = probe.scan(detector.matcher(), &gray);
                Ok((pass, interface))
            },
        )
        .await;

        match joined {
            Ok(Ok((pass, interface))) => self.apply_pass(pass, interface).await,
            Ok(Err(e)) => self.pass_failed(e).await,
            Err(e) => {
                self.state.record_detection_pass(false);
                log::error!("❌ Detection task aborted: {}", e);
                self.emit(AutomationEvent::Error(format!("Detection task aborted: {}", e)))
                    .await;
            }
        }
    }

    async fn apply_pass(&mut self, pass: DetectionPass, interface: InterfaceSnapshot) {
        self.state.record_detection_pass(true);
        if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES && self.state.current_mode() == GameMode::Error {
            self.state.change_mode(GameMode::Idle, "capture recovered");
        }
        self.consecutive_failures = 0;

        if interface.inventory_open != self.interface.inventory_open
            || interface.chest_open != self.interface.chest_open
        {
            self.apply_interface(interface);
            self.emit(AutomationEvent::InterfaceChanged {
                inventory_open: interface.inventory_open,
                chest_open: interface.chest_open,
            })
            .await;
        }
        self.interface = interface;

        if self.catch_edge.update(interface.catch_visible) {
            let total = self.state.record_fish_caught();
            log::info!("🐟 Fish caught (total {})", total);
            self.emit(AutomationEvent::FishCaught { total }).await;
        }

        self.state.apply_slot_statuses(&pass.slots);
        log::debug!(
            "🎣 Slots {} ({} detections, {}ms)",
            pass.slots,
            pass.detections.len(),
            pass.processing_time_ms
        );
        self.emit(AutomationEvent::SlotsUpdated(pass.slots)).await;
    }

    /// Mirror visible interface windows into the game state.
    fn apply_interface(&self, interface: InterfaceSnapshot) {
        self.state.set_inventory_open(interface.inventory_open);
        self.state.set_chest_open(interface.chest_open);

        if interface.inventory_open {
            self.state.change_mode(GameMode::InventoryOpen, "inventory detected");
        } else if interface.chest_open {
            self.state.change_mode(GameMode::ChestOpen, "chest detected");
        } else if matches!(
            self.state.current_mode(),
            GameMode::InventoryOpen | GameMode::ChestOpen
        ) {
            self.state.change_mode(GameMode::Idle, "interface closed");
        }
    }

    async fn pass_failed(&mut self, error: crate::template_matching::DetectionError) {
        self.state.record_detection_pass(false);
        self.consecutive_failures += 1;
        log::warn!(
            "⚠️ Detection pass failed ({} in a row): {}",
            self.consecutive_failures,
            error
        );
        if self.consecutive_failures == MAX_CONSECUTIVE_FAILURES {
            self.state.change_mode(GameMode::Error, &error.to_string());
        }
        self.emit(AutomationEvent::PassFailed(error)).await;
    }

    /// Rescan the template directory and swap in a fresh detector.
    pub async fn reload_templates(&mut self) -> Result<(), String> {
        let config = self.config.clone();
        let store = tokio::task::spawn_blocking(move || load_store(&config))
            .await
            .map_err(|e| format!("Template reload task aborted: {}", e))?
            .map_err(|e| e.to_string())?;

        let mut names = store.names();
        names.sort();
        self.detector = Arc::new(MultiDetector::new(
            Arc::new(store),
            self.config.matching.clone(),
            self.config.slots.clone(),
        ));
        log::info!("🔄 Reloaded {} templates", names.len());
        self.emit(AutomationEvent::TemplatesReloaded(names)).await;
        Ok(())
    }
}

fn load_store(config: &BotConfig) -> Result<TemplateStore, TemplateLoadError> {
    TemplateStore::load_from_directory(
        &config.templates_dir,
        &config.thresholds,
        config.default_threshold,
    )
}

fn rate_to_interval(hz: f32) -> Option<Duration> {
    (hz.is_finite() && hz > 0.0).then(|| Duration::from_secs_f32(1.0 / hz))
}

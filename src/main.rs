use rod_watch::args::{Args, Mode};
use rod_watch::capture::{FrameSource, ImageFileSource};
use rod_watch::config::BotConfig;
use rod_watch::game_automation::{GameState, MultiDetector, StateProbe};
use rod_watch::template_matching::TemplateStore;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let Some(args) = Args::parse() else {
        return ExitCode::SUCCESS;
    };

    let default_level = if args.debug_mode { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = match BotConfig::load_or_default(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = &args.templates_dir {
        config.templates_dir = dir.clone();
    }
    if let Some(hz) = args.rate_hz {
        config.target_hz = hz;
    }
    config.matching.debug_enabled |= args.debug_mode;
    if let Err(e) = config.validate() {
        eprintln!("❌ {}", e);
        return ExitCode::FAILURE;
    }

    let result = match &args.mode {
        Mode::Info => print_info(&config),
        Mode::Image(path) => run_single(&config, path),
        Mode::Run => run_live(config, args.timeout_secs),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_store(config: &BotConfig) -> Result<TemplateStore, String> {
    TemplateStore::load_from_directory(&config.templates_dir, &config.thresholds, config.default_threshold)
        .map_err(|e| e.to_string())
}

fn print_info(config: &BotConfig) -> Result<(), String> {
    let store = Arc::new(load_store(config)?);
    let names = store.names();
    println!("📁 Templates in {}:", config.templates_dir.display());
    for name in &names {
        println!("    {} (threshold {:.2})", name, store.threshold_for(name));
    }
    let detector = MultiDetector::new(store.clone(), config.matching.clone(), config.slots.clone());
    println!("🎣 Watching:");
    for name in detector.watch_list() {
        let kind = detector.kind_of(name).map(|k| k.to_string()).unwrap_or_default();
        println!("    {} -> {}", name, kind);
    }
    println!("⏱️ Rate: {:.1} passes/s", config.target_hz);
    Ok(())
}

/// One pass over a saved screenshot, printed slot by slot.
fn run_single(config: &BotConfig, image: &Path) -> Result<(), String> {
    let store = Arc::new(load_store(config)?);
    let source = ImageFileSource::open(image).map_err(|e| e.to_string())?;
    let (width, height) = source.dimensions();
    println!("🖼️ {} ({}x{})", source.name(), width, height);

    let detector = MultiDetector::new(store, config.matching.clone(), config.slots.clone());
    let (pass, gray) = detector.capture_and_detect(&source).map_err(|e| e.to_string())?;
    let interface = StateProbe::new(config.interface.clone()).scan(detector.matcher(), &gray);

    let state = GameState::new();
    state.apply_slot_statuses(&pass.slots);
    state.set_inventory_open(interface.inventory_open);
    state.set_chest_open(interface.chest_open);

    println!(
        "🔍 {} raw hits -> {} after NMS ({}ms)",
        pass.raw_count,
        pass.detections.len(),
        pass.processing_time_ms
    );
    for det in &pass.detections {
        println!(
            "    {} at {} score={:.3} quality={:.3}",
            det.template, det.center, det.score, det.quality
        );
    }
    for (slot, status) in state.slot_statuses().iter() {
        println!("    Slot {}: {}", slot, status);
    }
    println!(
        "🪟 inventory_open={} chest_open={} catch_visible={}",
        interface.inventory_open, interface.chest_open, interface.catch_visible
    );
    Ok(())
}

#[cfg(feature = "capture")]
fn run_live(config: BotConfig, timeout_secs: Option<u64>) -> Result<(), String> {
    use rod_watch::capture::MonitorCapture;
    use rod_watch::game_automation::{
        AutomationCommand, AutomationEvent, GameAutomation, HotkeyMap, create_automation_channels,
    };
    use std::sync::atomic::Ordering;

    let source = MonitorCapture::primary().map_err(|e| e.to_string())?;
    let hotkeys = HotkeyMap::from_config(&config.hotkeys);
    let state = Arc::new(GameState::new());
    state.subscribe(|old, new, context| {
        println!("🎮 {} -> {} ({})", old, new, context);
        Ok(())
    });

    let (cmd_tx, cmd_rx, event_tx, mut event_rx) = create_automation_channels();
    let mut automation = GameAutomation::new(Arc::new(source), config, state.clone(), cmd_rx, event_tx)
        .map_err(|e| e.to_string())?;
    let capture_active = automation.capture_active();

    // Hotkeys are typed on stdin (e.g. "F7" + Enter) since there is no global key hook
    let key_tx = cmd_tx.clone();
    let key_active = capture_active.clone();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            let running = key_active.load(Ordering::SeqCst);
            if let Some(command) = hotkeys.dispatch(&line, running) {
                if key_tx.blocking_send(command).is_err() {
                    break;
                }
            } else if !line.trim().is_empty() {
                log::warn!("⚠️ No hotkey bound to '{}'", line.trim());
            }
        }
    });

    let rt = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to start runtime: {}", e))?;
    rt.block_on(async move {
        let task = tokio::spawn(async move { automation.run().await });
        let _ = cmd_tx.send(AutomationCommand::Start).await;

        if let Some(secs) = timeout_secs {
            let timeout_tx = cmd_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
                log::info!("⏰ Timeout reached after {}s", secs);
                let _ = timeout_tx.send(AutomationCommand::Shutdown).await;
            });
        }

        while let Some(event) = event_rx.recv().await {
            match event {
                AutomationEvent::SlotsUpdated(slots) => log::debug!("🎣 {}", slots),
                AutomationEvent::FishCaught { total } => println!("🐟 Fish caught: {}", total),
                AutomationEvent::PassFailed(e) => log::warn!("⚠️ {}", e),
                AutomationEvent::Error(e) => eprintln!("❌ {}", e),
                other => log::info!("📣 {:?}", other),
            }
        }
        let _ = task.await;
    });

    let stats = state.stats();
    println!(
        "📊 {} fish in {:.0}s ({:.1}/h), {} passes, {} failed",
        stats.fish_caught,
        stats.elapsed().as_secs_f64(),
        stats.catch_rate(),
        stats.detection_passes,
        stats.detection_failures
    );
    Ok(())
}

#[cfg(not(feature = "capture"))]
fn run_live(_config: BotConfig, _timeout_secs: Option<u64>) -> Result<(), String> {
    Err("Live capture is not available: rebuild with --features capture".to_string())
}

//! Tauri tray shell
//!
//! Tray icon with one check item per feature, a disabled power label, a
//! status window and Quit. Toolkit callbacks are turned into [`TrayEvent`]s
//! for the state machine; the poller runs as a separate async task and its
//! snapshots are pushed into the menu as they arrive.

use crate::core::Config;
use crate::features::{self, FeatureController, FeatureId};
use crate::gpio::PinctrlAccessor;
use crate::telemetry::PowerSupplyReader;
use crate::tray::{apply_feature, Poller, TrayAction, TrayEvent, TrayMachine, TraySnapshot};
use anyhow::Context;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tauri::menu::{CheckMenuItem, Menu, MenuItem, PredefinedMenuItem};
use tauri::tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent};
use tauri::{AppHandle, Emitter, Manager, RunEvent, WebviewUrl, WebviewWindowBuilder, WindowEvent, Wry};
use tokio::sync::watch;

const STATUS_WINDOW: &str = "status";

/// State shared with Tauri commands and callbacks
struct ShellState {
    /// Only held while the machine handles one event; never across a pin call
    machine: Mutex<TrayMachine>,
    controller: Arc<FeatureController<PinctrlAccessor>>,
    snapshot: watch::Receiver<TraySnapshot>,
}

/// Menu items updated from snapshots
struct MenuHandles {
    features: Vec<(FeatureId, CheckMenuItem<Wry>)>,
    power: MenuItem<Wry>,
}

/// What the status window renders
#[derive(Serialize)]
struct StatusView {
    #[serde(flatten)]
    snapshot: TraySnapshot,
    message: Option<String>,
}

/// Current snapshot plus the last switch failure
#[tauri::command]
fn get_status(state: tauri::State<'_, ShellState>) -> StatusView {
    let message = state
        .machine
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .status_text()
        .map(str::to_string);

    StatusView {
        snapshot: state.snapshot.borrow().clone(),
        message,
    }
}

/// Switch a feature from the status window
#[tauri::command]
async fn set_feature(app: AppHandle, feature: String, on: bool) -> Result<(), String> {
    let feature = features::resolve(&feature).map_err(|e| e.to_string())?;
    match select(app, feature.id, on).await {
        TrayAction::FeatureFailed { message, .. } => Err(message),
        _ => Ok(()),
    }
}

/// Run the tray until Quit is selected
pub fn run(config: Config) -> anyhow::Result<()> {
    let controller = Arc::new(FeatureController::new(PinctrlAccessor::new(config.pinctrl.binary.clone())));
    let power = Arc::new(PowerSupplyReader::new(config.telemetry.power_supply_dir.clone()));
    let (poller, snapshot) = Poller::new(
        Arc::clone(&controller),
        power,
        config.telemetry.noise_threshold_watts,
        Duration::from_millis(config.tray.refresh_budget_ms),
    );
    let period = Duration::from_millis(config.general.refresh_rate_ms);

    let state = ShellState {
        machine: Mutex::new(TrayMachine::new()),
        controller,
        snapshot: snapshot.clone(),
    };

    let app = tauri::Builder::default()
        .manage(state)
        .invoke_handler(tauri::generate_handler![get_status, set_feature])
        .setup(move |app| {
            let handles = build_tray(app.handle())?;
            app.manage(handles);

            tauri::async_runtime::spawn(poller.run(period));

            let app_handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                follow_snapshots(app_handle, snapshot).await;
            });

            Ok(())
        })
        .build(tauri::generate_context!())
        .context("failed to build tray application")?;

    log::info!("Tray shell started");

    app.run(|_app, event| {
        // Closing the status window must not end a tray-only app
        if let RunEvent::ExitRequested { code, api, .. } = event {
            if code.is_none() {
                api.prevent_exit();
            }
        }
    });

    Ok(())
}

fn build_tray(app: &AppHandle) -> tauri::Result<MenuHandles> {
    let menu = Menu::new(app)?;

    let mut feature_items = Vec::new();
    for feature in features::all() {
        let item = CheckMenuItem::with_id(app, feature.name(), feature.name(), true, false, None::<&str>)?;
        menu.append(&item)?;
        feature_items.push((feature.id, item));
    }

    let status = MenuItem::with_id(app, "status", "Status...", true, None::<&str>)?;
    let power = MenuItem::with_id(app, "power", "Power: -- W", false, None::<&str>)?;
    let quit = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;

    menu.append(&PredefinedMenuItem::separator(app)?)?;
    menu.append(&status)?;
    menu.append(&power)?;
    menu.append(&PredefinedMenuItem::separator(app)?)?;
    menu.append(&quit)?;

    let mut builder = TrayIconBuilder::with_id("aiov2")
        .tooltip("AIO v2 Controller")
        .menu(&menu)
        .show_menu_on_left_click(false)
        .on_menu_event(|app, event| on_menu(app, event.id().as_ref()))
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                let event = match button {
                    MouseButton::Left => TrayEvent::LeftClick,
                    MouseButton::Right => TrayEvent::RightClick,
                    _ => return,
                };
                dispatch(tray.app_handle(), event);
            }
        });

    if let Some(icon) = app.default_window_icon() {
        builder = builder.icon(icon.clone());
    }
    builder.build(app)?;

    Ok(MenuHandles {
        features: feature_items,
        power,
    })
}

fn on_menu(app: &AppHandle, id: &str) {
    let event = match id {
        "quit" => TrayEvent::Quit,
        "status" => TrayEvent::ShowStatus,
        other => {
            let Ok(feature) = features::resolve(other) else {
                return;
            };
            // The toolkit has already flipped the check mark
            let on = check_item(app, feature.id)
                .and_then(|item| item.is_checked().ok())
                .unwrap_or(false);
            tauri::async_runtime::spawn(select(app.clone(), feature.id, on));
            return;
        }
    };
    dispatch(app, event);
}

fn check_item(app: &AppHandle, id: FeatureId) -> Option<CheckMenuItem<Wry>> {
    let handles = app.try_state::<MenuHandles>()?;
    handles
        .features
        .iter()
        .find(|(feature, _)| *feature == id)
        .map(|(_, item)| item.clone())
}

/// Hand a selection to the machine and, if accepted, switch the feature off the lock
async fn select(app: AppHandle, feature: FeatureId, on: bool) -> TrayAction {
    match dispatch(&app, TrayEvent::Select { feature, on }) {
        TrayAction::ApplyFeature { feature, on } => {
            let controller = Arc::clone(&app.state::<ShellState>().controller);
            let event = apply_feature(controller, feature, on).await;
            dispatch(&app, event)
        }
        other => other,
    }
}

/// Feed an event to the state machine and carry out the resulting action
fn dispatch(app: &AppHandle, event: TrayEvent) -> TrayAction {
    let action = {
        let state = app.state::<ShellState>();
        let mut machine = state.machine.lock().unwrap_or_else(|e| e.into_inner());
        machine.handle(event)
    };

    match &action {
        TrayAction::OpenStatusWindow => {
            if let Err(e) = open_status_window(app) {
                log::warn!("Failed to open status window: {}", e);
            }
        }
        TrayAction::FocusStatusWindow => {
            if let Some(window) = app.get_webview_window(STATUS_WINDOW) {
                let _ = window.set_focus();
            }
        }
        TrayAction::FeatureSet { feature, on } => {
            if let Some(item) = check_item(app, *feature) {
                let _ = item.set_checked(*on);
            }
        }
        TrayAction::FeatureFailed { feature, .. } => {
            // Put the check mark back to what the hardware last reported
            let state = app.state::<ShellState>();
            let enabled = state.snapshot.borrow().feature(*feature).and_then(|f| f.enabled);
            if let (Some(item), Some(enabled)) = (check_item(app, *feature), enabled) {
                let _ = item.set_checked(enabled);
            }
        }
        TrayAction::Quit => app.exit(0),
        // Carried out by `select`
        TrayAction::ApplyFeature { .. } => {}
        TrayAction::ShowMenu | TrayAction::None => {}
    }

    action
}

fn open_status_window(app: &AppHandle) -> tauri::Result<()> {
    if let Some(window) = app.get_webview_window(STATUS_WINDOW) {
        return window.set_focus();
    }

    let window = WebviewWindowBuilder::new(app, STATUS_WINDOW, WebviewUrl::App("index.html".into()))
        .title("AIO v2 Status")
        .inner_size(340.0, 300.0)
        .resizable(false)
        .build()?;

    let app_handle = app.clone();
    window.on_window_event(move |event| {
        if let WindowEvent::Destroyed = event {
            dispatch(&app_handle, TrayEvent::WindowClosed);
        }
    });

    Ok(())
}

/// Push every new snapshot into the menu and the status window
async fn follow_snapshots(app: AppHandle, mut rx: watch::Receiver<TraySnapshot>) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();

        if let Some(handles) = app.try_state::<MenuHandles>() {
            for (id, item) in &handles.features {
                if let Some(enabled) = snapshot.feature(*id).and_then(|f| f.enabled) {
                    let _ = item.set_checked(enabled);
                }
            }
            let _ = handles.power.set_text(snapshot.power_label());
        }

        {
            let state = app.state::<ShellState>();
            let mut machine = state.machine.lock().unwrap_or_else(|e| e.into_inner());
            machine.handle(TrayEvent::Tick);
        }

        let _ = app.emit("tray-snapshot", &snapshot);
    }
}

//! Executes one parsed command against the board

use super::render::{self, FeatureDetail};
use super::Command;
use crate::autostart::AutostartManager;
use crate::core::{Config, Error, Result};
use crate::features::{self, FeatureController, FeatureId};
use crate::gpio::{PinAccessor, PinctrlAccessor};
use crate::telemetry::{GpsProbe, PowerSource, PowerSupplyReader, PowerTracker};
use std::io::Write;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub struct Dispatcher<P, S> {
    controller: FeatureController<P>,
    power: S,
    gps: GpsProbe,
    autostart: AutostartManager,
    config: Config,
}

impl Dispatcher<PinctrlAccessor, PowerSupplyReader> {
    /// Dispatcher wired to the real pin utility and sysfs
    pub fn from_config(config: Config) -> Result<Self> {
        let autostart = AutostartManager::for_current_user(&config.autostart, &config.tray.icon_theme)?;
        Ok(Self::new(
            FeatureController::new(PinctrlAccessor::new(config.pinctrl.binary.clone())),
            PowerSupplyReader::new(config.telemetry.power_supply_dir.clone()),
            GpsProbe::new(
                config.gps.gpspipe_binary.clone(),
                config.gps.lsof_binary.clone(),
                config.gps.probe_seconds,
            ),
            autostart,
            config,
        ))
    }
}

impl<P: PinAccessor, S: PowerSource> Dispatcher<P, S> {
    pub fn new(
        controller: FeatureController<P>,
        power: S,
        gps: GpsProbe,
        autostart: AutostartManager,
        config: Config,
    ) -> Self {
        Self {
            controller,
            power,
            gps,
            autostart,
            config,
        }
    }

    pub fn execute(&self, command: Command, out: &mut impl Write) -> Result<()> {
        log::debug!("Executing {:?}", command);

        match command {
            Command::Basic => {
                out.write_all(render::render_basic(&self.controller.statuses()).as_bytes())?;
            }
            Command::Status => {
                let details = self.details();
                let power = self.power.sample();
                out.write_all(render::render_detailed(&power, &details).as_bytes())?;
            }
            Command::Set { feature, on } => {
                let feature = features::get(feature);
                self.controller.set_enabled(feature, on)?;
                writeln!(out, "{} {}", feature.name(), if on { "ON" } else { "OFF" })?;
            }
            Command::Power => self.monitor(out, "power monitor", |this, out| {
                out.write_all(render::render_power_frame(&this.power.sample()).as_bytes())?;
                Ok(())
            })?,
            Command::Watch => {
                writeln!(out, "Live Status (Ctrl+C to quit)\n----------------------------")?;
                let mut tracker = PowerTracker::new(self.config.telemetry.noise_threshold_watts);
                self.monitor(out, "watch mode", |this, out| {
                    let power = match this.power.sample() {
                        Ok(sample) => {
                            let watts = sample.watts;
                            Some((watts, tracker.record(sample)))
                        }
                        Err(e) => {
                            log::debug!("Watch sample failed: {}", e);
                            None
                        }
                    };
                    let line = render::render_watch_line(&this.controller.statuses(), power);
                    out.write_all(line.as_bytes())?;
                    out.flush()?;
                    Ok(())
                })?;
            }
            Command::Gui => self.gui()?,
            Command::Autostart { enable: true } => {
                self.autostart.enable()?;
                writeln!(out, "Autostart enabled: {}", self.autostart.path().display())?;
            }
            Command::Autostart { enable: false } => {
                if self.autostart.disable()? {
                    writeln!(out, "Autostart disabled")?;
                } else {
                    writeln!(out, "Autostart was not enabled")?;
                }
            }
            Command::Install => {
                return Err(Error::Unsupported(
                    "--install: install aiov2_ctl with your system's package tooling".to_string(),
                ))
            }
            Command::Update => {
                return Err(Error::Unsupported(
                    "--update: update aiov2_ctl with your system's package tooling".to_string(),
                ))
            }
        }
        Ok(())
    }

    /// Per-feature detail, probing gpsd only when GPS is on
    fn details(&self) -> Vec<FeatureDetail> {
        self.controller
            .statuses()
            .into_iter()
            .map(|(feature, enabled)| {
                let gps_on = feature.id == FeatureId::Gps && matches!(enabled, Ok(true));
                let (gps, users) = if gps_on {
                    let users = feature
                        .device
                        .map(|device| self.gps.device_users(device))
                        .unwrap_or_default();
                    (Some(self.gps.status()), users)
                } else {
                    (None, Vec::new())
                };
                FeatureDetail {
                    feature,
                    enabled,
                    gps,
                    users,
                }
            })
            .collect()
    }

    /// Redraw `frame` every refresh period until Ctrl+C
    fn monitor<W, F>(&self, out: &mut W, name: &str, mut frame: F) -> Result<()>
    where
        W: Write,
        F: FnMut(&Self, &mut W) -> Result<()>,
    {
        let period = Duration::from_millis(self.config.general.refresh_rate_ms);
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        runtime.block_on(async {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            loop {
                tokio::select! {
                    _ = &mut ctrl_c => break,
                    _ = interval.tick() => frame(self, out)?,
                }
            }
            Ok::<(), Error>(())
        })?;

        writeln!(out, "\nExiting {}.", name)?;
        Ok(())
    }

    #[cfg(feature = "gui")]
    fn gui(&self) -> Result<()> {
        crate::tray::preflight()?;
        crate::tray::run(self.config.clone()).map_err(|e| Error::Gui(format!("{:#}", e)))
    }

    #[cfg(not(feature = "gui"))]
    fn gui(&self) -> Result<()> {
        crate::tray::preflight()?;
        Err(Error::Unsupported("--gui: built without the `gui` feature".to_string()))
    }
}

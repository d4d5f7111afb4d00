//! Linux cpufreq sysfs platform.
//!
//! Each unit is a policy directory `<root>/policy<N>`. Requests are resolved
//! against `scaling_available_frequencies` (when the driver exposes it) and
//! written to `scaling_setspeed`, which the kernel honours only while the
//! policy runs its `userspace` governor.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::governor::{Bounds, Error, Policies, Relation, Transition, UnitId};

use super::table::FrequencyTable;

pub const DEFAULT_ROOT: &str = "/sys/devices/system/cpu/cpufreq";

const POLICY_PREFIX: &str = "policy";
const MIN_FREQ: &str = "scaling_min_freq";
const MAX_FREQ: &str = "scaling_max_freq";
const CUR_FREQ: &str = "scaling_cur_freq";
const AVAILABLE_FREQS: &str = "scaling_available_frequencies";
const SETSPEED: &str = "scaling_setspeed";
const SCALING_GOVERNOR: &str = "scaling_governor";
const USERSPACE: &str = "userspace";

#[derive(Debug, Clone)]
pub struct SysfsPlatform {
    root: PathBuf,
}

impl SysfsPlatform {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn policy_dir(&self, unit: UnitId) -> PathBuf {
        self.root.join(format!("{POLICY_PREFIX}{unit}"))
    }

    fn driver_err(unit: UnitId, file: &str, err: impl std::fmt::Display) -> Error {
        Error::Driver {
            unit,
            reason: format!("{file}: {err}"),
        }
    }

    fn read_attr(&self, unit: UnitId, file: &str) -> Result<String, Error> {
        let dir = self.policy_dir(unit);
        if !dir.is_dir() {
            return Err(Error::UnknownUnit(unit));
        }
        fs::read_to_string(dir.join(file)).map_err(|err| Self::driver_err(unit, file, err))
    }

    fn read_khz(&self, unit: UnitId, file: &str) -> Result<u32, Error> {
        let raw = self.read_attr(unit, file)?;
        raw.trim()
            .parse::<u32>()
            .map_err(|err| Self::driver_err(unit, file, err))
    }

    fn write_attr(&self, unit: UnitId, file: &str, value: &str) -> Result<(), Error> {
        let dir = self.policy_dir(unit);
        if !dir.is_dir() {
            return Err(Error::UnknownUnit(unit));
        }
        fs::write(dir.join(file), value).map_err(|err| Self::driver_err(unit, file, err))
    }

    /// Supported frequencies of a unit, continuous if the driver has no table.
    pub fn table(&self, unit: UnitId) -> Result<FrequencyTable, Error> {
        if self.policy_dir(unit).is_dir() && !self.policy_dir(unit).join(AVAILABLE_FREQS).exists() {
            return Ok(FrequencyTable::default());
        }
        let raw = self.read_attr(unit, AVAILABLE_FREQS)?;
        FrequencyTable::parse(&raw)
            .ok_or_else(|| Self::driver_err(unit, AVAILABLE_FREQS, "malformed frequency list"))
    }

    /// Switches the kernel side of the policy to the `userspace` governor so that
    /// `scaling_setspeed` becomes writable.
    pub fn claim(&self, unit: UnitId) -> Result<(), Error> {
        let current = self.read_attr(unit, SCALING_GOVERNOR)?;
        if current.trim() == USERSPACE {
            return Ok(());
        }
        self.write_attr(unit, SCALING_GOVERNOR, USERSPACE)?;
        info!(
            component = "platform",
            platform = "sysfs",
            event = "claimed",
            unit = unit,
            previous = current.trim(),
            "policy switched to userspace governor"
        );
        Ok(())
    }
}

impl Policies for SysfsPlatform {
    fn bounds(&self, unit: UnitId) -> Result<Bounds, Error> {
        Ok(Bounds {
            min: self.read_khz(unit, MIN_FREQ)?,
            max: self.read_khz(unit, MAX_FREQ)?,
            cur: self.read_khz(unit, CUR_FREQ)?,
        })
    }

    fn units(&self) -> Result<Vec<UnitId>, Error> {
        let entries = fs::read_dir(&self.root).map_err(|err| Error::Driver {
            unit: 0,
            reason: format!("{}: {err}", self.root.display()),
        })?;

        let mut units: Vec<UnitId> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix(POLICY_PREFIX))
                    .and_then(|id| id.parse::<UnitId>().ok())
            })
            .collect();
        units.sort_unstable();
        Ok(units)
    }
}

impl Transition for SysfsPlatform {
    fn request(&self, unit: UnitId, freq: u32, relation: Relation) -> Result<(), Error> {
        let bounds = self.bounds(unit)?;
        let resolved = self.table(unit)?.resolve(unit, freq, relation, &bounds)?;

        // The kernel answers EINVAL when the policy cannot take the value.
        let path = self.policy_dir(unit).join(SETSPEED);
        fs::write(&path, format!("{resolved}\n")).map_err(|err| match err.kind() {
            io::ErrorKind::InvalidInput => Error::InvalidFrequency {
                unit,
                freq,
                relation,
            },
            _ => Self::driver_err(unit, SETSPEED, err),
        })?;

        debug!(
            component = "platform",
            platform = "sysfs",
            event = "transition",
            unit = unit,
            requested_khz = freq,
            resolved_khz = resolved,
            relation = %relation,
            "scaling_setspeed written"
        );
        Ok(())
    }
}

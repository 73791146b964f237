use displaydoc::Display;
use serde::Deserialize;
use thiserror::Error;

use super::provider::{self, Provider};

const CPU_ALLOCATION_RATIO_VAR: &str = "CPU_ALLOCATION_RATIO";
const CPU_ALLOCATION_RATIO_ENTRY: &str = "scheduler.cpu_allocation_ratio";
const RAM_ALLOCATION_RATIO_VAR: &str = "RAM_ALLOCATION_RATIO";
const RAM_ALLOCATION_RATIO_ENTRY: &str = "scheduler.ram_allocation_ratio";
const DEFAULT_FILTERS_VAR: &str = "SCHEDULER_DEFAULT_FILTERS";
const DEFAULT_FILTERS_ENTRY: &str = "scheduler.default_filters";
const WEIGHT_CLASSES_VAR: &str = "SCHEDULER_WEIGHT_CLASSES";
const WEIGHT_CLASSES_ENTRY: &str = "scheduler.weight_classes";
const SERVICE_DOWN_TIME_VAR: &str = "SERVICE_DOWN_TIME";
const SERVICE_DOWN_TIME_ENTRY: &str = "scheduler.service_down_time";

#[derive(Debug, Display, Error)]
pub enum Error {
    /// Failed to read {CPU_ALLOCATION_RATIO_ENTRY:?}: {0}
    CpuAllocationRatio(provider::Error),
    /// Failed to read {RAM_ALLOCATION_RATIO_ENTRY:?}: {0}
    RamAllocationRatio(provider::Error),
    /// Failed to read {DEFAULT_FILTERS_ENTRY:?}: {0}
    DefaultFilters(provider::Error),
    /// Failed to read {WEIGHT_CLASSES_ENTRY:?}: {0}
    WeightClasses(provider::Error),
    /// Failed to read {SERVICE_DOWN_TIME_ENTRY:?}: {0}
    ServiceDownTime(provider::Error),
}

/// `scheduler_*` options from spec.md §6.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub cpu_allocation_ratio: f64,
    pub ram_allocation_ratio: f64,
    pub default_filters: Vec<String>,
    pub weight_classes: Vec<String>,
    pub service_down_time: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cpu_allocation_ratio: 16.0,
            ram_allocation_ratio: 1.5,
            default_filters: vec![
                "ActiveCompute".to_string(),
                "Cores".to_string(),
                "Ram".to_string(),
                "AggregateExtraSpecs".to_string(),
                "ImageProperties".to_string(),
            ],
            weight_classes: vec!["ResourceWeigher".to_string()],
            service_down_time: 60,
        }
    }
}

impl TryFrom<&Provider> for Config {
    type Error = Error;

    fn try_from(provider: &Provider) -> Result<Self, Self::Error> {
        let defaults = Config::default();
        Ok(Config {
            cpu_allocation_ratio: provider
                .read(CPU_ALLOCATION_RATIO_VAR, CPU_ALLOCATION_RATIO_ENTRY)
                .or_else(|e| missing_uses_default(e, defaults.cpu_allocation_ratio))
                .map_err(Error::CpuAllocationRatio)?,
            ram_allocation_ratio: provider
                .read(RAM_ALLOCATION_RATIO_VAR, RAM_ALLOCATION_RATIO_ENTRY)
                .or_else(|e| missing_uses_default(e, defaults.ram_allocation_ratio))
                .map_err(Error::RamAllocationRatio)?,
            default_filters: provider
                .read(DEFAULT_FILTERS_VAR, DEFAULT_FILTERS_ENTRY)
                .or_else(|e| missing_uses_default(e, defaults.default_filters))
                .map_err(Error::DefaultFilters)?,
            weight_classes: provider
                .read(WEIGHT_CLASSES_VAR, WEIGHT_CLASSES_ENTRY)
                .or_else(|e| missing_uses_default(e, defaults.weight_classes))
                .map_err(Error::WeightClasses)?,
            service_down_time: provider
                .read(SERVICE_DOWN_TIME_VAR, SERVICE_DOWN_TIME_ENTRY)
                .or_else(|e| missing_uses_default(e, defaults.service_down_time))
                .map_err(Error::ServiceDownTime)?,
        })
    }
}

/// Every field in this section has a sane global default (spec.md §6), so a
/// missing env var/config entry falls back to it instead of failing config
/// load; a malformed value is still a hard error.
fn missing_uses_default<T>(err: provider::Error, default: T) -> Result<T, provider::Error> {
    match err {
        provider::Error::Missing(..) => Ok(default),
        parse_err => Err(parse_err),
    }
}

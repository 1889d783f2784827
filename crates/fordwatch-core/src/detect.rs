// Change detection.
//
// Pure comparison of two normalized status records under quantization
// rules. Readings are snapped to a configured granularity before being
// compared, so sensor jitter below the step never produces a
// notification. Both field deltas land in one batched message.

use fordwatch_api::VehicleStatus;

/// Display unit for range values.
///
/// Telemetry always reports kilometres; conversion happens here, at
/// presentation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeUnit {
    Km,
    Miles,
}

impl RangeUnit {
    const KM_TO_MILES: f64 = 0.621_371;

    /// Convert a kilometre reading into this unit.
    pub fn from_km(self, km: f64) -> f64 {
        match self {
            Self::Km => km,
            Self::Miles => km * Self::KM_TO_MILES,
        }
    }

    /// Unit label for messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Km => "km",
            Self::Miles => "miles",
        }
    }
}

/// What to do with the very first observation (no prior state on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstObservation {
    /// Treat as `NoChange` -- no alert on every process restart.
    Suppress,
    /// Announce the initial reading once.
    Notify,
}

/// Rounding and policy knobs for change detection.
#[derive(Debug, Clone)]
pub struct DetectPolicy {
    /// Charge granularity in percent. Default: 1.
    pub charge_step_percent: f64,
    /// Range granularity, expressed in `range_unit`. Default: 1.
    pub range_step: f64,
    /// Display unit for range.
    pub range_unit: RangeUnit,
    /// First-observation behavior.
    pub first_observation: FirstObservation,
}

impl Default for DetectPolicy {
    fn default() -> Self {
        Self {
            charge_step_percent: 1.0,
            range_step: 1.0,
            range_unit: RangeUnit::Km,
            first_observation: FirstObservation::Suppress,
        }
    }
}

/// Outcome of comparing two observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeResult {
    NoChange,
    Changed(String),
}

/// Snap a reading to the nearest multiple of `step`, as a step count.
///
/// Comparing step counts (integers) instead of snapped floats keeps the
/// hysteresis check exact.
#[allow(clippy::as_conversions, clippy::cast_possible_truncation)]
fn quantize(value: f64, step: f64) -> i64 {
    (value / step).round() as i64
}

/// Render a snapped value without a trailing `.0` for whole numbers.
#[allow(clippy::as_conversions, clippy::cast_precision_loss)]
fn fmt_value(steps: i64, step: f64) -> String {
    let value = steps as f64 * step;
    if (value - value.round()).abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

/// Compare `previous` and `current` under `policy`.
///
/// Returns `Changed` with a human-readable message when the quantized
/// charge or range differs, when a field goes stale (value → null), or
/// when one recovers (null → value). Null transitions are reported in
/// words, never compared numerically.
pub fn detect(
    previous: Option<&VehicleStatus>,
    current: &VehicleStatus,
    policy: &DetectPolicy,
) -> ChangeResult {
    let Some(previous) = previous else {
        return first_observation(current, policy);
    };

    let mut parts: Vec<String> = Vec::new();

    let prev_charge = previous
        .charge_percent
        .map(|v| quantize(v, policy.charge_step_percent));
    let cur_charge = current
        .charge_percent
        .map(|v| quantize(v, policy.charge_step_percent));

    match (prev_charge, cur_charge) {
        (Some(p), Some(c)) if p != c => parts.push(format!(
            "Charge: {}% → {}%",
            fmt_value(p, policy.charge_step_percent),
            fmt_value(c, policy.charge_step_percent)
        )),
        (Some(_), None) => parts.push("Charge data unavailable".into()),
        (None, Some(c)) => parts.push(format!(
            "Charge data restored: {}%",
            fmt_value(c, policy.charge_step_percent)
        )),
        _ => {}
    }

    let prev_range = previous
        .range_km
        .map(|km| quantize(policy.range_unit.from_km(km), policy.range_step));
    let cur_range = current
        .range_km
        .map(|km| quantize(policy.range_unit.from_km(km), policy.range_step));

    let unit = policy.range_unit.label();
    match (prev_range, cur_range) {
        (Some(p), Some(c)) if p != c => parts.push(format!(
            "Range: {} {unit} → {} {unit}",
            fmt_value(p, policy.range_step),
            fmt_value(c, policy.range_step)
        )),
        (Some(_), None) => parts.push("Range data unavailable".into()),
        (None, Some(c)) => parts.push(format!(
            "Range data restored: {} {unit}",
            fmt_value(c, policy.range_step)
        )),
        _ => {}
    }

    if parts.is_empty() {
        ChangeResult::NoChange
    } else {
        ChangeResult::Changed(parts.join(", "))
    }
}

fn first_observation(current: &VehicleStatus, policy: &DetectPolicy) -> ChangeResult {
    if policy.first_observation == FirstObservation::Suppress {
        return ChangeResult::NoChange;
    }

    let mut parts: Vec<String> = Vec::new();
    if let Some(charge) = current.charge_percent {
        parts.push(format!(
            "Charge: {}%",
            fmt_value(
                quantize(charge, policy.charge_step_percent),
                policy.charge_step_percent
            )
        ));
    }
    if let Some(km) = current.range_km {
        let steps = quantize(policy.range_unit.from_km(km), policy.range_step);
        parts.push(format!(
            "Range: {} {}",
            fmt_value(steps, policy.range_step),
            policy.range_unit.label()
        ));
    }

    if parts.is_empty() {
        ChangeResult::NoChange
    } else {
        ChangeResult::Changed(parts.join(", "))
    }
}

// ── Tests ────────────────────────────────────────────────────────────

/// Net-type keywords usable with the default-net-type directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetTypeToken {
    Wire,
    WAnd,
    WOr,
    Tri,
    TriAnd,
    TriOr,
    Tri0,
    Tri1,
    TriReg,
    Supply0,
    Supply1,
    UWire,
    /// `` `default_nettype none `` or no directive seen.
    Unknown,
}

/// Keyword of an unconnected-drive directive in effect for a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveKeyword {
    Pull0,
    Pull1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
    Picoseconds,
    Femtoseconds,
}

/// One side of a timescale directive: magnitude 1, 10, or 100 of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeScaleValue {
    pub unit: TimeUnit,
    pub magnitude: u16,
}

impl TimeScaleValue {
    pub const ONE_NS: Self = Self {
        unit: TimeUnit::Nanoseconds,
        magnitude: 1,
    };
}

/// A `` `timescale `` directive value: base unit and precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeScale {
    pub base: TimeScaleValue,
    pub precision: TimeScaleValue,
}

impl Default for TimeScale {
    fn default() -> Self {
        Self {
            base: TimeScaleValue::ONE_NS,
            precision: TimeScaleValue::ONE_NS,
        }
    }
}

/// Directive state captured per module-like declaration at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclMetadata {
    pub default_net_type: NetTypeToken,
    pub unconnected_drive: Option<DriveKeyword>,
    pub time_scale: Option<TimeScale>,
}

impl Default for DeclMetadata {
    fn default() -> Self {
        Self {
            default_net_type: NetTypeToken::Wire,
            unconnected_drive: None,
            time_scale: None,
        }
    }
}

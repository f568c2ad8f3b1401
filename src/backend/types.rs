//! Data types shared between the controller, its collaborators and observers.

/// Longest SSID the radio reports (802.11 limit).
pub const MAX_SSID_LEN: usize = 32;

/// Signal value used when a network is not in range.
pub const SIGNAL_NONE: i8 = i8::MIN;

/// Authentication mode reported by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMode {
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
    Wpa2Enterprise,
    Wpa3Psk,
    Wpa2Wpa3Psk,
    WapiPsk,
    Unknown,
}

impl AuthMode {
    pub fn is_open(self) -> bool {
        self == AuthMode::Open
    }
}

/// Raw access point record as produced by one scan pass.
/// The same SSID may appear several times (one entry per BSSID).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDetails {
    pub bssid: [u8; 6],
    pub ssid: String,
    pub channel: u8,
    pub signal: i8,
    pub auth_mode: AuthMode,
}

impl NetworkDetails {
    /// Builds a record, truncating the SSID to [`MAX_SSID_LEN`] bytes.
    pub fn new(ssid: &str, signal: i8, auth_mode: AuthMode) -> Self {
        Self {
            bssid: [0; 6],
            ssid: truncate_ssid(ssid).to_string(),
            channel: 0,
            signal,
            auth_mode,
        }
    }

    pub fn with_bssid(mut self, bssid: [u8; 6]) -> Self {
        self.bssid = bssid;
        self
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }
}

/// Cut `ssid` to at most [`MAX_SSID_LEN`] bytes without splitting a character.
pub fn truncate_ssid(ssid: &str) -> &str {
    if ssid.len() <= MAX_SSID_LEN {
        return ssid;
    }
    let mut end = MAX_SSID_LEN;
    while !ssid.is_char_boundary(end) {
        end -= 1;
    }
    &ssid[..end]
}

/// One entry of the deduplicated scan list, or the current network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRecord {
    pub ssid: String,
    pub open: bool,
    /// dBm, more negative is weaker.
    pub signal: i8,
}

impl Default for NetworkRecord {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            open: false,
            signal: SIGNAL_NONE,
        }
    }
}

impl From<&NetworkDetails> for NetworkRecord {
    fn from(details: &NetworkDetails) -> Self {
        Self {
            ssid: details.ssid.clone(),
            open: details.auth_mode.is_open(),
            signal: details.signal,
        }
    }
}

/// Displayed status of the current network. Derived, recomputed whenever
/// the driver, the scan list or the stored preference changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    /// Associated, no IP yet.
    Idle,
    OutOfRange,
    Connected,
    ConnectFailed,
    ConnectionLost,
    Disconnected,
}

impl ConnectionStatus {
    /// User-facing wording; `connecting` is the controller's in-flight flag.
    pub fn describe(self, connecting: bool) -> &'static str {
        match self {
            ConnectionStatus::Disconnected | ConnectionStatus::OutOfRange if connecting => {
                "Connecting"
            }
            ConnectionStatus::Idle => "Connected, no Internet",
            ConnectionStatus::OutOfRange => "Out of range",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::ConnectFailed => "Check password and try again",
            ConnectionStatus::ConnectionLost => "Connection lost",
            ConnectionStatus::Disconnected => "Disconnected",
        }
    }
}

/// Asynchronous notification from the radio driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Unknown,
    ScanCompleted,
    Connected,
    GotIp,
    Disconnected,
    ConnectionFailed,
    ConnectionLost,
}

impl EventType {
    /// Events after which no connect attempt is in flight anymore: getting
    /// an address, or any way of ending up without a connection.
    pub fn ends_connect_attempt(self) -> bool {
        matches!(
            self,
            EventType::GotIp
                | EventType::Disconnected
                | EventType::ConnectionFailed
                | EventType::ConnectionLost
        )
    }

    /// Status shown for the current network after a connection-state event.
    pub fn connection_status(self) -> ConnectionStatus {
        match self {
            EventType::Connected => ConnectionStatus::Idle,
            EventType::GotIp => ConnectionStatus::Connected,
            EventType::Disconnected => ConnectionStatus::Disconnected,
            EventType::ConnectionFailed => ConnectionStatus::ConnectFailed,
            EventType::ConnectionLost => ConnectionStatus::ConnectionLost,
            EventType::Unknown | EventType::ScanCompleted => ConnectionStatus::ConnectFailed,
        }
    }
}

/// Live association info, only available while associated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPoint {
    pub details: NetworkDetails,
    pub status: ConnectionStatus,
}

//! Runtime platform probe
//!
//! The platform is detected once at startup and decides two strategies:
//! which storage adapter backs persistence, and which host the API lives on.
//! Android emulators cannot reach the host machine through `localhost`, so
//! they use the emulator's loopback alias instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Port the dashboard API listens on in development setups
pub const DEFAULT_API_PORT: u16 = 3001;

/// Host alias for the development machine as seen from an Android emulator
const ANDROID_EMULATOR_HOST: &str = "10.0.2.2";

/// Runtime the client is running in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    /// Native desktop build
    Desktop,
    /// Browser/webview build
    Web,
    /// Android emulator
    AndroidEmulator,
    /// iOS simulator
    IosSimulator,
}

/// Which storage strategy a platform supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageCapability {
    /// Plain key-value storage (browser-style)
    KeyValue,
    /// Device keychain / keystore
    Secure,
}

impl Platform {
    /// Probe the current runtime
    pub fn detect() -> Self {
        if cfg!(target_os = "android") {
            Platform::AndroidEmulator
        } else if cfg!(target_os = "ios") {
            Platform::IosSimulator
        } else if cfg!(target_arch = "wasm32") {
            Platform::Web
        } else {
            Platform::Desktop
        }
    }

    /// Host name used to reach the API from this platform
    pub fn api_host(&self) -> &'static str {
        match self {
            Platform::AndroidEmulator => ANDROID_EMULATOR_HOST,
            Platform::Desktop | Platform::Web | Platform::IosSimulator => "localhost",
        }
    }

    /// Default API base URL for this platform
    pub fn default_base_url(&self) -> String {
        format!("http://{}:{}", self.api_host(), DEFAULT_API_PORT)
    }

    /// Storage strategy for this platform
    pub fn storage_capability(&self) -> StorageCapability {
        match self {
            Platform::Desktop | Platform::Web => StorageCapability::KeyValue,
            Platform::AndroidEmulator | Platform::IosSimulator => StorageCapability::Secure,
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, Platform::AndroidEmulator | Platform::IosSimulator)
    }

    fn as_str(&self) -> &'static str {
        match self {
            Platform::Desktop => "desktop",
            Platform::Web => "web",
            Platform::AndroidEmulator => "android-emulator",
            Platform::IosSimulator => "ios-simulator",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(Platform::Desktop),
            "web" | "browser" => Ok(Platform::Web),
            "android" | "android-emulator" => Ok(Platform::AndroidEmulator),
            "ios" | "ios-simulator" => Ok(Platform::IosSimulator),
            other => Err(format!("unknown platform '{}'", other)),
        }
    }
}

//! Handler selection from user agent information
//!
//! All user agent sniffing lives here. [`UserAgentInfo::from_user_agent`]
//! turns a UA string into a few typed facts and [`detect_device`] maps those
//! facts to a [`HandlerName`]. Nothing else in the crate looks at UA strings.

use tracing::{debug, warn};

use super::HandlerName;

/// Browser family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Browser {
    Chrome,
    Chromium,
    /// Both EdgeHTML and Chromium based Edge
    Edge,
    Firefox,
    Safari,
    Opera,
    Other,
}

/// Rendering engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Blink,
    Gecko,
    WebKit,
    EdgeHtml,
    Other,
}

/// Facts about the runtime the device runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentInfo {
    /// Raw UA string, empty when not running in a browser
    pub user_agent: String,
    pub browser: Browser,
    /// Major version, 0 if unknown
    pub browser_version: u32,
    pub engine: Engine,
    /// Lowercase OS name (`ios`, `android`, `macos`, `windows`, `linux`)
    pub os_name: String,
    /// OS major and minor version
    pub os_version: Option<(u32, u32)>,
    pub is_react_native: bool,
    /// A peer connection implementation is available
    pub has_peer_connection: bool,
    /// Transceivers expose `currentDirection`
    pub has_transceiver_current_direction: bool,
}

impl UserAgentInfo {
    /// Best-effort parse of a browser UA string
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent;
        let ios = ["iPhone", "iPad", "iPod"].iter().any(|d| ua.contains(d));

        let (os_name, os_version) = if ios {
            ("ios", ios_version(ua))
        } else if ua.contains("Android") {
            ("android", dotted_version_after(ua, "Android "))
        } else if ua.contains("Windows") {
            ("windows", dotted_version_after(ua, "Windows NT "))
        } else if ua.contains("Mac OS X") {
            ("macos", underscored_version_after(ua, "Mac OS X "))
        } else if ua.contains("Linux") {
            ("linux", None)
        } else {
            ("", None)
        };

        // iOS browsers all run on WebKit whatever their brand
        let blink_or_webkit = if ios { Engine::WebKit } else { Engine::Blink };

        let (browser, version, engine) = if let Some(v) = major_version_after(ua, "Edge/") {
            (Browser::Edge, v, Engine::EdgeHtml)
        } else if let Some(v) = ["Edg/", "EdgA/", "EdgiOS/"]
            .iter()
            .find_map(|token| major_version_after(ua, token))
        {
            (Browser::Edge, v, blink_or_webkit)
        } else if let Some(v) = major_version_after(ua, "OPR/") {
            (Browser::Opera, v, blink_or_webkit)
        } else if let Some(v) = major_version_after(ua, "Firefox/")
            .or_else(|| major_version_after(ua, "FxiOS/"))
        {
            (Browser::Firefox, v, if ios { Engine::WebKit } else { Engine::Gecko })
        } else if let Some(v) = major_version_after(ua, "Chromium/") {
            (Browser::Chromium, v, blink_or_webkit)
        } else if let Some(v) = major_version_after(ua, "Chrome/")
            .or_else(|| major_version_after(ua, "CriOS/"))
        {
            (Browser::Chrome, v, blink_or_webkit)
        } else if ua.contains("Safari/") && ua.contains("Version/") {
            let v = major_version_after(ua, "Version/").unwrap_or(0);
            (Browser::Safari, v, Engine::WebKit)
        } else if ua.contains("AppleWebKit") {
            (Browser::Other, 0, Engine::WebKit)
        } else if ua.contains("Gecko/") {
            (Browser::Other, 0, Engine::Gecko)
        } else {
            (Browser::Other, 0, Engine::Other)
        };

        Self {
            user_agent: user_agent.to_string(),
            browser,
            browser_version: version,
            engine,
            os_name: os_name.to_string(),
            os_version,
            is_react_native: false,
            has_peer_connection: true,
            has_transceiver_current_direction: true,
        }
    }

    /// React Native runtime, with or without a WebRTC module
    pub fn react_native(has_peer_connection: bool) -> Self {
        Self {
            user_agent: String::new(),
            browser: Browser::Other,
            browser_version: 0,
            engine: Engine::Other,
            os_name: String::new(),
            os_version: None,
            is_react_native: true,
            has_peer_connection,
            has_transceiver_current_direction: false,
        }
    }

    /// Override the transceiver `currentDirection` support flag
    pub fn with_transceiver_current_direction(mut self, supported: bool) -> Self {
        self.has_transceiver_current_direction = supported;
        self
    }

    /// Whether the OS is iOS/iPadOS
    pub fn is_ios(&self) -> bool {
        self.os_name == "ios"
    }
}

/// Pick the handler family for a runtime, `None` if unsupported
pub fn detect_device(info: &UserAgentInfo) -> Option<HandlerName> {
    if info.is_react_native {
        if info.has_peer_connection {
            return Some(HandlerName::ReactNative106);
        }
        warn!("detect_device() | unsupported React Native without peer connection");
        return None;
    }

    let ios = info.is_ios();
    let version = info.browser_version;

    let detected = match info.browser {
        Browser::Chrome | Browser::Chromium if !ios => chrome_handler(version),
        Browser::Edge if !ios && info.engine == Engine::EdgeHtml => {
            (11..=18).contains(&version).then_some(HandlerName::Edge11)
        }
        Browser::Edge if !ios => match version {
            v if v >= 111 => Some(HandlerName::Chrome111),
            v if v >= 88 => Some(HandlerName::Chrome74),
            _ => None,
        },
        Browser::Firefox if !ios => match version {
            v if v >= 120 => Some(HandlerName::Firefox120),
            v if v >= 60 => Some(HandlerName::Firefox60),
            _ => None,
        },
        Browser::Firefox if info.os_version.is_some_and(|os| os >= (14, 3)) => {
            Some(HandlerName::Safari12)
        }
        Browser::Safari if version >= 12 && info.has_transceiver_current_direction => {
            Some(HandlerName::Safari12)
        }
        Browser::Safari if version >= 11 => Some(HandlerName::Safari11),
        _ => None,
    };

    let detected = detected.or_else(|| {
        if info.engine == Engine::WebKit && ios && info.has_transceiver_current_direction {
            return Some(HandlerName::Safari12);
        }
        if info.engine == Engine::Blink {
            return Some(
                blink_chrome_version(&info.user_agent)
                    .map(|v| chrome_handler(v).unwrap_or(HandlerName::Chrome55))
                    .unwrap_or(HandlerName::Chrome111),
            );
        }
        None
    });

    match detected {
        Some(name) => debug!(
            "detect_device() | {:?} {} detected as {}",
            info.browser, version, name
        ),
        None => warn!(
            "detect_device() | browser not supported [ua:{}]",
            info.user_agent
        ),
    }

    detected
}

fn chrome_handler(version: u32) -> Option<HandlerName> {
    match version {
        v if v >= 111 => Some(HandlerName::Chrome111),
        v if v >= 74 => Some(HandlerName::Chrome74),
        v if v >= 70 => Some(HandlerName::Chrome70),
        v if v >= 67 => Some(HandlerName::Chrome67),
        v if v >= 55 => Some(HandlerName::Chrome55),
        _ => None,
    }
}

/// Chrome major version in `Chrome/NN` or `Chrome NN`
fn blink_chrome_version(ua: &str) -> Option<u32> {
    let start = ua.find("Chrome")? + "Chrome".len();
    let rest = ua[start..].strip_prefix(['/', ' '])?;
    leading_number(rest)
}

fn major_version_after(ua: &str, token: &str) -> Option<u32> {
    let start = ua.find(token)? + token.len();
    leading_number(&ua[start..])
}

fn dotted_version_after(ua: &str, token: &str) -> Option<(u32, u32)> {
    version_pair(ua, token, '.')
}

fn underscored_version_after(ua: &str, token: &str) -> Option<(u32, u32)> {
    version_pair(ua, token, '_')
}

fn ios_version(ua: &str) -> Option<(u32, u32)> {
    ["iPhone OS ", "CPU OS ", " OS "]
        .iter()
        .find_map(|token| underscored_version_after(ua, token))
}

fn version_pair(ua: &str, token: &str, separator: char) -> Option<(u32, u32)> {
    let start = ua.find(token)? + token.len();
    let rest = &ua[start..];
    let major = leading_number(rest)?;
    let minor = rest
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .strip_prefix(separator)
        .and_then(leading_number)
        .unwrap_or(0);
    Some((major, minor))
}

fn leading_number(s: &str) -> Option<u32> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

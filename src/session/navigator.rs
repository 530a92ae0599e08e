//! Page navigation seam
//!
//! The guard needs to know which page it is protecting and to send the user
//! to the login route. In the CLI the "page" is the path a command acts on.

use std::sync::Mutex;

/// Where the user currently is and how to send them elsewhere
pub trait Navigator: Send + Sync {
    /// Path of the current page, read at call time
    fn current_path(&self) -> String;

    /// Navigate to `location`
    fn redirect(&self, location: &str);
}

/// Build `<login_path>?returnUrl=<percent-encoded path>`
pub fn login_location(login_path: &str, return_path: &str) -> String {
    format!(
        "{}?returnUrl={}",
        login_path,
        urlencoding::encode(return_path)
    )
}

/// Navigator for command-line use.
///
/// Redirects are recorded rather than followed; the command reports the last
/// one to the user once it finishes.
#[derive(Debug)]
pub struct ConsoleNavigator {
    path: Mutex<String>,
    redirected_to: Mutex<Option<String>>,
}

impl ConsoleNavigator {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Mutex::new(path.into()),
            redirected_to: Mutex::new(None),
        }
    }

    /// Move to another page
    #[allow(dead_code)]
    pub fn set_path(&self, path: impl Into<String>) {
        if let Ok(mut current) = self.path.lock() {
            *current = path.into();
        }
    }

    /// Last redirect target, if any
    pub fn redirected_to(&self) -> Option<String> {
        self.redirected_to.lock().ok().and_then(|r| r.clone())
    }
}

impl Navigator for ConsoleNavigator {
    fn current_path(&self) -> String {
        self.path
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|_| "/".to_string())
    }

    fn redirect(&self, location: &str) {
        log::info!("Redirecting to {}", location);
        if let Ok(mut target) = self.redirected_to.lock() {
            *target = Some(location.to_string());
        }
    }
}

//! Signup form controller
//!
//! Holds the field values and their feedback, persists the email draft after
//! a quiet period, and gates submission. Every delayed effect (draft save,
//! banner dismissal, submission watchdog) runs on a cancellable timer task
//! that is aborted when superseded or when the form is dropped.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::validate::{
    FieldFeedback, PasswordKind, PasswordStrength, pop3_reuse_warning, validate_email,
    validate_password,
};
use crate::config::SignupSettings;
use crate::storage::{SIGNUP_EMAIL_KEY, SessionStore};

pub const TERMS_REQUIRED_MESSAGE: &str = "You must agree to the terms of service.";
pub const CHECK_INPUT_MESSAGE: &str = "Please check the information you entered.";
pub const SUBMIT_TIMEOUT_MESSAGE: &str =
    "The request is taking longer than expected. Please try again.";

/// Visible state of the form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub email: String,
    pub login_password: String,
    pub pop3_password: String,
    pub agree_terms: bool,
    pub email_feedback: Option<FieldFeedback>,
    pub login_feedback: Option<FieldFeedback>,
    pub pop3_feedback: Option<FieldFeedback>,
    /// Cross-field advisory shown under the POP3 field
    pub pop3_advisory: Option<FieldFeedback>,
    pub strength: Option<PasswordStrength>,
    pub submitting: bool,
    /// Form-level error banner
    pub banner: Option<String>,
}

/// Outcome of a submit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitDecision {
    /// Validation failed; the banner explains why
    Blocked { message: String },
    /// Send these to the server; the form is now submitting
    Proceed { email: String, pop3_password: String },
}

/// A one-shot timer task, aborted on drop
#[derive(Debug)]
struct Timer(JoinHandle<()>);

impl Timer {
    fn spawn<F>(delay: Duration, action: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Timer(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        }))
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Signup form controller.
///
/// Methods that arm timers must be called from within a Tokio runtime.
pub struct SignupForm {
    store: Arc<dyn SessionStore>,
    settings: SignupSettings,
    state: Arc<Mutex<FormState>>,
    draft_timer: Option<Timer>,
    banner_timer: Option<Timer>,
    watchdog: Option<Timer>,
}

impl SignupForm {
    /// Build the form, restoring a saved email draft if one exists
    pub fn load(store: Arc<dyn SessionStore>, settings: SignupSettings) -> Self {
        let form = Self {
            store,
            settings,
            state: Arc::new(Mutex::new(FormState::default())),
            draft_timer: None,
            banner_timer: None,
            watchdog: None,
        };

        match form.store.get(SIGNUP_EMAIL_KEY) {
            Ok(Some(draft)) if !draft.is_empty() => {
                log::debug!("Restored signup email draft");
                form.lock().email = draft;
            }
            Ok(_) => {}
            Err(e) => log::warn!("Could not read signup draft: {}", e),
        }

        form
    }

    /// Current state snapshot
    pub fn state(&self) -> FormState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        lock_state(&self.state)
    }

    /// Update the email, validate it and schedule a draft save
    pub fn set_email(&mut self, value: &str) -> FieldFeedback {
        let feedback = validate_email(value, &self.settings.allowed_domains[..]);
        {
            let mut state = self.lock();
            state.email = value.to_string();
            state.email_feedback = Some(feedback.clone());
        }

        let store = Arc::clone(&self.store);
        let draft = value.to_string();
        // Replacing the handle aborts the previous pending save
        self.draft_timer = Some(Timer::spawn(self.settings.draft_debounce(), async move {
            if let Err(e) = store.set(SIGNUP_EMAIL_KEY, &draft) {
                log::warn!("Could not save signup draft: {}", e);
            }
        }));

        feedback
    }

    /// Update the login password and its strength indicator
    pub fn set_login_password(&mut self, value: &str) -> FieldFeedback {
        let check = validate_password(value, PasswordKind::Login);
        let mut state = self.lock();
        state.login_password = value.to_string();
        state.login_feedback = Some(check.feedback.clone());
        state.strength = check.strength;
        let advisory = pop3_reuse_warning(&state.login_password, &state.pop3_password);
        state.pop3_advisory = advisory;
        check.feedback
    }

    /// Update the POP3 password
    pub fn set_pop3_password(&mut self, value: &str) -> FieldFeedback {
        let check = validate_password(value, PasswordKind::Pop3);
        let mut state = self.lock();
        state.pop3_password = value.to_string();
        state.pop3_feedback = Some(check.feedback.clone());
        let advisory = pop3_reuse_warning(&state.login_password, &state.pop3_password);
        state.pop3_advisory = advisory;
        check.feedback
    }

    /// Advisory for identical login and POP3 passwords
    pub fn password_advisory(&self) -> Option<FieldFeedback> {
        self.lock().pop3_advisory.clone()
    }

    pub fn set_agree_terms(&mut self, agree: bool) {
        self.lock().agree_terms = agree;
    }

    /// Validate everything and either block with a banner or enter the
    /// submitting state.
    ///
    /// A second call while already submitting is blocked without a banner.
    pub fn submit(&mut self) -> SubmitDecision {
        let (email, login, pop3, agree, submitting) = {
            let state = self.lock();
            (
                state.email.clone(),
                state.login_password.clone(),
                state.pop3_password.clone(),
                state.agree_terms,
                state.submitting,
            )
        };

        if submitting {
            return SubmitDecision::Blocked {
                message: "A submission is already in progress.".to_string(),
            };
        }

        let email_feedback = validate_email(&email, &self.settings.allowed_domains[..]);
        let login_check = validate_password(&login, PasswordKind::Login);
        let pop3_check = validate_password(&pop3, PasswordKind::Pop3);
        let fields_ok = email_feedback.passes()
            && login_check.feedback.passes()
            && pop3_check.feedback.passes();

        {
            let mut state = self.lock();
            state.email_feedback = Some(email_feedback);
            state.login_feedback = Some(login_check.feedback);
            state.strength = login_check.strength;
            state.pop3_feedback = Some(pop3_check.feedback);
        }

        let blocked = if !fields_ok {
            Some(CHECK_INPUT_MESSAGE)
        } else if !agree {
            Some(TERMS_REQUIRED_MESSAGE)
        } else {
            None
        };

        if let Some(message) = blocked {
            self.show_banner(message);
            return SubmitDecision::Blocked {
                message: message.to_string(),
            };
        }

        {
            let mut state = self.lock();
            state.submitting = true;
            state.banner = None;
        }
        self.banner_timer = None;
        self.arm_watchdog();

        SubmitDecision::Proceed {
            email: email.trim().to_string(),
            pop3_password: pop3,
        }
    }

    /// The server accepted the submission
    pub fn complete_success(&mut self) {
        self.watchdog = None;
        self.draft_timer = None;
        self.lock().submitting = false;
        if let Err(e) = self.store.remove(SIGNUP_EMAIL_KEY) {
            log::warn!("Could not clear signup draft: {}", e);
        }
    }

    /// The server rejected the submission or could not be reached
    pub fn complete_failure(&mut self, message: &str) {
        self.watchdog = None;
        self.lock().submitting = false;
        self.show_banner(message);
    }

    /// Hide the banner (Escape key)
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn dismiss_banner(&mut self) {
        self.banner_timer = None;
        self.lock().banner = None;
    }

    fn show_banner(&mut self, message: &str) {
        self.lock().banner = Some(message.to_string());
        let state = Arc::clone(&self.state);
        let shown = message.to_string();
        self.banner_timer = Some(Timer::spawn(self.settings.banner_dismiss(), async move {
            clear_banner_if(&state, &shown);
        }));
    }

    fn arm_watchdog(&mut self) {
        let state = Arc::clone(&self.state);
        let dismiss = self.settings.banner_dismiss();
        self.watchdog = Some(Timer::spawn(self.settings.submit_timeout(), async move {
            {
                let mut current = lock_state(&state);
                if !current.submitting {
                    return;
                }
                log::warn!("Signup submission timed out on the client side");
                current.submitting = false;
                current.banner = Some(SUBMIT_TIMEOUT_MESSAGE.to_string());
            }
            tokio::time::sleep(dismiss).await;
            clear_banner_if(&state, SUBMIT_TIMEOUT_MESSAGE);
        }));
    }
}

fn lock_state(state: &Mutex<FormState>) -> MutexGuard<'_, FormState> {
    // A panic while holding the lock leaves plain data behind; keep using it
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn clear_banner_if(state: &Mutex<FormState>, message: &str) {
    let mut current = lock_state(state);
    if current.banner.as_deref() == Some(message) {
        current.banner = None;
    }
}

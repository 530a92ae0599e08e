//! Pure signup field validation and password strength scoring
//!
//! Nothing here renders or stores anything; callers decide how to show a
//! [`FieldFeedback`].

use lazy_static::lazy_static;
use regex::Regex;

/// Characters accepted as the "special" class in login passwords
pub const SPECIAL_CHARS: &str = "@$!%*?&";

pub const LOGIN_PASSWORD_MIN: usize = 8;
pub const LOGIN_PASSWORD_MAX: usize = 64;
pub const POP3_PASSWORD_MAX: usize = 255;

/// Prefixes that cost three strength points (matched case-insensitively)
const COMMON_PREFIXES: [&str; 3] = ["password", "123456", "qwerty"];

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex");
    static ref VERIFICATION_CODE_REGEX: Regex =
        Regex::new(r"^[0-9]{6}$").expect("valid code regex");
}

/// Display state of a single input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Valid,
    Invalid,
    Warning,
    Info,
}

/// State plus the message shown next to the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFeedback {
    pub state: FieldState,
    pub message: String,
}

impl FieldFeedback {
    fn new(state: FieldState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }

    pub fn valid(message: impl Into<String>) -> Self {
        Self::new(FieldState::Valid, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(FieldState::Invalid, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(FieldState::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(FieldState::Info, message)
    }

    /// Only `Invalid` blocks submission; warnings are advisory
    pub fn passes(&self) -> bool {
        self.state != FieldState::Invalid
    }
}

/// Which password field is being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordKind {
    /// Webmail login password: complexity rules and strength scoring
    Login,
    /// Mailbox (POP3) password: any non-empty string up to 255 characters
    Pop3,
}

/// Advisory strength of a login password
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    /// Fill level of the strength indicator
    pub fn percent(self) -> u8 {
        match self {
            PasswordStrength::Weak => 33,
            PasswordStrength::Medium => 66,
            PasswordStrength::Strong => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PasswordStrength::Weak => "weak",
            PasswordStrength::Medium => "medium",
            PasswordStrength::Strong => "strong",
        }
    }

    fn from_score(score: i32) -> Self {
        if score < 4 {
            PasswordStrength::Weak
        } else if score < 7 {
            PasswordStrength::Medium
        } else {
            PasswordStrength::Strong
        }
    }
}

/// Result of checking one password field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCheck {
    pub feedback: FieldFeedback,
    /// Present only for login passwords that passed the rules
    pub strength: Option<PasswordStrength>,
}

/// Character classes present in a password
#[derive(Debug, Default, Clone, Copy)]
struct CharClasses {
    lower: bool,
    upper: bool,
    digit: bool,
    special: bool,
}

impl CharClasses {
    fn of(password: &str) -> Self {
        password.chars().fold(Self::default(), |mut acc, c| {
            acc.lower |= c.is_ascii_lowercase();
            acc.upper |= c.is_ascii_uppercase();
            acc.digit |= c.is_ascii_digit();
            acc.special |= SPECIAL_CHARS.contains(c);
            acc
        })
    }

    fn missing(self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.lower {
            missing.push("lowercase letter");
        }
        if !self.upper {
            missing.push("uppercase letter");
        }
        if !self.digit {
            missing.push("digit");
        }
        if !self.special {
            missing.push("special character (@$!%*?&)");
        }
        missing
    }
}

/// Check an email address against the format rule and the domain allow-list.
///
/// The value is trimmed first. An unlisted domain is a warning, not an error.
pub fn validate_email<S: AsRef<str>>(email: &str, allowed_domains: &[S]) -> FieldFeedback {
    let email = email.trim();

    if email.is_empty() {
        return FieldFeedback::invalid("Please enter your email address.");
    }

    if !EMAIL_REGEX.is_match(email) {
        return FieldFeedback::invalid("This is not a valid email address.");
    }

    let domain = email
        .split_once('@')
        .map(|(_, domain)| domain.to_ascii_lowercase())
        .unwrap_or_default();

    if allowed_domains
        .iter()
        .any(|allowed| allowed.as_ref().eq_ignore_ascii_case(&domain))
    {
        FieldFeedback::valid("Valid email address.")
    } else {
        FieldFeedback::warning(
            "Uncommon email domain. Make sure this address can receive mail.",
        )
    }
}

/// Check a password field
pub fn validate_password(password: &str, kind: PasswordKind) -> PasswordCheck {
    if password.is_empty() {
        let message = match kind {
            PasswordKind::Login => "Please enter a password.",
            PasswordKind::Pop3 => "Please enter your POP3 password.",
        };
        return PasswordCheck {
            feedback: FieldFeedback::invalid(message),
            strength: None,
        };
    }

    let length = password.chars().count();

    match kind {
        PasswordKind::Pop3 => {
            let feedback = if length > POP3_PASSWORD_MAX {
                FieldFeedback::invalid(format!(
                    "POP3 password cannot exceed {} characters.",
                    POP3_PASSWORD_MAX
                ))
            } else {
                FieldFeedback::valid("POP3 password entered.")
            };
            PasswordCheck {
                feedback,
                strength: None,
            }
        }
        PasswordKind::Login => validate_login_password(password, length),
    }
}

fn validate_login_password(password: &str, length: usize) -> PasswordCheck {
    let rejected = |message: String| PasswordCheck {
        feedback: FieldFeedback::invalid(message),
        strength: None,
    };

    if length < LOGIN_PASSWORD_MIN {
        return rejected(format!(
            "Password must be at least {} characters.",
            LOGIN_PASSWORD_MIN
        ));
    }
    if length > LOGIN_PASSWORD_MAX {
        return rejected(format!(
            "Password cannot exceed {} characters.",
            LOGIN_PASSWORD_MAX
        ));
    }

    let missing = CharClasses::of(password).missing();
    if !missing.is_empty() {
        return rejected(format!("Missing: {}", missing.join(", ")));
    }

    let strength = check_password_strength(password);
    let feedback = match strength {
        PasswordStrength::Weak => {
            FieldFeedback::warning("Weak password. A more complex password is recommended.")
        }
        PasswordStrength::Medium => FieldFeedback::info("Medium strength password."),
        PasswordStrength::Strong => FieldFeedback::valid("Strong password."),
    };

    PasswordCheck {
        feedback,
        strength: Some(strength),
    }
}

/// Raw strength score; see [`check_password_strength`] for the buckets
pub fn strength_score(password: &str) -> i32 {
    let length = password.chars().count();
    let classes = CharClasses::of(password);
    let mut score = 0;

    for threshold in [8, 12, 16] {
        if length >= threshold {
            score += 1;
        }
    }

    for present in [classes.lower, classes.upper, classes.digit, classes.special] {
        if present {
            score += 1;
        }
    }

    // Mixed case and digit+special, in either order
    if classes.lower && classes.upper {
        score += 1;
    }
    if classes.digit && classes.special {
        score += 1;
    }

    let lowered = password.to_ascii_lowercase();
    if COMMON_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        score -= 3;
    }

    if has_triple_run(password) {
        score -= 1;
    }

    score
}

/// Bucket a password into weak (<4), medium (<7) or strong
pub fn check_password_strength(password: &str) -> PasswordStrength {
    PasswordStrength::from_score(strength_score(password))
}

/// Any character (other than a line break) repeated three times in a row
fn has_triple_run(password: &str) -> bool {
    let chars: Vec<char> = password.chars().collect();
    chars.windows(3).any(|w| {
        w[0] == w[1] && w[1] == w[2] && !matches!(w[0], '\n' | '\r' | '\u{2028}' | '\u{2029}')
    })
}

/// Advisory shown on the POP3 field when both passwords are identical
pub fn pop3_reuse_warning(login_password: &str, pop3_password: &str) -> Option<FieldFeedback> {
    if !login_password.is_empty() && !pop3_password.is_empty() && login_password == pop3_password
    {
        Some(FieldFeedback::warning(
            "Login and POP3 passwords are identical. Using different passwords is recommended.",
        ))
    } else {
        None
    }
}

/// Check the 6-digit verification code
pub fn validate_verification_code(code: &str) -> FieldFeedback {
    let code = code.trim();
    if code.is_empty() {
        FieldFeedback::invalid("Please enter the verification code.")
    } else if !VERIFICATION_CODE_REGEX.is_match(code) {
        FieldFeedback::invalid("The verification code is 6 digits.")
    } else {
        FieldFeedback::valid("Code format is valid.")
    }
}

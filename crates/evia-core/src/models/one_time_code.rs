use serde::{Deserialize, Serialize};

/// Purpose of a short-lived code tied to an email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OneTimeCodeKind {
    /// Emailed password reset OTP
    Otp,
    /// Token issued after the OTP has been verified
    ResetPassword,
}

impl OneTimeCodeKind {
    /// Storage key for the given email, e.g. `otp:ana@example.com`.
    pub fn key_for(self, email: &str) -> String {
        match self {
            OneTimeCodeKind::Otp => format!("otp:{}", email),
            OneTimeCodeKind::ResetPassword => format!("reset-password:{}", email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_kind() {
        assert_eq!(
            OneTimeCodeKind::Otp.key_for("ana@example.com"),
            "otp:ana@example.com"
        );
        assert_eq!(
            OneTimeCodeKind::ResetPassword.key_for("ana@example.com"),
            "reset-password:ana@example.com"
        );
    }
}

/// Domain failures whose Display strings are shown to users verbatim.
/// The first four are long-established wording that shipped clients match
/// on, so they must not be rephrased.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("Username already reserved.")]
    AlreadyReserved,

    #[error("Password must be at least 4 characters.")]
    PasswordTooShort,

    #[error("Wrong password.")]
    WrongPassword,

    #[error("Username not found.")]
    UsernameNotFound,

    #[error("Invalid email address.")]
    InvalidEmail,

    #[error("Invalid or expired token.")]
    InvalidToken,

    #[error("Invalid or expired reset link.")]
    InvalidResetToken,

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("Could not send the reset email. Try again later.")]
    EmailDelivery,

    #[error("Something went wrong. Try again.")]
    Internal,
}

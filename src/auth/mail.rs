use tracing::info;

/// Outgoing-mail seam for the registration and password-reset flows.
pub trait Mailer: Send + Sync {
    fn send_verification(&self, email: &str, token: &str);
    fn send_password_reset(&self, email: &str, token: &str);
}

/// Writes outgoing mail to the log instead of delivering it.
pub struct ConsoleMailer;

impl Mailer for ConsoleMailer {
    fn send_verification(&self, email: &str, token: &str) {
        info!(%email, %token, "verification mail");
    }

    fn send_password_reset(&self, email: &str, token: &str) {
        info!(%email, %token, "password reset mail");
    }
}

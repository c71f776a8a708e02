//! Outbound notifications (invitation mails, next-step reminders).

use std::future::Future;

use crate::Result;

pub trait Notifier: Send + Sync {
  /// Deliver a plain-text message. Failures are reported as
  /// [`crate::Error::Notification`].
  fn send<'a>(
    &'a self,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}

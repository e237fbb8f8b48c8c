use std::io::Write;

/// Blocking, user-visible notification.
///
/// Every failure the user must act on goes through here; `tracing` output is
/// supplementary.
pub trait Notifier: Send + Sync {
    fn alert(&self, title: &str, message: &str);
}

/// Writes alerts to stderr, framed so they stand out from log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn alert(&self, title: &str, message: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "\n[!] {title}");
        if !message.is_empty() {
            let _ = writeln!(stderr, "    {message}");
        }
        let _ = stderr.flush();
    }
}

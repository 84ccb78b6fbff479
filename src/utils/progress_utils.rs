use indicatif::{ProgressBar, ProgressStyle};

/// Standard progress bar for batch replay steps. Returns `None` when
/// progress output is suppressed (tests, cron runs).
pub fn progress_bar(len: u64, message: String) -> Option<ProgressBar> {
    if std::env::var("PPR_NO_PROGRESS").is_ok() {
        return None;
    }

    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise} / {eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .ok()?
            .progress_chars("##-")
    );
    bar.set_message(message);

    Some(bar)
}

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for a batch step, hidden unless stderr is attended
#[inline]
pub fn step_bar(len: usize, verb: &str) -> ProgressBar {
    if console::user_attended_stderr() {
        let template = format!("{{spinner}} [{{pos}}/{{len}}] {} {{msg}}", verb);
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        ProgressBar::new(len as u64).with_style(style)
    } else {
        ProgressBar::hidden()
    }
}

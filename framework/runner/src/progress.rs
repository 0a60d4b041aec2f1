use indicatif::{ProgressBar, ProgressStyle};

/// A progress bar counting completed engine trials.
///
/// Hidden when `hidden` is set, so callers can update it unconditionally.
pub(crate) fn trial_progress(total_trials: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total_trials);
    match ProgressStyle::with_template(
        "{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} trials [{elapsed_precise}] {msg}",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => log::debug!("Using default progress style: {e}"),
    }
    pb
}

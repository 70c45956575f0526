//! Progress bar utilities for batch classification.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Create a progress bar for classifying multiple images.
///
/// Returns `None` when disabled or when there is at most one image.
pub fn create_image_progress(total_images: usize, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total_images < 2 {
        return None;
    }

    let pb = ProgressBar::with_draw_target(Some(total_images as u64), ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} images ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    Some(pb)
}

/// Finish a progress bar with a message.
pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

/// Increment a progress bar.
pub fn inc_progress(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        pb.inc(1);
    }
}

/// Run `f` with the bar hidden so stdout output does not tear it.
pub fn suspend<R>(pb: Option<&ProgressBar>, f: impl FnOnce() -> R) -> R {
    match pb {
        Some(pb) => pb.suspend(f),
        None => f(),
    }
}

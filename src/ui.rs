// ui.rs

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress bar for offline renders, counted in frames.
pub fn create_render_progress(total_frames: u64, sample_rate: f64) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(total_frames), ProgressDrawTarget::stderr());
    let style = ProgressStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan}] {pos}/{len} frames {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("⣀⣤⣦⣶⣷⣿ ");
    pb.set_style(style);
    pb.set_prefix("Render");
    pb.set_message(format!("@ {} Hz", sample_rate));
    pb
}

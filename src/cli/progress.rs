//! Progress bars driven by the library's [`Progress`] counters.

use std::future::Future;
use std::time::Duration;

use hypothesis_client::Progress;
use indicatif::{ProgressBar, ProgressStyle};

const REFRESH: Duration = Duration::from_millis(100);

/// Run `operation` while mirroring `progress` onto a progress bar.
///
/// The bar is cleared when the operation completes, successfully or not.
pub async fn with_progress_bar<F, T>(
    progress: &Progress,
    message: &str,
    operation: F,
) -> anyhow::Result<T>
where
    F: Future<Output = T>,
{
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({elapsed})")?
            .progress_chars("█▓░"),
    );
    bar.set_message(message.to_string());

    tokio::pin!(operation);
    let mut ticker = tokio::time::interval(REFRESH);
    let result = loop {
        tokio::select! {
            result = &mut operation => break result,
            _ = ticker.tick() => sync(&bar, progress),
        }
    };

    sync(&bar, progress);
    bar.finish_and_clear();
    Ok(result)
}

fn sync(bar: &ProgressBar, progress: &Progress) {
    let snapshot = progress.snapshot();
    bar.set_length(snapshot.max as u64);
    bar.set_position(snapshot.current as u64);
}

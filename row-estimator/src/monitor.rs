//! Reports sampling progress on a spinner

use indicatif::{ProgressBar, ProgressStyle};
use kanal::{AsyncReceiver, AsyncSender};
use num_format::{Locale, ToFormattedString};
use tokio::task::JoinHandle;

use crate::Error;

/// An update for our sampling monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorUpdate {
    /// A token range was sampled
    Sampled { rows: usize, bytes: u64 },
    /// A token range failed to sample
    Failed,
    /// Sampling is finished
    Finished,
}

/// The running totals our monitor has seen
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MonitorTotals {
    /// The number of ranges we have sampled
    pub ranges: usize,
    /// The number of ranges that failed
    pub failed: usize,
    /// The number of rows we have sampled
    pub rows: usize,
    /// The total estimated bytes across all sampled rows
    pub bytes: u64,
}

impl MonitorTotals {
    /// Render these totals for our spinner
    fn message(&self) -> String {
        let mut msg = format!(
            "{} rows ~{} bytes in {} ranges",
            self.rows.to_formatted_string(&Locale::en),
            self.bytes.to_formatted_string(&Locale::en),
            self.ranges.to_formatted_string(&Locale::en),
        );
        if self.failed > 0 {
            msg.push_str(&format!(" ({} failed)", self.failed));
        }
        msg
    }
}

pub struct Monitor {
    /// The progress bar to report on
    progress: ProgressBar,
    /// The receiver to get updates on
    receiver: AsyncReceiver<MonitorUpdate>,
}

impl Monitor {
    /// Create a new sampling monitor
    ///
    /// # Arguments
    ///
    /// * `progress` - The progress bar to report status with
    /// * `receiver` - The channel to get status updates on
    pub fn new(progress: ProgressBar, receiver: AsyncReceiver<MonitorUpdate>) -> Self {
        Monitor { progress, receiver }
    }

    /// Build the style for our spinner
    fn bar_style() -> Result<ProgressStyle, Error> {
        let bar_style = ProgressStyle::with_template(
            "{spinner:.green} {elapsed_precise} Sampled: {msg}",
        )?
        .tick_strings(&[
            "🦀📏    ",
            " 🦀📏   ",
            "  🦀📏  ",
            "   🦀📏 ",
            "    🦀📏",
            "   🦀📏 ",
            "  🦀📏  ",
            " 🦀📏   ",
            "🦀📏    ",
        ]);
        Ok(bar_style)
    }

    /// Spawn a monitor and get the channel to send it updates on
    ///
    /// # Arguments
    ///
    /// * `visible` - Whether to actually draw the spinner
    pub fn spawn(
        visible: bool,
    ) -> Result<(AsyncSender<MonitorUpdate>, JoinHandle<MonitorTotals>), Error> {
        let (updates_tx, updates_rx) = kanal::unbounded_async();
        // create our spinner or a hidden bar if we shouldn't draw
        let bar = if visible {
            let bar = ProgressBar::new_spinner();
            bar.set_style(Self::bar_style()?);
            // set a steady tick rate
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            bar
        } else {
            ProgressBar::hidden()
        };
        let monitor = Monitor::new(bar, updates_rx);
        let handle = tokio::spawn(async move { monitor.start().await });
        Ok((updates_tx, handle))
    }

    /// Start monitoring our channel for updates
    pub async fn start(self) -> MonitorTotals {
        let mut totals = MonitorTotals::default();
        // handle messages in our channel until its closed
        loop {
            // get the next message in the queue
            let msg = match self.receiver.recv().await {
                Ok(msg) => msg,
                Err(kanal::ReceiveError::Closed | kanal::ReceiveError::SendClosed) => break,
            };
            match msg {
                MonitorUpdate::Sampled { rows, bytes } => {
                    totals.ranges += 1;
                    totals.rows += rows;
                    totals.bytes += bytes;
                }
                MonitorUpdate::Failed => totals.failed += 1,
                // sampling is finished so stop listening
                MonitorUpdate::Finished => break,
            }
            self.progress.set_message(totals.message());
        }
        // clear our spinner before the report is logged
        self.progress.finish_and_clear();
        totals
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn tracks_totals() -> Result<(), Error> {
        let (tx, handle) = Monitor::spawn(false)?;
        tx.send(MonitorUpdate::Sampled { rows: 3, bytes: 90 }).await?;
        tx.send(MonitorUpdate::Failed).await?;
        tx.send(MonitorUpdate::Sampled { rows: 1, bytes: 10 }).await?;
        tx.send(MonitorUpdate::Finished).await?;
        let totals = handle.await?;
        assert_eq!(
            totals,
            MonitorTotals {
                ranges: 2,
                failed: 1,
                rows: 4,
                bytes: 100,
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn stops_when_senders_drop() -> Result<(), Error> {
        let (tx, handle) = Monitor::spawn(false)?;
        tx.send(MonitorUpdate::Failed).await?;
        drop(tx);
        // the monitor exits instead of waiting on a finished message forever
        let totals = handle.await?;
        assert_eq!(totals.rows, 0);
        Ok(())
    }

    #[test]
    fn message_formats_thousands() {
        let totals = MonitorTotals {
            ranges: 2,
            failed: 1,
            rows: 12_345,
            bytes: 1_000_000,
        };
        assert_eq!(
            totals.message(),
            "12,345 rows ~1,000,000 bytes in 2 ranges (1 failed)"
        );
    }
}

//! Progress events and the terminal renderer that consumes them
//!
//! Transfer and pipeline code only ever sends [`ProgressEvent`]s; the
//! renderer task owns every progress bar.

use crate::utils::organizer::truncate_title;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Width titles are truncated to on the per-item bar
pub const TITLE_DISPLAY_WIDTH: usize = 35;

/// Events emitted by the pipeline while it works
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    ItemStarted {
        index: usize,
        total: usize,
        title: String,
    },
    ItemFinished,
    TransferStarted {
        label: String,
        total_bytes: Option<u64>,
    },
    /// Bytes written since the previous event
    Transferred(u64),
    TransferFinished,
    /// Per-step console narration, only shown in verbose mode
    Narration(String),
}

/// How much the renderer draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Narration plus one byte bar per transfer
    Verbose,
    /// One tick per item
    ItemBar { total: usize },
    Quiet,
}

impl DisplayMode {
    /// Verbose only for a single item run that is neither silent nor forced
    /// to a single bar; any multi-item run gets one bar ticking per item.
    pub fn choose(item_count: usize, silent: bool, single_progress_bar: bool) -> Self {
        if item_count > 1 || single_progress_bar {
            DisplayMode::ItemBar { total: item_count }
        } else if silent {
            DisplayMode::Quiet
        } else {
            DisplayMode::Verbose
        }
    }
}

/// Sending half handed to the pipeline; a disconnected or absent receiver is ignored
#[derive(Debug, Clone, Default)]
pub struct Progress {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl Progress {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A handle that drops every event
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn narrate(&self, message: impl Into<String>) {
        self.send(ProgressEvent::Narration(message.into()));
    }

    pub fn transferred(&self, bytes: u64) {
        self.send(ProgressEvent::Transferred(bytes));
    }
}

/// Consumes progress events and draws them
pub struct ProgressRenderer {
    mode: DisplayMode,
    item_bar: Option<ProgressBar>,
    transfer_bar: Option<ProgressBar>,
}

impl ProgressRenderer {
    pub fn new(mode: DisplayMode) -> Self {
        let item_bar = match mode {
            DisplayMode::ItemBar { total } => {
                let bar = ProgressBar::new(total as u64);
                bar.set_style(
                    ProgressStyle::with_template("{msg:35} {wide_bar} {pos}/{len} [{elapsed}]")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                Some(bar)
            }
            _ => None,
        };
        Self {
            mode,
            item_bar,
            transfer_bar: None,
        }
    }

    /// Renderer that draws to a hidden target, for tests
    pub fn hidden(mode: DisplayMode) -> Self {
        let renderer = Self::new(mode);
        if let Some(bar) = &renderer.item_bar {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        renderer
    }

    /// Spawn the renderer task; it ends when every sender is dropped
    pub fn spawn(
        mut self,
        mut rx: mpsc::UnboundedReceiver<ProgressEvent>,
    ) -> JoinHandle<ProgressRenderer> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.handle(event);
            }
            self.finish();
            self
        })
    }

    pub fn handle(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::ItemStarted { title, .. } => {
                if let Some(bar) = &self.item_bar {
                    bar.set_message(truncate_title(&title, TITLE_DISPLAY_WIDTH));
                }
            }
            ProgressEvent::ItemFinished => {
                if let Some(bar) = &self.item_bar {
                    bar.inc(1);
                }
            }
            ProgressEvent::TransferStarted { label, total_bytes } => {
                if self.mode != DisplayMode::Verbose {
                    return;
                }
                let bar = match total_bytes {
                    Some(total) => ProgressBar::new(total),
                    None => ProgressBar::new_spinner(),
                };
                bar.set_style(
                    ProgressStyle::with_template(
                        "{msg} [{bar:40}] {bytes}/{total_bytes} {bytes_per_sec} ETA {eta}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
                );
                bar.set_message(label);
                self.transfer_bar = Some(bar);
            }
            ProgressEvent::Transferred(bytes) => {
                if let Some(bar) = &self.transfer_bar {
                    bar.inc(bytes);
                }
            }
            ProgressEvent::TransferFinished => {
                if let Some(bar) = self.transfer_bar.take() {
                    bar.finish_and_clear();
                }
            }
            ProgressEvent::Narration(message) => {
                if self.mode == DisplayMode::Verbose {
                    match &self.transfer_bar {
                        Some(bar) => bar.println(message),
                        None => eprintln!("{}", message),
                    }
                }
            }
        }
    }

    pub fn finish(&mut self) {
        if let Some(bar) = self.transfer_bar.take() {
            bar.finish_and_clear();
        }
        if let Some(bar) = &self.item_bar {
            bar.finish();
        }
    }

    /// Items ticked off so far on the per-item bar
    pub fn items_done(&self) -> Option<u64> {
        self.item_bar.as_ref().map(|bar| bar.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mode_choice() {
        assert_eq!(DisplayMode::choose(1, false, false), DisplayMode::Verbose);
        assert_eq!(DisplayMode::choose(1, true, false), DisplayMode::Quiet);
        assert_eq!(
            DisplayMode::choose(1, false, true),
            DisplayMode::ItemBar { total: 1 }
        );
        assert_eq!(
            DisplayMode::choose(3, true, false),
            DisplayMode::ItemBar { total: 3 }
        );
    }

    #[test]
    fn test_disabled_progress_drops_events() {
        let progress = Progress::disabled();
        progress.narrate("nobody listens");
        progress.transferred(10);
    }

    #[tokio::test]
    async fn test_events_flow_through_channel() {
        let (progress, mut rx) = Progress::channel();
        progress.narrate("Downloading audio part...");
        progress.transferred(512);
        drop(progress);

        assert_eq!(
            rx.recv().await,
            Some(ProgressEvent::Narration("Downloading audio part...".to_string()))
        );
        assert_eq!(rx.recv().await, Some(ProgressEvent::Transferred(512)));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_renderer_ticks_once_per_item() {
        let (progress, rx) = Progress::channel();
        let renderer = ProgressRenderer::hidden(DisplayMode::ItemBar { total: 2 });
        let handle = renderer.spawn(rx);

        for index in 0..2 {
            progress.send(ProgressEvent::ItemStarted {
                index,
                total: 2,
                title: "A very long title that will not fit on one progress line".to_string(),
            });
            progress.send(ProgressEvent::TransferStarted {
                label: "audio".to_string(),
                total_bytes: Some(100),
            });
            progress.transferred(100);
            progress.send(ProgressEvent::TransferFinished);
            progress.send(ProgressEvent::ItemFinished);
        }
        drop(progress);

        let renderer = handle.await.unwrap();
        assert_eq!(renderer.items_done(), Some(2));
    }

    #[test]
    fn test_quiet_renderer_has_no_bars() {
        let mut renderer = ProgressRenderer::hidden(DisplayMode::Quiet);
        renderer.handle(ProgressEvent::TransferStarted {
            label: "video".to_string(),
            total_bytes: None,
        });
        renderer.handle(ProgressEvent::Transferred(5));
        assert!(renderer.transfer_bar.is_none());
        assert_eq!(renderer.items_done(), None);
    }
}

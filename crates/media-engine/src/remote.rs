// FILE: crates/media-engine/src/remote.rs
//! Progressive download exposed as a symphonia media source
//!
//! A fetch task on the async runtime appends body chunks to a shared window
//! while the decoding thread reads from it, blocking only when it gets ahead
//! of the download. Reads outside the window restart the fetch with a range
//! request at the new offset.

use securgeek_network::{Client, NetworkError, RangedResponse, Url};
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use symphonia::core::io::MediaSource;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Forward jumps shorter than this wait for the running download
const READ_AHEAD_SLACK: u64 = 256 * 1024;

/// Called with `true` when a read has to wait for the network and with
/// `false` once data arrives again
pub type StallObserver = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
struct Window {
    /// Resource offset of `data[0]`
    base: u64,
    data: Vec<u8>,
    total: Option<u64>,
    /// Bumped on every restart; stale chunks are discarded
    generation: u64,
    opened: bool,
    ranges: bool,
    complete: bool,
    failure: Option<String>,
    released: bool,
}

impl Window {
    fn end(&self) -> u64 {
        self.base + self.data.len() as u64
    }

    fn restart_at(&mut self, offset: u64) {
        self.base = offset;
        self.data.clear();
        self.complete = false;
        self.failure = None;
        self.generation += 1;
    }
}

struct Shared {
    window: Mutex<Window>,
    changed: Condvar,
    restart: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Window> {
        self.window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Owner side of a download; releasing it stops the fetch and wakes readers
pub struct RemoteControl {
    shared: Arc<Shared>,
    fetch: Option<JoinHandle<()>>,
}

impl RemoteControl {
    pub fn release(&mut self) {
        if let Some(fetch) = self.fetch.take() {
            fetch.abort();
        }
        self.shared.lock().released = true;
        self.shared.changed.notify_all();
    }
}

impl Drop for RemoteControl {
    fn drop(&mut self) {
        self.release();
    }
}

/// Reader side, handed to symphonia
pub struct RemoteSource {
    shared: Arc<Shared>,
    position: u64,
    stalled: bool,
    observer: Option<StallObserver>,
}

/// Starts downloading `url` and returns the reader and its control
pub fn open_remote(
    client: Client,
    url: Url,
    runtime: &RuntimeHandle,
) -> (RemoteSource, RemoteControl) {
    let shared = Arc::new(Shared {
        window: Mutex::new(Window::default()),
        changed: Condvar::new(),
        restart: Notify::new(),
    });

    let fetch = runtime.spawn(fetch(client, url, shared.clone()));

    let source = RemoteSource {
        shared: shared.clone(),
        position: 0,
        stalled: false,
        observer: None,
    };
    let control = RemoteControl {
        shared,
        fetch: Some(fetch),
    };
    (source, control)
}

async fn fetch(client: Client, url: Url, shared: Arc<Shared>) {
    loop {
        let (offset, generation) = {
            let window = shared.lock();
            (window.base, window.generation)
        };

        match client.get_range(&url, offset).await {
            Ok(response) => stream_body(&url, response, generation, &shared).await,
            Err(e) => {
                log::warn!("Fetching {} from byte {} failed: {}", url, offset, e);
                let mut window = shared.lock();
                if window.generation == generation {
                    window.opened = true;
                    window.failure = Some(e.to_string());
                }
                drop(window);
                shared.changed.notify_all();
            }
        }

        // Wait for a reader to move the window
        loop {
            if shared.lock().generation != generation {
                break;
            }
            shared.restart.notified().await;
        }
    }
}

async fn stream_body(url: &Url, mut response: RangedResponse, generation: u64, shared: &Shared) {
    {
        let mut window = shared.lock();
        if window.generation != generation {
            return;
        }
        window.opened = true;
        window.ranges = response.is_partial();
        window.base = response.start();
        if let Some(total) = response.total() {
            window.total = Some(total);
        }
    }
    shared.changed.notify_all();
    log::debug!(
        "Streaming {} from byte {} of {:?}",
        url,
        response.start(),
        response.total()
    );

    loop {
        let chunk = tokio::select! {
            chunk = response.chunk() => chunk,
            _ = shared.restart.notified() => {
                if shared.lock().generation != generation {
                    return;
                }
                continue;
            }
        };

        let mut window = shared.lock();
        if window.generation != generation {
            return;
        }
        let finished = match chunk {
            Ok(Some(bytes)) => {
                window.data.extend_from_slice(&bytes);
                false
            }
            Ok(None) => {
                window.complete = true;
                true
            }
            Err(e) => {
                log::warn!("Download of {} broke off: {}", url, e);
                window.failure = Some(failure_message(&e));
                true
            }
        };
        drop(window);
        shared.changed.notify_all();
        if finished {
            return;
        }
    }
}

fn failure_message(error: &NetworkError) -> String {
    match error {
        NetworkError::Timeout => "download stalled".to_string(),
        other => other.to_string(),
    }
}

fn released() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "stream released")
}

impl RemoteSource {
    /// Reports read stalls while data is awaited
    pub fn with_observer(mut self, observer: StallObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    fn set_stalled(&mut self, stalled: bool) {
        if self.stalled == stalled {
            return;
        }
        self.stalled = stalled;
        if let Some(observer) = &self.observer {
            observer(stalled);
        }
    }

    /// Blocks until the response headers arrived or the fetch failed
    fn wait_opened(&self) -> io::Result<MutexGuard<'_, Window>> {
        let mut window = self.shared.lock();
        while !window.opened && !window.released {
            window = self
                .shared
                .changed
                .wait(window)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        if window.released {
            return Err(released());
        }
        Ok(window)
    }
}

impl Read for RemoteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let shared = self.shared.clone();
        let mut window = shared.lock();
        let copied = loop {
            if window.released {
                return Err(released());
            }

            if window.opened {
                if let Some(total) = window.total {
                    if self.position >= total {
                        break 0;
                    }
                }

                let end = window.end();
                if self.position >= window.base && self.position < end {
                    let start = (self.position - window.base) as usize;
                    let n = buf.len().min(window.data.len() - start);
                    buf[..n].copy_from_slice(&window.data[start..start + n]);
                    break n;
                }

                if let Some(failure) = &window.failure {
                    return Err(io::Error::new(io::ErrorKind::Other, failure.clone()));
                }
                if window.complete && self.position >= window.base {
                    break 0;
                }

                let behind = self.position < window.base;
                let far_ahead = self.position > end + READ_AHEAD_SLACK;
                if window.ranges && (behind || far_ahead) {
                    log::debug!("Restarting download at byte {}", self.position);
                    window.restart_at(self.position);
                    shared.restart.notify_one();
                } else if behind {
                    // Server ignores ranges and the window moved past this offset
                    window.restart_at(0);
                    window.opened = false;
                    shared.restart.notify_one();
                }
            }

            if !self.stalled {
                drop(window);
                self.set_stalled(true);
                window = shared.lock();
                continue;
            }
            window = shared
                .changed
                .wait(window)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        };
        drop(window);

        self.position += copied as u64;
        self.set_stalled(false);
        Ok(copied)
    }
}

impl Seek for RemoteSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let total = self.wait_opened()?.total.ok_or_else(|| {
                    io::Error::new(io::ErrorKind::Unsupported, "resource length unknown")
                })?;
                total.checked_add_signed(delta)
            }
        };

        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of stream")
        })?;
        self.position = target;
        Ok(target)
    }
}

impl MediaSource for RemoteSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        self.wait_opened().ok().and_then(|window| window.total)
    }
}

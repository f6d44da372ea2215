//! Shared helpers: an in-memory OCR engine and a polling loop.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use image::{DynamicImage, GrayImage, Luma};
use ksiegi_core::error::OcrError;
use ksiegi_core::ocr;
use ksiegi_core::{OcrEngine, TaskEvent, TaskRunner};

/// How the fake engine answers batch calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Batch {
    Unsupported,
    Works,
    Fails,
}

/// Engine answering by image width.
pub struct FakeEngine {
    texts: HashMap<u32, String>,
    failing: HashSet<u32>,
    batch: Batch,
    delay: Duration,
    slow: HashMap<u32, Duration>,
    active: AtomicUsize,
    /// Most recognitions seen running at the same time.
    pub peak: AtomicUsize,
    pub single_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            texts: HashMap::new(),
            failing: HashSet::new(),
            batch: Batch::Unsupported,
            delay: Duration::ZERO,
            slow: HashMap::new(),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn text(mut self, width: u32, text: &str) -> Self {
        self.texts.insert(width, text.to_string());
        self
    }

    pub fn fail_on(mut self, width: u32) -> Self {
        self.failing.insert(width);
        self
    }

    pub fn batch(mut self, batch: Batch) -> Self {
        self.batch = batch;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Extra delay for the image of one width, in place of `delay`.
    pub fn slow(mut self, width: u32, delay: Duration) -> Self {
        self.slow.insert(width, delay);
        self
    }

    fn answer(&self, image: &DynamicImage) -> ocr::Result<String> {
        let width = image.width();
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        thread::sleep(self.slow.get(&width).copied().unwrap_or(self.delay));
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&width) {
            return Err(OcrError::Recognition(format!("unreadable image {}", width)));
        }
        Ok(self.texts.get(&width).cloned().unwrap_or_default())
    }
}

impl OcrEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn recognize(&self, image: &DynamicImage, _language: &str) -> ocr::Result<String> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(image)
    }

    fn supports_batch(&self) -> bool {
        self.batch != Batch::Unsupported
    }

    fn recognize_batch(
        &self,
        images: &[DynamicImage],
        _language: &str,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> ocr::Result<Vec<String>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.batch == Batch::Fails {
            return Err(OcrError::Batch("batch backend unavailable".to_string()));
        }
        images
            .iter()
            .enumerate()
            .map(|(i, image)| {
                on_progress(i, images.len());
                self.answer(image)
            })
            .collect()
    }
}

/// A blank page whose width identifies it to [`FakeEngine`].
pub fn page(width: u32) -> DynamicImage {
    DynamicImage::new_luma8(width, 10)
}

/// White page with 2px black rectangles drawn at the given boxes.
pub fn grid_page(width: u32, height: u32, boxes: &[(u32, u32, u32, u32)]) -> DynamicImage {
    let mut img = GrayImage::from_pixel(width, height, Luma([255]));
    for &(x, y, w, h) in boxes {
        for dx in 0..w {
            for t in 0..2 {
                img.put_pixel(x + dx, y + t, Luma([0]));
                img.put_pixel(x + dx, y + h - 1 - t, Luma([0]));
            }
        }
        for dy in 0..h {
            for t in 0..2 {
                img.put_pixel(x + t, y + dy, Luma([0]));
                img.put_pixel(x + w - 1 - t, y + dy, Luma([0]));
            }
        }
    }
    DynamicImage::ImageLuma8(img)
}

/// Poll the runner like a UI would until a terminal event arrives.
pub fn poll_to_end(runner: &mut TaskRunner) -> (Vec<String>, Vec<TaskEvent>) {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut progress = Vec::new();
    let mut events = Vec::new();

    loop {
        progress.extend(runner.drain_progress());
        let batch = runner.drain_results();
        let finished = batch.iter().any(TaskEvent::is_terminal);
        events.extend(batch);
        if finished {
            break;
        }
        assert!(Instant::now() < deadline, "no terminal event within 10s");
        thread::sleep(Duration::from_millis(10));
    }

    runner.join().unwrap();
    progress.extend(runner.drain_progress());
    events.extend(runner.drain_results());
    (progress, events)
}

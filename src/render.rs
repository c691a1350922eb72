//! Outputs fed with a [`Snapshot`] after every step.
//!
//! None of these touch the flock; they only see the copied positions.

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::rc::Rc;

use colors_transform::{Color, Hsl};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, Rgb, RgbImage};
use tracing::debug;

use crate::{Bounds, RenderError, ScoutGroup, Snapshot};

pub trait Renderer {
    fn render(&mut self, snapshot: &Snapshot) -> Result<(), RenderError>;

    /// Called once after the last step.
    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

fn hue(degrees: f32) -> Rgb<u8> {
    let rgb = Hsl::from(degrees, 90.0, 60.0).to_rgb();
    Rgb([
        rgb.get_red().round() as u8,
        rgb.get_green().round() as u8,
        rgb.get_blue().round() as u8,
    ])
}

fn colour_of(group: ScoutGroup) -> Rgb<u8> {
    match group {
        ScoutGroup::None => WHITE,
        ScoutGroup::Group1 => hue(200.0),
        ScoutGroup::Group2 => hue(20.0),
    }
}

/// Rasterises snapshots onto a plane scaled to `scale` pixels per unit.
#[derive(Debug, Clone)]
pub struct Canvas {
    pub bounds: Bounds,
    pub scale: f32,
    pub draw_radius: i32,
}

impl Canvas {
    pub fn new(bounds: Bounds, scale: f32, draw_radius: i32) -> Self {
        Canvas {
            bounds,
            scale,
            draw_radius,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (
            ((self.bounds.width * self.scale).ceil() as u32).max(1),
            ((self.bounds.height * self.scale).ceil() as u32).max(1),
        )
    }

    pub fn paint(&self, snapshot: &Snapshot) -> RgbImage {
        let (width, height) = self.dimensions();
        let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

        for (&(x, y), &group) in snapshot.positions.iter().zip(&snapshot.groups) {
            let colour = colour_of(group);
            // Image rows grow downwards, the plane's y grows upwards
            let cx = (x * self.scale).floor() as i64;
            let cy = height as i64 - 1 - (y * self.scale).floor() as i64;
            let r = self.draw_radius as i64;
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx * dx + dy * dy > r * r {
                        continue;
                    }
                    let px = cx + dx;
                    let py = cy + dy;
                    if px >= 0 && py >= 0 && px < width as i64 && py < height as i64 {
                        img.put_pixel(px as u32, py as u32, colour);
                    }
                }
            }
        }
        img
    }
}

/// Writes `frames_XXXXXXXX.png` into a directory, one per step.
pub struct PngFrames {
    canvas: Canvas,
    dir: PathBuf,
}

impl PngFrames {
    pub fn new(canvas: Canvas, dir: impl Into<PathBuf>) -> Result<Self, RenderError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(PngFrames { canvas, dir })
    }
}

impl Renderer for PngFrames {
    fn render(&mut self, snapshot: &Snapshot) -> Result<(), RenderError> {
        let img = self.canvas.paint(snapshot);
        img.save(self.dir.join(format!("frames_{:0>8}.png", snapshot.step)))?;
        Ok(())
    }
}

/// Lets the GIF encoder and [`GifAnimation`] write to the same output.
struct SharedSink<W>(Rc<RefCell<W>>);

impl<W: Write> Write for SharedSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.borrow_mut().flush()
    }
}

/// Streams every step into a looping animated GIF.
pub struct GifAnimation<W: Write = BufWriter<File>> {
    canvas: Canvas,
    delay_ms: u32,
    out: Rc<RefCell<W>>,
    encoder: Option<GifEncoder<SharedSink<W>>>,
}

impl GifAnimation {
    pub fn create(canvas: Canvas, path: impl Into<PathBuf>, delay_ms: u32) -> Result<Self, RenderError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let out = BufWriter::new(File::create(&path)?);
        debug!(path = %path.display(), "gif animation opened");
        GifAnimation::new(canvas, out, delay_ms)
    }
}

impl<W: Write> GifAnimation<W> {
    pub fn new(canvas: Canvas, out: W, delay_ms: u32) -> Result<Self, RenderError> {
        let out = Rc::new(RefCell::new(out));
        let mut encoder = GifEncoder::new(SharedSink(Rc::clone(&out)));
        encoder.set_repeat(Repeat::Infinite)?;
        Ok(GifAnimation {
            canvas,
            delay_ms,
            out,
            encoder: Some(encoder),
        })
    }
}

impl<W: Write> Renderer for GifAnimation<W> {
    fn render(&mut self, snapshot: &Snapshot) -> Result<(), RenderError> {
        if let Some(encoder) = self.encoder.as_mut() {
            let rgba = DynamicImage::ImageRgb8(self.canvas.paint(snapshot)).into_rgba8();
            let delay = Delay::from_numer_denom_ms(self.delay_ms, 1);
            encoder.encode_frame(Frame::from_parts(rgba, 0, 0, delay))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        // Dropping the encoder appends the trailer to the buffered output;
        // any write failure surfaces from the flush below
        drop(self.encoder.take());
        self.out.borrow_mut().flush()?;
        Ok(())
    }
}

/// Prints the flock as a character grid, one block per step.
pub struct TextGrid<W: Write> {
    out: W,
    bounds: Bounds,
    columns: usize,
    rows: usize,
}

impl<W: Write> TextGrid<W> {
    pub fn new(out: W, bounds: Bounds, columns: usize, rows: usize) -> Self {
        TextGrid {
            out,
            bounds,
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn cell(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        if !(0.0..=self.bounds.width).contains(&x) || !(0.0..=self.bounds.height).contains(&y) {
            return None;
        }
        let col = ((x / self.bounds.width) * self.columns as f32) as usize;
        let row = ((y / self.bounds.height) * self.rows as f32) as usize;
        let col = col.min(self.columns - 1);
        let row = row.min(self.rows - 1);
        Some((self.rows - 1 - row, col))
    }
}

impl<W: Write> Renderer for TextGrid<W> {
    fn render(&mut self, snapshot: &Snapshot) -> Result<(), RenderError> {
        let mut grid = vec![vec!['.'; self.columns]; self.rows];
        for (&(x, y), &group) in snapshot.positions.iter().zip(&snapshot.groups) {
            if let Some((row, col)) = self.cell(x, y) {
                grid[row][col] = match group {
                    ScoutGroup::None => 'o',
                    ScoutGroup::Group1 => '>',
                    ScoutGroup::Group2 => '<',
                };
            }
        }

        writeln!(self.out, "Frame {}", snapshot.step)?;
        for row in grid {
            let line: String = row.into_iter().collect();
            writeln!(self.out, "{line}")?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        self.out.flush()?;
        Ok(())
    }
}

/// One JSON object per line per step.
pub struct SnapshotLog<W: Write> {
    out: W,
}

impl<W: Write> SnapshotLog<W> {
    pub fn new(out: W) -> Self {
        SnapshotLog { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for SnapshotLog<W> {
    fn render(&mut self, snapshot: &Snapshot) -> Result<(), RenderError> {
        serde_json::to_writer(&mut self.out, snapshot)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        self.out.flush()?;
        Ok(())
    }
}
